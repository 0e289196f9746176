mod btree;
mod cursor;
mod page;
mod pager;
mod row;
mod table;

pub use cursor::Cursor;
pub use page::{LEAF_CELL_SIZE, LEAF_MAX_CELLS, PAGE_SIZE};
pub use row::{Row, RowError, ROW_SIZE};
pub use table::{InsertError, Table};
