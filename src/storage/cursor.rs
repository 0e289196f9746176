//! A positional handle into the table's ordered rows.
//!
//! Unlike a typical Rust iterator, a `Cursor` doesn't borrow the `Pager` it
//! walks, it's plain data (`page_num`, `cell_num`) and every operation on it
//! takes the pager explicitly. That sidesteps holding a mutable borrow across
//! calls that `Table` also needs to make between `advance()`s.

use super::page::NodeType;
use super::pager::Pager;
use super::row::Row;
use crate::errors::Error;

#[derive(Debug, Clone, Copy)]
pub struct Cursor {
    pub page_num: u32,
    pub cell_num: u32,
    pub end_of_table: bool,
}

impl Cursor {
    pub fn value(&self, pager: &mut Pager) -> Result<Row, Error> {
        let page = pager.get_page(self.page_num)?;
        let bytes = page.leaf_value(self.cell_num)?;
        Ok(Row::deserialize(bytes))
    }

    /// Moves to the next cell, following the leaf's `next_leaf` pointer to
    /// the adjacent leaf once the current one is exhausted.
    pub fn advance(&mut self, pager: &mut Pager) -> Result<(), Error> {
        let page = pager.get_page(self.page_num)?;
        self.cell_num += 1;
        if self.cell_num >= page.leaf_num_cells() {
            let next_leaf = page.leaf_next_leaf();
            if next_leaf == 0 {
                self.end_of_table = true;
            } else {
                self.page_num = next_leaf;
                self.cell_num = 0;
            }
        }
        Ok(())
    }
}

/// Descends from `root_page_num` to the leftmost leaf and positions a cursor
/// at its first cell.
pub fn table_start(pager: &mut Pager, root_page_num: u32) -> Result<Cursor, Error> {
    let mut page_num = root_page_num;
    loop {
        let node_type = pager.get_page(page_num)?.node_type()?;
        match node_type {
            NodeType::Leaf => break,
            NodeType::Internal => {
                page_num = pager.get_page(page_num)?.internal_child(0)?;
            }
        }
    }
    let num_cells = pager.get_page(page_num)?.leaf_num_cells();
    Ok(Cursor {
        page_num,
        cell_num: 0,
        end_of_table: num_cells == 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::btree;
    use crate::storage::row::Row;

    #[test]
    fn start_on_empty_table_is_end_of_table() {
        let dir = tempfile::tempdir().unwrap();
        let mut pager = Pager::open(dir.path().join("t.db")).unwrap();
        pager.get_page(0).unwrap().init_leaf();
        pager.get_page(0).unwrap().set_root(true);

        let cursor = table_start(&mut pager, 0).unwrap();
        assert!(cursor.end_of_table);
    }

    #[test]
    fn advance_walks_rows_in_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut pager = Pager::open(dir.path().join("t.db")).unwrap();
        pager.get_page(0).unwrap().init_leaf();
        pager.get_page(0).unwrap().set_root(true);

        for id in [3u32, 1, 2] {
            let row = Row::new(id, "u", "e@x").unwrap();
            let (page_num, cell_num) = btree::find(&mut pager, 0, id).unwrap();
            btree::insert(&mut pager, page_num, cell_num, &row).unwrap();
        }

        let mut cursor = table_start(&mut pager, 0).unwrap();
        let mut seen = Vec::new();
        while !cursor.end_of_table {
            seen.push(cursor.value(&mut pager).unwrap().id);
            cursor.advance(&mut pager).unwrap();
        }
        assert_eq!(seen, vec![1, 2, 3]);
    }
}
