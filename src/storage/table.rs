//! The façade the REPL talks to. Hides the pager and the B+-tree behind
//! `open`/`insert`/`scan`/`find`/`close`.

use std::fmt;
use std::path::Path;

use tracing::info;

use super::btree;
use super::cursor::{self, Cursor};
use super::pager::Pager;
use super::row::Row;
use crate::errors::Error;

const ROOT_PAGE_NUM: u32 = 0;

pub struct Table {
    pager: Pager,
}

/// Why a row was rejected at the table level, as opposed to a fatal
/// storage error.
#[derive(Debug)]
pub enum InsertError {
    DuplicateKey,
    Storage(Error),
}

impl fmt::Display for InsertError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InsertError::DuplicateKey => write!(f, "Error: Duplicate key."),
            InsertError::Storage(e) => write!(f, "{e}"),
        }
    }
}

impl From<Error> for InsertError {
    fn from(e: Error) -> Self {
        InsertError::Storage(e)
    }
}

impl Table {
    /// Opens (or creates) the page file at `path`. A brand-new file gets an
    /// empty leaf as its root.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let mut pager = Pager::open(path)?;
        if pager.num_pages() == 0 {
            let root = pager.get_page(ROOT_PAGE_NUM)?;
            root.init_leaf();
            root.set_root(true);
        }
        Ok(Table { pager })
    }

    pub fn insert(&mut self, row: Row) -> Result<(), InsertError> {
        let (page_num, cell_num) = btree::find(&mut self.pager, ROOT_PAGE_NUM, row.id)?;

        let num_cells = self.pager.get_page(page_num)?.leaf_num_cells();
        if cell_num < num_cells && self.pager.get_page(page_num)?.leaf_key(cell_num)? == row.id {
            return Err(InsertError::DuplicateKey);
        }

        btree::insert(&mut self.pager, page_num, cell_num, &row)?;
        Ok(())
    }

    pub fn find(&mut self, key: u32) -> Result<Cursor, Error> {
        let (page_num, cell_num) = btree::find(&mut self.pager, ROOT_PAGE_NUM, key)?;
        Ok(Cursor {
            page_num,
            cell_num,
            end_of_table: false,
        })
    }

    pub fn start(&mut self) -> Result<Cursor, Error> {
        cursor::table_start(&mut self.pager, ROOT_PAGE_NUM)
    }

    /// Visits every row in ascending key order.
    pub fn scan<F: FnMut(Row)>(&mut self, mut visit: F) -> Result<(), Error> {
        let mut cursor = self.start()?;
        while !cursor.end_of_table {
            let row = cursor.value(&mut self.pager)?;
            visit(row);
            cursor.advance(&mut self.pager)?;
        }
        Ok(())
    }

    /// Renders the tree structure for the `.btree` meta-command.
    pub fn dump_tree(&mut self) -> Result<String, Error> {
        let mut out = String::new();
        btree::dump(&mut self.pager, ROOT_PAGE_NUM, 0, &mut out)?;
        Ok(out)
    }

    pub fn close(self) -> Result<(), Error> {
        self.pager.close()?;
        info!("table closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_scan_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = Table::open(dir.path().join("t.db")).unwrap();

        table.insert(Row::new(2, "bob", "bob@x.com").unwrap()).unwrap();
        table.insert(Row::new(1, "alice", "alice@x.com").unwrap()).unwrap();

        let mut seen = Vec::new();
        table.scan(|row| seen.push(row.id)).unwrap();
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn rejects_duplicate_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = Table::open(dir.path().join("t.db")).unwrap();

        table.insert(Row::new(1, "alice", "a@x.com").unwrap()).unwrap();
        let err = table.insert(Row::new(1, "eve", "e@x.com").unwrap()).unwrap_err();
        assert!(matches!(err, InsertError::DuplicateKey));
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.db");
        {
            let mut table = Table::open(&path).unwrap();
            table.insert(Row::new(1, "alice", "a@x.com").unwrap()).unwrap();
            table.close().unwrap();
        }
        {
            let mut table = Table::open(&path).unwrap();
            let mut seen = Vec::new();
            table.scan(|row| seen.push(row.id)).unwrap();
            assert_eq!(seen, vec![1]);
        }
    }

    #[test]
    fn find_locates_existing_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = Table::open(dir.path().join("t.db")).unwrap();
        table.insert(Row::new(5, "carl", "c@x.com").unwrap()).unwrap();

        let cursor = table.find(5).unwrap();
        assert_eq!(cursor.value(&mut table.pager).unwrap().id, 5);
    }
}
