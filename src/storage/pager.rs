//! Mediates all file I/O and caches pages in memory.
//!
//! At most [`TABLE_MAX_PAGES`] pages (400 KiB) are ever resident, so there is
//! no eviction policy: every touched page simply stays cached until
//! [`Pager::close`] flushes it.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, info, trace};

use super::page::{Page, PAGE_SIZE};
use crate::errors::{err, Error};

pub const TABLE_MAX_PAGES: usize = 100;

pub struct Pager {
    file: File,
    file_length: u64,
    num_pages: u32,
    pages: heapless::Vec<Page, TABLE_MAX_PAGES>,
}

impl Pager {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        let file_length = file.metadata()?.len();
        if file_length % PAGE_SIZE as u64 != 0 {
            return Err(err!(
                Storage,
                "db file '{}' is corrupt: length {} is not a multiple of page size {}",
                path.display(),
                file_length,
                PAGE_SIZE
            ));
        }

        let num_pages = (file_length / PAGE_SIZE as u64) as u32;
        debug!(path = %path.display(), num_pages, "opened pager");

        Ok(Pager {
            file,
            file_length,
            num_pages,
            pages: heapless::Vec::new(),
        })
    }

    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }

    /// The page number that would be allocated by the next new node.
    pub fn unused_page_num(&self) -> u32 {
        self.num_pages
    }

    pub fn get_page(&mut self, page_num: u32) -> Result<&mut Page, Error> {
        if page_num as usize >= TABLE_MAX_PAGES {
            return Err(err!(
                Storage,
                "page {} exceeds cache capacity of {} pages",
                page_num,
                TABLE_MAX_PAGES
            ));
        }

        let persisted_pages = (self.file_length / PAGE_SIZE as u64) as u32;
        while self.pages.len() as u32 <= page_num {
            let idx = self.pages.len() as u32;
            let mut page = Page::zeroed();
            if idx < persisted_pages {
                self.file.seek(SeekFrom::Start(idx as u64 * PAGE_SIZE as u64))?;
                // A short read leaves the remainder of `page.data` at its
                // zeroed default, which is how freshly allocated pages are
                // represented on disk.
                self.file.read(&mut page.data)?;
                trace!(page = idx, "hydrated page from disk");
            }
            self.pages
                .push(page)
                .map_err(|_| err!(Storage, "page cache full at {} pages", TABLE_MAX_PAGES))?;
            self.num_pages = self.num_pages.max(idx + 1);
        }

        Ok(&mut self.pages[page_num as usize])
    }

    pub fn flush(&mut self, page_num: u32) -> Result<(), Error> {
        if page_num as usize >= self.pages.len() {
            return Err(err!(Storage, "cannot flush unallocated page {}", page_num));
        }
        self.file
            .seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))?;
        self.file.write_all(&self.pages[page_num as usize].data)?;
        Ok(())
    }

    pub fn close(mut self) -> Result<(), Error> {
        let resident = self.pages.len() as u32;
        for page_num in 0..resident {
            self.flush(page_num)?;
        }
        self.file.flush()?;
        info!(pages = resident, "flushed pager on close");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_file_has_no_pages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.db");
        let pager = Pager::open(&path).unwrap();
        assert_eq!(pager.num_pages(), 0);
        assert_eq!(pager.unused_page_num(), 0);
    }

    #[test]
    fn get_page_allocates_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.db");
        let mut pager = Pager::open(&path).unwrap();

        pager.get_page(0).unwrap().data[5] = 42;
        assert_eq!(pager.num_pages(), 1);
        assert_eq!(pager.get_page(0).unwrap().data[5], 42);
    }

    #[test]
    fn rejects_page_beyond_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.db");
        let mut pager = Pager::open(&path).unwrap();
        assert!(pager.get_page(TABLE_MAX_PAGES as u32).is_err());
    }

    #[test]
    fn rejects_non_page_aligned_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.db");
        std::fs::write(&path, vec![0u8; PAGE_SIZE + 1]).unwrap();
        assert!(Pager::open(&path).is_err());
    }

    #[test]
    fn close_persists_resident_pages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.db");
        {
            let mut pager = Pager::open(&path).unwrap();
            pager.get_page(0).unwrap().data[0] = 7;
            pager.close().unwrap();
        }
        let len = std::fs::metadata(&path).unwrap().len();
        assert_eq!(len, PAGE_SIZE as u64);

        let mut reopened = Pager::open(&path).unwrap();
        assert_eq!(reopened.get_page(0).unwrap().data[0], 7);
    }
}
