//! Raw page-granular I/O over one table file.
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::{strata_debug_log, PAGE_SIZE};

/// Reads and writes whole pages of a single file.
#[derive(Debug)]
pub struct Pager {
    file: File,
    num_pages: u32,
}

impl Pager {
    /// Opens the file, creating it and its parent directories if they don't exist.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path_ref = path.as_ref();
        if let Some(parent) = path_ref.parent() {
            create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path_ref)?;

        let file_size = file.metadata()?.len();
        let num_pages = (file_size / PAGE_SIZE as u64) as u32;
        strata_debug_log!(
            "[Pager::open] {:?}: {} bytes, {} pages",
            path_ref,
            file_size,
            num_pages
        );

        Ok(Self { file, num_pages })
    }

    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }

    /// Reads page `page_no`, which must already exist in the file.
    pub fn read_page(&mut self, page_no: u32) -> io::Result<Vec<u8>> {
        if page_no >= self.num_pages {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("page {} is past the end of the file ({} pages)", page_no, self.num_pages),
            ));
        }
        let offset = page_no as u64 * PAGE_SIZE as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        let mut data = vec![0u8; PAGE_SIZE];
        self.file.read_exact(&mut data)?;
        strata_debug_log!("[Pager::read_page] page {}", page_no);
        Ok(data)
    }

    /// Overwrites page `page_no`, growing the file when it is the next page.
    pub fn write_page(&mut self, page_no: u32, data: &[u8]) -> io::Result<()> {
        if data.len() != PAGE_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("page image is {} bytes", data.len()),
            ));
        }
        if page_no > self.num_pages {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("page {} would leave a hole after {} pages", page_no, self.num_pages),
            ));
        }
        let offset = page_no as u64 * PAGE_SIZE as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)?;
        self.file.sync_data()?;
        if page_no == self.num_pages {
            self.num_pages += 1;
            strata_debug_log!("[Pager::write_page] grew to {} pages", self.num_pages);
        }
        Ok(())
    }
}
