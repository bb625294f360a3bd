use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{PageId, PageSchema, SlottedPage};
use bytes::BytesMut;
use log::debug;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// A flat file of fixed-size pages addressed by page id.
pub struct PageFile {
    file: File,
    page_size: usize,
}

impl PageFile {
    pub fn create(path: &Path, page_size: usize) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        Ok(Self { file, page_size })
    }

    pub fn open(path: &Path, page_size: usize) -> StorageResult<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let this = Self { file, page_size };

        let len = this.file.metadata()?.len();
        if len % page_size as u64 != 0 {
            return Err(StorageError::CorruptPage(format!(
                "{:?} is {} bytes, not a whole number of {}-byte pages",
                path, len, page_size
            )));
        }
        Ok(this)
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> StorageResult<()> {
        self.check_len(buf.len())?;
        if page_id.0 >= self.num_pages()? {
            return Err(StorageError::PageNotFound(page_id));
        }

        self.file.seek(SeekFrom::Start(self.page_offset(page_id)))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    pub fn write_page(&mut self, page_id: PageId, data: &[u8]) -> StorageResult<()> {
        self.check_len(data.len())?;

        let offset = self.page_offset(page_id);
        if offset > self.file.metadata()?.len() {
            self.file.set_len(offset)?;
        }
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)?;
        Ok(())
    }

    pub fn sync(&mut self) -> StorageResult<()> {
        self.file.sync_all()?;
        Ok(())
    }

    pub fn num_pages(&self) -> StorageResult<u64> {
        let file_size = self.file.metadata()?.len();
        Ok(file_size / self.page_size as u64)
    }

    /// Read and decode one page.
    pub fn read_slotted_page(
        &mut self,
        schema: &PageSchema,
        page_id: PageId,
    ) -> StorageResult<SlottedPage> {
        self.check_len(schema.page_size)?;
        let mut buf = vec![0u8; self.page_size];
        self.read_page(page_id, &mut buf)?;
        SlottedPage::from_bytes(*schema, &buf)
    }

    /// Read every page, `bundle_pages` pages per read.
    pub fn read_all(
        &mut self,
        schema: &PageSchema,
        bundle_pages: usize,
    ) -> StorageResult<Vec<SlottedPage>> {
        self.check_len(schema.page_size)?;
        let num_pages = self.num_pages()? as usize;
        let bundle_pages = bundle_pages.max(1);
        let mut pages = Vec::with_capacity(num_pages);
        let mut bundle = BytesMut::zeroed(bundle_pages * self.page_size);

        self.file.seek(SeekFrom::Start(0))?;
        while pages.len() < num_pages {
            let count = bundle_pages.min(num_pages - pages.len());
            let chunk = &mut bundle[..count * self.page_size];
            self.file.read_exact(chunk)?;
            for raw in chunk.chunks_exact(self.page_size) {
                pages.push(SlottedPage::from_bytes(*schema, raw)?);
            }
            debug!("read bundle of {} pages ({} / {})", count, pages.len(), num_pages);
        }
        Ok(pages)
    }

    fn check_len(&self, len: usize) -> StorageResult<()> {
        if len != self.page_size {
            return Err(StorageError::PageSizeMismatch {
                expected: self.page_size,
                actual: len,
            });
        }
        Ok(())
    }

    fn page_offset(&self, page_id: PageId) -> u64 {
        page_id.0 * self.page_size as u64
    }
}
