//! RID table: the directory from vertex ids to physical page locations.
//!
//! One tuple per page, in page order. A tuple records the first vertex id on its
//! page and a payload: 0 for a small page, `k` for the head page of a large
//! vertex spanning `k` extension pages, and `1..=k` for those extension pages.
//! Every tuple of a large vertex shares that vertex's id.
//!
//! On disk the table is a flat run of `{start_vid, payload}` records, the start
//! vertex id encoded at the schema's vertex-id width and the payload as a `u64`,
//! both little-endian.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{PageId, PageKind};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

const PAYLOAD_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RidTuple {
    pub start_vid: u64,
    pub payload: u64,
}

impl RidTuple {
    pub fn small(start_vid: u64) -> Self {
        Self {
            start_vid,
            payload: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RidTable {
    tuples: Vec<RidTuple>,
    vertex_count: u64,
}

impl RidTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(tuples: Vec<RidTuple>, vertex_count: u64) -> Self {
        Self {
            tuples,
            vertex_count,
        }
    }

    pub fn push(&mut self, tuple: RidTuple) {
        debug_assert!(
            self.tuples.last().map_or(true, |t| t.start_vid <= tuple.start_vid),
            "RID tuples must be pushed in vertex order"
        );
        self.tuples.push(tuple);
    }

    pub fn set_vertex_count(&mut self, vertex_count: u64) {
        self.vertex_count = vertex_count;
    }

    /// Number of vertices covered by the table (`max vertex id + 1`).
    pub fn vertex_count(&self) -> u64 {
        self.vertex_count
    }

    /// Number of pages in the database.
    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn tuples(&self) -> &[RidTuple] {
        &self.tuples
    }

    pub fn get(&self, page_id: PageId) -> Option<&RidTuple> {
        self.tuples.get(page_id.0 as usize)
    }

    /// Resolve a vertex id to the page holding its slot and the slot's offset on
    /// that page. Large vertices resolve to their head page.
    pub fn resolve(&self, vid: u64) -> Option<(PageId, u64)> {
        if vid >= self.vertex_count {
            return None;
        }
        let idx = self.tuples.partition_point(|t| t.start_vid <= vid);
        let last = idx.checked_sub(1)?;
        // The last tuple of a large vertex is its k-th extension, k pages past the head.
        let page = last.checked_sub(self.tuples[last].payload as usize)?;
        let slot_offset = vid - self.tuples[page].start_vid;
        Some((PageId(page as u64), slot_offset))
    }

    /// Inverse of [`resolve`](Self::resolve): the vertex stored at a slot.
    pub fn vertex_at(&self, page_id: PageId, slot_offset: u64) -> Option<u64> {
        let vid = self.get(page_id)?.start_vid.checked_add(slot_offset)?;
        (self.resolve(vid) == Some((page_id, slot_offset))).then_some(vid)
    }

    /// Page kind implied by the tuple at `page_id`.
    pub fn kind_of(&self, page_id: PageId) -> Option<PageKind> {
        let idx = page_id.0 as usize;
        let tuple = self.tuples.get(idx)?;
        if tuple.payload == 0 {
            return Some(PageKind::Small);
        }
        let starts_run = idx == 0 || self.tuples[idx - 1].start_vid != tuple.start_vid;
        if starts_run {
            Some(PageKind::LargeHead)
        } else {
            Some(PageKind::LargeExtension)
        }
    }

    pub fn count_of(&self, kind: PageKind) -> usize {
        (0..self.tuples.len())
            .filter(|&i| self.kind_of(PageId(i as u64)) == Some(kind))
            .count()
    }

    pub fn write_to<W: Write>(&self, writer: &mut W, vertex_id_width: usize) -> StorageResult<()> {
        for tuple in &self.tuples {
            writer.write_uint::<LittleEndian>(tuple.start_vid, vertex_id_width)?;
            writer.write_u64::<LittleEndian>(tuple.payload)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Read a table written by [`write_to`](Self::write_to) and check that its
    /// tuples describe a well-formed page sequence.
    pub fn read_from<R: Read>(
        reader: &mut R,
        vertex_id_width: usize,
        vertex_count: u64,
    ) -> StorageResult<Self> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;

        let tuple_size = vertex_id_width + PAYLOAD_SIZE;
        if buf.len() % tuple_size != 0 {
            return Err(StorageError::CorruptRidTable(format!(
                "{} bytes is not a multiple of the {}-byte tuple size",
                buf.len(),
                tuple_size
            )));
        }

        let mut cursor = buf.as_slice();
        let mut tuples = Vec::with_capacity(buf.len() / tuple_size);
        while !cursor.is_empty() {
            let start_vid = cursor.read_uint::<LittleEndian>(vertex_id_width)?;
            let payload = cursor.read_u64::<LittleEndian>()?;
            tuples.push(RidTuple { start_vid, payload });
        }

        let table = Self::from_parts(tuples, vertex_count);
        table.check()?;
        Ok(table)
    }

    fn check(&self) -> StorageResult<()> {
        let mut idx = 0;
        while idx < self.tuples.len() {
            let tuple = self.tuples[idx];
            if let Some(prev) = idx.checked_sub(1).map(|i| self.tuples[i]) {
                if prev.start_vid >= tuple.start_vid {
                    return Err(StorageError::CorruptRidTable(format!(
                        "page {} starts at vertex {} after a page starting at {}",
                        idx, tuple.start_vid, prev.start_vid
                    )));
                }
            }
            if tuple.start_vid >= self.vertex_count.max(1) {
                return Err(StorageError::CorruptRidTable(format!(
                    "page {} starts at vertex {} beyond vertex count {}",
                    idx, tuple.start_vid, self.vertex_count
                )));
            }

            let extensions = tuple.payload as usize;
            for j in 1..=extensions {
                match self.tuples.get(idx + j) {
                    Some(ext) if ext.start_vid == tuple.start_vid && ext.payload == j as u64 => {}
                    _ => {
                        return Err(StorageError::CorruptRidTable(format!(
                            "head page {} is missing extension page {}",
                            idx, j
                        )))
                    }
                }
            }
            idx += extensions + 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn large(start_vid: u64, k: u64) -> Vec<RidTuple> {
        (0..=k)
            .map(|j| RidTuple {
                start_vid,
                payload: if j == 0 { k } else { j },
            })
            .collect()
    }

    // pages: [0..=2 small] [3 head, ext, ext] [4..=6 small] [7 head, ext]
    fn sample() -> RidTable {
        let mut tuples = vec![RidTuple::small(0)];
        tuples.extend(large(3, 2));
        tuples.push(RidTuple::small(4));
        tuples.extend(large(7, 1));
        RidTable::from_parts(tuples, 8)
    }

    #[test]
    fn test_resolve_small_and_large() {
        let table = sample();
        assert_eq!(table.len(), 7);
        assert_eq!(table.resolve(0), Some((PageId(0), 0)));
        assert_eq!(table.resolve(2), Some((PageId(0), 2)));
        assert_eq!(table.resolve(3), Some((PageId(1), 0)));
        assert_eq!(table.resolve(4), Some((PageId(4), 0)));
        assert_eq!(table.resolve(6), Some((PageId(4), 2)));
        assert_eq!(table.resolve(7), Some((PageId(5), 0)));
        assert_eq!(table.resolve(8), None);
    }

    #[test]
    fn test_vertex_at_inverts_resolve() {
        let table = sample();
        for vid in 0..table.vertex_count() {
            let (page, slot) = table.resolve(vid).unwrap();
            assert_eq!(table.vertex_at(page, slot), Some(vid));
        }
        assert_eq!(table.vertex_at(PageId(1), 1), None);
        assert_eq!(table.vertex_at(PageId(0), 4), None);
        assert_eq!(table.vertex_at(PageId(4), 9), None);
    }

    #[test]
    fn test_resolve_on_empty_table() {
        assert_eq!(RidTable::new().resolve(0), None);
    }

    #[test]
    fn test_kind_of() {
        let table = sample();
        let kinds: Vec<_> = (0..table.len() as u64)
            .map(|i| table.kind_of(PageId(i)).unwrap())
            .collect();
        assert_eq!(
            kinds,
            vec![
                PageKind::Small,
                PageKind::LargeHead,
                PageKind::LargeExtension,
                PageKind::LargeExtension,
                PageKind::Small,
                PageKind::LargeHead,
                PageKind::LargeExtension,
            ]
        );
        assert_eq!(table.kind_of(PageId(7)), None);
        assert_eq!(table.count_of(PageKind::LargeExtension), 3);
    }

    #[test]
    fn test_write_and_read() -> Result<()> {
        let table = sample();
        let mut buf = Vec::new();
        table.write_to(&mut buf, 3)?;
        assert_eq!(buf.len(), table.len() * 11);
        // First tuple: start vid 0 on 3 bytes, payload 0 on 8 bytes.
        assert_eq!(&buf[..11], &[0u8; 11]);

        let read = RidTable::read_from(&mut buf.as_slice(), 3, 8)?;
        assert_eq!(read, table);
        Ok(())
    }

    #[test]
    fn test_read_rejects_truncated_table() -> Result<()> {
        let mut buf = Vec::new();
        sample().write_to(&mut buf, 4)?;
        buf.pop();
        assert!(matches!(
            RidTable::read_from(&mut buf.as_slice(), 4, 8),
            Err(StorageError::CorruptRidTable(_))
        ));
        Ok(())
    }

    #[test]
    fn test_read_rejects_broken_large_run() -> Result<()> {
        let mut tuples = large(0, 3);
        tuples.pop();
        let mut buf = Vec::new();
        RidTable::from_parts(tuples, 1).write_to(&mut buf, 4)?;
        assert!(RidTable::read_from(&mut buf.as_slice(), 4, 1).is_err());

        let mut buf = Vec::new();
        RidTable::from_parts(vec![RidTuple::small(2), RidTuple::small(1)], 3)
            .write_to(&mut buf, 4)?;
        assert!(RidTable::read_from(&mut buf.as_slice(), 4, 3).is_err());
        Ok(())
    }
}
