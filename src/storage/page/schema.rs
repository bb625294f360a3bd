//! Page schema: the static layout parameters shared by every page of a database.
//!
//! A schema fixes the page size and the byte width of every integer stored in a
//! page. All integers are little-endian. Payloads are optional; a schema without
//! an edge payload width stores bare `(page id, slot offset)` elements.
//!
//! ```text
//! slot    = | vertex_id | record_offset | vertex_payload? |
//! element = | page_id   | slot_offset   | edge_payload?   |
//! footer  = | reserved u32 | flags u32 | front | rear |
//! ```

use crate::storage::error::{StorageError, StorageResult};
use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

/// Bytes taken by the reserved word and the flags word of the footer.
const FOOTER_FIXED_SIZE: usize = 8;

/// Layout parameters of a slotted page database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSchema {
    /// Total page size in bytes, footer included.
    pub page_size: usize,
    /// Width of a vertex id inside a slot.
    pub vertex_id_width: usize,
    /// Width of the destination page id inside an adjacency element.
    pub page_id_width: usize,
    /// Width of the destination slot offset inside an adjacency element.
    pub slot_offset_width: usize,
    /// Width of a slot's record offset into the heap.
    pub record_offset_width: usize,
    /// Width of the adjacency list length field.
    pub record_size_width: usize,
    /// Width of the footer's front and rear cursors.
    pub offset_width: usize,
    /// Width of the per-edge payload, if edges carry one.
    pub edge_payload_width: Option<usize>,
    /// Width of the per-vertex payload, if vertices carry one.
    pub vertex_payload_width: Option<usize>,
}

impl Default for PageSchema {
    fn default() -> Self {
        Self {
            page_size: 64 * 1024,
            vertex_id_width: 4,
            page_id_width: 4,
            slot_offset_width: 2,
            record_offset_width: 4,
            record_size_width: 4,
            offset_width: 4,
            edge_payload_width: None,
            vertex_payload_width: None,
        }
    }
}

impl PageSchema {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_vertex_id_width(mut self, width: usize) -> Self {
        self.vertex_id_width = width;
        self
    }

    pub fn with_page_id_width(mut self, width: usize) -> Self {
        self.page_id_width = width;
        self
    }

    pub fn with_slot_offset_width(mut self, width: usize) -> Self {
        self.slot_offset_width = width;
        self
    }

    pub fn with_record_offset_width(mut self, width: usize) -> Self {
        self.record_offset_width = width;
        self
    }

    pub fn with_record_size_width(mut self, width: usize) -> Self {
        self.record_size_width = width;
        self
    }

    pub fn with_offset_width(mut self, width: usize) -> Self {
        self.offset_width = width;
        self
    }

    pub fn with_edge_payload_width(mut self, width: Option<usize>) -> Self {
        self.edge_payload_width = width;
        self
    }

    pub fn with_vertex_payload_width(mut self, width: Option<usize>) -> Self {
        self.vertex_payload_width = width;
        self
    }

    /// Check that every width is encodable and that a page can hold at least
    /// one slot with a one-element list.
    pub fn validate(&self) -> StorageResult<()> {
        let widths = [
            ("vertex_id_width", Some(self.vertex_id_width)),
            ("page_id_width", Some(self.page_id_width)),
            ("slot_offset_width", Some(self.slot_offset_width)),
            ("record_offset_width", Some(self.record_offset_width)),
            ("record_size_width", Some(self.record_size_width)),
            ("offset_width", Some(self.offset_width)),
            ("edge_payload_width", self.edge_payload_width),
            ("vertex_payload_width", self.vertex_payload_width),
        ];
        for (name, width) in widths {
            if let Some(w) = width {
                if !(1..=8).contains(&w) {
                    return Err(StorageError::InvalidSchema(format!(
                        "{} must be between 1 and 8 bytes, got {}",
                        name, w
                    )));
                }
            }
        }

        if self.page_size <= self.footer_size() {
            return Err(StorageError::InvalidSchema(format!(
                "page size {} does not exceed footer size {}",
                self.page_size,
                self.footer_size()
            )));
        }

        let data = self.data_section_size();
        let minimum = self.slot_size() + self.record_size_width + self.element_size();
        if data < minimum {
            return Err(StorageError::InvalidSchema(format!(
                "data section of {} bytes cannot hold a slot with one element ({} bytes)",
                data, minimum
            )));
        }

        if data as u64 > max_uint(self.offset_width) {
            return Err(StorageError::InvalidSchema(format!(
                "data section size {} overflows {}-byte cursors",
                data, self.offset_width
            )));
        }
        if (data - 1) as u64 > max_uint(self.record_offset_width) {
            return Err(StorageError::InvalidSchema(format!(
                "data section size {} overflows {}-byte record offsets",
                data, self.record_offset_width
            )));
        }

        Ok(())
    }

    pub fn footer_size(&self) -> usize {
        FOOTER_FIXED_SIZE + 2 * self.offset_width
    }

    pub fn data_section_size(&self) -> usize {
        self.page_size - self.footer_size()
    }

    pub fn slot_size(&self) -> usize {
        self.vertex_id_width + self.record_offset_width + self.vertex_payload_width.unwrap_or(0)
    }

    pub fn element_size(&self) -> usize {
        self.page_id_width + self.slot_offset_width + self.edge_payload_width.unwrap_or(0)
    }

    /// Width of the adjacency list length field.
    pub fn length_size(&self) -> usize {
        self.record_size_width
    }

    /// Elements that fit on a page hosting a single slot with a length field.
    pub fn max_edges_head(&self) -> usize {
        (self.data_section_size() - self.slot_size() - self.length_size()) / self.element_size()
    }

    /// Elements that fit on an extension page (single slot, no length field).
    pub fn max_edges_ext(&self) -> usize {
        (self.data_section_size() - self.slot_size()) / self.element_size()
    }

    /// Number of extension pages needed by a vertex with `num_edges` edges.
    /// Zero for vertices that fit on a small page.
    pub fn extension_pages_for(&self, num_edges: usize) -> usize {
        let head = self.max_edges_head();
        if num_edges <= head {
            return 0;
        }
        (num_edges - head).div_ceil(self.max_edges_ext())
    }

    /// Maximum number of slots one page may host, bounded by the slot offset width.
    pub fn max_slots(&self) -> u64 {
        max_uint(self.slot_offset_width).saturating_add(1)
    }

    pub fn max_vertex_id(&self) -> u64 {
        max_uint(self.vertex_id_width)
    }

    pub fn max_page_id(&self) -> u64 {
        max_uint(self.page_id_width)
    }

    pub fn max_list_len(&self) -> u64 {
        max_uint(self.record_size_width)
    }

    pub fn has_edge_payload(&self) -> bool {
        self.edge_payload_width.is_some()
    }

    pub fn has_vertex_payload(&self) -> bool {
        self.vertex_payload_width.is_some()
    }
}

/// Largest value representable in `width` bytes.
pub fn max_uint(width: usize) -> u64 {
    if width >= 8 {
        u64::MAX
    } else {
        (1u64 << (8 * width)) - 1
    }
}

pub(crate) fn get_uint(buf: &[u8], offset: usize, width: usize) -> u64 {
    LittleEndian::read_uint(&buf[offset..offset + width], width)
}

pub(crate) fn put_uint(buf: &mut [u8], offset: usize, value: u64, width: usize) {
    LittleEndian::write_uint(&mut buf[offset..offset + width], value, width);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> PageSchema {
        // slot = 1 + 1, element = 1 + 1, length = 1
        PageSchema::default()
            .with_page_size(64)
            .with_vertex_id_width(1)
            .with_page_id_width(1)
            .with_slot_offset_width(1)
            .with_record_offset_width(1)
            .with_record_size_width(1)
            .with_offset_width(4)
    }

    #[test]
    fn test_default_schema_is_valid() {
        assert!(PageSchema::default().validate().is_ok());
    }

    #[test]
    fn test_derived_sizes() {
        let schema = tiny();
        assert_eq!(schema.footer_size(), 16);
        assert_eq!(schema.data_section_size(), 48);
        assert_eq!(schema.slot_size(), 2);
        assert_eq!(schema.element_size(), 2);
        assert_eq!(schema.max_edges_head(), (48 - 2 - 1) / 2);
        assert_eq!(schema.max_edges_ext(), (48 - 2) / 2);
        assert_eq!(schema.max_slots(), 256);
    }

    #[test]
    fn test_payload_widths_change_sizes() {
        let schema = tiny()
            .with_edge_payload_width(Some(1))
            .with_vertex_payload_width(Some(2));
        assert_eq!(schema.slot_size(), 4);
        assert_eq!(schema.element_size(), 3);
        assert!(schema.has_edge_payload());
        assert!(schema.has_vertex_payload());
    }

    #[test]
    fn test_extension_pages_for() {
        let schema = tiny();
        let head = schema.max_edges_head();
        let ext = schema.max_edges_ext();
        assert_eq!(schema.extension_pages_for(head), 0);
        assert_eq!(schema.extension_pages_for(head + 1), 1);
        assert_eq!(schema.extension_pages_for(head + ext), 1);
        assert_eq!(schema.extension_pages_for(head + ext + 1), 2);
    }

    #[test]
    fn test_rejects_bad_widths() {
        assert!(tiny().with_vertex_id_width(0).validate().is_err());
        assert!(tiny().with_page_id_width(9).validate().is_err());
        assert!(tiny().with_edge_payload_width(Some(0)).validate().is_err());
    }

    #[test]
    fn test_rejects_tiny_pages() {
        assert!(tiny().with_page_size(16).validate().is_err());
        assert!(tiny().with_page_size(20).validate().is_err());
    }

    #[test]
    fn test_rejects_unencodable_cursors() {
        // 1-byte cursors cannot address a 1000-byte data section.
        let schema = tiny().with_page_size(1000).with_offset_width(1);
        assert!(schema.validate().is_err());
        let schema = tiny().with_page_size(1000).with_offset_width(2);
        assert!(schema.validate().is_err(), "record offsets are 1 byte");
    }

    #[test]
    fn test_uint_codec_is_little_endian() {
        let mut buf = [0u8; 8];
        put_uint(&mut buf, 1, 0x0A0B0C, 3);
        assert_eq!(buf[1..4], [0x0C, 0x0B, 0x0A]);
        assert_eq!(get_uint(&buf, 1, 3), 0x0A0B0C);
        assert_eq!(max_uint(1), 255);
        assert_eq!(max_uint(8), u64::MAX);
    }
}
