//! Slotted page format for adjacency lists.
//!
//! ```text
//! +-------------------------------------------------------------+
//! | S0 length | S0 elem #0 | S0 elem #1 | ... | S1 length | S1  |
//! | elem #0 | ...                                               |
//! |                      free space                             |
//! |                               | slot #1 | slot #0 | footer  |
//! +-------------------------------------------------------------+
//! ```
//!
//! Records grow forward from offset 0 (`front`), the slot directory grows
//! backward from the end of the data section (`rear`). Slot `i` lives at
//! `data_section_size - slot_size * (i + 1)`, so slot 0 is the first slot
//! appended. A slot's record offset is the only link between a slot and its
//! record.
//!
//! Small pages host many vertices, each record being `[length][elements]`.
//! A large vertex spans one head page (`[total length][elements]`) followed by
//! extension pages (`[elements]`, length implied by `front`). Head and extension
//! pages always host exactly one slot.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::schema::{get_uint, put_uint, PageSchema};
use crate::storage::page::PageId;
use std::fmt;

const RESERVED_OFFSET: usize = 0;
const FLAGS_OFFSET: usize = 4;
const FRONT_OFFSET: usize = 8;

pub const FLAG_SMALL: u32 = 0x1;
pub const FLAG_LARGE_HEAD: u32 = 0x2;
pub const FLAG_LARGE_EXTENSION: u32 = 0x4;

/// Role of a finished page. Exactly one flag is set on an issued page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKind {
    Small,
    LargeHead,
    LargeExtension,
}

impl PageKind {
    pub fn flag(self) -> u32 {
        match self {
            PageKind::Small => FLAG_SMALL,
            PageKind::LargeHead => FLAG_LARGE_HEAD,
            PageKind::LargeExtension => FLAG_LARGE_EXTENSION,
        }
    }

    pub fn from_flags(flags: u32) -> Option<Self> {
        match flags {
            FLAG_SMALL => Some(PageKind::Small),
            FLAG_LARGE_HEAD => Some(PageKind::LargeHead),
            FLAG_LARGE_EXTENSION => Some(PageKind::LargeExtension),
            _ => None,
        }
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageKind::Small => write!(f, "small"),
            PageKind::LargeHead => write!(f, "large (head)"),
            PageKind::LargeExtension => write!(f, "large (extension)"),
        }
    }
}

/// A decoded slot directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub vertex_id: u64,
    /// Byte offset of the slot's record inside the data section.
    pub record_offset: usize,
    pub vertex_payload: Option<u64>,
}

/// One edge resolved to the physical address of its destination vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjElement {
    pub page_id: PageId,
    pub slot_offset: u64,
    pub payload: Option<u64>,
}

/// A fixed-size page image plus the schema needed to decode it.
#[derive(Clone)]
pub struct SlottedPage {
    schema: PageSchema,
    data: Box<[u8]>,
}

impl SlottedPage {
    /// Create an empty, unflagged page. The schema must already be validated.
    pub fn new(schema: PageSchema) -> Self {
        debug_assert!(schema.validate().is_ok(), "invalid schema {:?}", schema);
        let mut page = Self {
            schema,
            data: vec![0u8; schema.page_size].into_boxed_slice(),
        };
        page.set_rear(schema.data_section_size());
        page
    }

    /// Decode a page image read from storage, checking its footer.
    pub fn from_bytes(schema: PageSchema, bytes: &[u8]) -> StorageResult<Self> {
        if bytes.len() != schema.page_size {
            return Err(StorageError::PageSizeMismatch {
                expected: schema.page_size,
                actual: bytes.len(),
            });
        }

        let page = Self {
            schema,
            data: bytes.to_vec().into_boxed_slice(),
        };

        let data_size = schema.data_section_size();
        let (front, rear) = (page.front(), page.rear());
        if front > rear || rear > data_size {
            return Err(StorageError::CorruptPage(format!(
                "cursor order violated: front={} rear={} data_section={}",
                front, rear, data_size
            )));
        }
        if (data_size - rear) % schema.slot_size() != 0 {
            return Err(StorageError::CorruptPage(format!(
                "slot directory of {} bytes is not a multiple of slot size {}",
                data_size - rear,
                schema.slot_size()
            )));
        }
        if page.flags() != 0 && page.kind().is_none() {
            return Err(StorageError::CorruptPage(format!(
                "unknown page flags {:#x}",
                page.flags()
            )));
        }

        Ok(page)
    }

    pub fn schema(&self) -> &PageSchema {
        &self.schema
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn flags(&self) -> u32 {
        self.footer_u32(FLAGS_OFFSET)
    }

    pub(crate) fn set_flags(&mut self, flags: u32) {
        let pos = self.schema.data_section_size() + FLAGS_OFFSET;
        put_uint(&mut self.data, pos, flags as u64, 4);
    }

    /// Role of the page, or `None` while it is still under construction.
    pub fn kind(&self) -> Option<PageKind> {
        PageKind::from_flags(self.flags())
    }

    /// First free byte of the record heap.
    pub fn front(&self) -> usize {
        let pos = self.schema.data_section_size() + FRONT_OFFSET;
        get_uint(&self.data, pos, self.schema.offset_width) as usize
    }

    pub(crate) fn set_front(&mut self, front: usize) {
        let pos = self.schema.data_section_size() + FRONT_OFFSET;
        put_uint(&mut self.data, pos, front as u64, self.schema.offset_width);
    }

    /// Start of the slot directory.
    pub fn rear(&self) -> usize {
        let pos = self.schema.data_section_size() + FRONT_OFFSET + self.schema.offset_width;
        get_uint(&self.data, pos, self.schema.offset_width) as usize
    }

    pub(crate) fn set_rear(&mut self, rear: usize) {
        let pos = self.schema.data_section_size() + FRONT_OFFSET + self.schema.offset_width;
        put_uint(&mut self.data, pos, rear as u64, self.schema.offset_width);
    }

    pub fn free_space(&self) -> usize {
        self.rear().saturating_sub(self.front())
    }

    pub fn number_of_slots(&self) -> usize {
        (self.schema.data_section_size() - self.rear()) / self.schema.slot_size()
    }

    pub(crate) fn slot_position(&self, index: usize) -> usize {
        self.schema.data_section_size() - self.schema.slot_size() * (index + 1)
    }

    /// Decode the `index`-th slot counted from the rear of the data section.
    pub fn slot(&self, index: usize) -> StorageResult<Slot> {
        let num_slots = self.number_of_slots();
        if index >= num_slots {
            return Err(StorageError::InvalidSlotId {
                slot_id: index,
                num_slots,
            });
        }

        let s = &self.schema;
        let pos = self.slot_position(index);
        let vertex_id = get_uint(&self.data, pos, s.vertex_id_width);
        let record_offset =
            get_uint(&self.data, pos + s.vertex_id_width, s.record_offset_width) as usize;
        let vertex_payload = s.vertex_payload_width.map(|w| {
            get_uint(
                &self.data,
                pos + s.vertex_id_width + s.record_offset_width,
                w,
            )
        });

        Ok(Slot {
            vertex_id,
            record_offset,
            vertex_payload,
        })
    }

    pub(crate) fn write_slot(&mut self, index: usize, slot: &Slot) {
        let s = self.schema;
        let pos = self.slot_position(index);
        put_uint(&mut self.data, pos, slot.vertex_id, s.vertex_id_width);
        put_uint(
            &mut self.data,
            pos + s.vertex_id_width,
            slot.record_offset as u64,
            s.record_offset_width,
        );
        if let Some(w) = s.vertex_payload_width {
            put_uint(
                &mut self.data,
                pos + s.vertex_id_width + s.record_offset_width,
                slot.vertex_payload.unwrap_or_default(),
                w,
            );
        }
    }

    pub(crate) fn write_length(&mut self, record_offset: usize, length: u64) {
        let width = self.schema.record_size_width;
        put_uint(&mut self.data, record_offset, length, width);
    }

    pub(crate) fn write_element(&mut self, pos: usize, element: &AdjElement) {
        let s = self.schema;
        put_uint(&mut self.data, pos, element.page_id.0, s.page_id_width);
        put_uint(
            &mut self.data,
            pos + s.page_id_width,
            element.slot_offset,
            s.slot_offset_width,
        );
        if let Some(w) = s.edge_payload_width {
            put_uint(
                &mut self.data,
                pos + s.page_id_width + s.slot_offset_width,
                element.payload.unwrap_or_default(),
                w,
            );
        }
    }

    fn read_element(&self, pos: usize) -> AdjElement {
        let s = &self.schema;
        AdjElement {
            page_id: PageId(get_uint(&self.data, pos, s.page_id_width)),
            slot_offset: get_uint(&self.data, pos + s.page_id_width, s.slot_offset_width),
            payload: s
                .edge_payload_width
                .map(|w| get_uint(&self.data, pos + s.page_id_width + s.slot_offset_width, w)),
        }
    }

    /// Whether records on this page start with a length field. Pages still
    /// under construction are read with the small-page layout.
    fn has_length_field(&self) -> bool {
        !self.is_large_extension()
    }

    /// Logical adjacency list length of a slot. For a head page this is the
    /// vertex's total degree across all of its pages.
    pub fn record_len(&self, index: usize) -> StorageResult<u64> {
        let slot = self.slot(index)?;
        if self.has_length_field() {
            self.check_record_bounds(slot.record_offset, self.schema.record_size_width)?;
            Ok(get_uint(
                &self.data,
                slot.record_offset,
                self.schema.record_size_width,
            ))
        } else {
            Ok(self.local_list_len(index)? as u64)
        }
    }

    /// Number of adjacency elements physically stored on this page for a slot.
    pub fn local_list_len(&self, index: usize) -> StorageResult<usize> {
        let slot = self.slot(index)?;
        let elem = self.schema.element_size();
        let front = self.front();
        match self.kind() {
            Some(PageKind::LargeHead) => {
                let start = slot.record_offset + self.schema.record_size_width;
                Ok(front.saturating_sub(start) / elem)
            }
            Some(PageKind::LargeExtension) => Ok(front.saturating_sub(slot.record_offset) / elem),
            _ => Ok(self.record_len(index)? as usize),
        }
    }

    /// Decode the adjacency elements stored on this page for a slot.
    pub fn list(&self, index: usize) -> StorageResult<Vec<AdjElement>> {
        let slot = self.slot(index)?;
        let count = self.local_list_len(index)?;
        let elem = self.schema.element_size();
        let header = if self.has_length_field() {
            self.schema.record_size_width
        } else {
            0
        };
        let start = slot.record_offset.checked_add(header).ok_or_else(|| {
            StorageError::CorruptPage(format!(
                "record offset {} of slot {} overflows",
                slot.record_offset, index
            ))
        })?;
        let len = count.checked_mul(elem).ok_or_else(|| {
            StorageError::CorruptPage(format!(
                "list of {} elements in slot {} overflows",
                count, index
            ))
        })?;
        self.check_record_bounds(start, len)?;

        Ok((0..count)
            .map(|i| self.read_element(start + i * elem))
            .collect())
    }

    fn check_record_bounds(&self, start: usize, len: usize) -> StorageResult<()> {
        match start.checked_add(len) {
            Some(end) if end <= self.front() => Ok(()),
            end => Err(StorageError::CorruptPage(format!(
                "record at {} with {} bytes extends past front {} (end {:?})",
                start,
                len,
                self.front(),
                end
            ))),
        }
    }

    pub fn is_small(&self) -> bool {
        self.flags() & FLAG_SMALL != 0
    }

    pub fn is_large_head(&self) -> bool {
        self.flags() & FLAG_LARGE_HEAD != 0
    }

    pub fn is_large_extension(&self) -> bool {
        self.flags() & FLAG_LARGE_EXTENSION != 0
    }

    pub fn is_empty(&self) -> bool {
        self.front() == 0 && self.rear() == self.schema.data_section_size()
    }

    /// Zero the data section and reset both cursors.
    pub fn clear(&mut self) {
        let data_size = self.schema.data_section_size();
        self.data[..data_size].fill(0);
        let reserved = data_size + RESERVED_OFFSET;
        self.data[reserved..reserved + 4].fill(0);
        self.set_front(0);
        self.set_rear(data_size);
    }

    fn footer_u32(&self, field: usize) -> u32 {
        get_uint(&self.data, self.schema.data_section_size() + field, 4) as u32
    }
}

impl PartialEq for SlottedPage {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for SlottedPage {}

impl fmt::Debug for SlottedPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlottedPage")
            .field("kind", &self.kind())
            .field("front", &self.front())
            .field("rear", &self.rear())
            .field("slots", &self.number_of_slots())
            .finish()
    }
}
