//! Mutation side of a slotted page.
//!
//! `scan` and `scan_extension` are the only capacity probes. A successful probe
//! arms the builder for exactly one `add_slot*` call; the list writers that
//! follow do no capacity negotiation of their own. Callers size their lists from
//! the returned [`Scan`] and the schema's head/extension capacities. Broken
//! preconditions panic instead of writing past the heap.

use crate::storage::page::schema::PageSchema;
use crate::storage::page::slotted_page::{AdjElement, PageKind, Slot, SlottedPage};
use bytes::Bytes;
use std::ops::Deref;

/// Result of a successful capacity probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scan {
    /// Bytes left for elements once the slot (and length field) is placed.
    pub available: usize,
    /// Elements that fit in `available`.
    pub capacity: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Armed {
    Small,
    Extension,
}

#[derive(Debug, Clone)]
pub struct PageBuilder {
    page: SlottedPage,
    armed: Option<Armed>,
}

impl PageBuilder {
    pub fn new(schema: PageSchema) -> Self {
        Self {
            page: SlottedPage::new(schema),
            armed: None,
        }
    }

    /// Probe for one more slot with a length-prefixed record.
    pub fn scan(&mut self) -> Option<Scan> {
        let schema = *self.page.schema();
        if self.page.number_of_slots() as u64 >= schema.max_slots() {
            return None;
        }
        let needed = schema.slot_size() + schema.length_size();
        let available = self.page.free_space().checked_sub(needed)?;
        self.armed = Some(Armed::Small);
        Some(Scan {
            available,
            capacity: available / schema.element_size(),
        })
    }

    /// Probe for the single slot of an extension page. Only succeeds on an empty page.
    pub fn scan_extension(&mut self) -> Option<Scan> {
        if !self.page.is_empty() {
            return None;
        }
        let schema = *self.page.schema();
        let available = self.page.free_space().checked_sub(schema.slot_size())?;
        self.armed = Some(Armed::Extension);
        Some(Scan {
            available,
            capacity: available / schema.element_size(),
        })
    }

    /// Append a slot whose record starts with an (initially zero) length field.
    /// Returns the new slot's index.
    pub fn add_slot(&mut self, vertex_id: u64, vertex_payload: Option<u64>) -> usize {
        let armed = self.armed.take();
        assert_eq!(
            armed,
            Some(Armed::Small),
            "add_slot for vertex {} without a successful scan",
            vertex_id
        );
        let length_size = self.page.schema().length_size();
        let slot_size = self.page.schema().slot_size();
        assert!(
            self.page.front() + slot_size + length_size <= self.page.rear(),
            "slot and length field for vertex {} overlap the record heap",
            vertex_id
        );
        let index = self.push_slot(vertex_id, vertex_payload);
        let front = self.page.front();
        self.page.write_length(front, 0);
        self.page.set_front(front + length_size);
        index
    }

    /// Append the single slot of an extension page. Its record has no length field.
    pub fn add_slot_extension(&mut self, vertex_id: u64, vertex_payload: Option<u64>) -> usize {
        let armed = self.armed.take();
        assert_eq!(
            armed,
            Some(Armed::Extension),
            "add_slot_extension for vertex {} without a successful scan_extension",
            vertex_id
        );
        self.push_slot(vertex_id, vertex_payload)
    }

    fn push_slot(&mut self, vertex_id: u64, vertex_payload: Option<u64>) -> usize {
        let slot_size = self.page.schema().slot_size();
        let index = self.page.number_of_slots();
        let (front, rear) = (self.page.front(), self.page.rear());
        assert!(
            front + slot_size <= rear,
            "slot for vertex {} overlaps the record heap",
            vertex_id
        );
        self.page.set_rear(rear - slot_size);
        self.page.write_slot(
            index,
            &Slot {
                vertex_id,
                record_offset: front,
                vertex_payload,
            },
        );
        index
    }

    /// Write the complete adjacency list of a small-page slot.
    pub fn add_list_small(&mut self, slot: usize, elements: &[AdjElement]) {
        let start = self.open_record(slot);
        self.write_record(elements.len() as u64, start, elements.len());
        self.write_elements(start, elements);
    }

    /// Write the head page's total list length and the elements embedded in it.
    pub fn add_list_head(&mut self, total_len: u64, elements: &[AdjElement]) {
        let start = self.open_single_record("add_list_head");
        self.write_record(total_len, start, elements.len());
        self.write_elements(start, elements);
    }

    /// Append elements to an extension page's record.
    pub fn add_list_extension(&mut self, elements: &[AdjElement]) {
        let start = self.extension_tail();
        self.advance_front(start, elements.len());
        self.write_elements(start, elements);
    }

    /// Like [`add_list_small`](Self::add_list_small) without element contents.
    pub fn reserve_list_small(&mut self, slot: usize, count: usize) {
        let start = self.open_record(slot);
        self.write_record(count as u64, start, count);
    }

    /// Like [`add_list_head`](Self::add_list_head) without element contents.
    pub fn reserve_list_head(&mut self, total_len: u64, count: usize) {
        let start = self.open_single_record("reserve_list_head");
        self.write_record(total_len, start, count);
    }

    /// Like [`add_list_extension`](Self::add_list_extension) without element contents.
    pub fn reserve_list_extension(&mut self, count: usize) {
        let start = self.extension_tail();
        self.advance_front(start, count);
    }

    /// Stamp the page kind, hand the bytes off and start a fresh page.
    pub fn issue(&mut self, kind: PageKind) -> Bytes {
        self.page.set_flags(kind.flag());
        let bytes = Bytes::copy_from_slice(self.page.as_bytes());
        self.clear();
        bytes
    }

    /// Drop the page under construction.
    pub fn clear(&mut self) {
        self.page.clear();
        self.page.set_flags(0);
        self.armed = None;
    }

    /// Start of the element area of `slot`'s record, which must be the last
    /// record on the heap and still be empty.
    fn open_record(&self, slot: usize) -> usize {
        let record = self.page.slot(slot).unwrap_or_else(|e| panic!("{}", e));
        let start = record.record_offset + self.page.schema().length_size();
        assert_eq!(
            start,
            self.page.front(),
            "record of slot {} (vertex {}) is not at the heap tail",
            slot,
            record.vertex_id
        );
        start
    }

    fn open_single_record(&self, op: &str) -> usize {
        assert_eq!(
            self.page.number_of_slots(),
            1,
            "{} requires a page with exactly one slot",
            op
        );
        self.open_record(0)
    }

    fn extension_tail(&self) -> usize {
        assert_eq!(
            self.page.number_of_slots(),
            1,
            "extension lists require a page with exactly one slot"
        );
        self.page.front()
    }

    fn write_record(&mut self, length: u64, start: usize, count: usize) {
        let schema = *self.page.schema();
        assert!(
            length <= schema.max_list_len(),
            "list length {} does not fit {} bytes",
            length,
            schema.record_size_width
        );
        let record_offset = start - schema.length_size();
        self.advance_front(start, count);
        self.page.write_length(record_offset, length);
    }

    fn advance_front(&mut self, start: usize, count: usize) {
        let end = start + count * self.page.schema().element_size();
        assert!(
            end <= self.page.rear(),
            "{} elements overflow into the slot directory (front {} > rear {})",
            count,
            end,
            self.page.rear()
        );
        self.page.set_front(end);
    }

    fn write_elements(&mut self, start: usize, elements: &[AdjElement]) {
        let elem = self.page.schema().element_size();
        for (i, element) in elements.iter().enumerate() {
            self.page.write_element(start + i * elem, element);
        }
    }
}

impl Deref for PageBuilder {
    type Target = SlottedPage;

    fn deref(&self) -> &SlottedPage {
        &self.page
    }
}
