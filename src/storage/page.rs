pub mod builder;
pub mod schema;
pub mod slotted_page;

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageId(pub u64);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub use builder::{PageBuilder, Scan};
pub use schema::PageSchema;
pub use slotted_page::{AdjElement, PageKind, Slot, SlottedPage};
