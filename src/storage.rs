//! Storage layer of the slotted-page graph store.
//!
//! Key components:
//!
//! - **PageSchema**: Page size and the byte width of every stored integer
//! - **SlottedPage / PageBuilder**: Adjacency lists packed into fixed-size pages
//! - **RidTable**: Directory from vertex ids to (page, slot) locations
//! - **PageFile / PageDbInfo**: The page file and its metadata sidecar
//! - **Replacer**: Page cache replacement policies for buffer pools built on top

pub mod buffer;
pub mod disk;
pub mod error;
pub mod page;
pub mod rid_table;

pub use buffer::{create_replacer, CachePolicy, Replacer, SharedReplacer};
pub use disk::{DbFiles, PageDbInfo, PageFile};
pub use error::{StorageError, StorageResult};
pub use page::{AdjElement, PageBuilder, PageId, PageKind, PageSchema, Slot, SlottedPage};
pub use rid_table::{RidTable, RidTuple};
