//! Generator error types.

use crate::storage::error::StorageError;
use crate::storage::page::{PageId, PageKind};
use thiserror::Error;

/// Errors that abort a page database build.
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Edge set is empty")]
    EmptyEdgeSet,

    #[error("Edges are not sorted by source: vertex {current} follows vertex {previous}")]
    UnsortedEdges { previous: u64, current: u64 },

    #[error("Edge batch for vertex {expected} contains an edge of vertex {found}")]
    MixedSourceBatch { expected: u64, found: u64 },

    #[error("Vertex id {vid} does not fit in {width} bytes")]
    VertexIdOverflow { vid: u64, width: usize },

    #[error("Vertex {vid} has {len} edges, more than {width}-byte list lengths can hold")]
    ListTooLong { vid: u64, len: usize, width: usize },

    #[error("Page id {page_id} does not fit in {width} bytes")]
    PageIdOverflow { page_id: PageId, width: usize },

    #[error("Payload {value} of vertex {vid} does not fit in {width} bytes")]
    PayloadOverflow { vid: u64, value: u64, width: usize },

    #[error("Destination vertex {0} is not covered by the RID table")]
    UnresolvedVertex(u64),

    #[error("Page {page_id} does not match the RID table ({expected:?} expected, {found} issued): {reason}")]
    RidTableMismatch {
        page_id: PageId,
        expected: Option<PageKind>,
        found: PageKind,
        reason: String,
    },

    #[error("Generated {written} pages but the RID table lists {expected}")]
    PageCountMismatch { written: u64, expected: usize },

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for generator operations.
pub type GeneratorResult<T> = Result<T, GeneratorError>;
