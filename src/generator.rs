//! Offline page database generation.
//!
//! A build reads a vertex-ordered edge stream twice:
//!
//! - **Pass 1** ([`RidTableGenerator`]): decides the page layout and produces the
//!   RID table, without writing any element.
//! - **Pass 2** ([`PageDbGenerator`]): replays the same layout, resolves every
//!   destination vertex through the RID table and streams the pages out.
//!
//! [`build_page_database`] runs both passes and writes the page file, the RID
//! table and the info sidecar under a common path prefix.

pub mod error;
pub mod pagedb_generator;
pub mod rid_table_generator;
pub mod source;
mod walk;

pub use error::{GeneratorError, GeneratorResult};
pub use pagedb_generator::{PageDbGenerator, PageDbSummary};
pub use rid_table_generator::RidTableGenerator;
pub use source::{
    Edge, EdgeBatch, EdgeFn, EdgeSource, SortedEdges, SortedVertices, TextEdgeReader,
    TextVertexReader, Vertex, VertexSource,
};

use crate::storage::disk::{DbFiles, PageDbInfo};
use crate::storage::page::PageSchema;
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Settings of a page database build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub schema: PageSchema,
    /// Pages buffered in memory before each write to the page file.
    pub bundle_pages: usize,
    /// Payload of vertices missing from the vertex source.
    pub default_vertex_payload: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            schema: PageSchema::default(),
            bundle_pages: 64,
            default_vertex_payload: 0,
        }
    }
}

impl GeneratorConfig {
    pub fn with_schema(mut self, schema: PageSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_bundle_pages(mut self, bundle_pages: usize) -> Self {
        self.bundle_pages = bundle_pages;
        self
    }

    pub fn with_default_vertex_payload(mut self, payload: u64) -> Self {
        self.default_vertex_payload = payload;
        self
    }
}

/// Run both passes over the edge stream produced by `open_edges` and write
/// `<prefix>.rid`, `<prefix>.pages` and `<prefix>.info`.
pub fn build_page_database<S, F>(
    config: &GeneratorConfig,
    mut open_edges: F,
    vertices: Option<&mut dyn VertexSource>,
    prefix: &Path,
) -> GeneratorResult<PageDbSummary>
where
    S: EdgeSource,
    F: FnMut() -> GeneratorResult<S>,
{
    let schema = config.schema;
    schema.validate()?;
    let files = DbFiles::from_prefix(prefix);

    info!("pass 1: building RID table for {:?}", prefix);
    let rid_table = RidTableGenerator::new(schema)?.generate(&mut open_edges()?)?;
    let mut rid_writer = BufWriter::new(File::create(&files.rid)?);
    rid_table.write_to(&mut rid_writer, schema.vertex_id_width)?;
    rid_writer.flush()?;

    info!("pass 2: writing {} pages to {:?}", rid_table.len(), files.pages);
    let sink = BufWriter::new(File::create(&files.pages)?);
    let (summary, _) = PageDbGenerator::new(schema, &rid_table, sink, config.bundle_pages)?
        .with_default_vertex_payload(config.default_vertex_payload)
        .generate(&mut open_edges()?, vertices)?;

    let name = prefix
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    PageDbInfo {
        name,
        num_pages: summary.num_pages,
        vertex_count: rid_table.vertex_count(),
        num_edges: summary.num_edges,
        schema,
    }
    .save(&files.info)?;

    Ok(summary)
}
