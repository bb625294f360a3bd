//! Second pass of a build: lays out the vertices exactly like the first pass,
//! this time writing every adjacency element resolved through the RID table,
//! and streams the finished pages to a sink.

use crate::generator::error::{GeneratorError, GeneratorResult};
use crate::generator::source::{Edge, EdgeSource, Vertex, VertexSource};
use crate::generator::walk::VertexWalk;
use crate::storage::page::schema::max_uint;
use crate::storage::page::{AdjElement, PageBuilder, PageId, PageKind, PageSchema};
use crate::storage::rid_table::RidTable;
use bytes::BytesMut;
use log::{debug, info, warn};
use std::io::Write;

/// Counts reported by a finished build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageDbSummary {
    pub num_pages: u64,
    pub small_pages: u64,
    pub head_pages: u64,
    pub extension_pages: u64,
    pub num_vertices: u64,
    pub num_edges: u64,
}

impl PageDbSummary {
    fn record(&mut self, kind: PageKind) {
        self.num_pages += 1;
        match kind {
            PageKind::Small => self.small_pages += 1,
            PageKind::LargeHead => self.head_pages += 1,
            PageKind::LargeExtension => self.extension_pages += 1,
        }
    }
}

pub struct PageDbGenerator<'t, W: Write> {
    schema: PageSchema,
    rid_table: &'t RidTable,
    builder: PageBuilder,
    sink: W,
    bundle: BytesMut,
    bundle_pages: usize,
    default_vertex_payload: u64,
    elements: Vec<AdjElement>,
    summary: PageDbSummary,
    dropped_edge_payloads: bool,
}

impl<'t, W: Write> PageDbGenerator<'t, W> {
    pub fn new(
        schema: PageSchema,
        rid_table: &'t RidTable,
        sink: W,
        bundle_pages: usize,
    ) -> GeneratorResult<Self> {
        schema.validate()?;
        let bundle_pages = bundle_pages.max(1);
        Ok(Self {
            schema,
            rid_table,
            builder: PageBuilder::new(schema),
            sink,
            bundle: BytesMut::with_capacity(bundle_pages * schema.page_size),
            bundle_pages,
            default_vertex_payload: 0,
            elements: Vec::new(),
            summary: PageDbSummary::default(),
            dropped_edge_payloads: false,
        })
    }

    /// Payload stored for vertices the vertex source does not mention.
    pub fn with_default_vertex_payload(mut self, payload: u64) -> Self {
        self.default_vertex_payload = payload;
        self
    }

    /// Write the page database for `edges` to the sink. Vertex payloads come
    /// from `vertices` when the schema stores them.
    pub fn generate<S: EdgeSource>(
        mut self,
        edges: &mut S,
        mut vertices: Option<&mut dyn VertexSource>,
    ) -> GeneratorResult<(PageDbSummary, W)> {
        let mut walk = VertexWalk::start(edges, self.schema)?;
        let mut batch = Vec::new();
        let mut next_vertex: Option<Vertex> = None;
        let max_edges_head = self.schema.max_edges_head();
        if vertices.is_some() && !self.schema.has_vertex_payload() {
            warn!("ignoring the vertex source: the schema stores no vertex payload");
        }

        while let Some(vid) = walk.next_vertex(&mut batch)? {
            let payload = match vertices.as_deref_mut() {
                Some(source) if self.schema.has_vertex_payload() => {
                    Some(self.vertex_payload(vid, source, &mut next_vertex)?)
                }
                _ => self
                    .schema
                    .has_vertex_payload()
                    .then_some(self.default_vertex_payload),
            };

            if let (Some(value), Some(width)) = (payload, self.schema.vertex_payload_width) {
                check_payload(vid, value, width)?;
            }

            self.resolve(vid, &batch)?;
            if batch.len() > max_edges_head {
                self.place_large(vid, payload)?;
            } else {
                self.place_small(vid, payload)?;
            }
        }
        if self.builder.number_of_slots() > 0 {
            self.emit(PageKind::Small)?;
        }
        self.flush_bundle()?;
        self.sink.flush()?;

        if self.summary.num_pages != self.rid_table.len() as u64 {
            return Err(GeneratorError::PageCountMismatch {
                written: self.summary.num_pages,
                expected: self.rid_table.len(),
            });
        }

        self.summary.num_vertices = walk.vertex_count();
        self.summary.num_edges = walk.num_edges();
        info!(
            "page database ready: {} pages ({} small, {} head, {} extension), {} vertices, {} edges",
            self.summary.num_pages,
            self.summary.small_pages,
            self.summary.head_pages,
            self.summary.extension_pages,
            self.summary.num_vertices,
            self.summary.num_edges
        );
        Ok((self.summary, self.sink))
    }

    /// Payload of `vid` from a vertex stream sorted by id.
    fn vertex_payload(
        &self,
        vid: u64,
        source: &mut dyn VertexSource,
        next: &mut Option<Vertex>,
    ) -> GeneratorResult<u64> {
        loop {
            if next.is_none() {
                *next = source.pull()?;
            }
            match *next {
                Some(vertex) if vertex.id < vid => {
                    warn!(
                        "skipping vertex {} from the vertex source: out of order before {}",
                        vertex.id, vid
                    );
                    *next = None;
                }
                Some(vertex) if vertex.id == vid => {
                    *next = None;
                    return Ok(vertex.payload);
                }
                _ => return Ok(self.default_vertex_payload),
            }
        }
    }

    fn resolve(&mut self, vid: u64, edges: &[Edge]) -> GeneratorResult<()> {
        let has_payload = self.schema.has_edge_payload();
        self.elements.clear();
        for edge in edges {
            match (edge.payload, self.schema.edge_payload_width) {
                (Some(value), Some(width)) => check_payload(vid, value, width)?,
                (Some(_), None) if !self.dropped_edge_payloads => {
                    warn!(
                        "dropping edge payloads starting at vertex {}: the schema stores no edge payload",
                        vid
                    );
                    self.dropped_edge_payloads = true;
                }
                _ => {}
            }
            let (page_id, slot_offset) = self
                .rid_table
                .resolve(edge.dst)
                .ok_or(GeneratorError::UnresolvedVertex(edge.dst))?;
            self.elements.push(AdjElement {
                page_id,
                slot_offset,
                payload: has_payload.then(|| edge.payload.unwrap_or_default()),
            });
        }
        Ok(())
    }

    fn place_small(&mut self, vid: u64, payload: Option<u64>) -> GeneratorResult<()> {
        let count = self.elements.len();
        let fits = self
            .builder
            .scan()
            .is_some_and(|scan| scan.capacity >= count);
        if !fits {
            self.emit(PageKind::Small)?;
            // An empty page always holds a small vertex.
            self.builder.scan();
        }
        let slot = self.builder.add_slot(vid, payload);
        self.builder.add_list_small(slot, &self.elements);
        Ok(())
    }

    fn place_large(&mut self, vid: u64, payload: Option<u64>) -> GeneratorResult<()> {
        if self.builder.number_of_slots() > 0 {
            self.emit(PageKind::Small)?;
        }

        let total = self.elements.len();
        let max_edges_head = self.schema.max_edges_head();
        let max_edges_ext = self.schema.max_edges_ext();

        self.builder.scan();
        self.builder.add_slot(vid, payload);
        self.builder
            .add_list_head(total as u64, &self.elements[..max_edges_head]);
        self.emit(PageKind::LargeHead)?;

        let mut start = max_edges_head;
        while start < total {
            let end = total.min(start + max_edges_ext);
            self.builder.scan_extension();
            self.builder.add_slot_extension(vid, payload);
            self.builder.add_list_extension(&self.elements[start..end]);
            self.emit(PageKind::LargeExtension)?;
            start = end;
        }
        debug!(
            "vertex {} with {} edges written across {} pages",
            vid,
            total,
            1 + self.schema.extension_pages_for(total)
        );
        Ok(())
    }

    /// Check the page under construction against its RID tuple, issue it and
    /// append it to the bundle.
    fn emit(&mut self, kind: PageKind) -> GeneratorResult<()> {
        let page_id = PageId(self.summary.num_pages);
        let expected = self.rid_table.kind_of(page_id);
        let mismatch = |reason: String| GeneratorError::RidTableMismatch {
            page_id,
            expected,
            found: kind,
            reason,
        };

        let tuple = self
            .rid_table
            .get(page_id)
            .ok_or_else(|| mismatch("RID table has no tuple for this page".to_string()))?;
        if expected != Some(kind) {
            return Err(mismatch("page kind differs".to_string()));
        }
        let first = self.builder.slot(0)?.vertex_id;
        if first != tuple.start_vid {
            return Err(mismatch(format!(
                "page starts at vertex {}, RID tuple at {}",
                first, tuple.start_vid
            )));
        }

        let page = self.builder.issue(kind);
        self.bundle.extend_from_slice(&page);
        self.summary.record(kind);
        if self.bundle.len() >= self.bundle_pages * self.schema.page_size {
            self.flush_bundle()?;
        }
        Ok(())
    }

    fn flush_bundle(&mut self) -> GeneratorResult<()> {
        if self.bundle.is_empty() {
            return Ok(());
        }
        self.sink.write_all(&self.bundle)?;
        debug!(
            "flushed {} pages ({} written so far)",
            self.bundle.len() / self.schema.page_size,
            self.summary.num_pages
        );
        self.bundle.clear();
        Ok(())
    }
}

fn check_payload(vid: u64, value: u64, width: usize) -> GeneratorResult<()> {
    if value > max_uint(width) {
        return Err(GeneratorError::PayloadOverflow { vid, value, width });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::rid_table_generator::RidTableGenerator;
    use crate::generator::source::{SortedEdges, SortedVertices};
    use crate::storage::page::SlottedPage;
    use crate::storage::rid_table::RidTuple;
    use anyhow::Result;

    // D = 48, slot = 2, element = 2, length = 1: head holds 22 edges, extensions 23.
    fn schema() -> PageSchema {
        PageSchema::default()
            .with_page_size(64)
            .with_vertex_id_width(1)
            .with_page_id_width(1)
            .with_slot_offset_width(1)
            .with_record_offset_width(1)
            .with_record_size_width(1)
    }

    fn build(schema: PageSchema, edges: &[Edge]) -> Result<(RidTable, Vec<SlottedPage>)> {
        let table = RidTableGenerator::new(schema)?.generate(&mut SortedEdges::new(edges))?;
        let (summary, bytes) = PageDbGenerator::new(schema, &table, Vec::new(), 2)?
            .generate(&mut SortedEdges::new(edges), None)?;
        assert_eq!(summary.num_pages, table.len() as u64);
        assert_eq!(bytes.len(), table.len() * schema.page_size);
        let pages = bytes
            .chunks_exact(schema.page_size)
            .map(|raw| SlottedPage::from_bytes(schema, raw))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((table, pages))
    }

    fn targets(table: &RidTable, elements: &[AdjElement]) -> Vec<u64> {
        elements
            .iter()
            .map(|e| table.vertex_at(e.page_id, e.slot_offset).unwrap())
            .collect()
    }

    #[test]
    fn test_small_page_end_to_end() -> Result<()> {
        let edges = [Edge::new(0, 1), Edge::new(1, 0), Edge::new(2, 1)];
        let (table, pages) = build(PageSchema::default(), &edges)?;

        assert_eq!(table.tuples(), &[RidTuple::small(0)]);
        assert_eq!(pages.len(), 1);
        let page = &pages[0];
        assert!(page.is_small());
        assert_eq!(page.number_of_slots(), 3);
        for (i, edge) in edges.iter().enumerate() {
            assert_eq!(page.slot(i)?.vertex_id, i as u64);
            let list = page.list(i)?;
            assert_eq!(list.len(), 1);
            assert_eq!(list[0].page_id, PageId(0));
            assert_eq!(list[0].slot_offset, edge.dst);
        }
        Ok(())
    }

    #[test]
    fn test_large_vertex_split_preserves_order() -> Result<()> {
        let schema = schema();
        let fanout = 60u64;
        let mut edges: Vec<_> = (0..fanout).map(|i| Edge::new(3, (i * 7) % 40)).collect();
        edges.push(Edge::new(5, 3));
        let (table, pages) = build(schema, &edges)?;

        let (head_id, slot) = table.resolve(3).unwrap();
        assert_eq!(slot, 0);
        let head = &pages[head_id.0 as usize];
        assert!(head.is_large_head());
        assert_eq!(head.record_len(0)?, fanout);
        assert_eq!(head.local_list_len(0)?, schema.max_edges_head());

        let extensions = schema.extension_pages_for(fanout as usize);
        assert_eq!(extensions, 2);
        let mut all = head.list(0)?;
        for k in 1..=extensions {
            let ext = &pages[head_id.0 as usize + k];
            assert!(ext.is_large_extension());
            assert_eq!(ext.slot(0)?.vertex_id, 3);
            all.extend(ext.list(0)?);
        }
        let expected: Vec<_> = edges[..fanout as usize].iter().map(|e| e.dst).collect();
        assert_eq!(targets(&table, &all), expected);

        let (page, slot) = table.resolve(5).unwrap();
        assert_eq!(targets(&table, &pages[page.0 as usize].list(slot as usize)?), vec![3]);
        Ok(())
    }

    #[test]
    fn test_zero_edge_vertices_keep_slots() -> Result<()> {
        let edges = [Edge::new(4, 0)];
        let (table, pages) = build(schema(), &edges)?;
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].number_of_slots(), 5);
        for vid in 0..4 {
            assert_eq!(pages[0].record_len(vid)?, 0);
        }
        assert_eq!(targets(&table, &pages[0].list(4)?), vec![0]);
        Ok(())
    }

    #[test]
    fn test_payloads() -> Result<()> {
        let schema = schema()
            .with_edge_payload_width(Some(2))
            .with_vertex_payload_width(Some(1));
        let edges = [
            Edge::with_payload(0, 2, 0x0102),
            Edge::new(0, 1),
            Edge::with_payload(2, 0, 9),
        ];
        let vertices = [Vertex { id: 0, payload: 5 }, Vertex { id: 2, payload: 7 }];

        let table = RidTableGenerator::new(schema)?.generate(&mut SortedEdges::new(&edges))?;
        let (_, bytes) = PageDbGenerator::new(schema, &table, Vec::new(), 64)?
            .with_default_vertex_payload(1)
            .generate(
                &mut SortedEdges::new(&edges),
                Some(&mut SortedVertices::new(&vertices) as &mut dyn VertexSource),
            )?;
        let page = SlottedPage::from_bytes(schema, &bytes)?;

        let payloads: Vec<_> = (0..3)
            .map(|i| page.slot(i).map(|s| s.vertex_payload))
            .collect::<Result<_, _>>()?;
        assert_eq!(payloads, vec![Some(5), Some(1), Some(7)]);

        let list = page.list(0)?;
        assert_eq!(list[0].payload, Some(0x0102));
        assert_eq!(list[1].payload, Some(0));
        assert_eq!(page.list(2)?[0].payload, Some(9));
        Ok(())
    }

    #[test]
    fn test_vertex_payload_without_vertex_source() -> Result<()> {
        let schema = schema().with_vertex_payload_width(Some(4));
        let edges = [Edge::new(0, 1)];
        let table = RidTableGenerator::new(schema)?.generate(&mut SortedEdges::new(&edges))?;
        let (_, bytes) = PageDbGenerator::new(schema, &table, Vec::new(), 1)?
            .with_default_vertex_payload(42)
            .generate(&mut SortedEdges::new(&edges), None)?;
        let page = SlottedPage::from_bytes(schema, &bytes)?;
        assert_eq!(page.slot(1)?.vertex_payload, Some(42));
        Ok(())
    }

    #[test]
    fn test_rid_table_mismatch() -> Result<()> {
        let edges = [Edge::new(0, 1), Edge::new(1, 0)];
        // A table claiming the second vertex starts its own page.
        let table = RidTable::from_parts(vec![RidTuple::small(0), RidTuple::small(1)], 2);
        let result = PageDbGenerator::new(schema(), &table, Vec::new(), 1)?
            .generate(&mut SortedEdges::new(&edges), None);
        assert!(matches!(
            result,
            Err(GeneratorError::PageCountMismatch { written: 1, expected: 2 })
        ));

        let edges: Vec<_> = (0..30).map(|i| Edge::new(0, i % 2)).collect();
        let table = RidTable::from_parts(vec![RidTuple::small(0)], 2);
        let result = PageDbGenerator::new(schema(), &table, Vec::new(), 1)?
            .generate(&mut SortedEdges::new(&edges), None);
        assert!(matches!(
            result,
            Err(GeneratorError::RidTableMismatch { expected: Some(PageKind::Small), .. })
        ));
        Ok(())
    }

    #[test]
    fn test_unresolved_destination() -> Result<()> {
        let table = RidTable::from_parts(vec![RidTuple::small(0)], 1);
        let edges = [Edge::new(0, 3)];
        let result = PageDbGenerator::new(schema(), &table, Vec::new(), 1)?
            .generate(&mut SortedEdges::new(&edges), None);
        assert!(matches!(result, Err(GeneratorError::UnresolvedVertex(3))));
        Ok(())
    }

    #[test]
    fn test_edge_payload_overflow() -> Result<()> {
        let schema = schema().with_edge_payload_width(Some(1));
        let edges = [Edge::with_payload(0, 1, 255), Edge::with_payload(1, 0, 300)];
        let table = RidTableGenerator::new(schema)?.generate(&mut SortedEdges::new(&edges))?;
        let result = PageDbGenerator::new(schema, &table, Vec::new(), 1)?
            .generate(&mut SortedEdges::new(&edges), None);
        assert!(matches!(
            result,
            Err(GeneratorError::PayloadOverflow { vid: 1, value: 300, width: 1 })
        ));
        Ok(())
    }

    #[test]
    fn test_vertex_payload_overflow() -> Result<()> {
        let schema = schema().with_vertex_payload_width(Some(1));
        let edges = [Edge::new(0, 1)];
        let table = RidTableGenerator::new(schema)?.generate(&mut SortedEdges::new(&edges))?;

        let vertices = [Vertex { id: 0, payload: 70000 }];
        let result = PageDbGenerator::new(schema, &table, Vec::new(), 1)?.generate(
            &mut SortedEdges::new(&edges),
            Some(&mut SortedVertices::new(&vertices) as &mut dyn VertexSource),
        );
        assert!(matches!(
            result,
            Err(GeneratorError::PayloadOverflow { vid: 0, value: 70000, width: 1 })
        ));

        let result = PageDbGenerator::new(schema, &table, Vec::new(), 1)?
            .with_default_vertex_payload(256)
            .generate(&mut SortedEdges::new(&edges), None);
        assert!(matches!(
            result,
            Err(GeneratorError::PayloadOverflow { vid: 0, value: 256, width: 1 })
        ));
        Ok(())
    }

    #[test]
    fn test_payloads_without_schema_width_are_dropped() -> Result<()> {
        let schema = schema();
        let edges = [Edge::with_payload(0, 1, 300)];
        let vertices = [Vertex { id: 0, payload: 70000 }];
        let table = RidTableGenerator::new(schema)?.generate(&mut SortedEdges::new(&edges))?;
        let (_, bytes) = PageDbGenerator::new(schema, &table, Vec::new(), 1)?.generate(
            &mut SortedEdges::new(&edges),
            Some(&mut SortedVertices::new(&vertices) as &mut dyn VertexSource),
        )?;
        let page = SlottedPage::from_bytes(schema, &bytes)?;
        assert_eq!(page.slot(0)?.vertex_payload, None);
        assert_eq!(page.list(0)?[0].payload, None);
        Ok(())
    }
}
