//! First pass of a build: lays out every vertex without resolving any edge and
//! records the resulting page sequence as a RID table.

use crate::generator::error::{GeneratorError, GeneratorResult};
use crate::generator::source::EdgeSource;
use crate::generator::walk::VertexWalk;
use crate::storage::page::{PageBuilder, PageId, PageSchema};
use crate::storage::rid_table::{RidTable, RidTuple};
use log::{debug, info};

pub struct RidTableGenerator {
    schema: PageSchema,
    builder: PageBuilder,
    table: RidTable,
    next_start_vid: u64,
}

impl RidTableGenerator {
    pub fn new(schema: PageSchema) -> GeneratorResult<Self> {
        schema.validate()?;
        Ok(Self {
            schema,
            builder: PageBuilder::new(schema),
            table: RidTable::new(),
            next_start_vid: 0,
        })
    }

    /// Walk the whole edge stream and return the RID table of the page
    /// database it would produce.
    pub fn generate<S: EdgeSource>(mut self, source: &mut S) -> GeneratorResult<RidTable> {
        let mut walk = VertexWalk::start(source, self.schema)?;
        let mut edges = Vec::new();
        let max_edges_head = self.schema.max_edges_head();

        while let Some(vid) = walk.next_vertex(&mut edges)? {
            if edges.len() > max_edges_head {
                self.place_large(vid, edges.len())?;
            } else {
                self.place_small(vid, edges.len())?;
            }
        }
        if self.builder.number_of_slots() > 0 {
            self.flush_small(self.next_start_vid)?;
        }

        self.table.set_vertex_count(walk.vertex_count());
        info!(
            "RID table ready: {} pages for {} vertices and {} edges",
            self.table.len(),
            walk.vertex_count(),
            walk.num_edges()
        );
        Ok(self.table)
    }

    fn place_small(&mut self, vid: u64, num_edges: usize) -> GeneratorResult<()> {
        let fits = self
            .builder
            .scan()
            .is_some_and(|scan| scan.capacity >= num_edges);
        if !fits {
            self.flush_small(vid)?;
            // An empty page always holds a small vertex.
            self.builder.scan();
        }
        let slot = self.builder.add_slot(vid, None);
        self.builder.reserve_list_small(slot, num_edges);
        Ok(())
    }

    fn place_large(&mut self, vid: u64, num_edges: usize) -> GeneratorResult<()> {
        if self.builder.number_of_slots() > 0 {
            self.flush_small(vid)?;
        }

        let max_edges_head = self.schema.max_edges_head();
        let max_edges_ext = self.schema.max_edges_ext();
        let extensions = self.schema.extension_pages_for(num_edges);

        self.builder.scan();
        self.builder.add_slot(vid, None);
        self.builder.reserve_list_head(num_edges as u64, max_edges_head);
        self.builder.clear();
        self.push_tuple(RidTuple {
            start_vid: vid,
            payload: extensions as u64,
        })?;

        let mut remaining = num_edges - max_edges_head;
        for k in 1..=extensions {
            let count = remaining.min(max_edges_ext);
            self.builder.scan_extension();
            self.builder.add_slot_extension(vid, None);
            self.builder.reserve_list_extension(count);
            self.builder.clear();
            self.push_tuple(RidTuple {
                start_vid: vid,
                payload: k as u64,
            })?;
            remaining -= count;
        }
        debug_assert_eq!(remaining, 0);

        debug!(
            "vertex {} with {} edges spans a head page and {} extension pages",
            vid, num_edges, extensions
        );
        self.next_start_vid = vid + 1;
        Ok(())
    }

    /// Close the small page under construction. `vid` starts the next page.
    fn flush_small(&mut self, vid: u64) -> GeneratorResult<()> {
        let slots = self.builder.number_of_slots();
        self.builder.clear();
        self.push_tuple(RidTuple::small(self.next_start_vid))?;
        debug!(
            "small page {} holds vertices {}..{} ({} slots)",
            self.table.len() - 1,
            self.next_start_vid,
            vid,
            slots
        );
        self.next_start_vid = vid;
        Ok(())
    }

    fn push_tuple(&mut self, tuple: RidTuple) -> GeneratorResult<()> {
        let page_id = PageId(self.table.len() as u64);
        if page_id.0 > self.schema.max_page_id() {
            return Err(GeneratorError::PageIdOverflow {
                page_id,
                width: self.schema.page_id_width,
            });
        }
        self.table.push(tuple);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::source::{Edge, SortedEdges};
    use crate::storage::page::PageKind;
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

    fn generate(schema: PageSchema, edges: &[Edge]) -> GeneratorResult<RidTable> {
        RidTableGenerator::new(schema)?.generate(&mut SortedEdges::new(edges))
    }

    fn star(src: u64, fanout: u64) -> Vec<Edge> {
        (0..fanout).map(|i| Edge::new(src, i % 4)).collect()
    }

    #[test]
    fn test_single_small_page() -> Result<()> {
        let edges = [Edge::new(0, 1), Edge::new(1, 0), Edge::new(2, 1)];
        let table = generate(PageSchema::default(), &edges)?;
        assert_eq!(table.tuples(), &[RidTuple::small(0)]);
        assert_eq!(table.vertex_count(), 3);
        Ok(())
    }

    #[test]
    fn test_ids_below_first_source_are_covered() -> Result<()> {
        let edges = [Edge::new(5, 6)];
        let table = generate(PageSchema::default(), &edges)?;
        assert_eq!(table.vertex_count(), 7);
        for vid in 0..7 {
            assert_eq!(table.resolve(vid), Some((PageId(0), vid)));
        }
        Ok(())
    }

    #[test]
    fn test_small_pages_split_on_capacity() -> Result<()> {
        // Each vertex takes 2 + 1 + 2 * 10 = 23 bytes, two fit in 48.
        let edges: Vec<_> = (0..5).flat_map(|v| star(v, 10)).collect();
        let table = generate(schema(), &edges)?;
        assert_eq!(
            table.tuples(),
            &[RidTuple::small(0), RidTuple::small(2), RidTuple::small(4)]
        );
        assert_eq!(table.resolve(3), Some((PageId(1), 1)));
        Ok(())
    }

    #[test]
    fn test_large_vertex_layout() -> Result<()> {
        let schema = schema();
        // 22 + 23 + 5 edges: a head page and two extension pages.
        let mut edges = star(0, 3);
        edges.extend(star(1, 50));
        edges.extend(star(2, 1));
        let table = generate(schema, &edges)?;

        assert_eq!(schema.extension_pages_for(50), 2);
        assert_eq!(
            table.tuples(),
            &[
                RidTuple::small(0),
                RidTuple { start_vid: 1, payload: 2 },
                RidTuple { start_vid: 1, payload: 1 },
                RidTuple { start_vid: 1, payload: 2 },
                RidTuple::small(2),
            ]
        );
        assert_eq!(table.resolve(1), Some((PageId(1), 0)));
        assert_eq!(table.resolve(3), Some((PageId(4), 1)));
        Ok(())
    }

    #[test]
    fn test_exact_extension_fill() -> Result<()> {
        let schema = schema();
        let full = (schema.max_edges_head() + schema.max_edges_ext()) as u64;
        for fanout in [schema.max_edges_head() as u64 + 1, full] {
            let table = generate(schema, &star(0, fanout))?;
            assert_eq!(table.count_of(PageKind::LargeHead), 1);
            assert_eq!(table.count_of(PageKind::LargeExtension), 1);
            // Vertices 1..=3 have no edges and share the trailing small page.
            assert_eq!(table.count_of(PageKind::Small), 1);
        }

        let table = generate(schema, &star(0, full + 1))?;
        assert_eq!(table.count_of(PageKind::LargeExtension), 2);
        Ok(())
    }

    #[test]
    fn test_consecutive_large_vertices() -> Result<()> {
        let mut edges = star(0, 30);
        edges.extend(star(1, 30));
        let table = generate(schema(), &edges)?;
        let starts: Vec<_> = table.tuples().iter().map(|t| t.start_vid).collect();
        assert_eq!(starts, vec![0, 0, 1, 1, 2]);
        assert_eq!(table.resolve(1), Some((PageId(2), 0)));
        assert_eq!(table.resolve(3), Some((PageId(4), 1)));
        Ok(())
    }

    #[test]
    fn test_empty_edge_set() {
        assert!(matches!(
            generate(schema(), &[]),
            Err(GeneratorError::EmptyEdgeSet)
        ));
    }

    #[test]
    fn test_page_id_overflow() {
        // Every vertex takes a head and an extension page; 1-byte page ids
        // run out after 256 pages.
        let edges: Vec<_> = (0..=128u64).flat_map(|v| star(v, 30)).collect();
        assert!(matches!(
            generate(schema(), &edges),
            Err(GeneratorError::PageIdOverflow { .. })
        ));
    }
}
