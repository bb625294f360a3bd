use crate::generator::error::{GeneratorError, GeneratorResult};
use crate::generator::source::{Edge, EdgeBatch, EdgeSource};
use crate::storage::page::PageSchema;

/// Visits every vertex id from 0 up to the largest id in the edge stream, in
/// order, pairing each with its out-edges. Ids without a batch of their own get
/// an empty edge list. Both generator passes walk the stream this way, so they
/// see exactly the same sequence of vertices.
pub(crate) struct VertexWalk<'s, S> {
    source: &'s mut S,
    schema: PageSchema,
    pending: Option<EdgeBatch>,
    exhausted: bool,
    last_src: Option<u64>,
    next_vid: u64,
    max_vid: u64,
    num_edges: u64,
}

impl<'s, S: EdgeSource> VertexWalk<'s, S> {
    /// Pull the first batch. An empty stream is [`GeneratorError::EmptyEdgeSet`].
    pub(crate) fn start(source: &'s mut S, schema: PageSchema) -> GeneratorResult<Self> {
        let mut walk = Self {
            source,
            schema,
            pending: None,
            exhausted: false,
            last_src: None,
            next_vid: 0,
            max_vid: 0,
            num_edges: 0,
        };
        walk.fill()?;
        if walk.pending.is_none() {
            return Err(GeneratorError::EmptyEdgeSet);
        }
        Ok(walk)
    }

    /// Move the next vertex's edges into `edges` and return its id, or `None`
    /// once every id up to the maximum has been visited.
    pub(crate) fn next_vertex(&mut self, edges: &mut Vec<Edge>) -> GeneratorResult<Option<u64>> {
        edges.clear();
        self.fill()?;

        let vid = self.next_vid;
        match self.pending.as_ref().and_then(EdgeBatch::source) {
            Some(src) if src == vid => {
                if let Some(batch) = self.pending.take() {
                    edges.extend(batch.edges);
                }
            }
            Some(_) => {}
            None if vid > self.max_vid => return Ok(None),
            None => {}
        }

        if vid > self.schema.max_vertex_id() {
            return Err(GeneratorError::VertexIdOverflow {
                vid,
                width: self.schema.vertex_id_width,
            });
        }
        if edges.len() as u64 > self.schema.max_list_len() {
            return Err(GeneratorError::ListTooLong {
                vid,
                len: edges.len(),
                width: self.schema.record_size_width,
            });
        }

        self.num_edges += edges.len() as u64;
        self.next_vid += 1;
        Ok(Some(vid))
    }

    /// `max vertex id + 1`. Final once the walk has returned `None`.
    pub(crate) fn vertex_count(&self) -> u64 {
        self.max_vid + 1
    }

    pub(crate) fn num_edges(&self) -> u64 {
        self.num_edges
    }

    fn fill(&mut self) -> GeneratorResult<()> {
        if self.pending.is_some() || self.exhausted {
            return Ok(());
        }

        let batch = self.source.pull()?;
        self.max_vid = self.max_vid.max(batch.max_vid);
        let Some(src) = batch.source() else {
            self.exhausted = true;
            return Ok(());
        };

        if let Some(previous) = self.last_src {
            if src <= previous {
                return Err(GeneratorError::UnsortedEdges {
                    previous,
                    current: src,
                });
            }
        }
        for edge in &batch.edges {
            if edge.src != src {
                return Err(GeneratorError::MixedSourceBatch {
                    expected: src,
                    found: edge.src,
                });
            }
            self.max_vid = self.max_vid.max(edge.dst);
        }
        self.max_vid = self.max_vid.max(src);
        self.last_src = Some(src);
        self.pending = Some(batch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::source::{EdgeFn, SortedEdges};
    use anyhow::Result;

    fn walk_all(edges: &[Edge]) -> GeneratorResult<Vec<(u64, usize)>> {
        let mut source = SortedEdges::new(edges);
        let mut walk = VertexWalk::start(&mut source, PageSchema::default())?;
        let mut buf = Vec::new();
        let mut seen = Vec::new();
        while let Some(vid) = walk.next_vertex(&mut buf)? {
            seen.push((vid, buf.len()));
        }
        Ok(seen)
    }

    #[test]
    fn test_visits_gaps_and_trailing_destinations() -> Result<()> {
        let edges = [Edge::new(2, 0), Edge::new(2, 1), Edge::new(4, 6)];
        let seen = walk_all(&edges)?;
        assert_eq!(
            seen,
            vec![(0, 0), (1, 0), (2, 2), (3, 0), (4, 1), (5, 0), (6, 0)]
        );
        Ok(())
    }

    #[test]
    fn test_empty_edge_set() {
        assert!(matches!(walk_all(&[]), Err(GeneratorError::EmptyEdgeSet)));
    }

    #[test]
    fn test_unsorted_sources() {
        let edges = [Edge::new(3, 0), Edge::new(1, 0)];
        assert!(matches!(
            walk_all(&edges),
            Err(GeneratorError::UnsortedEdges { previous: 3, current: 1 })
        ));
    }

    #[test]
    fn test_mixed_batch() {
        let batches = vec![EdgeBatch {
            edges: vec![Edge::new(0, 1), Edge::new(1, 0)],
            max_vid: 1,
        }];
        let mut iter = batches.into_iter();
        let mut source = EdgeFn(move || Ok::<_, GeneratorError>(iter.next().unwrap_or_default()));
        let result = VertexWalk::start(&mut source, PageSchema::default());
        assert!(matches!(
            result,
            Err(GeneratorError::MixedSourceBatch { expected: 0, found: 1 })
        ));
    }

    #[test]
    fn test_vertex_id_overflow() {
        let schema = PageSchema::default().with_vertex_id_width(1);
        let edges = [Edge::new(0, 256)];
        let mut source = SortedEdges::new(&edges);
        let mut walk = VertexWalk::start(&mut source, schema).unwrap();
        let mut buf = Vec::new();
        let mut result = Ok(None);
        for _ in 0..=256 {
            result = walk.next_vertex(&mut buf);
            if result.is_err() {
                break;
            }
        }
        assert!(matches!(
            result,
            Err(GeneratorError::VertexIdOverflow { vid: 256, width: 1 })
        ));
    }
}
