//! Edge and vertex sources feeding the generators.
//!
//! An [`EdgeSource`] yields one [`EdgeBatch`] per source vertex, in ascending
//! source order, and an empty batch once the stream is exhausted. A
//! [`VertexSource`] yields vertices with payloads in ascending id order. Both
//! passes of a build read the same edge stream, so sources are cheap to reopen.

use crate::generator::error::{GeneratorError, GeneratorResult};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub src: u64,
    pub dst: u64,
    pub payload: Option<u64>,
}

impl Edge {
    pub fn new(src: u64, dst: u64) -> Self {
        Self {
            src,
            dst,
            payload: None,
        }
    }

    pub fn with_payload(src: u64, dst: u64, payload: u64) -> Self {
        Self {
            src,
            dst,
            payload: Some(payload),
        }
    }
}

/// All out-edges of one source vertex.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeBatch {
    pub edges: Vec<Edge>,
    /// Largest vertex id (source or destination) seen by the source so far.
    pub max_vid: u64,
}

impl EdgeBatch {
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn source(&self) -> Option<u64> {
        self.edges.first().map(|e| e.src)
    }
}

pub trait EdgeSource {
    /// Next source vertex's edges, or an empty batch at end of stream.
    fn pull(&mut self) -> GeneratorResult<EdgeBatch>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vertex {
    pub id: u64,
    pub payload: u64,
}

pub trait VertexSource {
    fn pull(&mut self) -> GeneratorResult<Option<Vertex>>;
}

/// Edges held in memory, grouped by ascending source id.
#[derive(Debug, Clone)]
pub struct SortedEdges<'a> {
    edges: &'a [Edge],
    pos: usize,
    max_vid: u64,
}

impl<'a> SortedEdges<'a> {
    pub fn new(edges: &'a [Edge]) -> Self {
        Self {
            edges,
            pos: 0,
            max_vid: 0,
        }
    }
}

impl EdgeSource for SortedEdges<'_> {
    fn pull(&mut self) -> GeneratorResult<EdgeBatch> {
        let rest = &self.edges[self.pos..];
        let Some(first) = rest.first() else {
            return Ok(EdgeBatch {
                edges: Vec::new(),
                max_vid: self.max_vid,
            });
        };

        let len = rest.iter().take_while(|e| e.src == first.src).count();
        let edges = rest[..len].to_vec();
        self.pos += len;
        for edge in &edges {
            self.max_vid = self.max_vid.max(edge.src).max(edge.dst);
        }

        Ok(EdgeBatch {
            edges,
            max_vid: self.max_vid,
        })
    }
}

/// Adapts a closure into an [`EdgeSource`].
pub struct EdgeFn<F>(pub F);

impl<F> EdgeSource for EdgeFn<F>
where
    F: FnMut() -> GeneratorResult<EdgeBatch>,
{
    fn pull(&mut self) -> GeneratorResult<EdgeBatch> {
        (self.0)()
    }
}

/// Vertices held in memory, sorted by id.
#[derive(Debug, Clone)]
pub struct SortedVertices<'a> {
    vertices: std::slice::Iter<'a, Vertex>,
}

impl<'a> SortedVertices<'a> {
    pub fn new(vertices: &'a [Vertex]) -> Self {
        Self {
            vertices: vertices.iter(),
        }
    }
}

impl VertexSource for SortedVertices<'_> {
    fn pull(&mut self) -> GeneratorResult<Option<Vertex>> {
        Ok(self.vertices.next().copied())
    }
}

/// Reads a text edge list: one `src dst [payload]` per line.
///
/// Blank lines and lines starting with `#` or `%` are skipped. Integers are
/// decimal or `0x`-prefixed hexadecimal. Consecutive lines with the same source
/// form one batch.
pub struct TextEdgeReader<R> {
    lines: NumberedLines<R>,
    pending: Option<Edge>,
    max_vid: u64,
}

impl TextEdgeReader<BufReader<File>> {
    pub fn open(path: &Path) -> GeneratorResult<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> TextEdgeReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: NumberedLines::new(reader),
            pending: None,
            max_vid: 0,
        }
    }

    fn next_edge(&mut self) -> GeneratorResult<Option<Edge>> {
        if let Some(edge) = self.pending.take() {
            return Ok(Some(edge));
        }
        let Some((line_no, fields)) = self.lines.next_record()? else {
            return Ok(None);
        };
        let edge = match fields.as_slice() {
            [src, dst] => Edge::new(parse_uint(src, line_no)?, parse_uint(dst, line_no)?),
            [src, dst, payload] => Edge::with_payload(
                parse_uint(src, line_no)?,
                parse_uint(dst, line_no)?,
                parse_uint(payload, line_no)?,
            ),
            _ => {
                return Err(GeneratorError::Parse {
                    line: line_no,
                    message: format!("expected `src dst [payload]`, got {} fields", fields.len()),
                })
            }
        };
        self.max_vid = self.max_vid.max(edge.src).max(edge.dst);
        Ok(Some(edge))
    }
}

impl<R: BufRead> EdgeSource for TextEdgeReader<R> {
    fn pull(&mut self) -> GeneratorResult<EdgeBatch> {
        let mut edges = Vec::new();
        while let Some(edge) = self.next_edge()? {
            if edges.first().is_some_and(|first: &Edge| first.src != edge.src) {
                self.pending = Some(edge);
                break;
            }
            edges.push(edge);
        }
        Ok(EdgeBatch {
            edges,
            max_vid: self.max_vid,
        })
    }
}

/// Reads a text vertex list: one `vid payload` per line, same syntax as
/// [`TextEdgeReader`].
pub struct TextVertexReader<R> {
    lines: NumberedLines<R>,
}

impl TextVertexReader<BufReader<File>> {
    pub fn open(path: &Path) -> GeneratorResult<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> TextVertexReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: NumberedLines::new(reader),
        }
    }
}

impl<R: BufRead> VertexSource for TextVertexReader<R> {
    fn pull(&mut self) -> GeneratorResult<Option<Vertex>> {
        let Some((line_no, fields)) = self.lines.next_record()? else {
            return Ok(None);
        };
        match fields.as_slice() {
            [id, payload] => Ok(Some(Vertex {
                id: parse_uint(id, line_no)?,
                payload: parse_uint(payload, line_no)?,
            })),
            _ => Err(GeneratorError::Parse {
                line: line_no,
                message: format!("expected `vid payload`, got {} fields", fields.len()),
            }),
        }
    }
}

struct NumberedLines<R> {
    reader: R,
    line_no: usize,
    buf: String,
}

impl<R: BufRead> NumberedLines<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            buf: String::new(),
        }
    }

    /// Next non-comment line, split into whitespace-separated fields.
    fn next_record(&mut self) -> GeneratorResult<Option<(usize, Vec<String>)>> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            let line = self.buf.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('%') {
                continue;
            }
            let fields = line.split_whitespace().map(str::to_string).collect();
            return Ok(Some((self.line_no, fields)));
        }
    }
}

fn parse_uint(field: &str, line: usize) -> GeneratorResult<u64> {
    let parsed = match field
        .strip_prefix("0x")
        .or_else(|| field.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => field.parse::<u64>(),
    };
    parsed.map_err(|e| GeneratorError::Parse {
        line,
        message: format!("invalid integer {:?}: {}", field, e),
    })
}
