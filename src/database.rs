use crate::storage::disk::{DbFiles, PageDbInfo, PageFile};
use crate::storage::page::{AdjElement, PageId, PageSchema, SlottedPage};
use crate::storage::rid_table::RidTable;
use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// A vertex read back from the page database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexRecord {
    pub vertex_id: u64,
    pub payload: Option<u64>,
    /// Adjacency list in input order, across head and extension pages.
    pub edges: Vec<AdjElement>,
}

/// Read-only handle over a generated page database
pub struct PageDatabase {
    info: PageDbInfo,
    rid_table: RidTable,
    pages: PageFile,
}

impl PageDatabase {
    /// Open the database files sharing `prefix`
    pub fn open(prefix: &Path) -> Result<Self> {
        let files = DbFiles::from_prefix(prefix);
        if !files.info.exists() {
            bail!("Page database does not exist at {:?}", prefix);
        }

        let info = PageDbInfo::load(&files.info)
            .with_context(|| format!("Failed to load {:?}", files.info))?;

        let rid_file = File::open(&files.rid)
            .with_context(|| format!("Failed to open RID table {:?}", files.rid))?;
        let rid_table = RidTable::read_from(
            &mut BufReader::new(rid_file),
            info.schema.vertex_id_width,
            info.vertex_count,
        )
        .with_context(|| format!("Failed to read RID table {:?}", files.rid))?;

        let pages = PageFile::open(&files.pages, info.schema.page_size)
            .with_context(|| format!("Failed to open {:?}", files.pages))?;

        let num_pages = pages.num_pages()?;
        if num_pages != info.num_pages || rid_table.len() as u64 != num_pages {
            bail!(
                "Page count mismatch: info says {}, page file has {}, RID table has {}",
                info.num_pages,
                num_pages,
                rid_table.len()
            );
        }

        Ok(Self {
            info,
            rid_table,
            pages,
        })
    }

    pub fn info(&self) -> &PageDbInfo {
        &self.info
    }

    pub fn schema(&self) -> &PageSchema {
        &self.info.schema
    }

    pub fn rid_table(&self) -> &RidTable {
        &self.rid_table
    }

    pub fn num_pages(&self) -> u64 {
        self.info.num_pages
    }

    pub fn page(&mut self, page_id: PageId) -> Result<SlottedPage> {
        let schema = self.info.schema;
        let page = self
            .pages
            .read_slotted_page(&schema, page_id)
            .with_context(|| format!("Failed to read page {}", page_id))?;
        Ok(page)
    }

    /// Every page in page-id order.
    pub fn pages(&mut self, bundle_pages: usize) -> Result<Vec<SlottedPage>> {
        let schema = self.info.schema;
        Ok(self.pages.read_all(&schema, bundle_pages)?)
    }

    /// Look up a vertex and gather its whole adjacency list.
    pub fn vertex(&mut self, vid: u64) -> Result<Option<VertexRecord>> {
        let Some((page_id, slot_offset)) = self.rid_table.resolve(vid) else {
            return Ok(None);
        };

        let page = self.page(page_id)?;
        let slot = page.slot(slot_offset as usize)?;
        if slot.vertex_id != vid {
            bail!(
                "Slot {} of page {} holds vertex {}, expected {}",
                slot_offset,
                page_id,
                slot.vertex_id,
                vid
            );
        }

        let total = page.record_len(slot_offset as usize)?;
        let mut edges = page.list(slot_offset as usize)?;
        if page.is_large_head() {
            let extensions = self.rid_table.get(page_id).map_or(0, |t| t.payload);
            for k in 1..=extensions {
                let ext = self.page(PageId(page_id.0 + k))?;
                if !ext.is_large_extension() || ext.slot(0)?.vertex_id != vid {
                    bail!("Page {} is not an extension of vertex {}", page_id.0 + k, vid);
                }
                edges.extend(ext.list(0)?);
            }
        }
        if edges.len() as u64 != total {
            bail!(
                "Vertex {} has {} edges on disk, its record says {}",
                vid,
                edges.len(),
                total
            );
        }

        Ok(Some(VertexRecord {
            vertex_id: vid,
            payload: slot.vertex_payload,
            edges,
        }))
    }

    /// Destination vertex ids of `vid`'s out-edges.
    pub fn neighbors(&mut self, vid: u64) -> Result<Vec<u64>> {
        let Some(record) = self.vertex(vid)? else {
            bail!("Vertex {} is out of range", vid);
        };
        record
            .edges
            .iter()
            .map(|e| {
                self.rid_table
                    .vertex_at(e.page_id, e.slot_offset)
                    .with_context(|| format!("Dangling edge {:?} from vertex {}", e, vid))
            })
            .collect()
    }
}
