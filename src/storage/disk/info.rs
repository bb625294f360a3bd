use crate::storage::error::StorageResult;
use crate::storage::page::PageSchema;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Metadata sidecar written next to a page database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDbInfo {
    pub name: String,
    pub num_pages: u64,
    /// `max vertex id + 1`
    pub vertex_count: u64,
    pub num_edges: u64,
    pub schema: PageSchema,
}

impl PageDbInfo {
    pub fn save(&self, path: &Path) -> StorageResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> StorageResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        let info: Self = bincode::deserialize_from(reader)?;
        info.schema.validate()?;
        Ok(info)
    }
}
