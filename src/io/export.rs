//! JSON export of run reports.
//!
//! The export is the hand-off point for downstream ranking / plotting tools:
//! raw solutions in visit order, the per-cell log, and payoff tables, plus a
//! record of contexts that failed.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::augmecon::RunReport;
use crate::error::{Error, Result};
use crate::io::RunConfig;

/// A context whose run aborted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextFailure {
    pub layer_thickness_um: f64,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub tool: String,
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub config: RunConfig,
    pub reports: Vec<RunReport>,
    pub failures: Vec<ContextFailure>,
}

impl ExportDocument {
    pub fn new(config: RunConfig, reports: Vec<RunReport>, failures: Vec<ContextFailure>) -> Self {
        Self {
            tool: "augmecon".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: Utc::now(),
            config,
            reports,
            failures,
        }
    }
}

pub fn write_export_json(path: &Path, doc: &ExportDocument) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| Error::Io(format!("failed to create export '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(BufWriter::new(file), doc)
        .map_err(|e| Error::Io(format!("failed to write export '{}': {e}", path.display())))
}

pub fn read_export_json(path: &Path) -> Result<ExportDocument> {
    let file =
        File::open(path).map_err(|e| Error::Io(format!("failed to open export '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| Error::Parse(format!("invalid export JSON: {e}")))
}
