//! JSON export of the ranked user records

use crate::output::traits::{OutputError, OutputHandler, OutputResult, RankingSummary};
use crate::crawler::UserRecord;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct Export<'a> {
    name: &'a str,
    locations: &'a [String],
    generated_at: String,
    sort: &'static str,
    users: &'a [UserRecord],
}

/// Writes the ranking as a pretty-printed JSON document
#[derive(Debug, Clone)]
pub struct JsonExporter {
    path: PathBuf,
}

impl JsonExporter {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Renders the export document without writing it
    pub fn render(summary: &RankingSummary) -> OutputResult<String> {
        let export = Export {
            name: &summary.target,
            locations: &summary.locations,
            generated_at: summary.finished_at.to_rfc3339(),
            sort: summary.sort_key.as_str(),
            users: &summary.records,
        };
        Ok(serde_json::to_string_pretty(&export)?)
    }
}

impl OutputHandler for JsonExporter {
    fn write(&self, summary: &RankingSummary) -> OutputResult<()> {
        let body = Self::render(summary)?;
        let write_err = |source| OutputError::Write {
            path: self.path.display().to_string(),
            source,
        };

        let mut writer = BufWriter::new(File::create(&self.path).map_err(write_err)?);
        writer.write_all(body.as_bytes()).map_err(write_err)?;
        writer.flush().map_err(write_err)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "json"
    }
}
