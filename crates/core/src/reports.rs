//! Report discovery over the shared output directory.
//!
//! The worker writes one JSON file per related document. Clients send the
//! filenames they already hold and receive only what is new.

use std::collections::HashSet;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// On-disk shape of a worker output file.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportDocument {
    pub metadata: ReportMetadata,
    pub extracted_sections: Vec<ExtractedSection>,
    /// Section text, written by the worker in the same order as
    /// `extracted_sections`.
    #[serde(default)]
    pub subsection_analysis: Vec<SubsectionAnalysis>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportMetadata {
    pub source_file: String,
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedSection {
    pub document: String,
    pub section_title: String,
    #[serde(default)]
    pub refined_text: Option<String>,
    #[serde(default)]
    pub importance_rank: u32,
    #[serde(default)]
    pub page_number: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubsectionAnalysis {
    pub document: String,
    #[serde(default)]
    pub refined_text: String,
    #[serde(default)]
    pub page_number: u32,
}

impl SubsectionAnalysis {
    fn describes(&self, section: &ExtractedSection) -> bool {
        self.document == section.document && self.page_number == section.page_number
    }
}

/// A report as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub source_file: String,
    /// Sections ordered by importance rank.
    pub sections: Vec<ReportSection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSection {
    pub document: String,
    pub section_title: String,
    pub refined_text: String,
    pub importance_rank: u32,
    pub page_number: u32,
}

impl From<ReportDocument> for Report {
    fn from(doc: ReportDocument) -> Self {
        let analysis = doc.subsection_analysis;
        let mut sections: Vec<ReportSection> = doc
            .extracted_sections
            .into_iter()
            .enumerate()
            .map(|(i, s)| {
                // Same index first, then the first entry for the same page.
                let refined_text = match s.refined_text {
                    Some(text) => text,
                    None => analysis
                        .get(i)
                        .filter(|a| a.describes(&s))
                        .or_else(|| analysis.iter().find(|a| a.describes(&s)))
                        .map(|a| a.refined_text.clone())
                        .unwrap_or_default(),
                };
                ReportSection {
                    document: s.document,
                    section_title: s.section_title,
                    refined_text,
                    importance_rank: s.importance_rank,
                    page_number: s.page_number,
                }
            })
            .collect();
        sections.sort_by_key(|s| s.importance_rank);
        Report {
            source_file: doc.metadata.source_file,
            sections,
        }
    }
}

/// Files and reports discovered since the client's known set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDelta {
    pub new_reports: Vec<Report>,
    /// Every newly settled filename, including ones that held no report.
    pub new_files: Vec<String>,
}

impl ReportDelta {
    pub fn is_empty(&self) -> bool {
        self.new_files.is_empty()
    }
}

/// One poll response: the delta plus the coordinator's run status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPoll {
    #[serde(flatten)]
    pub delta: ReportDelta,
    pub running: bool,
    pub run_id: Option<Uuid>,
    pub last_exit_code: Option<i32>,
}

/// Collect reports from `*.json` files in `dir` that are not in `known`.
///
/// Files are visited in name order. A file that is not valid JSON yet
/// (the worker may still be writing it) is skipped and left out of
/// `new_files`, so the next poll retries it. Valid JSON without report
/// structure is marked as seen but yields no report. A missing directory
/// is an empty delta.
pub async fn discover_reports(dir: &Path, known: &HashSet<String>) -> io::Result<ReportDelta> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ReportDelta::default()),
        Err(e) => return Err(e),
    };

    let mut candidates = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if name.ends_with(".json") && !known.contains(&name) && entry.file_type().await?.is_file()
        {
            candidates.push(name);
        }
    }
    candidates.sort();

    let mut delta = ReportDelta::default();
    for name in candidates {
        let bytes = match tokio::fs::read(dir.join(&name)).await {
            Ok(bytes) => bytes,
            // Removed between listing and reading (directory reset).
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };

        let value: serde_json::Value = match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(file = %name, error = %e, "Skipping incomplete report file");
                continue;
            }
        };

        match serde_json::from_value::<ReportDocument>(value) {
            Ok(doc) => delta.new_reports.push(doc.into()),
            Err(e) => {
                tracing::warn!(file = %name, error = %e, "Output file is not a report");
            }
        }
        delta.new_files.push(name);
    }

    Ok(delta)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
