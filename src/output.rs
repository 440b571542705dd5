use crate::check::{CheckReport, PageReport, PageStatus, ReportMode};
use crate::error::ErrorPayload;
use crate::page_id::PageId;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Schema version for output payloads.
pub const EPC_OUTPUT_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum EpcOutput {
    Check(CheckOutput),
    FmtHtml(FmtHtmlOutput),
    Error(ErrorOutput),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutput {
    pub version: String,
    pub root: PageId,
    pub report_mode: ReportMode,
    pub passed: bool,
    pub reference_files: usize,
    pub summary: CheckSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halted_at: Option<PageId>,
    pub dir_diff_launched: bool,
    pub diagnostics_dir: PathBuf,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<PageReport>,
}

impl CheckOutput {
    pub fn from_report(report: CheckReport, diagnostics_dir: &Path) -> Self {
        let summary = CheckSummary::from_report(&report);
        Self {
            version: EPC_OUTPUT_VERSION.to_string(),
            passed: report.passed(),
            root: report.root,
            report_mode: report.mode,
            reference_files: report.reference_files,
            summary,
            halted_at: report.halted_at,
            dir_diff_launched: report.dir_diff_launched,
            diagnostics_dir: diagnostics_dir.to_path_buf(),
            pages: report.pages,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckSummary {
    pub pages: usize,
    pub matched: usize,
    pub formatted_match: usize,
    pub mismatched: usize,
    pub known_bad_mismatched: usize,
    pub reference_missing: usize,
}

impl CheckSummary {
    pub fn from_report(report: &CheckReport) -> Self {
        let mismatched = report.count(PageStatus::Mismatch);
        let failures = report.failures();
        Self {
            pages: report.pages.len(),
            matched: report.count(PageStatus::Match),
            formatted_match: report.count(PageStatus::FormattedMatch),
            mismatched: failures,
            known_bad_mismatched: mismatched - failures,
            reference_missing: report.count(PageStatus::ReferenceMissing),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FmtHtmlOutput {
    pub version: String,
    pub input: PathBuf,
    pub output_path: PathBuf,
    pub bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub error: ErrorPayload,
}
