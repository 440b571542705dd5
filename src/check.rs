//! The parity check: export, traverse, render, compare, report.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::compare::{Comparator, Comparison, ComparisonOutcome};
use crate::diagnostics::{DiagnosticDirs, MismatchPaths};
use crate::diff_tool::{DiffLauncher, DiffToolProbe, DirDiffTool};
use crate::error::Result;
use crate::known_bad::KnownBadSet;
use crate::normalize::HtmlFormatter;
use crate::notion::{ExportFormat, PageSource};
use crate::page_id::PageId;
use crate::reference::ReferenceFileSet;
use crate::render::{RenderedPage, Renderer};
use crate::traversal::TraversalState;

/// How mismatches are surfaced. Chosen once, before the traversal starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ReportMode {
    /// Collect every mismatch, then open one directory diff at the end.
    Batch { tool: DirDiffTool },
    /// Stop at the first unexplained mismatch and open a file diff.
    Interactive,
}

impl ReportMode {
    pub fn select(probe: &dyn DiffToolProbe) -> Self {
        match probe.dir_diff_tool() {
            Some(tool) => ReportMode::Batch { tool },
            None => ReportMode::Interactive,
        }
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, ReportMode::Batch { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageStatus {
    Match,
    FormattedMatch,
    Mismatch,
    ReferenceMissing,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageReport {
    pub id: PageId,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_name: Option<String>,
    pub status: PageStatus,
    pub known_bad: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paths: Option<MismatchPaths>,
}

impl PageReport {
    /// A mismatch nobody has signed off on.
    pub fn is_failure(&self) -> bool {
        self.status == PageStatus::Mismatch && !self.known_bad
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport {
    pub root: PageId,
    pub mode: ReportMode,
    pub reference_files: usize,
    pub pages: Vec<PageReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halted_at: Option<PageId>,
    pub dir_diff_launched: bool,
}

impl CheckReport {
    pub fn count(&self, status: PageStatus) -> usize {
        self.pages.iter().filter(|p| p.status == status).count()
    }

    pub fn failures(&self) -> usize {
        self.pages.iter().filter(|p| p.is_failure()).count()
    }

    pub fn passed(&self) -> bool {
        self.halted_at.is_none() && self.failures() == 0
    }
}

#[derive(Debug, Clone)]
pub struct CheckOptions {
    pub root: PageId,
    pub known_bad: KnownBadSet,
    pub mode: ReportMode,
    pub diagnostics: DiagnosticDirs,
}

/// Drives one run over the collaborators it is given.
pub struct Checker<'a> {
    source: &'a dyn PageSource,
    renderer: &'a dyn Renderer,
    formatter: &'a dyn HtmlFormatter,
    launcher: &'a dyn DiffLauncher,
}

impl<'a> Checker<'a> {
    pub fn new(
        source: &'a dyn PageSource,
        renderer: &'a dyn Renderer,
        formatter: &'a dyn HtmlFormatter,
        launcher: &'a dyn DiffLauncher,
    ) -> Self {
        Self {
            source,
            renderer,
            formatter,
            launcher,
        }
    }

    pub async fn run(&self, options: &CheckOptions) -> Result<CheckReport> {
        let root = &options.root;
        let archive = self.source.fetch_export(root, ExportFormat::Html).await?;
        let references = ReferenceFileSet::from_zip(&archive)?;
        info!("There are {} files in the reference export", references.len());
        match &options.mode {
            ReportMode::Batch { tool } => info!("Diff tool: '{}'", tool.path.display()),
            ReportMode::Interactive => info!("No directory diff tool; stopping at the first mismatch"),
        }

        options.diagnostics.prepare()?;
        let comparator = Comparator::new(&references, self.formatter);

        let mut report = CheckReport {
            root: root.clone(),
            mode: options.mode.clone(),
            reference_files: references.len(),
            pages: Vec::new(),
            halted_at: None,
            dir_diff_launched: false,
        };
        let mut state = TraversalState::new(root.clone());
        let mut listed_reference_names = false;
        let mut different = 0usize;

        while let Some(id) = state.next_page() {
            debug!(page = %id, pending = state.pending(), "fetching page");
            let page = self.source.fetch_page(&id).await?;
            state.record_event(
                &id,
                format!("{} chunks, {} blocks", page.chunks, page.block_count()),
            );
            let rendered = RenderedPage::new(&page, self.renderer.render(&page).await?);
            state.enqueue(rendered.sub_pages.iter().cloned());

            let known_bad = options.known_bad.contains(&id);
            let event = state.last_event(&id).map(str::to_owned);
            let suffix = event.as_deref().map(|e| format!(", {e}")).unwrap_or_default();
            let mut entry = PageReport {
                id: id.clone(),
                file_name: rendered.file_name.clone(),
                reference_name: None,
                status: PageStatus::ReferenceMissing,
                known_bad,
                event,
                paths: None,
            };
            let n = state.visited_count();

            let (reference_name, outcome) = match comparator.compare(&rendered) {
                Comparison::ReferenceMissing => {
                    warn!(
                        "{n:02}: {id} '{}' from '{}' is not present in the reference export",
                        rendered.file_name,
                        page.title()
                    );
                    if !listed_reference_names {
                        info!("Names in the reference export:");
                        for name in references.names() {
                            info!("  {name}");
                        }
                        listed_reference_names = true;
                    }
                    report.pages.push(entry);
                    continue;
                }
                Comparison::Compared {
                    reference_name,
                    outcome,
                } => (reference_name, outcome),
            };
            entry.reference_name = Some(reference_name);

            match outcome {
                ComparisonOutcome::ExactMatch => {
                    entry.status = PageStatus::Match;
                    if known_bad {
                        warn!("{n:02}: {id} '{}' ok, but listed as known bad{suffix}", rendered.file_name);
                    } else {
                        info!("{n:02}: {id} '{}' ok{suffix}", rendered.file_name);
                    }
                }
                ComparisonOutcome::FormattedMatch => {
                    entry.status = PageStatus::FormattedMatch;
                    if known_bad {
                        warn!(
                            "{n:02}: {id} '{}' ok after formatting, but listed as known bad{suffix}",
                            rendered.file_name
                        );
                    } else {
                        info!("{n:02}: {id} '{}' same formatted{suffix}", rendered.file_name);
                    }
                }
                ComparisonOutcome::Mismatch(mismatch) => {
                    entry.status = PageStatus::Mismatch;
                    let paths = options.diagnostics.write_mismatch(&id, &mismatch)?;
                    warn!(
                        "{n:02}: {id} '{}' HTML in https://notion.so/{id} doesn't match{suffix}",
                        rendered.file_name
                    );
                    entry.paths = Some(paths.clone());
                    report.pages.push(entry);

                    if options.mode.is_batch() {
                        different += 1;
                        continue;
                    }
                    if known_bad {
                        info!("{n:02}: {id} doesn't match but is listed as known bad");
                        continue;
                    }

                    if let Err(err) = self.launcher.open_file_diff(&paths.expected, &paths.got) {
                        warn!(
                            "could not open diff viewer ({err}); compare {} and {}",
                            paths.expected.display(),
                            paths.got.display()
                        );
                    }
                    report.halted_at = Some(id);
                    return Ok(report);
                }
            }
            report.pages.push(entry);
        }

        if let ReportMode::Batch { tool } = &options.mode {
            if different > 0 {
                info!("{different} pages differ; opening directory diff");
                let expected = options.diagnostics.expected_dir();
                let got = options.diagnostics.got_dir();
                match self.launcher.launch_dir_diff(tool, expected, got) {
                    Ok(()) => report.dir_diff_launched = true,
                    Err(err) => warn!(
                        "could not launch {} ({err}); compare {} and {}",
                        tool.path.display(),
                        expected.display(),
                        got.display()
                    ),
                }
            }
        }

        Ok(report)
    }
}
