//! Export Parity Checker (EPC) Library
//!
//! Checks that a local HTML renderer reproduces the HTML export of a remote
//! page tree. Each page is downloaded, rendered, and compared byte-for-byte
//! against the matching file of the service's own export; pages that differ
//! are compared again after normalization and written out for review.
//!
//! # Module Overview
//!
//! - [`notion`] - Page download and export API client
//! - [`reference`] - Reference file set read from the export archive
//! - [`render`] - Renderer seam and the external command renderer
//! - [`normalize`] - HTML pretty-printer used for the formatted comparison
//! - [`compare`] - Exact and formatted comparison
//! - [`traversal`] - Breadth-first page queue with deduplication
//! - [`diff_tool`] - Diff tool discovery and launching
//! - [`check`] - The end-to-end run
//! - [`config`] - Configuration file support
//! - [`output`] - JSON output schemas
//!
//! # Example
//!
//! ```no_run
//! use epc_lib::{
//!     CheckOptions, Checker, CommandRenderer, Config, DiagnosticDirs, HostDiffToolProbe,
//!     KnownBadSet, NotionAuth, NotionClient, PageId, PrettyHtml, ProcessDiffLauncher, ReportMode,
//! };
//!
//! # async fn example() -> epc_lib::Result<()> {
//! let config = Config::default();
//! let client = NotionClient::from_config(NotionAuth::from_env(), &config.api)?;
//! let renderer = CommandRenderer::from_config(&config.renderer);
//! let launcher = ProcessDiffLauncher::from_config(&config.diff);
//! let root = PageId::parse("0367c2db381a4f8b9ce360f388a6b2e3")?;
//!
//! let options = CheckOptions {
//!     known_bad: KnownBadSet::for_root(&config.known_bad, &root),
//!     mode: ReportMode::select(&HostDiffToolProbe::from_config(&config.diff)),
//!     diagnostics: DiagnosticDirs::new(&config.data_dir),
//!     root,
//! };
//! let report = Checker::new(&client, &renderer, &PrettyHtml, &launcher)
//!     .run(&options)
//!     .await?;
//! println!("passed: {}", report.passed());
//! # Ok(())
//! # }
//! ```

pub mod check;
pub mod compare;
pub mod config;
pub mod diagnostics;
pub mod diff_tool;
pub mod error;
pub mod known_bad;
pub mod normalize;
pub mod notion;
pub mod output;
pub mod page_id;
pub mod reference;
pub mod render;
pub mod traversal;

pub use check::{CheckOptions, CheckReport, Checker, PageReport, PageStatus, ReportMode};
pub use compare::{Comparator, Comparison, ComparisonOutcome, Mismatch};
pub use config::Config;
pub use diagnostics::{DiagnosticDirs, MismatchPaths};
pub use diff_tool::{
    DiffLauncher, DiffToolProbe, DirDiffKind, DirDiffTool, HostDiffToolProbe, ProcessDiffLauncher,
};
pub use error::{EpcError, Result};
pub use known_bad::KnownBadSet;
pub use normalize::{format_html, HtmlFormatter, PrettyHtml};
pub use notion::{ExportFormat, NotionAuth, NotionClient, Page, PageSource};
pub use output::{
    CheckOutput, CheckSummary, EpcOutput, ErrorOutput, FmtHtmlOutput, EPC_OUTPUT_VERSION,
};
pub use page_id::PageId;
pub use reference::ReferenceFileSet;
pub use render::{CommandRenderer, RenderedHtml, RenderedPage, Renderer};
pub use traversal::TraversalState;
