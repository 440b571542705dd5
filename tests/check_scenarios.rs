use std::collections::HashMap;
use std::future::Future;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use epc_lib::diff_tool::{DiffLauncher, DirDiffTool};
use epc_lib::notion::api_types::RecordMap;
use epc_lib::render::html_file_name_for_page;
use epc_lib::{
    CheckOptions, CheckReport, Checker, DiagnosticDirs, EpcError, ExportFormat, KnownBadSet, Page,
    PageId, PageSource, PageStatus, PrettyHtml, ReferenceFileSet, RenderedHtml, Renderer,
    ReportMode,
};
use serde_json::{json, Map, Value};
use tempfile::TempDir;
use tracing_subscriber::fmt::MakeWriter;

fn id(n: u8) -> PageId {
    PageId::parse(&format!("{:032x}", n)).unwrap()
}

fn page(id: &PageId, title: &str, children: &[PageId]) -> Page {
    let mut blocks = Map::new();
    let content: Vec<String> = children.iter().map(PageId::dashed).collect();
    blocks.insert(
        id.dashed(),
        json!({"value": {"id": id.dashed(), "type": "page", "properties": {"title": [[title]]}, "content": content}}),
    );
    for child in children {
        blocks.insert(
            child.dashed(),
            json!({"value": {"id": child.dashed(), "type": "page"}}),
        );
    }
    let record_map: RecordMap = serde_json::from_value(json!({ "block": Value::Object(blocks) })).unwrap();
    Page::new(id.clone(), record_map, 1)
}

fn zip_bytes(entries: &[(String, &str)]) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buf);
        let options = zip::write::FileOptions::default();
        for (name, body) in entries {
            writer.start_file(name.as_str(), options).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }
    buf.into_inner()
}

/// Serves a fixed page tree and export archive.
struct FakeSource {
    export: Vec<u8>,
    pages: HashMap<PageId, Page>,
    fetched: Mutex<Vec<PageId>>,
}

#[async_trait]
impl PageSource for FakeSource {
    async fn fetch_export(&self, _root: &PageId, format: ExportFormat) -> epc_lib::Result<Vec<u8>> {
        assert_eq!(format, ExportFormat::Html);
        Ok(self.export.clone())
    }

    async fn fetch_page(&self, id: &PageId) -> epc_lib::Result<Page> {
        self.fetched.lock().unwrap().push(id.clone());
        self.pages
            .get(id)
            .cloned()
            .ok_or_else(|| EpcError::api(None, format!("no page {id}")))
    }
}

/// Renders each page to a canned HTML body.
struct FakeRenderer {
    html: HashMap<PageId, String>,
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn render(&self, page: &Page) -> epc_lib::Result<RenderedHtml> {
        Ok(RenderedHtml {
            file_name: html_file_name_for_page(page),
            html: self.html.get(&page.id).cloned().unwrap_or_default().into_bytes(),
        })
    }
}

#[derive(Default)]
struct RecordingLauncher {
    dir_diffs: Mutex<Vec<(PathBuf, PathBuf)>>,
    file_diffs: Mutex<Vec<(PathBuf, PathBuf)>>,
    dir_diff_fails: bool,
}

impl DiffLauncher for RecordingLauncher {
    fn launch_dir_diff(&self, _tool: &DirDiffTool, expected: &Path, got: &Path) -> epc_lib::Result<()> {
        self.dir_diffs
            .lock()
            .unwrap()
            .push((expected.to_path_buf(), got.to_path_buf()));
        if self.dir_diff_fails {
            return Err(EpcError::Io(std::io::Error::from(
                std::io::ErrorKind::PermissionDenied,
            )));
        }
        Ok(())
    }

    fn open_file_diff(&self, expected: &Path, got: &Path) -> epc_lib::Result<()> {
        self.file_diffs
            .lock()
            .unwrap()
            .push((expected.to_path_buf(), got.to_path_buf()));
        Ok(())
    }
}

/// Root page 1 links to pages 2 and 3; page 3 links back to the root.
struct Fixture {
    source: FakeSource,
    renderer: FakeRenderer,
    launcher: RecordingLauncher,
    data: TempDir,
}

impl Fixture {
    fn new(rendered: [&str; 3], exported: [&str; 3]) -> Self {
        let root = page(&id(1), "Root", &[id(2), id(3)]);
        let child = page(&id(2), "Child", &[]);
        let cyclic = page(&id(3), "Loop", &[id(1)]);

        let export = zip_bytes(&[
            (html_file_name_for_page(&root), exported[0]),
            (format!("Root/{}", html_file_name_for_page(&child)), exported[1]),
            (format!("Root/{}", html_file_name_for_page(&cyclic)), exported[2]),
        ]);
        let html = [(id(1), rendered[0]), (id(2), rendered[1]), (id(3), rendered[2])]
            .into_iter()
            .map(|(k, v)| (k, v.to_string()))
            .collect();
        let pages = [root, child, cyclic]
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        Self {
            source: FakeSource {
                export,
                pages,
                fetched: Mutex::new(Vec::new()),
            },
            renderer: FakeRenderer { html },
            launcher: RecordingLauncher::default(),
            data: TempDir::new().unwrap(),
        }
    }

    fn options(&self, mode: ReportMode, known_bad: &[PageId]) -> CheckOptions {
        CheckOptions {
            root: id(1),
            known_bad: KnownBadSet::new(known_bad.iter().cloned()),
            mode,
            diagnostics: DiagnosticDirs::new(self.data.path()),
        }
    }

    async fn run(&self, options: &CheckOptions) -> epc_lib::Result<CheckReport> {
        Checker::new(&self.source, &self.renderer, &PrettyHtml, &self.launcher)
            .run(options)
            .await
    }

    fn diagnostics(&self) -> DiagnosticDirs {
        DiagnosticDirs::new(self.data.path())
    }

    fn fetched(&self) -> Vec<PageId> {
        self.source.fetched.lock().unwrap().clone()
    }
}

fn batch() -> ReportMode {
    ReportMode::Batch {
        tool: DirDiffTool::from_path("/usr/bin/meld"),
    }
}

fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .filter(|e| e.as_ref().unwrap().file_type().unwrap().is_file())
        .count()
}

const SAME: [&str; 3] = ["<p>root</p>", "<p>child</p>", "<p>loop</p>"];

#[tokio::test]
async fn exact_matches_pass_without_diagnostics() {
    let fx = Fixture::new(SAME, SAME);
    let report = fx.run(&fx.options(batch(), &[])).await.unwrap();

    assert!(report.passed());
    assert_eq!(report.count(PageStatus::Match), 3);
    assert_eq!(report.reference_files, 3);
    assert!(!report.dir_diff_launched);
    assert_eq!(file_count(fx.diagnostics().root()), 0);
    assert_eq!(file_count(fx.diagnostics().expected_dir()), 0);
    assert!(fx.launcher.dir_diffs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn each_page_is_visited_once_despite_the_cycle() {
    let fx = Fixture::new(SAME, SAME);
    fx.run(&fx.options(batch(), &[])).await.unwrap();
    assert_eq!(fx.fetched(), vec![id(1), id(2), id(3)]);
}

#[tokio::test]
async fn whitespace_only_differences_are_formatted_matches() {
    let fx = Fixture::new(
        ["<p>root</p>", "<div><p>child</p></div>", "<p>loop</p>"],
        ["<p>root</p>", "<div>\n  <p>child</p>\n</div>", "<p>loop</p>"],
    );
    let report = fx.run(&fx.options(ReportMode::Interactive, &[])).await.unwrap();

    assert!(report.passed());
    assert_eq!(report.count(PageStatus::FormattedMatch), 1);
    assert_eq!(file_count(fx.diagnostics().got_dir()), 0);
    assert!(fx.launcher.file_diffs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn batch_mode_collects_mismatches_and_opens_one_dir_diff() {
    let fx = Fixture::new(
        ["<p>root</p>", "<p>mine</p>", "<p>also mine</p>"],
        ["<p>root</p>", "<p>theirs</p>", "<p>loop</p>"],
    );
    let report = fx.run(&fx.options(batch(), &[id(3)])).await.unwrap();

    assert!(!report.passed());
    assert_eq!(report.failures(), 1);
    assert_eq!(report.count(PageStatus::Mismatch), 2);
    assert!(report.halted_at.is_none());
    assert!(report.dir_diff_launched);
    assert_eq!(fx.fetched().len(), 3);

    let dirs = fx.diagnostics();
    // raw pair per mismatching page, known-bad included
    assert_eq!(file_count(dirs.root()), 4);
    assert_eq!(file_count(dirs.expected_dir()), 2);
    assert_eq!(file_count(dirs.got_dir()), 2);
    let raw = std::fs::read(dirs.root().join(format!("{}.2-mine.html", id(2)))).unwrap();
    assert_eq!(raw, b"<p>mine</p>");

    let launched = fx.launcher.dir_diffs.lock().unwrap();
    assert_eq!(
        *launched,
        vec![(dirs.expected_dir().to_path_buf(), dirs.got_dir().to_path_buf())]
    );
    assert!(fx.launcher.file_diffs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn batch_mode_with_only_known_bad_mismatches_still_passes() {
    let fx = Fixture::new(
        ["<p>root</p>", "<p>mine</p>", "<p>loop</p>"],
        ["<p>root</p>", "<p>theirs</p>", "<p>loop</p>"],
    );
    let report = fx.run(&fx.options(batch(), &[id(2)])).await.unwrap();

    assert!(report.passed());
    assert_eq!(report.failures(), 0);
    assert!(report.dir_diff_launched);
}

#[tokio::test]
async fn interactive_mode_halts_at_first_unexplained_mismatch() {
    let fx = Fixture::new(
        ["<p>root</p>", "<p>mine</p>", "<p>also mine</p>"],
        ["<p>root</p>", "<p>theirs</p>", "<p>loop</p>"],
    );
    let report = fx.run(&fx.options(ReportMode::Interactive, &[])).await.unwrap();

    assert!(!report.passed());
    assert_eq!(report.halted_at, Some(id(2)));
    // page 3 was queued but never processed
    assert_eq!(fx.fetched(), vec![id(1), id(2)]);
    assert_eq!(report.pages.len(), 2);

    let dirs = fx.diagnostics();
    let opened = fx.launcher.file_diffs.lock().unwrap();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].0, dirs.expected_dir().join(format!("{}.html", id(2))));
    assert_eq!(opened[0].1, dirs.got_dir().join(format!("{}.html", id(2))));
    assert!(fx.launcher.dir_diffs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn interactive_mode_continues_past_known_bad_pages() {
    let fx = Fixture::new(
        ["<p>root</p>", "<p>mine</p>", "<p>loop</p>"],
        ["<p>root</p>", "<p>theirs</p>", "<p>loop</p>"],
    );
    let report = fx
        .run(&fx.options(ReportMode::Interactive, &[id(2)]))
        .await
        .unwrap();

    assert!(report.passed());
    assert!(report.halted_at.is_none());
    assert_eq!(fx.fetched().len(), 3);
    let known = report.pages.iter().find(|p| p.id == id(2)).unwrap();
    assert!(known.known_bad);
    assert!(known.paths.is_some());
    assert!(fx.launcher.file_diffs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn page_download_failure_aborts_the_run() {
    let mut fx = Fixture::new(SAME, SAME);
    fx.source.pages.remove(&id(3));
    let err = fx.run(&fx.options(batch(), &[])).await.unwrap_err();
    assert!(matches!(err, EpcError::Api { .. }), "got {err}");
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let value = tracing::subscriber::with_default(subscriber, f);
    let text = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
    (value, text)
}

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

#[test]
fn reference_names_are_listed_once_per_run() {
    // Nothing in the export matches any rendered page.
    let root = page(&id(1), "Root", &[id(2)]);
    let child = page(&id(2), "Child", &[]);
    let fx = Fixture {
        source: FakeSource {
            export: zip_bytes(&[("Elsewhere/Unrelated page.html".to_string(), "<p>x</p>")]),
            pages: [root, child].into_iter().map(|p| (p.id.clone(), p)).collect(),
            fetched: Mutex::new(Vec::new()),
        },
        renderer: FakeRenderer {
            html: HashMap::new(),
        },
        launcher: RecordingLauncher::default(),
        data: TempDir::new().unwrap(),
    };

    let (report, text) =
        capture_logs(|| block_on(fx.run(&fx.options(ReportMode::Interactive, &[]))));
    let report = report.unwrap();

    assert_eq!(report.count(PageStatus::ReferenceMissing), 2);
    assert!(report.passed());
    assert_eq!(text.matches("Elsewhere/Unrelated page.html").count(), 1);
    assert_eq!(text.matches("is not present in the reference export").count(), 2);
}

#[test]
fn failed_dir_diff_launch_still_returns_the_report() {
    let mut fx = Fixture::new(
        ["<p>root</p>", "<p>mine</p>", "<p>loop</p>"],
        ["<p>root</p>", "<p>theirs</p>", "<p>loop</p>"],
    );
    fx.launcher.dir_diff_fails = true;

    let (report, text) = capture_logs(|| block_on(fx.run(&fx.options(batch(), &[]))));
    let report = report.unwrap();

    assert!(!report.passed());
    assert_eq!(report.failures(), 1);
    assert!(!report.dir_diff_launched);
    assert_eq!(fx.launcher.dir_diffs.lock().unwrap().len(), 1);

    let dirs = fx.diagnostics();
    assert!(text.contains("could not launch /usr/bin/meld"), "logs: {text}");
    assert!(text.contains(&dirs.expected_dir().display().to_string()));
    assert!(text.contains(&dirs.got_dir().display().to_string()));
}

#[test]
fn known_bad_pages_that_now_match_are_flagged() {
    let fx = Fixture::new(
        ["<p>root</p>", "<p>child</p>", "<div><p>loop</p></div>"],
        ["<p>root</p>", "<p>child</p>", "<div>\n  <p>loop</p>\n</div>"],
    );

    let (report, text) =
        capture_logs(|| block_on(fx.run(&fx.options(ReportMode::Interactive, &[id(2), id(3)]))));
    let report = report.unwrap();

    assert!(report.passed());
    assert_eq!(report.count(PageStatus::Match), 2);
    assert_eq!(report.count(PageStatus::FormattedMatch), 1);
    assert_eq!(text.matches("ok, but listed as known bad").count(), 1);
    assert_eq!(
        text.matches("ok after formatting, but listed as known bad").count(),
        1
    );
    assert!(text.contains(&format!("{} 'Child {}.html' ok, but listed", id(2), id(2))));
}

#[test]
fn ambiguous_reference_suffix_names_the_ignored_candidates() {
    let set = ReferenceFileSet::from_files([
        ("B/Page x.html", b"second".to_vec()),
        ("A/Page x.html", b"first".to_vec()),
        ("C/Other.html", b"other".to_vec()),
    ]);

    let (found, text) = capture_logs(|| {
        set.find_by_suffix("Page x.html")
            .map(|(name, _)| name.to_string())
    });

    assert_eq!(found.as_deref(), Some("A/Page x.html"));
    assert!(text.contains("several reference files share this suffix"), "logs: {text}");
    assert!(text.contains("B/Page x.html"));
    assert!(!text.contains("C/Other.html"));
}
