use std::path::PathBuf;
use std::process::ExitCode;

use epc_lib::{
    CheckOptions, CheckOutput, Checker, CommandRenderer, DiagnosticDirs, EpcError, EpcOutput,
    HostDiffToolProbe, KnownBadSet, NotionAuth, NotionClient, PageId, PrettyHtml,
    ProcessDiffLauncher, ReportMode,
};
use tracing::{debug, info, warn};

use crate::cli::OutputFormat;
use crate::formatting::{exit_code_for_check, render_error, write_output};
use crate::settings::{format_effective_config, load_config, resolve_check_settings, CheckOverrides};

/// Run the check command.
pub async fn run_check(
    config_path: Option<PathBuf>,
    page: String,
    format: OutputFormat,
    output: Option<PathBuf>,
    overrides: CheckOverrides,
) -> ExitCode {
    let config = match load_config(config_path.as_deref()) {
        Ok(cfg) => resolve_check_settings(cfg, &overrides),
        Err(err) => return render_error(err, format, output),
    };
    debug!("{}", format_effective_config(&config, config_path.as_deref()));

    let root = match PageId::parse(&page) {
        Ok(id) => id,
        Err(err) => return render_error(err, format, output),
    };

    let auth = NotionAuth::from_env();
    if auth.is_none() {
        warn!("NOTION_TOKEN is not set; the export request will be rejected");
    }
    let client = match NotionClient::from_config(auth, &config.api) {
        Ok(client) => client,
        Err(err) => return render_error(err, format, output),
    };
    let renderer = CommandRenderer::from_config(&config.renderer);
    let launcher = ProcessDiffLauncher::from_config(&config.diff);
    let diagnostics = DiagnosticDirs::new(&config.data_dir);

    let options = CheckOptions {
        known_bad: KnownBadSet::for_root(&config.known_bad, &root),
        mode: ReportMode::select(&HostDiffToolProbe::from_config(&config.diff)),
        diagnostics: diagnostics.clone(),
        root,
    };
    info!(
        "Checking {} ({} known-bad pages)",
        options.root,
        options.known_bad.len()
    );

    let checker = Checker::new(&client, &renderer, &PrettyHtml, &launcher);
    let report = match checker.run(&options).await {
        Ok(report) => report,
        Err(err) => return render_error(err, format, output),
    };

    let passed = report.passed();
    let body = EpcOutput::Check(CheckOutput::from_report(report, diagnostics.root()));
    if let Err(err) = write_output(&body, format, output.clone()) {
        return render_error(EpcError::Config(err.to_string()), format, output);
    }
    exit_code_for_check(passed)
}
