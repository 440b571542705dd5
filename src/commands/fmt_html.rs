use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use epc_lib::output::EPC_OUTPUT_VERSION;
use epc_lib::{format_html, EpcError, EpcOutput, FmtHtmlOutput};
use tracing::debug;

use crate::cli::OutputFormat;
use crate::formatting::{render_error, write_output};

/// Run the fmt-html command. Without `--output` the formatted HTML itself goes
/// to stdout; with it, the file is written and a status payload is printed.
pub fn run_fmt_html(file: PathBuf, output: Option<PathBuf>, format: OutputFormat) -> ExitCode {
    let raw = match std::fs::read(&file) {
        Ok(raw) => raw,
        Err(err) => return render_error(EpcError::Io(err), format, None),
    };
    let formatted = format_html(&raw);
    debug!(
        "formatted {} ({} -> {} bytes)",
        file.display(),
        raw.len(),
        formatted.len()
    );

    let Some(output_path) = output else {
        let mut stdout = std::io::stdout().lock();
        if let Err(err) = stdout.write_all(&formatted).and_then(|_| stdout.flush()) {
            return render_error(EpcError::Io(err), format, None);
        }
        return ExitCode::SUCCESS;
    };

    if let Err(err) = std::fs::write(&output_path, &formatted) {
        return render_error(EpcError::Io(err), format, None);
    }
    let body = EpcOutput::FmtHtml(FmtHtmlOutput {
        version: EPC_OUTPUT_VERSION.to_string(),
        input: file,
        output_path,
        bytes: formatted.len(),
    });
    if let Err(err) = write_output(&body, format, None) {
        return render_error(EpcError::Config(err.to_string()), format, None);
    }
    ExitCode::SUCCESS
}
