use std::fmt::Write as FmtWrite;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use epc_lib::check::{PageReport, PageStatus, ReportMode};
use epc_lib::output::EPC_OUTPUT_VERSION;
use epc_lib::{EpcError, EpcOutput, ErrorOutput};

use crate::cli::OutputFormat;

/// Write output in the requested format.
pub fn write_output(
    body: &EpcOutput,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => write_json_output(body, output.as_deref())?,
        OutputFormat::Pretty => write_pretty_output(body, output.as_deref())?,
    };
    Ok(())
}

/// Render an error and return the appropriate exit code.
pub fn render_error(err: EpcError, format: OutputFormat, output: Option<PathBuf>) -> ExitCode {
    let error_payload = err.to_payload();
    let payload = EpcOutput::Error(ErrorOutput {
        version: EPC_OUTPUT_VERSION.to_string(),
        message: Some(error_payload.message.clone()),
        error: error_payload,
    });

    match format {
        OutputFormat::Json => {
            let content =
                serde_json::to_string(&payload).unwrap_or_else(|_| "{\"mode\":\"error\"}".into());
            if let Some(path) = output {
                if let Err(write_err) = std::fs::write(&path, &content) {
                    tracing::error!("Failed to write error output: {}", write_err);
                    println!("{content}");
                }
            } else {
                println!("{content}");
            }
        }
        OutputFormat::Pretty => {
            if let Err(write_err) = write_pretty_output(&payload, output.as_deref()) {
                tracing::error!("Failed to write error output: {}", write_err);
            }
        }
    };

    // Exit code 2 is reserved for fatal errors; unresolved mismatches use 1.
    ExitCode::from(2)
}

/// Write JSON output to file or stdout.
fn write_json_output(body: &EpcOutput, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let content = serde_json::to_string(body)?;
    if let Some(path) = output {
        std::fs::write(path, content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Write pretty output to file or stdout.
fn write_pretty_output(body: &EpcOutput, output: Option<&Path>) -> io::Result<()> {
    let stdout_is_tty = std::io::stdout().is_terminal();
    let use_human = output.is_none() && stdout_is_tty;

    if use_human {
        let content = format_pretty(body, true);
        println!("{content}");
        return Ok(());
    }

    // Non-tty or file output: keep JSON shape for pipelines/files.
    let content =
        serde_json::to_string_pretty(body).unwrap_or_else(|_| "{\"mode\":\"error\"}".to_string());
    if let Some(path) = output {
        std::fs::write(path, &content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Format output for human consumption in a terminal.
pub fn format_pretty(body: &EpcOutput, colorize: bool) -> String {
    match body {
        EpcOutput::Check(out) => {
            let mut buf = String::new();
            let status = if out.passed { "PASS" } else { "FAIL" };
            let status_colored = color(status, if out.passed { "32" } else { "31" }, colorize);
            writeln!(buf, "{} Export parity check of {}", status_colored, out.root).ok();
            match &out.report_mode {
                ReportMode::Batch { tool } => {
                    writeln!(buf, "Mode: batch (dir diff: {})", tool.path.display()).ok()
                }
                ReportMode::Interactive => writeln!(buf, "Mode: interactive").ok(),
            };
            writeln!(buf, "Reference files: {}", out.reference_files).ok();

            let s = &out.summary;
            writeln!(buf, "Pages: {}", s.pages).ok();
            let counts = [
                ("ok", s.matched, "32"),
                ("same formatted", s.formatted_match, "32"),
                ("mismatched", s.mismatched, "31"),
                ("known bad", s.known_bad_mismatched, "33"),
                ("no reference", s.reference_missing, "33"),
            ];
            for (label, count, code) in counts {
                if count > 0 {
                    let text = color(&count.to_string(), code, colorize);
                    writeln!(buf, "- {:16} {}", label, text).ok();
                }
            }

            let problems: Vec<&PageReport> = out
                .pages
                .iter()
                .filter(|p| p.status != PageStatus::Match && p.status != PageStatus::FormattedMatch)
                .collect();
            if !problems.is_empty() {
                writeln!(buf, "Pages needing attention:").ok();
                for page in problems {
                    let tag = match (page.status, page.known_bad) {
                        (PageStatus::Mismatch, true) => color("known-bad", "33", colorize),
                        (PageStatus::Mismatch, false) => color("mismatch", "31", colorize),
                        _ => color("missing", "33", colorize),
                    };
                    writeln!(buf, "- [{}] {} '{}'", tag, page.id, page.file_name).ok();
                    if let Some(paths) = &page.paths {
                        writeln!(
                            buf,
                            "    {} <-> {}",
                            paths.expected.display(),
                            paths.got.display()
                        )
                        .ok();
                    }
                }
            }

            if let Some(id) = &out.halted_at {
                writeln!(buf, "Stopped at {id}; fix it and run again.").ok();
            }
            if out.dir_diff_launched {
                writeln!(buf, "Directory diff opened on {}", out.diagnostics_dir.display()).ok();
            }
            buf
        }
        EpcOutput::FmtHtml(out) => {
            let mut buf = String::new();
            let header = color("[FMT]", "36", colorize);
            writeln!(
                buf,
                "{} {} -> {} ({} bytes)",
                header,
                out.input.display(),
                out.output_path.display(),
                out.bytes
            )
            .ok();
            buf
        }
        EpcOutput::Error(out) => {
            let mut buf = String::new();
            let header = color("[ERROR]", "31", colorize);
            let message = out
                .message
                .as_deref()
                .unwrap_or_else(|| out.error.message.as_str());
            writeln!(buf, "{} {}", header, message).ok();
            if let Some(remediation) = &out.error.remediation {
                writeln!(buf, "Hint: {}", remediation).ok();
            }
            buf
        }
    }
}

/// Apply ANSI color codes when enabled.
fn color(text: &str, code: &str, colorize: bool) -> String {
    if colorize {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    } else {
        text.to_string()
    }
}

/// Determine exit code for the check command.
pub fn exit_code_for_check(passed: bool) -> ExitCode {
    if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
