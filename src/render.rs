//! Local rendering through the external page-to-HTML converter.

use std::io;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::config::RendererConfig;
use crate::error::{EpcError, Result};
use crate::notion::Page;
use crate::page_id::PageId;

/// Flag passed to the converter so its output lines up with the service's exporter.
pub const NOTION_COMPAT_FLAG: &str = "--notion-compat";

/// Converter output for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedHtml {
    pub file_name: String,
    pub html: Vec<u8>,
}

/// A rendered page plus the sub-pages it links to. Recomputed per page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub file_name: String,
    pub html: Vec<u8>,
    pub sub_pages: Vec<PageId>,
}

impl RenderedPage {
    pub fn new(page: &Page, rendered: RenderedHtml) -> Self {
        Self {
            file_name: rendered.file_name,
            html: rendered.html,
            sub_pages: page.sub_pages(),
        }
    }
}

#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, page: &Page) -> Result<RenderedHtml>;
}

/// Runs a converter executable: page JSON on stdin, HTML on stdout.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    command: String,
    args: Vec<String>,
    notion_compat: bool,
}

impl CommandRenderer {
    pub fn new(command: impl Into<String>, args: Vec<String>, notion_compat: bool) -> Self {
        Self {
            command: command.into(),
            args,
            notion_compat,
        }
    }

    pub fn from_config(config: &RendererConfig) -> Self {
        Self::new(
            config.command.clone(),
            config.args.clone(),
            config.notion_compat,
        )
    }

    fn command_line(&self) -> Vec<String> {
        let mut line = self.args.clone();
        if self.notion_compat {
            line.push(NOTION_COMPAT_FLAG.to_string());
        }
        line
    }
}

#[async_trait]
impl Renderer for CommandRenderer {
    async fn render(&self, page: &Page) -> Result<RenderedHtml> {
        let input = serde_json::to_vec(&page.to_renderer_json())?;
        let args = self.command_line();
        debug!(command = %self.command, ?args, page = %page.id, "running converter");

        let mut child = Command::new(&self.command)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| map_spawn_error(err, &self.command))?;

        let stdin = child.stdin.take();
        let feed = async move {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            match stdin.write_all(&input).await {
                // Converters that read the page from elsewhere may exit without draining stdin.
                Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                other => other,
            }
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;
        fed?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EpcError::render(format!(
                "converter '{}' failed on page {} ({}): {}",
                self.command,
                page.id,
                output.status,
                stderr.trim()
            )));
        }

        Ok(RenderedHtml {
            file_name: html_file_name_for_page(page),
            html: output.stdout,
        })
    }
}

fn map_spawn_error(err: io::Error, command: &str) -> EpcError {
    if err.kind() == io::ErrorKind::NotFound {
        EpcError::render(format!("converter '{command}' was not found on PATH"))
    } else {
        EpcError::Io(err)
    }
}

/// Name the service gives a page in its export: `<title> <undashed id>.html`.
pub fn html_file_name_for_page(page: &Page) -> String {
    html_file_name(&page.title(), &page.id)
}

pub fn html_file_name(title: &str, id: &PageId) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let title = if cleaned.is_empty() {
        "Untitled"
    } else {
        cleaned.as_str()
    };
    format!("{title} {}.html", id.no_dash())
}
