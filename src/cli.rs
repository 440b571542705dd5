use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "epc")]
#[command(
    version,
    about = "Export Parity Checker - Compare a local HTML renderer against the service's own export",
    long_about = "Export Parity Checker (EPC)\n\nModes:\n- check: download a page tree, render every page locally and compare it with the official HTML export.\n- fmt-html: pretty-print an HTML file with the normalizer used for formatted comparisons.\n\nSet NOTION_TOKEN to authenticate. Use --help on any subcommand for details."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, short, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        long,
        short,
        global = true,
        conflicts_with = "verbose",
        help = "Only log warnings and errors"
    )]
    pub quiet: bool,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Optional config file (TOML) for data dir, API timeouts, renderer, diff tools and known-bad pages; CLI flags override config"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check every page reachable from PAGE against the official export
    Check {
        #[arg(help = "Root page id (dashed, undashed, or a page URL)")]
        page: String,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Output file path (stdout if omitted)")]
        output: Option<PathBuf>,

        #[arg(
            long,
            value_name = "DIR",
            help = "Directory for diagnostic files (diff/ is created inside)"
        )]
        data_dir: Option<PathBuf>,

        #[arg(
            long,
            value_name = "PATH",
            help = "Directory diff tool to use instead of searching for one"
        )]
        dir_diff_tool: Option<PathBuf>,

        #[arg(
            long,
            conflicts_with = "dir_diff_tool",
            help = "Never open a directory diff; stop at the first unexplained mismatch"
        )]
        no_dir_diff: bool,

        #[arg(long, help = "Do not pass --notion-compat to the renderer")]
        no_notion_compat: bool,
    },

    /// Pretty-print an HTML file the way formatted comparisons see it
    FmtHtml {
        #[arg(help = "HTML file to format")]
        file: PathBuf,

        #[arg(
            long,
            short,
            help = "Write formatted HTML to this file (JSON status is printed to stdout)"
        )]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "json", help = "Status output format")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Pretty,
}

pub fn parse() -> Cli {
    Cli::parse()
}
