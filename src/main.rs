mod cli;
mod commands;
mod formatting;
mod logging;
mod settings;

use std::process::ExitCode;

use cli::Commands;
use commands::{run_check, run_fmt_html};
use settings::CheckOverrides;

#[tokio::main]
async fn main() -> ExitCode {
    run().await
}

async fn run() -> ExitCode {
    let args = cli::parse();
    if let Err(err) = logging::initialize_logging(&args) {
        eprintln!("Failed to initialize logging: {err}");
    }

    match args.command {
        Commands::Check {
            page,
            format,
            output,
            data_dir,
            dir_diff_tool,
            no_dir_diff,
            no_notion_compat,
        } => {
            let overrides = CheckOverrides {
                data_dir,
                dir_diff_tool,
                no_dir_diff,
                no_notion_compat,
            };
            run_check(args.config, page, format, output, overrides).await
        }
        Commands::FmtHtml {
            file,
            output,
            format,
        } => run_fmt_html(file, output, format),
    }
}
