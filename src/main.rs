use anyhow::Result;
use clap::Parser;
use tower_lsp::{LspService, Server};
use tracing::info;

use tapestry_language_server::logging::init_logger;
use tapestry_language_server::lsp::TapestryBackend;

/// Language server for Apache Tapestry templates, speaking LSP over stdio.
#[derive(Debug, Parser)]
#[command(name = "tapestry-language-server", version, about)]
struct Args {
    /// Log level for stderr output (falls back to RUST_LOG, then "info")
    #[arg(long)]
    log_level: Option<String>,

    /// Disable ANSI colors in stderr output
    #[arg(long)]
    no_color: bool,

    /// Disable the per-session debug log file in the cache directory
    #[arg(long)]
    no_file_log: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // The guard flushes the file appender on drop; keep it for the whole
    // process lifetime.
    let _guard = init_logger(args.no_color, args.log_level.as_deref(), !args.no_file_log)?;
    info!(
        "starting tapestry-language-server {}",
        env!("CARGO_PKG_VERSION")
    );

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::build(TapestryBackend::new)
        .custom_method("tapestry/pairedFile", TapestryBackend::paired_file)
        .finish();

    Server::new(stdin, stdout, socket).serve(service).await;

    info!("server stopped");
    Ok(())
}
