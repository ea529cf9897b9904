// src/main.rs
// =============================================================================
// This is the entry point of the sitefetch CLI.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (to stderr, so stdout only carries the fetched site)
// 3. Crawl the site, with Ctrl-C wired to a CancellationToken
// 4. Write the pages to a file or stdout
// 5. Exit with proper code (0 = success, 2 = error, 130 = interrupted)
// =============================================================================

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use sitefetch::cli::Cli;
use sitefetch::error::CrawlError;
use sitefetch::{crawl, output};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// Exit code when the user interrupted the crawl (128 + SIGINT)
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.silent);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

fn init_logging(silent: bool) {
    let filter = if silent {
        EnvFilter::new("off")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<i32> {
    let Some(url) = cli.url.as_deref() else {
        Cli::command().print_help()?;
        return Ok(0);
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, finishing up");
                cancel.cancel();
            }
        });
    }

    let config = cli.to_config();
    let (pages, code) = match crawl::fetch_site(url, &config, cancel).await {
        Ok(pages) => (pages, 0),
        // Whatever was fetched before the interrupt is still worth saving
        Err(CrawlError::Cancelled { pages }) => (pages, EXIT_INTERRUPTED),
        Err(e) => return Err(e).with_context(|| format!("Failed to fetch {}", url)),
    };

    if pages.is_empty() {
        warn!("No pages found");
        return Ok(code);
    }

    info!("Total page count: {} page(s)", pages.len());

    output::write_pages(&pages, cli.outfile.as_deref())?;
    if let Some(path) = &cli.outfile {
        info!("Wrote {}", path.display());
    }

    Ok(code)
}
