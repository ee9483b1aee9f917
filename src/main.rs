mod cli;

use clap::Parser;
use cli::{Cli, Commands, DownloadArgs};
use nava::config::{Config, Overrides};
use nava::runner::{self, DownloadRequest};
use tracing::info;
use tracing_subscriber::EnvFilter;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Download(args) => download(args).await?,
    }

    Ok(())
}

async fn download(args: DownloadArgs) -> Result<(), AnyError> {
    let overrides = Overrides {
        batch_size: args.batch_size,
        max_retries: args.max_retries,
    };
    let config = Config::load_with(args.config.clone(), &overrides)?;

    let request = DownloadRequest::new(args.comic_id, args.start, args.end, args.outpath);
    let report = runner::run(&request, &config).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }

    if report.interrupted {
        info!("Stopped early, rerun the same command to resume");
    } else {
        info!("Download finished");
    }

    Ok(())
}
