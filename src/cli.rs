use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "nava")]
#[command(about = "Batch downloader for webtoon episode images", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download every image of an episode range
    Download(DownloadArgs),
}

#[derive(clap::Args, Debug)]
pub struct DownloadArgs {
    /// Numeric title id of the comic
    pub comic_id: u64,

    /// First episode to download
    pub start: u32,

    /// Last episode to download (inclusive)
    pub end: u32,

    /// Directory the comic folder is created in
    pub outpath: PathBuf,

    /// Configuration file (defaults to $NAVA_CONFIG or config/nava.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Images downloaded concurrently per group
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Attempts per image, including the first
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Print the final report as JSON
    #[arg(long)]
    pub json: bool,
}
