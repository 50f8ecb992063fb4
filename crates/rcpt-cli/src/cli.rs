use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "rcpt", about = "Receipt upload and thumbnail server", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// List the receipts owned by a user
    List(ListArgs),
    /// Show a single receipt record
    Show(ShowArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML config file; flags below override its values
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// Directory for originals and thumbnails
    #[arg(long)]
    pub uploads: Option<PathBuf>,
    /// Receipt metadata file
    #[arg(long)]
    pub store: Option<PathBuf>,
    /// Fail uploads whose metadata cannot be written to disk
    #[arg(long)]
    pub strict_persist: bool,
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(long)]
    pub user: String,
    #[arg(long, default_value = rcpt_store::DEFAULT_STORE_FILE)]
    pub store: PathBuf,
}

#[derive(Args)]
pub struct ShowArgs {
    pub id: String,
    #[arg(long, default_value = rcpt_store::DEFAULT_STORE_FILE)]
    pub store: PathBuf,
}
