use anyhow::{bail, Context};
use colored::Colorize;
use rcpt_server::{ReceiptServer, ServerConfig};
use rcpt_store::{JsonFileStore, PersistPolicy, Receipt, ReceiptStore};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::List(args) => cmd_list(args, cli.format),
        Command::Show(args) => cmd_show(args, cli.format),
    }
}

/// Config file first, then flag overrides.
fn server_config(args: &ServeArgs) -> anyhow::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::from_toml_file(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(uploads) = &args.uploads {
        config.upload_dir = uploads.clone();
    }
    if let Some(store) = &args.store {
        config.store_path = store.clone();
    }
    if args.strict_persist {
        config.persist_policy = PersistPolicy::Strict;
    }
    config.validate()?;
    Ok(config)
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = server_config(&args)?;
    println!(
        "Receipt server on {} (uploads: {}, store: {})",
        config.bind_addr.to_string().bold(),
        config.upload_dir.display(),
        config.store_path.display()
    );
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(ReceiptServer::new(config).serve())?;
    Ok(())
}

fn open_store(path: &std::path::Path) -> anyhow::Result<JsonFileStore> {
    JsonFileStore::open(path, PersistPolicy::BestEffort)
        .with_context(|| format!("failed to open receipt store {}", path.display()))
}

fn cmd_list(args: ListArgs, format: OutputFormat) -> anyhow::Result<()> {
    let store = open_store(&args.store)?;
    let mut receipts = store.list_by_owner(&args.user)?;
    receipts.sort_by(|a, b| a.id.cmp(&b.id));
    tracing::debug!(user = %args.user, count = receipts.len(), "listed receipts");

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&receipts)?),
        OutputFormat::Text if receipts.is_empty() => {
            println!("No receipts for {}.", args.user.yellow());
        }
        OutputFormat::Text => {
            for receipt in &receipts {
                println!("{}", receipt_line(receipt));
            }
        }
    }
    Ok(())
}

fn cmd_show(args: ShowArgs, format: OutputFormat) -> anyhow::Result<()> {
    let store = open_store(&args.store)?;
    let Some(receipt) = store.get(&args.id)? else {
        bail!("receipt {} not found in {}", args.id, args.store.display());
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&receipt)?),
        OutputFormat::Text => {
            println!("Receipt {}", receipt.id.yellow().bold());
            println!("  owner: {}", receipt.user_id);
            println!("  file:  {}", receipt.file_path.display());
            if !receipt.path().exists() {
                println!("  {}", "file missing on disk".red());
            }
        }
    }
    Ok(())
}

fn receipt_line(receipt: &Receipt) -> String {
    format!("{}  {}", receipt.id.yellow(), receipt.file_path.display())
}
