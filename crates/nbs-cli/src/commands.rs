use std::io::{Read, Write};

use anyhow::{bail, Context};
use colored::Colorize;
use nbs_sdk::{CommandClient, QueryClient};
use nbs_server::{NbsServer, ServerConfig};
use tracing::warn;

use crate::cli::*;

/// Run the selected subcommand to completion.
pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args).await,
        Command::Save(args) => cmd_save(args).await,
        Command::Load(args) => cmd_load(args).await,
        Command::Contains(args) => cmd_contains(args).await,
        Command::Delete(args) => cmd_delete(args).await,
        Command::DeleteAll(args) => cmd_delete_all(args).await,
    }
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let base = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    let config = args.apply(base);
    let root = config.root.clone();
    let server = NbsServer::bind(config).await.context("cannot start NBS server")?;

    println!("{} NBS serving {}", "✓".green().bold(), root.display().to_string().bold());
    for endpoint in server.command_endpoints() {
        println!("  Command: {}", endpoint.to_string().cyan());
    }
    for endpoint in server.query_endpoints() {
        println!("  Query:   {}", endpoint.to_string().cyan());
    }

    server.serve_until(shutdown_signal()).await?;
    println!("{} Stopped.", "✓".green());
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C; serving until killed");
        std::future::pending::<()>().await;
    }
}

async fn cmd_save(args: SaveArgs) -> anyhow::Result<()> {
    let content = match (args.content, &args.file) {
        (Some(text), _) => text.into_bytes(),
        (None, Some(path)) => {
            std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?
        }
        (None, None) => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf).context("cannot read stdin")?;
            buf
        }
    };
    let size = content.len();
    let mut client = CommandClient::connect(&args.command).await?;
    client.save(&args.namespace, &args.name, content).await?;
    println!(
        "{} Sent SAVE {}/{} ({} bytes)",
        "✓".green(),
        args.namespace.yellow(),
        args.name.yellow(),
        size
    );
    Ok(())
}

async fn cmd_load(args: QueryArgs) -> anyhow::Result<()> {
    let mut client = QueryClient::connect(&args.query).await?;
    match client.load(&args.namespace, &args.name).await? {
        Some(content) => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&content)?;
            stdout.flush()?;
            Ok(())
        }
        None => bail!("{}/{} not found", args.namespace, args.name),
    }
}

async fn cmd_contains(args: QueryArgs) -> anyhow::Result<()> {
    let mut client = QueryClient::connect(&args.query).await?;
    let key = format!("{}/{}", args.namespace, args.name);
    if client.contains(&args.namespace, &args.name).await? {
        println!("{} {}", "Y".green().bold(), key);
    } else {
        println!("{} {}", "N".red().bold(), key);
    }
    Ok(())
}

async fn cmd_delete(args: CommandArgs) -> anyhow::Result<()> {
    let mut client = CommandClient::connect(&args.command).await?;
    client.delete(&args.namespace, &args.name).await?;
    println!("{} Sent DELETE {}/{}", "✓".green(), args.namespace.yellow(), args.name.yellow());
    Ok(())
}

async fn cmd_delete_all(args: NamespaceArgs) -> anyhow::Result<()> {
    let mut client = CommandClient::connect(&args.command).await?;
    client.delete_all(&args.namespace).await?;
    println!("{} Sent DELETE_ALL {}", "✓".green(), args.namespace.yellow());
    Ok(())
}
