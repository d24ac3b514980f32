mod commands;
mod config;
mod error;
mod probe;
mod prompt;
mod sources;
mod store;
mod traits;
mod types;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{render_rows, MirrorCommands};
use config::Settings;
use error::MirrorError;
use prompt::Prompter;
use sources::get_manager;
use store::JsonStore;
use traits::Store;
use tracing_subscriber::EnvFilter;
use types::validate_url;

#[derive(Parser)]
#[command(name = "nmirror")]
#[command(about = "Switch and manage npm registry mirrors", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all mirrors, marking the one in use
    Ls,
    /// Switch the registry to a mirror (e.g., nmirror use taobao)
    Use {
        /// Mirror name. If omitted, choose interactively.
        name: Option<String>,
    },
    /// Show the mirror currently in use
    Current,
    /// Add a custom mirror (e.g., nmirror add company https://npm.company.com/)
    Add {
        name: Option<String>,
        url: Option<String>,
    },
    /// Delete a custom mirror
    Delete { name: Option<String> },
    /// Rename a custom mirror
    Rename {
        name: Option<String>,
        new_name: Option<String>,
    },
    /// Change the URL of a custom mirror
    Edit {
        name: Option<String>,
        url: Option<String>,
    },
    /// Measure the response time of a mirror
    Ping {
        name: Option<String>,

        /// Test every mirror and sort by latency
        #[arg(long, short, conflicts_with = "name")]
        all: bool,
    },
}

// 日志只写 stderr, stdout 留给命令输出
fn initialize_tracing() {
    let filter = EnvFilter::try_from_env(config::ENV_LOG).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_tracing();

    let settings = Settings::from_env();
    tracing::debug!(?settings, "settings resolved");

    let manager = get_manager(&settings.package_manager)?;
    let store = JsonStore::new(settings.registries_path.clone());
    tracing::debug!(path = ?store.path(), manager = manager.name(), "using registries file");
    let cmds = MirrorCommands::new(&store, manager.as_ref());

    // 单个命令的错误只打印, 不影响退出码
    if let Err(e) = run(cli.command, &cmds, &settings).await {
        match e {
            MirrorError::Aborted => println!("{}", "Cancelled".yellow()),
            e if e.is_protected() => println!("{}", e.to_string().yellow()),
            e => println!("{}", e.to_string().red()),
        }
    }

    Ok(())
}

async fn run(command: Commands, cmds: &MirrorCommands<'_>, settings: &Settings) -> error::Result<()> {
    match command {
        Commands::Ls => handle_ls(cmds).await,
        Commands::Use { name } => handle_use(cmds, name).await,
        Commands::Current => handle_current(cmds).await,
        Commands::Add { name, url } => handle_add(cmds, name, url).await,
        Commands::Delete { name } => handle_delete(cmds, name).await,
        Commands::Rename { name, new_name } => handle_rename(cmds, name, new_name).await,
        Commands::Edit { name, url } => handle_edit(cmds, name, url).await,
        Commands::Ping { name, all } => handle_ping(cmds, settings, name, all).await,
    }
}

// --- Handlers ---

async fn handle_ls(cmds: &MirrorCommands<'_>) -> error::Result<()> {
    let set = cmds.load().await?;
    let rows = cmds.list(&set).await;
    println!("{}", render_rows(&rows).join("\n"));
    Ok(())
}

async fn handle_use(cmds: &MirrorCommands<'_>, name: Option<String>) -> error::Result<()> {
    let set = cmds.load().await?;
    let name = match name {
        Some(n) => n,
        None => Prompter::stdio().select("Select a mirror", &set.names())?,
    };

    let mirror = cmds.use_mirror(&set, &name).await?;
    println!("{}", format!("Switched to {} ({})", mirror.name, mirror.registry).green());
    Ok(())
}

async fn handle_current(cmds: &MirrorCommands<'_>) -> error::Result<()> {
    let set = cmds.load().await?;
    let current = cmds.current(&set).await?;
    println!("{}", format!("Current registry: {}", current).green());
    Ok(())
}

async fn handle_add(cmds: &MirrorCommands<'_>, name: Option<String>, url: Option<String>) -> error::Result<()> {
    let mut set = cmds.load().await?;
    let mut prompter = Prompter::stdio();

    // 先收集全部输入, 再修改
    let name = match name {
        Some(n) => n,
        None => prompter.input("Mirror name:", |s| set.validate_new_name(s))?,
    };
    let url = match url {
        Some(u) => u,
        None => prompter.input("Mirror URL:", validate_url)?,
    };

    let mirror = cmds.add(&mut set, &name, &url).await?;
    println!("{}", format!("Added {} ({})", mirror.name, mirror.registry).blue());
    Ok(())
}

async fn handle_delete(cmds: &MirrorCommands<'_>, name: Option<String>) -> error::Result<()> {
    let mut set = cmds.load().await?;
    let name = match name {
        Some(n) => n,
        None => {
            let candidates = cmds.custom_candidates(&set, "delete")?;
            Prompter::stdio().select("Select a mirror to delete", &candidates)?
        }
    };

    let removed = cmds.delete(&mut set, &name).await?;
    println!("{}", format!("Deleted {}", removed.name).green());
    Ok(())
}

async fn handle_rename(
    cmds: &MirrorCommands<'_>,
    name: Option<String>,
    new_name: Option<String>,
) -> error::Result<()> {
    let mut set = cmds.load().await?;
    let mut prompter = Prompter::stdio();

    let name = match name {
        Some(n) => n,
        None => {
            let candidates = cmds.custom_candidates(&set, "rename")?;
            prompter.select("Select a mirror to rename", &candidates)?
        }
    };
    let new_name = match new_name {
        Some(n) => n,
        None => prompter.input("New name:", |s| set.validate_new_name(s))?,
    };

    let mirror = cmds.rename(&mut set, &name, &new_name).await?;
    println!("{}", format!("Renamed {} to {}", name, mirror.name).green());
    Ok(())
}

async fn handle_edit(cmds: &MirrorCommands<'_>, name: Option<String>, url: Option<String>) -> error::Result<()> {
    let mut set = cmds.load().await?;
    let mut prompter = Prompter::stdio();

    let name = match name {
        Some(n) => n,
        None => {
            let candidates = cmds.custom_candidates(&set, "edit")?;
            prompter.select("Select a mirror to edit", &candidates)?
        }
    };
    let url = match url {
        Some(u) => u,
        None => prompter.input("New URL:", validate_url)?,
    };

    let mirror = cmds.edit(&mut set, &name, &url).await?;
    println!("{}", format!("Updated {} ({})", mirror.name, mirror.registry).green());
    Ok(())
}

fn latency_label(latency: &error::Result<u64>) -> String {
    match latency {
        Ok(ms) => format!("{}ms", ms),
        Err(MirrorError::PingFailed { reason, .. }) if reason == "timeout" => "Timeout".to_string(),
        Err(_) => "Failed".to_string(),
    }
}

async fn handle_ping(
    cmds: &MirrorCommands<'_>,
    settings: &Settings,
    name: Option<String>,
    all: bool,
) -> error::Result<()> {
    let set = cmds.load().await?;
    let client = utils::build_client(settings.ping_timeout)?;

    if all {
        let results = cmds.ping_all(&client, &set).await;
        println!();
        println!("{:<4} {:<10} {:<12} URL", "RANK", "LATENCY", "NAME");
        println!("{}", "-".repeat(60));
        for (i, res) in results.iter().enumerate() {
            let latency_str = latency_label(&res.latency);
            println!(
                "{:<4} {:<10} {:<12} {}",
                i + 1,
                latency_str,
                res.mirror.name,
                res.mirror.ping
            );
        }
        return Ok(());
    }

    let name = match name {
        Some(n) => n,
        None => Prompter::stdio().select("Select a mirror", &set.names())?,
    };

    let ms = cmds.ping(&client, &set, &name).await?;
    println!("{}", format!("Response time: {}ms", ms).blue());
    Ok(())
}
