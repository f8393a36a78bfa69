#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI for inspecting and managing IMAP folders

use clap::{Parser, Subcommand};
use imap_connection::stream::{MetaKey, SocketStream};
use imap_connection::{Folder, FolderManager, FolderNode, ImapConfig, ImapSession};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "imap-cli")]
#[command(about = "Inspect and manage IMAP folders")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List folders
    Folders {
        /// Only list folders whose path starts with this prefix
        #[arg(long)]
        parent: Option<String>,

        /// Show folders nested by hierarchy
        #[arg(long)]
        tree: bool,
    },

    /// Find a folder by name, or by path if it contains the delimiter
    Find {
        /// Folder name or full path
        name_or_path: String,

        /// Hierarchy delimiter (default: IMAP_DELIMITER)
        #[arg(long)]
        delimiter: Option<String>,
    },

    /// Create a folder
    Create {
        /// Full path of the new folder
        path: String,

        /// Skip the EXPUNGE after creating
        #[arg(long)]
        no_expunge: bool,
    },

    /// Permanently remove messages flagged as deleted
    Expunge {
        /// Folder to expunge
        #[arg(long, default_value = "INBOX")]
        folder: String,
    },

    /// Show metadata of the underlying stream
    Meta,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = ImapConfig::from_env()?;

    let mut session = ImapSession::from_config(&config, SocketStream::new());
    session.establish(&config)?;

    let result = run(&args, &mut session);
    session.logout().ok();
    result
}

fn run(args: &Args, session: &mut ImapSession) -> anyhow::Result<()> {
    match &args.command {
        Command::Folders { parent, tree } => {
            cmd_folders(session, args, parent.as_deref(), *tree)
        }
        Command::Find {
            name_or_path,
            delimiter,
        } => cmd_find(session, args, name_or_path, delimiter.as_deref()),
        Command::Create { path, no_expunge } => cmd_create(session, args, path, !*no_expunge),
        Command::Expunge { folder } => cmd_expunge(session, args, folder),
        Command::Meta => cmd_meta(session, args),
    }
}

fn cmd_folders(
    session: &mut ImapSession,
    args: &Args,
    parent: Option<&str>,
    tree: bool,
) -> anyhow::Result<()> {
    let mut manager = FolderManager::new(session);

    if tree {
        let nodes = manager.tree(parent)?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&nodes)?);
        } else {
            print_tree(&nodes, 0);
        }
        return Ok(());
    }

    let folders = manager.get(parent)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&folders)?);
    } else {
        print_folder_table(&folders);
    }

    Ok(())
}

fn cmd_find(
    session: &mut ImapSession,
    args: &Args,
    name_or_path: &str,
    delimiter: Option<&str>,
) -> anyhow::Result<()> {
    let Some(folder) = FolderManager::new(session).find(name_or_path, delimiter)? else {
        anyhow::bail!("Folder not found: {name_or_path}");
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&folder)?);
    } else {
        print_folder_table(&[folder]);
    }

    Ok(())
}

fn cmd_create(
    session: &mut ImapSession,
    args: &Args,
    path: &str,
    expunge: bool,
) -> anyhow::Result<()> {
    let folder = FolderManager::new(session).create(path, expunge)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&folder)?);
    } else {
        println!("Created {}", folder.path);
    }

    Ok(())
}

fn cmd_expunge(session: &mut ImapSession, args: &Args, folder: &str) -> anyhow::Result<()> {
    session.select_folder(folder)?;
    let response = FolderManager::new(session).expunge()?;
    let removed = response
        .untagged
        .iter()
        .filter(|line| line.ends_with(" EXPUNGE"))
        .count();

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "folder": folder,
                "expunged": removed,
            }))?
        );
    } else {
        println!("Expunged {removed} message(s) from {folder}");
    }

    Ok(())
}

fn cmd_meta(session: &ImapSession, args: &Args) -> anyhow::Result<()> {
    let meta = session.connection().meta();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&meta)?);
    } else {
        for key in MetaKey::ALL {
            println!("{:<24} {}", key.as_str(), meta.get(key));
        }
    }

    Ok(())
}

fn print_folder_table(folders: &[Folder]) {
    if folders.is_empty() {
        println!("No folders found.");
        return;
    }

    println!("{:<40} {:<6} {}", "Path", "Delim", "Flags");
    println!("{}", "-".repeat(80));

    for folder in folders {
        println!(
            "{:<40} {:<6} {}",
            truncate(&folder.path, 38),
            folder.delimiter,
            folder.flags.join(" "),
        );
    }

    println!("\n{} folder(s)", folders.len());
}

fn print_tree(nodes: &[FolderNode], depth: usize) {
    for node in nodes {
        let marker = if node.folder.no_select() { " (no select)" } else { "" };
        println!("{}{}{}", "  ".repeat(depth), node.folder.name, marker);
        print_tree(&node.children, depth + 1);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
