//! Command-line interface.

use crate::config::{AppConfig, parse_color};
use anyhow::{Context, anyhow};
use caseboard_core::{
    BoardDocument, BoardId, BoardSession, BoardView, Camera, ConnectionId, FileClient, ItemId,
    RecordRef,
};
use caseboard_render::{ExportReceipt, Exporter, FileDownload, RenderStyle, build_scene};
use clap::{Args, Parser, Subcommand};
use kurbo::Point;
use pollster::block_on;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "caseboard", about = "Inspect, edit and export case boards", version)]
pub struct Cli {
    /// JSON configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding board files.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `caseboard_core=trace`.
    #[arg(long, global = true)]
    pub log: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create an empty board.
    New { board: BoardId, case: u64 },

    /// List stored boards.
    List,

    /// Print items, connections and notes of a board.
    Summary { board: BoardId },

    /// Pin a record onto a board.
    Pin(PinArgs),

    /// Move an item to an absolute position.
    Move {
        board: BoardId,
        item: ItemId,
        x: f64,
        y: f64,
    },

    /// Remove an item and its connections.
    Unpin { board: BoardId, item: ItemId },

    /// Connect two items.
    Connect {
        board: BoardId,
        from: ItemId,
        to: ItemId,
        #[arg(long)]
        label: Option<String>,
    },

    /// Remove a connection.
    Disconnect {
        board: BoardId,
        connection: ConnectionId,
    },

    /// Render a board to PNG.
    Export(ExportArgs),
}

#[derive(Debug, Args)]
pub struct PinArgs {
    pub board: BoardId,
    pub object_id: u64,
    /// Record kind, e.g. `evidence` or `suspect`.
    pub model: String,
    pub name: String,
    #[arg(long, default_value_t = 0.0)]
    pub x: f64,
    #[arg(long, default_value_t = 0.0)]
    pub y: f64,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    pub board: BoardId,

    /// Output file name; `.png` is appended if missing.
    #[arg(long, short)]
    pub output: Option<String>,

    #[arg(long)]
    pub export_dir: Option<PathBuf>,

    #[arg(long)]
    pub pixel_ratio: Option<f64>,

    /// Background as `#rrggbb`.
    #[arg(long)]
    pub background: Option<String>,
}

impl Cli {
    /// Configuration with this invocation's overrides applied.
    pub fn resolve_config(&self) -> anyhow::Result<AppConfig> {
        let mut config = AppConfig::load(self.config.as_deref())?;
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(filter) = &self.log {
            config.log_filter = filter.clone();
        }
        if let Commands::Export(args) = &self.command {
            if let Some(dir) = &args.export_dir {
                config.export_dir = dir.clone();
            }
            if let Some(ratio) = args.pixel_ratio {
                config.pixel_ratio = ratio;
            }
            if let Some(bg) = &args.background {
                config.background =
                    parse_color(bg).ok_or_else(|| anyhow!("Invalid background color {bg}"))?;
            }
        }
        config.validate()?;
        Ok(config)
    }
}

fn open(config: &AppConfig, board: BoardId) -> anyhow::Result<BoardSession<FileClient>> {
    let client = FileClient::new(config.data_dir.clone())?;
    let session = BoardSession::new(board, Arc::new(client));
    block_on(session.load()).with_context(|| format!("Failed to load board {board}"))?;
    Ok(session)
}

/// Run one command.
pub fn run(cli: Cli, config: &AppConfig) -> anyhow::Result<()> {
    match cli.command {
        Commands::New { board, case } => {
            let client = FileClient::new(config.data_dir.clone())?;
            if client.load(board).is_ok() {
                return Err(anyhow!("Board {board} already exists"));
            }
            client.save(&BoardDocument::new(board, case))?;
            println!("created board {board} for case {case}");
        }
        Commands::List => {
            let client = FileClient::new(config.data_dir.clone())?;
            for board in client.list_boards()? {
                println!("{board}");
            }
        }
        Commands::Summary { board } => {
            let session = open(config, board)?;
            print!("{}", summary(&session.view(), &session));
        }
        Commands::Pin(args) => {
            let session = open(config, args.board)?;
            let record = RecordRef::new(args.object_id, args.model, args.name);
            let item = block_on(session.pin_record(record, Point::new(args.x, args.y)))?;
            println!("pinned item {}", item.id);
        }
        Commands::Move { board, item, x, y } => {
            let session = open(config, board)?;
            let stored = block_on(session.move_item(item, Point::new(x, y)))?;
            println!("item {} at ({}, {})", stored.id, stored.x, stored.y);
        }
        Commands::Unpin { board, item } => {
            let mut session = open(config, board)?;
            block_on(session.unpin_item(item))?;
            println!("unpinned item {item}");
        }
        Commands::Connect {
            board,
            from,
            to,
            label,
        } => {
            let session = open(config, board)?;
            let connection = block_on(session.create_connection(from, to, label))?;
            println!("connection {} created", connection.id);
        }
        Commands::Disconnect { board, connection } => {
            let session = open(config, board)?;
            block_on(session.delete_connection(connection))?;
            println!("connection {connection} removed");
        }
        Commands::Export(args) => {
            let session = open(config, args.board)?;
            let receipt = export(&session.view(), config, args.output.as_deref())?;
            println!(
                "wrote {} ({}x{})",
                receipt.location, receipt.width, receipt.height
            );
        }
    }
    Ok(())
}

/// Render `view` and write it into the configured export directory.
pub fn export(
    view: &BoardView,
    config: &AppConfig,
    filename: Option<&str>,
) -> anyhow::Result<ExportReceipt> {
    let scene = build_scene(view, &Camera::new());
    let exporter = Exporter::new(config.export_options());
    let sink = FileDownload::new(config.export_dir.clone());
    let sheets = [RenderStyle::default().stylesheet()];
    Ok(exporter.export(&scene, &sheets, &sink, filename)?)
}

/// Plain-text listing of a board.
pub fn summary(view: &BoardView, session: &BoardSession<FileClient>) -> String {
    let mut out = format!("board {}\n", session.board());
    out.push_str(&format!("items ({}):\n", view.items.len()));
    for item in &view.items {
        out.push_str(&format!(
            "  #{} {} {} \"{}\" at ({}, {})\n",
            item.id,
            item.model.icon(),
            item.model,
            item.display_name,
            item.x,
            item.y
        ));
    }
    let edges = view.edges();
    out.push_str(&format!("connections ({}):\n", view.connections.len()));
    for connection in &view.connections {
        let drawn = edges.iter().any(|e| e.connection == connection.id);
        out.push_str(&format!(
            "  #{} {} -> {}{}{}\n",
            connection.id,
            connection.from_item,
            connection.to_item,
            connection
                .label
                .as_deref()
                .map(|l| format!(" \"{l}\""))
                .unwrap_or_default(),
            if drawn { "" } else { " (not drawn)" }
        ));
    }
    let notes = session.notes();
    out.push_str(&format!("notes ({}):\n", notes.len()));
    for note in notes {
        out.push_str(&format!("  #{} {}\n", note.id, note.title));
    }
    out
}
