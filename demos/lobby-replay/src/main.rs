//! Replays a JSON-lines script of host events through a lobby server.
//!
//! Each line of the script is one `HostEvent`. There is no game server
//! behind the replay: instructions the lobby sends back to the host are
//! written to the log instead.
//!
//! ```sh
//! RUST_LOG=debug cargo run -p lobby-replay -- demos/lobby-replay/scripts/first-visit.jsonl --memory
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use lobbyforge::prelude::*;
use lobbyforge_protocol::{Codec, JsonCodec};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(about = "Replay host events through a Lobbyforge server")]
struct Args {
    /// JSON-lines file with one host event per line.
    script: PathBuf,

    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the directory credential records are written to.
    #[arg(long)]
    credentials_dir: Option<PathBuf>,

    /// Keep credentials in memory instead of on disk.
    #[arg(long)]
    memory: bool,
}

/// A host with no players behind it. Tracks which world each scripted
/// player is in and logs everything else.
#[derive(Clone, Default)]
struct LoggingHost {
    worlds: Arc<Mutex<HashMap<PlayerId, WorldId>>>,
}

impl LoggingHost {
    /// Mirrors the world bookkeeping a real host would do for `event`.
    fn observe(&self, event: &HostEvent) {
        let mut worlds = self.worlds.lock();
        match event {
            HostEvent::Connect {
                player_id, state, ..
            } => {
                worlds.insert(*player_id, state.location.world.clone());
            }
            HostEvent::WorldChange { player_id, to, .. } => {
                worlds.insert(*player_id, to.clone());
            }
            HostEvent::Disconnect { player_id, .. } => {
                worlds.remove(player_id);
            }
            _ => {}
        }
    }
}

impl PlayerHost for LoggingHost {
    fn apply_state(&self, player_id: PlayerId, update: &StateUpdate) {
        if let Some(target) = &update.teleport {
            tracing::info!(%player_id, world = %target.world, x = target.x, y = target.y, z = target.z, "teleport");
            if let Some(world) = self.worlds.lock().get_mut(&player_id) {
                *world = target.world.clone();
            }
        }
        tracing::info!(
            %player_id,
            food_level = ?update.food_level,
            game_mode = ?update.game_mode,
            operator = ?update.operator,
            inventory_slots = update.inventory.as_ref().map(Vec::len),
            "apply state"
        );
    }

    fn apply_capabilities(&self, player_id: PlayerId, diff: &CapabilityDiff) {
        if diff.is_empty() {
            return;
        }
        tracing::info!(%player_id, granted = ?diff.granted, revoked = ?diff.revoked, "capabilities");
    }

    fn kick(&self, player_id: PlayerId, reason: MessageKey) {
        self.worlds.lock().remove(&player_id);
        tracing::info!(%player_id, %reason, "kick");
    }

    fn online_players(&self) -> Vec<(PlayerId, WorldId)> {
        self.worlds
            .lock()
            .iter()
            .map(|(id, world)| (*id, world.clone()))
            .collect()
    }
}

impl Notifier for LoggingHost {
    fn notify(&self, player_id: PlayerId, key: MessageKey) {
        tracing::info!(%player_id, message = %key, "notify");
    }

    fn alert_operators(&self, text: &str) {
        tracing::warn!(text, "operator alert");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut builder = LobbyServer::<MemoryCredentialStore, LoggingHost>::builder();
    if let Some(path) = &args.config {
        builder = builder
            .config_file(path)
            .with_context(|| format!("loading {}", path.display()))?;
    }
    if let Some(dir) = args.credentials_dir {
        builder = builder.credentials_dir(dir);
    }

    let script = std::fs::read_to_string(&args.script)
        .with_context(|| format!("reading {}", args.script.display()))?;
    let codec = JsonCodec;
    let mut events = Vec::new();
    for (n, line) in script.lines().enumerate() {
        let event = codec
            .decode_line(line)
            .with_context(|| format!("line {}", n + 1))?;
        events.extend(event);
    }
    tracing::info!(events = events.len(), "script loaded");

    let host = LoggingHost::default();
    let (tx, rx) = mpsc::channel(64);

    let run = if args.memory {
        let server = builder.build(MemoryCredentialStore::new(), host.clone())?;
        tokio::spawn(server.run(rx))
    } else {
        let server = builder.build_file_backed(host.clone())?;
        tokio::spawn(server.run(rx))
    };

    for event in events {
        host.observe(&event);
        if tx.send(event).await.is_err() {
            break;
        }
    }
    drop(tx);

    run.await.context("server task")??;
    Ok(())
}
