use std::env;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use db_infra::{DbKind, RuntimeEnv};
use serde_json::json;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use sketchrelay::config::client::ClientTuning;
use sketchrelay::config::game::DEFAULT_FRAMES_PER_ROUND;
use sketchrelay::services::chains::load_chains;
use sketchrelay::services::{BotAgent, ClientExit, GameClient, IdleAgent, Lobby, PlayerAgent};
use sketchrelay::store::{ChangeFeed, GameStore, LocalFeed, RedisFeed, SeaStore};
use sketchrelay::telemetry::init_tracing;
use sketchrelay::AppError;

#[derive(Clone, Copy, ValueEnum)]
enum Db {
    Postgres,
    SqliteFile,
    SqliteMemory,
}

impl From<Db> for DbKind {
    fn from(db: Db) -> Self {
        match db {
            Db::Postgres => DbKind::Postgres,
            Db::SqliteFile => DbKind::SqliteFile,
            Db::SqliteMemory => DbKind::SqliteMemory,
        }
    }
}

#[derive(Parser)]
#[command(name = "sketchrelay")]
#[command(about = "Serverless telephone-style animation game")]
struct Args {
    /// Database engine; defaults to SKETCHRELAY_DB
    #[arg(long, value_enum, global = true)]
    db: Option<Db>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a game and join it as host
    Create {
        #[arg(long)]
        nickname: String,
        #[arg(long, default_value_t = DEFAULT_FRAMES_PER_ROUND)]
        frames: i16,
    },
    /// Join a game in the lobby by room code
    Join {
        #[arg(long)]
        room: String,
        #[arg(long)]
        nickname: String,
    },
    /// Start a game (host only)
    Start {
        #[arg(long)]
        game: i64,
        #[arg(long)]
        player: i64,
    },
    /// Play a game to the end with a bot and print the chains
    Play {
        #[arg(long)]
        game: i64,
        #[arg(long)]
        player: i64,
        #[arg(long, default_value_t = 1500)]
        think_ms: u64,
    },
    /// Print the chains of a completed game
    Chains {
        #[arg(long)]
        game: i64,
    },
    /// Run a whole game with several clients in this process
    Simulate {
        #[arg(long, default_value_t = 3)]
        players: usize,
        #[arg(long, default_value_t = DEFAULT_FRAMES_PER_ROUND)]
        frames: i16,
        #[arg(long, default_value_t = 200)]
        think_ms: u64,
        /// How many of the players never act
        #[arg(long, default_value_t = 0)]
        idle: usize,
    },
}

#[tokio::main]
async fn main() {
    init_tracing();

    let args = Args::parse();
    if let Err(err) = run(args).await {
        error!(code = err.code(), error = %err, "command failed");
        eprintln!("{}: {err}", err.code());
        std::process::exit(err.exit_code());
    }
}

async fn run(args: Args) -> Result<(), AppError> {
    let tuning = ClientTuning::from_env()?;

    match args.command {
        Command::Create { nickname, frames } => {
            let store = open_store(db_kind(args.db)?, None).await?;
            let created = Lobby::new(store, tuning.retry)
                .create_game(&nickname, frames)
                .await?;
            print_json(&json!({
                "game_id": created.game.id,
                "room_code": created.game.room_code,
                "player_id": created.host.id,
            }))
        }
        Command::Join { room, nickname } => {
            let store = open_store(db_kind(args.db)?, None).await?;
            let joined = Lobby::new(store, tuning.retry)
                .join_game(&room, &nickname)
                .await?;
            print_json(&json!({
                "game_id": joined.game.id,
                "player_id": joined.player.id,
                "turn_order": joined.player.turn_order,
            }))
        }
        Command::Start { game, player } => {
            let store = open_store(db_kind(args.db)?, None).await?;
            let started = Lobby::new(store, tuning.retry)
                .start_game(game, player)
                .await?;
            print_json(&started)
        }
        Command::Play {
            game,
            player,
            think_ms,
        } => {
            let feed = open_feed(false).await?;
            let store = open_store(db_kind(args.db)?, feed).await?;
            let agent: Arc<dyn PlayerAgent> =
                Arc::new(BotAgent::new(Duration::from_millis(think_ms), None));
            let client = GameClient::new(store, game, player, agent, tuning);

            let cancel = CancellationToken::new();
            spawn_ctrl_c(cancel.clone());
            match client.run(cancel).await? {
                ClientExit::Completed(chains) => print_json(&chains),
                ClientExit::Cancelled => {
                    warn!(game_id = game, player_id = player, "cancelled before the game completed");
                    Ok(())
                }
            }
        }
        Command::Chains { game } => {
            let store = open_store(db_kind(args.db)?, None).await?;
            let chains = load_chains(store.as_ref(), game).await?;
            print_json(&chains)
        }
        Command::Simulate {
            players,
            frames,
            think_ms,
            idle,
        } => {
            let kind = args.db.map(DbKind::from).unwrap_or(DbKind::SqliteMemory);
            let feed = open_feed(true).await?;
            let store = open_store(kind, feed).await?;
            simulate(store, tuning, players, frames, Duration::from_millis(think_ms), idle).await
        }
    }
}

async fn simulate(
    store: Arc<dyn GameStore>,
    tuning: ClientTuning,
    players: usize,
    frames: i16,
    think_time: Duration,
    idle: usize,
) -> Result<(), AppError> {
    let lobby = Lobby::new(store.clone(), tuning.retry);
    let created = lobby.create_game("player1", frames).await?;
    let game_id = created.game.id;
    let mut roster = vec![created.host.clone()];
    for n in 2..=players {
        let joined = lobby
            .join_game(&created.game.room_code, &format!("player{n}"))
            .await?;
        roster.push(joined.player);
    }
    lobby.start_game(game_id, created.host.id).await?;
    info!(game_id, players = roster.len(), idle, "simulation started");

    let cancel = CancellationToken::new();
    spawn_ctrl_c(cancel.clone());

    let first_idle = roster.len().saturating_sub(idle);
    let mut clients = JoinSet::new();
    for (index, player) in roster.iter().enumerate() {
        let agent: Arc<dyn PlayerAgent> = if index >= first_idle {
            Arc::new(IdleAgent)
        } else {
            Arc::new(BotAgent::new(think_time, Some(index as u64)))
        };
        let client = GameClient::new(store.clone(), game_id, player.id, agent, tuning.clone());
        let token = cancel.clone();
        clients.spawn(async move { client.run(token).await });
    }

    let mut chains = None;
    while let Some(joined) = clients.join_next().await {
        let exit = joined.map_err(|err| AppError::internal(format!("client task failed: {err}")))??;
        if let ClientExit::Completed(result) = exit {
            chains.get_or_insert(result);
        }
    }

    match chains {
        Some(chains) => print_json(&chains),
        None => {
            warn!(game_id, "simulation cancelled");
            Ok(())
        }
    }
}

fn db_kind(arg: Option<Db>) -> Result<DbKind, AppError> {
    match arg {
        Some(db) => Ok(db.into()),
        None => Ok(DbKind::from_env()?),
    }
}

async fn open_store(
    kind: DbKind,
    feed: Option<Arc<dyn ChangeFeed>>,
) -> Result<Arc<dyn GameStore>, AppError> {
    let env = RuntimeEnv::from_env()?;
    let db = sketchrelay::connect(env, kind).await?;
    let store = match feed {
        Some(feed) => SeaStore::new(db).with_feed(feed),
        None => SeaStore::new(db),
    };
    Ok(Arc::new(store))
}

/// Redis when `REDIS_URL` is set, otherwise an in-process feed if asked for.
async fn open_feed(local_fallback: bool) -> Result<Option<Arc<dyn ChangeFeed>>, AppError> {
    match env::var("REDIS_URL") {
        Ok(url) if !url.trim().is_empty() => {
            let feed: Arc<dyn ChangeFeed> = RedisFeed::connect(url.trim()).await?;
            Ok(Some(feed))
        }
        _ if local_fallback => Ok(Some(Arc::new(LocalFeed::default()))),
        _ => Ok(None),
    }
}

fn spawn_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, stopping clients");
            cancel.cancel();
        }
    });
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
