pub mod db;
pub mod dispatch;
pub mod error;
pub mod gesture;
pub mod modes;
pub mod runtime;
pub mod settings;
pub mod utils;

use std::{env, path::PathBuf};

use anyhow::{bail, Context, Result};
use log::{info, warn};
use tokio::io::{AsyncWriteExt, BufWriter};

use db::Database;
use dispatch::{FunctionType, UiEventBus};
use gesture::GestureType;
use modes::OverlayRegistry;
use runtime::{FrameLoopController, GestureRuntimeContext, LoopConfig, ReplaySource};
use settings::SettingsStore;

const USAGE: &str = "usage: presto [replay] <frames.jsonl> | presto map <GESTURE> <FUNCTION> | presto show-mapping";

enum Command {
    Replay(PathBuf),
    Map(GestureType, FunctionType),
    ShowMapping,
}

fn parse_args(args: &[String]) -> Result<Command> {
    match args {
        [cmd] if cmd == "show-mapping" => Ok(Command::ShowMapping),
        [cmd, gesture, function] if cmd == "map" => Ok(Command::Map(
            gesture.parse()?,
            function.parse()?,
        )),
        [cmd, path] if cmd == "replay" => Ok(Command::Replay(PathBuf::from(path))),
        [path] => Ok(Command::Replay(PathBuf::from(path))),
        _ => bail!(USAGE),
    }
}

struct AppPaths {
    data_dir: PathBuf,
    user_id: String,
}

impl AppPaths {
    fn from_env() -> Self {
        Self {
            data_dir: env::var_os("PRESTO_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".presto")),
            user_id: env::var("PRESTO_USER").unwrap_or_else(|_| "local".to_string()),
        }
    }
}

pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = parse_args(&args)?;
    let paths = AppPaths::from_env();

    std::fs::create_dir_all(&paths.data_dir).with_context(|| {
        format!("failed to create data directory {}", paths.data_dir.display())
    })?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(async move {
        let database = Database::new(paths.data_dir.join("presto.sqlite3"))?;
        database.ensure_user(&paths.user_id).await?;

        match command {
            Command::ShowMapping => show_mapping(&database, &paths.user_id).await,
            Command::Map(gesture, function) => {
                assign_mapping(&database, &paths.user_id, gesture, function).await
            }
            Command::Replay(path) => replay(&database, &paths, path).await,
        }
    })
}

async fn show_mapping(database: &Database, user_id: &str) -> Result<()> {
    let mapping = database.load_mapping(user_id).await?;
    for (gesture, function) in mapping.iter() {
        println!("{:<28} {function}", gesture.as_str());
    }
    Ok(())
}

async fn assign_mapping(
    database: &Database,
    user_id: &str,
    gesture: GestureType,
    function: FunctionType,
) -> Result<()> {
    let mut mapping = database.load_mapping(user_id).await?;
    if let Some(previous) = mapping.assign(gesture, function) {
        info!("{previous} no longer triggers {function}");
    }
    database.save_mapping(user_id, &mapping).await?;
    info!("{gesture} now triggers {function} for '{user_id}'");
    Ok(())
}

async fn replay(database: &Database, paths: &AppPaths, frames: PathBuf) -> Result<()> {
    let mapping = database.load_mapping(&paths.user_id).await?;
    let settings_store = SettingsStore::new(paths.data_dir.join("settings.json"))?;
    let settings = settings_store.settings();

    let bus = UiEventBus::new();
    let mut events = bus.subscribe();
    let printer = tokio::spawn(async move {
        let mut stdout = BufWriter::new(tokio::io::stdout());
        while let Some(event) = events.recv().await {
            let line = match serde_json::to_string(&event) {
                Ok(line) => line,
                Err(err) => {
                    warn!("failed to serialize {event:?}: {err}");
                    continue;
                }
            };
            stdout.write_all(line.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
        Ok::<(), std::io::Error>(())
    });

    let ctx = GestureRuntimeContext::new(&settings, mapping, OverlayRegistry::new());
    let mut controller = FrameLoopController::new(bus);
    controller.start(ReplaySource::new(frames), ctx, LoopConfig::from(&settings))?;

    let interrupt = controller.cancel_handle().map(|token| {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, stopping frame loop");
                token.cancel();
            }
        })
    });

    let final_ctx = controller.join().await?;
    if let Some(task) = interrupt {
        task.abort();
    }
    if let Some(ctx) = final_ctx {
        info!(
            "replay finished (detection {})",
            if ctx.detection_enabled { "enabled" } else { "paused" }
        );
    }

    // Dropping the controller drops the last bus sender and ends the printer.
    drop(controller);
    printer
        .await
        .context("event printer task failed to join")?
        .context("failed to write events to stdout")?;
    Ok(())
}
