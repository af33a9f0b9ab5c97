use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use env_logger::{Builder, Target};
use log::LevelFilter;
use playsync_model::{ContentItem, ItemId, MediaSourceId};
use playsync_player::domains::player::state::format_time;
use playsync_player::domains::player::{
    SessionCommand, SessionController, SessionHandle, SessionOptions,
    SessionServices, SubtitleChoice, spawn_session,
};
use playsync_player::infra::api_client::{ClientIdentity, JellyfinApiClient};
use playsync_player::infra::config::PlayerConfig;
use playsync_player::infra::engine::MediaEngine;
use playsync_player::infra::services::DirectoryOfflineStore;
use playsync_player::infra::settings::{JsonFileSettingsStore, PlayerSettings};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "playsync", about = "Play catalog items in mpv and keep the server in sync")]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, env = "PLAYSYNC_SERVER_URL")]
    server: Option<String>,
    #[arg(long, env = "PLAYSYNC_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,
    #[arg(long, env = "PLAYSYNC_USER_ID")]
    user: Option<String>,
    /// mpv executable
    #[arg(long)]
    mpv: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play a catalog item
    Play {
        item_id: String,
        #[arg(long)]
        media_source: Option<String>,
    },
    /// Play a local file without reporting
    Open { path: PathBuf },
    /// Write the effective configuration to disk
    SaveConfig,
}

fn init_logger() {
    Builder::new()
        .target(Target::Stdout)
        .filter_level(LevelFilter::Warn)
        .filter_module("playsync_player", LevelFilter::Debug)
        .filter_module("playsync", LevelFilter::Debug)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        init_logger();
    } else {
        env_logger::init();
    }

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => PlayerConfig::load_from(path),
        None => PlayerConfig::load(),
    };
    if let Some(server) = cli.server {
        config.server_url = server;
    }
    if let Some(token) = cli.token {
        config.access_token = token;
    }
    if let Some(user) = cli.user {
        config.user_id = Some(user);
    }
    if let Some(mpv) = cli.mpv {
        config.mpv_binary = mpv;
    }

    if let Command::SaveConfig = cli.command {
        match &cli.config {
            Some(path) => config.save_to(path)?,
            None => config.save()?,
        }
        println!("Configuration saved");
        return Ok(());
    }

    let identity = ClientIdentity {
        client_name: config.client_name.clone(),
        device_name: config.device_name.clone(),
        device_id: config.device_id.clone(),
        ..ClientIdentity::default()
    };
    let mut client = JellyfinApiClient::new(
        &config.server_url,
        config.access_token.clone(),
        identity,
    )?;
    if let Some(user_id) = &config.user_id {
        client = client.with_user_id(user_id.clone());
    }

    let settings = match config.settings_path() {
        Some(path) => PlayerSettings::new(Arc::new(
            JsonFileSettingsStore::open(&path).with_context(|| {
                format!("failed to open settings at {}", path.display())
            })?,
        )),
        None => PlayerSettings::in_memory(),
    };

    let mut services = SessionServices::new(build_engine(&config)?, Arc::new(client.clone()))
        .with_settings(settings);
    if let Some(dir) = &config.offline_dir {
        services = services.with_offline(Arc::new(DirectoryOfflineStore::new(dir)));
    }
    let options = SessionOptions {
        progress_interval: config.progress_interval(),
        autoplay_countdown_seconds: config.autoplay_countdown_secs,
        ..SessionOptions::default()
    };

    let mut controller = SessionController::new(services, options);
    controller
        .initialize()
        .await
        .context("failed to start the playback engine")?;
    let (handle, session) = spawn_session(controller);

    match cli.command {
        Command::Play {
            item_id,
            media_source,
        } => {
            let item_id = ItemId::parse(item_id)?;
            let item = if config.user_id.is_some() {
                client.fetch_item(&item_id).await?
            } else {
                log::warn!("No user id configured, playing without resume data");
                ContentItem::new(item_id)
            };
            handle
                .play_track(item, media_source.map(MediaSourceId::from))
                .await?;
        }
        Command::Open { path } => {
            handle.send(SessionCommand::OpenFile(path)).await?;
        }
        Command::SaveConfig => {}
    }

    print_controls();
    tokio::select! {
        result = read_controls(&handle) => result?,
        _ = tokio::signal::ctrl_c() => log::info!("Interrupted"),
    }

    handle.shutdown().await?;
    session.await.context("session task failed")?;
    Ok(())
}

#[cfg(unix)]
fn build_engine(config: &PlayerConfig) -> Result<Arc<dyn MediaEngine>> {
    use playsync_player::infra::engine::mpv_ipc::{MpvIpcConfig, MpvIpcEngine};

    let socket = config
        .mpv_socket_path
        .clone()
        .unwrap_or_else(MpvIpcConfig::default_socket_path);
    Ok(Arc::new(MpvIpcEngine::new(MpvIpcConfig::new(
        &config.mpv_binary,
        socket,
    ))))
}

#[cfg(not(unix))]
fn build_engine(_config: &PlayerConfig) -> Result<Arc<dyn MediaEngine>> {
    bail!("the mpv IPC engine needs unix domain sockets")
}

fn print_controls() {
    println!(
        "Controls: [space] play/pause  [f/b] skip  [+/-] volume  [m] mute  \
         [s <id>|off] subtitles  [a <id>] audio  [F] fullscreen  [i] status  [q] quit"
    );
}

async fn read_controls(handle: &SessionHandle) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            continue;
        }
        if line == "i" {
            print_status(handle);
            continue;
        }
        let volume = handle.snapshot().session.volume;
        let command = match parse_control(line, volume) {
            Ok(Some(command)) => command,
            Ok(None) => break,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };
        handle.send(command).await?;
    }
    Ok(())
}

fn print_status(handle: &SessionHandle) {
    let snapshot = handle.snapshot();
    let session = &snapshot.session;
    let title = session
        .current_track
        .as_ref()
        .and_then(|item| item.name.clone())
        .unwrap_or_else(|| "Nothing playing".to_string());
    println!(
        "{title} [{:?}] {} / {}  volume {:.0}",
        snapshot.state,
        format_time(session.time_position),
        format_time(session.duration),
        session.volume
    );
    if let Some(notice) = &session.last_error {
        println!("Error: {}", notice.message);
    }
}

/// `Ok(None)` means quit.
fn parse_control(line: &str, volume: f64) -> Result<Option<SessionCommand>> {
    if line == " " {
        return Ok(Some(SessionCommand::TogglePlayPause));
    }
    let mut parts = line.split_whitespace();
    let Some(control) = parts.next() else {
        bail!("empty control");
    };
    let command = match (control, parts.next()) {
        ("q", _) => return Ok(None),
        ("p", _) => SessionCommand::TogglePlayPause,
        ("f", _) => SessionCommand::SkipForward,
        ("b", _) => SessionCommand::SkipBackward,
        ("m", _) => SessionCommand::ToggleMute,
        ("F", _) => SessionCommand::ToggleFullscreen,
        ("n", _) => SessionCommand::PlayNextNow,
        ("c", _) => SessionCommand::CancelAutoplay,
        ("+", _) | ("-", _) => {
            let step = if line.starts_with('+') { 5.0 } else { -5.0 };
            SessionCommand::SetVolume((volume + step).clamp(0.0, 100.0))
        }
        ("s", Some("off")) => SessionCommand::SelectSubtitle(SubtitleChoice::Off),
        ("s", Some(id)) => SessionCommand::SelectSubtitle(SubtitleChoice::Track(
            id.parse().context("subtitle id must be a number")?,
        )),
        ("a", Some(id)) => SessionCommand::SelectAudioTrack(
            id.parse().context("audio id must be a number")?,
        ),
        ("seek", Some(position)) => SessionCommand::Seek(
            position.parse().context("seek position must be seconds")?,
        ),
        (other, _) => bail!("unknown control: {other}"),
    };
    Ok(Some(command))
}
