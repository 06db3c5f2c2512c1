/// Cadence Simulator - watch the playback engine work against a fake host
use anyhow::Context;
use cadence_core::{PlayMode, PlaylistStore};
use cadence_playback::{
    host_channel, Command, HostMessage, PlayerOrchestrator, PlayerRuntime, ProgressTracker,
    RetryCoordinator,
};
use cadence_simulator::{demo::demo_playlist, Deck, SimBackend, SimulatorConfig};
use cadence_storage::{FileStore, JsonPlaylistStore};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cadence-sim")]
#[command(about = "Drive the Cadence playback engine against a simulated host", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CADENCE_CONFIG")]
    config: Option<PathBuf>,

    /// Play mode: full or peak
    #[arg(short, long)]
    mode: Option<String>,

    /// Directory for stored playlists
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Stop after this many seconds
    #[arg(long)]
    run_for: Option<u64>,

    /// Song ids that have no playable resource
    #[arg(long, value_delimiter = ',')]
    broken: Vec<String>,

    /// Replace the stored playlist with the demo playlist
    #[arg(long)]
    seed_demo: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cadence=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    simulate(config, cli.seed_demo).await
}

fn load_config(cli: &Cli) -> anyhow::Result<SimulatorConfig> {
    let mut config = SimulatorConfig::load(cli.config.as_deref())?;

    if let Some(mode) = cli.mode.as_deref() {
        config.player.mode = PlayMode::from_str(mode)
            .with_context(|| format!("unknown play mode '{mode}' (expected full or peak)"))?;
    }
    if let Some(dir) = cli.data_dir.clone() {
        config.storage.data_dir = dir;
    }
    if let Some(secs) = cli.run_for {
        config.simulation.run_for_secs = Some(secs);
    }
    config.simulation.broken.extend(cli.broken.iter().cloned());

    config.validate()?;
    Ok(config)
}

async fn simulate(config: SimulatorConfig, seed_demo: bool) -> anyhow::Result<()> {
    let mode = config.player.playlist_mode.clone();
    tracing::info!("Starting Cadence simulator");
    tracing::info!("Play mode: {}", config.player.mode);
    tracing::info!("Data directory: {}", config.storage.data_dir.display());

    // Persistence
    let files = FileStore::open(&config.storage.data_dir).context("opening data directory")?;
    let store = JsonPlaylistStore::new(files.clone());
    if seed_demo || store.load(&mode)?.is_empty() {
        store.save(&mode, &demo_playlist())?;
        tracing::info!("Seeded demo playlist");
    }

    // Host and engine
    let (tx, inbox) = host_channel();
    let deck = Deck::new(tx.clone());
    let backend = SimBackend::new(deck.clone(), &config.simulation);

    let mut player = PlayerOrchestrator::new(&config.player, Box::new(backend));
    let restored = player.restore_playlist(&store, &mode);
    if let Some(song) = player.playlist().get(0) {
        let view = song.now_playing();
        tracing::info!(songs = restored, first = %view.name, artists = %view.artists, "Playlist ready");
    }

    let coordinator = RetryCoordinator::new(config.player.retry, &player)
        .with_store(Box::new(JsonPlaylistStore::new(files)), mode);
    let tracker = ProgressTracker::new(&player);
    let mut runtime = PlayerRuntime::new(player, coordinator, tracker, inbox);
    let mut progress = runtime.watch_progress();

    if restored > 0 {
        tx.send(HostMessage::Command(Command::PlayAt { index: 0 }))
            .context("runtime inbox closed")?;
    }

    // Shutdown on Ctrl-C or after the configured run time
    let shutdown = CancellationToken::new();
    let stopper = {
        let shutdown = shutdown.clone();
        let run_for = config.simulation.run_for_secs.map(Duration::from_secs);
        async move {
            match run_for {
                Some(limit) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        () = tokio::time::sleep(limit) => tracing::info!("Run time elapsed"),
                    }
                }
                None => {
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
            shutdown.cancel();
        }
    };

    let reporter = async {
        while progress.changed().await.is_ok() {
            let window = *progress.borrow();
            tracing::debug!(
                current = window.current,
                min = window.min,
                max = window.max,
                "Progress {:.0}%",
                window.fraction() * 100.0
            );
        }
    };

    let tick = Duration::from_millis(config.simulation.tick_ms);
    let step = config.simulation.step();

    let result = tokio::select! {
        result = runtime.run(shutdown.clone()) => result,
        () = deck.run(tick, step, shutdown.clone()) => Ok(()),
        () = stopper => Ok(()),
        () = reporter => Ok(()),
    };
    shutdown.cancel();

    let player = runtime.orchestrator();
    tracing::info!(status = %player.status(), current = ?player.current_index(), "Simulator stopped");

    result.context("playback halted")
}
