/// Riff - offline renderer for the Riff Player playback engine
use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use riff_audio::WavImpulseResponse;
use riff_cli::{CatalogStore, CliConfig, WavDecoder};
use riff_core::{TrackId, TrackStore};
use riff_playback::{
    BoostSelector, JsonSettingsStore, MemorySettingsStore, PlaybackController, PlaybackEvent,
    SettingsStore, TransportState,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Frames rendered per `process_audio` call
const BLOCK_FRAMES: usize = 1024;

#[derive(Parser)]
#[command(name = "riff")]
#[command(about = "Render Riff Player tracks through the effects chain", long_about = None)]
struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long, global = true, env = "RIFF_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one track into a WAV file
    Render(RenderArgs),
    /// Draw boosted tracks from a catalog
    Boost {
        /// Catalog JSON file
        #[arg(long)]
        catalog: PathBuf,
        /// Number of draws
        #[arg(short = 'n', long, default_value_t = 1)]
        draws: usize,
        /// Seed for reproducible draws
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Args)]
struct RenderArgs {
    /// Catalog JSON file
    #[arg(long)]
    catalog: PathBuf,
    /// Id of the track to render
    #[arg(long)]
    track: String,
    /// Queue ids, comma separated (default: the track alone)
    #[arg(long, value_delimiter = ',')]
    queue: Vec<String>,
    /// Output WAV file
    #[arg(short, long)]
    out: PathBuf,
    /// Tempo rate (0.4 - 2.0, 0.1 steps)
    #[arg(long)]
    rate: Option<f32>,
    /// Use the slowed preset rate
    #[arg(long)]
    slowed: bool,
    /// Impulse response WAV; enables reverb
    #[arg(long)]
    ir: Option<PathBuf>,
    /// Pitch offset in semitones
    #[arg(long, allow_hyphen_values = true)]
    pitch: Option<f32>,
    /// Keep the original pitch when the rate changes
    #[arg(long)]
    preserve_pitch: bool,
    /// EQ band gain as INDEX=DB, repeatable
    #[arg(long = "band", value_parser = parse_band, allow_hyphen_values = true)]
    bands: Vec<(usize, f32)>,
    /// Stop after this many seconds of output
    #[arg(long)]
    max_seconds: Option<f32>,
    /// Write updated view counts back to the catalog
    #[arg(long)]
    save_catalog: bool,
}

fn parse_band(value: &str) -> Result<(usize, f32), String> {
    let (index, gain) = value
        .split_once('=')
        .ok_or_else(|| format!("expected INDEX=DB, got '{value}'"))?;
    let index = index
        .trim()
        .parse()
        .map_err(|e| format!("invalid band index '{index}': {e}"))?;
    let gain = gain
        .trim()
        .parse()
        .map_err(|e| format!("invalid gain '{gain}': {e}"))?;
    Ok((index, gain))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "riff_cli=info,riff_playback=info,riff_audio=info,riff_core=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Render(args) => render(config, args).await,
        Commands::Boost {
            catalog,
            draws,
            seed,
        } => boost(&catalog, draws, seed).await,
    }
}

async fn render(config: CliConfig, args: RenderArgs) -> anyhow::Result<()> {
    let catalog = Arc::new(
        CatalogStore::open(&args.catalog)
            .with_context(|| format!("Failed to open catalog {}", args.catalog.display()))?,
    );
    let decoder = Arc::new(WavDecoder::new(catalog.base_dir()));
    let settings: Arc<dyn SettingsStore> = match &config.settings_path {
        Some(path) => Arc::new(JsonSettingsStore::new(path)),
        None => Arc::new(MemorySettingsStore::new()),
    };

    let sample_rate = config.playback.sample_rate;
    let mut builder = PlaybackController::builder(catalog.clone(), decoder)
        .config(config.playback)
        .settings_store(settings);
    if let Some(ir) = &args.ir {
        builder = builder.impulse_source(Arc::new(WavImpulseResponse::new(ir)));
    }
    let controller = builder.build();
    let logger = tokio::spawn(log_events(controller.subscribe()));

    // Persisted settings can be changed before anything is loaded
    if let Some(rate) = args.rate {
        controller.set_rate(rate).await?;
    }
    if let Some(semitones) = args.pitch {
        controller.set_pitch_offset(semitones).await?;
    }
    for &(band, gain) in &args.bands {
        controller.set_band_gain(band, gain).await?;
    }

    let track_id = TrackId::new(args.track.as_str());
    let track = catalog
        .fetch_track(&track_id)
        .await
        .with_context(|| format!("Track {track_id} is not in the catalog"))?;
    let queue = (!args.queue.is_empty())
        .then(|| args.queue.iter().map(|id| TrackId::new(id.as_str())).collect());
    controller.load(track, queue).await?;

    let current = controller.settings();
    let limits = &controller.config().limits;
    if args.slowed && !current.is_slowed(controller.config().slowed_rate, limits) {
        controller.toggle_slowed().await?;
    }
    if args.preserve_pitch && !current.preserve_pitch {
        controller.toggle_preserve_pitch().await?;
    }
    if args.ir.is_some() && !current.reverb_enabled && !controller.toggle_reverb().await? {
        bail!("Reverb could not be enabled with the given impulse response");
    }

    let max_frames = args
        .max_seconds
        .map(|secs| (secs.max(0.0) * sample_rate as f32) as usize);
    let out = args.out.clone();
    let worker = controller.clone();
    let frames = tokio::task::spawn_blocking(move || {
        render_to_wav(&worker, &out, sample_rate, max_frames)
    })
    .await??;

    println!(
        "Rendered {} frames ({:.2}s) of '{}' to {}",
        frames,
        frames as f64 / f64::from(sample_rate),
        track_id,
        args.out.display()
    );

    if args.save_catalog {
        catalog.save().context("Failed to save catalog")?;
    }

    drop(controller);
    logger.abort();
    Ok(())
}

/// Pull blocks until the track finishes (or `max_frames` is reached)
fn render_to_wav(
    controller: &PlaybackController,
    out: &Path,
    sample_rate: u32,
    max_frames: Option<usize>,
) -> anyhow::Result<usize> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(out, spec)
        .with_context(|| format!("Failed to create {}", out.display()))?;

    let mut block = vec![0.0f32; BLOCK_FRAMES * 2];
    let mut frames = 0usize;
    while controller.process_audio(&mut block) {
        for &sample in &block {
            writer.write_sample(sample)?;
        }
        frames += BLOCK_FRAMES;

        if controller.state() != TransportState::Playing {
            break;
        }
        if max_frames.is_some_and(|max| frames >= max) {
            break;
        }
    }

    writer.finalize()?;
    Ok(frames)
}

async fn log_events(mut events: broadcast::Receiver<PlaybackEvent>) {
    loop {
        match events.recv().await {
            Ok(PlaybackEvent::Error { kind, message }) => {
                tracing::warn!(?kind, %message, "Playback error");
            }
            Ok(event) => tracing::debug!(?event, "Playback event"),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event log lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn boost(catalog: &Path, draws: usize, seed: Option<u64>) -> anyhow::Result<()> {
    let catalog = CatalogStore::open(catalog)
        .with_context(|| format!("Failed to open catalog {}", catalog.display()))?;
    let levels = catalog.fetch_boost_levels().await?;

    let mut selector = seed.map_or_else(BoostSelector::new, BoostSelector::seeded);
    let mut counts: BTreeMap<TrackId, usize> = BTreeMap::new();
    for _ in 0..draws {
        match selector.pick(&levels) {
            Some(id) => *counts.entry(id).or_default() += 1,
            None => {
                println!("No boosted tracks in catalog");
                return Ok(());
            }
        }
    }

    for (id, count) in &counts {
        let level = levels.get(id).copied().unwrap_or(0);
        println!(
            "{id}\tlevel {level}\t{count} draw(s)\t{:.1}%",
            *count as f64 * 100.0 / draws as f64
        );
    }
    Ok(())
}
