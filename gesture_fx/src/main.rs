//! gesture_fx command-line entry point.
//!
//! Without a hand tracker attached, gestures are typed on stdin one per line
//! (`point`, `open palm`, `01100`, `none`, `q`).

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use gesture_fx::sink::{list_ports, open_midi_output};
use gesture_fx::{
    spawn_landmark_source, AppConfig, EffectController, GestureLoop, LineSource, LogSink,
    MidiSink, Preset, UnknownPolicy,
};
use hand_gesture::ThumbRule;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Drive MIDI effects from hand gestures", long_about = None)]
struct Cli {
    /// JSON config file; flags below override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Gesture vocabulary and effect shape: effects | pitch-shift.
    #[arg(long)]
    preset: Option<Preset>,

    /// What an unrecognized pose does to a running effect: stop | hold.
    #[arg(long)]
    unknown: Option<UnknownPolicy>,

    /// Thumb extension rule: directional | wrist-distance.
    #[arg(long)]
    thumb: Option<ThumbRule>,

    /// MIDI channel (0–15).
    #[arg(long)]
    channel: Option<u8>,

    /// Ramp increment per step.
    #[arg(long)]
    step: Option<u8>,

    /// Milliseconds between ramp steps.
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Prefer the output port whose name contains this text.
    #[arg(long)]
    port: Option<String>,

    /// Log MIDI messages instead of sending them.
    #[arg(long)]
    dry_run: bool,

    /// List MIDI output ports and exit.
    #[arg(long)]
    list_ports: bool,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> gesture_fx::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    if cli.list_ports {
        for (i, name) in list_ports()?.iter().enumerate() {
            println!("{}: {}", i, name);
        }
        return Ok(());
    }

    let cfg = build_config(&cli)?;
    info!(
        preset = ?cfg.preset,
        unknown = ?cfg.unknown_policy,
        thumb = ?cfg.thumb_rule,
        channel = cfg.channel,
        detection = cfg.min_detection_confidence,
        tracking = cfg.min_tracking_confidence,
        "starting gesture controller"
    );

    let sink: Arc<dyn MidiSink> = if cli.dry_run {
        Arc::new(LogSink)
    } else {
        open_midi_output(cfg.midi_port.as_deref(), &cfg.virtual_port_name)
    };

    let controller = EffectController::new(cfg.catalog(), sink)
        .stop_timeout(cfg.stop_timeout());
    let frames = spawn_landmark_source(LineSource::stdin(cfg.preset.table()));

    println!("Type a gesture per line (name or finger pattern like 01000), `none`, or `q` to quit.");
    GestureLoop::new(cfg.classifier(), cfg.unknown_policy, &controller).run(frames);
    Ok(())
}

fn build_config(cli: &Cli) -> gesture_fx::Result<AppConfig> {
    let mut cfg = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None       => AppConfig::default(),
    };
    if let Some(p) = cli.preset      { cfg.preset = p; }
    if let Some(u) = cli.unknown     { cfg.unknown_policy = u; }
    if let Some(t) = cli.thumb       { cfg.thumb_rule = t; }
    if let Some(c) = cli.channel     { cfg.channel = c; }
    if let Some(s) = cli.step        { cfg.ramp_step = s; }
    if let Some(i) = cli.interval_ms { cfg.ramp_interval_ms = i; }
    if let Some(p) = &cli.port       { cfg.midi_port = Some(p.clone()); }
    cfg.validate()?;
    Ok(cfg)
}

fn init_tracing(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .try_init();
}
