//! TrimDeck - headless trim tool
//!
//! Probes the given media files, assembles them into one combined
//! timeline, applies trim regions from the command line and writes the
//! edit session to JSON. A GUI shell drives exactly the same engine
//! surface.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use trimdeck_core::{format_timestamp, parse_timestamp};
use trimdeck_media::{FfmpegFrameSource, FfmpegWaveforms, FfprobeProber, Prober};
use trimdeck_player::{ClipPlayer, NullSurface, PlayerDeps, ThreadClock};
use trimdeck_timeline::{CombinedPlayer, Cut, SessionFile};

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = Options::parse(&args)?;

    let prober = FfprobeProber;
    let deps = PlayerDeps {
        surface: Arc::new(NullSurface),
        frames: Arc::new(FfmpegFrameSource),
        waveforms: Arc::new(FfmpegWaveforms),
        clock: Arc::new(ThreadClock::default()),
    };

    let mut players = Vec::with_capacity(options.inputs.len());
    for input in &options.inputs {
        let descriptor = prober
            .probe(input)
            .with_context(|| format!("probing {}", input.display()))?;
        info!(
            path = %descriptor.path,
            kind = ?descriptor.kind,
            duration_ms = descriptor.duration_ms,
            codec = %descriptor.codec,
            "clip probed"
        );
        players.push(ClipPlayer::new(descriptor, deps.clone()));
    }

    let combined = CombinedPlayer::new(players);
    if !options.cuts.is_empty() {
        combined.set_cuts(Some(options.cuts.clone()));
    }

    println!(
        "timeline: {} across {} clip(s)",
        format_timestamp(combined.total_duration_ms()),
        options.inputs.len()
    );
    for player in combined.players() {
        let descriptor = player.descriptor();
        println!(
            "  {} [{:?}] {}x{} {} ({:?})",
            descriptor.path,
            descriptor.kind,
            descriptor.display_width,
            descriptor.display_height,
            format_timestamp(descriptor.duration_ms),
            player.mode(),
        );
    }
    if let Some(cuts) = &combined.state().cuts {
        for (index, cut) in cuts.iter().enumerate() {
            println!(
                "  cut {}: {} - {}",
                index + 1,
                format_timestamp(cut.start_ms),
                format_timestamp(cut.end_ms),
            );
        }
    }

    if let Some(out) = &options.out {
        SessionFile::new(combined.edit_result())
            .save_to_file(out)
            .with_context(|| format!("writing {}", out.display()))?;
        info!(out = %out.display(), "session written");
    }

    combined.close();
    Ok(())
}

struct Options {
    inputs: Vec<PathBuf>,
    cuts: Vec<Cut>,
    out: Option<PathBuf>,
}

impl Options {
    fn parse(args: &[String]) -> Result<Self> {
        let mut inputs = Vec::new();
        let mut cuts = Vec::new();
        let mut out = None;

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--cut" => {
                    let start = iter.next().context("--cut needs START and END")?;
                    let end = iter.next().context("--cut needs START and END")?;
                    let start = parse_timestamp(start)
                        .with_context(|| format!("bad timestamp: {start}"))?;
                    let end =
                        parse_timestamp(end).with_context(|| format!("bad timestamp: {end}"))?;
                    cuts.push(Cut::new(start, end));
                }
                "--out" => {
                    out = Some(PathBuf::from(
                        iter.next().context("--out needs a path")?,
                    ));
                }
                _ => inputs.push(PathBuf::from(arg)),
            }
        }

        if inputs.is_empty() {
            bail!("usage: trimdeck <media>... [--cut START END]... [--out session.json]");
        }
        Ok(Self { inputs, cuts, out })
    }
}
