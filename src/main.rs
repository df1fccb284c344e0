use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use framepipe::{
    Capture, DisplaySink, FixedRegions, FrameSource, PipelineError, PipelineRunner, Region,
    RoiSelector, RunStats, VideoFileSink, VideoSource,
};

const WINDOW: &str = "framepipe";

#[derive(Parser, Debug)]
#[command(
    name = "framepipe",
    about = "Record a camera or video file, optionally tracking selected objects"
)]
struct Args {
    /// Camera index (e.g. 0) or path to a video file
    source: String,

    /// Output video path (MJPG in AVI)
    #[arg(long, default_value = "out.avi")]
    output: PathBuf,

    /// Select regions interactively on the first frame and track them
    #[arg(long)]
    track: bool,

    /// Seed tracking from fixed regions: "x,y,w,h[;x,y,w,h...]"
    #[arg(long, value_name = "REGIONS", conflicts_with = "track")]
    regions: Option<String>,

    /// Run without a display window (no interactive selection, no
    /// keyboard cancellation)
    #[arg(long, conflicts_with = "track")]
    headless: bool,

    /// Display refresh / key poll slice in milliseconds
    #[arg(long, default_value_t = 25)]
    key_delay_ms: i32,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(args) {
        Ok(stats) => {
            println!(
                "done: {} frame(s) recorded{}",
                stats.frames_forwarded,
                if stats.cancelled { " (cancelled)" } else { "" }
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> framepipe::Result<RunStats> {
    let source = VideoSource::from_arg(&args.source);
    let capture = Capture::open(&source)?;
    let geometry = capture.geometry();

    let mut runner = PipelineRunner::new(Box::new(capture));

    if !args.headless {
        runner.add_sink(Box::new(DisplaySink::with_key_delay(
            WINDOW,
            args.key_delay_ms,
        )?));
    }
    runner.add_sink(Box::new(VideoFileSink::create(&args.output, geometry)?));

    if args.track {
        let mut selector = RoiSelector::new(WINDOW);
        runner.seed_tracking(&mut selector)?;
    } else if let Some(spec) = args.regions.as_deref() {
        let mut selector = FixedRegions::new(parse_regions(spec)?);
        runner.seed_tracking(&mut selector)?;
    }

    runner.run()
}

/// Parse "x,y,w,h[;x,y,w,h...]" into regions.
fn parse_regions(spec: &str) -> framepipe::Result<Vec<Region>> {
    let mut regions = Vec::new();
    for part in spec.split(';').filter(|part| !part.trim().is_empty()) {
        let fields: Vec<i32> = part
            .split(',')
            .map(|field| field.trim().parse::<i32>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| {
                PipelineError::invalid_region(format!("'{}' is not x,y,w,h", part.trim()))
            })?;
        if fields.len() != 4 {
            return Err(PipelineError::invalid_region(format!(
                "'{}' has {} field(s), expected 4",
                part.trim(),
                fields.len()
            )));
        }
        let region = Region::new(fields[0], fields[1], fields[2], fields[3]);
        if region.is_empty() {
            return Err(PipelineError::invalid_region(format!(
                "'{}' has non-positive extent",
                part.trim()
            )));
        }
        regions.push(region);
    }
    Ok(regions)
}
