#![warn(unused_extern_crates)]
use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use facescrub::metadata::decode;
use facescrub::redaction::DEFAULT_STRENGTH;
use facescrub::shapes::parse_rect_inputs;
use facescrub::stats::{JsonFileStore, MemoryStatsStore, StatsStore};
use facescrub::{Pipeline, ProcessRequest, RedactionMode, SourceSet};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Level, info, span, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct CmdArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Blur faces and strip metadata from one image
    Process(ProcessArgs),
    /// Print the aggregate for one day
    Stats(StatsArgs),
    /// Print the metadata found in an image
    Metadata {
        input: PathBuf,
    },
}

#[derive(Args, Debug)]
struct ProcessArgs {
    input: PathBuf,

    /// Where to write the result. Defaults to the generated name next to the input
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Where face rectangles come from
    #[arg(short, long, value_enum, default_value_t = RedactionMode::Hybrid)]
    mode: RedactionMode,

    /// Leave faces untouched
    #[arg(long)]
    no_blur: bool,

    /// Keep EXIF and ICC data
    #[arg(long)]
    keep_metadata: bool,

    /// Blur strength
    #[arg(short, long, default_value_t = DEFAULT_STRENGTH, value_parser = clap::value_parser!(u32).range(1..=255))]
    strength: u32,

    /// JSON file holding an array of face rectangles
    #[arg(short, long, value_name = "FILE")]
    faces: Option<PathBuf>,

    /// SeetaFace model used for detection
    #[arg(long, value_name = "FILE", env = "FACESCRUB_MODEL")]
    model: Option<PathBuf>,

    /// JSON stats file to record the session in
    #[arg(long, value_name = "FILE", env = "FACESCRUB_STATS")]
    stats: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct StatsArgs {
    /// Day to report, defaults to today (UTC)
    #[arg(short, long)]
    date: Option<NaiveDate>,

    #[arg(long, value_name = "FILE", env = "FACESCRUB_STATS")]
    stats: PathBuf,
}

fn main() -> Result<()> {
    let filter = EnvFilter::from_default_env();
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match CmdArgs::parse().command {
        Command::Process(args) => process(args),
        Command::Stats(args) => stats(args),
        Command::Metadata { input } => metadata(&input),
    }
}

fn process(args: ProcessArgs) -> Result<()> {
    let span = span!(Level::INFO, "cli_process");
    let _guard = span.enter();

    let bytes = fs::read(&args.input).with_context(|| format!("reading {}", args.input.display()))?;
    let faces = match &args.faces {
        Some(path) => parse_rect_inputs(
            &fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?,
        ),
        None => Vec::new(),
    };

    let store: Arc<dyn StatsStore> = match &args.stats {
        Some(path) => Arc::new(JsonFileStore::new(path)),
        None => Arc::new(MemoryStatsStore::new()),
    };
    let pipeline = Pipeline::new(load_sources(args.model.as_deref()), store);

    let filename = args
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let req = ProcessRequest::new(filename, bytes)
        .mode((!args.no_blur).then_some(args.mode))
        .faces(faces)
        .strength(args.strength)
        .strip_metadata(!args.keep_metadata)
        .source("cli", None);

    let outcome = pipeline.process(req);
    let out = match outcome.result {
        Ok(out) => out,
        Err(e) => {
            println!("{}", serde_json::to_string_pretty(&outcome.record)?);
            bail!(e);
        }
    };

    let output = args.output.unwrap_or_else(|| {
        args.input
            .parent()
            .unwrap_or(Path::new("."))
            .join(&out.filename)
    });
    fs::write(&output, &out.bytes).with_context(|| format!("writing {}", output.display()))?;
    info!("Result at {:?}", output);

    #[derive(Serialize)]
    struct Report<'a> {
        output: &'a Path,
        mime_type: &'static str,
        #[serde(flatten)]
        image: &'a facescrub::ProcessedImage,
        processing_time_ms: u64,
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&Report {
            output: &output,
            mime_type: out.format.mime_type(),
            image: &out,
            processing_time_ms: outcome.record.processing_time_ms,
        })?
    );

    Ok(())
}

#[cfg(feature = "rustface")]
fn load_sources(model: Option<&Path>) -> SourceSet {
    use facescrub::sources::SeetaSource;

    let mut set = SourceSet::new();
    match model {
        Some(path) => {
            for source in SeetaSource::standard_set(path) {
                set.push(Box::new(source));
            }
        }
        None => warn!("No detection model given, automatic detection disabled"),
    }
    set
}

#[cfg(not(feature = "rustface"))]
fn load_sources(model: Option<&Path>) -> SourceSet {
    if model.is_some() {
        warn!("Built without rustface, ignoring detection model");
    }
    SourceSet::new()
}

fn stats(args: StatsArgs) -> Result<()> {
    let date = args.date.unwrap_or_else(|| Utc::now().date_naive());
    let store = JsonFileStore::new(&args.stats);

    match store.daily(date)? {
        Some(agg) => println!("{}", serde_json::to_string_pretty(&agg)?),
        None => println!("No images processed on {date}"),
    }
    Ok(())
}

fn metadata(input: &Path) -> Result<()> {
    let bytes = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let container = decode(&bytes)?;
    println!("{}", serde_json::to_string_pretty(&container.tags.summary())?);
    Ok(())
}
