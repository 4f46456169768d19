//! textlayer: OCR and transcription text layers for IIIF canvases.
//!
//! textlayer finds the text source associated with an image canvas, fetches
//! it once, and normalizes it from whichever markup dialect it was written
//! in (ALTO XML, hOCR, IIIF annotations) into one geometric model: lines
//! made of words, each positioned in canvas pixel space. A renderer can then
//! draw a selectable or visible text overlay without caring where the text
//! came from.
//!
//! # Modules
//!
//! - [`ir`]: The normalized text model, unit conversion and the dialect parsers
//! - [`resolve`]: Resolution of externally referenced annotation content
//! - [`cache`]: Per-canvas text state
//! - [`discovery`]: The orchestrator that drives discovery, fetching and parsing
//! - [`fetch`]: The fetch seam and its HTTP implementation
//! - [`settings`]: User settings
//! - [`error`]: Error types for textlayer operations

pub mod cache;
pub mod discovery;
pub mod error;
pub mod fetch;
pub mod ir;
pub mod resolve;
pub mod settings;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

pub use error::TextLayerError;

use cache::{CanvasTextCache, CanvasTextEntry, EntryStatus};
use discovery::{CanvasMetadata, Orchestrator, StaticCatalog, TextAssociation, TextOverlayUpdate};
use fetch::HttpFetcher;
use ir::{CanvasId, CanvasSize, ParsedText, SourceDialect, WindowId};
use settings::Settings;

/// The textlayer CLI application.
#[derive(Parser)]
#[command(name = "textlayer")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Settings file (defaults to <config dir>/textlayer/config.toml).
    #[arg(long, global = true, env = "TEXTLAYER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Parse a local ALTO, hOCR or IIIF annotation file.
    Parse(ParseArgs),
    /// Fetch a text source over HTTP and parse it.
    Fetch(FetchArgs),
}

/// Canvas size and output options shared by the subcommands.
#[derive(clap::Args)]
struct OutputArgs {
    /// Canvas width in pixels (0 or omitted: use the source's own extent).
    #[arg(long, default_value_t = 0)]
    width: u32,

    /// Canvas height in pixels (0 or omitted: use the source's own extent).
    #[arg(long, default_value_t = 0)]
    height: u32,

    /// Output format ('json' or 'text').
    #[arg(long, default_value = "json")]
    output: String,
}

impl OutputArgs {
    fn canvas(&self) -> CanvasSize {
        CanvasSize::new(self.width, self.height)
    }
}

/// Arguments for the parse subcommand.
#[derive(clap::Args)]
struct ParseArgs {
    /// Input file to parse.
    input: PathBuf,

    /// Source format ('auto', 'alto', 'hocr', or 'iiif').
    #[arg(long, default_value = "auto")]
    format: String,

    /// Declared media type, used by 'auto' before content sniffing.
    #[arg(long)]
    media_type: Option<String>,

    #[command(flatten)]
    out: OutputArgs,
}

/// Arguments for the fetch subcommand.
#[derive(clap::Args)]
struct FetchArgs {
    /// URI of the text source.
    uri: String,

    /// Declared media type of the source.
    #[arg(long)]
    media_type: Option<String>,

    #[command(flatten)]
    out: OutputArgs,
}

/// Run the textlayer CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub async fn run() -> Result<(), TextLayerError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Parse(args)) => {
            let settings = Settings::load(cli.config.as_deref())?;
            run_parse(args, &settings)
        }
        Some(Commands::Fetch(args)) => {
            let settings = Settings::load(cli.config.as_deref())?;
            run_fetch(args, &settings).await
        }
        None => {
            // No subcommand: just print a help hint and exit successfully
            println!("textlayer {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("OCR and transcription text layers for IIIF canvases.");
            println!();
            println!("Run 'textlayer --help' for usage information.");
            Ok(())
        }
    }
}

/// Execute the parse subcommand.
fn run_parse(args: ParseArgs, settings: &Settings) -> Result<(), TextLayerError> {
    let raw = std::fs::read_to_string(&args.input)?;

    let dialect = match args.format.as_str() {
        "auto" => SourceDialect::detect(args.media_type.as_deref(), &raw)?,
        "alto" | "alto-xml" => SourceDialect::Alto,
        "hocr" => SourceDialect::Hocr,
        "iiif" | "iiif-annotations" => SourceDialect::IiifAnnotation,
        other => {
            return Err(TextLayerError::UnsupportedFormat(format!(
                "'{}' (supported: auto, alto, hocr, iiif)",
                other
            )));
        }
    };
    tracing::debug!(input = %args.input.display(), dialect = %dialect, "parsing");

    let parsed =
        ir::parse_source_with(dialect, &raw, args.out.canvas(), &settings.alto.options())?;
    write_output(&parsed, &args.out.output)
}

/// Execute the fetch subcommand through the discovery pipeline.
async fn run_fetch(args: FetchArgs, settings: &Settings) -> Result<(), TextLayerError> {
    let fetcher = Arc::new(HttpFetcher::new(&settings.fetch)?);
    let catalog = Arc::new(StaticCatalog::new());
    let cache = CanvasTextCache::new();
    let (events, mut received) = mpsc::unbounded_channel();

    let canvas_id = CanvasId::new(args.uri.clone());
    let window_id = WindowId::new("cli");
    let orchestrator =
        Orchestrator::with_settings(cache, catalog.clone(), fetcher, events, settings);

    match args.media_type {
        Some(media_type) => {
            let association = TextAssociation::new(args.uri.clone()).with_media_type(media_type);
            if association.source_type().is_none() {
                return Err(TextLayerError::UnsupportedFormat(format!(
                    "media type '{}' is not a recognized text source",
                    association.media_type.as_deref().unwrap_or_default()
                )));
            }
            let size = args.out.canvas();
            catalog.insert_canvas(
                canvas_id.clone(),
                CanvasMetadata::new(size.width, size.height).with_text(association),
            );
            catalog.set_visible(window_id.clone(), vec![canvas_id.clone()]);
            let update = TextOverlayUpdate {
                enabled: Some(true),
                selectable: Some(true),
                ..Default::default()
            };
            orchestrator.on_config_change(&window_id, update).await;
        }
        None => {
            orchestrator
                .fetch_and_parse(&canvas_id, &args.uri, args.out.canvas())
                .await;
        }
    }

    while let Ok(event) = received.try_recv() {
        tracing::debug!(event = event.name(), "pipeline event");
    }

    let parsed = fetched_text(orchestrator.text_for_canvas(&canvas_id), &args.uri)?;
    write_output(&parsed, &args.out.output)
}

/// The parsed text of a finished entry, or the error it recorded.
fn fetched_text(entry: Option<CanvasTextEntry>, uri: &str) -> Result<ParsedText, TextLayerError> {
    let unavailable = |message: String| TextLayerError::TextUnavailable {
        canvas: uri.to_string(),
        message,
    };
    match entry {
        Some(CanvasTextEntry {
            status: EntryStatus::Fetched,
            parsed_text: Some(parsed),
            ..
        }) => Ok(parsed),
        Some(entry) => Err(unavailable(
            entry
                .error
                .unwrap_or_else(|| format!("entry is {:?}", entry.status)),
        )),
        None => Err(unavailable("no text received".to_string())),
    }
}

fn write_output(parsed: &ParsedText, output: &str) -> Result<(), TextLayerError> {
    match output {
        "json" => {
            let json = serde_json::to_string_pretty(parsed).map_err(TextLayerError::JsonWrite)?;
            println!("{json}");
            Ok(())
        }
        "text" => {
            println!("{}", parsed.plain_text());
            Ok(())
        }
        other => Err(TextLayerError::UnsupportedFormat(format!(
            "output '{}' (supported: json, text)",
            other
        ))),
    }
}
