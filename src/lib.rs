//! dataset-maker: annotation conversion and TFRecord export.
//!
//! dataset-maker reads object detection and instance segmentation
//! annotations in Pascal VOC XML, YOLO text and VGG JSON, converts between
//! them through one canonical model, and exports annotated images as sharded
//! TFRecord files of `tf.train.Example` messages.
//!
//! # Modules
//!
//! - [`ir`]: Canonical model (AnnotationSet, Record, Object), geometry and format readers/writers
//! - [`codec`]: Codec trait, built-in codecs and the registry that names them
//! - [`tfrecord`]: Example messages, record framing, sharded writer and exporter
//! - [`validation`]: Non-fatal checks of a decoded set
//! - [`error`]: Error types for dataset-maker operations

pub mod codec;
pub mod error;
pub mod ir;
pub mod tfrecord;
pub mod validation;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use codec::{Codec, CodecRegistry, Lossiness};
pub use error::DatasetError;

use ir::{ClassMap, DiskImages, PngMaskEncoder};
use tfrecord::{ExportOptions, RecordExporter, DEFAULT_SHARD_PREFIX};

/// The dataset-maker CLI application.
#[derive(Parser)]
#[command(name = "dataset-maker")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List the supported annotation formats.
    Formats,
    /// Convert annotations from one format to another.
    Convert(ConvertArgs),
    /// Export annotated images as sharded TFRecord files.
    Export(ExportArgs),
    /// Validate annotations for errors and warnings.
    Validate(ValidateArgs),
    /// Count and verify the records in TFRecord shard files.
    InspectShards(InspectShardsArgs),
}

/// Where to read annotations and their images from.
#[derive(clap::Args)]
struct SourceArgs {
    /// Directory holding the images the annotations refer to.
    #[arg(long)]
    images: PathBuf,

    /// Annotation file or directory.
    #[arg(long)]
    annotations: PathBuf,
}

/// Arguments for the convert subcommand.
#[derive(clap::Args)]
struct ConvertArgs {
    /// Source format (see 'formats').
    #[arg(long)]
    from: String,

    /// Target format (see 'formats').
    #[arg(long)]
    to: String,

    #[command(flatten)]
    source: SourceArgs,

    /// Output directory.
    #[arg(long)]
    output: PathBuf,
}

/// Arguments for the export subcommand.
#[derive(clap::Args)]
struct ExportArgs {
    /// Source format (see 'formats').
    #[arg(long)]
    format: String,

    #[command(flatten)]
    source: SourceArgs,

    /// Output directory for the shard files.
    #[arg(long)]
    output: PathBuf,

    /// Number of shard files to write.
    #[arg(long, env = "DATASET_MAKER_NUM_SHARDS", default_value_t = 1)]
    num_shards: usize,

    /// Shard file name prefix.
    #[arg(long, env = "DATASET_MAKER_SHARD_PREFIX", default_value = DEFAULT_SHARD_PREFIX)]
    prefix: String,

    /// YAML class map ('names:' list or id mapping). Built from the labels if omitted.
    #[arg(long)]
    class_map: Option<PathBuf>,
}

/// Arguments for the validate subcommand.
#[derive(clap::Args)]
struct ValidateArgs {
    /// Source format (see 'formats').
    #[arg(long)]
    format: String,

    #[command(flatten)]
    source: SourceArgs,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for the inspect-shards subcommand.
#[derive(clap::Args)]
struct InspectShardsArgs {
    /// TFRecord files to inspect.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

/// Run the dataset-maker CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), DatasetError> {
    let cli = Cli::parse();
    let registry = CodecRegistry::builtin();

    match cli.command {
        Some(Commands::Formats) => run_formats(&registry),
        Some(Commands::Convert(args)) => run_convert(&registry, args),
        Some(Commands::Export(args)) => run_export(&registry, args),
        Some(Commands::Validate(args)) => run_validate(&registry, args),
        Some(Commands::InspectShards(args)) => run_inspect_shards(args),
        None => {
            println!("dataset-maker {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Convert annotations between VOC, YOLO and VGG, and export TFRecord shards.");
            println!();
            println!("Run 'dataset-maker --help' for usage information.");
            Ok(())
        }
    }
}

/// Execute the formats subcommand.
fn run_formats(registry: &CodecRegistry) -> Result<(), DatasetError> {
    let width = registry.names().map(str::len).max().unwrap_or(0);
    for (name, codec) in registry.iter() {
        println!(
            "{name:<width$}  {:<11}  {}",
            codec.lossiness(),
            codec.description()
        );
    }
    Ok(())
}

/// Execute the convert subcommand.
fn run_convert(registry: &CodecRegistry, args: ConvertArgs) -> Result<(), DatasetError> {
    let source = registry.get(&args.from)?;
    let target = registry.get(&args.to)?;

    let set = source.decode(&args.source.images, &args.source.annotations, &DiskImages)?;
    target.encode(&args.output, &set)?;

    println!(
        "Converted {} record(s) with {} object(s) from {} to {} into {}",
        set.len(),
        set.object_count(),
        args.from,
        args.to,
        args.output.display()
    );
    if target.lossiness() != Lossiness::Lossless {
        println!(
            "Note: '{}' is {} relative to the canonical model; see 'dataset-maker formats'.",
            args.to,
            target.lossiness()
        );
    }
    Ok(())
}

/// Execute the export subcommand.
fn run_export(registry: &CodecRegistry, args: ExportArgs) -> Result<(), DatasetError> {
    let source = registry.get(&args.format)?;
    let set = source.decode(&args.source.images, &args.source.annotations, &DiskImages)?;

    let classes = match &args.class_map {
        Some(path) => ClassMap::from_yaml_file(path)?,
        None => ClassMap::from_set(&set),
    };

    let options = ExportOptions {
        num_shards: args.num_shards,
        prefix: args.prefix,
    };
    let exporter = RecordExporter::new(&DiskImages, &PngMaskEncoder);
    let summary = exporter.export(&set, &classes, &args.source.images, &args.output, &options)?;

    print!("{}", summary);
    Ok(())
}

/// Execute the validate subcommand.
fn run_validate(registry: &CodecRegistry, args: ValidateArgs) -> Result<(), DatasetError> {
    let source = registry.get(&args.format)?;
    let set = source.decode(&args.source.images, &args.source.annotations, &DiskImages)?;

    let opts = validation::ValidateOptions {
        strict: args.strict,
    };
    let outcome = validation::ensure_valid(&set, &opts);

    match &outcome {
        Ok(report) | Err(DatasetError::ValidationFailed { report, .. }) => {
            print_report(report, &args.output)?
        }
        Err(_) => {}
    }

    outcome.map(|_| ())
}

fn print_report(report: &validation::ValidationReport, output: &str) -> Result<(), DatasetError> {
    match output {
        "json" => {
            let rendered = report
                .to_json_string()
                .map_err(|source| DatasetError::JsonWrite {
                    path: PathBuf::from("<stdout>"),
                    source,
                })?;
            println!("{rendered}");
        }
        _ => print!("{}", report),
    }
    Ok(())
}

/// Execute the inspect-shards subcommand.
fn run_inspect_shards(args: InspectShardsArgs) -> Result<(), DatasetError> {
    let mut total = 0;
    for path in &args.files {
        let count = tfrecord::count_records(path)?;
        println!("{}: {} record(s)", path.display(), count);
        total += count;
    }
    println!("Total: {} record(s) in {} file(s)", total, args.files.len());
    Ok(())
}
