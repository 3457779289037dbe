//! # CLI Module
//!
//! Command-line interface for the image grouper.
//!
//! ## Usage
//! ```bash
//! # Group a folder by perceptual hash
//! image-grouper group ~/Photos ~/Grouped
//!
//! # Stricter hash threshold
//! image-grouper group ~/Photos ~/Grouped --threshold 8
//!
//! # Neural embeddings with relabeling
//! image-grouper group ~/Catalog ~/Grouped --strategy embedding --api-key "$KEY"
//!
//! # Inspect hash distances to pick a threshold
//! image-grouper distances ~/Photos
//!
//! # JSON output
//! image-grouper group ~/Photos ~/Grouped --output json
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use image_grouper::core::fingerprint::embedding::resolve_models_dir;
use image_grouper::core::fingerprint::{FeatureModel, HashAlgorithmKind, Provider};
use image_grouper::core::pipeline::{
    hash_distances, DistanceReport, FingerprintStrategy, Pipeline, PipelineResult,
};
use image_grouper::error::{GrouperError, Result};
use image_grouper::events::{Event, EventChannel, PipelineEvent};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::thread;

/// Image Grouper - Sort a folder of images into groups of look-alikes
#[derive(Parser, Debug)]
#[command(name = "image-grouper")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Group similar images from SOURCE into directories under TARGET
    Group {
        /// Directory to read images from (never modified)
        source: PathBuf,

        /// Directory to write the grouped tree to
        target: PathBuf,

        /// How images are fingerprinted
        #[arg(short, long, default_value = "hash")]
        strategy: Strategy,

        /// Similarity threshold: max Hamming distance (exclusive, 0-64,
        /// default 15) or min cosine similarity (0-1, default 0.90)
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Hash algorithm (hash strategy)
        #[arg(short, long, default_value = "perceptual")]
        algorithm: Algorithm,

        /// Feature model (embedding strategy)
        #[arg(short, long, default_value = "resnet50")]
        model: Model,

        /// Directory holding the ONNX model files
        #[arg(long)]
        models_dir: Option<PathBuf>,

        /// Inference device (embedding strategy)
        #[arg(long, default_value = "auto")]
        provider: Device,

        /// Credential for relabeling group directories; skipped when absent
        #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Skip hidden files and directories
        #[arg(long)]
        exclude_hidden: bool,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print every image's hash and all pairwise Hamming distances
    Distances {
        /// Directory to inspect
        dir: PathBuf,

        /// Hash algorithm
        #[arg(short, long, default_value = "perceptual")]
        algorithm: Algorithm,

        /// Skip hidden files and directories
        #[arg(long)]
        exclude_hidden: bool,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// List the available feature models and whether they are installed
    Models {
        /// Directory holding the ONNX model files
        #[arg(long)]
        models_dir: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Strategy {
    /// 64-bit perceptual hash, Hamming distance
    Hash,
    /// Pretrained vision model, cosine similarity
    Embedding,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Algorithm {
    /// Perceptual Hash - DCT based (default)
    Perceptual,
    /// Difference Hash - Gradient based
    Difference,
    /// Average Hash - Mean based, fastest
    Average,
}

impl From<Algorithm> for HashAlgorithmKind {
    fn from(algo: Algorithm) -> Self {
        match algo {
            Algorithm::Perceptual => HashAlgorithmKind::Perceptual,
            Algorithm::Difference => HashAlgorithmKind::Difference,
            Algorithm::Average => HashAlgorithmKind::Average,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Model {
    /// ResNet-50, 2048 dimensions (default)
    Resnet50,
    /// ResNet-152, 2048 dimensions
    Resnet152,
    /// ViT-B/16, 768 dimensions
    VitB16,
    /// ViT-L/16, 1024 dimensions
    VitL16,
}

impl From<Model> for FeatureModel {
    fn from(model: Model) -> Self {
        match model {
            Model::Resnet50 => FeatureModel::ResNet50,
            Model::Resnet152 => FeatureModel::ResNet152,
            Model::VitB16 => FeatureModel::VitB16,
            Model::VitL16 => FeatureModel::VitL16,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Device {
    Auto,
    Cpu,
    Cuda,
    Tensorrt,
    Coreml,
    Xnnpack,
}

impl From<Device> for Provider {
    fn from(device: Device) -> Self {
        match device {
            Device::Auto => Provider::Auto,
            Device::Cpu => Provider::Cpu,
            Device::Cuda => Provider::Cuda,
            Device::Tensorrt => Provider::TensorRt,
            Device::Coreml => Provider::CoreMl,
            Device::Xnnpack => Provider::Xnnpack,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Arguments of the `group` command
struct GroupArgs {
    source: PathBuf,
    target: PathBuf,
    strategy: FingerprintStrategy,
    threshold: Option<f64>,
    models_dir: Option<PathBuf>,
    provider: Provider,
    api_key: Option<String>,
    include_hidden: bool,
    output: OutputFormat,
    verbose: bool,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Group {
            source,
            target,
            strategy,
            threshold,
            algorithm,
            model,
            models_dir,
            provider,
            api_key,
            exclude_hidden,
            output,
            verbose,
        } => {
            image_grouper::init_tracing(verbose);
            let strategy = match strategy {
                Strategy::Hash => FingerprintStrategy::Hash(algorithm.into()),
                Strategy::Embedding => FingerprintStrategy::Embedding(model.into()),
            };
            run_group(GroupArgs {
                source,
                target,
                strategy,
                threshold,
                models_dir,
                provider: provider.into(),
                api_key,
                include_hidden: !exclude_hidden,
                output,
                verbose,
            })
        }
        Commands::Distances {
            dir,
            algorithm,
            exclude_hidden,
            output,
            verbose,
        } => {
            image_grouper::init_tracing(verbose);
            run_distances(&dir, algorithm.into(), !exclude_hidden, output)
        }
        Commands::Models { models_dir } => {
            image_grouper::init_tracing(false);
            run_models(models_dir.as_deref());
            Ok(())
        }
    }
}

fn run_group(args: GroupArgs) -> Result<()> {
    let term = Term::stderr();
    let pretty = matches!(args.output, OutputFormat::Pretty);

    // Print header
    if pretty {
        term.write_line(&format!(
            "{} {}",
            style("Image Grouper").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let mut builder = Pipeline::builder()
        .source(args.source)
        .target(args.target)
        .strategy(args.strategy)
        .provider(args.provider)
        .api_key(args.api_key)
        .include_hidden(args.include_hidden);
    if let Some(threshold) = args.threshold {
        builder = builder.threshold(threshold);
    }
    if let Some(dir) = args.models_dir {
        builder = builder.models_dir(dir);
    }
    let pipeline = builder.build();

    // Set up event handling
    let (sender, receiver) = EventChannel::new();

    // Progress bar for pretty output
    let progress = if pretty {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();
    let verbose = args.verbose;

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            match event {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
                    if let Some(ref pb) = progress_clone {
                        pb.set_message(format!("{}", phase));
                    }
                }
                Event::Progress(update) => {
                    if let Some(ref pb) = progress_clone {
                        pb.set_length(update.total as u64);
                        pb.set_position(update.current as u64);
                        pb.set_message(update.message.clone());
                        if verbose {
                            pb.println(update.message);
                        }
                    }
                }
                Event::Pipeline(PipelineEvent::Completed { .. }) => {
                    if let Some(ref pb) = progress_clone {
                        pb.finish_and_clear();
                    }
                }
                _ => {}
            }
        }
    });

    // Run the pipeline
    let result = pipeline.run_with_progress(&sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let result = result?;

    match args.output {
        OutputFormat::Pretty => print_pretty_results(&term, &result, args.verbose),
        OutputFormat::Json => print_json(&result)?,
    }

    Ok(())
}

fn print_pretty_results(term: &Term, result: &PipelineResult, verbose: bool) {
    term.write_line(&format!("{} Grouping Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();

    // Summary
    term.write_line(&format!(
        "  {} images found, {} fingerprinted in {:.1}s",
        style(result.total_images).cyan(),
        style(result.fingerprinted).cyan(),
        result.duration_ms as f64 / 1000.0
    ))
    .ok();

    term.write_line(&format!(
        "  {} groups",
        style(result.clustering.multi_member_groups().count()).cyan()
    ))
    .ok();

    term.write_line(&format!(
        "  {} unique images",
        style(result.clustering.singletons().count()).cyan()
    ))
    .ok();

    if !result.errors.is_empty() {
        term.write_line(&format!(
            "  {} images or files skipped",
            style(result.errors.len()).yellow()
        ))
        .ok();
    }

    term.write_line("").ok();

    let Some(materialized) = &result.materialized else {
        term.write_line(&format!("  {} No images found", style("○").dim()))
            .ok();
        return;
    };

    if !materialized.groups.is_empty() {
        term.write_line(&format!("{}", style("Groups:").bold().underlined()))
            .ok();
        term.write_line("").ok();
    }

    for group in &materialized.groups {
        let directory = final_directory(result, &group.directory);
        term.write_line(&format!(
            "  {} ({} images)",
            style(display_path(directory)).bold(),
            group.files.len()
        ))
        .ok();

        if let Some(members) = result.clustering.groups.get(group.index) {
            for member in members.members() {
                let marker = if member == members.representative() {
                    style("★").green().to_string()
                } else {
                    style("○").dim().to_string()
                };
                term.write_line(&format!("    {} {}", marker, display_path(member.path())))
                    .ok();
            }
        }
        term.write_line("").ok();
    }

    if let Some(unique_dir) = &materialized.unique_dir {
        term.write_line(&format!(
            "  {} ({} images)",
            style(display_path(unique_dir)).bold(),
            materialized.unique_files.len()
        ))
        .ok();
        term.write_line("").ok();
    }

    if verbose {
        for error in &result.errors {
            term.write_line(&format!("  {} {}", style("!").yellow(), style(error).dim()))
                .ok();
        }
    }

    // Footer
    term.write_line(&format!(
        "{}",
        style("Source images were copied, not moved.").dim()
    ))
    .ok();
}

/// Where a group directory ended up after the optional rename
fn final_directory<'a>(result: &'a PipelineResult, directory: &'a Path) -> &'a Path {
    result
        .renamed
        .as_ref()
        .and_then(|r| r.renamed.iter().find(|(old, _)| old == directory))
        .map(|(_, new)| new.as_path())
        .unwrap_or(directory)
}

fn display_path(path: &Path) -> String {
    match dirs::home_dir().and_then(|home| path.strip_prefix(home).ok().map(Path::to_path_buf)) {
        Some(relative) => format!("~/{}", relative.display()),
        None => path.display().to_string(),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| GrouperError::Config(format!("Failed to serialize output: {}", e)))?;
    println!("{}", json);
    Ok(())
}

fn run_distances(
    dir: &Path,
    algorithm: HashAlgorithmKind,
    include_hidden: bool,
    output: OutputFormat,
) -> Result<()> {
    let report = hash_distances(dir, algorithm, include_hidden)?;

    match output {
        OutputFormat::Pretty => print_distances(&report),
        OutputFormat::Json => print_json(&report)?,
    }
    Ok(())
}

fn print_distances(report: &DistanceReport) {
    println!("{} ({})", style("Hashes").bold(), report.algorithm.description());
    for (image, hash) in &report.hashes {
        println!("{}: {}", image.file_name(), hash.to_hex());
    }

    println!();
    println!("{}", style("Distances").bold());
    for pair in &report.pairs {
        println!("Diff '{}' vs '{}': {}", pair.a, pair.b, pair.distance);
    }

    for error in &report.errors {
        eprintln!("{} {}", style("!").yellow(), style(error).dim());
    }
}

fn run_models(models_dir: Option<&Path>) {
    let dir = resolve_models_dir(models_dir);
    println!(
        "{} {}",
        style("Models directory:").bold(),
        display_path(&dir)
    );
    println!();

    for model in FeatureModel::ALL {
        let path = model.path_in(&dir);
        let status = if path.is_file() {
            style("installed").green().to_string()
        } else {
            style("missing").red().to_string()
        };
        println!(
            "  {:<10} {:>5}d  {:<16} {}  {}",
            model.id(),
            model.dimension(),
            model.file_name(),
            status,
            style(model.description()).dim()
        );
    }
}
