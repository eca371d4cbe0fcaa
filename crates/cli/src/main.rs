use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};

use avatar_cutter_core::background::domain::background_remover::BackgroundRemover;
use avatar_cutter_core::background::domain::remover_config::{Preset, RemoverType};
use avatar_cutter_core::background::domain::remover_error::RemoverError;
use avatar_cutter_core::background::infrastructure::onnx_segmentation_backend::{
    OnnxSegmentationLoader, SegmentationModel,
};
use avatar_cutter_core::background::infrastructure::remover_factory::BackgroundRemoverSelector;
use avatar_cutter_core::detection::domain::face_locator::FaceLocator;
use avatar_cutter_core::detection::infrastructure::onnx_ssd_detector::OnnxSsdDetector;
use avatar_cutter_core::imaging::infrastructure::image_file_writer::ImageFileWriter;
use avatar_cutter_core::imaging::infrastructure::proportional_resizer::ProportionalResizer;
use avatar_cutter_core::pipeline::avatar_pipeline_use_case::AvatarPipelineUseCase;
use avatar_cutter_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use avatar_cutter_core::shared::constants::FACE_MODEL_NAME;
use avatar_cutter_core::shared::model_resolver::{self, ModelResolveError};
use avatar_cutter_core::shared::settings::Settings;

/// Batch background removal and face-centered avatar cropping.
#[derive(Parser)]
#[command(name = "avatar-cutter", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process every image under INPUT_DIR into avatar sets under OUTPUT_DIR.
    Process {
        input_dir: PathBuf,
        output_dir: PathBuf,
        #[command(flatten)]
        remover: RemoverArgs,
    },
    /// Remove the background of a single image.
    RemoveBg {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        remover: RemoverArgs,
    },
    /// Print local-model segmentation statistics for an image.
    Stats {
        image: PathBuf,
        #[command(flatten)]
        remover: RemoverArgs,
    },
    /// List the background-removal presets.
    Presets,
    /// List available background removers and installed models.
    Backends {
        /// Directory with bundled model files.
        #[arg(long)]
        models_dir: Option<PathBuf>,
    },
    /// Download a known segmentation model into the model cache.
    FetchModel { name: String },
    /// Write the effective settings (file plus flags) back to the settings file.
    SaveSettings {
        #[command(flatten)]
        remover: RemoverArgs,
    },
}

#[derive(Args, Default)]
struct RemoverArgs {
    /// Background remover: api, local-model or auto.
    #[arg(long)]
    remover: Option<String>,

    /// Named configuration preset (see `presets`).
    #[arg(long, conflicts_with_all = ["model", "threshold", "no_preserve_elements", "no_smooth_edges"])]
    preset: Option<String>,

    /// Segmentation model for the local remover.
    #[arg(long)]
    model: Option<String>,

    /// Alpha threshold (0-255) for the local remover.
    #[arg(long, allow_negative_numbers = true)]
    threshold: Option<i32>,

    /// Harden the alpha mask instead of keeping semi-transparent details.
    #[arg(long)]
    no_preserve_elements: bool,

    /// Skip edge smoothing.
    #[arg(long)]
    no_smooth_edges: bool,

    /// remove.bg API key.
    #[arg(long, env = "REMOVE_BG_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Directory with bundled model files.
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Settings file (defaults to the platform config directory).
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Requested remover before availability is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemoverChoice {
    Auto,
    Kind(RemoverType),
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Process {
            input_dir,
            output_dir,
            remover,
        } => run_process(&input_dir, &output_dir, &remover),
        Command::RemoveBg {
            input,
            output,
            remover,
        } => run_remove_bg(&input, &output, &remover),
        Command::Stats { image, remover } => run_stats(&image, &remover),
        Command::Presets => {
            print_presets();
            Ok(())
        }
        Command::Backends { models_dir } => {
            print_backends(models_dir);
            Ok(())
        }
        Command::FetchModel { name } => run_fetch_model(&name),
        Command::SaveSettings { remover } => run_save_settings(&remover),
    }
}

fn run_process(
    input_dir: &Path,
    output_dir: &Path,
    args: &RemoverArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    if !input_dir.is_dir() {
        return Err(format!("Input directory not found: {}", input_dir.display()).into());
    }
    let settings = resolve_settings(args)?;
    let remover = build_remover(args, &settings)?;

    log::info!("Resolving face model: {FACE_MODEL_NAME}");
    let detector = OnnxSsdDetector::from_models_dir(settings.models_dir.as_deref())?;

    let mut use_case = AvatarPipelineUseCase::new(
        remover,
        FaceLocator::new(Box::new(detector)),
        Box::new(ProportionalResizer::new()),
        Box::new(ImageFileWriter::new()),
        Box::new(StdoutPipelineLogger::new()),
    );
    let report = use_case.execute(input_dir, output_dir)?;

    println!(
        "Processed {}/{} images ({} without a detectable face, {} failed)",
        report.processed,
        report.total,
        report.face_misses,
        report.failures.len()
    );
    for (path, reason) in &report.failures {
        println!("  {}: {reason}", path.display());
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(format!("{} of {} images failed", report.failures.len(), report.total).into())
    }
}

fn run_remove_bg(
    input: &Path,
    output: &Path,
    args: &RemoverArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = resolve_settings(args)?;
    let mut remover = build_remover(args, &settings)?;
    remover.remove_background(input, output)?;
    log::info!("Output written to {}", output.display());
    Ok(())
}

fn run_stats(image: &Path, args: &RemoverArgs) -> Result<(), Box<dyn std::error::Error>> {
    let settings = resolve_settings(args)?;
    let selector = BackgroundRemoverSelector::detect(settings.models_dir.clone());
    let mut remover = selector.create_local(&settings.remover_config())?;

    match remover.get_stats(image) {
        Some(stats) => {
            println!("Image:            {}", image.display());
            println!("Size:             {}x{}", stats.width, stats.height);
            println!("Foreground ratio: {:.3}", stats.foreground_ratio);
            println!("Mean alpha:       {:.1}", stats.mean_alpha);
        }
        None => println!("No statistics available for {}", image.display()),
    }
    Ok(())
}

fn run_fetch_model(name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let model = SegmentationModel::by_name(name)
        .ok_or_else(|| ModelResolveError::UnknownModel(name.to_string()))?;
    log::info!("Downloading {name} from {}", model.download_url());
    let path = model_resolver::fetch(
        &model.file_name(),
        &model.download_url(),
        Some(Box::new(download_progress)),
    )?;
    eprintln!();
    println!("Saved {}", path.display());
    Ok(())
}

fn run_save_settings(args: &RemoverArgs) -> Result<(), Box<dyn std::error::Error>> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => Settings::default_path().ok_or("no platform config directory")?,
    };
    let settings = settings_to_save(args)?;
    settings.save(&path)?;
    println!("Saved settings to {}", path.display());
    Ok(())
}

/// Resolved settings with an explicit `--remover` made persistent.
fn settings_to_save(args: &RemoverArgs) -> Result<Settings, Box<dyn std::error::Error>> {
    let mut settings = resolve_settings(args)?;
    match parse_choice(args, &settings)? {
        RemoverChoice::Kind(kind) => settings.remover = kind,
        RemoverChoice::Auto => {
            return Err(RemoverError::configuration(
                "`auto` is chosen per run and cannot be saved as the remover",
            )
            .into())
        }
    }
    Ok(settings)
}

fn print_presets() {
    println!(
        "{:24} {:20} {:>9} {:>9} {:>7}",
        "preset", "model", "threshold", "preserve", "smooth"
    );
    for preset in Preset::ALL {
        let config = preset.config();
        println!(
            "{:24} {:20} {:>9} {:>9} {:>7}",
            preset.name(),
            config.model,
            config.alpha_threshold,
            config.preserve_elements,
            config.smooth_edges
        );
    }
}

fn print_backends(models_dir: Option<PathBuf>) {
    let selector = BackgroundRemoverSelector::detect(models_dir.clone());
    let types: Vec<_> = selector
        .list_available_types()
        .iter()
        .map(|t| t.as_str())
        .collect();
    println!("Available removers: {}", types.join(", "));

    let installed = OnnxSegmentationLoader::new(models_dir.clone()).installed_models();
    if installed.is_empty() {
        println!(
            "Segmentation models: none (known: {})",
            SegmentationModel::known_names().join(", ")
        );
    } else {
        println!("Segmentation models: {}", installed.join(", "));
    }

    match model_resolver::resolve(FACE_MODEL_NAME, models_dir.as_deref()) {
        Ok(path) => println!("Face model: {}", path.display()),
        Err(_) => println!("Face model: missing ({FACE_MODEL_NAME})"),
    }
}

/// Settings file (explicit or default) with command-line overrides applied.
fn resolve_settings(args: &RemoverArgs) -> Result<Settings, Box<dyn std::error::Error>> {
    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::load_default()?,
    };

    if let Some(name) = &args.preset {
        settings.preset = Some(name.parse::<Preset>()?);
    }
    let discrete = args.model.is_some()
        || args.threshold.is_some()
        || args.no_preserve_elements
        || args.no_smooth_edges;
    if discrete {
        settings.background = settings.remover_config();
        settings.preset = None;
    }
    if let Some(model) = &args.model {
        settings.background.model = model.clone();
    }
    if let Some(threshold) = args.threshold {
        settings.background.alpha_threshold = u8::try_from(threshold).map_err(|_| {
            RemoverError::configuration(format!(
                "threshold must be between 0 and 255, got {threshold}"
            ))
        })?;
    }
    if args.no_preserve_elements {
        settings.background.preserve_elements = false;
    }
    if args.no_smooth_edges {
        settings.background.smooth_edges = false;
    }
    if args.api_key.is_some() {
        settings.api_key = args.api_key.clone();
    }
    if args.models_dir.is_some() {
        settings.models_dir = args.models_dir.clone();
    }
    Ok(settings)
}

fn parse_choice(args: &RemoverArgs, settings: &Settings) -> Result<RemoverChoice, RemoverError> {
    match args.remover.as_deref() {
        None => Ok(RemoverChoice::Kind(settings.remover)),
        Some("auto") => Ok(RemoverChoice::Auto),
        Some(name) => name.parse().map(RemoverChoice::Kind),
    }
}

fn build_remover(
    args: &RemoverArgs,
    settings: &Settings,
) -> Result<Box<dyn BackgroundRemover>, Box<dyn std::error::Error>> {
    let choice = parse_choice(args, settings)?;
    let selector = BackgroundRemoverSelector::detect(settings.models_dir.clone());
    let config = settings.remover_config();
    let api_key = settings.api_key.as_deref();

    let remover = match choice {
        RemoverChoice::Auto => selector.best_available(api_key, &config)?,
        RemoverChoice::Kind(kind) => match selector.create(kind, api_key, &config) {
            Err(e) if e.is_unavailable() && kind == RemoverType::LocalModel && api_key.is_some() => {
                log::warn!("{e}; falling back to the remote API");
                selector.create(RemoverType::Api, api_key, &config)?
            }
            other => other?,
        },
    };
    Ok(remover)
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading segmentation model... {pct}%");
    } else {
        eprint!("\rDownloading segmentation model... {downloaded} bytes");
    }
}
