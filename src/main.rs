use clap::{Parser, Subcommand};
use portrait_dataset::detection::SharedDetector;
use portrait_dataset::imaging::RustBackend;
use portrait_dataset::prepare::{self, PrepareSettings};
use portrait_dataset::{config, naming, output, scan};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt};

/// Flags that override `config.toml` for one run.
#[derive(clap::Args, Clone)]
struct OverrideArgs {
    /// Trigger word (overrides [subject] name)
    #[arg(long)]
    subject: Option<String>,

    /// Class word (overrides [subject] class_name)
    #[arg(long)]
    class_name: Option<String>,

    /// Produce every configured size instead of the closest aspect only
    #[arg(long)]
    crop: bool,

    /// Zoom levels, comma separated (overrides [output] zoom_levels)
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    zoom: Option<Vec<f64>>,
}

impl OverrideArgs {
    fn apply(&self, config: &mut config::PrepareConfig) -> Result<(), config::ConfigError> {
        if let Some(subject) = &self.subject {
            config.subject.name = subject.clone();
        }
        if let Some(class_name) = &self.class_name {
            config.subject.class_name = class_name.clone();
        }
        if self.crop {
            config.output.crop = true;
        }
        if let Some(zoom) = &self.zoom {
            config.output.zoom_levels = zoom.clone();
        }
        config.validate()
    }
}

fn version_string() -> &'static str {
    let hash = env!("GIT_HASH");
    if hash.is_empty() {
        env!("CARGO_PKG_VERSION")
    } else {
        // Leaked once; called a single time at startup.
        Box::leak(format!("{}-dev@{hash}", env!("CARGO_PKG_VERSION")).into_boxed_str())
    }
}

#[derive(Parser)]
#[command(name = "portrait-dataset")]
#[command(about = "Face-anchored crops and captions for subject fine-tuning datasets")]
#[command(long_about = "\
Face-anchored crops and captions for subject fine-tuning datasets

Every photo in the source folder becomes one PNG + caption pair per output
size and zoom level, framed on the detected face.

Source folder:

  photos/
  ├── config.toml          # Dataset config (optional)
  ├── IMG_0001.jpg         # Photo 1
  ├── IMG_0001.txt         # Caption for photo 1 (optional)
  └── IMG_0002.png         # Photo 2

Output:

  dataset/img/{repeats}_{subject} {class}/{subject} (0001.0001).png
  dataset/img/{repeats}_{subject} {class}/{subject} (0001.0001).txt

Captions (first available wins):
  sidecar .txt → \"portrait photo of {subject} {class}, best quality\"

Set RUST_LOG=info (or debug) for diagnostic logging.
Run 'portrait-dataset gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Folder holding the source photos and config.toml
    #[arg(long, default_value = "photos", global = true)]
    source: PathBuf,

    /// Dataset output folder
    #[arg(long, default_value = "dataset", global = true)]
    output: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Crop, resize and caption every photo into the dataset
    Prepare {
        #[command(flatten)]
        overrides: OverrideArgs,

        /// Also write the per-photo report as JSON to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Show what prepare would produce without writing anything
    Check {
        #[command(flatten)]
        overrides: OverrideArgs,
    },
    /// List the image/caption pairs in the dataset
    List,
    /// Delete image/caption pairs from the dataset
    Delete {
        /// Dataset images to delete, e.g. "dataset/img/5_ohwx person/ohwx (0001.0002).png"
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Prepare { overrides, report } => {
            let config = load_config(&cli.source, &overrides)?;
            let jobs = scan::scan_sources(&cli.source)?;
            let settings = PrepareSettings::from_config(&config, jobs.len(), &cli.output);
            init_thread_pool(&config.processing);

            let backend = RustBackend::new();
            let detector = SharedDetector::rustface(config.detection.clone());

            let (tx, rx) = std::sync::mpsc::channel();
            let printer_settings = settings.clone();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_prepare_event(&event, &printer_settings) {
                        println!("{}", line);
                    }
                }
            });
            let result = prepare::prepare_batch(&backend, &detector, &jobs, &settings, Some(tx));
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;
            let batch = result?;

            output::print_batch_summary(&batch);
            if let Some(path) = report {
                let json = serde_json::to_string_pretty(&batch)?;
                std::fs::write(&path, json)?;
                println!("Report: {}", path.display());
            }
            if batch.failed() > 0 {
                return Err(format!("{} of {} photos failed", batch.failed(), batch.images.len()).into());
            }
        }
        Command::Check { overrides } => {
            println!("==> Checking {}", cli.source.display());
            let config = load_config(&cli.source, &overrides)?;
            let jobs = scan::scan_sources(&cli.source)?;
            let settings = PrepareSettings::from_config(&config, jobs.len(), &cli.output);
            output::print_check_output(&jobs, &settings);
            println!("==> Source folder is valid");
        }
        Command::List => {
            let folders = subject_folders(&cli.output)?;
            if folders.is_empty() {
                println!("No dataset found in {}", cli.output.display());
            }
            for folder in folders {
                let items = naming::list_items(&folder)?;
                output::print_item_list(&folder, &items);
            }
        }
        Command::Delete { images } => {
            for image in images {
                let item = naming::remove_item(&image)?;
                println!("Deleted {}", item.image_path.display());
                println!("Deleted {}", item.caption_path.display());
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Diagnostics go to stderr, filtered by `RUST_LOG` (default: warnings).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(
    source: &Path,
    overrides: &OverrideArgs,
) -> Result<config::PrepareConfig, config::ConfigError> {
    let mut config = config::load_config(source)?;
    overrides.apply(&mut config)?;
    Ok(config)
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// Subject folders under `{output}/img`, sorted by name.
fn subject_folders(output: &Path) -> std::io::Result<Vec<PathBuf>> {
    let img = output.join("img");
    if !img.is_dir() {
        return Ok(Vec::new());
    }
    let mut folders = Vec::new();
    for entry in std::fs::read_dir(img)? {
        let path = entry?.path();
        if path.is_dir() {
            folders.push(path);
        }
    }
    folders.sort();
    Ok(folders)
}
