use clap::Parser;
use sharpei::config::{self, Config, ProfileConfig};
use sharpei::output::{self, Style};
use sharpei::{process, scan};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn version_string() -> &'static str {
    if env!("SHARPEI_RELEASE_TAG") == "true" {
        return env!("CARGO_PKG_VERSION");
    }
    let hash = env!("SHARPEI_GIT_HASH");
    if hash.is_empty() {
        return "dev@unknown";
    }
    let dirty = if env!("SHARPEI_GIT_DIRTY") == "true" { "-dirty" } else { "" };
    // Leaked once at startup
    Box::leak(format!("dev@{hash}{dirty}").into_boxed_str())
}

#[derive(Parser)]
#[command(name = "sharpei")]
#[command(about = "Colour-managed batch resizing of photographs")]
#[command(long_about = "\
Colour-managed batch resizing of photographs

Every input image is rendered once per configured profile. Images are
auto-rotated, stripped of EXIF/IPTC/XMP metadata, converted to Lab, resized
there and exported to the profile's ICC colour space.

Renditions are written to <output>/<input dir>/<format>.<ext>:

  photos/dawn.jpg  --profile web-->  out/photos/dawn_web.jpg

Profiles come from a TOML config (--config, or the first of ./sharpei.toml,
./.sharpei.toml, ~/.sharpei.toml) or, for a single `thumbnail` profile, from
--width/--height/--input-profile/--output-profile.

Run 'sharpei --gen-config' to print a documented config file.

Log verbosity follows RUST_LOG; -v enables debug logs for sharpei.")]
#[command(version = version_string())]
struct Cli {
    /// Files and directories to process
    #[arg(default_value = ".")]
    paths: Vec<PathBuf>,

    /// Path to a config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory [default: .]
    #[arg(long)]
    output: Option<PathBuf>,

    /// Format of output filenames [default: {name}_{profile}]
    #[arg(long)]
    format: Option<String>,

    /// Overwrite existing files
    #[arg(long)]
    rewrite: bool,

    /// Descend into subdirectories
    #[arg(long, short)]
    recursive: bool,

    /// Width of the output image
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    width: i64,

    /// Height of the output image
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    height: i64,

    /// ICC profile assumed for images without one
    #[arg(long, default_value = "")]
    input_profile: String,

    /// ICC profile of the output images
    #[arg(long, default_value = "")]
    output_profile: String,

    /// Disable colorized output
    #[arg(long)]
    no_color: bool,

    /// Enable debug logging
    #[arg(long, short)]
    verbose: bool,

    /// Print a stock sharpei.toml with all options documented
    #[arg(long)]
    gen_config: bool,
}

impl Cli {
    fn has_profile_flags(&self) -> bool {
        self.width != 0
            || self.height != 0
            || !self.input_profile.is_empty()
            || !self.output_profile.is_empty()
    }
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        print!("{}", config::stock_config_toml());
        return Ok(ExitCode::SUCCESS);
    }

    init_logging(cli.verbose);
    let config = resolve_config(&cli)?;
    let style = Style::detect(cli.no_color);

    let inputs = scan::scan(&cli.paths, cli.recursive)?;
    if inputs.images.is_empty() {
        for path in &inputs.skipped {
            output::print_event(&process::ProcessEvent::NotAnImage { path: path.clone() }, style);
        }
        output::print_no_images(style);
        return Ok(ExitCode::SUCCESS);
    }

    init_thread_pool(&config.processing);
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            output::print_event(&event, style);
        }
    });
    let summary = process::process(&inputs, &config, Some(tx));
    printer.join().map_err(|_| "output thread panicked")?;
    output::print_summary(&summary, style);

    Ok(if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn init_logging(verbose: bool) {
    let default = if verbose { "sharpei=debug" } else { "sharpei=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Profile flags, an explicit `--config`, or the first discovered config file.
///
/// `--output`, `--format` and `--rewrite` override the file's values.
fn resolve_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    if cli.has_profile_flags() {
        if cli.config.is_some() {
            return Err("either a config file or profile flags may be given, not both".into());
        }
        let profile = ProfileConfig {
            width: cli.width,
            height: cli.height,
            input_profile: cli.input_profile.clone(),
            output_profile: cli.output_profile.clone(),
            file_type: "same".to_string(),
            ..ProfileConfig::default()
        };
        let config = config::from_cli_profile(
            cli.output.clone().unwrap_or_else(|| PathBuf::from(".")),
            cli.format.clone().unwrap_or_else(|| config::DEFAULT_FORMAT.to_string()),
            cli.rewrite,
            profile,
        )?;
        return Ok(config);
    }

    let path = match &cli.config {
        Some(path) => path.clone(),
        None => discover()?,
    };
    tracing::debug!(path = %path.display(), "loading config");
    let mut config = config::load_config(&path)?;
    if let Some(output) = &cli.output {
        config.output = output.clone();
    }
    if let Some(format) = &cli.format {
        config.format = format.clone();
        config.validate()?;
    }
    config.rewrite |= cli.rewrite;
    Ok(config)
}

fn discover() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    let home = std::env::var_os("HOME").map(PathBuf::from);
    config::discover_config(&cwd, home.as_deref()).ok_or_else(|| {
        let searched: Vec<String> = config::config_candidates(Path::new("."), Some(Path::new("~")))
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        format!("no config found, searched at: {}", searched.join(", ")).into()
    })
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
