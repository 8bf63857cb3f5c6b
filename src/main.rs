//! halftone CLI - stochastic halftoning of image files

use clap::Parser;
use halftone::{AlphaPolicy, DitherConfig, HalftoneError, Pipeline};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "halftone", about = "Dither images to black and white (or binary color)")]
struct Args {
    /// Input images; glob patterns are expanded
    #[arg(required = true)]
    files: Vec<String>,
    /// Blocks on horizontal side
    #[arg(short = 'x', long)]
    x_blocks: Option<u32>,
    /// Blocks on vertical side
    #[arg(short = 'y', long)]
    y_blocks: Option<u32>,
    /// Random number seed for dithering
    #[arg(short = 'r', long, allow_negative_numbers = true)]
    seed: Option<i64>,
    /// Produce smoother look
    #[arg(short, long, overrides_with = "no_smooth")]
    smooth: bool,
    /// Undo --smooth from a config file
    #[arg(long, overrides_with = "smooth")]
    no_smooth: bool,
    /// Output image is one pixel per block
    #[arg(short = 'o', long, overrides_with = "no_rescale_output")]
    rescale_output: bool,
    /// Undo --rescale-output from a config file
    #[arg(long, overrides_with = "rescale_output")]
    no_rescale_output: bool,
    /// Gamma of input image. If 0.0, then assume sRGB
    #[arg(short, long)]
    gamma: Option<f64>,
    /// Dither in color
    #[arg(short, long, overrides_with = "no_color")]
    color: bool,
    /// Undo --color from a config file
    #[arg(long, overrides_with = "color")]
    no_color: bool,
    /// Blur radius (zero to disable) [default: 1.0]
    #[arg(short, long)]
    blur: Option<f64>,
    /// Gamma-map the alpha channel too instead of copying it
    #[arg(long, overrides_with = "no_alpha_lookup")]
    alpha_lookup: bool,
    /// Copy alpha unchanged even if a config file says otherwise
    #[arg(long, overrides_with = "alpha_lookup")]
    no_alpha_lookup: bool,
    /// JSON file with a full configuration; flags given here override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Worker threads (default: one per core)
    #[arg(short, long)]
    jobs: Option<usize>,
}

impl Args {
    fn dither_config(&self) -> Result<DitherConfig, HalftoneError> {
        let mut config = match &self.config {
            Some(path) => DitherConfig::from_json_file(path)?,
            None => DitherConfig::default(),
        };
        if let Some(x) = self.x_blocks {
            config.x_blocks = x;
        }
        if let Some(y) = self.y_blocks {
            config.y_blocks = y;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(gamma) = self.gamma {
            config.gamma = gamma;
        }
        if let Some(blur) = self.blur {
            config.blur_radius = blur;
        }
        if let Some(smooth) = switch(self.smooth, self.no_smooth) {
            config.smooth = smooth;
        }
        if let Some(rescale) = switch(self.rescale_output, self.no_rescale_output) {
            config.rescale_output = rescale;
        }
        if let Some(color) = switch(self.color, self.no_color) {
            config.color_dither = color;
        }
        if let Some(lookup) = switch(self.alpha_lookup, self.no_alpha_lookup) {
            config.alpha = if lookup {
                AlphaPolicy::Lookup
            } else {
                AlphaPolicy::PassThrough
            };
        }
        Ok(config)
    }
}

/// `--flag` / `--no-flag` pair; the later one on the command line wins.
fn switch(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

/// Expand each argument as a glob; arguments matching nothing are kept as-is.
fn expand_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut inputs = Vec::new();
    for pattern in patterns {
        let matches: Vec<PathBuf> = glob::glob(pattern)
            .map(|paths| paths.filter_map(|p| p.ok()).collect())
            .unwrap_or_default();
        if matches.is_empty() {
            inputs.push(PathBuf::from(pattern));
        } else {
            inputs.extend(matches);
        }
    }
    inputs
}

fn main() -> Result<ExitCode, HalftoneError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "halftone=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    let args = Args::parse();

    if let Some(jobs) = args.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .map_err(|e| HalftoneError::Config(e.to_string()))?;
    }

    let pipeline = Pipeline::new(args.dither_config()?)?;
    tracing::debug!(config = ?pipeline.config(), "configured");

    let inputs = expand_inputs(&args.files);
    let outcomes = pipeline.process_batch(&inputs);
    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();

    if failed > 0 {
        tracing::warn!(failed, total = outcomes.len(), "some files were not processed");
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
