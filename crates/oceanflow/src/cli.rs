use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "oceanflow",
    author,
    version,
    about = "Animated LIC ocean-current renderer",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Flow configuration TOML; built-in defaults are used when omitted.
    #[arg(long, global = true, value_name = "FILE", env = "OCEANFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the pass chain for a number of frames and write the results as PNG.
    Render(RenderArgs),
    /// Print every program's attribute and uniform contract.
    Programs(ProgramsArgs),
    /// Compile and link every program without touching a GPU.
    Check,
}

#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Packed ocean-current field image (RGB, must match the configured resolution).
    #[arg(long, value_name = "PATH")]
    pub field: PathBuf,

    /// Noise image; seeded white noise is generated when omitted.
    #[arg(long, value_name = "PATH")]
    pub noise: Option<PathBuf>,

    /// Equirectangular earth imagery shown over land.
    #[arg(long, value_name = "PATH")]
    pub earth: Option<PathBuf>,

    /// Where the passes run.
    #[arg(long, value_enum, default_value_t = Backend::Cpu)]
    pub backend: Backend,

    /// Frames to render; overrides `animation.frames`.
    #[arg(long, value_name = "COUNT")]
    pub frames: Option<u32>,

    /// Seed for the noise and per-frame offsets; overrides `animation.seed`.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Size of the rendered globe view.
    #[arg(
        long,
        value_name = "WIDTHxHEIGHT",
        value_parser = parse_size,
        default_value = "512x512"
    )]
    pub globe_size: (u32, u32),

    /// Directory receiving `blended.png` and `globe.png`.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub out: PathBuf,
}

#[derive(Parser, Debug, Default)]
pub struct ProgramsArgs {
    /// Emit JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    Cpu,
    Gpu,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, e.g. 512x512, got '{trimmed}'"))?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width '{width}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height '{height}'"))?;

    if width == 0 || height == 0 {
        return Err("dimensions must be greater than zero".to_string());
    }
    Ok((width, height))
}
