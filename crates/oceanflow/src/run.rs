use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use flowconfig::FlowConfig;
use image::RgbaImage;
use licflow::programs::{AttributeDecl, UniformDecl};
use licflow::{
    drive, offset_source_for, Camera, CpuFlowPipeline, FlowInputs, FrameStats, GpuContext,
    GpuFlowRenderer, PipelineSettings, ProgramName, ProgramRegistry, ProgramTable, Resolution,
    ShaderValidator, UniformBindings,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::cli::{Backend, Cli, Command, ProgramsArgs, RenderArgs};
use crate::settings::{load_config, pipeline_settings, DEFAULT_FRAMES};

pub fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Render(args) => render(&config, args),
        Command::Programs(args) => programs(&config, args),
        Command::Check => check(&config),
    }
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn render(config: &FlowConfig, args: RenderArgs) -> Result<()> {
    let settings = pipeline_settings(config);
    let frames = args
        .frames
        .or(config.animation.frames)
        .unwrap_or(DEFAULT_FRAMES);
    if frames == 0 {
        bail!("--frames must be greater than zero");
    }
    let seed = args.seed.or(config.animation.seed);
    let inputs = FlowInputs::load(
        &settings,
        &args.field,
        args.noise.as_deref(),
        args.earth.as_deref(),
        seed.unwrap_or_else(rand::random),
    )?;

    fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create output directory {}", args.out.display()))?;
    let blended_path = args.out.join("blended.png");
    let globe_path = args.out.join("globe.png");

    let (width, height) = args.globe_size;
    let globe_size = Resolution::new(width, height);
    let camera = Camera::looking_at(0.0, width as f32 / height as f32);
    let mut bindings = host_bindings(&settings, &camera);
    let mut offsets = offset_source_for(seed);

    tracing::info!(
        backend = ?args.backend,
        frames,
        resolution = %settings.resolution,
        "rendering ocean-current animation"
    );
    let stats = match args.backend {
        Backend::Cpu => {
            let mut pipeline = CpuFlowPipeline::new(settings, inputs)?;
            let stats = drive(&mut pipeline, offsets.as_mut(), &mut bindings, frames)?;
            pipeline.blended().save(&blended_path)?;
            pipeline.render_globe(&bindings, globe_size).save(&globe_path)?;
            stats
        }
        Backend::Gpu => {
            let context = GpuContext::new(wgpu::PowerPreference::HighPerformance)?;
            let mut renderer = GpuFlowRenderer::new(context, settings, inputs)?;
            let stats = drive(&mut renderer, offsets.as_mut(), &mut bindings, frames)?;
            save_image(&renderer.read_blended()?, &blended_path)?;
            save_image(&renderer.render_globe(&bindings, globe_size)?, &globe_path)?;
            stats
        }
    };

    log_summary(&stats);
    println!("{}", blended_path.display());
    println!("{}", globe_path.display());
    Ok(())
}

/// Every uniform the host owns; `randomOffset` is bound per frame by `drive`.
fn host_bindings(settings: &PipelineSettings, camera: &Camera) -> UniformBindings {
    let mut bindings = UniformBindings::new();
    bindings
        .set_camera(camera.model_view, camera.projection)
        .set_mask(settings.mask);
    bindings
}

fn save_image(image: &RgbaImage, path: &Path) -> Result<()> {
    image
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))
}

fn log_summary(stats: &[FrameStats]) {
    let total: Duration = stats.iter().map(|frame| frame.elapsed).sum();
    let mean_ms = if stats.is_empty() {
        0.0
    } else {
        total.as_secs_f64() * 1000.0 / stats.len() as f64
    };
    tracing::info!(
        frames = stats.len(),
        total_ms = total.as_secs_f64() * 1000.0,
        mean_ms,
        "animation complete"
    );
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProgramContract<'a> {
    name: ProgramName,
    attributes: &'a [AttributeDecl],
    samplers: Vec<&'static str>,
    uniforms: Vec<&'a UniformDecl>,
}

fn contracts(table: &ProgramTable) -> Vec<ProgramContract<'_>> {
    table
        .iter()
        .map(|source| ProgramContract {
            name: source.name,
            attributes: &source.attributes,
            samplers: source.samplers().map(|decl| decl.name).collect(),
            uniforms: source.values().collect(),
        })
        .collect()
}

fn programs(config: &FlowConfig, args: ProgramsArgs) -> Result<()> {
    let table = ProgramTable::new(&pipeline_settings(config));
    let contracts = contracts(&table);
    if args.json {
        let json = serde_json::to_string_pretty(&contracts)
            .context("failed to serialise program contracts")?;
        println!("{json}");
        return Ok(());
    }

    for contract in contracts {
        println!("{}", contract.name);
        for attribute in contract.attributes {
            println!(
                "  attribute {:<10} {:<20} location={}",
                attribute.ty.as_str(),
                attribute.name,
                attribute.location
            );
        }
        for sampler in contract.samplers {
            println!("  sampler   {:<10} {}", "sampler2D", sampler);
        }
        for uniform in contract.uniforms {
            let default = uniform
                .default
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .context("failed to format uniform default")?
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  uniform   {:<10} {:<20} default={}",
                uniform.ty.as_str(),
                uniform.name,
                default
            );
        }
    }
    Ok(())
}

fn check(config: &FlowConfig) -> Result<()> {
    let registry = ProgramRegistry::new(&pipeline_settings(config));
    for name in ProgramName::ALL {
        registry
            .load_program(name, &ShaderValidator)
            .with_context(|| format!("program '{name}' failed to build"))?;
        println!("ok {name}");
    }
    tracing::info!(programs = ProgramName::ALL.len(), "all programs compiled and linked");
    Ok(())
}
