#![deny(unsafe_code)]
//! CLI binary for eglframe.
//!
//! Renders the triangle scene headlessly through EGL and writes the final
//! frame as an ASCII PPM (and optionally a PNG).

mod error;
mod logging;

use clap::{Parser, ValueEnum};
use eglframe_core::config::{DEFAULT_DELTA_ANGLE, DEFAULT_HEIGHT, DEFAULT_OUTPUT, DEFAULT_WIDTH};
use eglframe_core::render::render_frame;
use eglframe_core::{
    AttachmentKind, ColorFormat, DepthFormat, FrameConfig, RenderableApi, SurfaceConfig,
    TargetConfig,
};
use error::CliError;
use logging::{init_logging, LoggingConfig};
use std::path::PathBuf;
use std::process;

#[derive(Clone, Copy, ValueEnum)]
enum ApiArg {
    /// Desktop OpenGL.
    Gl,
    /// OpenGL ES 2.0.
    Gles2,
}

#[derive(Clone, Copy, ValueEnum)]
enum ColorArg {
    Rgba8,
    Rgb565,
}

#[derive(Clone, Copy, ValueEnum)]
enum DepthArg {
    #[value(name = "16")]
    Depth16,
    #[value(name = "24")]
    Depth24,
}

#[derive(Clone, Copy, ValueEnum)]
enum AttachmentArg {
    Renderbuffer,
    Texture,
}

#[derive(Parser)]
#[command(name = "eglframe", about = "Render a frame off-screen with EGL and write it as PPM")]
struct Cli {
    /// Output width in pixels.
    #[arg(short = 'W', long, default_value_t = DEFAULT_WIDTH)]
    width: u32,

    /// Output height in pixels.
    #[arg(short = 'H', long, default_value_t = DEFAULT_HEIGHT)]
    height: u32,

    /// Animate for N frames and export the last one. Without it a single
    /// frame is drawn at angle 0.
    #[arg(long, num_args = 0..=1, default_missing_value = "128", value_name = "N")]
    frames: Option<u32>,

    /// Degrees of rotation per frame.
    #[arg(long, default_value_t = DEFAULT_DELTA_ANGLE)]
    delta: f32,

    /// Client API of the context.
    #[arg(long, value_enum, default_value_t = ApiArg::Gl)]
    api: ApiArg,

    /// Color attachment storage.
    #[arg(long, value_enum, default_value_t = ColorArg::Rgba8)]
    color: ColorArg,

    /// Depth attachment bits.
    #[arg(long, value_enum, default_value_t = DepthArg::Depth16)]
    depth: DepthArg,

    /// Color attachment kind.
    #[arg(long, value_enum, default_value_t = AttachmentArg::Renderbuffer)]
    attachment: AttachmentArg,

    /// Minimum depth bits requested from the EGL config.
    #[arg(long, default_value_t = 8)]
    depth_bits: u8,

    /// Clear color as R,G,B in [0, 1].
    #[arg(long, value_parser = parse_clear, default_value = "0,0,0")]
    clear: [f32; 3],

    /// PPM output path.
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Also write the frame as PNG to this path.
    #[arg(long)]
    png: Option<PathBuf>,

    /// Print a JSON summary on stdout.
    #[arg(long)]
    json: bool,

    /// Debug logging for the eglframe crates.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_clear(s: &str) -> Result<[f32; 3], String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<f32>().map_err(|e| format!("'{p}': {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    match parts.as_slice() {
        &[r, g, b] if [r, g, b].iter().all(|c| (0.0..=1.0).contains(c)) => Ok([r, g, b]),
        &[_, _, _] => Err("components must be in [0, 1]".into()),
        _ => Err(format!("expected R,G,B, got {} component(s)", parts.len())),
    }
}

impl Cli {
    fn frame_config(&self) -> FrameConfig {
        let api = match self.api {
            ApiArg::Gl => RenderableApi::OpenGl,
            ApiArg::Gles2 => RenderableApi::OpenGlEs2,
        };
        let color = match self.color {
            ColorArg::Rgba8 => ColorFormat::Rgba8,
            ColorArg::Rgb565 => ColorFormat::Rgb565,
        };
        let depth = match self.depth {
            DepthArg::Depth16 => DepthFormat::Depth16,
            DepthArg::Depth24 => DepthFormat::Depth24,
        };
        let attachment = match self.attachment {
            AttachmentArg::Renderbuffer => AttachmentKind::Renderbuffer,
            AttachmentArg::Texture => AttachmentKind::Texture,
        };
        let [r, g, b] = self.clear;

        FrameConfig {
            surface: SurfaceConfig {
                depth_bits: self.depth_bits,
                api,
                ..SurfaceConfig::default()
            },
            target: TargetConfig {
                width: self.width,
                height: self.height,
                color,
                depth,
                attachment,
            },
            clear_color: [r, g, b, 1.0],
            delta_angle: self.delta,
            max_frames: self.frames,
        }
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let config = cli.frame_config();
    log::debug!("frame config: {config:?}");

    let frame = render_frame(&config)?;
    eglframe_snapshot::write_ppm(&frame.pixels, &cli.output)?;
    if let Some(png) = &cli.png {
        eglframe_snapshot::write_png(&frame.pixels, png)?;
    }

    if cli.json {
        let info = serde_json::json!({
            "width": config.target.width,
            "height": config.target.height,
            "config": config,
            "state": frame.state,
            "egl_version": format!("{}.{}", frame.egl_version.0, frame.egl_version.1),
            "gl_version": frame.gl_version,
            "output": cli.output.display().to_string(),
            "png": cli.png.as_ref().map(|p| p.display().to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        eprintln!(
            "rendered {}x{} ({} frame(s), angle {:.1}) -> {}",
            config.target.width,
            config.target.height,
            frame.state.frame_count.max(1),
            frame.state.angle,
            cli.output.display()
        );
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(LoggingConfig::verbose(cli.verbose));

    if let Err(e) = run(&cli) {
        if cli.json {
            let j = serde_json::json!({"error": e.to_string(), "exit_code": e.exit_code()});
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}
