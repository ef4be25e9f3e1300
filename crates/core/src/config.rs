//! Compile-time defaults and the immutable descriptors that drive a render.
//!
//! Everything here is plain data. The `render` module turns these
//! descriptors into EGL attribute lists and GL storage formats.

use crate::error::RenderError;
use serde::{Deserialize, Serialize};

/// Default output width in pixels.
pub const DEFAULT_WIDTH: u32 = 500;
/// Default output height in pixels.
pub const DEFAULT_HEIGHT: u32 = 500;
/// Edge length of the pbuffer the context is bound to. Never rendered into.
pub const PBUFFER_SIZE: u32 = 9;
/// Terminal frame count for the multi-frame variant.
pub const DEFAULT_MAX_FRAMES: u32 = 128;
/// Rotation applied per `update`, in degrees.
pub const DEFAULT_DELTA_ANGLE: f32 = 1.0;
/// Default output file name.
pub const DEFAULT_OUTPUT: &str = "result.ppm";

/// Which client API the context exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderableApi {
    /// Desktop OpenGL (compatibility profile, whatever the driver picks).
    OpenGl,
    /// OpenGL ES 2.0.
    OpenGlEs2,
}

impl RenderableApi {
    /// Human-readable name used in logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            RenderableApi::OpenGl => "OpenGL",
            RenderableApi::OpenGlEs2 => "OpenGL ES 2",
        }
    }
}

/// Kind of EGL surface the config must support.
///
/// Only pbuffers make sense without a window system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SurfaceKind {
    Pbuffer,
}

/// Descriptor used to select an EGL config. Chosen once, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceConfig {
    pub red_bits: u8,
    pub green_bits: u8,
    pub blue_bits: u8,
    pub depth_bits: u8,
    pub surface: SurfaceKind,
    pub api: RenderableApi,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            red_bits: 8,
            green_bits: 8,
            blue_bits: 8,
            depth_bits: 8,
            surface: SurfaceKind::Pbuffer,
            api: RenderableApi::OpenGl,
        }
    }
}

/// Color attachment storage format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorFormat {
    /// 8 bits per channel with alpha. Not core in GLES 2 (needs `OES_rgb8_rgba8`).
    Rgba8,
    /// 16-bit packed RGB, renderable everywhere.
    Rgb565,
}

/// Depth attachment storage format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DepthFormat {
    Depth16,
    Depth24,
}

/// How the color attachment is backed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttachmentKind {
    /// Renderbuffer storage; cannot be sampled later.
    Renderbuffer,
    /// An RGBA8 texture; sampleable if the frame is consumed as a texture.
    Texture,
}

/// Render target descriptor for the framebuffer provisioner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub width: u32,
    pub height: u32,
    pub color: ColorFormat,
    pub depth: DepthFormat,
    pub attachment: AttachmentKind,
}

impl TargetConfig {
    /// Renderbuffer-backed RGBA8 color with a 16-bit depth buffer.
    pub fn renderbuffer(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            color: ColorFormat::Rgba8,
            depth: DepthFormat::Depth16,
            attachment: AttachmentKind::Renderbuffer,
        }
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self::renderbuffer(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

/// Everything one invocation of the pipeline needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameConfig {
    pub surface: SurfaceConfig,
    pub target: TargetConfig,
    /// Clear color as linear RGBA in [0, 1].
    pub clear_color: [f32; 4],
    pub delta_angle: f32,
    /// `None` renders the single-frame variant at angle 0.
    pub max_frames: Option<u32>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            surface: SurfaceConfig::default(),
            target: TargetConfig::default(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            delta_angle: DEFAULT_DELTA_ANGLE,
            max_frames: None,
        }
    }
}

impl FrameConfig {
    /// Checks the parts of the config that can be rejected before touching
    /// the driver.
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.target.width == 0 || self.target.height == 0 {
            return Err(RenderError::InvalidDimensions);
        }
        if self.target.attachment == AttachmentKind::Texture
            && self.target.color != ColorFormat::Rgba8
        {
            log::warn!(
                "texture attachments are always RGBA8; ignoring {:?}",
                self.target.color
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_surface_requests_8_bit_color_pbuffer_opengl() {
        let s = SurfaceConfig::default();
        assert_eq!((s.red_bits, s.green_bits, s.blue_bits), (8, 8, 8));
        assert_eq!(s.depth_bits, 8);
        assert_eq!(s.surface, SurfaceKind::Pbuffer);
        assert_eq!(s.api, RenderableApi::OpenGl);
    }

    #[test]
    fn default_frame_is_single_frame_500_square_on_black() {
        let c = FrameConfig::default();
        assert_eq!(c.target.width, 500);
        assert_eq!(c.target.height, 500);
        assert_eq!(c.max_frames, None);
        assert_eq!(c.clear_color, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(c.target.attachment, AttachmentKind::Renderbuffer);
    }

    #[test]
    fn validate_rejects_zero_width() {
        let mut c = FrameConfig::default();
        c.target.width = 0;
        assert!(matches!(c.validate(), Err(RenderError::InvalidDimensions)));
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(FrameConfig::default().validate().is_ok());
    }

    #[test]
    fn api_names_are_readable() {
        assert_eq!(RenderableApi::OpenGl.name(), "OpenGL");
        assert_eq!(RenderableApi::OpenGlEs2.name(), "OpenGL ES 2");
    }

    #[test]
    fn enums_serialize_kebab_case() {
        let json = serde_json::to_string(&RenderableApi::OpenGlEs2).unwrap();
        assert_eq!(json, "\"open-gl-es2\"");
        let json = serde_json::to_string(&AttachmentKind::Renderbuffer).unwrap();
        assert_eq!(json, "\"renderbuffer\"");
    }

    #[test]
    fn frame_config_json_round_trip() {
        let original = FrameConfig {
            max_frames: Some(DEFAULT_MAX_FRAMES),
            clear_color: [0.9, 0.8, 0.5, 1.0],
            ..FrameConfig::default()
        };
        let json = serde_json::to_string(&original).unwrap();
        let restored: FrameConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(original, restored);
    }
}
