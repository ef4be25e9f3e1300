#![deny(unsafe_code)]
//! Core of the eglframe headless renderer.
//!
//! Provides the render descriptors (`SurfaceConfig`, `TargetConfig`,
//! `FrameConfig`), the `SceneModel` animation state, the bottom-up
//! `PixelBuffer` with its ASCII PPM codec, and `RenderError`. The `render`
//! feature adds the EGL/OpenGL pipeline itself.

pub mod config;
pub mod error;
pub mod model;
pub mod pixel;
pub mod ppm;

#[cfg(feature = "render")]
pub mod render;

pub use config::{
    AttachmentKind, ColorFormat, DepthFormat, FrameConfig, RenderableApi, SurfaceConfig,
    SurfaceKind, TargetConfig,
};
pub use error::{GraphicsApi, RenderError, ShaderError};
pub use model::{ModelState, SceneModel};
pub use pixel::PixelBuffer;
pub use ppm::{decode_ppm, encode_ppm, write_ppm};
