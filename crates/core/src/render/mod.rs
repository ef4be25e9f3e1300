//! Headless EGL + OpenGL rendering.
//!
//! This module is only available when the `render` feature is enabled.
//! Every GPU resource borrows the [`RenderSession`] it was created in, so
//! the borrow checker enforces the release order: targets and scenes go
//! first, then the session tears down the context, surface and display.
//!
//! # Module overview
//!
//! - [`context`] -- EGL display, config, pbuffer and context setup.
//! - [`diagnostics`] -- EGL/GL error checks after each call group.
//! - [`target`] -- Framebuffer provisioning and pixel readback.
//! - [`texture`] -- Texture-backed color attachments.
//! - [`shader`] -- Shader compilation, linking, and error formatting.
//! - [`scene`] -- The rotating triangle.
//! - [`pipeline`] -- [`render_frame`], the whole run in one call.

pub mod context;
pub mod diagnostics;
pub mod pipeline;
pub mod scene;
pub mod shader;
pub mod target;
pub mod texture;

pub use context::RenderSession;
pub use diagnostics::{check_gl_error, gl_stage};
pub use pipeline::{render_frame, RenderedFrame};
pub use scene::{scene_transform, TriangleScene, TRIANGLE_VERTICES};
pub use shader::{build_program, format_shader_error};
pub use target::{ColorAttachment, FramebufferTarget};
pub use texture::{create_texture, TextureConfig};
