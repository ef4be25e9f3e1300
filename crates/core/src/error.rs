//! Error types for the eglframe core.

use std::fmt;
use thiserror::Error;

/// Which driver API reported an error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphicsApi {
    /// The EGL display/context layer.
    Egl,
    /// The OpenGL (or OpenGL ES) command stream.
    Gl,
}

impl fmt::Display for GraphicsApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphicsApi::Egl => f.write_str("EGL"),
            GraphicsApi::Gl => f.write_str("OpenGL"),
        }
    }
}

/// Errors that can occur during shader compilation or program linking.
#[derive(Debug, Clone, Error)]
pub enum ShaderError {
    /// A shader stage failed to compile.
    #[error("shader compile error ({stage}):\n{log}")]
    CompileError {
        /// The shader stage that failed (e.g. "vertex", "fragment").
        stage: String,
        /// The driver's info log describing the error.
        log: String,
    },
    /// A program failed to link.
    #[error("shader link error:\n{0}")]
    LinkError(String),
}

/// Errors produced anywhere in the offscreen pipeline.
///
/// Every stage fails fast: the first error aborts the remaining pipeline and
/// is propagated to the caller unchanged.
#[derive(Debug, Error)]
pub enum RenderError {
    /// No headless EGL backend could be loaded or no default display exists.
    #[error("headless display unavailable: {0}")]
    DisplayUnavailable(String),

    /// `eglInitialize` rejected the display.
    #[error("EGL initialization failed (error 0x{code:x})")]
    InitializationFailed { code: u32 },

    /// No EGL config satisfies the requested surface descriptor.
    #[error("no EGL config matches the requested surface descriptor")]
    NoCompatibleConfig,

    /// `eglBindAPI` refused the requested rendering API.
    #[error("rendering API {api} is not supported (error 0x{code:x})")]
    UnsupportedApi { api: String, code: u32 },

    /// The context could not be made current on the calling thread.
    #[error("failed to bind context to surface (error 0x{code:x})")]
    BindFailed { code: u32 },

    /// The driver did not report `FRAMEBUFFER_COMPLETE`.
    #[error("framebuffer incomplete: status 0x{status:04X}")]
    IncompleteFramebuffer { status: u32 },

    /// The requested target is at or above the driver's renderbuffer limit.
    #[error("render target {width}x{height} exceeds maximum renderbuffer size {max}")]
    MaxRenderbufferSizeExceeded { width: u32, height: u32, max: u32 },

    /// A graphics call group left a non-success code in the driver's error state.
    #[error("{api} error 0x{code:x} at {operation}")]
    GraphicsOperationFailed {
        api: GraphicsApi,
        operation: String,
        code: u32,
    },

    /// The driver could not allocate a GL object name.
    #[error("failed to create GL {object}: {reason}")]
    ObjectCreationFailed { object: String, reason: String },

    /// Width or height was zero.
    #[error("invalid dimensions: width and height must be non-zero")]
    InvalidDimensions,

    /// The scene's shader program could not be built.
    #[error(transparent)]
    Shader(#[from] ShaderError),

    /// A byte stream was not a valid ASCII PPM image.
    #[error("malformed PPM image: {0}")]
    MalformedImage(String),

    /// Writing an image file failed.
    #[error("I/O error: {0}")]
    Io(String),
}
