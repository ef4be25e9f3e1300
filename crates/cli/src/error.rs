//! Exit codes for the `eglframe` binary.
//!
//! | code | meaning |
//! |---|---|
//! | 0 | frame rendered and written |
//! | 2 | bad flags (reported by clap before `run`) |
//! | 10 | the EGL/GL pipeline failed: no display, no matching config, size over the renderbuffer limit, incomplete framebuffer, shader or driver error |
//! | 11 | the PPM or PNG file could not be written |
//! | 13 | the `--json` summary could not be serialized |

use eglframe_core::RenderError;
use std::fmt;

/// Why a run failed, grouped by exit code.
pub enum CliError {
    /// Anything `render_frame` reports, except file output.
    Render(RenderError),
    /// Output file creation or write failure, with the path in the message.
    Io(String),
    Serialization(String),
}

impl CliError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Render(_) => 10,
            CliError::Io(_) => 11,
            CliError::Serialization(_) => 13,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Render(e) => write!(f, "render failed: {e}"),
            CliError::Io(msg) => write!(f, "cannot write output: {msg}"),
            CliError::Serialization(msg) => write!(f, "cannot serialize summary: {msg}"),
        }
    }
}

/// `RenderError::Io` comes from the snapshot writers and gets its own code;
/// every other variant is a pipeline failure.
impl From<RenderError> for CliError {
    fn from(e: RenderError) -> Self {
        match e {
            RenderError::Io(msg) => CliError::Io(msg),
            other => CliError::Render(other),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Serialization(e.to_string())
    }
}
