//! ASCII portable pixmap (P3) encoding and decoding.
//!
//! The encoder reproduces a fixed textual layout: a `P3` line, a
//! `"<width> <height>"` line, a `255` line, then one line per image row from
//! top to bottom. Each pixel is written as `"{r:3} {g:3} {b:3} "`, so every
//! row ends with a trailing space before the newline.
//!
//! Both directions are pure: no GPU access, and the input is never mutated.

use crate::error::RenderError;
use crate::pixel::PixelBuffer;
use std::io::{self, Write};

/// Maximum channel value written in the header.
pub const MAX_VALUE: u32 = 255;

/// Encodes `buffer` as ASCII PPM bytes.
pub fn encode_ppm(buffer: &PixelBuffer) -> Vec<u8> {
    // Header plus 12 bytes per pixel and one newline per row.
    let capacity = 32 + buffer.data().len() * 4 + buffer.height() as usize;
    let mut out = String::with_capacity(capacity);
    out.push_str(&format!(
        "P3\n{} {}\n{}\n",
        buffer.width(),
        buffer.height(),
        MAX_VALUE
    ));
    for row in buffer.rows_top_down() {
        for px in row.chunks_exact(3) {
            out.push_str(&format!("{:3} {:3} {:3} ", px[0], px[1], px[2]));
        }
        out.push('\n');
    }
    out.into_bytes()
}

/// Streams `buffer` as ASCII PPM into `out`.
pub fn write_ppm<W: Write>(buffer: &PixelBuffer, mut out: W) -> io::Result<()> {
    out.write_all(&encode_ppm(buffer))?;
    out.flush()
}

/// Parses ASCII PPM bytes back into a bottom-row-first [`PixelBuffer`].
///
/// Accepts any whitespace layout and `#` comments, as the format allows.
/// The maximum value must be 255.
///
/// # Errors
///
/// Returns `RenderError::MalformedImage` on a bad magic number, missing or
/// non-numeric tokens, an unsupported maximum value, a zero or oversized
/// width and height, out-of-range samples, or trailing data.
pub fn decode_ppm(bytes: &[u8]) -> Result<PixelBuffer, RenderError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| RenderError::MalformedImage(format!("not ASCII: {e}")))?;

    let mut tokens = text
        .lines()
        .map(|line| line.split('#').next().unwrap_or(""))
        .flat_map(str::split_whitespace);

    match tokens.next() {
        Some("P3") => {}
        Some(other) => {
            return Err(RenderError::MalformedImage(format!(
                "expected magic P3, got {other:?}"
            )))
        }
        None => return Err(RenderError::MalformedImage("empty input".into())),
    }

    let mut next_number = |what: &str| -> Result<u32, RenderError> {
        let token = tokens
            .next()
            .ok_or_else(|| RenderError::MalformedImage(format!("missing {what}")))?;
        token
            .parse::<u32>()
            .map_err(|_| RenderError::MalformedImage(format!("invalid {what}: {token:?}")))
    };

    let width = next_number("width")?;
    let height = next_number("height")?;
    let max = next_number("max value")?;
    if max != MAX_VALUE {
        return Err(RenderError::MalformedImage(format!(
            "unsupported max value {max}, expected {MAX_VALUE}"
        )));
    }

    // Every sample takes at least a digit and a separator, so a header
    // promising more samples than that is rejected before allocating.
    let samples = crate::pixel::byte_len(width, height).map_err(|_| {
        RenderError::MalformedImage(format!("unsupported dimensions {width}x{height}"))
    })?;
    if samples > bytes.len() / 2 {
        return Err(RenderError::MalformedImage(format!(
            "{width}x{height} needs {samples} samples, input has {} bytes",
            bytes.len()
        )));
    }

    let mut buffer = PixelBuffer::new(width, height)?;
    let row_bytes = width as usize * 3;
    // Rows arrive top-down; store them bottom-up.
    for row in (0..height as usize).rev() {
        let start = row * row_bytes;
        for i in 0..row_bytes {
            let sample = next_number("sample")?;
            if sample > MAX_VALUE {
                return Err(RenderError::MalformedImage(format!(
                    "sample {sample} exceeds {MAX_VALUE}"
                )));
            }
            buffer.data_mut()[start + i] = sample as u8;
        }
    }

    if let Some(extra) = tokens.next() {
        return Err(RenderError::MalformedImage(format!(
            "trailing data after pixels: {extra:?}"
        )));
    }

    Ok(buffer)
}
