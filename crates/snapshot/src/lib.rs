#![deny(unsafe_code)]
//! Image files from rendered [`PixelBuffer`]s.
//!
//! PPM output is always available. PNG output is feature-gated behind `png`
//! (default on) so the core can be used without pulling in the `image` crate.

use eglframe_core::error::RenderError;
use eglframe_core::pixel::PixelBuffer;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes `buffer` to `path` as an ASCII PPM, replacing any existing file.
///
/// Returns `RenderError::Io` on create or write failure.
pub fn write_ppm(buffer: &PixelBuffer, path: &Path) -> Result<(), RenderError> {
    let io_error = |e: std::io::Error| RenderError::Io(format!("{}: {e}", path.display()));

    let file = File::create(path).map_err(io_error)?;
    let mut out = BufWriter::new(file);
    eglframe_core::ppm::write_ppm(buffer, &mut out).map_err(io_error)?;
    out.flush().map_err(io_error)?;

    log::debug!(
        "wrote {}x{} PPM to {}",
        buffer.width(),
        buffer.height(),
        path.display()
    );
    Ok(())
}

/// Writes `buffer` as a PNG, flipping it to the top-down row order PNG uses.
///
/// Returns `RenderError::Io` on write failure.
#[cfg(feature = "png")]
pub fn write_png(buffer: &PixelBuffer, path: &Path) -> Result<(), RenderError> {
    let img = image::RgbImage::from_raw(buffer.width(), buffer.height(), buffer.to_top_down())
        .ok_or_else(|| RenderError::Io("RGB buffer size mismatch".into()))?;
    img.save(path)
        .map_err(|e| RenderError::Io(format!("{}: {e}", path.display())))?;

    log::debug!("wrote PNG to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use eglframe_core::ppm::decode_ppm;
    use proptest::prelude::*;

    fn two_tone(width: u32, height: u32) -> PixelBuffer {
        let mut buffer = PixelBuffer::new(width, height).unwrap();
        for x in 0..width {
            buffer.set(x, height - 1, [200, 10, 30]);
        }
        buffer
    }

    #[test]
    fn write_ppm_round_trip() {
        let buffer = two_tone(5, 3);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.ppm");

        write_ppm(&buffer, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"P3\n5 3\n255\n"));
        assert_eq!(decode_ppm(&bytes).unwrap(), buffer);
    }

    #[test]
    fn write_ppm_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.ppm");
        std::fs::write(&path, vec![b'x'; 4096]).unwrap();

        write_ppm(&two_tone(1, 1), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains('x'), "stale bytes left in: {text:?}");
    }

    #[test]
    fn write_ppm_to_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("frame.ppm");

        let err = write_ppm(&two_tone(2, 2), &path).unwrap_err();
        assert!(matches!(err, RenderError::Io(_)), "got: {err:?}");
        assert!(err.to_string().contains("frame.ppm"), "got: {err}");
    }

    #[cfg(feature = "png")]
    #[test]
    fn write_png_puts_top_row_first() {
        let buffer = two_tone(4, 2);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");

        write_png(&buffer, &path).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.width(), 4);
        assert_eq!(img.height(), 2);
        assert_eq!(img.get_pixel(0, 0).0, [200, 10, 30]);
        assert_eq!(img.get_pixel(0, 1).0, [0, 0, 0]);
    }

    proptest! {
        #[test]
        fn written_file_decodes_to_same_pixels(
            width in 1u32..12,
            height in 1u32..12,
            seed in any::<u8>(),
        ) {
            let len = (width * height * 3) as usize;
            let data: Vec<u8> = (0..len).map(|i| (i as u8).wrapping_mul(31) ^ seed).collect();
            let buffer = PixelBuffer::from_raw(width, height, data).unwrap();
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("p.ppm");

            write_ppm(&buffer, &path).unwrap();
            let decoded = decode_ppm(&std::fs::read(&path).unwrap()).unwrap();
            prop_assert_eq!(decoded, buffer);
        }
    }
}
