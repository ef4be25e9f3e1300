//! CPU-side RGB8 pixel storage filled by GPU readback.
//!
//! Rows are kept in the driver's native order: row 0 is the **bottom** of
//! the image. Encoders that want top-to-bottom output go through
//! [`PixelBuffer::rows_top_down`].

use crate::error::RenderError;

/// Bytes per pixel (8-bit R, G, B).
pub const CHANNELS: usize = 3;

/// An RGB8 image of `width * height` pixels, bottom row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

/// Length in bytes of a `width x height` RGB8 image.
///
/// Fails for a zero edge, and for sizes no `Vec` can hold (over
/// `isize::MAX` bytes).
pub(crate) fn byte_len(width: u32, height: u32) -> Result<usize, RenderError> {
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidDimensions);
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(CHANNELS))
        .filter(|&n| n <= isize::MAX as usize)
        .ok_or(RenderError::InvalidDimensions)
}

impl PixelBuffer {
    /// Creates a black buffer of the given dimensions.
    ///
    /// Returns `RenderError::InvalidDimensions` if either dimension is zero
    /// or the byte length overflows `usize`.
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        let len = byte_len(width, height)?;
        Ok(Self {
            width,
            height,
            data: vec![0; len],
        })
    }

    /// Wraps existing bottom-to-top RGB8 bytes, validating the length.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, RenderError> {
        let expected = byte_len(width, height)?;
        if data.len() != expected {
            return Err(RenderError::MalformedImage(format!(
                "expected {expected} bytes for {width}x{height} RGB, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Reallocates storage for new dimensions. Contents are unspecified
    /// afterwards and are expected to be overwritten by a readback.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        let len = byte_len(width, height)?;
        self.data.resize(len, 0);
        self.width = width;
        self.height = height;
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw bytes, bottom row first.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw bytes, bottom row first. Readback writes through this.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn row_bytes(&self) -> usize {
        self.width as usize * CHANNELS
    }

    /// Pixel at `(x, y)` with `y` counted from the bottom edge.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate is out of bounds.
    pub fn get(&self, x: u32, y: u32) -> [u8; 3] {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) out of bounds for {}x{}",
            self.width,
            self.height
        );
        let i = y as usize * self.row_bytes() + x as usize * CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Sets the pixel at `(x, y)`, `y` counted from the bottom edge.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate is out of bounds.
    pub fn set(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) out of bounds for {}x{}",
            self.width,
            self.height
        );
        let i = y as usize * self.row_bytes() + x as usize * CHANNELS;
        self.data[i..i + CHANNELS].copy_from_slice(&rgb);
    }

    /// Iterates rows from the top edge down, each row as `width * 3` bytes.
    pub fn rows_top_down(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(self.row_bytes()).rev()
    }

    /// Copies the image into a new top-to-bottom RGB8 vector.
    pub fn to_top_down(&self) -> Vec<u8> {
        self.rows_top_down().flatten().copied().collect()
    }
}
