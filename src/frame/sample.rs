use std::sync::Arc;
use std::time::Instant;

use crate::error::FrameError;

const RGB_CHANNELS: usize = 3;
const RGBA_CHANNELS: usize = 4;

/// One captured frame as packed RGB, 3 bytes per pixel.
///
/// Pixels sit behind an `Arc`, so cloning a sample to place it in several
/// slots or hand it to the worker never copies the image.
#[derive(Debug, Clone)]
pub struct FrameSample {
    pixels: Arc<[u8]>,
    width: u32,
    height: u32,
    /// Bytes per row, at least `width * 3`.
    stride: usize,
    captured_at: Instant,
}

impl FrameSample {
    /// Wrap an already packed RGB buffer. Use [`validate`](Self::validate)
    /// before handing it to a detector.
    pub fn from_rgb(
        pixels: impl Into<Arc<[u8]>>,
        width: u32,
        height: u32,
        stride: usize,
        captured_at: Instant,
    ) -> Self {
        Self {
            pixels: pixels.into(),
            width,
            height,
            stride,
            captured_at,
        }
    }

    /// Pack an RGBA buffer with row stride `rgba_stride` into tight RGB rows.
    pub fn from_rgba(
        rgba: &[u8],
        width: u32,
        height: u32,
        rgba_stride: usize,
        captured_at: Instant,
    ) -> Result<Self, FrameError> {
        let row = width as usize * RGBA_CHANNELS;
        check_layout(rgba.len(), width, height, rgba_stride, row)?;

        let mut rgb = Vec::with_capacity(width as usize * height as usize * RGB_CHANNELS);
        for line in rgba.chunks(rgba_stride).take(height as usize) {
            for px in line[..row].chunks_exact(RGBA_CHANNELS) {
                rgb.extend_from_slice(&px[..RGB_CHANNELS]);
            }
        }

        Ok(Self::from_rgb(
            rgb,
            width,
            height,
            width as usize * RGB_CHANNELS,
            captured_at,
        ))
    }

    pub fn validate(&self) -> Result<(), FrameError> {
        check_layout(
            self.pixels.len(),
            self.width,
            self.height,
            self.stride,
            self.width as usize * RGB_CHANNELS,
        )
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    /// Whether both samples share the same pixel allocation.
    pub fn same_pixels(&self, other: &FrameSample) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

fn check_layout(
    len: usize,
    width: u32,
    height: u32,
    stride: usize,
    row: usize,
) -> Result<(), FrameError> {
    if width == 0 || height == 0 {
        return Err(FrameError::Empty { width, height });
    }
    if stride < row {
        return Err(FrameError::StrideTooShort { stride, row });
    }
    // The last row only needs its pixels, not the padding after them.
    let expected = stride * (height as usize - 1) + row;
    if len < expected {
        return Err(FrameError::Truncated {
            expected,
            actual: len,
        });
    }
    Ok(())
}
