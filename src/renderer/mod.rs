//! Rendering output.
//!
//! *The renderer never produces colours directly.*  Every pixel is a
//! palette index already remapped through a shade table; turning the
//! [`Framebuffer`] into RGB is a separate presentation step
//! ([`Framebuffer::to_rgba`]) so a window, a file writer or a test can
//! each pick their own palette.

use crate::world::texture::Palette;

/// Pixel format handed to windowing back-ends (0x00RRGGBB).
pub type Rgba = u32;

/// Palette-indexed frame, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Framebuffer {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn clear(&mut self, index: u8) {
        self.pixels.fill(index);
    }

    #[inline(always)]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width + x]
    }

    #[inline(always)]
    pub fn put(&mut self, x: usize, y: usize, index: u8) {
        self.pixels[y * self.width + x] = index;
    }

    /// One scan-line.
    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let w = self.width;
        &mut self.pixels[y * w..][..w]
    }

    /// Expand into `dst` (same size) through `palette`.
    pub fn to_rgba(&self, palette: &Palette, dst: &mut [Rgba]) {
        debug_assert_eq!(dst.len(), self.pixels.len());
        for (out, &idx) in dst.iter_mut().zip(&self.pixels) {
            *out = palette[idx as usize];
        }
    }
}

pub mod software;
pub use software::{Frame, FrameStats, Software};
