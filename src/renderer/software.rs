//! ---------------------------------------------------------------------------
//! Software (CPU) grid renderer
//!
//! * Casts one ray per screen column through a [`GridMap`] and composites
//!   the column front to back: walls are painted at once, floor/ceiling
//!   rows are deferred to visplanes and drawn as horizontal spans.
//! * Sprites are projected on submission, ordered by footprint tests
//!   (no Z-buffer) and clipped against per-column occluder lists.
//! * Output is a palette-indexed [`Framebuffer`](crate::renderer::Framebuffer);
//!   every pixel is already remapped through a shade table.
//!
//! A frame is `Software::begin` → any number of `draw_map` / `draw_sprite`
//! → `Frame::end`.
//!
//! [`GridMap`]: crate::map::GridMap
//! ---------------------------------------------------------------------------

mod column;
pub mod depth;
mod planes;
pub mod projection;
mod renderer;
mod sky;
mod sprites;

pub use column::{ColumnSink, WallSlice, composite};
pub use depth::{Bound, DepthEntry, DepthRecords};
pub use projection::{ProjectedSprite, SpriteFlags, SpriteKind, project};
pub use renderer::{Frame, FrameStats, Software};

use crate::{config::ShadeConfig, fixed::Fixed, world::texture::ShadeProvider};

/// Everything a pixel writer needs besides geometry: how to pick a shade
/// table and how big a texel is.
#[derive(Clone, Copy)]
pub struct Paint<'a> {
    pub shade: &'a ShadeConfig,
    pub shades: &'a dyn ShadeProvider,
    /// `1 << texels_per_unit_shift` texels per world unit.
    pub texels_per_unit_shift: u32,
}

impl Paint<'_> {
    /// Shade table for a surface `depth` away.
    #[inline(always)]
    pub fn table(&self, depth: Fixed, y_side: bool) -> &[u8; 256] {
        self.shades.shade_table(self.shade.level(depth, y_side))
    }
}
