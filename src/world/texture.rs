//! Palette-indexed textures and shade tables.
//!
//! The renderer reads them only through [`TextureProvider`] and
//! [`ShadeProvider`]; [`TextureBank`] implements both.

use std::{
    collections::HashMap,
    ops::{Index, IndexMut},
};

/// Index into a [`TextureBank`]; stable once assigned.
pub type TextureId = u16;

/// Id of the fallback raster, drawn wherever a surface names an unknown
/// texture.
pub const NO_TEXTURE: TextureId = 0;

/// Palette-indexed raster in row-major order.  Texel `0` is transparent when
/// the texture is used as a sprite.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    pub name: String,
    pub w: usize,
    pub h: usize,
    pub pixels: Vec<u8>,
}

impl Texture {
    /// Texel at `(u, v)`, both wrapped into range.
    #[inline(always)]
    pub fn texel(&self, u: i32, v: i32) -> u8 {
        let u = u.rem_euclid(self.w as i32) as usize;
        let v = v.rem_euclid(self.h as i32) as usize;
        self.pixels[v * self.w + u]
    }

    /// Solid texture filled with one palette index.
    pub fn solid<S: Into<String>>(name: S, w: usize, h: usize, color: u8) -> Self {
        Self {
            name: name.into(),
            w,
            h,
            pixels: vec![color; w * h],
        }
    }
}

/// 8×8 two-tone checker, the fallback raster.
impl Default for Texture {
    fn default() -> Self {
        const TONES: [u8; 2] = [8, 16];
        let pixels = (0..64).map(|i| TONES[((i % 8) ^ (i / 8)) & 1]).collect();
        Texture {
            name: "CHECKER".to_string(),
            w: 8,
            h: 8,
            pixels,
        }
    }
}

/// Errors raised by [`TextureBank`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextureError {
    #[error("texture name `{0}` already present in bank")]
    Duplicate(String),

    #[error("texture id {0} out of range")]
    BadId(TextureId),

    /// Zero-sized raster, or pixel count not matching `w * h`.
    #[error("texture `{0}` has a malformed raster")]
    BadRaster(String),

    /// Every id is taken.
    #[error("no id left for texture `{0}`")]
    Full(String),
}

/*──────────────────────────── Providers ──────────────────────────────*/

/// Texture cache seen by the renderer: id → fixed raster.
pub trait TextureProvider {
    fn texture(&self, id: TextureId) -> Option<&Texture>;
}

/// Shade-table source: light level → 256-entry palette remap.
/// Level `0` is full brightness, higher levels are darker.
pub trait ShadeProvider {
    fn shade_table(&self, level: u8) -> &[u8; 256];
}

/*──────────────────────── Palette & Colormap ─────────────────────────*/

/// 256 colours in 0x00RRGGBB.
pub struct Palette(pub [u32; 256]);

impl Default for Palette {
    fn default() -> Self {
        Palette([0u32; 256])
    }
}

impl Palette {
    /// Eight colour ramps of 32 steps each; index `ramp * 32 + step`, step 31
    /// is the brightest shade of that ramp.
    pub fn ramps() -> Self {
        const BASES: [(u32, u32, u32); 8] = [
            (255, 255, 255),
            (200, 60, 40),
            (60, 160, 60),
            (60, 90, 210),
            (210, 180, 90),
            (140, 90, 50),
            (120, 180, 230),
            (180, 80, 180),
        ];
        let mut pal = Palette::default();
        for (ramp, &(r, g, b)) in BASES.iter().enumerate() {
            for step in 0..32u32 {
                let k = step + 1;
                pal[ramp * 32 + step as usize] = ((r * k / 32) << 16) | ((g * k / 32) << 8) | (b * k / 32);
            }
        }
        pal
    }

    /// Index of the palette entry closest to `rgb`.
    pub fn nearest(&self, rgb: u32) -> u8 {
        let (r, g, b) = split_rgb(rgb);
        let mut best = (i32::MAX, 0u8);
        for (i, &c) in self.0.iter().enumerate() {
            let (pr, pg, pb) = split_rgb(c);
            let d = (r - pr).pow(2) + (g - pg).pow(2) + (b - pb).pow(2);
            if d < best.0 {
                best = (d, i as u8);
            }
        }
        best.1
    }
}

#[inline]
fn split_rgb(c: u32) -> (i32, i32, i32) {
    (((c >> 16) & 0xFF) as i32, ((c >> 8) & 0xFF) as i32, (c & 0xFF) as i32)
}

impl Index<usize> for Palette {
    type Output = u32;
    fn index(&self, idx: usize) -> &u32 {
        &self.0[idx]
    }
}
impl IndexMut<usize> for Palette {
    fn index_mut(&mut self, idx: usize) -> &mut u32 {
        &mut self.0[idx]
    }
}

/// One 256-entry remap table per light level.
pub struct Colormap(pub Vec<[u8; 256]>);

impl Default for Colormap {
    /// A single identity table.
    fn default() -> Self {
        Colormap(vec![identity_table()])
    }
}

fn identity_table() -> [u8; 256] {
    let mut t = [0u8; 256];
    for (i, v) in t.iter_mut().enumerate() {
        *v = i as u8;
    }
    t
}

impl Colormap {
    /// `levels` tables fading `palette` linearly towards black.
    pub fn fade_to_black(palette: &Palette, levels: u16) -> Self {
        let levels = levels.max(1) as u32;
        let tables = (0..levels)
            .map(|level| {
                let keep = levels - level;
                let mut t = [0u8; 256];
                for (i, v) in t.iter_mut().enumerate() {
                    let (r, g, b) = split_rgb(palette[i]);
                    let scaled = |c: i32| (c as u32 * keep / levels) & 0xFF;
                    *v = palette.nearest((scaled(r) << 16) | (scaled(g) << 8) | scaled(b));
                }
                t
            })
            .collect();
        Colormap(tables)
    }

    pub fn levels(&self) -> usize {
        self.0.len()
    }
}

impl Index<usize> for Colormap {
    type Output = [u8; 256];
    fn index(&self, idx: usize) -> &Self::Output {
        &self.0[idx]
    }
}
impl IndexMut<usize> for Colormap {
    fn index_mut(&mut self, idx: usize) -> &mut [u8; 256] {
        &mut self.0[idx]
    }
}

/*──────────────────────────── TextureBank ────────────────────────────*/

/// In-memory texture set plus the palette and shade tables that go with it.
///
/// Id `0` is reserved for the fallback raster handed to [`TextureBank::new`];
/// names are unique.  Nothing here touches the filesystem.
pub struct TextureBank {
    ids: HashMap<String, TextureId>,
    rasters: Vec<Texture>,
    palette: Palette,
    colormap: Colormap,
}

impl TextureBank {
    /// Bank holding only `fallback`, registered as `"MISSING"`.
    pub fn new(fallback: Texture) -> Self {
        Self {
            ids: HashMap::from([(String::from("MISSING"), NO_TEXTURE)]),
            rasters: vec![fallback],
            palette: Palette::default(),
            colormap: Colormap::default(),
        }
    }

    pub fn default_with_checker() -> Self {
        Self::new(Texture::default())
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Replace the shade tables.  An empty colormap is ignored.
    pub fn set_colormap(&mut self, colormap: Colormap) {
        if colormap.levels() > 0 {
            self.colormap = colormap;
        }
    }

    /// 0x00RRGGBB of `texel` seen through shade table `level`.
    pub fn rgb(&self, level: u8, texel: u8) -> u32 {
        self.palette[self.shade_table(level)[texel as usize] as usize]
    }

    /// Stored rasters, fallback included.
    pub fn len(&self) -> usize {
        self.rasters.len()
    }

    /// True while only the fallback is present.
    pub fn is_empty(&self) -> bool {
        self.rasters.len() == 1
    }

    pub fn id(&self, name: &str) -> Option<TextureId> {
        self.ids.get(name).copied()
    }

    /// Like [`TextureBank::id`], but unknown names map to [`NO_TEXTURE`].
    pub fn id_or_missing(&self, name: &str) -> TextureId {
        self.id(name).unwrap_or(NO_TEXTURE)
    }

    pub fn texture(&self, id: TextureId) -> Result<&Texture, TextureError> {
        self.rasters.get(id as usize).ok_or(TextureError::BadId(id))
    }

    /// Register `tex` under `name` and return its new id.
    pub fn insert<S: Into<String>>(
        &mut self,
        name: S,
        tex: Texture,
    ) -> Result<TextureId, TextureError> {
        let name = name.into();
        if self.ids.contains_key(&name) {
            return Err(TextureError::Duplicate(name));
        }
        if tex.w == 0 || tex.h == 0 || tex.pixels.len() != tex.w * tex.h {
            return Err(TextureError::BadRaster(name));
        }
        let id = TextureId::try_from(self.rasters.len())
            .map_err(|_| TextureError::Full(name.clone()))?;
        self.rasters.push(tex);
        self.ids.insert(name, id);
        Ok(id)
    }
}

impl TextureProvider for TextureBank {
    fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.rasters.get(id as usize)
    }
}

impl ShadeProvider for TextureBank {
    /// Levels past the last table clamp to the darkest one.
    fn shade_table(&self, level: u8) -> &[u8; 256] {
        let last = self.colormap.levels() - 1;
        &self.colormap[(level as usize).min(last)]
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;

    /* tiny helpers ---------------------------------------------------*/
    fn flat(color: u8) -> Texture {
        Texture::solid("T", 2, 2, color)
    }

    #[test]
    fn ids_follow_insertion_order() {
        let mut bank = TextureBank::default_with_checker();
        assert!(bank.is_empty());
        let brick = bank.insert("BRICK", flat(3)).unwrap();
        let stone = bank.insert("STONE", flat(9)).unwrap();

        assert_eq!((brick, stone), (1, 2));
        assert_eq!(bank.id("STONE"), Some(stone));
        assert_eq!(bank.id_or_missing("MARBLE"), NO_TEXTURE);
        assert_eq!(bank.texture(stone).unwrap().pixels[3], 9);
        assert_eq!(bank.id("MISSING"), Some(NO_TEXTURE));
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut bank = TextureBank::default_with_checker();
        bank.insert("BRICK", flat(1)).unwrap();
        let err = bank.insert("BRICK", flat(2)).unwrap_err();
        assert_eq!(err, TextureError::Duplicate("BRICK".into()));
        assert_eq!(bank.len(), 2);
    }

    #[test]
    fn malformed_raster_rejected() {
        let mut bank = TextureBank::default_with_checker();
        let mut tex = flat(1);
        tex.pixels.pop();
        assert_eq!(
            bank.insert("BROKEN", tex).unwrap_err(),
            TextureError::BadRaster("BROKEN".into())
        );
    }

    #[test]
    fn unknown_id_is_an_error() {
        let bank = TextureBank::default_with_checker();
        assert_eq!(bank.texture(7).unwrap_err(), TextureError::BadId(7));
        assert!(TextureProvider::texture(&bank, 7).is_none());
    }

    #[test]
    fn texel_wraps_both_axes() {
        let tex = Texture::default();
        assert_eq!(tex.texel(-1, 0), tex.texel(7, 0));
        assert_eq!(tex.texel(9, 17), tex.texel(1, 1));
    }

    #[test]
    fn fade_tables_darken_and_clamp() {
        let pal = Palette::ramps();
        let cmap = Colormap::fade_to_black(&pal, 4);
        let mut bank = TextureBank::default_with_checker();
        bank.set_palette(pal);
        bank.set_colormap(cmap);

        // level 0 keeps the brightest white
        assert_eq!(bank.shade_table(0)[31], 31);
        // darker levels never get brighter
        let bright = bank.rgb(0, 31) & 0xFF;
        let dark = bank.rgb(3, 31) & 0xFF;
        assert!(dark < bright);
        // out-of-range level clamps to the darkest table
        assert_eq!(bank.shade_table(200), bank.shade_table(3));
    }
}
