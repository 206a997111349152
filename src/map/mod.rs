//! Height-field grid: per-cell floor/ceiling heights and four texture ids.
//!
//! * Row-major storage, `index = y * width + x`.
//! * Every read is bounds-checked; outside the grid a closed *sky* cell
//!   ([`SKY_HEIGHT`], sky texture on every surface) is returned instead.
//! * Mutators exist for gameplay code (doors, elevators) and are only
//!   meant to run between frames.

pub mod format;

use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use bincode::{Decode, Encode};
use glam::IVec2;
use tracing::info;

use crate::{
    fixed::{Angle, Fixed, FxVec2},
    world::texture::TextureId,
};

pub use format::{MapError, read_map, write_map};

/// Floor and ceiling height reported for cells outside the grid.
pub const SKY_HEIGHT: Fixed = Fixed::from_int(1 << 16);

/// The four textured surfaces of a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Surface {
    Floor = 0,
    Ceiling = 1,
    /// Wall exposed below this cell's floor when seen from a lower cell.
    LowerWall = 2,
    /// Wall exposed above this cell's ceiling when seen from a higher cell.
    UpperWall = 3,
}

impl Surface {
    pub const ALL: [Surface; 4] = [
        Surface::Floor,
        Surface::Ceiling,
        Surface::LowerWall,
        Surface::UpperWall,
    ];
}

/// Snapshot of one cell's attributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellInfo {
    pub floor: Fixed,
    pub ceil: Fixed,
    pub tex: [TextureId; 4],
}

impl CellInfo {
    /// A cell whose floor meets or passes its ceiling blocks every ray.
    #[inline(always)]
    pub fn is_closed(&self) -> bool {
        self.floor >= self.ceil
    }

    #[inline(always)]
    pub fn tex(&self, s: Surface) -> TextureId {
        self.tex[s as usize]
    }
}

/// Map-placed entity, stored as a fixed 26-byte record.
///
/// Positions are raw [`Fixed`] values, `angle` is in [`Angle`] units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Encode, Decode)]
pub struct MapEntity {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub angle: u16,
    pub kind: u16,
    pub flags: u16,
    pub extra: [u16; 4],
}

impl MapEntity {
    /// Size of one record on disk.
    pub const RECORD_SIZE: usize = 26;

    pub fn pos(&self) -> FxVec2 {
        FxVec2::new(Fixed::from_raw(self.x), Fixed::from_raw(self.y))
    }
    pub fn z(&self) -> Fixed {
        Fixed::from_raw(self.z)
    }
    pub fn angle(&self) -> Angle {
        Angle::from_units(self.angle as i32)
    }
}

/*───────────────────────────────────────────────────────────────────────*/
/*                                GridMap                                */
/*───────────────────────────────────────────────────────────────────────*/

#[derive(Clone, Debug, PartialEq)]
pub struct GridMap {
    width: usize,
    height: usize,
    floor: Vec<Fixed>,
    ceil: Vec<Fixed>,
    tex: [Vec<TextureId>; 4],
    sky: TextureId,
    entities: Vec<MapEntity>,
}

impl GridMap {
    /// `width × height` grid where every cell has the same heights and
    /// textures.
    pub fn new(
        width: usize,
        height: usize,
        floor: Fixed,
        ceil: Fixed,
        tex: [TextureId; 4],
        sky: TextureId,
    ) -> Self {
        let n = width * height;
        Self {
            width,
            height,
            floor: vec![floor; n],
            ceil: vec![ceil; n],
            tex: tex.map(|t| vec![t; n]),
            sky,
            entities: Vec::new(),
        }
    }

    /// Assemble from decoded arrays; every array must hold `width * height`
    /// entries.
    pub(crate) fn from_parts(
        width: usize,
        height: usize,
        floor: Vec<Fixed>,
        ceil: Vec<Fixed>,
        tex: [Vec<TextureId>; 4],
        sky: TextureId,
        entities: Vec<MapEntity>,
    ) -> Self {
        debug_assert!(floor.len() == width * height && ceil.len() == width * height);
        debug_assert!(tex.iter().all(|t| t.len() == width * height));
        Self {
            width,
            height,
            floor,
            ceil,
            tex,
            sky,
            entities,
        }
    }

    /*──────────────────────── dimensions ────────────────────────────*/

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }
    /// Texture id that marks sky surfaces.
    #[inline]
    pub fn sky(&self) -> TextureId {
        self.sky
    }
    /// Change which texture id marks sky.  Cells are not rewritten.
    pub fn set_sky(&mut self, sky: TextureId) {
        self.sky = sky;
    }

    #[inline(always)]
    pub fn contains(&self, cell: IVec2) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as usize) < self.width && (cell.y as usize) < self.height
    }

    /// Grid cell containing world position `pos`.
    #[inline(always)]
    pub fn cell_of(&self, pos: FxVec2) -> IVec2 {
        pos.cell()
    }

    #[inline(always)]
    fn index(&self, cell: IVec2) -> Option<usize> {
        self.contains(cell)
            .then(|| cell.y as usize * self.width + cell.x as usize)
    }

    /*──────────────────────── accessors ─────────────────────────────*/

    #[inline]
    pub fn floor(&self, cell: IVec2) -> Fixed {
        self.index(cell).map_or(SKY_HEIGHT, |i| self.floor[i])
    }

    #[inline]
    pub fn ceiling(&self, cell: IVec2) -> Fixed {
        self.index(cell).map_or(SKY_HEIGHT, |i| self.ceil[i])
    }

    #[inline]
    pub fn texture(&self, cell: IVec2, s: Surface) -> TextureId {
        self.index(cell).map_or(self.sky, |i| self.tex[s as usize][i])
    }

    /// All attributes of `cell` in one read.
    #[inline]
    pub fn cell(&self, cell: IVec2) -> CellInfo {
        match self.index(cell) {
            Some(i) => CellInfo {
                floor: self.floor[i],
                ceil: self.ceil[i],
                tex: [self.tex[0][i], self.tex[1][i], self.tex[2][i], self.tex[3][i]],
            },
            None => CellInfo {
                floor: SKY_HEIGHT,
                ceil: SKY_HEIGHT,
                tex: [self.sky; 4],
            },
        }
    }

    pub fn entities(&self) -> &[MapEntity] {
        &self.entities
    }

    pub fn push_entity(&mut self, e: MapEntity) {
        self.entities.push(e);
    }

    /*──────────────────────── mutators ──────────────────────────────*/
    // Each returns `false` (and changes nothing) outside the grid.

    pub fn set_floor(&mut self, cell: IVec2, h: Fixed) -> bool {
        self.index(cell).map(|i| self.floor[i] = h).is_some()
    }

    pub fn set_ceiling(&mut self, cell: IVec2, h: Fixed) -> bool {
        self.index(cell).map(|i| self.ceil[i] = h).is_some()
    }

    pub fn set_texture(&mut self, cell: IVec2, s: Surface, id: TextureId) -> bool {
        self.index(cell)
            .map(|i| self.tex[s as usize][i] = id)
            .is_some()
    }

    /// Raise/lower the floor by `delta`, never above the ceiling.
    /// Returns the new floor height, or `None` outside the grid.
    pub fn move_floor(&mut self, cell: IVec2, delta: Fixed) -> Option<Fixed> {
        let i = self.index(cell)?;
        let h = self.floor[i].saturating_add(delta).min(self.ceil[i]);
        self.floor[i] = h;
        Some(h)
    }

    /// Raise/lower the ceiling by `delta`, never below the floor.
    pub fn move_ceiling(&mut self, cell: IVec2, delta: Fixed) -> Option<Fixed> {
        let i = self.index(cell)?;
        let h = self.ceil[i].saturating_add(delta).max(self.floor[i]);
        self.ceil[i] = h;
        Some(h)
    }

    /*──────────────────────── raw arrays (serialisation) ────────────*/

    pub(crate) fn floors(&self) -> &[Fixed] {
        &self.floor
    }
    pub(crate) fn ceilings(&self) -> &[Fixed] {
        &self.ceil
    }
    pub(crate) fn textures(&self, s: Surface) -> &[TextureId] {
        &self.tex[s as usize]
    }

    /*──────────────────────── file helpers ──────────────────────────*/

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MapError> {
        let path = path.as_ref();
        let map = read_map(&mut BufReader::new(File::open(path)?))?;
        info!(
            path = %path.display(),
            width = map.width,
            height = map.height,
            entities = map.entities.len(),
            "map loaded"
        );
        Ok(map)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), MapError> {
        let path = path.as_ref();
        let mut out = BufWriter::new(File::create(path)?);
        write_map(self, &mut out)?;
        std::io::Write::flush(&mut out)?;
        info!(path = %path.display(), "map saved");
        Ok(())
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;

    fn fx(v: i32) -> Fixed {
        Fixed::from_int(v)
    }

    fn room() -> GridMap {
        GridMap::new(4, 3, fx(0), fx(2), [1, 2, 3, 4], 9)
    }

    #[test]
    fn reads_inside_and_sentinel_outside() {
        let map = room();
        let c = map.cell(IVec2::new(3, 2));
        assert_eq!((c.floor, c.ceil), (fx(0), fx(2)));
        assert_eq!(c.tex(Surface::LowerWall), 3);
        assert!(!c.is_closed());

        for out in [IVec2::new(-1, 0), IVec2::new(4, 0), IVec2::new(0, 3)] {
            let s = map.cell(out);
            assert!(s.is_closed());
            assert_eq!(s.floor, SKY_HEIGHT);
            assert_eq!(s.tex, [9; 4]);
            assert_eq!(map.texture(out, Surface::Floor), 9);
        }
    }

    #[test]
    fn sky_id_drives_the_outside_sentinel() {
        let mut map = room();
        map.set_sky(12);
        assert_eq!(map.sky(), 12);
        assert_eq!(map.cell(IVec2::new(-1, -1)).tex, [12; 4]);
        // cells inside keep whatever ids they were given
        assert_eq!(map.texture(IVec2::new(0, 0), Surface::Floor), 1);
    }

    #[test]
    fn mutators_bounds_checked() {
        let mut map = room();
        assert!(map.set_floor(IVec2::new(1, 1), fx(1)));
        assert!(!map.set_floor(IVec2::new(9, 9), fx(1)));
        assert!(map.set_texture(IVec2::new(0, 0), Surface::UpperWall, 7));
        assert_eq!(map.texture(IVec2::new(0, 0), Surface::UpperWall), 7);
        assert_eq!(map.floor(IVec2::new(1, 1)), fx(1));
        assert_eq!(map.floor(IVec2::new(1, 0)), fx(0));
    }

    #[test]
    fn moving_heights_never_inverts_cell() {
        let mut map = room();
        let c = IVec2::new(2, 1);
        assert_eq!(map.move_floor(c, fx(5)), Some(fx(2)));
        assert!(map.cell(c).is_closed());
        assert_eq!(map.move_ceiling(c, fx(-3)), Some(fx(2)));
        assert_eq!(map.move_floor(c, fx(-1)), Some(fx(1)));
        assert_eq!(map.move_floor(IVec2::new(-1, 0), fx(1)), None);
    }

    #[test]
    fn cell_of_floors_negative_positions() {
        let map = room();
        let p = FxVec2::new(Fixed::from_raw(-1), fx(1) + Fixed::HALF);
        assert_eq!(map.cell_of(p), IVec2::new(-1, 1));
        assert!(!map.contains(map.cell_of(p)));
    }
}
