//! # Grid map file format
//!
//! Little-endian throughout:
//!
//! ```text
//! magic     "GMAP"
//! version   u16            (= 1)
//! sky       u16            texture id marking sky surfaces
//! width     u16
//! height    u16
//! entities  u32            number of entity records
//! floor     i32 × w·h      raw fixed-point heights
//! ceiling   i32 × w·h
//! textures  u16 × w·h × 4  floor, ceiling, lower wall, upper wall
//! entity    26 bytes × n   see [`MapEntity`]
//! ```
//!
//! The reader/writer work on any `Read`/`Write`; files are just one
//! backend (see [`GridMap::load`]).

use bincode::{config, decode_from_std_read, encode_into_std_write};
use byteorder::{LittleEndian as LE, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};
use thiserror::Error;

use crate::{
    fixed::Fixed,
    map::{GridMap, MapEntity, Surface},
    world::texture::TextureId,
};

pub const MAGIC: &[u8; 4] = b"GMAP";
pub const VERSION: u16 = 1;

/// Loader / writer errors.
#[derive(Error, Debug)]
pub enum MapError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("not a grid map file")]
    BadMagic,

    #[error("unsupported map version {0}")]
    UnsupportedVersion(u16),

    #[error("bad map dimensions {width}x{height}")]
    BadDimensions { width: usize, height: usize },

    #[error("entity record {index}: {source}")]
    BadEntity {
        index: usize,
        source: bincode::error::DecodeError,
    },

    #[error("entity record {index} could not be written: {source}")]
    EntityWrite {
        index: usize,
        source: bincode::error::EncodeError,
    },
}

#[inline]
fn record_config() -> impl config::Config {
    config::standard()
        .with_fixed_int_encoding()
        .with_little_endian()
}

/*──────────────────────────────── read ────────────────────────────────*/

pub fn read_map<R: Read>(r: &mut R) -> Result<GridMap, MapError> {
    // ─── 1. header ───
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(MapError::BadMagic);
    }
    let version = r.read_u16::<LE>()?;
    if version != VERSION {
        return Err(MapError::UnsupportedVersion(version));
    }
    let sky = r.read_u16::<LE>()?;
    let width = r.read_u16::<LE>()? as usize;
    let height = r.read_u16::<LE>()? as usize;
    let n_entities = r.read_u32::<LE>()? as usize;
    if width == 0 || height == 0 {
        return Err(MapError::BadDimensions { width, height });
    }
    let cells = width * height;

    // ─── 2. per-cell arrays ───
    let floor = read_heights(r, cells)?;
    let ceil = read_heights(r, cells)?;
    let tex = [
        read_textures(r, cells)?,
        read_textures(r, cells)?,
        read_textures(r, cells)?,
        read_textures(r, cells)?,
    ];

    // ─── 3. entity records ───
    let cfg = record_config();
    let mut entities = Vec::with_capacity(n_entities.min(1 << 16));
    for index in 0..n_entities {
        let e: MapEntity = decode_from_std_read(r, cfg)
            .map_err(|source| MapError::BadEntity { index, source })?;
        entities.push(e);
    }

    Ok(GridMap::from_parts(
        width, height, floor, ceil, tex, sky, entities,
    ))
}

/// Cells decoded per read; storage only grows as payload actually arrives.
const CHUNK_CELLS: usize = 4096;

fn read_heights<R: Read>(r: &mut R, n: usize) -> io::Result<Vec<Fixed>> {
    let mut out = Vec::with_capacity(n.min(CHUNK_CELLS));
    let mut buf = [0i32; CHUNK_CELLS];
    while out.len() < n {
        let chunk = &mut buf[..(n - out.len()).min(CHUNK_CELLS)];
        r.read_i32_into::<LE>(chunk)?;
        out.extend(chunk.iter().copied().map(Fixed::from_raw));
    }
    Ok(out)
}

fn read_textures<R: Read>(r: &mut R, n: usize) -> io::Result<Vec<TextureId>> {
    let mut out = Vec::with_capacity(n.min(CHUNK_CELLS));
    let mut buf = [0u16; CHUNK_CELLS];
    while out.len() < n {
        let chunk = &mut buf[..(n - out.len()).min(CHUNK_CELLS)];
        r.read_u16_into::<LE>(chunk)?;
        out.extend_from_slice(chunk);
    }
    Ok(out)
}

/*──────────────────────────────── write ───────────────────────────────*/

pub fn write_map<W: Write>(map: &GridMap, w: &mut W) -> Result<(), MapError> {
    let (width, height) = (map.width(), map.height());
    if width == 0 || height == 0 || width > u16::MAX as usize || height > u16::MAX as usize {
        return Err(MapError::BadDimensions { width, height });
    }

    w.write_all(MAGIC)?;
    w.write_u16::<LE>(VERSION)?;
    w.write_u16::<LE>(map.sky())?;
    w.write_u16::<LE>(width as u16)?;
    w.write_u16::<LE>(height as u16)?;
    w.write_u32::<LE>(map.entities().len() as u32)?;

    for h in map.floors().iter().chain(map.ceilings()) {
        w.write_i32::<LE>(h.raw())?;
    }
    for s in Surface::ALL {
        for &id in map.textures(s) {
            w.write_u16::<LE>(id)?;
        }
    }

    let cfg = record_config();
    for (index, e) in map.entities().iter().enumerate() {
        encode_into_std_write(*e, w, cfg)
            .map_err(|source| MapError::EntityWrite { index, source })?;
    }
    Ok(())
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec2;
    use std::io::Cursor;

    fn sample() -> GridMap {
        let mut map = GridMap::new(3, 2, Fixed::ZERO, Fixed::from_int(2), [1, 2, 3, 4], 5);
        map.set_floor(IVec2::new(1, 0), Fixed::from_raw(-77));
        map.set_ceiling(IVec2::new(2, 1), Fixed::from_raw(4097));
        map.set_texture(IVec2::new(0, 1), Surface::UpperWall, 42);
        map.push_entity(MapEntity {
            x: 1536,
            y: -512,
            z: 0,
            angle: 1024,
            kind: 7,
            flags: 0b101,
            extra: [1, 2, 3, u16::MAX],
        });
        map.push_entity(MapEntity::default());
        map
    }

    #[test]
    fn round_trip_in_memory() {
        let map = sample();
        let mut bytes = Vec::new();
        write_map(&map, &mut bytes).unwrap();

        let header = 4 + 2 + 2 + 2 + 2 + 4;
        let cells = 3 * 2;
        assert_eq!(
            bytes.len(),
            header + cells * (4 + 4 + 4 * 2) + 2 * MapEntity::RECORD_SIZE
        );

        let back = read_map(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn round_trip_through_file() {
        let map = sample();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("room.map");
        map.save(&path).unwrap();
        assert_eq!(GridMap::load(&path).unwrap(), map);
    }

    #[test]
    fn entity_record_layout() {
        let e = MapEntity {
            x: 0x0102_0304,
            kind: 0xBEEF,
            ..MapEntity::default()
        };
        let mut out = Vec::new();
        encode_into_std_write(e, &mut out, record_config()).unwrap();
        assert_eq!(out.len(), MapEntity::RECORD_SIZE);
        assert_eq!(&out[..4], &[4, 3, 2, 1]);
        assert_eq!(&out[14..16], &[0xEF, 0xBE]);
    }

    #[test]
    fn rejects_bad_header() {
        let err = read_map(&mut Cursor::new(b"NOPE".to_vec())).unwrap_err();
        assert!(matches!(err, MapError::BadMagic));

        let mut bytes = Vec::new();
        write_map(&sample(), &mut bytes).unwrap();
        bytes[4] = 9;
        assert!(matches!(
            read_map(&mut Cursor::new(bytes)).unwrap_err(),
            MapError::UnsupportedVersion(9)
        ));
    }

    #[test]
    fn rejects_oversized_header() {
        // claims 65535 × 65535 cells but carries no payload
        let mut bytes = MAGIC.to_vec();
        for v in [VERSION, 0, u16::MAX, u16::MAX] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.extend_from_slice(&0u32.to_le_bytes());
        assert_eq!(bytes.len(), 16);
        assert!(matches!(
            read_map(&mut Cursor::new(bytes)).unwrap_err(),
            MapError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof
        ));
    }

    #[test]
    fn arrays_longer_than_one_chunk() {
        let mut map = GridMap::new(100, 50, Fixed::ZERO, Fixed::ONE, [1, 2, 3, 4], 9);
        map.set_floor(IVec2::new(99, 49), Fixed::HALF);
        map.set_texture(IVec2::new(70, 45), Surface::UpperWall, 7);
        let mut bytes = Vec::new();
        write_map(&map, &mut bytes).unwrap();
        assert_eq!(read_map(&mut Cursor::new(bytes)).unwrap(), map);
    }

    #[test]
    fn truncated_file_is_io_error() {
        let mut bytes = Vec::new();
        write_map(&sample(), &mut bytes).unwrap();
        bytes.truncate(30);
        assert!(matches!(
            read_map(&mut Cursor::new(bytes)).unwrap_err(),
            MapError::Io(_)
        ));
    }
}
