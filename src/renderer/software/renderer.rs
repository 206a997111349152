use std::ops::Range;

use tracing::{debug, trace};

use crate::{
    config::RenderConfig,
    engine::{
        HitList, Resolver, cast,
        types::{HP_BITS, PixelInfo, Side, View},
    },
    fixed::{Angle, FRAC_BITS, Fixed, FxVec2},
    map::GridMap,
    renderer::Framebuffer,
    world::{
        camera::Camera,
        texture::{ShadeProvider, Texture, TextureId, TextureProvider},
    },
};

use super::{
    Paint,
    column::{ColumnSink, WallSlice, composite},
    depth::{Bound, DepthRecords},
    planes::{PlaneMap, draw_span},
    projection::{ProjectedSprite, SpriteDesc, SpriteFlags, SpriteKind, project},
    sky::{self, SkyAngles},
    sprites,
};

/// Work counters for one frame, returned by [`Frame::end`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub columns: u32,
    pub hits: u32,
    /// Wall strips painted.
    pub walls: u32,
    /// Floor, ceiling and sky fragments deferred to planes.
    pub plane_fragments: u32,
    pub planes: u32,
    pub spans: u32,
    pub sprites_submitted: u32,
    pub sprites_queued: u32,
    pub order_comparisons: u32,
    pub order_restarts: u32,
}

/*───────────────────────────────────────────────────────────────────────*/
/*                              Backend                                 */
/*───────────────────────────────────────────────────────────────────────*/

/// Software grid renderer.  Owns the frame-buffer and every per-frame
/// pool; pools are reset, never freed, between frames.
pub struct Software {
    cfg: RenderConfig,
    fb: Framebuffer,
    planes: PlaneMap,
    depth: DepthRecords,
    sprites: Vec<ProjectedSprite>,
    hits: HitList,
    resolver: Resolver,
    sky_angles: SkyAngles,
    /// Drawn wherever a texture id is unknown to the provider.
    fallback: Texture,
    stats: FrameStats,
}

impl Software {
    pub fn new(cfg: RenderConfig) -> Self {
        Self {
            fb: Framebuffer::new(cfg.width, cfg.height),
            planes: PlaneMap::new(cfg.plane_height_shift),
            depth: DepthRecords::default(),
            sprites: Vec::new(),
            hits: HitList::new(),
            resolver: Resolver::new(),
            sky_angles: SkyAngles::default(),
            fallback: Texture::default(),
            stats: FrameStats::default(),
            cfg,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.cfg
    }

    /// Output of the last finished frame.
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.fb
    }

    /// Start a frame seen through `camera`.  Everything drawn through the
    /// returned [`Frame`] lands in this renderer's frame-buffer once
    /// [`Frame::end`] has run.
    pub fn begin<'a>(
        &'a mut self,
        camera: &Camera,
        textures: &'a dyn TextureProvider,
        shades: &'a dyn ShadeProvider,
    ) -> Frame<'a> {
        let view = View::new(camera, self.cfg.width, self.cfg.height);

        self.fb.clear(0);
        self.planes.clear();
        self.depth.reset(self.cfg.width, self.cfg.height);
        self.sprites.clear();
        self.stats = FrameStats::default();
        self.sky_angles.update(&view);

        Frame {
            sw: self,
            view,
            textures,
            shades,
            ended: false,
        }
    }
}

/*───────────────────────────────────────────────────────────────────────*/
/*                               Frame                                  */
/*───────────────────────────────────────────────────────────────────────*/

/// One frame in progress.  Must be finished with [`Frame::end`].
pub struct Frame<'a> {
    sw: &'a mut Software,
    view: View,
    textures: &'a dyn TextureProvider,
    shades: &'a dyn ShadeProvider,
    ended: bool,
}

impl Frame<'_> {
    pub fn view(&self) -> &View {
        &self.view
    }

    /// Counters so far.
    pub fn stats(&self) -> FrameStats {
        self.sw.stats
    }

    /// Cast every column through `map`, paint walls and flats, and record
    /// the occluders sprites are clipped against.
    pub fn draw_map(&mut self, map: &GridMap) {
        let sw = &mut *self.sw;
        let view = &self.view;
        let textures = self.textures;
        let paint = Paint {
            shade: &sw.cfg.shade,
            shades: self.shades,
            texels_per_unit_shift: sw.cfg.texels_per_unit_shift,
        };

        sw.planes.clear();
        let start = map.cell(map.cell_of(view.origin));

        // ─── 1. columns: walls now, flats deferred ───
        let mut sink = FrameSink {
            fb: &mut sw.fb,
            planes: &mut sw.planes,
            depth: &mut sw.depth,
            stats: &mut sw.stats,
            view,
            paint,
            textures,
            fallback: &sw.fallback,
            sky: map.sky(),
        };
        for x in 0..view.width {
            cast(map, &view.ray(x), sw.cfg.max_steps, &mut sw.hits);
            sink.depth.begin_column(x as usize);
            sink.stats.columns += 1;
            sink.stats.hits += sw.hits.len() as u32;
            composite(view, x, start, &sw.hits, map.sky(), &mut sink);
        }

        // ─── 2. planes: spans for flats, angle-indexed columns for sky ───
        let screen_h = view.height.max(0) as usize;
        let sky_table = self.shades.shade_table(0);
        for id in 0..sw.planes.len() {
            let plane = &sw.planes.planes()[id];
            let (height, tex_id, is_sky) = (plane.height, plane.tex, plane.sky);
            let tex = textures.texture(tex_id).unwrap_or(&sw.fallback);
            sw.stats.planes += 1;

            if is_sky {
                for (x, rows) in plane.columns() {
                    let angle = sw.sky_angles.column_angle(view, x);
                    sky::draw_column(&mut sw.fb, view, tex, sky_table, angle, x, rows);
                }
                continue;
            }
            let fb = &mut sw.fb;
            let spans = &mut sw.stats.spans;
            sw.planes.make_spans(id, screen_h, |y, x0, x1| {
                draw_span(fb, view, paint, tex, height, y, x0, x1);
                *spans += 1;
            });
        }
    }

    /// Queue a sprite.  Sprites with an unknown texture or no visible
    /// area are dropped here.
    pub fn draw_sprite(
        &mut self,
        pos: FxVec2,
        z: Fixed,
        angle: Angle,
        tex: TextureId,
        flags: SpriteFlags,
    ) {
        let sw = &mut *self.sw;
        sw.stats.sprites_submitted += 1;

        let Some(texture) = self.textures.texture(tex) else {
            return;
        };
        let desc = SpriteDesc {
            pos,
            z,
            angle,
            tex,
            flags,
        };
        let Some(sprite) = project(&self.view, &desc, texture, sw.cfg.texels_per_unit_shift)
        else {
            return;
        };
        if sw.sprites.len() == sw.sprites.capacity() {
            trace!(len = sw.sprites.len(), "sprite queue grows");
        }
        sw.sprites.push(sprite);
        sw.stats.sprites_queued += 1;
    }

    /// Draw the queued sprites back to front and finish the frame.
    ///
    /// Floor-aligned sprites lie on the surfaces upright ones stand on, so
    /// they form their own earlier pass.
    pub fn end(mut self) -> FrameStats {
        let sw = &mut *self.sw;
        let view = &self.view;
        let textures = self.textures;
        let paint = Paint {
            shade: &sw.cfg.shade,
            shades: self.shades,
            texels_per_unit_shift: sw.cfg.texels_per_unit_shift,
        };

        // stable: submission order survives inside each pass
        sw.sprites.sort_by_key(|s| s.kind() != SpriteKind::Floor);
        let split = sw.sprites.partition_point(|s| s.kind() == SpriteKind::Floor);
        let (flats, uprights) = sw.sprites.split_at(split);

        for pass in [flats, uprights] {
            let fb = &mut sw.fb;
            let depth = &sw.depth;
            let fallback = &sw.fallback;
            let r = sw.resolver.resolve(pass, view.origin, |i| {
                let s = &pass[i];
                let tex = textures.texture(s.tex).unwrap_or(fallback);
                sprites::draw(fb, view, depth, paint, s, tex);
            });
            sw.stats.order_comparisons += r.comparisons;
            sw.stats.order_restarts += r.restarts;
        }

        let stats = sw.stats;
        debug!(
            columns = stats.columns,
            hits = stats.hits,
            walls = stats.walls,
            planes = stats.planes,
            spans = stats.spans,
            sprites = stats.sprites_queued,
            comparisons = stats.order_comparisons,
            "frame done"
        );
        self.ended = true;
        stats
    }
}

impl Drop for Frame<'_> {
    fn drop(&mut self) {
        debug_assert!(
            self.ended || std::thread::panicking(),
            "Frame dropped without end()"
        );
    }
}

/*──────────────────────── compositor output ──────────────────────────*/

/// Routes compositor output into the frame: walls to the frame-buffer,
/// flats and sky to the plane map, occluders to the depth records.
struct FrameSink<'a> {
    fb: &'a mut Framebuffer,
    planes: &'a mut PlaneMap,
    depth: &'a mut DepthRecords,
    stats: &'a mut FrameStats,
    view: &'a View,
    paint: Paint<'a>,
    textures: &'a dyn TextureProvider,
    fallback: &'a Texture,
    sky: TextureId,
}

impl ColumnSink for FrameSink<'_> {
    fn wall(&mut self, px: PixelInfo, rows: Range<i32>, wall: WallSlice) {
        self.stats.walls += 1;
        let tex = self.textures.texture(wall.tex).unwrap_or(self.fallback);
        let tpu = self.paint.texels_per_unit_shift;
        let table = self.paint.table(px.depth, wall.side == Side::Y);

        let u = (wall.tex_u.raw() << tpu) >> FRAC_BITS;
        let v_shift = FRAC_BITS + HP_BITS - tpu;
        let step = self.view.row_step_hp(px.depth);
        // world height under the row centre, HP scale; v grows downwards
        let mut z = self.view.height_at_hp(rows.start, step);
        for y in rows {
            let v = (-z >> v_shift) as i32;
            self.fb.put(px.x as usize, y as usize, table[tex.texel(u, v) as usize]);
            z -= step;
        }
    }

    fn flat(&mut self, x: i32, rows: Range<i32>, height: Fixed, tex: TextureId) {
        self.stats.plane_fragments += 1;
        self.planes.add(height, tex, false, x, rows);
    }

    fn sky(&mut self, x: i32, rows: Range<i32>) {
        self.stats.plane_fragments += 1;
        self.planes.add(Fixed::ZERO, self.sky, true, x, rows);
    }

    fn occluder(&mut self, px: PixelInfo, bound: Bound, limit: i32) {
        self.depth.push(px.x as usize, bound, px.depth, limit);
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::texture::TextureBank;
    use glam::IVec2;

    /* tiny helpers ---------------------------------------------------*/
    const FLOOR: u8 = 10;
    const CEIL: u8 = 20;
    const WALL: u8 = 30;
    const SKY: u8 = 40;
    const THING: u8 = 50;
    const RUG: u8 = 60;

    /// Ids 1..=6 hold solid textures in the colours above; the default
    /// colormap is the identity, so frame-buffer values are texel values.
    fn bank() -> TextureBank {
        let mut b = TextureBank::default_with_checker();
        for (name, c) in [("FLOOR", FLOOR), ("CEIL", CEIL), ("WALL", WALL), ("SKY", SKY), ("THING", THING)] {
            b.insert(name, Texture::solid(name, 64, 64, c)).unwrap();
        }
        b.insert("RUG", Texture::solid("RUG", 128, 128, RUG)).unwrap();
        b
    }

    fn fx(v: i32) -> Fixed {
        Fixed::from_int(v)
    }

    fn cfg() -> RenderConfig {
        RenderConfig {
            width: 64,
            height: 48,
            ..RenderConfig::default()
        }
    }

    fn camera(x: Fixed, y: Fixed, z: Fixed) -> Camera {
        Camera::new(FxVec2::new(x, y), z, Angle::ZERO, Angle::from_degrees(90))
    }

    fn centre(v: i32) -> Fixed {
        fx(v) + Fixed::HALF
    }

    /// `w × h` room, floor 0, ceiling 2, closed border.
    fn room(w: usize, h: usize) -> GridMap {
        let mut map = GridMap::new(w, h, fx(0), fx(2), [1, 2, 3, 3], 4);
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                if x == 0 || y == 0 || x == w as i32 - 1 || y == h as i32 - 1 {
                    map.set_floor(IVec2::new(x, y), fx(2));
                }
            }
        }
        map
    }

    fn count(fb: &Framebuffer, value: u8) -> usize {
        fb.pixels().iter().filter(|&&p| p == value).count()
    }

    #[test]
    fn enclosed_cell_is_wall_only() {
        let bank = bank();
        let mut map = GridMap::new(3, 3, fx(1), fx(1), [1, 2, 3, 3], 4);
        map.set_floor(IVec2::new(1, 1), fx(0));
        let mut sw = Software::new(cfg());

        let mut frame = sw.begin(&camera(centre(1), centre(1), Fixed::HALF), &bank, &bank);
        frame.draw_map(&map);
        let stats = frame.end();

        assert_eq!(stats.columns, 64);
        assert_eq!(stats.walls, 64);
        assert_eq!(stats.plane_fragments, 0);
        assert_eq!(stats.planes, 0);
        assert_eq!(count(sw.framebuffer(), WALL), 64 * 48);
    }

    #[test]
    fn no_hits_gives_horizon_fragments_only() {
        let bank = bank();
        let map = GridMap::new(4, 4, fx(0), fx(2), [4, 4, 3, 3], 4);
        let mut sw = Software::new(RenderConfig {
            max_steps: 0,
            ..cfg()
        });

        let mut frame = sw.begin(&camera(fx(2), fx(2), fx(1)), &bank, &bank);
        frame.draw_map(&map);
        let stats = frame.end();

        assert_eq!(stats.hits, 0);
        assert_eq!(stats.walls, 0);
        assert_eq!(stats.plane_fragments, 2 * 64);
        assert_eq!(count(sw.framebuffer(), SKY), 64 * 48);
    }

    #[test]
    fn open_room_paints_every_surface() {
        let bank = bank();
        let map = room(8, 8);
        let mut sw = Software::new(cfg());

        let mut frame = sw.begin(&camera(centre(2), centre(3), fx(1)), &bank, &bank);
        frame.draw_map(&map);
        let stats = frame.end();

        let fb = sw.framebuffer();
        assert_eq!(count(fb, 0), 0, "every pixel painted");
        assert!(count(fb, FLOOR) > 0 && count(fb, CEIL) > 0 && count(fb, WALL) > 0);
        assert!(stats.spans > 0 && stats.planes >= 2);
        // the far wall is at least one cell away: floor below, ceiling above
        assert_eq!(fb.get(32, 47), FLOOR);
        assert_eq!(fb.get(32, 0), CEIL);
        assert_eq!(fb.get(32, 24), WALL);
    }

    #[test]
    fn frames_are_repeatable() {
        let bank = bank();
        let map = room(8, 8);
        let mut sw = Software::new(cfg());
        let cam = camera(centre(3), centre(2), fx(1));

        let mut frame = sw.begin(&cam, &bank, &bank);
        frame.draw_map(&map);
        frame.draw_sprite(FxVec2::new(fx(5), centre(2)), fx(0), Angle::ZERO, 5, SpriteFlags::empty());
        let first_stats = frame.end();
        let first = sw.framebuffer().clone();

        let mut frame = sw.begin(&cam, &bank, &bank);
        frame.draw_map(&map);
        frame.draw_sprite(FxVec2::new(fx(5), centre(2)), fx(0), Angle::ZERO, 5, SpriteFlags::empty());
        let second_stats = frame.end();

        assert_eq!(&first, sw.framebuffer());
        assert_eq!(first_stats, second_stats);
    }

    #[test]
    fn wall_hides_sprite_behind_it() {
        let bank = bank();
        let mut map = room(8, 4);
        let thing = FxVec2::new(centre(5), centre(1));
        let cam = camera(centre(1), centre(1), fx(1));
        let mut sw = Software::new(cfg());

        let mut frame = sw.begin(&cam, &bank, &bank);
        frame.draw_map(&map);
        frame.draw_sprite(thing, fx(0), Angle::ZERO, 5, SpriteFlags::empty());
        frame.end();
        assert!(count(sw.framebuffer(), THING) > 0);

        // a full-height pillar between camera and sprite
        map.set_floor(IVec2::new(3, 1), fx(2));
        let mut frame = sw.begin(&cam, &bank, &bank);
        frame.draw_map(&map);
        frame.draw_sprite(thing, fx(0), Angle::ZERO, 5, SpriteFlags::empty());
        let stats = frame.end();
        assert_eq!(stats.sprites_queued, 1);
        assert_eq!(count(sw.framebuffer(), THING), 0);
    }

    #[test]
    fn disjoint_sprites_need_no_comparisons() {
        let bank = bank();
        let map = room(12, 12);
        let mut sw = Software::new(cfg());

        let mut frame = sw.begin(&camera(centre(1), centre(5), fx(1)), &bank, &bank);
        frame.draw_map(&map);
        // far left and far right of the view, one unit wide each
        frame.draw_sprite(FxVec2::new(centre(6), fx(2)), fx(0), Angle::ZERO, 5, SpriteFlags::empty());
        frame.draw_sprite(FxVec2::new(centre(6), fx(9)), fx(0), Angle::ZERO, 5, SpriteFlags::empty());
        let stats = frame.end();

        assert_eq!(stats.sprites_submitted, 2);
        assert_eq!(stats.sprites_queued, 2);
        assert_eq!(stats.order_comparisons, 0);
    }

    #[test]
    fn unknown_or_invisible_sprites_are_dropped() {
        let bank = bank();
        let map = room(8, 8);
        let mut sw = Software::new(cfg());

        let mut frame = sw.begin(&camera(centre(3), centre(3), fx(1)), &bank, &bank);
        frame.draw_map(&map);
        frame.draw_sprite(FxVec2::new(fx(5), fx(3)), fx(0), Angle::ZERO, 999, SpriteFlags::empty());
        // behind the camera
        frame.draw_sprite(FxVec2::new(fx(1), fx(3)), fx(0), Angle::ZERO, 5, SpriteFlags::empty());
        let stats = frame.end();

        assert_eq!(stats.sprites_submitted, 2);
        assert_eq!(stats.sprites_queued, 0);
    }

    #[test]
    fn upright_sprites_draw_over_floor_sprites() {
        let bank = bank();
        let map = room(8, 4);
        let cam = camera(centre(1), centre(1), fx(1));
        let spot = FxVec2::new(fx(4), centre(1));
        let mut sw = Software::new(cfg());

        // submitted upright first: floor sprites still go underneath
        let mut frame = sw.begin(&cam, &bank, &bank);
        frame.draw_map(&map);
        frame.draw_sprite(spot, fx(0), Angle::ZERO, 5, SpriteFlags::empty());
        frame.draw_sprite(spot, fx(0), Angle::ZERO, 6, SpriteFlags::FLOOR);
        frame.end();
        assert_eq!(sw.framebuffer().get(32, 36), THING);
        assert!(count(sw.framebuffer(), RUG) > 0);

        let mut frame = sw.begin(&cam, &bank, &bank);
        frame.draw_map(&map);
        frame.draw_sprite(spot, fx(0), Angle::ZERO, 6, SpriteFlags::FLOOR);
        frame.end();
        assert_eq!(sw.framebuffer().get(32, 36), RUG);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "without end")]
    fn frame_must_be_ended() {
        let bank = bank();
        let mut sw = Software::new(cfg());
        let frame = sw.begin(&camera(fx(1), fx(1), fx(1)), &bank, &bank);
        drop(frame);
    }
}
