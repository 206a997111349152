//! One full frame of the demo level: columns, planes and sprites.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use yacast_rs::{
    config::RenderConfig,
    demo,
    fixed::Angle,
    renderer::{Software, software::SpriteFlags},
    world::Camera,
};

fn render_frame(c: &mut Criterion) {
    let map = demo::map();
    let bank = demo::textures().unwrap();
    let cfg = RenderConfig::default();
    let (pos, angle) = demo::player_start(&map);
    let camera = Camera::new(
        pos,
        map.floor(map.cell_of(pos)) + demo::EYE_HEIGHT,
        angle,
        Angle::from_degrees(cfg.fov_degrees),
    );
    let mut sw = Software::new(cfg);

    c.bench_function("demo frame 320x200", |b| {
        b.iter(|| {
            let mut frame = sw.begin(black_box(&camera), &bank, &bank);
            frame.draw_map(&map);
            for e in map.entities() {
                if let Some(tex) = demo::sprite_texture(e.kind) {
                    let flags = SpriteFlags::from_bits_truncate(e.flags);
                    frame.draw_sprite(e.pos(), e.z(), e.angle(), tex, flags);
                }
            }
            black_box(frame.end())
        })
    });
}

criterion_group!(benches, render_frame);
criterion_main!(benches);
