use flurry::config::Variant;
use flurry::emitter::{SpawnParams, Vec3};
use flurry::flake::SnowflakeBlueprint;
use flurry::scene::ParticleScene;
use flurry::spectrum::Band;

fn seeded_scene(variant: Variant, w: usize, h: usize) -> (ParticleScene, fastrand::Rng) {
    let mut rng = fastrand::Rng::with_seed(101);
    let mut scene = ParticleScene::new(variant, variant.particle_cap(), w, h);
    let bp = SnowflakeBlueprint::generate(&mut rng, variant);
    let params = SpawnParams {
        band: Band::Mid,
        intensity: 0.8,
        origin: Vec3 {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        },
        time_s: 0.0,
    };
    scene.spawn(&bp, &params, &mut rng);
    assert!(!scene.is_empty(), "seed spawn produced no particles");
    (scene, rng)
}

fn has_non_black(buf: &[u8]) -> bool {
    buf.chunks_exact(4)
        .any(|px| px[0] != 0 || px[1] != 0 || px[2] != 0)
}

#[test]
fn life_strictly_decreases_every_unfrozen_frame() {
    let (mut scene, _rng) = seeded_scene(Variant::Classic, 64, 64);
    let before: Vec<f32> = scene.particles().iter().map(|p| p.life).collect();
    let decays: Vec<f32> = scene.particles().iter().map(|p| p.decay).collect();

    scene.update(0.0, false);

    for (i, p) in scene.particles().iter().enumerate() {
        assert!(
            p.life <= before[i] - decays[i] + 1e-6,
            "life {} did not drop by at least decay {}",
            p.life,
            decays[i]
        );
    }
}

#[test]
fn loud_frames_fade_particles_faster() {
    let (mut quiet, _r1) = seeded_scene(Variant::Classic, 64, 64);
    let (mut loud, _r2) = seeded_scene(Variant::Classic, 64, 64);

    quiet.update(0.0, false);
    loud.update(255.0, false);

    let avg = |s: &ParticleScene| {
        s.particles().iter().map(|p| p.life).sum::<f32>() / s.len().max(1) as f32
    };
    assert!(
        avg(&loud) < avg(&quiet),
        "energy bonus should accelerate decay"
    );
}

#[test]
fn no_particle_is_immortal() {
    let (mut scene, _rng) = seeded_scene(Variant::Neon, 64, 64);
    // Max life 1.0 at min decay 0.008 dies within 125 frames.
    for _ in 0..200 {
        scene.update(0.0, false);
    }
    assert!(scene.is_empty(), "{} particles survived", scene.len());
}

#[test]
fn freeze_halts_all_mutation() {
    let (mut scene, _rng) = seeded_scene(Variant::Neon, 64, 64);
    let before: Vec<(f32, f32, f32, f32)> = scene
        .particles()
        .iter()
        .map(|p| (p.pos.x, p.pos.y, p.pos.z, p.life))
        .collect();

    for _ in 0..30 {
        scene.update(200.0, true);
    }

    let after: Vec<(f32, f32, f32, f32)> = scene
        .particles()
        .iter()
        .map(|p| (p.pos.x, p.pos.y, p.pos.z, p.life))
        .collect();
    assert_eq!(before, after, "frozen particles must not move or age");
}

#[test]
fn rendering_continues_while_frozen() {
    let (mut scene, mut rng) = seeded_scene(Variant::Neon, 64, 64);
    scene.update(0.0, true);
    scene.render(0.1, (0.0, 0.0), &mut rng);
    assert!(
        has_non_black(scene.pixels()),
        "frozen scene should still composite particles"
    );
}

#[test]
fn trail_fades_to_black_without_particles() {
    let (mut scene, mut rng) = seeded_scene(Variant::Classic, 48, 48);
    scene.render(0.0, (0.0, 0.0), &mut rng);
    assert!(has_non_black(scene.pixels()), "initial frame should draw");

    // Let everything die, then fade the empty canvas.
    for _ in 0..200 {
        scene.update(0.0, false);
    }
    assert!(scene.is_empty());
    for i in 0..120 {
        scene.render(i as f32 / 60.0, (0.0, 0.0), &mut rng);
    }
    assert!(
        !has_non_black(scene.pixels()),
        "trails should decay to black after particles die"
    );
}

#[test]
fn pan_offset_shifts_the_composite() {
    let (mut scene, mut rng) = seeded_scene(Variant::Neon, 96, 96);
    scene.render(0.0, (0.0, 0.0), &mut rng);
    let centered = scene.pixels().to_vec();

    let (mut scene2, mut rng2) = seeded_scene(Variant::Neon, 96, 96);
    scene2.render(0.0, (30.0, 0.0), &mut rng2);
    let panned = scene2.pixels().to_vec();

    assert!(has_non_black(&centered) && has_non_black(&panned));
    assert_ne!(centered, panned, "pan offset should move the draw origin");
}

#[test]
fn resize_clears_the_canvas() {
    let (mut scene, mut rng) = seeded_scene(Variant::Classic, 64, 64);
    scene.render(0.0, (0.0, 0.0), &mut rng);
    scene.resize(32, 80);
    assert_eq!(scene.pixels().len(), 32 * 80 * 4);
    assert!(!has_non_black(scene.pixels()));
}
