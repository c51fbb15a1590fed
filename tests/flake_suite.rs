use flurry::config::Variant;
use flurry::emitter::{burst_budget, sample_points, spawn_burst, SpawnParams, Vec3, MAX_BURST, MIN_BURST};
use flurry::flake::{SnowflakeBlueprint, TipShape};
use flurry::spectrum::Band;

fn params(intensity: f32) -> SpawnParams {
    SpawnParams {
        band: Band::Bass,
        intensity,
        origin: Vec3 {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        },
        time_s: 0.0,
    }
}

// ── Blueprint generation ────────────────────────────────────────────────────

#[test]
fn blueprints_have_valid_rib_structure() {
    let mut rng = fastrand::Rng::with_seed(7);
    for _ in 0..1000 {
        let bp = SnowflakeBlueprint::generate(&mut rng, Variant::Classic);
        assert!(
            (2..=5).contains(&bp.ribs.len()),
            "rib count out of range: {}",
            bp.ribs.len()
        );

        let mut prev = 0.2f32;
        for rib in &bp.ribs {
            assert!(
                rib.pos > prev,
                "rib positions must be strictly increasing ({} after {})",
                rib.pos,
                prev
            );
            assert!(rib.pos < 0.8, "rib pos {} escaped (0.2, 0.8)", rib.pos);
            assert!(rib.length > 0.0);
            assert!(
                rib.pos + rib.length <= 1.0 + 1e-4,
                "rib overruns the arm: pos {} len {}",
                rib.pos,
                rib.length
            );
            assert!(rib.sub_ribs <= 2);
            if rib.length <= 0.3 {
                assert_eq!(rib.sub_ribs, 0, "short ribs carry no sub-ribs");
            }
            prev = rib.pos;
        }
        assert_eq!(bp.arm_length, 1.0);
    }
}

#[test]
fn center_plate_appears_about_thirty_percent() {
    let mut rng = fastrand::Rng::with_seed(42);
    let n = 1000;
    let absent = (0..n)
        .filter(|_| SnowflakeBlueprint::generate(&mut rng, Variant::Neon).center_plate == 0.0)
        .count();
    let absent_frac = absent as f32 / n as f32;
    assert!(
        (0.65..=0.75).contains(&absent_frac),
        "expected plate absent ~70%, got {absent_frac}"
    );
}

#[test]
fn neon_variant_never_picks_star_tips() {
    let mut rng = fastrand::Rng::with_seed(3);
    for _ in 0..500 {
        let bp = SnowflakeBlueprint::generate(&mut rng, Variant::Neon);
        assert_ne!(bp.tip, TipShape::Star, "star tips are classic-only");
    }
}

#[test]
fn classic_variant_offers_all_three_tips() {
    let mut rng = fastrand::Rng::with_seed(11);
    let mut seen = [false; 3];
    for _ in 0..500 {
        match SnowflakeBlueprint::generate(&mut rng, Variant::Classic).tip {
            TipShape::Point => seen[0] = true,
            TipShape::Fork => seen[1] = true,
            TipShape::Star => seen[2] = true,
        }
    }
    assert!(seen.iter().all(|&s| s), "all tip shapes should appear: {seen:?}");
}

// ── Point sampling ──────────────────────────────────────────────────────────

#[test]
fn sampled_points_are_six_fold_symmetric_in_count() {
    let mut rng = fastrand::Rng::with_seed(5);
    for variant in [Variant::Classic, Variant::Neon] {
        let bp = SnowflakeBlueprint::generate(&mut rng, variant);
        let points = sample_points(&bp, variant, &mut rng);
        assert!(!points.is_empty());
        assert_eq!(
            points.len() % 6,
            0,
            "replication should produce a multiple of six points"
        );
    }
}

#[test]
fn fork_tip_adds_geometry_point_does_not() {
    let mut rng = fastrand::Rng::with_seed(9);
    let mut bp = SnowflakeBlueprint::generate(&mut rng, Variant::Neon);

    bp.tip = TipShape::Point;
    let plain = sample_points(&bp, Variant::Neon, &mut rng).len();
    bp.tip = TipShape::Fork;
    let forked = sample_points(&bp, Variant::Neon, &mut rng).len();
    assert!(
        forked > plain,
        "fork tip should add samples ({forked} vs {plain})"
    );
}

// ── Budget and spawning ─────────────────────────────────────────────────────

#[test]
fn burst_budget_scales_with_intensity_and_size() {
    assert_eq!(burst_budget(0.0, 1.0), MIN_BURST);
    assert_eq!(burst_budget(1.0, 1.0), MAX_BURST);
    assert!(burst_budget(0.9, 1.0) > burst_budget(0.1, 1.0));
    // sqrt scaling: quadrupling size only doubles the budget.
    let small = burst_budget(0.5, 1.0);
    let big = burst_budget(0.5, 4.0);
    assert!((big as f32 / small as f32 - 2.0).abs() < 0.1);
}

#[test]
fn live_cap_is_never_exceeded() {
    let mut rng = fastrand::Rng::with_seed(21);
    let cap = 300usize;
    let mut out = Vec::new();
    for _ in 0..50 {
        let bp = SnowflakeBlueprint::generate(&mut rng, Variant::Neon);
        spawn_burst(&mut out, &bp, &params(1.0), Variant::Neon, cap, &mut rng);
        assert!(
            out.len() <= cap,
            "live particles {} exceeded cap {}",
            out.len(),
            cap
        );
    }
    assert_eq!(out.len(), cap, "repeated bursts should saturate the cap");
}

#[test]
fn spawned_particles_have_sane_fields() {
    let mut rng = fastrand::Rng::with_seed(13);
    let bp = SnowflakeBlueprint::generate(&mut rng, Variant::Neon);
    let mut out = Vec::new();
    spawn_burst(&mut out, &bp, &params(0.8), Variant::Neon, 10_000, &mut rng);
    assert!(!out.is_empty());

    for p in &out {
        assert_eq!(p.life, 1.0, "fresh particles start at full life");
        assert!(p.decay >= 0.008 && p.decay <= 0.021, "decay {}", p.decay);
        assert!(p.size > 0.0);
        // All particles of a burst share the randomized spawn origin.
        assert_eq!((p.pos.x, p.pos.y), (0.0, 0.0));
        let shard = p.shard.as_ref().expect("neon particles carry shards");
        assert!(
            (3..=5).contains(&shard.len()),
            "shard vertex count {}",
            shard.len()
        );
    }
}

#[test]
fn classic_particles_carry_no_shards() {
    let mut rng = fastrand::Rng::with_seed(17);
    let bp = SnowflakeBlueprint::generate(&mut rng, Variant::Classic);
    let mut out = Vec::new();
    spawn_burst(&mut out, &bp, &params(0.5), Variant::Classic, 10_000, &mut rng);
    assert!(!out.is_empty());
    assert!(out.iter().all(|p| p.shard.is_none()));
}

#[test]
fn higher_intensity_spawns_more_particles_on_average() {
    // Thinning is stochastic by design; compare averages, never exact counts.
    let mut rng = fastrand::Rng::with_seed(33);
    let mut total_low = 0usize;
    let mut total_high = 0usize;
    for _ in 0..40 {
        let bp = SnowflakeBlueprint::generate(&mut rng, Variant::Neon);
        let mut low = Vec::new();
        spawn_burst(&mut low, &bp, &params(0.05), Variant::Neon, 100_000, &mut rng);
        let mut high = Vec::new();
        spawn_burst(&mut high, &bp, &params(1.0), Variant::Neon, 100_000, &mut rng);
        total_low += low.len();
        total_high += high.len();
    }
    assert!(
        total_high > total_low,
        "intensity 1.0 should outspawn 0.05 ({total_high} vs {total_low})"
    );
}
