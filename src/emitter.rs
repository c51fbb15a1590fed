use crate::config::Variant;
use crate::flake::{SnowflakeBlueprint, TipShape};
use crate::spectrum::Band;
use fastrand::Rng;
use std::f32::consts::PI;

/// Per-spawn particle budget range, scaled by onset intensity.
pub const MIN_BURST: usize = 80;
pub const MAX_BURST: usize = 420;

/// Fork tip geometry: two short segments splayed off the arm end.
const FORK_LEN: f32 = 0.15;
const FORK_ANGLE: f32 = PI / 6.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// The mutable render unit. Owned exclusively by the scene's particle
/// collection; only the render loop's single-threaded pass mutates one.
#[derive(Debug, Clone)]
pub struct Particle {
    pub pos: Vec3,
    pub vel: Vec3,
    /// Remaining life in [0, 1]; the particle is evicted at <= 0.
    pub life: f32,
    pub decay: f32,
    pub size: f32,
    pub color: (u8, u8, u8),
    pub shimmer: f32,
    pub angle: f32,
    pub spin: f32,
    /// Convex polygon footprint, neon variant only.
    pub shard: Option<Vec<Vec2>>,
}

/// Walk every line segment the blueprint implies and lerp sample points
/// along each, then replicate the set six-fold (60-degree symmetry).
///
/// Sample density is proportional to segment length so long segments get
/// proportionally more points. The classic variant adds positional jitter.
pub fn sample_points(bp: &SnowflakeBlueprint, variant: Variant, rng: &mut Rng) -> Vec<Vec2> {
    let mut segments: Vec<(Vec2, Vec2)> = Vec::new();
    let o = Vec2 { x: 0.0, y: 0.0 };

    if bp.center_plate > 0.0 {
        let p = bp.center_plate;
        segments.push((Vec2 { x: -p, y: 0.0 }, Vec2 { x: p, y: 0.0 }));
        segments.push((Vec2 { x: 0.0, y: -p }, Vec2 { x: 0.0, y: p }));
    }

    // Main spine along +x.
    let tip = Vec2 {
        x: bp.arm_length,
        y: 0.0,
    };
    segments.push((o, tip));

    for rib in &bp.ribs {
        let base = Vec2 { x: rib.pos, y: 0.0 };
        for side in [1.0f32, -1.0] {
            let end = Vec2 {
                x: rib.pos + rib.length * rib.angle.cos(),
                y: side * rib.length * rib.angle.sin(),
            };
            segments.push((base, end));

            for k in 0..rib.sub_ribs {
                let t = (k + 1) as f32 / (rib.sub_ribs + 1) as f32;
                let spike_base = lerp(base, end, t);
                let spike_end = Vec2 {
                    x: spike_base.x + rib.length * 0.25,
                    y: spike_base.y,
                };
                segments.push((spike_base, spike_end));
            }
        }
    }

    // Only the fork tip contributes geometry; point and star are inert.
    if bp.tip == TipShape::Fork {
        for side in [1.0f32, -1.0] {
            let end = Vec2 {
                x: tip.x + FORK_LEN * FORK_ANGLE.cos(),
                y: side * FORK_LEN * FORK_ANGLE.sin(),
            };
            segments.push((tip, end));
        }
    }

    let mut arm_points: Vec<Vec2> = Vec::new();
    for &(a, b) in &segments {
        let len = ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt();
        let count = match variant {
            Variant::Neon => (len * 60.0) as usize,
            Variant::Classic => (len * 100.0 * 0.7) as usize,
        }
        .max(1);
        for i in 0..count {
            let t = i as f32 / count as f32;
            let mut p = lerp(a, b, t);
            if variant == Variant::Classic {
                p.x += (rng.f32() - 0.5) * 0.01;
                p.y += (rng.f32() - 0.5) * 0.01;
            }
            arm_points.push(p);
        }
    }

    let mut points = Vec::with_capacity(arm_points.len() * 6);
    for k in 0..6 {
        let theta = k as f32 * PI / 3.0;
        let (sin_t, cos_t) = theta.sin_cos();
        for p in &arm_points {
            points.push(Vec2 {
                x: p.x * cos_t - p.y * sin_t,
                y: p.x * sin_t + p.y * cos_t,
            });
        }
    }
    points
}

/// Particle budget for one burst: linear in intensity, then scaled by the
/// square root of the size scale so big flakes get more particles but not
/// linearly more.
pub fn burst_budget(intensity: f32, size_scale: f32) -> usize {
    let base = MIN_BURST as f32 + (MAX_BURST - MIN_BURST) as f32 * intensity;
    (base * size_scale.max(0.0).sqrt()) as usize
}

/// Base hue per band, degrees. Used by the neon variant together with a
/// slow wall-clock drift.
fn band_hue(band: Band) -> f32 {
    match band {
        Band::Bass => 215.0,
        Band::Mid => 275.0,
        Band::Treble => 190.0,
    }
}

pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (u8, u8, u8) {
    let h = h.rem_euclid(360.0) / 60.0;
    let c = v * s;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = v - c;
    (
        ((r + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((b + m) * 255.0) as u8,
    )
}

/// Random convex shard: 3..=5 vertices on a circle at sorted angles.
fn make_shard(rng: &mut Rng, size: f32) -> Vec<Vec2> {
    let count = rng.usize(3..=5);
    let mut angles: Vec<f32> = (0..count).map(|_| rng.f32() * 2.0 * PI).collect();
    angles.sort_by(|a, b| a.total_cmp(b));
    let radius = size * (0.5 + rng.f32() * 0.5);
    angles
        .iter()
        .map(|a| Vec2 {
            x: a.cos() * radius,
            y: a.sin() * radius,
        })
        .collect()
}

pub struct SpawnParams {
    pub band: Band,
    pub intensity: f32,
    pub origin: Vec3,
    /// Wall-clock seconds since session start; drives the neon hue drift.
    pub time_s: f32,
}

/// Instantiate one snowflake burst into `out`, respecting the live cap.
///
/// Sample points define only the initial velocity direction and magnitude;
/// every particle starts at the shared burst origin. When the replicated
/// point set exceeds the budget, each point survives independently with
/// probability budget/total, so exact counts are stochastic.
pub fn spawn_burst(
    out: &mut Vec<Particle>,
    bp: &SnowflakeBlueprint,
    params: &SpawnParams,
    variant: Variant,
    cap: usize,
    rng: &mut Rng,
) {
    let points = sample_points(bp, variant, rng);
    if points.is_empty() {
        return;
    }

    let size_scale = 0.5 + params.intensity * 1.1 + rng.f32() * 0.4;
    let budget = burst_budget(params.intensity, size_scale);
    let keep = (budget as f32 / points.len() as f32).min(1.0);

    let color = match variant {
        Variant::Classic => params.band.profile().color,
        Variant::Neon => {
            let hue = band_hue(params.band) + params.time_s * 9.0;
            hsv_to_rgb(hue, 0.75, 1.0)
        }
    };

    let speed = (0.9 + params.intensity * 2.2) * size_scale;
    for p in points {
        if rng.f32() > keep {
            continue;
        }
        if out.len() >= cap {
            // Backpressure by truncation: the rest of the burst is dropped.
            return;
        }
        let size = 1.0 + rng.f32() * 2.0;
        out.push(Particle {
            pos: params.origin,
            vel: Vec3 {
                x: p.x * speed,
                y: p.y * speed,
                z: (rng.f32() - 0.5) * 1.6,
            },
            life: 1.0,
            decay: 0.008 + rng.f32() * 0.012,
            size,
            color,
            shimmer: rng.f32() * 2.0 * PI,
            angle: rng.f32() * 2.0 * PI,
            spin: (rng.f32() - 0.5) * 0.2,
            shard: match variant {
                Variant::Neon => Some(make_shard(rng, size * 1.4)),
                Variant::Classic => None,
            },
        });
    }
}

fn lerp(a: Vec2, b: Vec2, t: f32) -> Vec2 {
    Vec2 {
        x: a.x + (b.x - a.x) * t,
        y: a.y + (b.y - a.y) * t,
    }
}
