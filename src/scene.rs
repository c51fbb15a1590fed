use crate::config::Variant;
use crate::emitter::{spawn_burst, Particle, SpawnParams, Vec2};
use crate::flake::SnowflakeBlueprint;
use fastrand::Rng;

/// Perspective constants: classic uses a rotating 3D projection, neon a
/// depth-only divide.
const CLASSIC_FOV: f32 = 600.0;
const NEON_FOV: f32 = 800.0;

const GRAVITY: f32 = 0.05;
const FRICTION: f32 = 0.985;

/// Fraction of the previous frame kept each tick; the rest fades toward
/// black, leaving motion trails.
const TRAIL_KEEP: f32 = 0.86;

/// Owns the live particle set and the persistent RGBA trail canvas.
///
/// `update` and `render` are separate so a gesture freeze can halt physics
/// while compositing continues with the last known positions.
pub struct ParticleScene {
    variant: Variant,
    cap: usize,
    particles: Vec<Particle>,
    width: usize,
    height: usize,
    trail: Vec<u8>,
    pitch: f32,
    yaw: f32,
}

impl ParticleScene {
    pub fn new(variant: Variant, cap: usize, width: usize, height: usize) -> Self {
        Self {
            variant,
            cap,
            particles: Vec::new(),
            width,
            height,
            trail: vec![0u8; width * height * 4],
            pitch: 0.0,
            yaw: 0.0,
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.trail = vec![0u8; width * height * 4];
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn pixels(&self) -> &[u8] {
        &self.trail
    }

    /// Instantiate one snowflake burst. A no-op once the live cap is hit.
    pub fn spawn(&mut self, bp: &SnowflakeBlueprint, params: &SpawnParams, rng: &mut Rng) {
        spawn_burst(
            &mut self.particles,
            bp,
            params,
            self.variant,
            self.cap,
            rng,
        );
    }

    /// One physics step. `energy` is the frame's total band energy in
    /// [0, 255]; louder moments fade particles faster. While `frozen`,
    /// nothing moves, ages, or dies.
    pub fn update(&mut self, energy: f32, frozen: bool) {
        if frozen {
            return;
        }

        self.pitch += 0.004;
        self.yaw += 0.007;

        let decay_bonus = energy / 255.0 * 0.01;

        // Reverse order so swap_remove never skips an element.
        for i in (0..self.particles.len()).rev() {
            let p = &mut self.particles[i];
            p.pos.x += p.vel.x;
            p.pos.y += p.vel.y;
            p.pos.z += p.vel.z;
            p.vel.y += GRAVITY;
            p.vel.x *= FRICTION;
            p.vel.y *= FRICTION;
            p.vel.z *= FRICTION;
            p.angle += p.spin;
            p.life -= p.decay + decay_bonus;
            if p.life <= 0.0 {
                self.particles.swap_remove(i);
            }
        }
    }

    /// Composite all live particles onto the trail canvas. `pan` shifts the
    /// draw origin (gesture camera offset); `time_s` drives shimmer.
    pub fn render(&mut self, time_s: f32, pan: (f32, f32), rng: &mut Rng) {
        for b in &mut self.trail {
            *b = (*b as f32 * TRAIL_KEEP) as u8;
        }
        if self.width == 0 || self.height == 0 {
            return;
        }

        let cx = self.width as f32 / 2.0 + pan.0;
        let cy = self.height as f32 / 2.0 + pan.1;
        let (sin_p, cos_p) = self.pitch.sin_cos();
        let (sin_y, cos_y) = self.yaw.sin_cos();

        // Temporarily take the collection so draw calls can borrow the
        // canvas mutably while we iterate.
        let particles = std::mem::take(&mut self.particles);
        for p in &particles {
            let (x, y, z) = match self.variant {
                Variant::Classic => {
                    // Pitch around X, then yaw around Y, then perspective.
                    let y1 = p.pos.y * cos_p - p.pos.z * sin_p;
                    let z1 = p.pos.y * sin_p + p.pos.z * cos_p;
                    let x2 = p.pos.x * cos_y + z1 * sin_y;
                    let z2 = -p.pos.x * sin_y + z1 * cos_y;
                    (x2, y1, z2)
                }
                Variant::Neon => (p.pos.x, p.pos.y, p.pos.z),
            };

            let fov = match self.variant {
                Variant::Classic => CLASSIC_FOV,
                Variant::Neon => NEON_FOV,
            };
            let depth = fov + z;
            if depth <= 1.0 {
                continue;
            }
            let scale = fov / depth;

            let sx = cx + x * scale;
            let sy = cy + y * scale;

            let shimmer = 0.75 + 0.25 * (p.shimmer + time_s * 6.0).sin();
            let alpha = (p.life * scale * shimmer).clamp(0.0, 1.0);
            if alpha <= 0.01 {
                continue;
            }

            match self.variant {
                Variant::Classic => {
                    let radius = (p.size * scale).max(0.6);
                    self.draw_glow(sx, sy, radius, p.color, alpha);
                }
                Variant::Neon => {
                    // Per-frame random flicker on the glow radius only.
                    let flicker = 0.8 + rng.f32() * 0.4;
                    let radius = (p.size * scale * flicker).max(0.6);
                    self.draw_glow(sx, sy, radius, p.color, alpha * 0.5);
                    if let Some(shard) = &p.shard {
                        self.draw_shard(sx, sy, shard, p.angle, scale, p.color, alpha);
                    }
                }
            }
        }
        self.particles = particles;
    }

    /// Additive radial-falloff dot. Overlaps brighten, never occlude.
    fn draw_glow(&mut self, sx: f32, sy: f32, radius: f32, color: (u8, u8, u8), alpha: f32) {
        let r = radius.ceil() as i32;
        let x0 = sx as i32;
        let y0 = sy as i32;
        for dy in -r..=r {
            for dx in -r..=r {
                let d = ((dx * dx + dy * dy) as f32).sqrt();
                if d > radius {
                    continue;
                }
                let falloff = 1.0 - d / radius.max(1e-6);
                self.blend_add(x0 + dx, y0 + dy, color, alpha * falloff);
            }
        }
    }

    /// Rasterize a small convex shard polygon, rotated and scaled.
    fn draw_shard(
        &mut self,
        sx: f32,
        sy: f32,
        shard: &[Vec2],
        angle: f32,
        scale: f32,
        color: (u8, u8, u8),
        alpha: f32,
    ) {
        if shard.len() < 3 {
            return;
        }
        let (sin_a, cos_a) = angle.sin_cos();
        let verts: Vec<Vec2> = shard
            .iter()
            .map(|v| Vec2 {
                x: sx + (v.x * cos_a - v.y * sin_a) * scale,
                y: sy + (v.x * sin_a + v.y * cos_a) * scale,
            })
            .collect();

        let min_x = verts.iter().map(|v| v.x).fold(f32::INFINITY, f32::min);
        let max_x = verts.iter().map(|v| v.x).fold(f32::NEG_INFINITY, f32::max);
        let min_y = verts.iter().map(|v| v.y).fold(f32::INFINITY, f32::min);
        let max_y = verts.iter().map(|v| v.y).fold(f32::NEG_INFINITY, f32::max);

        for py in min_y.floor() as i32..=max_y.ceil() as i32 {
            for px in min_x.floor() as i32..=max_x.ceil() as i32 {
                if point_in_convex(&verts, px as f32 + 0.5, py as f32 + 0.5) {
                    self.blend_add(px, py, color, alpha);
                }
            }
        }
    }

    fn blend_add(&mut self, x: i32, y: i32, color: (u8, u8, u8), alpha: f32) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let i = (y as usize * self.width + x as usize) * 4;
        let px = &mut self.trail[i..i + 4];
        px[0] = (px[0] as f32 + color.0 as f32 * alpha).min(255.0) as u8;
        px[1] = (px[1] as f32 + color.1 as f32 * alpha).min(255.0) as u8;
        px[2] = (px[2] as f32 + color.2 as f32 * alpha).min(255.0) as u8;
        px[3] = 255;
    }
}

/// Winding test; the shard generator only produces convex polygons with a
/// consistent vertex order.
fn point_in_convex(verts: &[Vec2], x: f32, y: f32) -> bool {
    let mut sign = 0.0f32;
    for i in 0..verts.len() {
        let a = verts[i];
        let b = verts[(i + 1) % verts.len()];
        let cross = (b.x - a.x) * (y - a.y) - (b.y - a.y) * (x - a.x);
        if cross.abs() < 1e-6 {
            continue;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}
