use crate::config::Variant;
use fastrand::Rng;
use std::f32::consts::PI;

/// Fixed branch half-angle for every rib: 60 degrees off the arm.
pub const RIB_ANGLE: f32 = PI / 3.0;

/// Tip decoration at the far end of each arm.
///
/// Only `Fork` contributes geometry today; `Point` and `Star` are selected
/// but structurally inert, kept as placeholders for future tip variation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TipShape {
    Point,
    Fork,
    Star,
}

/// One side branch along the main arm, in unit-arm coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Rib {
    /// Position along the arm, in (0.2, 0.8).
    pub pos: f32,
    /// Branch length, bounded by the arm length remaining past `pos`.
    pub length: f32,
    /// Branch half-angle off the arm axis.
    pub angle: f32,
    /// Count of short secondary spikes on this rib (0..=2).
    pub sub_ribs: u32,
}

/// Normalized geometric description of one snowflake, unit arm length.
/// Scale and six-fold rotation happen at emission time.
#[derive(Debug, Clone)]
pub struct SnowflakeBlueprint {
    pub arm_length: f32,
    /// Half-size of the small cross near the origin; 0.0 means absent.
    pub center_plate: f32,
    pub ribs: Vec<Rib>,
    pub tip: TipShape,
}

impl SnowflakeBlueprint {
    /// Roll a fresh blueprint. Rib positions come from an even partition of
    /// (0.2, 0.8) with per-slot jitter, so they are strictly increasing.
    pub fn generate(rng: &mut Rng, variant: Variant) -> Self {
        let rib_count = rng.u32(2..=5);
        let span = 0.6 / rib_count as f32;

        let mut ribs = Vec::with_capacity(rib_count as usize);
        for i in 0..rib_count {
            let slot = 0.2 + span * i as f32;
            let pos = slot + span * (0.05 + rng.f32() * 0.85);
            let remaining = 1.0 - pos;
            let length = remaining * (0.25 + rng.f32() * 0.6);
            let sub_ribs = if length > 0.3 { rng.u32(0..=2) } else { 0 };
            ribs.push(Rib {
                pos,
                length,
                angle: RIB_ANGLE,
                sub_ribs,
            });
        }

        let center_plate = if rng.f32() < 0.3 {
            0.08 + rng.f32() * 0.08
        } else {
            0.0
        };

        let tip = match variant {
            Variant::Classic => match rng.u32(0..3) {
                0 => TipShape::Point,
                1 => TipShape::Fork,
                _ => TipShape::Star,
            },
            Variant::Neon => {
                if rng.bool() {
                    TipShape::Fork
                } else {
                    TipShape::Point
                }
            }
        };

        Self {
            arm_length: 1.0,
            center_plate,
            ribs,
            tip,
        }
    }
}
