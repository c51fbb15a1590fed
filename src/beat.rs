use crate::spectrum::{Band, FrequencyFrame};

/// Initial adaptive threshold; also the floor the threshold decays back to.
pub const INITIAL_THRESHOLD: f32 = 1.3;

/// Exponential moving average weights for the per-band running energy.
const AVG_KEEP: f32 = 0.92;
const AVG_MIX: f32 = 0.08;

/// Per-silent-frame geometric decay applied to a boosted threshold.
const THRESHOLD_DECAY: f32 = 0.98;

/// Fallback spawn: fires when no band has fired for this long while the
/// signal still carries energy.
const FALLBACK_GAP_MS: u64 = 600;
const FALLBACK_MIN_TOTAL: f32 = 10.0;
const FALLBACK_INTENSITY: f32 = 0.4;

/// A detected onset: which band fired and how hard, in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Onset {
    pub band: Band,
    pub intensity: f32,
}

/// Adaptive threshold state for a single band. Lives for the whole session
/// and is stepped exactly once per frame.
#[derive(Debug, Clone, Copy)]
pub struct BandDetector {
    pub running_avg: f32,
    pub threshold: f32,
}

impl BandDetector {
    fn new() -> Self {
        Self {
            running_avg: 0.0,
            threshold: INITIAL_THRESHOLD,
        }
    }

    /// Whether `energy` clears both the adaptive gate and the band's
    /// absolute floor. Does not mutate state.
    fn fires(&self, band: Band, energy: f32) -> bool {
        energy > self.running_avg * self.threshold && energy > band.profile().floor
    }

    /// Per-frame state update, applied whether or not the band fired.
    fn settle(&mut self, band: Band, energy: f32, fired: bool) {
        self.running_avg = self.running_avg * AVG_KEEP + energy * AVG_MIX;
        if fired {
            self.threshold *= band.profile().boost;
        } else {
            self.threshold = (self.threshold * THRESHOLD_DECAY).max(INITIAL_THRESHOLD);
        }
    }
}

/// Three independent band detectors plus the fallback-spawn timer.
///
/// `step` takes the frame clock as an explicit argument so tests can drive
/// it with synthetic timesteps.
pub struct BeatDetector {
    bass: BandDetector,
    mid: BandDetector,
    treble: BandDetector,
    last_spawn_ms: u64,
}

impl BeatDetector {
    pub fn new() -> Self {
        Self {
            bass: BandDetector::new(),
            mid: BandDetector::new(),
            treble: BandDetector::new(),
            last_spawn_ms: 0,
        }
    }

    pub fn detector(&self, band: Band) -> &BandDetector {
        match band {
            Band::Bass => &self.bass,
            Band::Mid => &self.mid,
            Band::Treble => &self.treble,
        }
    }

    fn detector_mut(&mut self, band: Band) -> &mut BandDetector {
        match band {
            Band::Bass => &mut self.bass,
            Band::Mid => &mut self.mid,
            Band::Treble => &mut self.treble,
        }
    }

    /// Evaluate one frame. At most one band fires per frame, in bass → mid
    /// → treble priority order, so a kick drum doesn't triple-spawn.
    pub fn step(&mut self, frame: &FrequencyFrame, now_ms: u64) -> Option<Onset> {
        let mut onset: Option<Onset> = None;

        for band in Band::ALL {
            let energy = frame.band(band);
            let fired = onset.is_none() && self.detector(band).fires(band, energy);
            self.detector_mut(band).settle(band, energy, fired);
            if fired {
                onset = Some(Onset {
                    band,
                    intensity: (energy / 255.0).min(1.0),
                });
            }
        }

        // Sustained but beat-less audio still deserves snow: after 600ms of
        // quiet thresholds, spawn from whichever band currently dominates.
        if onset.is_none()
            && now_ms.saturating_sub(self.last_spawn_ms) >= FALLBACK_GAP_MS
            && frame.total > FALLBACK_MIN_TOTAL
        {
            onset = Some(Onset {
                band: frame.dominant_band(),
                intensity: FALLBACK_INTENSITY,
            });
        }

        if onset.is_some() {
            self.last_spawn_ms = now_ms;
        }
        onset
    }
}

impl Default for BeatDetector {
    fn default() -> Self {
        Self::new()
    }
}
