/// One of the three fixed frequency ranges the spectrum is split into.
///
/// Each band carries its own onset floor, threshold boost, and base color so
/// downstream code never branches on labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Bass,
    Mid,
    Treble,
}

/// Per-band tuning: the absolute energy floor below which onsets are
/// suppressed, the multiplicative threshold boost applied when the band
/// fires, and the base particle color.
#[derive(Debug, Clone, Copy)]
pub struct BandProfile {
    pub floor: f32,
    pub boost: f32,
    pub color: (u8, u8, u8),
}

impl Band {
    /// Detection priority order: bass wins over mid wins over treble.
    pub const ALL: [Band; 3] = [Band::Bass, Band::Mid, Band::Treble];

    pub const fn profile(self) -> BandProfile {
        match self {
            Band::Bass => BandProfile {
                floor: 25.0,
                boost: 1.5,
                color: (96, 168, 255),
            },
            Band::Mid => BandProfile {
                floor: 20.0,
                boost: 1.5,
                color: (178, 132, 255),
            },
            Band::Treble => BandProfile {
                floor: 15.0,
                boost: 1.4,
                color: (210, 240, 255),
            },
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Band::Bass => "bass",
            Band::Mid => "mid",
            Band::Treble => "treble",
        }
    }
}

/// Banded energy snapshot for one render tick, each value in [0, 255].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrequencyFrame {
    pub total: f32,
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
}

// Band boundaries as fractions of the bin count. The ranges are contiguous
// and partition the whole sequence: [0, 6%), [6%, 40%), [40%, len).
const BASS_SPLIT: f32 = 0.06;
const MID_SPLIT: f32 = 0.40;

impl FrequencyFrame {
    /// Average the bin magnitudes within each band range.
    ///
    /// Pure function of the input; empty ranges average to zero via a
    /// divisor clamped to 1.
    pub fn analyze(bins: &[u8]) -> Self {
        let len = bins.len();
        let bass_end = (len as f32 * BASS_SPLIT) as usize;
        let mid_end = (len as f32 * MID_SPLIT) as usize;

        let sum = |range: &[u8]| range.iter().map(|&b| b as u32).sum::<u32>() as f32;

        let bass_sum = sum(&bins[..bass_end]);
        let mid_sum = sum(&bins[bass_end..mid_end]);
        let treble_sum = sum(&bins[mid_end..]);

        let bass = bass_sum / bass_end.max(1) as f32;
        let mid = mid_sum / (mid_end - bass_end).max(1) as f32;
        let treble = treble_sum / (len - mid_end).max(1) as f32;
        let total = (bass_sum + mid_sum + treble_sum) / len.max(1) as f32;

        Self {
            total,
            bass,
            mid,
            treble,
        }
    }

    pub fn band(&self, band: Band) -> f32 {
        match band {
            Band::Bass => self.bass,
            Band::Mid => self.mid,
            Band::Treble => self.treble,
        }
    }

    /// Band with the highest current energy; used by the fallback spawn.
    pub fn dominant_band(&self) -> Band {
        let mut best = Band::Bass;
        for band in [Band::Mid, Band::Treble] {
            if self.band(band) > self.band(best) {
                best = band;
            }
        }
        best
    }
}
