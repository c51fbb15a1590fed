use crate::emitter::Vec2;

/// Landmark index treated as the palm center when computing the pan target.
const PALM_CENTER_LANDMARK: usize = 9;

/// Maximum pan offset, pixels, reached when the palm is at a frame edge.
const MAX_PAN: f32 = 120.0;

/// Fraction of the remaining distance the smoothed offset moves per frame.
const PAN_SMOOTHING: f32 = 0.1;

/// The gesture label that freezes the scene.
pub const OPEN_PALM: &str = "Open_Palm";

/// One recognizer result: ranked gesture labels for the top hand plus that
/// hand's ordered landmark points in normalized [0, 1] coordinates. Empty
/// vectors mean no hand was detected.
#[derive(Debug, Clone, Default)]
pub struct Recognition {
    pub gestures: Vec<String>,
    pub landmarks: Vec<Vec2>,
}

/// Boundary to the external gesture-recognition service. The model itself
/// is opaque; implementations may block briefly per call.
pub trait GestureRecognizer {
    fn recognize(&mut self, timestamp_ms: f64) -> anyhow::Result<Recognition>;
}

/// Camera readiness reported once at startup through the status callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraStatus {
    Ready,
    Error,
}

impl CameraStatus {
    pub fn label(self) -> &'static str {
        match self {
            CameraStatus::Ready => "Camera Ready",
            CameraStatus::Error => "Camera Error",
        }
    }
}

/// One-shot camera/recognizer bootstrap. There is no built-in webcam
/// backend; callers supply one, and a missing backend degrades to a single
/// "Camera Error" status with the session continuing gesture-free.
pub struct CameraRig;

impl CameraRig {
    pub fn start(
        backend: Option<Box<dyn GestureRecognizer>>,
        on_status: &mut dyn FnMut(CameraStatus),
    ) -> Option<Box<dyn GestureRecognizer>> {
        match backend {
            Some(recognizer) => {
                on_status(CameraStatus::Ready);
                Some(recognizer)
            }
            None => {
                on_status(CameraStatus::Error);
                None
            }
        }
    }
}

/// Freeze flag plus smoothed camera pan, driven by per-frame recognitions.
///
/// Recognition runs at most once per distinct video frame timestamp; the
/// smoothing step runs every frame regardless, so pan motion stays
/// continuous across freeze transitions.
pub struct FreezeController {
    frozen: bool,
    target: (f32, f32),
    smoothed: (f32, f32),
    last_label: String,
    last_timestamp_ms: f64,
}

impl FreezeController {
    pub fn new() -> Self {
        Self {
            frozen: false,
            target: (0.0, 0.0),
            smoothed: (0.0, 0.0),
            last_label: String::new(),
            last_timestamp_ms: -1.0,
        }
    }

    pub fn frozen(&self) -> bool {
        self.frozen
    }

    pub fn offset(&self) -> (f32, f32) {
        self.smoothed
    }

    /// Consume one video frame. Returns `true` if recognition actually ran
    /// (i.e. the timestamp was new). Recognition errors are swallowed and
    /// prior state is retained. `on_change` fires only when the recognized
    /// label differs from the previous frame's label.
    pub fn observe(
        &mut self,
        recognizer: &mut dyn GestureRecognizer,
        timestamp_ms: f64,
        on_change: &mut dyn FnMut(&str),
    ) -> bool {
        if timestamp_ms == self.last_timestamp_ms {
            return false;
        }
        self.last_timestamp_ms = timestamp_ms;

        let recognition = match recognizer.recognize(timestamp_ms) {
            Ok(r) => r,
            // Per-frame recognition failures keep the previous state.
            Err(_) => return true,
        };

        let label = recognition
            .gestures
            .first()
            .map(String::as_str)
            .unwrap_or("")
            .to_string();

        if label == OPEN_PALM {
            self.frozen = true;
            if let Some(palm) = recognition.landmarks.get(PALM_CENTER_LANDMARK) {
                self.target = (
                    (palm.x - 0.5) * 2.0 * MAX_PAN,
                    (palm.y - 0.5) * 2.0 * MAX_PAN,
                );
            }
        } else {
            self.frozen = false;
            self.target = (0.0, 0.0);
        }

        if label != self.last_label {
            on_change(&label);
            self.last_label = label;
        }
        true
    }

    /// Move the smoothed offset 10% of the way toward the target. Called
    /// once per render frame, frozen or not.
    pub fn settle(&mut self) {
        self.smoothed.0 += (self.target.0 - self.smoothed.0) * PAN_SMOOTHING;
        self.smoothed.1 += (self.target.1 - self.smoothed.1) * PAN_SMOOTHING;
    }
}

impl Default for FreezeController {
    fn default() -> Self {
        Self::new()
    }
}
