use flurry::emitter::Vec2;
use flurry::gesture::{
    CameraRig, CameraStatus, FreezeController, GestureRecognizer, Recognition, OPEN_PALM,
};
use std::collections::VecDeque;

/// Scripted recognizer: pops one pre-baked result per recognize() call.
struct Scripted {
    frames: VecDeque<anyhow::Result<Recognition>>,
}

impl Scripted {
    fn new(frames: Vec<anyhow::Result<Recognition>>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl GestureRecognizer for Scripted {
    fn recognize(&mut self, _timestamp_ms: f64) -> anyhow::Result<Recognition> {
        self.frames
            .pop_front()
            .unwrap_or_else(|| Ok(Recognition::default()))
    }
}

fn palm_at(x: f32, y: f32) -> Recognition {
    // 21 hand landmarks; index 9 is the palm center.
    let mut landmarks = vec![Vec2 { x: 0.5, y: 0.5 }; 21];
    landmarks[9] = Vec2 { x, y };
    Recognition {
        gestures: vec![OPEN_PALM.to_string()],
        landmarks,
    }
}

fn fist() -> Recognition {
    Recognition {
        gestures: vec!["Closed_Fist".to_string()],
        landmarks: vec![Vec2 { x: 0.5, y: 0.5 }; 21],
    }
}

#[test]
fn open_palm_freezes_and_sets_pan_target() {
    let mut ctl = FreezeController::new();
    let mut rec = Scripted::new(vec![Ok(palm_at(1.0, 0.0))]);

    assert!(ctl.observe(&mut rec, 1.0, &mut |_| {}));
    assert!(ctl.frozen(), "open palm must freeze the scene");

    // Smoothing covers 10% of the distance per frame; palm at the right
    // edge maps to the maximum positive x pan.
    ctl.settle();
    let (ox, oy) = ctl.offset();
    assert!((ox - 12.0).abs() < 1e-4, "offset x {ox}");
    assert!((oy + 12.0).abs() < 1e-4, "offset y {oy}");
}

#[test]
fn non_palm_gesture_unfreezes_and_zeroes_target() {
    let mut ctl = FreezeController::new();
    let mut rec = Scripted::new(vec![Ok(palm_at(0.5, 0.5)), Ok(fist())]);

    ctl.observe(&mut rec, 1.0, &mut |_| {});
    assert!(ctl.frozen());

    ctl.observe(&mut rec, 2.0, &mut |_| {});
    assert!(!ctl.frozen(), "fist must unfreeze");

    // Target is zero again, so smoothing converges back to rest.
    for _ in 0..200 {
        ctl.settle();
    }
    let (ox, oy) = ctl.offset();
    assert!(ox.abs() < 1e-3 && oy.abs() < 1e-3, "offset ({ox}, {oy})");
}

#[test]
fn empty_detection_unfreezes() {
    let mut ctl = FreezeController::new();
    let mut rec = Scripted::new(vec![Ok(palm_at(0.5, 0.5)), Ok(Recognition::default())]);

    ctl.observe(&mut rec, 1.0, &mut |_| {});
    assert!(ctl.frozen());
    ctl.observe(&mut rec, 2.0, &mut |_| {});
    assert!(!ctl.frozen(), "no detection must unfreeze");
}

#[test]
fn duplicate_timestamps_skip_recognition() {
    let mut ctl = FreezeController::new();
    let mut rec = Scripted::new(vec![Ok(palm_at(0.5, 0.5)), Ok(fist())]);

    assert!(ctl.observe(&mut rec, 5.0, &mut |_| {}));
    // Same video frame again: recognize() must not be invoked.
    assert!(!ctl.observe(&mut rec, 5.0, &mut |_| {}));
    assert_eq!(rec.remaining(), 1, "duplicate timestamp consumed a frame");
    assert!(ctl.frozen(), "state unchanged on duplicate timestamp");
}

#[test]
fn recognition_errors_retain_prior_state() {
    let mut ctl = FreezeController::new();
    let mut rec = Scripted::new(vec![
        Ok(palm_at(0.8, 0.5)),
        Err(anyhow::anyhow!("recognizer hiccup")),
    ]);

    ctl.observe(&mut rec, 1.0, &mut |_| {});
    assert!(ctl.frozen());

    // The error frame is swallowed; freeze and target stay put.
    assert!(ctl.observe(&mut rec, 2.0, &mut |_| {}));
    assert!(ctl.frozen(), "error frame must not reset freeze");
}

#[test]
fn gesture_change_callback_is_edge_triggered() {
    let mut ctl = FreezeController::new();
    let mut rec = Scripted::new(vec![
        Ok(palm_at(0.5, 0.5)),
        Ok(palm_at(0.6, 0.5)),
        Ok(fist()),
        Ok(fist()),
    ]);

    let mut changes: Vec<String> = Vec::new();
    for ts in 1..=4 {
        ctl.observe(&mut rec, ts as f64, &mut |label| {
            changes.push(label.to_string())
        });
    }
    assert_eq!(
        changes,
        vec![OPEN_PALM.to_string(), "Closed_Fist".to_string()],
        "callback must fire only on label changes"
    );
}

#[test]
fn smoothing_converges_toward_target() {
    let mut ctl = FreezeController::new();
    let mut rec = Scripted::new(vec![Ok(palm_at(1.0, 1.0))]);
    ctl.observe(&mut rec, 1.0, &mut |_| {});

    let mut last_dist = f32::INFINITY;
    for _ in 0..100 {
        ctl.settle();
        let (ox, oy) = ctl.offset();
        let dist = ((ox - 120.0).powi(2) + (oy - 120.0).powi(2)).sqrt();
        assert!(dist <= last_dist + 1e-4, "smoothing must not overshoot");
        last_dist = dist;
    }
    assert!(last_dist < 1.0, "offset should approach the target, at {last_dist}");
}

#[test]
fn camera_rig_reports_error_without_backend() {
    let mut statuses = Vec::new();
    let handle = CameraRig::start(None, &mut |s| statuses.push(s));
    assert!(handle.is_none());
    assert_eq!(statuses, vec![CameraStatus::Error]);
    assert_eq!(CameraStatus::Error.label(), "Camera Error");
}

#[test]
fn camera_rig_passes_backend_through_when_ready() {
    let mut statuses = Vec::new();
    let backend: Box<dyn GestureRecognizer> = Box::new(Scripted::new(vec![]));
    let handle = CameraRig::start(Some(backend), &mut |s| statuses.push(s));
    assert!(handle.is_some());
    assert_eq!(statuses, vec![CameraStatus::Ready]);
}
