use crate::audio::{AudioSystem, BIN_COUNT, STALE_MS};
use crate::beat::{BeatDetector, Onset};
use crate::config::{Config, RendererMode, Variant};
use crate::emitter::{SpawnParams, Vec3};
use crate::flake::SnowflakeBlueprint;
use crate::gesture::{CameraRig, CameraStatus, FreezeController, GestureRecognizer};
use crate::render::{AsciiRenderer, BrailleRenderer, Frame, HalfBlockRenderer, Renderer};
use crate::scene::ParticleScene;
use crate::spectrum::FrequencyFrame;
use crate::terminal::TerminalGuard;
use anyhow::Context;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use fastrand::Rng;
use std::io::BufWriter;
use std::time::{Duration, Instant};

/// Everything one tick reports back to the driver, mostly for the HUD.
#[derive(Debug, Clone, Copy)]
pub struct TickReport {
    pub frame: FrequencyFrame,
    pub onset: Option<Onset>,
    pub frozen: bool,
    pub live_particles: usize,
}

/// All per-session mutable state: detectors, particle scene, gesture
/// controller, RNG. Constructed at session start, torn down at session end;
/// no global singletons. Ticks are driven externally (the run loop or a
/// test harness), so frames advance on synthetic timesteps just as well as
/// on wall-clock callbacks.
pub struct Session {
    pub variant: Variant,
    detector: BeatDetector,
    scene: ParticleScene,
    freeze: FreezeController,
    recognizer: Option<Box<dyn GestureRecognizer>>,
    rng: Rng,
    width: usize,
    height: usize,
}

impl Session {
    pub fn new(variant: Variant, cap_override: Option<usize>, width: usize, height: usize) -> Self {
        let cap = cap_override.unwrap_or_else(|| variant.particle_cap());
        Self {
            variant,
            detector: BeatDetector::new(),
            scene: ParticleScene::new(variant, cap, width, height),
            freeze: FreezeController::new(),
            recognizer: None,
            rng: Rng::new(),
            width,
            height,
        }
    }

    /// Attach the gesture recognizer once camera bootstrap resolved. The
    /// render loop never consumes gesture state before this is called.
    pub fn set_recognizer(&mut self, recognizer: Box<dyn GestureRecognizer>) {
        self.recognizer = Some(recognizer);
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.scene.resize(width, height);
    }

    pub fn scene(&self) -> &ParticleScene {
        &self.scene
    }

    pub fn frozen(&self) -> bool {
        self.freeze.frozen()
    }

    /// Switch renditions in place. The scene restarts empty (shard shape
    /// and cap differ per variant); detector state carries over.
    pub fn set_variant(&mut self, variant: Variant, cap_override: Option<usize>) {
        let cap = cap_override.unwrap_or_else(|| variant.particle_cap());
        self.variant = variant;
        self.scene = ParticleScene::new(variant, cap, self.width, self.height);
    }

    /// One cooperative frame: gesture -> analysis -> beat -> spawn ->
    /// physics -> composite. `now_ms` is the frame clock, `video_ts_ms`
    /// the current video frame timestamp when a recognizer is attached.
    pub fn tick(
        &mut self,
        bins: &[u8; BIN_COUNT],
        now_ms: u64,
        video_ts_ms: Option<f64>,
        on_gesture: &mut dyn FnMut(&str),
    ) -> TickReport {
        if let (Some(recognizer), Some(ts)) = (self.recognizer.as_mut(), video_ts_ms) {
            self.freeze.observe(recognizer.as_mut(), ts, on_gesture);
        }
        self.freeze.settle();
        let frozen = self.freeze.frozen();

        let frame = FrequencyFrame::analyze(bins);
        let onset = self.detector.step(&frame, now_ms);

        if let Some(onset) = onset {
            if !frozen {
                let bp = SnowflakeBlueprint::generate(&mut self.rng, self.variant);
                let origin = Vec3 {
                    x: (self.rng.f32() - 0.5) * self.width as f32 * 0.7,
                    y: (self.rng.f32() - 0.5) * self.height as f32 * 0.7,
                    z: (self.rng.f32() - 0.5) * 200.0,
                };
                let params = SpawnParams {
                    band: onset.band,
                    intensity: onset.intensity,
                    origin,
                    time_s: now_ms as f32 / 1000.0,
                };
                self.scene.spawn(&bp, &params, &mut self.rng);
            }
        }

        self.scene.update(frame.total, frozen);
        self.scene
            .render(now_ms as f32 / 1000.0, self.freeze.offset(), &mut self.rng);

        TickReport {
            frame,
            onset: if frozen { None } else { onset },
            frozen,
            live_particles: self.scene.len(),
        }
    }

    /// Manual burst, bound to a key in the run loop.
    pub fn burst(&mut self, now_ms: u64) {
        let frame = FrequencyFrame {
            total: 128.0,
            bass: 128.0,
            mid: 64.0,
            treble: 32.0,
        };
        let bp = SnowflakeBlueprint::generate(&mut self.rng, self.variant);
        let params = SpawnParams {
            band: frame.dominant_band(),
            intensity: 0.7,
            origin: Vec3 {
                x: 0.0,
                y: 0.0,
                z: 0.0,
            },
            time_s: now_ms as f32 / 1000.0,
        };
        self.scene.spawn(&bp, &params, &mut self.rng);
    }
}

struct FpsCounter {
    smoothed: f32,
}

impl FpsCounter {
    fn new() -> Self {
        Self { smoothed: 0.0 }
    }

    fn tick(&mut self, dt: f32) -> f32 {
        let inst = if dt > 1e-6 { 1.0 / dt } else { 0.0 };
        self.smoothed = if self.smoothed == 0.0 {
            inst
        } else {
            self.smoothed * 0.9 + inst * 0.1
        };
        self.smoothed
    }
}

pub fn run(cfg: Config) -> anyhow::Result<()> {
    let _term = TerminalGuard::new()?;
    let mut out = BufWriter::new(TerminalGuard::stdout());

    let mut renderer: Box<dyn Renderer> = match cfg.renderer {
        RendererMode::Ascii => Box::new(AsciiRenderer::new()),
        RendererMode::HalfBlock => Box::new(HalfBlockRenderer::new()),
        RendererMode::Braille => Box::new(BrailleRenderer::new()),
    };
    let (px_w_mul, px_h_mul) = renderer.cell_pixels();

    let audio = AudioSystem::new(cfg.device.as_deref()).context("start audio capture")?;
    let spectrum = audio.spectrum();

    let mut last_size = crossterm::terminal::size().context("get terminal size")?;
    if last_size.0 < 4 || last_size.1 < 3 {
        return Err(anyhow::anyhow!(
            "terminal too small (need at least 4x3, got {}x{})",
            last_size.0,
            last_size.1
        ));
    }

    let hud_rows: u16 = 1;
    let mut show_hud = true;
    let (mut pw, mut ph) = pixel_dims(last_size, hud_rows, px_w_mul, px_h_mul);

    let mut session = Session::new(cfg.variant, cfg.max_particles, pw, ph);

    let mut camera_label = String::new();
    if cfg.gesture {
        let mut on_status = |status: CameraStatus| {
            camera_label = status.label().to_string();
        };
        // No built-in webcam backend ships with the terminal build; the
        // rig reports a terminal Camera Error once and the session runs on
        // without gesture input.
        if let Some(recognizer) = CameraRig::start(None, &mut on_status) {
            session.set_recognizer(recognizer);
        }
    }

    let frame_budget = Duration::from_secs_f32(1.0 / cfg.fps.max(1) as f32);
    let start = Instant::now();
    let mut last_frame = start;
    let mut fps = FpsCounter::new();
    let mut bins = [0u8; BIN_COUNT];
    let mut stop = false;
    let mut variant = cfg.variant;

    loop {
        // Stop signal is checked at the top of each tick; a started frame
        // always runs to completion.
        if stop {
            return Ok(());
        }
        let now = Instant::now();

        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(k) if k.kind != KeyEventKind::Release => match k.code {
                    KeyCode::Char('q') | KeyCode::Esc => stop = true,
                    KeyCode::Char('h') => show_hud = !show_hud,
                    KeyCode::Char('v') => {
                        variant = variant.toggled();
                        session.set_variant(variant, cfg.max_particles);
                    }
                    KeyCode::Char(' ') => {
                        session.burst(now.duration_since(start).as_millis() as u64)
                    }
                    _ => {}
                },
                Event::Resize(c, r) => {
                    last_size = (c, r);
                    let dims = pixel_dims(last_size, hud_rows, px_w_mul, px_h_mul);
                    pw = dims.0;
                    ph = dims.1;
                    session.resize(pw, ph);
                }
                _ => {}
            }
        }

        // Resize events can be missed in some terminals; recheck per frame.
        let sz = crossterm::terminal::size()?;
        if sz != last_size {
            last_size = sz;
            let dims = pixel_dims(last_size, hud_rows, px_w_mul, px_h_mul);
            pw = dims.0;
            ph = dims.1;
            session.resize(pw, ph);
        }

        let dt = now.duration_since(last_frame).as_secs_f32().max(1e-6);
        last_frame = now;
        let now_ms = now.duration_since(start).as_millis() as u64;

        // A stale spectrum (paused stream, suspended device) is a normal
        // zero-energy frame, not an error.
        if spectrum.age_ms() <= STALE_MS {
            spectrum.load(&mut bins);
        } else {
            bins.fill(0);
        }

        let report = session.tick(&bins, now_ms, None, &mut |_label| {});

        let fps_now = fps.tick(dt);
        let hud = if show_hud {
            let freeze_tag = if report.frozen { " | FROZEN" } else { "" };
            let camera_tag = if camera_label.is_empty() {
                String::new()
            } else {
                format!(" | {camera_label}")
            };
            format!(
                "flurry {} | fps {:>5.1} | bass {:>3.0} mid {:>3.0} treb {:>3.0} | flakes {}/{}{}{}",
                variant.label(),
                fps_now,
                report.frame.bass,
                report.frame.mid,
                report.frame.treble,
                report.live_particles,
                session.scene().cap(),
                freeze_tag,
                camera_tag,
            )
        } else {
            String::new()
        };

        // The HUD row stays reserved while hidden so the pixel grid never
        // has to resize on an 'h' toggle; the line just renders blank.
        let frame = Frame {
            term_cols: last_size.0,
            term_rows: last_size.1,
            visual_rows: last_size.1.saturating_sub(hud_rows),
            pixel_width: pw,
            pixel_height: ph,
            pixels_rgba: session.scene().pixels(),
            hud: &hud,
            hud_rows,
            sync_updates: cfg.sync_updates,
        };
        renderer.render(&frame, &mut out)?;

        let elapsed = now.elapsed();
        if elapsed < frame_budget {
            std::thread::sleep(frame_budget - elapsed);
        }
    }
}

fn pixel_dims(size: (u16, u16), hud_rows: u16, px_w_mul: usize, px_h_mul: usize) -> (usize, usize) {
    let visual_rows = size.1.saturating_sub(hud_rows).max(1) as usize;
    (size.0 as usize * px_w_mul, visual_rows * px_h_mul)
}
