use anyhow::{anyhow, Context};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat};
use ringbuf::traits::{Consumer as _, Producer as _, Split as _};
use ringbuf::HeapRb;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::f32::consts::PI;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Number of published magnitude bins (half the 1024-point transform).
pub const BIN_COUNT: usize = 512;

const FFT_SIZE: usize = 1024;
const HOP: usize = 256;

/// Spectrum older than this is treated as silence by the render loop.
pub const STALE_MS: f32 = 500.0;

/// Seqlock-published magnitude spectrum, one byte per bin.
///
/// Bins are packed eight per `AtomicU64`. Odd `seq` means a write is in
/// progress; readers retry until they observe the same even value on both
/// sides of the copy. Single writer (analyzer thread), single reader
/// (render loop).
pub struct AtomicSpectrum {
    seq: AtomicU64,
    bins: [AtomicU64; BIN_COUNT / 8],
    updated_ms: AtomicU64,
}

impl AtomicSpectrum {
    pub fn new() -> Self {
        Self {
            seq: AtomicU64::new(0),
            bins: std::array::from_fn(|_| AtomicU64::new(0)),
            updated_ms: AtomicU64::new(0),
        }
    }

    pub fn store(&self, bins: &[u8; BIN_COUNT]) {
        self.seq.fetch_add(1, Ordering::Release); // odd => write in progress
        for (dst, chunk) in self.bins.iter().zip(bins.chunks_exact(8)) {
            let mut word = 0u64;
            for (i, &b) in chunk.iter().enumerate() {
                word |= (b as u64) << (i * 8);
            }
            dst.store(word, Ordering::Relaxed);
        }
        self.updated_ms.store(now_ms(), Ordering::Relaxed);
        self.seq.fetch_add(1, Ordering::Release); // even => stable
    }

    pub fn load(&self, out: &mut [u8; BIN_COUNT]) {
        loop {
            let v1 = self.seq.load(Ordering::Acquire);
            if v1 & 1 == 1 {
                continue;
            }

            for (src, chunk) in self.bins.iter().zip(out.chunks_exact_mut(8)) {
                let word = src.load(Ordering::Relaxed);
                for (i, b) in chunk.iter_mut().enumerate() {
                    *b = (word >> (i * 8)) as u8;
                }
            }

            let v2 = self.seq.load(Ordering::Acquire);
            if v1 == v2 {
                return;
            }
        }
    }

    pub fn age_ms(&self) -> f32 {
        let t = self.updated_ms.load(Ordering::Relaxed);
        if t == 0 {
            return f32::INFINITY;
        }
        now_ms().saturating_sub(t) as f32
    }
}

impl Default for AtomicSpectrum {
    fn default() -> Self {
        Self::new()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_millis(0))
        .as_millis() as u64
}

pub fn list_input_devices() -> anyhow::Result<()> {
    let host = cpal::default_host();
    let devices = host.input_devices().context("enumerate input devices")?;

    let mut out = io::stdout();
    writeln!(out, "Input devices:")?;
    for dev in devices {
        let name = dev.name().unwrap_or_else(|_| "<unknown>".to_string());
        writeln!(out, "  - {}", name)?;
    }
    Ok(())
}

pub struct AudioSystem {
    _stream: cpal::Stream,
    stop: Arc<AtomicBool>,
    analyzer_handle: Option<thread::JoinHandle<()>>,
    spectrum: Arc<AtomicSpectrum>,
    pub sample_rate_hz: u32,
}

impl AudioSystem {
    pub fn new(device_query: Option<&str>) -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = select_input_device(&host, device_query)?;
        let supported = device
            .default_input_config()
            .context("get default input config")?;
        let sample_rate_hz = supported.sample_rate().0;
        let channels = supported.channels() as usize;
        let config: cpal::StreamConfig = supported.clone().into();

        let rb_capacity = (sample_rate_hz as usize).saturating_mul(4);
        let rb = HeapRb::<f32>::new(rb_capacity);
        let (mut prod, mut cons) = rb.split();

        let stop = Arc::new(AtomicBool::new(false));
        let spectrum = Arc::new(AtomicSpectrum::new());
        let spectrum_for_thread = Arc::clone(&spectrum);
        let stop_for_thread = Arc::clone(&stop);

        let err_fn = |err| eprintln!("audio stream error: {err}");

        let stream = match supported.sample_format() {
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            SampleFormat::U16 => device.build_input_stream(
                &config,
                move |data: &[u16], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            fmt => return Err(anyhow!("unsupported sample format: {fmt:?}")),
        };

        stream.play().context("start input stream")?;

        let analyzer_handle = thread::spawn(move || {
            analyze_loop(&mut cons, &stop_for_thread, &spectrum_for_thread)
        });

        Ok(Self {
            _stream: stream,
            stop,
            analyzer_handle: Some(analyzer_handle),
            spectrum,
            sample_rate_hz,
        })
    }

    pub fn spectrum(&self) -> Arc<AtomicSpectrum> {
        Arc::clone(&self.spectrum)
    }
}

impl Drop for AudioSystem {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(h) = self.analyzer_handle.take() {
            let _ = h.join();
        }
    }
}

fn select_input_device(
    host: &cpal::Host,
    device_query: Option<&str>,
) -> anyhow::Result<cpal::Device> {
    let devices = host
        .input_devices()
        .context("enumerate input devices")?
        .collect::<Vec<_>>();

    let want = device_query.map(|s| s.to_lowercase());
    if let Some(want) = want.as_deref() {
        if let Some(dev) = devices.iter().find(|d| {
            d.name()
                .map(|n| n.to_lowercase().contains(want))
                .unwrap_or(false)
        }) {
            return Ok(dev.clone());
        }
        return Err(anyhow!("no input device matching: {want}"));
    }

    host.default_input_device()
        .ok_or_else(|| anyhow!("no default input device found"))
}

fn push_interleaved<T: Sample<Float = f32> + Copy>(
    data: &[T],
    channels: usize,
    prod: &mut ringbuf::HeapProd<f32>,
) {
    for frame in data.chunks(channels) {
        let mut acc = 0.0f32;
        for s in frame {
            acc += (*s).to_float_sample();
        }
        let mono = acc / channels as f32;
        let _ = prod.try_push(mono);
    }
}

fn analyze_loop(cons: &mut ringbuf::HeapCons<f32>, stop: &AtomicBool, spectrum: &AtomicSpectrum) {
    let n = FFT_SIZE;

    let mut scratch = vec![0.0f32; n];
    let mut write_pos = 0usize;
    let mut filled = 0usize;
    let mut since_last = 0usize;

    let hann = (0..n)
        .map(|i| 0.5 - 0.5 * ((2.0 * PI * i as f32) / (n as f32)).cos())
        .collect::<Vec<_>>();

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n);
    let mut fft_buf = vec![Complex { re: 0.0, im: 0.0 }; n];
    let mut bins = [0u8; BIN_COUNT];

    while !stop.load(Ordering::Relaxed) {
        let mut got_any = false;
        while let Some(s) = cons.try_pop() {
            got_any = true;
            scratch[write_pos] = s;
            write_pos = (write_pos + 1) % n;
            if filled < n {
                filled += 1;
            }
            since_last += 1;
            if filled == n && since_last >= HOP {
                since_last = 0;
                analyze_window(&scratch, write_pos, &hann, &fft, &mut fft_buf, &mut bins);
                spectrum.store(&bins);
            }
        }

        if !got_any {
            thread::sleep(Duration::from_millis(1));
        }
    }
}

/// One windowed FFT pass, magnitudes soft-kneed into the 0..=255 range so
/// the downstream band analysis sees analyser-style byte bins.
fn analyze_window(
    scratch: &[f32],
    write_pos: usize,
    hann: &[f32],
    fft: &Arc<dyn rustfft::Fft<f32>>,
    fft_buf: &mut [Complex<f32>],
    bins: &mut [u8; BIN_COUNT],
) {
    let n = fft_buf.len();
    for i in 0..n {
        let s = scratch[(write_pos + i) % n];
        fft_buf[i].re = s * hann[i];
        fft_buf[i].im = 0.0;
    }

    fft.process(fft_buf);
    for (b, c) in bins.iter_mut().zip(fft_buf.iter().take(BIN_COUNT)) {
        let mag = (c.re * c.re + c.im * c.im).sqrt();
        // tanh knee keeps quiet detail visible without clipping loud peaks.
        *b = ((mag * 0.06).tanh() * 255.0) as u8;
    }
}
