pub mod window;

use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};
use rustfft::FftPlanner;
use sweep_config::{Detrend, SweepConfig};
use sweep_core::{ComplexSample, PsdResult, RealSample};

/// Welch-style PSD (C5): split the complex baseband `samples` into
/// overlapping, windowed segments of `cfg.bins` length, FFT each, average
/// magnitude-squared across segments, then apply the configured
/// post-processing flags.
pub fn welch_psd(
    samples: &[ComplexSample],
    cfg: &SweepConfig,
    sample_rate: f64,
    centre_freq_hz: f64,
    fft_plan: &Arc<dyn rustfft::Fft<RealSample>>,
) -> PsdResult {
    let n = cfg.bins as usize;
    if samples.len() < n || n == 0 {
        return PsdResult { freqs: Vec::new(), power_db: Vec::new() };
    }

    let win = window::window(&cfg.fft_window, n);
    let step = ((1.0 - cfg.fft_overlap) * n as f64).round().max(1.0) as usize;

    let mut accum = vec![0f64; n];
    let mut segments = 0usize;

    let mut start = 0usize;
    while start + n <= samples.len() {
        let mut buf: Vec<ComplexSample> = samples[start..start + n]
            .iter()
            .zip(win.iter())
            .map(|(s, w)| *s * *w)
            .collect();
        fft_plan.process(&mut buf);
        for (bin, c) in buf.iter().enumerate() {
            accum[bin] += (c.norm_sqr()) as f64;
        }
        segments += 1;
        start += step;
    }

    if segments == 0 {
        return PsdResult { freqs: Vec::new(), power_db: Vec::new() };
    }
    for v in accum.iter_mut() {
        *v /= segments as f64;
    }

    if cfg.remove_dc {
        accum[0] = 0.0;
    }
    match cfg.detrend {
        Detrend::None => {}
        Detrend::Constant => {
            let mean = accum.iter().sum::<f64>() / accum.len() as f64;
            for v in accum.iter_mut() {
                *v = (*v - mean).max(0.0);
            }
        }
        Detrend::Linear => {
            let len = accum.len() as f64;
            let first = accum[0];
            let last = *accum.last().unwrap();
            for (i, v) in accum.iter_mut().enumerate() {
                let trend = first + (last - first) * (i as f64 / (len - 1.0).max(1.0));
                *v = (*v - trend).max(0.0);
            }
        }
    }

    // FFT-shift so the array reads low-frequency-to-high, centred on `centre_freq_hz`.
    let half = n / 2;
    let mut shifted = Vec::with_capacity(n);
    shifted.extend_from_slice(&accum[half..]);
    shifted.extend_from_slice(&accum[..half]);

    let bin_hz = sample_rate / n as f64;
    let mut freqs: Vec<f64> = (0..n)
        .map(|i| centre_freq_hz - sample_rate / 2.0 + i as f64 * bin_hz)
        .collect();
    let mut power = shifted;

    if cfg.crop {
        let crop_n = (cfg.overlap * n as f64 / 2.0).floor() as usize;
        if n > 2 * crop_n {
            freqs = freqs[crop_n..n - crop_n].to_vec();
            power = power[crop_n..n - crop_n].to_vec();
        }
    }

    let power_db = if cfg.log_scale {
        power.iter().map(|p| 10.0 * (p.max(1e-30)).log10()).collect()
    } else {
        power
    };

    PsdResult { freqs, power_db }
}

struct Job {
    samples: Vec<ComplexSample>,
    sample_rate: f64,
    centre_freq_hz: f64,
    reply: Sender<PsdResult>,
}

/// Bounded worker pool fronting `welch_psd` (C5). Submission blocks once the
/// queue reaches `max_queue_size`, which is exactly the backpressure the
/// acquisition loop needs to avoid racing ahead of PSD compute.
pub struct PsdEngine {
    job_tx: Sender<Job>,
    _workers: Vec<thread::JoinHandle<()>>,
}

/// A handle to one submitted job's eventual result.
pub struct PsdHandle {
    reply_rx: Receiver<PsdResult>,
}

impl PsdHandle {
    /// Blocks until the PSD for this job is ready.
    pub fn result(self) -> PsdResult {
        self.reply_rx.recv().expect("PSD worker dropped without replying")
    }
}

impl PsdEngine {
    pub fn new(cfg: Arc<SweepConfig>) -> Self {
        let max_threads = if cfg.max_threads == 0 {
            thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
        } else {
            cfg.max_threads
        };
        let queue_size = cfg.max_queue_size.max(1);

        let (job_tx, job_rx) = bounded::<Job>(queue_size);

        let mut workers = Vec::with_capacity(max_threads);
        for _ in 0..max_threads {
            let job_rx = job_rx.clone();
            let cfg = cfg.clone();
            workers.push(thread::spawn(move || {
                let mut planner = FftPlanner::<RealSample>::new();
                let mut cached_plan: Option<(usize, Arc<dyn rustfft::Fft<RealSample>>)> = None;
                while let Ok(job) = job_rx.recv() {
                    let plan = match &cached_plan {
                        Some((n, plan)) if *n == cfg.bins as usize => plan.clone(),
                        _ => {
                            let plan = planner.plan_fft_forward(cfg.bins as usize);
                            cached_plan = Some((cfg.bins as usize, plan.clone()));
                            plan
                        }
                    };
                    let result = welch_psd(&job.samples, &cfg, job.sample_rate, job.centre_freq_hz, &plan);
                    let _ = job.reply.send(result);
                }
            }));
        }

        PsdEngine { job_tx, _workers: workers }
    }

    /// Hands a burst's samples to the pool, keyed by centre frequency.
    /// Blocks (backpressure) if the queue is full.
    pub fn submit(&self, samples: Vec<ComplexSample>, sample_rate: f64, centre_freq_hz: f64) -> PsdHandle {
        let (reply, reply_rx) = bounded(1);
        let job = Job { samples, sample_rate, centre_freq_hz, reply };
        self.job_tx.send(job).expect("PSD worker pool closed");
        PsdHandle { reply_rx }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn tone(n: usize, rate: f64, tone_hz: f64) -> Vec<ComplexSample> {
        (0..n)
            .map(|i| {
                let phase = 2.0 * PI * tone_hz * i as f64 / rate;
                ComplexSample::new(phase.cos() as RealSample, phase.sin() as RealSample)
            })
            .collect()
    }

    #[test]
    fn psd_of_tone_peaks_near_tone_bin() {
        let cfg = SweepConfig { bins: 1024, fft_overlap: 0.5, log_scale: true, ..Default::default() };
        let rate = 2_000_000.0;
        let samples = tone(8192, rate, 100_000.0);
        let mut planner = FftPlanner::<RealSample>::new();
        let plan = planner.plan_fft_forward(cfg.bins as usize);
        let psd = welch_psd(&samples, &cfg, rate, 100_000_000.0, &plan);
        assert!(!psd.is_empty());
        let (peak_idx, _) = psd
            .power_db
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap();
        let peak_freq = psd.freqs[peak_idx];
        assert!((peak_freq - 100_100_000.0).abs() < 50_000.0);
    }

    #[test]
    fn engine_round_trips_a_job() {
        let cfg = Arc::new(SweepConfig { bins: 256, max_threads: 1, max_queue_size: 2, ..Default::default() });
        let engine = PsdEngine::new(cfg.clone());
        let samples = tone(2048, 2e6, 50_000.0);
        let handle = engine.submit(samples, 2e6, 100e6);
        let psd = handle.result();
        assert_eq!(psd.len(), cfg.bins as usize);
    }
}
