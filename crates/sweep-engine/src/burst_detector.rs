use chrono::{DateTime, Utc};
use sweep_config::DetectionMagnitude;
use sweep_core::{Burst, ComplexSample};

/// Full-scale reference used to relate a dBm threshold to a raw sample
/// magnitude threshold; matches the 32-bit signed full-scale reference the
/// upstream reference implementation assumes for its sample source.
const FULL_SCALE: f64 = 2f64.powi(31);

/// Stateful per-hop adaptive-threshold burst detector (C4). A fresh detector
/// (or `reset_for_hop`) must be used at the start of every hop: the
/// threshold is only ever lowered toward the observed noise floor within a
/// hop's acquisitions, never raised back up.
pub struct BurstDetector {
    threshold_dbm: f64,
    detection_magnitude: DetectionMagnitude,
    abs_threshold: f64,
}

impl BurstDetector {
    pub fn new(threshold_dbm: f64, detection_magnitude: DetectionMagnitude) -> Self {
        let mut d = BurstDetector { threshold_dbm, detection_magnitude, abs_threshold: 0.0 };
        d.reset_for_hop();
        d
    }

    pub fn reset_for_hop(&mut self) {
        self.abs_threshold = 10f64.powf(self.threshold_dbm / 10.0) * FULL_SCALE;
    }

    fn magnitude(&self, s: ComplexSample) -> f64 {
        match self.detection_magnitude {
            DetectionMagnitude::AlgebraicSum => (s.re + s.im) as f64,
            DetectionMagnitude::TrueMagnitude => ((s.re * s.re + s.im * s.im) as f64).sqrt(),
        }
    }

    /// Feeds one acquisition's samples through the detector, updating the
    /// adaptive threshold and returning at most one `Burst`.
    pub fn process_acquisition(
        &mut self,
        samples: &[ComplexSample],
        sample_rate: f64,
        freq_hz: f64,
        report_time: DateTime<Utc>,
    ) -> Option<Burst> {
        if samples.is_empty() {
            return None;
        }
        let min_burst = ((5e-6) * sample_rate) as usize;

        let iq: Vec<f64> = samples.iter().map(|s| self.magnitude(*s)).collect();

        let noise_window = &iq[..iq.len().min(100)];
        let noise = (noise_window.iter().sum::<f64>() / noise_window.len() as f64).abs();
        if noise < self.abs_threshold {
            self.abs_threshold = noise * 100.0;
        }

        let burst_idx: Vec<usize> = iq
            .iter()
            .enumerate()
            .filter(|(_, v)| v.abs() > self.abs_threshold)
            .map(|(i, _)| i)
            .collect();

        if burst_idx.is_empty() {
            return None;
        }

        let start = burst_idx[0];
        let mut last = start;
        let mut stop = *burst_idx.last().unwrap();
        for &idx in &burst_idx[1..] {
            if idx - last > min_burst {
                stop = last;
                break;
            }
            last = idx;
        }

        if stop <= start || stop - start <= min_burst {
            return None;
        }

        let safe_start = start.saturating_sub(min_burst);
        let safe_stop = (stop + min_burst).min(iq.len() - 1);

        let td_array: Vec<f32> = iq[safe_start..=safe_stop].iter().map(|v| v.abs() as f32).collect();

        Some(Burst {
            start,
            stop,
            safe_start,
            safe_stop,
            td_array,
            report_time,
            sample_rate,
            freq_hz,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex;

    // Constant, same-sign amplitude: the noise-floor estimate averages the
    // first 100 raw (signed) samples, so alternating-sign synthetic noise
    // would cancel to ~0 and collapse the threshold to nothing. Real antenna
    // noise doesn't average to exactly zero within a window this short, so a
    // constant low-level filler is the more representative stand-in.
    fn noise_samples(n: usize, amplitude: f32) -> Vec<ComplexSample> {
        vec![Complex::new(amplitude, 0.0); n]
    }

    #[test]
    fn noise_only_yields_no_burst() {
        let mut det = BurstDetector::new(-85.0, DetectionMagnitude::AlgebraicSum);
        let samples = noise_samples(4096, 0.001);
        let burst = det.process_acquisition(&samples, 2e6, 100e6, Utc::now());
        assert!(burst.is_none());
    }

    #[test]
    fn tone_above_threshold_detected() {
        let mut det = BurstDetector::new(-85.0, DetectionMagnitude::AlgebraicSum);
        let mut samples = noise_samples(20_000, 0.001);
        for s in samples.iter_mut().skip(5000).take(400) {
            *s = Complex::new(1.0e7, 1.0e7);
        }
        let burst = det.process_acquisition(&samples, 2e6, 100e6, Utc::now());
        let burst = burst.expect("burst should be detected");
        assert!(burst.start >= 4900 && burst.start <= 5000);
        assert!(burst.stop > burst.start);
    }

    #[test]
    fn threshold_only_lowers_within_a_hop() {
        let mut det = BurstDetector::new(-85.0, DetectionMagnitude::AlgebraicSum);
        let initial = det.abs_threshold;
        let quiet = noise_samples(200, 0.001);
        det.process_acquisition(&quiet, 2e6, 100e6, Utc::now());
        assert!(det.abs_threshold <= initial);
        let lowered = det.abs_threshold;

        // A second acquisition with a noise floor at or above the
        // already-lowered threshold must not raise the threshold back up —
        // it only ever moves down, never up.
        let louder_acquisition = noise_samples(200, (lowered * 2.0) as f32);
        det.process_acquisition(&louder_acquisition, 2e6, 100e6, Utc::now());
        assert!(det.abs_threshold <= lowered);
    }
}
