use crate::dsp_types::{RealSample, SampleCount};
use chrono::{DateTime, Utc};

/// A detected above-threshold run of samples within a single hop's
/// acquisition, together with the time-domain slice used to compute its PSD.
#[derive(Debug, Clone)]
pub struct Burst {
    pub start: usize,
    pub stop: usize,
    pub safe_start: usize,
    pub safe_stop: usize,
    pub td_array: Vec<RealSample>,
    pub report_time: DateTime<Utc>,
    pub sample_rate: f64,
    pub freq_hz: f64,
}

impl Burst {
    pub fn samples(&self) -> SampleCount {
        (self.stop - self.start) as SampleCount
    }

    pub fn duration_s(&self) -> f64 {
        self.samples() as f64 / self.sample_rate
    }
}
