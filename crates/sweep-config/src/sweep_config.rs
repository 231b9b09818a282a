use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// How a detected burst's magnitude is computed from its complex samples.
/// See the burst detector for the rationale behind the non-obvious default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectionMagnitude {
    /// `Re + Im`, matching the upstream reference behaviour.
    #[default]
    AlgebraicSum,
    /// `sqrt(Re^2 + Im^2)`.
    TrueMagnitude,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Detrend {
    #[default]
    None,
    Constant,
    Linear,
}

/// Device-side configuration: everything needed to open and tune the radio.
/// Immutable for the lifetime of a sweep run.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub soapy_args: String,
    pub sample_rate: f64,
    pub bandwidth: Option<f64>,
    pub corr_ppm: f64,
    pub gain: Option<f64>,
    pub auto_gain: bool,
    pub channel: usize,
    pub antenna: Option<String>,
    pub settings: Vec<(String, String)>,
    pub force_sample_rate: bool,
    pub force_bandwidth: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            soapy_args: String::new(),
            sample_rate: 2_000_000.0,
            bandwidth: None,
            corr_ppm: 0.0,
            gain: None,
            auto_gain: true,
            channel: 0,
            antenna: None,
            settings: Vec::new(),
            force_sample_rate: false,
            force_bandwidth: false,
        }
    }
}

impl DeviceConfig {
    /// Applies the configured PPM correction to a nominal frequency, the
    /// same way a local-oscillator correction is applied to uplink/downlink
    /// frequencies in a tuned radio front-end.
    pub fn corrected_freq(&self, freq_hz: f64) -> f64 {
        let err = (freq_hz / 1e6) * self.corr_ppm;
        freq_hz + err
    }
}

/// Sweep-side configuration: hop range, bin geometry, PSD processing flags,
/// detection threshold, and sink/lifetime parameters.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub min_freq: f64,
    pub max_freq: f64,
    pub bins: u32,
    pub repeats: u32,
    pub overlap: f64,
    pub crop: bool,
    pub fft_window: String,
    pub fft_overlap: f64,
    pub log_scale: bool,
    pub remove_dc: bool,
    pub detrend: Detrend,
    pub lnb_lo: f64,
    pub tune_delay_s: f64,
    pub reset_stream: bool,
    pub base_buffer_size: usize,
    pub max_buffer_size: usize,
    pub max_threads: usize,
    pub max_queue_size: usize,
    pub threshold_dbm: f64,
    pub detection_magnitude: DetectionMagnitude,
    pub runs: u32,
    pub time_limit_s: f64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            min_freq: 88_000_000.0,
            max_freq: 108_000_000.0,
            bins: 1024,
            repeats: 1,
            overlap: 0.0,
            crop: false,
            fft_window: "hann".to_string(),
            fft_overlap: 0.5,
            log_scale: true,
            remove_dc: false,
            detrend: Detrend::None,
            lnb_lo: 0.0,
            tune_delay_s: 0.0,
            reset_stream: false,
            base_buffer_size: 16384,
            max_buffer_size: 13_107_200,
            max_threads: 0,
            max_queue_size: 4,
            threshold_dbm: -50.0,
            detection_magnitude: DetectionMagnitude::default(),
            runs: 0,
            time_limit_s: 0.0,
        }
    }
}

impl SweepConfig {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.bins == 0 {
            return Err("bins must be > 0");
        }
        if !(0.0..1.0).contains(&self.overlap) {
            return Err("overlap must be in [0, 1)");
        }
        if !(0.0..1.0).contains(&self.fft_overlap) {
            return Err("fft_overlap must be in [0, 1)");
        }
        if self.min_freq >= self.max_freq {
            return Err("min_freq must be < max_freq");
        }
        if self.repeats == 0 {
            return Err("repeats must be > 0");
        }
        Ok(())
    }
}

/// UDP sink destination.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub host: String,
    pub port: u16,
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig { host: "127.0.0.1".to_string(), port: 8081 }
    }
}

/// Small piece of runtime state mutated while the sweep is running: just the
/// sink's outgoing datagram sequence counter, used for operator-visible
/// logging. Everything else in `SharedConfig` is immutable for the run.
#[derive(Debug, Default)]
pub struct SinkState {
    pub datagrams_sent: u64,
}

/// Bundles the immutable configuration with the small amount of mutable
/// runtime state the sink needs, behind cheap-to-clone `Arc` handles.
#[derive(Clone)]
pub struct SharedConfig {
    device: Arc<DeviceConfig>,
    sweep: Arc<SweepConfig>,
    sink: Arc<SinkConfig>,
    state: Arc<RwLock<SinkState>>,
}

impl SharedConfig {
    pub fn new(device: DeviceConfig, sweep: SweepConfig, sink: SinkConfig) -> Self {
        Self::from_parts(device, sweep, sink, SinkState::default())
    }

    pub fn from_parts(device: DeviceConfig, sweep: SweepConfig, sink: SinkConfig, state: SinkState) -> Self {
        if let Err(e) = sweep.validate() {
            panic!("invalid sweep configuration: {e}");
        }
        SharedConfig {
            device: Arc::new(device),
            sweep: Arc::new(sweep),
            sink: Arc::new(sink),
            state: Arc::new(RwLock::new(state)),
        }
    }

    pub fn device(&self) -> Arc<DeviceConfig> {
        self.device.clone()
    }

    pub fn sweep(&self) -> Arc<SweepConfig> {
        self.sweep.clone()
    }

    pub fn sink(&self) -> Arc<SinkConfig> {
        self.sink.clone()
    }

    pub fn state_read(&self) -> RwLockReadGuard<'_, SinkState> {
        self.state.read().expect("sink state lock poisoned")
    }

    pub fn state_write(&self) -> RwLockWriteGuard<'_, SinkState> {
        self.state.write().expect("sink state lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_zero_bins() {
        let mut cfg = SweepConfig::default();
        cfg.bins = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_range() {
        let mut cfg = SweepConfig::default();
        cfg.min_freq = 200e6;
        cfg.max_freq = 100e6;
        assert!(cfg.validate().is_err());
    }

    #[test]
    #[should_panic(expected = "invalid sweep configuration")]
    fn from_parts_panics_on_invalid_config() {
        let mut sweep = SweepConfig::default();
        sweep.bins = 0;
        SharedConfig::new(DeviceConfig::default(), sweep, SinkConfig::default());
    }

    #[test]
    fn corrected_freq_applies_ppm() {
        let cfg = DeviceConfig { corr_ppm: 10.0, ..Default::default() };
        let corrected = cfg.corrected_freq(100_000_000.0);
        assert!((corrected - 100_001_000.0).abs() < 1.0);
    }
}
