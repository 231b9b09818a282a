//! TOML configuration loading.
//!
//! Parses into small DTOs first so that unrecognised keys can be rejected
//! with a clear error instead of silently ignored, then copies the
//! recognised fields into the domain config structs.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use toml::Value;

use crate::sweep_config::{
    DetectionMagnitude, Detrend, DeviceConfig, SharedConfig, SinkConfig, SweepConfig,
};

fn sorted_keys(extra: &HashMap<String, Value>) -> Vec<String> {
    let mut keys: Vec<String> = extra.keys().cloned().collect();
    keys.sort();
    keys
}

fn reject_unknown(section: &str, extra: &HashMap<String, Value>) -> Result<(), Box<dyn std::error::Error>> {
    if extra.is_empty() {
        Ok(())
    } else {
        Err(format!("unrecognised key(s) in [{}]: {}", section, sorted_keys(extra).join(", ")).into())
    }
}

#[derive(Debug, Deserialize, Default)]
struct DeviceDto {
    soapy_args: Option<String>,
    sample_rate: Option<f64>,
    bandwidth: Option<f64>,
    corr: Option<f64>,
    gain: Option<f64>,
    auto_gain: Option<bool>,
    channel: Option<usize>,
    antenna: Option<String>,
    settings: Option<Vec<String>>,
    force_sample_rate: Option<bool>,
    force_bandwidth: Option<bool>,
    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Debug, Deserialize, Default)]
struct SweepDto {
    min_freq: Option<f64>,
    max_freq: Option<f64>,
    bins: Option<u32>,
    repeats: Option<u32>,
    overlap: Option<f64>,
    crop: Option<bool>,
    fft_window: Option<String>,
    fft_overlap: Option<f64>,
    log_scale: Option<bool>,
    remove_dc: Option<bool>,
    detrend: Option<String>,
    lnb_lo: Option<f64>,
    tune_delay: Option<f64>,
    reset_stream: Option<bool>,
    base_buffer_size: Option<usize>,
    max_buffer_size: Option<usize>,
    max_threads: Option<usize>,
    max_queue_size: Option<usize>,
    threshold: Option<f64>,
    detection_magnitude: Option<String>,
    runs: Option<u32>,
    time_limit: Option<f64>,
    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Debug, Deserialize, Default)]
struct SinkDto {
    server: Option<String>,
    port: Option<u16>,
    /// Accepted for surface compatibility; only the UDP sink is implemented.
    /// Any other value is logged and falls back to the UDP sink.
    output_format: Option<String>,
    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlConfigRoot {
    device: Option<DeviceDto>,
    sweep: Option<SweepDto>,
    sink: Option<SinkDto>,
    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

fn apply_device_dto(dto: DeviceDto) -> Result<DeviceConfig, Box<dyn std::error::Error>> {
    reject_unknown("device", &dto.extra)?;
    let mut cfg = DeviceConfig::default();
    if let Some(v) = dto.soapy_args {
        cfg.soapy_args = v;
    }
    if let Some(v) = dto.sample_rate {
        cfg.sample_rate = v;
    }
    cfg.bandwidth = dto.bandwidth.or(cfg.bandwidth);
    if let Some(v) = dto.corr {
        cfg.corr_ppm = v;
    }
    cfg.gain = dto.gain.or(cfg.gain);
    if let Some(v) = dto.auto_gain {
        cfg.auto_gain = v;
    }
    if let Some(v) = dto.channel {
        cfg.channel = v;
    }
    cfg.antenna = dto.antenna.or(cfg.antenna);
    if let Some(settings) = dto.settings {
        cfg.settings = settings
            .into_iter()
            .filter_map(|s| s.split_once('=').map(|(k, v)| (k.to_string(), v.to_string())))
            .collect();
    }
    if let Some(v) = dto.force_sample_rate {
        cfg.force_sample_rate = v;
    }
    if let Some(v) = dto.force_bandwidth {
        cfg.force_bandwidth = v;
    }
    Ok(cfg)
}

fn apply_sweep_dto(dto: SweepDto) -> Result<SweepConfig, Box<dyn std::error::Error>> {
    reject_unknown("sweep", &dto.extra)?;
    let mut cfg = SweepConfig::default();
    if let Some(v) = dto.min_freq {
        cfg.min_freq = v;
    }
    if let Some(v) = dto.max_freq {
        cfg.max_freq = v;
    }
    if let Some(v) = dto.bins {
        cfg.bins = v;
    }
    if let Some(v) = dto.repeats {
        cfg.repeats = v;
    }
    if let Some(v) = dto.overlap {
        cfg.overlap = v;
    }
    if let Some(v) = dto.crop {
        cfg.crop = v;
    }
    if let Some(v) = dto.fft_window {
        cfg.fft_window = v;
    }
    if let Some(v) = dto.fft_overlap {
        cfg.fft_overlap = v;
    }
    if let Some(v) = dto.log_scale {
        cfg.log_scale = v;
    }
    if let Some(v) = dto.remove_dc {
        cfg.remove_dc = v;
    }
    if let Some(v) = dto.detrend {
        cfg.detrend = match v.as_str() {
            "constant" => Detrend::Constant,
            "linear" => Detrend::Linear,
            _ => Detrend::None,
        };
    }
    if let Some(v) = dto.lnb_lo {
        cfg.lnb_lo = v;
    }
    if let Some(v) = dto.tune_delay {
        cfg.tune_delay_s = v;
    }
    if let Some(v) = dto.reset_stream {
        cfg.reset_stream = v;
    }
    if let Some(v) = dto.base_buffer_size {
        cfg.base_buffer_size = v;
    }
    if let Some(v) = dto.max_buffer_size {
        cfg.max_buffer_size = v;
    }
    if let Some(v) = dto.max_threads {
        cfg.max_threads = v;
    }
    if let Some(v) = dto.max_queue_size {
        cfg.max_queue_size = v;
    }
    if let Some(v) = dto.threshold {
        cfg.threshold_dbm = v;
    }
    if let Some(v) = dto.detection_magnitude {
        cfg.detection_magnitude = match v.as_str() {
            "true_magnitude" => DetectionMagnitude::TrueMagnitude,
            _ => DetectionMagnitude::AlgebraicSum,
        };
    }
    if let Some(v) = dto.runs {
        cfg.runs = v;
    }
    if let Some(v) = dto.time_limit {
        cfg.time_limit_s = v;
    }
    cfg.validate().map_err(|e| format!("invalid [sweep] configuration: {e}"))?;
    Ok(cfg)
}

fn apply_sink_dto(dto: SinkDto) -> Result<SinkConfig, Box<dyn std::error::Error>> {
    reject_unknown("sink", &dto.extra)?;
    let mut cfg = SinkConfig::default();
    if let Some(v) = dto.server {
        cfg.host = v;
    }
    if let Some(v) = dto.port {
        cfg.port = v;
    }
    if let Some(format) = dto.output_format {
        if format != "udp" {
            tracing::warn!(
                requested = %format,
                "output_format is not implemented; falling back to the UDP sink"
            );
        }
    }
    Ok(cfg)
}

pub fn from_toml_str(s: &str) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let root: TomlConfigRoot = toml::from_str(s)?;
    reject_unknown("<root>", &root.extra)?;

    let device = apply_device_dto(root.device.unwrap_or_default())?;
    let sweep = apply_sweep_dto(root.sweep.unwrap_or_default())?;
    let sink = apply_sink_dto(root.sink.unwrap_or_default())?;

    Ok(SharedConfig::new(device, sweep, sink))
}

pub fn from_file<P: AsRef<Path>>(path: P) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let s = fs::read_to_string(path)?;
    from_toml_str(&s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_minimal_config() {
        let toml = r#"
            [device]
            sample_rate = 2000000.0

            [sweep]
            min_freq = 88000000.0
            max_freq = 108000000.0
            bins = 1024
        "#;
        let cfg = from_toml_str(toml).expect("should parse");
        assert_eq!(cfg.device().sample_rate, 2_000_000.0);
        assert_eq!(cfg.sweep().bins, 1024);
    }

    #[test]
    fn rejects_unknown_key_in_sweep_section() {
        let toml = r#"
            [sweep]
            min_freq = 1.0
            max_freq = 2.0
            bogus_key = 1
        "#;
        let err = from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("bogus_key"));
    }

    #[test]
    fn rejects_unknown_top_level_section() {
        let toml = r#"
            [nonsense]
            x = 1
        "#;
        let err = from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("nonsense"));
    }
}
