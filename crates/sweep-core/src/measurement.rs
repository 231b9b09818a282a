use chrono::{DateTime, Utc};

/// A computed power spectral density: frequency axis (Hz) and power axis
/// (dB when log-scaled), same length, uniform frequency step.
#[derive(Debug, Clone)]
pub struct PsdResult {
    pub freqs: Vec<f64>,
    pub power_db: Vec<f64>,
}

impl PsdResult {
    pub fn len(&self) -> usize {
        self.freqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.freqs.is_empty()
    }
}

/// One measurement record, ready to be serialised and handed to the UDP
/// sink. Field names and layout mirror the wire format consumed by the
/// external reporting pipeline; see `to_json`.
#[derive(Debug, Clone)]
pub struct Measurement {
    pub report_time: DateTime<Utc>,
    pub frequency_mhz: f64,
    pub bandwidth_khz: i64,
    pub psd: Vec<i64>,
    pub span_mhz: [f64; 2],
    pub duration_ms: f64,
    pub rssi_dbm: f64,
}

impl Measurement {
    /// Serialises to the exact JSON record layout expected by downstream
    /// consumers. Built by hand (not via a general-purpose serializer) so the
    /// byte layout matches the wire format precisely, field order and all.
    pub fn to_json(&self) -> String {
        let psd_csv = self
            .psd
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");

        format!(
            "{{\n \"reportTime\": \"{}\",\n \"frequencyMHz\": {:.3},\n \"bandwidthKHz\": {},\n \"psd\": [{}],\n \"spanMHz\": [{:.3},{:.3}], \n \"durationMs\": {:.3},\n \"rssidBm\": {:.1}\n}}\n",
            self.report_time.format("%Y-%m-%dT%H:%M:%S%.6f"),
            self.frequency_mhz,
            self.bandwidth_khz,
            psd_csv,
            self.span_mhz[0],
            self.span_mhz[1],
            self.duration_ms,
            self.rssi_dbm,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn json_layout_matches_wire_format() {
        let m = Measurement {
            report_time: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            frequency_mhz: 100.0,
            bandwidth_khz: 12,
            psd: vec![-90, -80, -70],
            span_mhz: [99.0, 101.0],
            duration_ms: 0.1,
            rssi_dbm: -70.5,
        };
        let json = m.to_json();
        assert!(json.contains("\"frequencyMHz\": 100.000"));
        assert!(json.contains("\"bandwidthKHz\": 12"));
        assert!(json.contains("\"psd\": [-90,-80,-70]"));
        assert!(json.contains("\"spanMHz\": [99.000,101.000]"));
        assert!(json.contains("\"rssidBm\": -70.5"));
        assert!(json.ends_with("}\n"));
    }
}
