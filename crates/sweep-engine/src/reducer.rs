use sweep_core::{Burst, Measurement, PsdResult};

/// Derives rssi, −3 dB bandwidth and a refined centre frequency from a PSD
/// and the burst it was computed from (C6). Returns `None` if the PSD is
/// empty or the peak falls below `threshold_dbm`.
pub fn reduce(psd: &PsdResult, burst: &Burst, threshold_dbm: f64) -> Option<Measurement> {
    if psd.is_empty() {
        return None;
    }

    let n = psd.len();
    let (peak_idx, &rssi) = psd
        .power_db
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
        .unwrap();

    if rssi < threshold_dbm {
        return None;
    }

    let half_power = rssi - 3.0;
    let edges: Vec<usize> = psd
        .power_db
        .iter()
        .enumerate()
        .filter(|(_, &p)| p > half_power)
        .map(|(i, _)| i)
        .collect();

    let left_edge = *edges.first().unwrap_or(&peak_idx);
    let right_edge = *edges.last().unwrap_or(&peak_idx);

    let resolution = burst.sample_rate / n as f64;
    let bandwidth_hz = resolution * (right_edge - left_edge) as f64;

    let midpoint = n as f64 / 2.0;
    let centre = (left_edge + right_edge) as f64 / 2.0;
    let offset_hz = resolution * (centre - midpoint);
    let refined_freq_hz = burst.freq_hz + offset_hz;

    // Truncates toward zero, matching the upstream reference's `numpy.int_`
    // cast and its `%d`-formatted bandwidth — not rounding.
    let psd_int: Vec<i64> = psd.power_db.iter().map(|v| *v as i64).collect();

    Some(Measurement {
        report_time: burst.report_time,
        frequency_mhz: refined_freq_hz / 1e6,
        bandwidth_khz: (bandwidth_hz / 1e3) as i64,
        psd: psd_int,
        span_mhz: [
            (burst.freq_hz - burst.sample_rate / 2.0) / 1e6,
            (burst.freq_hz + burst.sample_rate / 2.0) / 1e6,
        ],
        duration_ms: burst.duration_s() * 1e3,
        rssi_dbm: rssi,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn burst_at(freq_hz: f64, rate: f64) -> Burst {
        Burst {
            start: 0,
            stop: 200,
            safe_start: 0,
            safe_stop: 200,
            td_array: vec![],
            report_time: Utc::now(),
            sample_rate: rate,
            freq_hz,
        }
    }

    #[test]
    fn below_threshold_is_dropped() {
        let psd = PsdResult { freqs: vec![0.0, 1.0, 2.0], power_db: vec![-90.0, -95.0, -92.0] };
        let burst = burst_at(100e6, 2e6);
        assert!(reduce(&psd, &burst, -50.0).is_none());
    }

    #[test]
    fn peak_bandwidth_and_refinement_are_derived() {
        let n = 16;
        let power_db: Vec<f64> = (0..n)
            .map(|i| {
                let d = (i as i64 - (n as i64) / 2).abs();
                -30.0 - d as f64 * 10.0
            })
            .collect();
        let psd = PsdResult { freqs: (0..n).map(|i| i as f64).collect(), power_db };
        let burst = burst_at(100e6, 2e6);
        let m = reduce(&psd, &burst, -80.0).expect("should produce a measurement");
        assert!(m.bandwidth_khz >= 0);
        assert!((m.frequency_mhz - 100.0).abs() < 1.0);
        assert_eq!(m.span_mhz, [99.0, 101.0]);
    }
}
