use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use sweep_config::SharedConfig;
use sweep_core::{ComplexSample, HopPlan, SweepError};

use crate::burst_detector::BurstDetector;
use crate::device::SdrDevice;
use crate::psd::PsdEngine;
use crate::reducer;
use crate::sink::UdpSink;

/// Orchestrates C1-C7 across the lifetime of a sweep run (C8): Idle ->
/// Streaming -> Draining -> Idle.
pub struct SweepController<D: SdrDevice> {
    device: D,
    shared: SharedConfig,
    shutdown: Arc<AtomicBool>,
}

impl<D: SdrDevice> SweepController<D> {
    pub fn new(device: D, shared: SharedConfig, shutdown: Arc<AtomicBool>) -> Self {
        SweepController { device, shared, shutdown }
    }

    /// Runs the sweep until the shutdown flag is set, `runs` sweeps of the
    /// hop plan have completed, or `time_limit` has elapsed — whichever
    /// comes first. Always stops the device stream and drains the sink
    /// before returning, even on error.
    pub fn run(&mut self) -> Result<(), SweepError> {
        let device_cfg = self.shared.device();
        let sweep_cfg = self.shared.sweep();

        let actual_rate = self
            .device
            .set_sample_rate(device_cfg.sample_rate, device_cfg.force_sample_rate)
            .map_err(SweepError::from)?;
        if let Some(bw) = device_cfg.bandwidth {
            self.device.set_bandwidth(bw, device_cfg.force_bandwidth).map_err(SweepError::from)?;
        }
        self.device.set_gain(device_cfg.gain, device_cfg.auto_gain).map_err(SweepError::from)?;
        self.device.set_antenna(device_cfg.antenna.as_deref()).map_err(SweepError::from)?;
        for (k, v) in &device_cfg.settings {
            self.device.set_setting(k, v).map_err(SweepError::from)?;
        }

        // The hop plan operates in IF space: an external LNB down-converts the
        // requested RF range by `lnb_lo` before it reaches the SDR input, so
        // the device is tuned across `min_freq - lnb_lo .. max_freq - lnb_lo`
        // and `lnb_lo` is added back when reporting (see `run_loop`).
        let plan = HopPlan::new(
            sweep_cfg.min_freq - sweep_cfg.lnb_lo,
            sweep_cfg.max_freq - sweep_cfg.lnb_lo,
            sweep_cfg.bins,
            sweep_cfg.overlap,
            actual_rate,
        );
        tracing::info!(
            hops = plan.len(),
            hopping = plan.hopping,
            hop_size_hz = plan.hop_size,
            sample_rate = actual_rate,
            "planned sweep"
        );
        for (i, f) in plan.centre_freqs.iter().enumerate() {
            tracing::debug!(hop = i, freq_hz = f, "hop frequency");
        }

        let sizing = sweep_core::hop_plan::BufferSizing::new(
            sweep_cfg.bins,
            sweep_cfg.repeats,
            sweep_cfg.base_buffer_size,
            sweep_cfg.max_buffer_size,
        );
        tracing::info!(
            buffer_size = sizing.buffer_size,
            buffer_repeats = sizing.buffer_repeats,
            "sized acquisition buffer"
        );

        self.device.start_stream().map_err(SweepError::from)?;

        let psd_engine = PsdEngine::new(sweep_cfg.clone());
        let sink = UdpSink::new(&self.shared.sink()).map_err(|e| SweepError::Config { reason: e.to_string() })?;

        let run_result = self.run_loop(&plan, sizing.buffer_size, sizing.buffer_repeats, actual_rate, &psd_engine, &sink);

        // Draining: stop the stream and let the sink flush before returning.
        if let Err(e) = self.device.stop_stream() {
            tracing::warn!(error = %e, "error stopping device stream during drain");
        }
        sink.drain();

        run_result
    }

    fn run_loop(
        &mut self,
        plan: &HopPlan,
        buffer_size: usize,
        buffer_repeats: usize,
        sample_rate: f64,
        psd_engine: &PsdEngine,
        sink: &UdpSink,
    ) -> Result<(), SweepError> {
        let sweep_cfg = self.shared.sweep();
        let started = Instant::now();
        let mut run_count: u32 = 0;

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }
            if sweep_cfg.runs != 0 && run_count >= sweep_cfg.runs {
                break;
            }
            if sweep_cfg.time_limit_s > 0.0 && started.elapsed().as_secs_f64() >= sweep_cfg.time_limit_s {
                break;
            }

            for &freq in &plan.centre_freqs {
                if self.shutdown.load(Ordering::SeqCst) {
                    break;
                }

                self.tune(freq, sweep_cfg.reset_stream, sweep_cfg.tune_delay_s)?;

                // `freq` is the IF frequency the device is tuned to; reports
                // and PSD freq axes are in RF terms, so add `lnb_lo` back.
                let report_freq = freq + sweep_cfg.lnb_lo;

                let mut detector = BurstDetector::new(sweep_cfg.threshold_dbm, sweep_cfg.detection_magnitude);
                let mut found_burst = None;

                for _ in 0..buffer_repeats {
                    if self.shutdown.load(Ordering::SeqCst) {
                        break;
                    }
                    let acq_start = Utc::now();
                    let mut buf = vec![ComplexSample::new(0.0, 0.0); buffer_size];
                    self.fill_buffer(&mut buf)?;

                    if found_burst.is_none() {
                        if let Some(burst) = detector.process_acquisition(&buf, sample_rate, report_freq, acq_start) {
                            found_burst = Some((burst, buf));
                        }
                    }
                }

                if let Some((burst, acquisition)) = found_burst {
                    let samples = acquisition[burst.safe_start..=burst.safe_stop].to_vec();
                    let handle = psd_engine.submit(samples, sample_rate, report_freq);
                    let psd = handle.result();
                    if psd.is_empty() {
                        tracing::debug!(freq_hz = freq, "empty PSD result, skipping");
                        continue;
                    }
                    if let Some(measurement) = reducer::reduce(&psd, &burst, sweep_cfg.threshold_dbm) {
                        sink.send(measurement);
                    }
                }
            }

            run_count += 1;
        }

        Ok(())
    }

    fn tune(&mut self, freq: f64, reset_stream: bool, tune_delay_s: f64) -> Result<(), SweepError> {
        if (self.device.frequency() - freq).abs() < f64::EPSILON {
            return Ok(());
        }

        if reset_stream {
            self.device.deactivate_stream().map_err(SweepError::from)?;
        }
        self.device.set_frequency(freq).map_err(SweepError::from)?;
        if reset_stream {
            self.device.activate_stream().map_err(SweepError::from)?;
        } else if !self.device.is_streaming() {
            self.device.activate_stream().map_err(SweepError::from)?;
        }

        if tune_delay_s > 0.0 {
            let deadline = Instant::now() + std::time::Duration::from_secs_f64(tune_delay_s);
            let mut scratch = vec![ComplexSample::new(0.0, 0.0); 4096];
            while Instant::now() < deadline {
                let _ = self.device.read_stream(&mut scratch);
            }
        }
        Ok(())
    }

    /// Fills `buf` from the device, retrying short reads (overflow/partial
    /// chunk) until full or shutdown is signalled.
    fn fill_buffer(&mut self, buf: &mut [ComplexSample]) -> Result<(), SweepError> {
        let mut written = 0;
        while written < buf.len() {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }
            let n = self.device.read_stream(&mut buf[written..]).map_err(SweepError::from)?;
            if n == 0 {
                continue;
            }
            written += n;
        }
        Ok(())
    }
}
