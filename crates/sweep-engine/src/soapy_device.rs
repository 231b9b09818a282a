use sweep_core::{ComplexSample, DeviceError};

use crate::device::SdrDevice;

/// Prints which SoapySDR call failed before turning its error into a
/// `DeviceError`; `?` alone would lose that context.
macro_rules! soapycheck {
    ($text:literal, $call:expr, $variant:ident) => {
        match $call {
            Ok(v) => v,
            Err(e) => {
                tracing::error!("SoapySDR: failed to {}: {}", $text, e);
                return Err(DeviceError::$variant { reason: e.to_string() });
            }
        }
    };
    ($text:literal, $call:expr, |$e:ident| $make_err:expr) => {
        match $call {
            Ok(v) => v,
            Err($e) => {
                tracing::error!("SoapySDR: failed to {}: {}", $text, $e);
                return Err($make_err);
            }
        }
    };
}

/// `SdrDevice` backed by the `soapysdr` crate. Everything SDR-specific
/// (USB transport, driver quirks, sample format conversion) lives inside the
/// crate; this wrapper only shapes that surface to the sweep pipeline's
/// needs.
pub struct SoapySdrDevice {
    channel: usize,
    dev: Option<soapysdr::Device>,
    rx: Option<soapysdr::RxStream<ComplexSample>>,
    freq_hz: f64,
    streaming: bool,
    overflow_count: u64,
}

impl SoapySdrDevice {
    pub fn new() -> Self {
        SoapySdrDevice {
            channel: 0,
            dev: None,
            rx: None,
            freq_hz: 0.0,
            streaming: false,
            overflow_count: 0,
        }
    }

    fn dev(&self) -> &soapysdr::Device {
        self.dev.as_ref().expect("device not open")
    }
}

impl Default for SoapySdrDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SdrDevice for SoapySdrDevice {
    fn open(&mut self, args: &str, channel: usize) -> Result<(), DeviceError> {
        self.channel = channel;
        let dev = soapycheck!("open SoapySDR device", soapysdr::Device::new(args), OpenFailed);

        let driver_key = dev.driver_key().unwrap_or_default();
        let hardware_key = dev.hardware_key().unwrap_or_default();
        tracing::info!(driver = %driver_key, hardware = %hardware_key, "opened SoapySDR device");

        self.dev = Some(dev);
        Ok(())
    }

    fn set_sample_rate(&mut self, rate_hz: f64, force: bool) -> Result<f64, DeviceError> {
        let dev = self.dev();
        soapycheck!(
            "set RX sample rate",
            dev.set_sample_rate(soapysdr::Direction::Rx, self.channel, rate_hz),
            StreamSetupFailed
        );
        if force {
            return Ok(rate_hz);
        }
        let actual = soapycheck!(
            "get RX sample rate",
            dev.sample_rate(soapysdr::Direction::Rx, self.channel),
            StreamSetupFailed
        );
        Ok(actual)
    }

    fn set_bandwidth(&mut self, bw_hz: f64, _force: bool) -> Result<(), DeviceError> {
        let dev = self.dev();
        soapycheck!(
            "set RX bandwidth",
            dev.set_bandwidth(soapysdr::Direction::Rx, self.channel, bw_hz),
            StreamSetupFailed
        );
        Ok(())
    }

    fn set_gain(&mut self, gain_db: Option<f64>, auto_gain: bool) -> Result<(), DeviceError> {
        let dev = self.dev();
        if auto_gain {
            soapycheck!(
                "enable RX gain mode",
                dev.set_gain_mode(soapysdr::Direction::Rx, self.channel, true),
                StreamSetupFailed
            );
        } else if let Some(gain) = gain_db {
            soapycheck!(
                "set RX gain",
                dev.set_gain(soapysdr::Direction::Rx, self.channel, gain),
                StreamSetupFailed
            );
        }
        Ok(())
    }

    fn set_antenna(&mut self, antenna: Option<&str>) -> Result<(), DeviceError> {
        if let Some(ant) = antenna {
            let dev = self.dev();
            soapycheck!(
                "set RX antenna",
                dev.set_antenna(soapysdr::Direction::Rx, self.channel, ant),
                StreamSetupFailed
            );
        }
        Ok(())
    }

    fn set_setting(&mut self, key: &str, value: &str) -> Result<(), DeviceError> {
        let dev = self.dev();
        soapycheck!(
            "apply driver setting",
            dev.write_setting(key, value),
            StreamSetupFailed
        );
        Ok(())
    }

    fn set_frequency(&mut self, freq_hz: f64) -> Result<(), DeviceError> {
        let dev = self.dev();
        soapycheck!(
            "set RX center frequency",
            dev.set_frequency(soapysdr::Direction::Rx, self.channel, freq_hz, soapysdr::Args::new()),
            |e| DeviceError::TuneFailed { freq_hz, reason: e.to_string() }
        );
        self.freq_hz = freq_hz;
        Ok(())
    }

    fn frequency(&self) -> f64 {
        self.freq_hz
    }

    fn start_stream(&mut self) -> Result<(), DeviceError> {
        let dev = self.dev.as_ref().expect("device not open");
        let rx = soapycheck!(
            "set up RX stream",
            dev.rx_stream::<ComplexSample>(&[self.channel]),
            StreamSetupFailed
        );
        self.rx = Some(rx);
        Ok(())
    }

    fn stop_stream(&mut self) -> Result<(), DeviceError> {
        self.deactivate_stream()?;
        self.rx = None;
        Ok(())
    }

    fn activate_stream(&mut self) -> Result<(), DeviceError> {
        if let Some(rx) = &mut self.rx {
            soapycheck!("activate RX stream", rx.activate(None), StreamActivateFailed);
            self.streaming = true;
        }
        Ok(())
    }

    fn deactivate_stream(&mut self) -> Result<(), DeviceError> {
        if let Some(rx) = &mut self.rx {
            soapycheck!("deactivate RX stream", rx.deactivate(None), StreamDeactivateFailed);
            self.streaming = false;
        }
        Ok(())
    }

    fn is_streaming(&self) -> bool {
        self.streaming
    }

    fn read_stream(&mut self, buf: &mut [ComplexSample]) -> Result<usize, DeviceError> {
        let rx = self.rx.as_mut().ok_or_else(|| DeviceError::ReadFailed {
            reason: "stream not started".to_string(),
        })?;
        match rx.read(&mut [buf], 1_000_000) {
            Ok(len) => Ok(len),
            Err(e) => {
                if e.to_string().to_lowercase().contains("overflow") {
                    self.overflow_count += 1;
                    tracing::debug!(total = self.overflow_count, "USB overflow, continuing");
                    Ok(0)
                } else {
                    Err(DeviceError::ReadFailed { reason: e.to_string() })
                }
            }
        }
    }

    fn overflow_count(&self) -> u64 {
        self.overflow_count
    }
}
