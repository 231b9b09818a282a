use sweep_core::{ComplexSample, DeviceError};

/// Capability boundary between the sweep pipeline and a physical radio
/// front-end. Nothing on the other side of this trait is reimplemented here
/// — the shipped implementation (`SoapySdrDevice`) simply drives the
/// `soapysdr` crate through it.
pub trait SdrDevice {
    /// Opens and configures the device from the arguments string
    /// (e.g. `"driver=rtlsdr"`), applying the requested sample rate,
    /// bandwidth, gain and antenna. Returns the sample rate the driver
    /// actually settled on.
    fn open(&mut self, args: &str, channel: usize) -> Result<(), DeviceError>;

    fn set_sample_rate(&mut self, rate_hz: f64, force: bool) -> Result<f64, DeviceError>;
    fn set_bandwidth(&mut self, bw_hz: f64, force: bool) -> Result<(), DeviceError>;
    fn set_gain(&mut self, gain_db: Option<f64>, auto_gain: bool) -> Result<(), DeviceError>;
    fn set_antenna(&mut self, antenna: Option<&str>) -> Result<(), DeviceError>;
    fn set_setting(&mut self, key: &str, value: &str) -> Result<(), DeviceError>;

    fn set_frequency(&mut self, freq_hz: f64) -> Result<(), DeviceError>;
    fn frequency(&self) -> f64;

    fn start_stream(&mut self) -> Result<(), DeviceError>;
    fn stop_stream(&mut self) -> Result<(), DeviceError>;
    fn activate_stream(&mut self) -> Result<(), DeviceError>;
    fn deactivate_stream(&mut self) -> Result<(), DeviceError>;
    fn is_streaming(&self) -> bool;

    /// Blocking read filling as much of `buf` as the driver returns in one
    /// call; returns the number of samples actually written.
    fn read_stream(&mut self, buf: &mut [ComplexSample]) -> Result<usize, DeviceError>;

    /// Count of overflow (dropped-sample) events observed since open.
    fn overflow_count(&self) -> u64;
}
