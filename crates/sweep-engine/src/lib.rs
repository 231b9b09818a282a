//! Sweep engine: device I/O, burst detection, PSD compute, measurement
//! reduction, UDP emission and the controller that orchestrates them.

pub mod burst_detector;
pub mod controller;
pub mod device;
pub mod psd;
pub mod reducer;
pub mod sink;
pub mod soapy_device;

pub use burst_detector::BurstDetector;
pub use controller::SweepController;
pub use device::SdrDevice;
pub use psd::{welch_psd, PsdEngine, PsdHandle};
pub use sink::UdpSink;
pub use soapy_device::SoapySdrDevice;
