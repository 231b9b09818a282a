use std::fmt;

/// Errors raised by the device abstraction boundary (the `SdrDevice` trait).
#[derive(Debug, PartialEq)]
pub enum DeviceError {
    OpenFailed { reason: String },
    TuneFailed { freq_hz: f64, reason: String },
    StreamSetupFailed { reason: String },
    StreamActivateFailed { reason: String },
    StreamDeactivateFailed { reason: String },
    ReadFailed { reason: String },
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::OpenFailed { reason } => write!(f, "failed to open device: {reason}"),
            DeviceError::TuneFailed { freq_hz, reason } => {
                write!(f, "failed to tune to {freq_hz} Hz: {reason}")
            }
            DeviceError::StreamSetupFailed { reason } => {
                write!(f, "failed to set up sample stream: {reason}")
            }
            DeviceError::StreamActivateFailed { reason } => {
                write!(f, "failed to activate sample stream: {reason}")
            }
            DeviceError::StreamDeactivateFailed { reason } => {
                write!(f, "failed to deactivate sample stream: {reason}")
            }
            DeviceError::ReadFailed { reason } => write!(f, "stream read failed: {reason}"),
        }
    }
}

impl std::error::Error for DeviceError {}

/// Top-level error taxonomy for the sweep pipeline (fatal variants only;
/// transient conditions such as USB overflows or below-threshold bursts are
/// absorbed at the component boundary and never surface as a `SweepError`).
#[derive(Debug)]
pub enum SweepError {
    Config { reason: String },
    Device(DeviceError),
}

impl fmt::Display for SweepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepError::Config { reason } => write!(f, "invalid configuration: {reason}"),
            SweepError::Device(e) => write!(f, "device error: {e}"),
        }
    }
}

impl std::error::Error for SweepError {}

impl From<DeviceError> for SweepError {
    fn from(e: DeviceError) -> Self {
        SweepError::Device(e)
    }
}
