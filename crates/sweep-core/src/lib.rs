//! Core types and algorithms for the spectrum sweeper
//!
//! This crate provides the dependency-free domain model shared by the sweep
//! engine and its configuration: sample types, the hop planner and buffer
//! sizer, burst/measurement data, and the error taxonomy.

pub mod burst;
pub mod debug;
pub mod dsp_types;
pub mod error;
pub mod hop_plan;
pub mod measurement;

pub use burst::Burst;
pub use dsp_types::{ComplexSample, RealSample, SampleCount};
pub use error::{DeviceError, SweepError};
pub use hop_plan::{BufferSizing, HopPlan};
pub use measurement::{Measurement, PsdResult};
