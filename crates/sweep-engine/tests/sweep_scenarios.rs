use std::net::UdpSocket;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sweep_config::{DetectionMagnitude, DeviceConfig, SharedConfig, SinkConfig, SweepConfig};
use sweep_core::{ComplexSample, DeviceError};
use sweep_engine::{SdrDevice, SweepController};

/// A scripted in-memory device: returns complex samples from a queue of
/// pre-built acquisitions, one hop at a time, and reports the frequency it
/// was last tuned to. Mirrors driving an entity against a fake collaborator
/// rather than real hardware.
struct FakeDevice {
    freq_hz: f64,
    streaming: bool,
    acquisitions: Arc<Mutex<Vec<Vec<ComplexSample>>>>,
}

impl FakeDevice {
    fn new(acquisitions: Vec<Vec<ComplexSample>>) -> Self {
        FakeDevice { freq_hz: 0.0, streaming: false, acquisitions: Arc::new(Mutex::new(acquisitions)) }
    }
}

impl SdrDevice for FakeDevice {
    fn open(&mut self, _args: &str, _channel: usize) -> Result<(), DeviceError> {
        Ok(())
    }
    fn set_sample_rate(&mut self, rate_hz: f64, _force: bool) -> Result<f64, DeviceError> {
        Ok(rate_hz)
    }
    fn set_bandwidth(&mut self, _bw_hz: f64, _force: bool) -> Result<(), DeviceError> {
        Ok(())
    }
    fn set_gain(&mut self, _gain_db: Option<f64>, _auto_gain: bool) -> Result<(), DeviceError> {
        Ok(())
    }
    fn set_antenna(&mut self, _antenna: Option<&str>) -> Result<(), DeviceError> {
        Ok(())
    }
    fn set_setting(&mut self, _key: &str, _value: &str) -> Result<(), DeviceError> {
        Ok(())
    }
    fn set_frequency(&mut self, freq_hz: f64) -> Result<(), DeviceError> {
        self.freq_hz = freq_hz;
        Ok(())
    }
    fn frequency(&self) -> f64 {
        self.freq_hz
    }
    fn start_stream(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }
    fn stop_stream(&mut self) -> Result<(), DeviceError> {
        self.streaming = false;
        Ok(())
    }
    fn activate_stream(&mut self) -> Result<(), DeviceError> {
        self.streaming = true;
        Ok(())
    }
    fn deactivate_stream(&mut self) -> Result<(), DeviceError> {
        self.streaming = false;
        Ok(())
    }
    fn is_streaming(&self) -> bool {
        self.streaming
    }
    fn read_stream(&mut self, buf: &mut [ComplexSample]) -> Result<usize, DeviceError> {
        let mut acquisitions = self.acquisitions.lock().unwrap();
        if acquisitions.is_empty() {
            buf.fill(ComplexSample::new(0.0, 0.0));
            return Ok(buf.len());
        }
        let next = acquisitions.remove(0);
        let n = next.len().min(buf.len());
        buf[..n].copy_from_slice(&next[..n]);
        Ok(n)
    }
    fn overflow_count(&self) -> u64 {
        0
    }
}

/// Low, constant-amplitude filler: well under the adaptive threshold once it
/// has settled on this noise floor, so it never forms a spurious burst.
fn noise(n: usize) -> Vec<ComplexSample> {
    vec![ComplexSample::new(5.0, 0.0); n]
}

fn base_sweep_config(bins: u32) -> SweepConfig {
    SweepConfig {
        min_freq: 100e6,
        max_freq: 100e6 + 1.0,
        bins,
        repeats: 1,
        threshold_dbm: -60.0,
        detection_magnitude: DetectionMagnitude::AlgebraicSum,
        base_buffer_size: 16384,
        max_buffer_size: 0,
        max_threads: 1,
        max_queue_size: 2,
        ..Default::default()
    }
}

/// S1: single hop, noise-only input yields no UDP datagram.
#[test]
fn single_hop_noise_only_sends_nothing() {
    let recv_socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    recv_socket.set_read_timeout(Some(Duration::from_millis(200))).ok();
    let port = recv_socket.local_addr().unwrap().port();

    let sweep = SweepConfig { runs: 1, ..base_sweep_config(16384) };
    let shared = SharedConfig::new(
        DeviceConfig::default(),
        sweep,
        SinkConfig { host: "127.0.0.1".to_string(), port },
    );

    let device = FakeDevice::new(vec![noise(16384)]);
    let shutdown = Arc::new(AtomicBool::new(false));
    let mut controller = SweepController::new(device, shared, shutdown);
    controller.run().expect("sweep should complete without error");

    let mut buf = [0u8; 4096];
    let result = recv_socket.recv(&mut buf);
    assert!(result.is_err(), "expected no datagram for a noise-only hop");
}

/// S2: single hop with an injected tone yields exactly one measurement with
/// the expected frequency and a non-trivial duration.
#[test]
fn single_hop_with_tone_sends_one_measurement() {
    let recv_socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    recv_socket.set_read_timeout(Some(Duration::from_secs(2))).ok();
    let port = recv_socket.local_addr().unwrap().port();

    // A modest bin count keeps the detected burst (tone span plus the
    // detector's safe margin) comfortably wider than one FFT segment.
    let sweep = SweepConfig { runs: 1, ..base_sweep_config(256) };
    let shared = SharedConfig::new(
        DeviceConfig { sample_rate: 2_000_000.0, ..Default::default() },
        sweep,
        SinkConfig { host: "127.0.0.1".to_string(), port },
    );

    let mut samples = noise(16384);
    for s in samples.iter_mut().skip(5000).take(600) {
        *s = ComplexSample::new(1.0e7, 1.0e7);
    }

    let device = FakeDevice::new(vec![samples]);
    let shutdown = Arc::new(AtomicBool::new(false));
    let mut controller = SweepController::new(device, shared, shutdown);
    controller.run().expect("sweep should complete without error");

    let mut buf = [0u8; 8192];
    let (n, _) = recv_socket.recv_from(&mut buf).expect("expected one datagram for the injected burst");
    let text = String::from_utf8_lossy(&buf[..n]);
    assert!(text.contains("\"frequencyMHz\""));
    assert!(text.contains("\"durationMs\""));

    // No second datagram should follow within the run.
    recv_socket.set_read_timeout(Some(Duration::from_millis(200))).ok();
    let mut buf2 = [0u8; 8192];
    assert!(recv_socket.recv(&mut buf2).is_err(), "expected exactly one datagram");
}

/// S5: signalling shutdown stops the sweep promptly without hanging the
/// drain phase.
#[test]
fn shutdown_flag_stops_the_sweep() {
    let recv_socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    let port = recv_socket.local_addr().unwrap().port();

    // runs = 0 (infinite) with shutdown already signalled before the first hop.
    let sweep = SweepConfig { runs: 0, ..base_sweep_config(16384) };
    let shared = SharedConfig::new(
        DeviceConfig::default(),
        sweep,
        SinkConfig { host: "127.0.0.1".to_string(), port },
    );

    let device = FakeDevice::new(vec![noise(16384); 4]);
    let shutdown = Arc::new(AtomicBool::new(true));
    let mut controller = SweepController::new(device, shared, shutdown);
    controller.run().expect("sweep should drain and return promptly");
}
