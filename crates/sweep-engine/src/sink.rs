use std::net::UdpSocket;
use std::thread;

use crossbeam_channel::{bounded, Sender};
use sweep_config::SinkConfig;
use sweep_core::Measurement;

/// UDP measurement sink (C7). A single worker thread drains a bounded queue
/// in submission order so output ordering is preserved; `send` blocks once
/// the queue is full, which is the "UDP sendto" backpressure point the
/// controller's main loop goes through.
pub struct UdpSink {
    tx: Sender<Measurement>,
    _worker: thread::JoinHandle<()>,
}

const QUEUE_SIZE: usize = 100;

impl UdpSink {
    pub fn new(cfg: &SinkConfig) -> std::io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_broadcast(false).ok();
        let addr = format!("{}:{}", cfg.host, cfg.port);

        let (tx, rx) = bounded::<Measurement>(QUEUE_SIZE);
        let worker = thread::spawn(move || {
            let mut seq: u64 = 0;
            while let Ok(measurement) = rx.recv() {
                let payload = measurement.to_json();
                match socket.send_to(payload.as_bytes(), &addr) {
                    Ok(_) => {
                        seq += 1;
                        tracing::debug!(seq, freq_mhz = measurement.frequency_mhz, "sent measurement");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "UDP send failed, dropping measurement");
                    }
                }
            }
        });

        Ok(UdpSink { tx, _worker: worker })
    }

    /// Queues a measurement for emission. Blocks if the queue is full.
    pub fn send(&self, measurement: Measurement) {
        if self.tx.send(measurement).is_err() {
            tracing::error!("UDP sink worker is gone, measurement dropped");
        }
    }

    /// Drops the sender half and waits for the worker to flush its queue.
    pub fn drain(self) {
        drop(self.tx);
        let _ = self._worker.join();
    }
}
