use std::f64::consts::PI;

/// Analysis windows selectable via `SweepConfig::fft_window`.
pub fn window(name: &str, n: usize) -> Vec<f32> {
    match name {
        "hamming" => (0..n)
            .map(|i| (0.54 - 0.46 * (2.0 * PI * i as f64 / (n - 1) as f64).cos()) as f32)
            .collect(),
        "rectangular" | "none" => vec![1.0; n],
        // "hann" and any unrecognised name fall back to Hann, the default.
        _ => (0..n)
            .map(|i| (0.5 * (1.0 - (2.0 * PI * i as f64 / n as f64).cos())) as f32)
            .collect(),
    }
}
