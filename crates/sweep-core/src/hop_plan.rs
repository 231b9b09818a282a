//! Frequency-hop planning (C1) and sample-buffer sizing (C2).

/// Rounds `freq` to the nearest multiple of `bin_size`.
pub fn nearest_freq(freq: f64, bin_size: f64) -> f64 {
    (freq / bin_size).round() * bin_size
}

/// Rounds a bin count to the nearest even integer, or to the nearest power of
/// two, depending on which shape the caller needs.
pub fn nearest_bins(bins: u32, even: bool, pow2: bool) -> u32 {
    if pow2 {
        2u32.pow((bins as f64).log2().round() as u32)
    } else if even {
        (((bins as f64) / 2.0).round() as u32) * 2
    } else {
        bins
    }
}

/// Adjusts `overlap` so that the cropped bin count (`bins * (1 - overlap)`)
/// is even.
pub fn nearest_overlap(overlap: f64, bins: u32) -> f64 {
    let mut bins_crop = (bins as f64 * (1.0 - overlap)).round() as i64;
    if bins_crop % 2 != 0 {
        bins_crop -= 1;
    }
    1.0 - (bins_crop as f64 / bins as f64)
}

/// Number of bins of a given width needed to span `sample_rate`.
pub fn bin_size_to_bins(bin_size: f64, sample_rate: f64) -> u32 {
    (sample_rate / bin_size).round() as u32
}

/// Width, in Hz, of a single bin when `sample_rate` is split into `bins` bins.
pub fn bins_to_bin_size(bins: u32, sample_rate: f64) -> f64 {
    sample_rate / bins as f64
}

/// Converts an integration time (seconds) to the nearest whole repeat count.
pub fn time_to_repeats(time_s: f64, bins: u32, sample_rate: f64) -> u32 {
    (time_s * sample_rate / bins as f64).round() as u32
}

/// Converts a repeat count back to the integration time (seconds) it spans.
pub fn repeats_to_time(repeats: u32, bins: u32, sample_rate: f64) -> f64 {
    repeats as f64 * bins as f64 / sample_rate
}

/// An ordered list of centre frequencies (Hz) to retune across, plus the
/// derived bin geometry used by the PSD engine and measurement reducer.
#[derive(Debug, Clone, PartialEq)]
pub struct HopPlan {
    pub centre_freqs: Vec<f64>,
    pub bin_size: f64,
    pub bins_crop: u32,
    pub sample_rate_crop: f64,
    pub hop_size: f64,
    pub hopping: bool,
}

impl HopPlan {
    /// Builds the hop plan for a sweep from `min_freq..max_freq` using
    /// `bins` FFT bins per hop at `sample_rate`, dropping `overlap` of the
    /// bins at each edge when sizing the cropped, effective hop span.
    pub fn new(min_freq: f64, max_freq: f64, bins: u32, overlap: f64, sample_rate: f64) -> HopPlan {
        let bin_size = sample_rate / bins as f64;
        let mut bins_crop = (bins as f64 * (1.0 - overlap)).round() as i64;
        if bins_crop % 2 != 0 {
            bins_crop -= 1;
        }
        let bins_crop = bins_crop as u32;
        let sample_rate_crop = bins_crop as f64 * bin_size;

        let range = max_freq - min_freq;
        if range <= sample_rate_crop {
            HopPlan {
                centre_freqs: vec![min_freq + range / 2.0],
                bin_size,
                bins_crop,
                sample_rate_crop,
                hop_size: sample_rate_crop,
                hopping: false,
            }
        } else {
            let hop_size = nearest_freq(sample_rate_crop, bin_size);
            let hops = (range / hop_size).ceil() as u32;
            let centre_freqs = (0..hops)
                .map(|i| min_freq + hop_size / 2.0 + i as f64 * hop_size)
                .collect();
            HopPlan {
                centre_freqs,
                bin_size,
                bins_crop,
                sample_rate_crop,
                hop_size,
                hopping: true,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.centre_freqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centre_freqs.is_empty()
    }
}

/// Derived sample-buffer capacity and per-hop acquisition repeat count (C2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSizing {
    pub buffer_size: usize,
    pub buffer_repeats: usize,
}

impl BufferSizing {
    /// `bins * repeats` samples are needed per hop; `buffer_size` is rounded
    /// up to a multiple of `base_buffer_size` and clamped to
    /// `max_buffer_size` (0 = unlimited), splitting the shortfall across
    /// `buffer_repeats` acquisitions when clamped.
    pub fn new(bins: u32, repeats: u32, base_buffer_size: usize, max_buffer_size: usize) -> BufferSizing {
        let required = bins as usize * repeats as usize;
        let base = base_buffer_size.max(1);
        let mut buffer_size = required.div_ceil(base) * base;

        if max_buffer_size == 0 {
            return BufferSizing { buffer_size, buffer_repeats: 1 };
        }

        let aligned_max = (max_buffer_size / base) * base;
        let aligned_max = aligned_max.max(base);
        if buffer_size > aligned_max {
            let buffer_repeats = buffer_size.div_ceil(aligned_max);
            buffer_size = aligned_max;
            BufferSizing { buffer_size, buffer_repeats }
        } else {
            BufferSizing { buffer_size, buffer_repeats: 1 }
        }
    }
}
