//! Feature extraction for raw traffic payloads.
//!
//! Entropy is base-2 Shannon entropy over a 256-bucket byte histogram,
//! normalized against the 8-bit maximum so the classifier sees a stable
//! [0, 1] threshold space regardless of the observed alphabet size.

/// Derived per-observation features. Ephemeral: computed, classified, dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub entropy: f64,
    pub bytes: u64,
    pub rate: f64,
}

/// Build the feature vector for one raw payload.
pub fn extract(payload: &[u8], rate: f64, bytes: u64) -> FeatureVector {
    FeatureVector {
        entropy: shannon_entropy(payload),
        bytes,
        rate,
    }
}

/// Normalized Shannon entropy of a byte sequence.
///
/// Empty input yields exactly 0.0; the result is clamped to [0, 1].
pub fn shannon_entropy(payload: &[u8]) -> f64 {
    if payload.is_empty() {
        return 0.0;
    }

    let mut counts = [0u64; 256];
    for &b in payload {
        counts[b as usize] += 1;
    }

    let total = payload.len() as f64;
    let mut entropy = 0.0;
    for &count in counts.iter() {
        if count > 0 {
            let p = count as f64 / total;
            entropy -= p * p.log2();
        }
    }

    (entropy / 8.0).clamp(0.0, 1.0)
}
