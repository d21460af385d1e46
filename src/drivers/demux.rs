//! Scan-major interleaving helpers.
//!
//! A two-channel scan buffer is laid out as `[a0, b0, a1, b1, ...]`. Splitting
//! keeps sample order within each channel and never mixes channels.
use crate::drivers::SkewError;

/// Split a scan-major buffer of length `2 * chunk_len` into its two channels.
pub fn deinterleave(scan: &[f64], chunk_len: usize) -> Result<(Vec<f64>, Vec<f64>), SkewError> {
    let mut a = vec![0.0; chunk_len];
    let mut b = vec![0.0; chunk_len];
    deinterleave_into(scan, &mut a, &mut b)?;
    Ok((a, b))
}

/// Split into caller-owned buffers; both must already be `scan.len() / 2` long.
pub fn deinterleave_into(scan: &[f64], a: &mut [f64], b: &mut [f64]) -> Result<(), SkewError> {
    if a.len() != b.len() {
        return Err(SkewError::ChannelLengthMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    let expected = 2 * a.len();
    if scan.len() != expected {
        return Err(SkewError::InterleavedLength {
            expected,
            actual: scan.len(),
        });
    }
    for ((pair, dst_a), dst_b) in scan.chunks_exact(2).zip(a.iter_mut()).zip(b.iter_mut()) {
        *dst_a = pair[0];
        *dst_b = pair[1];
    }
    Ok(())
}

/// Inverse of [`deinterleave`].
pub fn interleave(a: &[f64], b: &[f64]) -> Result<Vec<f64>, SkewError> {
    if a.len() != b.len() {
        return Err(SkewError::ChannelLengthMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    let mut scan = Vec::with_capacity(a.len() * 2);
    for (&x, &y) in a.iter().zip(b) {
        scan.push(x);
        scan.push(y);
    }
    Ok(scan)
}
