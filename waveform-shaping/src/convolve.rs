//! Direct full convolution.
//!
//! The reference collaborator for the shaping path: output sample `i`
//! matches sample `i` of a natural (unpadded) full convolution, which is the
//! alignment the extractor's timing offsets assume. FFT-based backends can
//! substitute for this as long as they preserve that alignment.

use crate::Real;

pub fn convolve(signal: &[Real], kernel: &[Real]) -> Vec<Real> {
    if signal.is_empty() || kernel.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0.0; signal.len() + kernel.len() - 1];
    for (i, &s) in signal.iter().enumerate() {
        for (j, &k) in kernel.iter().enumerate() {
            out[i + j] += s * k;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn full_convolution_alignment() {
        let out = convolve(&[1.0, 2.0, 3.0], &[1.0, -1.0]);
        assert_eq!(out.len(), 4);
        let expected = [1.0, 1.0, 1.0, -3.0];
        for (o, e) in out.iter().zip(expected) {
            assert_approx_eq!(*o, e, 1e-12);
        }
    }

    #[test]
    fn identity_kernel() {
        let signal = [4.0, -2.5, 0.0, 7.0];
        assert_eq!(convolve(&signal, &[1.0]), signal.to_vec());
    }

    #[test]
    fn empty_inputs() {
        assert!(convolve(&[], &[1.0]).is_empty());
        assert!(convolve(&[1.0], &[]).is_empty());
    }
}
