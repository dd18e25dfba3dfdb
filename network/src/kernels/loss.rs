use device::{ensure_len, Device, DeviceError};
use rayon::prelude::*;

use super::ensure_rows;

pub const CLAMP_EPSILON: f32 = 1e-7;

/// Output-layer error signal for prediction `p` and target `y`.
///
/// Combines the cross-entropy derivative with the sigmoid derivative. The
/// clamp on `p(1-p)` keeps the division finite at `p = 0` and `p = 1`.
#[inline(always)]
pub fn output_error_value(p: f32, y: f32) -> f32 {
    let slope = p * (1.0 - p);
    ((y - p) / slope.clamp(CLAMP_EPSILON, 1.0 - CLAMP_EPSILON)) * slope
}

/// Binary cross-entropy of a single output, with `p` clamped away from 0 and 1.
#[inline(always)]
pub fn binary_cross_entropy(p: f32, y: f32) -> f32 {
    let p = p.clamp(CLAMP_EPSILON, 1.0 - CLAMP_EPSILON);
    -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
}

/// Writes the error signal of `rows` samples from predictions and one-hot
/// labels. All three buffers use the output layer's width.
pub fn output_error(
    device: &Device,
    predictions: &[f32],
    labels: &[u8],
    errors: &mut [f32],
    width: usize,
    rows: usize,
) -> Result<(), DeviceError> {
    const KERNEL: &str = "output_error";
    ensure_rows(KERNEL, rows)?;
    let len = rows * width;
    ensure_len(KERNEL, "predictions", predictions.len(), len)?;
    ensure_len(KERNEL, "labels", labels.len(), len)?;
    ensure_len(KERNEL, "errors", errors.len(), len)?;

    let errors = &mut errors[..len];
    device.launch(KERNEL, len, || {
        errors
            .par_iter_mut()
            .zip(predictions[..len].par_iter())
            .zip(labels[..len].par_iter())
            .for_each(|((e, &p), &y)| *e = output_error_value(p, y as f32));
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use device::DeviceConfig;

    #[test]
    fn test_error_finite_over_unit_interval() {
        for i in 0..=1000 {
            let p = i as f32 / 1000.0;
            for y in [0.0, 1.0] {
                let e = output_error_value(p, y);
                assert!(e.is_finite(), "p={} y={} -> {}", p, y, e);
            }
        }
        assert_eq!(output_error_value(1.0, 1.0), 0.0);
        assert_eq!(output_error_value(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_error_is_target_minus_prediction_inside_clamp() {
        let e = output_error_value(0.3, 1.0);
        assert!((e - 0.7).abs() < 1e-6);

        let e = output_error_value(0.8, 0.0);
        assert!((e + 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_cross_entropy() {
        assert!((binary_cross_entropy(0.5, 1.0) - std::f32::consts::LN_2).abs() < 1e-6);
        assert!(binary_cross_entropy(0.0, 1.0).is_finite());
        assert!(binary_cross_entropy(1.0, 0.0).is_finite());
        assert!(binary_cross_entropy(0.99, 1.0) < binary_cross_entropy(0.6, 1.0));
    }

    #[test]
    fn test_kernel_writes_only_batch_rows() {
        let device = Device::new(DeviceConfig::default()).unwrap();
        let predictions = [0.2, 0.9, 0.6, 0.1, 0.5, 0.5];
        let labels = [0, 1, 1, 0, 1, 0];
        let mut errors = [9.0; 6];

        output_error(&device, &predictions, &labels, &mut errors, 2, 2).unwrap();

        let expected = [-0.2, 0.1, 0.4, -0.1];
        for (e, x) in errors.iter().zip(expected) {
            assert!((e - x).abs() < 1e-6);
        }
        assert_eq!(&errors[4..], &[9.0, 9.0]);
    }

    #[test]
    fn test_kernel_rejects_short_labels() {
        let device = Device::new(DeviceConfig::default()).unwrap();
        let mut errors = [0.0; 4];

        let err = output_error(&device, &[0.5; 4], &[0, 1], &mut errors, 2, 2).unwrap_err();
        assert_eq!(err.operation(), "output_error");
    }
}
