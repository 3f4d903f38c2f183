use ndarray::{Array2, Array3};
use thiserror::Error;

pub const DEFAULT_INPUT_LEN: usize = 60;
pub const DEFAULT_OUTPUT_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WindowingError {
    #[error("need at least {required} observations to build a window, got {available}")]
    InsufficientHistory { required: usize, available: usize },

    #[error("window lengths must be non-zero")]
    ZeroLength,
}

/// One training example: `input_len` scaled closes followed by the next
/// `output_len` scaled closes.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledWindow {
    pub input: Vec<f64>,
    pub target: Vec<f64>,
}

/// Minimum series length that yields at least one window.
pub fn min_observations(input_len: usize, output_len: usize) -> usize {
    input_len + output_len
}

/// Slide a stride-1 window across an already scaled series.
///
/// For a series of length `L` this yields `L - input_len - output_len + 1`
/// overlapping windows, start indices `0..=L - input_len - output_len`.
pub fn build_windows(
    scaled: &[f64],
    input_len: usize,
    output_len: usize,
) -> Result<Vec<ScaledWindow>, WindowingError> {
    if input_len == 0 || output_len == 0 {
        return Err(WindowingError::ZeroLength);
    }

    let required = min_observations(input_len, output_len);
    if scaled.len() < required {
        return Err(WindowingError::InsufficientHistory {
            required,
            available: scaled.len(),
        });
    }

    Ok(scaled
        .windows(required)
        .map(|w| ScaledWindow {
            input: w[..input_len].to_vec(),
            target: w[input_len..].to_vec(),
        })
        .collect())
}

/// Stack windows into model tensors: inputs `[samples, input_len, 1]`,
/// targets `[samples, output_len]`.
pub fn to_tensors(windows: &[ScaledWindow]) -> (Array3<f64>, Array2<f64>) {
    let samples = windows.len();
    let input_len = windows.first().map_or(0, |w| w.input.len());
    let output_len = windows.first().map_or(0, |w| w.target.len());

    let x = Array3::from_shape_fn((samples, input_len, 1), |(i, t, _)| windows[i].input[t]);
    let y = Array2::from_shape_fn((samples, output_len), |(i, k)| windows[i].target[k]);

    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> Vec<f64> {
        (0..len).map(|i| i as f64).collect()
    }

    #[test]
    fn test_window_count_invariant() {
        for len in [70usize, 71, 100, 500] {
            let windows = build_windows(&ramp(len), 60, 10).unwrap();
            assert_eq!(windows.len(), len - 69);
            assert!(windows.iter().all(|w| w.input.len() == 60 && w.target.len() == 10));
        }
    }

    #[test]
    fn test_window_contents_are_contiguous() {
        let windows = build_windows(&ramp(75), 60, 10).unwrap();

        let first = &windows[0];
        assert_eq!(first.input[0], 0.0);
        assert_eq!(first.input[59], 59.0);
        assert_eq!(first.target, ramp(70)[60..].to_vec());

        let last = windows.last().unwrap();
        assert_eq!(last.input[0], 5.0);
        assert_eq!(last.target[9], 74.0);
    }

    #[test]
    fn test_short_series_is_rejected() {
        let err = build_windows(&ramp(69), 60, 10).unwrap_err();
        assert_eq!(
            err,
            WindowingError::InsufficientHistory {
                required: 70,
                available: 69
            }
        );
        assert_eq!(build_windows(&ramp(10), 0, 10), Err(WindowingError::ZeroLength));
    }

    #[test]
    fn test_to_tensors_shapes() {
        let windows = build_windows(&ramp(80), 60, 10).unwrap();
        let (x, y) = to_tensors(&windows);

        assert_eq!(x.shape(), &[11, 60, 1]);
        assert_eq!(y.shape(), &[11, 10]);
        assert_eq!(x[[3, 0, 0]], 3.0);
        assert_eq!(y[[3, 0]], 63.0);
    }
}
