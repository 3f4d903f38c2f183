//! Min-max normalization bound to a single forecasting run.
//!
//! `MinMaxScaler::fit_transform` is the only way to obtain a `FittedScaler`,
//! and the fitted value is neither `Clone` nor `Default`. Whatever scaled the
//! training windows is therefore the exact value that scales the prediction
//! input and inverts the model output; a run cannot borrow bounds fitted on
//! another symbol.

/// Stateless entry point that fits bounds into `[0, 1]`.
pub struct MinMaxScaler;

impl MinMaxScaler {
    /// Fit bounds over the whole series and return it rescaled into `[0, 1]`.
    ///
    /// Returns `None` for an empty or non-finite series.
    pub fn fit_transform(values: &[f64]) -> Option<(FittedScaler, Vec<f64>)> {
        let scaler = FittedScaler::fit(values)?;
        let scaled = scaler.transform(values);
        Some((scaler, scaled))
    }
}

/// Bounds fitted on one price series.
#[derive(Debug, PartialEq)]
pub struct FittedScaler {
    min: f64,
    max: f64,
    range: f64,
}

impl FittedScaler {
    fn fit(values: &[f64]) -> Option<Self> {
        if values.is_empty() || values.iter().any(|v| !v.is_finite()) {
            return None;
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        // A flat series maps to 0 rather than dividing by zero.
        let range = if max - min == 0.0 { 1.0 } else { max - min };

        Some(Self { min, max, range })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Scale new values with the fitted bounds. Values outside the fitted
    /// range land outside `[0, 1]`; they are not clipped.
    pub fn transform(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|v| (v - self.min) / self.range).collect()
    }

    pub fn inverse_transform(&self, scaled: &[f64]) -> Vec<f64> {
        scaled.iter().map(|v| v * self.range + self.min).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_transform_bounds() {
        let (scaler, scaled) = MinMaxScaler::fit_transform(&[10.0, 20.0, 15.0, 30.0]).unwrap();

        assert_eq!(scaler.min(), 10.0);
        assert_eq!(scaler.max(), 30.0);
        assert_eq!(scaled, vec![0.0, 0.5, 0.25, 1.0]);
    }

    #[test]
    fn test_round_trip() {
        let series: Vec<f64> = (0..250)
            .map(|i| 1500.0 + 80.0 * (i as f64 * 0.13).sin() + i as f64 * 0.7)
            .collect();

        let (scaler, scaled) = MinMaxScaler::fit_transform(&series).unwrap();
        assert!(scaled.iter().all(|v| (0.0..=1.0).contains(v)));

        let restored = scaler.inverse_transform(&scaled);
        for (a, b) in series.iter().zip(&restored) {
            assert!((a - b).abs() < 1e-9, "{a} != {b}");
        }
    }

    #[test]
    fn test_flat_series() {
        let (scaler, scaled) = MinMaxScaler::fit_transform(&[42.0; 5]).unwrap();
        assert!(scaled.iter().all(|&v| v == 0.0));
        assert_eq!(scaler.inverse_transform(&scaled), vec![42.0; 5]);
    }

    #[test]
    fn test_rejects_empty_and_nan() {
        assert!(MinMaxScaler::fit_transform(&[]).is_none());
        assert!(MinMaxScaler::fit_transform(&[1.0, f64::NAN]).is_none());
    }

    #[test]
    fn test_transform_uses_fitted_bounds() {
        let (scaler, _) = MinMaxScaler::fit_transform(&[0.0, 100.0]).unwrap();
        assert_eq!(scaler.transform(&[50.0, 150.0]), vec![0.5, 1.5]);
    }
}
