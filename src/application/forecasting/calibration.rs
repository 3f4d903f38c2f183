use crate::domain::forecast::Calibration;

/// Denominators at or below this magnitude leave the forecast uncalibrated.
pub const MIN_ANCHOR_DENOMINATOR: f64 = 1e-9;

/// Rescale the whole forecast so its first point equals the last known close.
///
/// The single ratio `actual.last / predicted[0]` is applied to every step, so
/// a first prediction far from the anchor shifts later steps proportionally
/// as well.
pub fn anchor_to_last_actual(predicted: &mut [f64], actual: &[f64]) -> Calibration {
    let (Some(&anchor), Some(&first)) = (actual.last(), predicted.first()) else {
        return Calibration::Skipped;
    };

    if !first.is_finite() || !anchor.is_finite() || first.abs() <= MIN_ANCHOR_DENOMINATOR {
        return Calibration::Skipped;
    }

    let factor = anchor / first;
    predicted.iter_mut().for_each(|p| *p *= factor);

    Calibration::Anchored { factor }
}
