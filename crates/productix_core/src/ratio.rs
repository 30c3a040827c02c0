/// Divide `numerator` by `denominator`, yielding `0.0` whenever the
/// denominator is zero, negative or not finite.
///
/// Every derived ratio in the crate goes through this helper so a batch with
/// no output or no priced input reports zeros instead of NaN or infinity.
pub fn guarded_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 && denominator.is_finite() && numerator.is_finite() {
        numerator / denominator
    } else {
        0.0
    }
}
