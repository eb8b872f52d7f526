use rand::Rng;

/// A macro to measure the evaluation time of an expression. Wraps an
/// expression, logs how long it took to evaluate, and evaluates to the value
/// of the expression.
#[macro_export]
macro_rules! timed {
    ($label:expr, $ex:expr) => {
        $crate::timed!($label, log::Level::Debug, $ex)
    };
    ($label:expr, $log_level:expr, $ex:expr) => {{
        let now = std::time::Instant::now();
        let value = $ex;
        let elapsed = now.elapsed();
        log::log!($log_level, "{} took {} ms", $label, elapsed.as_millis());
        value
    }};
}

/// Pick an index from a list of weights, with each index's odds proportional
/// to its weight. Draws `u` from `[0, total)`, then subtracts weights in order
/// until the remainder drops to 0 or below. Zero weights are skipped, so they
/// are never picked while any positive weight is present. If there is no
/// positive weight at all, falls back to a uniform pick. Returns `None` only
/// for an empty list.
pub fn weighted_choice(rng: &mut impl Rng, weights: &[f64]) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }

    let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
    if !(total > 0.0) || !total.is_finite() {
        return Some(rng.gen_range(0..weights.len()));
    }

    let mut remainder = rng.gen_range(0.0..total);
    let mut last_positive = 0;
    for (i, weight) in weights.iter().enumerate() {
        if *weight <= 0.0 {
            continue;
        }
        last_positive = i;
        remainder -= weight;
        if remainder <= 0.0 {
            return Some(i);
        }
    }
    // Float error can leave a hair of remainder after the final subtraction
    Some(last_positive)
}
