/// Percentage of `part` in `whole`, rounded to the nearest integer. Zero when `whole` is zero.
pub fn percent(part: u32, whole: u32) -> u32 {
    match whole {
        0 => 0,
        w => ((part as f64 / w as f64) * 100.0).round() as u32,
    }
}

/// Fraction of `part` in `whole`, or `None` for an empty whole.
pub fn ratio(part: u32, whole: u32) -> Option<f64> {
    match whole {
        positive if positive > 0 => Some(part as f64 / positive as f64),
        _ => None,
    }
}
