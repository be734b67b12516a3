//! Utility functions.

/// Seed libtorch's global generator (parameter init, initial hidden state,
/// action sampling). Task sampling is seeded separately by the caller.
pub fn set_seed(seed: u64) {
    #[cfg(feature = "torch")]
    tch::manual_seed(seed as i64);
    #[cfg(not(feature = "torch"))]
    let _ = seed;
}

/// Format duration in human-readable form
pub fn format_duration(seconds: f64) -> String {
    if seconds < 0.0 {
        return "0s".to_string();
    }

    let secs = seconds as u64;
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;

    if h > 0 {
        format!("{}h {}m {}s", h, m, s)
    } else if m > 0 {
        format!("{}m {}s", m, s)
    } else if seconds < 1.0 {
        format!("{}ms", (seconds * 1000.0) as u64)
    } else {
        format!("{}s", s)
    }
}

/// Mean of a slice, `None` when empty
pub fn mean(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f32>() / values.len() as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.25), "250ms");
        assert_eq!(format_duration(30.0), "30s");
        assert_eq!(format_duration(90.0), "1m 30s");
        assert_eq!(format_duration(3661.0), "1h 1m 1s");
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
    }
}
