//! Utility Module
//!
//! Small helpers shared by the rest of the crate:
//!
//! - [`add_line_numbers`]: source dumps in compile error logs
//! - power-of-two helpers used by texture uploads
//! - [`logging`]: log facade setup for browser builds
//! - [`Clock`]: frame timing for animation loops

mod clock;
pub mod logging;

pub use clock::Clock;

/// Prefixes every line of `text` with its zero-padded, zero-based index.
///
/// ```rust,ignore
/// assert_eq!(add_line_numbers("a\nb"), "00| a\n01| b\n");
/// ```
#[must_use]
pub fn add_line_numbers(text: &str) -> String {
    text.split('\n')
        .enumerate()
        .map(|(index, line)| format!("{index:02}| {line}\n"))
        .collect()
}

#[inline]
#[must_use]
pub fn is_power_of_two(value: u32) -> bool {
    value & value.wrapping_sub(1) == 0
}

/// The power of two closest to `size` on a logarithmic scale.
#[must_use]
pub fn nearest_power_of_two(size: u32) -> u32 {
    if size == 0 {
        return 1;
    }
    let exponent = f64::from(size).log2().round();
    2f64.powf(exponent) as u32
}

#[inline]
#[must_use]
pub fn lerp(min: f32, max: f32, alpha: f32) -> f32 {
    min + (max - min) * alpha
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_numbers_are_zero_padded() {
        assert_eq!(add_line_numbers("a\nb"), "00| a\n01| b\n");
        let long = vec!["x"; 12].join("\n");
        assert!(add_line_numbers(&long).ends_with("11| x\n"));
    }

    #[test]
    fn power_of_two_helpers() {
        assert!(is_power_of_two(256));
        assert!(!is_power_of_two(300));
        assert_eq!(nearest_power_of_two(300), 256);
        assert_eq!(nearest_power_of_two(380), 512);
        assert_eq!(nearest_power_of_two(1), 1);
    }

    #[test]
    fn lerp_midpoint() {
        assert!((lerp(2.0, 4.0, 0.5) - 3.0).abs() < f32::EPSILON);
    }
}
