//! Heuristic completion estimate.
//!
//! The true answer length is never known, so progress is guessed: from the
//! buffer length against an assumed total while no sections exist, from the
//! section count against an expected total once some do. Both paths are
//! capped below 100; only finalization reports 100. This value is UX
//! feedback, never a correctness signal.

use crate::config::SessionConfig;

/// Cap for the buffer-length heuristic.
const BUFFER_CAP: usize = 90;
/// Cap for the section-count heuristic.
const SECTION_CAP: usize = 95;

/// Estimates completion in percent from buffer size and sections found.
pub fn estimate(buffer_len: usize, section_count: usize, config: &SessionConfig) -> u8 {
    let percent = if section_count > 0 {
        let expected = config.expected_section_count.max(1);
        (section_count * 100 / expected).min(SECTION_CAP)
    } else {
        let assumed = config.assumed_total_len.max(1);
        (buffer_len * 100 / assumed).min(BUFFER_CAP)
    };
    percent as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_path_caps_at_90() {
        let config = SessionConfig::default();
        assert_eq!(estimate(0, 0, &config), 0);
        assert_eq!(estimate(config.assumed_total_len / 2, 0, &config), 50);
        assert_eq!(estimate(config.assumed_total_len * 10, 0, &config), 90);
    }

    #[test]
    fn test_section_path_caps_at_95() {
        let config = SessionConfig::default();
        assert_eq!(estimate(0, 1, &config), 20);
        assert_eq!(estimate(0, 100, &config), 95);
    }

    #[test]
    fn test_section_path_takes_over_once_sections_exist() {
        let config = SessionConfig::default();
        // A tiny buffer with one section uses the section heuristic.
        assert_eq!(estimate(1, 1, &config), 20);
    }

    #[test]
    fn test_degenerate_config_does_not_divide_by_zero() {
        let config = SessionConfig {
            assumed_total_len: 0,
            expected_section_count: 0,
            ..SessionConfig::default()
        };
        assert_eq!(estimate(10, 0, &config), 90);
        assert_eq!(estimate(10, 3, &config), 95);
    }
}
