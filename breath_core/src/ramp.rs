//! Per-loop escalation of step counts.
//!
//! Ramped counts grow linearly with the sequence loop:
//! loop 0 is the authored count, each later loop adds `count * (ramp - 1)`.

/// Count for the given loop after applying `ramp`
///
/// A count of 0 (open-ended) and ramps `<= 1` leave the count unchanged.
pub fn effective_count(count: u32, ramp: Option<f64>, loop_index: u32) -> u32 {
    match ramp {
        Some(ramp) if count > 0 && ramp > 1.0 => {
            let scaled = f64::from(count) * (1.0 + f64::from(loop_index) * (ramp - 1.0));
            scaled.round() as u32
        }
        _ => count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_ramp_keeps_count() {
        for loop_index in 0..10 {
            assert_eq!(effective_count(5, None, loop_index), 5);
            assert_eq!(effective_count(5, Some(1.0), loop_index), 5);
            assert_eq!(effective_count(5, Some(0.5), loop_index), 5);
        }
    }

    #[test]
    fn test_first_loop_is_unramped() {
        assert_eq!(effective_count(7, Some(2.0), 0), 7);
        assert_eq!(effective_count(3, Some(1.25), 0), 3);
    }

    #[test]
    fn test_open_ended_never_ramped() {
        for loop_index in 0..10 {
            assert_eq!(effective_count(0, Some(3.0), loop_index), 0);
        }
    }

    #[test]
    fn test_linear_growth() {
        // 10 * (1 + L * 0.5)
        assert_eq!(effective_count(10, Some(1.5), 1), 15);
        assert_eq!(effective_count(10, Some(1.5), 2), 20);
        assert_eq!(effective_count(10, Some(1.5), 3), 25);
    }

    #[test]
    fn test_rounds_half_up() {
        // 3 * 1.5 = 4.5
        assert_eq!(effective_count(3, Some(1.5), 1), 5);
        // 3 * 1.1 = 3.3
        assert_eq!(effective_count(3, Some(1.1), 1), 3);
    }
}
