//! First-order decay model of a twin's temperature.
//!
//! On every new reading the modelled value moves toward the reading at a rate
//! `k` per minute of elapsed time:
//!
//! ```text
//! delta = -k * (previous - reading)
//! next  = previous + delta * (new_time - previous_time) / 60
//! ```
//!
//! The result is not clamped. A large `k` or a long gap overshoots the reading,
//! and an out-of-order event (negative elapsed time) moves the value away from
//! it. Both are accepted behaviour and preserved exactly.

use crate::TemperatureReading;

/// Seconds per model time unit (the model runs in minutes).
const SECONDS_PER_MINUTE: f64 = 60.0;

/// Computes the next modelled value.
///
/// `previous_value` is `None` when the twin has never reported; the model then
/// initialises to `new_value` and `previous_time` is ignored. Times are unix
/// seconds.
pub fn advance(
    previous_value: Option<f64>,
    previous_time: i64,
    new_value: f64,
    new_time: i64,
    k: f64,
) -> f64 {
    let Some(previous) = previous_value else {
        return new_value;
    };

    let elapsed_minutes = (new_time - previous_time) as f64 / SECONDS_PER_MINUTE;
    let delta = -k * (previous - new_value);
    previous + delta * elapsed_minutes
}

/// [`advance`] over readings: the twin's last reported reading (if any) and
/// the new sensor reading.
pub fn advance_reading(
    previous: Option<TemperatureReading>,
    reading: TemperatureReading,
    k: f64,
) -> f64 {
    advance(
        previous.map(|p| p.value),
        previous.map_or(0, |p| p.update_time.unix_seconds()),
        reading.value,
        reading.update_time.unix_seconds(),
        k,
    )
}

/// Parses an emulation label value as the decay coefficient `k`.
///
/// Returns `None` for anything that is not a finite floating-point literal
/// (`NaN` and the infinities included); the caller then skips the model
/// update entirely.
pub fn parse_coefficient(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|k| k.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Timestamp;

    #[test]
    fn initialises_to_reading_without_previous_value() {
        for (value, time) in [(21.5, 1000), (-4.0, 0), (0.0, -60)] {
            assert_eq!(advance(None, 123, value, time, 0.5), value);
        }
    }

    #[test]
    fn overshoots_without_clamping() {
        // k = 1, previous 0, reading 10, one hour later.
        let next = advance(Some(0.0), 0, 10.0, 3600, 1.0);
        assert_eq!(next, 600.0);
    }

    #[test]
    fn moves_toward_reading_for_small_steps() {
        let next = advance(Some(20.0), 0, 30.0, 60, 0.1);
        assert!((next - 21.0).abs() < 1e-12);
    }

    #[test]
    fn same_minute_and_out_of_order_events_are_not_rejected() {
        assert_eq!(advance(Some(20.0), 100, 30.0, 100, 0.1), 20.0);

        let next = advance(Some(20.0), 120, 30.0, 60, 0.1);
        assert!((next - 19.0).abs() < 1e-12);
    }

    #[test]
    fn advance_reading_uses_unix_seconds() {
        let previous = TemperatureReading::new(20.0, Timestamp::from_unix_seconds(0).unwrap());
        let reading = TemperatureReading::new(30.0, Timestamp::from_unix_seconds(120).unwrap());

        let next = advance_reading(Some(previous), reading, 0.5);
        assert!((next - 30.0).abs() < 1e-12);
        assert_eq!(advance_reading(None, reading, 0.5), 30.0);
    }

    #[test]
    fn coefficient_must_be_numeric() {
        assert_eq!(parse_coefficient("0.25"), Some(0.25));
        assert_eq!(parse_coefficient(" 1e-2 "), Some(0.01));
        assert_eq!(parse_coefficient("fast"), None);
        assert_eq!(parse_coefficient(""), None);
    }

    #[test]
    fn non_finite_coefficients_are_rejected() {
        for raw in ["NaN", "nan", "inf", "-inf", "infinity", " Infinity "] {
            assert_eq!(parse_coefficient(raw), None, "{raw}");
        }
    }
}
