//! Runtime settings for a room
//!
//! Every timing and scoring value the engine consumes is gathered in
//! [`Settings`]. Settings default to the values in [`crate::constants`] and
//! can be loaded from JSON, where missing fields fall back to the defaults.

use std::time::Duration;

use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{flow, scoring, timer},
    error::Error,
};

/// Validates that a duration in milliseconds falls within the given bounds
fn validate_millis<const MIN_MS: u64, const MAX_MS: u64>(
    val: &Duration,
    _ctx: &(),
) -> garde::Result {
    if (u128::from(MIN_MS)..=u128::from(MAX_MS)).contains(&val.as_millis()) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "outside of bounds [{MIN_MS}ms,{MAX_MS}ms]",
        )))
    }
}

/// Tunable timing and scoring values of a room
#[serde_with::serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Settings {
    /// Wall-clock length of one timer unit
    #[garde(custom(validate_millis::<{ timer::MIN_TICK_INTERVAL_MS }, { timer::MAX_TICK_INTERVAL_MS }>))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub tick_interval: Duration,
    /// Presentation countdown before the first question, in timer units
    #[garde(range(max = flow::MAX_PRESENTATION_DELAY))]
    pub presentation_delay: u64,
    /// Tick speed multiplier while running normally
    #[garde(range(min = 1, max = timer::MAX_SPEED))]
    pub normal_speed: u32,
    /// Tick speed multiplier while panicking
    #[garde(range(min = 1, max = timer::MAX_SPEED))]
    pub panic_speed: u32,
    /// Multiplier for the first fully correct multiple choice submission
    #[garde(range(min = scoring::MIN_BONUS, max = scoring::MAX_BONUS))]
    pub first_correct_bonus: f64,
    /// Delay before test and random rooms leave the answers screen
    #[garde(custom(validate_millis::<0, { flow::MAX_AUTO_ADVANCE_DELAY_MS }>))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub auto_advance_delay: Duration,
    /// Remaining units at which a multiple choice round panics
    #[garde(skip)]
    pub mcq_panic_threshold: u64,
    /// Remaining units at which a long answer round panics
    #[garde(skip)]
    pub laq_panic_threshold: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(timer::TICK_INTERVAL_MS),
            presentation_delay: flow::PRESENTATION_DELAY,
            normal_speed: timer::NORMAL_SPEED,
            panic_speed: timer::PANIC_SPEED,
            first_correct_bonus: scoring::FIRST_CORRECT_BONUS,
            auto_advance_delay: Duration::from_millis(flow::AUTO_ADVANCE_DELAY_MS),
            mcq_panic_threshold: flow::MCQ_PANIC_THRESHOLD,
            laq_panic_threshold: flow::LAQ_PANIC_THRESHOLD,
        }
    }
}

impl Settings {
    /// Parses settings from JSON and validates them
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the input is not valid JSON for this shape
    /// and [`Error::Invalid`] if a value is out of bounds.
    pub fn from_json(input: &str) -> Result<Self, Error> {
        let settings: Self = serde_json::from_str(input)?;
        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.panic_speed, 4);
        assert_eq!(settings.normal_speed, 1);
        assert!((settings.first_correct_bonus - 1.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_from_json_fills_missing_fields() {
        let settings = Settings::from_json(r#"{"presentation_delay": 0, "tick_interval": 250}"#)
            .expect("valid settings");

        assert_eq!(settings.presentation_delay, 0);
        assert_eq!(settings.tick_interval, Duration::from_millis(250));
        assert_eq!(settings.auto_advance_delay, Settings::default().auto_advance_delay);
    }

    #[test]
    fn test_from_json_rejects_zero_speed() {
        let result = Settings::from_json(r#"{"panic_speed": 0}"#);
        assert!(matches!(result, Err(Error::Invalid(_))));
    }

    #[test]
    fn test_from_json_rejects_tiny_tick_interval() {
        let result = Settings::from_json(r#"{"tick_interval": 1}"#);
        assert!(matches!(result, Err(Error::Invalid(_))));
    }

    #[test]
    fn test_from_json_rejects_malformed_input() {
        let result = Settings::from_json("{not json");
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn test_bonus_below_one_is_invalid() {
        let settings = Settings {
            first_correct_bonus: 0.5,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_settings_serialize_durations_as_millis() {
        let json = serde_json::to_string(&Settings::default()).unwrap();
        assert!(json.contains("\"tick_interval\":1000"));
        assert!(json.contains("\"auto_advance_delay\":5000"));
    }
}
