#![forbid(unsafe_code)]

//! Aggregate configuration and validation errors.
//!
//! Each component owns its configuration struct next to its
//! implementation; [`MotionConfig`] bundles them so a host can load the
//! whole set at once (with the `serde` feature, from JSON).
//!
//! Validation is explicit. Components accept whatever they are given and
//! clamp at runtime; [`MotionConfig::validate`] is for hosts that want to
//! reject a bad configuration up front.

use std::fmt;

use crate::clock::ClockConfig;
use crate::cursor::CursorConfig;
use crate::loader::LoaderConfig;
use crate::nav::NavConfig;
use crate::particles::FieldConfig;
use crate::scroll::ScrollConfig;
use crate::spring::SpringConfig;
use crate::trigger::TriggerConfig;

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The value must be finite and strictly positive.
    NotPositive {
        /// Dotted path of the field, e.g. `scroll.duration`.
        field: &'static str,
        /// Offending value.
        value: f64,
    },
    /// The value must be finite and not negative.
    Negative {
        /// Dotted path of the field.
        field: &'static str,
        /// Offending value.
        value: f64,
    },
    /// The value must lie in `[min, max]`.
    OutOfRange {
        /// Dotted path of the field.
        field: &'static str,
        /// Offending value.
        value: f64,
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },
    /// A count that must be non-zero is zero.
    ZeroCount {
        /// Dotted path of the field.
        field: &'static str,
    },
    /// A `[low, high]` pair is inverted.
    InvertedRange {
        /// Dotted path of the field.
        field: &'static str,
        /// Lower end as given.
        low: f64,
        /// Upper end as given.
        high: f64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPositive { field, value } => {
                write!(f, "{field} must be finite and > 0 (got {value})")
            }
            Self::Negative { field, value } => {
                write!(f, "{field} must be finite and >= 0 (got {value})")
            }
            Self::OutOfRange {
                field,
                value,
                min,
                max,
            } => write!(f, "{field} must be within [{min}, {max}] (got {value})"),
            Self::ZeroCount { field } => write!(f, "{field} must be non-zero"),
            Self::InvertedRange { field, low, high } => {
                write!(f, "{field} range is inverted ({low} > {high})")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

pub(crate) fn check_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

pub(crate) fn check_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

pub(crate) fn check_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), ConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

pub(crate) fn check_ordered(field: &'static str, low: f64, high: f64) -> Result<(), ConfigError> {
    if low.is_finite() && high.is_finite() && low <= high {
        Ok(())
    } else {
        Err(ConfigError::InvertedRange { field, low, high })
    }
}

/// The two spring presets used across the page.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpringPresets {
    /// Stiff, lightly damped: pointer tracking.
    pub pointer: SpringConfig,
    /// Soft: scroll-mapped entrance motion.
    pub soft: SpringConfig,
}

impl Default for SpringPresets {
    fn default() -> Self {
        Self {
            pointer: SpringConfig::POINTER,
            soft: SpringConfig::SOFT,
        }
    }
}

/// Every tunable of the motion core.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MotionConfig {
    pub clock: ClockConfig,
    pub scroll: ScrollConfig,
    pub trigger: TriggerConfig,
    pub springs: SpringPresets,
    pub field: FieldConfig,
    pub cursor: CursorConfig,
    pub loader: LoaderConfig,
    pub nav: NavConfig,
}

impl MotionConfig {
    /// Validate every section, returning the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.clock.validate()?;
        self.scroll.validate()?;
        self.trigger.validate()?;
        self.springs.pointer.validate()?;
        self.springs.soft.validate()?;
        self.field.validate()?;
        self.cursor.validate()?;
        self.loader.validate()?;
        self.nav.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert_eq!(MotionConfig::default().validate(), Ok(()));
    }

    #[test]
    fn first_error_is_reported() {
        let mut config = MotionConfig::default();
        config.scroll.duration_secs = 0.0;
        config.springs.pointer.mass = -1.0;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::NotPositive {
                field: "scroll.duration_secs",
                ..
            }
        ));
    }

    #[test]
    fn display_names_the_field() {
        let err = ConfigError::OutOfRange {
            field: "trigger.threshold",
            value: 2.0,
            min: 0.0,
            max: 1.0,
        };
        assert_eq!(
            err.to_string(),
            "trigger.threshold must be within [0, 1] (got 2)"
        );
    }

    #[test]
    fn checks_reject_nan() {
        assert!(check_positive("x", f64::NAN).is_err());
        assert!(check_non_negative("x", f64::NAN).is_err());
        assert!(check_range("x", f64::NAN, 0.0, 1.0).is_err());
        assert!(check_ordered("x", 2.0, 1.0).is_err());
        assert!(check_ordered("x", 1.0, 1.0).is_ok());
    }
}
