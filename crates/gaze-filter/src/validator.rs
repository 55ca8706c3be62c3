//! Observation validation

use crate::error::FilterError;

/// Rejects observations a detector should never produce
#[derive(Debug, Clone)]
pub struct ObservationValidator {
    /// Accepted range for each face-relative raw coordinate
    raw_range: (f64, f64),
    /// Whether the previous observation sat at the origin
    last_at_origin: bool,
}

impl ObservationValidator {
    pub fn new(raw_range: (f64, f64)) -> Self {
        Self {
            raw_range,
            last_at_origin: false,
        }
    }

    /// Validate one observation and update the repeated-origin tracker
    pub fn validate(&mut self, raw: (f64, f64), screen: (f64, f64)) -> Result<(), FilterError> {
        for (field, value) in [("raw_x", raw.0), ("raw_y", raw.1), ("screen_x", screen.0), ("screen_y", screen.1)] {
            if !value.is_finite() {
                return Err(FilterError::NonFinite { field });
            }
        }

        let at_origin = raw == (0.0, 0.0);
        let repeated = at_origin && self.last_at_origin;
        self.last_at_origin = at_origin;
        if repeated {
            return Err(FilterError::RepeatedOrigin);
        }

        self.validate_range("raw_x", raw.0)?;
        self.validate_range("raw_y", raw.1)
    }

    fn validate_range(&self, field: &'static str, value: f64) -> Result<(), FilterError> {
        let (min, max) = self.raw_range;
        if value < min || value > max {
            Err(FilterError::OutOfRange { field, value, min, max })
        } else {
            Ok(())
        }
    }

    pub fn reset(&mut self) {
        self.last_at_origin = false;
    }
}

impl Default for ObservationValidator {
    fn default() -> Self {
        Self::new((-0.5, 1.5))
    }
}
