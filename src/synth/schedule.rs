use crate::domain::PressureSchedule;
use crate::error::TriaxError;

/// Confining pressures of the standard laboratory schedule (kPa).
pub const STANDARD_PRESSURES: [f64; 3] = [100.0, 200.0, 300.0];

impl PressureSchedule {
    /// Confining pressures in increasing order.
    pub fn sigma_3_values(&self) -> Result<Vec<f64>, TriaxError> {
        let mut values = match self {
            PressureSchedule::Standard => STANDARD_PRESSURES.to_vec(),
            PressureSchedule::FromReference(p) => {
                if !(p.is_finite() && *p > 0.0) {
                    return Err(TriaxError::invalid_input(format!(
                        "reference pressure must be > 0, got {p}"
                    )));
                }
                vec![p / 2.0, *p, 2.0 * p]
            }
            PressureSchedule::Custom(values) => values.clone(),
        };
        if values.is_empty() {
            return Err(TriaxError::invalid_input("pressure schedule is empty"));
        }
        if let Some(v) = values.iter().find(|v| !(v.is_finite() && **v > 0.0)) {
            return Err(TriaxError::invalid_input(format!("invalid confining pressure {v}")));
        }
        values.sort_by(f64::total_cmp);
        if values.windows(2).any(|w| w[1] == w[0]) {
            return Err(TriaxError::invalid_input("pressure schedule contains duplicates"));
        }
        Ok(values)
    }
}
