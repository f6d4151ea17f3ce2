// castor_sim/src/simulation/validation.rs

//! Compares a prediction with recorded ground truth.
//!
//! Recorded tables hold one sample per row with the columns
//! `x y th l_caster r_caster` in world convention and no header.

use castor_core::prelude::*;
use std::fmt;
use std::path::Path;
use tracing::info;

use crate::error::SimError;
use crate::simulation::config::{delimiter_byte, ExportConvention};
use crate::simulation::runner::Prediction;

/// Column count of a recorded table.
pub const MEASURED_COLUMNS: usize = 5;

/// One recorded sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasuredSample {
    pub pose: MeasuredPose,
    pub casters: CasterReading,
}

/// Error statistics for one compared channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelError {
    pub variable: StateVariable,
    pub rms: f64,
    pub max_abs: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    /// Number of samples present in both tables.
    pub compared_samples: usize,
    pub channels: Vec<ChannelError>,
}

impl ValidationReport {
    pub fn channel(&self, variable: StateVariable) -> Option<&ChannelError> {
        self.channels.iter().find(|c| c.variable == variable)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} samples compared", self.compared_samples)?;
        for channel in &self.channels {
            writeln!(
                f,
                "  {:<14} rms {:>12.6e}  max {:>12.6e}",
                channel.variable.column_name(),
                channel.rms,
                channel.max_abs
            )?;
        }
        Ok(())
    }
}

/// Reads a recorded table. Repeated delimiters (aligned columns) are
/// tolerated.
pub fn load_measurements(path: &Path, delimiter: char) -> Result<Vec<MeasuredSample>, SimError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_byte(delimiter)?)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut samples = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let values = record
            .iter()
            .filter(|field| !field.is_empty())
            .map(|field| {
                field.parse::<f64>().map_err(|e| {
                    SimError::Validation(format!("row {}: {field:?}: {e}", line + 1))
                })
            })
            .collect::<Result<Vec<f64>, SimError>>()?;

        if values.is_empty() {
            continue;
        }
        if values.len() != MEASURED_COLUMNS {
            return Err(SimError::Validation(format!(
                "row {}: expected {MEASURED_COLUMNS} columns, found {}",
                line + 1,
                values.len()
            )));
        }
        samples.push(MeasuredSample {
            pose: MeasuredPose {
                x: values[0],
                y: values[1],
                heading: values[2],
            },
            casters: CasterReading {
                left: values[3],
                right: values[4],
            },
        });
    }
    Ok(samples)
}

/// Residuals of `prediction` against `measured` over their common prefix.
///
/// Caster channels are only compared when the prediction integrates them.
pub fn compare(
    prediction: &Prediction,
    measured: &[MeasuredSample],
) -> Result<ValidationReport, SimError> {
    let rows = prediction.rows(ExportConvention::World);
    let overlap = rows.len().min(measured.len());
    if overlap == 0 {
        return Err(SimError::Validation(format!(
            "nothing to compare: {} predicted and {} measured samples",
            rows.len(),
            measured.len()
        )));
    }

    let layout = prediction.layout();
    let mut channels = vec![
        StateVariable::LongitudinalPosition,
        StateVariable::LateralPosition,
        StateVariable::Heading,
    ];
    if layout.len() == CASTER_STATE_DIM {
        channels.push(StateVariable::LeftCaster);
        channels.push(StateVariable::RightCaster);
    }

    let channels = channels
        .into_iter()
        .filter_map(|variable| {
            let column = layout.iter().position(|v| *v == variable)?;
            let residuals = rows[..overlap]
                .iter()
                .zip(&measured[..overlap])
                .map(|(row, sample)| {
                    let recorded = measured_value(sample, variable);
                    if variable.is_angle() {
                        angle_difference(row[column], recorded)
                    } else {
                        row[column] - recorded
                    }
                });
            Some(channel_error(variable, residuals))
        })
        .collect();

    let report = ValidationReport {
        compared_samples: overlap,
        channels,
    };
    info!("Validation against recorded data:\n{}", report);
    Ok(report)
}

fn measured_value(sample: &MeasuredSample, variable: StateVariable) -> f64 {
    match variable {
        StateVariable::LongitudinalPosition => sample.pose.x,
        StateVariable::LateralPosition => sample.pose.y,
        StateVariable::Heading => sample.pose.heading,
        StateVariable::LeftCaster => sample.casters.left,
        StateVariable::RightCaster => sample.casters.right,
        StateVariable::AngularRate | StateVariable::LinearRate => f64::NAN,
    }
}

fn channel_error(variable: StateVariable, residuals: impl Iterator<Item = f64>) -> ChannelError {
    let (count, sum_sq, max_abs) = residuals.fold((0usize, 0.0, 0.0_f64), |(n, sq, max), r| {
        (n + 1, sq + r * r, max.max(r.abs()))
    });
    ChannelError {
        variable,
        rms: (sum_sq / count as f64).sqrt(),
        max_abs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn prediction(steps: usize) -> Prediction {
        let dynamics = CasterDynamics::with_caster_states(
            PhysicalConstants {
                mu: 0.0,
                ..Default::default()
            },
            ContactGeometry::default(),
            CasterGeometry::default(),
        )
        .unwrap();
        let x0 = CasterState::from([0.0, 0.0, -1.0, 2.0, 0.0, 0.0, 0.0]);
        Prediction::Caster(simulate_fixed_step(&dynamics, &RK4, &x0, 0.1, steps).unwrap())
    }

    fn sample(x: f64, y: f64, heading: f64, left: f64, right: f64) -> MeasuredSample {
        MeasuredSample {
            pose: MeasuredPose { x, y, heading },
            casters: CasterReading { left, right },
        }
    }

    #[test]
    fn perfect_record_has_zero_error() {
        // At rest without friction nothing moves; casters read pi in sensor terms.
        let measured = vec![sample(2.0, 1.0, 0.0, PI, -PI); 4];
        let report = compare(&prediction(10), &measured).unwrap();
        assert_eq!(report.compared_samples, 4);
        assert_eq!(report.channels.len(), 5);
        for channel in &report.channels {
            assert_abs_diff_eq!(channel.rms, 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(channel.max_abs, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn constant_offset_shows_in_rms_and_max() {
        let measured = vec![sample(2.5, 1.0, 0.0, PI, PI); 3];
        let report = compare(&prediction(2), &measured).unwrap();
        let x = report.channel(StateVariable::LongitudinalPosition).unwrap();
        assert_abs_diff_eq!(x.rms, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(x.max_abs, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn empty_overlap_is_an_error() {
        assert!(matches!(
            compare(&prediction(2), &[]),
            Err(SimError::Validation(_))
        ));
    }
}
