// castor_sim/src/simulation/output.rs

//! Persists predicted trajectories as flat numeric tables.

use std::fs::File;
use std::io;
use std::path::Path;
use tracing::info;

use crate::error::SimError;
use crate::simulation::config::{delimiter_byte, OutputConfig};
use crate::simulation::runner::Prediction;

/// Writes one row per sample in layout order to `writer`.
pub fn write_prediction<W: io::Write>(
    writer: W,
    prediction: &Prediction,
    output: &OutputConfig,
) -> Result<(), SimError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter_byte(output.delimiter)?)
        .has_headers(false)
        .from_writer(writer);

    if output.header {
        csv_writer.write_record(prediction.layout().iter().map(|v| v.column_name()))?;
    }
    for row in prediction.rows(output.convention) {
        csv_writer.write_record(row.iter().map(|value| value.to_string()))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Creates (or truncates) `path` and writes the prediction into it.
pub fn write_prediction_file(
    path: &Path,
    prediction: &Prediction,
    output: &OutputConfig,
) -> Result<(), SimError> {
    let file = File::create(path)?;
    write_prediction(file, prediction, output)?;
    info!(
        path = %path.display(),
        rows = prediction.times().len(),
        "Wrote predicted trajectory"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::config::ExportConvention;
    use castor_core::prelude::*;

    fn two_sample_prediction() -> Prediction {
        let dynamics = ChassisDynamics::with_held_casters(
            PhysicalConstants::default(),
            ContactGeometry::default(),
            0.0,
            0.0,
        )
        .unwrap();
        let x0 = ChassisState::new(0.0, 0.0, -2.0, 1.0, 0.5);
        let run = simulate_fixed_step(&dynamics, &RK4, &x0, 0.1, 1).unwrap();
        Prediction::Chassis(run)
    }

    fn render(output: &OutputConfig) -> String {
        let mut buffer = Vec::new();
        write_prediction(&mut buffer, &two_sample_prediction(), output).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn rows_follow_the_layout_without_header() {
        let output = OutputConfig {
            convention: ExportConvention::Model,
            ..Default::default()
        };
        let text = render(&output);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "0 0 -2 1 0.5");
    }

    #[test]
    fn header_and_world_convention() {
        let output = OutputConfig {
            delimiter: ',',
            header: true,
            ..Default::default()
        };
        let text = render(&output);
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("angular_rate,linear_rate,y,x,heading")
        );
        assert_eq!(lines.next(), Some("0,0,2,1,0.5"));
    }

    #[test]
    fn non_ascii_delimiter_is_rejected() {
        let output = OutputConfig {
            delimiter: '→',
            ..Default::default()
        };
        let mut buffer = Vec::new();
        let err = write_prediction(&mut buffer, &two_sample_prediction(), &output).unwrap_err();
        assert!(matches!(err, SimError::InvalidScenario(_)));
    }
}
