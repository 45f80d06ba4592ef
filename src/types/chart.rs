use serde::{Deserialize, Serialize};

use super::SampleField;

/// One plotted series: which sample field, and the legend name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub key: SampleField,
    pub display_name: String,
}

impl FieldSpec {
    pub fn new(key: SampleField, display_name: &str) -> Self {
        Self {
            key,
            display_name: display_name.to_string(),
        }
    }
}

/// Static description of a chart, defined at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub title: String,
    pub fields: Vec<FieldSpec>,
    pub min_value: f64,
    pub max_value: f64,
}

impl ChartSpec {
    /// Acceleration magnitude; a phone at rest reads about 9.8.
    pub fn vibration() -> Self {
        Self {
            title: "Vibration".to_string(),
            fields: vec![FieldSpec::new(SampleField::AccelMagnitude, "Vibration")],
            min_value: 0.0,
            max_value: 50.0,
        }
    }

    pub fn device_motion() -> Self {
        Self {
            title: "Device Motion".to_string(),
            fields: vec![
                FieldSpec::new(SampleField::AccelX, "Accel X"),
                FieldSpec::new(SampleField::AccelY, "Accel Y"),
                FieldSpec::new(SampleField::AccelZ, "Accel Z"),
            ],
            min_value: -15.0,
            max_value: 15.0,
        }
    }

    pub fn device_orientation() -> Self {
        Self {
            title: "Device Orientation".to_string(),
            fields: vec![
                FieldSpec::new(SampleField::RotAlpha, "Alpha"),
                FieldSpec::new(SampleField::RotBeta, "Beta"),
                FieldSpec::new(SampleField::RotGamma, "Gamma"),
            ],
            min_value: -400.0,
            max_value: 400.0,
        }
    }

    /// Top to bottom: vibration, motion, orientation.
    pub fn defaults() -> Vec<ChartSpec> {
        vec![Self::vibration(), Self::device_motion(), Self::device_orientation()]
    }
}

/// A single point of a window, ready for the plot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowPoint {
    /// Milliseconds since the Unix epoch.
    pub x: i64,
    pub y: f64,
    /// Padding point, not backed by a real sample.
    pub synthetic: bool,
}

impl WindowPoint {
    pub fn real(x: i64, y: f64) -> Self {
        Self { x, y, synthetic: false }
    }

    pub fn padding(x: i64) -> Self {
        Self { x, y: 0.0, synthetic: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_charts_order_and_bounds() {
        let charts = ChartSpec::defaults();
        let summary: Vec<(&str, f64, f64, usize)> = charts
            .iter()
            .map(|c| (c.title.as_str(), c.min_value, c.max_value, c.fields.len()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Vibration", 0.0, 50.0, 1),
                ("Device Motion", -15.0, 15.0, 3),
                ("Device Orientation", -400.0, 400.0, 3),
            ]
        );
        assert_eq!(charts[0].fields[0].key, SampleField::AccelMagnitude);
        assert_eq!(charts[1].fields[2].display_name, "Accel Z");
    }
}
