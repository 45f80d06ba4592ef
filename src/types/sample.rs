use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One wire value: devices send either a JSON number or a numeric string.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum NumericField {
    Number(f64),
    Text(String),
}

impl NumericField {
    /// Lenient parse, anything that is not a number becomes NaN.
    pub fn to_f64(&self) -> f64 {
        self.try_to_f64().unwrap_or(f64::NAN)
    }

    pub fn try_to_f64(&self) -> Option<f64> {
        match self {
            NumericField::Number(value) => Some(*value),
            NumericField::Text(text) => text.trim().parse::<f64>().ok(),
        }
    }
}

impl From<f64> for NumericField {
    fn from(value: f64) -> Self {
        NumericField::Number(value)
    }
}

impl From<&str> for NumericField {
    fn from(value: &str) -> Self {
        NumericField::Text(value.to_string())
    }
}

/// Raw six-axis reading as it arrives from a transport.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct RawReading {
    #[serde(default)]
    pub ax: Option<NumericField>,
    #[serde(default)]
    pub ay: Option<NumericField>,
    #[serde(default)]
    pub az: Option<NumericField>,
    #[serde(default)]
    pub oa: Option<NumericField>,
    #[serde(default)]
    pub ob: Option<NumericField>,
    #[serde(default)]
    pub og: Option<NumericField>,
}

impl RawReading {
    pub fn new<T: Into<NumericField>>(ax: T, ay: T, az: T, oa: T, ob: T, og: T) -> Self {
        Self {
            ax: Some(ax.into()),
            ay: Some(ay.into()),
            az: Some(az.into()),
            oa: Some(oa.into()),
            ob: Some(ob.into()),
            og: Some(og.into()),
        }
    }

    pub fn field(&self, field: SampleField) -> Option<&NumericField> {
        match field {
            SampleField::AccelX => self.ax.as_ref(),
            SampleField::AccelY => self.ay.as_ref(),
            SampleField::AccelZ => self.az.as_ref(),
            SampleField::RotAlpha => self.oa.as_ref(),
            SampleField::RotBeta => self.ob.as_ref(),
            SampleField::RotGamma => self.og.as_ref(),
            SampleField::AccelMagnitude => None,
        }
    }
}

/// Field of a sample that a chart can plot.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SampleField {
    #[serde(rename = "ax")]
    AccelX,
    #[serde(rename = "ay")]
    AccelY,
    #[serde(rename = "az")]
    AccelZ,
    #[serde(rename = "oa")]
    RotAlpha,
    #[serde(rename = "ob")]
    RotBeta,
    #[serde(rename = "og")]
    RotGamma,
    #[serde(rename = "magnitude")]
    AccelMagnitude,
}

impl SampleField {
    /// The six fields carried on the wire, in wire order.
    pub const RAW: [SampleField; 6] = [
        SampleField::AccelX,
        SampleField::AccelY,
        SampleField::AccelZ,
        SampleField::RotAlpha,
        SampleField::RotBeta,
        SampleField::RotGamma,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            SampleField::AccelX => "ax",
            SampleField::AccelY => "ay",
            SampleField::AccelZ => "az",
            SampleField::RotAlpha => "oa",
            SampleField::RotBeta => "ob",
            SampleField::RotGamma => "og",
            SampleField::AccelMagnitude => "magnitude",
        }
    }
}

impl fmt::Display for SampleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SampleField {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ax" => Ok(SampleField::AccelX),
            "ay" => Ok(SampleField::AccelY),
            "az" => Ok(SampleField::AccelZ),
            "oa" => Ok(SampleField::RotAlpha),
            "ob" => Ok(SampleField::RotBeta),
            "og" => Ok(SampleField::RotGamma),
            "magnitude" => Ok(SampleField::AccelMagnitude),
            other => Err(ParseError::UnknownField(other.to_string())),
        }
    }
}

/// Sample parsing errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("field `{0}` is missing")]
    Missing(SampleField),
    #[error("field `{field}` is not numeric: {value:?}")]
    NotNumeric { field: SampleField, value: String },
    #[error("unknown sample field `{0}`")]
    UnknownField(String),
}

/// Timestamped six-axis reading plus derived vibration magnitude.
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    /// Milliseconds since the Unix epoch.
    pub time: i64,
    pub accel_x: f64,
    pub accel_y: f64,
    pub accel_z: f64,
    pub rot_alpha: f64,
    pub rot_beta: f64,
    pub rot_gamma: f64,
    pub accel_magnitude: f64,
}

impl Sample {
    pub fn new(
        time: i64,
        accel: [f64; 3],
        rotation: [f64; 3],
    ) -> Self {
        let [accel_x, accel_y, accel_z] = accel;
        let [rot_alpha, rot_beta, rot_gamma] = rotation;
        Self {
            time,
            accel_x,
            accel_y,
            accel_z,
            rot_alpha,
            rot_beta,
            rot_gamma,
            accel_magnitude: magnitude(accel_x, accel_y, accel_z),
        }
    }

    pub fn value(&self, field: SampleField) -> f64 {
        match field {
            SampleField::AccelX => self.accel_x,
            SampleField::AccelY => self.accel_y,
            SampleField::AccelZ => self.accel_z,
            SampleField::RotAlpha => self.rot_alpha,
            SampleField::RotBeta => self.rot_beta,
            SampleField::RotGamma => self.rot_gamma,
            SampleField::AccelMagnitude => self.accel_magnitude,
        }
    }

    /// Copy with a different timestamp; magnitude is unchanged.
    pub fn with_time(mut self, time: i64) -> Self {
        self.time = time;
        self
    }
}

pub fn magnitude(x: f64, y: f64, z: f64) -> f64 {
    (x * x + y * y + z * z).sqrt()
}
