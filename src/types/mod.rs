pub mod chart;
pub mod credentials;
pub mod sample;

pub use chart::{ChartSpec, FieldSpec, WindowPoint};
pub use credentials::Credentials;
pub use sample::{NumericField, ParseError, RawReading, Sample, SampleField};
