use std::collections::VecDeque;

use crate::types::{NumericField, ParseError, RawReading, Sample, SampleField};

/// Build a sample from a raw reading. Malformed or missing fields become NaN.
pub fn ingest(raw: &RawReading, time: i64) -> Sample {
    let value = |field: SampleField| raw.field(field).map_or(f64::NAN, |v| v.to_f64());

    Sample::new(
        time,
        [
            value(SampleField::AccelX),
            value(SampleField::AccelY),
            value(SampleField::AccelZ),
        ],
        [
            value(SampleField::RotAlpha),
            value(SampleField::RotBeta),
            value(SampleField::RotGamma),
        ],
    )
}

/// Like [`ingest`], but rejects the reading on the first malformed field.
pub fn ingest_strict(raw: &RawReading, time: i64) -> Result<Sample, ParseError> {
    let mut values = [0.0; 6];
    for (slot, field) in values.iter_mut().zip(SampleField::RAW) {
        let wire = raw.field(field).ok_or(ParseError::Missing(field))?;
        *slot = wire.try_to_f64().ok_or_else(|| ParseError::NotNumeric {
            field,
            value: match wire {
                NumericField::Number(n) => n.to_string(),
                NumericField::Text(t) => t.clone(),
            },
        })?;
    }

    Ok(Sample::new(
        time,
        [values[0], values[1], values[2]],
        [values[3], values[4], values[5]],
    ))
}

/// Append-only sample history with bounded retention.
#[derive(Debug, Clone)]
pub struct SampleStore {
    samples: VecDeque<Sample>,
    history_limit: usize,
    total_ingested: u64,
}

impl SampleStore {
    pub fn new(history_limit: usize) -> Self {
        let history_limit = history_limit.max(1);
        Self {
            samples: VecDeque::with_capacity(history_limit),
            history_limit,
            total_ingested: 0,
        }
    }

    /// Append a sample. Time never goes backwards inside the store; a sample
    /// stamped before its predecessor takes the predecessor's time.
    pub fn push(&mut self, sample: Sample) -> Sample {
        let sample = match self.samples.back() {
            Some(last) if sample.time < last.time => sample.with_time(last.time),
            _ => sample,
        };

        self.samples.push_back(sample);
        self.total_ingested += 1;

        // 超过保留上限时移除最旧的数据
        while self.samples.len() > self.history_limit {
            self.samples.pop_front();
        }

        sample
    }

    pub fn iter(&self) -> std::collections::vec_deque::Iter<'_, Sample> {
        self.samples.iter()
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Samples ever ingested, including those dropped by retention.
    pub fn total_ingested(&self) -> u64 {
        self.total_ingested
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
