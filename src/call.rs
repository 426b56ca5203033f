use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CallRecordError {
    #[error("call duration must be positive and finite, got {0}")]
    InvalidDuration(f64),
    #[error("car speed must be positive and finite, got {0}")]
    InvalidSpeed(f64),
    #[error("arrival gap must be non-negative and finite, got {0}")]
    InvalidArrivalGap(f64),
    #[error("start position must be non-negative and finite, got {0}")]
    InvalidStartPosition(f64),
}

/// One entry of the synthetic input stream: a single mobile caller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CallRecord {
    pub duration: f64,
    pub arrival_gap: f64,
    pub speed: f64,
    pub start_position: f64,
}

impl CallRecord {
    pub fn new(
        duration: f64,
        arrival_gap: f64,
        speed: f64,
        start_position: f64,
    ) -> Result<Self, CallRecordError> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(CallRecordError::InvalidDuration(duration));
        }
        if !speed.is_finite() || speed <= 0.0 {
            return Err(CallRecordError::InvalidSpeed(speed));
        }
        if !arrival_gap.is_finite() || arrival_gap < 0.0 {
            return Err(CallRecordError::InvalidArrivalGap(arrival_gap));
        }
        if !start_position.is_finite() || start_position < 0.0 {
            return Err(CallRecordError::InvalidStartPosition(start_position));
        }
        Ok(Self {
            duration,
            arrival_gap,
            speed,
            start_position,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimePoint {
    pub at: f64,
    pub position: f64,
}

/// An admitted call: the unconsumed suffix of its timeline plus the cell
/// currently holding its channel.
pub struct Call {
    pub timeline: VecDeque<TimePoint>,
    pub current_cell: usize,
}

impl Call {
    /// Lay out the call's future as timed points: one per cell boundary
    /// crossed while the call is up (in increasing order), then the point
    /// where the call ends. The final point is always present, even when
    /// the call ends exactly on a boundary, and always means completion.
    pub fn activate(record: CallRecord, t0: f64, cell_width: f64) -> Self {
        let start = record.start_position;
        let end = start + record.speed * record.duration;
        let mut timeline = VecDeque::new();

        // boundaries are the multiples of the cell width strictly beyond
        // the start position and not past the end position
        let mut k = (start / cell_width).floor() as i64 + 1;
        loop {
            let boundary = k as f64 * cell_width;
            if boundary > end {
                break;
            }
            timeline.push_back(TimePoint {
                at: t0 + (boundary - start) / record.speed,
                position: boundary,
            });
            k += 1;
        }
        timeline.push_back(TimePoint {
            at: t0 + record.duration,
            position: end,
        });

        Call {
            timeline,
            current_cell: (start / cell_width).floor() as usize,
        }
    }
}
