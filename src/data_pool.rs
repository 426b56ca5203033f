use crate::call::CallRecord;
use anyhow::{anyhow, ensure, Context, Result};
use log::info;
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use rand_distr::{Exp, Normal};
use std::fs;
use std::path::Path;

#[derive(Clone, Copy, Debug)]
pub struct PoolParams {
    /// Mean call duration in seconds, fits the exponential sampler.
    pub duration_mean: f64,
    /// Mean gap between consecutive call arrivals in seconds.
    pub arrival_gap_mean: f64,
    /// Car speed in km/h as read from the measurements.
    pub speed_mean_kmh: f64,
    pub speed_std_kmh: f64,
    /// Start positions are uniform over `[0, road_length)` km.
    pub road_length: f64,
}

/// Samples synthetic call records from distributions fitted to the
/// empirical measurement files.
pub struct DataPool {
    duration: Exp<f64>,
    arrival_gap: Exp<f64>,
    speed_kmh: Normal<f64>,
    start_position: Uniform<f64>,
}

impl DataPool {
    pub fn new(params: PoolParams) -> Result<Self> {
        ensure!(
            params.duration_mean.is_finite() && params.duration_mean > 0.0,
            "mean call duration must be positive and finite, got {}",
            params.duration_mean
        );
        ensure!(
            params.arrival_gap_mean.is_finite() && params.arrival_gap_mean > 0.0,
            "mean arrival gap must be positive and finite, got {}",
            params.arrival_gap_mean
        );
        ensure!(
            params.speed_mean_kmh.is_finite() && params.speed_std_kmh.is_finite(),
            "car speed statistics must be finite, got {} +- {}",
            params.speed_mean_kmh,
            params.speed_std_kmh
        );
        ensure!(
            params.road_length.is_finite() && params.road_length > 0.0,
            "road length must be positive and finite, got {}",
            params.road_length
        );

        let duration = Exp::new(1.0 / params.duration_mean)
            .map_err(|err| anyhow!("call duration distribution: {:?}", err))?;
        let arrival_gap = Exp::new(1.0 / params.arrival_gap_mean)
            .map_err(|err| anyhow!("arrival gap distribution: {:?}", err))?;
        let speed_kmh = Normal::new(params.speed_mean_kmh, params.speed_std_kmh)
            .map_err(|err| anyhow!("car speed distribution: {:?}", err))?;
        Ok(Self {
            duration,
            arrival_gap,
            speed_kmh,
            start_position: Uniform::new(0.0, params.road_length),
        })
    }

    /// Fit the samplers to the three measurement files: call durations
    /// (column 1), call arrival timestamps (column 2, fitted on the deltas
    /// between consecutive arrivals), and car speeds (last column, km/h).
    pub fn from_files(
        duration_file: &Path,
        arrival_file: &Path,
        speed_file: &Path,
        road_length: f64,
    ) -> Result<Self> {
        let durations = read_samples(duration_file, Column::Index(1))?;
        let arrivals = read_samples(arrival_file, Column::Index(2))?;
        let speeds = read_samples(speed_file, Column::Last)?;

        let duration_mean = mean(&durations);
        let arrival_gap_mean = mean(&deltas(&arrivals));
        let (speed_mean_kmh, speed_std_kmh) = mean_std(&speeds);
        info!(
            "fitted input distributions: duration mean {:.2}s, arrival gap mean {:.2}s, speed {:.1} +- {:.1} km/h",
            duration_mean, arrival_gap_mean, speed_mean_kmh, speed_std_kmh
        );

        Self::new(PoolParams {
            duration_mean,
            arrival_gap_mean,
            speed_mean_kmh,
            speed_std_kmh,
            road_length,
        })
    }

    pub fn generate<R: Rng>(&self, size: usize, rng: &mut R) -> Vec<CallRecord> {
        let mut records = Vec::with_capacity(size);
        while records.len() < size {
            let duration = self.duration.sample(rng);
            let arrival_gap = self.arrival_gap.sample(rng);
            let speed = self.speed_kmh.sample(rng) / 3600.0; // km/h -> km/s
            let start_position = self.start_position.sample(rng);
            // a normal speed draw can come out non-positive; resample the
            // record rather than hand the engine an invalid call
            if let Ok(record) = CallRecord::new(duration, arrival_gap, speed, start_position) {
                records.push(record);
            }
        }
        records
    }
}

#[derive(Clone, Copy, Debug)]
enum Column {
    Index(usize),
    Last,
}

fn read_samples(path: &Path, column: Column) -> Result<Vec<f64>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read sample file {}", path.display()))?;
    parse_samples(&contents, column)
        .with_context(|| format!("failed to parse sample file {}", path.display()))
}

// measurement files carry two header lines, then one tab separated row
// per sample
fn parse_samples(contents: &str, column: Column) -> Result<Vec<f64>> {
    let mut values = Vec::new();
    for (line_no, line) in contents.lines().enumerate().skip(2) {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let field = match column {
            Column::Index(idx) => fields.get(idx),
            Column::Last => fields.last(),
        }
        .ok_or_else(|| anyhow!("line {} has no {:?} field", line_no + 1, column))?;
        let value = field
            .trim()
            .parse::<f64>()
            .with_context(|| format!("bad number {:?} on line {}", field, line_no + 1))?;
        values.push(value);
    }
    ensure!(!values.is_empty(), "no samples beyond the header lines");
    Ok(values)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    let mean = mean(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    (mean, variance.sqrt())
}

fn deltas(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|pair| pair[1] - pair[0]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const SPEED_FILE: &str = "# car speeds\n\
                              time\tlane\tspeed\n\
                              0.0\t1\t48.2\n\
                              1.0\t1\t52.6\n\
                              2.0\t2\t50.0\n";

    #[test]
    fn parsing_skips_headers_and_selects_the_column() {
        let values = parse_samples(SPEED_FILE, Column::Last).unwrap();
        assert_eq!(values, vec![48.2, 52.6, 50.0]);
        let values = parse_samples(SPEED_FILE, Column::Index(1)).unwrap();
        assert_eq!(values, vec![1.0, 1.0, 2.0]);
    }

    #[test]
    fn parsing_rejects_malformed_rows() {
        assert!(parse_samples("h1\nh2\n1.0\tx\n", Column::Index(1)).is_err());
        assert!(parse_samples("h1\nh2\n1.0\n", Column::Index(3)).is_err());
        assert!(parse_samples("h1\nh2\n", Column::Last).is_err());
    }

    #[test]
    fn sample_statistics_match_numpy_conventions() {
        let (mean, std) = mean_std(&[2.0, 4.0, 6.0]);
        assert!((mean - 4.0).abs() < 1e-12);
        // population standard deviation, not the sample estimator
        assert!((std - (8.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(deltas(&[1.0, 4.0, 9.0]), vec![3.0, 5.0]);
    }

    fn pool() -> DataPool {
        DataPool::new(PoolParams {
            duration_mean: 180.0,
            arrival_gap_mean: 3.0,
            speed_mean_kmh: 50.0,
            speed_std_kmh: 20.0,
            road_length: 40.0,
        })
        .unwrap()
    }

    #[test]
    fn generated_records_honor_the_call_contract() {
        let mut rng = StdRng::seed_from_u64(42);
        for record in pool().generate(300, &mut rng) {
            assert!(record.duration > 0.0);
            assert!(record.speed > 0.0);
            assert!(record.arrival_gap >= 0.0);
            assert!(record.start_position >= 0.0 && record.start_position < 40.0);
        }
    }

    #[test]
    fn the_same_seed_reproduces_the_same_dataset() {
        let mut first = StdRng::seed_from_u64(9);
        let mut second = StdRng::seed_from_u64(9);
        assert_eq!(
            pool().generate(100, &mut first),
            pool().generate(100, &mut second)
        );
    }

    #[test]
    fn degenerate_parameters_are_rejected() {
        let params = PoolParams {
            duration_mean: 0.0,
            arrival_gap_mean: 3.0,
            speed_mean_kmh: 50.0,
            speed_std_kmh: 20.0,
            road_length: 40.0,
        };
        assert!(DataPool::new(params).is_err());
    }
}
