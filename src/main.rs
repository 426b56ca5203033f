mod base_station;
mod call;
mod data_pool;
mod simulation;
mod stats;

use crate::call::CallRecord;
use crate::data_pool::DataPool;
use crate::simulation::{SimConfig, Simulation};
use anyhow::{ensure, Result};
use async_std::task;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time;
use structopt::StructOpt;

#[derive(StructOpt)]
struct Opt {
    /// Number of calls to simulate
    #[structopt(long, default_value = "50000")]
    num_calls: usize,

    /// Number of base stations along the road
    #[structopt(long, default_value = "20")]
    num_stations: usize,

    /// Channels per base station; the guarded run converts one of them
    /// into the guard channel
    #[structopt(long, default_value = "10")]
    channels: u32,

    /// Cell width in km
    #[structopt(long, default_value = "2")]
    cell_width: f64,

    /// Seed for dataset generation, drawn from entropy when omitted
    #[structopt(long)]
    seed: Option<u64>,

    /// Call duration measurements
    #[structopt(long, default_value = "call_duration_g01.txt", parse(from_os_str))]
    duration_file: PathBuf,

    /// Call arrival measurements
    #[structopt(long, default_value = "call_arrival_g01.txt", parse(from_os_str))]
    arrival_file: PathBuf,

    /// Car speed measurements
    #[structopt(long, default_value = "car_speed_g01.txt", parse(from_os_str))]
    speed_file: PathBuf,
}

#[derive(Serialize)]
struct RunRow {
    policy: &'static str,
    num_stations: usize,
    channels: u32,
    total_calls: u64,
    blocked: u64,
    dropped: u64,
    completed: u64,
    blocked_rate: f64,
    dropped_rate: f64,
    running_secs: f64,
    finished_nanos: i64,
}

fn run_policy(policy: &'static str, config: SimConfig, records: &[CallRecord]) -> RunRow {
    let tic = time::Instant::now();
    let stats = Simulation::new(config).run(records.iter().copied());
    RunRow {
        policy,
        num_stations: config.num_stations,
        channels: config.channels_per_station,
        total_calls: stats.total_calls,
        blocked: stats.blocked,
        dropped: stats.dropped,
        completed: stats.completed,
        blocked_rate: stats.block_rate(),
        dropped_rate: stats.drop_rate(),
        running_secs: tic.elapsed().as_secs_f64(),
        finished_nanos: chrono::Utc::now().timestamp_nanos(),
    }
}

fn print_report(row: &RunRow) {
    println!("######## {} ########", row.policy);
    println!("blocked_rate: {:.6} percent", row.blocked_rate * 100.0);
    println!("dropped_rate: {:.6} percent", row.dropped_rate * 100.0);
    println!("program running time: {:.6} seconds", row.running_secs);
}

fn write_statistics(opt: &Opt, rows: &[RunRow]) -> Result<()> {
    let file_name = format!(
        "{}_{}_{}_{}_{}.csv",
        opt.num_calls,
        opt.num_stations,
        opt.channels,
        opt.cell_width,
        opt.seed
            .map_or_else(|| "random".to_string(), |seed| seed.to_string()),
    );
    let dir = PathBuf::new().join("simulation-results");
    if !dir.exists() {
        fs::create_dir_all(&dir)?;
    }
    let path = dir.join(file_name);
    let mut wtr = csv::Writer::from_path(&path)?;

    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    info!("statistics written to {}", path.display());
    Ok(())
}

#[async_std::main]
async fn main() -> Result<()> {
    env_logger::init();
    let opt = Opt::from_args();
    ensure!(opt.num_stations > 0, "there must be at least one station");
    ensure!(
        opt.cell_width.is_finite() && opt.cell_width > 0.0,
        "cell width must be positive and finite"
    );
    ensure!(
        opt.channels >= 2,
        "at least two channels per station are needed to set one aside as the guard"
    );

    let road_length = opt.num_stations as f64 * opt.cell_width;
    let pool = DataPool::from_files(
        &opt.duration_file,
        &opt.arrival_file,
        &opt.speed_file,
        road_length,
    )?;
    let mut rng = match opt.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let records = Arc::new(pool.generate(opt.num_calls, &mut rng));
    info!("generated {} call records", records.len());

    let reserve_config = SimConfig {
        num_stations: opt.num_stations,
        channels_per_station: opt.channels - 1,
        reserve_policy: true,
        cell_width: opt.cell_width,
    };
    let baseline_config = SimConfig {
        num_stations: opt.num_stations,
        channels_per_station: opt.channels,
        reserve_policy: false,
        cell_width: opt.cell_width,
    };

    // the two runs share nothing but the immutable dataset
    let reserve_records = records.clone();
    let reserve_run =
        task::spawn(async move { run_policy("reserve channel", reserve_config, &reserve_records) });
    let baseline_row = run_policy("do not reserve channel", baseline_config, &records);
    let reserve_row = reserve_run.await;

    print_report(&reserve_row);
    print_report(&baseline_row);
    write_statistics(&opt, &[reserve_row, baseline_row])
}
