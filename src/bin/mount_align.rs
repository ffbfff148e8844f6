use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use ndarray::Array2;
use serde::Serialize;

use imu_mount_align::alignment::{estimate_batch, BatchConfig, SkipCounts};
use imu_mount_align::config::AlignConfig;
use imu_mount_align::filters::filter_table;
use imu_mount_align::quaternion::rotate_series;
use imu_mount_align::table::{load_table, SessionFiles};

#[derive(Parser, Debug)]
#[command(name = "mount_align")]
#[command(about = "Estimate accelerometer mount rotation from a recorded drive", long_about = None)]
struct Args {
    /// Session directory holding accel.<date>.csv and gps.<date>.csv
    #[arg(long, requires = "date", conflicts_with_all = ["accel", "gps"])]
    dir: Option<PathBuf>,

    /// Session date used to build file names under --dir
    #[arg(long)]
    date: Option<String>,

    /// Accelerometer log [time_ms, ax, ay, az] (.gz accepted)
    #[arg(long, requires = "gps")]
    accel: Option<PathBuf>,

    /// GPS log [time_ms, lat, lng, speed_kmh, track_deg, ...] (.gz accepted)
    #[arg(long, requires = "accel")]
    gps: Option<PathBuf>,

    /// Override the minimum mean GPS speed for a pair to count [km/h]
    #[arg(long)]
    min_speed_kmh: Option<f64>,

    /// JSON file with alignment settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the filtered accelerometer table rotated into the vehicle frame
    #[arg(long)]
    rotated_out: Option<PathBuf>,
}

#[derive(Serialize)]
struct Report {
    /// Scalar-first [w, x, y, z]
    quaternion: [f64; 4],
    angle_deg: f64,
    observations: usize,
    gps_samples: usize,
    skipped: SkipCounts,
    eigenvalues: [f64; 4],
    eigen_gap: f64,
    degenerate: bool,
}

fn session_files(args: &Args) -> Result<SessionFiles> {
    match (&args.dir, &args.date, &args.accel, &args.gps) {
        (Some(dir), Some(date), _, _) => Ok(SessionFiles::in_dir(dir, date)),
        (_, _, Some(accel), Some(gps)) => Ok(SessionFiles {
            accel: accel.clone(),
            gps: gps.clone(),
        }),
        _ => bail!("pass either --dir with --date, or both --accel and --gps"),
    }
}

fn read_table(path: &Path) -> Result<Array2<f64>> {
    load_table(path).with_context(|| format!("reading {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            let context = format!("loading config {}", path.display());
            AlignConfig::load(path).context(context)?
        }
        None => AlignConfig::default(),
    };
    if let Some(min_speed) = args.min_speed_kmh {
        config.min_speed_kmh = min_speed;
    }
    config.validate()?;

    let files = session_files(&args)?;
    let accel = read_table(&files.accel)?;
    let gps = read_table(&files.gps)?;
    log::info!(
        "loaded {} accelerometer rows, {} GPS rows",
        accel.nrows(),
        gps.nrows()
    );

    let (b, a) = config.filter_coefficients()?;
    let faccel = filter_table(&b, &a, accel.view())?;

    let result = estimate_batch(faccel.view(), gps.view(), &BatchConfig::from(&config))?;
    let estimate = &result.estimate;

    if let Some(path) = &args.rotated_out {
        let rotated = rotate_series(&estimate.quaternion, faccel.view())?;
        let rows: Vec<Vec<f64>> = rotated.rows().into_iter().map(|r| r.to_vec()).collect();
        let writer = BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        );
        serde_json::to_writer(writer, &rows)?;
        log::info!("wrote {} rotated rows to {}", rows.len(), path.display());
    }

    let report = Report {
        quaternion: estimate.quaternion.to_scalar_first(),
        angle_deg: estimate.angle_deg(),
        observations: estimate.observations,
        gps_samples: result.gps_samples,
        skipped: result.skipped,
        eigenvalues: estimate.eigenvalues,
        eigen_gap: estimate.eigen_gap(),
        degenerate: estimate.degenerate,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
