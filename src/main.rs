use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use log::{error, warn};

use hh_sketch::{
    harness::{run_window, Summary},
    trace::{GroundTruth, Trace},
    zipf::{self, ZipfConfig},
    ChainSketch, HeavyHitterBackend, MeasurementConfig, TwoFaSketch,
};

#[derive(Parser)]
#[command(name = "hh_sketch")]
#[command(about = "Heavy-hitter measurement over flow traces")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log at info level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure accuracy and throughput over trace files <dir>/<n>.dat
    Measure {
        trace_dir: PathBuf,

        /// First and last file number (inclusive)
        #[arg(long, default_value = "0")]
        first: usize,
        #[arg(long, default_value = "9")]
        last: usize,

        #[arg(short, long, default_value = "500")]
        memory_kb: usize,

        #[arg(short, long, value_enum, default_value = "two-fa")]
        backend: Backend,

        /// Seed for randomized backends
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Generate Zipf traces <out>/<n>.dat with <out>/<n>.stat summaries
    GenZipf {
        out_dir: PathBuf,

        #[arg(long, default_value = "10")]
        files: usize,
        #[arg(long, default_value = "0.4")]
        alpha: f64,
        #[arg(long, default_value = "100000")]
        flows: u32,
        #[arg(long, default_value = "3000000")]
        packets: usize,
        #[arg(long, default_value = "0")]
        seed: u32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    TwoFa,
    Chain,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.verbose {
        hh_sketch::log::init_verbose_logger();
    } else {
        hh_sketch::log::init_logger();
    }

    let result = match cli.command {
        Commands::Measure {
            trace_dir,
            first,
            last,
            memory_kb,
            backend,
            seed,
        } => {
            let config = MeasurementConfig {
                memory_kb,
                ..MeasurementConfig::default()
            };
            measure(&trace_dir, first..=last, &config, backend, seed)
        }
        Commands::GenZipf {
            out_dir,
            files,
            alpha,
            flows,
            packets,
            seed,
        } => gen_zipf(&out_dir, files, alpha, flows, packets, seed),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn measure(
    dir: &Path,
    files: std::ops::RangeInclusive<usize>,
    config: &MeasurementConfig,
    backend: Backend,
    seed: u64,
) -> hh_sketch::Result<()> {
    config.validate()?;
    println!("Measurement starts, memory: {}KB", config.memory_kb);

    let mut summary = Summary::default();
    for n in files {
        let path = dir.join(format!("{}.dat", n));
        let trace = match Trace::read(&path, config.max_packets) {
            Ok(t) => t,
            Err(e) => {
                warn!("skipping {}: {}", path.display(), e);
                continue;
            }
        };
        let truth = GroundTruth::from_trace(&trace);
        let threshold = config.threshold(trace.len());
        println!("\n{}: {} packets, {} flows", path.display(), trace.len(), truth.len());

        let mut sketch: Box<dyn HeavyHitterBackend> = match backend {
            Backend::TwoFa => {
                let s = TwoFaSketch::from_config(config.sketch_config(threshold))?;
                println!("gate threshold={}", s.gate_threshold());
                Box::new(s)
            }
            Backend::Chain => Box::new(ChainSketch::from_memory(
                config.memory_bytes(),
                seed.wrapping_add(n as u64),
            )?),
        };
        let report = run_window(sketch.as_mut(), &trace, &truth, threshold, config);

        println!("heavy hitters: threshold={}, number={}", report.threshold, report.reported);
        println!("precision_rate={:.6}", report.accuracy.precision);
        println!("recall_rate={:.6}", report.accuracy.recall);
        println!("F_score={:.6}", report.accuracy.f1);
        println!("ARE={:.6}", report.accuracy.are);
        println!("AAE={:.6}", report.accuracy.aae);
        println!("throughput={:.2} Mpps", report.throughput_mpps);
        if let (Some(stats), Some(ratio)) = (report.stats, report.eviction_ratio) {
            println!("cnt ratio={:.6}, full evictions={}", ratio, stats.full_evictions);
        }
        summary.add(&report);
    }

    if let Some((avg, throughput)) = summary.average() {
        println!("\naverage over {} files", summary.windows());
        println!("average precision rate={:.6}", avg.precision);
        println!("average recall rate={:.6}", avg.recall);
        println!("average F1 score={:.6}", avg.f1);
        println!("average ARE={:.6}", avg.are);
        println!("average AAE={:.6}", avg.aae);
        println!("average throughput={:.2} Mpps", throughput);
    }
    Ok(())
}

fn gen_zipf(
    dir: &Path,
    files: usize,
    alpha: f64,
    flows: u32,
    packets: usize,
    seed: u32,
) -> hh_sketch::Result<()> {
    std::fs::create_dir_all(dir)?;
    for n in 0..files {
        let config = ZipfConfig {
            alpha,
            flows,
            packets,
            seed: seed.wrapping_add(n as u32 * 4),
        };
        let mut out = BufWriter::new(File::create(dir.join(format!("{}.dat", n)))?);
        let counts = zipf::generate(&config, &mut out)?;
        out.flush()?;

        let mut stat = BufWriter::new(File::create(dir.join(format!("{}.stat", n)))?);
        zipf::write_stats(&mut stat, &counts, packets)?;
        stat.flush()?;
        println!("{}.dat: {} flows, {} packets", n, counts.len(), packets);
    }
    Ok(())
}
