use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use stressmap::{pipeline, Config, CountFields};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Regional update-intensity anomalies from enrolment and update extracts"
)]
struct Args {
    /// Directory searched recursively for *enrolment*, *demographic* and *biometric* CSVs
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,
    #[arg(long, default_value = "Chart1_Anomalies.svg")]
    anomaly_chart: PathBuf,
    #[arg(long, default_value = "Chart2_Prediction.svg")]
    prediction_chart: PathBuf,
    /// Regions listed in the anomaly report
    #[arg(long, default_value_t = 5)]
    top: usize,
    #[arg(long, default_value_t = 50)]
    bins: usize,
    /// Reference line, in standard deviations above the mean intensity
    #[arg(long, default_value_t = 3.0)]
    sigma: f64,
    /// Comma-separated enrolment count columns (default: every numeric column)
    #[arg(long)]
    enrolment_fields: Option<String>,
    #[arg(long)]
    demographic_fields: Option<String>,
    #[arg(long)]
    biometric_fields: Option<String>,
    /// Print the anomaly report as JSON
    #[arg(long)]
    json: bool,
    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let fields = |raw: Option<String>| {
            raw.as_deref()
                .map(CountFields::from_list)
                .unwrap_or_default()
        };
        Config {
            data_dir: args.data_dir,
            anomaly_chart: args.anomaly_chart,
            prediction_chart: args.prediction_chart,
            top_n: args.top,
            histogram_bins: args.bins,
            threshold_sigma: args.sigma,
            enrolment_fields: fields(args.enrolment_fields),
            demographic_fields: fields(args.demographic_fields),
            biometric_fields: fields(args.biometric_fields),
            json_report: args.json,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // ─── 1) init logging ─────────────────────────────────────────────
    let default_filter = if args.quiet { "warn" } else { "info" };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    // ─── 2) run ──────────────────────────────────────────────────────
    let config = Config::from(args);
    info!("starting analysis in {}", config.data_dir.display());
    let out = pipeline::run(&config)?;

    // ─── 3) report ───────────────────────────────────────────────────
    if !config.json_report {
        println!("\nTOP {} ANOMALIES:", out.anomalies.len());
    }
    println!("{}", out.report);

    info!(regions = out.master.len(), "done");
    Ok(())
}
