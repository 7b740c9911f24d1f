use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use segcam::app::Presenter;
use segcam::catalog::PRESETS;
use segcam::{AnalysisMode, AppError, Configuration, CoordinatorBuilder};

#[derive(Parser)]
#[command(name = "segcam", about = "Run vision models over camera frames", version)]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the bundled vision models
    List,
    /// Analyze a directory of frames
    Run(RunArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Segment,
    Classify,
}

impl From<ModeArg> for AnalysisMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Segment => AnalysisMode::Segment,
            ModeArg::Classify => AnalysisMode::Classify,
        }
    }
}

#[derive(clap::Args)]
struct RunArgs {
    /// Directory of frames (png/jpg/bmp, or raw I420 *.yuv when configured)
    #[arg(long)]
    frames: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Catalog key or path to an ONNX model
    #[arg(long)]
    model: Option<String>,
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,
    /// Where overlay PNGs are written
    #[arg(long)]
    out: Option<PathBuf>,
    /// Sensor rotation in degrees (0, 90, 180, 270)
    #[arg(long)]
    rotation: Option<u32>,
    /// Write a JSON session summary
    #[arg(long)]
    report: Option<PathBuf>,
    #[arg(long)]
    timeout_ms: Option<u64>,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn list_models() {
    for preset in PRESETS.iter() {
        println!("{preset}");
    }
}

async fn run(args: RunArgs) -> Result<(), AppError> {
    let configuration = Configuration::load(args.config.as_deref())?;

    let mut builder = CoordinatorBuilder::new(configuration).frames_dir(args.frames);
    if let Some(model) = args.model {
        builder = builder.model(model);
    }
    if let Some(mode) = args.mode {
        builder = builder.mode(mode.into());
    }
    if let Some(out) = args.out {
        builder = builder.output_dir(out);
    }
    if let Some(rotation) = args.rotation {
        builder = builder.rotation_degrees(rotation);
    }
    if let Some(timeout_ms) = args.timeout_ms {
        builder = builder.analyzer_timeout_ms(timeout_ms);
    }

    let mut coordinator = builder.build()?;
    let presenter = Presenter::new(
        coordinator.configuration().moving_avg_period,
        coordinator.configuration().output_dir.clone(),
    );
    let events = coordinator
        .take_events()
        .ok_or(AppError::Pipeline("event stream unavailable".to_string()))?;

    let outcome = tokio::select! {
        outcome = presenter.run(events) => outcome,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, stopping");
            coordinator.stop();
            Err(AppError::Halted)
        }
    };
    let stats = coordinator.join().await?;
    let summary = outcome?;

    if let Some(stats) = stats {
        info!(
            "Captured {} frames, dropped {}, analyzed {}",
            stats.captured, stats.dropped, summary.frames_analyzed
        );
    }
    if let Some(avg) = summary.average_forward_ms {
        info!("Average forward time {avg:.0}ms");
    }
    if let Some(path) = args.report {
        summary.write_json(&path)?;
        info!("Wrote session report to {}", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::List => {
            list_models();
            Ok(())
        }
        Command::Run(args) => run(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
