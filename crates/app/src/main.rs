// Logging goes to a daily-rotated file under logs/ so PASS/FAIL lines stay
// readable on the terminal. Level comes from --log-level or RUST_LOG.
use clap::{Parser, Subcommand};
use readycheck_app::probes::{
    ensure_results_dir, write_report_json, CameraCheck, CheckContext, CheckError, CheckReport,
    MicrophoneCheck, NetworkCheck, SystemCheck,
};
use readycheck_app::session::{CheckKind, ReadinessSession};
use readycheck_foundation::ShutdownHandler;
use std::path::PathBuf;
use std::time::Duration;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "readycheck")]
#[command(version)]
#[command(about = "Pre-interview system check for camera, microphone, and network")]
#[command(
    long_about = "Exercises the camera, microphone, and network connection, reports pass/fail \
per check, and gates the interview start on all three passing"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Microphone device name
    #[arg(short = 'D', long, global = true)]
    device: Option<String>,

    /// Camera device index
    #[arg(long, default_value = "0", global = true)]
    camera_index: u32,

    /// Microphone metering window in seconds
    #[arg(short = 'd', long, default_value = "8", global = true)]
    duration: u64,

    /// Speed endpoint base URL
    #[arg(short = 'e', long, default_value = "http://127.0.0.1:3000", global = true)]
    endpoint: String,

    /// Thresholds TOML file
    #[arg(short = 't', long, global = true)]
    thresholds: Option<PathBuf>,

    /// Output directory for check reports
    #[arg(short = 'o', long, global = true)]
    output_dir: Option<PathBuf>,

    /// Log level filter (overrides RUST_LOG)
    #[arg(long = "log-level", default_value = "info")]
    log_level: String,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the camera check
    Camera,
    /// Run the microphone check
    Mic,
    /// Run the network check
    Network,
    /// Run all three checks and report readiness
    All,
    /// List available capture devices
    ListDevices,
}

fn init_logging(cli_level: &str) -> anyhow::Result<()> {
    std::fs::create_dir_all("logs")?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "readycheck.log");
    let (non_blocking_file, _guard) = tracing_appender::non_blocking(file_appender);
    let effective_level = if !cli_level.is_empty() {
        cli_level.to_string()
    } else {
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string())
    };
    let env_filter = EnvFilter::try_new(effective_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();
    std::mem::forget(_guard);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let shutdown = ShutdownHandler::new().install().await;

    let exit_code = tokio::select! {
        code = run(&cli) => code?,
        _ = shutdown.wait() => {
            tracing::info!("Interrupted; exiting");
            eprintln!("Interrupted.");
            130
        }
    };

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

async fn run(cli: &Cli) -> anyhow::Result<i32> {
    match cli.command {
        Commands::Camera => run_single_check(cli, CheckKind::Camera).await,
        Commands::Mic => run_single_check(cli, CheckKind::Microphone).await,
        Commands::Network => run_single_check(cli, CheckKind::Network).await,
        Commands::All => run_all_checks(cli).await,
        Commands::ListDevices => list_devices(),
    }
}

fn create_check_context(cli: &Cli) -> anyhow::Result<CheckContext> {
    let thresholds = match &cli.thresholds {
        Some(path) => readycheck_app::probes::thresholds::load_from_file(path)?,
        None => Default::default(),
    };
    Ok(CheckContext {
        device: cli.device.clone(),
        camera_index: cli.camera_index,
        duration: Duration::from_secs(cli.duration),
        endpoint_base: cli.endpoint.clone(),
        thresholds,
        output_dir: cli.output_dir.clone(),
    })
}

async fn run_check(kind: CheckKind, ctx: &CheckContext) -> Result<CheckReport, CheckError> {
    match kind {
        CheckKind::Camera => CameraCheck::new().run(ctx).await,
        CheckKind::Microphone => MicrophoneCheck::new().run(ctx).await,
        CheckKind::Network => NetworkCheck::new().run(ctx).await,
    }
}

async fn run_single_check(cli: &Cli, kind: CheckKind) -> anyhow::Result<i32> {
    let ctx = create_check_context(cli)?;
    let results_dir = ensure_results_dir(cli.output_dir.as_deref())?;

    if cli.verbose {
        println!("Starting {} check...", kind);
        println!("Device: {}", ctx.device.as_deref().unwrap_or("default"));
        println!("Duration: {}s", ctx.duration.as_secs());
        println!("Output directory: {}", results_dir.display());
        println!();
    }

    match run_check(kind, &ctx).await {
        Ok(report) => {
            let report_path = write_report_json(&results_dir, &report)?;

            if cli.verbose {
                print_report(&report);
                println!("\nReport saved to: {}", report_path.display());
            } else {
                let status = if report.pass { "PASS" } else { "FAIL" };
                println!(
                    "{}: {} - {}",
                    kind,
                    status,
                    report.notes.as_deref().unwrap_or("")
                );
            }
            Ok(if report.pass { 0 } else { 1 })
        }
        Err(e) => {
            eprintln!("Check failed: {}", e.message);
            Ok(1)
        }
    }
}

async fn run_all_checks(cli: &Cli) -> anyhow::Result<i32> {
    let ctx = create_check_context(cli)?;
    let results_dir = ensure_results_dir(cli.output_dir.as_deref())?;
    let mut session = ReadinessSession::new();

    if cli.verbose {
        println!("Running all system checks...");
        println!("Device: {}", ctx.device.as_deref().unwrap_or("default"));
        println!("Endpoint: {}", ctx.endpoint_base);
        println!("Output directory: {}", results_dir.display());
        println!();
    }

    for kind in CheckKind::ALL {
        session.begin(kind)?;
        match run_check(kind, &ctx).await {
            Ok(report) => {
                let status = if report.pass { "PASS" } else { "FAIL" };
                println!(
                    "{}: {}{}",
                    kind,
                    status,
                    report
                        .notes
                        .as_deref()
                        .map(|n| format!(" - {}", n))
                        .unwrap_or_default()
                );
                if cli.verbose {
                    print_report(&report);
                    println!();
                }
                let report_path = write_report_json(&results_dir, &report)?;
                tracing::info!("{} report written to {}", kind, report_path.display());
                session.complete(kind, &report)?;
            }
            Err(e) => {
                println!("{}: FAIL - {}", kind, e.message);
                session.fail(kind, &e)?;
            }
        }
    }

    println!();
    println!("{}", session.status_message());
    if session.is_ready() {
        session.launch_interview()?;
        println!("Interview starting...");
        Ok(0)
    } else {
        Ok(1)
    }
}

fn list_devices() -> anyhow::Result<i32> {
    use cpal::traits::{DeviceTrait, HostTrait};
    use readycheck_camera::CameraManager;

    println!("Microphones:");
    let host = cpal::default_host();
    match host.input_devices() {
        Ok(devices) => {
            for device in devices {
                match device.name() {
                    Ok(name) => println!("  - {}", name),
                    Err(e) => println!("  - (unnamed device: {})", e),
                }
            }
        }
        Err(e) => {
            println!("  Error listing input devices: {}", e);
        }
    }
    if let Some(device) = host.default_input_device() {
        match device.name() {
            Ok(name) => println!("Default microphone: {}", name),
            Err(e) => println!("Default microphone: (error getting name: {})", e),
        }
    } else {
        println!("No default microphone found");
    }

    println!();
    println!("Cameras:");
    match CameraManager::new().enumerate() {
        Ok(cameras) if cameras.is_empty() => println!("  (none found)"),
        Ok(cameras) => {
            for camera in cameras {
                println!("  - [{}] {}", camera.index, camera.name);
            }
        }
        Err(e) => println!("  Error listing cameras: {}", e),
    }

    Ok(0)
}

fn print_report(report: &CheckReport) {
    let status = if report.pass { "PASS" } else { "FAIL" };
    println!("Check: {}", report.check);
    println!("Status: {}", status);
    println!("Notes: {}", report.notes.as_deref().unwrap_or("None"));

    if !report.metrics.is_empty() {
        println!("Metrics:");
        let mut keys: Vec<_> = report.metrics.keys().collect();
        keys.sort();
        for key in keys {
            println!("  {}: {}", key, report.metrics[key]);
        }
    }
}
