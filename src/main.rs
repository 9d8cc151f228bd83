//! memsweep - resource telemetry and memory reclamation for Windows

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use memsweep::core::config::default_config_path;
use memsweep::monitor::{
    render_cleanup_report, render_dashboard, render_step, render_window_summary,
};
use memsweep::{AppConfig, Coordinator, Host, ReclamationEvent, StepKind};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "memsweep")]
#[command(about = "Resource telemetry and best-effort memory reclamation", long_about = None)]
struct Cli {
    /// Config file (defaults to the per-user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show current resource readings
    Status,

    /// Sample continuously and show a live dashboard
    Monitor {
        /// Stop after this many seconds (runs until Ctrl+C otherwise)
        #[arg(short, long)]
        duration: Option<u64>,

        /// Dashboard refresh period in seconds
        #[arg(short, long, default_value = "1")]
        refresh: u64,
    },

    /// Run the full reclamation pass
    Clean {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a single reclamation step
    Step {
        /// One of: flush-dns-cache, purge-temp-files, trim-working-sets,
        /// enumerate-startup-entries, suspend-optional-services, clear-standby-list
        kind: StepKind,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show configuration
    Config {
        /// Write the effective configuration to the default location
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.log_level) {
        eprintln!("Error: failed to initialise logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins over the configured level. Logs go to stderr so JSON
/// output on stdout stays parseable.
fn init_logging(level: &str) -> CliResult {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

async fn run(command: Commands, config: AppConfig) -> CliResult {
    let host = Host::detect()?;

    match command {
        Commands::Status => status(&host, &config).await,
        Commands::Monitor { duration, refresh } => {
            let coordinator = coordinator(&host, &config)?;
            monitor(coordinator, duration.map(Duration::from_secs), refresh).await
        }
        Commands::Clean { json } => {
            let coordinator = Arc::new(coordinator(&host, &config)?);
            clean(coordinator, json).await
        }
        Commands::Step { kind, json } => {
            let coordinator = coordinator(&host, &config)?;
            let report = coordinator.run_step(kind).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", render_step(&report));
            }
            Ok(())
        }
        Commands::Config { save } => {
            println!("Current Configuration:");
            println!("{}", config.to_toml()?);
            if save {
                let path = default_config_path().ok_or("no config directory on this system")?;
                config.save(&path)?;
                println!("Saved to {}", path.display());
            }
            Ok(())
        }
    }
}

fn coordinator(host: &Host, config: &AppConfig) -> Result<Coordinator, memsweep::ReclaimError> {
    // CPU usage needs two refreshes some distance apart
    Ok(Coordinator::new(
        host.sampler(config),
        host.ring_buffer(config)?,
        host.engine(config),
        config.sampling.interval(),
    )?
    .with_warmup(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL))
}

async fn status(host: &Host, config: &AppConfig) -> CliResult {
    // CPU usage needs two refreshes some distance apart
    tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
    let sample = host.sampler(config).sample()?;
    let memory = host.collaborators.provider.memory_stats()?;

    println!("System Status:");
    println!("  Elevated:       {}", if host.admin.is_elevated() { "yes" } else { "no" });
    println!("  CPU:            {:.1}%", sample.cpu_percent);
    println!(
        "  RAM available:  {:.2} GB of {:.2} GB ({:.1}% used)",
        sample.ram_available_gb(),
        memory.total_bytes as f64 / (1024.0 * 1024.0 * 1024.0),
        memory.load_percent()
    );
    println!(
        "  Disk free:      {:.2} GB ({})",
        sample.disk_free_gb(),
        config.sampling.disk_path().display()
    );
    match sample.temperature_celsius {
        Some(celsius) => println!("  Temperature:    {:.1}°C", celsius),
        None => println!("  Temperature:    unavailable"),
    }
    Ok(())
}

async fn monitor(coordinator: Coordinator, duration: Option<Duration>, refresh: u64) -> CliResult {
    println!("Starting monitor (Ctrl+C to exit)...\n");
    let sampling = coordinator.start_sampling();

    let buffer = coordinator.buffer();
    let render = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(refresh.max(1)));
        loop {
            ticker.tick().await;
            // Clear screen
            print!("\x1B[2J\x1B[1;1H");
            println!("{}", render_dashboard(&buffer.snapshot()));
        }
    });

    match duration {
        Some(limit) => {
            tokio::select! {
                _ = tokio::time::sleep(limit) => {}
                _ = tokio::signal::ctrl_c() => {}
            }
        }
        None => tokio::signal::ctrl_c().await?,
    }

    render.abort();
    sampling.shutdown().await;
    info!("Monitor stopped with {} samples retained", coordinator.snapshot().len());
    Ok(())
}

async fn clean(coordinator: Arc<Coordinator>, json: bool) -> CliResult {
    let mut events = coordinator.subscribe();
    let progress = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ReclamationEvent::StepFinished(step) if !json => println!("{}", render_step(&step)),
                ReclamationEvent::PassFinished(_) => break,
                _ => {}
            }
        }
    });

    let interrupt = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                coordinator.cancel_reclamation();
            }
        })
    };

    let sampling = coordinator.start_sampling();
    let report = coordinator.clean_all().await;
    interrupt.abort();
    sampling.shutdown().await;
    let report = report?;
    let _ = progress.await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        println!("{}", render_cleanup_report(&report));
        println!("{}", render_window_summary(&coordinator.snapshot()));
    }
    Ok(())
}
