//! CLI entry point for flyscan.
//!
//! Runs simulated fly scans against mock axes so the coordination layer can
//! be exercised without hardware:
//!
//! ```bash
//! flyscan cv --start 0 --end 10 --step 2 --period 0.25
//! flyscan raster --start 0 --end 2 --step 1 --period 0.1 \
//!     --outer-start 0 --outer-end 1 --outer-step 0.5
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use flyscan::hardware::mock::MockAxis;
use flyscan::logging::{self, LogConfig};
use flyscan::{
    AxisController, ConstantVelocityMove, MoveController, MoveProfile, RasterMove, Settings,
};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "flyscan")]
#[command(about = "Simulated continuous-motion scans with synchronized triggers", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Optional settings file (TOML)
    #[arg(long)]
    settings: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Constant-velocity sweep on one simulated axis
    Cv {
        /// Sweep start position
        #[arg(long, default_value_t = 0.0)]
        start: f64,

        /// Sweep end position
        #[arg(long, default_value_t = 10.0)]
        end: f64,

        /// Position increment per trigger
        #[arg(long, default_value_t = 2.0)]
        step: f64,

        /// Seconds between triggers
        #[arg(long, default_value_t = 0.25)]
        period: f64,
    },

    /// 2D raster over two simulated axes
    Raster {
        /// Inner sweep start position
        #[arg(long, default_value_t = 0.0)]
        start: f64,

        /// Inner sweep end position
        #[arg(long, default_value_t = 2.0)]
        end: f64,

        /// Inner position increment per trigger
        #[arg(long, default_value_t = 1.0)]
        step: f64,

        /// Seconds between triggers
        #[arg(long, default_value_t = 0.1)]
        period: f64,

        /// Outer axis start position
        #[arg(long, default_value_t = 0.0)]
        outer_start: f64,

        /// Outer axis end position
        #[arg(long, default_value_t = 1.0)]
        outer_end: f64,

        /// Outer axis increment between sweeps
        #[arg(long, default_value_t = 0.5)]
        outer_step: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&LogConfig::new(logging::parse_level(&cli.log_level)?))?;

    let settings = match &cli.settings {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };

    let (axes, profile): (Vec<Arc<dyn AxisController>>, MoveProfile) = match cli.command {
        Commands::Cv {
            start,
            end,
            step,
            period,
        } => (
            vec![Arc::new(MockAxis::new("x"))],
            MoveProfile::ConstantVelocity(ConstantVelocityMove::new(start, end, step, period)),
        ),
        Commands::Raster {
            start,
            end,
            step,
            period,
            outer_start,
            outer_end,
            outer_step,
        } => (
            vec![Arc::new(MockAxis::new("x")), Arc::new(MockAxis::new("y"))],
            MoveProfile::Raster(RasterMove::new(
                ConstantVelocityMove::new(start, end, step, period),
                outer_start,
                outer_end,
                outer_step,
            )),
        ),
    };

    let mut controller = MoveController::with_settings(axes, &settings);
    controller.configure_profile(profile).await?;
    info!(
        total_time_s = controller.total_time()?,
        "scan configured"
    );

    let mut events = controller.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            info!(
                point = event.index,
                positions = ?event.positions,
                "trigger"
            );
        }
    });

    controller.prepare_for_move().await?;
    controller.start_move().await?;
    controller.wait_while_moving().await?;

    let status = controller.status();
    info!(points = status.points_completed, "scan finished");
    printer.abort();
    Ok(())
}
