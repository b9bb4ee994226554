//! `rovnav` – runs the pose estimation loop against one robot.
//!
//! ```text
//! rovnav <address> <robot-id>
//! ```
//!
//! `<address>` is the `host[:port]` of the robot bridge, or `sim` for the
//! built-in simulated robot.  The binary:
//!
//! 1. Loads `~/.rovnav/config.toml`, writing the defaults on first run.
//! 2. Builds a [`PoseController`] from it.
//! 3. Ticks the controller at a fixed period and prints the pose after
//!    every successful cycle.
//! 4. Stops cleanly on **Ctrl-C**.

mod config;

use colored::Colorize;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use rovnav_hal::sim::SimReading;
use rovnav_hal::{HttpRobot, RobotInterface, SimRobot};
use rovnav_perception::{CoefficientSource, DirectorySource, StaticSource};
use rovnav_runtime::{CycleOutcome, PoseController};
use rovnav_types::PoseSnapshot;

const USAGE: &str = "usage: rovnav <address> <robot-id>";

fn main() -> ExitCode {
    let _telemetry = rovnav_runtime::init_tracing("rovnav");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (address, robot_id) = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(msg) => {
            eprintln!("{}: {}", "Error".red().bold(), msg);
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    print_banner();

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load_or_create() {
        Ok(cfg) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping after this cycle …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    // ── Hardware and filters ──────────────────────────────────────────────
    let hardware: Box<dyn RobotInterface> = if address == "sim" {
        Box::new(demo_robot())
    } else {
        match HttpRobot::new(&address, robot_id) {
            Ok(robot) => Box::new(robot),
            Err(e) => {
                error!(error = %e, "failed to build robot client");
                eprintln!("{}: {}", "Error".red().bold(), e);
                return ExitCode::FAILURE;
            }
        }
    };

    let source: Box<dyn CoefficientSource> = match &cfg.filters_dir {
        Some(dir) => {
            println!("  Filter coefficients from {}", dir.display().to_string().bold());
            Box::new(DirectorySource::new(dir))
        }
        None => Box::new(StaticSource::builtin()),
    };

    let mut controller = match PoseController::new(hardware, &cfg.controller, source.as_ref()) {
        Ok(controller) => controller,
        Err(e) => {
            error!(error = %e, "controller construction failed");
            eprintln!("{}: {}", "Error".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "  Tracking robot {} at {} in room {} (fail limit {})\n",
        robot_id.to_string().bold(),
        address.as_str().bold(),
        controller.room(),
        controller.fail_limit()
    );

    // ── Cycle loop ────────────────────────────────────────────────────────
    let period = Duration::from_millis(cfg.cycle_period_ms);
    while !shutdown.load(Ordering::SeqCst) {
        let started = Instant::now();
        match controller.tick() {
            CycleOutcome::Success { .. } => print_pose(&controller.snapshot()),
            CycleOutcome::Failed { failures } => println!(
                "  {} robot unreachable after {} polls; holding last pose",
                "stale".yellow(),
                failures
            ),
        }
        if let Some(rest) = period.checked_sub(started.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    info!(
        cycles = controller.cycles(),
        failed = controller.failed_cycles(),
        "pose loop stopped"
    );
    println!("{}", "  ✓ Exiting rovnav.".green());
    ExitCode::SUCCESS
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn parse_args(args: &[String]) -> Result<(String, u32), String> {
    match args {
        [address, id] => {
            let robot_id = id
                .parse::<u32>()
                .map_err(|_| format!("robot id '{id}' is not a non-negative integer"))?;
            Ok((address.clone(), robot_id))
        }
        _ => Err(format!("expected 2 arguments, got {}", args.len())),
    }
}

/// Simulated robot curving slowly away from the room-0 beacon origin.
fn demo_robot() -> SimRobot {
    SimRobot::new().with_reading(SimReading::default().wheels(6, 6, 6).beacon(199, 154, 0.0))
}

fn print_pose(snapshot: &PoseSnapshot) {
    let pose = snapshot.pose;
    println!(
        "  #{:<6} x {:>9.2} cm   y {:>9.2} cm   θ {:>6.3} rad",
        snapshot.cycle.to_string().dimmed(),
        pose.x(),
        pose.y(),
        pose.theta()
    );
}

fn print_banner() {
    println!();
    println!("  {} {}",
        "rovnav".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Planar pose estimation");
    println!();
}
