//! 云场景演示
//!
//! 运行一个 broker + datacenter 场景，演示定时终止、暂停/恢复与事件追踪。

use clap::Parser;
use cloudsim_rs::demo::{ScenarioSpec, build_scenario};
use cloudsim_rs::sim::{SimTime, Simulation};
use cloudsim_rs::trace::{self, TraceLogger};
use std::cell::RefCell;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;
use std::thread;

#[derive(Debug, Parser)]
#[command(name = "kernel-demo", about = "Run a broker/datacenter scenario on the simulation kernel")]
struct Args {
    /// Path to scenario.json (defaults to a built-in three-cloudlet scenario)
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Stop the simulation exactly at this simulated time (seconds)
    #[arg(long)]
    terminate_at: Option<f64>,

    /// Pause at this simulated time; a controller thread resumes it
    #[arg(long)]
    pause_at: Option<f64>,

    /// Override the fallback clock step used while waiting for the termination time
    #[arg(long)]
    min_time_between_events: Option<f64>,

    /// Output event trace JSON file
    #[arg(long)]
    trace_json: Option<PathBuf>,
}

/// 等待暂停控制线程结束；线程 panic 作为错误返回
fn join_controller(handle: thread::JoinHandle<()>) -> Result<(), String> {
    handle
        .join()
        .map_err(|_| "pause controller thread panicked".to_string())
}

fn run(args: Args) -> Result<(), String> {
    let mut spec = match &args.scenario {
        Some(path) => ScenarioSpec::from_path(path)
            .map_err(|e| format!("failed to load scenario {}: {e}", path.display()))?,
        None => ScenarioSpec::default(),
    };
    if let Some(step) = args.min_time_between_events {
        spec.sim.min_time_between_events = step;
    }
    spec.validate().map_err(|e| e.to_string())?;

    let mut sim = Simulation::new(spec.sim.clone());
    let report = build_scenario(&mut sim, &spec);

    let logger = args
        .trace_json
        .as_ref()
        .map(|_| Rc::new(RefCell::new(TraceLogger::default())));
    if let Some(logger) = &logger {
        trace::attach(&mut sim, Rc::clone(logger));
    }

    if let Some(t) = args.terminate_at {
        if !sim.terminate_at(SimTime(t)) {
            return Err(format!("invalid --terminate-at {t}"));
        }
    }

    let controller = match args.pause_at {
        Some(t) => {
            if !sim.pause_at(SimTime(t)) {
                return Err(format!("invalid --pause-at {t}"));
            }
            let ctl = sim.control();
            Some(thread::spawn(move || {
                if let Some(at) = ctl.wait_until_paused() {
                    println!("paused @ {at}");
                    ctl.resume();
                }
            }))
        }
        None => None,
    };

    let result = sim.start();
    if let Some(handle) = controller {
        // 仿真可能在到达暂停时间前就结束了：释放仍在等待的控制线程
        sim.abort();
        join_controller(handle)?;
    }
    let final_clock = result.map_err(|e| e.to_string())?;

    let report = report.borrow();
    for r in &report.finished {
        println!(
            "cloudlet id={} submitted={:.2} finish={:.2}",
            r.id, r.submitted, r.finish
        );
    }
    println!(
        "done @ {}, reason={}, finished_cloudlets={}, events={}",
        final_clock,
        sim.stop_reason()
            .map(|r| format!("{r:?}"))
            .unwrap_or_else(|| "unknown".to_string()),
        report.finished.len(),
        sim.events_processed()
    );

    if let (Some(path), Some(logger)) = (&args.trace_json, &logger) {
        let mut logger = logger.borrow_mut();
        logger.resolve_names(&sim);
        logger
            .write_json(path)
            .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
    }
    Ok(())
}

fn main() -> ExitCode {
    // 初始化 tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
