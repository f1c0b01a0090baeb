//! `hdlvm run`: simulate a design file to its stop time.
//!
//! Loads the design and its run configuration, installs configured clocks
//! and stimulus, runs the kernel, and prints either every traced change or
//! the final signal values.

use std::error::Error;
use std::io::{self, Write};
use std::path::Path;
use std::rc::Rc;

use hdlvm_config::{
    load_config, load_config_file, parse_duration, ConfigError, HdlvmConfig, CONFIG_FILE,
};
use hdlvm_ir::Library;
use hdlvm_sim::{
    format_fs, load_design_file, ChangeLog, Drive, RunResult, SimConfig, SimError, SimKernel,
    Stimulus,
};
use tracing::info;

use crate::{GlobalArgs, RunArgs};

/// Loads the configuration named by `--config`, or `hdlvm.toml` beside the
/// design when one exists, or the defaults.
pub fn load_run_config(args: &RunArgs) -> Result<HdlvmConfig, ConfigError> {
    if let Some(path) = &args.config {
        return load_config_file(path);
    }
    let dir = args
        .design
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    if dir.join(CONFIG_FILE).is_file() {
        load_config(dir)
    } else {
        Ok(HdlvmConfig::default())
    }
}

/// Runs the `hdlvm run` command. Returns exit code 0 on a clean stop.
pub fn run(
    args: &RunArgs,
    config: &HdlvmConfig,
    global: &GlobalArgs,
) -> Result<i32, Box<dyn Error>> {
    let mut stdout = io::stdout().lock();
    let result = execute(args, config, &mut stdout)?;
    if !global.quiet {
        eprintln!(
            "    Finished at {} ({} events, {} delta cycles, {} signal changes)",
            result.final_time, result.events_applied, result.total_deltas, result.signal_changes
        );
    }
    Ok(0)
}

/// `--stop` wins over `sim.stop_time`; one of them is required.
fn stop_time(args: &RunArgs, config: &HdlvmConfig) -> Result<u64, ConfigError> {
    match (&args.stop, config.sim.stop_time) {
        (Some(text), _) => parse_duration(text),
        (None, Some(duration)) => Ok(duration.fs()),
        (None, None) => Err(ConfigError::MissingField("sim.stop_time".to_string())),
    }
}

fn execute(
    args: &RunArgs,
    config: &HdlvmConfig,
    out: &mut dyn Write,
) -> Result<RunResult, Box<dyn Error>> {
    let design = load_design_file(&args.design)?;
    let stop = stop_time(args, config)?;
    info!(design = %design.name, stop = %format_fs(stop), "starting simulation");

    let sim = SimConfig {
        stop_time: Some(stop),
        max_deltas: config.sim.max_deltas,
        max_steps: config.sim.max_steps,
        fold_rising_edges: config.sim.fold_rising_edges,
    };
    let mut kernel = design.build_kernel(&Rc::new(Library::ieee()), &sim)?;
    install_clocks(&mut kernel, config)?;
    install_stimulus(&mut kernel, config)?;

    let log = (args.trace || !args.watch.is_empty()).then(ChangeLog::new);
    if let Some(log) = &log {
        if args.watch.is_empty() {
            kernel.register_waveform_listener(log.clone());
        } else {
            let ids = args
                .watch
                .iter()
                .map(|name| {
                    kernel
                        .find_signal(name)
                        .ok_or_else(|| SimError::UnknownSignal(name.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            kernel.register_signal_listener(ids, log.clone())?;
        }
    }

    let result = kernel.run();
    match &log {
        Some(log) => {
            for change in log.changes() {
                writeln!(out, "{} {} {}", change.time, change.signal, change.value)?;
            }
        }
        None if result.is_ok() => {
            for (_, signal) in kernel.signals() {
                writeln!(out, "{} = {}", signal.name(), signal.value())?;
            }
        }
        None => {}
    }
    Ok(result?)
}

fn install_clocks(kernel: &mut SimKernel, config: &HdlvmConfig) -> Result<(), SimError> {
    for clock in &config.clocks {
        let id = kernel
            .find_signal(&clock.signal)
            .ok_or_else(|| SimError::UnknownSignal(clock.signal.clone()))?;
        kernel.add_clock(id, clock.high.fs(), clock.low.fs())?;
    }
    Ok(())
}

fn install_stimulus(kernel: &mut SimKernel, config: &HdlvmConfig) -> Result<(), Box<dyn Error>> {
    if config.stimulus.is_empty() {
        return Ok(());
    }
    let mut stimulus = Stimulus::new("stimulus");
    for entry in &config.stimulus {
        let id = kernel
            .find_signal(&entry.signal)
            .ok_or_else(|| SimError::UnknownSignal(entry.signal.clone()))?;
        let value = kernel
            .signal(id)?
            .ty()
            .value_from_literal(&entry.value)
            .map_err(|e| format!("stimulus for '{}' at {}: {e}", entry.signal, entry.at))?;
        stimulus.push(Drive {
            at_fs: entry.at.fs(),
            signal: id,
            value,
        });
    }
    kernel.add_process(Box::new(stimulus));
    Ok(())
}
