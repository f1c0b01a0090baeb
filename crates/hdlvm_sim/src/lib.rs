//! Delta-cycle HDL simulator with a stack-machine process engine.
//!
//! This crate runs processes compiled by `hdlvm_ir` against a discrete-event
//! scheduler with VHDL-style delta cycles. Signals change only when the
//! kernel applies a queued update; processes observe changes through
//! wakeups and `'EVENT`, and time advances only once a timestamp has
//! converged.
//!
//! # Usage
//!
//! ```ignore
//! use hdlvm_sim::{load_design, simulate, SimConfig};
//!
//! let design = load_design(&text)?;
//! let config = SimConfig { stop_time: Some(100_000_000), ..SimConfig::default() };
//! let result = simulate(&design, &config)?;
//! println!("stopped at {}", result.final_time);
//! ```
//!
//! # Modules
//!
//! - `time`: femtosecond time with delta cycles
//! - `signal`: signal samples and edge predicates
//! - `event`: events and the ordered queue
//! - `process`: the `Process` trait and its scheduler context
//! - `vm`: the compiled-process interpreter
//! - `kernel`: the scheduler loop and clock generators
//! - `stimulus`: timed drives from configuration and tests
//! - `waveform`: the value-change listener hook
//! - `design`: the flat design-file loader

#![warn(missing_docs)]

pub mod design;
pub mod error;
pub mod event;
pub mod kernel;
pub mod process;
pub mod signal;
pub mod stimulus;
pub mod time;
pub mod vm;
pub mod waveform;

use std::rc::Rc;

use hdlvm_ir::Library;

pub use design::{load_design, load_design_file, Design, SignalDecl};
pub use error::SimError;
pub use kernel::{KernelState, RunResult, SimKernel, DEFAULT_MAX_DELTAS};
pub use process::{Process, ProcessContext, Resume};
pub use signal::{Sample, Signal, UpdateTarget};
pub use stimulus::{Drive, Stimulus};
pub use time::{format_fs, fs_after, SimTime};
pub use vm::VmProcess;
pub use waveform::{Change, ChangeLog, WaveformListener};

/// Default per-resume instruction budget.
pub const DEFAULT_MAX_STEPS: u64 = 1_000_000;

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Stop time in femtoseconds. Without one the run ends in a scheduling
    /// error once the queue is empty.
    pub stop_time: Option<u64>,
    /// Maximum delta cycles per timestamp.
    pub max_deltas: u32,
    /// Maximum instructions per process resume.
    pub max_steps: u64,
    /// Compile clock-edge tests into a single jump.
    pub fold_rising_edges: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            stop_time: None,
            max_deltas: DEFAULT_MAX_DELTAS,
            max_steps: DEFAULT_MAX_STEPS,
            fold_rising_edges: true,
        }
    }
}

/// High-level entry point: builds a kernel for `design` with the IEEE
/// library and runs it to the configured stop time.
pub fn simulate(design: &Design, config: &SimConfig) -> Result<RunResult, SimError> {
    let library = Rc::new(Library::ieee());
    let mut kernel = design.build_kernel(&library, config)?;
    kernel.run()
}
