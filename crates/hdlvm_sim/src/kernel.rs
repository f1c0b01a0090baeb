//! The delta-cycle scheduler.
//!
//! [`SimKernel`] owns virtual time, the signals, the event queue and every
//! process. A run pops events in `(fs, priority)` order. Each delta cycle
//! applies all updates up to its [`EventKind::DeltaBoundary`] marker, then
//! resumes every process that was woken during that cycle. Time advances only
//! once nothing else is queued at the current timestamp.

use std::collections::BTreeSet;

use hdlvm_common::{Logic, TypeSpec, Value};
use hdlvm_ir::{Arena, ProcessId, SignalId};
use tracing::{debug, trace};

use crate::error::SimError;
use crate::event::{Event, EventKind, EventQueue};
use crate::process::{Process, ProcessContext, Resume};
use crate::signal::{conform, describe, Signal, UpdateTarget};
use crate::time::{format_fs, fs_after, SimTime};
use crate::waveform::WaveformListener;

/// Default limit on delta cycles at one timestamp.
pub const DEFAULT_MAX_DELTAS: u32 = 10_000;

/// Where the scheduler is in its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelState {
    /// No process has run yet.
    Uninitialized,
    /// Processes initialized, or popping the first event of a run.
    Running,
    /// Applying events of the current delta cycle.
    Draining,
    /// Moving to the next timestamp.
    AdvancingTime,
    /// A stop event was reached.
    Stopped,
}

/// Summary of a [`SimKernel::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// Time of the stop event.
    pub final_time: SimTime,
    /// Delta cycles executed after the first one of each timestamp.
    pub total_deltas: u64,
    /// Signal updates, wakes and clock toggles applied.
    pub events_applied: u64,
    /// Updates that changed a signal's value.
    pub signal_changes: u64,
}

/// A process together with its scheduler bookkeeping.
struct ProcessSlot {
    process: Box<dyn Process>,
    /// Signals this process registered a wakeup on since its last resume.
    watching: Vec<SignalId>,
    /// Bumped on every resume; timed wakes carrying an older token are stale.
    wake_token: u64,
    halted: bool,
}

/// A free-running clock generator.
#[derive(Debug, Clone, Copy)]
struct Clock {
    signal: SignalId,
    high_fs: u64,
    low_fs: u64,
}

/// What applying one event asked the loop to do.
enum Applied {
    Continue,
    Boundary,
    Stop,
}

/// A registered listener and the signals it watches (`None` is all).
struct Subscription {
    signals: Option<BTreeSet<SignalId>>,
    listener: Box<dyn WaveformListener>,
}

/// The discrete-event simulation kernel.
///
/// Build it by adding signals, processes, clocks and a stop time, then call
/// [`run`](SimKernel::run). [`initialize`](SimKernel::initialize) may be
/// called explicitly; otherwise the first `run` does it.
pub struct SimKernel {
    signals: Arena<SignalId, Signal>,
    processes: Arena<ProcessId, ProcessSlot>,
    clocks: Vec<Clock>,
    queue: EventQueue,
    listeners: Vec<Subscription>,
    /// Processes woken during the current delta cycle.
    resume_set: BTreeSet<ProcessId>,
    now: u64,
    cycle: u32,
    state: KernelState,
    max_deltas: u32,
    total_deltas: u64,
    events_applied: u64,
    signal_changes: u64,
}

impl Default for SimKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl SimKernel {
    /// Creates an empty kernel at time zero.
    pub fn new() -> Self {
        Self {
            signals: Arena::new(),
            processes: Arena::new(),
            clocks: Vec::new(),
            queue: EventQueue::new(),
            listeners: Vec::new(),
            resume_set: BTreeSet::new(),
            now: 0,
            cycle: 0,
            state: KernelState::Uninitialized,
            max_deltas: DEFAULT_MAX_DELTAS,
            total_deltas: 0,
            events_applied: 0,
            signal_changes: 0,
        }
    }

    /// Sets the maximum number of delta cycles per timestamp.
    pub fn set_max_delta(&mut self, max: u32) {
        self.max_deltas = max;
    }

    /// Declares a signal. `init` is converted to the declared type.
    pub fn add_signal(
        &mut self,
        name: impl Into<String>,
        ty: TypeSpec,
        init: Value,
    ) -> Result<SignalId, SimError> {
        let name = name.into();
        let init = conform(&ty, &init).ok_or_else(|| SimError::TypeMismatch {
            site: format!("initial value of '{name}'"),
            expected: ty.to_string(),
            found: describe(&init),
        })?;
        Ok(self.signals.alloc(Signal::new(name, ty, init)))
    }

    /// Adds a process. It first runs during [`initialize`](Self::initialize).
    pub fn add_process(&mut self, process: Box<dyn Process>) -> ProcessId {
        self.processes.alloc(ProcessSlot {
            process,
            watching: Vec::new(),
            wake_token: 0,
            halted: false,
        })
    }

    /// Drives `signal` with a clock of the given half periods.
    ///
    /// The first toggle fires `low_fs` from now and drives `'1'`, unless the
    /// signal already holds `'1'`, in which case it fires after `high_fs`
    /// and drives `'0'`.
    pub fn add_clock(&mut self, signal: SignalId, high_fs: u64, low_fs: u64) -> Result<(), SimError> {
        let sig = self
            .signals
            .get(signal)
            .ok_or_else(|| SimError::UnknownSignal(signal.to_string()))?;
        if sig.ty() != TypeSpec::Logic {
            return Err(SimError::TypeMismatch {
                site: format!("clock on '{}'", sig.name()),
                expected: TypeSpec::Logic.to_string(),
                found: describe(sig.value()),
            });
        }
        if high_fs == 0 || low_fs == 0 {
            return Err(SimError::SchedulingInvariant(format!(
                "clock on '{}' needs non-zero half periods",
                sig.name()
            )));
        }
        let first = if sig.value().as_logic() == Some(Logic::One) {
            high_fs
        } else {
            low_fs
        };
        let at = fs_after(self.now, first)?;
        self.clocks.push(Clock {
            signal,
            high_fs,
            low_fs,
        });
        self.queue.push(
            at,
            EventKind::PeriodicToggle {
                clock: self.clocks.len() - 1,
            },
        );
        Ok(())
    }

    /// Ends the run at `fs`. Nothing queued after it is processed.
    pub fn schedule_stop(&mut self, fs: u64) {
        self.queue.push_stop(fs);
    }

    /// Registers a listener called on every applied value change.
    pub fn register_waveform_listener(&mut self, listener: impl WaveformListener + 'static) {
        self.listeners.push(Subscription {
            signals: None,
            listener: Box::new(listener),
        });
    }

    /// Registers a listener called only on changes of `signals`.
    pub fn register_signal_listener(
        &mut self,
        signals: impl IntoIterator<Item = SignalId>,
        listener: impl WaveformListener + 'static,
    ) -> Result<(), SimError> {
        let signals = signals
            .into_iter()
            .map(|id| match self.signals.get(id) {
                Some(_) => Ok(id),
                None => Err(SimError::UnknownSignal(id.to_string())),
            })
            .collect::<Result<BTreeSet<_>, _>>()?;
        self.listeners.push(Subscription {
            signals: Some(signals),
            listener: Box::new(listener),
        });
        Ok(())
    }

    /// Runs every process once, in id order, up to its first suspension.
    pub fn initialize(&mut self) -> Result<(), SimError> {
        if self.state != KernelState::Uninitialized {
            return Err(SimError::AlreadyInitialized);
        }
        let pids: Vec<ProcessId> = self.processes.ids().collect();
        for pid in pids {
            self.resume(pid)?;
        }
        self.state = KernelState::Running;
        debug!(
            signals = self.signals.len(),
            processes = self.processes.len(),
            queued = self.queue.len(),
            "kernel initialized"
        );
        Ok(())
    }

    /// Runs until the next stop event.
    ///
    /// Calling `run` again after a stop continues with whatever is still
    /// queued, so another [`schedule_stop`](Self::schedule_stop) is needed.
    pub fn run(&mut self) -> Result<RunResult, SimError> {
        if self.state == KernelState::Uninitialized {
            self.initialize()?;
        }
        self.state = KernelState::Running;

        let first = self.queue.pop().ok_or_else(|| {
            SimError::SchedulingInvariant("event queue is empty and no stop is pending".into())
        })?;
        if first.fs > self.now {
            self.cycle = 0;
        }
        self.now = first.fs;
        if let Applied::Stop = self.apply(first)? {
            return Ok(self.stop());
        }
        self.queue.push_boundary(self.now);

        loop {
            self.state = KernelState::Draining;
            loop {
                let event = self.queue.pop().ok_or_else(|| {
                    SimError::SchedulingInvariant("delta boundary missing from the queue".into())
                })?;
                match self.apply(event)? {
                    Applied::Continue => {}
                    Applied::Boundary => break,
                    Applied::Stop => return Ok(self.stop()),
                }
            }

            let woken = std::mem::take(&mut self.resume_set);
            for pid in woken {
                self.cancel_wakeups(pid);
                self.resume(pid)?;
            }

            let (next_fs, is_stop) = match self.queue.peek() {
                Some(event) => (event.fs, matches!(event.kind, EventKind::Stop)),
                None => {
                    return Err(SimError::SchedulingInvariant(format!(
                        "event queue ran dry at {} without a stop",
                        format_fs(self.now)
                    )))
                }
            };
            if !is_stop {
                self.queue.push_boundary(next_fs);
            }
            if next_fs > self.now {
                self.state = KernelState::AdvancingTime;
                trace!(from = self.now, to = next_fs, "advancing time");
                self.now = next_fs;
                self.cycle = 0;
            } else if !is_stop {
                self.cycle += 1;
                self.total_deltas += 1;
                if self.cycle > self.max_deltas {
                    return Err(SimError::DeltaCycleLimit {
                        fs: self.now,
                        max_deltas: self.max_deltas,
                    });
                }
            }
        }
    }

    fn stop(&mut self) -> RunResult {
        self.state = KernelState::Stopped;
        let result = RunResult {
            final_time: self.time(),
            total_deltas: self.total_deltas,
            events_applied: self.events_applied,
            signal_changes: self.signal_changes,
        };
        debug!(
            time = %result.final_time,
            deltas = result.total_deltas,
            events = result.events_applied,
            changes = result.signal_changes,
            "simulation stopped"
        );
        result
    }

    fn apply(&mut self, event: Event) -> Result<Applied, SimError> {
        match event.kind {
            EventKind::SignalUpdate {
                signal,
                target,
                value,
            } => {
                self.events_applied += 1;
                self.write(signal, target, &value)?;
            }
            EventKind::TimedWake { process, token } => {
                self.events_applied += 1;
                let slot = self.processes.get(process).ok_or_else(|| {
                    SimError::SchedulingInvariant(format!("wake for unknown process {process}"))
                })?;
                if slot.wake_token == token && !slot.halted {
                    self.resume_set.insert(process);
                }
            }
            EventKind::PeriodicToggle { clock } => {
                self.events_applied += 1;
                let Clock {
                    signal,
                    high_fs,
                    low_fs,
                } = *self.clocks.get(clock).ok_or_else(|| {
                    SimError::SchedulingInvariant(format!("toggle for unknown clock {clock}"))
                })?;
                let next = match self.signal(signal)?.value().as_logic() {
                    Some(Logic::One) => Logic::Zero,
                    _ => Logic::One,
                };
                self.write(signal, UpdateTarget::Whole, &Value::Logic(next))?;
                let half = if next == Logic::One { high_fs } else { low_fs };
                let at = fs_after(self.now, half)?;
                self.queue.push(at, EventKind::PeriodicToggle { clock });
            }
            EventKind::DeltaBoundary => return Ok(Applied::Boundary),
            EventKind::Stop => return Ok(Applied::Stop),
        }
        Ok(Applied::Continue)
    }

    /// Applies a value to a signal in the current delta cycle and wakes its
    /// waiters if the value changed.
    fn write(&mut self, id: SignalId, target: UpdateTarget, value: &Value) -> Result<(), SimError> {
        let time = self.time();
        let signal = self
            .signals
            .get_mut(id)
            .ok_or_else(|| SimError::UnknownSignal(id.to_string()))?;
        if !signal.apply(target, value, time)? {
            return Ok(());
        }
        self.signal_changes += 1;
        trace!(signal = signal.name(), value = %signal.value(), %time, "signal changed");
        self.resume_set.extend(signal.waiting.iter().copied());
        let signal = &self.signals[id];
        for sub in &mut self.listeners {
            if sub.signals.as_ref().map_or(true, |s| s.contains(&id)) {
                sub.listener.on_change(id, signal, time);
            }
        }
        Ok(())
    }

    /// Drops every wakeup `pid` registered and invalidates its timed wakes.
    fn cancel_wakeups(&mut self, pid: ProcessId) {
        let Some(slot) = self.processes.get_mut(pid) else {
            return;
        };
        for id in slot.watching.drain(..) {
            if let Some(signal) = self.signals.get_mut(id) {
                signal.waiting.remove(&pid);
            }
        }
        slot.wake_token += 1;
    }

    fn resume(&mut self, pid: ProcessId) -> Result<(), SimError> {
        let now = self.time();
        let slot = self.processes.get_mut(pid).ok_or_else(|| {
            SimError::SchedulingInvariant(format!("resume of unknown process {pid}"))
        })?;
        if slot.halted {
            return Ok(());
        }
        let mut ctx = ProcessContext {
            pid,
            now,
            token: slot.wake_token,
            signals: &mut self.signals,
            queue: &mut self.queue,
            watching: &mut slot.watching,
        };
        if slot.process.resume(&mut ctx)? == Resume::Halt {
            debug!(process = slot.process.name(), %now, "process halted");
            slot.halted = true;
        }
        Ok(())
    }

    /// Current time including the delta cycle.
    pub fn time(&self) -> SimTime {
        SimTime::new(self.now, self.cycle)
    }

    /// Current time in femtoseconds.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Delta cycle within the current timestamp.
    pub fn delta_cycle(&self) -> u32 {
        self.cycle
    }

    /// Scheduler state.
    pub fn state(&self) -> KernelState {
        self.state
    }

    /// Looks up a signal.
    pub fn signal(&self, id: SignalId) -> Result<&Signal, SimError> {
        self.signals
            .get(id)
            .ok_or_else(|| SimError::UnknownSignal(id.to_string()))
    }

    /// Current value of a signal.
    pub fn current_value(&self, id: SignalId) -> Result<&Value, SimError> {
        self.signal(id).map(Signal::value)
    }

    /// Finds a signal by name.
    pub fn find_signal(&self, name: &str) -> Option<SignalId> {
        self.signals.position(|s| s.name() == name)
    }

    /// All signals in declaration order.
    pub fn signals(&self) -> impl Iterator<Item = (SignalId, &Signal)> {
        self.signals.iter()
    }

    /// Number of processes.
    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    /// Returns `true` once `pid` has halted.
    pub fn is_halted(&self, pid: ProcessId) -> bool {
        self.processes.get(pid).is_some_and(|slot| slot.halted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::ChangeLog;
    use hdlvm_common::{Direction, LogicVec};

    /// Copies `from` to `to` every time `from` changes.
    struct Follow {
        from: SignalId,
        to: SignalId,
    }

    impl Process for Follow {
        fn name(&self) -> &str {
            "follow"
        }

        fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Resume, SimError> {
            if ctx.event(self.from)? {
                let value = ctx.value(self.from)?.clone();
                ctx.schedule_assignment(self.to, UpdateTarget::Whole, value, 0)?;
            }
            ctx.wait_on(self.from)?;
            Ok(Resume::Suspend)
        }
    }

    /// Drives `signal` once at `at` and halts.
    struct Once {
        signal: SignalId,
        at: u64,
        value: Value,
    }

    impl Process for Once {
        fn name(&self) -> &str {
            "once"
        }

        fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Resume, SimError> {
            ctx.schedule_assignment(self.signal, UpdateTarget::Whole, self.value.clone(), self.at)?;
            Ok(Resume::Halt)
        }
    }

    /// Records its resume times; waits on a signal and a timeout at once.
    struct Watcher {
        signal: SignalId,
        timeout: u64,
        log: std::rc::Rc<std::cell::RefCell<Vec<SimTime>>>,
    }

    impl Process for Watcher {
        fn name(&self) -> &str {
            "watcher"
        }

        fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Resume, SimError> {
            self.log.borrow_mut().push(ctx.now());
            ctx.wait_on(self.signal)?;
            ctx.wait_for(self.timeout)?;
            Ok(Resume::Suspend)
        }
    }

    fn logic(l: Logic) -> Value {
        Value::Logic(l)
    }

    fn ns(n: u64) -> u64 {
        SimTime::from_ns(n).fs
    }

    #[test]
    fn empty_queue_is_a_scheduling_error() {
        let mut kernel = SimKernel::new();
        assert!(matches!(
            kernel.run(),
            Err(SimError::SchedulingInvariant(_))
        ));
    }

    #[test]
    fn stop_only_run() {
        let mut kernel = SimKernel::new();
        kernel.schedule_stop(ns(5));
        let result = kernel.run().unwrap();
        assert_eq!(result.final_time, SimTime::from_ns(5));
        assert_eq!(result.events_applied, 0);
        assert_eq!(kernel.state(), KernelState::Stopped);
    }

    #[test]
    fn initialize_twice_is_an_error() {
        let mut kernel = SimKernel::new();
        kernel.initialize().unwrap();
        assert!(matches!(
            kernel.initialize(),
            Err(SimError::AlreadyInitialized)
        ));
    }

    #[test]
    fn init_value_is_conformed() {
        let mut kernel = SimKernel::new();
        let ty = TypeSpec::Array {
            left: 3,
            direction: Direction::Downto,
            right: 0,
        };
        let id = kernel
            .add_signal("bus", ty, Value::Vector(LogicVec::from_literal("1010").unwrap()))
            .unwrap();
        let value = kernel.current_value(id).unwrap();
        assert_eq!(value.as_vector().unwrap().left(), 3);
        assert!(kernel
            .add_signal("bad", ty, Value::Vector(LogicVec::from_literal("10").unwrap()))
            .is_err());
        assert_eq!(kernel.find_signal("bus"), Some(id));
        assert_eq!(kernel.find_signal("nope"), None);
    }

    #[test]
    fn clock_toggles_on_half_periods() {
        let mut kernel = SimKernel::new();
        let clk = kernel.add_signal("clk", TypeSpec::Logic, logic(Logic::Zero)).unwrap();
        kernel.add_clock(clk, ns(10), ns(10)).unwrap();
        kernel.schedule_stop(ns(45));
        let log = ChangeLog::new();
        kernel.register_waveform_listener(log.clone());
        kernel.run().unwrap();
        let times: Vec<SimTime> = log.changes().iter().map(|c| c.time).collect();
        assert_eq!(
            times,
            vec![
                SimTime::from_ns(10),
                SimTime::from_ns(20),
                SimTime::from_ns(30),
                SimTime::from_ns(40)
            ]
        );
        assert_eq!(kernel.current_value(clk).unwrap(), &logic(Logic::Zero));
    }

    #[test]
    fn clock_starting_high_falls_after_high_period() {
        let mut kernel = SimKernel::new();
        let clk = kernel.add_signal("clk", TypeSpec::Logic, logic(Logic::One)).unwrap();
        kernel.add_clock(clk, ns(3), ns(7)).unwrap();
        kernel.schedule_stop(ns(12));
        let log = ChangeLog::new();
        kernel.register_waveform_listener(log.clone());
        kernel.run().unwrap();
        let changes = log.changes();
        assert_eq!(changes[0].time, SimTime::from_ns(3));
        assert_eq!(changes[0].value, logic(Logic::Zero));
        assert_eq!(changes[1].time, SimTime::from_ns(10));
        assert_eq!(changes.len(), 2);
    }

    #[test]
    fn clock_rejects_vector_signal() {
        let mut kernel = SimKernel::new();
        let ty = TypeSpec::Array {
            left: 1,
            direction: Direction::Downto,
            right: 0,
        };
        let bus = kernel.add_signal("bus", ty, ty.default_value()).unwrap();
        assert!(kernel.add_clock(bus, 1, 1).is_err());
    }

    #[test]
    fn clock_period_overflow_is_reported() {
        let mut kernel = SimKernel::new();
        let clk = kernel.add_signal("clk", TypeSpec::Logic, logic(Logic::Zero)).unwrap();
        kernel.add_clock(clk, u64::MAX / 2, 1).unwrap();
        kernel.schedule_stop(u64::MAX - 5);
        let err = kernel.run().unwrap_err();
        assert!(
            matches!(err, SimError::TimeOverflow { delay, .. } if delay == u64::MAX / 2),
            "{err}"
        );
    }

    #[test]
    fn updates_propagate_one_delta_per_hop() {
        let mut kernel = SimKernel::new();
        let a = kernel.add_signal("a", TypeSpec::Logic, logic(Logic::Zero)).unwrap();
        let b = kernel.add_signal("b", TypeSpec::Logic, logic(Logic::Zero)).unwrap();
        let c = kernel.add_signal("c", TypeSpec::Logic, logic(Logic::Zero)).unwrap();
        kernel.add_process(Box::new(Follow { from: a, to: b }));
        kernel.add_process(Box::new(Follow { from: b, to: c }));
        kernel.add_process(Box::new(Once {
            signal: a,
            at: ns(10),
            value: logic(Logic::One),
        }));
        kernel.schedule_stop(ns(20));
        let log = ChangeLog::new();
        kernel.register_waveform_listener(log.clone());
        let result = kernel.run().unwrap();

        let seen: Vec<(String, SimTime)> = log
            .changes()
            .into_iter()
            .map(|c| (c.signal, c.time))
            .collect();
        assert_eq!(
            seen,
            vec![
                ("a".to_string(), SimTime::new(ns(10), 0)),
                ("b".to_string(), SimTime::new(ns(10), 1)),
                ("c".to_string(), SimTime::new(ns(10), 2)),
            ]
        );
        assert_eq!(result.signal_changes, 3);
        assert_eq!(kernel.current_value(c).unwrap(), &logic(Logic::One));
    }

    #[test]
    fn unchanged_value_wakes_nobody() {
        let mut kernel = SimKernel::new();
        let a = kernel.add_signal("a", TypeSpec::Logic, logic(Logic::One)).unwrap();
        let b = kernel.add_signal("b", TypeSpec::Logic, logic(Logic::Zero)).unwrap();
        kernel.add_process(Box::new(Follow { from: a, to: b }));
        kernel.add_process(Box::new(Once {
            signal: a,
            at: ns(1),
            value: logic(Logic::One),
        }));
        kernel.schedule_stop(ns(2));
        let result = kernel.run().unwrap();
        assert_eq!(result.signal_changes, 0);
        assert_eq!(result.total_deltas, 0);
        assert_eq!(kernel.current_value(b).unwrap(), &logic(Logic::Zero));
    }

    #[test]
    fn same_time_updates_apply_in_issue_order() {
        let mut kernel = SimKernel::new();
        let a = kernel.add_signal("a", TypeSpec::Logic, logic(Logic::Zero)).unwrap();
        kernel.add_process(Box::new(Once {
            signal: a,
            at: ns(5),
            value: logic(Logic::One),
        }));
        kernel.add_process(Box::new(Once {
            signal: a,
            at: ns(5),
            value: logic(Logic::X),
        }));
        kernel.schedule_stop(ns(6));
        let log = ChangeLog::new();
        kernel.register_waveform_listener(log.clone());
        kernel.run().unwrap();
        let values: Vec<Value> = log.changes().into_iter().map(|c| c.value).collect();
        assert_eq!(values, vec![logic(Logic::One), logic(Logic::X)]);
        assert_eq!(kernel.current_value(a).unwrap(), &logic(Logic::X));
    }

    #[test]
    fn stop_discards_later_events() {
        let mut kernel = SimKernel::new();
        let a = kernel.add_signal("a", TypeSpec::Logic, logic(Logic::Zero)).unwrap();
        kernel.add_process(Box::new(Once {
            signal: a,
            at: ns(200),
            value: logic(Logic::One),
        }));
        kernel.schedule_stop(ns(100));
        let result = kernel.run().unwrap();
        assert_eq!(result.final_time, SimTime::from_ns(100));
        assert_eq!(result.events_applied, 0);
        assert_eq!(kernel.current_value(a).unwrap(), &logic(Logic::Zero));
    }

    #[test]
    fn run_continues_after_a_second_stop() {
        let mut kernel = SimKernel::new();
        let a = kernel.add_signal("a", TypeSpec::Logic, logic(Logic::Zero)).unwrap();
        kernel.add_process(Box::new(Once {
            signal: a,
            at: ns(200),
            value: logic(Logic::One),
        }));
        kernel.schedule_stop(ns(100));
        kernel.run().unwrap();
        kernel.schedule_stop(ns(300));
        let result = kernel.run().unwrap();
        assert_eq!(result.final_time, SimTime::from_ns(300));
        assert_eq!(kernel.current_value(a).unwrap(), &logic(Logic::One));
    }

    #[test]
    fn signal_listener_sees_only_its_signals() {
        let mut kernel = SimKernel::new();
        let a = kernel.add_signal("a", TypeSpec::Logic, logic(Logic::Zero)).unwrap();
        let b = kernel.add_signal("b", TypeSpec::Logic, logic(Logic::Zero)).unwrap();
        let c = kernel.add_signal("c", TypeSpec::Logic, logic(Logic::Zero)).unwrap();
        kernel.add_process(Box::new(Follow { from: a, to: b }));
        kernel.add_process(Box::new(Follow { from: b, to: c }));
        kernel.add_process(Box::new(Once {
            signal: a,
            at: ns(10),
            value: logic(Logic::One),
        }));
        kernel.schedule_stop(ns(20));
        let all = ChangeLog::new();
        let some = ChangeLog::new();
        kernel.register_waveform_listener(all.clone());
        kernel.register_signal_listener([a, c], some.clone()).unwrap();
        kernel.run().unwrap();

        assert_eq!(all.len(), 3);
        let names: Vec<String> = some.changes().into_iter().map(|c| c.signal).collect();
        assert_eq!(names, vec!["a", "c"]);
        assert_eq!(some.of("c")[0].time, SimTime::new(ns(10), 2));
    }

    #[test]
    fn signal_listener_rejects_unknown_ids() {
        let mut kernel = SimKernel::new();
        let err = kernel
            .register_signal_listener([SignalId::from_raw(7)], ChangeLog::new())
            .unwrap_err();
        assert!(matches!(err, SimError::UnknownSignal(_)));
    }

    #[test]
    fn signal_wake_cancels_pending_timeout() {
        let mut kernel = SimKernel::new();
        let a = kernel.add_signal("a", TypeSpec::Logic, logic(Logic::Zero)).unwrap();
        let log = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        kernel.add_process(Box::new(Watcher {
            signal: a,
            timeout: ns(10),
            log: log.clone(),
        }));
        kernel.add_process(Box::new(Once {
            signal: a,
            at: ns(4),
            value: logic(Logic::One),
        }));
        kernel.schedule_stop(ns(30));
        kernel.run().unwrap();
        // Woken by the change at 4 ns; the 10 ns timeout is stale. The
        // re-armed timeout fires at 14 ns and again at 24 ns.
        assert_eq!(
            *log.borrow(),
            vec![
                SimTime::zero(),
                SimTime::from_ns(4),
                SimTime::from_ns(14),
                SimTime::from_ns(24),
            ]
        );
    }

    #[test]
    fn wait_for_past_end_of_time_is_reported() {
        let mut kernel = SimKernel::new();
        let a = kernel.add_signal("a", TypeSpec::Logic, logic(Logic::Zero)).unwrap();
        kernel.add_process(Box::new(Watcher {
            signal: a,
            timeout: u64::MAX,
            log: std::rc::Rc::new(std::cell::RefCell::new(Vec::new())),
        }));
        kernel.add_process(Box::new(Once {
            signal: a,
            at: ns(4),
            value: logic(Logic::One),
        }));
        kernel.schedule_stop(ns(30));
        let err = kernel.run().unwrap_err();
        assert!(
            matches!(err, SimError::TimeOverflow { now, delay: u64::MAX } if now == ns(4)),
            "{err}"
        );
    }

    #[test]
    fn zero_delay_loop_hits_delta_limit() {
        /// Inverts its own output forever.
        struct Ring {
            signal: SignalId,
        }

        impl Process for Ring {
            fn name(&self) -> &str {
                "ring"
            }

            fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Resume, SimError> {
                let next = match ctx.value(self.signal)?.as_logic() {
                    Some(Logic::One) => Logic::Zero,
                    _ => Logic::One,
                };
                ctx.schedule_assignment(self.signal, UpdateTarget::Whole, Value::Logic(next), 0)?;
                ctx.wait_on(self.signal)?;
                Ok(Resume::Suspend)
            }
        }

        let mut kernel = SimKernel::new();
        let a = kernel.add_signal("a", TypeSpec::Logic, logic(Logic::Zero)).unwrap();
        kernel.add_process(Box::new(Ring { signal: a }));
        kernel.schedule_stop(ns(1));
        kernel.set_max_delta(50);
        let err = kernel.run().unwrap_err();
        assert!(
            matches!(err, SimError::DeltaCycleLimit { fs: 0, max_deltas: 50 }),
            "{err}"
        );
    }

    #[test]
    fn halted_process_is_not_resumed() {
        let mut kernel = SimKernel::new();
        let a = kernel.add_signal("a", TypeSpec::Logic, logic(Logic::Zero)).unwrap();
        let pid = kernel.add_process(Box::new(Once {
            signal: a,
            at: 0,
            value: logic(Logic::One),
        }));
        kernel.schedule_stop(ns(1));
        kernel.run().unwrap();
        assert!(kernel.is_halted(pid));
        assert_eq!(kernel.process_count(), 1);
    }
}
