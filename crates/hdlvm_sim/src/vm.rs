//! Stack machine that runs one [`CompiledProcess`].
//!
//! The program counter and operand stack survive across suspensions, so a
//! resumed process continues right after the instruction that suspended it.
//! Hoisted range views are built once, on the first resume.

use crate::error::SimError;
use crate::process::{Process, ProcessContext, Resume};
use crate::signal::{conform, describe, UpdateTarget};
use hdlvm_common::{Logic, LogicError, LogicVec, RangeView, Value, ValueKind};
use hdlvm_ir::{
    Attr, BinOp, Callee, CompiledProcess, Eval, Instruction, Library, SignalId, Slot, VarId,
};
use std::rc::Rc;
use tracing::{trace, warn};

/// An operand stack entry.
#[derive(Clone, Debug, PartialEq)]
enum Operand {
    Value(Value),
    Signal(SignalId),
    Variable(VarId),
    Range { slot: Slot, view: RangeView },
}

impl Operand {
    fn signal(&self) -> Option<SignalId> {
        match *self {
            Operand::Signal(id)
            | Operand::Range {
                slot: Slot::Signal(id),
                ..
            } => Some(id),
            _ => None,
        }
    }
}

/// A compiled process bound to its private variable slots.
pub struct VmProcess {
    program: Rc<CompiledProcess>,
    library: Rc<Library>,
    pc: usize,
    stack: Vec<Operand>,
    vars: Vec<Value>,
    views: Vec<RangeView>,
    prepared: bool,
    max_steps: u64,
}

impl VmProcess {
    /// Creates a process at its first instruction.
    pub fn new(program: impl Into<Rc<CompiledProcess>>, library: Rc<Library>, max_steps: u64) -> Self {
        let program = program.into();
        let vars = program.variables.iter().map(|v| v.init.clone()).collect();
        Self {
            program,
            library,
            pc: 0,
            stack: Vec::new(),
            vars,
            views: Vec::new(),
            prepared: false,
            max_steps,
        }
    }

    /// The program counter.
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Current value of variable `id`.
    pub fn variable(&self, id: VarId) -> Option<&Value> {
        self.vars.get(id.index())
    }

    fn addr(&self) -> usize {
        self.program.source_addr(self.pc).unwrap_or(self.pc)
    }

    fn site(&self) -> String {
        format!("{}@{}", self.program.name, self.addr())
    }

    fn bad(&self, reason: impl Into<String>) -> SimError {
        SimError::BadOperand {
            process: self.program.name.clone(),
            addr: self.addr(),
            reason: reason.into(),
        }
    }

    fn mismatch(&self, expected: impl ToString, found: &Value) -> SimError {
        SimError::TypeMismatch {
            site: self.site(),
            expected: expected.to_string(),
            found: describe(found),
        }
    }

    fn pop(&mut self) -> Result<Operand, SimError> {
        self.stack.pop().ok_or_else(|| SimError::StackUnderflow {
            process: self.program.name.clone(),
            addr: self.addr(),
        })
    }

    fn pop_n(&mut self, n: usize) -> Result<Vec<Operand>, SimError> {
        if self.stack.len() < n {
            return Err(SimError::StackUnderflow {
                process: self.program.name.clone(),
                addr: self.addr(),
            });
        }
        Ok(self.stack.split_off(self.stack.len() - n))
    }

    /// Builds every hoisted view against its parent's current shape.
    fn prologue(&mut self, ctx: &ProcessContext<'_>) -> Result<(), SimError> {
        let program = Rc::clone(&self.program);
        self.views = program
            .views
            .iter()
            .map(|decl| {
                let parent = self.parent(decl.slot, ctx)?;
                Ok(RangeView::new(&parent, decl.left, decl.ascending, decl.right)?)
            })
            .collect::<Result<_, SimError>>()?;
        self.prepared = true;
        Ok(())
    }

    /// The vector stored in `slot`.
    fn parent(&self, slot: Slot, ctx: &ProcessContext<'_>) -> Result<LogicVec, SimError> {
        let value = match slot {
            Slot::Signal(id) => ctx.value(id)?,
            Slot::Variable(id) => self.var(id)?,
        };
        match value {
            Value::Vector(v) => Ok(v.clone()),
            other => Err(self.mismatch(ValueKind::Vector, other)),
        }
    }

    fn var(&self, id: VarId) -> Result<&Value, SimError> {
        self.vars
            .get(id.index())
            .ok_or_else(|| self.bad(format!("no variable slot {id}")))
    }

    /// Pushes an object reference; single-bit vectors go through a view.
    fn push_slot(&mut self, slot: Slot, ctx: &ProcessContext<'_>) -> Result<(), SimError> {
        let value = match slot {
            Slot::Signal(id) => ctx.value(id)?,
            Slot::Variable(id) => self.var(id)?,
        };
        let operand = match value {
            Value::Vector(v) if v.width() == 1 => Operand::Range {
                slot,
                view: RangeView::whole(v),
            },
            _ => match slot {
                Slot::Signal(id) => Operand::Signal(id),
                Slot::Variable(id) => Operand::Variable(id),
            },
        };
        self.stack.push(operand);
        Ok(())
    }

    fn read(&self, operand: &Operand, ctx: &ProcessContext<'_>) -> Result<Value, SimError> {
        match operand {
            Operand::Value(v) => Ok(v.clone()),
            Operand::Signal(id) => ctx.value(*id).cloned(),
            Operand::Variable(id) => self.var(*id).cloned(),
            Operand::Range { slot, view } => {
                let parent = self.parent(*slot, ctx)?;
                Ok(Value::Vector(view.read(&parent)))
            }
        }
    }

    fn pop_value(&mut self, ctx: &ProcessContext<'_>) -> Result<Value, SimError> {
        let operand = self.pop()?;
        self.read(&operand, ctx)
    }

    fn pop_bool(&mut self, ctx: &ProcessContext<'_>) -> Result<bool, SimError> {
        let value = self.pop_value(ctx)?;
        value
            .as_bool()
            .ok_or_else(|| self.mismatch(ValueKind::Boolean, &value))
    }

    fn pop_delay(&mut self, ctx: &ProcessContext<'_>) -> Result<u64, SimError> {
        let value = self.pop_value(ctx)?;
        let fs = value
            .as_integer()
            .ok_or_else(|| self.mismatch(ValueKind::Integer, &value))?;
        u64::try_from(fs).map_err(|_| self.bad(format!("negative delay {fs}")))
    }

    fn pop_signal(&mut self) -> Result<SignalId, SimError> {
        let operand = self.pop()?;
        operand
            .signal()
            .ok_or_else(|| self.bad("expected a signal reference"))
    }

    fn index(&mut self, ctx: &ProcessContext<'_>) -> Result<(), SimError> {
        let index = self.pop_value(ctx)?;
        let index = index
            .as_integer()
            .ok_or_else(|| self.mismatch(ValueKind::Integer, &index))?;
        let operand = self.pop()?;
        let slot = match operand {
            Operand::Signal(id) | Operand::Range { slot: Slot::Signal(id), .. } => Slot::Signal(id),
            Operand::Variable(id) | Operand::Range { slot: Slot::Variable(id), .. } => {
                Slot::Variable(id)
            }
            Operand::Value(Value::Vector(v)) => {
                let bit = v.get(index).ok_or(LogicError::OutOfBounds {
                    left: index,
                    right: index,
                    low: v.low(),
                    high: v.high(),
                })?;
                self.stack.push(Operand::Value(Value::Logic(bit)));
                return Ok(());
            }
            Operand::Value(other) => return Err(self.mismatch(ValueKind::Vector, &other)),
        };
        let parent = self.parent(slot, ctx)?;
        let view = RangeView::element(&parent, index)?;
        self.stack.push(Operand::Range { slot, view });
        Ok(())
    }

    fn binary(&mut self, op: &BinOp, ctx: &ProcessContext<'_>) -> Result<(), SimError> {
        let right = self.pop_value(ctx)?;
        let left = self.pop_value(ctx)?;
        let result = match op {
            BinOp::Equal => Value::Boolean(left.same_as(&right)),
            BinOp::NotEqual => Value::Boolean(!left.same_as(&right)),
            BinOp::And | BinOp::Or => match (&left, &right) {
                (Value::Boolean(a), Value::Boolean(b)) => {
                    Value::Boolean(if *op == BinOp::And { *a && *b } else { *a || *b })
                }
                _ => match (left.as_logic(), right.as_logic()) {
                    (Some(a), Some(b)) => Value::Logic(if *op == BinOp::And { a & b } else { a | b }),
                    _ => return Err(self.mismatch(ValueKind::Boolean, &left)),
                },
            },
            BinOp::Other(name) => {
                warn!(site = %self.site(), op = %name, "unimplemented binary operator");
                Value::Boolean(false)
            }
        };
        self.stack.push(Operand::Value(result));
        Ok(())
    }

    fn call(&mut self, callee: &Callee, argc: usize, ctx: &ProcessContext<'_>) -> Result<(), SimError> {
        let operands = self.pop_n(argc)?;
        let result = match callee {
            Callee::Builtin(id) => {
                let library = Rc::clone(&self.library);
                let builtin = library
                    .get(*id)
                    .ok_or_else(|| self.bad(format!("no built-in {id}")))?;
                if let (Some(first), Some(&kind)) = (operands.first(), builtin.params.first()) {
                    let value = self.read(first, ctx)?;
                    if !value.fits(kind) {
                        return Err(self.mismatch(kind, &value));
                    }
                }
                match builtin.eval {
                    Eval::Pure(func) => {
                        let args = operands
                            .iter()
                            .map(|op| self.read(op, ctx))
                            .collect::<Result<Vec<_>, _>>()?;
                        func(&args).map_err(|source| SimError::Library {
                            process: self.program.name.clone(),
                            addr: self.addr(),
                            source,
                        })?
                    }
                    Eval::RisingEdge | Eval::FallingEdge => {
                        let signal = operands
                            .first()
                            .and_then(Operand::signal)
                            .ok_or_else(|| self.bad("edge function needs a signal"))?;
                        let edge = match builtin.eval {
                            Eval::RisingEdge => ctx.rising(signal)?,
                            _ => ctx.falling(signal)?,
                        };
                        Value::Boolean(edge)
                    }
                }
            }
            Callee::Unresolved { signature, ret } => {
                warn!(site = %self.site(), %signature, "unimplemented operator, returning default");
                let width = operands
                    .iter()
                    .filter_map(|op| self.read(op, ctx).ok())
                    .find_map(|v| v.as_vector().map(LogicVec::width));
                match (ret, width) {
                    (Some(ValueKind::Vector), Some(width)) => {
                        Value::Vector(LogicVec::from_bits(vec![Logic::U; width]))
                    }
                    (Some(ValueKind::Integer), _) => Value::Integer(0),
                    (Some(ValueKind::Boolean), _) => Value::Boolean(false),
                    _ => Value::Logic(Logic::U),
                }
            }
        };
        self.stack.push(Operand::Value(result));
        Ok(())
    }

    fn assign(&mut self, delayed: bool, ctx: &mut ProcessContext<'_>) -> Result<(), SimError> {
        let delay = if delayed { self.pop_delay(ctx)? } else { 0 };
        let value = self.pop_value(ctx)?;
        let target = self.pop()?;
        match target {
            Operand::Signal(id) => ctx.schedule_assignment(id, UpdateTarget::Whole, value, delay),
            Operand::Range {
                slot: Slot::Signal(id),
                view,
            } => ctx.schedule_assignment(id, UpdateTarget::Range(view), value, delay),
            Operand::Variable(id) => {
                let decl = self
                    .program
                    .variables
                    .get(id.index())
                    .ok_or_else(|| self.bad(format!("no variable slot {id}")))?;
                let conformed = conform(&decl.ty, &value)
                    .ok_or_else(|| self.mismatch(decl.ty, &value))?;
                self.vars[id.index()] = conformed;
                Ok(())
            }
            Operand::Range {
                slot: Slot::Variable(id),
                view,
            } => {
                let bits = value
                    .to_bits()
                    .ok_or_else(|| self.mismatch(ValueKind::Vector, &value))?;
                let Some(Value::Vector(parent)) = self.vars.get_mut(id.index()) else {
                    return Err(self.bad(format!("variable {id} is not a vector")));
                };
                view.write(parent, &bits)?;
                Ok(())
            }
            Operand::Value(v) => Err(self.bad(format!("cannot assign to value {v}"))),
        }
    }

    /// Executes one instruction. Returns `Some` when control goes back to the scheduler.
    fn step(&mut self, inst: &Instruction, ctx: &mut ProcessContext<'_>) -> Result<Option<Resume>, SimError> {
        let mut next = self.pc + 1;
        match inst {
            Instruction::PushLiteral(v) | Instruction::PushConstant(v) => {
                self.stack.push(Operand::Value(v.clone()))
            }
            Instruction::PushSignal(id) => self.push_slot(Slot::Signal(*id), ctx)?,
            Instruction::PushVariable(id) => self.push_slot(Slot::Variable(*id), ctx)?,
            Instruction::RangeCreate(id) => {
                let view = *self
                    .views
                    .get(id.index())
                    .ok_or_else(|| self.bad(format!("no hoisted view {id}")))?;
                let slot = self
                    .program
                    .view(*id)
                    .map(|decl| decl.slot)
                    .ok_or_else(|| self.bad(format!("no hoisted view {id}")))?;
                self.stack.push(Operand::Range { slot, view });
            }
            Instruction::Index => self.index(ctx)?,
            Instruction::Aggregate { width } => {
                let fill = self.pop_value(ctx)?;
                let bit = fill
                    .as_logic()
                    .ok_or_else(|| self.mismatch(ValueKind::Logic, &fill))?;
                let vec = LogicVec::from_bits(vec![bit; (*width).max(1)]);
                self.stack.push(Operand::Value(Value::Vector(vec)));
            }
            Instruction::Attribute(Attr::Event) => {
                let signal = self.pop_signal()?;
                let event = ctx.event(signal)?;
                self.stack.push(Operand::Value(Value::Boolean(event)));
            }
            Instruction::BinaryOp(op) => self.binary(op, ctx)?,
            Instruction::Call { callee, argc } => self.call(callee, *argc, ctx)?,
            Instruction::Jump(t) => next = *t,
            Instruction::JumpIfFalse(t) => {
                if !self.pop_bool(ctx)? {
                    next = *t;
                }
            }
            Instruction::JumpIfTrue(t) => {
                if self.pop_bool(ctx)? {
                    next = *t;
                }
            }
            Instruction::JumpNotRising { signal, target } => {
                if !ctx.rising(*signal)? {
                    next = *target;
                }
            }
            Instruction::ScheduleAssignment { delayed } => self.assign(*delayed, ctx)?,
            Instruction::ScheduleDelay => {
                let delay = self.pop_delay(ctx)?;
                ctx.wait_for(delay)?;
            }
            Instruction::ScheduleWakeup => {
                let signal = self.pop_signal()?;
                ctx.wait_on(signal)?;
            }
            Instruction::Suspend => {
                self.pc = next;
                return Ok(Some(Resume::Suspend));
            }
            Instruction::Halt => return Ok(Some(Resume::Halt)),
        }
        self.pc = next;
        Ok(None)
    }
}

impl Process for VmProcess {
    fn name(&self) -> &str {
        &self.program.name
    }

    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Resume, SimError> {
        if !self.prepared {
            self.prologue(ctx)?;
        }
        let program = Rc::clone(&self.program);
        let mut steps = 0u64;
        while let Some(inst) = program.code.get(self.pc) {
            steps += 1;
            if steps > self.max_steps {
                return Err(SimError::RunawayProcess {
                    process: program.name.clone(),
                    steps: self.max_steps,
                });
            }
            trace!(process = %program.name, pc = self.pc, %inst, "exec");
            if let Some(resume) = self.step(inst, ctx)? {
                return Ok(resume);
            }
        }
        Ok(Resume::Halt)
    }
}
