//! The two-pass instruction optimizer and the relinker.
//!
//! Pass 1 walks the raw records once. It removes the bodies of wait regions
//! (a suspending `WAIT` through its `CANCEL ALL WAKEUPS`), strips call
//! context brackets down to the `CALL` itself, collapses each `RANGE APPLY`
//! shape into one hoisted view or literal, and remembers every `'EVENT`
//! site. Pass 2 checks those sites for the clock-edge idiom and folds it into
//! a single [`Instruction::JumpNotRising`]. [`relink`] finally renumbers the
//! surviving instructions and rewrites jump targets.

use crate::compile::Scope;
use crate::error::CompileError;
use crate::ids::ViewId;
use crate::instr::{Instruction, Slot, ViewDecl};
use crate::raw::{JumpCond, Literal, ObjectClass, RawInst, RawOp, StaticValue};
use hdlvm_common::{Logic, RangeView, TypeSpec, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Decisions shared between the passes.
#[derive(Debug, Default)]
pub(crate) struct Plan {
    /// `keep[addr]` is false for records removed from the output.
    pub keep: Vec<bool>,
    /// Instructions decided by a pass, keyed by raw address. Jump targets
    /// are still raw addresses.
    pub rewrites: HashMap<usize, Instruction>,
    /// Hoisted range views, indexed by [`ViewId`].
    pub views: Vec<ViewDecl>,
    /// Addresses of `ATTRIBUTE OP EVENT` records.
    pub attribute_sites: Vec<usize>,
}

/// Output of [`relink`].
#[derive(Debug)]
pub(crate) struct Linked {
    pub code: Vec<Instruction>,
    pub labels: BTreeMap<usize, usize>,
    pub source_addrs: Vec<usize>,
}

struct Frame {
    enter: usize,
    formals: Vec<String>,
}

/// Liveness and folding pass.
pub(crate) fn pass1(raw: &[RawInst], scope: &Scope<'_>) -> Result<Plan, CompileError> {
    let mut plan = Plan {
        keep: vec![true; raw.len()],
        ..Plan::default()
    };
    let mut frames: Vec<Frame> = Vec::new();
    let mut view_cache: HashMap<ViewDecl, ViewId> = HashMap::new();

    let mut addr = 0;
    while addr < raw.len() {
        match &raw[addr].op {
            RawOp::Wait if addr > 0 && raw[addr - 1].op.is_schedule() => {
                let cancel = raw[addr + 1..]
                    .iter()
                    .position(|r| r.op == RawOp::Cancel)
                    .map(|p| addr + 1 + p)
                    .ok_or_else(|| CompileError::UnterminatedWait {
                        process: scope.process.to_string(),
                        addr,
                    })?;
                plan.keep[addr + 1..=cancel].fill(false);
                addr = cancel + 1;
                continue;
            }
            RawOp::Cancel => plan.keep[addr] = false,
            RawOp::Enter => {
                frames.push(Frame {
                    enter: addr,
                    formals: Vec::new(),
                });
                plan.keep[addr] = false;
            }
            RawOp::New(name) => {
                let frame = frames
                    .last_mut()
                    .ok_or_else(|| scope.malformed(addr, "NEW outside a call context"))?;
                frame.formals.push(name.clone());
                plan.keep[addr] = false;
            }
            RawOp::Map => {
                if frames.is_empty() {
                    return Err(scope.malformed(addr, "MAP outside a call context"));
                }
                plan.keep[addr] = false;
            }
            RawOp::PushObject(obj)
                if obj.class == ObjectClass::Constant
                    && frames.iter().any(|f| f.formals.contains(&obj.name)) =>
            {
                plan.keep[addr] = false;
            }
            RawOp::Exit => {
                if frames.pop().is_none() {
                    return Err(scope.malformed(addr, "EXIT CONTEXT without ENTER CONTEXT"));
                }
                if addr == 0 || !matches!(raw[addr - 1].op, RawOp::Call(_)) {
                    return Err(scope.malformed(addr, "EXIT CONTEXT must follow a CALL"));
                }
                plan.keep[addr] = false;
            }
            RawOp::Attribute(attr) if attr == "EVENT" => plan.attribute_sites.push(addr),
            RawOp::RangeApply => fold_range(raw, addr, scope, &mut plan, &mut view_cache)?,
            _ => {}
        }
        addr += 1;
    }

    if let Some(frame) = frames.last() {
        return Err(scope.malformed(frame.enter, "ENTER CONTEXT without EXIT CONTEXT"));
    }
    Ok(plan)
}

/// Collapses `target, left, ascending, right, RANGE CREATE, RANGE APPLY`.
fn fold_range(
    raw: &[RawInst],
    apply: usize,
    scope: &Scope<'_>,
    plan: &mut Plan,
    cache: &mut HashMap<ViewDecl, ViewId>,
) -> Result<(), CompileError> {
    let shape = || CompileError::RangeShape {
        process: scope.process.to_string(),
        addr: apply,
    };
    if apply < 5 {
        return Err(shape());
    }
    let (
        RawOp::PushObject(target),
        RawOp::PushLiteral(Literal::Integer(left)),
        RawOp::PushStatic(StaticValue::Boolean(ascending)),
        RawOp::PushLiteral(Literal::Integer(right)),
        RawOp::RangeCreate,
    ) = (
        &raw[apply - 5].op,
        &raw[apply - 4].op,
        &raw[apply - 3].op,
        &raw[apply - 2].op,
        &raw[apply - 1].op,
    )
    else {
        return Err(shape());
    };
    let (left, ascending, right) = (*left, *ascending, *right);
    let target_addr = apply - 5;

    let folded = match target.class {
        ObjectClass::Constant => {
            let value = scope.constant(target_addr, target)?;
            let Value::Vector(parent) = &value else {
                return Err(scope.unsupported(target_addr, "slice of a scalar constant"));
            };
            let view = RangeView::new(parent, left, ascending, right)
                .map_err(|e| scope.logic(apply, e))?;
            Instruction::PushLiteral(Value::Vector(view.read(parent)))
        }
        ObjectClass::Signal | ObjectClass::Variable => {
            let (slot, ty) = match target.class {
                ObjectClass::Signal => {
                    let (id, ty) = scope.signal(target_addr, &target.name)?;
                    (Slot::Signal(id), ty)
                }
                _ => {
                    let (id, decl) = scope.variable(target_addr, &target.name)?;
                    (Slot::Variable(id), decl.ty)
                }
            };
            check_slice(scope, apply, ty, left, ascending, right)?;
            let decl = ViewDecl {
                slot,
                left,
                ascending,
                right,
            };
            let id = *cache.entry(decl).or_insert_with(|| {
                plan.views.push(decl);
                ViewId::from_raw(plan.views.len() as u32 - 1)
            });
            Instruction::RangeCreate(id)
        }
    };

    plan.keep[apply - 5..=apply - 2].fill(false);
    plan.keep[apply] = false;
    plan.rewrites.insert(apply - 1, folded);
    debug!(process = scope.process, addr = apply, "folded range apply");
    Ok(())
}

fn check_slice(
    scope: &Scope<'_>,
    addr: usize,
    ty: TypeSpec,
    left: i64,
    ascending: bool,
    right: i64,
) -> Result<(), CompileError> {
    let Value::Vector(parent) = ty.default_value() else {
        return Err(scope.unsupported(addr, "slice of a non-array object"));
    };
    RangeView::new(&parent, left, ascending, right)
        .map(|_| ())
        .map_err(|e| scope.logic(addr, e))
}

/// Clock-edge folding pass.
pub(crate) fn pass2(raw: &[RawInst], scope: &Scope<'_>, plan: &mut Plan) -> Result<(), CompileError> {
    for &site in &plan.attribute_sites.clone() {
        if site < 5 || site + 17 >= raw.len() {
            return Err(CompileError::SchedulingInvariant {
                process: scope.process.to_string(),
                addr: site,
                reason: format!(
                    "rising-edge window {}..={} runs past the {} records of the process",
                    site as i64 - 5,
                    site + 17,
                    raw.len()
                ),
            });
        }
        let Some((signal, target)) = rising_window(raw, site) else {
            continue;
        };
        let (signal, _) = scope.signal(site - 1, signal)?;
        for addr in site - 5..=site + 16 {
            plan.keep[addr] = false;
            plan.rewrites.remove(&addr);
        }
        plan.rewrites
            .insert(site + 17, Instruction::JumpNotRising { signal, target });
        debug!(process = scope.process, addr = site, %signal, "folded rising-edge test");
    }
    Ok(())
}

/// Matches the canonical `s'EVENT AND s = '1'` window around `site`.
///
/// Returns the signal name and the raw jump target. The caller has checked
/// that the whole window lies inside `raw`.
fn rising_window(raw: &[RawInst], site: usize) -> Option<(&str, usize)> {
    if raw[site - 5].op != RawOp::Enter {
        return None;
    }
    let RawOp::PushObject(first) = &raw[site - 1].op else {
        return None;
    };
    if first.class != ObjectClass::Signal {
        return None;
    }
    let second = (site + 1..=site + 9).any(|addr| {
        matches!(&raw[addr].op, RawOp::PushObject(o)
            if o.class == ObjectClass::Signal && o.name == first.name)
    });
    if !second || raw[site + 10].op != RawOp::PushStatic(StaticValue::Logic(Logic::One)) {
        return None;
    }
    let calls = |addr: usize, prefix: &str| {
        matches!(&raw[addr].op, RawOp::Call(sig) if sig.starts_with(prefix))
    };
    if !calls(site + 12, "\"=\"(") || !calls(site + 15, "\"AND\"(") {
        return None;
    }
    match &raw[site + 17].op {
        RawOp::Jump {
            cond: JumpCond::NotTaken,
            target,
        } => Some((first.name.as_str(), *target)),
        _ => None,
    }
}

/// Renumbers the kept instructions and maps every jump target to the first
/// kept instruction at or after it. `assembled` holds `(raw addr,
/// instruction)` pairs in address order; `len` is the raw record count.
pub(crate) fn relink(
    process: &str,
    len: usize,
    assembled: Vec<(usize, Instruction)>,
) -> Result<Linked, CompileError> {
    let mut map = vec![assembled.len(); len + 1];
    let mut next = assembled.len();
    for addr in (0..len).rev() {
        if next > 0 && assembled[next - 1].0 == addr {
            next -= 1;
        }
        map[addr] = next;
    }

    let mut labels = BTreeMap::new();
    let mut code = Vec::with_capacity(assembled.len());
    let mut source_addrs = Vec::with_capacity(assembled.len());
    for (addr, mut inst) in assembled {
        if let Some(target) = inst.target() {
            let Some(&new) = map.get(target) else {
                return Err(CompileError::BadJumpTarget {
                    process: process.to_string(),
                    addr,
                    target,
                });
            };
            inst.set_target(new);
            labels.insert(target, new);
        }
        code.push(inst);
        source_addrs.push(addr);
    }
    Ok(Linked {
        code,
        labels,
        source_addrs,
    })
}
