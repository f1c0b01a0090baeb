//! Compiles one process's raw records into a [`CompiledProcess`].

use crate::error::CompileError;
use crate::ids::{SignalId, VarId, ViewId};
use crate::instr::{Attr, BinOp, Callee, Instruction, ViewDecl};
use crate::library::{Library, Signature};
use crate::optimizer;
use crate::raw::{parse_raw, JumpCond, Literal, ObjectClass, ObjectRef, RawInst, RawOp, StaticValue};
use hdlvm_common::{LogicError, LogicVec, ObjectSpec, TypeSpec, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{debug, warn};

/// Names visible to every process of a design.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    signals: HashMap<String, (SignalId, TypeSpec)>,
    constants: HashMap<String, Value>,
}

impl SymbolTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a signal name to its scheduler slot.
    pub fn add_signal(&mut self, name: impl Into<String>, id: SignalId, ty: TypeSpec) {
        self.signals.insert(name.into(), (id, ty));
    }

    /// Binds a constant name to its value.
    pub fn add_constant(&mut self, name: impl Into<String>, value: Value) {
        self.constants.insert(name.into(), value);
    }

    /// Looks up a signal.
    pub fn signal(&self, name: &str) -> Option<(SignalId, TypeSpec)> {
        self.signals.get(name).copied()
    }

    /// Looks up a constant.
    pub fn constant(&self, name: &str) -> Option<&Value> {
        self.constants.get(name)
    }
}

/// The uncompiled form of a process.
#[derive(Clone, Debug, Default)]
pub struct ProcessSource {
    /// Process name.
    pub name: String,
    /// Declared variables in slot order.
    pub variables: Vec<(String, ObjectSpec)>,
    /// Raw instruction records.
    pub text: String,
}

/// A process-local variable slot.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct VariableDecl {
    /// Declared name.
    pub name: String,
    /// Declared type.
    pub ty: TypeSpec,
    /// Value at elaboration.
    pub init: Value,
}

/// Compiler switches.
#[derive(Clone, Copy, Debug)]
pub struct CompileOptions {
    /// Fold the `s'EVENT AND s = '1'` idiom into `JumpNotRising`.
    pub fold_rising_edges: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            fold_rising_edges: true,
        }
    }
}

/// An optimized, relinked process.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct CompiledProcess {
    /// Process name.
    pub name: String,
    /// Executable instructions.
    pub code: Vec<Instruction>,
    /// Raw jump target address to instruction index.
    pub labels: BTreeMap<usize, usize>,
    /// Raw address of each instruction in `code`.
    pub source_addrs: Vec<usize>,
    /// Variable slots, indexed by [`VarId`].
    pub variables: Vec<VariableDecl>,
    /// Hoisted range views, indexed by [`ViewId`].
    pub views: Vec<ViewDecl>,
}

impl CompiledProcess {
    /// Returns the hoisted view `id`.
    pub fn view(&self, id: ViewId) -> Option<&ViewDecl> {
        self.views.get(id.index())
    }

    /// Returns the raw address instruction `pc` was compiled from.
    pub fn source_addr(&self, pc: usize) -> Option<usize> {
        self.source_addrs.get(pc).copied()
    }
}

impl fmt::Display for CompiledProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "process {}", self.name)?;
        for (i, var) in self.variables.iter().enumerate() {
            writeln!(f, "  v{i} {} : {} = {}", var.name, var.ty, var.init)?;
        }
        for (i, view) in self.views.iter().enumerate() {
            writeln!(f, "  r{i} = {view}")?;
        }
        for (pc, (inst, addr)) in self.code.iter().zip(&self.source_addrs).enumerate() {
            writeln!(f, "  {pc:4} [{addr:4}] {inst}")?;
        }
        Ok(())
    }
}

/// Name resolution context for one process.
pub(crate) struct Scope<'a> {
    pub process: &'a str,
    symbols: &'a SymbolTable,
    variables: &'a [VariableDecl],
    library: &'a Library,
}

impl<'a> Scope<'a> {
    pub(crate) fn malformed(&self, addr: usize, reason: &str) -> CompileError {
        CompileError::Malformed {
            process: self.process.to_string(),
            addr,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn unsupported(&self, addr: usize, what: &str) -> CompileError {
        CompileError::Unsupported {
            process: self.process.to_string(),
            addr,
            what: what.to_string(),
        }
    }

    pub(crate) fn logic(&self, addr: usize, source: LogicError) -> CompileError {
        CompileError::Logic {
            process: self.process.to_string(),
            addr,
            source,
        }
    }

    fn unknown(&self, addr: usize, class: ObjectClass, name: &str) -> CompileError {
        CompileError::UnknownObject {
            process: self.process.to_string(),
            addr,
            class: class.name(),
            name: name.to_string(),
        }
    }

    pub(crate) fn signal(&self, addr: usize, name: &str) -> Result<(SignalId, TypeSpec), CompileError> {
        self.symbols
            .signal(name)
            .ok_or_else(|| self.unknown(addr, ObjectClass::Signal, name))
    }

    pub(crate) fn variable(&self, addr: usize, name: &str) -> Result<(VarId, &'a VariableDecl), CompileError> {
        self.variables
            .iter()
            .enumerate()
            .find(|(_, v)| v.name == name)
            .map(|(i, v)| (VarId::from_raw(i as u32), v))
            .ok_or_else(|| self.unknown(addr, ObjectClass::Variable, name))
    }

    /// Design constants take precedence over an inline `= value`.
    pub(crate) fn constant(&self, addr: usize, obj: &ObjectRef) -> Result<Value, CompileError> {
        if let Some(value) = self.symbols.constant(&obj.name) {
            return Ok(value.clone());
        }
        match &obj.spec.init {
            Some(text) => obj
                .spec
                .ty
                .value_from_literal(text)
                .map_err(|e| self.logic(addr, e)),
            None => Err(self.unknown(addr, ObjectClass::Constant, &obj.name)),
        }
    }

    fn call(&self, addr: usize, text: &str) -> Result<Instruction, CompileError> {
        let sig = Signature::parse(text)
            .ok_or_else(|| self.malformed(addr, &format!("bad call signature '{text}'")))?;
        match self.library.resolve(&sig) {
            Some(id) => Ok(Instruction::Call {
                callee: Callee::Builtin(id),
                argc: self.library[id].arity(),
            }),
            None => {
                warn!(process = self.process, addr, signature = %sig, "unresolved subprogram call");
                Ok(Instruction::Call {
                    argc: sig.params.len(),
                    callee: Callee::Unresolved {
                        signature: sig.to_string(),
                        ret: sig.ret,
                    },
                })
            }
        }
    }
}

/// Compiles `source` with default options.
pub fn compile(
    source: &ProcessSource,
    symbols: &SymbolTable,
    library: &Library,
) -> Result<CompiledProcess, CompileError> {
    compile_with(source, symbols, library, CompileOptions::default())
}

/// Compiles `source`.
pub fn compile_with(
    source: &ProcessSource,
    symbols: &SymbolTable,
    library: &Library,
    options: CompileOptions,
) -> Result<CompiledProcess, CompileError> {
    let raw = parse_raw(&source.name, &source.text)?;
    let variables = source
        .variables
        .iter()
        .map(|(name, spec)| {
            let init = match &spec.init {
                Some(text) => spec.ty.value_from_literal(text),
                None => Ok(spec.ty.default_value()),
            };
            init.map(|init| VariableDecl {
                name: name.clone(),
                ty: spec.ty,
                init,
            })
            .map_err(|e| CompileError::Logic {
                process: source.name.clone(),
                addr: 0,
                source: e,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let scope = Scope {
        process: &source.name,
        symbols,
        variables: &variables,
        library,
    };
    let mut plan = optimizer::pass1(&raw, &scope)?;
    if options.fold_rising_edges {
        optimizer::pass2(&raw, &scope, &mut plan)?;
    }

    let mut assembled = Vec::new();
    for inst in &raw {
        if !plan.keep[inst.addr] {
            continue;
        }
        let lowered = match plan.rewrites.remove(&inst.addr) {
            Some(rewritten) => rewritten,
            None => lower(&scope, &raw, inst)?,
        };
        assembled.push((inst.addr, lowered));
    }
    let linked = optimizer::relink(&source.name, raw.len(), assembled)?;
    debug!(
        process = %source.name,
        raw = raw.len(),
        compiled = linked.code.len(),
        views = plan.views.len(),
        "compiled process"
    );

    Ok(CompiledProcess {
        name: source.name.clone(),
        code: linked.code,
        labels: linked.labels,
        source_addrs: linked.source_addrs,
        variables,
        views: plan.views,
    })
}

/// Translates a record the passes left untouched.
fn lower(scope: &Scope<'_>, raw: &[RawInst], inst: &RawInst) -> Result<Instruction, CompileError> {
    let addr = inst.addr;
    Ok(match &inst.op {
        RawOp::PushLiteral(Literal::Integer(v)) => Instruction::PushLiteral(Value::Integer(*v)),
        RawOp::PushLiteral(Literal::Bits(bits)) => {
            let vec = LogicVec::from_literal(bits).map_err(|e| scope.logic(addr, e))?;
            Instruction::PushLiteral(Value::Vector(vec))
        }
        RawOp::PushStatic(StaticValue::Boolean(b)) => Instruction::PushLiteral(Value::Boolean(*b)),
        RawOp::PushStatic(StaticValue::Logic(l)) => Instruction::PushLiteral(Value::Logic(*l)),
        RawOp::PushObject(obj) => match obj.class {
            ObjectClass::Signal => Instruction::PushSignal(scope.signal(addr, &obj.name)?.0),
            ObjectClass::Variable => Instruction::PushVariable(scope.variable(addr, &obj.name)?.0),
            ObjectClass::Constant => Instruction::PushConstant(scope.constant(addr, obj)?),
        },
        RawOp::RangeCreate => return Err(scope.unsupported(addr, "RANGE CREATE without RANGE APPLY")),
        RawOp::RangeApply => {
            return Err(CompileError::RangeShape {
                process: scope.process.to_string(),
                addr,
            })
        }
        RawOp::Enter | RawOp::New(_) | RawOp::Map | RawOp::Exit | RawOp::Cancel => {
            return Err(scope.malformed(addr, "bracket record survived optimization"))
        }
        RawOp::Call(sig) => scope.call(addr, sig)?,
        RawOp::BinaryOp(op) => Instruction::BinaryOp(BinOp::parse(op)),
        RawOp::Attribute(attr) if attr == "EVENT" => Instruction::Attribute(Attr::Event),
        RawOp::Attribute(attr) => return Err(scope.unsupported(addr, &format!("attribute '{attr}'"))),
        RawOp::Index => Instruction::Index,
        RawOp::Aggregate { width, others: true } => Instruction::Aggregate { width: *width },
        RawOp::Aggregate { others: false, .. } => {
            return Err(scope.unsupported(addr, "positional aggregate"))
        }
        RawOp::Pop { reject: true, .. } => {
            return Err(scope.unsupported(addr, "pulse rejection limit"))
        }
        RawOp::Pop { delayed, .. } => Instruction::ScheduleAssignment { delayed: *delayed },
        RawOp::ScheduleTimed => Instruction::ScheduleDelay,
        RawOp::ScheduleWakeup => Instruction::ScheduleWakeup,
        RawOp::Wait if addr > 0 && raw[addr - 1].op.is_schedule() => Instruction::Suspend,
        RawOp::Wait => Instruction::Halt,
        RawOp::Jump { cond, target } => match cond {
            JumpCond::Always | JumpCond::Event | JumpCond::Timeout => Instruction::Jump(*target),
            JumpCond::NotTaken => Instruction::JumpIfFalse(*target),
            JumpCond::Taken => Instruction::JumpIfTrue(*target),
            JumpCond::NotRising(name) => Instruction::JumpNotRising {
                signal: scope.signal(addr, name)?.0,
                target: *target,
            },
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instr::Slot;
    use hdlvm_common::{Direction, Logic};

    fn symbols() -> SymbolTable {
        let mut table = SymbolTable::new();
        table.add_signal("clk", SignalId::from_raw(0), TypeSpec::Logic);
        table.add_signal("q", SignalId::from_raw(1), TypeSpec::Logic);
        table.add_signal(
            "bus",
            SignalId::from_raw(2),
            TypeSpec::Array {
                left: 7,
                direction: Direction::Downto,
                right: 0,
            },
        );
        table
    }

    fn build(text: &str) -> Result<CompiledProcess, CompileError> {
        let source = ProcessSource {
            name: "p".into(),
            variables: Vec::new(),
            text: text.into(),
        };
        compile(&source, &symbols(), &Library::ieee())
    }

    const TOGGLE: &str = "\
0 PUSH OBJECT SIGNAL clk : STD_LOGIC
1 SCHEDULE EVENT WAKEUP
2 WAIT
3 JUMP EVENT 5
4 JUMP TIMEOUT 5
5 CANCEL ALL WAKEUPS
6 ENTER CONTEXT
7 NEW CONSTANT L : BOOLEAN
8 NEW CONSTANT R : BOOLEAN
9 MAP L
10 PUSH OBJECT SIGNAL clk : STD_LOGIC
11 ATTRIBUTE OP EVENT
12 MAP R
13 ENTER CONTEXT
14 NEW CONSTANT L : STD_ULOGIC
15 NEW CONSTANT R : STD_ULOGIC
16 MAP L
17 PUSH OBJECT SIGNAL clk : STD_LOGIC
18 MAP R
19 PUSH OBJECT CONSTANT L : STD_ULOGIC
20 PUSH OBJECT CONSTANT R : STD_ULOGIC
21 PUSH STATIC VALUE 1
22 PUSH OBJECT CONSTANT R : STD_ULOGIC
23 CALL FUNCTION \"=\"(CONSTANT L : STD_ULOGIC, CONSTANT R : STD_ULOGIC) RETURN BOOLEAN
24 EXIT CONTEXT
25 PUSH OBJECT CONSTANT R : BOOLEAN
26 CALL FUNCTION \"AND\"(CONSTANT L : BOOLEAN, CONSTANT R : BOOLEAN) RETURN BOOLEAN
27 EXIT CONTEXT
28 JUMP NC 0
29 PUSH OBJECT SIGNAL q : STD_LOGIC
30 ENTER CONTEXT
31 NEW CONSTANT L : STD_ULOGIC
32 MAP L
33 PUSH OBJECT SIGNAL q : STD_LOGIC
34 CALL FUNCTION \"NOT\"(CONSTANT L : STD_ULOGIC) RETURN UX01
35 EXIT CONTEXT
36 POP F F F
37 JUMP 0
";

    #[test]
    fn wait_region_is_removed() {
        let p = build(
            "0 PUSH OBJECT SIGNAL clk : STD_LOGIC\n\
             1 SCHEDULE EVENT WAKEUP\n\
             2 WAIT\n\
             3 JUMP EVENT 5\n\
             4 JUMP TIMEOUT 5\n\
             5 CANCEL ALL WAKEUPS\n\
             6 JUMP 0",
        )
        .unwrap();
        assert_eq!(
            p.code,
            vec![
                Instruction::PushSignal(SignalId::from_raw(0)),
                Instruction::ScheduleWakeup,
                Instruction::Suspend,
                Instruction::Jump(0),
            ]
        );
        assert_eq!(p.source_addrs, vec![0, 1, 2, 6]);
    }

    #[test]
    fn wait_without_cancel_is_an_error() {
        let err = build("0 PUSH LITERAL 10\n1 SCHEDULE TIMED\n2 WAIT\n3 JUMP 0").unwrap_err();
        assert_eq!(
            err,
            CompileError::UnterminatedWait {
                process: "p".into(),
                addr: 2
            }
        );
    }

    #[test]
    fn bare_wait_halts() {
        let p = build("0 PUSH LITERAL 1\n1 WAIT").unwrap();
        assert_eq!(p.code[1], Instruction::Halt);
    }

    #[test]
    fn range_on_signal_is_hoisted_and_cached() {
        let slice = "PUSH OBJECT SIGNAL bus : ARRAY 7 DOWNTO 0 OF STD_LOGIC\n\
                     PUSH LITERAL 7\n\
                     PUSH STATIC VALUE FALSE\n\
                     PUSH LITERAL 4\n\
                     RANGE CREATE\n\
                     RANGE APPLY";
        let mut text = String::new();
        for (i, line) in slice.lines().chain(slice.lines()).enumerate() {
            text.push_str(&format!("{i} {}\n", line.trim()));
        }
        text.push_str("12 WAIT\n");
        let p = build(&text).unwrap();
        assert_eq!(
            p.code,
            vec![
                Instruction::RangeCreate(ViewId::from_raw(0)),
                Instruction::RangeCreate(ViewId::from_raw(0)),
                Instruction::Halt,
            ]
        );
        assert_eq!(
            p.views,
            vec![ViewDecl {
                slot: Slot::Signal(SignalId::from_raw(2)),
                left: 7,
                ascending: false,
                right: 4,
            }]
        );
        assert_eq!(p.source_addrs, vec![4, 10, 12]);
    }

    #[test]
    fn range_on_constant_becomes_literal() {
        let p = build(
            "0 PUSH OBJECT CONSTANT K : ARRAY 7 DOWNTO 0 OF STD_LOGIC = \"11001010\"\n\
             1 PUSH LITERAL 7\n\
             2 PUSH STATIC VALUE FALSE\n\
             3 PUSH LITERAL 4\n\
             4 RANGE CREATE\n\
             5 RANGE APPLY",
        )
        .unwrap();
        let Instruction::PushLiteral(Value::Vector(v)) = &p.code[0] else {
            panic!("expected literal, got {:?}", p.code);
        };
        assert_eq!(v.to_string(), "1100");
        assert_eq!(p.code.len(), 1);
    }

    #[test]
    fn range_shape_mismatch_is_an_error() {
        let err = build("0 PUSH LITERAL 1\n1 RANGE APPLY").unwrap_err();
        assert_eq!(
            err,
            CompileError::RangeShape {
                process: "p".into(),
                addr: 1
            }
        );
        let err = build(
            "0 PUSH OBJECT SIGNAL bus : ARRAY 7 DOWNTO 0 OF STD_LOGIC\n\
             1 PUSH LITERAL 7\n\
             2 PUSH LITERAL 1\n\
             3 PUSH LITERAL 4\n\
             4 RANGE CREATE\n\
             5 RANGE APPLY",
        )
        .unwrap_err();
        assert_eq!(err.addr(), 5);
    }

    #[test]
    fn range_out_of_bounds_is_an_error() {
        let err = build(
            "0 PUSH OBJECT SIGNAL bus : ARRAY 7 DOWNTO 0 OF STD_LOGIC\n\
             1 PUSH LITERAL 9\n\
             2 PUSH STATIC VALUE FALSE\n\
             3 PUSH LITERAL 4\n\
             4 RANGE CREATE\n\
             5 RANGE APPLY",
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::Logic { addr: 5, .. }));
    }

    #[test]
    fn call_context_is_stripped() {
        let p = build(
            "0 ENTER CONTEXT\n\
             1 NEW CONSTANT L : STD_ULOGIC\n\
             2 NEW CONSTANT R : STD_ULOGIC\n\
             3 MAP L\n\
             4 PUSH OBJECT SIGNAL clk : STD_LOGIC\n\
             5 MAP R\n\
             6 PUSH OBJECT CONSTANT L : STD_ULOGIC\n\
             7 PUSH STATIC VALUE 1\n\
             8 CALL FUNCTION \"AND\"(CONSTANT L : STD_ULOGIC, CONSTANT R : STD_ULOGIC) RETURN UX01\n\
             9 EXIT CONTEXT\n\
             10 WAIT",
        )
        .unwrap();
        let and = Library::ieee()
            .lookup("\"AND\"(L : STD_LOGIC, R : STD_LOGIC) RETURN STD_LOGIC")
            .unwrap();
        assert_eq!(
            p.code,
            vec![
                Instruction::PushSignal(SignalId::from_raw(0)),
                Instruction::PushLiteral(Value::Logic(Logic::One)),
                Instruction::Call {
                    callee: Callee::Builtin(and),
                    argc: 2
                },
                Instruction::Halt,
            ]
        );
    }

    #[test]
    fn formal_name_shadows_design_constant_inside_call() {
        let mut table = symbols();
        table.add_constant("L", Value::Logic(Logic::Zero));
        let source = ProcessSource {
            name: "p".into(),
            variables: Vec::new(),
            text: "0 ENTER CONTEXT\n\
                   1 NEW CONSTANT L : STD_ULOGIC\n\
                   2 NEW CONSTANT R : STD_ULOGIC\n\
                   3 MAP L\n\
                   4 PUSH OBJECT SIGNAL clk : STD_LOGIC\n\
                   5 MAP R\n\
                   6 PUSH OBJECT CONSTANT L : STD_ULOGIC\n\
                   7 PUSH STATIC VALUE 1\n\
                   8 CALL FUNCTION \"AND\"(CONSTANT L : STD_ULOGIC, CONSTANT R : STD_ULOGIC) RETURN UX01\n\
                   9 EXIT CONTEXT\n\
                   10 PUSH OBJECT CONSTANT L : STD_ULOGIC\n\
                   11 WAIT"
                .into(),
        };
        let p = compile(&source, &table, &Library::ieee()).unwrap();
        let and = Library::ieee()
            .lookup("\"AND\"(L : STD_LOGIC, R : STD_LOGIC) RETURN STD_LOGIC")
            .unwrap();
        // Inside the call `L` names the formal and is dropped; after
        // EXIT CONTEXT it is the design constant again.
        assert_eq!(
            p.code,
            vec![
                Instruction::PushSignal(SignalId::from_raw(0)),
                Instruction::PushLiteral(Value::Logic(Logic::One)),
                Instruction::Call {
                    callee: Callee::Builtin(and),
                    argc: 2
                },
                Instruction::PushConstant(Value::Logic(Logic::Zero)),
                Instruction::Halt,
            ]
        );
        assert_eq!(p.source_addrs, vec![4, 7, 8, 10, 11]);
    }

    #[test]
    fn unresolved_call_degrades() {
        let p = build(
            "0 PUSH LITERAL 3\n\
             1 CALL FUNCTION \"**\"(CONSTANT L : INTEGER, CONSTANT R : INTEGER) RETURN INTEGER",
        )
        .unwrap();
        let Instruction::Call {
            callee: Callee::Unresolved { ret, .. },
            argc,
        } = &p.code[1]
        else {
            panic!("expected unresolved call");
        };
        assert_eq!(*argc, 2);
        assert_eq!(*ret, Some(hdlvm_common::ValueKind::Integer));
    }

    #[test]
    fn exit_must_follow_call() {
        let err = build("0 ENTER CONTEXT\n1 NEW L\n2 EXIT CONTEXT").unwrap_err();
        assert!(matches!(err, CompileError::Malformed { addr: 2, .. }));
        let err = build("0 ENTER CONTEXT\n1 NEW L").unwrap_err();
        assert!(matches!(err, CompileError::Malformed { addr: 0, .. }));
    }

    #[test]
    fn jumps_into_removed_code_move_forward() {
        let p = build(
            "0 JUMP 2\n\
             1 PUSH LITERAL 5\n\
             2 CANCEL ALL WAKEUPS\n\
             3 WAIT",
        )
        .unwrap();
        assert_eq!(p.code[0], Instruction::Jump(2));
        assert_eq!(p.labels.get(&2), Some(&2));
    }

    #[test]
    fn unknown_signal_is_an_error() {
        let err = build("0 PUSH OBJECT SIGNAL nope : STD_LOGIC").unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnknownObject { class: "signal", ref name, .. } if name == "nope"
        ));
    }

    #[test]
    fn reject_limit_unsupported() {
        let err = build("0 POP T F T").unwrap_err();
        assert!(matches!(err, CompileError::Unsupported { addr: 0, .. }));
    }

    #[test]
    fn variables_resolve_to_slots() {
        let source = ProcessSource {
            name: "p".into(),
            variables: vec![
                ("a".into(), TypeSpec::parse(&["INTEGER", "=", "4"]).unwrap()),
                ("b".into(), TypeSpec::parse(&["STD_LOGIC"]).unwrap()),
            ],
            text: "0 PUSH OBJECT VARIABLE b : STD_LOGIC\n1 PUSH OBJECT VARIABLE a : INTEGER".into(),
        };
        let p = compile(&source, &symbols(), &Library::ieee()).unwrap();
        assert_eq!(
            p.code,
            vec![
                Instruction::PushVariable(VarId::from_raw(1)),
                Instruction::PushVariable(VarId::from_raw(0)),
            ]
        );
        assert_eq!(p.variables[0].init, Value::Integer(4));
        assert_eq!(p.variables[1].init, Value::Logic(Logic::U));
    }

    #[test]
    fn rising_edge_window_folds() {
        let p = build(TOGGLE).unwrap();
        let not = Library::ieee()
            .lookup("\"NOT\"(L : STD_ULOGIC) RETURN UX01")
            .unwrap();
        let clk = SignalId::from_raw(0);
        let q = SignalId::from_raw(1);
        assert_eq!(
            p.code,
            vec![
                Instruction::PushSignal(clk),
                Instruction::ScheduleWakeup,
                Instruction::Suspend,
                Instruction::JumpNotRising {
                    signal: clk,
                    target: 0
                },
                Instruction::PushSignal(q),
                Instruction::PushSignal(q),
                Instruction::Call {
                    callee: Callee::Builtin(not),
                    argc: 1
                },
                Instruction::ScheduleAssignment { delayed: false },
                Instruction::Jump(0),
            ]
        );
        assert_eq!(p.source_addrs[3], 28);
    }

    #[test]
    fn rising_edge_fold_can_be_disabled() {
        let source = ProcessSource {
            name: "p".into(),
            variables: Vec::new(),
            text: TOGGLE.into(),
        };
        let options = CompileOptions {
            fold_rising_edges: false,
        };
        let p = compile_with(&source, &symbols(), &Library::ieee(), options).unwrap();
        assert!(p.code.contains(&Instruction::Attribute(Attr::Event)));
        assert!(p.code.contains(&Instruction::JumpIfFalse(0)));
        assert!(!p
            .code
            .iter()
            .any(|i| matches!(i, Instruction::JumpNotRising { .. })));
    }

    #[test]
    fn truncated_window_is_a_scheduling_invariant_error() {
        let text: String = TOGGLE.lines().take(28).map(|l| format!("{l}\n")).collect();
        let err = build(&text).unwrap_err();
        assert!(matches!(
            err,
            CompileError::SchedulingInvariant { addr: 11, ref process, .. } if process == "p"
        ));
        assert_eq!(err.addr(), 11);

        let source = ProcessSource {
            name: "p".into(),
            variables: Vec::new(),
            text,
        };
        let options = CompileOptions {
            fold_rising_edges: false,
        };
        let p = compile_with(&source, &symbols(), &Library::ieee(), options).unwrap();
        assert!(p.code.contains(&Instruction::Attribute(Attr::Event)));
    }

    #[test]
    fn event_attribute_near_start_is_a_scheduling_invariant_error() {
        let err = build(
            "0 PUSH OBJECT SIGNAL clk : STD_LOGIC\n\
             1 ATTRIBUTE OP EVENT\n\
             2 WAIT",
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::SchedulingInvariant { addr: 1, .. }));
    }

    #[test]
    fn listing_shows_source_addresses() {
        let p = build("0 PUSH LITERAL 1\n1 WAIT").unwrap();
        let text = p.to_string();
        assert!(text.starts_with("process p\n"));
        assert!(text.contains("[   1] HALT"));
    }

    #[test]
    fn compiled_process_serde_roundtrip() {
        let p = build(TOGGLE).unwrap();
        let json = serde_json::to_string(&p).unwrap();
        let restored: CompiledProcess = serde_json::from_str(&json).unwrap();
        assert_eq!(p, restored);
    }
}
