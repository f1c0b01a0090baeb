//! The built-in function table.
//!
//! A [`Library`] maps normalized call signatures to [`Builtin`] entries. It is
//! built once per simulation, shared by the compiler (which resolves
//! `CALL FUNCTION` records to [`FuncId`]s) and the VM (which dispatches on
//! them), and never mutated afterwards.

use crate::arena::Arena;
use crate::error::LibraryError;
use crate::ids::FuncId;
use hdlvm_common::{Logic, LogicVec, Value, ValueKind};
use std::collections::HashMap;
use std::fmt;
use std::ops::Index;

/// Signature of a pure built-in.
pub type BuiltinFn = fn(&[Value]) -> Result<Value, LibraryError>;

/// How a built-in is evaluated.
#[derive(Clone, Copy)]
pub enum Eval {
    /// A pure function of its operand values.
    Pure(BuiltinFn),
    /// `RISING_EDGE(s)`: needs the signal's event state, not just its value.
    RisingEdge,
    /// `FALLING_EDGE(s)`
    FallingEdge,
}

impl fmt::Debug for Eval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Eval::Pure(_) => f.write_str("Pure"),
            Eval::RisingEdge => f.write_str("RisingEdge"),
            Eval::FallingEdge => f.write_str("FallingEdge"),
        }
    }
}

/// One library entry.
#[derive(Clone, Debug)]
pub struct Builtin {
    /// Operator or function name, unquoted and uppercase.
    pub name: &'static str,
    /// Operand classes in call order.
    pub params: Vec<ValueKind>,
    /// Result class.
    pub ret: ValueKind,
    /// Evaluation strategy.
    pub eval: Eval,
}

impl Builtin {
    /// Number of operands the call pops.
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// A call signature reduced to what resolution depends on.
///
/// Formal parameter names and modes are dropped; type names are mapped to
/// value classes, so `STD_ULOGIC`, `STD_LOGIC` and `UX01` all read as logic.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Signature {
    /// Unquoted, uppercase name.
    pub name: String,
    /// Parameter classes; `None` for a type outside the value model.
    pub params: Vec<Option<ValueKind>>,
    /// Return class, if the return type is known.
    pub ret: Option<ValueKind>,
}

impl Signature {
    /// Parses `"NAME"(CONSTANT A : TYPE, ...) RETURN TYPE`.
    pub fn parse(text: &str) -> Option<Signature> {
        let text = text.trim();
        let (head, params, tail) = match text.find('(') {
            Some(open) => {
                let close = open + text[open..].find(')')?;
                (&text[..open], &text[open + 1..close], &text[close + 1..])
            }
            None => {
                let upper = text.to_ascii_uppercase();
                let split = upper.find(" RETURN ").unwrap_or(text.len());
                (&text[..split], "", &text[split..])
            }
        };
        let name = head.trim().trim_matches('"').to_ascii_uppercase();
        if name.is_empty() {
            return None;
        }
        let tail: Vec<&str> = tail.split_whitespace().collect();
        let ret = match tail.as_slice() {
            [kw, ty] if kw.eq_ignore_ascii_case("RETURN") => type_kind(ty),
            [] => None,
            _ => return None,
        };
        Some(Signature {
            name,
            params: parse_params(params),
            ret,
        })
    }

    /// The lookup key, when every type is known.
    fn key(&self) -> Option<String> {
        let params: Option<Vec<ValueKind>> = self.params.iter().copied().collect();
        Some(signature_key(&self.name, &params?, self.ret?))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"(", self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            match p {
                Some(kind) => write!(f, "{kind}")?,
                None => f.write_str("?")?,
            }
        }
        match self.ret {
            Some(kind) => write!(f, ") RETURN {kind}"),
            None => f.write_str(") RETURN ?"),
        }
    }
}

/// Splits a formal list into one class per parameter.
///
/// `CONSTANT L, R : STD_ULOGIC` declares two parameters of one type, so
/// name-only pieces are counted until the next typed piece.
fn parse_params(list: &str) -> Vec<Option<ValueKind>> {
    let mut out = Vec::new();
    let mut pending = 0;
    for piece in list.split([',', ';']) {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        match piece.split_once(':') {
            Some((_, ty)) => {
                let kind = ty.split_whitespace().last().and_then(type_kind);
                out.extend(std::iter::repeat_n(kind, pending + 1));
                pending = 0;
            }
            None => pending += 1,
        }
    }
    out
}

/// Maps a declared type name to its value class.
pub fn type_kind(name: &str) -> Option<ValueKind> {
    match name.to_ascii_uppercase().as_str() {
        "STD_ULOGIC" | "STD_LOGIC" | "UX01" | "X01" | "X01Z" | "UX01Z" => Some(ValueKind::Logic),
        "STD_LOGIC_VECTOR" | "STD_ULOGIC_VECTOR" | "UNSIGNED" | "SIGNED" => {
            Some(ValueKind::Vector)
        }
        "INTEGER" | "NATURAL" | "POSITIVE" => Some(ValueKind::Integer),
        "BOOLEAN" => Some(ValueKind::Boolean),
        _ => None,
    }
}

fn signature_key(name: &str, params: &[ValueKind], ret: ValueKind) -> String {
    let params: Vec<String> = params.iter().map(ValueKind::to_string).collect();
    format!("{name}({}) RETURN {ret}", params.join(","))
}

/// An immutable table of built-in functions.
#[derive(Clone, Debug, Default)]
pub struct Library {
    funcs: Arena<FuncId, Builtin>,
    index: HashMap<String, FuncId>,
}

impl Library {
    /// Creates an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry and returns its ID. A later entry with the same
    /// signature shadows an earlier one.
    pub fn register(
        &mut self,
        name: &'static str,
        params: &[ValueKind],
        ret: ValueKind,
        eval: Eval,
    ) -> FuncId {
        let key = signature_key(name, params, ret);
        let id = self.funcs.alloc(Builtin {
            name,
            params: params.to_vec(),
            ret,
            eval,
        });
        self.index.insert(key, id);
        id
    }

    /// Resolves a parsed signature.
    pub fn resolve(&self, sig: &Signature) -> Option<FuncId> {
        self.index.get(&sig.key()?).copied()
    }

    /// Parses and resolves a raw signature string.
    pub fn lookup(&self, text: &str) -> Option<FuncId> {
        self.resolve(&Signature::parse(text)?)
    }

    /// Returns the entry for `id`.
    pub fn get(&self, id: FuncId) -> Option<&Builtin> {
        self.funcs.get(id)
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }

    /// The `std_logic_1164` / `numeric` subset the VM supports.
    pub fn ieee() -> Self {
        use ValueKind::{Boolean as B, Integer as I, Logic as L, Vector as V};
        let mut lib = Library::new();

        lib.register("=", &[L, L], B, Eval::Pure(|a| logic_cmp("=", a, |x, y| x == y)));
        lib.register("/=", &[L, L], B, Eval::Pure(|a| logic_cmp("/=", a, |x, y| x != y)));
        lib.register("AND", &[L, L], L, Eval::Pure(|a| logic2("AND", a, |x, y| x & y)));
        lib.register("OR", &[L, L], L, Eval::Pure(|a| logic2("OR", a, |x, y| x | y)));
        lib.register("XOR", &[L, L], L, Eval::Pure(|a| logic2("XOR", a, |x, y| x ^ y)));
        lib.register("NAND", &[L, L], L, Eval::Pure(|a| logic2("NAND", a, Logic::nand)));
        lib.register("NOR", &[L, L], L, Eval::Pure(|a| logic2("NOR", a, Logic::nor)));
        lib.register("XNOR", &[L, L], L, Eval::Pure(|a| logic2("XNOR", a, Logic::xnor)));
        lib.register("NOT", &[L], L, Eval::Pure(not_logic));

        lib.register("=", &[V, V], B, Eval::Pure(|a| vec_cmp("=", a, true)));
        lib.register("/=", &[V, V], B, Eval::Pure(|a| vec_cmp("/=", a, false)));
        lib.register("AND", &[V, V], V, Eval::Pure(|a| vec2("AND", a, |x, y| x & y)));
        lib.register("OR", &[V, V], V, Eval::Pure(|a| vec2("OR", a, |x, y| x | y)));
        lib.register("XOR", &[V, V], V, Eval::Pure(|a| vec2("XOR", a, |x, y| x ^ y)));
        lib.register("NAND", &[V, V], V, Eval::Pure(|a| vec2("NAND", a, LogicVec::nand)));
        lib.register("NOR", &[V, V], V, Eval::Pure(|a| vec2("NOR", a, LogicVec::nor)));
        lib.register("XNOR", &[V, V], V, Eval::Pure(|a| vec2("XNOR", a, LogicVec::xnor)));
        lib.register("NOT", &[V], V, Eval::Pure(not_vector));
        lib.register("+", &[V, V], V, Eval::Pure(|a| vec2("+", a, LogicVec::add)));
        lib.register("-", &[V, V], V, Eval::Pure(|a| vec2("-", a, LogicVec::sub)));
        lib.register("+", &[V, I], V, Eval::Pure(vec_add_int));
        for (l, r) in [(V, V), (V, L), (L, V), (L, L)] {
            lib.register("&", &[l, r], V, Eval::Pure(concat));
        }

        lib.register("+", &[I, I], I, Eval::Pure(|a| int2("+", a, |x, y| x.wrapping_add(y))));
        lib.register("-", &[I, I], I, Eval::Pure(|a| int2("-", a, |x, y| x.wrapping_sub(y))));
        lib.register(">", &[I, I], B, Eval::Pure(|a| int_cmp(">", a, |x, y| x > y)));
        lib.register("=", &[I, I], B, Eval::Pure(|a| int_cmp("=", a, |x, y| x == y)));

        lib.register("AND", &[B, B], B, Eval::Pure(|a| bool2("AND", a, |x, y| x && y)));
        lib.register("OR", &[B, B], B, Eval::Pure(|a| bool2("OR", a, |x, y| x || y)));

        lib.register("RISING_EDGE", &[L], B, Eval::RisingEdge);
        lib.register("FALLING_EDGE", &[L], B, Eval::FallingEdge);
        lib
    }
}

impl Index<FuncId> for Library {
    type Output = Builtin;

    fn index(&self, id: FuncId) -> &Builtin {
        &self.funcs[id]
    }
}

fn arity(func: &'static str, args: &[Value], expected: usize) -> Result<(), LibraryError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(LibraryError::Arity {
            func,
            expected,
            found: args.len(),
        })
    }
}

fn kind_error(func: &'static str, args: &[Value], index: usize, expected: ValueKind) -> LibraryError {
    LibraryError::OperandKind {
        func,
        index,
        expected,
        found: args[index].kind(),
    }
}

fn logic(func: &'static str, args: &[Value], index: usize) -> Result<Logic, LibraryError> {
    args[index]
        .as_logic()
        .ok_or_else(|| kind_error(func, args, index, ValueKind::Logic))
}

fn vector<'a>(func: &'static str, args: &'a [Value], index: usize) -> Result<&'a LogicVec, LibraryError> {
    args[index]
        .as_vector()
        .ok_or_else(|| kind_error(func, args, index, ValueKind::Vector))
}

fn integer(func: &'static str, args: &[Value], index: usize) -> Result<i64, LibraryError> {
    args[index]
        .as_integer()
        .ok_or_else(|| kind_error(func, args, index, ValueKind::Integer))
}

fn boolean(func: &'static str, args: &[Value], index: usize) -> Result<bool, LibraryError> {
    args[index]
        .as_bool()
        .ok_or_else(|| kind_error(func, args, index, ValueKind::Boolean))
}

fn logic2(
    func: &'static str,
    args: &[Value],
    op: impl Fn(Logic, Logic) -> Logic,
) -> Result<Value, LibraryError> {
    arity(func, args, 2)?;
    Ok(Value::Logic(op(logic(func, args, 0)?, logic(func, args, 1)?)))
}

fn logic_cmp(
    func: &'static str,
    args: &[Value],
    op: impl Fn(Logic, Logic) -> bool,
) -> Result<Value, LibraryError> {
    arity(func, args, 2)?;
    Ok(Value::Boolean(op(logic(func, args, 0)?, logic(func, args, 1)?)))
}

fn vec2(
    func: &'static str,
    args: &[Value],
    op: impl Fn(&LogicVec, &LogicVec) -> LogicVec,
) -> Result<Value, LibraryError> {
    arity(func, args, 2)?;
    let (a, b) = (vector(func, args, 0)?, vector(func, args, 1)?);
    if a.width() != b.width() {
        return Err(LibraryError::WidthMismatch {
            func,
            left: a.width(),
            right: b.width(),
        });
    }
    Ok(Value::Vector(op(a, b)))
}

/// Vector equality compares the printed form, so bounds and direction
/// do not matter.
fn vec_cmp(func: &'static str, args: &[Value], equal: bool) -> Result<Value, LibraryError> {
    arity(func, args, 2)?;
    vector(func, args, 0)?;
    vector(func, args, 1)?;
    Ok(Value::Boolean(args[0].same_as(&args[1]) == equal))
}

fn concat(args: &[Value]) -> Result<Value, LibraryError> {
    arity("&", args, 2)?;
    let part = |index: usize| {
        args[index]
            .to_bits()
            .ok_or_else(|| kind_error("&", args, index, ValueKind::Vector))
    };
    let mut bits = part(1)?;
    bits.extend(part(0)?);
    Ok(Value::Vector(LogicVec::from_bits(bits)))
}

fn not_logic(args: &[Value]) -> Result<Value, LibraryError> {
    arity("NOT", args, 1)?;
    let l = logic("NOT", args, 0)?;
    Ok(Value::Logic(!l))
}

fn not_vector(args: &[Value]) -> Result<Value, LibraryError> {
    arity("NOT", args, 1)?;
    let v = vector("NOT", args, 0)?;
    Ok(Value::Vector(!v))
}

fn vec_add_int(args: &[Value]) -> Result<Value, LibraryError> {
    arity("+", args, 2)?;
    let v = vector("+", args, 0)?;
    let n = integer("+", args, 1)?;
    Ok(Value::Vector(v.add_int(n)))
}

fn int2(
    func: &'static str,
    args: &[Value],
    op: impl Fn(i64, i64) -> i64,
) -> Result<Value, LibraryError> {
    arity(func, args, 2)?;
    Ok(Value::Integer(op(integer(func, args, 0)?, integer(func, args, 1)?)))
}

fn int_cmp(
    func: &'static str,
    args: &[Value],
    op: impl Fn(i64, i64) -> bool,
) -> Result<Value, LibraryError> {
    arity(func, args, 2)?;
    Ok(Value::Boolean(op(integer(func, args, 0)?, integer(func, args, 1)?)))
}

fn bool2(
    func: &'static str,
    args: &[Value],
    op: impl Fn(bool, bool) -> bool,
) -> Result<Value, LibraryError> {
    arity(func, args, 2)?;
    Ok(Value::Boolean(op(boolean(func, args, 0)?, boolean(func, args, 1)?)))
}
