//! Loader for flat design files.
//!
//! A design file declares signals and constants, then one block per process
//! holding its variables and raw instruction records:
//!
//! ```text
//! DESIGN toggle
//! SIGNAL clk : STD_LOGIC = 0
//! SIGNAL q : STD_LOGIC = 0
//! PROCESS flip
//! 0 PUSH OBJECT SIGNAL clk : STD_LOGIC
//! ...
//! END_CODE
//! END_PROCESS
//! END_DESIGN
//! ```
//!
//! Lines starting with `--` are comments. Records are kept verbatim and
//! handed to the compiler, which reports problems by process and address.

use std::collections::HashSet;
use std::path::Path;
use std::rc::Rc;

use hdlvm_common::{ObjectSpec, TypeSpec, Value};
use hdlvm_ir::{
    compile_with, CompileOptions, CompiledProcess, Library, ProcessSource, SignalId, SymbolTable,
};
use tracing::debug;

use crate::error::SimError;
use crate::kernel::SimKernel;
use crate::vm::VmProcess;
use crate::SimConfig;

/// A declared signal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignalDecl {
    /// Signal name.
    pub name: String,
    /// Declared type.
    pub ty: TypeSpec,
    /// Initial value.
    pub init: Value,
}

/// A parsed design.
#[derive(Clone, Debug, Default)]
pub struct Design {
    /// Name from the `DESIGN` line.
    pub name: String,
    /// Signals in declaration order.
    pub signals: Vec<SignalDecl>,
    /// Named constants.
    pub constants: Vec<(String, Value)>,
    /// Uncompiled processes in declaration order.
    pub processes: Vec<ProcessSource>,
}

impl Design {
    /// Name table with signal ids in declaration order.
    pub fn symbols(&self) -> SymbolTable {
        let mut table = SymbolTable::new();
        for (i, decl) in self.signals.iter().enumerate() {
            table.add_signal(decl.name.clone(), SignalId::from_raw(i as u32), decl.ty);
        }
        for (name, value) in &self.constants {
            table.add_constant(name.clone(), value.clone());
        }
        table
    }

    /// Compiles every process against [`symbols`](Self::symbols).
    pub fn compile(
        &self,
        library: &Library,
        options: CompileOptions,
    ) -> Result<Vec<CompiledProcess>, SimError> {
        let symbols = self.symbols();
        self.processes
            .iter()
            .map(|p| compile_with(p, &symbols, library, options).map_err(SimError::from))
            .collect()
    }

    /// Builds a ready-to-run kernel: signals, compiled processes and the
    /// configured stop time.
    pub fn build_kernel(&self, library: &Rc<Library>, config: &SimConfig) -> Result<SimKernel, SimError> {
        let mut kernel = SimKernel::new();
        kernel.set_max_delta(config.max_deltas);

        let mut symbols = SymbolTable::new();
        for decl in &self.signals {
            let id = kernel.add_signal(decl.name.clone(), decl.ty, decl.init.clone())?;
            symbols.add_signal(decl.name.clone(), id, decl.ty);
        }
        for (name, value) in &self.constants {
            symbols.add_constant(name.clone(), value.clone());
        }

        let options = CompileOptions {
            fold_rising_edges: config.fold_rising_edges,
        };
        for source in &self.processes {
            let program = compile_with(source, &symbols, library, options)?;
            kernel.add_process(Box::new(VmProcess::new(
                program,
                Rc::clone(library),
                config.max_steps,
            )));
        }
        if let Some(stop) = config.stop_time {
            kernel.schedule_stop(stop);
        }
        debug!(
            design = %self.name,
            signals = self.signals.len(),
            processes = self.processes.len(),
            "design loaded into kernel"
        );
        Ok(kernel)
    }
}

/// Reads and parses a design file.
pub fn load_design_file(path: &Path) -> Result<Design, SimError> {
    let text = std::fs::read_to_string(path)?;
    load_design(&text)
}

enum Section {
    Start,
    Top,
    Process,
    Code,
    AfterCode,
    Done,
}

/// Parses design text.
pub fn load_design(text: &str) -> Result<Design, SimError> {
    let mut design = Design::default();
    let mut section = Section::Start;
    let mut names = HashSet::new();
    let mut last_line = 0;

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        last_line = line_no;
        let line = raw.trim();
        if line.is_empty() || line.starts_with("--") {
            continue;
        }
        let err = |reason: String| SimError::Design {
            line: line_no,
            reason,
        };
        let tokens: Vec<&str> = line.split_whitespace().collect();

        match section {
            Section::Start => match tokens.as_slice() {
                ["DESIGN", name] => {
                    design.name = (*name).to_string();
                    section = Section::Top;
                }
                _ => return Err(err("expected 'DESIGN <name>'".into())),
            },
            Section::Top => match tokens.as_slice() {
                ["SIGNAL", name, ":", spec @ ..] => {
                    let spec = TypeSpec::parse(spec).map_err(|e| err(e.to_string()))?;
                    let init = initial_value(&spec).map_err(err)?;
                    if !names.insert((*name).to_string()) {
                        return Err(err(format!("'{name}' declared twice")));
                    }
                    design.signals.push(SignalDecl {
                        name: (*name).to_string(),
                        ty: spec.ty,
                        init,
                    });
                }
                ["CONSTANT", name, ":", spec @ ..] => {
                    let spec = TypeSpec::parse(spec).map_err(|e| err(e.to_string()))?;
                    if spec.init.is_none() {
                        return Err(err(format!("constant '{name}' needs a value")));
                    }
                    let value = initial_value(&spec).map_err(err)?;
                    if !names.insert((*name).to_string()) {
                        return Err(err(format!("'{name}' declared twice")));
                    }
                    design.constants.push(((*name).to_string(), value));
                }
                ["PROCESS", name] => {
                    design.processes.push(ProcessSource {
                        name: (*name).to_string(),
                        variables: Vec::new(),
                        text: String::new(),
                    });
                    section = Section::Process;
                }
                ["END_DESIGN"] => section = Section::Done,
                _ => return Err(err(format!("unexpected line '{line}'"))),
            },
            Section::Process => {
                let Some(process) = design.processes.last_mut() else {
                    return Err(err("no open process".into()));
                };
                match tokens.as_slice() {
                    ["VARIABLE", name, ":", spec @ ..] => {
                        let spec = TypeSpec::parse(spec).map_err(|e| err(e.to_string()))?;
                        process.variables.push(((*name).to_string(), spec));
                    }
                    ["END_CODE"] => section = Section::AfterCode,
                    [first, ..] if first.chars().all(|c| c.is_ascii_digit()) => {
                        process.text.push_str(line);
                        process.text.push('\n');
                        section = Section::Code;
                    }
                    _ => return Err(err(format!("unexpected line in process: '{line}'"))),
                }
            }
            Section::Code => {
                let Some(process) = design.processes.last_mut() else {
                    return Err(err("no open process".into()));
                };
                if line == "END_CODE" {
                    section = Section::AfterCode;
                } else {
                    process.text.push_str(line);
                    process.text.push('\n');
                }
            }
            Section::AfterCode => match tokens.as_slice() {
                ["END_PROCESS"] => section = Section::Top,
                _ => return Err(err("expected END_PROCESS".into())),
            },
            Section::Done => break,
        }
    }

    match section {
        Section::Done => Ok(design),
        Section::Start => Err(SimError::Design {
            line: last_line.max(1),
            reason: "empty design".into(),
        }),
        _ => Err(SimError::Design {
            line: last_line,
            reason: "missing END_DESIGN".into(),
        }),
    }
}

fn initial_value(spec: &ObjectSpec) -> Result<Value, String> {
    match &spec.init {
        Some(text) => spec.ty.value_from_literal(text).map_err(|e| e.to_string()),
        None => Ok(spec.ty.default_value()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdlvm_common::{Direction, Logic};
    use std::io::Write;

    const SMALL: &str = "\
-- two signals, one process
DESIGN small
SIGNAL clk : STD_LOGIC = 0
SIGNAL bus : ARRAY 3 DOWNTO 0 OF STD_LOGIC
CONSTANT K : ARRAY 3 DOWNTO 0 OF STD_LOGIC = \"1010\"
PROCESS drive
VARIABLE n : INTEGER = 2
0 PUSH OBJECT SIGNAL bus : ARRAY 3 DOWNTO 0 OF STD_LOGIC
1 PUSH OBJECT CONSTANT K : ARRAY 3 DOWNTO 0 OF STD_LOGIC
2 POP F F F
3 WAIT
END_CODE
END_PROCESS
END_DESIGN
";

    #[test]
    fn parses_declarations_and_processes() {
        let design = load_design(SMALL).unwrap();
        assert_eq!(design.name, "small");
        assert_eq!(design.signals.len(), 2);
        assert_eq!(design.signals[0].init, Value::Logic(Logic::Zero));
        assert_eq!(
            design.signals[1].ty,
            TypeSpec::Array {
                left: 3,
                direction: Direction::Downto,
                right: 0
            }
        );
        assert_eq!(design.signals[1].init.to_string(), "UUUU");
        assert_eq!(design.constants[0].1.to_string(), "1010");
        let process = &design.processes[0];
        assert_eq!(process.name, "drive");
        assert_eq!(process.variables[0].0, "n");
        assert_eq!(process.text.lines().count(), 4);
    }

    #[test]
    fn builds_and_runs() {
        let design = load_design(SMALL).unwrap();
        let config = SimConfig {
            stop_time: Some(1_000),
            ..SimConfig::default()
        };
        let mut kernel = design.build_kernel(&Rc::new(Library::ieee()), &config).unwrap();
        kernel.run().unwrap();
        let bus = kernel.find_signal("bus").unwrap();
        assert_eq!(kernel.current_value(bus).unwrap().to_string(), "1010");
    }

    #[test]
    fn compile_lists_every_process() {
        let design = load_design(SMALL).unwrap();
        let programs = design
            .compile(&Library::ieee(), CompileOptions::default())
            .unwrap();
        assert_eq!(programs.len(), 1);
        assert_eq!(programs[0].variables[0].init, Value::Integer(2));
    }

    #[test]
    fn errors_carry_line_numbers() {
        let err = load_design("DESIGN d\nSIGNAL a : REAL\nEND_DESIGN").unwrap_err();
        assert!(matches!(err, SimError::Design { line: 2, .. }), "{err}");

        let err = load_design("DESIGN d\nSIGNAL a : STD_LOGIC\nSIGNAL a : STD_LOGIC\nEND_DESIGN")
            .unwrap_err();
        assert!(matches!(err, SimError::Design { line: 3, .. }), "{err}");

        let err = load_design("DESIGN d\nPROCESS p\n0 WAIT\nEND_CODE\nEND_DESIGN").unwrap_err();
        assert!(matches!(err, SimError::Design { line: 5, .. }), "{err}");

        let err = load_design("DESIGN d\nCONSTANT K : INTEGER\nEND_DESIGN").unwrap_err();
        assert!(matches!(err, SimError::Design { line: 2, .. }), "{err}");
    }

    #[test]
    fn missing_end_is_reported() {
        let err = load_design("DESIGN d\nSIGNAL a : STD_LOGIC").unwrap_err();
        assert!(matches!(err, SimError::Design { line: 2, .. }), "{err}");
        assert!(load_design("").is_err());
    }

    #[test]
    fn compile_errors_surface_from_build() {
        let design = load_design("DESIGN d\nPROCESS p\n0 FROB\nEND_CODE\nEND_PROCESS\nEND_DESIGN").unwrap();
        let err = design
            .build_kernel(&Rc::new(Library::ieee()), &SimConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, SimError::Compile(_)), "{err}");
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SMALL.as_bytes()).unwrap();
        let design = load_design_file(file.path()).unwrap();
        assert_eq!(design.processes.len(), 1);

        let missing = load_design_file(Path::new("/nonexistent/design.hdl"));
        assert!(matches!(missing, Err(SimError::Io(_))));
    }
}
