//! `hdlvm check`: compile every process and print the optimized listing.

use std::error::Error;

use hdlvm_ir::{CompileOptions, Library};
use hdlvm_sim::{load_design_file, Design, SimError};

use crate::{CheckArgs, GlobalArgs};

/// Runs the `hdlvm check` command.
pub fn run(args: &CheckArgs, global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let design = load_design_file(&args.design)?;
    let options = CompileOptions {
        fold_rising_edges: !args.no_fold,
    };
    print!("{}", listing(&design, options)?);
    if !global.quiet {
        eprintln!(
            "    Checked {}: {} signals, {} processes",
            design.name,
            design.signals.len(),
            design.processes.len()
        );
    }
    Ok(0)
}

/// Renders the declarations and every compiled process.
fn listing(design: &Design, options: CompileOptions) -> Result<String, SimError> {
    let library = Library::ieee();
    let programs = design.compile(&library, options)?;
    let mut text = format!("design {}\n", design.name);
    for signal in &design.signals {
        text.push_str(&format!("  signal {} : {} = {}\n", signal.name, signal.ty, signal.init));
    }
    for program in &programs {
        text.push_str(&program.to_string());
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdlvm_sim::load_design;

    const ONE_SHOT: &str = r#"
DESIGN one_shot
SIGNAL q : STD_LOGIC = 0
PROCESS set
0 PUSH OBJECT SIGNAL q : STD_LOGIC
1 PUSH STATIC VALUE 1
2 POP F F F
3 WAIT
END_CODE
END_PROCESS
END_DESIGN
"#;

    #[test]
    fn listing_names_design_and_process() {
        let design = load_design(ONE_SHOT).unwrap();
        let text = listing(&design, CompileOptions::default()).unwrap();
        assert!(text.starts_with("design one_shot\n"));
        assert!(text.contains("signal q : STD_LOGIC = 0"));
        assert!(text.contains("process set"));
    }

    #[test]
    fn unknown_signal_fails_to_compile() {
        let text = ONE_SHOT.replace("SIGNAL q : STD_LOGIC\n1", "SIGNAL r : STD_LOGIC\n1");
        let design = load_design(&text).unwrap();
        assert!(matches!(
            listing(&design, CompileOptions::default()),
            Err(SimError::Compile(_))
        ));
    }
}
