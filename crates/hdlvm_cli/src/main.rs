//! hdlvm CLI: runs and inspects compiled-process HDL designs.
//!
//! Provides `hdlvm run` to simulate a design file to its stop time and
//! `hdlvm check` to compile every process and print the optimized listing.

#![warn(missing_docs)]

mod check;
mod run;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use hdlvm_config::LogLevel;
use tracing_subscriber::{fmt, EnvFilter};

/// hdlvm, a delta-cycle HDL simulator.
#[derive(Parser, Debug)]
#[command(name = "hdlvm", version, about = "Delta-cycle HDL simulator")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Simulate a design to its stop time.
    Run(RunArgs),
    /// Compile every process of a design and print the listings.
    Check(CheckArgs),
}

/// Arguments for the `hdlvm run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Design file path.
    pub design: PathBuf,

    /// Path to an `hdlvm.toml` (default: next to the design, if present).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Stop time (e.g., "100ns", "1 us"), overriding `sim.stop_time`.
    #[arg(long)]
    pub stop: Option<String>,

    /// Print every signal change as `<time> <signal> <value>`.
    #[arg(long)]
    pub trace: bool,

    /// Trace only this signal; may be repeated. Implies `--trace`.
    #[arg(long = "watch", value_name = "SIGNAL")]
    pub watch: Vec<String>,
}

/// Arguments for the `hdlvm check` subcommand.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Design file path.
    pub design: PathBuf,

    /// Print the listing without folding clock-edge tests.
    #[arg(long)]
    pub no_fold: bool,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
}

impl GlobalArgs {
    /// The log filter used when `RUST_LOG` is unset.
    fn default_filter(&self, configured: LogLevel) -> &'static str {
        if self.quiet {
            LogLevel::Error.as_str()
        } else if self.verbose {
            configured.max(LogLevel::Debug).as_str()
        } else {
            configured.as_str()
        }
    }
}

/// Installs the tracing subscriber. `RUST_LOG` overrides the default filter.
fn init_logging(global: &GlobalArgs, configured: LogLevel) {
    let default = global.default_filter(configured);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
    };

    let result = match cli.command {
        Command::Run(ref args) => match run::load_run_config(args) {
            Ok(config) => {
                init_logging(&global, config.log.level);
                run::run(args, &config, &global)
            }
            Err(e) => Err(e.into()),
        },
        Command::Check(ref args) => {
            init_logging(&global, LogLevel::default());
            check::run(args, &global)
        }
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run_default() {
        let cli = Cli::parse_from(["hdlvm", "run", "top.hdl"]);
        match cli.command {
            Command::Run(ref args) => {
                assert_eq!(args.design, PathBuf::from("top.hdl"));
                assert!(args.config.is_none());
                assert!(args.stop.is_none());
                assert!(!args.trace);
                assert!(args.watch.is_empty());
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn parse_run_with_args() {
        let cli = Cli::parse_from([
            "hdlvm",
            "run",
            "top.hdl",
            "--config",
            "bench.toml",
            "--stop",
            "250ns",
            "--trace",
        ]);
        match cli.command {
            Command::Run(ref args) => {
                assert_eq!(args.config, Some(PathBuf::from("bench.toml")));
                assert_eq!(args.stop.as_deref(), Some("250ns"));
                assert!(args.trace);
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn parse_repeated_watch() {
        let cli = Cli::parse_from(["hdlvm", "run", "top.hdl", "--watch", "q", "--watch", "clk"]);
        match cli.command {
            Command::Run(ref args) => assert_eq!(args.watch, vec!["q", "clk"]),
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn parse_check() {
        let cli = Cli::parse_from(["hdlvm", "check", "top.hdl", "--no-fold"]);
        match cli.command {
            Command::Check(ref args) => {
                assert_eq!(args.design, PathBuf::from("top.hdl"));
                assert!(args.no_fold);
            }
            _ => panic!("expected Check command"),
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["hdlvm", "check", "top.hdl", "-q"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
        let cli = Cli::parse_from(["hdlvm", "-v", "run", "top.hdl"]);
        assert!(cli.verbose);
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        assert!(Cli::try_parse_from(["hdlvm", "-q", "-v", "check", "top.hdl"]).is_err());
    }

    #[test]
    fn missing_subcommand_errors() {
        assert!(Cli::try_parse_from(["hdlvm"]).is_err());
    }

    #[test]
    fn default_filter_follows_flags() {
        let plain = GlobalArgs {
            quiet: false,
            verbose: false,
        };
        assert_eq!(plain.default_filter(LogLevel::Warn), "warn");
        let verbose = GlobalArgs {
            quiet: false,
            verbose: true,
        };
        assert_eq!(verbose.default_filter(LogLevel::Info), "debug");
        assert_eq!(verbose.default_filter(LogLevel::Trace), "trace");
        let quiet = GlobalArgs {
            quiet: true,
            verbose: false,
        };
        assert_eq!(quiet.default_filter(LogLevel::Trace), "error");
    }
}
