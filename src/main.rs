use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use miette::Report;

use braid::term::{self, TerminalConsole};
use braid::{RunError, Vm};

/// Braid is a small & faithful virtual machine for the LC3 architecture.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a `.obj` image to run
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a binary `.obj` image with its console wired to the terminal
    Run {
        /// `.obj` image to run
        name: PathBuf,
        /// Boot image to load first (populates the trap vector table)
        #[arg(short, long)]
        os: Option<PathBuf>,
    },
}

const EXIT_INPUT_INVALID: u8 = 2;
const EXIT_OPCODE_INVALID: u8 = 3;

fn main() -> ExitCode {
    let args = Args::parse();

    let (name, os) = match args.command {
        Some(Command::Run { name, os }) => (name, os),
        None => match args.path {
            Some(path) => (path, None),
            None => {
                println!("\n~ braid v{VERSION} ~");
                println!("{}", LOGO.truecolor(183, 201, 255).bold());
                println!("{SHORT_INFO}");
                return ExitCode::SUCCESS;
            }
        },
    };

    match run(&name, os.as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{:?}", err);
            if err.downcast_ref::<RunError>().is_some() {
                ExitCode::from(EXIT_OPCODE_INVALID)
            } else {
                ExitCode::from(EXIT_INPUT_INVALID)
            }
        }
    }
}

fn run(name: &Path, os: Option<&Path>) -> Result<(), Report> {
    let mut vm = Vm::new(TerminalConsole::new());
    if let Some(os) = os {
        vm.load_file(os)?;
    }
    vm.load_file(name)?;

    // The machine expects unbuffered, unechoed input. Hand it the terminal
    // in raw mode and restore on the way out; TerminalConsole restores it
    // itself if the user interrupts a read.
    let raw = vm.console().wants_raw_mode();
    if raw {
        term::enable_raw_mode();
    }
    let result = vm.run();
    if raw {
        term::disable_raw_mode();
    }
    result?;
    Ok(())
}

const LOGO: &str = r#"
 _                _     _
| |__  _ __ __ _ (_) __| |
| '_ \| '__/ _` || |/ _` |
| |_) | | | (_| || | (_| |
|_.__/|_|  \__,_||_|\__,_|"#;

const SHORT_INFO: &str = r"
Welcome to braid, a virtual machine for binaries targeting the LC3 architecture.
Please use `-h` or `--help` to access the usage instructions and documentation.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
