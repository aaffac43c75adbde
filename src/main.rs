use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use byteorder::LittleEndian;
use log::{debug, error};
use structopt::StructOpt;

use bootforth::forth::vm::{vocables, Options, Vm};

#[derive(StructOpt, Debug)]
#[structopt(name = "bootforth", about = "A self-hosting threaded-code Forth")]
struct Bootforth {
    /// Startup script run before input switches to stdin
    #[structopt(
        short = "s",
        long = "startup",
        parse(from_os_str),
        default_value = "startup.f"
    )]
    startup: PathBuf,
}

fn make_standard_vm() -> Result<Vm<u64, LittleEndian>> {
    Ok(Vm::<u64, LittleEndian>::new(Options {
        arena_size: 64 * 1024,
        stack_size: 16 * 1024,
        rstack_size: 16 * 1024,
        stdin: Box::new(io::stdin()),
        stdout: Box::new(io::stdout()),
        layout: vec![
            vocables::prim::load,
            vocables::compiler::load,
            vocables::io::load,
            vocables::tools::load,
        ],
    })?)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Bootforth::from_args();

    let mut vm = make_standard_vm()?;
    let script = File::open(&args.startup)
        .with_context(|| format!("while opening {}", args.startup.display()))?;
    debug!("bootstrapping from {}", args.startup.display());
    let handle = vm.intern_stream(Box::new(BufReader::new(script)));
    vm.set_input(handle)?;

    // The startup script is expected to switch the input stream over to
    // stdin; errors before that point are fatal, errors typed at the
    // terminal are reported and the line's leftovers dropped.
    loop {
        match vm.repl() {
            Ok(()) => return Ok(()),
            Err(e) if vm.is_interactive() => {
                error!("{}", e);
                vm.reset();
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("while running the startup script {}", args.startup.display())
                })
            }
        }
    }
}
