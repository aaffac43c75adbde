use std::cell::RefCell;
use std::io::{self, Cursor, Write};
use std::rc::Rc;

use byteorder::LittleEndian;

use crate::forth::vm::vocables;
use crate::forth::vm::{Options, Vm, VmError};

/// The stock startup script, compiled in so tests do not depend on the
/// working directory.
pub const STARTUP: &str = include_str!("../../../startup.f");

struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn make_vm(stdin: &str) -> Result<(Vm<u64, LittleEndian>, Rc<RefCell<Vec<u8>>>), VmError> {
    let output = Rc::new(RefCell::new(Vec::new()));
    let vm = Vm::new(Options {
        arena_size: 64 * 1024,
        stack_size: 16 * 1024,
        rstack_size: 16 * 1024,
        stdin: Box::new(Cursor::new(stdin.as_bytes().to_vec())),
        stdout: Box::new(SharedBuffer(output.clone())),
        layout: vec![
            vocables::prim::load,
            vocables::compiler::load,
            vocables::io::load,
            vocables::tools::load,
        ],
    })?;
    Ok((vm, output))
}

fn bootstrap(vm: &mut Vm<u64, LittleEndian>) -> Result<(), VmError> {
    let script = vm.intern_stream(Box::new(Cursor::new(STARTUP.as_bytes().to_vec())));
    vm.set_input(script)?;
    vm.repl()
}

/// A VM that has run the startup script; its stdin is empty, so further
/// input goes through `feed`.
pub fn bootstrapped_vm() -> Vm<u64, LittleEndian> {
    let (mut vm, _) = make_vm("").unwrap();
    bootstrap(&mut vm).unwrap();
    vm
}

/// Interpret a source fragment on an existing VM to exhaustion.
pub fn feed(vm: &mut Vm<u64, LittleEndian>, source: &str) -> Result<(), VmError> {
    let handle = vm.intern_stream(Box::new(Cursor::new(source.as_bytes().to_vec())));
    vm.set_input(handle)?;
    vm.repl()
}

/// Run `code` the way the binary would: the startup script executes
/// first and hands the input over to `code` standing in for stdin.
/// Returns the final parameter stack, bottom to top.
pub fn run_test(code: &str) -> Result<Vec<u64>, VmError> {
    run_io_test(code).map(|(stack, _)| stack)
}

/// Like `run_test`, but also returns everything the program wrote via
/// `emit`/`tell`/`.s`/`.w`.
pub fn run_io_test(code: &str) -> Result<(Vec<u64>, String), VmError> {
    let (mut vm, output) = make_vm(code)?;
    bootstrap(&mut vm)?;
    let text = String::from_utf8_lossy(&output.borrow()).into_owned();
    Ok((vm.stack_contents(), text))
}
