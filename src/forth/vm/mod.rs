use std::io::{self, Read, Write};

use byteorder::ByteOrder;
use log::trace;
use thiserror::Error;

pub mod arena;
pub mod cell;
pub mod dict;
pub mod input;
pub mod stack;
pub mod test_util;
pub mod vocables;

pub use self::cell::Cell;

use self::arena::Arena;
use self::input::{InputStream, Interns};
use self::stack::Stack;
use self::vocables::Vocabulary;

#[derive(Debug, Error)]
pub enum VmError {
    #[error("stack underflow")]
    StackUnderflow,
    #[error("stack overflow")]
    StackOverflow,
    #[error("unknown word: {0}")]
    UnknownWord(String),
    #[error("address {0:#x} out of range")]
    BadAddress(usize),
    #[error("not a valid codeword: {0}")]
    BadCodeword(usize),
    #[error("dictionary space exhausted")]
    DictionaryFull,
    #[error("division by zero")]
    DivisionByZero,
    #[error("{0} is not a character")]
    NotAChar(i64),
    #[error("inline operand read outside a definition")]
    OperandOutsideBody,
    #[error(": inside a definition")]
    NestedDefinition,
    #[error("; outside a definition")]
    NotCompiling,
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("unknown stream handle {0}")]
    UnknownStream(usize),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    Normal,
    Compile,
}

/// A primitive's host implementation. The codeword cell of a primitive
/// entry holds `1 +` its index in the VM's function table; codeword 0 is
/// docol, the colon-word interpreter.
pub type Primitive<C, B> = fn(&mut Vm<C, B>) -> Result<(), VmError>;

pub type VocabularyLoader<C, B> = fn() -> Vocabulary<C, B>;

pub struct Options<C: Cell, B: ByteOrder> {
    pub arena_size: usize,
    pub stack_size: usize,
    pub rstack_size: usize,
    pub stdin: Box<dyn Read>,
    pub stdout: Box<dyn Write>,
    pub layout: Vec<VocabularyLoader<C, B>>,
}

pub struct Vm<C: Cell, B: ByteOrder> {
    pub(crate) arena: Arena<C, B>,
    pub(crate) stack: Stack<C>,
    pub(crate) rstack: Stack<C>,
    pub(crate) state: State,
    /// Address of the codeword being executed.
    pub(crate) current: C,
    /// Address of the next body cell to execute; 0 at top level.
    pub(crate) next: C,
    /// Handle of the stream tokens are read from.
    pub(crate) input: C,
    pub(crate) streams: Interns<C, InputStream>,
    pub(crate) stdout: Box<dyn Write>,
    primitives: Vec<Primitive<C, B>>,
}

impl<C: Cell, B: ByteOrder> Vm<C, B> {
    pub fn new(options: Options<C, B>) -> Result<Self, VmError> {
        let mut arena = Arena::new(options.arena_size);
        dict::set_here(&mut arena, C::from_uint(arena::DICT_START))?;
        dict::set_latest(&mut arena, C::zero())?;
        let mut streams = Interns::new(0u8);
        streams.add(options.stdin);
        let mut vm = Vm {
            arena,
            stack: Stack::new(options.stack_size),
            rstack: Stack::new(options.rstack_size),
            state: State::Normal,
            current: C::zero(),
            next: C::zero(),
            input: C::zero(),
            streams,
            stdout: options.stdout,
            primitives: Vec::new(),
        };
        for load in options.layout {
            vm.install(load())?;
        }
        Ok(vm)
    }

    fn install(&mut self, vocabulary: Vocabulary<C, B>) -> Result<(), VmError> {
        for (name, flags, run) in vocabulary.into_iter() {
            self.primitives.push(run);
            let code = C::from_uint(self.primitives.len());
            dict::create(&mut self.arena, name.as_bytes(), flags, code)?;
        }
        Ok(())
    }

    /// The execution token (codeword address) of a named word.
    pub fn word_xt(&self, name: &str) -> Result<C, VmError> {
        let entry = dict::find(&self.arena, name.as_bytes())?
            .ok_or_else(|| VmError::UnknownWord(name.into()))?;
        dict::code_field_address(&self.arena, entry)
    }

    /// Append a colon definition whose body is the given word sequence,
    /// terminated with `exit`.
    pub fn push_colon_from_list(
        &mut self,
        name: &str,
        flags: u8,
        words: &[&str],
    ) -> Result<C, VmError> {
        let entry = dict::create(&mut self.arena, name.as_bytes(), flags, C::zero())?;
        for word in words {
            let xt = self.word_xt(word)?;
            dict::append_cell(&mut self.arena, xt)?;
        }
        let exit = self.word_xt("exit")?;
        dict::append_cell(&mut self.arena, exit)?;
        Ok(entry)
    }

    /// Append a colon definition from raw body cells (xts and inline
    /// operands alike), terminated with `exit`.
    pub fn push_colon_raw(&mut self, name: &str, flags: u8, cells: &[C]) -> Result<C, VmError> {
        let entry = dict::create(&mut self.arena, name.as_bytes(), flags, C::zero())?;
        for &cell in cells {
            dict::append_cell(&mut self.arena, cell)?;
        }
        let exit = self.word_xt("exit")?;
        dict::append_cell(&mut self.arena, exit)?;
        Ok(entry)
    }

    /// The inner interpreter: run the word whose codeword lives at `xt`
    /// until control returns to the top level.
    pub fn execute(&mut self, xt: C) -> Result<(), VmError> {
        trace!("execute xt {:#x}", xt.to_uint());
        self.current = xt;
        self.next = C::zero();
        loop {
            let code = self.arena.cell_get(self.current)?;
            self.dispatch(code)?;
            if self.next.is_zero() {
                return Ok(());
            }
            self.current = self.arena.cell_get(self.next)?;
            self.next = self.next + C::size();
        }
    }

    /// Execute a word by name.
    pub fn run(&mut self, name: &str) -> Result<(), VmError> {
        let xt = self.word_xt(name)?;
        self.execute(xt)
    }

    fn dispatch(&mut self, code: C) -> Result<(), VmError> {
        if code.is_zero() {
            return self.do_colon();
        }
        let id = code.to_uint() - 1;
        let run = *self
            .primitives
            .get(id)
            .ok_or_else(|| VmError::BadCodeword(code.to_uint()))?;
        run(self)
    }

    /// Codeword of every colon definition: save `next` (the 0 sentinel
    /// included) and continue with the first body cell. The interpreter
    /// loop itself performs the advance to that cell.
    fn do_colon(&mut self) -> Result<(), VmError> {
        let next = self.next;
        self.rstack_push(next)?;
        self.next = self.current + C::size();
        Ok(())
    }

    /// Fetch the inline operand cell at `next` (for `lit`, `branch`,
    /// `0branch` and `'`) and step past it.
    pub(crate) fn operand(&mut self) -> Result<C, VmError> {
        if self.next.is_zero() {
            return Err(VmError::OperandOutsideBody);
        }
        let value = self.arena.cell_get(self.next)?;
        self.next = self.next + C::size();
        Ok(value)
    }

    /// Add a signed cell count to `next`. The offset is relative to the
    /// position just past the operand cell, so 0 is a no-op.
    pub(crate) fn branch_by(&mut self, offset: i64) {
        let delta = offset.wrapping_mul(C::size().to_int());
        self.next = C::from_int(self.next.to_int().wrapping_add(delta));
    }

    pub fn stack_push(&mut self, value: C) -> Result<(), VmError> {
        self.stack.push(value)
    }

    pub fn stack_pop(&mut self) -> Result<C, VmError> {
        self.stack.pop()
    }

    pub fn stack_rget(&self, offset: usize) -> Result<C, VmError> {
        self.stack.get(offset)
    }

    pub fn rstack_push(&mut self, value: C) -> Result<(), VmError> {
        self.rstack.push(value)
    }

    pub fn rstack_pop(&mut self) -> Result<C, VmError> {
        self.rstack.pop()
    }

    /// Bottom-to-top copy of the parameter stack.
    pub fn stack_contents(&self) -> Vec<C> {
        self.stack.contents().to_vec()
    }

    pub fn intern_stream(&mut self, stream: InputStream) -> C {
        self.streams.add(stream)
    }

    pub fn set_input(&mut self, handle: C) -> Result<(), VmError> {
        if !self.streams.contains(handle) {
            return Err(VmError::UnknownStream(handle.to_uint()));
        }
        self.input = handle;
        Ok(())
    }

    /// True once the current input stream is the VM's standard input.
    pub fn is_interactive(&self) -> bool {
        self.input.is_zero()
    }

    /// Drop whatever a failed line left behind: clear both stacks and
    /// fall back to normal state. The dictionary keeps anything already
    /// compiled.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.rstack.clear();
        self.state = State::Normal;
        self.next = C::zero();
    }

    pub(crate) fn getc(&mut self) -> Result<Option<u8>, VmError> {
        let handle = self.input;
        let stream = self
            .streams
            .get_mut(handle)
            .ok_or_else(|| VmError::UnknownStream(handle.to_uint()))?;
        Ok(input::read_byte(stream.as_mut())?)
    }

    fn skip_line(&mut self) -> Result<(), VmError> {
        loop {
            match self.getc()? {
                None | Some(b'\n') => return Ok(()),
                Some(_) => {}
            }
        }
    }

    /// The tokenizer. Skips whitespace and `#`-to-newline comments,
    /// copies up to 63 token bytes into the arena word buffer and
    /// NUL-terminates it. Returns the buffer address, or `None` when the
    /// stream ends before any token byte. A `#` inside a token ends the
    /// token and eats the rest of the line; token bytes past 63 are
    /// consumed and dropped.
    pub(crate) fn read_word(&mut self) -> Result<Option<C>, VmError> {
        let mut c;
        loop {
            c = match self.getc()? {
                None => return Ok(None),
                Some(c) => c,
            };
            if c == b'#' {
                self.skip_line()?;
                continue;
            }
            if !c.is_ascii_whitespace() {
                break;
            }
        }
        let mut len = 0;
        loop {
            if len < arena::WORD_BUFFER_SIZE - 1 {
                self.arena
                    .byte_set(C::from_uint(arena::WORD_BUFFER + len), c)?;
                len += 1;
            }
            c = match self.getc()? {
                None => break,
                Some(c) => c,
            };
            if c.is_ascii_whitespace() {
                break;
            }
            if c == b'#' {
                self.skip_line()?;
                break;
            }
        }
        self.arena
            .byte_set(C::from_uint(arena::WORD_BUFFER + len), 0)?;
        Ok(Some(C::from_uint(arena::WORD_BUFFER)))
    }

    /// The outer interpreter: number or word, executed or compiled
    /// depending on the state and the word's immediate flag.
    fn interpret(&mut self, word_address: C) -> Result<(), VmError> {
        let name = self.arena.cstr(word_address)?.to_vec();
        if let Some(n) = parse_number(&name) {
            let value = C::from_int(n);
            match self.state {
                State::Normal => self.stack.push(value)?,
                State::Compile => {
                    let lit = self.word_xt("lit")?;
                    dict::append_cell(&mut self.arena, lit)?;
                    dict::append_cell(&mut self.arena, value)?;
                }
            }
            return Ok(());
        }
        let entry = dict::find(&self.arena, &name)?.ok_or_else(|| {
            VmError::UnknownWord(String::from_utf8_lossy(&name).into_owned())
        })?;
        let xt = dict::code_field_address(&self.arena, entry)?;
        match self.state {
            State::Normal => self.execute(xt),
            State::Compile => {
                if dict::entry_flags(&self.arena, entry)? & dict::IMMEDIATE_FLAG != 0 {
                    self.execute(xt)
                } else {
                    dict::append_cell(&mut self.arena, xt)
                }
            }
        }
    }

    /// Read and interpret tokens from the current input stream until it
    /// runs dry. The stream may be switched mid-run by
    /// `set-input-stream`; the loop simply keeps reading from whichever
    /// stream is current.
    pub fn repl(&mut self) -> Result<(), VmError> {
        while let Some(address) = self.read_word()? {
            self.interpret(address)?;
        }
        Ok(())
    }
}

/// Decimal integer syntax: optional leading `-`, then digits. Overflow
/// wraps silently.
fn parse_number(token: &[u8]) -> Option<i64> {
    let (negative, digits) = match token.split_first() {
        Some((b'-', rest)) => (true, rest),
        _ => (false, token),
    };
    if digits.is_empty() {
        return None;
    }
    let mut value: i64 = 0;
    for &c in digits {
        if !c.is_ascii_digit() {
            return None;
        }
        value = value.wrapping_mul(10).wrapping_add(i64::from(c - b'0'));
    }
    Some(if negative { value.wrapping_neg() } else { value })
}
