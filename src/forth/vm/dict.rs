use byteorder::ByteOrder;

use crate::forth::vm::arena::{self, Arena};
use crate::forth::vm::{Cell, VmError};

pub const IMMEDIATE_FLAG: u8 = 0x01;

/// Dictionary entries live in the arena, in definition order:
///
/// - link cell: address of the previous entry, 0 for the first
/// - flag byte: bit 0 is the immediate flag
/// - name: NUL-terminated bytes, zero-padded to the next cell boundary
/// - codeword cell: 0 for colon words (docol), a primitive id otherwise
/// - body (colon words only): xt cells and inline operands, ending with
///   the xt of `exit`
///
/// The `here` and `latest` cursors are themselves cells in the arena
/// (see `arena::HERE_ADDR`/`arena::LATEST_ADDR`) so that Forth code can
/// take their addresses.

pub fn here<C: Cell, B: ByteOrder>(arena: &Arena<C, B>) -> Result<C, VmError> {
    arena.cell_get(C::from_uint(arena::HERE_ADDR))
}

pub fn set_here<C: Cell, B: ByteOrder>(arena: &mut Arena<C, B>, address: C) -> Result<(), VmError> {
    arena.cell_set(C::from_uint(arena::HERE_ADDR), address)
}

pub fn latest<C: Cell, B: ByteOrder>(arena: &Arena<C, B>) -> Result<C, VmError> {
    arena.cell_get(C::from_uint(arena::LATEST_ADDR))
}

pub fn set_latest<C: Cell, B: ByteOrder>(arena: &mut Arena<C, B>, entry: C) -> Result<(), VmError> {
    arena.cell_set(C::from_uint(arena::LATEST_ADDR), entry)
}

/// Store one cell at `here` and advance it.
pub fn append_cell<C: Cell, B: ByteOrder>(arena: &mut Arena<C, B>, value: C) -> Result<(), VmError> {
    let address = here(arena)?;
    if address.to_uint() + C::size().to_uint() > arena.len() {
        return Err(VmError::DictionaryFull);
    }
    arena.cell_set(address, value)?;
    set_here(arena, address + C::size())
}

/// Append a new entry header: link, flags, name, padding, codeword.
/// Leaves `here` just past the codeword cell (the body position) and
/// makes the entry `latest`, so a definition is findable as soon as its
/// header exists. Returns the entry address.
pub fn create<C: Cell, B: ByteOrder>(
    arena: &mut Arena<C, B>,
    name: &[u8],
    flags: u8,
    code: C,
) -> Result<C, VmError> {
    let entry = here(arena)?;
    let codeword = arena::aligned(entry + C::size() + C::from_uint(name.len() + 2));
    if codeword.to_uint() + C::size().to_uint() > arena.len() {
        return Err(VmError::DictionaryFull);
    }
    arena.cell_set(entry, latest(arena)?)?;
    arena.byte_set(entry + C::size(), flags)?;
    let mut address = entry + C::size() + C::one();
    for &byte in name {
        arena.byte_set(address, byte)?;
        address = address + C::one();
    }
    arena.byte_set(address, 0)?;
    arena.cell_set(codeword, code)?;
    set_here(arena, codeword + C::size())?;
    set_latest(arena, entry)?;
    Ok(entry)
}

/// Walk the link chain from `latest`, most recent first, and return the
/// first entry whose name matches. Redefinitions shadow earlier ones.
pub fn find<C: Cell, B: ByteOrder>(arena: &Arena<C, B>, name: &[u8]) -> Result<Option<C>, VmError> {
    let mut entry = latest(arena)?;
    while !entry.is_zero() {
        if entry_name(arena, entry)? == name {
            return Ok(Some(entry));
        }
        entry = arena.cell_get(entry)?;
    }
    Ok(None)
}

pub fn entry_name<C: Cell, B: ByteOrder>(arena: &Arena<C, B>, entry: C) -> Result<&[u8], VmError> {
    arena.cstr(entry + C::size() + C::one())
}

pub fn entry_flags<C: Cell, B: ByteOrder>(arena: &Arena<C, B>, entry: C) -> Result<u8, VmError> {
    arena.byte_get(entry + C::size())
}

pub fn set_entry_flags<C: Cell, B: ByteOrder>(
    arena: &mut Arena<C, B>,
    entry: C,
    flags: u8,
) -> Result<(), VmError> {
    arena.byte_set(entry + C::size(), flags)
}

/// The address of an entry's codeword cell: skip link and flag, scan the
/// name to its NUL, round up to the next cell boundary. This address is
/// the entry's execution token (xt).
pub fn code_field_address<C: Cell, B: ByteOrder>(
    arena: &Arena<C, B>,
    entry: C,
) -> Result<C, VmError> {
    if entry.is_zero() {
        return Err(VmError::BadAddress(0));
    }
    let mut address = entry + C::size() + C::one();
    while arena.byte_get(address)? != 0 {
        address = address + C::one();
    }
    Ok(arena::aligned(address + C::one()))
}
