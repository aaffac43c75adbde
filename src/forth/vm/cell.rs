use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::mem::size_of;

use byteorder::ByteOrder;
use num_traits::int::PrimInt;
use num_traits::{NumCast, WrappingAdd, WrappingMul, WrappingSub};

/// The machine word of the virtual machine. Stack entries, dictionary
/// addresses and compiled body cells are all values of this type;
/// arithmetic words reinterpret it as a two's-complement signed integer
/// via `to_int`/`from_int`.
pub trait Cell:
    PrimInt
    + WrappingAdd
    + WrappingSub
    + WrappingMul
    + From<u8>
    + Hash
    + Debug
    + Display
    + 'static
{
    fn read<B: ByteOrder>(buf: &[u8]) -> Self;
    fn write<B: ByteOrder>(self, buf: &mut [u8]);
    fn size() -> Self {
        NumCast::from(size_of::<Self>()).unwrap()
    }
    fn from_int(n: i64) -> Self;
    fn to_int(self) -> i64;
    fn from_uint(n: usize) -> Self;
    fn to_uint(self) -> usize;
    fn from_bool(b: bool) -> Self {
        if b {
            Self::one()
        } else {
            Self::zero()
        }
    }
}

impl Cell for u64 {
    fn read<B: ByteOrder>(buf: &[u8]) -> Self {
        B::read_u64(buf)
    }
    fn write<B: ByteOrder>(self, buf: &mut [u8]) {
        B::write_u64(buf, self);
    }
    fn from_int(n: i64) -> Self {
        n as u64
    }
    fn to_int(self) -> i64 {
        self as i64
    }
    fn from_uint(n: usize) -> Self {
        n as u64
    }
    fn to_uint(self) -> usize {
        self as usize
    }
}
