#[cfg(test)]
mod marshal_test;

use bytes::{Buf, Bytes, BytesMut};

use crate::error::{Error, Result};

pub trait MarshalSize {
    fn marshal_size(&self) -> usize;
}

pub trait Marshal: MarshalSize {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize>;

    fn marshal(&self) -> Result<BytesMut> {
        let l = self.marshal_size();
        let mut buf = BytesMut::with_capacity(l);
        buf.resize(l, 0);
        let n = self.marshal_to(&mut buf)?;
        if n != l {
            Err(Error::Other(format!(
                "marshal_to output size {n}, but expect {l}"
            )))
        } else {
            Ok(buf)
        }
    }
}

pub trait Unmarshal: MarshalSize {
    fn unmarshal<B>(buf: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf;
}

/// ensure_remaining fails with UnexpectedEndOfBuffer when fewer than
/// `expected` bytes are left in `buf`.
pub fn ensure_remaining<B: Buf>(buf: &B, expected: usize) -> Result<()> {
    if buf.remaining() < expected {
        Err(Error::UnexpectedEndOfBuffer {
            expected,
            actual: buf.remaining(),
        })
    } else {
        Ok(())
    }
}

/// Copies `len` bytes out of `buf`, failing instead of panicking on short input.
pub fn copy_to_bytes_checked<B: Buf>(buf: &mut B, len: usize) -> Result<Bytes> {
    ensure_remaining(buf, len)?;
    Ok(buf.copy_to_bytes(len))
}
