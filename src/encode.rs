//! Serialize data into the bytecode protocol.

use bytes::BufMut;

use crate::error::{Error, Result};

/// Types that know how to render themselves in the Kafka wire format.
pub trait ToByte {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()>;
}

impl<'a, T: ToByte + 'a + ?Sized> ToByte for &'a T {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        (*self).encode(buffer)
    }
}

impl ToByte for i8 {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        buffer.put_i8(*self);
        Ok(())
    }
}

impl ToByte for i16 {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        buffer.put_i16(*self);
        Ok(())
    }
}

impl ToByte for i32 {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        buffer.put_i32(*self);
        Ok(())
    }
}

impl ToByte for i64 {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        buffer.put_i64(*self);
        Ok(())
    }
}

impl ToByte for u32 {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        buffer.put_u32(*self);
        Ok(())
    }
}

// Record fields (lengths, deltas, counts) are zigzag varints. The values
// this crate encodes are never negative, so zigzag is a left shift.
impl ToByte for usize {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        let mut n = (*self as u64) << 1;
        loop {
            let mut byte = (n & 0x7f) as u8;
            n >>= 7;
            if n != 0 {
                byte |= 0x80;
            }
            buffer.put_u8(byte);
            if n == 0 {
                return Ok(());
            }
        }
    }
}

impl ToByte for str {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        buffer.put_i16(string_len(self.len())?);
        buffer.put(self.as_bytes());
        Ok(())
    }
}

impl ToByte for String {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        self.as_str().encode(buffer)
    }
}

impl<'a> ToByte for Option<&'a str> {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        match *self {
            Some(s) => s.encode(buffer),
            None => (-1i16).encode(buffer),
        }
    }
}

impl ToByte for Option<String> {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        match self {
            Some(s) => s.encode(buffer),
            None => (-1i16).encode(buffer),
        }
    }
}

impl<V: ToByte> ToByte for [V] {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        encode_as_array(buffer, self, |buffer, x| x.encode(buffer))
    }
}

impl ToByte for [u8] {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        buffer.put_i32(array_len(self.len())?);
        buffer.put(self);
        Ok(())
    }
}

/// Renders the length of `xs` as the start of a protocol array, then
/// invokes `f` for each element to render it to the buffer.
pub fn encode_as_array<T, F, W>(buffer: &mut W, xs: &[T], mut f: F) -> Result<()>
where
    F: FnMut(&mut W, &T) -> Result<()>,
    W: BufMut,
{
    buffer.put_i32(array_len(xs.len())?);
    for x in xs {
        f(buffer, x)?;
    }
    Ok(())
}

fn string_len(len: usize) -> Result<i16> {
    i16::try_from(len).map_err(|_| Error::EncodingError)
}

fn array_len(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| Error::EncodingError)
}
