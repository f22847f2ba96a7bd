use crate::error::{PdmError, Result};

/// Sequential little-endian reader over a received frame
#[derive(Debug)]
pub struct ByteReader<'a> {
    buffer: &'a [u8],
    index: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, index: 0 }
    }

    pub fn position(&self) -> usize {
        self.index
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.index
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        if self.remaining() < N {
            return Err(PdmError::Schema(format!(
                "need {} bytes at offset {}, {} left",
                N,
                self.index,
                self.remaining()
            )));
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buffer[self.index..self.index + N]);
        self.index += N;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take::<1>()?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.take()?))
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.take()
    }
}
