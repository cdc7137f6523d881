//! Bounds-checked reader over a byte slice, shared by the header parsers.

use crate::error::TexError;

pub(crate) struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[cfg(test)]
    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub(crate) fn set_position(&mut self, pos: usize) -> Result<(), TexError> {
        if pos > self.data.len() {
            return Err(TexError::UnexpectedEof);
        }
        self.pos = pos;
        Ok(())
    }

    pub(crate) fn skip(&mut self, n: usize) -> Result<(), TexError> {
        let new_pos = self.pos.checked_add(n).ok_or(TexError::UnexpectedEof)?;
        self.set_position(new_pos)
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8], TexError> {
        let end = self.pos.checked_add(n).ok_or(TexError::UnexpectedEof)?;
        let bytes = self.data.get(self.pos..end).ok_or(TexError::UnexpectedEof)?;
        self.pos = end;
        Ok(bytes)
    }

    pub(crate) fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N], TexError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, TexError> {
        Ok(self.read_fixed::<1>()?[0])
    }

    pub(crate) fn read_u16_le(&mut self) -> Result<u16, TexError> {
        Ok(u16::from_le_bytes(self.read_fixed()?))
    }

    pub(crate) fn read_u32_le(&mut self) -> Result<u32, TexError> {
        Ok(u32::from_le_bytes(self.read_fixed()?))
    }

    pub(crate) fn read_i32_le(&mut self) -> Result<i32, TexError> {
        Ok(i32::from_le_bytes(self.read_fixed()?))
    }

    pub(crate) fn read_u32_be(&mut self) -> Result<u32, TexError> {
        Ok(u32::from_be_bytes(self.read_fixed()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_both_endians() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let mut c = Cursor::new(&data);
        assert_eq!(c.read_u32_be().unwrap(), 0x0102_0304);
        assert_eq!(c.read_u32_le().unwrap(), 0x0807_0605);
        assert!(matches!(c.read_u8(), Err(TexError::UnexpectedEof)));
    }

    #[test]
    fn take_past_end_leaves_position() {
        let data = [0u8; 4];
        let mut c = Cursor::new(&data);
        c.skip(2).unwrap();
        assert!(c.take(3).is_err());
        assert_eq!(c.position(), 2);
        assert_eq!(c.remaining(), 2);
    }
}
