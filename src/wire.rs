use crate::error::FormatError;

pub(crate) fn take<'a>(
    buf: &'a [u8],
    pos: &mut usize,
    len: usize,
) -> Result<&'a [u8], FormatError> {
    let end = pos
        .checked_add(len)
        .filter(|end| *end <= buf.len())
        .ok_or(FormatError::Truncated {
            offset: *pos,
            needed: len,
            available: buf.len().saturating_sub(*pos),
        })?;
    let bytes = &buf[*pos..end];
    *pos = end;
    Ok(bytes)
}

fn read_array<const N: usize>(buf: &[u8], pos: &mut usize) -> Result<[u8; N], FormatError> {
    let mut bytes = [0u8; N];
    bytes.copy_from_slice(take(buf, pos, N)?);
    Ok(bytes)
}

pub(crate) fn read_u8(buf: &[u8], pos: &mut usize) -> Result<u8, FormatError> {
    Ok(read_array::<1>(buf, pos)?[0])
}

pub(crate) fn read_i8(buf: &[u8], pos: &mut usize) -> Result<i8, FormatError> {
    Ok(i8::from_le_bytes(read_array(buf, pos)?))
}

pub(crate) fn read_i16(buf: &[u8], pos: &mut usize) -> Result<i16, FormatError> {
    Ok(i16::from_le_bytes(read_array(buf, pos)?))
}

pub(crate) fn read_i32(buf: &[u8], pos: &mut usize) -> Result<i32, FormatError> {
    Ok(i32::from_le_bytes(read_array(buf, pos)?))
}

pub(crate) fn read_i64(buf: &[u8], pos: &mut usize) -> Result<i64, FormatError> {
    Ok(i64::from_le_bytes(read_array(buf, pos)?))
}

/// Length-prefixed UTF-8, the prefix being a 7-bit varint.
pub(crate) fn write_string(buf: &mut Vec<u8>, value: &str) {
    let mut len = value.len();
    while len >= 0x80 {
        buf.push((len as u8) | 0x80);
        len >>= 7;
    }
    buf.push(len as u8);
    buf.extend_from_slice(value.as_bytes());
}

pub(crate) fn read_string(buf: &[u8], pos: &mut usize) -> Result<String, FormatError> {
    let mut len = 0usize;
    let mut shift = 0;
    loop {
        if shift > 28 {
            return Err(FormatError::InvalidString);
        }
        let byte = read_u8(buf, pos)?;
        len |= ((byte & 0x7F) as usize) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }

    let bytes = take(buf, pos, len)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| FormatError::InvalidString)
}
