use crate::error::FormatError;
use crate::wire;

const MINIFIED: u8 = 0b1000_0000;
const RESERVED: u8 = 0b0100_0000;
const NEGATIVE: u8 = 0b1000;

const MAX_MINIFIED_MILLIS: i32 = 64;
const MAX_MINIFIED_RATE: i32 = 7;

/// Width a single packed delta field is written in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeltaEncoding {
    Zero,
    Byte(i8),
    Short(i16),
    Int(i32),
}

impl DeltaEncoding {
    pub fn from_delta(delta: i32) -> Self {
        if delta == 0 {
            DeltaEncoding::Zero
        } else if let Ok(v) = i8::try_from(delta) {
            DeltaEncoding::Byte(v)
        } else if let Ok(v) = i16::try_from(delta) {
            DeltaEncoding::Short(v)
        } else {
            DeltaEncoding::Int(delta)
        }
    }

    pub fn to_delta(&self) -> i32 {
        match self {
            DeltaEncoding::Zero => 0,
            DeltaEncoding::Byte(v) => *v as i32,
            DeltaEncoding::Short(v) => *v as i32,
            DeltaEncoding::Int(v) => *v,
        }
    }

    /// Two-bit selector stored in the packed header.
    pub fn selector(&self) -> u8 {
        match self {
            DeltaEncoding::Zero => 0b00,
            DeltaEncoding::Byte(_) => 0b01,
            DeltaEncoding::Short(_) => 0b10,
            DeltaEncoding::Int(_) => 0b11,
        }
    }

    pub fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            DeltaEncoding::Zero => {}
            DeltaEncoding::Byte(v) => buf.extend_from_slice(&v.to_le_bytes()),
            DeltaEncoding::Short(v) => buf.extend_from_slice(&v.to_le_bytes()),
            DeltaEncoding::Int(v) => buf.extend_from_slice(&v.to_le_bytes()),
        }
    }

    pub fn decode(selector: u8, buf: &[u8], pos: &mut usize) -> Result<Self, FormatError> {
        Ok(match selector & 0b11 {
            0b00 => DeltaEncoding::Zero,
            0b01 => DeltaEncoding::Byte(wire::read_i8(buf, pos)?),
            0b10 => DeltaEncoding::Short(wire::read_i16(buf, pos)?),
            _ => DeltaEncoding::Int(wire::read_i32(buf, pos)?),
        })
    }
}

/// Change from one tick to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickDelta {
    pub millis: i32,
    pub bid: i32,
    pub ask: i32,
}

impl TickDelta {
    pub fn is_zero(&self) -> bool {
        self.millis == 0 && self.bid == 0 && self.ask == 0
    }

    fn is_minifiable(&self) -> bool {
        (0..=MAX_MINIFIED_MILLIS).contains(&self.millis)
            && self.bid.abs() <= MAX_MINIFIED_RATE
            && self.ask.abs() <= MAX_MINIFIED_RATE
    }

    /// Appends the smallest representation of this delta.
    ///
    /// A zero delta is a bare packed header with every selector clear. The
    /// byte is still written so the decoder reads exactly one header per tick.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        if self.is_zero() {
            buf.push(0);
        } else if self.is_minifiable() {
            buf.push(MINIFIED | self.millis as u8);
            buf.push((nibble(self.bid) << 4) | nibble(self.ask));
        } else {
            let time = DeltaEncoding::from_delta(self.millis);
            let bid = DeltaEncoding::from_delta(self.bid);
            let ask = DeltaEncoding::from_delta(self.ask);

            buf.push((time.selector() << 4) | (bid.selector() << 2) | ask.selector());
            time.encode(buf);
            bid.encode(buf);
            ask.encode(buf);
        }
    }

    pub fn decode(buf: &[u8], pos: &mut usize) -> Result<Self, FormatError> {
        let header = wire::read_u8(buf, pos)?;

        if header & MINIFIED != 0 {
            let rates = wire::read_u8(buf, pos)?;
            return Ok(TickDelta {
                millis: (header & !MINIFIED) as i32,
                bid: from_nibble(rates >> 4),
                ask: from_nibble(rates & 0x0F),
            });
        }

        if header & RESERVED != 0 {
            return Err(FormatError::InvalidHeader(header));
        }

        let millis = DeltaEncoding::decode(header >> 4, buf, pos)?.to_delta();
        let bid = DeltaEncoding::decode(header >> 2, buf, pos)?.to_delta();
        let ask = DeltaEncoding::decode(header, buf, pos)?.to_delta();

        Ok(TickDelta { millis, bid, ask })
    }
}

// Sign bit plus three-bit magnitude.
fn nibble(delta: i32) -> u8 {
    let sign = if delta < 0 { NEGATIVE } else { 0 };
    sign | (delta.unsigned_abs() as u8 & 0b0111)
}

fn from_nibble(nibble: u8) -> i32 {
    let magnitude = (nibble & 0b0111) as i32;
    if nibble & NEGATIVE != 0 { -magnitude } else { magnitude }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(delta: TickDelta) -> Vec<u8> {
        let mut buf = Vec::new();
        delta.encode(&mut buf);
        buf
    }

    fn decoded(buf: &[u8]) -> TickDelta {
        let mut pos = 0;
        let delta = TickDelta::decode(buf, &mut pos).unwrap();
        assert_eq!(pos, buf.len());
        delta
    }

    #[test]
    fn test_delta_widths() {
        assert_eq!(DeltaEncoding::from_delta(0), DeltaEncoding::Zero);
        assert_eq!(DeltaEncoding::from_delta(-128), DeltaEncoding::Byte(-128));
        assert_eq!(DeltaEncoding::from_delta(128), DeltaEncoding::Short(128));
        assert_eq!(DeltaEncoding::from_delta(-32_769), DeltaEncoding::Int(-32_769));
    }

    #[test]
    fn test_minified_layout() {
        let delta = TickDelta { millis: 64, bid: -7, ask: 3 };
        let buf = encoded(delta);
        assert_eq!(buf, vec![0x80 | 64, 0b1111_0011]);
        assert_eq!(decoded(&buf), delta);
    }

    #[test]
    fn test_packed_layout() {
        let delta = TickDelta { millis: 65, bid: 0, ask: -300 };
        let buf = encoded(delta);
        assert_eq!(buf[0], 0b0001_0010);
        assert_eq!(buf.len(), 1 + 1 + 2);
        assert_eq!(decoded(&buf), delta);

        let delta = TickDelta { millis: 100_000, bid: 8, ask: 8 };
        let buf = encoded(delta);
        assert_eq!(buf[0], 0b0011_0101);
        assert_eq!(buf.len(), 1 + 4 + 1 + 1);
        assert_eq!(decoded(&buf), delta);
    }

    #[test]
    fn test_zero_delta_is_one_byte() {
        let buf = encoded(TickDelta::default());
        assert_eq!(buf, vec![0]);
        assert!(decoded(&buf).is_zero());
    }

    #[test]
    fn test_negative_millis_not_minified() {
        let delta = TickDelta { millis: -1, bid: 1, ask: 1 };
        let buf = encoded(delta);
        assert_eq!(buf[0] & MINIFIED, 0);
        assert_eq!(decoded(&buf), delta);
    }

    #[test]
    fn test_reserved_bit_rejected() {
        let mut pos = 0;
        assert!(matches!(
            TickDelta::decode(&[0x40], &mut pos),
            Err(FormatError::InvalidHeader(0x40))
        ));
    }

    #[test]
    fn test_truncated_field() {
        let mut pos = 0;
        assert!(matches!(
            TickDelta::decode(&[0b0011_0000, 1, 2], &mut pos),
            Err(FormatError::Truncated { .. })
        ));
    }
}
