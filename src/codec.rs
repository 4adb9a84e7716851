//! Wire framing for the TC-48-20 ASCII-hex protocol.
//!
//! Commands are 10 bytes: `'*'`, two hex chars of command code, four hex
//! chars of a big-endian signed 16-bit value, two hex chars of checksum,
//! `'\r'`. Replies are 8 bytes: `'*'`, four value hex chars, two checksum
//! hex chars, `'^'`. Checksums are the byte sum of the ASCII payload
//! characters mod 256.

use thiserror::Error;

/// Total length of an encoded command frame.
pub const COMMAND_LEN: usize = 10;
/// Total length of a reply frame.
pub const REPLY_LEN: usize = 8;

/// Value field the controller substitutes when the command it received
/// failed its checksum.
const REJECTED_VALUE: &[u8; 4] = b"XXXX";

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Reply validation failures, independent of the transport in use.
///
/// Call sites working through a port convert these into the crate error
/// type; see [`crate::error::Error`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed reply frame")]
    Framing,
    #[error("reply checksum mismatch")]
    Checksum,
    #[error("controller rejected the command checksum")]
    CommandRejected,
}

impl<I: embedded_io::Error> From<DecodeError> for crate::error::Error<I> {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Framing => Self::Framing,
            DecodeError::Checksum => Self::Checksum,
            DecodeError::CommandRejected => Self::CommandRejected,
        }
    }
}

/// Encode a command frame. Cannot fail; `i16` already bounds the value to
/// what the controller can represent.
pub fn encode(code: u8, value: i16) -> [u8; COMMAND_LEN] {
    let mut frame = [0u8; COMMAND_LEN];
    frame[0] = b'*';
    put_hex(&mut frame[1..3], code);
    let raw = (value as u16).to_be_bytes();
    put_hex(&mut frame[3..5], raw[0]);
    put_hex(&mut frame[5..7], raw[1]);
    let sum = checksum(&frame[1..7]);
    put_hex(&mut frame[7..9], sum);
    frame[9] = b'\r';
    frame
}

/// Validate a reply frame and extract its signed 16-bit value.
///
/// The `XXXX` sentinel is checked before the local checksum so a command
/// rejection can never be misreported as reply corruption.
pub fn decode(reply: &[u8]) -> Result<i16, DecodeError> {
    if reply.len() != REPLY_LEN || reply[0] != b'*' || reply[REPLY_LEN - 1] != b'^' {
        return Err(DecodeError::Framing);
    }

    let value_chars = &reply[1..5];
    if value_chars == REJECTED_VALUE {
        return Err(DecodeError::CommandRejected);
    }

    let reply_sum = parse_hex(&reply[5..7]).ok_or(DecodeError::Framing)?;
    if checksum(value_chars) != reply_sum {
        return Err(DecodeError::Checksum);
    }

    let hi = parse_hex(&value_chars[0..2]).ok_or(DecodeError::Framing)?;
    let lo = parse_hex(&value_chars[2..4]).ok_or(DecodeError::Framing)?;
    Ok(i16::from_be_bytes([hi, lo]))
}

/// Byte sum of the ASCII payload characters, mod 256.
fn checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}

fn put_hex(out: &mut [u8], byte: u8) {
    out[0] = HEX[usize::from(byte >> 4)];
    out[1] = HEX[usize::from(byte & 0x0f)];
}

/// Parse two hex characters into a byte. The controller emits lowercase but
/// we accept either case.
fn parse_hex(chars: &[u8]) -> Option<u8> {
    let hi = hex_value(chars[0])?;
    let lo = hex_value(chars[1])?;
    Some((hi << 4) | lo)
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}
