//! Primitive frame codec.
//!
//! The peer speaks the classic data-stream encoding:
//! - strings: 2-byte big-endian length, then *modified* UTF-8 bytes
//!   (NUL as `C0 80`, supplementary characters as surrogate pairs)
//! - integers: 4-byte big-endian two's complement
//! - booleans: a single byte, non-zero is `true`

use std::io::{self, Read, Write};

use super::{ConnectionError, ConnectionResult};

/// Largest encoded string a single frame can carry.
pub const MAX_STRING_FRAME: usize = u16::MAX as usize;

/// Encode a string as modified UTF-8.
pub fn encode_modified_utf8(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

/// Decode modified UTF-8 bytes.
///
/// Lone surrogates are replaced rather than rejected; the peer is allowed
/// to send them and the decoded text is only ever displayed or parsed.
pub fn decode_modified_utf8(bytes: &[u8]) -> ConnectionResult<String> {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let lead = bytes[i];
        match lead >> 4 {
            0x0..=0x7 => {
                units.push(u16::from(lead));
                i += 1;
            }
            0xC | 0xD => {
                let b2 = continuation(bytes, i + 1)?;
                units.push((u16::from(lead & 0x1F) << 6) | u16::from(b2 & 0x3F));
                i += 2;
            }
            0xE => {
                let b2 = continuation(bytes, i + 1)?;
                let b3 = continuation(bytes, i + 2)?;
                units.push(
                    (u16::from(lead & 0x0F) << 12)
                        | (u16::from(b2 & 0x3F) << 6)
                        | u16::from(b3 & 0x3F),
                );
                i += 3;
            }
            _ => {
                return Err(ConnectionError::MalformedFrame(format!(
                    "invalid lead byte {lead:#04x} at offset {i}"
                )))
            }
        }
    }

    Ok(String::from_utf16_lossy(&units))
}

fn continuation(bytes: &[u8], index: usize) -> ConnectionResult<u8> {
    match bytes.get(index) {
        Some(b) if b & 0xC0 == 0x80 => Ok(*b),
        Some(b) => Err(ConnectionError::MalformedFrame(format!(
            "invalid continuation byte {b:#04x} at offset {index}"
        ))),
        None => Err(ConnectionError::MalformedFrame(
            "truncated multi-byte sequence".into(),
        )),
    }
}

/// Write one string frame. Nothing is written if the value is too long.
pub fn write_utf<W: Write>(writer: &mut W, value: &str) -> ConnectionResult<()> {
    let encoded = encode_modified_utf8(value);
    if encoded.len() > MAX_STRING_FRAME {
        return Err(ConnectionError::FrameTooLong(encoded.len()));
    }
    writer.write_all(&(encoded.len() as u16).to_be_bytes())?;
    writer.write_all(&encoded)?;
    Ok(())
}

/// Read one string frame.
pub fn read_utf<R: Read>(reader: &mut R) -> ConnectionResult<String> {
    let mut len = [0u8; 2];
    read_exact(reader, &mut len)?;
    let mut payload = vec![0u8; u16::from_be_bytes(len) as usize];
    read_exact(reader, &mut payload)?;
    decode_modified_utf8(&payload)
}

pub fn write_int<W: Write>(writer: &mut W, value: i32) -> ConnectionResult<()> {
    writer.write_all(&value.to_be_bytes())?;
    Ok(())
}

pub fn read_int<R: Read>(reader: &mut R) -> ConnectionResult<i32> {
    let mut buf = [0u8; 4];
    read_exact(reader, &mut buf)?;
    Ok(i32::from_be_bytes(buf))
}

pub fn write_bool<W: Write>(writer: &mut W, value: bool) -> ConnectionResult<()> {
    writer.write_all(&[u8::from(value)])?;
    Ok(())
}

pub fn read_bool<R: Read>(reader: &mut R) -> ConnectionResult<bool> {
    let mut buf = [0u8; 1];
    read_exact(reader, &mut buf)?;
    Ok(buf[0] != 0)
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8]) -> ConnectionResult<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => ConnectionError::PeerClosed,
        _ => ConnectionError::Io(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_ascii_string_frame() {
        let mut buf = Vec::new();
        write_utf(&mut buf, "Doctor").unwrap();
        assert_eq!(buf, b"\x00\x06Doctor");

        let decoded = read_utf(&mut Cursor::new(buf)).unwrap();
        assert_eq!(decoded, "Doctor");
    }

    #[test]
    fn test_nul_uses_two_bytes() {
        assert_eq!(encode_modified_utf8("\0"), vec![0xC0, 0x80]);
        assert_eq!(decode_modified_utf8(&[0xC0, 0x80]).unwrap(), "\0");
    }

    #[test]
    fn test_supplementary_character_is_surrogate_pair() {
        // U+1F600 → D83D DE00, each as a 3-byte sequence
        let encoded = encode_modified_utf8("😀");
        assert_eq!(encoded, vec![0xED, 0xA0, 0xBD, 0xED, 0xB8, 0x80]);
        assert_eq!(decode_modified_utf8(&encoded).unwrap(), "😀");
    }

    #[test]
    fn test_accented_text() {
        let mut buf = Vec::new();
        write_utf(&mut buf, "Diagnóstico: señal ECG").unwrap();
        let decoded = read_utf(&mut Cursor::new(buf)).unwrap();
        assert_eq!(decoded, "Diagnóstico: señal ECG");
    }

    #[test]
    fn test_frame_too_long_writes_nothing() {
        let mut buf = Vec::new();
        let long = "x".repeat(MAX_STRING_FRAME + 1);
        let err = write_utf(&mut buf, &long).unwrap_err();
        assert!(matches!(err, ConnectionError::FrameTooLong(n) if n == MAX_STRING_FRAME + 1));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_int_and_bool() {
        let mut buf = Vec::new();
        write_int(&mut buf, -2).unwrap();
        write_int(&mut buf, 12345).unwrap();
        write_bool(&mut buf, true).unwrap();
        write_bool(&mut buf, false).unwrap();
        assert_eq!(&buf[..4], &[0xFF, 0xFF, 0xFF, 0xFE]);

        let mut cursor = Cursor::new(buf);
        assert_eq!(read_int(&mut cursor).unwrap(), -2);
        assert_eq!(read_int(&mut cursor).unwrap(), 12345);
        assert!(read_bool(&mut cursor).unwrap());
        assert!(!read_bool(&mut cursor).unwrap());
    }

    #[test]
    fn test_eof_is_peer_closed() {
        let mut cursor = Cursor::new(vec![0x00, 0x05, b'a']);
        assert!(matches!(
            read_utf(&mut cursor),
            Err(ConnectionError::PeerClosed)
        ));
        assert!(matches!(
            read_int(&mut Cursor::new(Vec::new())),
            Err(ConnectionError::PeerClosed)
        ));
    }

    #[test]
    fn test_invalid_lead_byte() {
        assert!(matches!(
            decode_modified_utf8(&[b'a', 0xFF]),
            Err(ConnectionError::MalformedFrame(_))
        ));
    }
}
