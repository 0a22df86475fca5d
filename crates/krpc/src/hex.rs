//! Hex rendering of raw wire values.

/// Input that is not an even-length run of hex digits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid hex digit at position {position}")]
pub struct HexError {
    pub position: usize,
}

/// Lower-case hex, two digits per byte.
pub fn hexlify(data: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(data.len() * 2);
    for byte in data {
        out.push(DIGITS[(byte >> 4) as usize] as char);
        out.push(DIGITS[(byte & 0x0f) as usize] as char);
    }
    out
}

/// Parse hex digits of either case. Whitespace is not accepted.
pub fn unhexlify(text: &str) -> Result<Vec<u8>, HexError> {
    let digits = text.as_bytes();
    if digits.len() % 2 != 0 {
        return Err(HexError {
            position: digits.len(),
        });
    }
    digits
        .chunks_exact(2)
        .enumerate()
        .map(|(i, pair)| {
            let hi = nibble(pair[0]).ok_or(HexError { position: i * 2 })?;
            let lo = nibble(pair[1]).ok_or(HexError {
                position: i * 2 + 1,
            })?;
            Ok((hi << 4) | lo)
        })
        .collect()
}

fn nibble(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hexlify_bytes() {
        assert_eq!(hexlify(&[]), "");
        assert_eq!(hexlify(&[0x00, 0x0a, 0xff]), "000aff");
    }

    #[test]
    fn unhexlify_either_case() {
        assert_eq!(unhexlify("000AfF").unwrap(), [0x00, 0x0a, 0xff]);
        assert_eq!(unhexlify("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn unhexlify_rejects_bad_input() {
        assert_eq!(unhexlify("abc"), Err(HexError { position: 3 }));
        assert_eq!(unhexlify("0g"), Err(HexError { position: 1 }));
        assert_eq!(unhexlify("zz"), Err(HexError { position: 0 }));
    }

    #[test]
    fn error_names_the_offending_position() {
        let err = unhexlify("0a0x").unwrap_err();
        assert_eq!(err.to_string(), "invalid hex digit at position 3");
        let _: &dyn std::error::Error = &err;
    }
}
