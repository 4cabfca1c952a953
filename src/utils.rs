use crate::error::{Error, Result};

/// A 16-byte AES block or round key, in column-major AES byte order.
pub type State = [u8; 16];

#[macro_export]
macro_rules! log {
    ($($arg:tt)*) => {
        println!(
            "[{}] {}",
            chrono::Local::now().format("%H:%M:%S"),
            format!($($arg)*)
        );
    };
}

/// Parses a 32-character hex string into a [`State`].
///
/// The first character of each pair is the high nibble; both cases are
/// accepted.
pub fn hex_to_u8_array(hex: &str) -> Result<State> {
    if hex.len() != 32 {
        return Err(Error::BadLength(hex.len()));
    }
    let mut out = [0u8; 16];
    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        let hi = (chunk[0] as char)
            .to_digit(16)
            .ok_or(Error::BadHexDigit(chunk[0] as char))?;
        let lo = (chunk[1] as char)
            .to_digit(16)
            .ok_or(Error::BadHexDigit(chunk[1] as char))?;
        out[i] = ((hi << 4) | lo) as u8;
    }
    Ok(out)
}

/// Renders a [`State`] as 32 lowercase hex characters.
pub fn u8_array_to_hex(state: &State) -> String {
    state.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let s = "2b7e151628aed2a6abf7158809cf4f3c";
        let state = hex_to_u8_array(s).unwrap();
        assert_eq!(state[0], 0x2b);
        assert_eq!(state[15], 0x3c);
        assert_eq!(u8_array_to_hex(&state), s);
    }

    #[test]
    fn first_char_is_high_nibble() {
        let state = hex_to_u8_array("a0000000000000000000000000000000").unwrap();
        assert_eq!(state[0], 0xa0);
    }

    #[test]
    fn uppercase_accepted() {
        let state = hex_to_u8_array("2B7E151628AED2A6ABF7158809CF4F3C").unwrap();
        assert_eq!(state[0], 0x2b);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(hex_to_u8_array("2b7e").is_err());
        assert!(hex_to_u8_array("zz7e151628aed2a6abf7158809cf4f3c").is_err());
    }
}
