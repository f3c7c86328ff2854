//! Four-byte table and format tags.

use crate::error::ParseError;
use std::fmt;

/// Generate a 4-byte font table tag from byte string
///
/// Example:
///
/// ```ignore
/// assert_eq!(tag!(b"head"), 0x68656164);
/// ```
macro_rules! tag {
    ($w:expr) => {
        tag(*$w)
    };
}

#[derive(PartialEq, Eq, Clone, Copy)]
pub struct DisplayTag(pub u32);

const fn tag(chars: [u8; 4]) -> u32 {
    u32::from_be_bytes(chars)
}

/// Parse a tag from a string of up to four printable ASCII characters.
///
/// Short tags are padded with spaces, so `"OS/2"` and `"cvt"` both work.
pub fn from_string(s: &str) -> Result<u32, ParseError> {
    if s.len() > 4 {
        return Err(ParseError::BadValue);
    }

    let mut tag: u32 = 0;
    let mut count = 0;

    for c in s.chars() {
        if !c.is_ascii() || c.is_ascii_control() {
            return Err(ParseError::BadValue);
        }

        tag = (tag << 8) | (c as u32);
        count += 1;
    }

    while count < 4 {
        tag = (tag << 8) | (' ' as u32);
        count += 1;
    }

    Ok(tag)
}

impl fmt::Display for DisplayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0.to_be_bytes();
        if bytes.iter().any(|&b| !b.is_ascii() || b.is_ascii_control()) {
            write!(f, "0x{:08x}", self.0)
        } else {
            bytes.iter().map(|&b| char::from(b)).collect::<String>().fmt(f)
        }
    }
}

impl fmt::Debug for DisplayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_string().fmt(f)
    }
}

// sfnt versions and collection signature
pub const TTCF: u32 = tag!(b"ttcf");
pub const OTTO: u32 = tag!(b"OTTO");
pub const TRUE: u32 = tag!(b"true");
pub const TYP1: u32 = tag!(b"typ1");
/// The TrueType sfnt version, which is not a printable tag.
pub const TRUETYPE: u32 = 0x00010000;

// tables
pub const BDAT: u32 = tag!(b"bdat");
pub const BHED: u32 = tag!(b"bhed");
pub const BLOC: u32 = tag!(b"bloc");
pub const CBDT: u32 = tag!(b"CBDT");
pub const CBLC: u32 = tag!(b"CBLC");
pub const CMAP: u32 = tag!(b"cmap");
pub const COLR: u32 = tag!(b"COLR");
pub const CPAL: u32 = tag!(b"CPAL");
pub const EBDT: u32 = tag!(b"EBDT");
pub const EBLC: u32 = tag!(b"EBLC");
pub const FVAR: u32 = tag!(b"fvar");
pub const GASP: u32 = tag!(b"gasp");
pub const HEAD: u32 = tag!(b"head");
pub const HHEA: u32 = tag!(b"hhea");
pub const HMTX: u32 = tag!(b"hmtx");
pub const KERN: u32 = tag!(b"kern");
pub const MAXP: u32 = tag!(b"maxp");
pub const NAME: u32 = tag!(b"name");
pub const OS_2: u32 = tag!(b"OS/2");
pub const PCLT: u32 = tag!(b"PCLT");
pub const POST: u32 = tag!(b"post");
pub const VHEA: u32 = tag!(b"vhea");
pub const VMTX: u32 = tag!(b"vmtx");

#[cfg(test)]
mod tests {
    use super::*;

    mod from_string {
        use super::*;

        #[test]
        fn test_four_chars() {
            let tag = from_string("head").expect("invalid tag");

            assert_eq!(tag, HEAD);
        }

        #[test]
        fn test_three_chars() {
            let tag = from_string("BEN").expect("invalid tag");

            assert_eq!(tag, 1111838240);
        }

        #[test]
        fn test_too_long() {
            assert_eq!(from_string("heads"), Err(ParseError::BadValue));
        }
    }

    mod display_tag {
        use crate::tag::{DisplayTag, NAME, OS_2};

        #[test]
        fn test_ascii() {
            assert_eq!(DisplayTag(NAME).to_string(), "name".to_string());
            assert_eq!(DisplayTag(OS_2).to_string(), "OS/2".to_string());
        }

        #[test]
        fn test_non_ascii() {
            assert_eq!(DisplayTag(0x00010000).to_string(), "0x00010000".to_string());
        }
    }
}
