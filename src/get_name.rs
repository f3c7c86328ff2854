//! Selecting and decoding strings from the `name` table.

use encoding_rs::{DecoderResult, MACINTOSH, UTF_16BE};

use crate::face::{Face, NameEntry};
use crate::tables::cmap::{EncodingId, PlatformId};

/// Indices into the face's name entries of the records `get_name_id` found.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct NameIdMatch {
    /// A Windows Unicode or Symbol record.
    pub windows: Option<usize>,
    /// A Macintosh Roman record.
    pub apple: Option<usize>,
}

impl NameIdMatch {
    pub fn found(&self) -> bool {
        self.windows.is_some() || self.apple.is_some()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum NameEncoding {
    Utf16Be,
    AppleRoman,
}

const LANGUAGE_ENGLISH_US: u16 = 0x409;
const LANGUAGE_MAC_ENGLISH: u16 = 0;

/// Windows language ids share their low 10 bits with the primary language.
fn is_windows_english(language_id: u16) -> bool {
    language_id & 0x3FF == 0x009
}

/// Find the best string for `name_id` and decode it.
///
/// Windows records are preferred, English ones first. A Macintosh record is used instead when
/// the only Windows record is not English, and Unicode platform records only when nothing
/// else matched. The decoded string is cached on the face.
pub fn get_name(face: &Face, name_id: u16) -> Option<&str> {
    let name = face.name.as_ref()?;

    let mut windows = None;
    let mut windows_is_english = false;
    let mut apple_english = None;
    let mut apple_roman = None;
    let mut unicode = None;

    for (index, entry) in name.entries.iter().enumerate() {
        let record = &entry.record;
        if record.name_id != name_id || entry.bytes.is_empty() {
            continue;
        }
        match PlatformId(record.platform_id) {
            PlatformId::UNICODE | PlatformId::ISO => {
                unicode.get_or_insert(index);
            }
            PlatformId::MACINTOSH => {
                if record.language_id == LANGUAGE_MAC_ENGLISH {
                    apple_english.get_or_insert(index);
                } else if EncodingId(record.encoding_id) == EncodingId::MACINTOSH_APPLE_ROMAN {
                    apple_roman.get_or_insert(index);
                }
            }
            PlatformId::WINDOWS => {
                let english = is_windows_english(record.language_id);
                if (windows.is_none() || (english && !windows_is_english))
                    && matches!(
                        EncodingId(record.encoding_id),
                        EncodingId::WINDOWS_SYMBOL
                            | EncodingId::WINDOWS_UNICODE_BMP_UCS2
                            | EncodingId::WINDOWS_UNICODE_UCS4
                    )
                {
                    windows = Some(index);
                    windows_is_english = english;
                }
            }
            _ => {}
        }
    }

    let apple = apple_english.or(apple_roman);
    let (index, encoding) = match (windows, apple) {
        (Some(index), None) => (index, NameEncoding::Utf16Be),
        (Some(index), Some(_)) if windows_is_english => (index, NameEncoding::Utf16Be),
        (_, Some(index)) => (index, NameEncoding::AppleRoman),
        (None, None) => (unicode?, NameEncoding::Utf16Be),
    };

    let entry = name.entries.get(index)?;
    decoded(entry, encoding)
}

fn decoded(entry: &NameEntry, encoding: NameEncoding) -> Option<&str> {
    entry
        .decoded
        .get_or_init(|| decode_name(encoding, &entry.bytes))
        .as_deref()
}

/// Locate the Windows and Macintosh records for `name_id` without decoding them.
pub fn get_name_id(face: &Face, name_id: u16) -> NameIdMatch {
    let mut found = NameIdMatch::default();
    let Some(name) = face.name.as_ref() else {
        return found;
    };

    for (index, entry) in name.entries.iter().enumerate() {
        let record = &entry.record;
        if record.name_id != name_id {
            continue;
        }
        match (record.platform_id, record.encoding_id) {
            (3, 0) | (3, 1) => {
                if record.language_id == LANGUAGE_ENGLISH_US || found.windows.is_none() {
                    found.windows = Some(index);
                }
            }
            (1, 0) => {
                if record.language_id == LANGUAGE_MAC_ENGLISH || found.apple.is_none() {
                    found.apple = Some(index);
                }
            }
            _ => {}
        }
    }
    found
}

fn decode_name(encoding: NameEncoding, data: &[u8]) -> Option<String> {
    let mut decoder = match encoding {
        NameEncoding::Utf16Be => UTF_16BE.new_decoder_without_bom_handling(),
        NameEncoding::AppleRoman => MACINTOSH.new_decoder_without_bom_handling(),
    };
    let size = decoder.max_utf8_buffer_length_without_replacement(data.len())?;
    let mut s = String::with_capacity(size);
    let (res, _read) = decoder.decode_to_string_without_replacement(data, &mut s, true);
    match res {
        DecoderResult::InputEmpty => Some(s),
        DecoderResult::OutputFull => None, // should not happen
        DecoderResult::Malformed(_, _) => None,
    }
}
