//! `cmap` table parsing and Unicode subtable selection.
//!
//! <https://docs.microsoft.com/en-us/typography/opentype/spec/cmap>

use std::cmp::Ordering;
use std::convert::TryFrom;

use crate::binary::read::{ReadArray, ReadBinary, ReadCtxt, ReadFrom, ReadScope};
use crate::binary::{I16Be, U16Be, U32Be, U8};
use crate::error::ParseError;
use crate::size;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PlatformId(pub u16);

impl PlatformId {
    pub const UNICODE: PlatformId = PlatformId(0);
    pub const MACINTOSH: PlatformId = PlatformId(1);
    pub const ISO: PlatformId = PlatformId(2);
    pub const WINDOWS: PlatformId = PlatformId(3);
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EncodingId(pub u16);

impl EncodingId {
    pub const WINDOWS_SYMBOL: EncodingId = EncodingId(0);
    pub const WINDOWS_UNICODE_BMP_UCS2: EncodingId = EncodingId(1);
    pub const WINDOWS_UNICODE_UCS4: EncodingId = EncodingId(10);

    pub const MACINTOSH_APPLE_ROMAN: EncodingId = EncodingId(0);
}

/// Unicode-capable encodings in order of preference.
pub const UNICODE_PREFERENCE: [(u16, u16); 10] = [
    (3, 10),
    (0, 4),
    (0, 6),
    (3, 1),
    (0, 3),
    (0, 2),
    (0, 1),
    (0, 0),
    (3, 0),
    (1, 0),
];

pub struct Cmap<'a> {
    pub scope: ReadScope<'a>,
    pub encoding_records: ReadArray<'a, EncodingRecord>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EncodingRecord {
    pub platform_id: u16,
    pub encoding_id: u16,
    pub offset: u32,
}

pub enum CmapSubtable<'a> {
    Format0 {
        language: u16,
        glyph_id_array: ReadArray<'a, U8>,
    },
    Format4 {
        language: u16,
        end_codes: ReadArray<'a, U16Be>,
        start_codes: ReadArray<'a, U16Be>,
        id_deltas: ReadArray<'a, I16Be>,
        id_range_offsets: ReadArray<'a, U16Be>,
        glyph_id_array: ReadArray<'a, U16Be>,
    },
    Format6 {
        language: u16,
        first_code: u16,
        glyph_id_array: ReadArray<'a, U16Be>,
    },
    Format12 {
        language: u32,
        groups: ReadArray<'a, SequentialMapGroup>,
    },
}

#[derive(Debug, Copy, Clone)]
pub struct SequentialMapGroup {
    start_char_code: u32,
    end_char_code: u32,
    start_glyph_id: u32,
}

impl ReadBinary for Cmap<'_> {
    type HostType<'a> = Cmap<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Cmap<'a>, ParseError> {
        let scope = ctxt.scope();
        let version = ctxt.read_u16be()?;
        ctxt.check_version(version == 0)?;
        let num_tables = usize::from(ctxt.read_u16be()?);
        let encoding_records = ctxt.read_array::<EncodingRecord>(num_tables)?;
        Ok(Cmap {
            scope,
            encoding_records,
        })
    }
}

impl ReadFrom for EncodingRecord {
    type ReadType = (U16Be, U16Be, U32Be);
    fn read_from((platform_id, encoding_id, offset): (u16, u16, u32)) -> Self {
        EncodingRecord {
            platform_id,
            encoding_id,
            offset,
        }
    }
}

/// Returns `true` if `format` is one `CmapSubtable` can map characters with.
pub fn is_supported_format(format: u16) -> bool {
    matches!(format, 0 | 4 | 6 | 12)
}

impl ReadBinary for CmapSubtable<'_> {
    type HostType<'a> = CmapSubtable<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<CmapSubtable<'a>, ParseError> {
        let subtable_format = ctxt.read_u16be()?;
        match subtable_format {
            0 => {
                let length = usize::from(ctxt.read_u16be()?);
                ctxt.check(length >= 3 * size::U16 + 256)?;
                let language = ctxt.read_u16be()?;
                let glyph_id_array = ctxt.read_array::<U8>(256)?;
                Ok(CmapSubtable::Format0 {
                    language,
                    glyph_id_array,
                })
            }
            4 => {
                let length = usize::from(ctxt.read_u16be()?);
                let language = ctxt.read_u16be()?;
                let seg_count_x2 = usize::from(ctxt.read_u16be()?);
                ctxt.check((seg_count_x2 & 1) == 0)?;
                let seg_count = seg_count_x2 >> 1;
                let _search_range = ctxt.read_u16be()?;
                let _entry_selector = ctxt.read_u16be()?;
                let _range_shift = ctxt.read_u16be()?;
                let end_codes = ctxt.read_array::<U16Be>(seg_count)?;
                let _reserved_pad = ctxt.read_u16be()?;
                let start_codes = ctxt.read_array::<U16Be>(seg_count)?;
                let id_deltas = ctxt.read_array::<I16Be>(seg_count)?;
                let id_range_offsets = ctxt.read_array::<U16Be>(seg_count)?;
                let header_size = (8 + (4 * seg_count)) * size::U16;
                ctxt.check(length >= header_size)?;
                let remaining = length - header_size;
                // Some fonts have a length that runs past the end of the table; use what exists
                let num_indices = (remaining >> 1).min(ctxt.remaining() >> 1);
                let glyph_id_array = ctxt.read_array::<U16Be>(num_indices)?;
                Ok(CmapSubtable::Format4 {
                    language,
                    end_codes,
                    start_codes,
                    id_deltas,
                    id_range_offsets,
                    glyph_id_array,
                })
            }
            6 => {
                let _length = ctxt.read_u16be()?;
                let language = ctxt.read_u16be()?;
                let first_code = ctxt.read_u16be()?;
                let entry_count = usize::from(ctxt.read_u16be()?);
                let glyph_id_array = ctxt.read_array::<U16Be>(entry_count)?;
                Ok(CmapSubtable::Format6 {
                    language,
                    first_code,
                    glyph_id_array,
                })
            }
            12 => {
                let reserved = ctxt.read_u16be()?;
                ctxt.check(reserved == 0)?;
                let _length = ctxt.read_u32be()?;
                let language = ctxt.read_u32be()?;
                let num_groups = usize::try_from(ctxt.read_u32be()?)?;
                let groups = ctxt.read_array::<SequentialMapGroup>(num_groups)?;
                Ok(CmapSubtable::Format12 { language, groups })
            }
            _ => Err(ParseError::BadVersion),
        }
    }
}

impl ReadFrom for SequentialMapGroup {
    type ReadType = (U32Be, U32Be, U32Be);
    fn read_from((start_char_code, end_char_code, start_glyph_id): (u32, u32, u32)) -> Self {
        SequentialMapGroup {
            start_char_code,
            end_char_code,
            start_glyph_id,
        }
    }
}

impl<'a> Cmap<'a> {
    /// Find the first encoding record for the given `platform_id` and `encoding_id`
    pub fn find_subtable(
        &self,
        platform_id: PlatformId,
        encoding_id: EncodingId,
    ) -> Option<EncodingRecord> {
        self.encoding_records.iter().find(|record| {
            record.platform_id == platform_id.0 && record.encoding_id == encoding_id.0
        })
    }

    /// The format of the subtable an encoding record points at.
    pub fn subtable_format(&self, record: &EncodingRecord) -> Result<u16, ParseError> {
        let offset = usize::try_from(record.offset)?;
        let mut ctxt = self.scope.offset(offset).ctxt();
        Ok(ctxt.read_u16be()?)
    }

    /// Select the most preferred Unicode subtable whose format is supported.
    pub fn select_unicode_subtable(&self) -> Result<Option<EncodingRecord>, ParseError> {
        for (platform_id, encoding_id) in UNICODE_PREFERENCE {
            let record = match self.find_subtable(PlatformId(platform_id), EncodingId(encoding_id))
            {
                Some(record) => record,
                None => continue,
            };
            if is_supported_format(self.subtable_format(&record)?) {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    pub fn subtable(&self, record: &EncodingRecord) -> Result<CmapSubtable<'a>, ParseError> {
        let offset = usize::try_from(record.offset)?;
        self.scope.offset(offset).read::<CmapSubtable<'_>>()
    }
}

impl CmapSubtable<'_> {
    /// Map a character code to a glyph. `None` if the character is not mapped.
    pub fn map_glyph(&self, ch: u32) -> Result<Option<u16>, ParseError> {
        let glyph_id = match *self {
            CmapSubtable::Format0 {
                ref glyph_id_array, ..
            } => usize::try_from(ch)
                .ok()
                .and_then(|index| glyph_id_array.get_item(index))
                .map(u16::from),
            CmapSubtable::Format4 {
                ref end_codes,
                ref start_codes,
                ref id_deltas,
                ref id_range_offsets,
                ref glyph_id_array,
                ..
            } => {
                // end codes are sorted, so find the first segment ending at or after `ch`
                let i = match end_codes.binary_search_by(|end| u32::from(end).cmp(&ch)) {
                    Ok(i) | Err(i) => i,
                };
                let (start_code, id_delta, id_range_offset) = match (
                    start_codes.get_item(i),
                    id_deltas.get_item(i),
                    id_range_offsets.get_item(i),
                ) {
                    (Some(start), Some(delta), Some(offset)) => {
                        (u32::from(start), i32::from(delta), usize::from(offset))
                    }
                    _ => return Ok(None),
                };
                if ch < start_code {
                    return Ok(None);
                }
                if id_range_offset == 0 {
                    let glyph_id = ((ch as i32) + id_delta) as u32 & 0xFFFF;
                    Some(glyph_id as u16)
                } else {
                    // The offset is relative to the idRangeOffset element itself
                    let glyph_id_offset =
                        id_range_offset + i * 2 + usize::try_from(ch - start_code)? * 2;
                    let index = (glyph_id_offset >> 1)
                        .checked_sub(id_range_offsets.len())
                        .ok_or(ParseError::BadIndex)?;
                    let glyph_id = glyph_id_array.get_item(index).ok_or(ParseError::BadIndex)?;
                    if glyph_id == 0 {
                        None
                    } else {
                        Some(((i32::from(glyph_id) + id_delta) as u32 & 0xFFFF) as u16)
                    }
                }
            }
            CmapSubtable::Format6 {
                first_code,
                ref glyph_id_array,
                ..
            } => ch
                .checked_sub(u32::from(first_code))
                .and_then(|index| usize::try_from(index).ok())
                .and_then(|index| glyph_id_array.get_item(index)),
            CmapSubtable::Format12 { ref groups, .. } => {
                let found = groups.binary_search_by(|group| {
                    if ch < group.start_char_code {
                        Ordering::Greater
                    } else if ch > group.end_char_code {
                        Ordering::Less
                    } else {
                        Ordering::Equal
                    }
                });
                match found.ok().and_then(|index| groups.get_item(index)) {
                    Some(group) => {
                        let glyph_id = group
                            .start_glyph_id
                            .checked_add(ch - group.start_char_code)
                            .ok_or(ParseError::BadIndex)?;
                        Some(u16::try_from(glyph_id)?)
                    }
                    None => None,
                }
            }
        };
        Ok(glyph_id.filter(|&glyph_id| glyph_id != 0))
    }
}
