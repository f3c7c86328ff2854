//! Parsing of the `EBLC`/`CBLC` bitmap location tables into owned strike records.
//!
//! <https://learn.microsoft.com/en-us/typography/opentype/spec/eblc>

use std::convert::TryFrom;

use itertools::Itertools;

use crate::binary::read::{ReadArray, ReadBinary, ReadBinaryDep, ReadCtxt, ReadFrom, ReadScope};
use crate::binary::{I8, U16Be, U32Be, U8};
use crate::error::ParseError;

/// Flag in `BitmapSize` `flags` indicating the direction of small glyph metrics is horizontal.
pub const HORIZONTAL_METRICS: i8 = 1;

/// Flag in `BitmapSize` `flags` indicating the direction of small glyph metrics is vertical.
pub const VERTICAL_METRICS: i8 = 2;

/// Bit depth of bitmap data.
#[derive(Debug, PartialEq, Eq, Copy, Clone, PartialOrd)]
pub enum BitDepth {
    One = 1,
    Two = 2,
    Four = 4,
    Eight = 8,
    /// Premultiplied BGRA, only in `CBDT`.
    ThirtyTwo = 32,
}

impl BitDepth {
    pub fn bits(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u8> for BitDepth {
    type Error = ParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(BitDepth::One),
            2 => Ok(BitDepth::Two),
            4 => Ok(BitDepth::Four),
            8 => Ok(BitDepth::Eight),
            32 => Ok(BitDepth::ThirtyTwo),
            _ => Err(ParseError::BadValue),
        }
    }
}

/// Valid glyph image formats in `EBDT`/`CBDT`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ImageFormat {
    /// Small metrics, byte-aligned data.
    Format1,
    /// Small metrics, bit-aligned data.
    Format2,
    /// Metrics in the location table, bit-aligned data.
    Format5,
    /// Big metrics, byte-aligned data.
    Format6,
    /// Big metrics, bit-aligned data.
    Format7,
    /// Small metrics, component data.
    Format8,
    /// Big metrics, component data.
    Format9,
    /// Small metrics, PNG data.
    Format17,
    /// Big metrics, PNG data.
    Format18,
    /// Metrics in the location table, PNG data.
    Format19,
}

impl TryFrom<u16> for ImageFormat {
    type Error = ParseError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ImageFormat::Format1),
            2 => Ok(ImageFormat::Format2),
            5 => Ok(ImageFormat::Format5),
            6 => Ok(ImageFormat::Format6),
            7 => Ok(ImageFormat::Format7),
            8 => Ok(ImageFormat::Format8),
            9 => Ok(ImageFormat::Format9),
            17 => Ok(ImageFormat::Format17),
            18 => Ok(ImageFormat::Format18),
            19 => Ok(ImageFormat::Format19),
            _ => Err(ParseError::BadValue),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct SbitLineMetrics {
    pub ascender: i8,
    pub descender: i8,
    pub width_max: u8,
    pub caret_slope_numerator: i8,
    pub caret_slope_denominator: i8,
    pub caret_offset: i8,
    pub min_origin_sb: i8,
    pub min_advance_sb: i8,
    pub max_before_bl: i8,
    pub min_after_bl: i8,
    pub pad1: i8,
    pub pad2: i8,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct SmallGlyphMetrics {
    pub height: u8,
    pub width: u8,
    pub bearing_x: i8,
    pub bearing_y: i8,
    pub advance: u8,
}

/// Complete metrics of a bitmap glyph in both directions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct BigMetrics {
    pub height: u8,
    pub width: u8,
    pub hori_bearing_x: i8,
    pub hori_bearing_y: i8,
    pub hori_advance: u8,
    pub vert_bearing_x: i8,
    pub vert_bearing_y: i8,
    pub vert_advance: u8,
}

impl BigMetrics {
    /// Expand small metrics. The direction the strike flags name and the synthesized other
    /// direction both take the small values.
    pub fn from_small(small: SmallGlyphMetrics) -> BigMetrics {
        BigMetrics {
            height: small.height,
            width: small.width,
            hori_bearing_x: small.bearing_x,
            hori_bearing_y: small.bearing_y,
            hori_advance: small.advance,
            vert_bearing_x: small.bearing_x,
            vert_bearing_y: small.bearing_y,
            vert_advance: small.advance,
        }
    }
}

/// Where the glyphs of an `SbitRange` are found in the data table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeIndex {
    /// Index formats 1 and 3: one offset per glyph plus a trailing end offset.
    Offsets(Vec<u32>),
    /// Index format 2: every glyph has the same size and metrics.
    Constant { image_size: u32, metrics: BigMetrics },
    /// Index format 4: sparse `(glyph, offset)` pairs plus a trailing end pair.
    Sparse(Vec<(u16, u32)>),
    /// Index format 5: sparse glyph codes, all with the same size and metrics.
    SparseConstant {
        image_size: u32,
        metrics: BigMetrics,
        glyph_codes: Vec<u16>,
    },
}

/// A range of consecutive glyph ids within a strike, copied out of an index subtable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SbitRange {
    pub first_glyph: u16,
    pub last_glyph: u16,
    pub index_format: u16,
    pub image_format: ImageFormat,
    /// Offset of the range's image data from the start of the data table.
    pub image_offset: u32,
    pub index: RangeIndex,
}

impl SbitRange {
    pub fn contains(&self, glyph: u16) -> bool {
        (self.first_glyph..=self.last_glyph).contains(&glyph)
    }

    /// Metrics shared by every glyph in the range, for index formats 2 and 5.
    pub fn metrics(&self) -> Option<BigMetrics> {
        match self.index {
            RangeIndex::Constant { metrics, .. } | RangeIndex::SparseConstant { metrics, .. } => {
                Some(metrics)
            }
            RangeIndex::Offsets(_) | RangeIndex::Sparse(_) => None,
        }
    }
}

/// A strike: all the bitmaps for one pixel size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SbitStrike {
    pub hori: SbitLineMetrics,
    pub vert: SbitLineMetrics,
    pub start_glyph: u16,
    pub end_glyph: u16,
    pub ppem_x: u8,
    pub ppem_y: u8,
    pub bit_depth: BitDepth,
    pub flags: i8,
    /// Sorted by glyph id and disjoint.
    pub ranges: Vec<SbitRange>,
}

impl SbitStrike {
    /// Binary search for the range holding `glyph`.
    pub fn find_range(&self, glyph: u16) -> Option<usize> {
        self.ranges
            .binary_search_by(|range| {
                if range.last_glyph < glyph {
                    std::cmp::Ordering::Less
                } else if range.first_glyph > glyph {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .ok()
    }
}

/// The strikes of a face along with the location of the table holding their image data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SbitTables {
    pub major_version: u16,
    pub minor_version: u16,
    /// `EBLC`, `CBLC` or `bloc`.
    pub location_tag: u32,
    /// `EBDT`, `CBDT` or `bdat`.
    pub data_tag: u32,
    /// Absolute position of the data table in the stream.
    pub data_offset: u64,
    pub data_length: u64,
    pub strikes: Vec<SbitStrike>,
}

/// The parsed location table, before it is paired with its data table.
pub struct EblcTable {
    pub major_version: u16,
    pub minor_version: u16,
    pub strikes: Vec<SbitStrike>,
}

impl ReadBinary for EblcTable {
    type HostType<'a> = Self;

    fn read(ctxt: &mut ReadCtxt<'_>) -> Result<Self, ParseError> {
        let scope = ctxt.scope();
        let major_version = ctxt.read_u16be()?;
        ctxt.check_version(major_version == 2 || major_version == 3)?;
        let minor_version = ctxt.read_u16be()?;
        let num_sizes = usize::try_from(ctxt.read_u32be()?)?;
        // Each BitmapSize record is 48 bytes
        ctxt.check(num_sizes <= ctxt.remaining() / 48)?;

        let mut strikes = Vec::with_capacity(num_sizes);
        for _ in 0..num_sizes {
            strikes.push(ctxt.read_dep::<SbitStrike>(scope)?);
        }

        Ok(EblcTable {
            major_version,
            minor_version,
            strikes,
        })
    }
}

impl ReadBinaryDep for SbitStrike {
    type Args<'a> = ReadScope<'a>;
    type HostType<'a> = Self;

    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, eblc_scope: ReadScope<'a>) -> Result<Self, ParseError> {
        let index_sub_table_array_offset = usize::try_from(ctxt.read_u32be()?)?;
        let _index_tables_size = ctxt.read_u32be()?;
        let number_of_index_sub_tables = usize::try_from(ctxt.read_u32be()?)?;
        let _color_ref = ctxt.read_u32be()?; // Not used; set to 0.
        let hori = ctxt.read::<SbitLineMetrics>()?;
        let vert = ctxt.read::<SbitLineMetrics>()?;
        let start_glyph = ctxt.read_u16be()?;
        let end_glyph = ctxt.read_u16be()?;
        let ppem_x = ctxt.read_u8()?;
        let ppem_y = ctxt.read_u8()?;
        let bit_depth = BitDepth::try_from(ctxt.read_u8()?)?;
        let flags = ctxt.read_i8()?;

        let records = eblc_scope
            .offset(index_sub_table_array_offset)
            .ctxt()
            .read_array::<IndexSubTableRecord>(number_of_index_sub_tables)?;
        let ranges = read_ranges(eblc_scope, index_sub_table_array_offset, &records)?;

        Ok(SbitStrike {
            hori,
            vert,
            start_glyph,
            end_glyph,
            ppem_x,
            ppem_y,
            bit_depth,
            flags,
            ranges,
        })
    }
}

fn read_ranges(
    eblc_scope: ReadScope<'_>,
    array_offset: usize,
    records: &ReadArray<'_, IndexSubTableRecord>,
) -> Result<Vec<SbitRange>, ParseError> {
    let mut ranges = Vec::with_capacity(records.len());
    for record in records.iter() {
        if record.first_glyph_index > record.last_glyph_index {
            return Err(ParseError::BadValue);
        }
        let offset = array_offset
            .checked_add(usize::try_from(record.additional_offset_to_index_sub_table)?)
            .ok_or(ParseError::BadOffset)?;
        let range = eblc_scope
            .offset(offset)
            .ctxt()
            .read_dep::<SbitRange>((record.first_glyph_index, record.last_glyph_index))?;
        ranges.push(range);
    }

    ranges.sort_by_key(|range| range.first_glyph);
    let disjoint = ranges
        .iter()
        .tuple_windows()
        .all(|(prev, next)| prev.last_glyph < next.first_glyph);
    if !disjoint {
        return Err(ParseError::BadValue);
    }
    Ok(ranges)
}

/// Record of the `IndexSubTableArray` describing a range of glyphs and the location of its
/// index subtable.
struct IndexSubTableRecord {
    first_glyph_index: u16,
    last_glyph_index: u16,
    // Add to indexSubTableArrayOffset to get offset from beginning of EBLC.
    additional_offset_to_index_sub_table: u32,
}

impl ReadFrom for IndexSubTableRecord {
    type ReadType = (U16Be, U16Be, U32Be);

    fn read_from(
        (first_glyph_index, last_glyph_index, additional_offset_to_index_sub_table): (
            u16,
            u16,
            u32,
        ),
    ) -> Self {
        IndexSubTableRecord {
            first_glyph_index,
            last_glyph_index,
            additional_offset_to_index_sub_table,
        }
    }
}

impl ReadBinaryDep for SbitRange {
    /// `(first_glyph, last_glyph)` from the `IndexSubTableRecord`.
    type Args<'a> = (u16, u16);
    type HostType<'a> = Self;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        (first_glyph, last_glyph): (u16, u16),
    ) -> Result<Self, ParseError> {
        let index_format = ctxt.read_u16be()?;
        let image_format = ImageFormat::try_from(ctxt.read_u16be()?)?;
        let image_offset = ctxt.read_u32be()?;
        // +1 for last_glyph being inclusive, +1 for the trailing end offset
        let num_offsets = usize::from(last_glyph - first_glyph) + 2;

        let index = match index_format {
            1 => {
                let offsets = ctxt.read_array::<U32Be>(num_offsets)?;
                RangeIndex::Offsets(offsets.to_vec())
            }
            2 => {
                let image_size = ctxt.read_u32be()?;
                let metrics = ctxt.read::<BigMetrics>()?;
                RangeIndex::Constant {
                    image_size,
                    metrics,
                }
            }
            3 => {
                let offsets = ctxt.read_array::<U16Be>(num_offsets)?;
                RangeIndex::Offsets(offsets.iter().map(u32::from).collect())
            }
            4 => {
                let num_glyphs = usize::try_from(ctxt.read_u32be()?)?;
                let pairs = ctxt.read_array::<(U16Be, U16Be)>(num_glyphs + 1)?;
                let pairs = pairs
                    .iter()
                    .map(|(glyph, offset)| (glyph, u32::from(offset)))
                    .collect();
                RangeIndex::Sparse(pairs)
            }
            5 => {
                let image_size = ctxt.read_u32be()?;
                let metrics = ctxt.read::<BigMetrics>()?;
                let num_glyphs = usize::try_from(ctxt.read_u32be()?)?;
                let glyph_codes = ctxt.read_array::<U16Be>(num_glyphs)?.to_vec();
                RangeIndex::SparseConstant {
                    image_size,
                    metrics,
                    glyph_codes,
                }
            }
            _ => return Err(ParseError::BadValue),
        };

        Ok(SbitRange {
            first_glyph,
            last_glyph,
            index_format,
            image_format,
            image_offset,
            index,
        })
    }
}

impl ReadFrom for SbitLineMetrics {
    type ReadType = ((I8, I8, U8, I8), (I8, I8, I8, I8), (I8, I8, I8, I8));

    fn read_from(
        (
            (ascender, descender, width_max, caret_slope_numerator),
            (caret_slope_denominator, caret_offset, min_origin_sb, min_advance_sb),
            (max_before_bl, min_after_bl, pad1, pad2),
        ): ((i8, i8, u8, i8), (i8, i8, i8, i8), (i8, i8, i8, i8)),
    ) -> Self {
        SbitLineMetrics {
            ascender,
            descender,
            width_max,
            caret_slope_numerator,
            caret_slope_denominator,
            caret_offset,
            min_origin_sb,
            min_advance_sb,
            max_before_bl,
            min_after_bl,
            pad1,
            pad2,
        }
    }
}

impl ReadFrom for SmallGlyphMetrics {
    type ReadType = ((U8, U8), (I8, I8, U8));

    fn read_from(((height, width), (bearing_x, bearing_y, advance)): ((u8, u8), (i8, i8, u8))) -> Self {
        SmallGlyphMetrics {
            height,
            width,
            bearing_x,
            bearing_y,
            advance,
        }
    }
}

impl ReadFrom for BigMetrics {
    type ReadType = ((U8, U8), (I8, I8, U8), (I8, I8, U8));

    fn read_from(
        ((height, width), (hori_bearing_x, hori_bearing_y, hori_advance), (vert_bearing_x, vert_bearing_y, vert_advance)): (
            (u8, u8),
            (i8, i8, u8),
            (i8, i8, u8),
        ),
    ) -> Self {
        BigMetrics {
            height,
            width,
            hori_bearing_x,
            hori_bearing_y,
            hori_advance,
            vert_bearing_x,
            vert_bearing_y,
            vert_advance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fonts::{self, StrikeSpec};
    use crate::tests::writer::{self, TtfType::*};

    #[test]
    fn read_strikes() {
        let glyph = fonts::small_glyph(1, 8, 0, 1, 8, &[0xFF]);
        let (eblc, _ebdt) = fonts::bitmap_tables(&[
            StrikeSpec::new(12, 1, 3, vec![glyph.clone(), glyph.clone()]),
            StrikeSpec::new(16, 1, 1, vec![glyph]),
        ]);
        let table = ReadScope::new(&eblc).read::<EblcTable>().unwrap();
        assert_eq!(table.major_version, 2);
        assert_eq!(table.strikes.len(), 2);

        let strike = &table.strikes[0];
        assert_eq!(strike.ppem_y, 12);
        assert_eq!(strike.bit_depth, BitDepth::One);
        assert_eq!(strike.ranges.len(), 1);
        let range = &strike.ranges[0];
        assert_eq!((range.first_glyph, range.last_glyph), (3, 4));
        assert_eq!(range.image_format, ImageFormat::Format1);
        assert_eq!(range.index, RangeIndex::Offsets(vec![0, 6, 12]));
        assert_eq!(strike.find_range(4), Some(0));
        assert_eq!(strike.find_range(5), None);
    }

    #[test]
    fn bad_version() {
        let data = writer::convert(&[UInt16(1), UInt16(0), UInt32(0)]);
        assert_eq!(
            ReadScope::new(&data).read::<EblcTable>().err(),
            Some(ParseError::BadVersion)
        );
    }

    #[test]
    fn sparse_range() {
        let data = writer::convert(&[
            UInt16(4),
            UInt16(6),
            UInt32(100),
            UInt32(2),
            UInt16(7),
            UInt16(0),
            UInt16(9),
            UInt16(20),
            UInt16(0),
            UInt16(35),
        ]);
        let range = ReadScope::new(&data).read_dep::<SbitRange>((7, 9)).unwrap();
        assert_eq!(range.image_format, ImageFormat::Format6);
        assert_eq!(range.index, RangeIndex::Sparse(vec![(7, 0), (9, 20), (0, 35)]));
    }

    #[test]
    fn unknown_image_format() {
        let data = writer::convert(&[UInt16(1), UInt16(3), UInt32(0), UInt32(0), UInt32(0)]);
        assert_eq!(
            ReadScope::new(&data).read_dep::<SbitRange>((0, 0)).err(),
            Some(ParseError::BadValue)
        );
    }

    #[test]
    fn overlapping_ranges() {
        let mut data = writer::convert(&[
            UInt16(2),
            UInt16(0),
            UInt32(1),
            // BitmapSize
            UInt32(56),
            UInt32(0),
            UInt32(2),
            UInt32(0),
            Raw(&[0; 24]),
            UInt16(1),
            UInt16(6),
            UInt8(10),
            UInt8(10),
            UInt8(8),
            Int8(HORIZONTAL_METRICS),
            // IndexSubTableArray
            UInt16(1),
            UInt16(5),
            UInt32(16),
            UInt16(5),
            UInt16(6),
            UInt32(16),
        ]);
        // Both records share one format 2 subtable
        data.extend(writer::convert(&[
            UInt16(2),
            UInt16(5),
            UInt32(0),
            UInt32(4),
            Raw(&[2, 2, 0, 2, 2, 0, 0, 2]),
        ]));
        assert_eq!(
            ReadScope::new(&data).read::<EblcTable>().err(),
            Some(ParseError::BadValue)
        );
    }
}
