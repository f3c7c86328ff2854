//! SFNT table parsing.
//!
//! The types here borrow from a `ReadScope`. The loaders in `crate::loader` copy what they need
//! into the `Face` so that nothing outlives the stream read that produced it.

pub mod cmap;
pub mod colr;
pub mod cpal;
pub mod fvar;
pub mod gasp;
pub mod kern;
pub mod os2;
pub mod pclt;
pub mod post;

use crate::binary::read::{ReadArray, ReadBinary, ReadBinaryDep, ReadCtxt, ReadFrom, ReadScope};
use crate::binary::{I16Be, I32Be, U16Be, U32Be};
use crate::error::ParseError;
use crate::size;
use crate::tag;

use std::convert::TryFrom;

/// Magic number found in the `head` and `bhed` tables.
pub const HEAD_MAGIC: u32 = 0x5F0F3CF5;

/// 32-bit signed fixed-point number (16.16)
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Fixed(i32);

/// Date represented in number of seconds since 12:00 midnight, January 1, 1904
///
/// The value is represented as a signed 64-bit integer.
type LongDateTime = i64;

/// TrueType Collection header
///
/// <https://docs.microsoft.com/en-us/typography/opentype/spec/otff#ttc-header>
#[derive(Debug, Clone, PartialEq)]
pub struct TtcHeader {
    pub major_version: u16,
    pub minor_version: u16,
    /// Offset of each font's offset table from the start of the file.
    pub offset_tables: Vec<u32>,
}

/// OpenType Offset Table
///
/// <https://docs.microsoft.com/en-us/typography/opentype/spec/otff#organization-of-an-opentype-font>
#[derive(Clone)]
pub struct OffsetTable<'a> {
    pub sfnt_version: u32,
    pub search_range: u16,
    pub entry_selector: u16,
    pub range_shift: u16,
    pub table_records: ReadArray<'a, TableRecord>,
}

/// An entry in the Offset Table
///
/// <https://docs.microsoft.com/en-us/typography/opentype/spec/otff#organization-of-an-opentype-font>
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Hash)]
pub struct TableRecord {
    pub table_tag: u32,
    pub checksum: u32,
    pub offset: u32,
    pub length: u32,
}

/// `head` table
///
/// <https://docs.microsoft.com/en-us/typography/opentype/spec/head>
///
/// Apple bitmap-only fonts carry the same layout under the `bhed` tag.
#[derive(Debug, Clone, PartialEq, PartialOrd, Hash)]
pub struct HeadTable {
    pub major_version: u16,
    pub minor_version: u16,
    pub font_revision: Fixed,
    pub check_sum_adjustment: u32,
    pub magic_number: u32,
    pub flags: u16,
    pub units_per_em: u16,
    pub created: LongDateTime,
    pub modified: LongDateTime,
    pub x_min: i16,
    pub y_min: i16,
    pub x_max: i16,
    pub y_max: i16,
    pub mac_style: u16,
    pub lowest_rec_ppem: u16,
    pub font_direction_hint: i16,
    pub index_to_loc_format: i16,
    pub glyph_data_format: i16,
}

/// `hhea` horizontal header table
///
/// > This table contains information for horizontal layout.
///
/// <https://docs.microsoft.com/en-us/typography/opentype/spec/hhea>
///
/// This struct is also used for the `vhea` table, in which case `ascender` and `descender` are
/// the vertical typo line values and `num_h_metrics` is `numOfLongVerMetrics`.
#[derive(Debug, Clone, PartialEq, PartialOrd, Hash)]
pub struct HheaTable {
    pub version: u32,
    pub ascender: i16,
    pub descender: i16,
    pub line_gap: i16,
    pub advance_width_max: u16,
    pub min_left_side_bearing: i16,
    pub min_right_side_bearing: i16,
    pub x_max_extent: i16,
    pub caret_slope_rise: i16,
    pub caret_slope_run: i16,
    pub caret_offset: i16,
    pub num_h_metrics: u16,
}

/// `hmtx` horizontal metrics table
///
/// <https://docs.microsoft.com/en-us/typography/opentype/spec/hmtx>
///
/// This struct is also used for `vmtx` table. Any bytes following the long metrics are treated
/// as the bearing array, however many there are.
#[derive(Debug)]
pub struct HmtxTable<'a> {
    pub h_metrics: ReadArray<'a, LongHorMetric>,
    pub left_side_bearings: ReadArray<'a, I16Be>,
}

/// A `longHorMetric` record in the `hmtx` table.
///
/// This struct is also used for LongVerMetric `vmtx` table.
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct LongHorMetric {
    pub advance_width: u16,
    pub lsb: i16,
}

/// maxp - Maximum profile
///
/// Fonts with CFF data must use Version 0.5 of this table, specifying only the numGlyphs field.
/// Fonts with TrueType outlines must use Version 1.0 of this table, where all data is required.
///
/// <https://docs.microsoft.com/en-us/typography/opentype/spec/maxp>
#[derive(Debug, Clone, PartialEq, PartialOrd, Hash)]
pub struct MaxpTable {
    pub num_glyphs: u16,
    /// Extra fields, present if maxp table is version 1.0, absent if version 0.5.
    pub version1_sub_table: Option<MaxpVersion1SubTable>,
}

#[derive(Debug, Clone, PartialEq, PartialOrd, Hash)]
pub struct MaxpVersion1SubTable {
    pub max_points: u16,
    pub max_contours: u16,
    pub max_composite_points: u16,
    pub max_composite_contours: u16,
    pub max_zones: u16,
    pub max_twilight_points: u16,
    pub max_storage: u16,
    pub max_function_defs: u16,
    pub max_instruction_defs: u16,
    pub max_stack_elements: u16,
    pub max_size_of_instructions: u16,
    pub max_component_elements: u16,
    pub max_component_depth: u16,
}

/// `name` table
///
/// <https://docs.microsoft.com/en-us/typography/opentype/spec/name>
pub struct NameTable<'a> {
    pub format: u16,
    pub string_storage: ReadScope<'a>,
    pub name_records: ReadArray<'a, NameRecord>,
    pub opt_langtag_records: Option<ReadArray<'a, LangTagRecord>>,
}

/// Record within the `name` table
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NameRecord {
    pub platform_id: u16,
    pub encoding_id: u16,
    pub language_id: u16,
    pub name_id: u16,
    pub length: u16,
    pub offset: u16,
}

/// Language-tag record within the `name` table
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LangTagRecord {
    pub length: u16,
    pub offset: u16,
}

/// Is `version` one of the sfnt versions that starts a single font?
pub fn is_sfnt_version(version: u32) -> bool {
    matches!(
        version,
        tag::TRUETYPE | tag::OTTO | tag::TRUE | tag::TYP1
    )
}

impl ReadBinary for TtcHeader {
    type HostType<'a> = Self;

    fn read(ctxt: &mut ReadCtxt<'_>) -> Result<Self, ParseError> {
        let ttc_tag = ctxt.read_u32be()?;
        ctxt.check_version(ttc_tag == tag::TTCF)?;
        let major_version = ctxt.read_u16be()?;
        let minor_version = ctxt.read_u16be()?;
        ctxt.check_version(major_version == 1 || major_version == 2)?;
        let num_fonts = usize::try_from(ctxt.read_u32be()?)?;
        let offset_tables = ctxt.read_array::<U32Be>(num_fonts)?.to_vec();
        // The version 2 DSIG fields are not needed to locate fonts
        Ok(TtcHeader {
            major_version,
            minor_version,
            offset_tables,
        })
    }
}

impl TtcHeader {
    /// Size of the fixed part of the header, up to and including `numFonts`.
    pub const FIXED_SIZE: usize = 3 * size::U32;
}

impl ReadBinary for OffsetTable<'_> {
    type HostType<'a> = OffsetTable<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<OffsetTable<'a>, ParseError> {
        let sfnt_version = ctxt.read_u32be()?;
        ctxt.check_version(is_sfnt_version(sfnt_version))?;
        let num_tables = ctxt.read_u16be()?;
        let search_range = ctxt.read_u16be()?;
        let entry_selector = ctxt.read_u16be()?;
        let range_shift = ctxt.read_u16be()?;
        let table_records = ctxt.read_array::<TableRecord>(usize::from(num_tables))?;
        Ok(OffsetTable {
            sfnt_version,
            search_range,
            entry_selector,
            range_shift,
            table_records,
        })
    }
}

impl OffsetTable<'_> {
    /// Size of the header before the table records.
    pub const HEADER_SIZE: usize = size::U32 + 4 * size::U16;
}

impl ReadFrom for TableRecord {
    type ReadType = ((U32Be, U32Be), (U32Be, U32Be));
    fn read_from(((table_tag, checksum), (offset, length)): ((u32, u32), (u32, u32))) -> Self {
        TableRecord {
            table_tag,
            checksum,
            offset,
            length,
        }
    }
}

impl TableRecord {
    pub const SIZE: usize = 4 * size::U32;
}

impl ReadBinary for HeadTable {
    type HostType<'a> = Self;

    fn read(ctxt: &mut ReadCtxt<'_>) -> Result<Self, ParseError> {
        let major_version = ctxt.read::<U16Be>()?;
        let minor_version = ctxt.read::<U16Be>()?;
        let font_revision = ctxt.read::<Fixed>()?;
        let check_sum_adjustment = ctxt.read::<U32Be>()?;
        let magic_number = ctxt.read::<U32Be>()?;
        ctxt.check(magic_number == HEAD_MAGIC)?;
        let flags = ctxt.read::<U16Be>()?;
        let units_per_em = ctxt.read::<U16Be>()?;
        let created = ctxt.read_i64be()?;
        let modified = ctxt.read_i64be()?;
        let x_min = ctxt.read::<I16Be>()?;
        let y_min = ctxt.read::<I16Be>()?;
        let x_max = ctxt.read::<I16Be>()?;
        let y_max = ctxt.read::<I16Be>()?;
        let mac_style = ctxt.read::<U16Be>()?;
        let lowest_rec_ppem = ctxt.read::<U16Be>()?;
        let font_direction_hint = ctxt.read::<I16Be>()?;
        let index_to_loc_format = ctxt.read::<I16Be>()?;
        let glyph_data_format = ctxt.read::<I16Be>()?;

        Ok(HeadTable {
            major_version,
            minor_version,
            font_revision,
            check_sum_adjustment,
            magic_number,
            flags,
            units_per_em,
            created,
            modified,
            x_min,
            y_min,
            x_max,
            y_max,
            mac_style,
            lowest_rec_ppem,
            font_direction_hint,
            index_to_loc_format,
            glyph_data_format,
        })
    }
}

impl HeadTable {
    // macStyle bit 0: Bold, bit 1: Italic
    pub fn is_bold(&self) -> bool {
        self.mac_style & 1 != 0
    }

    pub fn is_italic(&self) -> bool {
        self.mac_style & 2 != 0
    }
}

impl ReadBinaryDep for HheaTable {
    /// `true` when reading `vhea`.
    type Args<'a> = bool;
    type HostType<'a> = Self;

    fn read_dep(ctxt: &mut ReadCtxt<'_>, vertical: bool) -> Result<Self, ParseError> {
        let version = ctxt.read_u32be()?;
        if vertical {
            ctxt.check_version(version == 0x00010000 || version == 0x00011000)?;
        } else {
            ctxt.check_version(version >> 16 == 1)?;
        }
        let ascender = ctxt.read_i16be()?;
        let descender = ctxt.read_i16be()?;
        let line_gap = ctxt.read_i16be()?;
        let advance_width_max = ctxt.read_u16be()?;
        let min_left_side_bearing = ctxt.read_i16be()?;
        let min_right_side_bearing = ctxt.read_i16be()?;
        let x_max_extent = ctxt.read_i16be()?;
        let caret_slope_rise = ctxt.read_i16be()?;
        let caret_slope_run = ctxt.read_i16be()?;
        let caret_offset = ctxt.read_i16be()?;
        let _reserved = ctxt.read_slice(4 * size::I16)?;
        let metric_data_format = ctxt.read_i16be()?;
        ctxt.check(metric_data_format == 0)?;
        let num_h_metrics = ctxt.read_u16be()?;

        Ok(HheaTable {
            version,
            ascender,
            descender,
            line_gap,
            advance_width_max,
            min_left_side_bearing,
            min_right_side_bearing,
            x_max_extent,
            caret_slope_rise,
            caret_slope_run,
            caret_offset,
            num_h_metrics,
        })
    }
}

impl ReadBinaryDep for HmtxTable<'_> {
    type Args<'a> = usize; // num_h_metrics
    type HostType<'a> = HmtxTable<'a>;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        num_h_metrics: usize,
    ) -> Result<HmtxTable<'a>, ParseError> {
        let h_metrics = ctxt.read_array::<LongHorMetric>(num_h_metrics)?;
        let num_bearings = ctxt.remaining() / size::I16;
        let left_side_bearings = ctxt.read_array::<I16Be>(num_bearings)?;
        Ok(HmtxTable {
            h_metrics,
            left_side_bearings,
        })
    }
}

impl HmtxTable<'_> {
    /// Bearing and advance for `glyph_id`.
    ///
    /// Glyphs beyond the long metrics share the last advance and take their bearing from the
    /// trailing array, or 0 when that array is too short.
    pub fn metrics(&self, glyph_id: u16) -> Option<(i16, u16)> {
        let index = usize::from(glyph_id);
        if let Some(metric) = self.h_metrics.get_item(index) {
            return Some((metric.lsb, metric.advance_width));
        }
        let last = self.h_metrics.last()?;
        let bearing = self
            .left_side_bearings
            .get_item(index - self.h_metrics.len())
            .unwrap_or(0);
        Some((bearing, last.advance_width))
    }
}

impl ReadFrom for LongHorMetric {
    type ReadType = (U16Be, I16Be);
    fn read_from((advance_width, lsb): (u16, i16)) -> Self {
        LongHorMetric { advance_width, lsb }
    }
}

impl ReadBinary for MaxpTable {
    type HostType<'a> = Self;

    fn read(ctxt: &mut ReadCtxt<'_>) -> Result<Self, ParseError> {
        let version = ctxt.read_u32be()?;
        let num_glyphs = ctxt.read_u16be()?;
        let sub_table = match version {
            0x00010000 => Some(ctxt.read::<MaxpVersion1SubTable>()?),
            0x00005000 => None,
            _ => return Err(ParseError::BadVersion),
        };
        Ok(MaxpTable {
            num_glyphs,
            version1_sub_table: sub_table,
        })
    }
}

impl ReadBinary for MaxpVersion1SubTable {
    type HostType<'a> = Self;

    fn read(ctxt: &mut ReadCtxt<'_>) -> Result<Self, ParseError> {
        let max_points = ctxt.read_u16be()?;
        let max_contours = ctxt.read_u16be()?;
        let max_composite_points = ctxt.read_u16be()?;
        let max_composite_contours = ctxt.read_u16be()?;
        let max_zones = ctxt.read_u16be()?;
        let max_twilight_points = ctxt.read_u16be()?;
        let max_storage = ctxt.read_u16be()?;
        let max_function_defs = ctxt.read_u16be()?;
        let max_instruction_defs = ctxt.read_u16be()?;
        let max_stack_elements = ctxt.read_u16be()?;
        let max_size_of_instructions = ctxt.read_u16be()?;
        let max_component_elements = ctxt.read_u16be()?;
        let max_component_depth = ctxt.read_u16be()?;

        Ok(MaxpVersion1SubTable {
            max_points,
            max_contours,
            max_composite_points,
            max_composite_contours,
            max_zones,
            max_twilight_points,
            max_storage,
            max_function_defs,
            max_instruction_defs,
            max_stack_elements,
            max_size_of_instructions,
            max_component_elements,
            max_component_depth,
        })
    }
}

impl ReadBinary for NameTable<'_> {
    type HostType<'a> = NameTable<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<NameTable<'a>, ParseError> {
        let scope = ctxt.scope();

        let format = ctxt.read_u16be()?;
        ctxt.check_version(format <= 1)?;
        let count = usize::from(ctxt.read_u16be()?);
        let string_offset = usize::from(ctxt.read_u16be()?);
        let string_storage = scope.offset(string_offset);
        let name_records = ctxt.read_array::<NameRecord>(count)?;
        let opt_langtag_records = if format > 0 {
            let langtag_count = usize::from(ctxt.read_u16be()?);
            let langtag_records = ctxt.read_array::<LangTagRecord>(langtag_count)?;
            Some(langtag_records)
        } else {
            None
        };

        Ok(NameTable {
            format,
            string_storage,
            name_records,
            opt_langtag_records,
        })
    }
}

impl NameRecord {
    /// The bytes of this record's string, if they lie within `storage`.
    pub fn string<'a>(&self, storage: &ReadScope<'a>) -> Result<&'a [u8], ParseError> {
        storage
            .offset_length(usize::from(self.offset), usize::from(self.length))
            .map(|scope| scope.data())
    }
}

impl ReadFrom for NameRecord {
    type ReadType = ((U16Be, U16Be, U16Be), (U16Be, U16Be, U16Be));
    fn read_from(
        ((platform_id, encoding_id, language_id), (name_id, length, offset)): (
            (u16, u16, u16),
            (u16, u16, u16),
        ),
    ) -> Self {
        NameRecord {
            platform_id,
            encoding_id,
            language_id,
            name_id,
            length,
            offset,
        }
    }
}

impl ReadFrom for LangTagRecord {
    type ReadType = (U16Be, U16Be);
    fn read_from((length, offset): (u16, u16)) -> Self {
        LangTagRecord { length, offset }
    }
}

impl Fixed {
    pub fn new(value: i32) -> Fixed {
        Fixed(value)
    }

    pub fn raw_value(self) -> i32 {
        self.0
    }
}

impl ReadFrom for Fixed {
    type ReadType = I32Be;

    fn read_from(value: i32) -> Self {
        Fixed(value)
    }
}

impl From<Fixed> for f32 {
    fn from(value: Fixed) -> f32 {
        (f64::from(value.0) / 65536.0) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::writer::{self, TtfType::*};

    fn head_data(magic: u32) -> Vec<u8> {
        writer::convert(&[
            UInt16(1),
            UInt16(0),
            Int32(0x0001_8000),
            UInt32(0),
            UInt32(magic),
            UInt16(0b1011),
            UInt16(2048),
            Int64(0),
            Int64(0),
            Int16(-100),
            Int16(-200),
            Int16(1000),
            Int16(900),
            UInt16(3),
            UInt16(8),
            Int16(2),
            Int16(1),
            Int16(0),
        ])
    }

    #[test]
    fn read_head() {
        let data = head_data(HEAD_MAGIC);
        let head = ReadScope::new(&data).read::<HeadTable>().unwrap();
        assert_eq!(head.units_per_em, 2048);
        assert_eq!(f32::from(head.font_revision), 1.5);
        assert!(head.is_bold());
        assert!(head.is_italic());
        assert_eq!(head.index_to_loc_format, 1);
    }

    #[test]
    fn head_bad_magic() {
        let data = head_data(0x12345678);
        assert_eq!(
            ReadScope::new(&data).read::<HeadTable>().err(),
            Some(ParseError::BadValue)
        );
    }

    fn hhea_data(version: u32, metric_data_format: i16) -> Vec<u8> {
        let mut fields = vec![UInt32(version), Int16(800), Int16(-200), Int16(0), UInt16(1000)];
        fields.extend(std::iter::repeat(Int16(0)).take(10));
        fields.push(Int16(metric_data_format));
        fields.push(UInt16(3));
        writer::convert(&fields)
    }

    #[test]
    fn read_hhea_and_vhea_versions() {
        let data = hhea_data(0x00010000, 0);
        let hhea = ReadScope::new(&data).read_dep::<HheaTable>(false).unwrap();
        assert_eq!(hhea.ascender, 800);
        assert_eq!(hhea.num_h_metrics, 3);

        let data = hhea_data(0x00011000, 0);
        assert!(ReadScope::new(&data).read_dep::<HheaTable>(true).is_ok());

        let data = hhea_data(0x00012000, 0);
        assert_eq!(
            ReadScope::new(&data).read_dep::<HheaTable>(true).err(),
            Some(ParseError::BadVersion)
        );

        let data = hhea_data(0x00010000, 1);
        assert_eq!(
            ReadScope::new(&data).read_dep::<HheaTable>(false).err(),
            Some(ParseError::BadValue)
        );
    }

    #[test]
    fn hmtx_metrics_beyond_long_metrics() {
        let data = writer::convert(&[
            UInt16(500),
            Int16(10),
            UInt16(600),
            Int16(20),
            Int16(30),
        ]);
        let hmtx = ReadScope::new(&data).read_dep::<HmtxTable<'_>>(2).unwrap();
        assert_eq!(hmtx.metrics(0), Some((10, 500)));
        assert_eq!(hmtx.metrics(1), Some((20, 600)));
        assert_eq!(hmtx.metrics(2), Some((30, 600)));
        // bearing array too short
        assert_eq!(hmtx.metrics(3), Some((0, 600)));
    }

    #[test]
    fn maxp_versions() {
        let data = writer::convert(&[UInt32(0x00005000), UInt16(42)]);
        let maxp = ReadScope::new(&data).read::<MaxpTable>().unwrap();
        assert_eq!(maxp.num_glyphs, 42);
        assert!(maxp.version1_sub_table.is_none());

        let data = writer::convert(&[UInt32(0x00020000), UInt16(42)]);
        assert_eq!(
            ReadScope::new(&data).read::<MaxpTable>().err(),
            Some(ParseError::BadVersion)
        );
    }

    #[test]
    fn ttc_header_versions() {
        let data = writer::convert(&[UInt32(tag::TTCF), UInt16(2), UInt16(0), UInt32(2), UInt32(20), UInt32(40)]);
        let header = ReadScope::new(&data).read::<TtcHeader>().unwrap();
        assert_eq!(header.offset_tables, vec![20, 40]);

        let data = writer::convert(&[UInt32(tag::TTCF), UInt16(3), UInt16(0), UInt32(0)]);
        assert_eq!(
            ReadScope::new(&data).read::<TtcHeader>().err(),
            Some(ParseError::BadVersion)
        );
    }

    #[test]
    fn f32_from_fixed() {
        assert_close(f32::from(Fixed(0x7fff_0000)), 32767.);
        assert_close(f32::from(Fixed(0x0001_0000)), 1.0);
        assert_close(f32::from(Fixed(0x0000_0000)), 0.0);
        assert_close(
            f32::from(Fixed(i32::from_be_bytes([0xff; 4]))),
            -0.000015259,
        );
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < std::f32::EPSILON,
            "{:?} != {:?} ± {}",
            actual,
            expected,
            std::f32::EPSILON
        );
    }
}
