//! `OS/2` table parsing.

use crate::binary::read::{ReadBinary, ReadCtxt};
use crate::error::ParseError;

/// `OS/2` table
///
/// <https://docs.microsoft.com/en-us/typography/opentype/spec/os2>
#[derive(Debug, Clone, PartialEq)]
pub struct Os2 {
    pub version: u16,
    pub x_avg_char_width: i16,
    pub us_weight_class: u16,
    pub us_width_class: u16,
    pub fs_type: u16,
    pub y_subscript_x_size: i16,
    pub y_subscript_y_size: i16,
    pub y_subscript_x_offset: i16,
    pub y_subscript_y_offset: i16,
    pub y_superscript_x_size: i16,
    pub y_superscript_y_size: i16,
    pub y_superscript_x_offset: i16,
    pub y_superscript_y_offset: i16,
    pub y_strikeout_size: i16,
    pub y_strikeout_position: i16,
    pub s_family_class: i16,
    pub panose: [u8; 10],
    pub ul_unicode_range1: u32,
    pub ul_unicode_range2: u32,
    pub ul_unicode_range3: u32,
    pub ul_unicode_range4: u32,
    pub ach_vend_id: u32, // tag
    pub fs_selection: u16,
    pub us_first_char_index: u16,
    pub us_last_char_index: u16,

    // Note: Documentation for OS/2 version 0 in Apple’s TrueType Reference Manual stops at the
    // usLastCharIndex field and does not include the last five fields of the table as it was
    // defined by Microsoft. Some legacy TrueType fonts may have been built with a shortened
    // version 0 OS/2 table.
    pub s_typo_ascender: Option<i16>,
    pub s_typo_descender: Option<i16>,
    pub s_typo_line_gap: Option<i16>,
    pub us_win_ascent: Option<u16>,
    pub us_win_descent: Option<u16>,
    pub version1: Option<Version1Fields>,
    pub version2to4: Option<Version2to4Fields>,
    pub version5: Option<Version5Fields>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Version1Fields {
    pub ul_code_page_range1: u32,
    pub ul_code_page_range2: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Version2to4Fields {
    pub sx_height: i16,
    pub s_cap_height: i16,
    pub us_default_char: u16,
    pub us_break_char: u16,
    pub us_max_context: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Version5Fields {
    pub us_lower_optical_point_size: u16,
    pub us_upper_optical_point_size: u16,
}

// The format of this table has changed over time. The original TrueType specification had this
// table at 68 bytes long. The first OpenType version had it at 78 bytes long, and the current
// OpenType version is even larger. To determine which kind of table your software is dealing with,
// it's best both to consider the table's version and its size.
impl ReadBinary for Os2 {
    type HostType<'a> = Self;

    fn read(ctxt: &mut ReadCtxt<'_>) -> Result<Self, ParseError> {
        let version = ctxt.read_u16be()?;
        ctxt.check_version(version <= 5)?;
        let x_avg_char_width = ctxt.read_i16be()?;
        let us_weight_class = ctxt.read_u16be()?;
        let us_width_class = ctxt.read_u16be()?;
        let fs_type = ctxt.read_u16be()?;
        let y_subscript_x_size = ctxt.read_i16be()?;
        let y_subscript_y_size = ctxt.read_i16be()?;
        let y_subscript_x_offset = ctxt.read_i16be()?;
        let y_subscript_y_offset = ctxt.read_i16be()?;
        let y_superscript_x_size = ctxt.read_i16be()?;
        let y_superscript_y_size = ctxt.read_i16be()?;
        let y_superscript_x_offset = ctxt.read_i16be()?;
        let y_superscript_y_offset = ctxt.read_i16be()?;
        let y_strikeout_size = ctxt.read_i16be()?;
        let y_strikeout_position = ctxt.read_i16be()?;
        let s_family_class = ctxt.read_i16be()?;
        let mut panose = [0; 10];
        panose.copy_from_slice(ctxt.read_slice(10)?);
        let ul_unicode_range1 = ctxt.read_u32be()?;
        let ul_unicode_range2 = ctxt.read_u32be()?;
        let ul_unicode_range3 = ctxt.read_u32be()?;
        let ul_unicode_range4 = ctxt.read_u32be()?;
        let ach_vend_id = ctxt.read_u32be()?;
        let fs_selection = ctxt.read_u16be()?;
        let us_first_char_index = ctxt.read_u16be()?;
        let us_last_char_index = ctxt.read_u16be()?;

        // A short version 0 table ends here
        let has_typo_fields = version > 0 || ctxt.bytes_available();
        let (s_typo_ascender, s_typo_descender, s_typo_line_gap, us_win_ascent, us_win_descent) =
            if has_typo_fields {
                (
                    Some(ctxt.read_i16be()?),
                    Some(ctxt.read_i16be()?),
                    Some(ctxt.read_i16be()?),
                    Some(ctxt.read_u16be()?),
                    Some(ctxt.read_u16be()?),
                )
            } else {
                (None, None, None, None, None)
            };

        let version1 = if version >= 1 {
            Some(Version1Fields {
                ul_code_page_range1: ctxt.read_u32be()?,
                ul_code_page_range2: ctxt.read_u32be()?,
            })
        } else {
            None
        };

        let version2to4 = if version >= 2 {
            Some(Version2to4Fields {
                sx_height: ctxt.read_i16be()?,
                s_cap_height: ctxt.read_i16be()?,
                us_default_char: ctxt.read_u16be()?,
                us_break_char: ctxt.read_u16be()?,
                us_max_context: ctxt.read_u16be()?,
            })
        } else {
            None
        };

        let version5 = if version >= 5 {
            Some(Version5Fields {
                us_lower_optical_point_size: ctxt.read_u16be()?,
                us_upper_optical_point_size: ctxt.read_u16be()?,
            })
        } else {
            None
        };

        Ok(Os2 {
            version,
            x_avg_char_width,
            us_weight_class,
            us_width_class,
            fs_type,
            y_subscript_x_size,
            y_subscript_y_size,
            y_subscript_x_offset,
            y_subscript_y_offset,
            y_superscript_x_size,
            y_superscript_y_size,
            y_superscript_x_offset,
            y_superscript_y_offset,
            y_strikeout_size,
            y_strikeout_position,
            s_family_class,
            panose,
            ul_unicode_range1,
            ul_unicode_range2,
            ul_unicode_range3,
            ul_unicode_range4,
            ach_vend_id,
            fs_selection,
            us_first_char_index,
            us_last_char_index,
            s_typo_ascender,
            s_typo_descender,
            s_typo_line_gap,
            us_win_ascent,
            us_win_descent,
            version1,
            version2to4,
            version5,
        })
    }
}
