//! `post` table parsing.
//!
//! <https://docs.microsoft.com/en-us/typography/opentype/spec/post>

use crate::binary::read::{ReadArray, ReadBinary, ReadCtxt};
use crate::binary::{I8, U16Be};
use crate::error::ParseError;
use crate::tables::Fixed;
use std::str;

pub const VERSION_1: i32 = 0x00010000;
pub const VERSION_2: i32 = 0x00020000;
pub const VERSION_2_5: i32 = 0x00025000;
pub const VERSION_3: i32 = 0x00030000;

/// Name used for glyphs that have no name of their own.
pub const NOTDEF: &str = ".notdef";

/// The fixed 32-byte header of the `post` table.
#[derive(Debug, Clone, PartialEq)]
pub struct PostHeader {
    pub version: i32,
    pub italic_angle: Fixed,
    pub underline_position: i16,
    pub underline_thickness: i16,
    pub is_fixed_pitch: u32,
    pub min_mem_type_42: u32,
    pub max_mem_type_42: u32,
    pub min_mem_type_1: u32,
    pub max_mem_type_1: u32,
}

pub struct PostTable<'a> {
    pub header: PostHeader,
    pub opt_sub_table: Option<SubTable<'a>>,
}

pub enum SubTable<'a> {
    /// Version 2.0: indices into the standard Macintosh names or the table's own strings.
    Names {
        num_glyphs: u16,
        glyph_name_index: ReadArray<'a, U16Be>,
        names: Vec<PascalString<'a>>,
    },
    /// Version 2.5: offsets from each glyph ID to its index in the standard Macintosh names.
    Offsets { offsets: ReadArray<'a, I8> },
}

pub struct PascalString<'a> {
    pub bytes: &'a [u8],
}

impl ReadBinary for PostHeader {
    type HostType<'a> = Self;

    fn read(ctxt: &mut ReadCtxt<'_>) -> Result<Self, ParseError> {
        let version = ctxt.read_i32be()?;
        ctxt.check_version(matches!(
            version,
            VERSION_1 | VERSION_2 | VERSION_2_5 | VERSION_3
        ))?;
        let italic_angle = ctxt.read::<Fixed>()?;
        let underline_position = ctxt.read_i16be()?;
        let underline_thickness = ctxt.read_i16be()?;
        let is_fixed_pitch = ctxt.read_u32be()?;
        let min_mem_type_42 = ctxt.read_u32be()?;
        let max_mem_type_42 = ctxt.read_u32be()?;
        let min_mem_type_1 = ctxt.read_u32be()?;
        let max_mem_type_1 = ctxt.read_u32be()?;

        Ok(PostHeader {
            version,
            italic_angle,
            underline_position,
            underline_thickness,
            is_fixed_pitch,
            min_mem_type_42,
            max_mem_type_42,
            min_mem_type_1,
            max_mem_type_1,
        })
    }
}

impl ReadBinary for PostTable<'_> {
    type HostType<'a> = PostTable<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<PostTable<'a>, ParseError> {
        let header = ctxt.read::<PostHeader>()?;
        let opt_sub_table = match header.version {
            VERSION_2 => {
                // May include some Format 1 glyphs
                let num_glyphs = ctxt.read_u16be()?;
                let glyph_name_index = ctxt.read_array::<U16Be>(usize::from(num_glyphs))?;

                // Names are stored in order, so the count is one past the highest index used
                let num_names = glyph_name_index
                    .iter()
                    .filter_map(|index| usize::from(index).checked_sub(FORMAT_1_NAMES.len()))
                    .max()
                    .map_or(0, |max| max + 1);
                let mut names = Vec::with_capacity(num_names);

                for _ in 0..num_names {
                    let length = ctxt.read_u8()?;
                    let bytes = ctxt.read_slice(usize::from(length))?;
                    names.push(PascalString { bytes });
                }

                Some(SubTable::Names {
                    num_glyphs,
                    glyph_name_index,
                    names,
                })
            }
            VERSION_2_5 => {
                let num_glyphs = ctxt.read_u16be()?;
                let offsets = ctxt.read_array::<I8>(usize::from(num_glyphs))?;
                Some(SubTable::Offsets { offsets })
            }
            _ => None,
        };

        Ok(PostTable {
            header,
            opt_sub_table,
        })
    }
}

impl<'a> PostTable<'a> {
    /// The name of `glyph_index`, or `None` if the table does not name it.
    pub fn glyph_name(&self, glyph_index: u16) -> Result<Option<&'a str>, ParseError> {
        let index = usize::from(glyph_index);
        match (&self.header.version, &self.opt_sub_table) {
            (&VERSION_1, _) => Ok(FORMAT_1_NAMES.get(index).copied()),
            (
                &VERSION_2,
                Some(SubTable::Names {
                    num_glyphs,
                    glyph_name_index,
                    names,
                }),
            ) => {
                if glyph_index >= *num_glyphs {
                    return Ok(None);
                }
                let name_index = glyph_name_index
                    .get_item(index)
                    .map(usize::from)
                    .ok_or(ParseError::BadIndex)?;
                match name_index.checked_sub(FORMAT_1_NAMES.len()) {
                    None => Ok(Some(FORMAT_1_NAMES[name_index])),
                    Some(i) => {
                        let pascal_string = names.get(i).ok_or(ParseError::BadIndex)?;
                        str::from_utf8(pascal_string.bytes)
                            .map(Some)
                            .map_err(|_| ParseError::BadValue)
                    }
                }
            }
            (&VERSION_2_5, Some(SubTable::Offsets { offsets })) => {
                let offset = match offsets.get_item(index) {
                    Some(offset) => offset,
                    None => return Ok(None),
                };
                let name_index = i32::from(glyph_index) + i32::from(offset);
                let name_index = usize::try_from(name_index).map_err(|_| ParseError::BadIndex)?;
                FORMAT_1_NAMES
                    .get(name_index)
                    .copied()
                    .map(Some)
                    .ok_or(ParseError::BadIndex)
            }
            (&VERSION_2, None) | (&VERSION_2_5, None) => Err(ParseError::BadValue),
            _ => Ok(None),
        }
    }

    /// Names for glyphs `0..num_glyphs`, using `NOTDEF` for unnamed glyphs.
    pub fn glyph_names(&self, num_glyphs: u16) -> Result<Vec<String>, ParseError> {
        (0..num_glyphs)
            .map(|glyph_index| {
                self.glyph_name(glyph_index)
                    .map(|name| name.unwrap_or(NOTDEF).to_string())
            })
            .collect()
    }
}

static FORMAT_1_NAMES: &[&str; 258] = &[
    ".notdef",
    ".null",
    "nonmarkingreturn",
    "space",
    "exclam",
    "quotedbl",
    "numbersign",
    "dollar",
    "percent",
    "ampersand",
    "quotesingle",
    "parenleft",
    "parenright",
    "asterisk",
    "plus",
    "comma",
    "hyphen",
    "period",
    "slash",
    "zero",
    "one",
    "two",
    "three",
    "four",
    "five",
    "six",
    "seven",
    "eight",
    "nine",
    "colon",
    "semicolon",
    "less",
    "equal",
    "greater",
    "question",
    "at",
    "A",
    "B",
    "C",
    "D",
    "E",
    "F",
    "G",
    "H",
    "I",
    "J",
    "K",
    "L",
    "M",
    "N",
    "O",
    "P",
    "Q",
    "R",
    "S",
    "T",
    "U",
    "V",
    "W",
    "X",
    "Y",
    "Z",
    "bracketleft",
    "backslash",
    "bracketright",
    "asciicircum",
    "underscore",
    "grave",
    "a",
    "b",
    "c",
    "d",
    "e",
    "f",
    "g",
    "h",
    "i",
    "j",
    "k",
    "l",
    "m",
    "n",
    "o",
    "p",
    "q",
    "r",
    "s",
    "t",
    "u",
    "v",
    "w",
    "x",
    "y",
    "z",
    "braceleft",
    "bar",
    "braceright",
    "asciitilde",
    "Adieresis",
    "Aring",
    "Ccedilla",
    "Eacute",
    "Ntilde",
    "Odieresis",
    "Udieresis",
    "aacute",
    "agrave",
    "acircumflex",
    "adieresis",
    "atilde",
    "aring",
    "ccedilla",
    "eacute",
    "egrave",
    "ecircumflex",
    "edieresis",
    "iacute",
    "igrave",
    "icircumflex",
    "idieresis",
    "ntilde",
    "oacute",
    "ograve",
    "ocircumflex",
    "odieresis",
    "otilde",
    "uacute",
    "ugrave",
    "ucircumflex",
    "udieresis",
    "dagger",
    "degree",
    "cent",
    "sterling",
    "section",
    "bullet",
    "paragraph",
    "germandbls",
    "registered",
    "copyright",
    "trademark",
    "acute",
    "dieresis",
    "notequal",
    "AE",
    "Oslash",
    "infinity",
    "plusminus",
    "lessequal",
    "greaterequal",
    "yen",
    "mu",
    "partialdiff",
    "summation",
    "product",
    "pi",
    "integral",
    "ordfeminine",
    "ordmasculine",
    "Omega",
    "ae",
    "oslash",
    "questiondown",
    "exclamdown",
    "logicalnot",
    "radical",
    "florin",
    "approxequal",
    "Delta",
    "guillemotleft",
    "guillemotright",
    "ellipsis",
    "nonbreakingspace",
    "Agrave",
    "Atilde",
    "Otilde",
    "OE",
    "oe",
    "endash",
    "emdash",
    "quotedblleft",
    "quotedblright",
    "quoteleft",
    "quoteright",
    "divide",
    "lozenge",
    "ydieresis",
    "Ydieresis",
    "fraction",
    "currency",
    "guilsinglleft",
    "guilsinglright",
    "fi",
    "fl",
    "daggerdbl",
    "periodcentered",
    "quotesinglbase",
    "quotedblbase",
    "perthousand",
    "Acircumflex",
    "Ecircumflex",
    "Aacute",
    "Edieresis",
    "Egrave",
    "Iacute",
    "Icircumflex",
    "Idieresis",
    "Igrave",
    "Oacute",
    "Ocircumflex",
    "apple",
    "Ograve",
    "Uacute",
    "Ucircumflex",
    "Ugrave",
    "dotlessi",
    "circumflex",
    "tilde",
    "macron",
    "breve",
    "dotaccent",
    "ring",
    "cedilla",
    "hungarumlaut",
    "ogonek",
    "caron",
    "Lslash",
    "lslash",
    "Scaron",
    "scaron",
    "Zcaron",
    "zcaron",
    "brokenbar",
    "Eth",
    "eth",
    "Yacute",
    "yacute",
    "Thorn",
    "thorn",
    "minus",
    "multiply",
    "onesuperior",
    "twosuperior",
    "threesuperior",
    "onehalf",
    "onequarter",
    "threequarters",
    "franc",
    "Gbreve",
    "gbreve",
    "Idotaccent",
    "Scedilla",
    "scedilla",
    "Cacute",
    "cacute",
    "Ccaron",
    "ccaron",
    "dcroat",
];
