#![deny(missing_docs)]

//! `kern` table parsing.
//!
//! Both the Microsoft (version 0) and Apple (version 1) headers are understood. Subtable formats
//! 0 and 2 are parsed, other formats are skipped.
//!
//! <https://learn.microsoft.com/en-us/typography/opentype/spec/kern>
//! <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6kern.html>

use log::debug;

use crate::{
    binary::{
        read::{ReadArray, ReadBinary, ReadCtxt, ReadFrom, ReadScope},
        I16Be, U16Be,
    },
    error::ParseError,
};

/// Apple kern table version, as a 16.16 number.
const APPLE_VERSION: u32 = 0x00010000;

/// `kern` Kerning Table.
pub struct KernTable<'a> {
    /// The parsed subtables, in table order. Unsupported formats are absent.
    pub subtables: Vec<KernSubtable<'a>>,
}

/// Kerning data.
pub enum KernData<'a> {
    /// Format 0 kerning data (pairs).
    Format0(KernFormat0<'a>),
    /// Format 2 kerning data (2D array).
    Format2(KernFormat2<'a>),
}

/// Format 0 kerning data (pairs).
pub struct KernFormat0<'a> {
    /// Array of KernPair records.
    kern_pairs: ReadArray<'a, KernPair>,
    /// Whether the pairs are in search key order, permitting a binary search.
    sorted: bool,
}

/// Format 2 kerning data (2D array).
pub struct KernFormat2<'a> {
    left_table: ClassTable<'a>,
    right_table: ClassTable<'a>,
    /// The whole subtable. Class values are byte offsets from its start.
    subtable: ReadScope<'a>,
}

/// Kerning value for glyph pair.
#[derive(Debug, Copy, Clone)]
pub struct KernPair {
    /// The glyph index for the left-hand glyph in the kerning pair.
    left: u16,
    /// The glyph index for the right-hand glyph in the kerning pair.
    right: u16,
    /// The kerning value for the above pair, in font design units. If this value is greater than
    /// zero, the characters will be moved apart. If this value is less than zero, the character
    /// will be moved closer together.
    value: i16,
}

/// Glyph class table.
pub struct ClassTable<'a> {
    /// First glyph in class range.
    first_glyph: u16,
    values: ReadArray<'a, U16Be>,
}

/// Coverage flags of a subtable, normalised across the two header versions.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Coverage {
    /// Table has horizontal data.
    pub horizontal: bool,
    /// Table has minimum values rather than kerning values.
    pub minimum: bool,
    /// Kerning is perpendicular to the flow of the text.
    pub cross_stream: bool,
    /// The values in this table replace the value currently being accumulated.
    pub override_sum: bool,
    /// Apple variation subtable.
    pub variation: bool,
}

/// Sub-table within `kern` table.
pub struct KernSubtable<'a> {
    /// Coverage flags.
    pub coverage: Coverage,
    data: KernData<'a>,
}

impl ReadBinary for KernTable<'_> {
    type HostType<'a> = KernTable<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, ParseError> {
        let version = ctxt.read_u16be()?;
        let apple = match version {
            0 => false,
            1 => {
                let minor = ctxt.read_u16be()?;
                ctxt.check_version((u32::from(version) << 16 | u32::from(minor)) == APPLE_VERSION)?;
                true
            }
            _ => return Err(ParseError::BadVersion),
        };
        let table_count = if apple {
            ctxt.read_u32be()?
        } else {
            u32::from(ctxt.read_u16be()?)
        };
        ctxt.check(table_count > 0)?;

        let mut subtables = Vec::new();
        for _ in 0..table_count {
            let start = ctxt.scope();
            let (length, coverage, format) = if apple {
                let length = usize::try_from(ctxt.read_u32be()?)?;
                let coverage = ctxt.read_u16be()?;
                let _tuple_index = ctxt.read_u16be()?;
                let flags = Coverage {
                    horizontal: coverage & 0x8000 == 0,
                    minimum: false,
                    cross_stream: coverage & 0x4000 != 0,
                    override_sum: false,
                    variation: coverage & 0x2000 != 0,
                };
                (length, flags, coverage & 0xFF)
            } else {
                let version = ctxt.read_u16be()?;
                ctxt.check_version(version == 0)?;
                let length = usize::from(ctxt.read_u16be()?);
                let coverage = ctxt.read_u16be()?;
                let flags = Coverage {
                    horizontal: coverage & 1 != 0,
                    minimum: coverage & (1 << 1) != 0,
                    cross_stream: coverage & (1 << 2) != 0,
                    override_sum: coverage & (1 << 3) != 0,
                    variation: false,
                };
                (length, flags, coverage >> 8)
            };
            let subtable = subtable_scope(&start, length)?;
            let header_size = if apple { 8 } else { 6 };
            let mut body = subtable.offset(header_size).ctxt();
            let data = match format {
                0 => KernData::Format0(read_format0(&mut body)?),
                2 => KernData::Format2(read_format2(&mut body, subtable)?),
                _ => {
                    debug!("skipping kern subtable format {}", format);
                    advance_to(ctxt, &start, length)?;
                    continue;
                }
            };
            advance_to(ctxt, &start, length)?;
            subtables.push(KernSubtable { coverage, data });
        }

        Ok(KernTable { subtables })
    }
}

/// The scope covering a whole subtable that begins at `start`.
fn subtable_scope<'a>(start: &ReadScope<'a>, length: usize) -> Result<ReadScope<'a>, ParseError> {
    // Some Microsoft fonts have a single format 0 subtable whose 16-bit length has overflowed,
    // so a length running past the end of the data is clamped.
    let length = length.min(start.data().len());
    start.offset_length(0, length)
}

/// Move `ctxt`, which is somewhere within the subtable starting at `start`, to its end.
fn advance_to(ctxt: &mut ReadCtxt<'_>, start: &ReadScope<'_>, length: usize) -> Result<(), ParseError> {
    let consumed = ctxt.scope().base() - start.base();
    let length = length.min(start.data().len());
    let rest = length.checked_sub(consumed).ok_or(ParseError::BadOffset)?;
    ctxt.read_slice(rest)?;
    Ok(())
}

// Format 0 is the only subtable format supported by Windows.
fn read_format0<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<KernFormat0<'a>, ParseError> {
    let n_pairs = ctxt.read_u16be()?;
    let _search_range = ctxt.read_u16be()?;
    let _entry_selector = ctxt.read_u16be()?;
    let _range_shift = ctxt.read_u16be()?;
    let kern_pairs = ctxt.read_array::<KernPair>(usize::from(n_pairs))?;

    // The KernPair records must be ordered by combining the left and right values to
    // form an unsigned 32-bit integer (left as the high-order word), then ordering
    // records numerically using these combined values. Not all fonts comply.
    let mut sorted = true;
    let mut previous = None;
    for pair in kern_pairs.iter() {
        let key = pair.search_key();
        if previous.map_or(false, |prev| prev >= key) {
            sorted = false;
            break;
        }
        previous = Some(key);
    }

    Ok(KernFormat0 { kern_pairs, sorted })
}

fn read_format2<'a>(
    ctxt: &mut ReadCtxt<'a>,
    subtable: ReadScope<'a>,
) -> Result<KernFormat2<'a>, ParseError> {
    let _row_width = ctxt.read_u16be()?;
    let left_class_offset = ctxt.read_u16be()?;
    let right_class_offset = ctxt.read_u16be()?;
    let _kerning_array_offset = ctxt.read_u16be()?;

    let left_table = subtable
        .offset(usize::from(left_class_offset))
        .read::<ClassTable<'_>>()?;
    let right_table = subtable
        .offset(usize::from(right_class_offset))
        .read::<ClassTable<'_>>()?;

    Ok(KernFormat2 {
        left_table,
        right_table,
        subtable,
    })
}

impl KernTable<'_> {
    /// Sum the kerning of the pair across the horizontal kerning subtables.
    ///
    /// Returns `None` if no applicable subtable contains the pair.
    pub fn horizontal_kerning(&self, left: u16, right: u16) -> Option<i32> {
        let mut found = false;
        let mut sum = 0i32;
        for subtable in &self.subtables {
            let coverage = subtable.coverage;
            if !coverage.horizontal
                || coverage.minimum
                || coverage.cross_stream
                || coverage.variation
            {
                continue;
            }
            if let Some(value) = subtable.data.lookup(left, right) {
                found = true;
                if coverage.override_sum {
                    sum = i32::from(value);
                } else {
                    sum += i32::from(value);
                }
            }
        }
        found.then_some(sum)
    }
}

impl KernPair {
    fn search_key(&self) -> u32 {
        (u32::from(self.left) << 16) | u32::from(self.right)
    }
}

impl ReadFrom for KernPair {
    type ReadType = (U16Be, U16Be, I16Be);

    fn read_from((left, right, value): (u16, u16, i16)) -> Self {
        KernPair { left, right, value }
    }
}

impl ReadBinary for ClassTable<'_> {
    type HostType<'a> = ClassTable<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, ParseError> {
        let first_glyph = ctxt.read_u16be()?;
        let n_glyphs = ctxt.read_u16be()?;
        let values = ctxt.read_array(usize::from(n_glyphs))?;

        Ok(ClassTable {
            first_glyph,
            values,
        })
    }
}

impl<'a> KernData<'a> {
    /// Lookup the kerning for a pair of glyphs
    pub fn lookup(&self, left: u16, right: u16) -> Option<i16> {
        match self {
            KernData::Format0(x) => {
                let needle = (u32::from(left) << 16) | u32::from(right);
                if x.sorted {
                    x.kern_pairs
                        .binary_search_by(|pair| pair.search_key().cmp(&needle))
                        .ok()
                        .and_then(|index| x.kern_pairs.get_item(index))
                        .map(|pair| pair.value)
                } else {
                    x.kern_pairs
                        .iter()
                        .find(|pair| pair.search_key() == needle)
                        .map(|pair| pair.value)
                }
            }
            KernData::Format2(x) => {
                // Get the class of the left/right glyphs, then lookup the kerning value
                let left_class = x.left_table.get(left)?;
                let right_class = x.right_table.get(right)?;

                // The left class values are pre-multiplied by the row width and include the
                // offset of the kerning array, the right class values are pre-multiplied by the
                // size of a kerning value. Together they are an offset from the subtable start.
                x.subtable
                    .offset(usize::from(left_class) + usize::from(right_class))
                    .read::<I16Be>()
                    .ok()
            }
        }
    }
}

impl ClassTable<'_> {
    fn get(&self, glyph_id: u16) -> Option<u16> {
        let index = glyph_id.checked_sub(self.first_glyph).map(usize::from)?;
        self.values.get_item(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fonts::{kern_table, write_kern_format0};
    use crate::tests::writer::{TtfType::*, Writer};

    #[test]
    fn format0_sorted_and_unsorted() {
        let data = kern_table(&[(1, 2, -50), (1, 3, 20), (4, 1, 7)]);
        let kern = ReadScope::new(&data).read::<KernTable<'_>>().unwrap();
        assert_eq!(kern.horizontal_kerning(1, 3), Some(20));
        assert_eq!(kern.horizontal_kerning(4, 1), Some(7));
        assert_eq!(kern.horizontal_kerning(2, 1), None);

        let data = kern_table(&[(4, 1, 7), (1, 2, -50)]);
        let kern = ReadScope::new(&data).read::<KernTable<'_>>().unwrap();
        assert_eq!(kern.horizontal_kerning(1, 2), Some(-50));
    }

    #[test]
    fn sums_and_overrides() {
        let mut w = Writer::new();
        w.write_all(&[UInt16(0), UInt16(4)]);
        write_kern_format0(&mut w, 0x0001, &[(1, 2, -10)]);
        write_kern_format0(&mut w, 0x0001, &[(1, 2, -5)]);
        // cross-stream and vertical subtables are ignored
        write_kern_format0(&mut w, 0x0005, &[(1, 2, 100)]);
        write_kern_format0(&mut w, 0x0000, &[(1, 2, 100)]);
        let kern = ReadScope::new(&w.data).read::<KernTable<'_>>().unwrap();
        assert_eq!(kern.horizontal_kerning(1, 2), Some(-15));

        let mut w = Writer::new();
        w.write_all(&[UInt16(0), UInt16(2)]);
        write_kern_format0(&mut w, 0x0001, &[(1, 2, -10)]);
        write_kern_format0(&mut w, 0x0009, &[(1, 2, 3)]);
        let kern = ReadScope::new(&w.data).read::<KernTable<'_>>().unwrap();
        assert_eq!(kern.horizontal_kerning(1, 2), Some(3));
    }

    #[test]
    fn apple_format2() {
        let mut w = Writer::new();
        w.write_all(&[UInt32(APPLE_VERSION), UInt32(1)]);
        // subtable header: length, coverage (format 2, horizontal), tuple index
        let length = 8 + 8 + 6 + 6 + 8;
        w.write_all(&[UInt32(length), UInt16(0x0002), UInt16(0)]);
        // rowWidth, left class @16, right class @22, array @28
        w.write_all(&[UInt16(4), UInt16(16), UInt16(22), UInt16(28)]);
        // left classes for glyphs 5..=5: row 1 (offset 28 + 4)
        w.write_all(&[UInt16(5), UInt16(1), UInt16(28 + 4)]);
        // right classes for glyphs 9..=9: column 1
        w.write_all(&[UInt16(9), UInt16(1), UInt16(2)]);
        w.write_all(&[Int16(0), Int16(0), Int16(0), Int16(-33)]);
        let kern = ReadScope::new(&w.data).read::<KernTable<'_>>().unwrap();
        assert_eq!(kern.horizontal_kerning(5, 9), Some(-33));
        assert_eq!(kern.horizontal_kerning(5, 8), None);
    }

    #[test]
    fn empty_table_is_invalid() {
        let data = [0, 0, 0, 0];
        assert_eq!(
            ReadScope::new(&data).read::<KernTable<'_>>().err(),
            Some(ParseError::BadValue)
        );
    }

    #[test]
    fn unknown_format_skipped() {
        let mut w = Writer::new();
        w.write_all(&[UInt16(0), UInt16(2)]);
        w.write_all(&[UInt16(0), UInt16(8), UInt16(0x0301), UInt16(0)]);
        write_kern_format0(&mut w, 0x0001, &[(1, 2, -10)]);
        let kern = ReadScope::new(&w.data).read::<KernTable<'_>>().unwrap();
        assert_eq!(kern.subtables.len(), 1);
        assert_eq!(kern.horizontal_kerning(1, 2), Some(-10));
    }
}
