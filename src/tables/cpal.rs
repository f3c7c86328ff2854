#![deny(missing_docs)]

//! `CPAL` table parsing.
//!
//! <https://learn.microsoft.com/en-us/typography/opentype/spec/cpal>

use bitflags::bitflags;

use crate::binary::read::{ReadArray, ReadBinary, ReadCtxt, ReadFrom};
use crate::binary::{U16Be, U32Be, U8};
use crate::error::ParseError;
use crate::SafeFrom;

/// `CPAL` - Color Palette Table
pub struct CpalTable<'a> {
    /// Table version number.
    pub version: u16,
    /// Number of palette entries in each palette.
    num_palette_entries: u16,
    /// Color records for all palettes.
    color_records_array: ReadArray<'a, ColorRecord>,
    /// Index of each palette’s first color record in the combined color record array.
    color_record_indices: ReadArray<'a, U16Be>,
    /// Palette Types Array.
    palette_types_array: Option<ReadArray<'a, U32Be>>,
    /// Palette Labels Array.
    palette_labels_array: Option<ReadArray<'a, U16Be>>,
    /// Palette Entry Labels Array.
    palette_entry_labels_array: Option<ReadArray<'a, U16Be>>,
}

bitflags! {
    /// Flags describing features of a palette.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
    pub struct PaletteFlags: u32 {
        /// Palette is appropriate to use when displaying the font on a light background such as white.
        const USABLE_WITH_LIGHT_BACKGROUND = 0b00000001;
        /// Palette is appropriate to use when displaying the font on a dark background such as black.
        const USABLE_WITH_DARK_BACKGROUND  = 0b00000010;
    }
}

impl<'data> CpalTable<'data> {
    /// Obtain the palette at `index`.
    ///
    /// > The first palette, palette index 0, is the default palette.
    /// > A minimum of one palette must be provided in the `CPAL` table if the table is present.
    /// > Palettes must have a minimum of one color record.
    pub fn palette<'a>(&'a self, index: u16) -> Option<Palette<'a, 'data>> {
        let base_index = self.color_record_indices.get_item(usize::from(index))?;
        Some(Palette {
            cpal: self,
            index,
            base_index,
        })
    }

    /// Number of palettes in the table.
    pub fn num_palettes(&self) -> u16 {
        // NOTE(cast): read from a u16 count
        self.color_record_indices.len() as u16
    }

    /// Number of entries in each palette.
    pub fn num_palette_entries(&self) -> u16 {
        self.num_palette_entries
    }

    /// Id of an entry in the [NameTable][crate::tables::NameTable] that
    /// provides a user-interface associated with each palette entry.
    ///
    /// If the palette entry does not have a label, `None` is returned.
    pub fn entry_label(&self, entry_index: u16) -> Option<u16> {
        // 0xFFFF indicates there is no string for a particular palette entry
        self.palette_entry_labels_array
            .as_ref()
            .and_then(|labels| labels.get_item(usize::from(entry_index)))
            .filter(|name_id| *name_id != 0xFFFF)
    }
}

impl ReadBinary for CpalTable<'_> {
    type HostType<'a> = CpalTable<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, ParseError> {
        let start = ctxt.scope();
        let version = ctxt.read_u16be()?;
        ctxt.check_version(version <= 1)?;
        // Number of palette entries in each palette.
        // Palettes must have a minimum of one color record.
        let num_palette_entries = ctxt.read_u16be()?;
        ctxt.check(num_palette_entries > 0)?;
        let num_palettes = ctxt.read_u16be()?;
        // A minimum of one palette must be provided in the CPAL table if the table is present.
        ctxt.check(num_palettes > 0)?;
        let num_color_records = ctxt.read_u16be()?;
        let color_records_array_offset = ctxt.read_u32be()?;
        // Multiple colorRecordIndices may refer to the same color record, in which case multiple
        // palettes would use the same color records
        let color_record_indices = ctxt.read_array::<U16Be>(usize::from(num_palettes))?;
        let color_records_array = start
            .offset(usize::safe_from(color_records_array_offset))
            .ctxt()
            .read_array(usize::from(num_color_records))?;

        // Every palette must lie within the color record array
        for base_index in color_record_indices.iter() {
            let end = u32::from(base_index) + u32::from(num_palette_entries);
            ctxt.check_index(end <= u32::from(num_color_records))?;
        }

        let (
            palette_types_array_offset,
            palette_labels_array_offset,
            palette_entry_labels_array_offset,
        ) = if version == 1 {
            let palette_types_array_offset = ctxt.read_u32be()?;
            let palette_labels_array_offset = ctxt.read_u32be()?;
            let palette_entry_labels_array_offset = ctxt.read_u32be()?;
            (
                palette_types_array_offset,
                palette_labels_array_offset,
                palette_entry_labels_array_offset,
            )
        } else {
            (0, 0, 0)
        };

        let palette_types_array = (palette_types_array_offset > 0)
            .then(|| {
                start
                    .offset(usize::safe_from(palette_types_array_offset))
                    .ctxt()
                    .read_array(usize::from(num_palettes))
            })
            .transpose()?;
        let palette_labels_array = (palette_labels_array_offset > 0)
            .then(|| {
                start
                    .offset(usize::safe_from(palette_labels_array_offset))
                    .ctxt()
                    .read_array(usize::from(num_palettes))
            })
            .transpose()?;
        let palette_entry_labels_array = (palette_entry_labels_array_offset > 0)
            .then(|| {
                start
                    .offset(usize::safe_from(palette_entry_labels_array_offset))
                    .ctxt()
                    .read_array(usize::from(num_palette_entries))
            })
            .transpose()?;

        Ok(CpalTable {
            version,
            num_palette_entries,
            color_records_array,
            color_record_indices,
            palette_types_array,
            palette_labels_array,
            palette_entry_labels_array,
        })
    }
}

/// A `CPAL` palette.
#[derive(Copy, Clone)]
pub struct Palette<'a, 'data> {
    cpal: &'a CpalTable<'data>,
    /// Palette index of this palette.
    index: u16,
    /// Base index in the first color record in the color record array for this palette.
    base_index: u16,
}

impl<'a, 'data> Palette<'a, 'data> {
    /// Retrieve the color record at `index` in this palette.
    ///
    /// The foreground color index 0xFFFF is not a palette entry and yields `None`.
    pub fn color(&self, index: u16) -> Option<ColorRecord> {
        if index >= self.cpal.num_palette_entries {
            return None;
        }

        let color_index = u32::from(self.base_index) + u32::from(index);
        self.cpal
            .color_records_array
            .get_item(usize::safe_from(color_index))
    }

    /// All the colors of this palette, in entry order.
    pub fn colors(&self) -> Vec<ColorRecord> {
        (0..self.cpal.num_palette_entries)
            .filter_map(|index| self.color(index))
            .collect()
    }

    /// Returns the id of an entry in the [NameTable][crate::tables::NameTable] that
    /// provides a user-interface string for the palette.
    ///
    /// If the palette does not have a label, `None` is returned.
    pub fn label(&self) -> Option<u16> {
        // 0xFFFF indicates there is no string for a particular palette
        self.cpal
            .palette_labels_array
            .as_ref()
            .and_then(|labels| labels.get_item(usize::from(self.index)))
            .filter(|name_id| *name_id != 0xFFFF)
    }

    /// Retrieve the flags for this palette.
    ///
    /// **Note:** The USABLE_WITH_LIGHT_BACKGROUND and USABLE_WITH_DARK_BACKGROUND flags
    /// are not mutually exclusive: they may both be set.
    pub fn flags(&self) -> PaletteFlags {
        self.cpal
            .palette_types_array
            .as_ref()
            .and_then(|types| types.get_item(usize::from(self.index)))
            .map(PaletteFlags::from_bits_truncate)
            .unwrap_or(PaletteFlags::empty())
    }
}

/// A BGRA color record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct ColorRecord {
    /// Blue value (B0).
    pub blue: u8,
    /// Green value (B1).
    pub green: u8,
    /// Red value (B2).
    pub red: u8,
    /// Alpha value (B3).
    pub alpha: u8,
}

impl ColorRecord {
    /// Opaque black.
    pub const BLACK: ColorRecord = ColorRecord::new(0, 0, 0, 0xFF);
    /// Opaque white.
    pub const WHITE: ColorRecord = ColorRecord::new(0xFF, 0xFF, 0xFF, 0xFF);

    /// Construct a color from its components in BGRA order.
    pub const fn new(blue: u8, green: u8, red: u8, alpha: u8) -> Self {
        ColorRecord {
            blue,
            green,
            red,
            alpha,
        }
    }
}

impl ReadFrom for ColorRecord {
    type ReadType = (U8, U8, U8, U8);

    fn read_from((blue, green, red, alpha): (u8, u8, u8, u8)) -> Self {
        ColorRecord {
            blue,
            green,
            red,
            alpha,
        }
    }
}
