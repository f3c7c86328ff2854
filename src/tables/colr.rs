//! `COLR` table parsing.
//!
//! Only the version 0 base glyph and layer arrays are used. A version 1 header is accepted, and
//! glyphs that appear solely in its paint graph have no layers here.
//!
//! <https://learn.microsoft.com/en-us/typography/opentype/spec/colr>

use std::fmt;

use crate::binary::read::{ReadArray, ReadBinary, ReadCtxt, ReadFrom};
use crate::binary::U16Be;
use crate::error::ParseError;
use crate::SafeFrom;

/// Palette index that selects the text foreground color rather than a palette entry.
pub const FOREGROUND_PALETTE_INDEX: u16 = 0xFFFF;

/// `COLR` - Color Table
pub struct ColrTable<'a> {
    pub version: u16,
    base_glyph_records: ReadArray<'a, BaseGlyph>,
    layer_records: ReadArray<'a, Layer>,
}

/// A base glyph record, naming the run of layers that draw a color glyph.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BaseGlyph {
    pub glyph_id: u16,
    pub first_layer_index: u16,
    pub num_layers: u16,
}

/// A single layer: a glyph outline filled with one palette entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Layer {
    pub glyph_id: u16,
    /// paletteIndex value of 0xFFFF is a special case, indicating that the text foreground color
    /// (as determined by the application) is to be used.
    pub palette_index: u16,
}

impl<'data> ColrTable<'data> {
    /// Lookup the base glyph record for `glyph_id`.
    ///
    /// Base glyph records are sorted by glyph id.
    pub fn lookup(&self, glyph_id: u16) -> Option<BaseGlyph> {
        self.base_glyph_records
            .binary_search_by(|base| base.glyph_id.cmp(&glyph_id))
            .ok()
            .and_then(|index| self.base_glyph_records.get_item(index))
    }

    /// Retrieve layer `layer_index` of `base_glyph`, counting from the bottom layer.
    pub fn layer(&self, base_glyph: &BaseGlyph, layer_index: u16) -> Result<Layer, ParseError> {
        if layer_index >= base_glyph.num_layers {
            return Err(ParseError::BadIndex);
        }
        let index = usize::from(base_glyph.first_layer_index) + usize::from(layer_index);
        self.layer_records
            .get_item(index)
            .ok_or(ParseError::BadIndex)
    }

    /// All the layers of `base_glyph`, bottom layer first.
    pub fn layers(&self, base_glyph: &BaseGlyph) -> Result<Vec<Layer>, ParseError> {
        (0..base_glyph.num_layers)
            .map(|layer_index| self.layer(base_glyph, layer_index))
            .collect()
    }

    pub fn num_base_glyphs(&self) -> usize {
        self.base_glyph_records.len()
    }

    pub fn num_layers(&self) -> usize {
        self.layer_records.len()
    }
}

impl ReadBinary for ColrTable<'_> {
    type HostType<'a> = ColrTable<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, ParseError> {
        let colr_scope = ctxt.scope();
        let version = ctxt.read_u16be()?;
        ctxt.check_version(version <= 1)?;
        // Number of BaseGlyph records; may be 0 in a version 1 table.
        let num_base_glyph_records = ctxt.read_u16be()?;
        // Offset to baseGlyphRecords array, from beginning of COLR table (may be NULL).
        let base_glyph_records_offset = ctxt.read_u32be()?;
        // Offset to layerRecords array, from beginning of COLR table (may be NULL).
        let layer_records_offset = ctxt.read_u32be()?;
        // Number of Layer records; may be 0 in a version 1 table.
        let num_layer_records = ctxt.read_u16be()?;

        let base_glyph_records = (num_base_glyph_records > 0 && base_glyph_records_offset != 0)
            .then(|| {
                colr_scope
                    .offset(usize::safe_from(base_glyph_records_offset))
                    .ctxt()
                    .read_array::<BaseGlyph>(usize::from(num_base_glyph_records))
            })
            .transpose()?
            .unwrap_or_else(ReadArray::empty);

        let layer_records = (num_layer_records > 0 && layer_records_offset != 0)
            .then(|| {
                colr_scope
                    .offset(usize::safe_from(layer_records_offset))
                    .ctxt()
                    .read_array::<Layer>(usize::from(num_layer_records))
            })
            .transpose()?
            .unwrap_or_else(ReadArray::empty);

        // Every base glyph's layers must lie within the layer array
        for base_glyph in base_glyph_records.iter() {
            let end = usize::from(base_glyph.first_layer_index) + usize::from(base_glyph.num_layers);
            ctxt.check_index(end <= layer_records.len())?;
        }

        Ok(ColrTable {
            version,
            base_glyph_records,
            layer_records,
        })
    }
}

impl ReadFrom for BaseGlyph {
    type ReadType = (U16Be, U16Be, U16Be);

    fn read_from((glyph_id, first_layer_index, num_layers): (u16, u16, u16)) -> Self {
        BaseGlyph {
            glyph_id,
            first_layer_index,
            num_layers,
        }
    }
}

impl ReadFrom for Layer {
    type ReadType = (U16Be, U16Be);

    fn read_from((glyph_id, palette_index): (u16, u16)) -> Self {
        Layer {
            glyph_id,
            palette_index,
        }
    }
}

impl fmt::Debug for ColrTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColrTable")
            .field("version", &self.version)
            .field("base_glyph_records", &self.base_glyph_records)
            .field("layer_records", &self.layer_records)
            .finish()
    }
}
