//! `PCLT` table parsing.
//!
//! <https://learn.microsoft.com/en-us/typography/opentype/spec/pclt>

use crate::binary::read::{ReadBinary, ReadCtxt};
use crate::error::ParseError;

/// PCL 5 Table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcltTable {
    pub version: u32,
    pub font_number: u32,
    pub pitch: u16,
    pub x_height: u16,
    pub style: u16,
    pub type_family: u16,
    pub cap_height: u16,
    pub symbol_set: u16,
    pub typeface: [u8; 16],
    pub character_complement: [u8; 8],
    pub file_name: [u8; 6],
    pub stroke_weight: i8,
    pub width_type: i8,
    pub serif_style: u8,
}

impl PcltTable {
    pub const SIZE: usize = 54;
}

fn read_bytes<const N: usize>(ctxt: &mut ReadCtxt<'_>) -> Result<[u8; N], ParseError> {
    let mut bytes = [0; N];
    bytes.copy_from_slice(ctxt.read_slice(N)?);
    Ok(bytes)
}

impl ReadBinary for PcltTable {
    type HostType<'a> = Self;

    fn read(ctxt: &mut ReadCtxt<'_>) -> Result<Self, ParseError> {
        let version = ctxt.read_u32be()?;
        ctxt.check_version(version == 0x00010000)?;
        let font_number = ctxt.read_u32be()?;
        let pitch = ctxt.read_u16be()?;
        let x_height = ctxt.read_u16be()?;
        let style = ctxt.read_u16be()?;
        let type_family = ctxt.read_u16be()?;
        let cap_height = ctxt.read_u16be()?;
        let symbol_set = ctxt.read_u16be()?;
        let typeface = read_bytes::<16>(ctxt)?;
        let character_complement = read_bytes::<8>(ctxt)?;
        let file_name = read_bytes::<6>(ctxt)?;
        let stroke_weight = ctxt.read_i8()?;
        let width_type = ctxt.read_i8()?;
        let serif_style = ctxt.read_u8()?;
        let _reserved = ctxt.read_u8()?;

        Ok(PcltTable {
            version,
            font_number,
            pitch,
            x_height,
            style,
            type_family,
            cap_height,
            symbol_set,
            typeface,
            character_complement,
            file_name,
            stroke_weight,
            width_type,
            serif_style,
        })
    }
}
