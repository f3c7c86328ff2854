//! `fvar` header parsing.
//!
//! Only the counts and record sizes are read. They are enough to validate a named-instance
//! selector.
//!
//! <https://learn.microsoft.com/en-us/typography/opentype/spec/fvar>

use crate::binary::read::{ReadBinary, ReadCtxt};
use crate::error::ParseError;

/// Size of a `VariationAxisRecord` in bytes.
const AXIS_RECORD_SIZE: u16 = 20;

/// Font Variations Table header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FvarHeader {
    pub major_version: u16,
    pub minor_version: u16,
    pub axes_array_offset: u16,
    pub axis_count: u16,
    pub axis_size: u16,
    pub instance_count: u16,
    pub instance_size: u16,
}

impl FvarHeader {
    /// Is the 1-based `named_instance` one of the instances defined in the font?
    pub fn has_instance(&self, named_instance: u16) -> bool {
        (1..=self.instance_count).contains(&named_instance)
    }
}

impl ReadBinary for FvarHeader {
    type HostType<'a> = Self;

    fn read(ctxt: &mut ReadCtxt<'_>) -> Result<Self, ParseError> {
        let major_version = ctxt.read_u16be()?;
        ctxt.check_version(major_version == 1)?;
        let minor_version = ctxt.read_u16be()?;
        let axes_array_offset = ctxt.read_u16be()?;
        let _reserved = ctxt.read_u16be()?;
        let axis_count = ctxt.read_u16be()?;
        let axis_size = ctxt.read_u16be()?;
        ctxt.check(axis_size == AXIS_RECORD_SIZE)?;
        let instance_count = ctxt.read_u16be()?;
        let instance_size = ctxt.read_u16be()?;
        // subfamilyNameID, flags and a Fixed coordinate per axis, then an optional
        // postScriptNameID
        let min_instance_size = 4 + 4 * u32::from(axis_count);
        ctxt.check(
            u32::from(instance_size) == min_instance_size
                || u32::from(instance_size) == min_instance_size + 2,
        )?;

        Ok(FvarHeader {
            major_version,
            minor_version,
            axes_array_offset,
            axis_count,
            axis_size,
            instance_count,
            instance_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::read::ReadScope;
    use crate::tests::fonts::fvar_table;

    #[test]
    fn read_header() {
        let data = fvar_table(3);
        let fvar = ReadScope::new(&data).read::<FvarHeader>().unwrap();
        assert_eq!(fvar.axis_count, 1);
        assert_eq!(fvar.instance_count, 3);
        assert_eq!(fvar.instance_size, 8);
        assert!(!fvar.has_instance(0));
        assert!(fvar.has_instance(3));
        assert!(!fvar.has_instance(4));
    }

    #[test]
    fn bad_instance_size() {
        let mut data = fvar_table(1);
        // instanceSize
        data[14..16].copy_from_slice(&7u16.to_be_bytes());
        assert_eq!(
            ReadScope::new(&data).read::<FvarHeader>(),
            Err(ParseError::BadValue)
        );
    }
}
