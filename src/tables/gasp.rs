//! `gasp` table parsing.
//!
//! <https://learn.microsoft.com/en-us/typography/opentype/spec/gasp>

use bitflags::bitflags;

use crate::binary::read::{ReadBinary, ReadCtxt, ReadFrom};
use crate::binary::U16Be;
use crate::error::ParseError;

/// Grid-fitting And Scan-conversion Procedure table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GaspTable {
    pub version: u16,
    /// Sorted by ascending `range_max_ppem`.
    pub ranges: Vec<GaspRange>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GaspRange {
    /// Upper limit of range, in PPEM
    pub range_max_ppem: u16,
    pub behavior: GaspBehavior,
}

bitflags! {
    /// Flags describing desired rasterizer behavior.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct GaspBehavior: u16 {
        const GRIDFIT = 0x0001;
        const DOGRAY = 0x0002;
        /// Only supported in version 1 tables.
        const SYMMETRIC_GRIDFIT = 0x0004;
        /// Only supported in version 1 tables.
        const SYMMETRIC_SMOOTHING = 0x0008;
    }
}

impl GaspTable {
    /// The behavior for text rendered at `ppem`.
    ///
    /// Sizes above the last range get no flags.
    pub fn behavior(&self, ppem: u16) -> GaspBehavior {
        self.ranges
            .iter()
            .find(|range| ppem <= range.range_max_ppem)
            .map_or(GaspBehavior::empty(), |range| range.behavior)
    }
}

impl ReadBinary for GaspTable {
    type HostType<'a> = Self;

    fn read(ctxt: &mut ReadCtxt<'_>) -> Result<Self, ParseError> {
        let version = ctxt.read_u16be()?;
        ctxt.check_version(version <= 1)?;
        let num_ranges = ctxt.read_u16be()?;
        let ranges = ctxt
            .read_array::<GaspRange>(usize::from(num_ranges))?
            .to_vec();
        let sorted = ranges
            .windows(2)
            .all(|pair| pair[0].range_max_ppem < pair[1].range_max_ppem);
        ctxt.check(sorted)?;

        Ok(GaspTable { version, ranges })
    }
}

impl ReadFrom for GaspRange {
    type ReadType = (U16Be, U16Be);

    fn read_from((range_max_ppem, behavior): (u16, u16)) -> Self {
        GaspRange {
            range_max_ppem,
            behavior: GaspBehavior::from_bits_truncate(behavior),
        }
    }
}
