//! Embedded bitmap strikes.
//!
//! The location table (`EBLC`, `CBLC` or `bloc`) is parsed once into owned strikes and ranges.
//! Glyph images are read from the data table on demand through the stream.

pub mod ebdt;
pub mod eblc;

use bitflags::bitflags;
use log::debug;

use crate::access::read_table;
use crate::binary::read::ReadScope;
use crate::error::{ParseError, SfntError};
use crate::face::Face;
use crate::stream::Stream;
use crate::tag::{self, DisplayTag};

use self::eblc::{EblcTable, ImageFormat, RangeIndex, SmallGlyphMetrics};
pub use self::eblc::{BigMetrics, BitDepth, SbitRange, SbitStrike, SbitTables};

/// Composite glyphs may nest at most this deep.
pub const MAX_COMPOSITE_DEPTH: u8 = 8;

/// Total number of components decoded for one glyph, counted across all nesting levels.
pub const MAX_COMPOSITE_COMPONENTS: u32 = 1024;

/// Pairs of location and data tables, in the order they are tried.
const SBIT_TABLES: [(u32, u32); 3] = [
    (tag::EBLC, tag::EBDT),
    (tag::CBLC, tag::CBDT),
    (tag::BLOC, tag::BDAT),
];

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PixelMode {
    /// An empty bitmap.
    #[default]
    None,
    Mono,
    Gray2,
    Gray4,
    Gray,
    /// Premultiplied blue, green, red, alpha.
    Bgra,
}

impl PixelMode {
    pub fn bits_per_pixel(self) -> u32 {
        match self {
            PixelMode::None => 0,
            PixelMode::Mono => 1,
            PixelMode::Gray2 => 2,
            PixelMode::Gray4 => 4,
            PixelMode::Gray => 8,
            PixelMode::Bgra => 32,
        }
    }

    pub fn num_grays(self) -> u16 {
        match self {
            PixelMode::Gray2 => 4,
            PixelMode::Gray4 => 16,
            PixelMode::Gray => 256,
            PixelMode::None | PixelMode::Mono | PixelMode::Bgra => 0,
        }
    }
}

impl From<BitDepth> for PixelMode {
    fn from(bit_depth: BitDepth) -> Self {
        match bit_depth {
            BitDepth::One => PixelMode::Mono,
            BitDepth::Two => PixelMode::Gray2,
            BitDepth::Four => PixelMode::Gray4,
            BitDepth::Eight => PixelMode::Gray,
            BitDepth::ThirtyTwo => PixelMode::Bgra,
        }
    }
}

/// A decoded glyph image. Rows are `pitch` bytes apart, top row first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bitmap {
    pub width: u32,
    pub rows: u32,
    pub pitch: u32,
    pub pixel_mode: PixelMode,
    pub num_grays: u16,
    pub buffer: Vec<u8>,
}

impl Bitmap {
    /// A zero-filled bitmap.
    pub fn new(width: u32, rows: u32, pixel_mode: PixelMode) -> Result<Bitmap, SfntError> {
        let row_bits = u64::from(width) * u64::from(pixel_mode.bits_per_pixel());
        let pitch = u32::try_from((row_bits + 7) / 8)?;
        let len = usize::try_from(u64::from(pitch) * u64::from(rows))?;
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(len)?;
        buffer.resize(len, 0);
        Ok(Bitmap {
            width,
            rows,
            pitch,
            pixel_mode,
            num_grays: pixel_mode.num_grays(),
            buffer,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.rows == 0
    }

    pub fn row(&self, y: u32) -> Option<&[u8]> {
        let pitch = self.pitch as usize;
        let start = y as usize * pitch;
        self.buffer.get(start..start + pitch)
    }
}

bitflags! {
    /// Options for `load_sbit_image`.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
    pub struct LoadFlags: u32 {
        /// Keep color (BGRA) images. Without it they are reduced to their alpha as gray.
        const COLOR = 1 << 0;
        /// Only decode the metrics and return an empty bitmap.
        const METRICS_ONLY = 1 << 1;
    }
}

/// The size a strike is requested for.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SizeRequest {
    Ppem(u16),
    /// A 26.6 point size at `dpi` dots per inch.
    Points { size_26_6: u32, dpi: u32 },
}

impl SizeRequest {
    pub fn ppem(self) -> Result<u16, SfntError> {
        let ppem = match self {
            SizeRequest::Ppem(ppem) => u64::from(ppem),
            SizeRequest::Points { size_26_6, dpi } => {
                (u64::from(size_26_6) * u64::from(dpi) + 72 * 32) / (72 * 64)
            }
        };
        match u16::try_from(ppem) {
            Ok(0) | Err(_) => Err(SfntError::InvalidArgument),
            Ok(ppem) => Ok(ppem),
        }
    }
}

/// Which strike wins when two are the same distance from the requested size.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum TieBreak {
    #[default]
    PreferLarger,
    PreferSmaller,
}

/// How `set_sbit_strike` matches a requested size.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct StrikeMatch {
    pub tie_break: TieBreak,
    /// Fail unless a strike has exactly the requested y ppem.
    pub exact_only: bool,
}

/// Size metrics of a strike in 26.6 units. The scales are 16.16 and need the `head` table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct SizeMetrics {
    pub x_ppem: u16,
    pub y_ppem: u16,
    pub x_scale: Option<i64>,
    pub y_scale: Option<i64>,
    pub ascender: i32,
    pub descender: i32,
    pub height: i32,
    pub max_advance: i32,
}

/// Where a glyph's record is in the data table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SbitLocation {
    /// Index into the strike's ranges.
    pub range_index: usize,
    /// Offset from the start of the data table.
    pub glyph_offset: u64,
    pub glyph_size: u64,
}

/// Load the bitmap location table and note where its data table is.
pub fn load_eblc(face: &mut Face, stream: &mut dyn Stream) -> Result<(), SfntError> {
    let (location_tag, data_tag) = SBIT_TABLES
        .iter()
        .copied()
        .find(|&(location_tag, _)| face.directory.contains(location_tag))
        .ok_or(SfntError::TableMissing(tag::EBLC))?;

    let data = read_table(face, stream, location_tag)?;
    let table = ReadScope::new(&data).read::<EblcTable>()?;
    let data_entry = face.directory.find(data_tag)?;

    debug!(
        "'{}' has {} strikes, data in '{}'",
        DisplayTag(location_tag),
        table.strikes.len(),
        DisplayTag(data_tag)
    );
    face.sbit = Some(SbitTables {
        major_version: table.major_version,
        minor_version: table.minor_version,
        location_tag,
        data_tag,
        data_offset: data_entry.offset,
        data_length: data_entry.length,
        strikes: table.strikes,
    });
    Ok(())
}

pub fn free_eblc(face: &mut Face) {
    face.sbit = None;
}

fn sbit_tables(face: &Face) -> Result<&SbitTables, SfntError> {
    face.sbit.as_ref().ok_or(SfntError::TableMissing(tag::EBLC))
}

/// Choose the strike to use for `request`.
///
/// An exact y ppem match wins, otherwise the nearest strike, with ties settled by
/// `policy.tie_break` and then by the lower strike index.
pub fn set_sbit_strike(
    face: &Face,
    request: SizeRequest,
    policy: StrikeMatch,
) -> Result<usize, SfntError> {
    let tables = sbit_tables(face)?;
    if tables.strikes.is_empty() {
        return Err(SfntError::TableMissing(tables.location_tag));
    }
    let target = i32::from(request.ppem()?);

    let exact = tables
        .strikes
        .iter()
        .position(|strike| i32::from(strike.ppem_y) == target);
    let index = match exact {
        Some(index) => index,
        None if policy.exact_only => return Err(SfntError::InvalidArgument),
        None => {
            let rank = |strike: &SbitStrike| {
                let diff = i32::from(strike.ppem_y) - target;
                let preferred = match policy.tie_break {
                    TieBreak::PreferLarger => diff > 0,
                    TieBreak::PreferSmaller => diff < 0,
                };
                (diff.abs(), !preferred)
            };
            tables
                .strikes
                .iter()
                .enumerate()
                .min_by_key(|&(index, strike)| (rank(strike), index))
                .map(|(index, _)| index)
                .ok_or(SfntError::TableMissing(tables.location_tag))?
        }
    };

    debug!(
        "strike {} ({} ppem) selected for {} ppem",
        index, tables.strikes[index].ppem_y, target
    );
    Ok(index)
}

pub fn load_strike_metrics(face: &Face, strike_index: usize) -> Result<SizeMetrics, SfntError> {
    let tables = sbit_tables(face)?;
    let strike = tables
        .strikes
        .get(strike_index)
        .ok_or(SfntError::InvalidArgument)?;
    let hori = &strike.hori;

    let ascender = i32::from(hori.ascender) * 64;
    let mut descender = i32::from(hori.descender) * 64;
    if descender > 0 {
        descender = -descender;
    }
    let mut height = ascender - descender;
    if height == 0 {
        height = i32::from(strike.ppem_y) * 64;
        descender = ascender - height;
    }
    let max_advance = (i32::from(hori.min_origin_sb)
        + i32::from(hori.width_max)
        + i32::from(hori.min_advance_sb))
        * 64;

    let scale = |ppem: u8| {
        face.units_per_em()
            .filter(|&units_per_em| units_per_em != 0)
            .map(|units_per_em| i64::from(ppem) * 64 * 65536 / i64::from(units_per_em))
    };

    Ok(SizeMetrics {
        x_ppem: u16::from(strike.ppem_x),
        y_ppem: u16::from(strike.ppem_y),
        x_scale: scale(strike.ppem_x),
        y_scale: scale(strike.ppem_y),
        ascender,
        descender,
        height,
        max_advance,
    })
}

/// Locate the data-table record of `glyph` in strike `strike_index`.
pub fn find_sbit_image(
    face: &Face,
    glyph: u16,
    strike_index: usize,
) -> Result<SbitLocation, SfntError> {
    locate(sbit_tables(face)?, glyph, strike_index)
}

fn locate(tables: &SbitTables, glyph: u16, strike_index: usize) -> Result<SbitLocation, SfntError> {
    let strike = tables
        .strikes
        .get(strike_index)
        .ok_or(SfntError::InvalidArgument)?;
    let range_index = strike.find_range(glyph).ok_or(SfntError::InvalidArgument)?;
    let range = &strike.ranges[range_index];
    let index = glyph - range.first_glyph;

    let (start, end) = match &range.index {
        RangeIndex::Offsets(offsets) => {
            let index = usize::from(index);
            match (offsets.get(index), offsets.get(index + 1)) {
                (Some(&start), Some(&end)) => (u64::from(start), u64::from(end)),
                _ => return Err(ParseError::BadIndex.into()),
            }
        }
        RangeIndex::Constant { image_size, .. } => {
            let start = u64::from(*image_size) * u64::from(index);
            (start, start + u64::from(*image_size))
        }
        RangeIndex::Sparse(pairs) => {
            // The last pair only marks the end of the data
            let glyphs = &pairs[..pairs.len().saturating_sub(1)];
            let position = glyphs
                .binary_search_by_key(&glyph, |&(glyph_id, _)| glyph_id)
                .map_err(|_| SfntError::InvalidArgument)?;
            (u64::from(pairs[position].1), u64::from(pairs[position + 1].1))
        }
        RangeIndex::SparseConstant {
            image_size,
            glyph_codes,
            ..
        } => {
            let position = glyph_codes
                .binary_search(&glyph)
                .map_err(|_| SfntError::InvalidArgument)?;
            let start = u64::from(*image_size) * position as u64;
            (start, start + u64::from(*image_size))
        }
    };

    if end < start {
        return Err(ParseError::BadOffset.into());
    }
    if end == start {
        return Err(SfntError::InvalidArgument);
    }
    let glyph_offset = u64::from(range.image_offset) + start;
    let glyph_size = end - start;
    if glyph_offset + glyph_size > tables.data_length {
        return Err(ParseError::BadOffset.into());
    }

    Ok(SbitLocation {
        range_index,
        glyph_offset,
        glyph_size,
    })
}

/// Read the metrics header of the glyph record at `data_start`.
///
/// Returns the metrics and the position of the image data that follows them, where the stream
/// is left.
pub fn load_sbit_metrics(
    stream: &mut dyn Stream,
    strike: &SbitStrike,
    range: &SbitRange,
    data_start: u64,
) -> Result<(BigMetrics, u64), SfntError> {
    stream.seek(data_start)?;
    let metrics = match range.image_format {
        ImageFormat::Format1
        | ImageFormat::Format2
        | ImageFormat::Format8
        | ImageFormat::Format17 => {
            let mut header = [0; 5];
            stream.read(&mut header)?;
            let small = ReadScope::new(&header).read::<SmallGlyphMetrics>()?;
            if range.image_format == ImageFormat::Format8 {
                let mut pad = [0; 1];
                stream.read(&mut pad)?;
            }
            expand_small_metrics(small, strike.flags)
        }
        ImageFormat::Format6
        | ImageFormat::Format7
        | ImageFormat::Format9
        | ImageFormat::Format18 => {
            let mut header = [0; 8];
            stream.read(&mut header)?;
            ReadScope::new(&header).read::<BigMetrics>()?
        }
        ImageFormat::Format5 | ImageFormat::Format19 => {
            range.metrics().ok_or(ParseError::MissingValue)?
        }
    };
    Ok((metrics, stream.tell()))
}

/// Small metrics fill the direction the strike flags name. The other direction is synthesized
/// from them.
fn expand_small_metrics(small: SmallGlyphMetrics, flags: i8) -> BigMetrics {
    let vertical =
        flags & eblc::HORIZONTAL_METRICS == 0 && flags & eblc::VERTICAL_METRICS != 0;
    let half_width = i8::try_from(small.width / 2).unwrap_or(i8::MAX);
    let height = i8::try_from(small.height).unwrap_or(i8::MAX);
    let mut metrics = BigMetrics::from_small(small);
    if vertical {
        metrics.hori_bearing_x = 0;
        metrics.hori_bearing_y = height;
        metrics.hori_advance = small.width;
    } else {
        metrics.vert_bearing_x = -half_width;
        metrics.vert_bearing_y = 0;
        metrics.vert_advance = small.height;
    }
    metrics
}

/// Decode the image of `glyph` from strike `strike_index`.
pub fn load_sbit_image(
    face: &Face,
    stream: &mut dyn Stream,
    strike_index: usize,
    glyph: u16,
    flags: LoadFlags,
) -> Result<(Bitmap, BigMetrics), SfntError> {
    let mut bitmap = Bitmap::default();
    let metrics = load_sbit_image_into(face, stream, strike_index, glyph, flags, &mut bitmap)?;
    Ok((bitmap, metrics))
}

/// Decode the image of `glyph` into `bitmap`, which is reset first.
pub fn load_sbit_image_into(
    face: &Face,
    stream: &mut dyn Stream,
    strike_index: usize,
    glyph: u16,
    flags: LoadFlags,
    bitmap: &mut Bitmap,
) -> Result<BigMetrics, SfntError> {
    *bitmap = Bitmap::default();
    let tables = sbit_tables(face)?;
    let metrics_only = flags.contains(LoadFlags::METRICS_ONLY);
    let mut components_left = MAX_COMPOSITE_COMPONENTS;
    let (image, metrics) = decode_glyph(
        tables,
        stream,
        strike_index,
        glyph,
        metrics_only,
        0,
        &mut components_left,
    )?;

    *bitmap = if image.pixel_mode == PixelMode::Bgra && !flags.contains(LoadFlags::COLOR) {
        ebdt::alpha_to_gray(&image)?
    } else {
        image
    };
    Ok(metrics)
}

fn decode_glyph(
    tables: &SbitTables,
    stream: &mut dyn Stream,
    strike_index: usize,
    glyph: u16,
    metrics_only: bool,
    depth: u8,
    components_left: &mut u32,
) -> Result<(Bitmap, BigMetrics), SfntError> {
    let location = locate(tables, glyph, strike_index)?;
    let strike = &tables.strikes[strike_index];
    let range = &strike.ranges[location.range_index];
    let data_start = tables.data_offset + location.glyph_offset;

    let (metrics, payload_start) = load_sbit_metrics(stream, strike, range, data_start)?;
    if metrics_only {
        return Ok((Bitmap::default(), metrics));
    }

    let payload_len = location
        .glyph_size
        .checked_sub(payload_start - data_start)
        .ok_or(ParseError::BadEof)?;
    stream.seek(payload_start)?;
    let payload = stream.read_vec(usize::try_from(payload_len)?)?;

    let bitmap = match range.image_format {
        ImageFormat::Format1 | ImageFormat::Format6 => {
            ebdt::byte_aligned(strike.bit_depth, &metrics, &payload)?
        }
        ImageFormat::Format2 | ImageFormat::Format5 | ImageFormat::Format7 => {
            ebdt::bit_aligned(strike.bit_depth, &metrics, &payload)?
        }
        ImageFormat::Format8 | ImageFormat::Format9 => {
            if depth >= MAX_COMPOSITE_DEPTH {
                return Err(ParseError::LimitExceeded.into());
            }
            let components = ebdt::read_components(&payload)?;
            let mut canvas = Bitmap::new(
                u32::from(metrics.width),
                u32::from(metrics.height),
                PixelMode::from(strike.bit_depth),
            )?;
            for component in components {
                *components_left = components_left
                    .checked_sub(1)
                    .ok_or(ParseError::LimitExceeded)?;
                let (image, _) = decode_glyph(
                    tables,
                    stream,
                    strike_index,
                    component.glyph_id,
                    false,
                    depth + 1,
                    components_left,
                )?;
                ebdt::place_component(&mut canvas, &image, component.x_offset, component.y_offset)?;
            }
            canvas
        }
        ImageFormat::Format17 | ImageFormat::Format18 | ImageFormat::Format19 => {
            ebdt::decode_png(&metrics, &payload)?
        }
    };
    Ok((bitmap, metrics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::init_face;
    use crate::face::FaceIndex;
    use crate::loader::load_head;
    use crate::stream::MemoryStream;
    use crate::tests::fonts::{self, StrikeSpec};
    use crate::tests::writer::{self, TtfType::*};

    fn face_with_strikes(strikes: &[StrikeSpec]) -> (Face, MemoryStream<Vec<u8>>) {
        let (eblc, ebdt) = fonts::bitmap_tables(strikes);
        let data = fonts::minimal_font()
            .table(fonts::EBLC, eblc)
            .table(fonts::EBDT, ebdt)
            .build();
        let mut stream = MemoryStream::new(data);
        let mut face = init_face(&mut stream, FaceIndex::new(0)).unwrap();
        load_eblc(&mut face, &mut stream).unwrap();
        (face, stream)
    }

    fn glyph_8x2() -> Vec<u8> {
        fonts::small_glyph(2, 8, 0, 2, 9, &[0b1010_1010, 0b0101_0101])
    }

    fn strikes_at(ppems: &[u8]) -> Vec<StrikeSpec> {
        ppems
            .iter()
            .map(|&ppem| StrikeSpec::new(ppem, 1, 1, vec![glyph_8x2()]))
            .collect()
    }

    #[test]
    fn point_size_to_ppem() {
        let request = SizeRequest::Points {
            size_26_6: 12 * 64,
            dpi: 72,
        };
        assert_eq!(request.ppem().unwrap(), 12);
        let request = SizeRequest::Points {
            size_26_6: 10 * 64,
            dpi: 96,
        };
        assert_eq!(request.ppem().unwrap(), 13);
        assert!(matches!(
            SizeRequest::Ppem(0).ppem(),
            Err(SfntError::InvalidArgument)
        ));
    }

    #[test]
    fn strike_selection() {
        let (face, _) = face_with_strikes(&strikes_at(&[10, 14, 20]));
        let select = |ppem, policy| set_sbit_strike(&face, SizeRequest::Ppem(ppem), policy);
        let prefer_smaller = StrikeMatch {
            tie_break: TieBreak::PreferSmaller,
            exact_only: false,
        };
        let exact = StrikeMatch {
            tie_break: TieBreak::PreferLarger,
            exact_only: true,
        };

        assert_eq!(select(14, StrikeMatch::default()).unwrap(), 1);
        assert_eq!(select(13, StrikeMatch::default()).unwrap(), 1);
        assert_eq!(select(12, StrikeMatch::default()).unwrap(), 1);
        assert_eq!(select(12, prefer_smaller).unwrap(), 0);
        assert_eq!(select(17, StrikeMatch::default()).unwrap(), 2);
        assert_eq!(select(17, prefer_smaller).unwrap(), 1);
        assert_eq!(select(100, StrikeMatch::default()).unwrap(), 2);
        assert_eq!(select(20, exact).unwrap(), 2);
        assert!(matches!(select(12, exact), Err(SfntError::InvalidArgument)));
    }

    #[test]
    fn duplicate_strikes_prefer_lower_index() {
        let (face, _) = face_with_strikes(&strikes_at(&[16, 12, 12]));
        let index = set_sbit_strike(&face, SizeRequest::Ppem(11), StrikeMatch::default());
        assert_eq!(index.unwrap(), 1);
    }

    #[test]
    fn no_strike_tables() {
        let data = fonts::minimal_font().build();
        let mut stream = MemoryStream::new(data);
        let mut face = init_face(&mut stream, FaceIndex::new(0)).unwrap();
        assert!(matches!(
            load_eblc(&mut face, &mut stream),
            Err(SfntError::TableMissing(_))
        ));
        assert!(matches!(
            set_sbit_strike(&face, SizeRequest::Ppem(12), StrikeMatch::default()),
            Err(SfntError::TableMissing(_))
        ));
    }

    #[test]
    fn location_table_without_data_table() {
        let (eblc, _) = fonts::bitmap_tables(&strikes_at(&[12]));
        let data = fonts::minimal_font().table(fonts::EBLC, eblc).build();
        let mut stream = MemoryStream::new(data);
        let mut face = init_face(&mut stream, FaceIndex::new(0)).unwrap();
        assert!(matches!(
            load_eblc(&mut face, &mut stream),
            Err(SfntError::TableMissing(tag::EBDT))
        ));
        assert!(face.sbit_tables().is_none());
    }

    #[test]
    fn strike_metrics() {
        let (mut face, mut stream) = face_with_strikes(&strikes_at(&[12]));
        let metrics = load_strike_metrics(&face, 0).unwrap();
        assert_eq!(metrics.y_ppem, 12);
        assert_eq!(metrics.ascender, 10 * 64);
        assert_eq!(metrics.descender, -2 * 64);
        assert_eq!(metrics.height, 12 * 64);
        assert_eq!(metrics.max_advance, 12 * 64);
        assert_eq!(metrics.y_scale, None);

        load_head(&mut face, &mut stream).unwrap();
        let metrics = load_strike_metrics(&face, 0).unwrap();
        assert_eq!(metrics.y_scale, Some(12 * 64 * 65536 / 1000));
        assert!(matches!(
            load_strike_metrics(&face, 1),
            Err(SfntError::InvalidArgument)
        ));
    }

    #[test]
    fn strike_metrics_zero_height() {
        let mut strike = StrikeSpec::new(12, 1, 1, vec![glyph_8x2()]);
        strike.ascender = 0;
        strike.descender = 0;
        let (face, _) = face_with_strikes(&[strike]);
        let metrics = load_strike_metrics(&face, 0).unwrap();
        assert_eq!(metrics.height, 12 * 64);
        assert_eq!(metrics.descender, -12 * 64);
    }

    #[test]
    fn locate_glyphs() {
        let (face, _) = face_with_strikes(&[StrikeSpec::new(
            12,
            1,
            2,
            vec![glyph_8x2(), Vec::new(), glyph_8x2()],
        )]);
        let location = find_sbit_image(&face, 4, 0).unwrap();
        assert_eq!(location.range_index, 0);
        assert_eq!(location.glyph_size, 7);
        // EBDT header, then the first glyph
        assert_eq!(location.glyph_offset, 4 + 7);

        // Empty glyph
        assert!(matches!(
            find_sbit_image(&face, 3, 0),
            Err(SfntError::InvalidArgument)
        ));
        // Outside every range
        assert!(matches!(
            find_sbit_image(&face, 1, 0),
            Err(SfntError::InvalidArgument)
        ));
        assert!(matches!(
            find_sbit_image(&face, 2, 1),
            Err(SfntError::InvalidArgument)
        ));
    }

    #[test]
    fn decode_mono_image() {
        let (face, mut stream) = face_with_strikes(&strikes_at(&[12]));
        let (bitmap, metrics) =
            load_sbit_image(&face, &mut stream, 0, 1, LoadFlags::empty()).unwrap();
        assert_eq!(metrics.width, 8);
        assert_eq!(metrics.height, 2);
        assert_eq!(metrics.hori_advance, 9);
        assert_eq!(metrics.vert_advance, 2);
        assert_eq!(bitmap.pixel_mode, PixelMode::Mono);
        assert_eq!((bitmap.width, bitmap.rows, bitmap.pitch), (8, 2, 1));
        assert_eq!(bitmap.buffer, vec![0b1010_1010, 0b0101_0101]);

        let (bitmap, metrics) =
            load_sbit_image(&face, &mut stream, 0, 1, LoadFlags::METRICS_ONLY).unwrap();
        assert!(bitmap.is_empty());
        assert_eq!(metrics.width, 8);
    }

    #[test]
    fn decode_resets_bitmap() {
        let (face, mut stream) = face_with_strikes(&strikes_at(&[12]));
        let mut bitmap = Bitmap::new(3, 3, PixelMode::Gray).unwrap();
        let result = load_sbit_image_into(&face, &mut stream, 0, 5, LoadFlags::empty(), &mut bitmap);
        assert!(matches!(result, Err(SfntError::InvalidArgument)));
        assert_eq!(bitmap, Bitmap::default());
    }

    #[test]
    fn decode_bit_aligned_gray() {
        // 3x2 pixels at 4 bits per pixel, packed without row padding
        let glyph = fonts::small_glyph(2, 3, 0, 2, 3, &[0x12, 0x34, 0x56]);
        let mut strike = StrikeSpec::new(12, 2, 1, vec![glyph]);
        strike.bit_depth = 4;
        let (face, mut stream) = face_with_strikes(&[strike]);
        let (bitmap, _) = load_sbit_image(&face, &mut stream, 0, 1, LoadFlags::empty()).unwrap();
        assert_eq!(bitmap.pixel_mode, PixelMode::Gray4);
        assert_eq!(bitmap.num_grays, 16);
        assert_eq!(bitmap.pitch, 2);
        assert_eq!(bitmap.buffer, vec![0x12, 0x30, 0x45, 0x60]);
    }

    #[test]
    fn short_payload() {
        let glyph = fonts::small_glyph(4, 8, 0, 4, 8, &[0xFF]);
        let (face, mut stream) = face_with_strikes(&[StrikeSpec::new(12, 1, 1, vec![glyph])]);
        assert!(matches!(
            load_sbit_image(&face, &mut stream, 0, 1, LoadFlags::empty()),
            Err(SfntError::InvalidFormat(ParseError::BadEof))
        ));
    }

    fn composite(components: &[(u16, i8, i8)]) -> Vec<u8> {
        let mut data = writer::convert(&[
            UInt8(4),
            UInt8(8),
            Int8(0),
            Int8(4),
            UInt8(8),
            UInt8(0),
            UInt16(components.len() as u16),
        ]);
        for &(glyph, x, y) in components {
            data.extend(writer::convert(&[UInt16(glyph), Int8(x), Int8(y)]));
        }
        data
    }

    #[test]
    fn composite_glyphs() {
        let dot = fonts::small_glyph(1, 2, 0, 1, 2, &[0b1100_0000]);
        let glyphs = vec![
            dot,
            composite(&[(1, 0, 0), (1, 3, 2), (1, 6, 3)]),
            composite(&[(1, 7, 0)]),
        ];
        let (face, mut stream) = face_with_format8(StrikeSpec::new(12, 1, 1, Vec::new()), glyphs);

        let (bitmap, metrics) =
            load_sbit_image(&face, &mut stream, 0, 2, LoadFlags::empty()).unwrap();
        assert_eq!((metrics.width, metrics.height), (8, 4));
        assert_eq!(
            bitmap.buffer,
            vec![0b1100_0000, 0, 0b0001_1000, 0b0000_0011]
        );

        // Second component would cover x = 7..9
        assert!(matches!(
            load_sbit_image(&face, &mut stream, 0, 3, LoadFlags::empty()),
            Err(SfntError::InvalidFormat(ParseError::BadValue))
        ));
    }

    #[test]
    fn self_referencing_composite() {
        let (face, mut stream) = face_with_format8(
            StrikeSpec::new(12, 1, 1, Vec::new()),
            vec![
                fonts::small_glyph(1, 2, 0, 1, 2, &[0xC0]),
                composite(&[(2, 0, 0)]),
            ],
        );
        assert!(matches!(
            load_sbit_image(&face, &mut stream, 0, 2, LoadFlags::empty()),
            Err(SfntError::InvalidFormat(ParseError::LimitExceeded))
        ));
    }

    #[test]
    fn composite_fan_out_is_bounded() {
        // 40 copies of a glyph that is itself 40 copies of the dot
        let (face, mut stream) = face_with_format8(
            StrikeSpec::new(12, 1, 1, Vec::new()),
            vec![
                fonts::small_glyph(1, 2, 0, 1, 2, &[0xC0]),
                composite(&[(3, 0, 0); 40]),
                composite(&[(1, 0, 0); 40]),
            ],
        );
        assert!(load_sbit_image(&face, &mut stream, 0, 3, LoadFlags::empty()).is_ok());
        assert!(matches!(
            load_sbit_image(&face, &mut stream, 0, 2, LoadFlags::empty()),
            Err(SfntError::InvalidFormat(ParseError::LimitExceeded))
        ));
    }

    /// Glyph 1 is a format 1 glyph; the following glyphs are format 8 composites.
    fn face_with_format8(
        strike: StrikeSpec,
        glyphs: Vec<Vec<u8>>,
    ) -> (Face, MemoryStream<Vec<u8>>) {
        let mut simple = strike.clone();
        simple.glyphs = vec![glyphs[0].clone()];
        let mut composites = strike;
        composites.image_format = 8;
        composites.first_glyph = 2;
        composites.glyphs = glyphs[1..].to_vec();
        let (face, stream) = face_with_strikes(&[simple, composites]);

        // Merge the second strike's range into the first so both glyphs share a strike
        let mut face = face;
        let tables = face.sbit.as_mut().unwrap();
        let extra = tables.strikes.remove(1);
        tables.strikes[0].ranges.extend(extra.ranges);
        (face, stream)
    }
}
