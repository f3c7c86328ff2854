//! Color glyphs: `COLR` layers, `CPAL` palettes, and blending layers into a BGRA bitmap.

use ouroboros::self_referencing;

use crate::access::read_table;
use crate::binary::read::ReadScope;
use crate::bitmap::{Bitmap, PixelMode};
use crate::error::{ParseError, SfntError};
use crate::face::Face;
use crate::stream::Stream;
use crate::tables::colr::{ColrTable, FOREGROUND_PALETTE_INDEX};
use crate::tables::cpal::{ColorRecord, CpalTable, PaletteFlags};
use crate::tag;

#[self_referencing]
pub(crate) struct ColrData {
    data: Box<[u8]>,
    #[borrows(data)]
    #[not_covariant]
    pub(crate) table: ColrTable<'this>,
}

#[self_referencing]
pub(crate) struct CpalData {
    data: Box<[u8]>,
    #[borrows(data)]
    #[not_covariant]
    pub(crate) table: CpalTable<'this>,
}

/// The loaded `COLR` and `CPAL` tables and the working copy of the selected palette.
pub struct ColorState {
    colr: ColrData,
    cpal: CpalData,
    palette_index: u16,
    palette: Vec<ColorRecord>,
}

impl ColorState {
    pub fn palette_index(&self) -> u16 {
        self.palette_index
    }

    pub fn palette(&self) -> &[ColorRecord] {
        &self.palette
    }
}

/// One layer of a color glyph.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ColorLayer {
    pub glyph_id: u16,
    /// Palette entry, or 0xFFFF for the foreground color.
    pub color_index: u16,
}

/// A bitmap positioned relative to the glyph origin. `top` is the y coordinate of the top row,
/// with y increasing upwards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GlyphSlot {
    pub bitmap: Bitmap,
    pub left: i32,
    pub top: i32,
}

/// Descriptive data from `CPAL`. Name ids are `None` where the palette or entry has no label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteData {
    pub num_palettes: u16,
    pub palette_name_ids: Vec<Option<u16>>,
    pub palette_flags: Vec<PaletteFlags>,
    pub num_palette_entries: u16,
    pub palette_entry_name_ids: Vec<Option<u16>>,
}

/// Load `COLR` and `CPAL` and select palette 0.
pub fn load_colr(face: &mut Face, stream: &mut dyn Stream) -> Result<(), SfntError> {
    let colr_data = read_table(face, stream, tag::COLR)?;
    let cpal_data = read_table(face, stream, tag::CPAL)?;

    let colr = ColrDataTryBuilder {
        data: colr_data,
        table_builder: |data| ReadScope::new(data).read::<ColrTable<'_>>(),
    }
    .try_build()?;
    let cpal = CpalDataTryBuilder {
        data: cpal_data,
        table_builder: |data| ReadScope::new(data).read::<CpalTable<'_>>(),
    }
    .try_build()?;

    let palette = cpal
        .with_table(|cpal| cpal.palette(0).map(|palette| palette.colors()))
        .ok_or(ParseError::MissingValue)?;

    face.color = Some(ColorState {
        colr,
        cpal,
        palette_index: 0,
        palette,
    });
    Ok(())
}

/// Release the color tables and palette state.
pub fn free_colr(face: &mut Face) {
    face.color = None;
    face.foreground_color = None;
}

fn color_state(face: &Face) -> Result<&ColorState, SfntError> {
    face.color.as_ref().ok_or(SfntError::TableMissing(tag::COLR))
}

fn color_state_mut(face: &mut Face) -> Result<&mut ColorState, SfntError> {
    face.color.as_mut().ok_or(SfntError::TableMissing(tag::COLR))
}

/// The layers of `glyph`, bottom layer first.
pub fn load_colr_layer(face: &Face, glyph: u16) -> Result<Vec<ColorLayer>, SfntError> {
    let state = color_state(face)?;
    state.colr.with_table(|colr| {
        let base_glyph = colr
            .lookup(glyph)
            .filter(|base_glyph| base_glyph.num_layers > 0)
            .ok_or(SfntError::TableMissing(tag::COLR))?;
        let layers = colr.layers(&base_glyph)?;
        Ok(layers
            .into_iter()
            .map(|layer| ColorLayer {
                glyph_id: layer.glyph_id,
                color_index: layer.palette_index,
            })
            .collect())
    })
}

/// Blend `layer`, an 8-bit coverage mask, into `base` in color `color_index`.
///
/// `base` grows to cover both bitmaps. It is only modified when the blend succeeds.
pub fn colr_blend(
    face: &Face,
    color_index: u16,
    base: &mut GlyphSlot,
    layer: &GlyphSlot,
) -> Result<(), SfntError> {
    let state = color_state(face)?;
    if layer.bitmap.pixel_mode != PixelMode::Gray || !has_buffer(&layer.bitmap, 1) {
        return Err(SfntError::InvalidArgument);
    }
    let base_is_empty = base.bitmap.is_empty();
    if !base_is_empty && (base.bitmap.pixel_mode != PixelMode::Bgra || !has_buffer(&base.bitmap, 4))
    {
        return Err(SfntError::InvalidArgument);
    }
    let color = if color_index == FOREGROUND_PALETTE_INDEX {
        foreground_color(face, state)
    } else {
        state
            .palette
            .get(usize::from(color_index))
            .copied()
            .ok_or(SfntError::InvalidArgument)?
    };

    let layer_extent = Extent::of(layer);
    let extent = if base_is_empty {
        layer_extent
    } else {
        Extent::of(base).union(layer_extent)
    };
    let width = u32::try_from(extent.right - extent.left).map_err(|_| SfntError::InvalidArgument)?;
    let rows = u32::try_from(extent.top - extent.bottom).map_err(|_| SfntError::InvalidArgument)?;
    let left = i32::try_from(extent.left).map_err(|_| SfntError::InvalidArgument)?;
    let top = i32::try_from(extent.top).map_err(|_| SfntError::InvalidArgument)?;
    let mut canvas = Bitmap::new(width, rows, PixelMode::Bgra)?;

    if !base_is_empty {
        let x = (i64::from(base.left) - extent.left) as usize * 4;
        let y = (extent.top - i64::from(base.top)) as usize;
        let row_len = base.bitmap.width as usize * 4;
        for row in 0..base.bitmap.rows as usize {
            let src = row * base.bitmap.pitch as usize;
            let dst = (y + row) * canvas.pitch as usize + x;
            canvas.buffer[dst..dst + row_len].copy_from_slice(&base.bitmap.buffer[src..src + row_len]);
        }
    }

    let x = (i64::from(layer.left) - extent.left) as usize;
    let y = (extent.top - i64::from(layer.top)) as usize;
    for row in 0..layer.bitmap.rows as usize {
        for col in 0..layer.bitmap.width as usize {
            let coverage = layer.bitmap.buffer[row * layer.bitmap.pitch as usize + col];
            if coverage == 0 {
                continue;
            }
            let dst = (y + row) * canvas.pitch as usize + (x + col) * 4;
            blend_pixel(&mut canvas.buffer[dst..dst + 4], color, coverage);
        }
    }

    base.bitmap = canvas;
    base.left = left;
    base.top = top;
    Ok(())
}

/// Blend each `(color_index, layer)` into `base` in order.
pub fn blend_layers(
    face: &Face,
    base: &mut GlyphSlot,
    layers: &[(u16, GlyphSlot)],
) -> Result<(), SfntError> {
    layers
        .iter()
        .try_for_each(|(color_index, layer)| colr_blend(face, *color_index, base, layer))
}

fn has_buffer(bitmap: &Bitmap, bytes_per_pixel: u32) -> bool {
    let min_pitch = u64::from(bitmap.width) * u64::from(bytes_per_pixel);
    let len = u64::from(bitmap.pitch) * u64::from(bitmap.rows);
    u64::from(bitmap.pitch) >= min_pitch && bitmap.buffer.len() as u64 >= len
}

/// The area a slot covers, with y increasing upwards.
#[derive(Debug, Copy, Clone)]
struct Extent {
    left: i64,
    right: i64,
    top: i64,
    bottom: i64,
}

impl Extent {
    fn of(slot: &GlyphSlot) -> Extent {
        Extent {
            left: i64::from(slot.left),
            right: i64::from(slot.left) + i64::from(slot.bitmap.width),
            top: i64::from(slot.top),
            bottom: i64::from(slot.top) - i64::from(slot.bitmap.rows),
        }
    }

    fn union(self, other: Extent) -> Extent {
        Extent {
            left: self.left.min(other.left),
            right: self.right.max(other.right),
            top: self.top.max(other.top),
            bottom: self.bottom.min(other.bottom),
        }
    }
}

/// Source-over of `color` at `coverage` onto a premultiplied BGRA pixel.
fn blend_pixel(pixel: &mut [u8], color: ColorRecord, coverage: u8) {
    let fa = u32::from(color.alpha) * u32::from(coverage) / 255;
    let inverse = 255 - fa;
    let channels = [color.blue, color.green, color.red];
    for (dst, &channel) in pixel.iter_mut().zip(channels.iter()) {
        let fc = u32::from(channel) * fa / 255;
        *dst = (u32::from(*dst) * inverse / 255 + fc) as u8;
    }
    pixel[3] = (u32::from(pixel[3]) * inverse / 255 + fa) as u8;
}

fn foreground_color(face: &Face, state: &ColorState) -> ColorRecord {
    face.foreground_color.unwrap_or_else(|| {
        let flags = state.cpal.with_table(|cpal| {
            cpal.palette(state.palette_index)
                .map(|palette| palette.flags())
                .unwrap_or_default()
        });
        if flags == PaletteFlags::USABLE_WITH_DARK_BACKGROUND {
            ColorRecord::WHITE
        } else {
            ColorRecord::BLACK
        }
    })
}

/// Set the color used for layers with the foreground palette index.
pub fn set_foreground_color(face: &mut Face, color: ColorRecord) {
    face.foreground_color = Some(color);
}

pub fn palette_data(face: &Face) -> Result<PaletteData, SfntError> {
    let state = color_state(face)?;
    Ok(state.cpal.with_table(|cpal| {
        let palettes = (0..cpal.num_palettes()).filter_map(|index| cpal.palette(index));
        let (palette_name_ids, palette_flags): (Vec<_>, Vec<_>) = palettes
            .map(|palette| (palette.label(), palette.flags()))
            .unzip();
        PaletteData {
            num_palettes: cpal.num_palettes(),
            palette_name_ids,
            palette_flags,
            num_palette_entries: cpal.num_palette_entries(),
            palette_entry_name_ids: (0..cpal.num_palette_entries())
                .map(|entry| cpal.entry_label(entry))
                .collect(),
        }
    }))
}

/// Make palette `index` the working palette, discarding any changes to the previous one.
pub fn palette_select(face: &mut Face, index: u16) -> Result<&[ColorRecord], SfntError> {
    let state = color_state_mut(face)?;
    let colors = state
        .cpal
        .with_table(|cpal| cpal.palette(index).map(|palette| palette.colors()))
        .ok_or(SfntError::InvalidArgument)?;
    state.palette = colors;
    state.palette_index = index;
    Ok(&state.palette)
}

/// The working palette, which may be modified.
pub fn palette_entries_mut(face: &mut Face) -> Result<&mut [ColorRecord], SfntError> {
    Ok(&mut color_state_mut(face)?.palette)
}
