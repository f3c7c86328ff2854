//! Decoding glyph image data from the `EBDT`/`CBDT` tables.
//!
//! <https://learn.microsoft.com/en-us/typography/opentype/spec/ebdt>

use bitreader::{BitReader, BitReaderError};

use super::eblc::{BigMetrics, BitDepth};
use super::{Bitmap, PixelMode};
use crate::binary::read::{ReadFrom, ReadScope};
use crate::binary::{I8, U16Be};
use crate::error::{ParseError, SfntError};

/// The EbdtComponent record is used in glyph bitmap data formats 8 and 9.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EbdtComponent {
    pub glyph_id: u16,
    /// Position of the component's left edge within the composite.
    pub x_offset: i8,
    /// Position of the component's top edge within the composite.
    pub y_offset: i8,
}

impl ReadFrom for EbdtComponent {
    type ReadType = (U16Be, I8, I8);

    fn read_from((glyph_id, x_offset, y_offset): (u16, i8, i8)) -> Self {
        EbdtComponent {
            glyph_id,
            x_offset,
            y_offset,
        }
    }
}

/// Rows that are each padded to a whole byte.
pub(crate) fn byte_aligned(
    bit_depth: BitDepth,
    metrics: &BigMetrics,
    data: &[u8],
) -> Result<Bitmap, SfntError> {
    let mut bitmap = Bitmap::new(
        u32::from(metrics.width),
        u32::from(metrics.height),
        PixelMode::from(bit_depth),
    )?;
    let src = data
        .get(..bitmap.buffer.len())
        .ok_or(ParseError::BadEof)?;
    bitmap.buffer.copy_from_slice(src);
    Ok(bitmap)
}

/// Rows packed together with no padding between them.
pub(crate) fn bit_aligned(
    bit_depth: BitDepth,
    metrics: &BigMetrics,
    data: &[u8],
) -> Result<Bitmap, SfntError> {
    let mut bitmap = Bitmap::new(
        u32::from(metrics.width),
        u32::from(metrics.height),
        PixelMode::from(bit_depth),
    )?;
    unpack_bit_aligned_data(bit_depth, metrics.width, metrics.height, data, &mut bitmap.buffer)
        .map_err(parse_error_from_bitreader_error)?;
    Ok(bitmap)
}

fn unpack_bit_aligned_data(
    bit_depth: BitDepth,
    width: u8,
    height: u8,
    data: &[u8],
    image_data: &mut [u8],
) -> Result<(), BitReaderError> {
    let bits_per_row = bit_depth as usize * usize::from(width);
    let whole_bytes_per_row = bits_per_row >> 3;
    let remaining_bits = (bits_per_row & 7) as u8;

    let mut offset = 0;
    let mut reader = BitReader::new(data);
    for _ in 0..height {
        // Read whole bytes, then the remainder
        for byte in image_data[offset..(offset + whole_bytes_per_row)].iter_mut() {
            *byte = reader.read_u8(8)?;
        }
        offset += whole_bytes_per_row;
        if remaining_bits != 0 {
            let byte = reader.read_u8(remaining_bits)?;
            image_data[offset] = byte << (8 - remaining_bits);
            offset += 1;
        }
    }

    Ok(())
}

fn parse_error_from_bitreader_error(err: BitReaderError) -> ParseError {
    match err {
        BitReaderError::NotEnoughData { .. } => ParseError::BadEof,
        // Only reachable by asking for more than 8 bits at once
        BitReaderError::TooManyBitsForType { .. } => ParseError::BadValue,
    }
}

/// The component list of a format 8 or 9 glyph, which follows its metrics.
pub(crate) fn read_components(data: &[u8]) -> Result<Vec<EbdtComponent>, ParseError> {
    let mut ctxt = ReadScope::new(data).ctxt();
    let num_components = usize::from(ctxt.read_u16be()?);
    let components = ctxt.read_array::<EbdtComponent>(num_components)?;
    Ok(components.to_vec())
}

/// Draw `component` onto `canvas` with its top left corner at `(x, y)`.
///
/// Packed pixels are OR-ed together. BGRA pixels are composited source-over.
pub(crate) fn place_component(
    canvas: &mut Bitmap,
    component: &Bitmap,
    x: i8,
    y: i8,
) -> Result<(), SfntError> {
    if component.is_empty() {
        return Ok(());
    }
    let (x, y) = match (u32::try_from(x), u32::try_from(y)) {
        (Ok(x), Ok(y)) => (x, y),
        _ => return Err(ParseError::BadValue.into()),
    };
    if component.pixel_mode != canvas.pixel_mode
        || x + component.width > canvas.width
        || y + component.rows > canvas.rows
    {
        return Err(ParseError::BadValue.into());
    }

    if canvas.pixel_mode == PixelMode::Bgra {
        for row in 0..component.rows {
            for col in 0..component.width {
                let src = pixel_index(component, col, row);
                let dst = pixel_index(canvas, x + col, y + row);
                let mut pixel = [0; 4];
                pixel.copy_from_slice(&canvas.buffer[dst..dst + 4]);
                let blended = source_over(pixel, &component.buffer[src..src + 4]);
                canvas.buffer[dst..dst + 4].copy_from_slice(&blended);
            }
        }
    } else {
        let bits = canvas.pixel_mode.bits_per_pixel();
        for row in 0..component.rows {
            for col in 0..component.width {
                let value = packed_pixel(component, bits, col, row);
                if value != 0 {
                    or_packed_pixel(canvas, bits, x + col, y + row, value);
                }
            }
        }
    }
    Ok(())
}

fn pixel_index(bitmap: &Bitmap, x: u32, y: u32) -> usize {
    y as usize * bitmap.pitch as usize + x as usize * 4
}

fn packed_pixel(bitmap: &Bitmap, bits: u32, x: u32, y: u32) -> u8 {
    let bit = x * bits;
    let byte = bitmap.buffer[y as usize * bitmap.pitch as usize + (bit / 8) as usize];
    let shift = 8 - bits - bit % 8;
    let mask = ((1u16 << bits) - 1) as u8;
    (byte >> shift) & mask
}

fn or_packed_pixel(bitmap: &mut Bitmap, bits: u32, x: u32, y: u32, value: u8) {
    let bit = x * bits;
    let index = y as usize * bitmap.pitch as usize + (bit / 8) as usize;
    let shift = 8 - bits - bit % 8;
    bitmap.buffer[index] |= value << shift;
}

/// Premultiplied source-over.
fn source_over(dst: [u8; 4], src: &[u8]) -> [u8; 4] {
    let inverse = 255 - u32::from(src[3]);
    let mut out = [0; 4];
    for (i, channel) in out.iter_mut().enumerate() {
        let value = u32::from(src[i]) + u32::from(dst[i]) * inverse / 255;
        *channel = value.min(255) as u8;
    }
    out
}

/// Replace a BGRA image with an 8-bit gray image of its alpha channel.
pub(crate) fn alpha_to_gray(bitmap: &Bitmap) -> Result<Bitmap, SfntError> {
    let mut gray = Bitmap::new(bitmap.width, bitmap.rows, PixelMode::Gray)?;
    for row in 0..bitmap.rows {
        for col in 0..bitmap.width {
            let src = pixel_index(bitmap, col, row);
            gray.buffer[row as usize * gray.pitch as usize + col as usize] = bitmap.buffer[src + 3];
        }
    }
    Ok(gray)
}

/// Decode the PNG image of a format 17, 18 or 19 glyph to premultiplied BGRA.
#[cfg(feature = "png")]
pub(crate) fn decode_png(metrics: &BigMetrics, data: &[u8]) -> Result<Bitmap, SfntError> {
    use png::{ColorType, Decoder, Transformations};

    let mut ctxt = ReadScope::new(data).ctxt();
    let length = usize::try_from(ctxt.read_u32be()?)?;
    let png_data = ctxt.read_slice(length)?;

    let mut decoder = Decoder::new(png_data);
    decoder.set_transformations(Transformations::EXPAND | Transformations::STRIP_16);
    let mut reader = decoder.read_info().map_err(|_| ParseError::BadValue)?;
    let (width, height) = {
        let info = reader.info();
        (info.width, info.height)
    };
    if width != u32::from(metrics.width) || height != u32::from(metrics.height) {
        return Err(ParseError::BadValue.into());
    }

    let mut buffer = Vec::new();
    buffer.try_reserve_exact(reader.output_buffer_size())?;
    buffer.resize(reader.output_buffer_size(), 0);
    let frame = reader
        .next_frame(&mut buffer)
        .map_err(|_| ParseError::BadValue)?;
    let channels = match frame.color_type {
        ColorType::Grayscale => 1,
        ColorType::GrayscaleAlpha => 2,
        ColorType::Rgb => 3,
        ColorType::Rgba => 4,
        // Palettes are expanded by the decoder
        ColorType::Indexed => return Err(ParseError::BadValue.into()),
    };

    let mut bitmap = Bitmap::new(width, height, PixelMode::Bgra)?;
    let pixels = buffer
        .get(..frame.buffer_size())
        .ok_or(ParseError::BadEof)?
        .chunks_exact(channels);
    for (dst, src) in bitmap.buffer.chunks_exact_mut(4).zip(pixels) {
        let (r, g, b, a) = match *src {
            [v] => (v, v, v, 255),
            [v, a] => (v, v, v, a),
            [r, g, b] => (r, g, b, 255),
            [r, g, b, a] => (r, g, b, a),
            _ => return Err(ParseError::BadValue.into()),
        };
        let premultiply = |c: u8| (u32::from(c) * u32::from(a) / 255) as u8;
        dst.copy_from_slice(&[premultiply(b), premultiply(g), premultiply(r), a]);
    }
    Ok(bitmap)
}

#[cfg(not(feature = "png"))]
pub(crate) fn decode_png(_metrics: &BigMetrics, _data: &[u8]) -> Result<Bitmap, SfntError> {
    Err(ParseError::NotImplemented.into())
}
