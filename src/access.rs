//! Tag-addressed access to the raw bytes of a face's tables.

use crate::error::SfntError;
use crate::face::Face;
use crate::stream::Stream;

/// The absolute `(offset, length)` of the region `tag` addresses. Tag 0 is the whole file.
fn region(face: &Face, stream: &dyn Stream, tag: u32) -> Result<(u64, u64), SfntError> {
    if tag == 0 {
        Ok((0, stream.size()))
    } else {
        let entry = face.directory.find(tag)?;
        Ok((entry.offset, entry.length))
    }
}

/// Load all or part of a table, or the whole file when `tag` is 0.
///
/// The mode is chosen by `length`:
///
/// * `None` reads the whole region into the start of `buffer`. `offset` must be 0.
/// * `Some(0)` stores the length of the region and reads nothing.
/// * `Some(n)` reads exactly `n` bytes starting `offset` bytes into the region.
///
/// A read that would extend past the region or overflow `buffer` is rejected with
/// `InvalidArgument` rather than truncated.
pub fn load_any(
    face: &Face,
    stream: &mut dyn Stream,
    tag: u32,
    offset: u64,
    buffer: &mut [u8],
    length: Option<&mut u64>,
) -> Result<(), SfntError> {
    let (region_offset, region_length) = region(face, stream, tag)?;

    let (start, count) = match length {
        Some(length) if *length == 0 => {
            *length = region_length;
            return Ok(());
        }
        Some(length) => {
            let end = offset
                .checked_add(*length)
                .ok_or(SfntError::InvalidArgument)?;
            if end > region_length {
                return Err(SfntError::InvalidArgument);
            }
            (region_offset + offset, *length)
        }
        None => {
            if offset != 0 {
                return Err(SfntError::InvalidArgument);
            }
            (region_offset, region_length)
        }
    };

    let count = usize::try_from(count).map_err(|_| SfntError::InvalidArgument)?;
    let dest = buffer
        .get_mut(..count)
        .ok_or(SfntError::InvalidArgument)?;
    stream.read_at(start, dest)
}

/// Seek to the start of table `tag` and return its length.
pub fn goto_table(face: &Face, stream: &mut dyn Stream, tag: u32) -> Result<u64, SfntError> {
    let entry = face.directory.find(tag)?;
    stream.seek(entry.offset)?;
    Ok(entry.length)
}

/// Read the whole of table `tag` into a new buffer.
pub fn read_table(face: &Face, stream: &mut dyn Stream, tag: u32) -> Result<Box<[u8]>, SfntError> {
    let length = goto_table(face, stream, tag)?;
    let data = stream.read_vec(usize::try_from(length)?)?;
    Ok(data.into_boxed_slice())
}
