//! Locating a font within a file or collection and reading its table directory.

use log::debug;

use crate::binary::read::ReadScope;
use crate::error::{ParseError, SfntError};
use crate::face::{Face, FaceIndex, TableEntry, TableDirectory};
use crate::stream::Stream;
use crate::tables::fvar::FvarHeader;
use crate::tables::{is_sfnt_version, OffsetTable, TableRecord, TtcHeader};
use crate::tag::{self, DisplayTag};
use crate::{loader, size};

/// Resolve `face_index` within `stream` and read the selected font's table directory.
///
/// On success the stream is positioned at the start of the font's offset table.
pub fn init_face(stream: &mut dyn Stream, face_index: FaceIndex) -> Result<Face, SfntError> {
    let mut tag_bytes = [0; size::U32];
    stream.read_at(0, &mut tag_bytes)?;
    let file_tag = u32::from_be_bytes(tag_bytes);

    let mut face = if file_tag == tag::TTCF {
        let ttc_header = read_ttc_header(stream)?;
        let offset = ttc_header
            .offset_tables
            .get(usize::from(face_index.font_index))
            .copied()
            .ok_or(SfntError::InvalidArgument)?;
        // read_ttc_header limits the font count to u16
        let num_faces = u16::try_from(ttc_header.offset_tables.len()).unwrap_or(u16::MAX);
        debug!(
            "collection with {} fonts, selected {} at {}",
            num_faces, face_index.font_index, offset
        );
        let mut face = Face::new(0, face_index, num_faces);
        face.offset_table_pos = u64::from(offset);
        face.ttc_header = Some(ttc_header);
        face
    } else if is_sfnt_version(file_tag) {
        if face_index.font_index != 0 {
            return Err(SfntError::InvalidArgument);
        }
        Face::new(file_tag, face_index, 1)
    } else {
        return Err(SfntError::InvalidFormat(ParseError::BadVersion));
    };

    load_font_dir(&mut face, stream)?;
    check_named_instance(&mut face, stream)?;
    stream.seek(face.offset_table_pos)?;
    Ok(face)
}

fn read_ttc_header(stream: &mut dyn Stream) -> Result<TtcHeader, SfntError> {
    let mut fixed = [0; TtcHeader::FIXED_SIZE];
    stream.read_at(0, &mut fixed)?;
    let num_fonts = u64::from(u32::from_be_bytes([fixed[8], fixed[9], fixed[10], fixed[11]]));
    let header_len = TtcHeader::FIXED_SIZE as u64 + num_fonts * size::U32 as u64;
    if num_fonts == 0 || num_fonts > u64::from(u16::MAX) || header_len > stream.size() {
        return Err(SfntError::InvalidFormat(ParseError::BadValue));
    }
    stream.seek(0)?;
    let data = stream.read_vec(usize::try_from(header_len)?)?;
    Ok(ReadScope::new(&data).read::<TtcHeader>()?)
}

/// Read the offset table at `face.offset_table_pos` and build the face's table directory.
///
/// Entries that extend past the end of the stream are kept but marked corrupt.
pub fn load_font_dir(face: &mut Face, stream: &mut dyn Stream) -> Result<(), SfntError> {
    let mut header = [0; OffsetTable::HEADER_SIZE];
    stream.read_at(face.offset_table_pos, &mut header)?;
    let num_tables = usize::from(u16::from_be_bytes([header[4], header[5]]));
    let dir_len = OffsetTable::HEADER_SIZE + num_tables * TableRecord::SIZE;

    stream.seek(face.offset_table_pos)?;
    let data = stream.read_vec(dir_len)?;
    let offset_table = ReadScope::new(&data).read::<OffsetTable<'_>>()?;

    let stream_size = stream.size();
    let mut directory = TableDirectory::with_capacity(num_tables);
    for record in offset_table.table_records.iter() {
        let offset = u64::from(record.offset);
        let length = u64::from(record.length);
        let corrupt = offset + length > stream_size;
        if corrupt {
            debug!(
                "table '{}' at {}+{} lies past the end of the stream",
                DisplayTag(record.table_tag),
                offset,
                length
            );
        }
        directory.push(TableEntry {
            tag: record.table_tag,
            checksum: record.checksum,
            offset,
            length,
            corrupt,
        });
    }

    if directory.valid_len() == 0 {
        return Err(SfntError::InvalidFormat(ParseError::MissingValue));
    }
    debug!(
        "font directory has {} tables ({} valid)",
        directory.len(),
        directory.valid_len()
    );

    face.format_tag = offset_table.sfnt_version;
    face.directory = directory;
    Ok(())
}

fn check_named_instance(face: &mut Face, stream: &mut dyn Stream) -> Result<(), SfntError> {
    let Some(instance) = face.face_index.named_instance else {
        return Ok(());
    };
    let fvar = match loader::read_parsed::<FvarHeader>(face, stream, tag::FVAR) {
        Ok(fvar) => fvar,
        Err(SfntError::TableMissing(_)) => return Err(SfntError::InvalidArgument),
        Err(err) => return Err(err),
    };
    if !fvar.has_instance(instance) {
        return Err(SfntError::InvalidArgument);
    }
    face.fvar = Some(fvar);
    Ok(())
}
