//! Loaders for the tables a face needs, and the queries over them.
//!
//! Each loader reads its table through the face's directory and replaces the face's record
//! only once the whole table has parsed. A failed load leaves the face untouched.

use std::cell::OnceCell;

use log::warn;

use crate::access::read_table;
use crate::binary::read::{ReadBinary, ReadScope};
use crate::error::{ParseError, SfntError};
use crate::face::{CmapDataTryBuilder, Face, KernDataTryBuilder, NameData, NameEntry};
use crate::size;
use crate::stream::Stream;
use crate::tables::cmap::{Cmap, CmapSubtable};
use crate::tables::gasp::GaspTable;
use crate::tables::kern::KernTable;
use crate::tables::os2::Os2;
use crate::tables::pclt::PcltTable;
use crate::tables::post::{PostHeader, PostTable};
use crate::tables::{HeadTable, HheaTable, HmtxTable, MaxpTable, NameTable};
use crate::tag::{self, DisplayTag};

/// Read table `tag` and parse it as `T`.
pub(crate) fn read_parsed<T>(
    face: &Face,
    stream: &mut dyn Stream,
    tag: u32,
) -> Result<T, SfntError>
where
    T: for<'a> ReadBinary<HostType<'a> = T>,
{
    let data = read_table(face, stream, tag)?;
    let table = ReadScope::new(&data).read::<T>()?;
    Ok(table)
}

pub fn load_head(face: &mut Face, stream: &mut dyn Stream) -> Result<(), SfntError> {
    let head = read_parsed::<HeadTable>(face, stream, tag::HEAD)?;
    face.head = Some(head);
    face.head_from_bhed = false;
    Ok(())
}

/// Load the font header from the Apple `bhed` table used by bitmap-only fonts.
pub fn load_bhed(face: &mut Face, stream: &mut dyn Stream) -> Result<(), SfntError> {
    let bhed = read_parsed::<HeadTable>(face, stream, tag::BHED)?;
    face.head = Some(bhed);
    face.head_from_bhed = true;
    Ok(())
}

/// Load `hhea`, or `vhea` when `vertical` is set.
pub fn load_hhea(face: &mut Face, stream: &mut dyn Stream, vertical: bool) -> Result<(), SfntError> {
    let table_tag = if vertical { tag::VHEA } else { tag::HHEA };
    let data = read_table(face, stream, table_tag)?;
    let header = ReadScope::new(&data).read_dep::<HheaTable>(vertical)?;
    if vertical {
        face.vhea = Some(header);
    } else {
        face.hhea = Some(header);
    }
    Ok(())
}

/// Load the raw `hmtx` bytes, or `vmtx` when `vertical` is set.
///
/// The matching header must already be loaded.
pub fn load_hmtx(face: &mut Face, stream: &mut dyn Stream, vertical: bool) -> Result<(), SfntError> {
    let (header, table_tag) = if vertical {
        (face.vhea.as_ref(), tag::VMTX)
    } else {
        (face.hhea.as_ref(), tag::HMTX)
    };
    let num_long_metrics = header
        .map(|header| usize::from(header.num_h_metrics))
        .ok_or(SfntError::InvalidArgument)?;
    let data = read_table(face, stream, table_tag)?;
    if data.len() < num_long_metrics * 2 * size::U16 {
        return Err(SfntError::InvalidFormat(ParseError::BadEof));
    }
    if vertical {
        face.vmtx = Some(data);
    } else {
        face.hmtx = Some(data);
    }
    Ok(())
}

/// Side bearing and advance of `glyph` from the loaded `hmtx`, or `vmtx` when `vertical` is
/// set.
pub fn get_metrics(face: &Face, vertical: bool, glyph: u16) -> Result<(i16, u16), SfntError> {
    let (header, data, table_tag) = if vertical {
        (face.vhea.as_ref(), face.vmtx.as_deref(), tag::VMTX)
    } else {
        (face.hhea.as_ref(), face.hmtx.as_deref(), tag::HMTX)
    };
    let (header, data) = header
        .zip(data)
        .ok_or(SfntError::TableMissing(table_tag))?;
    let hmtx = ReadScope::new(data).read_dep::<HmtxTable<'_>>(usize::from(header.num_h_metrics))?;
    hmtx.metrics(glyph)
        .ok_or(SfntError::InvalidFormat(ParseError::MissingValue))
}

fn unicode_subtable(data: &[u8]) -> Result<Option<CmapSubtable<'_>>, ParseError> {
    let cmap = ReadScope::new(data).read::<Cmap<'_>>()?;
    match cmap.select_unicode_subtable()? {
        Some(record) => cmap.subtable(&record).map(Some),
        None => Ok(None),
    }
}

/// Load `cmap` and select its preferred Unicode subtable, if it has one.
pub fn load_cmap(face: &mut Face, stream: &mut dyn Stream) -> Result<(), SfntError> {
    let data = read_table(face, stream, tag::CMAP)?;
    let cmap = CmapDataTryBuilder {
        data,
        subtable_builder: |data| unicode_subtable(data),
    }
    .try_build()?;
    if cmap.with_subtable(|subtable| subtable.is_none()) {
        warn!("'cmap' table has no supported Unicode subtable");
    }
    face.cmap = Some(cmap);
    Ok(())
}

pub fn load_maxp(face: &mut Face, stream: &mut dyn Stream) -> Result<(), SfntError> {
    let maxp = read_parsed::<MaxpTable>(face, stream, tag::MAXP)?;
    face.maxp = Some(maxp);
    Ok(())
}

pub fn load_os2(face: &mut Face, stream: &mut dyn Stream) -> Result<(), SfntError> {
    let os2 = read_parsed::<Os2>(face, stream, tag::OS_2)?;
    face.os2 = Some(os2);
    Ok(())
}

/// Load the `post` header. Glyph names are read on demand by `get_psname`.
pub fn load_post(face: &mut Face, stream: &mut dyn Stream) -> Result<(), SfntError> {
    let post = read_parsed::<PostHeader>(face, stream, tag::POST)?;
    face.post = Some(post);
    face.psnames = None;
    Ok(())
}

/// The PostScript name of `glyph`.
///
/// The first call reads the names of every glyph from the `post` table.
pub fn get_psname<'f>(
    face: &'f mut Face,
    stream: &mut dyn Stream,
    glyph: u16,
) -> Result<&'f str, SfntError> {
    if face.post.is_none() {
        return Err(SfntError::TableMissing(tag::POST));
    }
    if glyph >= face.num_glyphs() {
        return Err(SfntError::InvalidArgument);
    }
    if face.psnames.is_none() {
        let data = read_table(face, stream, tag::POST)?;
        let post = ReadScope::new(&data).read::<PostTable<'_>>()?;
        face.psnames = Some(post.glyph_names(face.num_glyphs())?);
    }
    face.psnames
        .as_ref()
        .and_then(|names| names.get(usize::from(glyph)))
        .map(String::as_str)
        .ok_or(SfntError::InvalidArgument)
}

pub fn free_psnames(face: &mut Face) {
    face.psnames = None;
}

/// Load the `name` table, copying each record's string out of the table storage.
pub fn load_name(face: &mut Face, stream: &mut dyn Stream) -> Result<(), SfntError> {
    let data = read_table(face, stream, tag::NAME)?;
    let name = ReadScope::new(&data).read::<NameTable<'_>>()?;

    let mut entries = Vec::with_capacity(name.name_records.len());
    for record in name.name_records.iter() {
        match record.string(&name.string_storage) {
            Ok(bytes) => entries.push(NameEntry {
                record,
                bytes: Box::from(bytes),
                decoded: OnceCell::new(),
            }),
            Err(err) => warn!(
                "dropping name record {} ({}, {}): {}",
                record.name_id, record.platform_id, record.encoding_id, err
            ),
        }
    }
    let lang_tags = name
        .opt_langtag_records
        .as_ref()
        .map(|records| records.to_vec())
        .unwrap_or_default();

    face.name = Some(NameData {
        format: name.format,
        entries,
        lang_tags,
    });
    Ok(())
}

pub fn free_name(face: &mut Face) {
    face.name = None;
}

pub fn load_kern(face: &mut Face, stream: &mut dyn Stream) -> Result<(), SfntError> {
    let data = read_table(face, stream, tag::KERN)?;
    let kern = KernDataTryBuilder {
        data,
        table_builder: |data| ReadScope::new(data).read::<KernTable<'_>>(),
    }
    .try_build()?;
    face.kern = Some(kern);
    Ok(())
}

/// The `kern` adjustment for a pair of glyphs, or `None` if no subtable contains the pair.
pub fn kerning_pair(face: &Face, left: u16, right: u16) -> Option<i32> {
    let kern = face.kern.as_ref()?;
    kern.with_table(|table| table.horizontal_kerning(left, right))
}

/// The `kern` adjustment for a pair of glyphs in font units. 0 if the pair is not kerned.
pub fn get_kerning(face: &Face, left: u16, right: u16) -> i32 {
    kerning_pair(face, left, right).unwrap_or(0)
}

pub fn load_gasp(face: &mut Face, stream: &mut dyn Stream) -> Result<(), SfntError> {
    let gasp = read_parsed::<GaspTable>(face, stream, tag::GASP)?;
    face.gasp = Some(gasp);
    Ok(())
}

pub fn load_pclt(face: &mut Face, stream: &mut dyn Stream) -> Result<(), SfntError> {
    let pclt = read_parsed::<PcltTable>(face, stream, tag::PCLT)?;
    face.pclt = Some(pclt);
    Ok(())
}

/// Log and discard the failure of an optional table.
pub(crate) fn skip_optional(table_tag: u32, result: Result<(), SfntError>) {
    match result {
        Ok(()) | Err(SfntError::TableMissing(_)) => {}
        Err(err) => warn!("skipping '{}' table: {}", DisplayTag(table_tag), err),
    }
}

/// Load every table the face uses with the full driver.
pub fn load_face(face: &mut Face, stream: &mut dyn Stream) -> Result<(), SfntError> {
    crate::interface::sfnt_interface(crate::interface::DriverVariant::Full).load_face(face, stream)
}

/// Release everything loaded for the face. The face may be initialised again afterwards.
pub fn done_face(face: &mut Face) {
    free_name(face);
    free_psnames(face);
    crate::bitmap::free_eblc(face);
    crate::color::free_colr(face);
    face.head = None;
    face.head_from_bhed = false;
    face.hhea = None;
    face.vhea = None;
    face.hmtx = None;
    face.vmtx = None;
    face.cmap = None;
    face.maxp = None;
    face.os2 = None;
    face.post = None;
    face.kern = None;
    face.gasp = None;
    face.pclt = None;
    face.fvar = None;
    face.ttc_header = None;
    face.directory = Default::default();
}
