//! The face record that the loaders populate.
//!
//! A `Face` owns copies of everything it has read. Tables that are queried after loading are
//! kept as their raw bytes alongside a parsed view borrowing from them.

use std::cell::OnceCell;

use ouroboros::self_referencing;
use rustc_hash::FxHashMap;

use crate::bitmap::eblc::SbitTables;
use crate::color::ColorState;
use crate::error::{ParseError, SfntError};
use crate::tables::cmap::CmapSubtable;
use crate::tables::cpal::ColorRecord;
use crate::tables::fvar::FvarHeader;
use crate::tables::gasp::GaspTable;
use crate::tables::kern::KernTable;
use crate::tables::os2::Os2;
use crate::tables::pclt::PcltTable;
use crate::tables::post::PostHeader;
use crate::tables::{HeadTable, HheaTable, LangTagRecord, MaxpTable, NameRecord, TtcHeader};

/// Selects a font within a file and optionally one of its named instances.
///
/// The raw `i32` form packs the font index into bits 0 to 15 and the named instance, biased by
/// one, into bits 16 to 30.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct FaceIndex {
    pub font_index: u16,
    /// 1-based index into the `fvar` instances.
    pub named_instance: Option<u16>,
}

impl FaceIndex {
    pub fn new(font_index: u16) -> FaceIndex {
        FaceIndex {
            font_index,
            named_instance: None,
        }
    }

    pub fn from_raw(raw: i32) -> Result<FaceIndex, SfntError> {
        if raw < 0 {
            return Err(SfntError::InvalidArgument);
        }
        // NOTE(cast): masked to 16 and 15 bits
        let font_index = (raw & 0xFFFF) as u16;
        let instance = ((raw >> 16) & 0x7FFF) as u16;
        Ok(FaceIndex {
            font_index,
            named_instance: (instance != 0).then_some(instance),
        })
    }

    pub fn to_raw(self) -> i32 {
        let instance = i32::from(self.named_instance.unwrap_or(0) & 0x7FFF);
        (instance << 16) | i32::from(self.font_index)
    }
}

/// An entry in the table directory.
///
/// Offsets are absolute stream positions.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub tag: u32,
    pub checksum: u32,
    pub offset: u64,
    pub length: u64,
    /// The entry's range extends past the end of the stream.
    pub corrupt: bool,
}

/// Table entries in directory order, indexed by tag.
#[derive(Debug, Default)]
pub struct TableDirectory {
    entries: Vec<TableEntry>,
    by_tag: FxHashMap<u32, usize>,
}

impl TableDirectory {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        TableDirectory {
            entries: Vec::with_capacity(capacity),
            by_tag: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Add an entry. A tag that is already present keeps its first entry.
    pub(crate) fn push(&mut self, entry: TableEntry) {
        let index = self.entries.len();
        self.entries.push(entry);
        self.by_tag.entry(entry.tag).or_insert(index);
    }

    pub fn entries(&self) -> &[TableEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The number of entries whose range lies within the stream.
    pub fn valid_len(&self) -> usize {
        self.entries.iter().filter(|entry| !entry.corrupt).count()
    }

    pub fn contains(&self, tag: u32) -> bool {
        self.by_tag.contains_key(&tag)
    }

    /// The entry for `tag`, provided it is present and lies within the stream.
    pub fn find(&self, tag: u32) -> Result<&TableEntry, SfntError> {
        let entry = self
            .by_tag
            .get(&tag)
            .and_then(|&index| self.entries.get(index))
            .ok_or(SfntError::TableMissing(tag))?;
        if entry.corrupt {
            return Err(SfntError::InvalidFormat(ParseError::BadOffset));
        }
        Ok(entry)
    }
}

#[self_referencing(pub_extras)]
pub(crate) struct CmapData {
    data: Box<[u8]>,
    #[borrows(data)]
    #[not_covariant]
    pub(crate) subtable: Option<CmapSubtable<'this>>,
}

#[self_referencing(pub_extras)]
pub(crate) struct KernData {
    data: Box<[u8]>,
    #[borrows(data)]
    #[not_covariant]
    pub(crate) table: KernTable<'this>,
}

/// A name record with its string copied out of the table storage.
#[derive(Debug)]
pub struct NameEntry {
    pub record: NameRecord,
    pub bytes: Box<[u8]>,
    pub(crate) decoded: OnceCell<Option<String>>,
}

/// The records of a `name` table.
#[derive(Debug, Default)]
pub struct NameData {
    pub format: u16,
    pub entries: Vec<NameEntry>,
    pub lang_tags: Vec<LangTagRecord>,
}

/// A font resolved from a stream, and the tables loaded from it so far.
pub struct Face {
    /// sfnt version of the selected font.
    pub(crate) format_tag: u32,
    pub(crate) ttc_header: Option<TtcHeader>,
    pub(crate) face_index: FaceIndex,
    pub(crate) num_faces: u16,
    /// Absolute position of the selected font's offset table.
    pub(crate) offset_table_pos: u64,
    pub(crate) directory: TableDirectory,

    pub(crate) head: Option<HeadTable>,
    /// The header came from `bhed` rather than `head`.
    pub(crate) head_from_bhed: bool,
    pub(crate) hhea: Option<HheaTable>,
    pub(crate) vhea: Option<HheaTable>,
    pub(crate) hmtx: Option<Box<[u8]>>,
    pub(crate) vmtx: Option<Box<[u8]>>,
    pub(crate) cmap: Option<CmapData>,
    pub(crate) maxp: Option<MaxpTable>,
    pub(crate) os2: Option<Os2>,
    pub(crate) post: Option<PostHeader>,
    pub(crate) psnames: Option<Vec<String>>,
    pub(crate) name: Option<NameData>,
    pub(crate) kern: Option<KernData>,
    pub(crate) gasp: Option<GaspTable>,
    pub(crate) pclt: Option<PcltTable>,
    pub(crate) fvar: Option<FvarHeader>,
    pub(crate) sbit: Option<SbitTables>,
    pub(crate) color: Option<ColorState>,
    pub(crate) foreground_color: Option<ColorRecord>,
}

impl Face {
    pub(crate) fn new(format_tag: u32, face_index: FaceIndex, num_faces: u16) -> Face {
        Face {
            format_tag,
            ttc_header: None,
            face_index,
            num_faces,
            offset_table_pos: 0,
            directory: TableDirectory::default(),
            head: None,
            head_from_bhed: false,
            hhea: None,
            vhea: None,
            hmtx: None,
            vmtx: None,
            cmap: None,
            maxp: None,
            os2: None,
            post: None,
            psnames: None,
            name: None,
            kern: None,
            gasp: None,
            pclt: None,
            fvar: None,
            sbit: None,
            color: None,
            foreground_color: None,
        }
    }

    pub fn format_tag(&self) -> u32 {
        self.format_tag
    }

    pub fn ttc_header(&self) -> Option<&TtcHeader> {
        self.ttc_header.as_ref()
    }

    pub fn face_index(&self) -> FaceIndex {
        self.face_index
    }

    /// Number of fonts in the file: 1 unless it is a collection.
    pub fn num_faces(&self) -> u16 {
        self.num_faces
    }

    pub fn offset_table_pos(&self) -> u64 {
        self.offset_table_pos
    }

    pub fn directory(&self) -> &TableDirectory {
        &self.directory
    }

    pub fn head(&self) -> Option<&HeadTable> {
        self.head.as_ref()
    }

    pub fn hhea(&self) -> Option<&HheaTable> {
        self.hhea.as_ref()
    }

    pub fn vhea(&self) -> Option<&HheaTable> {
        self.vhea.as_ref()
    }

    pub fn maxp(&self) -> Option<&MaxpTable> {
        self.maxp.as_ref()
    }

    pub fn os2(&self) -> Option<&Os2> {
        self.os2.as_ref()
    }

    pub fn post(&self) -> Option<&PostHeader> {
        self.post.as_ref()
    }

    pub fn name_table(&self) -> Option<&NameData> {
        self.name.as_ref()
    }

    pub fn gasp(&self) -> Option<&GaspTable> {
        self.gasp.as_ref()
    }

    pub fn pclt(&self) -> Option<&PcltTable> {
        self.pclt.as_ref()
    }

    pub fn fvar(&self) -> Option<&FvarHeader> {
        self.fvar.as_ref()
    }

    pub fn has_kern(&self) -> bool {
        self.kern.is_some()
    }

    pub fn has_cmap(&self) -> bool {
        self.cmap.is_some()
    }

    pub fn sbit_tables(&self) -> Option<&SbitTables> {
        self.sbit.as_ref()
    }

    pub fn num_glyphs(&self) -> u16 {
        self.maxp.as_ref().map_or(0, |maxp| maxp.num_glyphs)
    }

    /// Map a Unicode character to a glyph using the selected `cmap` subtable.
    ///
    /// `None` when the character is unmapped or the face has no usable subtable.
    pub fn char_index(&self, ch: char) -> Option<u16> {
        let cmap = self.cmap.as_ref()?;
        cmap.with_subtable(|subtable| {
            subtable
                .as_ref()
                .and_then(|subtable| subtable.map_glyph(u32::from(ch)).ok().flatten())
        })
    }

    pub(crate) fn units_per_em(&self) -> Option<u16> {
        self.head.as_ref().map(|head| head.units_per_em)
    }
}
