// Shared test code. Included into the crate's unit tests by `src/tests.rs` and used as a module
// by the integration tests.

pub mod writer {
    //! Testing utilities.
    #![allow(dead_code)]

    // The writer module is derived from ttf-parser, licenced under Apache-2.0.
    // https://github.com/RazrFalcon/ttf-parser/blob/439aaaebd50eb8aed66302e3c1b51fae047f85b2/src/writer.rs

    #[allow(missing_debug_implementations)]
    #[derive(Clone, Copy)]
    pub enum TtfType {
        Raw(&'static [u8]),
        TrueTypeMagic,
        OpenTypeMagic,
        FontCollectionMagic,
        Int8(i8),
        UInt8(u8),
        Int16(i16),
        UInt16(u16),
        Int32(i32),
        UInt32(u32),
        Int64(i64),
    }

    pub fn convert(values: &[TtfType]) -> Vec<u8> {
        let mut data = Vec::with_capacity(256);
        for v in values {
            convert_type(*v, &mut data);
        }

        data
    }

    pub fn convert_type(value: TtfType, data: &mut Vec<u8>) {
        match value {
            TtfType::Raw(bytes) => {
                data.extend_from_slice(bytes);
            }
            TtfType::TrueTypeMagic => {
                data.extend_from_slice(&[0x00, 0x01, 0x00, 0x00]);
            }
            TtfType::OpenTypeMagic => {
                data.extend_from_slice(&[0x4F, 0x54, 0x54, 0x4F]);
            }
            TtfType::FontCollectionMagic => {
                data.extend_from_slice(&[0x74, 0x74, 0x63, 0x66]);
            }
            TtfType::Int8(n) => {
                data.extend_from_slice(&i8::to_be_bytes(n));
            }
            TtfType::UInt8(n) => {
                data.extend_from_slice(&u8::to_be_bytes(n));
            }
            TtfType::Int16(n) => {
                data.extend_from_slice(&i16::to_be_bytes(n));
            }
            TtfType::UInt16(n) => {
                data.extend_from_slice(&u16::to_be_bytes(n));
            }
            TtfType::Int32(n) => {
                data.extend_from_slice(&i32::to_be_bytes(n));
            }
            TtfType::UInt32(n) => {
                data.extend_from_slice(&u32::to_be_bytes(n));
            }
            TtfType::Int64(n) => {
                data.extend_from_slice(&i64::to_be_bytes(n));
            }
        }
    }

    #[derive(Debug)]
    pub struct Writer {
        pub data: Vec<u8>,
    }

    impl Writer {
        pub fn new() -> Self {
            Writer {
                data: Vec::with_capacity(256),
            }
        }

        pub fn offset(&self) -> usize {
            self.data.len()
        }

        pub fn write(&mut self, value: TtfType) {
            convert_type(value, &mut self.data);
        }

        pub fn write_all(&mut self, values: &[TtfType]) {
            for value in values {
                self.write(*value);
            }
        }

        pub fn write_bytes(&mut self, bytes: &[u8]) {
            self.data.extend_from_slice(bytes);
        }
    }
}

pub mod fonts {
    //! Synthesized fonts and tables.
    #![allow(dead_code)]

    use super::writer::{TtfType::*, Writer};

    pub const HEAD: u32 = u32::from_be_bytes(*b"head");
    pub const HHEA: u32 = u32::from_be_bytes(*b"hhea");
    pub const HMTX: u32 = u32::from_be_bytes(*b"hmtx");
    pub const VHEA: u32 = u32::from_be_bytes(*b"vhea");
    pub const VMTX: u32 = u32::from_be_bytes(*b"vmtx");
    pub const MAXP: u32 = u32::from_be_bytes(*b"maxp");
    pub const CMAP: u32 = u32::from_be_bytes(*b"cmap");
    pub const NAME: u32 = u32::from_be_bytes(*b"name");
    pub const KERN: u32 = u32::from_be_bytes(*b"kern");
    pub const FVAR: u32 = u32::from_be_bytes(*b"fvar");
    pub const EBLC: u32 = u32::from_be_bytes(*b"EBLC");
    pub const EBDT: u32 = u32::from_be_bytes(*b"EBDT");
    pub const COLR: u32 = u32::from_be_bytes(*b"COLR");
    pub const CPAL: u32 = u32::from_be_bytes(*b"CPAL");
    pub const POST: u32 = u32::from_be_bytes(*b"post");
    pub const BHED: u32 = u32::from_be_bytes(*b"bhed");

    /// Number of glyphs in the fonts made by `minimal_font`.
    pub const NUM_GLYPHS: u16 = 6;

    /// Assembles tables into an SFNT file.
    #[derive(Clone)]
    pub struct SfntBuilder {
        sfnt_version: u32,
        tables: Vec<(u32, Vec<u8>)>,
    }

    impl SfntBuilder {
        pub fn new(sfnt_version: u32) -> Self {
            SfntBuilder {
                sfnt_version,
                tables: Vec::new(),
            }
        }

        pub fn truetype() -> Self {
            SfntBuilder::new(0x00010000)
        }

        pub fn table(mut self, tag: u32, data: Vec<u8>) -> Self {
            self.tables.push((tag, data));
            self
        }

        pub fn without(mut self, tag: u32) -> Self {
            self.tables.retain(|(t, _)| *t != tag);
            self
        }

        pub fn build(&self) -> Vec<u8> {
            self.build_at(0)
        }

        /// Build the font with its table offsets relative to a file position of `base`.
        pub fn build_at(&self, base: usize) -> Vec<u8> {
            let num_tables = self.tables.len() as u16;
            let mut w = Writer::new();
            w.write_all(&[
                UInt32(self.sfnt_version),
                UInt16(num_tables),
                UInt16(0),
                UInt16(0),
                UInt16(0),
            ]);
            let mut offset = 12 + 16 * self.tables.len();
            for (tag, data) in &self.tables {
                w.write_all(&[
                    UInt32(*tag),
                    UInt32(checksum(data)),
                    UInt32((base + offset) as u32),
                    UInt32(data.len() as u32),
                ]);
                offset += long_align(data.len());
            }
            for (_, data) in &self.tables {
                w.write_bytes(data);
                pad(&mut w);
            }
            w.data
        }
    }

    /// Bundle fonts into a TrueType collection.
    pub fn collection(fonts: &[SfntBuilder]) -> Vec<u8> {
        let mut offsets = Vec::new();
        let mut bodies = Vec::new();
        let mut offset = 12 + 4 * fonts.len();
        for font in fonts {
            let body = font.build_at(offset);
            offsets.push(offset as u32);
            offset += long_align(body.len());
            bodies.push(body);
        }
        let mut w = Writer::new();
        w.write_all(&[FontCollectionMagic, UInt16(1), UInt16(0), UInt32(fonts.len() as u32)]);
        for offset in offsets {
            w.write(UInt32(offset));
        }
        for body in bodies {
            w.write_bytes(&body);
            pad(&mut w);
        }
        w.data
    }

    fn long_align(len: usize) -> usize {
        (len + 3) / 4 * 4
    }

    fn pad(w: &mut Writer) {
        while w.offset() % 4 != 0 {
            w.write(UInt8(0));
        }
    }

    fn checksum(data: &[u8]) -> u32 {
        data.chunks(4).fold(0u32, |sum, chunk| {
            let mut word = [0; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            sum.wrapping_add(u32::from_be_bytes(word))
        })
    }

    /// A TrueType font with `head`, `hhea`, `hmtx`, `maxp`, `cmap` and `name`.
    pub fn minimal_font() -> SfntBuilder {
        SfntBuilder::truetype()
            .table(HEAD, head_table(1000))
            .table(HHEA, hhea_table(0x00010000, 3))
            .table(HMTX, hmtx_table(&[(500, 10), (600, 20), (700, 30)], &[40, 50]))
            .table(MAXP, maxp_table(NUM_GLYPHS))
            .table(CMAP, cmap_format12(&[(0x41, 0x43, 1)]))
            .table(
                NAME,
                name_table(&[
                    (3, 1, 0x409, 1, utf16be("Minimal")),
                    (3, 1, 0x409, 4, utf16be("Minimal Regular")),
                ]),
            )
    }

    pub fn head_table(units_per_em: u16) -> Vec<u8> {
        super::writer::convert(&[
            UInt16(1),
            UInt16(0),
            Int32(0x0001_0000),
            UInt32(0),
            UInt32(0x5F0F3CF5),
            UInt16(0),
            UInt16(units_per_em),
            Int64(0),
            Int64(0),
            Int16(0),
            Int16(-200),
            Int16(1000),
            Int16(800),
            UInt16(0),
            UInt16(8),
            Int16(2),
            Int16(0),
            Int16(0),
        ])
    }

    pub fn hhea_table(version: u32, num_long_metrics: u16) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_all(&[
            UInt32(version),
            Int16(800),
            Int16(-200),
            Int16(90),
            UInt16(700),
            Int16(10),
            Int16(0),
            Int16(700),
            Int16(1),
            Int16(0),
            Int16(0),
        ]);
        w.write_all(&[Int16(0); 4]);
        w.write_all(&[Int16(0), UInt16(num_long_metrics)]);
        w.data
    }

    pub fn hmtx_table(long_metrics: &[(u16, i16)], bearings: &[i16]) -> Vec<u8> {
        let mut w = Writer::new();
        for &(advance, bearing) in long_metrics {
            w.write_all(&[UInt16(advance), Int16(bearing)]);
        }
        for &bearing in bearings {
            w.write(Int16(bearing));
        }
        w.data
    }

    pub fn maxp_table(num_glyphs: u16) -> Vec<u8> {
        super::writer::convert(&[UInt32(0x00005000), UInt16(num_glyphs)])
    }

    /// A cmap with one (3,10) format 12 subtable mapping `(start, end, start_glyph)` groups.
    pub fn cmap_format12(groups: &[(u32, u32, u32)]) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_all(&[UInt16(0), UInt16(1), UInt16(3), UInt16(10), UInt32(12)]);
        w.write_all(&[
            UInt16(12),
            UInt16(0),
            UInt32(16 + 12 * groups.len() as u32),
            UInt32(0),
            UInt32(groups.len() as u32),
        ]);
        for &(start, end, glyph) in groups {
            w.write_all(&[UInt32(start), UInt32(end), UInt32(glyph)]);
        }
        w.data
    }

    pub fn utf16be(s: &str) -> Vec<u8> {
        s.encode_utf16().flat_map(|unit| unit.to_be_bytes()).collect()
    }

    /// A format 0 name table from `(platform, encoding, language, name_id, bytes)` records.
    pub fn name_table(records: &[(u16, u16, u16, u16, Vec<u8>)]) -> Vec<u8> {
        let mut w = Writer::new();
        let count = records.len() as u16;
        w.write_all(&[UInt16(0), UInt16(count), UInt16(6 + 12 * count)]);
        let mut offset = 0;
        for (platform, encoding, language, name_id, bytes) in records {
            w.write_all(&[
                UInt16(*platform),
                UInt16(*encoding),
                UInt16(*language),
                UInt16(*name_id),
                UInt16(bytes.len() as u16),
                UInt16(offset),
            ]);
            offset += bytes.len() as u16;
        }
        for (_, _, _, _, bytes) in records {
            w.write_bytes(bytes);
        }
        w.data
    }

    /// A Microsoft version 0 kern table with one horizontal format 0 subtable.
    pub fn kern_table(pairs: &[(u16, u16, i16)]) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_all(&[UInt16(0), UInt16(1)]);
        write_kern_format0(&mut w, 0x0001, pairs);
        w.data
    }

    pub fn write_kern_format0(w: &mut Writer, coverage: u16, pairs: &[(u16, u16, i16)]) {
        let n = pairs.len() as u16;
        w.write_all(&[UInt16(0), UInt16(14 + 6 * n), UInt16(coverage)]);
        w.write_all(&[UInt16(n), UInt16(0), UInt16(0), UInt16(0)]);
        for &(left, right, value) in pairs {
            w.write_all(&[UInt16(left), UInt16(right), Int16(value)]);
        }
    }

    /// An fvar table with a single `wght` axis.
    pub fn fvar_table(instance_count: u16) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_all(&[
            UInt16(1),
            UInt16(0),
            UInt16(16),
            UInt16(2),
            UInt16(1),
            UInt16(20),
            UInt16(instance_count),
            UInt16(8),
        ]);
        w.write_all(&[
            UInt32(u32::from_be_bytes(*b"wght")),
            Int32(100 << 16),
            Int32(400 << 16),
            Int32(900 << 16),
            UInt16(0),
            UInt16(256),
        ]);
        for i in 0..instance_count {
            w.write_all(&[UInt16(257 + i), UInt16(0), Int32(i32::from(100 + i * 100) << 16)]);
        }
        w.data
    }

    /// One strike for `bitmap_tables`, using index format 1.
    #[derive(Clone)]
    pub struct StrikeSpec {
        pub ppem: u8,
        pub bit_depth: u8,
        pub flags: i8,
        pub ascender: i8,
        pub descender: i8,
        pub first_glyph: u16,
        pub image_format: u16,
        /// Encoded glyph records, including any per-glyph metrics.
        pub glyphs: Vec<Vec<u8>>,
    }

    impl StrikeSpec {
        pub fn new(ppem: u8, image_format: u16, first_glyph: u16, glyphs: Vec<Vec<u8>>) -> Self {
            StrikeSpec {
                ppem,
                bit_depth: 1,
                flags: 1,
                ascender: ppem as i8 - 2,
                descender: -2,
                first_glyph,
                image_format,
                glyphs,
            }
        }
    }

    /// Encode small glyph metrics followed by `data`.
    pub fn small_glyph(height: u8, width: u8, bearing_x: i8, bearing_y: i8, advance: u8, data: &[u8]) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_all(&[UInt8(height), UInt8(width), Int8(bearing_x), Int8(bearing_y), UInt8(advance)]);
        w.write_bytes(data);
        w.data
    }

    /// Build matching `EBLC` and `EBDT` tables.
    pub fn bitmap_tables(strikes: &[StrikeSpec]) -> (Vec<u8>, Vec<u8>) {
        let mut eblc = Writer::new();
        let mut ebdt = Writer::new();
        ebdt.write_all(&[UInt16(2), UInt16(0)]);

        eblc.write_all(&[UInt16(2), UInt16(0), UInt32(strikes.len() as u32)]);
        let mut array_offset = 8 + 48 * strikes.len();
        let mut subtables = Writer::new();
        for strike in strikes {
            let count = strike.glyphs.len();
            let last_glyph = strike.first_glyph + count as u16 - 1;
            let index_tables_size = 8 + 8 + 4 * (count + 1);
            eblc.write_all(&[
                UInt32(array_offset as u32),
                UInt32(index_tables_size as u32),
                UInt32(1),
                UInt32(0),
            ]);
            for (ascender, descender) in [(strike.ascender, strike.descender), (0, 0)] {
                eblc.write_all(&[Int8(ascender), Int8(descender), UInt8(strike.ppem)]);
                eblc.write_all(&[Int8(1), Int8(0), Int8(0), Int8(0), Int8(0)]);
                eblc.write_all(&[Int8(ascender), Int8(descender), Int8(0), Int8(0)]);
            }
            eblc.write_all(&[
                UInt16(strike.first_glyph),
                UInt16(last_glyph),
                UInt8(strike.ppem),
                UInt8(strike.ppem),
                UInt8(strike.bit_depth),
                Int8(strike.flags),
            ]);

            // IndexSubTableArray with a single entry, then the format 1 subtable
            subtables.write_all(&[UInt16(strike.first_glyph), UInt16(last_glyph), UInt32(8)]);
            subtables.write_all(&[UInt16(1), UInt16(strike.image_format), UInt32(ebdt.offset() as u32)]);
            let mut offset = 0u32;
            for glyph in &strike.glyphs {
                subtables.write(UInt32(offset));
                offset += glyph.len() as u32;
            }
            subtables.write(UInt32(offset));
            for glyph in &strike.glyphs {
                ebdt.write_bytes(glyph);
            }
            array_offset += index_tables_size;
        }
        eblc.write_bytes(&subtables.data);
        (eblc.data, ebdt.data)
    }

    /// A version 0 COLR table from `(base glyph, [(layer glyph, palette index)])` records.
    pub fn colr_table(base_glyphs: &[(u16, Vec<(u16, u16)>)]) -> Vec<u8> {
        let mut w = Writer::new();
        let num_base = base_glyphs.len() as u16;
        let num_layers: usize = base_glyphs.iter().map(|(_, layers)| layers.len()).sum();
        let base_offset = 14u32;
        let layer_offset = base_offset + 6 * u32::from(num_base);
        w.write_all(&[
            UInt16(0),
            UInt16(num_base),
            UInt32(base_offset),
            UInt32(layer_offset),
            UInt16(num_layers as u16),
        ]);
        let mut first = 0u16;
        for (glyph, layers) in base_glyphs {
            w.write_all(&[UInt16(*glyph), UInt16(first), UInt16(layers.len() as u16)]);
            first += layers.len() as u16;
        }
        for (_, layers) in base_glyphs {
            for &(glyph, index) in layers {
                w.write_all(&[UInt16(glyph), UInt16(index)]);
            }
        }
        w.data
    }

    /// A CPAL table with palettes of BGRA colors. Passing `palette_types` makes a version 1 table.
    pub fn cpal_table(palettes: &[Vec<[u8; 4]>], palette_types: Option<&[u32]>) -> Vec<u8> {
        let mut w = Writer::new();
        let num_entries = palettes.first().map_or(0, |p| p.len()) as u16;
        let num_palettes = palettes.len() as u16;
        let num_records = num_entries * num_palettes;
        let version = if palette_types.is_some() { 1 } else { 0 };
        let header_size = 12 + 2 * u32::from(num_palettes) + if version == 1 { 12 } else { 0 };
        let records_size = 4 * u32::from(num_records);
        w.write_all(&[
            UInt16(version),
            UInt16(num_entries),
            UInt16(num_palettes),
            UInt16(num_records),
            UInt32(header_size),
        ]);
        for i in 0..num_palettes {
            w.write(UInt16(i * num_entries));
        }
        if version == 1 {
            w.write_all(&[UInt32(header_size + records_size), UInt32(0), UInt32(0)]);
        }
        for palette in palettes {
            for color in palette {
                w.write_bytes(color);
            }
        }
        if let Some(types) = palette_types {
            for &flags in types {
                w.write(UInt32(flags));
            }
        }
        w.data
    }
}
