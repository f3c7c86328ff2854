//! The driver's dispatch table.
//!
//! Each slot of the SFNT service is a method of [SfntInterface]. The default methods call the
//! free functions of this crate, so a driver variant only overrides the slots it does not
//! provide.

use log::debug;

use crate::access;
use crate::bitmap::eblc::{BigMetrics, SbitRange, SbitStrike};
use crate::bitmap::{self, Bitmap, LoadFlags, SbitLocation, SizeMetrics, SizeRequest, StrikeMatch};
use crate::color::{self, ColorLayer, GlyphSlot};
use crate::directory;
use crate::error::SfntError;
use crate::face::{Face, FaceIndex};
use crate::get_name::{self, NameIdMatch};
use crate::loader::{self, skip_optional};
use crate::stream::Stream;
use crate::tag;

/// The fixed driver configurations.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DriverVariant {
    /// Every table, including embedded bitmaps and color layers.
    Full,
    /// No embedded bitmap or color layer support.
    OutlineOnly,
}

/// A service reported by [SfntInterface::get_interface].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    GlyphNames,
    PostscriptName,
    SfntTable,
    Kerning,
    Bitmaps,
    ColorLayers,
}

pub trait SfntInterface: Sync {
    /// The configuration this interface implements.
    fn variant(&self) -> DriverVariant;

    fn goto_table(&self, face: &Face, stream: &mut dyn Stream, tag: u32) -> Result<u64, SfntError> {
        access::goto_table(face, stream, tag)
    }

    fn init_face(&self, stream: &mut dyn Stream, face_index: FaceIndex) -> Result<Face, SfntError> {
        directory::init_face(stream, face_index)
    }

    /// Load every table of the face this interface supports.
    ///
    /// Only the header, `maxp`, a corrupt `cmap` and, outside bitmap-only fonts, the
    /// horizontal metrics are fatal. Other tables are skipped with a warning when they fail to
    /// load.
    fn load_face(&self, face: &mut Face, stream: &mut dyn Stream) -> Result<(), SfntError> {
        match self.load_head(face, stream) {
            Err(SfntError::TableMissing(_)) => {
                self.load_bhed(face, stream).map_err(|err| match err {
                    SfntError::TableMissing(_) => SfntError::TableMissing(tag::HEAD),
                    err => err,
                })?
            }
            result => result?,
        }
        self.load_maxp(face, stream)?;

        match self.load_cmap(face, stream) {
            Err(SfntError::TableMissing(_)) => debug!("font has no 'cmap' table"),
            result => result?,
        }

        let metrics = self
            .load_hhea(face, stream, false)
            .and_then(|()| self.load_hmtx(face, stream, false));
        match metrics {
            Err(err) if face.head_from_bhed => debug!("bitmap-only font without metrics: {}", err),
            result => result?,
        }

        let vertical = self
            .load_hhea(face, stream, true)
            .and_then(|()| self.load_hmtx(face, stream, true));
        skip_optional(tag::VHEA, vertical);
        skip_optional(tag::OS_2, self.load_os2(face, stream));
        skip_optional(tag::POST, self.load_post(face, stream));
        skip_optional(tag::NAME, self.load_name(face, stream));
        skip_optional(tag::KERN, self.load_kern(face, stream));
        skip_optional(tag::GASP, self.load_gasp(face, stream));
        skip_optional(tag::PCLT, self.load_pclt(face, stream));
        skip_optional(tag::EBLC, self.load_eblc(face, stream));
        skip_optional(tag::COLR, self.load_colr(face, stream));
        Ok(())
    }

    fn done_face(&self, face: &mut Face) {
        loader::done_face(face)
    }

    /// Look up an additional service by name.
    fn get_interface(&self, name: &str) -> Option<Capability> {
        let full = self.variant() == DriverVariant::Full;
        match name {
            "glyph_names" => Some(Capability::GlyphNames),
            "postscript_name" => Some(Capability::PostscriptName),
            "sfnt_table" => Some(Capability::SfntTable),
            "kerning" => Some(Capability::Kerning),
            "bitmaps" if full => Some(Capability::Bitmaps),
            "color_layers" if full => Some(Capability::ColorLayers),
            _ => None,
        }
    }

    fn load_any(
        &self,
        face: &Face,
        stream: &mut dyn Stream,
        tag: u32,
        offset: u64,
        buffer: &mut [u8],
        length: Option<&mut u64>,
    ) -> Result<(), SfntError> {
        access::load_any(face, stream, tag, offset, buffer, length)
    }

    fn load_head(&self, face: &mut Face, stream: &mut dyn Stream) -> Result<(), SfntError> {
        loader::load_head(face, stream)
    }

    fn load_hhea(
        &self,
        face: &mut Face,
        stream: &mut dyn Stream,
        vertical: bool,
    ) -> Result<(), SfntError> {
        loader::load_hhea(face, stream, vertical)
    }

    fn load_cmap(&self, face: &mut Face, stream: &mut dyn Stream) -> Result<(), SfntError> {
        loader::load_cmap(face, stream)
    }

    fn load_maxp(&self, face: &mut Face, stream: &mut dyn Stream) -> Result<(), SfntError> {
        loader::load_maxp(face, stream)
    }

    fn load_os2(&self, face: &mut Face, stream: &mut dyn Stream) -> Result<(), SfntError> {
        loader::load_os2(face, stream)
    }

    fn load_post(&self, face: &mut Face, stream: &mut dyn Stream) -> Result<(), SfntError> {
        loader::load_post(face, stream)
    }

    fn load_name(&self, face: &mut Face, stream: &mut dyn Stream) -> Result<(), SfntError> {
        loader::load_name(face, stream)
    }

    fn free_name(&self, face: &mut Face) {
        loader::free_name(face)
    }

    fn load_kern(&self, face: &mut Face, stream: &mut dyn Stream) -> Result<(), SfntError> {
        loader::load_kern(face, stream)
    }

    fn load_gasp(&self, face: &mut Face, stream: &mut dyn Stream) -> Result<(), SfntError> {
        loader::load_gasp(face, stream)
    }

    fn load_pclt(&self, face: &mut Face, stream: &mut dyn Stream) -> Result<(), SfntError> {
        loader::load_pclt(face, stream)
    }

    fn load_bhed(&self, face: &mut Face, stream: &mut dyn Stream) -> Result<(), SfntError> {
        loader::load_bhed(face, stream)
    }

    fn load_sbit_image(
        &self,
        face: &Face,
        stream: &mut dyn Stream,
        strike_index: usize,
        glyph: u16,
        flags: LoadFlags,
    ) -> Result<(Bitmap, BigMetrics), SfntError> {
        bitmap::load_sbit_image(face, stream, strike_index, glyph, flags)
    }

    fn get_psname<'f>(
        &self,
        face: &'f mut Face,
        stream: &mut dyn Stream,
        glyph: u16,
    ) -> Result<&'f str, SfntError> {
        loader::get_psname(face, stream, glyph)
    }

    fn free_psnames(&self, face: &mut Face) {
        loader::free_psnames(face)
    }

    fn get_kerning(&self, face: &Face, left: u16, right: u16) -> i32 {
        loader::get_kerning(face, left, right)
    }

    fn load_font_dir(&self, face: &mut Face, stream: &mut dyn Stream) -> Result<(), SfntError> {
        directory::load_font_dir(face, stream)
    }

    fn load_hmtx(
        &self,
        face: &mut Face,
        stream: &mut dyn Stream,
        vertical: bool,
    ) -> Result<(), SfntError> {
        loader::load_hmtx(face, stream, vertical)
    }

    fn load_eblc(&self, face: &mut Face, stream: &mut dyn Stream) -> Result<(), SfntError> {
        bitmap::load_eblc(face, stream)
    }

    fn free_eblc(&self, face: &mut Face) {
        bitmap::free_eblc(face)
    }

    fn set_sbit_strike(
        &self,
        face: &Face,
        request: SizeRequest,
        policy: StrikeMatch,
    ) -> Result<usize, SfntError> {
        bitmap::set_sbit_strike(face, request, policy)
    }

    fn load_strike_metrics(
        &self,
        face: &Face,
        strike_index: usize,
    ) -> Result<SizeMetrics, SfntError> {
        bitmap::load_strike_metrics(face, strike_index)
    }

    fn load_colr(&self, face: &mut Face, stream: &mut dyn Stream) -> Result<(), SfntError> {
        color::load_colr(face, stream)
    }

    fn free_colr(&self, face: &mut Face) {
        color::free_colr(face)
    }

    fn load_colr_layer(&self, face: &Face, glyph: u16) -> Result<Vec<ColorLayer>, SfntError> {
        color::load_colr_layer(face, glyph)
    }

    fn colr_blend(
        &self,
        face: &Face,
        color_index: u16,
        base: &mut GlyphSlot,
        layer: &GlyphSlot,
    ) -> Result<(), SfntError> {
        color::colr_blend(face, color_index, base, layer)
    }

    fn get_metrics(&self, face: &Face, vertical: bool, glyph: u16) -> Result<(i16, u16), SfntError> {
        loader::get_metrics(face, vertical, glyph)
    }

    fn get_name<'f>(&self, face: &'f Face, name_id: u16) -> Option<&'f str> {
        get_name::get_name(face, name_id)
    }

    fn get_name_id(&self, face: &Face, name_id: u16) -> NameIdMatch {
        get_name::get_name_id(face, name_id)
    }

    fn find_sbit_image(
        &self,
        face: &Face,
        glyph: u16,
        strike_index: usize,
    ) -> Result<SbitLocation, SfntError> {
        bitmap::find_sbit_image(face, glyph, strike_index)
    }

    fn load_sbit_metrics(
        &self,
        stream: &mut dyn Stream,
        strike: &SbitStrike,
        range: &SbitRange,
        data_start: u64,
    ) -> Result<(BigMetrics, u64), SfntError> {
        bitmap::load_sbit_metrics(stream, strike, range, data_start)
    }
}

struct FullDriver;

impl SfntInterface for FullDriver {
    fn variant(&self) -> DriverVariant {
        DriverVariant::Full
    }
}

/// Reports every bitmap and color slot as missing.
struct OutlineDriver;

impl SfntInterface for OutlineDriver {
    fn variant(&self) -> DriverVariant {
        DriverVariant::OutlineOnly
    }

    fn load_sbit_image(
        &self,
        _face: &Face,
        _stream: &mut dyn Stream,
        _strike_index: usize,
        _glyph: u16,
        _flags: LoadFlags,
    ) -> Result<(Bitmap, BigMetrics), SfntError> {
        Err(SfntError::TableMissing(tag::EBLC))
    }

    fn load_eblc(&self, _face: &mut Face, _stream: &mut dyn Stream) -> Result<(), SfntError> {
        Err(SfntError::TableMissing(tag::EBLC))
    }

    fn free_eblc(&self, _face: &mut Face) {}

    fn set_sbit_strike(
        &self,
        _face: &Face,
        _request: SizeRequest,
        _policy: StrikeMatch,
    ) -> Result<usize, SfntError> {
        Err(SfntError::TableMissing(tag::EBLC))
    }

    fn load_strike_metrics(
        &self,
        _face: &Face,
        _strike_index: usize,
    ) -> Result<SizeMetrics, SfntError> {
        Err(SfntError::TableMissing(tag::EBLC))
    }

    fn load_colr(&self, _face: &mut Face, _stream: &mut dyn Stream) -> Result<(), SfntError> {
        Err(SfntError::TableMissing(tag::COLR))
    }

    fn free_colr(&self, _face: &mut Face) {}

    fn load_colr_layer(&self, _face: &Face, _glyph: u16) -> Result<Vec<ColorLayer>, SfntError> {
        Err(SfntError::TableMissing(tag::COLR))
    }

    fn colr_blend(
        &self,
        _face: &Face,
        _color_index: u16,
        _base: &mut GlyphSlot,
        _layer: &GlyphSlot,
    ) -> Result<(), SfntError> {
        Err(SfntError::TableMissing(tag::COLR))
    }

    fn find_sbit_image(
        &self,
        _face: &Face,
        _glyph: u16,
        _strike_index: usize,
    ) -> Result<SbitLocation, SfntError> {
        Err(SfntError::TableMissing(tag::EBLC))
    }

    fn load_sbit_metrics(
        &self,
        _stream: &mut dyn Stream,
        _strike: &SbitStrike,
        _range: &SbitRange,
        _data_start: u64,
    ) -> Result<(BigMetrics, u64), SfntError> {
        Err(SfntError::TableMissing(tag::EBLC))
    }
}

static FULL_DRIVER: FullDriver = FullDriver;
static OUTLINE_DRIVER: OutlineDriver = OutlineDriver;

/// The dispatch table of `variant`.
pub fn sfnt_interface(variant: DriverVariant) -> &'static dyn SfntInterface {
    match variant {
        DriverVariant::Full => &FULL_DRIVER,
        DriverVariant::OutlineOnly => &OUTLINE_DRIVER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryStream;
    use crate::tests::fonts::{self, StrikeSpec};

    fn bitmap_font() -> Vec<u8> {
        let strike = StrikeSpec::new(12, 1, 1, vec![fonts::small_glyph(1, 8, 0, 1, 8, &[0xFF])]);
        let (eblc, ebdt) = fonts::bitmap_tables(&[strike]);
        fonts::minimal_font()
            .table(fonts::EBLC, eblc)
            .table(fonts::EBDT, ebdt)
            .table(fonts::COLR, fonts::colr_table(&[(1, vec![(2, 0)])]))
            .table(fonts::CPAL, fonts::cpal_table(&[vec![[0, 0, 255, 255]]], None))
            .build()
    }

    fn load(variant: DriverVariant, data: Vec<u8>) -> (Face, MemoryStream<Vec<u8>>) {
        let driver = sfnt_interface(variant);
        let mut stream = MemoryStream::new(data);
        let mut face = driver.init_face(&mut stream, FaceIndex::new(0)).unwrap();
        driver.load_face(&mut face, &mut stream).unwrap();
        (face, stream)
    }

    #[test]
    fn full_driver_loads_everything() {
        let (face, _stream) = load(DriverVariant::Full, bitmap_font());
        let driver = sfnt_interface(DriverVariant::Full);
        assert!(face.head().is_some());
        assert!(face.hhea().is_some());
        assert!(face.vhea().is_none());
        assert!(face.name_table().is_some());
        assert_eq!(face.sbit_tables().map(|sbit| sbit.strikes.len()), Some(1));
        assert_eq!(
            driver.load_colr_layer(&face, 1).unwrap(),
            vec![ColorLayer {
                glyph_id: 2,
                color_index: 0
            }]
        );
        assert_eq!(driver.get_metrics(&face, false, 1).unwrap(), (20, 600));
        assert_eq!(driver.get_name(&face, 1), Some("Minimal"));
    }

    #[test]
    fn outline_only_reports_bitmaps_missing() {
        let (face, mut stream) = load(DriverVariant::OutlineOnly, bitmap_font());
        let driver = sfnt_interface(DriverVariant::OutlineOnly);
        assert!(face.sbit_tables().is_none());
        assert!(matches!(
            driver.set_sbit_strike(&face, SizeRequest::Ppem(12), StrikeMatch::default()),
            Err(SfntError::TableMissing(tag::EBLC))
        ));
        assert!(matches!(
            driver.load_sbit_image(&face, &mut stream, 0, 1, LoadFlags::empty()),
            Err(SfntError::TableMissing(tag::EBLC))
        ));
        assert!(matches!(
            driver.load_colr_layer(&face, 1),
            Err(SfntError::TableMissing(tag::COLR))
        ));
        assert!(driver.get_name(&face, 1).is_some());
    }

    #[test]
    fn capabilities() {
        let full = sfnt_interface(DriverVariant::Full);
        let outline = sfnt_interface(DriverVariant::OutlineOnly);
        assert_eq!(full.variant(), DriverVariant::Full);
        assert_eq!(outline.variant(), DriverVariant::OutlineOnly);
        for driver in [full, outline] {
            assert_eq!(driver.get_interface("glyph_names"), Some(Capability::GlyphNames));
            assert_eq!(
                driver.get_interface("postscript_name"),
                Some(Capability::PostscriptName)
            );
            assert_eq!(driver.get_interface("sfnt_table"), Some(Capability::SfntTable));
            assert_eq!(driver.get_interface("kerning"), Some(Capability::Kerning));
            assert_eq!(driver.get_interface("truetype_engine"), None);
        }
        assert_eq!(full.get_interface("bitmaps"), Some(Capability::Bitmaps));
        assert_eq!(full.get_interface("color_layers"), Some(Capability::ColorLayers));
        assert_eq!(outline.get_interface("bitmaps"), None);
        assert_eq!(outline.get_interface("color_layers"), None);
    }

    #[test]
    fn missing_maxp_is_fatal() {
        let data = fonts::minimal_font().without(fonts::MAXP).build();
        let driver = sfnt_interface(DriverVariant::Full);
        let mut stream = MemoryStream::new(data);
        let mut face = driver.init_face(&mut stream, FaceIndex::new(0)).unwrap();
        assert!(matches!(
            driver.load_face(&mut face, &mut stream),
            Err(SfntError::TableMissing(tag::MAXP))
        ));
    }

    #[test]
    fn missing_cmap_is_tolerated() {
        let data = fonts::minimal_font().without(fonts::CMAP).build();
        let (face, _stream) = load(DriverVariant::Full, data);
        assert!(!face.has_cmap());
        assert_eq!(face.char_index('A'), None);
    }

    #[test]
    fn missing_header_is_fatal() {
        let data = fonts::minimal_font().without(fonts::HEAD).build();
        let driver = sfnt_interface(DriverVariant::Full);
        let mut stream = MemoryStream::new(data);
        let mut face = driver.init_face(&mut stream, FaceIndex::new(0)).unwrap();
        assert!(matches!(
            driver.load_face(&mut face, &mut stream),
            Err(SfntError::TableMissing(tag::HEAD))
        ));
    }

    #[test]
    fn bitmap_only_font_without_metrics() {
        let data = fonts::minimal_font()
            .without(fonts::HEAD)
            .without(fonts::HHEA)
            .without(fonts::HMTX)
            .table(fonts::BHED, fonts::head_table(2048))
            .build();
        let (face, _stream) = load(DriverVariant::Full, data);
        assert!(face.head().is_some());
        assert!(face.hhea().is_none());
    }

    #[test]
    fn metrics_required_outside_bitmap_only_fonts() {
        let data = fonts::minimal_font().without(fonts::HMTX).build();
        let driver = sfnt_interface(DriverVariant::Full);
        let mut stream = MemoryStream::new(data);
        let mut face = driver.init_face(&mut stream, FaceIndex::new(0)).unwrap();
        assert!(matches!(
            driver.load_face(&mut face, &mut stream),
            Err(SfntError::TableMissing(tag::HMTX))
        ));
    }

    #[test]
    fn corrupt_optional_table_is_skipped() {
        let data = fonts::minimal_font()
            .table(fonts::KERN, vec![0, 0, 0, 0])
            .build();
        let (face, _stream) = load(DriverVariant::Full, data);
        assert!(!face.has_kern());
        assert!(face.name_table().is_some());
    }
}
