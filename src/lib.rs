#![warn(rust_2018_idioms)]

//! Table loading and dispatch for SFNT (TrueType and OpenType) fonts.
//!
//! A [Face](face::Face) is resolved from a [Stream](stream::Stream) with
//! [init_face](directory::init_face) and its tables are then loaded one at a time, or all at
//! once through the [SfntInterface](interface::SfntInterface) of a driver variant:
//!
//! ```
//! use sfnt_driver::face::FaceIndex;
//! use sfnt_driver::interface::{sfnt_interface, DriverVariant};
//! use sfnt_driver::stream::MemoryStream;
//!
//! fn family_name(data: &[u8]) -> Result<Option<String>, sfnt_driver::SfntError> {
//!     let driver = sfnt_interface(DriverVariant::Full);
//!     let mut stream = MemoryStream::new(data);
//!     let mut face = driver.init_face(&mut stream, FaceIndex::new(0))?;
//!     driver.load_face(&mut face, &mut stream)?;
//!     Ok(driver.get_name(&face, 1).map(String::from))
//! }
//! ```

/// Tag-addressed access to table bytes.
pub mod access;
/// Reading of binary data.
pub mod binary;
pub mod bitmap;
pub mod color;
pub mod directory;
pub mod error;
pub mod face;
pub mod get_name;
pub mod interface;
pub mod loader;
pub mod size;
pub mod stream;
pub mod tables;
pub mod tag;

pub use crate::error::{ParseError, SfntError};
pub use crate::face::{Face, FaceIndex};
pub use crate::interface::{sfnt_interface, DriverVariant, SfntInterface};
pub use crate::stream::{IoStream, MemoryStream, Stream};

/// Lossless integer conversion to `usize`.
///
/// Only implemented where `usize` is at least as wide as the source on every supported target.
pub(crate) trait SafeFrom<T>: Sized {
    fn safe_from(value: T) -> Self;
}

#[cfg(not(any(target_pointer_width = "32", target_pointer_width = "64")))]
compile_error!("sfnt-driver requires a 32 or 64-bit target");

impl SafeFrom<u32> for usize {
    fn safe_from(value: u32) -> Self {
        value as usize
    }
}
