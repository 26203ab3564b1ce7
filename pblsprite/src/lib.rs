//! Converter and packer for sprites shown on 64-color / greyscale watch displays.
//!
//! Source images are reduced to the fixed 64-color device palette (2 bits per channel, binary
//! alpha), written as 1-, 2- or 4-bit PNGs, and bundled into a single sprite table that the
//! firmware can index without parsing the PNGs themselves.
//!
//! # Conversion
//!
//! Conversion is two passes over the same RGBA plane with the same [`ReductionMethod`]:
//!
//! 1. [`PaletteInfo::build`] collects the distinct mapped colors in first-seen order, decides
//!    whether the image is greyscale, whether it uses transparency, and picks the bit depth.
//! 2. [`Raster::from_rgba`] maps every pixel again and emits a greyscale code or a palette index.
//!
//! Greyscale images carry no palette; transparency is expressed through a single reserved grey
//! code. Opaque indexed images store an RGB palette, indexed images with transparency an RGBA
//! one.
//!
//! # Sprite table
//!
//! See [consts] for the container layout. Every payload is followed by 1 to 16 zero bytes so the
//! next payload starts on a 16-byte boundary. A payload whose length is already a multiple of 16
//! still gets a full 16 bytes of padding.
#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod color;
#[cfg(feature = "alloc")]
pub mod encode;
#[cfg(feature = "alloc")]
pub mod palette;
pub mod table;
#[cfg(feature = "std")]
pub mod tilemap;
#[cfg(feature = "std")]
pub mod tiles;

pub use color::ReductionMethod;
#[cfg(feature = "alloc")]
pub use encode::Raster;
#[cfg(feature = "alloc")]
pub use palette::{BitDepth, PaletteInfo};
pub use table::reader::SpriteTable;
#[cfg(feature = "alloc")]
pub use table::SpriteTableWriter;

/// Fixed values of the sprite table container. All integers are little-endian.
pub mod consts {
    /// Container format version written by this crate.
    ///
    /// ```plain
    /// .- header ------------------------------------------------------.
    /// | offset 0      | offset 4        | offset 8      | offset 12    |
    /// |---------------+-----------------+---------------+--------------|
    /// | u32 version   | u32 total size  | u32 records   | u32 reserved |
    /// `---------------------------------------------------------------'
    /// ```
    ///
    /// - `total size` is the length of the whole file, padding included
    /// - `records` is the number of entries in the record table
    /// - `reserved` is always written as 0
    ///
    /// Tables written by the older Python `spritesheetgen.py` carry the same version but store
    /// `32 * records` at offset 8 and a total size that leaves out the payload padding.
    /// [`SpriteTable::parse`](crate::SpriteTable::parse) rejects any such table with at least one
    /// record as a size mismatch.
    pub const SPRITE_TABLE_VERSION: u32 = 1;

    /// Size of the container header in bytes.
    pub const HEADER_SIZE: usize = 16;

    /// Size of one record of the record table in bytes.
    ///
    /// ```plain
    /// .- record -----------------------------------------------------.
    /// | 0 .. 19        | 20 .. 23     | 24 .. 27       | 28 .. 31     |
    /// |----------------+--------------+----------------+--------------|
    /// | char[20] name  | u32 local id | u32 offset     | u32 size     |
    /// `--------------------------------------------------------------'
    /// ```
    ///
    /// - `name` is the tileset name, NUL-padded; a 20-character name has no terminator
    /// - `local id` counts tiles of one tileset starting at 1
    /// - `offset` is relative to the start of the payload area (`16 + 32 * records`)
    /// - `size` is the exact payload length, without padding
    pub const RECORD_SIZE: usize = 32;

    /// Size of the name slot of a record.
    pub const NAME_SIZE: usize = 20;

    /// Payloads start on multiples of this within the payload area.
    pub const PAYLOAD_ALIGNMENT: usize = 16;
}
