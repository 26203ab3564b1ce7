//! First conversion pass: palette collection and bit depth selection.
use crate::color::{ReductionMethod, TRANSPARENT};
use alloc::vec::Vec;
use snafu::Snafu;

/// Grey levels in the order in which they need more bits: black and white fit into 1 bit, the
/// two mid greys need 2.
pub const GREY_LEVELS: [u8; 4] = [0x00, 0xFF, 0x55, 0xAA];

/// Grey code reserved for transparency in 4-bit greyscale images, where the four canonical greys
/// may all be taken.
pub const TRANSPARENT_GREY_4BIT: u8 = 0xC;

/// Largest palette an indexed image can have.
pub const MAX_INDEXED_COLORS: usize = 16;

#[derive(Debug, Snafu)]
pub enum PaletteError {
    #[snafu(display(
        "Image uses {colors} colors after reduction, but at most {} are supported",
        MAX_INDEXED_COLORS
    ))]
    UnsupportedPaletteSize { colors: usize },
}

/// Bits per output sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum BitDepth {
    One = 1,
    Two = 2,
    Four = 4,
}

impl BitDepth {
    #[inline]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Number of distinct samples this depth can express.
    #[inline]
    pub const fn max_colors(self) -> usize {
        1 << self.bits()
    }

    /// Scales an 8-bit grey level down to this depth.
    #[inline]
    pub const fn shift_grey(self, level: u8) -> u8 {
        level >> (8 - self.bits())
    }

    /// Smallest depth able to index `colors` palette entries.
    pub fn for_colors(colors: usize) -> Result<Self, PaletteError> {
        let depth = [BitDepth::One, BitDepth::Two, BitDepth::Four]
            .into_iter()
            .find(|depth| depth.max_colors() >= colors);

        depth.ok_or(PaletteError::UnsupportedPaletteSize { colors })
    }
}

/// Result of the palette pass over an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteInfo {
    /// Distinct reduced colors in the order they were first seen.
    pub palette: Vec<[u8; 4]>,
    /// Only opaque greys and the transparent color occur.
    pub is_grey: bool,
    /// Some reduced color is not fully opaque.
    pub has_alpha: bool,
    pub bit_depth: BitDepth,
    /// Sample value standing for "transparent" in greyscale images with alpha.
    pub transparent_grey: Option<u8>,
}

impl PaletteInfo {
    /// Scans all pixels and derives palette, color class and bit depth.
    pub fn build(pixels: &[[u8; 4]], method: ReductionMethod) -> Result<Self, PaletteError> {
        let mut palette: Vec<[u8; 4]> = Vec::new();
        let mut is_grey = true;
        let mut has_alpha = false;

        for &pixel in pixels {
            let color = method.map(pixel);
            if palette.contains(&color) {
                continue;
            }

            let [r, g, b, a] = color;
            if a != 0xFF {
                has_alpha = true;
            }
            if is_grey && !((r == g && g == b && a == 0xFF) || color == TRANSPARENT) {
                is_grey = false;
            }
            palette.push(color);
        }

        let bit_depth = if is_grey {
            grey_bit_depth(&palette)
        } else {
            BitDepth::for_colors(palette.len())?
        };

        let transparent_grey = if is_grey && has_alpha {
            transparent_grey(&palette, bit_depth)
        } else {
            None
        };

        log::trace!(
            "palette: {} colors, grey: {is_grey}, alpha: {has_alpha}, depth: {}",
            palette.len(),
            bit_depth.bits()
        );

        Ok(PaletteInfo {
            palette,
            is_grey,
            has_alpha,
            bit_depth,
            transparent_grey,
        })
    }

    /// The palette as stored in the output: without alpha channel for opaque indexed images.
    pub fn output_palette(&self) -> Option<OutputPalette> {
        if self.is_grey {
            None
        } else if self.has_alpha {
            Some(OutputPalette::Rgba(self.palette.clone()))
        } else {
            Some(OutputPalette::Rgb(
                self.palette.iter().map(|&[r, g, b, _]| [r, g, b]).collect(),
            ))
        }
    }
}

/// Palette of an indexed image as it gets serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputPalette {
    Rgb(Vec<[u8; 3]>),
    Rgba(Vec<[u8; 4]>),
}

impl OutputPalette {
    pub fn len(&self) -> usize {
        match self {
            OutputPalette::Rgb(colors) => colors.len(),
            OutputPalette::Rgba(colors) => colors.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index of the entry matching a reduced color. Opaque palettes ignore the alpha channel.
    pub fn position(&self, color: [u8; 4]) -> Option<usize> {
        match self {
            OutputPalette::Rgb(colors) => {
                let [r, g, b, _] = color;
                colors.iter().position(|&c| c == [r, g, b])
            }
            OutputPalette::Rgba(colors) => colors.iter().position(|&c| c == color),
        }
    }

    /// RGB triples followed by per-entry alpha, if the palette has one.
    pub fn split_alpha(&self) -> (Vec<[u8; 3]>, Option<Vec<u8>>) {
        match self {
            OutputPalette::Rgb(colors) => (colors.clone(), None),
            OutputPalette::Rgba(colors) => (
                colors.iter().map(|&[r, g, b, _]| [r, g, b]).collect(),
                Some(colors.iter().map(|c| c[3]).collect()),
            ),
        }
    }
}

fn contains_grey(palette: &[[u8; 4]], level: u8) -> bool {
    palette.contains(&[level, level, level, 0xFF])
}

fn grey_bit_depth(palette: &[[u8; 4]]) -> BitDepth {
    if contains_grey(palette, 0x55) || contains_grey(palette, 0xAA) {
        // all four greys plus transparency no longer fit into 2 bits
        if palette.len() >= 5 {
            BitDepth::Four
        } else {
            BitDepth::Two
        }
    } else if palette.len() >= 3 {
        // black, white and transparency
        BitDepth::Two
    } else {
        BitDepth::One
    }
}

fn transparent_grey(palette: &[[u8; 4]], bit_depth: BitDepth) -> Option<u8> {
    if bit_depth == BitDepth::Four {
        return Some(TRANSPARENT_GREY_4BIT);
    }

    GREY_LEVELS
        .iter()
        .find(|&&level| !contains_grey(palette, level))
        .map(|&level| bit_depth.shift_grey(level))
}
