use crate::{
    color::ReductionMethod,
    palette::{BitDepth, OutputPalette, PaletteError, PaletteInfo},
};
use alloc::vec::Vec;
use snafu::{ensure, ResultExt, Snafu};

#[cfg(feature = "std")]
mod png_api;
#[cfg(feature = "std")]
pub use png_api::*;

#[derive(Debug, Snafu)]
pub enum ConvertError {
    #[snafu(display(
        "Specified image dimensions don't match the number of pixels: {width} * {height} == {} pixels, but {pixel_count} pixels were given",
        width * height
    ))]
    InvalidDimensions {
        width: usize,
        height: usize,
        pixel_count: usize,
    },
    #[snafu(display("Palette pass failed"))]
    Palette { source: PaletteError },
    #[snafu(display("Reduced color {color:?} is missing from the palette"))]
    EncodingConsistency { color: [u8; 4] },
}

/// A converted image: one sample per pixel at a fixed bit depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub bit_depth: BitDepth,
    pub greyscale: bool,
    /// `None` for greyscale images.
    pub palette: Option<OutputPalette>,
    /// Greyscale sample meaning "transparent".
    pub transparent: Option<u8>,
    /// Grey codes or palette indices, row-major.
    pub samples: Vec<u8>,
}

impl Raster {
    /// Runs both conversion passes over a row-major RGBA plane.
    pub fn from_rgba(
        width: u32,
        height: u32,
        pixels: &[[u8; 4]],
        method: ReductionMethod,
    ) -> Result<Self, ConvertError> {
        let (w, h) = (width as usize, height as usize);
        ensure!(
            w * h == pixels.len(),
            InvalidDimensionsSnafu {
                width: w,
                height: h,
                pixel_count: pixels.len()
            }
        );

        let info = PaletteInfo::build(pixels, method).context(PaletteSnafu)?;
        let samples = encode_samples(pixels, method, &info)?;

        Ok(Raster {
            width,
            height,
            bit_depth: info.bit_depth,
            greyscale: info.is_grey,
            palette: info.output_palette(),
            transparent: info.transparent_grey,
            samples,
        })
    }

    /// Bytes per packed row.
    #[inline]
    pub fn stride(&self) -> usize {
        (self.width as usize * usize::from(self.bit_depth.bits())).div_ceil(8)
    }

    /// Samples packed MSB-first, every row starting on a byte boundary.
    pub fn packed_rows(&self) -> Vec<u8> {
        let mut packed = Vec::with_capacity(self.stride() * self.height as usize);
        if self.width == 0 {
            return packed;
        }

        for row in self.samples.chunks(self.width as usize) {
            pack_row(row, self.bit_depth, &mut packed);
        }
        packed
    }
}

/// Second conversion pass: maps every pixel again and looks it up in the palette pass result.
pub fn encode_samples(
    pixels: &[[u8; 4]],
    method: ReductionMethod,
    info: &PaletteInfo,
) -> Result<Vec<u8>, ConvertError> {
    let depth = info.bit_depth;
    let palette = info.output_palette();

    pixels
        .iter()
        .map(|&pixel| {
            let color = method.map(pixel);

            match &palette {
                None => {
                    if !info.palette.contains(&color) {
                        return Err(ConvertError::EncodingConsistency { color });
                    }
                    if color[3] == 0 {
                        info.transparent_grey
                            .ok_or(ConvertError::EncodingConsistency { color })
                    } else {
                        Ok(depth.shift_grey(color[0]))
                    }
                }
                Some(palette) => palette
                    .position(color)
                    .map(|index| index as u8)
                    .ok_or(ConvertError::EncodingConsistency { color }),
            }
        })
        .collect()
}

/// Appends one row of samples to `out`, `8 / depth` samples per byte, first sample in the
/// highest bits. The last byte is zero-filled.
pub fn pack_row(samples: &[u8], depth: BitDepth, out: &mut Vec<u8>) {
    let bits = depth.bits();
    let per_byte = usize::from(8 / bits);
    let mask = (1u8 << bits) - 1;

    for chunk in samples.chunks(per_byte) {
        let mut byte = 0u8;
        for (i, &sample) in chunk.iter().enumerate() {
            byte |= (sample & mask) << (8 - bits * (i as u8 + 1));
        }
        out.push(byte);
    }
}
