use crate::{
    color::ReductionMethod,
    encode::{ConvertError, Raster},
    palette::BitDepth,
};
use image::RgbaImage;
use snafu::{ResultExt, Snafu};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

pub use png::Compression;

#[derive(Debug, Snafu)]
pub enum EncodePngError {
    #[snafu(display("Failed to convert `{}`", path.display()))]
    Convert {
        path: PathBuf,
        source: ConvertError,
    },
    #[snafu(display("PNG encoding failed"))]
    Png { source: png::EncodingError },
    #[snafu(display("Failed to open image `{}`", path.display()))]
    OpenImage {
        path: PathBuf,
        source: image::ImageError,
    },
    #[snafu(display("Failed to write `{}`", path.display()))]
    WriteIo {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<BitDepth> for png::BitDepth {
    fn from(depth: BitDepth) -> Self {
        match depth {
            BitDepth::One => png::BitDepth::One,
            BitDepth::Two => png::BitDepth::Two,
            BitDepth::Four => png::BitDepth::Four,
        }
    }
}

impl Raster {
    /// Converts an already decoded image.
    pub fn from_image(image: &RgbaImage, method: ReductionMethod) -> Result<Self, ConvertError> {
        let pixels = image.pixels().map(|p| p.0).collect::<Vec<_>>();
        Raster::from_rgba(image.width(), image.height(), &pixels, method)
    }

    /// Writes the raster as a greyscale or indexed PNG at its bit depth.
    pub fn write_png<W: Write>(&self, w: W, compression: Compression) -> Result<(), EncodePngError> {
        let mut encoder = png::Encoder::new(w, self.width, self.height);
        encoder.set_depth(self.bit_depth.into());
        encoder.set_compression(compression);

        match &self.palette {
            None => {
                encoder.set_color(png::ColorType::Grayscale);
                if let Some(key) = self.transparent {
                    // 16-bit big-endian grey sample
                    encoder.set_trns(vec![0, key]);
                }
            }
            Some(palette) => {
                encoder.set_color(png::ColorType::Indexed);
                let (rgb, alpha) = palette.split_alpha();
                encoder.set_palette(rgb.concat());
                if let Some(alpha) = alpha {
                    encoder.set_trns(alpha);
                }
            }
        }

        let mut writer = encoder.write_header().context(PngSnafu)?;
        writer
            .write_image_data(&self.packed_rows())
            .context(PngSnafu)?;
        writer.finish().context(PngSnafu)
    }

    pub fn to_png_vec(&self, compression: Compression) -> Result<Vec<u8>, EncodePngError> {
        let mut v = Vec::with_capacity(self.stride() * self.height as usize + 128);
        self.write_png(&mut v, compression)?;
        Ok(v)
    }
}

/// Decodes any supported raster file into RGBA.
pub fn load_rgba(path: &Path) -> Result<RgbaImage, EncodePngError> {
    let image = image::open(path).context(OpenImageSnafu { path })?;
    Ok(image.into_rgba8())
}

/// Converts the image at `input` and writes the result as PNG to `output`.
pub fn convert_file(
    input: &Path,
    output: &Path,
    method: ReductionMethod,
) -> Result<Raster, EncodePngError> {
    let image = load_rgba(input)?;
    let raster = Raster::from_image(&image, method).context(ConvertSnafu { path: input })?;

    let file = File::create(output).context(WriteIoSnafu { path: output })?;
    let mut w = BufWriter::new(file);
    raster.write_png(&mut w, Compression::Best)?;
    w.flush().context(WriteIoSnafu { path: output })?;

    Ok(raster)
}
