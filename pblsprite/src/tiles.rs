//! Cutting tilesets into tiles and packing them into a sprite table.
use crate::{
    color::ReductionMethod,
    encode::{convert_file, load_rgba, EncodePngError},
    table::{PackError, SpriteTableWriter, WriteTableError},
    tilemap::{TileMap, TileMapError, TilesetGeometry},
};
use image::RgbaImage;
use itertools::iproduct;
use snafu::{ensure, ResultExt, Snafu};
use std::path::{Path, PathBuf};

#[derive(Debug, Snafu)]
pub enum PackTilesError {
    #[snafu(display("Failed to load the tile map"))]
    TileMap { source: TileMapError },
    #[snafu(display("Tileset `{tileset}`: {reason}"))]
    MalformedTileGeometry {
        tileset: String,
        reason: &'static str,
    },
    #[snafu(display("Failed to convert a tile of tileset `{tileset}`"))]
    Convert {
        tileset: String,
        source: EncodePngError,
    },
    #[snafu(display("Failed to save tile `{}`", path.display()))]
    SaveTile {
        path: PathBuf,
        source: image::ImageError,
    },
    #[snafu(display("Failed to read converted tile `{}`", path.display()))]
    ReadTile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to add a tile of tileset `{tileset}`"))]
    Pack {
        tileset: String,
        source: PackError,
    },
    #[snafu(display("Failed to write the sprite table"))]
    WriteTable { source: WriteTableError },
    #[snafu(display("Sprite table `{}` would overwrite the tile map", path.display()))]
    OutputIsInput { path: PathBuf },
    #[snafu(display("Failed to create a work directory in `{}`", path.display()))]
    WorkDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default)]
pub struct PackOptions {
    pub method: ReductionMethod,
    /// Leave the cropped and converted tile images next to the output.
    pub keep_temp_files: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackSummary {
    pub output: PathBuf,
    pub tilesets: usize,
    pub tiles: usize,
    pub file_size: usize,
}

/// Intermediate files of one run. Everything registered is deleted on drop unless kept.
#[derive(Debug)]
pub struct TempFiles {
    files: Vec<PathBuf>,
    keep: bool,
}

impl TempFiles {
    pub fn new(keep: bool) -> Self {
        Self {
            files: Vec::new(),
            keep,
        }
    }

    /// Registers a path before the file is created, so a failed write is cleaned up too.
    pub fn track(&mut self, path: PathBuf) -> &Path {
        self.files.push(path);
        &self.files[self.files.len() - 1]
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.files
    }
}

impl Drop for TempFiles {
    fn drop(&mut self) {
        if self.keep {
            return;
        }

        for path in &self.files {
            log::debug!("Removing {}", path.display());
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Failed to remove `{}`: {e}", path.display()),
            }
        }
    }
}

/// Cuts the tile in column `x`, row `y` out of the tileset image.
pub fn crop_tile(
    atlas: &RgbaImage,
    tileset: &TilesetGeometry,
    x: u32,
    y: u32,
) -> Result<RgbaImage, PackTilesError> {
    let rect = tileset.tile_rect(x, y).filter(|&(left, top, width, height)| {
        (0..=i64::from(atlas.width()) - i64::from(width)).contains(&left)
            && (0..=i64::from(atlas.height()) - i64::from(height)).contains(&top)
    });
    let Some((left, top, width, height)) = rect else {
        return MalformedTileGeometrySnafu {
            tileset: &tileset.name,
            reason: "tile extends past the tileset image",
        }
        .fail();
    };

    Ok(image::imageops::crop_imm(atlas, left as u32, top as u32, width, height).to_image())
}

/// File name stem for intermediate files of a tileset.
fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "tileset".into()
    } else {
        stem
    }
}

/// Converts every tile of `tileset` and appends it to `table`. Returns the number of tiles.
pub fn pack_tileset(
    tileset: &TilesetGeometry,
    work_dir: &Path,
    options: &PackOptions,
    temp_files: &mut TempFiles,
    table: &mut SpriteTableWriter,
) -> Result<usize, PackTilesError> {
    log::info!(
        "Tileset: {}, x: {}, y: {}, {}x{} tiles of {}x{}",
        tileset.name,
        tileset.offset.0,
        tileset.offset.1,
        tileset.columns,
        tileset.rows,
        tileset.tile_width,
        tileset.tile_height
    );
    log::info!("  source: {}", tileset.image.display());

    let atlas = load_rgba(&tileset.image).context(ConvertSnafu {
        tileset: &tileset.name,
    })?;
    let stem = file_stem(&tileset.name);

    let mut count = 0;
    for (n, (y, x)) in iproduct!(0..tileset.rows, 0..tileset.columns).enumerate() {
        let tile = crop_tile(&atlas, tileset, x, y)?;

        let cropped = temp_files.track(work_dir.join(format!("{stem}_{n}.png"))).to_owned();
        tile.save(&cropped).context(SaveTileSnafu { path: &cropped })?;

        let converted = temp_files
            .track(work_dir.join(format!("{stem}_{n}-conv.png")))
            .to_owned();
        let raster = convert_file(&cropped, &converted, options.method).context(ConvertSnafu {
            tileset: &tileset.name,
        })?;

        let bytes = std::fs::read(&converted).context(ReadTileSnafu { path: &converted })?;
        let record = table
            .add_entry(&tileset.name, n as u32 + 1, &bytes)
            .context(PackSnafu {
                tileset: &tileset.name,
            })?;

        log::debug!(
            "  Tile {n}: {}-bit {}, {} bytes at {}",
            raster.bit_depth.bits(),
            if raster.greyscale { "grey" } else { "indexed" },
            record.size,
            record.offset
        );
        count += 1;
    }

    Ok(count)
}

/// Packs every tileset of the map at `map_path` into `<map stem>.dat` next to it.
///
/// Intermediate tiles go into a private directory next to the output, or next to the map itself
/// when they are kept.
pub fn pack_tile_map(map_path: &Path, options: &PackOptions) -> Result<PackSummary, PackTilesError> {
    let output = map_path.with_extension("dat");
    ensure!(output != map_path, OutputIsInputSnafu { path: output });

    let map = TileMap::load(map_path).context(TileMapSnafu)?;
    let out_dir = match output.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let scratch = if options.keep_temp_files {
        None
    } else {
        let dir = tempfile::Builder::new()
            .prefix(".pblsprite-")
            .tempdir_in(&out_dir)
            .context(WorkDirSnafu { path: &out_dir })?;
        Some(dir)
    };
    let work_dir = scratch.as_ref().map_or(out_dir.as_path(), |dir| dir.path());

    let mut temp_files = TempFiles::new(options.keep_temp_files);
    let mut table = SpriteTableWriter::new();

    let mut tiles = 0;
    for tileset in &map.tilesets {
        tiles += pack_tileset(tileset, work_dir, options, &mut temp_files, &mut table)?;
    }

    log::info!("Creating sprite data table: {}", output.display());
    let file_size = table.file_size();
    table.finalize(&output).context(WriteTableSnafu)?;

    if !options.keep_temp_files {
        log::info!("Cleaning up {} temp files", temp_files.paths().len());
    }

    Ok(PackSummary {
        output,
        tilesets: map.tilesets.len(),
        tiles,
        file_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn geometry(columns: u32, rows: u32) -> TilesetGeometry {
        TilesetGeometry {
            name: "blocks".into(),
            tile_width: 2,
            tile_height: 2,
            xspacing: 1,
            yspacing: 0,
            offset: (1, 0),
            image: PathBuf::new(),
            columns,
            rows,
        }
    }

    #[test]
    fn crop_respects_spacing() {
        // 8x2 atlas: one marker column between tiles
        let atlas = RgbaImage::from_fn(8, 2, |x, _| Rgba([x as u8 * 10, 0, 0, 255]));
        let tileset = geometry(2, 1);

        let first = crop_tile(&atlas, &tileset, 0, 0).unwrap();
        assert_eq!(first.dimensions(), (2, 2));
        assert_eq!(first.get_pixel(0, 0).0[0], 10);

        let second = crop_tile(&atlas, &tileset, 1, 0).unwrap();
        assert_eq!(second.get_pixel(0, 1).0[0], 40);
        assert_eq!(second.get_pixel(1, 0).0[0], 50);

        let outside = crop_tile(&atlas, &tileset, 2, 0).unwrap_err();
        assert!(matches!(outside, PackTilesError::MalformedTileGeometry { .. }));
    }

    #[test]
    fn temp_files_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let never_created = dir.path().join("b.png");
        {
            let mut temp = TempFiles::new(false);
            std::fs::write(temp.track(a.clone()), b"x").unwrap();
            temp.track(never_created.clone());
        }
        assert!(!a.exists());

        {
            let mut temp = TempFiles::new(true);
            std::fs::write(temp.track(a.clone()), b"x").unwrap();
        }
        assert!(a.exists());
    }

    #[test]
    fn file_stems() {
        assert_eq!(file_stem("mario"), "mario");
        assert_eq!(file_stem("big mario/2"), "big_mario_2");
        assert_eq!(file_stem(""), "tileset");
    }
}
