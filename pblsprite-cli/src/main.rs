use argh::FromArgs;
use pblsprite::{
    encode::convert_file,
    tiles::{pack_tile_map, PackOptions},
    ReductionMethod, SpriteTable,
};
use std::path::PathBuf;

/// Converts images for 64-color watch displays and packs tilesets into sprite tables.
#[derive(FromArgs)]
struct Cli {
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Pack(Pack),
    Convert(Convert),
    Inspect(Inspect),
}

/// Creates a sprite table (`<map>.dat`) for every tileset of the given Tiled maps (TMX or JSON).
#[derive(FromArgs)]
#[argh(subcommand, name = "pack")]
struct Pack {
    /// keep the cropped and converted tile images
    #[argh(switch)]
    keep_temp_files: bool,

    /// color reduction method (nearest, truncate)
    #[argh(option, default = "ReductionMethod::Nearest")]
    method: ReductionMethod,

    /// tile map files
    #[argh(positional)]
    maps: Vec<PathBuf>,
}

/// Converts one image to a 64-color palettized or greyscale PNG.
#[derive(FromArgs)]
#[argh(subcommand, name = "convert")]
struct Convert {
    /// color reduction method (nearest, truncate)
    #[argh(option, default = "ReductionMethod::Nearest")]
    method: ReductionMethod,

    /// the input image (PNG, JPG or BMP)
    #[argh(positional)]
    input: PathBuf,
    /// the output PNG
    #[argh(positional)]
    output: PathBuf,
}

/// Lists the records of a sprite table.
#[derive(FromArgs)]
#[argh(subcommand, name = "inspect")]
struct Inspect {
    /// the sprite table file
    #[argh(positional)]
    input: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Cli { command } = argh::from_env();

    match command {
        Command::Pack(options) => pack(options),
        Command::Convert(options) => convert(options),
        Command::Inspect(options) => inspect(options),
    }
}

fn pack(options: Pack) -> Result<(), Box<dyn std::error::Error>> {
    let Pack {
        keep_temp_files,
        method,
        maps,
    } = options;

    if maps.is_empty() {
        return Err("no tile maps given".into());
    }

    let pack_options = PackOptions {
        method,
        keep_temp_files,
    };

    for map in maps {
        log::info!("Packing `{}` ({method})", map.display());
        let summary = pack_tile_map(&map, &pack_options).map_err(report)?;
        println!(
            "Written {} tiles from {} tilesets ({} bytes) to `{}`",
            summary.tiles,
            summary.tilesets,
            summary.file_size,
            summary.output.display()
        );
    }

    Ok(())
}

fn convert(options: Convert) -> Result<(), Box<dyn std::error::Error>> {
    let Convert {
        method,
        input,
        output,
    } = options;

    log::info!("Converting `{}` ({method})", input.display());

    let raster = convert_file(&input, &output, method).map_err(report)?;

    println!(
        "Written {}x{} {}-bit {} image to `{}`",
        raster.width,
        raster.height,
        raster.bit_depth.bits(),
        if raster.greyscale { "greyscale" } else { "palettized" },
        output.display()
    );

    Ok(())
}

fn inspect(options: Inspect) -> Result<(), Box<dyn std::error::Error>> {
    let data = std::fs::read(&options.input)?;
    log::debug!("Read {} bytes from `{}`", data.len(), options.input.display());
    let table = SpriteTable::parse(&data).map_err(|e| format!("{e}"))?;
    let header = table.header();

    println!(
        "version {}, {} bytes, {} records",
        header.version,
        header.file_size,
        table.len()
    );
    for record in table.records() {
        println!(
            "{:<20} #{:<4} offset {:>8} size {:>6}",
            record.name_str().unwrap_or("<invalid>"),
            record.local_id,
            record.offset,
            record.size
        );
    }

    Ok(())
}

/// Flattens an error and its sources into one message.
fn report(error: impl std::error::Error) -> Box<dyn std::error::Error> {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message.into()
}
