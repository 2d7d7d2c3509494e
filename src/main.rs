use anyhow::{bail, Context};
use raw2png::{
    chunks::{iter_png, Chunk},
    ColorTransform, EncodeError, PngEncoder, Raster,
};

const USAGE: &str = "usage:
    raw2png [-v] encode <input.raw> <output.png> <width> <height> [filter] [noise-strength]
    raw2png [-v] inspect <file.png>

filters: none (default), negative, grayscale, perlin";

fn main() -> anyhow::Result<()> {
    let mut args: Vec<_> = std::env::args().skip(1).collect();
    let verbosity = if args.first().map(String::as_str) == Some("-v") {
        args.remove(0);
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Error
    };
    pretty_env_logger::formatted_builder()
        .filter_level(verbosity)
        .parse_default_env()
        .init();

    match args.first().map(String::as_str) {
        Some("encode") => encode(&args[1..]),
        Some("inspect") => inspect(&args[1..]),
        _ => bail!("{USAGE}"),
    }
}

fn encode(args: &[String]) -> anyhow::Result<()> {
    let [input, output, width, height, rest @ ..] = args else {
        bail!("{USAGE}");
    };
    if rest.len() > 2 {
        bail!("{USAGE}");
    }
    let width: u32 = width
        .parse()
        .with_context(|| format!("invalid width {width:?}"))?;
    let height: u32 = height
        .parse()
        .with_context(|| format!("invalid height {height:?}"))?;
    let filter = rest.first().map(String::as_str).unwrap_or("none");
    let strength = rest
        .get(1)
        .map(|s| {
            s.parse::<f32>()
                .map_err(|_| EncodeError::InvalidStrength(s.clone()))
        })
        .transpose()?;

    let transform = ColorTransform::with_strength(filter, strength)?;
    let raster = Raster::load(input, width, height)?;
    PngEncoder::new(transform)
        .encode_to_file(raster, output)
        .with_context(|| format!("Failed to encode {input} with the {transform} filter."))?;
    Ok(())
}

fn inspect(args: &[String]) -> anyhow::Result<()> {
    let [file_name] = args else {
        bail!("{USAGE}");
    };
    let input = std::fs::read(file_name).with_context(|| format!("Failed to read {file_name}"))?;
    for chunk in iter_png(&input)? {
        let chunk = chunk?;
        let chunk_type = String::from_utf8_lossy(chunk.chunk_type()).into_owned();
        match chunk {
            Chunk::IHDR(ihdr) => println!(
                "{chunk_type}: {}x{}, bit depth {}, color type {}, interlace {}",
                ihdr.width, ihdr.height, ihdr.bit_depth, ihdr.color_type, ihdr.interlace_method
            ),
            Chunk::IDAT(idat) => println!("{chunk_type}: {} bytes", idat.data.len()),
            Chunk::IEND => println!("{chunk_type}"),
            Chunk::Unknown(raw) => println!("{chunk_type}: {} bytes (skipped)", raw.data.len()),
        }
    }
    Ok(())
}
