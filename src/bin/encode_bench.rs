use anyhow::Context;
use raw2png::{ColorTransform, PngEncoder, Raster};
use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

const NOISE_STRENGTH: f32 = 50.0;

/// Parses `<name>_<width>x<height>` out of a file stem.
fn parse_dimensions(stem: &str) -> Option<(&str, u32, u32)> {
    let (name, dims) = stem.rsplit_once('_')?;
    let (width, height) = dims.split_once('x')?;
    Some((name, width.parse().ok()?, height.parse().ok()?))
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Info)
        .init();
    let mut args = std::env::args().skip(1);
    let input_dir = PathBuf::from(args.next().unwrap_or_else(|| "raw".to_owned()));
    let output_dir = PathBuf::from(args.next().unwrap_or_else(|| "benchmark".to_owned()));
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let raw_images = fs::read_dir(&input_dir)
        .with_context(|| format!("Failed to read {} folder", input_dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension() == Some(OsStr::new("raw")));

    let mut results = Vec::new();
    for image_path in raw_images {
        let Some(stem) = image_path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        let Some((name, width, height)) = parse_dimensions(stem) else {
            log::warn!("skipping {}: no <width>x<height> suffix", image_path.display());
            continue;
        };
        let raster = Raster::load(&image_path, width, height)
            .with_context(|| format!("Failed to load {}.", image_path.display()))?;
        for transform in ColorTransform::NAMES {
            let transform = ColorTransform::with_strength(transform, Some(NOISE_STRENGTH))?;
            results.push(bench_one(&output_dir, name, &raster, transform)?);
        }
    }

    let now = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Iso8601::DEFAULT)?;
    let report = serde_json::json!({
        "date": now,
        "results": results,
    });
    fs::write(output_dir.join("results.json"), report.to_string())?;
    Ok(())
}

fn bench_one(
    output_dir: &Path,
    name: &str,
    raster: &Raster,
    transform: ColorTransform,
) -> anyhow::Result<serde_json::Value> {
    let png_name = output_dir.join(format!("{name}-{transform}.png"));
    let start = Instant::now();
    PngEncoder::new(transform)
        .encode_to_file(raster.clone(), &png_name)
        .with_context(|| format!("Failed to encode {name} with {transform}."))?;
    let elapsed = start.elapsed();
    let png_size = fs::metadata(&png_name)?.len();
    log::info!("{name} [{transform}]: {png_size} bytes in {elapsed:?}");
    Ok(serde_json::json!({
        "image": name,
        "width": raster.width,
        "height": raster.height,
        "filter": transform.to_string(),
        "raw_bytes": raster.data.len(),
        "png_bytes": png_size,
        "millis": elapsed.as_secs_f64() * 1000.0,
    }))
}
