use std::{
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use miniz_oxide::inflate::decompress_to_vec_zlib;
use raw2png::{
    chunks::{ihdr::IHDRChunk, iter_png, Chunk, PngChunk, PNG_SIGNATURE},
    filters::filter_scanlines,
    ColorTransform, EncodeError, PngEncoder, Raster,
};

/// Bitwise CRC-32, kept independent of the crate's table-driven version.
fn reference_crc(bytes: &[u8]) -> u32 {
    let mut crc = 0xffff_ffffu32;
    for &b in bytes {
        crc ^= b as u32;
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xedb8_8320 & mask);
        }
    }
    !crc
}

struct RawChunk {
    chunk_type: [u8; 4],
    payload: Vec<u8>,
    crc: u32,
}

/// Splits a PNG into chunks by hand, without going through the crate's parser.
fn split_chunks(png: &[u8]) -> Vec<RawChunk> {
    assert_eq!(&png[..8], &PNG_SIGNATURE);
    let mut chunks = Vec::new();
    let mut rest = &png[8..];
    while !rest.is_empty() {
        let len = u32::from_be_bytes(rest[0..4].try_into().unwrap()) as usize;
        let chunk_type: [u8; 4] = rest[4..8].try_into().unwrap();
        let payload = rest[8..8 + len].to_vec();
        let crc = u32::from_be_bytes(rest[8 + len..12 + len].try_into().unwrap());
        chunks.push(RawChunk {
            chunk_type,
            payload,
            crc,
        });
        rest = &rest[12 + len..];
    }
    chunks
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::new(), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

fn describe(png: &[u8]) -> String {
    let mut out = format!("signature {}\n", hex(&png[..8]));
    for chunk in split_chunks(png) {
        let name = String::from_utf8_lossy(&chunk.chunk_type).into_owned();
        if &chunk.chunk_type == b"IDAT" {
            let inflated = decompress_to_vec_zlib(&chunk.payload).unwrap();
            writeln!(out, "{name} inflated={}", hex(&inflated)).unwrap();
        } else {
            writeln!(
                out,
                "{name} len={} payload={} crc={:08x}",
                chunk.payload.len(),
                hex(&chunk.payload),
                chunk.crc
            )
            .unwrap();
        }
    }
    out
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("raw2png-{}-{name}", std::process::id()))
}

/// Staging files `write_png` may have left next to `name` in `dir`.
fn leftover_staging_files(dir: &Path, name: &str) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| {
            let file_name = path.file_name().unwrap().to_string_lossy();
            file_name.starts_with(&format!(".{name}.")) && file_name.ends_with(".tmp")
        })
        .collect()
}

#[test]
fn single_red_pixel() {
    let raster = Raster::new(1, 1, vec![255, 0, 0]).unwrap();
    let png = PngEncoder::new("none".parse().unwrap()).encode(raster).unwrap();
    insta::assert_snapshot!(describe(&png).trim_end(), @r###"
    signature 89504e470d0a1a0a
    IHDR len=13 payload=00000001000000010802000000 crc=907753de
    IDAT inflated=04ff0000
    IEND len=0 payload= crc=ae426082
    "###);

    let chunks = split_chunks(&png);
    assert_eq!(chunks.len(), 3);
    let idat_len = u32::from_be_bytes(png[33..37].try_into().unwrap()) as usize;
    assert_eq!(idat_len, chunks[1].payload.len());
    assert_eq!(png.len(), 8 + 25 + 12 + idat_len + 12);
}

#[test]
fn every_crc_matches_reference() {
    let data: Vec<u8> = (0..7 * 5 * 3).map(|i| (i * 13 % 256) as u8).collect();
    let raster = Raster::new(7, 5, data).unwrap();
    let png = PngEncoder::new(ColorTransform::Grayscale)
        .encode(raster)
        .unwrap();
    for chunk in split_chunks(&png) {
        let mut covered = chunk.chunk_type.to_vec();
        covered.extend(&chunk.payload);
        assert_eq!(chunk.crc, reference_crc(&covered));
        assert_eq!(chunk.crc, raw2png::calculate_crc(covered.iter().copied()));
    }
}

#[test]
fn header_reads_back() {
    let raster = Raster::new(300, 2, vec![9; 300 * 2 * 3]).unwrap();
    let png = PngEncoder::new(ColorTransform::Identity).encode(raster).unwrap();
    let chunks: Vec<_> = iter_png(&png).unwrap().collect::<Result<_, _>>().unwrap();
    let Chunk::IHDR(ihdr) = &chunks[0] else {
        panic!("first chunk is {:?}", chunks[0]);
    };
    assert_eq!(*ihdr, IHDRChunk::truecolor(300, 2));
    assert_eq!(
        (ihdr.width, ihdr.height, ihdr.bit_depth, ihdr.color_type),
        (300, 2, 8, 2)
    );
    assert_eq!(
        IHDRChunk::from_bytes(&ihdr.payload()).unwrap().1,
        *ihdr
    );
    assert!(matches!(chunks[1], Chunk::IDAT(_)));
    assert_eq!(chunks[2], Chunk::IEND);
}

#[test]
fn uniform_image_filters_to_zero() {
    let raster = Raster::new(2, 2, vec![100; 12]).unwrap();
    let raster = ColorTransform::Identity.apply(raster);
    let filtered = filter_scanlines(&raster);
    assert_eq!(filtered[1], 100);
    for (i, &byte) in filtered.iter().enumerate() {
        match i {
            0 | 7 => assert_eq!(byte, 4),
            1..=3 => assert_eq!(byte, 100),
            _ => assert_eq!(byte, 0, "byte {i}"),
        }
    }

    let png = PngEncoder::new(ColorTransform::Identity)
        .encode(Raster::new(2, 2, vec![100; 12]).unwrap())
        .unwrap();
    let idat = &split_chunks(&png)[1];
    assert_eq!(decompress_to_vec_zlib(&idat.payload).unwrap(), filtered);
}

#[test]
fn noise_changes_pixels_deterministically() {
    let raster = Raster::new(16, 16, vec![128; 16 * 16 * 3]).unwrap();
    let encoder = PngEncoder::new(ColorTransform::with_strength("perlin", Some(60.0)).unwrap());
    let first = encoder.encode(raster.clone()).unwrap();
    assert_eq!(first, encoder.encode(raster.clone()).unwrap());
    assert_ne!(first, PngEncoder::new(ColorTransform::Identity).encode(raster).unwrap());
}

#[test]
fn writes_file() {
    let path = temp_path("written.png");
    let raster = Raster::new(3, 3, (0..27).collect()).unwrap();
    let expected = PngEncoder::new(ColorTransform::Invert)
        .encode(raster.clone())
        .unwrap();
    PngEncoder::new(ColorTransform::Invert)
        .encode_to_file(raster, &path)
        .unwrap();
    let written = fs::read(&path).unwrap();
    fs::remove_file(&path).unwrap();
    assert_eq!(written, expected);
}

#[test]
fn unwritable_path_is_a_write_error() {
    let path = temp_path("missing-dir").join("out.png");
    let raster = Raster::new(1, 1, vec![1, 2, 3]).unwrap();
    let result = PngEncoder::new(ColorTransform::Identity).encode_to_file(raster, &path);
    assert!(matches!(result, Err(EncodeError::Write { .. })));
    assert!(!path.exists());
    assert!(!path.parent().unwrap().exists());
}

#[test]
fn replaces_existing_file() {
    let path = temp_path("replaced.png");
    fs::write(&path, b"stale contents that are longer than the new PNG ......").unwrap();
    let raster = Raster::new(1, 1, vec![7, 8, 9]).unwrap();
    let expected = PngEncoder::new(ColorTransform::Identity)
        .encode(raster.clone())
        .unwrap();
    PngEncoder::new(ColorTransform::Identity)
        .encode_to_file(raster, &path)
        .unwrap();
    let written = fs::read(&path).unwrap();
    fs::remove_file(&path).unwrap();
    assert_eq!(written, expected);
}

#[test]
fn failed_write_keeps_existing_target() {
    // a non-empty directory can't be replaced by a file, so the write succeeds
    // and the final rename fails
    let dir = temp_path("occupied");
    let target = dir.join("out.png");
    fs::create_dir_all(target.join("inner")).unwrap();
    fs::write(target.join("inner").join("keep.txt"), b"keep").unwrap();

    let raster = Raster::new(2, 1, vec![1, 2, 3, 4, 5, 6]).unwrap();
    let result = PngEncoder::new(ColorTransform::Invert).encode_to_file(raster, &target);
    let kept = fs::read(target.join("inner").join("keep.txt")).unwrap();
    let leftovers = leftover_staging_files(&dir, "out.png");
    fs::remove_dir_all(&dir).unwrap();

    match result {
        Err(EncodeError::Write { path, .. }) => assert_eq!(path, target),
        other => panic!("expected a write error, got {other:?}"),
    }
    assert_eq!(kept, b"keep");
    assert!(leftovers.is_empty(), "{leftovers:?}");
}

#[test]
fn cli_encodes_and_inspects() {
    let input = temp_path("cli.raw");
    let output = temp_path("cli.png");
    fs::write(&input, [10u8, 20, 30, 40, 50, 60]).unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_raw2png"))
        .arg("encode")
        .arg(&input)
        .arg(&output)
        .args(["2", "1", "GRAYSCALE"])
        .status()
        .unwrap();
    assert!(status.success());

    let inspected = Command::new(env!("CARGO_BIN_EXE_raw2png"))
        .arg("inspect")
        .arg(&output)
        .output()
        .unwrap();
    let png = fs::read(&output).unwrap();
    fs::remove_file(&input).unwrap();
    fs::remove_file(&output).unwrap();

    assert!(inspected.status.success());
    let listing = String::from_utf8(inspected.stdout).unwrap();
    assert!(listing.starts_with("IHDR: 2x1, bit depth 8, color type 2, interlace 0\nIDAT: "));
    assert!(listing.ends_with("IEND\n"));
    let idat = &split_chunks(&png)[1];
    // 0.299*10 + 0.587*20 + 0.114*30 = 18.15; 0.299*40 + 0.587*50 + 0.114*60 = 48.15
    assert_eq!(
        decompress_to_vec_zlib(&idat.payload).unwrap(),
        [4, 18, 18, 18, 30, 30, 30]
    );
}

#[test]
fn cli_rejects_unknown_filter() {
    let input = temp_path("cli-unknown.raw");
    let output = temp_path("cli-unknown.png");
    fs::write(&input, [0u8; 3]).unwrap();
    let result = Command::new(env!("CARGO_BIN_EXE_raw2png"))
        .arg("encode")
        .arg(&input)
        .arg(&output)
        .args(["1", "1", "sepia"])
        .output()
        .unwrap();
    fs::remove_file(&input).unwrap();

    assert_eq!(result.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("unknown color filter: sepia"), "{stderr}");
    assert!(!output.exists());
}

#[test]
fn cli_reports_size_mismatch() {
    let input = temp_path("cli-short.raw");
    let output = temp_path("cli-short.png");
    fs::write(&input, [0u8; 5]).unwrap();
    let result = Command::new(env!("CARGO_BIN_EXE_raw2png"))
        .arg("encode")
        .arg(&input)
        .arg(&output)
        .args(["2", "1"])
        .output()
        .unwrap();
    fs::remove_file(&input).unwrap();

    assert_eq!(result.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&result.stderr).contains("needs 6 bytes, got 5"));
    assert!(!output.exists());
}
