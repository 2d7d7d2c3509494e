use nom::{
    bytes::complete::{tag, take},
    number::complete::be_u32,
    sequence::tuple,
    IResult,
};

use crate::crc::chunk_crc;

pub mod idat;
pub mod iend;
pub mod ihdr;

pub const PNG_SIGNATURE: [u8; 8] = *b"\x89PNG\x0d\x0a\x1a\x0a";

/// Largest payload a chunk length field may announce (2^31 - 1).
pub const MAX_CHUNK_LEN: u32 = 0x7fff_ffff;

fn chunk_length(chunk_type: &[u8; 4], len: usize) -> Result<u32, ChunkError> {
    u32::try_from(len)
        .ok()
        .filter(|&len| len <= MAX_CHUNK_LEN)
        .ok_or_else(|| ChunkError::TooLarge {
            chunk_type: String::from_utf8_lossy(chunk_type).into_owned(),
            len,
        })
}

/// Appends one chunk (length, type, payload, CRC) to `output`. Payloads longer
/// than [`MAX_CHUNK_LEN`] are rejected and leave `output` unchanged.
pub fn write_chunk(
    output: &mut Vec<u8>,
    chunk_type: &[u8; 4],
    payload: &[u8],
) -> Result<(), ChunkError> {
    let length = chunk_length(chunk_type, payload.len())?;
    output.reserve(12 + payload.len());
    output.extend(length.to_be_bytes());
    output.extend(chunk_type);
    output.extend(payload);
    output.extend(chunk_crc(chunk_type, payload).to_be_bytes());
    Ok(())
}

/// A chunk type the encoder knows how to serialize and read back.
pub trait PngChunk<'a>: Sized {
    type Payload: AsRef<[u8]>;
    const HEADER: &'static [u8; 4];

    fn from_bytes(chunk_data: &'a [u8]) -> IResult<&'a [u8], Self>;
    fn payload(&self) -> Self::Payload;

    fn write_to(&self, output: &mut Vec<u8>) -> Result<(), ChunkError> {
        write_chunk(output, Self::HEADER, self.payload().as_ref())
    }

    fn to_bytes(&self) -> Result<Vec<u8>, ChunkError> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChunkError {
    #[error("input doesn't start with the PNG signature")]
    MissingSignature,
    #[error("truncated chunk after {offset} bytes")]
    Truncated { offset: usize },
    #[error("CRC mismatch in {chunk_type} chunk: stored {stored:#010x}, computed {computed:#010x}")]
    CrcMismatch {
        chunk_type: String,
        stored: u32,
        computed: u32,
    },
    #[error("malformed {0} chunk")]
    Malformed(String),
    #[error("{chunk_type} payload of {len} bytes exceeds the PNG chunk limit")]
    TooLarge { chunk_type: String, len: usize },
}

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, PartialEq, Eq)]
pub enum Chunk<'a> {
    IHDR(ihdr::IHDRChunk),
    IDAT(idat::IDATChunk<'a>),
    IEND,
    Unknown(RawChunk<'a>),
}

impl Chunk<'_> {
    pub fn chunk_type(&self) -> &[u8; 4] {
        match self {
            Chunk::IHDR(_) => ihdr::IHDRChunk::HEADER,
            Chunk::IDAT(_) => idat::IDATChunk::HEADER,
            Chunk::IEND => iend::IENDChunk::HEADER,
            Chunk::Unknown(raw) => raw.chunk_type,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct RawChunk<'a> {
    pub chunk_type: &'a [u8; 4],
    pub data: &'a [u8],
}

/// Checks the signature and iterates the chunks that follow it.
pub fn iter_png(bytes: &[u8]) -> Result<ChunkIter<'_>, ChunkError> {
    let (rest, _) = parse_signature(bytes).map_err(|_| ChunkError::MissingSignature)?;
    Ok(iter_chunks(rest))
}

pub fn iter_chunks(source: &[u8]) -> ChunkIter<'_> {
    ChunkIter {
        source,
        offset: PNG_SIGNATURE.len(),
        finished: false,
    }
}

pub struct ChunkIter<'a> {
    source: &'a [u8],
    offset: usize,
    finished: bool,
}

impl<'a> Iterator for ChunkIter<'a> {
    type Item = Result<Chunk<'a>, ChunkError>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.source.is_empty() {
            return None;
        }
        match parse_chunk(self.source, self.offset) {
            Ok((rest, chunk)) => {
                self.offset += self.source.len() - rest.len();
                self.source = rest;
                if matches!(chunk, Chunk::IEND) {
                    self.finished = true;
                }
                Some(Ok(chunk))
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

fn parse_signature(input: &[u8]) -> IResult<&[u8], &[u8]> {
    tag(&PNG_SIGNATURE[..])(input)
}

fn parse_chunk(input: &[u8], offset: usize) -> Result<(&[u8], Chunk<'_>), ChunkError> {
    let (rest, (header, chunk_data)) = valid_chunk(input).map_err(|e| match e {
        ValidChunkError::Nom => ChunkError::Truncated { offset },
        ValidChunkError::Crc(err) => err,
    })?;
    let malformed = |_| ChunkError::Malformed(String::from_utf8_lossy(header).into_owned());
    let chunk = match header {
        ihdr::IHDRChunk::HEADER => {
            Chunk::IHDR(ihdr::IHDRChunk::from_bytes(chunk_data).map_err(malformed)?.1)
        }
        idat::IDATChunk::HEADER => {
            Chunk::IDAT(idat::IDATChunk::from_bytes(chunk_data).map_err(malformed)?.1)
        }
        iend::IENDChunk::HEADER => {
            iend::IENDChunk::from_bytes(chunk_data).map_err(malformed)?;
            Chunk::IEND
        }
        _ => Chunk::Unknown(RawChunk {
            chunk_type: header,
            data: chunk_data,
        }),
    };
    Ok((rest, chunk))
}

enum ValidChunkError {
    Nom,
    Crc(ChunkError),
}

impl<E> From<nom::Err<E>> for ValidChunkError {
    fn from(_: nom::Err<E>) -> Self {
        Self::Nom
    }
}

fn valid_chunk(input: &[u8]) -> Result<(&[u8], (&[u8; 4], &[u8])), ValidChunkError> {
    let (input, length) = be_u32::<_, nom::error::Error<_>>(input)?;
    let (input, (header, data, stored)) = tuple((
        take(4usize),
        take(length as usize),
        be_u32::<_, nom::error::Error<_>>,
    ))(input)?;
    let header: &[u8; 4] = header
        .try_into()
        .expect("4 bytes should have been taken");
    let computed = chunk_crc(header, data);
    if computed != stored {
        return Err(ValidChunkError::Crc(ChunkError::CrcMismatch {
            chunk_type: String::from_utf8_lossy(header).into_owned(),
            stored,
            computed,
        }));
    }
    Ok((input, (header, data)))
}
