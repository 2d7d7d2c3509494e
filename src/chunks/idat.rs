use super::PngChunk;
use nom::IResult;

#[derive(Debug, PartialEq, Eq)]
pub struct IDATChunk<'a> {
    pub data: &'a [u8],
}
impl<'a> PngChunk<'a> for IDATChunk<'a> {
    type Payload = &'a [u8];
    const HEADER: &'static [u8; 4] = b"IDAT";

    fn from_bytes(chunk_data: &'a [u8]) -> IResult<&'a [u8], Self> {
        Ok((&chunk_data[0..0], IDATChunk { data: chunk_data }))
    }

    fn payload(&self) -> Self::Payload {
        self.data
    }
}
