use crate::fixed::Fixed;
use crate::{ParseError, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use flate2::read::ZlibDecoder;
use std::io::{Cursor, Read};

fn to_parse(e: std::io::Error) -> ParseError {
    e.into()
}

/// How many bytes to pull from the underlying source per refill.
const REFILL_BYTES: usize = 128;

/// Stages bytes from a sequential source in a growable buffer.
///
/// The format is strictly sequential, so no seeking is needed; the buffer
/// only exists to decouple structural reads from the source's read sizes.
/// [`Staging::recycle`] drops the consumed prefix, which the frame loop
/// calls between frames to bound memory.
pub(crate) struct Staging<R> {
    source: R,
    buf: Vec<u8>,
    pos: usize,
}

impl<R: Read> Staging<R> {
    pub(crate) fn new(source: R) -> Self {
        Staging {
            source,
            buf: Vec::new(),
            pos: 0,
        }
    }

    /// Drop already-consumed bytes so the buffer stays bounded by roughly
    /// one frame's worth of data.
    pub(crate) fn recycle(&mut self) {
        self.buf.drain(..self.pos);
        self.pos = 0;
    }

    fn refill(&mut self) -> std::io::Result<usize> {
        let mut chunk = [0_u8; REFILL_BYTES];
        let n = self.source.read(&mut chunk)?;
        self.buf.extend_from_slice(&chunk[..n]);
        Ok(n)
    }
}

impl<R: Read> Read for Staging<R> {
    fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
        if self.pos == self.buf.len() && self.refill()? == 0 {
            return Ok(0);
        }
        let available = &self.buf[self.pos..];
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.pos += n;
        Ok(n)
    }
}

/// Typed little-endian decode over a byte source.
///
/// One instance wraps the staged document stream; chunk parsers create
/// their own over the chunk body slice, so every parser works against a
/// self-contained input sized by the chunk header.
pub(crate) struct AseReader<T> {
    input: T,
}

impl<'a> AseReader<Cursor<&'a [u8]>> {
    pub(crate) fn new(data: &'a [u8]) -> AseReader<Cursor<&'a [u8]>> {
        AseReader {
            input: Cursor::new(data),
        }
    }
}

impl<R: Read> AseReader<Staging<R>> {
    pub(crate) fn recycle(&mut self) {
        self.input.recycle()
    }
}

impl<T: Read> AseReader<T> {
    pub(crate) fn with(input: T) -> Self {
        Self { input }
    }

    pub(crate) fn byte(&mut self) -> Result<u8> {
        self.input.read_u8().map_err(to_parse)
    }

    pub(crate) fn word(&mut self) -> Result<u16> {
        self.input.read_u16::<LittleEndian>().map_err(to_parse)
    }

    pub(crate) fn short(&mut self) -> Result<i16> {
        self.input.read_i16::<LittleEndian>().map_err(to_parse)
    }

    pub(crate) fn dword(&mut self) -> Result<u32> {
        self.input.read_u32::<LittleEndian>().map_err(to_parse)
    }

    pub(crate) fn long(&mut self) -> Result<i32> {
        self.input.read_i32::<LittleEndian>().map_err(to_parse)
    }

    pub(crate) fn qword(&mut self) -> Result<u64> {
        self.input.read_u64::<LittleEndian>().map_err(to_parse)
    }

    pub(crate) fn long64(&mut self) -> Result<i64> {
        self.input.read_i64::<LittleEndian>().map_err(to_parse)
    }

    pub(crate) fn float(&mut self) -> Result<f32> {
        self.input.read_f32::<LittleEndian>().map_err(to_parse)
    }

    pub(crate) fn double(&mut self) -> Result<f64> {
        self.input.read_f64::<LittleEndian>().map_err(to_parse)
    }

    pub(crate) fn fixed(&mut self) -> Result<Fixed> {
        self.long().map(Fixed::from_raw)
    }

    /// Length-prefixed UTF-8 string, no terminator. Length may be zero.
    pub(crate) fn string(&mut self) -> Result<String> {
        let str_len = self.input.read_u16::<LittleEndian>().map_err(to_parse)?;
        let mut str_bytes = vec![0_u8; str_len as usize];
        self.input.read_exact(&mut str_bytes).map_err(to_parse)?;
        let s = String::from_utf8(str_bytes)?;
        Ok(s)
    }

    pub(crate) fn read_exact(&mut self, buffer: &mut [u8]) -> Result<()> {
        self.input.read_exact(buffer).map_err(to_parse)
    }

    pub(crate) fn skip_reserved(&mut self, count: usize) -> Result<()> {
        let mut ignored = vec![0_u8; count];
        self.input.read_exact(&mut ignored).map_err(to_parse)
    }

    pub(crate) fn take_bytes(&mut self, limit: usize) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(limit);
        (&mut self.input)
            .take(limit as u64)
            .read_to_end(&mut output)
            .map_err(to_parse)?;
        if output.len() != limit {
            Err(ParseError::ShortRead)
        } else {
            Ok(output)
        }
    }

    /// Remaining bytes of the input, however many there are.
    pub(crate) fn rest(mut self) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.input.read_to_end(&mut output).map_err(to_parse)?;
        Ok(output)
    }

    /// Decompress the rest of the input as a zlib stream. The output size
    /// is not carried by the format, so this reads to the end of the
    /// deflate stream; trailing padding after it is tolerated.
    pub(crate) fn unzip(self, expected_output_size: usize) -> Result<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(self.input);
        let mut buffer = Vec::with_capacity(expected_output_size);
        decoder
            .read_to_end(&mut buffer)
            .map_err(|e| ParseError::DecompressionFailed(e.to_string()))?;
        Ok(buffer)
    }
}
