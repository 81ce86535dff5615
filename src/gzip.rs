use compression_codecs::{DecodeV2, gzip::GzipDecoder};
use compression_core::util::{PartialBuffer, WriteBuffer};
use http::header::{self, HeaderMap};
use std::io;

const OUTPUT_BUFFER_SIZE: usize = 8 * 1024; // 8KB decode window

/// Returns true if the first `Content-Encoding` value mentions gzip.
pub(crate) fn is_gzip_encoded(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().contains("gzip"))
}

/// Decodes a complete gzip stream from `input`, appending the result to `output`.
///
/// Concatenated members are decoded one after another. A bad header, a
/// corrupt or truncated stream, or trailing bytes that are not another
/// member all fail with an error; `output` may then hold a partial result.
pub(crate) fn decode(input: &[u8], output: &mut Vec<u8>) -> io::Result<()> {
    let mut decoder = GzipDecoder::new();
    let mut window = [0u8; OUTPUT_BUFFER_SIZE];
    let mut input_buf = PartialBuffer::new(input);

    loop {
        let mut out = WriteBuffer::new_initialized(&mut window[..]);
        let done = decoder.decode(&mut input_buf, &mut out)?;

        let written = out.written_len();
        if written > 0 {
            output.extend_from_slice(&window[..written]);
        }

        let exhausted = input_buf.written_len() >= input.len();

        if done {
            if exhausted {
                break;
            }
            // Another member follows.
            decoder.reinit()?;
            continue;
        }

        if exhausted && written == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "gzip stream ended before its trailer",
            ));
        }
    }

    // Flush anything the decoder still holds and confirm the trailer was seen.
    loop {
        let mut out = WriteBuffer::new_initialized(&mut window[..]);
        let done = decoder.finish(&mut out)?;

        let written = out.written_len();
        if written > 0 {
            output.extend_from_slice(&window[..written]);
        }
        if done {
            return Ok(());
        }
        if written == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "gzip decoder did not finish",
            ));
        }
    }
}
