//! Line framing for newline-delimited event streams.
//!
//! Network reads arrive at arbitrary boundaries: a chunk may end in the middle
//! of a line or in the middle of a multi-byte character. [`LineDecoder`] keeps
//! the unterminated tail in a byte buffer and only decodes a line once its
//! `\n` has been seen (or the stream has ended). Splitting on the `\n` byte
//! before decoding is safe because that byte never occurs inside a UTF-8
//! multi-byte sequence.

use std::pin::Pin;

use async_stream::stream;
use bytes::Bytes;
use futures::StreamExt;
use tokio_stream::Stream;

use crate::error::{Error, Result};

/// A stream of raw byte chunks from a transport
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// A stream of complete, non-blank text lines
pub type LineStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Incremental byte-to-line decoder with a carry-over buffer
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every line it completed, in order.
    ///
    /// Blank lines are dropped. A line that is not valid UTF-8 comes back as
    /// [`Error::Decode`]; lines before it in the same chunk are still returned.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<String>> {
        let scan_from = self.buffer.len();
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut search = scan_from;
        while let Some(offset) = self.buffer[search..].iter().position(|b| *b == b'\n') {
            let end = search + offset;
            if let Some(line) = decode_line(&self.buffer[start..end]) {
                lines.push(line);
            }
            start = end + 1;
            search = start;
        }
        self.buffer.drain(..start);
        lines
    }

    /// Number of bytes waiting for a line terminator
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Flush the trailing unterminated line at end of stream.
    pub fn finish(self) -> Option<Result<String>> {
        decode_line(&self.buffer)
    }
}

fn decode_line(raw: &[u8]) -> Option<Result<String>> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    match String::from_utf8(raw.to_vec()) {
        Ok(line) if line.trim().is_empty() => None,
        Ok(line) => Some(Ok(line)),
        Err(e) => {
            let valid_up_to = e.utf8_error().valid_up_to();
            Some(Err(Error::Decode {
                line: e.into_bytes(),
                valid_up_to,
            }))
        }
    }
}

/// Turn a byte stream into a lazy stream of lines.
///
/// The line stream ends after the first decoding error or transport error,
/// which is yielded as its last item. Lines yielded before it stand.
pub fn lines<S>(source: S) -> LineStream
where
    S: Stream<Item = Result<Bytes>> + Send + 'static,
{
    Box::pin(stream! {
        let mut source = Box::pin(source);
        let mut decoder = LineDecoder::new();

        while let Some(chunk) = source.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            for line in decoder.push(&chunk) {
                let failed = line.is_err();
                yield line;
                if failed {
                    return;
                }
            }
        }

        if let Some(line) = decoder.finish() {
            yield line;
        }
    })
}
