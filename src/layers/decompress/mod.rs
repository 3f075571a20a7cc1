use std::{
    cell::RefCell,
    fmt,
    io::{self, copy},
    rc::Rc,
    str::FromStr,
};

use brotli::Decompressor;
use bytes::{BufMut, BytesMut, buf::Writer};
use flate2::bufread::{DeflateDecoder, GzDecoder};
use tracing::{debug, warn};

pub mod error;
use error::DecompressError;

use crate::{
    error::StreamError,
    event::{DATA, END, Event},
    layer::{Layer, StreamLayer},
    stream::Stream,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentEncoding {
    Brotli,
    Deflate,
    Gzip,
    Identity,
    Zstd,
}

impl ContentEncoding {
    /// Parse a `Content-Encoding` header value, e.g. `"br, gzip"`.
    pub fn parse_list(value: &str) -> Result<Vec<Self>, DecompressError> {
        value
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl FromStr for ContentEncoding {
    type Err = DecompressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        match token.to_ascii_lowercase().as_str() {
            "br" => Ok(ContentEncoding::Brotli),
            "deflate" => Ok(ContentEncoding::Deflate),
            "gzip" | "x-gzip" => Ok(ContentEncoding::Gzip),
            "identity" => Ok(ContentEncoding::Identity),
            "zstd" => Ok(ContentEncoding::Zstd),
            _ => Err(DecompressError::Unknown(token.to_string())),
        }
    }
}

impl AsRef<str> for ContentEncoding {
    fn as_ref(&self) -> &str {
        match self {
            ContentEncoding::Brotli => "br",
            ContentEncoding::Deflate => "deflate",
            ContentEncoding::Gzip => "gzip",
            ContentEncoding::Identity => "identity",
            ContentEncoding::Zstd => "zstd",
        }
    }
}

impl fmt::Display for ContentEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

fn decode_into(
    encoding: ContentEncoding,
    data: &[u8],
    writer: &mut Writer<BytesMut>,
) -> io::Result<u64> {
    match encoding {
        ContentEncoding::Brotli => copy(&mut Decompressor::new(data, data.len()), writer),
        ContentEncoding::Deflate => copy(&mut DeflateDecoder::new(data), writer),
        ContentEncoding::Gzip => copy(&mut GzDecoder::new(data), writer),
        ContentEncoding::Zstd => copy(&mut zstd::stream::read::Decoder::new(data)?, writer),
        ContentEncoding::Identity => copy(&mut &data[..], writer),
    }
}

/* Description:
 *      Decode data based on the Content-Encoding list.
 *
 * Steps:
 *      Iterate over the encodings in reverse, the last applied encoding is
 *      removed first, each pass feeding the next.
 */
pub fn decompress(data: &[u8], encodings: &[ContentEncoding]) -> Result<BytesMut, DecompressError> {
    let mut body = BytesMut::from(data);
    for &encoding in encodings.iter().rev() {
        if encoding == ContentEncoding::Identity {
            continue;
        }
        let mut writer = BytesMut::with_capacity(2 * body.len()).writer();
        decode_into(encoding, &body, &mut writer).map_err(DecompressError::codec(encoding))?;
        body = writer.into_inner();
    }
    Ok(body)
}

#[derive(Debug)]
struct DecodeState {
    encodings: Vec<ContentEncoding>,
    compressed: BytesMut,
    done: bool,
}

impl DecodeState {
    // empty body => nothing to decode
    fn finish(&mut self) -> Result<BytesMut, DecompressError> {
        self.done = true;
        let compressed = self.compressed.split();
        if compressed.is_empty() {
            return Ok(compressed);
        }
        decompress(&compressed, &self.encodings)
    }
}

/// Decodes a compressed body coming up from the wrapped stream.
///
/// `data` and `end` are claimed on the wrapped stream: chunks are buffered
/// and decoded once `end` arrives, then a single `data` (if the body is not
/// empty) and `end` are emitted on this layer. Decoding failures surface as
/// an `error` event. Writes pass through untouched.
#[derive(Debug)]
pub struct DecompressLayer {
    layer: Layer,
    state: Rc<RefCell<DecodeState>>,
}

impl DecompressLayer {
    pub fn new(
        wrapped: Rc<dyn Stream>,
        encodings: Vec<ContentEncoding>,
    ) -> Result<Self, StreamError> {
        let layer = Layer::new(wrapped)?;
        let state = Rc::new(RefCell::new(DecodeState {
            encodings,
            compressed: BytesMut::new(),
            done: false,
        }));

        let data_state = state.clone();
        layer.claim(DATA, move |_, event| {
            let mut state = data_state.borrow_mut();
            if state.done {
                return;
            }
            if let Some(data) = event.data_bytes() {
                state.compressed.extend_from_slice(data);
            }
        });

        let end_state = state.clone();
        layer.claim(END, move |handle, _| {
            if end_state.borrow().done {
                return;
            }
            let result = end_state.borrow_mut().finish();
            match result {
                Ok(body) => {
                    debug!(len = body.len(), "body decoded");
                    if !body.is_empty() {
                        handle.emit(&Event::data(body.freeze()));
                    }
                    handle.emit(&Event::end());
                }
                Err(e) => {
                    let emitted = handle.emit(&Event::error(e.into()));
                    if !emitted.is_handled() {
                        warn!("decode error not handled");
                    }
                }
            }
        });

        Ok(DecompressLayer { layer, state })
    }

    pub fn from_header(wrapped: Rc<dyn Stream>, value: &str) -> Result<Self, StreamError> {
        let encodings = ContentEncoding::parse_list(value)?;
        DecompressLayer::new(wrapped, encodings)
    }

    pub fn encodings(&self) -> Vec<ContentEncoding> {
        self.state.borrow().encodings.clone()
    }

    pub fn buffered(&self) -> usize {
        self.state.borrow().compressed.len()
    }

    pub fn is_done(&self) -> bool {
        self.state.borrow().done
    }
}

impl StreamLayer for DecompressLayer {
    fn layer(&self) -> &Layer {
        &self.layer
    }
}
