use std::rc::Rc;

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    error::StreamError,
    event::Encoding,
    layer::{Layer, StreamLayer},
    stream::Stream,
};

const CRLF: &[u8] = b"\r\n";
const VERSION: &[u8] = b"HTTP/1.1";

// token characters allowed in a method
fn is_tchar(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

/// Writes HTTP/1.1 request heads to the wrapped stream.
///
/// The response travels up untouched. `end` never ends the wrapped stream,
/// the connection stays open for the response.
#[derive(Debug)]
pub struct HttpRequestLayer {
    layer: Layer,
}

impl HttpRequestLayer {
    pub fn new(wrapped: Rc<dyn Stream>) -> Result<Self, StreamError> {
        Ok(HttpRequestLayer {
            layer: Layer::new(wrapped)?,
        })
    }

    /* Steps:
     *      1. Validate method, path and header lines.
     *      2. METHOD SP path SP HTTP/1.1 CRLF
     *      3. header CRLF, for each header
     *      4. CRLF
     *      5. Single write to the wrapped stream.
     *
     * Error:
     *      StreamError::Protocol   [1]
     */
    pub fn request(&self, method: &str, path: &str, headers: &[&str]) -> Result<(), StreamError> {
        // 1. Validate
        if method.is_empty() || !method.bytes().all(is_tchar) {
            return Err(StreamError::Protocol(format!("invalid method| {method:?}")));
        }
        if path.is_empty() || path.bytes().any(|b| b.is_ascii_whitespace()) {
            return Err(StreamError::Protocol(format!("invalid path| {path:?}")));
        }
        if let Some(header) = headers
            .iter()
            .find(|h| h.bytes().any(|b| b == b'\r' || b == b'\n'))
        {
            return Err(StreamError::Protocol(format!("invalid header| {header:?}")));
        }

        let len = method.len()
            + path.len()
            + VERSION.len()
            + 4
            + headers
                .iter()
                .map(|h| h.len() + CRLF.len())
                .sum::<usize>()
            + CRLF.len();
        let mut buf = BytesMut::with_capacity(len);
        // 2. Request line
        buf.put_slice(method.to_ascii_uppercase().as_bytes());
        buf.put_u8(b' ');
        buf.put_slice(path.as_bytes());
        buf.put_u8(b' ');
        buf.put_slice(VERSION);
        buf.put_slice(CRLF);
        // 3. Headers
        for header in headers {
            buf.put_slice(header.as_bytes());
            buf.put_slice(CRLF);
        }
        // 4. End of head
        buf.put_slice(CRLF);
        // 5. Write
        self.layer
            .wrapped()
            .write(buf.freeze(), Some(Encoding::Ascii))?;
        Ok(())
    }

    pub fn get(&self, path: &str, headers: &[&str]) -> Result<(), StreamError> {
        self.request("GET", path, headers)
    }
}

impl StreamLayer for HttpRequestLayer {
    fn layer(&self) -> &Layer {
        &self.layer
    }

    fn on_end(&self, data: Option<Bytes>, encoding: Option<Encoding>) -> Result<(), StreamError> {
        if let Some(data) = data.filter(|d| !d.is_empty()) {
            self.on_write(data, encoding)?;
        }
        Ok(())
    }
}
