pub mod decompress;
pub mod http;

pub use decompress::{ContentEncoding, DecompressLayer};
pub use http::HttpRequestLayer;
