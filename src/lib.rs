pub mod config;
pub mod emitter;
pub mod error;
pub mod event;
pub mod layer;
pub mod layers;
pub mod memory;
pub mod stream;

pub use config::LayerConfig;
pub use emitter::{Emitted, EventEmitter, HookId, ListenerId};
pub use error::StreamError;
pub use event::{Encoding, Event, EventName, Payload};
pub use layer::{Layer, LayerHandle, StreamLayer};
pub use memory::MemoryStream;
pub use stream::{Capabilities, Stream};
