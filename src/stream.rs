use bitflags::bitflags;
use bytes::Bytes;

use crate::{
    emitter::{Emitted, EventEmitter, ListenerId},
    error::StreamError,
    event::{Encoding, Event, EventName},
};

bitflags! {
    /// Operations a stream actually supports.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u16 {
        const EMIT     = 1 << 0;
        const ON       = 1 << 1;
        const WRITE    = 1 << 2;
        const END      = 1 << 3;
        const PAUSE    = 1 << 4;
        const RESUME   = 1 << 5;
        const DESTROY  = 1 << 6;
        const READABLE = 1 << 7;
        const WRITABLE = 1 << 8;

        /// Minimum set a stream must offer to be wrapped by a layer.
        const REQUIRED = Self::EMIT.bits()
            | Self::ON.bits()
            | Self::WRITE.bits()
            | Self::END.bits()
            | Self::PAUSE.bits()
            | Self::RESUME.bits()
            | Self::READABLE.bits()
            | Self::WRITABLE.bits();
    }
}

impl Capabilities {
    pub fn missing(&self, required: Capabilities) -> Capabilities {
        required.difference(*self)
    }
}

/// Stream-like object: a per-instance event emitter plus the write/control
/// surface. Every method takes `&self`, streams are shared through `Rc` and
/// re-entered from event handlers.
pub trait Stream {
    fn events(&self) -> &EventEmitter;

    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    fn write(&self, data: Bytes, encoding: Option<Encoding>) -> Result<bool, StreamError>;

    fn end(&self, data: Option<Bytes>, encoding: Option<Encoding>) -> Result<(), StreamError>;

    fn pause(&self) -> Result<(), StreamError>;

    fn resume(&self) -> Result<(), StreamError>;

    fn destroy(&self, error: Option<StreamError>) -> Result<(), StreamError>;

    fn readable(&self) -> bool;

    fn writable(&self) -> bool;

    fn emit(&self, event: &Event) -> Emitted {
        self.events().emit(event)
    }

    fn on<N, F>(&self, name: N, listener: F) -> ListenerId
    where
        N: Into<EventName>,
        F: Fn(&Event) + 'static,
        Self: Sized,
    {
        self.events().on(name, listener)
    }

    fn off(&self, id: ListenerId) -> bool {
        self.events().off(id)
    }

    fn listener_count(&self, name: &str) -> usize {
        self.events().listener_count(name)
    }
}
