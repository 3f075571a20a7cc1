use std::borrow::Cow;

use bytes::Bytes;

use crate::error::StreamError;

pub type EventName = Cow<'static, str>;

// standard stream events
pub const DATA: &str = "data";
pub const END: &str = "end";
pub const ERROR: &str = "error";
pub const CLOSE: &str = "close";
pub const FD: &str = "fd";
pub const DRAIN: &str = "drain";
pub const FINISH: &str = "finish";

/// Events a [`Layer`](crate::layer::Layer) forwards only while nobody else
/// listens for them on the wrapped stream.
pub const WATCHED_EVENTS: [&str; 6] = [DATA, END, ERROR, CLOSE, FD, DRAIN];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Utf8,
    Ascii,
    Latin1,
    Base64,
    Hex,
    Binary,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    Data(Bytes),
    Text(String),
    Fd(i32),
    Error(StreamError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    name: EventName,
    payload: Payload,
}

impl Event {
    pub fn new<N>(name: N, payload: Payload) -> Self
    where
        N: Into<EventName>,
    {
        Event {
            name: name.into(),
            payload,
        }
    }

    pub fn data<B>(data: B) -> Self
    where
        B: Into<Bytes>,
    {
        Event::new(DATA, Payload::Data(data.into()))
    }

    pub fn end() -> Self {
        Event::new(END, Payload::Empty)
    }

    pub fn error(error: StreamError) -> Self {
        Event::new(ERROR, Payload::Error(error))
    }

    pub fn close() -> Self {
        Event::new(CLOSE, Payload::Empty)
    }

    pub fn fd(fd: i32) -> Self {
        Event::new(FD, Payload::Fd(fd))
    }

    pub fn drain() -> Self {
        Event::new(DRAIN, Payload::Empty)
    }

    pub fn finish() -> Self {
        Event::new(FINISH, Payload::Empty)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn data_bytes(&self) -> Option<&Bytes> {
        match &self.payload {
            Payload::Data(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&StreamError> {
        match &self.payload {
            Payload::Error(e) => Some(e),
            _ => None,
        }
    }

    pub fn into_parts(self) -> (EventName, Payload) {
        (self.name, self.payload)
    }
}
