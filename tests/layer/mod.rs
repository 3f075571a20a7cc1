use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use bytes::Bytes;
use stack_plz::{
    Capabilities, Emitted, Encoding, Event, Layer, LayerConfig, MemoryStream, Payload, Stream,
    StreamError, StreamLayer,
    event::{CLOSE, DATA, DRAIN, END, ERROR, FD, FINISH},
};

use super::*;

mod stacking;
mod teardown;
