use std::rc::Rc;

use bytes::Bytes;
use stack_plz::{
    Event, Layer, Payload, Stream, StreamError,
    event::{DATA, END, ERROR},
    layers::{ContentEncoding, DecompressLayer, HttpRequestLayer},
};

use super::*;
