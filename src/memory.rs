//! In-memory duplex transport.
//!
//! The inbound side is driven by hand (`push`, `finish`, `fail`), the
//! outbound side records every write. Used as the bottom of a stack in
//! tests and wherever a real socket is not wanted.

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
};

use bytes::{Bytes, BytesMut};

use crate::{
    emitter::{Emitted, EventEmitter},
    error::StreamError,
    event::{Encoding, Event},
    stream::{Capabilities, Stream},
};

#[derive(Debug)]
pub struct MemoryStream {
    events: EventEmitter,
    capabilities: Capabilities,
    writes: RefCell<Vec<(Bytes, Option<Encoding>)>>,
    pending: RefCell<VecDeque<Bytes>>,
    write_error: RefCell<Option<StreamError>>,
    readable: Cell<bool>,
    writable: Cell<bool>,
    paused: Cell<bool>,
    ended: Cell<bool>,
    end_count: Cell<usize>,
    destroyed: Cell<bool>,
}

impl Default for MemoryStream {
    fn default() -> Self {
        MemoryStream::with_capabilities(Capabilities::all())
    }
}

impl MemoryStream {
    pub fn new() -> Self {
        MemoryStream::default()
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        MemoryStream {
            events: EventEmitter::new(),
            capabilities,
            writes: RefCell::new(Vec::new()),
            pending: RefCell::new(VecDeque::new()),
            write_error: RefCell::new(None),
            readable: Cell::new(true),
            writable: Cell::new(capabilities.contains(Capabilities::WRITE)),
            paused: Cell::new(false),
            ended: Cell::new(false),
            end_count: Cell::new(0),
            destroyed: Cell::new(false),
        }
    }

    pub fn read_only() -> Self {
        MemoryStream::with_capabilities(
            Capabilities::all() - Capabilities::WRITE - Capabilities::END - Capabilities::WRITABLE,
        )
    }

    // Inbound

    /// Emit `data`; queued while paused. `None` when queued.
    pub fn push<B>(&self, data: B) -> Option<Emitted>
    where
        B: Into<Bytes>,
    {
        let data = data.into();
        if self.paused.get() {
            self.pending.borrow_mut().push_back(data);
            return None;
        }
        Some(self.events.emit(&Event::data(data)))
    }

    pub fn finish(&self) -> Emitted {
        self.readable.set(false);
        self.events.emit(&Event::end())
    }

    pub fn fail(&self, error: StreamError) -> Emitted {
        self.events.emit(&Event::error(error))
    }

    pub fn emit_fd(&self, fd: i32) -> Emitted {
        self.events.emit(&Event::fd(fd))
    }

    pub fn emit_drain(&self) -> Emitted {
        self.events.emit(&Event::drain())
    }

    pub fn pending_len(&self) -> usize {
        self.pending.borrow().len()
    }

    // Outbound

    /// Every following write fails with `error`.
    pub fn fail_writes(&self, error: StreamError) {
        *self.write_error.borrow_mut() = Some(error);
    }

    pub fn writes(&self) -> Vec<(Bytes, Option<Encoding>)> {
        self.writes.borrow().clone()
    }

    /// All written data, concatenated.
    pub fn written(&self) -> Bytes {
        let writes = self.writes.borrow();
        let mut buf = BytesMut::with_capacity(writes.iter().map(|(d, _)| d.len()).sum());
        writes
            .iter()
            .for_each(|(data, _)| buf.extend_from_slice(data));
        buf.freeze()
    }

    pub fn write_count(&self) -> usize {
        self.writes.borrow().len()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.get()
    }

    pub fn is_ended(&self) -> bool {
        self.ended.get()
    }

    pub fn end_count(&self) -> usize {
        self.end_count.get()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    pub fn set_readable(&self, value: bool) {
        self.readable.set(value);
    }

    pub fn set_writable(&self, value: bool) {
        self.writable.set(value);
    }
}

impl Stream for MemoryStream {
    fn events(&self) -> &EventEmitter {
        &self.events
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn write(&self, data: Bytes, encoding: Option<Encoding>) -> Result<bool, StreamError> {
        if self.destroyed.get() {
            return Err(StreamError::Destroyed);
        }
        if self.ended.get() {
            return Err(StreamError::WriteAfterEnd);
        }
        if let Some(e) = self.write_error.borrow().as_ref() {
            return Err(e.clone());
        }
        self.writes.borrow_mut().push((data, encoding));
        Ok(true)
    }

    /* Steps:
     *      1. Refuse once destroyed.
     *      2. Write payload, if any.
     *      3. Mark ended, no longer writable.
     *      4. Emit finish.
     *
     * Error:
     *      StreamError::Destroyed      [1]
     *      write errors                [2]
     */
    fn end(&self, data: Option<Bytes>, encoding: Option<Encoding>) -> Result<(), StreamError> {
        if self.destroyed.get() {
            return Err(StreamError::Destroyed);
        }
        if let Some(data) = data {
            self.write(data, encoding)?;
        }
        self.end_count.set(self.end_count.get() + 1);
        if !self.ended.replace(true) {
            self.writable.set(false);
            self.events.emit(&Event::finish());
        }
        Ok(())
    }

    fn pause(&self) -> Result<(), StreamError> {
        self.paused.set(true);
        Ok(())
    }

    fn resume(&self) -> Result<(), StreamError> {
        self.paused.set(false);
        loop {
            // pop before emitting, handlers may pause again
            if self.paused.get() {
                break;
            }
            let next = self.pending.borrow_mut().pop_front();
            match next {
                Some(data) => {
                    self.events.emit(&Event::data(data));
                }
                None => break,
            }
        }
        Ok(())
    }

    fn destroy(&self, error: Option<StreamError>) -> Result<(), StreamError> {
        if self.destroyed.replace(true) {
            return Ok(());
        }
        self.readable.set(false);
        self.writable.set(false);
        self.pending.borrow_mut().clear();
        if let Some(error) = error {
            self.events.emit(&Event::error(error));
        }
        self.events.emit(&Event::close());
        Ok(())
    }

    fn readable(&self) -> bool {
        self.readable.get()
    }

    fn writable(&self) -> bool {
        self.writable.get()
    }
}
