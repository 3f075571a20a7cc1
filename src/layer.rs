use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::{Rc, Weak},
};

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::{
    config::LayerConfig,
    emitter::{Emitted, EventEmitter, HookId, ListenerId},
    error::StreamError,
    event::{ERROR, Encoding, Event, EventName},
    stream::{Capabilities, Stream},
};

struct Shared {
    events: EventEmitter,
    wrapped: Rc<dyn Stream>,
    config: LayerConfig,
    readable: Cell<Option<bool>>,
    writable: Cell<Option<bool>>,
    watchers: RefCell<Vec<ListenerId>>,
    claims: RefCell<Vec<ListenerId>>,
    fallback: Cell<Option<HookId>>,
}

impl Shared {
    // watched event: forward only while nobody else listens downstream
    fn auto_forward(&self, event: &Event) {
        if self.wrapped.events().listener_count(event.name()) > 0 {
            trace!(event = event.name(), "claimed on wrapped stream, not forwarding");
            return;
        }
        self.forward(event);
    }

    fn forward(&self, event: &Event) -> bool {
        let handled = self.events.emit(event).is_handled();
        if !handled && event.name() == ERROR {
            warn!(error = ?event.as_error(), "unhandled error event");
        }
        handled
    }
}

/// A stream stacked on top of another stream.
///
/// By default writes and control calls go straight down to the wrapped
/// stream, and events come straight up from it:
///
/// - each watched event (see [`LayerConfig`]) is picked up by a watcher on
///   the wrapped stream and re-emitted here, unless an external handler is
///   attached to that event on the wrapped stream. Attaching one, usually
///   through [`Layer::claim`], makes that handler solely responsible for
///   what this layer emits.
/// - any other event nobody handles on the wrapped stream reaches this layer
///   through a fallback hook.
///
/// Dropping the layer removes everything it installed on the wrapped
/// stream.
pub struct Layer {
    shared: Rc<Shared>,
}

impl Layer {
    pub fn new(wrapped: Rc<dyn Stream>) -> Result<Self, StreamError> {
        Layer::with_config(wrapped, LayerConfig::default())
    }

    /* Steps:
     *      1. Check wrapped offers Capabilities::REQUIRED
     *
     *      2. Install fallback hook on wrapped => unhandled events are
     *         re-emitted on the layer.
     *
     *      3. For each watched event install a watcher on wrapped.
     *
     * Error:
     *      StreamError::InvalidArgument    [1]
     */
    pub fn with_config(wrapped: Rc<dyn Stream>, config: LayerConfig) -> Result<Self, StreamError> {
        // 1. Capabilities
        let missing = wrapped
            .capabilities()
            .missing(Capabilities::REQUIRED);
        if !missing.is_empty() {
            return Err(StreamError::InvalidArgument(missing));
        }

        let shared = Rc::new(Shared {
            events: EventEmitter::new(),
            wrapped,
            config,
            readable: Cell::new(None),
            writable: Cell::new(None),
            watchers: RefCell::new(Vec::new()),
            claims: RefCell::new(Vec::new()),
            fallback: Cell::new(None),
        });
        let wrapped_events = shared.wrapped.events();

        // 2. Fallback hook
        let weak = Rc::downgrade(&shared);
        let hook = wrapped_events.install_fallback(move |event| match weak.upgrade() {
            Some(shared) => shared.forward(event),
            None => false,
        });
        shared.fallback.set(Some(hook));

        // 3. Watchers
        let watchers: Vec<ListenerId> = shared
            .config
            .watched
            .iter()
            .map(|name| {
                let weak = Rc::downgrade(&shared);
                wrapped_events.watch(name.clone(), move |event| {
                    if let Some(shared) = weak.upgrade() {
                        shared.auto_forward(event);
                    }
                })
            })
            .collect();
        *shared.watchers.borrow_mut() = watchers;

        debug!(watched = ?shared.config.watched, "layer attached");
        Ok(Layer { shared })
    }

    pub fn wrapped(&self) -> &Rc<dyn Stream> {
        &self.shared.wrapped
    }

    pub fn config(&self) -> &LayerConfig {
        &self.shared.config
    }

    pub fn handle(&self) -> LayerHandle {
        LayerHandle(Rc::downgrade(&self.shared))
    }

    pub fn readable_override(&self) -> Option<bool> {
        self.shared.readable.get()
    }

    /// `None` hands the status back to the wrapped stream.
    pub fn set_readable(&self, value: Option<bool>) {
        self.shared.readable.set(value);
    }

    pub fn writable_override(&self) -> Option<bool> {
        self.shared.writable.get()
    }

    /// `None` hands the status back to the wrapped stream.
    pub fn set_writable(&self, value: Option<bool>) {
        self.shared.writable.set(value);
    }

    /// Attach `handler` for `name` on the wrapped stream.
    ///
    /// The handler counts as an external handler, so for a watched event
    /// auto-forwarding stops and the handler decides what, if anything, the
    /// layer emits through the [`LayerHandle`] it receives. Claims are
    /// released on [`Layer::detach`] or drop.
    pub fn claim<N, F>(&self, name: N, handler: F) -> ListenerId
    where
        N: Into<EventName>,
        F: Fn(&LayerHandle, &Event) + 'static,
    {
        let handle = self.handle();
        let id = self
            .shared
            .wrapped
            .events()
            .on(name, move |event| handler(&handle, event));
        self.shared.claims.borrow_mut().push(id);
        id
    }

    pub fn release(&self, id: ListenerId) -> bool {
        let mut claims = self.shared.claims.borrow_mut();
        match claims.iter().position(|c| *c == id) {
            Some(pos) => {
                claims.remove(pos);
                self.shared.wrapped.events().off(id)
            }
            None => false,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.shared.fallback.get().is_some()
    }

    /// Remove the fallback hook, the watchers and the claims from the
    /// wrapped stream. Writes keep going down after detaching.
    ///
    /// Claims made after a detach are released by the next one, or on drop.
    pub fn detach(&self) {
        let events = self.shared.wrapped.events();
        let hook = self.shared.fallback.take();
        if let Some(hook) = hook {
            events.remove_fallback(hook);
        }
        for id in self.shared.watchers.take() {
            events.off(id);
        }
        for id in self.shared.claims.take() {
            events.off(id);
        }
        if hook.is_some() {
            debug!("layer detached");
        }
    }
}

impl Drop for Layer {
    fn drop(&mut self) {
        self.detach();
    }
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("events", &self.shared.events)
            .field("watched", &self.shared.config.watched)
            .field("readable", &self.shared.readable.get())
            .field("writable", &self.shared.writable.get())
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Weak reference to a layer, handed to claimed handlers.
#[derive(Clone)]
pub struct LayerHandle(Weak<Shared>);

impl LayerHandle {
    /// Emit on the layer; `Unhandled` once the layer is gone.
    pub fn emit(&self, event: &Event) -> Emitted {
        match self.0.upgrade() {
            Some(shared) => shared.events.emit(event),
            None => Emitted::Unhandled,
        }
    }

    pub fn wrapped(&self) -> Option<Rc<dyn Stream>> {
        self.0
            .upgrade()
            .map(|shared| shared.wrapped.clone())
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl fmt::Debug for LayerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LayerHandle")
            .field(&self.is_alive())
            .finish()
    }
}

/// A protocol layer built around a [`Layer`].
///
/// Implementors only provide [`StreamLayer::layer`]; every hook defaults to
/// plain delegation and can be overridden one by one. All implementors are
/// [`Stream`]s, so they stack on each other.
pub trait StreamLayer {
    fn layer(&self) -> &Layer;

    fn on_write(&self, data: Bytes, encoding: Option<Encoding>) -> Result<bool, StreamError> {
        self.layer().wrapped().write(data, encoding)
    }

    // payload goes through on_write, so overrides apply
    fn on_end(&self, data: Option<Bytes>, encoding: Option<Encoding>) -> Result<(), StreamError> {
        if let Some(data) = data.filter(|d| !d.is_empty()) {
            self.on_write(data, encoding)?;
        }
        self.layer().wrapped().end(None, None)
    }

    fn on_pause(&self) -> Result<(), StreamError> {
        self.layer().wrapped().pause()
    }

    fn on_resume(&self) -> Result<(), StreamError> {
        self.layer().wrapped().resume()
    }

    fn on_destroy(&self, error: Option<StreamError>) -> Result<(), StreamError> {
        self.layer().wrapped().destroy(error)
    }

    fn is_readable(&self) -> bool {
        let layer = self.layer();
        layer
            .readable_override()
            .unwrap_or_else(|| layer.wrapped().readable())
    }

    fn is_writable(&self) -> bool {
        let layer = self.layer();
        layer
            .writable_override()
            .unwrap_or_else(|| layer.wrapped().writable())
    }
}

impl StreamLayer for Layer {
    fn layer(&self) -> &Layer {
        self
    }
}

impl<L> Stream for L
where
    L: StreamLayer,
{
    fn events(&self) -> &EventEmitter {
        &self.layer().shared.events
    }

    fn write(&self, data: Bytes, encoding: Option<Encoding>) -> Result<bool, StreamError> {
        self.on_write(data, encoding)
    }

    fn end(&self, data: Option<Bytes>, encoding: Option<Encoding>) -> Result<(), StreamError> {
        self.on_end(data, encoding)
    }

    fn pause(&self) -> Result<(), StreamError> {
        self.on_pause()
    }

    fn resume(&self) -> Result<(), StreamError> {
        self.on_resume()
    }

    fn destroy(&self, error: Option<StreamError>) -> Result<(), StreamError> {
        self.on_destroy(error)
    }

    fn readable(&self) -> bool {
        self.is_readable()
    }

    fn writable(&self) -> bool {
        self.is_writable()
    }
}
