use super::*;

/// Prefixes outgoing data with a tag, strips it from incoming data.
struct Tagged {
    layer: Layer,
    tag: &'static [u8],
}

impl Tagged {
    fn new(wrapped: Rc<dyn Stream>, tag: &'static [u8]) -> Self {
        let layer = Layer::new(wrapped).unwrap();
        layer.claim(DATA, move |handle, event| {
            if let Some(data) = event.data_bytes() {
                if let Some(rest) = data.strip_prefix(tag) {
                    handle.emit(&Event::data(Bytes::copy_from_slice(rest)));
                }
            }
        });
        Tagged { layer, tag }
    }
}

impl StreamLayer for Tagged {
    fn layer(&self) -> &Layer {
        &self.layer
    }

    fn on_write(&self, data: Bytes, encoding: Option<Encoding>) -> Result<bool, StreamError> {
        let mut tagged = self.tag.to_vec();
        tagged.extend_from_slice(&data);
        self.layer().wrapped().write(tagged.into(), encoding)
    }
}

#[test]
fn test_two_layers_write_down() {
    let transport = transport();
    let inner = Rc::new(Tagged::new(transport.clone(), b"[a]"));
    let outer = Tagged::new(inner.clone(), b"[b]");

    outer
        .write(Bytes::from_static(b"msg"), None)
        .unwrap();
    assert_eq!(transport.written(), "[a][b]msg");
}

#[test]
fn test_two_layers_read_up() {
    let transport = transport();
    let inner = Rc::new(Tagged::new(transport.clone(), b"[a]"));
    let outer = Tagged::new(inner.clone(), b"[b]");
    let seen = record(&outer, DATA);

    transport.push("[a][b]msg");
    // dropped by the inner filter
    transport.push("[x]noise");

    assert_eq!(*seen.borrow(), vec![Event::data("msg")]);
}

#[test]
fn test_unclaimed_events_cross_whole_stack() {
    let transport = transport();
    let inner = Rc::new(Tagged::new(transport.clone(), b"[a]"));
    let middle = Rc::new(Layer::new(inner.clone()).unwrap());
    let outer = Layer::new(middle.clone()).unwrap();
    let end = record(&outer, END);
    let errors = record(&outer, ERROR);
    let custom = record(&outer, "upgrade");

    transport.fail(StreamError::Protocol("bad frame".into()));
    transport.emit(&Event::new("upgrade", Payload::Empty));
    transport.finish();

    assert_eq!(
        *errors.borrow(),
        vec![Event::error(StreamError::Protocol("bad frame".into()))]
    );
    assert_eq!(custom.borrow().len(), 1);
    assert_eq!(end.borrow().len(), 1);
}

#[test]
fn test_intermediate_layer_swallows_error() {
    let transport = transport();
    let inner = Rc::new(Layer::new(transport.clone()).unwrap());
    inner.claim(ERROR, |_, _| {});
    let outer = Layer::new(inner.clone()).unwrap();
    let errors = record(&outer, ERROR);

    transport.fail(StreamError::Protocol("ignored".into()));
    assert!(errors.borrow().is_empty());
}

#[test]
fn test_control_calls_reach_transport_through_stack() {
    let transport = transport();
    let inner = Rc::new(Layer::new(transport.clone()).unwrap());
    let outer = Layer::new(inner.clone()).unwrap();

    outer.pause().unwrap();
    assert!(transport.is_paused());
    outer.resume().unwrap();
    assert!(!transport.is_paused());
    outer
        .end(Some(Bytes::from_static(b"last")), None)
        .unwrap();
    assert_eq!(transport.written(), "last");
    assert!(transport.is_ended());
    outer.destroy(None).unwrap();
    assert!(transport.is_destroyed());
}

#[test]
fn test_two_layers_on_same_transport() {
    let transport = transport();
    let first = Layer::new(transport.clone()).unwrap();
    let second = Layer::new(transport.clone()).unwrap();
    let first_data = record(&first, DATA);
    let second_data = record(&second, DATA);

    transport.push("shared");

    assert_eq!(*first_data.borrow(), vec![Event::data("shared")]);
    assert_eq!(*second_data.borrow(), vec![Event::data("shared")]);
}

#[test]
fn test_chained_fallbacks_on_same_transport() {
    let transport = transport();
    let first = Layer::new(transport.clone()).unwrap();
    let second = Layer::new(transport.clone()).unwrap();
    let second_seen = record(&second, "upgrade");
    let event = Event::new("upgrade", Payload::Empty);

    // first layer has no listener, second one takes it
    assert_eq!(transport.emit(&event), Emitted::Forwarded);
    assert_eq!(second_seen.borrow().len(), 1);

    // first layer takes it, second is not asked
    let first_seen = record(&first, "upgrade");
    transport.emit(&event);
    assert_eq!(first_seen.borrow().len(), 1);
    assert_eq!(second_seen.borrow().len(), 1);

    // removing the first hook leaves the chain intact
    drop(first);
    transport.emit(&event);
    assert_eq!(second_seen.borrow().len(), 2);
}
