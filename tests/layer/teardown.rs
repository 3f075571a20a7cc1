use super::*;

fn assert_clean(transport: &MemoryStream) {
    for name in [DATA, END, ERROR, CLOSE, FD, DRAIN] {
        assert_eq!(transport.events().watcher_count(name), 0, "{name}");
        assert_eq!(transport.listener_count(name), 0, "{name}");
    }
    assert_eq!(transport.events().fallback_count(), 0);
}

#[test]
fn test_drop_restores_transport() {
    let (transport, layer) = layered();
    layer.claim(DATA, |_, _| {});
    assert_eq!(transport.events().watcher_count(DATA), 1);
    assert_eq!(transport.listener_count(DATA), 1);
    assert_eq!(transport.events().fallback_count(), 1);

    drop(layer);
    assert_clean(&transport);
}

#[test]
fn test_transport_reusable_after_drop() {
    let (transport, layer) = layered();
    drop(layer);

    let custom = Event::new("upgrade", Payload::Empty);
    assert_eq!(transport.emit(&custom), Emitted::Unhandled);

    let layer = Layer::new(transport.clone()).unwrap();
    let data = record(&layer, DATA);
    transport.push("again");
    assert_eq!(*data.borrow(), vec![Event::data("again")]);
}

#[test]
fn test_detach_stops_forwarding_keeps_writes() {
    let (transport, layer) = layered();
    let data = record(&layer, DATA);
    layer.detach();

    transport.push("after");
    assert!(data.borrow().is_empty());

    layer
        .write(Bytes::from_static(b"still"), None)
        .unwrap();
    assert_eq!(transport.written(), "still");
    assert_clean(&transport);
}

#[test]
fn test_drop_inside_handler() {
    let transport = transport();
    let slot: Rc<RefCell<Option<Layer>>> =
        Rc::new(RefCell::new(Some(Layer::new(transport.clone()).unwrap())));
    let hits = Rc::new(Cell::new(0));

    let s = slot.clone();
    let h = hits.clone();
    if let Some(layer) = slot.borrow().as_ref() {
        layer.on(DATA, move |_| {
            h.set(h.get() + 1);
            s.borrow_mut().take();
        });
    }

    transport.push("one");
    transport.push("two");
    assert_eq!(hits.get(), 1);
    assert!(slot.borrow().is_none());
    assert_clean(&transport);
}

#[test]
fn test_read_only_transport_rejected() {
    let transport = Rc::new(MemoryStream::read_only());
    let err = Layer::new(transport.clone()).unwrap_err();
    match err {
        StreamError::InvalidArgument(missing) => {
            assert!(missing.contains(Capabilities::WRITE));
            assert!(missing.contains(Capabilities::END));
        }
        e => panic!("unexpected {e}"),
    }
    // nothing installed on failure
    assert_clean(&transport);
}

#[test]
fn test_destroy_capability_optional() {
    let transport = Rc::new(MemoryStream::with_capabilities(
        Capabilities::all() - Capabilities::DESTROY,
    ));
    assert!(Layer::new(transport).is_ok());
}

#[test]
fn test_claim_after_detach_released_on_drop() {
    let (transport, layer) = layered();
    layer.detach();
    layer.claim(DATA, |_, _| {});
    assert_eq!(transport.listener_count(DATA), 1);
    drop(layer);
    assert_clean(&transport);

    // next layer on the same transport still gets data
    let layer = Layer::new(transport.clone()).unwrap();
    let data = record(&layer, DATA);
    transport.push("x");
    assert_eq!(*data.borrow(), vec![Event::data("x")]);
}

#[test]
fn test_release_on_detached_layer() {
    let (transport, layer) = layered();
    let before = layer.claim(DATA, |_, _| {});
    layer.detach();
    // already released by detach
    assert!(!layer.release(before));

    let after = layer.claim(END, |_, _| {});
    assert!(layer.release(after));
    assert!(!layer.is_attached());
    assert_clean(&transport);
}
