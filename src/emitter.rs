use std::{
    cell::RefCell,
    collections::HashMap,
    fmt,
    rc::Rc,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::event::{Event, EventName};

pub type Listener = Rc<dyn Fn(&Event)>;
pub type Fallback = Rc<dyn Fn(&Event) -> bool>;

// ids are unique across emitters, a foreign id never matches
static NEXT_ID: AtomicU64 = AtomicU64::new(0);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

/// Outcome of [`EventEmitter::emit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emitted {
    /// Nobody took the event.
    Unhandled,
    /// At least one handler registered on this emitter ran.
    Handled,
    /// No handler here, a fallback hook took it.
    Forwarded,
}

impl Emitted {
    pub fn is_handled(&self) -> bool {
        !matches!(self, Emitted::Unhandled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Listener,
    Watcher,
}

struct Entry {
    id: ListenerId,
    name: EventName,
    role: Role,
    listener: Listener,
}

/* Description:
 *      Per-instance event dispatch with an explicit subscription registry.
 *
 *      Listeners are external handlers and are counted per event name as
 *      they come and go. Watchers are fallback listeners of record installed
 *      by layers; they run like listeners but never show up in the count.
 *
 *      Fallback hooks run, in installation order, only for events no
 *      handler took. The first hook reporting true stops the chain.
 */
#[derive(Default)]
pub struct EventEmitter {
    entries: RefCell<Vec<Entry>>,
    counts: RefCell<HashMap<EventName, usize>>,
    fallbacks: RefCell<Vec<(HookId, Fallback)>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        EventEmitter::default()
    }

    fn register(&self, name: EventName, role: Role, listener: Listener) -> ListenerId {
        let id = ListenerId(next_id());
        if role == Role::Listener {
            *self.counts.borrow_mut().entry(name.clone()).or_default() += 1;
        }
        self.entries.borrow_mut().push(Entry {
            id,
            name,
            role,
            listener,
        });
        id
    }

    pub fn on<N, F>(&self, name: N, listener: F) -> ListenerId
    where
        N: Into<EventName>,
        F: Fn(&Event) + 'static,
    {
        self.register(name.into(), Role::Listener, Rc::new(listener))
    }

    pub fn watch<N, F>(&self, name: N, watcher: F) -> ListenerId
    where
        N: Into<EventName>,
        F: Fn(&Event) + 'static,
    {
        self.register(name.into(), Role::Watcher, Rc::new(watcher))
    }

    pub fn off(&self, id: ListenerId) -> bool {
        let removed = {
            let mut entries = self.entries.borrow_mut();
            match entries.iter().position(|e| e.id == id) {
                Some(pos) => entries.remove(pos),
                None => return false,
            }
        };
        if removed.role == Role::Listener {
            let mut counts = self.counts.borrow_mut();
            let remaining = counts.get_mut(&removed.name).map(|count| {
                *count -= 1;
                *count
            });
            if remaining == Some(0) {
                counts.remove(&removed.name);
            }
        }
        true
    }

    /// Number of external handlers for `name`, watchers excluded.
    pub fn listener_count(&self, name: &str) -> usize {
        self.counts
            .borrow()
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    pub fn watcher_count(&self, name: &str) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.role == Role::Watcher && e.name == name)
            .count()
    }

    pub fn install_fallback<F>(&self, fallback: F) -> HookId
    where
        F: Fn(&Event) -> bool + 'static,
    {
        let id = HookId(next_id());
        self.fallbacks
            .borrow_mut()
            .push((id, Rc::new(fallback)));
        id
    }

    pub fn remove_fallback(&self, id: HookId) -> bool {
        let mut fallbacks = self.fallbacks.borrow_mut();
        match fallbacks.iter().position(|(hid, _)| *hid == id) {
            Some(pos) => {
                fallbacks.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn fallback_count(&self) -> usize {
        self.fallbacks.borrow().len()
    }

    /* Steps:
     *      1. Snapshot handlers registered for the event name.
     *      2. Non-empty => call each in registration order => Handled
     *      3. Else snapshot fallbacks, first returning true => Forwarded
     *      4. Else Unhandled
     *
     * Note:
     *      Snapshots release the registry borrow before calling out, handlers
     *      are free to (un)register or emit re-entrantly.
     */
    pub fn emit(&self, event: &Event) -> Emitted {
        let listeners: Vec<Listener> = self
            .entries
            .borrow()
            .iter()
            .filter(|e| e.name == event.name())
            .map(|e| e.listener.clone())
            .collect();

        if !listeners.is_empty() {
            listeners
                .iter()
                .for_each(|listener| listener(event));
            return Emitted::Handled;
        }

        let fallbacks: Vec<Fallback> = self
            .fallbacks
            .borrow()
            .iter()
            .map(|(_, f)| f.clone())
            .collect();
        for fallback in fallbacks {
            if fallback(event) {
                return Emitted::Forwarded;
            }
        }
        Emitted::Unhandled
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("handlers", &self.entries.borrow().len())
            .field("counts", &self.counts.borrow())
            .field("fallbacks", &self.fallbacks.borrow().len())
            .finish()
    }
}
