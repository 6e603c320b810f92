//! Per-instance event emitter
//!
//! Key principles:
//! - Key-value arguments (no order dependency)
//! - Listeners are registered per event type and run in registration order
//! - `"*"` listeners receive every event, after the type-specific ones
//! - Once-listeners are dropped after their first delivery
//! - Delivery is synchronous; listeners may register, remove or dispatch
//!   on the same emitter while being called

use crate::scene::NodeId;
use slotmap::{new_key_type, SlotMap};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::{SystemTime, UNIX_EPOCH};

/// Event type that subscribes to every event
pub const ANY_EVENT: &str = "*";

new_key_type! {
    /// Handle returned by [`EventEmitter::add_listener`], used for removal
    pub struct ListenerId;
}

/// Variant for type-safe event arguments
#[derive(Debug, Clone, PartialEq)]
pub enum EventArg {
    /// Boolean flag
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Text value
    Text(String),
    /// Reference to another node
    Node(NodeId),
}

/// Event with type, origin and key-value arguments
#[derive(Debug, Clone, Default)]
pub struct Event {
    /// Type of event, stamped on dispatch
    pub event_type: String,
    /// Emitter that originally dispatched the event
    pub target: Option<NodeId>,
    /// Emitter currently delivering the event (differs from `target` when proxied)
    pub current_target: Option<NodeId>,
    /// Milliseconds since the Unix epoch when the event was dispatched
    pub timestamp: f64,
    args: HashMap<&'static str, EventArg>,
}

impl Event {
    /// Create an event without arguments
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an argument to the event (builder pattern)
    #[must_use]
    pub fn with_arg(mut self, key: &'static str, value: EventArg) -> Self {
        self.args.insert(key, value);
        self
    }

    /// Get an argument by key
    pub fn get_arg(&self, key: &str) -> Option<&EventArg> {
        self.args.get(key)
    }

    /// Get a boolean argument if present
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get_arg(key) {
            Some(EventArg::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    /// Get an integer argument if present
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.get_arg(key) {
            Some(EventArg::Int(value)) => Some(*value),
            _ => None,
        }
    }

    /// Get a float argument if present
    pub fn get_float(&self, key: &str) -> Option<f64> {
        match self.get_arg(key) {
            Some(EventArg::Float(value)) => Some(*value),
            _ => None,
        }
    }

    /// Get a text argument if present
    pub fn get_text(&self, key: &str) -> Option<&str> {
        match self.get_arg(key) {
            Some(EventArg::Text(value)) => Some(value),
            _ => None,
        }
    }
}

/// Event listener trait
///
/// Implemented for every `FnMut(&Event)` closure.
pub trait EventHandler {
    /// Handle an event
    fn on_event(&mut self, event: &Event);
}

impl<F: FnMut(&Event)> EventHandler for F {
    fn on_event(&mut self, event: &Event) {
        self(event);
    }
}

struct ListenerRecord {
    event_type: String,
    once: bool,
    // Taken out while the handler runs so the registry is not borrowed
    handler: Option<Box<dyn EventHandler>>,
}

#[derive(Default)]
struct Registry {
    listeners: SlotMap<ListenerId, ListenerRecord>,
    by_type: HashMap<String, Vec<ListenerId>>,
}

impl Registry {
    fn ids_for(&self, event_type: &str) -> Vec<ListenerId> {
        let mut ids = self.by_type.get(event_type).cloned().unwrap_or_default();
        if event_type != ANY_EVENT {
            if let Some(any) = self.by_type.get(ANY_EVENT) {
                ids.extend_from_slice(any);
            }
        }
        ids
    }

    fn remove(&mut self, id: ListenerId) -> bool {
        let Some(record) = self.listeners.remove(id) else {
            return false;
        };
        if let Some(ids) = self.by_type.get_mut(&record.event_type) {
            ids.retain(|other| *other != id);
        }
        true
    }
}

/// Event emitter owned by a single node (or any other owner with an id)
pub struct EventEmitter {
    owner: NodeId,
    registry: Rc<RefCell<Registry>>,
}

impl EventEmitter {
    /// Create an emitter whose events carry `owner` as their target
    pub fn new(owner: NodeId) -> Self {
        Self {
            owner,
            registry: Rc::new(RefCell::new(Registry::default())),
        }
    }

    /// Id stamped as `target` on dispatched events
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    /// Register a listener for `event_type` (or [`ANY_EVENT`]).
    ///
    /// With `once` set the listener is removed after its first delivery.
    pub fn add_listener<H>(&self, event_type: &str, handler: H, once: bool) -> ListenerId
    where
        H: EventHandler + 'static,
    {
        let mut registry = self.registry.borrow_mut();
        let id = registry.listeners.insert(ListenerRecord {
            event_type: event_type.to_string(),
            once,
            handler: Some(Box::new(handler)),
        });
        registry.by_type.entry(event_type.to_string()).or_default().push(id);
        id
    }

    /// Remove one listener. Returns false if it was not registered for `event_type`.
    pub fn remove_listener(&self, event_type: &str, id: ListenerId) -> bool {
        let mut registry = self.registry.borrow_mut();
        let registered_here = registry
            .listeners
            .get(id)
            .is_some_and(|record| record.event_type == event_type);
        registered_here && registry.remove(id)
    }

    /// Remove every listener registered for `event_type`
    pub fn remove_all_listeners(&self, event_type: &str) {
        let mut registry = self.registry.borrow_mut();
        if let Some(ids) = registry.by_type.remove(event_type) {
            for id in ids {
                registry.listeners.remove(id);
            }
        }
    }

    /// Number of listeners registered for exactly `event_type`
    pub fn listener_count(&self, event_type: &str) -> usize {
        self.registry
            .borrow()
            .by_type
            .get(event_type)
            .map_or(0, Vec::len)
    }

    /// Emit an event of the given type from this emitter
    pub fn dispatch(&self, event_type: &str, mut event: Event) {
        event.event_type = event_type.to_string();
        event.target = Some(self.owner);
        event.current_target = Some(self.owner);
        event.timestamp = unix_millis();
        run_listeners(&self.registry, &event);
    }

    /// Re-emit every event of `source` from this emitter.
    ///
    /// Forwarded events keep their original `target` and carry this
    /// emitter's id as `current_target`. The forwarding stops once this
    /// emitter is dropped.
    pub fn proxy_events_from(&self, source: &EventEmitter) -> ListenerId {
        let proxy = Rc::downgrade(&self.registry);
        let owner = self.owner;
        source.add_listener(
            ANY_EVENT,
            move |event: &Event| forward(&proxy, owner, event),
            false,
        )
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("owner", &self.owner)
            .field("listeners", &self.registry.borrow().listeners.len())
            .finish()
    }
}

fn forward(proxy: &Weak<RefCell<Registry>>, owner: NodeId, event: &Event) {
    if let Some(registry) = proxy.upgrade() {
        let mut forwarded = event.clone();
        forwarded.current_target = Some(owner);
        run_listeners(&registry, &forwarded);
    }
}

fn run_listeners(registry: &RefCell<Registry>, event: &Event) {
    let ids = registry.borrow().ids_for(&event.event_type);

    for id in ids {
        let taken = registry
            .borrow_mut()
            .listeners
            .get_mut(id)
            .and_then(|record| record.handler.take().map(|handler| (handler, record.once)));

        // Already running further up the stack, or removed meanwhile
        let Some((mut handler, once)) = taken else {
            continue;
        };

        handler.on_event(event);

        let mut guard = registry.borrow_mut();
        if once {
            guard.remove(id);
        } else if let Some(record) = guard.listeners.get_mut(id) {
            record.handler = Some(handler);
        }
    }
}

fn unix_millis() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |elapsed| elapsed.as_secs_f64() * 1000.0)
}
