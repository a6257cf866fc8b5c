use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use crate::event::{EditorEvent, EventHandler};

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Synchronous fan-out of engine events to observers.
///
/// Events emitted while handlers are running are queued and delivered, in
/// order, once the current event has reached every handler.
pub struct EventBus {
    handlers: RefCell<Vec<(SubscriptionId, Box<dyn EventHandler>)>>,
    queue: RefCell<VecDeque<EditorEvent>>,
    dispatching: Cell<bool>,
    next_id: Cell<u64>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.handler_count())
            .field("queued", &self.queue.borrow().len())
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: RefCell::new(Vec::new()),
            queue: RefCell::new(VecDeque::new()),
            dispatching: Cell::new(false),
            next_id: Cell::new(0),
        }
    }

    pub fn subscribe(&self, handler: Box<dyn EventHandler>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.handlers.borrow_mut().push((id, handler));
        id
    }

    /// Returns false if `id` was not subscribed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let before = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        handlers.len() != before
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.borrow().len()
    }

    pub fn emit(&self, event: EditorEvent) {
        log::trace!("event: {:?}", event);
        self.queue.borrow_mut().push_back(event);
        if self.dispatching.replace(true) {
            return;
        }
        loop {
            let Some(event) = self.queue.borrow_mut().pop_front() else {
                break;
            };
            // Handlers run outside the borrow so they may subscribe or emit
            let mut handlers = std::mem::take(&mut *self.handlers.borrow_mut());
            for (_, handler) in handlers.iter_mut() {
                handler.handle_event(&event);
            }
            let mut slot = self.handlers.borrow_mut();
            let added = std::mem::take(&mut *slot);
            handlers.extend(added);
            *slot = handlers;
        }
        self.dispatching.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn recorder(bus: &EventBus) -> (SubscriptionId, Rc<RefCell<Vec<EditorEvent>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = bus.subscribe(Box::new(move |event: &EditorEvent| sink.borrow_mut().push(event.clone())));
        (id, seen)
    }

    #[test]
    fn every_handler_sees_every_event() {
        let bus = EventBus::new();
        let (_, first) = recorder(&bus);
        let (_, second) = recorder(&bus);

        bus.emit(EditorEvent::RestoreStarted);
        bus.emit(EditorEvent::RestoreFinished);

        let expected = vec![EditorEvent::RestoreStarted, EditorEvent::RestoreFinished];
        assert_eq!(*first.borrow(), expected);
        assert_eq!(*second.borrow(), expected);
    }

    #[test]
    fn unsubscribed_handlers_stop_receiving() {
        let bus = EventBus::new();
        let (id, seen) = recorder(&bus);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));

        bus.emit(EditorEvent::ObjectsReordered);
        assert!(seen.borrow().is_empty());
        assert_eq!(bus.handler_count(), 0);
    }

    #[test]
    fn subscribing_from_a_handler_is_allowed() {
        let bus = Rc::new(EventBus::new());
        let late = Rc::new(RefCell::new(Vec::new()));
        let late_sink = Rc::clone(&late);
        let bus_ref = Rc::clone(&bus);
        let mut subscribed = false;
        bus.subscribe(Box::new(move |_: &EditorEvent| {
            if !subscribed {
                subscribed = true;
                let sink = Rc::clone(&late_sink);
                bus_ref.subscribe(Box::new(move |event: &EditorEvent| sink.borrow_mut().push(event.clone())));
            }
        }));

        bus.emit(EditorEvent::CropStarted);
        assert!(late.borrow().is_empty());
        bus.emit(EditorEvent::CropFinished { applied: false });
        assert_eq!(*late.borrow(), vec![EditorEvent::CropFinished { applied: false }]);
        assert_eq!(bus.handler_count(), 2);
    }
}
