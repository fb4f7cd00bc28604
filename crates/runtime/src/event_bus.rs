/// Typed event bus with deferred delivery.
///
/// Emissions queue up during a tick and fan out to every subscriber when
/// `dispatch` runs at the end of the tick. Subscribers registered mid-tick
/// see events emitted after their registration, on the next dispatch.
pub struct EventBus<E> {
    queue: Vec<E>,
    subscribers: Vec<Box<dyn FnMut(&E)>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            queue: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&E) + 'static) {
        self.subscribers.push(Box::new(callback));
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Queue an event for the next dispatch. Nothing is delivered yet.
    pub fn emit(&mut self, event: E) {
        self.queue.push(event);
    }

    pub fn pending(&self) -> &[E] {
        &self.queue
    }

    /// Deliver all queued events to all subscribers, in emission order.
    ///
    /// Returns the number of events delivered.
    pub fn dispatch(&mut self) -> usize {
        let queued = std::mem::take(&mut self.queue);
        for event in &queued {
            for subscriber in &mut self.subscribers {
                subscriber(event);
            }
        }
        queued.len()
    }

    /// Take the queued events without delivering them.
    pub fn drain_pending(&mut self) -> Vec<E> {
        std::mem::take(&mut self.queue)
    }
}

impl<E: std::fmt::Debug> std::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("queue", &self.queue)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
