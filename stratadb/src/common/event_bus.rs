use crate::errors::{ErrorKind, StrataError, StrataResult};
use basu::error::BasuError;
use basu::event::Event;
use basu::{EventBus, Handle, HandlerId};
use std::marker::PhantomData;
use std::sync::Arc;

/// Topic-keyed change bus used by the notification hub.
///
/// Wraps a `basu` event bus. A whole-collection registry publishes under a
/// single fixed topic; the per-document registry uses the document ID as the
/// topic, so a listener only sees events for its subscribed document.
///
/// Deregistration is forgiving by design: removing a listener whose topic or
/// handler is already gone is a no-op, which is what makes token removal
/// safe after a collection has been invalidated.
#[derive(Clone)]
pub struct ChangeBus<E, L> {
    inner: Arc<ChangeBusInner<E, L>>,
}

impl<E, L> Default for ChangeBus<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E, L> ChangeBus<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    pub fn new() -> Self {
        ChangeBus {
            inner: Arc::new(ChangeBusInner::new()),
        }
    }

    /// Registers a listener under the given topic.
    pub fn register(&self, topic: &str, listener: L) -> StrataResult<HandlerId> {
        self.inner.register(topic, listener)
    }

    /// Removes a previously registered listener. Removing a listener that is
    /// no longer registered (or whose bus was cleared) succeeds silently.
    pub fn deregister(&self, topic: &str, handler_id: &HandlerId) -> StrataResult<()> {
        self.inner.deregister(topic, handler_id)
    }

    /// Publishes an event to every listener of the topic. Listener failures
    /// are logged, never propagated to the publisher.
    pub fn publish(&self, topic: &str, event: E) -> StrataResult<()> {
        self.inner.publish(topic, event)
    }

    /// Clears all registered listeners.
    pub fn close(&self) -> StrataResult<()> {
        self.inner.close()
    }

    /// Returns true if the topic has at least one listener.
    pub fn has_listeners(&self, topic: &str) -> bool {
        self.inner.has_listeners(topic)
    }
}

struct ChangeBusInner<E, L> {
    event_bus: EventBus<E>,
    phantom_data: PhantomData<L>,
}

impl<E, L> ChangeBusInner<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    fn new() -> Self {
        ChangeBusInner {
            event_bus: EventBus::new(),
            phantom_data: PhantomData,
        }
    }

    fn register(&self, topic: &str, listener: L) -> StrataResult<HandlerId> {
        match self.event_bus.subscribe(topic, Box::new(listener)) {
            Ok(handler_id) => Ok(handler_id),
            Err(e) => Err(Self::strata_error(e)),
        }
    }

    #[inline]
    fn deregister(&self, topic: &str, handler_id: &HandlerId) -> StrataResult<()> {
        match self.event_bus.unsubscribe(topic, handler_id) {
            Ok(_) => Ok(()),
            // dangling removal is a no-op
            Err(BasuError::EventTypeNotFOUND) => Ok(()),
            Err(e) => Err(Self::strata_error(e)),
        }
    }

    #[inline]
    fn publish(&self, topic: &str, event: E) -> StrataResult<()> {
        // Fast path: skip event construction when nobody listens
        let handler_count = match self.event_bus.get_handler_count(topic) {
            Ok(count) => count,
            Err(BasuError::EventTypeNotFOUND) => return Ok(()),
            Err(e) => return Err(Self::strata_error(e)),
        };
        if handler_count == 0 {
            return Ok(());
        }

        let basu_event = Event::new(event);
        match self.event_bus.publish(topic, &basu_event) {
            Ok(_) => Ok(()),
            Err(BasuError::HandlerError(e)) => {
                // listener callbacks must be non-throwing; a misbehaving one
                // is logged and never fails the committed write
                log::warn!("Change listener failed: {}", e);
                Ok(())
            }
            Err(e) => Err(Self::strata_error(e)),
        }
    }

    #[inline]
    fn close(&self) -> StrataResult<()> {
        match self.event_bus.clear() {
            Ok(_) => Ok(()),
            Err(e) => Err(Self::strata_error(e)),
        }
    }

    #[inline]
    fn has_listeners(&self, topic: &str) -> bool {
        match self.event_bus.get_handler_count(topic) {
            Ok(count) => count > 0,
            Err(BasuError::EventTypeNotFOUND) => false,
            Err(e) => {
                log::warn!("Failed to check listeners: {}, defaulting to false", e);
                false
            }
        }
    }

    #[inline]
    fn strata_error(e: BasuError) -> StrataError {
        match e {
            BasuError::EventTypeNotFOUND => StrataError::new(
                "Change bus error: the requested topic is not registered",
                ErrorKind::EventError,
            ),
            BasuError::MutexPoisoned => StrataError::new(
                "Change bus error: internal mutex poisoned",
                ErrorKind::EventError,
            ),
            BasuError::HandlerError(e) => {
                let error_message = e
                    .source()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "Unknown error in change listener".to_string());
                StrataError::new(
                    &format!("Change listener error: {}", error_message),
                    ErrorKind::EventError,
                )
            }
        }
    }
}
