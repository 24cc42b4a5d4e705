//! Viewport tracking: settle-event fan-in from the external map widget
//!
//! The map widget owns pan/zoom; this crate only observes it. The embedding
//! glue calls [`ViewportTracker::notify`] on every `moveend`/`zoomend`
//! settle event, and the single active subscriber (normally the render
//! pipeline driver) receives the bounds in arrival order. There is no
//! ambient event bus: one tracker per map instance, one subscription at a
//! time, explicit unsubscribe.

use crate::tiles::Viewport;

/// Handle returned by [`ViewportTracker::subscribe`]; pass it back to
/// [`ViewportTracker::unsubscribe`] to deregister.
#[derive(Debug, PartialEq, Eq)]
pub struct Subscription(u64);

type Listener = Box<dyn FnMut(&Viewport) + Send>;

/// Observes map viewport settle events and forwards them to one listener.
#[derive(Default)]
pub struct ViewportTracker {
    listener: Option<(u64, Listener)>,
    next_id: u64,
    last: Option<Viewport>,
}

impl ViewportTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the listener, replacing any previous one. The new listener
    /// immediately receives the last known viewport, if any, mirroring the
    /// initial synthetic settle event a map fires after mounting.
    pub fn subscribe(&mut self, mut listener: impl FnMut(&Viewport) + Send + 'static) -> Subscription {
        let id = self.next_id;
        self.next_id += 1;
        if let Some(viewport) = &self.last {
            listener(viewport);
        }
        self.listener = Some((id, Box::new(listener)));
        Subscription(id)
    }

    /// Deregister. A stale handle (already replaced by a newer subscribe)
    /// is ignored.
    pub fn unsubscribe(&mut self, subscription: Subscription) {
        if let Some((id, _)) = &self.listener {
            if *id == subscription.0 {
                self.listener = None;
            }
        }
    }

    /// Called by the map glue on every pan/zoom settle event. Events are
    /// delivered in arrival order.
    pub fn notify(&mut self, viewport: Viewport) {
        self.last = Some(viewport);
        if let Some((_, listener)) = &mut self.listener {
            listener(&viewport);
        }
    }

    /// Most recently observed viewport.
    pub fn last_viewport(&self) -> Option<&Viewport> {
        self.last.as_ref()
    }
}
