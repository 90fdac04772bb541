use std::collections::HashSet;

/// Handle to a per-frame subscription held by an animated overlay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TickHandle(u64);

/// Tracks which animated overlays should be advanced on each render tick.
///
/// The animation state itself lives in the overlays; this only answers
/// "is this handle still subscribed?", so an overlay that unsubscribes before
/// removal is guaranteed to see no further frame advancement.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    next: u64,
    active: HashSet<TickHandle>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> TickHandle {
        self.next += 1;
        let handle = TickHandle(self.next);
        self.active.insert(handle);
        handle
    }

    /// Returns `false` if the handle was not subscribed.
    pub fn unsubscribe(&mut self, handle: TickHandle) -> bool {
        self.active.remove(&handle)
    }

    pub fn is_subscribed(&self, handle: TickHandle) -> bool {
        self.active.contains(&handle)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_unique() {
        let mut scheduler = FrameScheduler::new();
        let a = scheduler.subscribe();
        let b = scheduler.subscribe();
        assert_ne!(a, b);
        assert_eq!(scheduler.len(), 2);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let mut scheduler = FrameScheduler::new();
        let handle = scheduler.subscribe();
        assert!(scheduler.unsubscribe(handle));
        assert!(!scheduler.unsubscribe(handle));
        assert!(!scheduler.is_subscribed(handle));
    }
}
