//! Batch teardown bookkeeping for image and sequence overlays.
//!
//! The registry does not own overlays. It remembers which ones are live so
//! they can all be faded out together, and it joins their individual
//! completions into a single "everything is gone" notification.

use std::collections::HashSet;

use crate::engine::OverlayId;

/// Outcome of [`OverlayRegistry::begin_remove_all`].
#[derive(Debug)]
pub enum RemoveAll<C> {
    /// Nothing was tracked: the completion is handed straight back.
    Complete(C),
    /// These overlays must be faded out and then [settled](OverlayRegistry::settle).
    Pending(Vec<OverlayId>),
}

#[derive(Debug)]
struct Barrier<C> {
    pending: HashSet<OverlayId>,
    on_complete: C,
}

/// Non-owning tracking set of live overlays with removal barriers.
#[derive(Debug)]
pub struct OverlayRegistry<C> {
    tracked: Vec<OverlayId>,
    barriers: Vec<Barrier<C>>,
}

impl<C> Default for OverlayRegistry<C> {
    fn default() -> Self {
        Self {
            tracked: Vec::new(),
            barriers: Vec::new(),
        }
    }
}

impl<C> OverlayRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking an overlay. Returns `false` if it already was.
    pub fn add(&mut self, id: OverlayId) -> bool {
        if self.tracked.contains(&id) {
            return false;
        }
        self.tracked.push(id);
        true
    }

    /// Stop tracking an overlay that is being removed on its own.
    pub fn untrack(&mut self, id: OverlayId) -> bool {
        let before = self.tracked.len();
        self.tracked.retain(|t| *t != id);
        self.tracked.len() != before
    }

    pub fn contains(&self, id: OverlayId) -> bool {
        self.tracked.contains(&id)
    }

    /// Tracked overlays in insertion order.
    pub fn tracked(&self) -> &[OverlayId] {
        &self.tracked
    }

    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    /// Number of batch removals still waiting on fades.
    pub fn in_flight(&self) -> usize {
        self.barriers.len()
    }

    /// Take every tracked overlay for removal and arm a barrier over them.
    ///
    /// The barrier covers exactly the overlays tracked at this call. Overlays
    /// added afterwards are tracked normally and left for a later batch.
    pub fn begin_remove_all(&mut self, on_complete: C) -> RemoveAll<C> {
        if self.tracked.is_empty() {
            return RemoveAll::Complete(on_complete);
        }

        let ids = std::mem::take(&mut self.tracked);
        self.barriers.push(Barrier {
            pending: ids.iter().copied().collect(),
            on_complete,
        });
        RemoveAll::Pending(ids)
    }

    /// Record that `id` has been fully removed. Returns the completions of
    /// every barrier this was the last outstanding overlay for.
    pub fn settle(&mut self, id: OverlayId) -> Vec<C> {
        self.untrack(id);

        let mut done = Vec::new();
        let mut i = 0;
        while i < self.barriers.len() {
            let barrier = &mut self.barriers[i];
            if barrier.pending.remove(&id) && barrier.pending.is_empty() {
                done.push(self.barriers.remove(i).on_complete);
            } else {
                i += 1;
            }
        }
        done
    }

    /// Forget everything, returning outstanding barrier completions.
    pub fn clear(&mut self) -> Vec<C> {
        self.tracked.clear();
        self.barriers.drain(..).map(|b| b.on_complete).collect()
    }
}
