//! Generation tickets that keep stale fetch results out of the current view.
//!
//! Each selection of a viewed entity (a teacher, a class, a student) bumps a
//! generation counter. A fetch started under an older generation is dropped
//! when it settles instead of being rendered under the new selection.

/// Proof of which selection a fetch was started for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewTicket<K> {
    generation: u64,
    key: K,
}

impl<K> ViewTicket<K> {
    /// The selection this ticket was issued for
    pub const fn key(&self) -> &K {
        &self.key
    }

    /// Generation number of the selection
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

/// Whether a fetched result was applied to the view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The result belonged to the current selection and is now displayed
    Applied,
    /// The selection changed while the fetch was in flight; the result was dropped
    Discarded,
}

/// Tracks the current selection of one view
#[derive(Debug, Clone)]
pub struct ViewTracker<K> {
    generation: u64,
    current: Option<K>,
}

impl<K> Default for ViewTracker<K> {
    fn default() -> Self {
        Self {
            generation: 0,
            current: None,
        }
    }
}

impl<K: Clone> ViewTracker<K> {
    /// Select a new entity and get the ticket its fetch must carry
    pub fn select(&mut self, key: K) -> ViewTicket<K> {
        self.generation += 1;
        self.current = Some(key.clone());
        ViewTicket {
            generation: self.generation,
            key,
        }
    }

    /// Clear the selection; every outstanding ticket becomes stale
    pub fn clear(&mut self) {
        self.generation += 1;
        self.current = None;
    }

    /// Ticket for re-fetching the current selection, if any
    #[must_use]
    pub fn current_ticket(&self) -> Option<ViewTicket<K>> {
        self.current.as_ref().map(|key| ViewTicket {
            generation: self.generation,
            key: key.clone(),
        })
    }

    /// The selected entity
    pub const fn current(&self) -> Option<&K> {
        self.current.as_ref()
    }

    /// True if the ticket was issued for the current selection
    #[must_use]
    pub const fn is_current(&self, ticket: &ViewTicket<K>) -> bool {
        self.current.is_some() && ticket.generation == self.generation
    }
}
