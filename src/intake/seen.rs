use std::collections::HashSet;

/// Ticket identifiers already handed downstream
pub trait SeenStore: Send {
    fn contains(&self, ticket_id: &str) -> bool;

    /// Record a ticket; `false` if it was already present
    fn insert(&mut self, ticket_id: &str) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-lifetime dedup set; a restart forgets everything
#[derive(Debug, Default)]
pub struct InMemorySeen {
    ids: HashSet<String>,
}

impl SeenStore for InMemorySeen {
    fn contains(&self, ticket_id: &str) -> bool {
        self.ids.contains(ticket_id)
    }

    fn insert(&mut self, ticket_id: &str) -> bool {
        self.ids.insert(ticket_id.to_string())
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    New,
    Duplicate,
}

/// Whether a ticket should be emitted, given what has been seen so far
pub fn admit<S: SeenStore + ?Sized>(seen: &S, ticket_id: &str) -> Admission {
    if seen.contains(ticket_id) {
        Admission::Duplicate
    } else {
        Admission::New
    }
}
