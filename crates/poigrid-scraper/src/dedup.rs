use std::collections::HashSet;
use std::sync::Mutex;

/// Run-scoped set of entity identifiers already admitted.
///
/// The first sighting of an identifier wins; every later sighting, whatever
/// tile or keyword produced it, is dropped.
#[derive(Debug, Default)]
pub struct SeenSet {
    ids: Mutex<HashSet<String>>,
}

impl SeenSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` exactly once per identifier.
    pub fn admit(&self, entity_id: &str) -> bool {
        let mut ids = match self.ids.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if ids.contains(entity_id) {
            return false;
        }
        ids.insert(entity_id.to_owned())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self.ids.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
