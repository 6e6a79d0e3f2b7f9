use std::collections::HashMap;

/// Allocates and looks up the numeric ids config entries and scripts
/// compile down to. Hosts back this with their project database; it must be
/// internally synchronized if shared across batches.
pub trait IdProvider {
    /// Deterministic allocation: the same `(group, name)` always yields the
    /// same id within one provider.
    fn find_or_create_config(&mut self, group: &str, name: &str) -> i32;

    /// Lookup only; `None` when the name was never allocated.
    fn find_config(&self, group: &str, name: &str) -> Option<i32>;
}

/// In-memory provider handing out sequential ids per group. Suitable for
/// tests and one-shot command-line builds.
#[derive(Debug, Clone, Default)]
pub struct MemoryIdProvider {
    ids: HashMap<(String, String), i32>,
    next: HashMap<String, i32>,
}

impl MemoryIdProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-assigns an id, keeping later allocations above it.
    pub fn seed(&mut self, group: &str, name: &str, id: i32) {
        self.ids.insert((group.to_owned(), name.to_owned()), id);
        let next = self.next.entry(group.to_owned()).or_insert(0);
        *next = (*next).max(id + 1);
    }
}

impl IdProvider for MemoryIdProvider {
    fn find_or_create_config(&mut self, group: &str, name: &str) -> i32 {
        if let Some(id) = self.ids.get(&(group.to_owned(), name.to_owned())) {
            return *id;
        }
        let next = self.next.entry(group.to_owned()).or_insert(0);
        let id = *next;
        *next += 1;
        self.ids.insert((group.to_owned(), name.to_owned()), id);
        id
    }

    fn find_config(&self, group: &str, name: &str) -> Option<i32> {
        self.ids.get(&(group.to_owned(), name.to_owned())).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_is_deterministic() {
        let mut provider = MemoryIdProvider::new();
        let a = provider.find_or_create_config("obj", "a");
        let b = provider.find_or_create_config("obj", "b");
        assert_eq!(a, provider.find_or_create_config("obj", "a"));
        assert_ne!(a, b);
        assert_eq!(provider.find_config("obj", "b"), Some(b));
        assert_eq!(provider.find_config("obj", "missing"), None);
    }

    #[test]
    fn groups_are_independent() {
        let mut provider = MemoryIdProvider::new();
        assert_eq!(provider.find_or_create_config("obj", "a"), 0);
        assert_eq!(provider.find_or_create_config("varp", "a"), 0);
    }

    #[test]
    fn seeding_reserves_the_range() {
        let mut provider = MemoryIdProvider::new();
        provider.seed("obj", "engine_item", 500);
        assert_eq!(provider.find_or_create_config("obj", "fresh"), 501);
        assert_eq!(provider.find_config("obj", "engine_item"), Some(500));
    }
}
