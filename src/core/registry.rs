use pcsc::State;
use std::collections::HashMap;

use crate::core::reader::Watch;

/// Readers added and removed by one reconciliation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

/// Last known state of every attached reader, keyed by reader name
#[derive(Debug)]
pub struct ReaderRegistry {
    readers: HashMap<String, State>,
    topology: State,
}

impl ReaderRegistry {
    pub fn new() -> Self {
        Self {
            readers: HashMap::new(),
            topology: State::UNAWARE,
        }
    }

    /// Bring the registry in line with the current reader list.
    ///
    /// New names are inserted as `UNAWARE` and reported in `added`, in
    /// enumeration order. Names that stay listed keep their state.
    pub fn reconcile(&mut self, current: &[String]) -> Reconciliation {
        let mut result = Reconciliation::default();

        for name in current {
            if !self.readers.contains_key(name) {
                self.readers.insert(name.clone(), State::UNAWARE);
                result.added.push(name.clone());
            }
        }

        self.readers.retain(|name, _| {
            let keep = current.contains(name);
            if !keep {
                result.removed.push(name.clone());
            }
            keep
        });
        result.removed.sort();

        result
    }

    /// Record a new state for a known reader. Returns false, and records
    /// nothing, if the reader isn't registered.
    pub fn update(&mut self, name: &str, state: State) -> bool {
        match self.readers.get_mut(name) {
            Some(current) => {
                *current = state;
                true
            }
            None => false,
        }
    }

    pub fn set_topology_state(&mut self, state: State) {
        self.topology = state;
    }

    /// Every reader with its last known state, followed by the topology entry
    pub fn watchlist(&self) -> Vec<(Watch, State)> {
        let mut list: Vec<(Watch, State)> = self
            .readers
            .iter()
            .map(|(name, state)| (Watch::Reader(name.clone()), *state))
            .collect();
        list.push((Watch::Topology, self.topology));
        list
    }

    pub fn state(&self, name: &str) -> Option<State> {
        self.readers.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.readers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.readers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.readers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }
}

impl Default for ReaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
