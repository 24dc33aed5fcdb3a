//! Optimistic list edits for the screens.
//!
//! A change shows up in the list as soon as it is made and stays pending until
//! the store answers. Committing swaps in the confirmed record; rolling back
//! puts the previous row back where it was.

use std::collections::HashMap;

use crate::models::Keyed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MutationToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    Pending,
    Committed,
    RolledBack,
}

#[derive(Debug, Clone)]
enum Undo<T> {
    Insert { key: String },
    Update { key: String, previous: T },
    Remove { index: usize, previous: T },
}

#[derive(Debug, Clone)]
pub struct OptimisticList<T> {
    items: Vec<T>,
    pending: HashMap<MutationToken, Undo<T>>,
    settled: HashMap<MutationToken, MutationState>,
    next_token: u64,
}

impl<T> Default for OptimisticList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            pending: HashMap::new(),
            settled: HashMap::new(),
            next_token: 0,
        }
    }
}

impl<T: Keyed + Clone> OptimisticList<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Replaces the whole list after a fresh load. Outstanding tokens are
    /// dropped and report as rolled back.
    pub fn reset(&mut self, items: Vec<T>) {
        for token in self.pending.keys().copied().collect::<Vec<_>>() {
            self.settled.insert(token, MutationState::RolledBack);
        }
        self.pending.clear();
        self.items = items;
    }

    pub fn state(&self, token: MutationToken) -> Option<MutationState> {
        if self.pending.contains_key(&token) {
            Some(MutationState::Pending)
        } else {
            self.settled.get(&token).copied()
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    fn issue(&mut self, undo: Undo<T>) -> MutationToken {
        let token = MutationToken(self.next_token);
        self.next_token += 1;
        self.pending.insert(token, undo);
        token
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.items.iter().position(|item| item.key() == key)
    }

    /// Shows `item` at the top of the list.
    pub fn insert(&mut self, item: T) -> MutationToken {
        let key = item.key().to_string();
        self.items.insert(0, item);
        self.issue(Undo::Insert { key })
    }

    /// Replaces the row with the same key. `None` when there is no such row.
    pub fn update(&mut self, item: T) -> Option<MutationToken> {
        let index = self.position(item.key())?;
        let key = item.key().to_string();
        let previous = std::mem::replace(&mut self.items[index], item);
        Some(self.issue(Undo::Update { key, previous }))
    }

    pub fn remove(&mut self, key: &str) -> Option<MutationToken> {
        let index = self.position(key)?;
        let previous = self.items.remove(index);
        Some(self.issue(Undo::Remove { index, previous }))
    }

    /// Confirms a mutation. For inserts and updates `confirmed` replaces the
    /// optimistic row.
    pub fn commit(&mut self, token: MutationToken, confirmed: Option<T>) -> bool {
        let Some(undo) = self.pending.remove(&token) else {
            return false;
        };
        if let Some(confirmed) = confirmed {
            let key = match &undo {
                Undo::Insert { key } | Undo::Update { key, .. } => Some(key.as_str()),
                Undo::Remove { .. } => None,
            };
            if let Some(index) = key.and_then(|key| self.position(key)) {
                self.items[index] = confirmed;
            }
        }
        self.settled.insert(token, MutationState::Committed);
        true
    }

    pub fn rollback(&mut self, token: MutationToken) -> bool {
        let Some(undo) = self.pending.remove(&token) else {
            return false;
        };
        match undo {
            Undo::Insert { key } => {
                if let Some(index) = self.position(&key) {
                    self.items.remove(index);
                }
            }
            Undo::Update { key, previous } => {
                if let Some(index) = self.position(&key) {
                    self.items[index] = previous;
                }
            }
            Undo::Remove { index, previous } => {
                let index = index.min(self.items.len());
                self.items.insert(index, previous);
            }
        }
        self.settled.insert(token, MutationState::RolledBack);
        true
    }

    /// Commits on `Ok`, rolls back on `Err`, and hands the result back.
    pub fn settle<R, E>(&mut self, token: MutationToken, result: Result<R, E>) -> Result<R, E>
    where
        R: Clone + Into<Option<T>>,
    {
        match result {
            Ok(value) => {
                self.commit(token, value.clone().into());
                Ok(value)
            }
            Err(err) => {
                self.rollback(token);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: String,
        label: &'static str,
    }

    impl Keyed for Row {
        fn key(&self) -> &str {
            &self.id
        }
    }

    fn row(id: &str, label: &'static str) -> Row {
        Row { id: id.into(), label }
    }

    fn list() -> OptimisticList<Row> {
        OptimisticList::new(vec![row("a", "A"), row("b", "B"), row("c", "C")])
    }

    #[test]
    fn insert_then_commit_swaps_in_confirmed_row() {
        let mut list = list();
        let token = list.insert(row("tmp-1", "draft"));
        assert_eq!(list.items()[0].label, "draft");
        assert_eq!(list.state(token), Some(MutationState::Pending));

        assert!(list.commit(token, Some(row("d", "D"))));
        assert_eq!(list.items()[0], row("d", "D"));
        assert_eq!(list.len(), 4);
        assert_eq!(list.state(token), Some(MutationState::Committed));
    }

    #[test]
    fn rollback_restores_previous_list() {
        let original = list();
        let mut list = original.clone();

        let inserted = list.insert(row("tmp", "x"));
        let updated = list.update(row("b", "B2")).unwrap();
        let removed = list.remove("c").unwrap();
        assert_eq!(list.len(), 3);

        assert!(list.rollback(removed));
        assert!(list.rollback(updated));
        assert!(list.rollback(inserted));
        assert_eq!(list.items(), original.items());
        assert_eq!(list.state(removed), Some(MutationState::RolledBack));
        assert!(!list.has_pending());
    }

    #[test]
    fn settle_follows_the_result() {
        let mut list = list();
        let token = list.remove("a").unwrap();
        let failed: Result<bool, &str> = Err("offline");
        assert_eq!(list.settle(token, failed.map(|_| None::<Row>)), Err("offline"));
        assert_eq!(list.items()[0].id, "a");

        let token = list.update(row("a", "A2")).unwrap();
        assert!(list.settle::<Row, &str>(token, Ok(row("a", "A3"))).is_ok());
        assert_eq!(list.items()[0].label, "A3");
        assert_eq!(list.state(token), Some(MutationState::Committed));
    }

    #[test]
    fn tokens_settle_once() {
        let mut list = list();
        let token = list.remove("b").unwrap();
        assert!(list.commit(token, None));
        assert!(!list.rollback(token));
        assert_eq!(list.len(), 2);
        assert!(list.update(row("zzz", "?")).is_none());
    }

    #[test]
    fn reset_drops_outstanding_tokens() {
        let mut list = list();
        let token = list.insert(row("tmp", "x"));
        list.reset(vec![row("q", "Q")]);
        assert_eq!(list.state(token), Some(MutationState::RolledBack));
        assert_eq!(list.items(), &[row("q", "Q")]);
    }
}
