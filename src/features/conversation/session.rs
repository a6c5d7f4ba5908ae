use std::sync::Arc;

use dashmap::DashMap;

use super::{EventFlow, ReminderFlow, TaskFlow};

/// The flow a user is currently in the middle of
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Task(TaskFlow),
    Reminder(ReminderFlow),
    Event(EventFlow),
    /// Admin is composing a broadcast message
    Broadcast,
}

impl Session {
    pub fn name(&self) -> &'static str {
        match self {
            Session::Task(_) => "task",
            Session::Reminder(_) => "reminder",
            Session::Event(_) => "event",
            Session::Broadcast => "broadcast",
        }
    }
}

/// In-memory per-user conversation state, keyed by external user id.
///
/// At most one session per user. Starting a new one replaces the old.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<DashMap<u64, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session, returning whatever it replaced
    pub fn begin(&self, user: u64, session: Session) -> Option<Session> {
        self.sessions.insert(user, session)
    }

    /// Remove the session so it can be advanced by value
    pub fn take(&self, user: u64) -> Option<Session> {
        self.sessions.remove(&user).map(|(_, session)| session)
    }

    pub fn put(&self, user: u64, session: Session) {
        self.sessions.insert(user, session);
    }

    pub fn cancel(&self, user: u64) -> bool {
        self.sessions.remove(&user).is_some()
    }

    pub fn contains(&self, user: u64) -> bool {
        self.sessions.contains_key(&user)
    }

    pub fn get(&self, user: u64) -> Option<Session> {
        self.sessions.get(&user).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_session_per_user() {
        let store = SessionStore::new();
        assert!(store.begin(7, Session::Task(TaskFlow::Title)).is_none());
        let replaced = store.begin(7, Session::Broadcast);
        assert_eq!(replaced, Some(Session::Task(TaskFlow::Title)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(7), Some(Session::Broadcast));
    }

    #[test]
    fn test_take_then_put_back() {
        let store = SessionStore::new();
        store.begin(1, Session::Reminder(ReminderFlow::Title));

        let taken = store.take(1).unwrap();
        assert!(!store.contains(1));
        store.put(1, taken);
        assert!(store.contains(1));

        assert!(store.cancel(1));
        assert!(!store.cancel(1));
        assert!(store.is_empty());
    }

    #[test]
    fn test_clones_share_state() {
        let store = SessionStore::new();
        let other = store.clone();
        store.begin(3, Session::Event(EventFlow::Title));
        assert_eq!(other.get(3).map(|s| s.name()), Some("event"));
    }
}
