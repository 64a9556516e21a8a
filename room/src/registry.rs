use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::player::Connection;
use crate::types::ParticipantId;

/// Participant -> live connection, shared by every room.
///
/// Closing a connection only drops its queue sender, so the lock is never
/// held across I/O.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<HashMap<ParticipantId, Arc<Connection>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Newest connection wins; a replaced one is closed.
    pub fn register(&self, conn: Arc<Connection>) {
        let replaced = self.inner.write().insert(conn.participant(), conn.clone());
        if let Some(old) = replaced {
            if !Arc::ptr_eq(&old, &conn) {
                old.close();
            }
        }
    }

    pub fn unregister(&self, participant: &ParticipantId) -> Option<Arc<Connection>> {
        let removed = self.inner.write().remove(participant);
        if let Some(conn) = &removed {
            conn.close();
        }
        removed
    }

    /// Removes the entry only while it still points at connection `conn_id`,
    /// so a stale hangup cannot evict a reconnect.
    pub fn unregister_conn(&self, participant: &ParticipantId, conn_id: u64) -> bool {
        let removed = {
            let mut map = self.inner.write();
            match map.get(participant) {
                Some(conn) if conn.id() == conn_id => map.remove(participant),
                _ => None,
            }
        };
        match removed {
            Some(conn) => {
                conn.close();
                true
            }
            None => false,
        }
    }

    pub fn lookup(&self, participant: &ParticipantId) -> Option<Arc<Connection>> {
        self.inner.read().get(participant).cloned()
    }

    pub fn is_connected(&self, participant: &ParticipantId) -> bool {
        self.inner.read().contains_key(participant)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn register_and_lookup() {
        let registry = ConnectionRegistry::new();
        let id = Uuid::new_v4();
        let (conn, _rx) = Connection::detached(id, 4);
        registry.register(conn.clone());
        assert!(registry.is_connected(&id));
        assert!(Arc::ptr_eq(&registry.lookup(&id).unwrap(), &conn));
        assert!(registry.lookup(&Uuid::new_v4()).is_none());
    }

    #[test]
    fn reconnect_replaces_and_closes_old() {
        let registry = ConnectionRegistry::new();
        let id = Uuid::new_v4();
        let (old, _old_rx) = Connection::detached(id, 4);
        let (new, _new_rx) = Connection::detached(id, 4);
        registry.register(old.clone());
        registry.register(new.clone());
        assert!(old.is_closed());
        assert!(!new.is_closed());
        assert_eq!(registry.len(), 1);

        // the old socket hanging up afterwards must not evict the new one
        assert!(!registry.unregister_conn(&id, old.id()));
        assert!(registry.is_connected(&id));
        assert!(registry.unregister_conn(&id, new.id()));
        assert!(registry.is_empty());
        assert!(new.is_closed());
    }

    #[test]
    fn unregister_closes() {
        let registry = ConnectionRegistry::new();
        let id = Uuid::new_v4();
        let (conn, _rx) = Connection::detached(id, 4);
        registry.register(conn.clone());
        assert!(registry.unregister(&id).is_some());
        assert!(conn.is_closed());
        assert!(registry.unregister(&id).is_none());
    }
}
