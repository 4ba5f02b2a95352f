//! The session store seam and its in-process implementation.
//!
//! A store is a realtime JSON tree shaped like
//! `sessions/<id>/{…session fields, players/<peer>, boss}`. Reads and writes are
//! request/response; change notifications arrive on a [`Subscription`] as raw
//! JSON so the synchronizer decides what to do with malformed payloads.

use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::combatant::PeerId;
use crate::protocol::{self, BossRecord, PeerRecord, PeerState, SessionRecord, SessionState};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store is unreachable")]
    Unavailable,
    #[error("write to {path} was rejected")]
    Rejected { path: String },
    #[error("session {0} does not exist")]
    MissingSession(String),
    #[error("malformed record at {path}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Change notification for one session.
#[derive(Clone, Debug, PartialEq)]
pub enum StoreEvent {
    PeerAdded { id: PeerId, value: Value },
    PeerChanged { id: PeerId, value: Value },
    PeerRemoved { id: PeerId },
    BossChanged { value: Value },
    SessionChanged { value: Value },
}

/// Live feed of [`StoreEvent`]s. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    rx: Mutex<Receiver<StoreEvent>>,
}

impl Subscription {
    pub fn new(rx: Receiver<StoreEvent>) -> Self {
        Self { rx: Mutex::new(rx) }
    }

    /// Everything received since the last drain, in arrival order.
    pub fn drain(&self) -> Vec<StoreEvent> {
        let rx = self.rx.lock().unwrap_or_else(PoisonError::into_inner);
        rx.try_iter().collect()
    }
}

/// Initial session fields written by whoever claims host.
#[derive(Clone, Debug, PartialEq)]
pub struct NewSession {
    pub boss_name: String,
    pub map_type: String,
    pub host_id: PeerId,
}

pub trait SessionStore: Send + Sync {
    /// Server clock, milliseconds since the epoch.
    fn now(&self) -> i64;

    fn read_session(&self, session: &str) -> Result<Option<SessionRecord>, StoreError>;
    fn read_peers(&self, session: &str) -> Result<BTreeMap<PeerId, PeerRecord>, StoreError>;

    /// Overwrite the session record with `playerCount = 1` and server timestamps.
    fn create_session(&self, session: &str, new: &NewSession) -> Result<(), StoreError>;
    fn increment_player_count(&self, session: &str, delta: i64) -> Result<(), StoreError>;
    fn set_host(&self, session: &str, host: &PeerId) -> Result<(), StoreError>;
    fn mark_ended(&self, session: &str) -> Result<(), StoreError>;

    fn clear_peers(&self, session: &str) -> Result<(), StoreError>;
    fn remove_peer(&self, session: &str, peer: &PeerId) -> Result<(), StoreError>;
    /// Create the peer record with an empty state, colour picked by `slot`,
    /// and arm disconnect cleanup:
    /// the record is removed and `playerCount` decremented when the peer's
    /// connection drops.
    fn register_peer(
        &self,
        session: &str,
        peer: &PeerId,
        name: &str,
        slot: usize,
    ) -> Result<(), StoreError>;
    fn write_peer_state(
        &self,
        session: &str,
        peer: &PeerId,
        state: &PeerState,
    ) -> Result<(), StoreError>;
    fn write_boss(&self, session: &str, record: &BossRecord) -> Result<(), StoreError>;

    /// Start receiving change events. Current peers, boss and session are
    /// replayed first.
    fn subscribe(&self, session: &str) -> Result<Subscription, StoreError>;

    /// Drop the peer's connection, running its disconnect cleanup.
    fn disconnect(&self, session: &str, peer: &PeerId);
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

fn wall_clock() -> i64 {
    web_time::SystemTime::now()
        .duration_since(web_time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

#[derive(Default)]
struct SessionNode {
    fields: Option<Map<String, Value>>,
    players: BTreeMap<PeerId, Value>,
    boss: Option<Value>,
    /// Peers with armed disconnect cleanup.
    on_disconnect: Vec<PeerId>,
    watchers: Vec<Sender<StoreEvent>>,
}

impl SessionNode {
    fn broadcast(&mut self, event: StoreEvent) {
        self.watchers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn session_changed(&mut self) {
        if let Some(fields) = &self.fields {
            let value = Value::Object(fields.clone());
            self.broadcast(StoreEvent::SessionChanged { value });
        }
    }

    fn remove_player(&mut self, peer: &PeerId) {
        if self.players.remove(peer).is_some() {
            self.broadcast(StoreEvent::PeerRemoved { id: peer.clone() });
        }
    }
}

#[derive(Default)]
struct Inner {
    offline: bool,
    sessions: BTreeMap<String, SessionNode>,
}

/// Realtime-database stand-in living in this process. Clones share state, so
/// several simulated participants can join the same store.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    clock: Clock,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(wall_clock)
    }

    pub fn with_clock(clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            clock: Arc::new(clock),
        }
    }

    /// Simulate losing or regaining the connection.
    pub fn set_online(&self, online: bool) {
        self.lock().offline = !online;
    }

    /// Write a raw peer value, bypassing typed records.
    pub fn put_raw_peer(&self, session: &str, peer: &PeerId, value: Value) {
        let mut inner = self.lock();
        let node = inner.sessions.entry(session.to_string()).or_default();
        let existed = node.players.insert(peer.clone(), value.clone()).is_some();
        let id = peer.clone();
        node.broadcast(if existed {
            StoreEvent::PeerChanged { id, value }
        } else {
            StoreEvent::PeerAdded { id, value }
        });
    }

    /// Raw session fields, for inspection.
    pub fn session_value(&self, session: &str) -> Option<Value> {
        let inner = self.lock();
        let fields = inner.sessions.get(session)?.fields.clone()?;
        Some(Value::Object(fields))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the session node if the store is reachable.
    fn with_node<T>(
        &self,
        session: &str,
        f: impl FnOnce(&mut SessionNode) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut inner = self.lock();
        if inner.offline {
            return Err(StoreError::Unavailable);
        }
        f(inner.sessions.entry(session.to_string()).or_default())
    }
}

fn encode<T: Serialize>(path: &str, value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|_| StoreError::Rejected { path: path.to_string() })
}

fn decode<T: DeserializeOwned>(path: &str, value: Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|source| StoreError::Decode {
        path: path.to_string(),
        source,
    })
}

impl SessionStore for MemoryStore {
    fn now(&self) -> i64 {
        (self.clock)()
    }

    fn read_session(&self, session: &str) -> Result<Option<SessionRecord>, StoreError> {
        self.with_node(session, |node| match &node.fields {
            Some(fields) => decode(session, Value::Object(fields.clone())).map(Some),
            None => Ok(None),
        })
    }

    fn read_peers(&self, session: &str) -> Result<BTreeMap<PeerId, PeerRecord>, StoreError> {
        self.with_node(session, |node| {
            let peers = node
                .players
                .iter()
                .filter_map(|(id, value)| {
                    let path = format!("{session}/players/{id}");
                    match decode::<PeerRecord>(&path, value.clone()) {
                        Ok(record) => Some((id.clone(), record)),
                        Err(e) => {
                            // unreadable records count as gone, like crash orphans
                            tracing::warn!("Skipping peer record: {e}");
                            None
                        }
                    }
                })
                .collect();
            Ok(peers)
        })
    }

    fn create_session(&self, session: &str, new: &NewSession) -> Result<(), StoreError> {
        let now = self.now();
        self.with_node(session, |node| {
            let record = SessionRecord {
                boss_name: new.boss_name.clone(),
                map_type: new.map_type.clone(),
                state: SessionState::Playing,
                created_at: now,
                host_id: new.host_id.to_string(),
                player_count: 1,
            };
            match encode(session, &record)? {
                Value::Object(fields) => node.fields = Some(fields),
                _ => return Err(StoreError::Rejected { path: session.to_string() }),
            }
            node.session_changed();
            Ok(())
        })
    }

    fn increment_player_count(&self, session: &str, delta: i64) -> Result<(), StoreError> {
        self.with_node(session, |node| {
            let fields = node
                .fields
                .as_mut()
                .ok_or_else(|| StoreError::MissingSession(session.to_string()))?;
            let count = fields.get("playerCount").and_then(Value::as_i64).unwrap_or(0);
            fields.insert("playerCount".into(), json!(count + delta));
            node.session_changed();
            Ok(())
        })
    }

    fn set_host(&self, session: &str, host: &PeerId) -> Result<(), StoreError> {
        self.with_node(session, |node| {
            let fields = node
                .fields
                .as_mut()
                .ok_or_else(|| StoreError::MissingSession(session.to_string()))?;
            fields.insert("hostId".into(), json!(host.as_str()));
            node.session_changed();
            Ok(())
        })
    }

    fn mark_ended(&self, session: &str) -> Result<(), StoreError> {
        self.with_node(session, |node| {
            let fields = node
                .fields
                .as_mut()
                .ok_or_else(|| StoreError::MissingSession(session.to_string()))?;
            fields.insert("state".into(), json!("ENDED"));
            node.session_changed();
            Ok(())
        })
    }

    fn clear_peers(&self, session: &str) -> Result<(), StoreError> {
        self.with_node(session, |node| {
            let ids: Vec<PeerId> = node.players.keys().cloned().collect();
            for id in &ids {
                node.remove_player(id);
            }
            node.on_disconnect.clear();
            Ok(())
        })
    }

    fn remove_peer(&self, session: &str, peer: &PeerId) -> Result<(), StoreError> {
        self.with_node(session, |node| {
            node.remove_player(peer);
            Ok(())
        })
    }

    fn register_peer(
        &self,
        session: &str,
        peer: &PeerId,
        name: &str,
        slot: usize,
    ) -> Result<(), StoreError> {
        let record = PeerRecord {
            name: name.to_string(),
            color: protocol::color_for(slot),
            joined_at: self.now(),
            slot,
            state: PeerState::default(),
        };
        let path = format!("{session}/players/{peer}");
        let value = encode(&path, &record)?;
        self.with_node(session, |node| {
            let existed = node.players.insert(peer.clone(), value.clone()).is_some();
            let id = peer.clone();
            node.broadcast(if existed {
                StoreEvent::PeerChanged { id, value }
            } else {
                StoreEvent::PeerAdded { id, value }
            });
            if !node.on_disconnect.contains(peer) {
                node.on_disconnect.push(peer.clone());
            }
            Ok(())
        })
    }

    fn write_peer_state(
        &self,
        session: &str,
        peer: &PeerId,
        state: &PeerState,
    ) -> Result<(), StoreError> {
        let path = format!("{session}/players/{peer}/state");
        let state = encode(&path, state)?;
        self.with_node(session, |node| {
            // writing under a removed record recreates nothing
            let Some(Value::Object(record)) = node.players.get_mut(peer) else {
                return Err(StoreError::Rejected { path });
            };
            record.insert("state".into(), state);
            let value = Value::Object(record.clone());
            node.broadcast(StoreEvent::PeerChanged { id: peer.clone(), value });
            Ok(())
        })
    }

    fn write_boss(&self, session: &str, record: &BossRecord) -> Result<(), StoreError> {
        let value = encode(&format!("{session}/boss"), record)?;
        self.with_node(session, |node| {
            node.boss = Some(value.clone());
            node.broadcast(StoreEvent::BossChanged { value });
            Ok(())
        })
    }

    fn subscribe(&self, session: &str) -> Result<Subscription, StoreError> {
        self.with_node(session, |node| {
            let (tx, rx) = mpsc::channel();
            for (id, value) in &node.players {
                let _ = tx.send(StoreEvent::PeerAdded { id: id.clone(), value: value.clone() });
            }
            if let Some(value) = &node.boss {
                let _ = tx.send(StoreEvent::BossChanged { value: value.clone() });
            }
            if let Some(fields) = &node.fields {
                let _ = tx.send(StoreEvent::SessionChanged { value: Value::Object(fields.clone()) });
            }
            node.watchers.push(tx);
            Ok(Subscription::new(rx))
        })
    }

    fn disconnect(&self, session: &str, peer: &PeerId) {
        let mut inner = self.lock();
        let Some(node) = inner.sessions.get_mut(session) else {
            return;
        };
        let Some(idx) = node.on_disconnect.iter().position(|p| p == peer) else {
            return;
        };
        node.on_disconnect.remove(idx);
        node.remove_player(peer);
        if let Some(fields) = node.fields.as_mut() {
            let count = fields.get("playerCount").and_then(Value::as_i64).unwrap_or(0);
            fields.insert("playerCount".into(), json!(count - 1));
            node.session_changed();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    fn store_at(time: &Arc<AtomicI64>) -> MemoryStore {
        let time = Arc::clone(time);
        MemoryStore::with_clock(move || time.load(Ordering::SeqCst))
    }

    fn new_session(host: &str) -> NewSession {
        NewSession {
            boss_name: "Gael".into(),
            map_type: "arena".into(),
            host_id: PeerId::from(host),
        }
    }

    #[test]
    fn create_then_read_session() -> Result<(), StoreError> {
        let time = Arc::new(AtomicI64::new(1_000));
        let store = store_at(&time);
        assert_eq!(store.read_session("gael")?, None);
        store.create_session("gael", &new_session("p_a"))?;
        let record = store.read_session("gael")?.ok_or(StoreError::Unavailable)?;
        assert_eq!(record.host_id, "p_a");
        assert_eq!(record.player_count, 1);
        assert_eq!(record.created_at, 1_000);
        assert_eq!(record.state, SessionState::Playing);
        Ok(())
    }

    #[test]
    fn offline_store_refuses_everything() {
        let store = MemoryStore::new();
        store.set_online(false);
        assert!(matches!(store.read_session("x"), Err(StoreError::Unavailable)));
        assert!(matches!(store.subscribe("x"), Err(StoreError::Unavailable)));
    }

    #[test]
    fn subscription_replays_then_streams() -> Result<(), StoreError> {
        let store = MemoryStore::with_clock(|| 5);
        store.create_session("s", &new_session("p_a"))?;
        store.register_peer("s", &PeerId::from("p_a"), "Wolf", 0)?;

        let sub = store.subscribe("s")?;
        let replay = sub.drain();
        assert!(matches!(&replay[0], StoreEvent::PeerAdded { id, .. } if id.as_str() == "p_a"));
        assert!(matches!(replay.last(), Some(StoreEvent::SessionChanged { .. })));

        store.register_peer("s", &PeerId::from("p_b"), "Owl", 1)?;
        store.write_peer_state("s", &PeerId::from("p_b"), &PeerState::default())?;
        let live = sub.drain();
        assert!(matches!(&live[0], StoreEvent::PeerAdded { id, .. } if id.as_str() == "p_b"));
        assert!(matches!(&live[1], StoreEvent::PeerChanged { id, .. } if id.as_str() == "p_b"));
        Ok(())
    }

    #[test]
    fn disconnect_runs_cleanup_once() -> Result<(), StoreError> {
        let store = MemoryStore::with_clock(|| 5);
        store.create_session("s", &new_session("p_a"))?;
        store.increment_player_count("s", 1)?;
        store.register_peer("s", &PeerId::from("p_a"), "Wolf", 0)?;

        store.disconnect("s", &PeerId::from("p_a"));
        store.disconnect("s", &PeerId::from("p_a"));
        assert!(store.read_peers("s")?.is_empty());
        let record = store.read_session("s")?.ok_or(StoreError::Unavailable)?;
        assert_eq!(record.player_count, 1);
        Ok(())
    }

    #[test]
    fn state_write_needs_a_record() {
        let store = MemoryStore::with_clock(|| 5);
        let result = store.write_peer_state("s", &PeerId::from("ghost"), &PeerState::default());
        assert!(matches!(result, Err(StoreError::Rejected { .. })));
    }

    #[test]
    fn malformed_peer_is_skipped_on_read() -> Result<(), StoreError> {
        let store = MemoryStore::with_clock(|| 5);
        store.put_raw_peer("s", &PeerId::from("p_x"), json!({"name": 7}));
        store.register_peer("s", &PeerId::from("p_a"), "Wolf", 0)?;
        let peers = store.read_peers("s")?;
        assert_eq!(peers.len(), 1);
        assert!(peers.contains_key(&PeerId::from("p_a")));
        Ok(())
    }

    #[test]
    fn registration_records_slot_and_colour() -> Result<(), StoreError> {
        let store = MemoryStore::with_clock(|| 5);
        store.register_peer("s", &PeerId::from("p_b"), "Owl", 2)?;
        let peers = store.read_peers("s")?;
        let record = peers.get(&PeerId::from("p_b")).ok_or(StoreError::Unavailable)?;
        assert_eq!(record.slot, 2);
        assert_eq!(record.color, protocol::color_for(2));
        Ok(())
    }

    #[test]
    fn dropped_subscription_is_pruned() -> Result<(), StoreError> {
        let store = MemoryStore::with_clock(|| 5);
        let sub = store.subscribe("s")?;
        drop(sub);
        store.put_raw_peer("s", &PeerId::from("p_x"), json!({}));
        let inner = store.lock();
        assert!(inner.sessions.get("s").is_some_and(|n| n.watchers.is_empty()));
        Ok(())
    }
}
