//! Host election and record replication for one named session.
//!
//! Joining is a short chain of store round trips: read, elect, purge stale
//! peers, claim or follow, register, subscribe. After that the synchronizer is
//! polled once per frame: [`SessionSync::drain`] turns store notifications into
//! [`SyncEvent`]s and the `publish_*` calls are fire-and-forget.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::combatant::PeerId;
use crate::protocol::{self, BossRecord, PeerRecord, PeerState, SessionRecord, SessionState};
use crate::store::{NewSession, SessionStore, StoreError, StoreEvent, Subscription};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds between state publications.
    pub sync_interval: f32,
    /// A peer record older than this with no published state is an orphan.
    pub stale_after_secs: f32,
    /// Exponential smoothing rate for replicated transforms, per second.
    pub interpolation_speed: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sync_interval: 0.05,
            stale_after_secs: 30.0,
            interpolation_speed: 12.0,
        }
    }
}

impl SessionConfig {
    fn stale_after_ms(&self) -> i64 {
        (self.stale_after_secs * 1000.0) as i64
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("undecodable session payload")]
    Decode(#[from] serde_json::Error),
    #[error("session {0} disappeared while joining")]
    Vanished(String),
}

/// Who is joining and what they want to fight.
#[derive(Clone, Debug, PartialEq)]
pub struct JoinRequest {
    pub peer_id: PeerId,
    pub player_name: String,
    pub boss_name: String,
    pub map_type: String,
}

// ============================================================================
// ELECTION
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostReason {
    NoSession,
    SessionEnded,
    NoLivePeers,
    HostMissing,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Election {
    Host(HostReason),
    Follower { host: PeerId },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElectionView {
    pub decision: Election,
    /// Orphaned records to purge before claiming anything.
    pub stale: Vec<PeerId>,
}

/// A record that never published state and is older than the threshold was
/// left behind by a crashed client.
pub fn is_stale(record: &PeerRecord, now: i64, stale_after_ms: i64) -> bool {
    now - record.joined_at > stale_after_ms && !record.state.is_populated()
}

/// Decide host or follower from what the store currently holds.
pub fn elect(
    session: Option<&SessionRecord>,
    peers: &BTreeMap<PeerId, PeerRecord>,
    now: i64,
    stale_after_ms: i64,
) -> ElectionView {
    let stale: Vec<PeerId> = peers
        .iter()
        .filter(|(_, record)| is_stale(record, now, stale_after_ms))
        .map(|(id, _)| id.clone())
        .collect();
    let live = |id: &PeerId| peers.contains_key(id) && !stale.contains(id);
    let live_count = peers.len() - stale.len();

    let decision = match session {
        None => Election::Host(HostReason::NoSession),
        Some(s) if s.state == SessionState::Ended => Election::Host(HostReason::SessionEnded),
        Some(_) if live_count == 0 => Election::Host(HostReason::NoLivePeers),
        Some(s) if !live(&PeerId::from(s.host_id.as_str())) => {
            Election::Host(HostReason::HostMissing)
        }
        Some(s) => Election::Follower { host: PeerId::from(s.host_id.as_str()) },
    };
    ElectionView { decision, stale }
}

/// Earliest-joined participant, ties broken by id. Every participant computes
/// the same answer from the same peer set.
pub fn successor<'a>(candidates: impl IntoIterator<Item = (&'a PeerId, i64)>) -> Option<PeerId> {
    candidates
        .into_iter()
        .min_by(|(a_id, a_at), (b_id, b_at)| a_at.cmp(b_at).then_with(|| a_id.cmp(b_id)))
        .map(|(id, _)| id.clone())
}

// ============================================================================
// SYNCHRONIZER
// ============================================================================

/// What changed in the session since the last drain.
#[derive(Clone, Debug, PartialEq)]
pub enum SyncEvent {
    PeerJoined { id: PeerId, record: PeerRecord },
    PeerUpdated { id: PeerId, state: PeerState },
    PeerLeft { id: PeerId },
    /// Canonical boss state from the host. Never delivered to the host itself.
    BossSnapshot(BossRecord),
    /// The previous host left and this participant took over.
    BecameHost,
    HostChanged { host: PeerId },
    SessionEnded,
}

pub struct SessionSync {
    store: Arc<dyn SessionStore>,
    session_id: String,
    local_id: PeerId,
    joined_at: i64,
    /// Live peers found at join, which picks colour and spawn point.
    slot: usize,
    host_id: PeerId,
    record: SessionRecord,
    /// Remote participants, local excluded.
    peers: BTreeMap<PeerId, PeerRecord>,
    subscription: Subscription,
    config: SessionConfig,
    since_sync: f32,
}

impl std::fmt::Debug for SessionSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSync")
            .field("session_id", &self.session_id)
            .field("local_id", &self.local_id)
            .field("host_id", &self.host_id)
            .field("peers", &self.peers.len())
            .finish_non_exhaustive()
    }
}

impl SessionSync {
    pub fn join(
        store: Arc<dyn SessionStore>,
        request: JoinRequest,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let session_id = protocol::session_id(&request.boss_name);
        let existing = store.read_session(&session_id)?;
        let peers = store.read_peers(&session_id)?;
        let now = store.now();

        let view = elect(existing.as_ref(), &peers, now, config.stale_after_ms());
        for id in &view.stale {
            info!(peer = %id, session = %session_id, "purging stale peer");
            store.remove_peer(&session_id, id)?;
        }

        let live_peers = match &view.decision {
            Election::Host(reason) => {
                info!(session = %session_id, ?reason, "claiming host");
                store.clear_peers(&session_id)?;
                store.create_session(
                    &session_id,
                    &NewSession {
                        boss_name: request.boss_name.clone(),
                        map_type: request.map_type.clone(),
                        host_id: request.peer_id.clone(),
                    },
                )?;
                0
            }
            Election::Follower { host } => {
                info!(session = %session_id, %host, "joining as follower");
                store.increment_player_count(&session_id, 1)?;
                peers.len() - view.stale.len()
            }
        };

        store.register_peer(&session_id, &request.peer_id, &request.player_name, live_peers)?;
        let subscription = store.subscribe(&session_id)?;
        let record = store
            .read_session(&session_id)?
            .ok_or_else(|| SessionError::Vanished(session_id.clone()))?;

        Ok(Self {
            host_id: PeerId::from(record.host_id.as_str()),
            joined_at: store.now(),
            slot: live_peers,
            store,
            session_id,
            local_id: request.peer_id,
            record,
            peers: BTreeMap::new(),
            subscription,
            config,
            since_sync: 0.0,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn local_id(&self) -> &PeerId {
        &self.local_id
    }

    pub fn host_id(&self) -> &PeerId {
        &self.host_id
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn is_host(&self) -> bool {
        self.host_id == self.local_id
    }

    /// Session fields as last seen. Followers take boss name and map from here.
    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    pub fn peers(&self) -> &BTreeMap<PeerId, PeerRecord> {
        &self.peers
    }

    /// Local participant included.
    pub fn player_count(&self) -> usize {
        self.peers.len() + 1
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Advance the publication clock; true when a publication is due.
    pub fn due(&mut self, dt: f32) -> bool {
        self.since_sync += dt;
        if self.since_sync >= self.config.sync_interval {
            self.since_sync = 0.0;
            true
        } else {
            false
        }
    }

    pub fn publish_peer(&self, state: &PeerState) {
        if let Err(e) = self.store.write_peer_state(&self.session_id, &self.local_id, state) {
            warn!("Failed to publish peer state: {e:?}");
        }
    }

    pub fn publish_boss(&self, record: &BossRecord) {
        if !self.is_host() {
            return;
        }
        if let Err(e) = self.store.write_boss(&self.session_id, record) {
            warn!("Failed to publish boss state: {e:?}");
        }
    }

    /// Host only: publish the final boss state, then mark the session
    /// finished so followers settle on the same result.
    pub fn end_match(&self, last_boss: Option<&BossRecord>) {
        if !self.is_host() {
            return;
        }
        if let Some(record) = last_boss {
            self.publish_boss(record);
        }
        info!(session = %self.session_id, "match ended");
        if let Err(e) = self.store.mark_ended(&self.session_id) {
            warn!("Failed to mark session ended: {e:?}");
        }
    }

    /// Best-effort teardown: drops the subscription and the local peer record.
    pub fn leave(self) {
        info!(session = %self.session_id, peer = %self.local_id, "leaving session");
        self.store.disconnect(&self.session_id, &self.local_id);
    }

    pub fn drain(&mut self) -> Vec<SyncEvent> {
        let mut out = Vec::new();
        for event in self.subscription.drain() {
            match event {
                StoreEvent::PeerAdded { id, value } | StoreEvent::PeerChanged { id, value } => {
                    self.on_peer(id, value, &mut out);
                }
                StoreEvent::PeerRemoved { id } => self.on_peer_removed(id, &mut out),
                StoreEvent::BossChanged { value } => {
                    if self.is_host() {
                        continue;
                    }
                    match decode::<BossRecord>(value) {
                        Ok(record) => out.push(SyncEvent::BossSnapshot(record)),
                        Err(e) => warn!("Dropping boss snapshot: {e:?}"),
                    }
                }
                StoreEvent::SessionChanged { value } => self.on_session(value, &mut out),
            }
        }
        out
    }

    fn on_peer(&mut self, id: PeerId, value: Value, out: &mut Vec<SyncEvent>) {
        let record = match decode::<PeerRecord>(value) {
            Ok(record) => record,
            Err(e) => {
                warn!(peer = %id, "Dropping peer update: {e:?}");
                return;
            }
        };
        if id == self.local_id {
            self.joined_at = record.joined_at;
            return;
        }
        if let Some(known) = self.peers.get_mut(&id) {
            let state = record.state.clone();
            *known = record;
            out.push(SyncEvent::PeerUpdated { id, state });
        } else {
            info!(peer = %id, name = %record.name, "peer joined");
            self.peers.insert(id.clone(), record.clone());
            out.push(SyncEvent::PeerJoined { id, record });
        }
    }

    fn on_peer_removed(&mut self, id: PeerId, out: &mut Vec<SyncEvent>) {
        if id == self.local_id || self.peers.remove(&id).is_none() {
            return;
        }
        info!(peer = %id, "peer left");
        out.push(SyncEvent::PeerLeft { id: id.clone() });

        if id != self.host_id {
            return;
        }
        let candidates = self
            .peers
            .iter()
            .map(|(id, record)| (id, record.joined_at))
            .chain(std::iter::once((&self.local_id, self.joined_at)));
        let Some(next) = successor(candidates) else {
            return;
        };
        self.host_id = next.clone();
        if next == self.local_id {
            info!(session = %self.session_id, "host left, taking over");
            if let Err(e) = self.store.set_host(&self.session_id, &self.local_id) {
                warn!("Failed to claim host: {e:?}");
            }
            out.push(SyncEvent::BecameHost);
        } else {
            debug!(host = %next, "host migrated");
            out.push(SyncEvent::HostChanged { host: next });
        }
    }

    fn on_session(&mut self, value: Value, out: &mut Vec<SyncEvent>) {
        let record = match decode::<SessionRecord>(value) {
            Ok(record) => record,
            Err(e) => {
                warn!("Dropping session update: {e:?}");
                return;
            }
        };
        if record.state == SessionState::Ended && self.record.state != SessionState::Ended {
            out.push(SyncEvent::SessionEnded);
        }
        let host = PeerId::from(record.host_id.as_str());
        // a departed host can still be named by updates written before migration
        if host != self.host_id && self.peers.contains_key(&host) {
            self.host_id = host.clone();
            out.push(SyncEvent::HostChanged { host });
        }
        self.record = record;
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, SessionError> {
    Ok(serde_json::from_value(value)?)
}
