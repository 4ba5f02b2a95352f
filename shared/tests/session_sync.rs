//! Host election, migration and replication through the in-memory store.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use glam::{Vec2, Vec3};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::json;
use shadow_duel_shared::arena::Arena;
use shadow_duel_shared::protocol::{PeerState, PlanarPos, SessionState};
use shadow_duel_shared::combat::{self, AttackKind};
use shadow_duel_shared::resolver::{BladeProbe, CombatEvent, HitProbe};
use shadow_duel_shared::sim::{MatchOutcome, SimEvent};
use shadow_duel_shared::session::{JoinRequest, SyncEvent};
use shadow_duel_shared::store::NewSession;
use shadow_duel_shared::{
    AiState, Authority, Combatant, LocalInput, MemoryStore, PeerId, SessionConfig, SessionError,
    SessionStore, SessionSync, Simulation, StoreError,
};

/// Store whose clock the test moves by hand.
fn clocked_store() -> (MemoryStore, Arc<AtomicI64>) {
    let time = Arc::new(AtomicI64::new(1_000));
    let clock = Arc::clone(&time);
    (MemoryStore::with_clock(move || clock.load(Ordering::SeqCst)), time)
}

fn request(peer: &str, name: &str) -> JoinRequest {
    JoinRequest {
        peer_id: PeerId::from(peer),
        player_name: name.to_string(),
        boss_name: "Gael".to_string(),
        map_type: "arena".to_string(),
    }
}

fn join(store: &MemoryStore, peer: &str) -> SessionSync {
    SessionSync::join(Arc::new(store.clone()), request(peer, peer), SessionConfig::default())
        .unwrap_or_else(|e| panic!("{peer} failed to join: {e}"))
}

// =============================================================================
// Election
// =============================================================================

#[test]
fn test_first_joiner_hosts_second_follows() {
    let (store, _) = clocked_store();
    let host = join(&store, "p_a");
    let follower = join(&store, "p_b");

    assert!(host.is_host());
    assert!(!follower.is_host());
    assert_eq!(follower.host_id(), &PeerId::from("p_a"));
    assert_eq!(host.session_id(), "gael");
    assert_eq!((host.slot(), follower.slot()), (0, 1));

    let record = store.read_session("gael").ok().flatten();
    assert_eq!(record.map(|r| r.player_count), Some(2));

    let peers = store.read_peers("gael").unwrap_or_default();
    assert_eq!(peers[&PeerId::from("p_a")].color, 0xaaaaaa);
    assert_eq!(peers[&PeerId::from("p_b")].color, 0x4fc3f7);
}

#[test]
fn test_session_without_peers_is_reclaimed() {
    let (store, _) = clocked_store();
    let new = NewSession {
        boss_name: "Gael".into(),
        map_type: "snow".into(),
        host_id: PeerId::from("p_gone"),
    };
    store.create_session("gael", &new).unwrap_or_else(|e| panic!("{e}"));

    let joiner = join(&store, "p_new");

    assert!(joiner.is_host());
    assert_eq!(joiner.record().host_id, "p_new");
    assert_eq!(joiner.record().map_type, "arena");
}

#[test]
fn test_missing_host_is_overwritten() {
    let (store, _) = clocked_store();
    let new = NewSession {
        boss_name: "Gael".into(),
        map_type: "arena".into(),
        host_id: PeerId::from("p_gone"),
    };
    store.create_session("gael", &new).unwrap_or_else(|e| panic!("{e}"));
    store.put_raw_peer(
        "gael",
        &PeerId::from("p_other"),
        json!({"name": "Other", "color": 0, "joinedAt": 900, "state": {"health": 100.0}}),
    );

    let joiner = join(&store, "p_new");

    assert!(joiner.is_host());
    let peers = store.read_peers("gael").unwrap_or_default();
    assert_eq!(peers.keys().cloned().collect::<Vec<_>>(), vec![PeerId::from("p_new")]);
}

#[test]
fn test_stale_host_is_purged_before_election() {
    let (store, time) = clocked_store();
    let crashed = join(&store, "p_crashed");
    // never published anything, then went silent
    drop(crashed);
    time.store(40_000, Ordering::SeqCst);

    let joiner = join(&store, "p_new");

    assert!(joiner.is_host());
    let peers = store.read_peers("gael").unwrap_or_default();
    assert!(!peers.contains_key(&PeerId::from("p_crashed")));
}

#[test]
fn test_live_host_with_old_record_is_kept() {
    let (store, time) = clocked_store();
    let host = join(&store, "p_a");
    host.publish_peer(&PeerState { health: Some(100.0), ..Default::default() });
    time.store(40_000, Ordering::SeqCst);

    let follower = join(&store, "p_b");

    assert!(!follower.is_host());
    assert_eq!(follower.host_id(), &PeerId::from("p_a"));
}

#[test]
fn test_ended_session_is_reclaimed() {
    let (store, _) = clocked_store();
    let host = join(&store, "p_a");
    host.publish_peer(&PeerState { health: Some(100.0), ..Default::default() });
    host.end_match(None);
    assert_eq!(
        store.read_session("gael").ok().flatten().map(|r| r.state),
        Some(SessionState::Ended)
    );

    let next = join(&store, "p_b");
    assert!(next.is_host());
}

#[test]
fn test_malformed_peer_record_does_not_block_join() {
    let (store, _) = clocked_store();
    let host = join(&store, "p_a");
    host.publish_peer(&PeerState { health: Some(100.0), ..Default::default() });
    store.put_raw_peer("gael", &PeerId::from("p_bad"), json!({"color": "red"}));

    let follower = SessionSync::join(
        Arc::new(store.clone()),
        request("p_b", "p_b"),
        SessionConfig::default(),
    );
    let follower = follower.unwrap_or_else(|e| panic!("join fell back: {e}"));
    assert!(!follower.is_host());
    assert_eq!(follower.slot(), 1);
}

#[test]
fn test_unreachable_store_fails_join() {
    let store = MemoryStore::new();
    store.set_online(false);
    let result =
        SessionSync::join(Arc::new(store), request("p_a", "Wolf"), SessionConfig::default());
    assert!(matches!(result, Err(SessionError::Store(StoreError::Unavailable))));
}

// =============================================================================
// Replication
// =============================================================================

#[test]
fn test_peer_updates_reach_other_participants() {
    let (store, _) = clocked_store();
    let mut host = join(&store, "p_a");
    let follower = join(&store, "p_b");

    let joined = host.drain();
    assert!(joined.iter().any(|e| matches!(
        e,
        SyncEvent::PeerJoined { id, record } if id.as_str() == "p_b" && record.name == "p_b"
    )));

    let state = PeerState {
        pos: Some(PlanarPos { x: 2.0, z: 3.0 }),
        attacking: true,
        ..Default::default()
    };
    follower.publish_peer(&state);

    let updates = host.drain();
    assert!(matches!(
        updates.as_slice(),
        [SyncEvent::PeerUpdated { id, state: s }] if id.as_str() == "p_b" && s.attacking
    ));
}

#[test]
fn test_boss_snapshots_only_reach_followers() {
    let (store, _) = clocked_store();
    let mut host = join(&store, "p_a");
    let mut follower = join(&store, "p_b");
    host.drain();
    follower.drain();

    let sim = Simulation::new("p_a", "Gael", Arena::default()).networked(Authority::Host, 0, 12.0);
    let record = sim.boss_state().unwrap_or_else(|| panic!("host must own the boss"));
    host.publish_boss(&record);
    // followers never write the boss
    follower.publish_boss(&record);

    assert!(host.drain().iter().all(|e| !matches!(e, SyncEvent::BossSnapshot(_))));
    let seen = follower.drain();
    assert_eq!(seen, vec![SyncEvent::BossSnapshot(record)]);
}

#[test]
fn test_malformed_payloads_are_dropped() {
    let (store, _) = clocked_store();
    let mut host = join(&store, "p_a");
    host.drain();

    store.put_raw_peer("gael", &PeerId::from("p_bad"), json!({"color": "red"}));

    assert!(host.drain().is_empty());
    assert!(host.peers().is_empty());
}

#[test]
fn test_leave_removes_record_and_count() {
    let (store, _) = clocked_store();
    let mut host = join(&store, "p_a");
    let follower = join(&store, "p_b");
    host.drain();

    follower.leave();

    assert_eq!(host.drain().first(), Some(&SyncEvent::PeerLeft { id: PeerId::from("p_b") }));
    let record = store.read_session("gael").ok().flatten();
    assert_eq!(record.map(|r| r.player_count), Some(1));
}

#[test]
fn test_cadence_gates_publication() {
    let (store, _) = clocked_store();
    let mut host = join(&store, "p_a");
    assert!(!host.due(0.02));
    assert!(!host.due(0.02));
    assert!(host.due(0.02));
    assert!(!host.due(0.01));
}

// =============================================================================
// Host migration
// =============================================================================

#[test]
fn test_earliest_follower_takes_over() {
    let (store, time) = clocked_store();
    let host = join(&store, "p_a");
    time.store(2_000, Ordering::SeqCst);
    let mut second = join(&store, "p_c");
    time.store(3_000, Ordering::SeqCst);
    let mut third = join(&store, "p_b");
    second.drain();
    third.drain();

    host.leave();

    let promoted = second.drain();
    assert!(promoted.contains(&SyncEvent::BecameHost));
    assert!(second.is_host());

    let observed = third.drain();
    assert!(observed.contains(&SyncEvent::HostChanged { host: PeerId::from("p_c") }));
    assert!(!third.is_host());

    let record = store.read_session("gael").ok().flatten();
    assert_eq!(record.map(|r| r.host_id), Some("p_c".to_string()));
}

// =============================================================================
// Simulations over a shared store
// =============================================================================

#[test]
fn test_follower_mirrors_host_boss() {
    let (store, _) = clocked_store();
    let mut host_sync = join(&store, "p_a");
    let mut follower_sync = join(&store, "p_b");

    let mut host = Simulation::new("p_a", "Gael", Arena::default()).networked(Authority::Host, 0, 12.0);
    let mut follower =
        Simulation::new("p_b", "Gael", Arena::default()).networked(Authority::Follower, 1, 12.0);
    let mut rng = StdRng::seed_from_u64(7);
    let probe = BladeProbe::default();

    for _ in 0..20 {
        let incoming = host_sync.drain();
        host.step(1.0 / 60.0, &LocalInput::default(), incoming, &mut rng, &probe);
        if let Some(record) = host.boss_state() {
            host_sync.publish_boss(&record);
        }
        host_sync.publish_peer(&host.local_state());

        let incoming = follower_sync.drain();
        follower.step(1.0 / 60.0, &LocalInput::default(), incoming, &mut rng, &probe);
        follower_sync.publish_peer(&follower.local_state());
    }

    assert_eq!(host.player_count(), 2);
    assert_eq!(follower.player_count(), 2);
    assert_eq!(follower.boss.max_health, host.boss.max_health);
    assert_eq!(follower.boss.health, host.boss.health);
    assert_eq!(follower.director.state, host.director.state);
    // smoothed, not teleported, but close after a few frames
    let gap = follower.boss.planar().distance(host.boss.planar());
    assert!(gap < 1.0, "boss replica drifted {gap}");
    assert!(follower.remotes.contains_key(&PeerId::from("p_a")));
    let host_seen = follower.remotes[&PeerId::from("p_a")].combatant.planar();
    assert!(host_seen.distance(host.player.planar()) < 1.0);
}

#[test]
fn test_spawn_slots_follow_join_order() {
    let (store, _) = clocked_store();
    let _host = join(&store, "p_a");
    let follower = join(&store, "p_b");
    let sim = Simulation::new("p_b", "Gael", Arena::default()).networked(
        Authority::Follower,
        follower.slot(),
        12.0,
    );
    let expected = shadow_duel_shared::arena::spawn_slot(1);
    assert_eq!(sim.player.position, expected);
    assert_ne!(sim.player.position, Vec3::ZERO);
    assert!(sim.player.planar().distance(Vec2::ZERO) > 5.9);
}

// =============================================================================
// Follower against the mirrored boss
// =============================================================================

/// Blade tip parked on a fixed spot at body height.
struct TipAt(Vec3);

impl HitProbe for TipAt {
    fn weapon_points(&self, _: &Combatant) -> Vec<Vec3> {
        vec![Vec3::new(self.0.x, 1.0, self.0.z)]
    }
}

/// Host and follower simulations that have seen each other join.
fn linked_pair(store: &MemoryStore) -> (SessionSync, Simulation, SessionSync, Simulation) {
    let mut host_sync = join(store, "p_a");
    let mut follower_sync = join(store, "p_b");
    let mut host = Simulation::new("p_a", "Gael", Arena::default()).networked(Authority::Host, 0, 12.0);
    let mut follower =
        Simulation::new("p_b", "Gael", Arena::default()).networked(Authority::Follower, 1, 12.0);
    let mut rng = StdRng::seed_from_u64(11);
    let probe = BladeProbe::default();

    let incoming = host_sync.drain();
    host.step(1.0 / 60.0, &LocalInput::default(), incoming, &mut rng, &probe);
    let incoming = follower_sync.drain();
    follower.step(1.0 / 60.0, &LocalInput::default(), incoming, &mut rng, &probe);
    (host_sync, host, follower_sync, follower)
}

#[test]
fn test_follower_heavy_into_defending_boss_is_parried() {
    let (store, _) = clocked_store();
    let (host_sync, mut host, mut follower_sync, mut follower) = linked_pair(&store);
    let mut rng = StdRng::seed_from_u64(3);

    // the host's boss turns to face the follower and raises its guard
    let boss_pos = host.boss.position;
    follower.player.position = boss_pos + Vec3::new(0.0, 0.0, 2.0);
    host.boss.face(follower.player.planar());
    host.director.state = AiState::Defend;
    let snapshot = host.boss_state().unwrap_or_else(|| panic!("host must own the boss"));
    host_sync.publish_boss(&snapshot);

    assert!(follower.player.attack(AttackKind::Heavy, &mut rng));
    follower.player.timers.attack = AttackKind::Heavy.duration() * 0.45;
    let posture_before = follower.player.posture;

    let incoming = follower_sync.drain();
    let events = follower.step(1.0 / 60.0, &LocalInput::default(), incoming, &mut rng, &TipAt(boss_pos));

    assert!(follower.boss.blocking);
    assert!(events.iter().any(|e| matches!(
        e,
        SimEvent::Combat(CombatEvent::Parried { attacker, .. }) if attacker.as_str() == "p_b"
    )));
    assert!(!events.iter().any(|e| matches!(e, SimEvent::Combat(CombatEvent::Hit { .. }))));
    let reflected = combat::compute_blocked_damage(AttackKind::Heavy, true).attacker_posture_damage;
    assert_eq!(follower.player.posture, posture_before + reflected);
    assert_eq!(follower.player.timers.attack, 0.0);
    // the boss's vitals stay the host's to decide
    assert_eq!(follower.boss.health, snapshot.health);
}

#[test]
fn test_followers_finish_when_host_ends_match() {
    let (store, _) = clocked_store();
    let (host_sync, mut host, mut follower_sync, mut follower) = linked_pair(&store);
    let mut rng = StdRng::seed_from_u64(5);
    let probe = BladeProbe::default();

    host.boss.health = 0.0;
    let events = host.step(1.0 / 60.0, &LocalInput::default(), Vec::new(), &mut rng, &probe);
    assert!(events.contains(&SimEvent::MatchOver(MatchOutcome::Victory)));
    host_sync.end_match(host.boss_state().as_ref());

    let incoming = follower_sync.drain();
    assert!(incoming.contains(&SyncEvent::SessionEnded));
    let events = follower.step(1.0 / 60.0, &LocalInput::default(), incoming, &mut rng, &probe);
    assert!(events.contains(&SimEvent::MatchOver(MatchOutcome::Victory)));
    assert_eq!(follower.outcome(), Some(MatchOutcome::Victory));
}

#[test]
fn test_followers_lose_when_host_falls() {
    let (store, _) = clocked_store();
    let (host_sync, mut host, mut follower_sync, mut follower) = linked_pair(&store);
    let mut rng = StdRng::seed_from_u64(5);
    let probe = BladeProbe::default();

    host.player.health = 0.0;
    host.step(1.0 / 60.0, &LocalInput::default(), Vec::new(), &mut rng, &probe);
    assert_eq!(host.outcome(), Some(MatchOutcome::Defeat));
    host_sync.end_match(host.boss_state().as_ref());

    let incoming = follower_sync.drain();
    follower.step(1.0 / 60.0, &LocalInput::default(), incoming, &mut rng, &probe);
    assert_eq!(follower.outcome(), Some(MatchOutcome::Defeat));
    // nothing moves once the match is settled
    let frozen = follower.step(1.0 / 60.0, &LocalInput::default(), Vec::new(), &mut rng, &probe);
    assert!(frozen.is_empty());
}
