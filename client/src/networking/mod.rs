//! Session plumbing: join or fall back to offline, then publish on cadence.

use std::sync::Arc;

use bevy::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use shadow_duel_shared::arena::Arena;
use shadow_duel_shared::rng::generate_peer_id;
use shadow_duel_shared::session::JoinRequest;
use shadow_duel_shared::{
    Authority, MemoryStore, PeerId, SessionError, SessionStore, SessionSync, Simulation, protocol,
};

use crate::duel::Duel;
use crate::models::{DuelSystems, MapType, NetworkMode, Screen, Settings};
use crate::scene::layout_for;

pub fn plugin(app: &mut App) {
    app.init_resource::<LocalStore>()
        .add_systems(OnEnter(Screen::Connecting), connect)
        .add_systems(OnEnter(Screen::GameOver), end_match)
        .add_systems(
            Update,
            publish
                .in_set(DuelSystems::Publish)
                .run_if(resource_exists::<SessionLink>),
        )
        .add_systems(Last, leave_on_exit.run_if(resource_exists::<SessionLink>));
}

/// Process-wide store backing [`NetworkMode::Loopback`].
#[derive(Resource, Clone)]
pub struct LocalStore(pub Arc<MemoryStore>);

impl Default for LocalStore {
    fn default() -> Self {
        Self(Arc::new(MemoryStore::new()))
    }
}

/// Live membership in a session. Absent when playing offline.
#[derive(Resource, Debug)]
pub struct SessionLink {
    pub sync: SessionSync,
}

fn connect(
    mut commands: Commands,
    settings: Res<Settings>,
    store: Res<LocalStore>,
    mut next_screen: ResMut<NextState<Screen>>,
) {
    let mut rng = StdRng::from_os_rng();
    let local_id = PeerId::from(generate_peer_id(&mut rng));

    let joined = match settings.network {
        NetworkMode::Offline => None,
        NetworkMode::Loopback => match join(&settings, store.0.clone(), local_id.clone()) {
            Ok(sync) => Some(sync),
            Err(e) => {
                warn!("Failed to join session, falling back to offline: {e:?}");
                None
            }
        },
    };

    // Followers fight the host's boss on the host's map.
    let (session_id, boss_name, map) = match &joined {
        Some(sync) => (
            sync.session_id().to_string(),
            sync.record().boss_name.clone(),
            MapType::parse(&sync.record().map_type),
        ),
        None => (
            protocol::session_id(&settings.boss_name),
            settings.boss_name.clone(),
            settings.map_type,
        ),
    };

    let layout = layout_for(map, &session_id);
    let arena = Arena::with_obstacles(layout.obstacles.clone());
    let mut sim = Simulation::new(local_id, &boss_name, arena);

    if let Some(sync) = joined {
        let authority = if sync.is_host() {
            Authority::Host
        } else {
            Authority::Follower
        };
        info!(
            "Joined session '{}' as {authority:?} in slot {}",
            sync.session_id(),
            sync.slot()
        );
        sim = sim.networked(authority, sync.slot(), sync.config().interpolation_speed);
        commands.insert_resource(SessionLink { sync });
    } else {
        info!("Playing offline against {boss_name}");
    }

    commands.insert_resource(layout);
    commands.insert_resource(Duel::new(sim, rng));
    next_screen.set(Screen::Gameplay);
}

fn join(
    settings: &Settings,
    store: Arc<MemoryStore>,
    peer_id: PeerId,
) -> Result<SessionSync, SessionError> {
    let store: Arc<dyn SessionStore> = store;
    SessionSync::join(
        store,
        JoinRequest {
            peer_id,
            player_name: settings.player_name.clone(),
            boss_name: settings.boss_name.clone(),
            map_type: settings.map_type.as_str().to_string(),
        },
        settings.session,
    )
}

fn publish(time: Res<Time>, duel: Res<Duel>, mut link: ResMut<SessionLink>) {
    if !link.sync.due(time.delta_secs()) {
        return;
    }
    link.sync.publish_peer(&duel.sim.local_state());
    if let Some(boss) = duel.sim.boss_state() {
        link.sync.publish_boss(&boss);
    }
}

fn end_match(link: Option<Res<SessionLink>>, duel: Option<Res<Duel>>) {
    let Some(link) = link else {
        return;
    };
    let last_boss = duel.and_then(|duel| duel.sim.boss_state());
    link.sync.end_match(last_boss.as_ref());
}

fn leave_on_exit(mut exits: MessageReader<AppExit>, mut commands: Commands) {
    if exits.read().next().is_some() {
        commands.queue(leave_session);
    }
}

/// Drop out of the session, releasing our peer record and count.
pub fn leave_session(world: &mut World) {
    if let Some(link) = world.remove_resource::<SessionLink>() {
        info!("Leaving session '{}'", link.sync.session_id());
        link.sync.leave();
    }
}
