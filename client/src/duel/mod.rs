//! Drives the shared simulation once per frame and fans its events out to
//! the rest of the app as observer triggers.

use bevy::prelude::*;
use rand::rngs::StdRng;
use shadow_duel_shared::resolver::BladeProbe;
use shadow_duel_shared::sim::MatchOutcome;
use shadow_duel_shared::{Combatant, LocalInput, PeerId, SimEvent, Simulation};

use crate::models::{DuelSystems, Screen};
use crate::networking::{SessionLink, leave_session};

mod input;
mod proxies;

pub use input::*;
pub use proxies::*;

pub fn plugin(app: &mut App) {
    app.add_plugins((input::plugin, proxies::plugin))
        .add_systems(
            Update,
            step_duel
                .in_set(DuelSystems::Step)
                .run_if(resource_exists::<Duel>),
        )
        .add_systems(Update, rematch.run_if(in_state(Screen::GameOver)))
        .add_observer(log_duel_event);
}

#[derive(Resource)]
pub struct Duel {
    pub sim: Simulation,
    rng: StdRng,
    probe: BladeProbe,
}

impl Duel {
    pub fn new(sim: Simulation, rng: StdRng) -> Self {
        Self {
            sim,
            rng,
            probe: BladeProbe::default(),
        }
    }

    /// The local fighter, the boss, or a replica.
    pub fn fighter(&self, id: &PeerId) -> Option<&Combatant> {
        let sim = &self.sim;
        if *id == sim.local_id {
            Some(&sim.player)
        } else if *id == sim.boss.id {
            Some(&sim.boss)
        } else {
            sim.remotes.get(id).map(|remote| &remote.combatant)
        }
    }
}

/// One simulation event, triggered globally after the step that produced it.
#[derive(Event, Debug, Clone)]
pub struct DuelEvent(pub SimEvent);

/// How the last match ended; read by the end screen.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastOutcome(pub MatchOutcome);

fn step_duel(
    time: Res<Time>,
    input: Res<FrameInput>,
    mut duel: ResMut<Duel>,
    link: Option<ResMut<SessionLink>>,
    mut commands: Commands,
    mut next_screen: ResMut<NextState<Screen>>,
) {
    let incoming = match link {
        Some(mut link) => link.sync.drain(),
        None => Vec::new(),
    };

    let Duel { sim, rng, probe } = duel.as_mut();
    let local: LocalInput = input.0;
    let events = sim.step(time.delta_secs(), &local, incoming, rng, &*probe);

    for event in events {
        if let SimEvent::MatchOver(outcome) = event {
            info!("Match over: {outcome:?}");
            commands.insert_resource(LastOutcome(outcome));
            next_screen.set(Screen::GameOver);
        }
        commands.trigger(DuelEvent(event));
    }
}

fn log_duel_event(on: On<DuelEvent>) {
    match &on.event().0 {
        SimEvent::PeerJoined { id, name } => info!("{name} ({id}) joined the fight"),
        SimEvent::PeerLeft { id, name } => info!("{name} ({id}) left the fight"),
        SimEvent::BecameHost => info!("Host left, this client now runs the boss"),
        SimEvent::BossRescaled { player_count } => {
            debug!("Boss rescaled for {player_count} players")
        }
        SimEvent::SpecialStarted(special) => debug!("Boss special: {}", special.name()),
        event => trace!("{event:?}"),
    }
}

fn rematch(
    keys: Res<ButtonInput<KeyCode>>,
    mut commands: Commands,
    mut next_screen: ResMut<NextState<Screen>>,
) {
    if !keys.just_pressed(KeyCode::Enter) {
        return;
    }
    commands.queue(leave_session);
    commands.remove_resource::<Duel>();
    commands.remove_resource::<LastOutcome>();
    next_screen.set(Screen::Connecting);
}
