use super::*;

pub fn plugin(app: &mut App) {
    app.init_state::<Screen>()
        .add_systems(Update, track_last_screen.run_if(state_changed::<Screen>));
}

/// The game's main screen states.
#[derive(States, Default, Clone, Eq, PartialEq, Debug, Hash, Reflect)]
pub enum Screen {
    /// Election and session join, or the offline fallback.
    #[default]
    Connecting,
    Gameplay,
    /// Victory or defeat banner over the frozen arena.
    GameOver,
}

fn track_last_screen(mut transitions: MessageReader<StateTransitionEvent<Screen>>) {
    let Some(transition) = transitions.read().last() else {
        return;
    };
    debug!("Screen {:?} -> {:?}", transition.exited, transition.entered);
}
