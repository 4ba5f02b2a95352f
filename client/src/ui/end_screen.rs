use bevy::prelude::*;
use rand::Rng;
use rand::seq::IndexedRandom;
use shadow_duel_shared::sim::MatchOutcome;

use crate::duel::{Duel, LastOutcome};
use crate::models::Screen;
use crate::ui::colors::{HEALTH_RED, NEUTRAL300, SAND_YELLOW, VOID};

pub fn plugin(app: &mut App) {
    app.add_systems(OnEnter(Screen::GameOver), spawn_end_screen);
}

/// Banner text for the end of a match against `boss`.
pub fn banner<R: Rng + ?Sized>(outcome: MatchOutcome, boss: &str, rng: &mut R) -> String {
    let boss = boss.to_uppercase();
    let lines = match outcome {
        MatchOutcome::Victory => vec![
            "IMMORTALITY SEVERED".to_string(),
            format!("{boss} FALLEN"),
            "PREY SLAUGHTERED".to_string(),
            "NIGHTMARE SLAIN".to_string(),
            "LEGEND ENDED".to_string(),
            "VICTORY ACHIEVED".to_string(),
            "FATE DEFIED".to_string(),
        ],
        MatchOutcome::Defeat => vec![
            "DEATH".to_string(),
            "YOU DIED".to_string(),
            format!("CRUSHED BY {boss}"),
            "UNWORTHY".to_string(),
            "FATE SEALED".to_string(),
            format!("YIELD TO {boss}"),
            "EXTINGUISHED".to_string(),
            "BROKEN".to_string(),
        ],
    };
    lines.choose(rng).cloned().unwrap_or_default()
}

fn spawn_end_screen(
    mut commands: Commands,
    outcome: Option<Res<LastOutcome>>,
    duel: Option<Res<Duel>>,
) {
    let (Some(outcome), Some(duel)) = (outcome, duel) else {
        warn!("Reached the end screen without a finished duel");
        return;
    };
    let text = banner(outcome.0, &duel.sim.boss_name, &mut rand::rng());
    let color = match outcome.0 {
        MatchOutcome::Victory => SAND_YELLOW,
        MatchOutcome::Defeat => HEALTH_RED,
    };

    commands
        .spawn((
            Name::new("EndScreen"),
            DespawnOnExit(Screen::GameOver),
            Node {
                position_type: PositionType::Absolute,
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                align_items: AlignItems::Center,
                justify_content: JustifyContent::Center,
                ..default()
            },
            BackgroundColor(VOID.with_alpha(0.6)),
            GlobalZIndex(200),
        ))
        .with_children(|parent| {
            parent.spawn((Text::new(text), TextFont::from_font_size(72.0), TextColor(color)));
            parent.spawn((
                Text::new("ENTER TO FIGHT AGAIN    TAB TO SWITCH OFFLINE / LOOPBACK"),
                TextFont::from_font_size(16.0),
                TextColor(NEUTRAL300),
                Node {
                    margin: UiRect::top(Val::Px(24.0)),
                    ..default()
                },
            ));
        });
}
