use bevy::prelude::*;
use shadow_duel_shared::Authority;
use shadow_duel_shared::sim::HudSnapshot;

use crate::duel::Duel;
use crate::models::{DuelSystems, Screen, Settings};
use crate::ui::colors::{
    GRASS_GREEN, HEALTH_RED, NEUTRAL300, NEUTRAL700, NEUTRAL920, POSTURE_AMBER, SAND_YELLOW,
};
use crate::ui::size::{BAR_WIDTH, BOSS_BAR_WIDTH, HEALTH_BAR_HEIGHT, THIN_BAR_HEIGHT};

// ── Components ──────────────────────────────────────────────────────

#[derive(Component)]
struct Hud;

/// Which percentage a bar fill tracks.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
enum Stat {
    Health,
    Posture,
    Stamina,
    BossHealth,
    BossPosture,
}

impl Stat {
    fn read(self, hud: &HudSnapshot) -> f32 {
        match self {
            Stat::Health => hud.health,
            Stat::Posture => hud.posture,
            Stat::Stamina => hud.stamina,
            Stat::BossHealth => hud.boss_health,
            Stat::BossPosture => hud.boss_posture,
        }
    }
}

#[derive(Component)]
struct EstusText;

#[derive(Component)]
struct PartyText;

// ── Plugin ──────────────────────────────────────────────────────────

pub fn plugin(app: &mut App) {
    app.add_systems(OnEnter(Screen::Gameplay), spawn_hud).add_systems(
        Update,
        (tick_bars, tick_labels)
            .in_set(DuelSystems::Present)
            .run_if(resource_exists::<Duel>),
    );
}

// ── Spawn ───────────────────────────────────────────────────────────

fn bar(parent: &mut ChildSpawnerCommands, stat: Stat, width: f32, height: f32, fill: Color) {
    parent
        .spawn((
            Node {
                width: Val::Px(width),
                height: Val::Px(height),
                border: UiRect::all(Val::Px(1.0)),
                margin: UiRect::top(Val::Px(4.0)),
                ..default()
            },
            BackgroundColor(NEUTRAL920.with_alpha(0.8)),
            BorderColor::all(NEUTRAL700.with_alpha(0.5)),
        ))
        .with_children(|bar| {
            bar.spawn((
                stat,
                Node {
                    width: Val::Percent(100.0),
                    height: Val::Percent(100.0),
                    ..default()
                },
                BackgroundColor(fill),
            ));
        });
}

fn label(text: impl Into<String>, size: f32, color: Color) -> impl Bundle {
    (
        Text::new(text),
        TextFont::from_font_size(size),
        TextColor(color),
    )
}

fn spawn_hud(mut commands: Commands, duel: Res<Duel>, settings: Res<Settings>) {
    let sim = &duel.sim;
    let hud = sim.hud();

    // Player, bottom left
    commands
        .spawn((
            Hud,
            DespawnOnEnter(Screen::Connecting),
            Node {
                position_type: PositionType::Absolute,
                left: Val::Px(32.0),
                bottom: Val::Px(32.0),
                flex_direction: FlexDirection::Column,
                ..default()
            },
            GlobalZIndex(90),
        ))
        .with_children(|parent| {
            parent.spawn(label(settings.player_name.to_uppercase(), 22.0, Color::WHITE));
            bar(parent, Stat::Health, BAR_WIDTH, HEALTH_BAR_HEIGHT, HEALTH_RED);
            bar(parent, Stat::Posture, BAR_WIDTH, THIN_BAR_HEIGHT, POSTURE_AMBER);
            bar(parent, Stat::Stamina, BAR_WIDTH, THIN_BAR_HEIGHT, GRASS_GREEN);
            parent.spawn((
                EstusText,
                label(format!("ESTUS {}", hud.estus_charges), 14.0, SAND_YELLOW),
                Node {
                    margin: UiRect::top(Val::Px(6.0)),
                    ..default()
                },
            ));
        });

    // Boss, top centre
    commands
        .spawn((
            Hud,
            DespawnOnEnter(Screen::Connecting),
            Node {
                position_type: PositionType::Absolute,
                top: Val::Px(24.0),
                width: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                align_items: AlignItems::Center,
                ..default()
            },
            GlobalZIndex(90),
        ))
        .with_children(|parent| {
            parent.spawn(label(sim.boss_name.to_uppercase(), 24.0, Color::WHITE));
            parent.spawn(label(hud.boss_archetype.to_uppercase(), 12.0, NEUTRAL300));
            bar(parent, Stat::BossHealth, BOSS_BAR_WIDTH, HEALTH_BAR_HEIGHT, HEALTH_RED);
            bar(parent, Stat::BossPosture, BOSS_BAR_WIDTH, THIN_BAR_HEIGHT, POSTURE_AMBER);
        });

    // Party, top right
    commands.spawn((
        Hud,
        PartyText,
        DespawnOnEnter(Screen::Connecting),
        label(party_line(&hud, sim.authority()), 14.0, NEUTRAL300),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(24.0),
            right: Val::Px(32.0),
            ..default()
        },
        GlobalZIndex(90),
    ));
}

fn party_line(hud: &HudSnapshot, authority: Authority) -> String {
    let role = match authority {
        Authority::Offline => "OFFLINE",
        Authority::Host => "HOST",
        Authority::Follower => "FOLLOWER",
    };
    format!("PLAYERS {}  {role}", hud.player_count)
}

// ── Tick systems ────────────────────────────────────────────────────

fn tick_bars(duel: Res<Duel>, mut fills: Query<(&Stat, &mut Node)>) {
    let hud = duel.sim.hud();
    for (stat, mut fill) in &mut fills {
        fill.width = Val::Percent(stat.read(&hud));
    }
}

fn tick_labels(
    duel: Res<Duel>,
    mut estus: Query<&mut Text, (With<EstusText>, Without<PartyText>)>,
    mut party: Query<&mut Text, (With<PartyText>, Without<EstusText>)>,
) {
    let hud = duel.sim.hud();
    if let Ok(mut text) = estus.single_mut() {
        let line = format!("ESTUS {}", hud.estus_charges);
        if text.0 != line {
            text.0 = line;
        }
    }
    if let Ok(mut text) = party.single_mut() {
        let line = party_line(&hud, duel.sim.authority());
        if text.0 != line {
            text.0 = line;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shadow_duel_shared::Simulation;
    use shadow_duel_shared::arena::Arena;

    #[test]
    fn fresh_duel_reads_full_bars() {
        let sim = Simulation::new("p_local", "Gael", Arena::default());
        let hud = sim.hud();
        assert_eq!(Stat::Health.read(&hud), 100.0);
        assert_eq!(Stat::BossHealth.read(&hud), 100.0);
        assert_eq!(Stat::Posture.read(&hud), 0.0);
        assert_eq!(party_line(&hud, sim.authority()), "PLAYERS 1  OFFLINE");
    }
}
