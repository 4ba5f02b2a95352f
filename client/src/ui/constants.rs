//! Various non-themable constants

/// Size constants
pub mod size {
    /// Player bar width
    pub const BAR_WIDTH: f32 = 288.0;

    /// Boss bar width, centred at the top
    pub const BOSS_BAR_WIDTH: f32 = 560.0;

    /// Health bar height
    pub const HEALTH_BAR_HEIGHT: f32 = 16.0;

    /// Posture and stamina bar height
    pub const THIN_BAR_HEIGHT: f32 = 6.0;
}

/// Tailwind CSS neutral palette (oklch, zero chroma)
pub mod colors {
    use bevy::prelude::Color;

    // ── Neutral scale ───────────────────────────────────────────────
    pub const NEUTRAL300: Color = Color::oklcha(0.870, 0.0, 0.0, 1.0);
    pub const NEUTRAL600: Color = Color::oklcha(0.439, 0.0, 0.0, 1.0);
    pub const NEUTRAL700: Color = Color::oklcha(0.371, 0.0, 0.0, 1.0);
    pub const NEUTRAL850: Color = Color::oklcha(0.237, 0.0, 0.0, 1.0);
    pub const NEUTRAL920: Color = Color::oklcha(0.181, 0.0, 0.0, 1.0);

    // ── Accent colors ───────────────────────────────────────────────
    pub const SAND_YELLOW: Color = Color::srgb(205. / 255., 170. / 255., 109. / 255.);
    pub const GRASS_GREEN: Color = Color::oklcha(0.5866, 0.1543, 129.84, 1.0);
    pub const HEALTH_RED: Color = Color::srgb(0.816, 0.125, 0.125);
    /// Posture fills toward a break
    pub const POSTURE_AMBER: Color = Color::srgb(0.902, 0.655, 0.180);

    // ── Scene ──────────────────────────────────────────────────────────
    /// Near-black void used for ClearColor and fog
    pub const VOID: Color = Color::oklcha(0.100, 0.0, 0.0, 1.0);
}
