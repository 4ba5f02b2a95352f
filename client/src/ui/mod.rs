use bevy::prelude::*;

mod callouts;
mod constants;
mod end_screen;
pub mod hud;

pub use constants::*;

pub fn plugin(app: &mut App) {
    app.add_plugins((hud::plugin, callouts::plugin, end_screen::plugin));
}

/// `0xRRGGBB` as used on the wire and in call-outs.
pub fn hex_color(hex: u32) -> Color {
    Color::srgb_u8((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}
