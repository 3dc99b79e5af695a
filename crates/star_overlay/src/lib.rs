pub mod overlay;

pub use overlay::{HudText, Overlay, OverlayActions, OverlayStats};
