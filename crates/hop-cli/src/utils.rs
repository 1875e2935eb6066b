use std::{
    fmt::Display,
    sync::{LazyLock, RwLock},
};

use hop_core::error::HopError;
use nu_ansi_term::Color;
use tracing::warn;

pub struct Icons;

impl Icons {
    pub const ARROW: &str = "→";
    pub const BRANCH: &str = "⎇";
    pub const CHECK: &str = "✓";
    pub const CROSS: &str = "✗";
    pub const WARNING: &str = "⚠";
}

pub static COLOR: LazyLock<RwLock<bool>> = LazyLock::new(|| RwLock::new(true));

pub fn disable_color() {
    if let Ok(mut color) = COLOR.write() {
        *color = false;
    }
}

fn color_enabled() -> bool {
    COLOR.read().map(|c| *c).unwrap_or(false)
}

pub struct Colored<T: Display>(pub Color, pub T);

impl<T: Display> Display for Colored<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if color_enabled() {
            write!(f, "{}", self.0.prefix())?;
            self.1.fmt(f)?;
            write!(f, "{}", self.0.suffix())
        } else {
            self.1.fmt(f)
        }
    }
}

/// Logs the warnings an operation finished with, including their remedy.
pub fn report_warnings(warnings: Vec<HopError>) {
    for warning in warnings {
        warn!(
            "{} {warning}",
            Colored(Color::Yellow, Icons::WARNING)
        );
        if let Some(help) = miette::Diagnostic::help(&warning) {
            warn!("  {help}");
        }
    }
}
