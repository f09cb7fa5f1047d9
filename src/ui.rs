// ui.rs

use crate::config::{BARS_PER_PHRASE, BEATS_PER_BAR};
use crate::position::MusicalPosition;
use crate::session::Session;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

fn style(template: &str, progress_chars: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars(progress_chars)
}

pub fn create_beat_progress(multi_progress: &MultiProgress) -> ProgressBar {
    let pb = multi_progress.add(ProgressBar::new(u64::from(BEATS_PER_BAR)));
    pb.set_style(style(
        "{prefix:.bold} [{bar:40.cyan}] {pos}/{len}",
        "⣀⣤⣦⣶⣷⣿ ",
    ));
    pb.set_prefix("Beat");
    pb
}

pub fn create_bar_progress(multi_progress: &MultiProgress) -> ProgressBar {
    let pb = multi_progress.add(ProgressBar::new(u64::from(BARS_PER_PHRASE)));
    pb.set_style(style(
        "{prefix:.bold} [{bar:20.white/black}] {pos}/{len}",
        "█▊ ",
    ));
    pb.set_prefix("Bar");
    pb
}

pub fn create_transport_spinner(multi_progress: &MultiProgress) -> ProgressBar {
    let pb = multi_progress.add(ProgressBar::new_spinner());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {spinner} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix("Transport");
    pb
}

/// Bar and beat progress of a playing session.
pub struct PositionDisplay {
    #[allow(dead_code)]
    multi_progress: MultiProgress,
    beat_pb: ProgressBar,
    bar_pb: ProgressBar,
    transport_pb: ProgressBar,
}

impl Default for PositionDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionDisplay {
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    pub fn with_draw_target(target: ProgressDrawTarget) -> Self {
        let multi_progress = MultiProgress::with_draw_target(target);
        let beat_pb = create_beat_progress(&multi_progress);
        let bar_pb = create_bar_progress(&multi_progress);
        let transport_pb = create_transport_spinner(&multi_progress);

        PositionDisplay {
            multi_progress,
            beat_pb,
            bar_pb,
            transport_pb,
        }
    }

    /// Redraws from the session's current position.
    pub fn update(&self, session: &Session) {
        let current = session.get_current_beat();
        self.show_position(MusicalPosition::from_decimal(current));
        self.transport_pb.set_message(format!(
            "{} | {} | {:.2} | {}",
            session.name(),
            session.tempo(),
            current,
            if session.is_playing() { "Playing" } else { "Stopped" }
        ));
        self.transport_pb.tick();
    }

    fn show_position(&self, position: MusicalPosition) {
        self.beat_pb.set_position(u64::from(position.beat() + 1));
        self.bar_pb.set_position(u64::from(position.bar() + 1));
    }

    pub fn positions(&self) -> (u64, u64) {
        (self.bar_pb.position(), self.beat_pb.position())
    }

    pub fn finish(&self) {
        self.beat_pb.finish_and_clear();
        self.bar_pb.finish_and_clear();
        self.transport_pb.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_are_one_based() {
        let display = PositionDisplay::with_draw_target(ProgressDrawTarget::hidden());
        let shown = |decimal: f64| {
            display.show_position(MusicalPosition::from_decimal(decimal));
            display.positions()
        };
        assert_eq!(shown(0.0), (1, 1));
        assert_eq!(shown(0.3), (1, 2));
        assert_eq!(shown(2.75), (3, 4));
        assert_eq!(shown(3.999), (4, 4));
    }

    #[test]
    fn test_progress_lengths() {
        let display = PositionDisplay::with_draw_target(ProgressDrawTarget::hidden());
        assert_eq!(display.beat_pb.length(), Some(4));
        assert_eq!(display.bar_pb.length(), Some(4));
        assert!(display.transport_pb.length().is_none());
        assert_eq!(display.positions(), (0, 0));
    }
}
