//! Built-in phrase the player binary loads onto its tracks.

use crate::config::{BARS_PER_PHRASE, BEATS_PER_BAR, BEAT_FRACTION};
use crate::note::{Note, NoteError};

const CHORDS: [[&str; 4]; 4] = [
    ["C4", "E4", "G4", "C5"],
    ["A3", "C4", "E4", "A4"],
    ["F3", "A3", "C4", "F4"],
    ["G3", "B3", "D4", "G4"],
];
const ROOTS: [&str; 4] = ["C2", "A1", "F1", "G1"];

/// The first track arpeggiates one note per beat; later tracks play the
/// root on beats 1 and 3 of every bar.
pub fn demo_phrase(track_index: usize) -> Result<Vec<Note>, NoteError> {
    let mut notes = Vec::new();
    for bar in 0..BARS_PER_PHRASE as usize {
        if track_index == 0 {
            for beat in 0..BEATS_PER_BAR as usize {
                let position = bar as f64 + beat as f64 * BEAT_FRACTION;
                let velocity = if beat == 0 { 110 } else { 90 };
                notes.push(
                    Note::new(CHORDS[bar][beat], position)?.with_velocity(velocity)?,
                );
            }
        } else {
            for beat in [0usize, 2] {
                let position = bar as f64 + beat as f64 * BEAT_FRACTION;
                notes.push(
                    Note::new(ROOTS[bar], position)?.with_duration(2.0 * BEAT_FRACTION)?,
                );
            }
        }
    }
    Ok(notes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_phrase_fills_the_phrase() {
        let lead = demo_phrase(0).unwrap();
        assert_eq!(lead.len(), 16);
        assert_eq!(lead[0].pitch(), "C4");
        assert_eq!(lead[15].position(), 3.75);

        let bass = demo_phrase(1).unwrap();
        assert_eq!(bass.len(), 8);
        assert!(bass.iter().all(|n| n.duration() == 0.5));
    }
}
