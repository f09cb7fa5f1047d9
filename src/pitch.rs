use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PitchError {
    #[error("empty pitch symbol")]
    Empty,
    #[error("unknown note name in pitch `{0}`")]
    UnknownNoteName(String),
    #[error("invalid octave in pitch `{0}`")]
    InvalidOctave(String),
    #[error("pitch `{0}` is outside the MIDI note range")]
    OutOfRange(String),
}

/// Converts a pitch symbol to a MIDI note number.
///
/// Accepts scientific pitch notation with optional sharps or flats
/// (`C4` is 60, `F#3`, `Bb-1`) and bare note numbers (`"64"`).
pub fn midi_note(symbol: &str) -> Result<u8, PitchError> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(PitchError::Empty);
    }

    if let Ok(number) = symbol.parse::<u8>() {
        return if number <= 127 {
            Ok(number)
        } else {
            Err(PitchError::OutOfRange(symbol.to_string()))
        };
    }

    let mut chars = symbol.chars();
    let letter = chars.next().map(|c| c.to_ascii_uppercase());
    let base: i32 = match letter {
        Some('C') => 0,
        Some('D') => 2,
        Some('E') => 4,
        Some('F') => 5,
        Some('G') => 7,
        Some('A') => 9,
        Some('B') => 11,
        _ => return Err(PitchError::UnknownNoteName(symbol.to_string())),
    };

    let rest = chars.as_str();
    let accidentals = rest
        .chars()
        .take_while(|c| matches!(c, '#' | 'b' | '♯' | '♭'))
        .collect::<Vec<_>>();
    let shift: i32 = accidentals
        .iter()
        .map(|c| if matches!(c, '#' | '♯') { 1 } else { -1 })
        .sum();
    let octave_text: String = rest.chars().skip(accidentals.len()).collect();

    let octave: i32 = octave_text
        .parse()
        .map_err(|_| PitchError::InvalidOctave(symbol.to_string()))?;

    let number = (octave + 1) * 12 + base + shift;
    u8::try_from(number)
        .ok()
        .filter(|n| *n <= 127)
        .ok_or_else(|| PitchError::OutOfRange(symbol.to_string()))
}
