//! Parser for the score text format
//!
//! Format:
//! +<tick_delta>| <event1>, <event2>  # comments
//!
//! Events:
//! - Note on:  <channel>:<pitch>d[@velocity]  (e.g., 0:60d@100, 0:4c#d)
//! - Note off: <channel>:<pitch>u             (e.g., 0:60u, 0:4c#u)
//! - Program:  <channel>:program=<n>
//! - Bend:     <channel>:bend=<0-16383>
//! - Control:  <channel>:cc<n>=<value>
//! - Tempo:    tempo=<microseconds per beat>
//! - Division: division=<ticks per beat>, only before the first tick
//!
//! Pitches are MIDI note numbers or an octave followed by a note name, where
//! 4c is middle C (60).

use std::fmt;
use std::str::FromStr;

use super::timebase::{Tempo, TempoMap};
use super::{ChannelEvent, MidiNoteEvent};
use crate::error::{Error, Result};

/// Velocity of a note-on written without one
pub const DEFAULT_VELOCITY: u8 = 100;
/// Ticks per beat when a score does not say
pub const DEFAULT_DIVISION: u16 = 480;

/// Pitch classes with support for black keys (sharps only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    /// Convert pitch class to semitone number (C=0, C#=1, D=2, ...)
    pub fn semitone(&self) -> u8 {
        match self {
            PitchClass::C => 0,
            PitchClass::CSharp => 1,
            PitchClass::D => 2,
            PitchClass::DSharp => 3,
            PitchClass::E => 4,
            PitchClass::F => 5,
            PitchClass::FSharp => 6,
            PitchClass::G => 7,
            PitchClass::GSharp => 8,
            PitchClass::A => 9,
            PitchClass::ASharp => 10,
            PitchClass::B => 11,
        }
    }
}

impl FromStr for PitchClass {
    type Err = ParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "c" => Ok(PitchClass::C),
            "c#" | "C#" => Ok(PitchClass::CSharp),
            "d" => Ok(PitchClass::D),
            "d#" | "D#" => Ok(PitchClass::DSharp),
            "e" => Ok(PitchClass::E),
            "f" => Ok(PitchClass::F),
            "f#" | "F#" => Ok(PitchClass::FSharp),
            "g" => Ok(PitchClass::G),
            "g#" | "G#" => Ok(PitchClass::GSharp),
            "a" => Ok(PitchClass::A),
            "a#" | "A#" => Ok(PitchClass::ASharp),
            "b" => Ok(PitchClass::B),
            _ => Err(ParseError::InvalidPitchClass(s.to_string())),
        }
    }
}

/// Parse errors for a single line
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    InvalidLine(String),
    InvalidTimestep(String),
    InvalidEvent(String),
    InvalidChannel(String),
    InvalidPitch(String),
    InvalidPitchClass(String),
    InvalidDirection(String),
    InvalidValue(String),
    LateDivision,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidLine(s) => write!(f, "Invalid line: {}", s),
            ParseError::InvalidTimestep(s) => write!(f, "Invalid timestep: {}", s),
            ParseError::InvalidEvent(s) => write!(f, "Invalid event: {}", s),
            ParseError::InvalidChannel(s) => write!(f, "Invalid channel: {}", s),
            ParseError::InvalidPitch(s) => write!(f, "Invalid pitch: {}", s),
            ParseError::InvalidPitchClass(s) => write!(f, "Invalid pitch class: {}", s),
            ParseError::InvalidDirection(s) => write!(f, "Invalid direction: {}", s),
            ParseError::InvalidValue(s) => write!(f, "Invalid value: {}", s),
            ParseError::LateDivision => write!(f, "division must come before the first tick"),
        }
    }
}

impl std::error::Error for ParseError {}

/// One event as written in a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreEvent {
    Channel(ChannelEvent),
    Tempo(u32),
    Division(u16),
}

/// A line with its tick delta
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreLine {
    /// Ticks since previous line
    pub delta: u64,
    pub events: Vec<ScoreEvent>,
}

/// A parsed score
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    pub division: u16,
    pub tempos: Vec<Tempo>,
    /// Channel events in tick order
    pub events: Vec<ChannelEvent>,
}

impl Score {
    pub fn tempo_map(&self) -> TempoMap {
        TempoMap::new(self.division, self.tempos.iter().copied())
    }
}

fn parse_number<T: FromStr>(s: &str) -> std::result::Result<T, ParseError> {
    s.trim()
        .parse::<T>()
        .map_err(|_| ParseError::InvalidValue(s.to_string()))
}

/// Parse a pitch: a MIDI number or <octave><note>
fn parse_pitch(s: &str) -> std::result::Result<u8, ParseError> {
    if s.chars().all(|c| c.is_ascii_digit()) {
        return match s.parse::<u8>() {
            Ok(p) if p <= 127 => Ok(p),
            _ => Err(ParseError::InvalidPitch(s.to_string())),
        };
    }

    let mut chars = s.chars();
    let octave = chars
        .next()
        .and_then(|c| c.to_digit(10))
        .ok_or_else(|| ParseError::InvalidPitch(s.to_string()))?;
    let pitch_class = PitchClass::from_str(chars.as_str())?;

    let pitch = (octave + 1) * 12 + pitch_class.semitone() as u32;
    u8::try_from(pitch)
        .ok()
        .filter(|&p| p <= 127)
        .ok_or_else(|| ParseError::InvalidPitch(s.to_string()))
}

/// Parse the part after `<channel>:`
fn parse_channel_event(
    channel: u8,
    body: &str,
    tick: u64,
) -> std::result::Result<ChannelEvent, ParseError> {
    if let Some(program) = body.strip_prefix("program=") {
        return Ok(ChannelEvent::Program {
            tick,
            channel,
            program: parse_number(program)?,
        });
    }
    if let Some(value) = body.strip_prefix("bend=") {
        let value: u16 = parse_number(value)?;
        if value > 16383 {
            return Err(ParseError::InvalidValue(body.to_string()));
        }
        return Ok(ChannelEvent::PitchBend {
            tick,
            channel,
            value,
        });
    }
    if let Some(control) = body.strip_prefix("cc") {
        let (controller, value) = control
            .split_once('=')
            .ok_or_else(|| ParseError::InvalidEvent(body.to_string()))?;
        return Ok(ChannelEvent::Control {
            tick,
            channel,
            controller: parse_number(controller)?,
            value: parse_number(value)?,
        });
    }

    let (note, velocity) = match body.split_once('@') {
        Some((note, velocity)) => (note, Some(parse_number::<u8>(velocity)?)),
        None => (body, None),
    };
    // Last character must be 'd' (down) or 'u' (up)
    let Some((split, _)) = note.char_indices().last() else {
        return Err(ParseError::InvalidEvent(body.to_string()));
    };
    let (pitch_part, direction) = note.split_at(split);
    let pitch = parse_pitch(pitch_part)?;
    match direction {
        "d" => Ok(ChannelEvent::Note(MidiNoteEvent::On {
            tick,
            channel,
            pitch,
            velocity: velocity.unwrap_or(DEFAULT_VELOCITY).min(127),
        })),
        "u" => Ok(ChannelEvent::Note(MidiNoteEvent::Off {
            tick,
            channel,
            pitch,
        })),
        _ => Err(ParseError::InvalidDirection(direction.to_string())),
    }
}

/// Parse a single event string
fn parse_event(s: &str, tick: u64) -> std::result::Result<ScoreEvent, ParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ParseError::InvalidEvent("empty event".to_string()));
    }

    if let Some(tempo) = s.strip_prefix("tempo=") {
        let micros: u32 = parse_number(tempo)?;
        if micros == 0 {
            return Err(ParseError::InvalidValue(s.to_string()));
        }
        return Ok(ScoreEvent::Tempo(micros));
    }
    if let Some(division) = s.strip_prefix("division=") {
        return Ok(ScoreEvent::Division(parse_number(division)?));
    }

    let (channel, body) = s
        .split_once(':')
        .ok_or_else(|| ParseError::InvalidEvent(s.to_string()))?;
    let channel = match channel.trim().parse::<u8>() {
        Ok(c) if c < 16 => c,
        _ => return Err(ParseError::InvalidChannel(channel.to_string())),
    };
    parse_channel_event(channel, body.trim(), tick).map(ScoreEvent::Channel)
}

/// Parse a line of the score format
///
/// Events carry `tick`, the absolute tick of this line after its delta.
/// Format: +<delta>| event1, event2, ...  # comment
pub fn parse_line(line: &str, previous_tick: u64) -> std::result::Result<ScoreLine, ParseError> {
    // Split on " #" to preserve sharp signs in notes like "4c#d"
    let line = line.split(" #").next().unwrap_or(line).trim();

    if line.is_empty() {
        return Ok(ScoreLine {
            delta: 0,
            events: vec![],
        });
    }

    let (timestep_part, events_part) = line.split_once('|').ok_or_else(|| {
        ParseError::InvalidLine("expected format: +<delta>| events".to_string())
    })?;

    let timestep_part = timestep_part.trim();
    let delta = timestep_part
        .strip_prefix('+')
        .ok_or_else(|| ParseError::InvalidTimestep("timestep must start with +".to_string()))?
        .parse::<u64>()
        .map_err(|_| ParseError::InvalidTimestep(timestep_part.to_string()))?;

    let tick = previous_tick + delta;
    let events = events_part
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_event(s, tick))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(ScoreLine { delta, events })
}

/// Parse a full score
pub fn parse_score(text: &str) -> Result<Score> {
    let mut score = Score {
        division: DEFAULT_DIVISION,
        tempos: Vec::new(),
        events: Vec::new(),
    };
    let mut tick = 0u64;

    for (number, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let parsed = parse_line(trimmed, tick).map_err(|e| Error::Score {
            line: number + 1,
            reason: e.to_string(),
        })?;
        tick += parsed.delta;

        for event in parsed.events {
            match event {
                ScoreEvent::Channel(e) => score.events.push(e),
                ScoreEvent::Tempo(micros) => score.tempos.push(Tempo::new(tick, micros)),
                ScoreEvent::Division(_) if tick > 0 => {
                    return Err(Error::Score {
                        line: number + 1,
                        reason: ParseError::LateDivision.to_string(),
                    })
                }
                ScoreEvent::Division(division) => score.division = division.max(1),
            }
        }
    }

    Ok(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::Ticked;

    #[test]
    fn test_parse_pitch_class() {
        assert_eq!(PitchClass::from_str("c").unwrap(), PitchClass::C);
        assert_eq!(PitchClass::from_str("c#").unwrap(), PitchClass::CSharp);
        assert_eq!(PitchClass::from_str("C#").unwrap(), PitchClass::CSharp);
        assert!(PitchClass::from_str("h").is_err());
    }

    #[test]
    fn test_parse_pitch() {
        assert_eq!(parse_pitch("60").unwrap(), 60);
        assert_eq!(parse_pitch("4c").unwrap(), 60);
        assert_eq!(parse_pitch("4c#").unwrap(), 61);
        assert_eq!(parse_pitch("3a").unwrap(), 57);
        assert!(parse_pitch("200").is_err());
        assert!(parse_pitch("xc").is_err());
    }

    #[test]
    fn test_parse_note_events() {
        let event = parse_event("0:60d@90", 10).unwrap();
        assert_eq!(
            event,
            ScoreEvent::Channel(ChannelEvent::Note(MidiNoteEvent::On {
                tick: 10,
                channel: 0,
                pitch: 60,
                velocity: 90
            }))
        );

        let event = parse_event("3:4eu", 20).unwrap();
        assert_eq!(
            event,
            ScoreEvent::Channel(ChannelEvent::Note(MidiNoteEvent::Off {
                tick: 20,
                channel: 3,
                pitch: 64
            }))
        );

        match parse_event("9:38d", 0).unwrap() {
            ScoreEvent::Channel(ChannelEvent::Note(note)) => {
                assert_eq!(note.velocity(), DEFAULT_VELOCITY)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_control_events() {
        assert_eq!(
            parse_event("1:program=57", 0).unwrap(),
            ScoreEvent::Channel(ChannelEvent::Program {
                tick: 0,
                channel: 1,
                program: 57
            })
        );
        assert_eq!(
            parse_event("1:bend=16383", 5).unwrap(),
            ScoreEvent::Channel(ChannelEvent::PitchBend {
                tick: 5,
                channel: 1,
                value: 16383
            })
        );
        assert_eq!(
            parse_event("1:cc1=64", 5).unwrap(),
            ScoreEvent::Channel(ChannelEvent::Control {
                tick: 5,
                channel: 1,
                controller: 1,
                value: 64
            })
        );
        assert_eq!(parse_event("tempo=400000", 0).unwrap(), ScoreEvent::Tempo(400000));
    }

    #[test]
    fn test_parse_line() {
        let line = parse_line("+480| 0:60u, 0:64d  # a comment", 0).unwrap();
        assert_eq!(line.delta, 480);
        assert_eq!(line.events.len(), 2);
    }

    #[test]
    fn test_invalid_lines() {
        assert!(parse_line("1| 0:60d", 0).is_err());
        assert!(parse_line("+abc| 0:60d", 0).is_err());
        assert!(parse_line("+1 0:60d", 0).is_err());
        assert!(parse_event("0:60x", 0).is_err());
        assert!(parse_event("16:60d", 0).is_err());
        assert!(parse_event("60d", 0).is_err());
        assert!(parse_event("0:bend=20000", 0).is_err());
        assert!(parse_event("tempo=0", 0).is_err());
    }

    #[test]
    fn test_parse_score() {
        let text = r#"
# two notes on a trumpet
+0| division=960, tempo=500000, 0:program=56
+0| 0:60d@100
+960| 0:60u, 0:64d   # second note
+960| 0:64u
        "#;
        let score = parse_score(text).unwrap();
        assert_eq!(score.division, 960);
        assert_eq!(score.tempos, vec![Tempo::new(0, 500000)]);
        assert_eq!(score.events.len(), 5);
        assert_eq!(score.events[4].tick(), 1920);

        let map = score.tempo_map();
        assert!((map.seconds_at(1920) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_score_error_has_line_number() {
        let text = "+0| 0:60d\n+10| 0:60q";
        match parse_score(text) {
            Err(Error::Score { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_late_division_rejected() {
        assert!(parse_score("+0| 0:60d\n+10| division=96").is_err());
    }
}
