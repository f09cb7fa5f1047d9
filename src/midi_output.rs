//! MIDI output instruments.
//!
//! All instruments loaded through one [`MidiLoader`] share a single output
//! thread. Messages carry an absolute clock time and are held in a min-heap
//! until the clock reaches it.

use crate::clock::ClockSource;
use crate::instrument::{Instrument, InstrumentError, InstrumentLoader};
use crate::pitch::midi_note;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info, warn};
use midir::{MidiOutput, MidiOutputConnection};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const CLIENT_NAME: &str = "lookaheadrs-output";
const DRUM_CHANNEL: u8 = 9;
const MAX_WAIT: Duration = Duration::from_millis(2);

/// General MIDI program names, as used by soundfont players.
pub const GM_INSTRUMENTS: [&str; 128] = [
    "acoustic_grand_piano", "bright_acoustic_piano", "electric_grand_piano", "honkytonk_piano",
    "electric_piano_1", "electric_piano_2", "harpsichord", "clavinet",
    "celesta", "glockenspiel", "music_box", "vibraphone",
    "marimba", "xylophone", "tubular_bells", "dulcimer",
    "drawbar_organ", "percussive_organ", "rock_organ", "church_organ",
    "reed_organ", "accordion", "harmonica", "tango_accordion",
    "acoustic_guitar_nylon", "acoustic_guitar_steel", "electric_guitar_jazz", "electric_guitar_clean",
    "electric_guitar_muted", "overdriven_guitar", "distortion_guitar", "guitar_harmonics",
    "acoustic_bass", "electric_bass_finger", "electric_bass_pick", "fretless_bass",
    "slap_bass_1", "slap_bass_2", "synth_bass_1", "synth_bass_2",
    "violin", "viola", "cello", "contrabass",
    "tremolo_strings", "pizzicato_strings", "orchestral_harp", "timpani",
    "string_ensemble_1", "string_ensemble_2", "synth_strings_1", "synth_strings_2",
    "choir_aahs", "voice_oohs", "synth_choir", "orchestra_hit",
    "trumpet", "trombone", "tuba", "muted_trumpet",
    "french_horn", "brass_section", "synth_brass_1", "synth_brass_2",
    "soprano_sax", "alto_sax", "tenor_sax", "baritone_sax",
    "oboe", "english_horn", "bassoon", "clarinet",
    "piccolo", "flute", "recorder", "pan_flute",
    "blown_bottle", "shakuhachi", "whistle", "ocarina",
    "lead_1_square", "lead_2_sawtooth", "lead_3_calliope", "lead_4_chiff",
    "lead_5_charang", "lead_6_voice", "lead_7_fifths", "lead_8_bass__lead",
    "pad_1_new_age", "pad_2_warm", "pad_3_polysynth", "pad_4_choir",
    "pad_5_bowed", "pad_6_metallic", "pad_7_halo", "pad_8_sweep",
    "fx_1_rain", "fx_2_soundtrack", "fx_3_crystal", "fx_4_atmosphere",
    "fx_5_brightness", "fx_6_goblins", "fx_7_echoes", "fx_8_scifi",
    "sitar", "banjo", "shamisen", "koto",
    "kalimba", "bagpipe", "fiddle", "shanai",
    "tinkle_bell", "agogo", "steel_drums", "woodblock",
    "taiko_drum", "melodic_tom", "synth_drum", "reverse_cymbal",
    "guitar_fret_noise", "breath_noise", "seashore", "bird_tweet",
    "telephone_ring", "helicopter", "applause", "gunshot",
];

/// Program number for a General MIDI name or a bare program number.
pub fn gm_program(id: &str) -> Option<u8> {
    if let Ok(program) = id.parse::<u8>() {
        return (program < 128).then_some(program);
    }
    GM_INSTRUMENTS
        .iter()
        .position(|name| *name == id)
        .map(|index| index as u8)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
    ProgramChange { channel: u8, program: u8 },
    AllNotesOff { channel: u8 },
}

impl MidiMessage {
    pub fn to_bytes(&self) -> Vec<u8> {
        match *self {
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => vec![0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            MidiMessage::NoteOff { channel, note } => vec![0x80 | (channel & 0x0F), note & 0x7F, 0],
            MidiMessage::ProgramChange { channel, program } => {
                vec![0xC0 | (channel & 0x0F), program & 0x7F]
            }
            MidiMessage::AllNotesOff { channel } => vec![0xB0 | (channel & 0x0F), 123, 0],
        }
    }

    fn is_release(&self) -> bool {
        matches!(
            self,
            MidiMessage::NoteOff { .. } | MidiMessage::AllNotesOff { .. }
        )
    }
}

/// Destination for raw MIDI bytes.
pub trait MidiSink {
    fn send(&mut self, bytes: &[u8]) -> Result<(), InstrumentError>;
}

impl MidiSink for MidiOutputConnection {
    fn send(&mut self, bytes: &[u8]) -> Result<(), InstrumentError> {
        MidiOutputConnection::send(self, bytes)
            .map_err(|e| InstrumentError::Connection(e.to_string()))
    }
}

#[derive(Debug)]
struct TimedMessage {
    at: f64,
    seq: u64,
    message: MidiMessage,
}

impl PartialEq for TimedMessage {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TimedMessage {}

impl PartialOrd for TimedMessage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimedMessage {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at
            .total_cmp(&other.at)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Handle for queueing messages on the output thread.
#[derive(Clone)]
pub struct MidiDispatcher {
    tx: Sender<TimedMessage>,
    seq: Arc<AtomicU64>,
}

impl MidiDispatcher {
    /// Starts the output thread. `connect` runs on that thread and opens the sink.
    pub fn spawn<F, K>(clock: Arc<dyn ClockSource>, connect: F) -> Result<Self, InstrumentError>
    where
        F: FnOnce() -> Result<K, InstrumentError> + Send + 'static,
        K: MidiSink,
    {
        let (tx, rx) = channel::unbounded();
        let (ready_tx, ready_rx) = channel::bounded(1);

        thread::Builder::new()
            .name("midi-output".to_string())
            .spawn(move || match connect() {
                Ok(sink) => {
                    let _ = ready_tx.send(Ok(()));
                    run_output(rx, clock, sink);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| InstrumentError::Connection(e.to_string()))?;

        ready_rx
            .recv()
            .map_err(|e| InstrumentError::Connection(e.to_string()))??;

        Ok(MidiDispatcher {
            tx,
            seq: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Queues `message` to be sent once the clock reaches `at`.
    pub fn send_at(&self, at: f64, message: MidiMessage) {
        let seq = self.seq.fetch_add(1, AtomicOrdering::Relaxed);
        if self.tx.send(TimedMessage { at, seq, message }).is_err() {
            error!("MIDI output thread is gone, message dropped");
        }
    }
}

fn send_message<K: MidiSink>(sink: &mut K, message: &MidiMessage) {
    debug!("Sending MIDI {:?}", message);
    if let Err(e) = sink.send(&message.to_bytes()) {
        error!("Failed to send MIDI message: {}", e);
    }
}

fn run_output<K: MidiSink>(rx: Receiver<TimedMessage>, clock: Arc<dyn ClockSource>, mut sink: K) {
    info!("MIDI output thread started");
    let mut queue: BinaryHeap<Reverse<TimedMessage>> = BinaryHeap::new();

    loop {
        let now = clock.now();
        while queue.peek().is_some_and(|Reverse(next)| next.at <= now) {
            if let Some(Reverse(due)) = queue.pop() {
                send_message(&mut sink, &due.message);
            }
        }

        let wait = queue.peek().map_or(MAX_WAIT, |Reverse(next)| {
            Duration::from_secs_f64((next.at - now).clamp(0.0, MAX_WAIT.as_secs_f64()))
        });

        match rx.recv_timeout(wait) {
            Ok(message) => queue.push(Reverse(message)),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    // Release anything still sounding rather than leave notes hanging
    let releases: Vec<MidiMessage> = queue
        .into_sorted_vec()
        .into_iter()
        .rev()
        .map(|Reverse(timed)| timed.message)
        .filter(MidiMessage::is_release)
        .collect();
    for message in &releases {
        send_message(&mut sink, message);
    }
    info!("MIDI output thread stopping");
}

/// One MIDI channel driven by the scheduler.
pub struct MidiInstrument {
    name: String,
    channel: u8,
    dispatcher: MidiDispatcher,
    sounding: Vec<u8>,
}

impl Instrument for MidiInstrument {
    fn play(&mut self, pitch: &str, at: f64) {
        self.play_with_velocity(pitch, at, crate::config::DEFAULT_VELOCITY);
    }

    fn play_with_velocity(&mut self, pitch: &str, at: f64, velocity: u8) {
        match midi_note(pitch) {
            Ok(note) => {
                self.dispatcher.send_at(
                    at,
                    MidiMessage::NoteOn {
                        channel: self.channel,
                        note,
                        velocity,
                    },
                );
                self.sounding.push(note);
            }
            Err(e) => warn!("[{}] cannot play pitch: {}", self.name, e),
        }
    }

    fn stop(&mut self, at: f64) {
        for note in self.sounding.drain(..) {
            self.dispatcher.send_at(
                at,
                MidiMessage::NoteOff {
                    channel: self.channel,
                    note,
                },
            );
        }
    }
}

impl Drop for MidiInstrument {
    fn drop(&mut self) {
        self.dispatcher.send_at(
            f64::NEG_INFINITY,
            MidiMessage::AllNotesOff {
                channel: self.channel,
            },
        );
    }
}

/// Loads General MIDI instruments onto successive channels of one output.
pub struct MidiLoader {
    dispatcher: MidiDispatcher,
    next_channel: AtomicU8,
}

impl MidiLoader {
    /// Connects to the output port whose name contains `device`, or the first
    /// available port.
    pub fn connect(device: Option<&str>, clock: Arc<dyn ClockSource>) -> Result<Self, InstrumentError> {
        let device = device.map(str::to_string);
        let dispatcher = MidiDispatcher::spawn(clock, move || connect_output(device.as_deref()))?;
        Ok(Self::new(dispatcher))
    }

    pub fn new(dispatcher: MidiDispatcher) -> Self {
        MidiLoader {
            dispatcher,
            next_channel: AtomicU8::new(0),
        }
    }

    fn allocate_channel(&self) -> u8 {
        loop {
            let raw = self.next_channel.fetch_add(1, AtomicOrdering::SeqCst);
            let channel = raw % 16;
            if channel == DRUM_CHANNEL {
                continue;
            }
            if raw > 15 {
                warn!("All MIDI channels in use, sharing channel {}", channel);
            }
            return channel;
        }
    }
}

impl InstrumentLoader for MidiLoader {
    fn load(&self, id: &str) -> Result<Box<dyn Instrument>, InstrumentError> {
        let program = gm_program(id).ok_or_else(|| InstrumentError::UnknownInstrument(id.to_string()))?;
        let channel = self.allocate_channel();
        self.dispatcher.send_at(
            f64::NEG_INFINITY,
            MidiMessage::ProgramChange { channel, program },
        );
        info!(
            "Loaded MIDI instrument '{}' (program {}) on channel {}",
            id, program, channel
        );
        Ok(Box::new(MidiInstrument {
            name: id.to_string(),
            channel,
            dispatcher: self.dispatcher.clone(),
            sounding: Vec::new(),
        }))
    }
}

fn connect_output(device: Option<&str>) -> Result<MidiOutputConnection, InstrumentError> {
    let connection_error = |e: &dyn std::fmt::Display| InstrumentError::Connection(e.to_string());
    let midi_out = MidiOutput::new(CLIENT_NAME).map_err(|e| connection_error(&e))?;

    let out_ports = midi_out.ports();
    let port = match device {
        Some(name) => out_ports
            .iter()
            .find(|p| midi_out.port_name(p).unwrap_or_default().contains(name))
            .ok_or_else(|| InstrumentError::Connection(format!("MIDI output device '{}' not found", name)))?,
        None => out_ports
            .first()
            .ok_or_else(|| InstrumentError::Connection("No MIDI output ports available".to_string()))?,
    };

    let port_name = midi_out.port_name(port).map_err(|e| connection_error(&e))?;
    info!("Connecting to MIDI output port: {}", port_name);
    midi_out
        .connect(port, "lookaheadrs-output-conn")
        .map_err(|e| connection_error(&e))
}

pub fn list_output_ports() -> Result<Vec<String>, InstrumentError> {
    let midi_out = MidiOutput::new("lookaheadrs-port-lister")
        .map_err(|e| InstrumentError::Connection(e.to_string()))?;
    Ok(midi_out
        .ports()
        .iter()
        .filter_map(|p| midi_out.port_name(p).ok())
        .collect())
}
