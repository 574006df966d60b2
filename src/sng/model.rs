//! In-memory `SongData` model the SNG parser populates: one record type per section, plus the
//! `TechniqueFlags` bitmask shared by notes and chords.

use bitflags::bitflags;

bitflags! {
    /// The 32-bit per-note/per-chord technique mask. Named bits are the subset the XML emitter
    /// reads; unnamed bits are preserved in the raw value but have no emission effect.
    #[derive(Default)]
    pub struct TechniqueFlags: u32 {
        const CHORD             = 0x0000_0002;
        const FRETHANDMUTE      = 0x0000_0008;
        const TREMOLO           = 0x0000_0010;
        const HARMONIC          = 0x0000_0020;
        const PALMMUTE          = 0x0000_0040;
        const SLAP              = 0x0000_0080;
        const PLUCK             = 0x0000_0100;
        const HAMMERON          = 0x0000_0200;
        const PULLOFF           = 0x0000_0400;
        const SLIDE             = 0x0000_0800;
        const BEND              = 0x0000_1000;
        const TAP               = 0x0000_4000;
        const PINCHHARMONIC     = 0x0000_8000;
        const VIBRATO           = 0x0001_0000;
        const MUTE              = 0x0002_0000;
        const IGNORE            = 0x0004_0000;
        const RIGHTHAND         = 0x0010_0000;
        const HIGHDENSITY       = 0x0020_0000;
        const SLIDEUNPITCHEDTO  = 0x0040_0000;
        const ACCENT            = 0x0400_0000;
        const PARENT            = 0x0800_0000;
        const CHORDPANEL        = 0x8000_0000;
    }
}

/// Maps the format's `0xFF`-means-absent sentinel byte to `Option<u8>`.
pub fn sentinel_byte(raw: u8) -> Option<u8> {
    if raw == 0xFF {
        None
    } else {
        Some(raw)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Bpm {
    pub time: f32,
    pub measure: i16,
    pub beat: i16,
    pub phrase_iteration: i32,
    pub mask: i32,
}

#[derive(Debug, Clone, Default)]
pub struct Phrase {
    pub solo: u8,
    pub disparity: u8,
    pub ignore: u8,
    pub max_difficulty: i32,
    pub phrase_iteration_links: i32,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct Chord {
    pub mask: TechniqueFlags,
    pub frets: [Option<u8>; 6],
    pub fingers: [Option<u8>; 6],
    pub notes: [i32; 6],
    pub name: String,
}

impl Chord {
    pub fn display_name(&self) -> String {
        match self.mask.bits() {
            1 => format!("{}-arp", self.name),
            2 => format!("{}-nop", self.name),
            _ => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BendValue {
    pub time: f32,
    pub step: f32,
}

#[derive(Debug, Clone, Default)]
pub struct ChordNotesEntry {
    pub mask: TechniqueFlags,
    pub bend_values: Vec<BendValue>,
    pub slide_to: Option<u8>,
    pub slide_unpitch_to: Option<u8>,
    pub vibrato: i16,
}

#[derive(Debug, Clone, Default)]
pub struct ChordNotes {
    pub strings: [ChordNotesEntry; 6],
}

#[derive(Debug, Clone, Default)]
pub struct Vocal {
    pub time: f32,
    pub note: i32,
    pub length: f32,
    pub lyric: String,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolsHeader {
    pub unk: [i32; 8],
}

#[derive(Debug, Clone, Default)]
pub struct SymbolsTexture {
    pub font: String,
    pub fontpath_length: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Default)]
pub struct Rect {
    pub y_min: f32,
    pub x_min: f32,
    pub y_max: f32,
    pub x_max: f32,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolDefinition {
    pub text: String,
    pub rect_outer: Rect,
    pub rect_inner: Rect,
}

#[derive(Debug, Clone, Default)]
pub struct PhraseIteration {
    pub phrase_id: i32,
    pub start_time: f32,
    pub next_phrase_time: f32,
    pub difficulty: [i32; 3],
}

#[derive(Debug, Clone, Default)]
pub struct PhraseExtraInfoByLevel {
    pub phrase_id: i32,
    pub difficulty: i32,
    pub level_jump: u8,
}

#[derive(Debug, Clone, Default)]
pub struct NLinkedDifficulty {
    pub level_break: i32,
    pub nld_phrase: Vec<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct Action {
    pub time: f32,
    pub action_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct Event {
    pub time: f32,
    pub event_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct Tone {
    pub time: f32,
    pub tone_id: i32,
}

#[derive(Debug, Clone, Default)]
pub struct Dna {
    pub time: f32,
    pub dna_id: i32,
}

#[derive(Debug, Clone, Default)]
pub struct Section {
    pub name: String,
    pub number: i32,
    pub start_time: f32,
    pub end_time: f32,
    pub start_phrase_iteration_id: i32,
    pub end_phrase_iteration_id: i32,
    pub string_mask: String,
}

#[derive(Debug, Clone, Default)]
pub struct Anchor {
    pub start_beat_time: f32,
    pub end_beat_time: f32,
    pub width: i32,
    pub phrase_iteration_id: i32,
    pub fret_id: u8,
}

#[derive(Debug, Clone, Default)]
pub struct AnchorExtension {
    pub beat_time: f32,
    pub fret_id: u8,
}

/// A timed chord-shape span. Handshape and arpeggio fingerprints share this shape and differ
/// only in which array they came from; the XML emitter merges both arrays by `start_time`.
#[derive(Debug, Clone, Default)]
pub struct Fingerprint {
    pub chord_id: i32,
    pub start_time: f32,
    pub end_time: f32,
}

#[derive(Debug, Clone, Default)]
pub struct Note {
    pub mask: TechniqueFlags,
    pub time: f32,
    pub string_index: u8,
    pub fret_id: u8,
    pub chord_id: i32,
    pub chord_notes_id: i32,
    pub slide_to: Option<u8>,
    pub slide_unpitch_to: Option<u8>,
    pub left_hand: Option<u8>,
    pub tap: u8,
    pub pick_direction: u8,
    pub vibrato: i16,
    pub sustain: f32,
    pub max_bend: f32,
    pub bend_values: Vec<BendValue>,
}

impl Note {
    pub fn is_chord_note(&self) -> bool {
        self.chord_id >= 0 && self.mask.contains(TechniqueFlags::CHORD)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Arrangement {
    pub difficulty: i32,
    pub anchors: Vec<Anchor>,
    pub anchor_extensions: Vec<AnchorExtension>,
    pub handshape_fingerprints: Vec<Fingerprint>,
    pub arpeggio_fingerprints: Vec<Fingerprint>,
    pub notes: Vec<Note>,
    pub average_notes_per_iteration: Vec<f32>,
    pub notes_in_iteration1: Vec<i32>,
    pub notes_in_iteration2: Vec<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub max_score: f64,
    pub max_notes_and_chords: f64,
    pub max_notes_and_chords_real: f64,
    pub points_per_note: f64,
    pub first_beat_length: f32,
    pub start_time: f32,
    pub capo_fret_id: u8,
    pub last_conversion_date_time: String,
    pub part: i16,
    pub song_length: f32,
    pub tuning: Vec<i16>,
    pub max_difficulty: i32,
}

#[derive(Debug, Clone, Default)]
pub struct SongData {
    pub bpms: Vec<Bpm>,
    pub phrases: Vec<Phrase>,
    pub chords: Vec<Chord>,
    pub chord_notes: Vec<ChordNotes>,
    pub vocals: Vec<Vocal>,
    pub symbol_headers: Vec<SymbolsHeader>,
    pub symbol_textures: Vec<SymbolsTexture>,
    pub symbol_definitions: Vec<SymbolDefinition>,
    pub phrase_iterations: Vec<PhraseIteration>,
    pub phrase_extra_info: Vec<PhraseExtraInfoByLevel>,
    pub nlds: Vec<NLinkedDifficulty>,
    pub actions: Vec<Action>,
    pub events: Vec<Event>,
    pub tones: Vec<Tone>,
    pub dnas: Vec<Dna>,
    pub sections: Vec<Section>,
    pub arrangements: Vec<Arrangement>,
    pub metadata: Metadata,
}

impl SongData {
    pub fn is_vocals(&self) -> bool {
        !self.vocals.is_empty()
    }
}
