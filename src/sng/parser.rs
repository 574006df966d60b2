//! Consumes a plaintext SNG buffer in one pass: eighteen length-prefixed sections read in a
//! fixed order, with the vocals-only symbol sections gated on whether vocals is non-empty, and a
//! terminal check that the buffer is consumed exactly with no trailing bytes.

use crate::binary_reader::BinaryReader;
use crate::error::{Error, Result};
use crate::sng::model::*;

pub fn parse(buf: &[u8]) -> Result<SongData> {
    let mut r = BinaryReader::new(buf);
    let mut song = SongData::default();

    song.bpms = read_vec(&mut r, read_bpm)?;
    song.phrases = read_vec(&mut r, read_phrase)?;
    song.chords = read_vec(&mut r, read_chord)?;
    song.chord_notes = read_vec(&mut r, read_chord_notes)?;
    song.vocals = read_vec(&mut r, read_vocal)?;

    if !song.vocals.is_empty() {
        song.symbol_headers = read_vec(&mut r, read_symbols_header)?;
        song.symbol_textures = read_vec(&mut r, read_symbols_texture)?;
        song.symbol_definitions = read_vec(&mut r, read_symbol_definition)?;
    }

    song.phrase_iterations = read_vec(&mut r, read_phrase_iteration)?;
    song.phrase_extra_info = read_vec(&mut r, read_phrase_extra_info)?;
    song.nlds = read_vec(&mut r, read_nld)?;
    song.actions = read_vec(&mut r, read_action)?;
    song.events = read_vec(&mut r, read_event)?;
    song.tones = read_vec(&mut r, read_tone)?;
    song.dnas = read_vec(&mut r, read_dna)?;
    song.sections = read_vec(&mut r, read_section)?;
    song.arrangements = read_vec(&mut r, read_arrangement)?;
    song.metadata = read_metadata(&mut r)?;

    if r.position() != r.len() {
        return Err(Error::TrailingBytes {
            remaining: r.len() - r.position(),
        });
    }

    Ok(song)
}

fn read_vec<T>(
    r: &mut BinaryReader,
    read_one: impl Fn(&mut BinaryReader) -> Result<T>,
) -> Result<Vec<T>> {
    let count = r.read_u32_le()? as usize;
    let mut out = Vec::with_capacity(count.min(1 << 16));
    for _ in 0..count {
        out.push(read_one(r)?);
    }
    Ok(out)
}

fn sentinel(raw: u8) -> Option<u8> {
    sentinel_byte(raw)
}

fn read_bpm(r: &mut BinaryReader) -> Result<Bpm> {
    Ok(Bpm {
        time: r.read_f32_le()?,
        measure: r.read_i16_le()?,
        beat: r.read_i16_le()?,
        phrase_iteration: r.read_i32_le()?,
        mask: r.read_i32_le()?,
    })
}

fn read_phrase(r: &mut BinaryReader) -> Result<Phrase> {
    let solo = r.read_u8()?;
    let disparity = r.read_u8()?;
    let ignore = r.read_u8()?;
    r.skip(1)?; // padding
    let max_difficulty = r.read_i32_le()?;
    let phrase_iteration_links = r.read_i32_le()?;
    let name = r.read_fixed_string(32)?;
    Ok(Phrase {
        solo,
        disparity,
        ignore,
        max_difficulty,
        phrase_iteration_links,
        name,
    })
}

fn read_chord(r: &mut BinaryReader) -> Result<Chord> {
    let mask = TechniqueFlags::from_bits_truncate(r.read_u32_le()?);
    let raw_frets = r.read_array6()?;
    let raw_fingers = r.read_array6()?;
    let mut notes = [0i32; 6];
    for n in &mut notes {
        *n = r.read_i32_le()?;
    }
    let name = r.read_fixed_string(32)?;
    Ok(Chord {
        mask,
        frets: raw_frets.map(sentinel),
        fingers: raw_fingers.map(sentinel),
        notes,
        name,
    })
}

fn read_bend_value(r: &mut BinaryReader) -> Result<BendValue> {
    let time = r.read_f32_le()?;
    let step = r.read_f32_le()?;
    r.skip(4)?; // unk3_0: i16, unk4_0: u8, unk5: u8
    Ok(BendValue { time, step })
}

fn read_chord_notes(r: &mut BinaryReader) -> Result<ChordNotes> {
    let mut masks = [TechniqueFlags::empty(); 6];
    for m in &mut masks {
        *m = TechniqueFlags::from_bits_truncate(r.read_u32_le()?);
    }

    let mut bend_lists: [Vec<BendValue>; 6] = Default::default();
    for list in &mut bend_lists {
        let mut all = Vec::with_capacity(32);
        for _ in 0..32 {
            all.push(read_bend_value(r)?);
        }
        let used_count = r.read_u32_le()? as usize;
        all.truncate(used_count.min(32));
        *list = all;
    }

    let raw_slide_to = r.read_array6()?;
    let raw_slide_unpitch_to = r.read_array6()?;

    let mut vibrato = [0i16; 6];
    for v in &mut vibrato {
        *v = r.read_i16_le()?;
    }

    let mut strings: [ChordNotesEntry; 6] = Default::default();
    for i in 0..6 {
        strings[i] = ChordNotesEntry {
            mask: masks[i],
            bend_values: std::mem::take(&mut bend_lists[i]),
            slide_to: sentinel(raw_slide_to[i]),
            slide_unpitch_to: sentinel(raw_slide_unpitch_to[i]),
            vibrato: vibrato[i],
        };
    }

    Ok(ChordNotes { strings })
}

fn read_vocal(r: &mut BinaryReader) -> Result<Vocal> {
    Ok(Vocal {
        time: r.read_f32_le()?,
        note: r.read_i32_le()?,
        length: r.read_f32_le()?,
        lyric: r.read_fixed_string(48)?,
    })
}

fn read_symbols_header(r: &mut BinaryReader) -> Result<SymbolsHeader> {
    let mut unk = [0i32; 8];
    for u in &mut unk {
        *u = r.read_i32_le()?;
    }
    Ok(SymbolsHeader { unk })
}

fn read_symbols_texture(r: &mut BinaryReader) -> Result<SymbolsTexture> {
    let font = r.read_fixed_string(128)?;
    let fontpath_length = r.read_i32_le()?;
    r.skip(4)?; // unk1_0
    let width = r.read_i32_le()?;
    let height = r.read_i32_le()?;
    Ok(SymbolsTexture {
        font,
        fontpath_length,
        width,
        height,
    })
}

fn read_rect(r: &mut BinaryReader) -> Result<Rect> {
    Ok(Rect {
        y_min: r.read_f32_le()?,
        x_min: r.read_f32_le()?,
        y_max: r.read_f32_le()?,
        x_max: r.read_f32_le()?,
    })
}

fn read_symbol_definition(r: &mut BinaryReader) -> Result<SymbolDefinition> {
    let text = r.read_fixed_string(12)?;
    let rect_outer = read_rect(r)?;
    let rect_inner = read_rect(r)?;
    Ok(SymbolDefinition {
        text,
        rect_outer,
        rect_inner,
    })
}

fn read_phrase_iteration(r: &mut BinaryReader) -> Result<PhraseIteration> {
    let phrase_id = r.read_i32_le()?;
    let start_time = r.read_f32_le()?;
    let next_phrase_time = r.read_f32_le()?;
    let mut difficulty = [0i32; 3];
    for d in &mut difficulty {
        *d = r.read_i32_le()?;
    }
    Ok(PhraseIteration {
        phrase_id,
        start_time,
        next_phrase_time,
        difficulty,
    })
}

fn read_phrase_extra_info(r: &mut BinaryReader) -> Result<PhraseExtraInfoByLevel> {
    let phrase_id = r.read_i32_le()?;
    let difficulty = r.read_i32_le()?;
    r.skip(4)?; // empty
    let level_jump = r.read_u8()?;
    r.skip(3)?; // redundant: i16, padding: u8
    Ok(PhraseExtraInfoByLevel {
        phrase_id,
        difficulty,
        level_jump,
    })
}

fn read_nld(r: &mut BinaryReader) -> Result<NLinkedDifficulty> {
    let level_break = r.read_i32_le()?;
    let phrase_count = r.read_i32_le()?.max(0) as usize;
    let mut nld_phrase = Vec::with_capacity(phrase_count);
    for _ in 0..phrase_count {
        nld_phrase.push(r.read_i32_le()?);
    }
    Ok(NLinkedDifficulty {
        level_break,
        nld_phrase,
    })
}

fn read_action(r: &mut BinaryReader) -> Result<Action> {
    Ok(Action {
        time: r.read_f32_le()?,
        action_name: r.read_fixed_string(256)?,
    })
}

fn read_event(r: &mut BinaryReader) -> Result<Event> {
    Ok(Event {
        time: r.read_f32_le()?,
        event_name: r.read_fixed_string(256)?,
    })
}

fn read_tone(r: &mut BinaryReader) -> Result<Tone> {
    Ok(Tone {
        time: r.read_f32_le()?,
        tone_id: r.read_i32_le()?,
    })
}

fn read_dna(r: &mut BinaryReader) -> Result<Dna> {
    Ok(Dna {
        time: r.read_f32_le()?,
        dna_id: r.read_i32_le()?,
    })
}

fn read_section(r: &mut BinaryReader) -> Result<Section> {
    let name = r.read_fixed_string(32)?;
    let number = r.read_i32_le()?;
    let start_time = r.read_f32_le()?;
    let end_time = r.read_f32_le()?;
    let start_phrase_iteration_id = r.read_i32_le()?;
    let end_phrase_iteration_id = r.read_i32_le()?;
    let string_mask = r.read_fixed_string(36)?;
    Ok(Section {
        name,
        number,
        start_time,
        end_time,
        start_phrase_iteration_id,
        end_phrase_iteration_id,
        string_mask,
    })
}

fn read_anchor(r: &mut BinaryReader) -> Result<Anchor> {
    let start_beat_time = r.read_f32_le()?;
    let end_beat_time = r.read_f32_le()?;
    r.skip(8)?; // unk3_first_note_time, unk4_last_note_time
    let fret_id = r.read_u8()?;
    r.skip(3)?; // padding
    let width = r.read_i32_le()?;
    let phrase_iteration_id = r.read_i32_le()?;
    Ok(Anchor {
        start_beat_time,
        end_beat_time,
        width,
        phrase_iteration_id,
        fret_id,
    })
}

fn read_anchor_extension(r: &mut BinaryReader) -> Result<AnchorExtension> {
    let beat_time = r.read_f32_le()?;
    let fret_id = r.read_u8()?;
    r.skip(4 + 2 + 1)?; // unk2_0: i32, unk3_0: i16, unk4_0: u8
    Ok(AnchorExtension { beat_time, fret_id })
}

fn read_fingerprint(r: &mut BinaryReader) -> Result<Fingerprint> {
    let chord_id = r.read_i32_le()?;
    let start_time = r.read_f32_le()?;
    let end_time = r.read_f32_le()?;
    r.skip(8)?; // unk3_first_note_time, unk4_last_note_time
    Ok(Fingerprint {
        chord_id,
        start_time,
        end_time,
    })
}

fn read_note(r: &mut BinaryReader) -> Result<Note> {
    let note_mask = TechniqueFlags::from_bits_truncate(r.read_u32_le()?);
    r.skip(4)?; // note_flags
    r.skip(4)?; // hash
    let time = r.read_f32_le()?;
    let string_index = r.read_u8()?;
    let fret_id = r.read_u8()?;
    r.skip(2)?; // anchor_fret_id, anchor_width
    let chord_id = r.read_i32_le()?;
    let chord_notes_id = r.read_i32_le()?;
    r.skip(8)?; // phrase_id, phrase_iteration_id
    r.skip(4)?; // finger_print_id[2]: i16
    r.skip(6)?; // next_iter_note, prev_iter_note, parent_prev_note: i16 each
    let slide_to = sentinel(r.read_u8()?);
    let slide_unpitch_to = sentinel(r.read_u8()?);
    let left_hand = sentinel(r.read_u8()?);
    let tap = r.read_u8()?;
    let pick_direction = r.read_u8()?;
    r.skip(2)?; // slap, pluck
    let vibrato = r.read_i16_le()?;
    let sustain = r.read_f32_le()?;
    let max_bend = r.read_f32_le()?;
    let bend_values = read_vec(r, read_bend_value)?;
    Ok(Note {
        mask: note_mask,
        time,
        string_index,
        fret_id,
        chord_id,
        chord_notes_id,
        slide_to,
        slide_unpitch_to,
        left_hand,
        tap,
        pick_direction,
        vibrato,
        sustain,
        max_bend,
        bend_values,
    })
}

fn read_vec_f32(r: &mut BinaryReader, count: usize) -> Result<Vec<f32>> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(r.read_f32_le()?);
    }
    Ok(out)
}

fn read_vec_i32(r: &mut BinaryReader, count: usize) -> Result<Vec<i32>> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(r.read_i32_le()?);
    }
    Ok(out)
}

fn read_arrangement(r: &mut BinaryReader) -> Result<Arrangement> {
    let difficulty = r.read_i32_le()?;
    let anchors = read_vec(r, read_anchor)?;
    let anchor_extensions = read_vec(r, read_anchor_extension)?;
    let handshape_fingerprints = read_vec(r, read_fingerprint)?;
    let arpeggio_fingerprints = read_vec(r, read_fingerprint)?;
    let notes = read_vec(r, read_note)?;
    let phrase_count = r.read_i32_le()?.max(0) as usize;
    let average_notes_per_iteration = read_vec_f32(r, phrase_count)?;
    let phrase_iteration_count1 = r.read_i32_le()?.max(0) as usize;
    let notes_in_iteration1 = read_vec_i32(r, phrase_iteration_count1)?;
    let phrase_iteration_count2 = r.read_i32_le()?.max(0) as usize;
    let notes_in_iteration2 = read_vec_i32(r, phrase_iteration_count2)?;
    Ok(Arrangement {
        difficulty,
        anchors,
        anchor_extensions,
        handshape_fingerprints,
        arpeggio_fingerprints,
        notes,
        average_notes_per_iteration,
        notes_in_iteration1,
        notes_in_iteration2,
    })
}

fn read_metadata(r: &mut BinaryReader) -> Result<Metadata> {
    let max_score = r.read_f64_le()?;
    let max_notes_and_chords = r.read_f64_le()?;
    let max_notes_and_chords_real = r.read_f64_le()?;
    let points_per_note = r.read_f64_le()?;
    let first_beat_length = r.read_f32_le()?;
    let start_time = r.read_f32_le()?;
    let capo_fret_id = r.read_u8()?;
    let last_conversion_date_time = r.read_fixed_string(32)?;
    let part = r.read_i16_le()?;
    let song_length = r.read_f32_le()?;
    let string_count = r.read_i32_le()?.max(0) as usize;
    let mut tuning = Vec::with_capacity(string_count);
    for _ in 0..string_count {
        tuning.push(r.read_i16_le()?);
    }
    r.skip(8)?; // unk11_first_note_time, unk12_first_note_time
    let max_difficulty = r.read_i32_le()?;
    Ok(Metadata {
        max_score,
        max_notes_and_chords,
        max_notes_and_chords_real,
        points_per_note,
        first_beat_length,
        start_time,
        capo_fret_id,
        last_conversion_date_time,
        part,
        song_length,
        tuning,
        max_difficulty,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_sng_bytes() -> Vec<u8> {
        let mut buf = Vec::new();
        // 14 always-present array sections with count = 0, vocals (section 5) empty so no
        // symbol sections, then the fixed-size Metadata record.
        for _ in 0..14 {
            buf.extend_from_slice(&0u32.to_le_bytes());
        }
        // Metadata: 4*f64 + 2*f32 + u8 + 32B string + i16 + f32 + i32(string_count=0) + 2*f32 + i32
        buf.extend_from_slice(&[0u8; 8 * 4]); // 4 f64
        buf.extend_from_slice(&[0u8; 4 * 2]); // first_beat_length, start_time
        buf.push(0); // capo_fret_id
        buf.extend_from_slice(&[0u8; 32]); // last_conversion_date_time
        buf.extend_from_slice(&0i16.to_le_bytes()); // part
        buf.extend_from_slice(&0f32.to_le_bytes()); // song_length
        buf.extend_from_slice(&0i32.to_le_bytes()); // string_count = 0
        buf.extend_from_slice(&[0u8; 8]); // unk11, unk12
        buf.extend_from_slice(&0i32.to_le_bytes()); // max_difficulty
        buf
    }

    #[test]
    fn parses_minimal_song_with_no_arrangements() {
        let buf = empty_sng_bytes();
        let song = parse(&buf).unwrap();
        assert!(song.bpms.is_empty());
        assert!(!song.is_vocals());
        assert_eq!(song.arrangements.len(), 0);
    }

    #[test]
    fn trailing_byte_is_reported() {
        let mut buf = empty_sng_bytes();
        buf.push(0xAA);
        let err = parse(&buf).unwrap_err();
        assert!(matches!(err, Error::TrailingBytes { remaining: 1 }));
    }

    #[test]
    fn truncated_buffer_reports_read_past_end() {
        let mut buf = empty_sng_bytes();
        buf.pop();
        let err = parse(&buf).unwrap_err();
        assert!(matches!(err, Error::ReadPastEnd { .. }));
    }

    #[test]
    fn sentinel_byte_maps_0xff_to_none() {
        assert_eq!(sentinel_byte(0xFF), None);
        assert_eq!(sentinel_byte(3), Some(3));
    }
}
