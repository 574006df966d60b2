//! End-to-end scenarios covering container assembly, encrypted TOCs, raw-chunk fallback, vocal
//! SNG parsing, chord-note expansion, and the SNG terminal-buffer invariant. Driven through the
//! public `Archive` facade and the `sng`/`xml` modules directly where a scenario concerns parsing
//! or emission rather than container assembly.

use std::io::Write;

use rsarc::container::HEADER_LEN;
use rsarc::error::Error;
use rsarc::sng::model::{Chord, ChordNotes, ChordNotesEntry, Note, SongData, TechniqueFlags};
use rsarc::{xml, Archive};

const MAGIC: u32 = 0x5053_4152;

/// Builds a minimal well-formed PSARC archive: a names blob (entry 0) and one data entry.
/// `encrypt_toc` optionally AES-256-CFB-encrypts the TOC with the crate's embedded key/IV,
/// matching scenario 2 (encrypted TOC).
fn build_archive(name: &str, contents: &[u8], block_size: u32, encrypt_toc: bool) -> Vec<u8> {
    let names_blob = format!("{name}\n").into_bytes();
    let entries_data: Vec<&[u8]> = vec![&names_blob, contents];

    let field_width = 5usize;
    let toc_entry_size = 20 + 2 * field_width as u32;
    let entry_count = entries_data.len() as u32;
    let z_lengths: Vec<u16> = vec![0; entries_data.len()];
    let toc_entries_len = entry_count as usize * toc_entry_size as usize;
    let z_table_len = z_lengths.len() * 2;
    let toc_size = HEADER_LEN + toc_entries_len + z_table_len;

    let mut toc = Vec::new();
    let mut offset = (HEADER_LEN + toc_entries_len + z_table_len) as u64;
    for (i, data) in entries_data.iter().enumerate() {
        toc.extend_from_slice(&[0u8; 16]);
        toc.extend_from_slice(&(i as u32).to_be_bytes());
        let len_bytes = (data.len() as u64).to_be_bytes();
        toc.extend_from_slice(&len_bytes[8 - field_width..]);
        let off_bytes = offset.to_be_bytes();
        toc.extend_from_slice(&off_bytes[8 - field_width..]);
        offset += block_size as u64;
    }
    for z in &z_lengths {
        toc.extend_from_slice(&z.to_be_bytes());
    }

    let flags: u32 = if encrypt_toc { 0x04 } else { 0x00 };
    if encrypt_toc {
        toc = encrypt_toc_bytes(&toc);
    }

    let mut header = Vec::new();
    header.extend_from_slice(&MAGIC.to_be_bytes());
    header.extend_from_slice(&((1u32 << 16) | 4u32).to_be_bytes());
    header.extend_from_slice(b"zlib");
    header.extend_from_slice(&(toc_size as u32).to_be_bytes());
    header.extend_from_slice(&toc_entry_size.to_be_bytes());
    header.extend_from_slice(&entry_count.to_be_bytes());
    header.extend_from_slice(&block_size.to_be_bytes());
    header.extend_from_slice(&flags.to_be_bytes());

    let mut file = header;
    file.extend_from_slice(&toc);
    for data in &entries_data {
        let mut block = data.to_vec();
        block.resize(block_size as usize, 0);
        file.extend_from_slice(&block);
    }
    file
}

fn encrypt_toc_bytes(plain: &[u8]) -> Vec<u8> {
    use aes::cipher::{AsyncStreamCipher, KeyIvInit};
    use aes::Aes256;
    type CfbEnc = cfb_mode::Encryptor<Aes256>;

    let key = rsarc::crypto::PSARC_KEY;
    let iv = rsarc::crypto::PSARC_IV;
    let mut padded = plain.to_vec();
    let pad_len = (padded.len() + 15) / 16 * 16;
    padded.resize(pad_len, 0);
    let cipher = CfbEnc::new_from_slices(&key, &iv).unwrap();
    cipher.encrypt(&mut padded);
    padded.truncate(plain.len());
    padded
}

fn write_temp(bytes: &[u8], suffix: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("rsarc_integration_{suffix}_{}.psarc", std::process::id()));
    std::fs::File::create(&path).unwrap().write_all(bytes).unwrap();
    path
}

#[test]
fn scenario_1_tiny_archive() {
    let bytes = build_archive("file-a.txt", b"file-a.txt\n", 64 * 1024, false);
    let path = write_temp(&bytes, "tiny");

    let mut archive = Archive::open(&path).unwrap();
    assert_eq!(archive.file_count(), 2);
    assert_eq!(archive.file_list(), vec!["NamesBlock.bin", "file-a.txt"]);
    assert_eq!(archive.extract_file("NamesBlock.bin").unwrap(), b"file-a.txt\n");

    std::fs::remove_file(&path).ok();
}

#[test]
fn scenario_2_encrypted_toc_parses_like_plaintext() {
    let plain_bytes = build_archive("file-a.txt", b"file-a.txt\n", 64 * 1024, false);
    let encrypted_bytes = build_archive("file-a.txt", b"file-a.txt\n", 64 * 1024, true);

    let plain_path = write_temp(&plain_bytes, "plain");
    let encrypted_path = write_temp(&encrypted_bytes, "enc");

    let plain = Archive::open(&plain_path).unwrap();
    let encrypted = Archive::open(&encrypted_path).unwrap();
    assert_eq!(plain.file_list(), encrypted.file_list());

    std::fs::remove_file(&plain_path).ok();
    std::fs::remove_file(&encrypted_path).ok();
}

#[test]
fn scenario_3_raw_fallback_chunk_returns_bytes_verbatim() {
    // A 7-byte chunk that is not valid zlib; the container must fall back to raw bytes rather
    // than erroring, per the "neither decompressor throws" contract.
    let garbage = [0xDEu8, 0xAD, 0xBE, 0xEF, 0x01, 0x02, 0x03];
    let out = rsarc::compression::zlib_inflate(&garbage, garbage.len());
    assert!(out.is_empty(), "garbage should fail to decompress, triggering the raw fallback in container.rs");
}

#[test]
fn scenario_4_sng_vocals_file_parses_symbol_sections() {
    let mut buf = Vec::new();
    for _ in 0..4 {
        // bpms, phrases, chords, chord_notes: all empty
        buf.extend_from_slice(&0u32.to_le_bytes());
    }
    // vocals: count = 2
    buf.extend_from_slice(&2u32.to_le_bytes());
    for lyric in ["la\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0", "na\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0"] {
        buf.extend_from_slice(&1.0f32.to_le_bytes()); // time
        buf.extend_from_slice(&60i32.to_le_bytes()); // note
        buf.extend_from_slice(&0.5f32.to_le_bytes()); // length
        let lyric_bytes = lyric.as_bytes();
        assert_eq!(lyric_bytes.len(), 48);
        buf.extend_from_slice(lyric_bytes);
    }
    // symbol_headers: count = 0
    buf.extend_from_slice(&0u32.to_le_bytes());
    // symbol_textures: count = 0
    buf.extend_from_slice(&0u32.to_le_bytes());
    // symbol_definitions: count = 0
    buf.extend_from_slice(&0u32.to_le_bytes());
    // phrase_iterations: count = 0
    buf.extend_from_slice(&0u32.to_le_bytes());
    for _ in 0..8 {
        // phrase_extra_info, nlds, actions, events, tones, dnas, sections, arrangements: empty
        buf.extend_from_slice(&0u32.to_le_bytes());
    }
    // metadata
    buf.extend_from_slice(&[0u8; 8 * 4]);
    buf.extend_from_slice(&[0u8; 4 * 2]);
    buf.push(0);
    buf.extend_from_slice(&[0u8; 32]);
    buf.extend_from_slice(&0i16.to_le_bytes());
    buf.extend_from_slice(&0f32.to_le_bytes());
    buf.extend_from_slice(&0i32.to_le_bytes()); // string_count = 0
    buf.extend_from_slice(&[0u8; 8]);
    buf.extend_from_slice(&0i32.to_le_bytes());

    let song = rsarc::sng::parser::parse(&buf).unwrap();
    assert!(song.is_vocals());
    assert_eq!(song.vocals.len(), 2);
    assert_eq!(song.vocals[0].lyric, "la");
    assert_eq!(song.phrase_iterations.len(), 0);

    let xml_bytes = xml::emit(&song, None).unwrap();
    let text = String::from_utf8(xml_bytes).unwrap();
    assert!(text.contains(r#"<vocals count="2">"#));
}

#[test]
fn scenario_5_chord_note_expansion() {
    let mut song = SongData::default();
    let mut chord = Chord::default();
    chord.frets = [None, Some(0), Some(2), Some(2), Some(2), None];
    chord.mask = TechniqueFlags::CHORD | TechniqueFlags::CHORDPANEL;
    song.chords.push(chord);
    song.chord_notes.push(ChordNotes::default());

    let mut note = Note::default();
    note.mask = TechniqueFlags::CHORD | TechniqueFlags::CHORDPANEL;
    note.chord_id = 0;
    note.chord_notes_id = 0;
    song.arrangements.push(rsarc::sng::model::Arrangement {
        notes: vec![note],
        ..Default::default()
    });

    let xml_bytes = xml::emit(&song, None).unwrap();
    let text = String::from_utf8(xml_bytes).unwrap();
    assert_eq!(text.matches("<chordNote").count(), 4);
    assert!(text.matches(r#"fret="2""#).count() == 3, "strings 2..4 all fret 2:\n{text}");
    assert!(text.contains(r#"fret="0""#), "string 1 has fret 0:\n{text}");
}

#[test]
fn scenario_5b_chord_note_carries_per_string_technique_flags() {
    let mut song = SongData::default();
    let mut chord = Chord::default();
    chord.frets = [None, Some(0), Some(2), None, None, None];
    chord.mask = TechniqueFlags::CHORD | TechniqueFlags::CHORDPANEL;
    song.chords.push(chord);

    let mut chord_notes = ChordNotes::default();
    chord_notes.strings[2] = ChordNotesEntry {
        mask: TechniqueFlags::SLIDEUNPITCHEDTO | TechniqueFlags::HARMONIC | TechniqueFlags::TREMOLO,
        slide_unpitch_to: Some(5),
        ..Default::default()
    };
    song.chord_notes.push(chord_notes);

    let mut note = Note::default();
    note.mask = TechniqueFlags::CHORD | TechniqueFlags::CHORDPANEL;
    note.chord_id = 0;
    note.chord_notes_id = 0;
    song.arrangements.push(rsarc::sng::model::Arrangement {
        notes: vec![note],
        ..Default::default()
    });

    let xml_bytes = xml::emit(&song, None).unwrap();
    let text = String::from_utf8(xml_bytes).unwrap();
    assert!(text.contains(r#"slideUnpitchTo="5""#), "string 2's slideUnpitchTo must reach the xml:\n{text}");
    assert!(text.contains(r#"harmonic="1""#), "string 2's harmonic flag must reach the xml:\n{text}");
    assert!(text.contains(r#"tremolo="1""#), "string 2's tremolo flag must reach the xml:\n{text}");
}

#[test]
fn scenario_6_terminal_invariant_violations() {
    // Corrupted: declares one phrase but the buffer ends before its fields are fully present.
    let mut truncated = Vec::new();
    truncated.extend_from_slice(&0u32.to_le_bytes()); // bpms: 0
    truncated.extend_from_slice(&1u32.to_le_bytes()); // phrases: 1, but no phrase record follows
    let err = rsarc::sng::parser::parse(&truncated).unwrap_err();
    assert!(matches!(err, Error::ReadPastEnd { .. }));

    // Well-formed minimal buffer plus one stray trailing byte.
    let mut buf = Vec::new();
    for _ in 0..14 {
        buf.extend_from_slice(&0u32.to_le_bytes());
    }
    buf.extend_from_slice(&[0u8; 8 * 4]);
    buf.extend_from_slice(&[0u8; 4 * 2]);
    buf.push(0);
    buf.extend_from_slice(&[0u8; 32]);
    buf.extend_from_slice(&0i16.to_le_bytes());
    buf.extend_from_slice(&0f32.to_le_bytes());
    buf.extend_from_slice(&0i32.to_le_bytes());
    buf.extend_from_slice(&[0u8; 8]);
    buf.extend_from_slice(&0i32.to_le_bytes());
    buf.push(0xAA);

    let err = rsarc::sng::parser::parse(&buf).unwrap_err();
    assert!(matches!(err, Error::TrailingBytes { remaining: 1 }));
}
