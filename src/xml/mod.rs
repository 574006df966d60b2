//! Renders a parsed `SongData` (plus an optional manifest overlay) to the Rocksmith arrangement
//! XML shape, or to the simpler vocals shape when the song carries lyrics instead of notes.

use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::writer::Writer;

use crate::error::Result;
use crate::manifest::ManifestOverlay;
use crate::sng::model::{Arrangement, Chord, Fingerprint, Note, SongData, TechniqueFlags};

type W = Writer<Cursor<Vec<u8>>>;

/// Renders `song` to UTF-8 XML bytes. Chooses the vocals or instrumental shape based on whether
/// the SNG carries any vocal entries.
pub fn emit(song: &SongData, overlay: Option<&ManifestOverlay>) -> Result<Vec<u8>> {
    let mut w = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    if song.is_vocals() {
        emit_vocals(&mut w, song)?;
    } else {
        emit_instrumental(&mut w, song, overlay)?;
    }

    Ok(w.into_inner().into_inner())
}

fn fmt3(v: f32) -> String {
    format!("{:.3}", v)
}

fn fmt_shortest(v: f32) -> String {
    format!("{}", v)
}

fn start(w: &mut W, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
    let mut elem = BytesStart::new(name);
    for (k, v) in attrs {
        elem.push_attribute((*k, *v));
    }
    w.write_event(Event::Start(elem))?;
    Ok(())
}

fn empty(w: &mut W, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
    let mut elem = BytesStart::new(name);
    for (k, v) in attrs {
        elem.push_attribute((*k, *v));
    }
    w.write_event(Event::Empty(elem))?;
    Ok(())
}

fn end(w: &mut W, name: &str) -> Result<()> {
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn text_elem(w: &mut W, name: &str, value: &str) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::new(value)))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn emit_vocals(w: &mut W, song: &SongData) -> Result<()> {
    start(w, "vocals", &[("count", &song.vocals.len().to_string())])?;
    for v in &song.vocals {
        empty(
            w,
            "vocal",
            &[
                ("time", &fmt3(v.time)),
                ("note", &v.note.to_string()),
                ("length", &fmt3(v.length)),
                ("lyric", &v.lyric),
            ],
        )?;
    }
    end(w, "vocals")
}

fn emit_instrumental(w: &mut W, song: &SongData, overlay: Option<&ManifestOverlay>) -> Result<()> {
    let meta = &song.metadata;

    start(w, "song", &[("version", "8")])?;

    text_elem(w, "title", overlay.and_then(|o| o.title.as_deref()).unwrap_or(""))?;
    text_elem(w, "arrangement", overlay.and_then(|o| o.arrangement.as_deref()).unwrap_or(""))?;
    text_elem(w, "part", &overlay.and_then(|o| o.part).unwrap_or(0).to_string())?;
    text_elem(w, "offset", &fmt3(-meta.start_time))?;
    text_elem(
        w,
        "centOffset",
        &overlay.and_then(|o| o.cent_offset).unwrap_or(0.0).to_string(),
    )?;
    text_elem(
        w,
        "songLength",
        &fmt3(overlay.and_then(|o| o.song_length).map(|v| v as f32).unwrap_or(meta.song_length)),
    )?;
    text_elem(
        w,
        "songNameSort",
        overlay.and_then(|o| o.song_name_sort.as_deref()).unwrap_or(""),
    )?;
    text_elem(w, "startBeat", &fmt3(meta.start_time))?;
    text_elem(
        w,
        "averageTempo",
        &overlay.and_then(|o| o.average_tempo).unwrap_or(120.0).to_string(),
    )?;

    let tuning = overlay.and_then(|o| o.tuning).unwrap_or_else(|| {
        let mut t = [0i32; 6];
        for (i, slot) in t.iter_mut().enumerate() {
            *slot = meta.tuning.get(i).copied().unwrap_or(0) as i32;
        }
        t
    });
    empty(
        w,
        "tuning",
        &[
            ("string0", &tuning[0].to_string()),
            ("string1", &tuning[1].to_string()),
            ("string2", &tuning[2].to_string()),
            ("string3", &tuning[3].to_string()),
            ("string4", &tuning[4].to_string()),
            ("string5", &tuning[5].to_string()),
        ],
    )?;

    text_elem(w, "capo", &(meta.capo_fret_id as i32).max(0).to_string())?;
    text_elem(w, "artistName", overlay.and_then(|o| o.artist_name.as_deref()).unwrap_or(""))?;
    text_elem(
        w,
        "artistNameSort",
        overlay.and_then(|o| o.artist_name_sort.as_deref()).unwrap_or(""),
    )?;
    text_elem(w, "albumName", overlay.and_then(|o| o.album_name.as_deref()).unwrap_or(""))?;
    text_elem(
        w,
        "albumNameSort",
        overlay.and_then(|o| o.album_name_sort.as_deref()).unwrap_or(""),
    )?;
    text_elem(w, "albumYear", overlay.and_then(|o| o.album_year.as_deref()).unwrap_or(""))?;
    text_elem(w, "crowdSpeed", "1")?;

    emit_arrangement_properties(w, overlay)?;

    text_elem(
        w,
        "lastConversionDateTime",
        overlay
            .and_then(|o| o.last_conversion_date_time.as_deref())
            .unwrap_or(meta.last_conversion_date_time.as_str()),
    )?;

    emit_phrases(w, song)?;
    emit_phrase_iterations(w, song)?;
    emit_new_linked_diffs(w, song)?;
    emit_phrase_properties(w, song)?;
    emit_chord_templates(w, song)?;
    emit_ebeats(w, song)?;

    if let Some(o) = overlay {
        if let Some(base) = &o.tone_base {
            text_elem(w, "tonebase", base)?;
        }
        for (name, value) in [("toneA", &o.tone_a), ("toneB", &o.tone_b), ("toneC", &o.tone_c), ("toneD", &o.tone_d)]
        {
            if let Some(v) = value {
                text_elem(w, name, v)?;
            }
        }
    }

    emit_tones(w, song)?;
    emit_sections(w, song)?;
    emit_events(w, song)?;
    emit_empty_transcription_track(w)?;
    emit_levels(w, song)?;

    end(w, "song")
}

fn emit_arrangement_properties(w: &mut W, overlay: Option<&ManifestOverlay>) -> Result<()> {
    let props = overlay.and_then(|o| o.arrangement_properties.clone());
    let v = |f: fn(&crate::manifest::ArrangementProperties) -> i32| -> String {
        props.as_ref().map(f).unwrap_or(0).to_string()
    };
    empty(
        w,
        "arrangementProperties",
        &[
            ("represent", &v(|p| p.represent)),
            ("bonusArr", &v(|p| p.bonus_arr)),
            ("standardTuning", &v(|p| p.standard_tuning)),
            ("nonStandardChords", &v(|p| p.non_standard_chords)),
            ("barreChords", &v(|p| p.barre_chords)),
            ("powerChords", &v(|p| p.power_chords)),
            ("dropDPower", &v(|p| p.drop_d_power)),
            ("openChords", &v(|p| p.open_chords)),
            ("fifthsAndOctaves", &v(|p| p.fifths_and_octaves)),
            ("syncopation", &v(|p| p.syncopation)),
            ("bassPick", &v(|p| p.bass_pick)),
            ("sustain", &v(|p| p.sustain)),
            ("pathLead", &v(|p| p.path_lead)),
            ("pathRhythm", &v(|p| p.path_rhythm)),
            ("pathBass", &v(|p| p.path_bass)),
            ("routeMask", &v(|p| p.route_mask)),
            ("fretHandMute", &v(|p| p.fret_hand_mute)),
            ("slapPop", &v(|p| p.slap_pop)),
            ("twoFingerPicking", &v(|p| p.two_finger_picking)),
            ("fingerPicking", &v(|p| p.finger_picking)),
            ("pickDirection", &v(|p| p.pick_direction)),
            ("doubleStops", &v(|p| p.double_stops)),
            ("palmMute", &v(|p| p.palm_mute)),
            ("harmonics", &v(|p| p.harmonics)),
            ("pinchHarmonics", &v(|p| p.pinch_harmonics)),
            ("hopo", &v(|p| p.hopo)),
            ("tremolo", &v(|p| p.tremolo)),
            ("slides", &v(|p| p.slides)),
            ("unpitchedSlides", &v(|p| p.unpitched_slides)),
            ("bends", &v(|p| p.bends)),
            ("tapping", &v(|p| p.tapping)),
        ],
    )
}

fn emit_phrases(w: &mut W, song: &SongData) -> Result<()> {
    start(w, "phrases", &[("count", &song.phrases.len().to_string())])?;
    for p in &song.phrases {
        empty(
            w,
            "phrase",
            &[
                ("maxDifficulty", &p.max_difficulty.to_string()),
                ("name", &p.name),
                ("solo", &p.solo.to_string()),
                ("disparity", &p.disparity.to_string()),
                ("ignore", &p.ignore.to_string()),
            ],
        )?;
    }
    end(w, "phrases")
}

fn emit_phrase_iterations(w: &mut W, song: &SongData) -> Result<()> {
    start(w, "phraseIterations", &[("count", &song.phrase_iterations.len().to_string())])?;
    for pi in &song.phrase_iterations {
        let has_hero_levels = pi.difficulty.iter().any(|&d| d > 0);
        if has_hero_levels {
            start(
                w,
                "phraseIteration",
                &[("time", &fmt3(pi.start_time)), ("phraseId", &pi.phrase_id.to_string())],
            )?;
            start(w, "heroLevels", &[])?;
            for (level, &difficulty) in pi.difficulty.iter().enumerate() {
                if difficulty > 0 {
                    empty(
                        w,
                        "heroLevel",
                        &[("difficulty", &level.to_string()), ("hero", &difficulty.to_string())],
                    )?;
                }
            }
            end(w, "heroLevels")?;
            end(w, "phraseIteration")?;
        } else {
            empty(
                w,
                "phraseIteration",
                &[("time", &fmt3(pi.start_time)), ("phraseId", &pi.phrase_id.to_string())],
            )?;
        }
    }
    end(w, "phraseIterations")
}

fn emit_new_linked_diffs(w: &mut W, song: &SongData) -> Result<()> {
    start(w, "newLinkedDiffs", &[("count", &song.nlds.len().to_string())])?;
    for nld in &song.nlds {
        start(
            w,
            "newLinkedDiff",
            &[("ratio", "1.000"), ("phraseCount", &nld.nld_phrase.len().to_string())],
        )?;
        for id in &nld.nld_phrase {
            empty(w, "nld_phrase", &[("id", &id.to_string())])?;
        }
        end(w, "newLinkedDiff")?;
    }
    end(w, "newLinkedDiffs")
}

fn emit_phrase_properties(w: &mut W, song: &SongData) -> Result<()> {
    start(w, "phraseProperties", &[("count", &song.phrase_extra_info.len().to_string())])?;
    for info in &song.phrase_extra_info {
        empty(
            w,
            "phraseProperty",
            &[
                ("phraseIndex", &info.phrase_id.to_string()),
                ("difficulty", &info.difficulty.to_string()),
                ("levelJump", &info.level_jump.to_string()),
            ],
        )?;
    }
    end(w, "phraseProperties")
}

fn emit_chord_templates(w: &mut W, song: &SongData) -> Result<()> {
    start(w, "chordTemplates", &[("count", &song.chords.len().to_string())])?;
    for chord in &song.chords {
        let mut attrs: Vec<(String, String)> = vec![
            ("chordName".into(), chord.name.clone()),
            ("displayName".into(), chord.display_name()),
        ];
        for i in 0..6 {
            if let Some(fret) = chord.frets[i] {
                attrs.push((format!("fret{i}"), fret.to_string()));
            }
            if let Some(finger) = chord.fingers[i] {
                attrs.push((format!("finger{i}"), finger.to_string()));
            }
        }
        let attr_refs: Vec<(&str, &str)> = attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        empty(w, "chordTemplate", &attr_refs)?;
    }
    end(w, "chordTemplates")
}

fn emit_ebeats(w: &mut W, song: &SongData) -> Result<()> {
    start(w, "ebeats", &[("count", &song.bpms.len().to_string())])?;
    for bpm in &song.bpms {
        if bpm.mask & 0x01 != 0 {
            empty(w, "ebeat", &[("time", &fmt3(bpm.time)), ("measure", &bpm.measure.to_string())])?;
        } else {
            empty(w, "ebeat", &[("time", &fmt3(bpm.time))])?;
        }
    }
    end(w, "ebeats")
}

fn emit_tones(w: &mut W, song: &SongData) -> Result<()> {
    start(w, "tones", &[("count", &song.tones.len().to_string())])?;
    for tone in &song.tones {
        empty(w, "tone", &[("time", &fmt3(tone.time)), ("id", &tone.tone_id.to_string())])?;
    }
    end(w, "tones")
}

fn emit_sections(w: &mut W, song: &SongData) -> Result<()> {
    start(w, "sections", &[("count", &song.sections.len().to_string())])?;
    for s in &song.sections {
        empty(
            w,
            "section",
            &[
                ("name", &s.name),
                ("number", &s.number.to_string()),
                ("startTime", &fmt3(s.start_time)),
                ("endTime", &fmt3(s.end_time)),
            ],
        )?;
    }
    end(w, "sections")
}

fn emit_events(w: &mut W, song: &SongData) -> Result<()> {
    start(w, "events", &[("count", &song.events.len().to_string())])?;
    for e in &song.events {
        empty(w, "event", &[("time", &fmt3(e.time)), ("code", &e.event_name)])?;
    }
    end(w, "events")
}

fn emit_empty_transcription_track(w: &mut W) -> Result<()> {
    start(w, "transcriptionTrack", &[("difficulty", "-1")])?;
    for name in ["notes", "chords", "anchors", "handShapes"] {
        empty(w, name, &[("count", "0")])?;
    }
    end(w, "transcriptionTrack")
}

fn emit_levels(w: &mut W, song: &SongData) -> Result<()> {
    start(w, "levels", &[("count", &song.arrangements.len().to_string())])?;
    for arr in &song.arrangements {
        emit_level(w, song, arr)?;
    }
    end(w, "levels")
}

fn emit_level(w: &mut W, song: &SongData, arr: &Arrangement) -> Result<()> {
    start(w, "level", &[("difficulty", &arr.difficulty.to_string())])?;

    let (chord_notes, single_notes): (Vec<&Note>, Vec<&Note>) =
        arr.notes.iter().partition(|n| n.is_chord_note());

    start(w, "notes", &[("count", &single_notes.len().to_string())])?;
    for n in &single_notes {
        emit_single_note(w, n)?;
    }
    end(w, "notes")?;

    start(w, "chords", &[("count", &chord_notes.len().to_string())])?;
    for n in &chord_notes {
        emit_chord_note(w, song, n)?;
    }
    end(w, "chords")?;

    start(w, "anchors", &[("count", &arr.anchors.len().to_string())])?;
    for a in &arr.anchors {
        empty(
            w,
            "anchor",
            &[
                ("time", &fmt3(a.start_beat_time)),
                ("fret", &a.fret_id.to_string()),
                ("width", &fmt_shortest(a.width as f32)),
            ],
        )?;
    }
    end(w, "anchors")?;

    let hand_shapes = merged_hand_shapes(arr);
    start(w, "handShapes", &[("count", &hand_shapes.len().to_string())])?;
    for hs in &hand_shapes {
        empty(
            w,
            "handShape",
            &[
                ("chordId", &hs.chord_id.to_string()),
                ("startTime", &fmt3(hs.start_time)),
                ("endTime", &fmt3(hs.end_time)),
            ],
        )?;
    }
    end(w, "handShapes")?;

    end(w, "level")
}

fn merged_hand_shapes(arr: &Arrangement) -> Vec<Fingerprint> {
    let mut merged: Vec<Fingerprint> = arr
        .handshape_fingerprints
        .iter()
        .chain(arr.arpeggio_fingerprints.iter())
        .cloned()
        .collect();
    merged.sort_by(|a, b| a.start_time.partial_cmp(&b.start_time).unwrap_or(std::cmp::Ordering::Equal));
    merged
}

fn emit_single_note(w: &mut W, n: &Note) -> Result<()> {
    let mut attrs: Vec<(String, String)> = vec![
        ("time".into(), fmt3(n.time)),
        ("string".into(), n.string_index.to_string()),
        ("fret".into(), n.fret_id.to_string()),
    ];
    if n.sustain > 0.0 {
        attrs.push(("sustain".into(), fmt3(n.sustain)));
    }
    push_technique_attrs(&mut attrs, n);

    let attr_refs: Vec<(&str, &str)> = attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    if n.bend_values.is_empty() {
        empty(w, "note", &attr_refs)?;
    } else {
        start(w, "note", &attr_refs)?;
        emit_bend_values(w, &n.bend_values)?;
        end(w, "note")?;
    }
    Ok(())
}

fn push_technique_attrs(attrs: &mut Vec<(String, String)>, n: &Note) {
    let mask = n.mask;
    if mask.contains(TechniqueFlags::PARENT) {
        attrs.push(("linkNext".into(), "1".into()));
    }
    if mask.contains(TechniqueFlags::ACCENT) {
        attrs.push(("accent".into(), "1".into()));
    }
    if !n.bend_values.is_empty() {
        attrs.push(("bend".into(), fmt_shortest(n.max_bend)));
    }
    if mask.contains(TechniqueFlags::HAMMERON) {
        attrs.push(("hammerOn".into(), "1".into()));
    }
    if mask.contains(TechniqueFlags::HARMONIC) {
        attrs.push(("harmonic".into(), "1".into()));
    }
    if mask.contains(TechniqueFlags::HAMMERON) || mask.contains(TechniqueFlags::PULLOFF) {
        attrs.push(("hopo".into(), "1".into()));
    }
    if mask.contains(TechniqueFlags::IGNORE) {
        attrs.push(("ignore".into(), "1".into()));
    }
    if let Some(left_hand) = n.left_hand {
        attrs.push(("leftHand".into(), left_hand.to_string()));
    }
    if mask.contains(TechniqueFlags::MUTE) {
        attrs.push(("mute".into(), "1".into()));
    }
    if mask.contains(TechniqueFlags::PALMMUTE) {
        attrs.push(("palmMute".into(), "1".into()));
    }
    if mask.contains(TechniqueFlags::PLUCK) {
        attrs.push(("pluck".into(), "1".into()));
    }
    if mask.contains(TechniqueFlags::PULLOFF) {
        attrs.push(("pullOff".into(), "1".into()));
    }
    if mask.contains(TechniqueFlags::SLAP) {
        attrs.push(("slap".into(), "1".into()));
    }
    if mask.contains(TechniqueFlags::SLIDE) {
        if let Some(slide_to) = n.slide_to {
            attrs.push(("slideTo".into(), slide_to.to_string()));
        }
    }
    if mask.contains(TechniqueFlags::TREMOLO) {
        attrs.push(("tremolo".into(), "1".into()));
    }
    if mask.contains(TechniqueFlags::PINCHHARMONIC) {
        attrs.push(("harmonicPinch".into(), "1".into()));
    }
    if n.pick_direction > 0 {
        attrs.push(("pickDirection".into(), n.pick_direction.to_string()));
    }
    if mask.contains(TechniqueFlags::RIGHTHAND) {
        attrs.push(("rightHand".into(), "1".into()));
    }
    if mask.contains(TechniqueFlags::SLIDEUNPITCHEDTO) {
        if let Some(slide_unpitch_to) = n.slide_unpitch_to {
            attrs.push(("slideUnpitchTo".into(), slide_unpitch_to.to_string()));
        }
    }
    if mask.contains(TechniqueFlags::TAP) {
        attrs.push(("tap".into(), n.tap.max(0).to_string()));
    }
    if mask.contains(TechniqueFlags::VIBRATO) && n.vibrato > 0 {
        attrs.push(("vibrato".into(), n.vibrato.to_string()));
    }
}

fn emit_bend_values(w: &mut W, bends: &[crate::sng::model::BendValue]) -> Result<()> {
    start(w, "bendValues", &[("count", &bends.len().to_string())])?;
    for b in bends {
        if b.step.abs() > 1e-6 {
            empty(w, "bendValue", &[("time", &fmt3(b.time)), ("step", &fmt_shortest(b.step))])?;
        } else {
            empty(w, "bendValue", &[("time", &fmt3(b.time))])?;
        }
    }
    end(w, "bendValues")
}

fn emit_chord_note(w: &mut W, song: &SongData, n: &Note) -> Result<()> {
    let mut attrs: Vec<(String, String)> = vec![("time".into(), fmt3(n.time)), ("chordId".into(), n.chord_id.to_string())];
    let mask = n.mask;
    if mask.contains(TechniqueFlags::PARENT) {
        attrs.push(("linkNext".into(), "1".into()));
    }
    if mask.contains(TechniqueFlags::ACCENT) {
        attrs.push(("accent".into(), "1".into()));
    }
    if mask.contains(TechniqueFlags::FRETHANDMUTE) {
        attrs.push(("fretHandMute".into(), "1".into()));
    }
    if mask.contains(TechniqueFlags::HIGHDENSITY) {
        attrs.push(("highDensity".into(), "1".into()));
    }
    if mask.contains(TechniqueFlags::IGNORE) {
        attrs.push(("ignore".into(), "1".into()));
    }
    if mask.contains(TechniqueFlags::PALMMUTE) {
        attrs.push(("palmMute".into(), "1".into()));
    }
    if mask.contains(TechniqueFlags::HAMMERON) || mask.contains(TechniqueFlags::PULLOFF) {
        attrs.push(("hopo".into(), "1".into()));
    }

    let attr_refs: Vec<(&str, &str)> = attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

    let chord: Option<&Chord> = song.chords.get(n.chord_id.max(0) as usize);
    let chord_notes_entry = song.chord_notes.get(n.chord_notes_id.max(0) as usize);

    if mask.contains(TechniqueFlags::CHORDPANEL) && chord.is_some() {
        start(w, "chord", &attr_refs)?;
        let chord = chord.unwrap();
        for string in 0..6usize {
            let Some(fret) = chord.frets[string] else { continue };
            let mut child_attrs: Vec<(String, String)> = vec![
                ("time".into(), fmt3(n.time)),
                ("string".into(), string.to_string()),
                ("fret".into(), fret.to_string()),
            ];
            if n.sustain > 0.0 {
                child_attrs.push(("sustain".into(), fmt3(n.sustain)));
            }
            if let Some(finger) = chord.fingers[string] {
                child_attrs.push(("leftHand".into(), finger.to_string()));
            }

            let mut bends_for_string: &[crate::sng::model::BendValue] = &[];
            if let Some(entry) = chord_notes_entry.and_then(|cn| cn.strings.get(string)) {
                let emask = entry.mask;
                if emask.contains(TechniqueFlags::HAMMERON) {
                    child_attrs.push(("hammerOn".into(), "1".into()));
                }
                if emask.contains(TechniqueFlags::HARMONIC) {
                    child_attrs.push(("harmonic".into(), "1".into()));
                }
                if emask.contains(TechniqueFlags::HAMMERON) || emask.contains(TechniqueFlags::PULLOFF) {
                    child_attrs.push(("hopo".into(), "1".into()));
                }
                if emask.contains(TechniqueFlags::MUTE) {
                    child_attrs.push(("mute".into(), "1".into()));
                }
                if emask.contains(TechniqueFlags::PALMMUTE) {
                    child_attrs.push(("palmMute".into(), "1".into()));
                }
                if emask.contains(TechniqueFlags::PLUCK) {
                    child_attrs.push(("pluck".into(), "1".into()));
                }
                if emask.contains(TechniqueFlags::PULLOFF) {
                    child_attrs.push(("pullOff".into(), "1".into()));
                }
                if emask.contains(TechniqueFlags::SLAP) {
                    child_attrs.push(("slap".into(), "1".into()));
                }
                if emask.contains(TechniqueFlags::SLIDE) {
                    if let Some(slide_to) = entry.slide_to {
                        child_attrs.push(("slideTo".into(), slide_to.to_string()));
                    }
                }
                if emask.contains(TechniqueFlags::TREMOLO) {
                    child_attrs.push(("tremolo".into(), "1".into()));
                }
                if emask.contains(TechniqueFlags::PINCHHARMONIC) {
                    child_attrs.push(("harmonicPinch".into(), "1".into()));
                }
                if emask.contains(TechniqueFlags::RIGHTHAND) {
                    child_attrs.push(("rightHand".into(), "1".into()));
                }
                if emask.contains(TechniqueFlags::SLIDEUNPITCHEDTO) {
                    if let Some(slide_unpitch_to) = entry.slide_unpitch_to {
                        child_attrs.push(("slideUnpitchTo".into(), slide_unpitch_to.to_string()));
                    }
                }
                if emask.contains(TechniqueFlags::VIBRATO) && entry.vibrato > 0 {
                    child_attrs.push(("vibrato".into(), entry.vibrato.to_string()));
                }
                bends_for_string = &entry.bend_values;
            }

            let child_attr_refs: Vec<(&str, &str)> =
                child_attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
            if bends_for_string.is_empty() {
                empty(w, "chordNote", &child_attr_refs)?;
            } else {
                start(w, "chordNote", &child_attr_refs)?;
                emit_bend_values(w, bends_for_string)?;
                end(w, "chordNote")?;
            }
        }
        end(w, "chord")?;
    } else {
        empty(w, "chord", &attr_refs)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sng::model::{Chord, ChordNotes, SongData, Vocal};

    #[test]
    fn emits_vocals_shape_when_vocals_present() {
        let mut song = SongData::default();
        song.vocals.push(Vocal {
            time: 1.5,
            note: 60,
            length: 0.25,
            lyric: "la".into(),
        });
        let xml = emit(&song, None).unwrap();
        let text = String::from_utf8(xml).unwrap();
        assert!(text.contains(r#"<vocals count="1">"#));
        assert!(text.contains(r#"time="1.500""#));
        assert!(text.contains(r#"lyric="la""#));
    }

    #[test]
    fn chord_display_name_suffix_matches_mask() {
        let mut arp = Chord::default();
        arp.mask = TechniqueFlags::from_bits_truncate(1);
        arp.name = "Em".into();
        assert_eq!(arp.display_name(), "Em-arp");

        let mut nop = Chord::default();
        nop.mask = TechniqueFlags::from_bits_truncate(2);
        nop.name = "Em".into();
        assert_eq!(nop.display_name(), "Em-nop");
    }

    #[test]
    fn chord_note_expansion_skips_absent_frets() {
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

        let mut w = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        emit_chord_note(&mut w, &song, &note).unwrap();
        let text = String::from_utf8(w.into_inner().into_inner()).unwrap();
        let count = text.matches("<chordNote").count();
        assert_eq!(count, 4);
    }

    #[test]
    fn time_attribute_has_three_decimals() {
        assert_eq!(fmt3(1.0), "1.000");
        assert_eq!(fmt3(-0.5), "-0.500");
    }
}
