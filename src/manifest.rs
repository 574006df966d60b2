//! Parses the optional manifest overlay: a JSON attribute bag carrying song metadata the SNG
//! binary itself never stores (title, artist, tone names, arrangement properties).

use serde_json::{Map, Value};

use crate::error::Result;

/// ~31 boolean-as-int flags nested under `Entries.<id>.Attributes.ArrangementProperties`.
#[derive(Debug, Clone, Default)]
pub struct ArrangementProperties {
    pub represent: i32,
    pub bonus_arr: i32,
    pub standard_tuning: i32,
    pub non_standard_chords: i32,
    pub barre_chords: i32,
    pub power_chords: i32,
    pub drop_d_power: i32,
    pub open_chords: i32,
    pub fifths_and_octaves: i32,
    pub syncopation: i32,
    pub bass_pick: i32,
    pub sustain: i32,
    pub path_lead: i32,
    pub path_rhythm: i32,
    pub path_bass: i32,
    pub route_mask: i32,
    pub fret_hand_mute: i32,
    pub slap_pop: i32,
    pub two_finger_picking: i32,
    pub finger_picking: i32,
    pub pick_direction: i32,
    pub double_stops: i32,
    pub palm_mute: i32,
    pub harmonics: i32,
    pub pinch_harmonics: i32,
    pub hopo: i32,
    pub tremolo: i32,
    pub slides: i32,
    pub unpitched_slides: i32,
    pub bends: i32,
    pub tapping: i32,
}

#[derive(Debug, Clone, Default)]
pub struct ManifestOverlay {
    pub title: Option<String>,
    pub arrangement: Option<String>,
    pub part: Option<i32>,
    pub cent_offset: Option<f64>,
    pub song_length: Option<f64>,
    pub song_name_sort: Option<String>,
    pub average_tempo: Option<f64>,
    pub tuning: Option<[i32; 6]>,
    pub artist_name: Option<String>,
    pub artist_name_sort: Option<String>,
    pub album_name: Option<String>,
    pub album_name_sort: Option<String>,
    pub album_year: Option<String>,
    pub last_conversion_date_time: Option<String>,
    pub tone_base: Option<String>,
    pub tone_a: Option<String>,
    pub tone_b: Option<String>,
    pub tone_c: Option<String>,
    pub tone_d: Option<String>,
    pub arrangement_properties: Option<ArrangementProperties>,
}

/// Parses a manifest JSON document into an overlay, or `None` if it has no `Entries` object with
/// at least one `Attributes` bag. JSON syntax errors propagate as `Error::Json`.
pub fn parse(json_text: &str) -> Result<Option<ManifestOverlay>> {
    let trimmed = json_text.strip_prefix('\u{FEFF}').unwrap_or(json_text);
    let root: Value = serde_json::from_str(trimmed)?;

    let Some(root_obj) = root.as_object() else {
        return Ok(None);
    };
    let Some(entries) = get(root_obj, "Entries").and_then(Value::as_object) else {
        return Ok(None);
    };
    let Some(first_entry) = entries.values().next() else {
        return Ok(None);
    };
    let Some(attrs) = first_entry
        .as_object()
        .and_then(|e| get(e, "Attributes"))
        .and_then(Value::as_object)
    else {
        return Ok(None);
    };

    Ok(Some(overlay_from_attributes(attrs)))
}

fn overlay_from_attributes(attrs: &Map<String, Value>) -> ManifestOverlay {
    ManifestOverlay {
        title: string_field(attrs, "SongName"),
        arrangement: string_field(attrs, "Arrangement"),
        part: i32_field(attrs, "Part"),
        cent_offset: f64_field(attrs, "CentOffset"),
        song_length: f64_field(attrs, "SongLength"),
        song_name_sort: string_field(attrs, "SongNameSort"),
        average_tempo: f64_field(attrs, "SongAverageTempo"),
        tuning: tuning_field(attrs, "Tuning"),
        artist_name: string_field(attrs, "ArtistName"),
        artist_name_sort: string_field(attrs, "ArtistNameSort"),
        album_name: string_field(attrs, "AlbumName"),
        album_name_sort: string_field(attrs, "AlbumNameSort"),
        album_year: string_field(attrs, "SongYear").or_else(|| i32_field(attrs, "SongYear").map(|y| y.to_string())),
        last_conversion_date_time: string_field(attrs, "LastConversionDateTime"),
        tone_base: string_field(attrs, "Tone_Base"),
        tone_a: string_field(attrs, "Tone_A"),
        tone_b: string_field(attrs, "Tone_B"),
        tone_c: string_field(attrs, "Tone_C"),
        tone_d: string_field(attrs, "Tone_D"),
        arrangement_properties: get(attrs, "ArrangementProperties")
            .and_then(Value::as_object)
            .map(arrangement_properties_from),
    }
}

fn arrangement_properties_from(obj: &Map<String, Value>) -> ArrangementProperties {
    ArrangementProperties {
        represent: i32_field(obj, "represent").unwrap_or(0),
        bonus_arr: i32_field(obj, "bonusArr").unwrap_or(0),
        standard_tuning: i32_field(obj, "standardTuning").unwrap_or(0),
        non_standard_chords: i32_field(obj, "nonStandardChords").unwrap_or(0),
        barre_chords: i32_field(obj, "barreChords").unwrap_or(0),
        power_chords: i32_field(obj, "powerChords").unwrap_or(0),
        drop_d_power: i32_field(obj, "dropDPower").unwrap_or(0),
        open_chords: i32_field(obj, "openChords").unwrap_or(0),
        fifths_and_octaves: i32_field(obj, "fifthsAndOctaves").unwrap_or(0),
        syncopation: i32_field(obj, "syncopation").unwrap_or(0),
        bass_pick: i32_field(obj, "bassPick").unwrap_or(0),
        sustain: i32_field(obj, "sustain").unwrap_or(0),
        path_lead: i32_field(obj, "pathLead").unwrap_or(0),
        path_rhythm: i32_field(obj, "pathRhythm").unwrap_or(0),
        path_bass: i32_field(obj, "pathBass").unwrap_or(0),
        route_mask: i32_field(obj, "routeMask").unwrap_or(0),
        fret_hand_mute: i32_field(obj, "fretHandMute").unwrap_or(0),
        slap_pop: i32_field(obj, "slapPop").unwrap_or(0),
        two_finger_picking: i32_field(obj, "twoFingerPicking").unwrap_or(0),
        finger_picking: i32_field(obj, "fingerPicking").unwrap_or(0),
        pick_direction: i32_field(obj, "pickDirection").unwrap_or(0),
        double_stops: i32_field(obj, "doubleStops").unwrap_or(0),
        palm_mute: i32_field(obj, "palmMute").unwrap_or(0),
        harmonics: i32_field(obj, "harmonics").unwrap_or(0),
        pinch_harmonics: i32_field(obj, "pinchHarmonics").unwrap_or(0),
        hopo: i32_field(obj, "hopo").unwrap_or(0),
        tremolo: i32_field(obj, "tremolo").unwrap_or(0),
        slides: i32_field(obj, "slides").unwrap_or(0),
        unpitched_slides: i32_field(obj, "unpitchedSlides").unwrap_or(0),
        bends: i32_field(obj, "bends").unwrap_or(0),
        tapping: i32_field(obj, "tapping").unwrap_or(0),
    }
}

/// Looks up `key` trying it verbatim, then with its first letter's case flipped, so both
/// PascalCase and camelCase manifest variants resolve to the same field.
fn get<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    if let Some(v) = obj.get(key) {
        return Some(v);
    }
    let flipped = flip_first_letter(key);
    obj.get(&flipped)
}

fn flip_first_letter(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => {
            let flipped: String = if first.is_uppercase() {
                first.to_lowercase().collect()
            } else {
                first.to_uppercase().collect()
            };
            flipped + chars.as_str()
        }
        None => String::new(),
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    get(obj, key).and_then(Value::as_str).map(str::to_owned)
}

fn f64_field(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    get(obj, key).and_then(Value::as_f64)
}

fn i32_field(obj: &Map<String, Value>, key: &str) -> Option<i32> {
    get(obj, key).and_then(Value::as_i64).map(|v| v as i32)
}

fn tuning_field(obj: &Map<String, Value>, key: &str) -> Option<[i32; 6]> {
    let arr = get(obj, key)?.as_object()?;
    let mut out = [0i32; 6];
    for (i, string_key) in ["String0", "String1", "String2", "String3", "String4", "String5"]
        .iter()
        .enumerate()
    {
        out[i] = i32_field(arr, string_key).unwrap_or(0);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_and_pascal_case_fields() {
        let json = r#"{
            "Entries": {
                "abc123": {
                    "Attributes": {
                        "SongName": "Test Song",
                        "artistName": "Test Artist",
                        "SongAverageTempo": 120.5,
                        "ArrangementProperties": { "powerChords": 1, "bends": 1 }
                    }
                }
            }
        }"#;
        let overlay = parse(json).unwrap().unwrap();
        assert_eq!(overlay.title.as_deref(), Some("Test Song"));
        assert_eq!(overlay.artist_name.as_deref(), Some("Test Artist"));
        assert_eq!(overlay.average_tempo, Some(120.5));
        let props = overlay.arrangement_properties.unwrap();
        assert_eq!(props.power_chords, 1);
        assert_eq!(props.bends, 1);
        assert_eq!(props.hopo, 0);
    }

    #[test]
    fn missing_entries_yields_none() {
        let overlay = parse(r#"{"foo": "bar"}"#).unwrap();
        assert!(overlay.is_none());
    }

    #[test]
    fn strips_bom_before_parsing() {
        let json = "\u{FEFF}{\"Entries\": {}}";
        let overlay = parse(json).unwrap();
        assert!(overlay.is_none());
    }
}
