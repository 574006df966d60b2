//! Public facade tying the container reader, SNG pipeline, manifest overlay, and XML emitter
//! together, with a stable method-based API and an idempotent open/close lifecycle.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use crate::audio::{AudioConverter, UnsupportedAudioConverter};
use crate::container::{ContainerReader, TocEntry};
use crate::error::{EntryFailure, Error, Result};
use crate::manifest;
use crate::sng;
use crate::xml;

/// True for any archive entry whose decompressed bytes are an SNG-wrapped arrangement blob.
fn is_sng_entry(name: &str) -> bool {
    name.contains("songs/bin/generic/") && name.ends_with(".sng")
}

/// True for any archive entry that might be a manifest JSON overlay.
fn is_manifest_entry(name: &str) -> bool {
    name.contains("songs_dlc_") && name.ends_with(".json")
}

pub struct Archive {
    path: PathBuf,
    reader: Option<ContainerReader>,
}

impl Archive {
    /// Opens `path`, eagerly parsing the header, TOC, and names manifest.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let reader = ContainerReader::open(&path)?;
        Ok(Archive {
            path,
            reader: Some(reader),
        })
    }

    /// Re-opens the archive if it was previously closed. A no-op while already open, matching
    /// `open`'s idempotence contract.
    pub fn reopen(&mut self) -> Result<()> {
        if self.reader.is_none() {
            self.reader = Some(ContainerReader::open(&self.path)?);
        }
        Ok(())
    }

    /// Releases the file handle and clears all in-memory tables. A second call is a no-op.
    pub fn close(&mut self) {
        self.reader = None;
    }

    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    fn reader_mut(&mut self) -> Result<&mut ContainerReader> {
        self.reopen()?;
        Ok(self.reader.as_mut().expect("reopen() guarantees Some"))
    }

    fn reader(&self) -> &ContainerReader {
        self.reader.as_ref().expect("Archive always holds a reader while open")
    }

    pub fn file_count(&self) -> usize {
        self.reader().file_count()
    }

    pub fn file_list(&self) -> Vec<&str> {
        self.reader().names().collect()
    }

    pub fn file_exists(&self, name: &str) -> bool {
        self.reader().index_of(name).is_some()
    }

    pub fn entry(&self, name: &str) -> Option<&TocEntry> {
        self.reader().index_of(name).and_then(|i| self.reader().entry(i))
    }

    pub fn extract_file(&mut self, name: &str) -> Result<Vec<u8>> {
        self.reader_mut()?.extract_by_name(name)
    }

    pub fn extract_file_to(&mut self, name: &str, out_path: &Path) -> Result<()> {
        let bytes = self.extract_file(name)?;
        write_file(out_path, &bytes)
    }

    /// Extracts every entry into `dir`, preserving the entry's relative path. Per-entry failures
    /// are aggregated rather than aborting the loop; if any entry failed, returns
    /// `Error::PartialExtraction`.
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub fn extract_all(&mut self, dir: &Path) -> Result<()> {
        let names: Vec<String> = self.file_list().into_iter().map(str::to_owned).collect();
        let mut failures = Vec::new();

        for name in names {
            let out_path = dir.join(&name);
            if let Err(source) = self.extract_one_to(&name, &out_path) {
                warn!(name, error = %source, "entry extraction failed");
                failures.push(EntryFailure { name, source });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::PartialExtraction { failures })
        }
    }

    fn extract_one_to(&mut self, name: &str, out_path: &Path) -> Result<()> {
        let bytes = self.reader_mut()?.extract_by_name(name)?;
        write_file(out_path, &bytes)
    }

    /// Converts every SNG arrangement entry to XML under `dir/songs/arr/<stem>.xml`, matching
    /// manifest overlays by stem-equal (preferred) or substring basename match. Aggregates
    /// per-entry failures the same way `extract_all` does.
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub fn convert_sng(&mut self, dir: &Path) -> Result<()> {
        let names: Vec<String> = self.file_list().into_iter().map(str::to_owned).collect();
        let manifest_names: Vec<String> = names.iter().filter(|n| is_manifest_entry(n)).cloned().collect();
        let sng_names: Vec<String> = names.iter().filter(|n| is_sng_entry(n)).cloned().collect();

        let mut failures = Vec::new();
        for name in sng_names {
            if let Err(source) = self.convert_one_sng(&name, &manifest_names, dir) {
                warn!(name, error = %source, "sng conversion failed");
                failures.push(EntryFailure { name, source });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::PartialExtraction { failures })
        }
    }

    fn convert_one_sng(&mut self, name: &str, manifest_names: &[String], dir: &Path) -> Result<()> {
        let raw = self.reader_mut()?.extract_by_name(name)?;
        let song = sng::parser::parse(&raw)?;

        let stem = stem_of(name);
        let overlay_path = find_matching_manifest(manifest_names, stem);
        let overlay = match overlay_path {
            Some(path) => {
                let json_bytes = self.reader_mut()?.extract_by_name(path)?;
                let json_text = String::from_utf8_lossy(&json_bytes).into_owned();
                manifest::parse(&json_text)?
            }
            None => None,
        };

        let xml_bytes = xml::emit(&song, overlay.as_ref())?;
        let out_path = dir.join("songs").join("arr").join(format!("{stem}.xml"));
        write_file(&out_path, &xml_bytes)?;
        info!(name, out = %out_path.display(), "converted sng to xml");
        Ok(())
    }

    /// Converts every audio entry's bytes through `converter`. The built-in
    /// `UnsupportedAudioConverter` always fails, matching the out-of-scope Wwise pipeline.
    pub fn convert_audio(&mut self, dir: &Path, converter: &dyn AudioConverter) -> Result<()> {
        let names: Vec<String> = self
            .file_list()
            .into_iter()
            .filter(|n| n.ends_with(".wem") || n.ends_with(".bnk"))
            .map(str::to_owned)
            .collect();

        let mut failures = Vec::new();
        for name in names {
            let result = self
                .reader_mut()
                .and_then(|r| r.extract_by_name(&name))
                .and_then(|raw| converter.convert_to_ogg(&name, &raw));
            match result {
                Ok(ogg) => {
                    let out_path = dir.join(&name).with_extension("ogg");
                    if let Err(source) = write_file(&out_path, &ogg) {
                        failures.push(EntryFailure { name, source });
                    }
                }
                Err(source) => {
                    warn!(name, error = %source, "audio conversion failed");
                    failures.push(EntryFailure { name, source });
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::PartialExtraction { failures })
        }
    }

    /// Convenience for callers with no real Wwise pipeline available.
    pub fn convert_audio_unsupported(&mut self, dir: &Path) -> Result<()> {
        self.convert_audio(dir, &UnsupportedAudioConverter)
    }
}

fn stem_of(name: &str) -> &str {
    let base = name.rsplit('/').next().unwrap_or(name);
    base.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(base)
}

fn find_matching_manifest<'a>(manifest_names: &'a [String], stem: &str) -> Option<&'a str> {
    let needle = stem.to_ascii_lowercase();
    manifest_names
        .iter()
        .find(|n| stem_of(n).eq_ignore_ascii_case(stem))
        .or_else(|| manifest_names.iter().find(|n| n.to_ascii_lowercase().contains(needle.as_str())))
        .map(String::as_str)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| Error::WriteFailed {
            path: path.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, bytes).map_err(|source| Error::WriteFailed {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stem_of_strips_directory_and_extension() {
        assert_eq!(stem_of("songs/bin/generic/foo.sng"), "foo");
        assert_eq!(stem_of("bare.json"), "bare");
    }

    #[test]
    fn find_matching_manifest_prefers_stem_equality() {
        let names = vec!["songs_dlc_foo/manifests/foo_bar.json".to_string(), "songs_dlc_foo/manifests/foo.json".to_string()];
        assert_eq!(find_matching_manifest(&names, "foo"), Some("songs_dlc_foo/manifests/foo.json"));
    }
}
