//! Call-out boundary for WEM/BNK → OGG audio conversion. The actual conversion depends on an
//! external Wwise codec this crate does not vendor; expressing it as a trait here means `Archive`
//! carries no dependency on that tool, and a caller who has one can plug it in without forking
//! `Archive`.

use crate::error::{Error, Result};

/// Converts one audio entry's raw bytes to OGG. The default converter always fails with
/// `AudioConversionNotSupported`; callers with access to a real Wwise pipeline supply their own.
pub trait AudioConverter {
    fn convert_to_ogg(&self, name: &str, raw: &[u8]) -> Result<Vec<u8>>;
}

/// The converter `Archive::convert_audio` falls back to when the caller supplies none.
pub struct UnsupportedAudioConverter;

impl AudioConverter for UnsupportedAudioConverter {
    fn convert_to_ogg(&self, _name: &str, _raw: &[u8]) -> Result<Vec<u8>> {
        Err(Error::AudioConversionNotSupported)
    }
}
