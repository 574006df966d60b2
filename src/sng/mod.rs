pub mod decoder;
pub mod model;
pub mod parser;

pub use model::SongData;

use crate::error::Result;

/// Unwraps and parses a raw SNG asset's bytes into a `SongData`. The single entry point
/// `archive` and `container` call; keeps the wrap/parse split internal to this module.
pub fn decode(raw: &[u8]) -> Result<SongData> {
    let plaintext = decoder::unwrap_sng(raw)?;
    parser::parse(&plaintext)
}
