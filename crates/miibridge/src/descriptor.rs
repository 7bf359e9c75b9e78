use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use miibridge::wire::{StoreData, STORE_DATA_LEN};

use crate::exit::{CliError, CliResult, DATA_INVALID};

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// Decode a descriptor given as hex (whitespace ignored) or base64.
///
/// Hex is tried first: a 192-digit hex string is also valid base64.
pub fn parse_descriptor(input: &str) -> CliResult<StoreData> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(CliError::new(DATA_INVALID, "avatar data must not be empty"));
    }

    let decoded = hex::decode(&compact)
        .ok()
        .or_else(|| STANDARD.decode(&compact).ok())
        .or_else(|| URL_SAFE.decode(&compact).ok())
        .ok_or_else(|| {
            CliError::new(DATA_INVALID, "avatar data is neither hex nor base64")
        })?;

    StoreData::from_slice(&decoded).map_err(|_| {
        CliError::new(
            DATA_INVALID,
            format!(
                "avatar data must decode to {STORE_DATA_LEN} bytes (got {})",
                decoded.len()
            ),
        )
    })
}
