//! Base64url helpers for the compact token segments

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};

/// URL-safe alphabet; never pads when encoding, accepts either form when decoding
const URL_SAFE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub(crate) fn encode(raw: &[u8]) -> String {
    URL_SAFE.encode(raw)
}

pub(crate) fn decode(enc: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE.decode(enc)
}

/// Length of the unpadded encoding of `len` raw bytes
pub(crate) fn calc_encoded_len(len: usize) -> usize {
    let d = len / 3 * 4;
    let m = len % 3;
    if m > 0 {
        d + m + 1
    } else {
        d
    }
}
