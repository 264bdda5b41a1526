//! Entry-name decoding for archives written without the UTF-8 flag.
//!
//! Many Windows archivers store names in the system code page. The raw
//! bytes are tried as strict UTF-8 first, then against [`legacy_encodings`]
//! in order. The first decoding without malformed sequences wins.

use encoding_rs::{Encoding, BIG5, EUC_KR, GBK, SHIFT_JIS, WINDOWS_1251, WINDOWS_1252};

/// Fallback encodings, tried in order. GBK also covers GB2312, and
/// windows-1252 is the WHATWG decoder behind the ISO-8859-1 label.
pub fn legacy_encodings() -> [&'static Encoding; 6] {
    [GBK, BIG5, SHIFT_JIS, EUC_KR, WINDOWS_1252, WINDOWS_1251]
}

/// Decode a raw entry name. `codec_name` is the name the zip reader produced
/// (UTF-8 or CP437) and is returned when nothing decodes cleanly.
pub fn decode_entry_name(raw: &[u8], codec_name: &str) -> String {
    if let Ok(name) = std::str::from_utf8(raw) {
        return name.to_string();
    }

    legacy_encodings()
        .into_iter()
        .filter_map(|encoding| encoding.decode_without_bom_handling_and_without_replacement(raw))
        .find(|name| !name.trim().is_empty())
        .map(|name| name.into_owned())
        .unwrap_or_else(|| codec_name.to_string())
}
