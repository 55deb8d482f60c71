//! Encoding detection and text decoding with UTF-8 fallback logic.
//!
//! Files are read once as bytes (the extraction backends need the raw bytes
//! too), so everything here works on in-memory buffers:
//! - BOM detection (UTF-8, UTF-16 LE/BE)
//! - UTF-8 fast-path with strict validation
//! - Fallback encoding detection using chardetng
//! - Binary detection on a leading sample

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};

pub const DEFAULT_SAMPLE_SIZE: usize = 8192;

/// Detect the encoding of a byte buffer.
///
/// Strategy:
/// 1. Check for BOM markers first (most reliable)
/// 2. Try strict UTF-8 decoding (fast path for most modern files)
/// 3. Fall back to chardetng for non-UTF-8 content
pub fn detect_encoding(bytes: &[u8]) -> &'static Encoding {
    let sample = &bytes[..bytes.len().min(DEFAULT_SAMPLE_SIZE)];

    if sample.starts_with(&[0xef, 0xbb, 0xbf]) {
        return UTF_8;
    }
    if sample.starts_with(&[0xff, 0xfe]) {
        return UTF_16LE;
    }
    if sample.starts_with(&[0xfe, 0xff]) {
        return UTF_16BE;
    }

    if std::str::from_utf8(bytes).is_ok() {
        return UTF_8;
    }

    let mut detector = EncodingDetector::new();
    detector.feed(sample, true);
    detector.guess(None, true)
}

/// Decode bytes to a `String`, never failing.
///
/// Invalid sequences are replaced with U+FFFD, so binary content that falls back
/// to text handling still yields something printable.
pub fn decode_text(bytes: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.strip_prefix('\u{feff}').unwrap_or(text).to_string();
    }

    let encoding = detect_encoding(bytes);
    // `decode` sniffs and strips any BOM itself.
    let (decoded, _used, _had_errors) = encoding.decode(bytes);
    decoded.into_owned()
}

/// Detect if a byte sample looks binary (not text).
///
/// Uses two heuristics:
/// 1. Null byte check (strong binary indicator)
/// 2. Ratio of printable ASCII bytes (< 70% = likely binary)
pub fn is_binary_sample(bytes: &[u8]) -> bool {
    let sample = &bytes[..bytes.len().min(DEFAULT_SAMPLE_SIZE)];
    if sample.is_empty() {
        return false;
    }

    if sample.contains(&0) {
        return true;
    }

    // A valid UTF-8 sample is text even when most of it is non-ASCII.
    if std::str::from_utf8(sample).is_ok() {
        return false;
    }

    let printable_count = sample
        .iter()
        .filter(|&&b| (32..=126).contains(&b) || b == 9 || b == 10 || b == 13)
        .count();

    (printable_count as f64 / sample.len() as f64) < 0.70
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_utf8() {
        assert_eq!(detect_encoding("Hello, world!".as_bytes()), UTF_8);
    }

    #[test]
    fn test_detect_utf16_bom() {
        assert_eq!(detect_encoding(&[0xff, 0xfe, b'h', 0]), UTF_16LE);
        assert_eq!(detect_encoding(&[0xfe, 0xff, 0, b'h']), UTF_16BE);
    }

    #[test]
    fn test_decode_strips_utf8_bom() {
        let mut bytes = vec![0xef, 0xbb, 0xbf];
        bytes.extend_from_slice(b"Hello");
        assert_eq!(decode_text(&bytes), "Hello");
    }

    #[test]
    fn test_decode_utf16le() {
        let bytes = [0xff, 0xfe, b'h', 0, b'i', 0];
        assert_eq!(decode_text(&bytes), "hi");
    }

    #[test]
    fn test_decode_latin1_fallback() {
        let bytes = b"Le caf\xe9 est tr\xe8s bon";
        assert_eq!(decode_text(bytes), "Le café est très bon");
    }

    #[test]
    fn test_binary_detection() {
        assert!(is_binary_sample(&[0x89, b'P', b'N', b'G', 0, 0, 0, 13]));
        assert!(!is_binary_sample(b"fn main() {}\n"));
        assert!(!is_binary_sample("日本語のテキスト".as_bytes()));
        assert!(!is_binary_sample(b""));
    }
}
