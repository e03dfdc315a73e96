//! Byte-to-text decoding for fetched pages and feeds.
//!
//! Decoding walks an ordered chain and stops at the first success:
//!
//! 1. strict UTF-8
//! 2. strict GB18030 (covers GBK and GB2312)
//! 3. `chardetng`'s best guess, decoded with replacement characters
//!
//! The last step cannot fail, so [`resolve`] always yields text.

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, GB18030, UTF_8};
use tracing::debug;

/// Decoded text plus the name of the encoding that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    pub encoding: &'static str,
}

/// Decode raw bytes into text.
pub fn resolve(bytes: &[u8]) -> String {
    resolve_labeled(bytes).text
}

/// Decode raw bytes, reporting which step of the chain succeeded.
pub fn resolve_labeled(bytes: &[u8]) -> Decoded {
    for encoding in [UTF_8, GB18030] {
        if let Some(text) = decode_strict(encoding, bytes) {
            debug!(encoding = encoding.name(), bytes = bytes.len(), "Decoded strictly");
            return Decoded {
                text,
                encoding: encoding.name(),
            };
        }
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let guess = detector.guess(None, true);
    let (text, used, had_errors) = guess.decode(bytes);
    debug!(
        encoding = used.name(),
        had_errors,
        bytes = bytes.len(),
        "Decoded with detected encoding"
    );
    Decoded {
        text: text.into_owned(),
        encoding: used.name(),
    }
}

fn decode_strict(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
}
