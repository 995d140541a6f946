//! Incremental UTF-8 decoding of PTY output.
//!
//! Reads from the child land on arbitrary byte boundaries, so a multi-byte
//! character can arrive split across two chunks. The decoder holds back an
//! incomplete trailing sequence until the next chunk completes it.

/// Longest prefix of a valid UTF-8 sequence that can still be incomplete.
const MAX_PENDING: usize = 3;

/// Stateful chunk decoder. Invalid bytes become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `chunk`, returning every complete character seen so far.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::with_capacity(self.pending.len());
        let mut rest: &[u8] = &self.pending;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[bad..];
                        }
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        let carried = rest.len().min(MAX_PENDING);
        let tail = rest[rest.len() - carried..].to_vec();
        self.pending = tail;
        out
    }

    /// Flush anything still held back. Incomplete bytes become U+FFFD.
    pub fn finish(&mut self) -> String {
        let tail = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&tail).into_owned()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_passes_straight_through() {
        let mut d = Utf8ChunkDecoder::new();
        assert_eq!(d.decode(b"ls -la\r\n"), "ls -la\r\n");
        assert!(!d.has_pending());
    }

    #[test]
    fn split_multibyte_is_reassembled() {
        let bytes = "héllo → wörld".as_bytes();
        for split in 0..=bytes.len() {
            let mut d = Utf8ChunkDecoder::new();
            let mut text = d.decode(&bytes[..split]);
            text.push_str(&d.decode(&bytes[split..]));
            text.push_str(&d.finish());
            assert_eq!(text, "héllo → wörld", "split at {split}");
        }
    }

    #[test]
    fn four_byte_char_across_three_chunks() {
        let crab = "🦀".as_bytes();
        let mut d = Utf8ChunkDecoder::new();
        assert_eq!(d.decode(&crab[..1]), "");
        assert_eq!(d.decode(&crab[1..3]), "");
        assert!(d.has_pending());
        assert_eq!(d.decode(&crab[3..]), "🦀");
    }

    #[test]
    fn invalid_bytes_are_replaced() {
        let mut d = Utf8ChunkDecoder::new();
        assert_eq!(d.decode(b"a\xffb"), "a\u{FFFD}b");
    }

    #[test]
    fn dangling_prefix_is_replaced_on_finish() {
        let mut d = Utf8ChunkDecoder::new();
        assert_eq!(d.decode(b"ok\xe2\x86"), "ok");
        assert_eq!(d.finish(), "\u{FFFD}");
        assert!(!d.has_pending());
    }
}
