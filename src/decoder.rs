//! Incremental UTF-8 decoding over arbitrarily split byte chunks
//!
//! Chunk boundaries carry no alignment guarantee, so a multi-byte character
//! may arrive split across two (or, for 4-byte sequences, four) chunks. The
//! decoder holds back the incomplete tail and prepends it to the next chunk.

use crate::error::DecodeError;

/// Longest UTF-8 sequence, so the pending buffer never exceeds this minus one
const MAX_UTF8_LEN: usize = 4;

#[derive(Debug, Default)]
pub struct StreamDecoder {
    /// Undecoded trailing bytes of the previous chunk (at most 3)
    pending: Vec<u8>,
    /// Absolute stream offset of `pending[0]`
    offset: u64,
    /// Sticky error: once the stream is malformed every later call reports it
    failed: Option<DecodeError>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self {
            pending: Vec::with_capacity(MAX_UTF8_LEN),
            offset: 0,
            failed: None,
        }
    }

    /// Decode the longest complete prefix of `pending + chunk`.
    ///
    /// An invalid sequence poisons the decoder. Text validated ahead of the
    /// bad byte is still returned; the error surfaces on the following call
    /// (or on [`finish`](Self::finish)).
    pub fn feed(&mut self, chunk: &[u8]) -> Result<String, DecodeError> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }

        let joined;
        let bytes: &[u8] = if self.pending.is_empty() {
            chunk
        } else {
            self.pending.extend_from_slice(chunk);
            joined = std::mem::take(&mut self.pending);
            &joined
        };

        let (text, valid, tail) = match std::str::from_utf8(bytes) {
            Ok(s) => (s.to_owned(), bytes.len(), None),
            Err(e) => {
                let valid = e.valid_up_to();
                // `..valid` is known-good UTF-8
                let prefix = std::str::from_utf8(&bytes[..valid]).unwrap_or_default();
                // No error_len: input ended mid-sequence, carry the remainder forward
                (prefix.to_owned(), valid, e.error_len().map(|_| valid))
            }
        };

        if let Some(bad_at) = tail {
            let err = DecodeError::InvalidSequence {
                offset: self.offset + bad_at as u64,
            };
            self.failed = Some(err.clone());
            self.offset += valid as u64;
            if valid == 0 {
                return Err(err);
            }
            return Ok(text);
        }

        self.pending.clear();
        self.pending.extend_from_slice(&bytes[valid..]);
        self.offset += valid as u64;
        Ok(text)
    }

    /// End of stream. Leftover bytes that never completed a character are an
    /// error, never silently dropped.
    pub fn finish(&mut self) -> Result<(), DecodeError> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }
        if !self.pending.is_empty() {
            let err = DecodeError::TruncatedTail {
                pending: self.pending.len(),
            };
            self.failed = Some(err.clone());
            return Err(err);
        }
        Ok(())
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Bytes turned into text so far
    pub fn bytes_decoded(&self) -> u64 {
        self.offset
    }

    pub fn is_failed(&self) -> bool {
        self.failed.is_some()
    }
}

/// Run a sequence of chunks through a fresh decoder and collect the text.
pub fn decode_chunks<'a, I>(chunks: I) -> Result<String, DecodeError>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut decoder = StreamDecoder::new();
    let mut out = String::new();
    for chunk in chunks {
        out.push_str(&decoder.feed(chunk)?);
    }
    decoder.finish()?;
    Ok(out)
}
