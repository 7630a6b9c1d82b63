use encoding_rs::{CoderResult, Decoder, UTF_8};

/// Stateful UTF-8 decoder for chunked response bodies.
///
/// Chunk boundaries do not have to line up with character boundaries: an
/// incomplete multi-byte sequence at the end of one chunk is held back and
/// completed by the next one.
pub struct StreamDecoder {
    decoder: Decoder,
    finished: bool,
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self {
            decoder: UTF_8.new_decoder(),
            finished: false,
        }
    }

    /// Decode the next chunk, returning whatever text is complete so far
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.decode_inner(chunk, false)
    }

    /// Flush held-back bytes at end of stream. A dangling partial sequence
    /// becomes U+FFFD. Further calls return an empty string.
    pub fn finish(&mut self) -> String {
        if self.finished {
            return String::new();
        }
        self.finished = true;
        self.decode_inner(&[], true)
    }

    fn decode_inner(&mut self, chunk: &[u8], last: bool) -> String {
        let mut output = String::new();
        let mut src = chunk;

        loop {
            let needed = self
                .decoder
                .max_utf8_buffer_length(src.len())
                .unwrap_or(src.len() * 3 + 4);
            output.reserve(needed);

            let (result, read, had_replacements) =
                self.decoder.decode_to_string(src, &mut output, last);
            if had_replacements {
                tracing::debug!("Replaced malformed UTF-8 in response stream");
            }
            src = &src[read..];

            match result {
                CoderResult::InputEmpty => break,
                CoderResult::OutputFull => continue,
            }
        }

        output
    }
}
