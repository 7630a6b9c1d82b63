/// Buffers decoded text and hands out complete newline-terminated lines.
///
/// Everything up to and including the last newline is consumed on each call
/// to [`LineBuffer::take_lines`]; only the newline-less tail stays buffered.
#[derive(Debug, Default, Clone)]
pub struct LineBuffer {
    buffer: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// Take every complete line, or `None` when no newline has arrived yet.
    /// Empty lines are included so callers can decide how to treat them.
    pub fn take_lines(&mut self) -> Option<Vec<String>> {
        let boundary = self.buffer.rfind('\n')?;
        let complete: String = self.buffer.drain(..=boundary).collect();
        Some(
            complete[..complete.len() - 1]
                .split('\n')
                .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
                .collect(),
        )
    }

    /// Take the newline-less remainder left at end of stream
    pub fn take_remainder(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }

    pub fn pending(&self) -> &str {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_newline_waits() {
        let mut buffer = LineBuffer::new();
        buffer.push("{\"partial\":");
        assert!(buffer.take_lines().is_none());
        assert_eq!(buffer.pending(), "{\"partial\":");
    }

    #[test]
    fn test_consumed_prefix_is_dropped() {
        let mut buffer = LineBuffer::new();
        buffer.push("one\ntwo\nthr");
        assert_eq!(buffer.take_lines().unwrap(), vec!["one", "two"]);
        assert_eq!(buffer.pending(), "thr");

        buffer.push("ee\n");
        assert_eq!(buffer.take_lines().unwrap(), vec!["three"]);
        assert_eq!(buffer.pending(), "");
        assert!(buffer.take_lines().is_none());
    }

    #[test]
    fn test_blank_lines_and_crlf() {
        let mut buffer = LineBuffer::new();
        buffer.push("a\r\n\nb\n");
        assert_eq!(buffer.take_lines().unwrap(), vec!["a", "", "b"]);
    }

    #[test]
    fn test_remainder() {
        let mut buffer = LineBuffer::new();
        buffer.push("x\ntail");
        buffer.take_lines();
        assert_eq!(buffer.take_remainder().as_deref(), Some("tail"));
        assert_eq!(buffer.take_remainder(), None);
    }
}
