//! Response buffer capture.
//!
//! The host writes response output here as it is produced, possibly in byte chunks that split
//! multi-byte characters, and hands the finished text to the finalizer.
use std::io;

#[derive(Clone, Debug, Default)]
pub struct ResponseCapture {
    text: String,
    /// Incomplete UTF-8 suffix of the last chunk, at most 3 bytes.
    carry: Vec<u8>,
}

impl ResponseCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_str(&mut self, chunk: &str) {
        self.flush_carry();
        self.text.push_str(chunk);
    }

    /// Appends a byte chunk. Invalid sequences become U+FFFD; a sequence cut off at the end
    /// of the chunk waits for the next one.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        if self.carry.is_empty() {
            self.decode(bytes);
            return;
        }
        let mut joined = std::mem::take(&mut self.carry);
        joined.extend_from_slice(bytes);
        self.decode(&joined);
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len() + self.carry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The captured text. A dangling partial character is kept, lossily.
    pub fn finish(mut self) -> String {
        self.flush_carry();
        self.text
    }

    fn flush_carry(&mut self) {
        if self.carry.is_empty() {
            return;
        }
        log::trace!(
            target: "annotate.emit",
            "flushing {} bytes of incomplete UTF-8",
            self.carry.len()
        );
        self.text.push_str(&String::from_utf8_lossy(&self.carry));
        self.carry.clear();
    }

    fn decode(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            let err = match std::str::from_utf8(bytes) {
                Ok(valid) => {
                    self.text.push_str(valid);
                    return;
                }
                Err(err) => err,
            };
            let (valid, rest) = bytes.split_at(err.valid_up_to());
            self.text.push_str(&String::from_utf8_lossy(valid));
            match err.error_len() {
                Some(len) => {
                    self.text.push(char::REPLACEMENT_CHARACTER);
                    bytes = &rest[len..];
                }
                None => {
                    self.carry.extend_from_slice(rest);
                    return;
                }
            }
        }
    }
}

impl io::Write for ResponseCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn character_split_across_chunks() {
        let bytes = "<p>café</p>".as_bytes();
        let split = bytes.iter().position(|&b| b == 0xC3).expect("lead byte") + 1;
        let mut capture = ResponseCapture::new();
        capture.write_bytes(&bytes[..split]);
        assert_eq!(capture.as_str(), "<p>caf");
        capture.write_bytes(&bytes[split..]);
        assert_eq!(capture.finish(), "<p>café</p>");
    }

    #[test]
    fn invalid_bytes_are_replaced() {
        let mut capture = ResponseCapture::new();
        capture.write_bytes(b"a\xFFb");
        assert_eq!(capture.finish(), "a\u{FFFD}b");
    }

    #[test]
    fn dangling_partial_character_is_flushed() {
        let mut capture = ResponseCapture::new();
        capture.write_bytes(b"x\xE2\x82");
        assert_eq!(capture.as_str(), "x");
        assert_eq!(capture.finish(), "x\u{FFFD}");
    }

    #[test]
    fn io_write_and_str_chunks_mix() {
        let mut capture = ResponseCapture::new();
        write!(capture, "<!-- inv {} -->", 3).expect("write");
        capture.push_str("<div></div>");
        assert_eq!(capture.finish(), "<!-- inv 3 --><div></div>");
    }
}
