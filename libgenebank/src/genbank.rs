use std::io::BufRead;

use crate::error::Result;

/// Iterator over the sequences of a GenBank flat file.
///
/// Each record's sequence starts on the line after `ORIGIN` and runs to the
/// `//` terminator. Only `A`, `C`, `G`, `T` and `N` are kept, upper cased;
/// base counts, spaces and anything else are dropped.
pub struct GenBank<R: BufRead>
{
    reader: R,
    line: Vec<u8>,
    sequence: Vec<u8>,
    state: State,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State
{
    Header,
    Sequence,
    Done,
}

impl<R: BufRead> GenBank<R>
{
    pub fn from_buffer(reader: R) -> GenBank<R>
    {
        GenBank {
            reader,
            line: Vec::with_capacity(128),
            sequence: Vec::with_capacity(64 * 1024),
            state: State::Header,
        }
    }

    fn finish_record(&mut self) -> Vec<u8>
    {
        let mut sequence = Vec::with_capacity(self.sequence.len());
        std::mem::swap(&mut self.sequence, &mut sequence);
        sequence
    }
}

impl<R: BufRead> Iterator for GenBank<R>
{
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Result<Vec<u8>>>
    {
        loop {
            if self.state == State::Done {
                return None;
            }

            self.line.clear();
            let bytes_read = match self.reader.read_until(b'\n', &mut self.line) {
                Ok(bytes_read) => bytes_read,
                Err(e) => {
                    self.state = State::Done;
                    return Some(Err(e.into()));
                }
            };

            match self.state {
                State::Header => {
                    if bytes_read == 0 {
                        self.state = State::Done;
                    } else if self.line.starts_with(b"ORIGIN") {
                        self.sequence.clear();
                        self.state = State::Sequence;
                    }
                }
                State::Sequence => {
                    if bytes_read == 0 {
                        log::warn!("GenBank record ended without a // terminator");
                        self.state = State::Done;
                        return Some(Ok(self.finish_record()));
                    }

                    let start = self
                        .line
                        .iter()
                        .position(|b| !b.is_ascii_whitespace())
                        .unwrap_or(self.line.len());
                    if self.line[start..].starts_with(b"//") {
                        self.state = State::Header;
                        return Some(Ok(self.finish_record()));
                    }

                    self.sequence.extend(
                        self.line
                            .iter()
                            .map(u8::to_ascii_uppercase)
                            .filter(|&b| matches!(b, b'A' | b'C' | b'G' | b'T' | b'N')),
                    );
                }
                State::Done => return None,
            }
        }
    }
}

/// Every window of length `k`, starting at `0..=len - k`, that holds no `N`
pub fn windows(sequence: &[u8], k: usize) -> impl Iterator<Item = &[u8]>
{
    // slice::windows panics on 0
    sequence
        .windows(k.max(1))
        .filter(|window| !window.contains(&b'N'))
}

/// Number of window start positions in a sequence of `len` bases
pub fn window_count(len: usize, k: usize) -> usize
{
    (len + 1).saturating_sub(k.max(1))
}
