//! Chunked output with the "first chunk or clean error" guarantee.

use std::io::Write;

use log::{debug, warn};

use crate::consts::ERROR_FOOTER_PREFIX;
use crate::errors::{ExportError, Result};

/// Pieces of output as produced by a serializer, in order.
pub type Pieces = Box<dyn Iterator<Item = Result<Vec<u8>>> + Send>;

/// One unit handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Data(Vec<u8>),
    /// Export failed after output was already delivered. `footer` is meant
    /// to be appended to what was sent; nothing follows this chunk.
    Failure { cancelled: bool, footer: String },
}

/// How a stream that was written out ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    Complete { bytes: usize },
    Failed { bytes: usize, cancelled: bool },
}

/// Output of one export, produced lazily on iteration.
///
/// The first chunk is computed by [`ExportStream::new`], so a failure before
/// any output exists is an ordinary error. Later failures are reported as a
/// single [`Chunk::Failure`].
pub struct ExportStream {
    pieces: Pieces,
    min_chunk_bytes: usize,
    first: Option<Vec<u8>>,
    finished: bool,
}

impl ExportStream {
    pub fn new(pieces: Pieces, min_chunk_bytes: usize) -> Result<Self> {
        let mut stream = ExportStream {
            pieces,
            min_chunk_bytes,
            first: None,
            finished: false,
        };
        stream.first = stream.pull()?;
        debug!(
            "export stream started, first chunk has {} bytes",
            stream.first.as_ref().map_or(0, Vec::len)
        );
        Ok(stream)
    }

    /// Gather pieces until a chunk is big enough or the output ends.
    /// A failure discards the partially gathered chunk.
    fn pull(&mut self) -> Result<Option<Vec<u8>>> {
        let mut buf = Vec::new();
        while !self.finished {
            match self.pieces.next() {
                None => self.finished = true,
                Some(Ok(piece)) => {
                    buf.extend_from_slice(&piece);
                    if !buf.is_empty() && buf.len() >= self.min_chunk_bytes {
                        return Ok(Some(buf));
                    }
                }
                Some(Err(e)) => {
                    self.finished = true;
                    return Err(e);
                }
            }
        }
        Ok((!buf.is_empty()).then_some(buf))
    }

    /// Write all chunks, including a failure footer, to `out`.
    pub fn write_to<W: Write>(self, out: &mut W) -> Result<StreamEnd> {
        let mut bytes = 0;
        for chunk in self {
            match chunk {
                Chunk::Data(data) => {
                    out.write_all(&data)?;
                    bytes += data.len();
                }
                Chunk::Failure { cancelled, footer } => {
                    out.write_all(footer.as_bytes())?;
                    out.flush()?;
                    return Ok(StreamEnd::Failed { bytes, cancelled });
                }
            }
        }
        out.flush()?;
        Ok(StreamEnd::Complete { bytes })
    }
}

fn failure_chunk(e: &ExportError) -> Chunk {
    Chunk::Failure {
        cancelled: e.is_cancellation(),
        footer: format!("{}{}", ERROR_FOOTER_PREFIX, e),
    }
}

impl Iterator for ExportStream {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if let Some(first) = self.first.take() {
            return Some(Chunk::Data(first));
        }
        match self.pull() {
            Ok(Some(data)) => Some(Chunk::Data(data)),
            Ok(None) => {
                debug!("export stream finished");
                None
            }
            Err(e) => {
                warn!("export failed after output had started: {}", e);
                Some(failure_chunk(&e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pieces(items: Vec<Result<&'static str>>) -> Pieces {
        Box::new(items.into_iter().map(|r| r.map(|s| s.as_bytes().to_vec())))
    }

    fn fail() -> Result<&'static str> {
        Err(ExportError::Execution("boom".into()))
    }

    #[test]
    fn error_in_first_chunk_is_returned() {
        let err = ExportStream::new(pieces(vec![Ok("a"), fail()]), 10).err().unwrap();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn later_error_becomes_single_footer() {
        let stream = ExportStream::new(pieces(vec![Ok("a"), Ok("b"), fail(), Ok("c")]), 1).unwrap();
        let chunks: Vec<Chunk> = stream.collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], Chunk::Data(b"a".to_vec()));
        assert_eq!(chunks[1], Chunk::Data(b"b".to_vec()));
        match &chunks[2] {
            Chunk::Failure { cancelled, footer } => {
                assert!(!cancelled);
                assert!(footer.starts_with(ERROR_FOOTER_PREFIX));
                assert!(footer.ends_with("boom"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn cancellation_is_labelled() {
        let items = vec![Ok("a"), Err(ExportError::Cancelled("stop".into()))];
        let stream = ExportStream::new(pieces(items), 1).unwrap();
        let last = stream.last().unwrap();
        assert!(matches!(last, Chunk::Failure { cancelled: true, .. }));
    }

    #[test]
    fn pieces_are_coalesced() {
        let stream = ExportStream::new(pieces(vec![Ok("ab"), Ok(""), Ok("cd"), Ok("e")]), 4).unwrap();
        let chunks: Vec<Chunk> = stream.collect();
        assert_eq!(
            chunks,
            vec![Chunk::Data(b"abcd".to_vec()), Chunk::Data(b"e".to_vec())]
        );
    }

    #[test]
    fn empty_output_has_no_chunks() {
        let stream = ExportStream::new(pieces(vec![Ok(""), Ok("")]), 0).unwrap();
        assert_eq!(stream.count(), 0);
    }

    #[test]
    fn write_reports_failures() {
        let stream = ExportStream::new(pieces(vec![Ok("xy"), fail()]), 1).unwrap();
        let mut out = Vec::new();
        let end = stream.write_to(&mut out).unwrap();
        assert_eq!(end, StreamEnd::Failed { bytes: 2, cancelled: false });
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("xy\n !!!!>>"));
    }
}
