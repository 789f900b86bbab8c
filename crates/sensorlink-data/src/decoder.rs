//! Sample decoding contract and stock decoders.

use tracing::{trace, warn};

use crate::channel::Frames;

/// Turns buffered bytes into samples, one record per call.
///
/// Returning `false` means the step found no complete record; the drain
/// loop stops there and waits for the next readiness notification.
pub trait SampleDecoder {
    fn decode(&mut self, frames: &mut Frames<'_>) -> bool;
}

impl<F> SampleDecoder for F
where
    F: FnMut(&mut Frames<'_>) -> bool,
{
    fn decode(&mut self, frames: &mut Frames<'_>) -> bool {
        self(frames)
    }
}

/// Reads one fixed-size record per step and hands it to `sink`.
pub struct FixedSizeDecoder<F> {
    buf: Vec<u8>,
    sink: F,
}

impl<F: FnMut(&[u8])> FixedSizeDecoder<F> {
    /// A zero `record_size` is treated as one byte.
    pub fn new(record_size: usize, sink: F) -> Self {
        Self {
            buf: vec![0; record_size.max(1)],
            sink,
        }
    }

    pub fn record_size(&self) -> usize {
        self.buf.len()
    }
}

impl<F: FnMut(&[u8])> SampleDecoder for FixedSizeDecoder<F> {
    fn decode(&mut self, frames: &mut Frames<'_>) -> bool {
        if !frames.read(&mut self.buf) {
            return false;
        }
        (self.sink)(&self.buf);
        true
    }
}

/// Largest record count a [`BatchDecoder`] accepts by default.
pub const DEFAULT_MAX_BATCH: u32 = 4096;

/// Reads counted batches: a little-endian `u32` record count followed by
/// that many fixed-size records.
///
/// When the header has arrived but the body is still incomplete, the count
/// is kept and the next step resumes with the body. A count above the
/// batch limit is dropped without reading a body.
pub struct BatchDecoder<F> {
    buf: Vec<u8>,
    pending: Option<u32>,
    max_batch: u32,
    sink: F,
}

impl<F: FnMut(&[u8])> BatchDecoder<F> {
    /// A zero `record_size` is treated as one byte.
    pub fn new(record_size: usize, sink: F) -> Self {
        Self {
            buf: vec![0; record_size.max(1)],
            pending: None,
            max_batch: DEFAULT_MAX_BATCH,
            sink,
        }
    }

    #[must_use]
    pub fn with_max_batch(mut self, max_batch: u32) -> Self {
        self.max_batch = max_batch;
        self
    }

    /// Whether a header has been read whose body has not arrived yet.
    pub fn is_mid_batch(&self) -> bool {
        self.pending.is_some()
    }
}

impl<F: FnMut(&[u8])> SampleDecoder for BatchDecoder<F> {
    fn decode(&mut self, frames: &mut Frames<'_>) -> bool {
        let count = match self.pending {
            Some(count) => count,
            None => {
                let Some(count) = frames.read_u32_le() else {
                    return false;
                };
                if count > self.max_batch {
                    warn!(
                        count,
                        max = self.max_batch,
                        "batch count out of range, dropping header"
                    );
                    return true;
                }
                self.pending = Some(count);
                count
            }
        };

        let needed = (count as usize).saturating_mul(self.buf.len());
        if frames.bytes_available() < needed {
            trace!(count, needed, "batch body incomplete");
            return false;
        }

        for _ in 0..count {
            if !frames.read(&mut self.buf) {
                return false;
            }
            (self.sink)(&self.buf);
        }
        self.pending = None;
        true
    }
}
