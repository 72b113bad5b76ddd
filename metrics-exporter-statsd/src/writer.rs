use std::{
    ops::{Deref, DerefMut},
    vec::Drain,
};

/// The shortest line that is still a valid statsd metric.
pub(crate) const SMALLEST_VALID_PAYLOAD: &[u8] = b"a:0|c\n";

/// Outcome of writing a line into a [`PayloadWriter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteResult {
    /// The line was added to the current payload.
    Written,

    /// The line did not fit in the current payload, which was finalized before the line was added to a new one.
    WrittenAfterFinalize,

    /// The line is larger than the maximum payload length by itself, and was discarded.
    Dropped,
}

/// Packs newline-delimited lines into payloads for more efficient network I/O.
///
/// Statsd lines are always newline delimited, which means that multiple lines can be sent in a single datagram and
/// trivially split apart by the remote server. This helps save on the number of system calls required to send the
/// metrics over the network.
///
/// Each payload contains one or more complete lines and never exceeds the maximum payload length.
pub(crate) struct PayloadWriter {
    max_payload_len: usize,
    payloads_buf: Vec<u8>,
    offsets: Vec<usize>,
}

impl PayloadWriter {
    /// Creates a new `PayloadWriter` with the given maximum payload length.
    pub fn new(max_payload_len: usize) -> Self {
        // NOTE: The builder rejects this too, but we want to double check that we're getting a properly sanitized value.
        assert!(
            max_payload_len >= SMALLEST_VALID_PAYLOAD.len(),
            "maximum payload length is too small to allow any metrics to be written (must be {} or greater)",
            SMALLEST_VALID_PAYLOAD.len()
        );

        Self { max_payload_len, payloads_buf: Vec::with_capacity(max_payload_len), offsets: Vec::new() }
    }

    fn last_offset(&self) -> usize {
        self.offsets.last().copied().unwrap_or(0)
    }

    /// Returns the number of bytes in the current, unfinalized payload.
    fn current_payload_len(&self) -> usize {
        self.payloads_buf.len() - self.last_offset()
    }

    /// Returns the number of payloads that have been finalized but not yet taken.
    pub fn finalized_payloads(&self) -> usize {
        self.offsets.len()
    }

    /// Finalizes the current payload and starts a new one.
    ///
    /// If the current payload is empty, this method does nothing.
    fn finalize_current_payload(&mut self) {
        if self.current_payload_len() == 0 {
            return;
        }

        self.offsets.push(self.payloads_buf.len());
    }

    /// Writes a single line into the current payload.
    ///
    /// If the line is larger than the maximum payload length, it is discarded. If the current payload cannot fit the
    /// line without exceeding the maximum payload length, the current payload is first finalized and a new one started.
    pub fn write_line(&mut self, line: &str) -> WriteResult {
        let line_len = line.len();
        if line_len > self.max_payload_len {
            return WriteResult::Dropped;
        }

        let result = if self.current_payload_len() + line_len > self.max_payload_len {
            self.finalize_current_payload();
            WriteResult::WrittenAfterFinalize
        } else {
            WriteResult::Written
        };

        self.payloads_buf.extend_from_slice(line.as_bytes());
        result
    }

    /// Returns a consuming iterator over all payloads written by this writer.
    ///
    /// The iterator will yield payloads in the order they were written, and the payloads will be cleared from the
    /// writer when the iterator is dropped.
    pub fn payloads(&mut self) -> Payloads<'_> {
        self.finalize_current_payload();

        Payloads::new(&mut self.payloads_buf, &mut self.offsets)
    }
}

/// Iterator over all payloads written by a `PayloadWriter`.
pub(crate) struct Payloads<'a> {
    payloads_buf: ConsumingBufferSwap<'a, u8>,
    start: usize,
    offsets: Drain<'a, usize>,
}

impl<'a> Payloads<'a> {
    fn new(payload_buf: &'a mut Vec<u8>, offsets: &'a mut Vec<usize>) -> Self {
        Self { payloads_buf: ConsumingBufferSwap::new(payload_buf), start: 0, offsets: offsets.drain(..) }
    }

    /// Returns the number of remaining payloads.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Returns the next payload.
    ///
    /// If there are no more payloads, `None` is returned.
    pub fn next_payload(&mut self) -> Option<&[u8]> {
        let offset = self.offsets.next()?;

        let offset_buf = &self.payloads_buf[self.start..offset];
        self.start = offset;

        Some(offset_buf)
    }
}

// Helper type for "pre-pooping our pants".
//
// The payload buffer is meant to be entirely empty once its payloads have been handed out. Since it's safe to "forget"
// a value and never run its drop logic, we can't rely on `Drop` alone to clear it. So we pre-poop our pants.
//
// Swapping the buffer out for an empty one establishes the end state (the buffer is cleared) as soon as
// `ConsumingBufferSwap` is created. When the drop logic does run, the original buffer is cleared and put back, which
// lets us reuse the allocation. At worst, if it doesn't run, the buffer is still empty.
//
// https://faultlore.com/blah/everyone-poops/
struct ConsumingBufferSwap<'a, T> {
    source: &'a mut Vec<T>,
    original: Vec<T>,
}

impl<'a, T> ConsumingBufferSwap<'a, T> {
    fn new(source: &'a mut Vec<T>) -> Self {
        let original = std::mem::take(source);
        Self { source, original }
    }
}

impl<T> Drop for ConsumingBufferSwap<'_, T> {
    fn drop(&mut self) {
        self.original.clear();
        std::mem::swap(self.source, &mut self.original);
    }
}

impl<T> Deref for ConsumingBufferSwap<'_, T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Self::Target {
        &self.original
    }
}

impl<T> DerefMut for ConsumingBufferSwap<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.original
    }
}
