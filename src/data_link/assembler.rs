use super::TRAILER;
use crate::types::FrameData;
use log::trace;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Receive buffer shared between the byte-arrival side and the processing tick.
///
/// The trailer pair can legitimately occur inside payload data, so a frame is
/// only reported ready once the trailer has been seen *and* the transport has
/// gone quiet. The device never pauses mid-frame.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    inner: Mutex<AssemblerState>,
}

#[derive(Debug, Default)]
struct AssemblerState {
    buffer: FrameData,
    last: Option<u8>,
    trailer_seen: bool,
    frame_ready: bool,
}

impl AssemblerState {
    fn reset(&mut self) -> FrameData {
        self.last = None;
        self.trailer_seen = false;
        self.frame_ready = false;
        std::mem::take(&mut self.buffer)
    }
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, AssemblerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends received bytes. `more_pending` is whether the transport still
    /// has bytes immediately available after this chunk.
    pub fn feed(&self, bytes: &[u8], more_pending: bool) {
        let mut state = self.lock();
        for &byte in bytes {
            if state.last == Some(TRAILER[0]) && byte == TRAILER[1] {
                state.trailer_seen = true;
            }
            state.last = Some(byte);
            state.buffer.push(byte);
        }
        if state.trailer_seen && !more_pending {
            state.frame_ready = true;
        }
    }

    pub fn is_frame_ready(&self) -> bool {
        self.lock().frame_ready
    }

    pub fn len(&self) -> usize {
        self.lock().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hands over the buffered frame once it is complete, clearing the buffer
    pub fn try_take_frame(&self) -> Option<FrameData> {
        let mut state = self.lock();
        if !state.frame_ready {
            return None;
        }
        let frame = state.reset();
        trace!("frame ready: {} bytes", frame.len());
        Some(frame)
    }

    /// Hands over whatever is buffered, framed or not. Used while waiting for
    /// single-byte acknowledgments.
    pub fn take_bytes(&self) -> Option<FrameData> {
        let mut state = self.lock();
        if state.buffer.is_empty() {
            return None;
        }
        Some(state.reset())
    }

    pub fn clear(&self) {
        self.lock().reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn frame_ready_after_trailer_at_quiescence() {
        let assembler = FrameAssembler::new();
        assembler.feed(&[0x84, 0x19, b'x'], false);
        assert!(assembler.try_take_frame().is_none());

        assembler.feed(&[0x24, 0x20, 1, 2, 3, 4], false);
        let frame = assembler.try_take_frame().unwrap();
        assert_eq!(frame, vec![0x84, 0x19, b'x', 0x24, 0x20, 1, 2, 3, 4]);
        assert!(assembler.is_empty());
        assert!(assembler.try_take_frame().is_none());
    }

    #[test]
    fn trailer_inside_payload_waits_for_quiescence() {
        let assembler = FrameAssembler::new();
        // Trailer pair in the middle of a chunk while more bytes are pending
        assembler.feed(&[0x84, 0x19, 0x24, 0x20, 0x55], true);
        assert!(!assembler.is_frame_ready());

        assembler.feed(&[0x24, 0x20, 9, 9, 9, 9], false);
        assert!(assembler.is_frame_ready());
        assert_eq!(assembler.try_take_frame().unwrap().len(), 11);
    }

    #[test]
    fn trailer_split_across_chunks() {
        let assembler = FrameAssembler::new();
        assembler.feed(&[0x84, 0x19, 0x24], true);
        assembler.feed(&[0x20], true);
        assembler.feed(&[0, 0, 0, 0], false);
        assert!(assembler.is_frame_ready());
    }

    #[test]
    fn lone_trailer_bytes_do_not_match() {
        let assembler = FrameAssembler::new();
        assembler.feed(&[0x20, 0x24], false);
        assert!(!assembler.is_frame_ready());
        assert_eq!(assembler.take_bytes().unwrap(), vec![0x20, 0x24]);
        assert!(assembler.take_bytes().is_none());
    }

    #[test]
    fn clear_discards_partial_frame() {
        let assembler = FrameAssembler::new();
        assembler.feed(&[0x84, 0x24], true);
        assembler.clear();
        // The stale 0x24 must not pair with a fresh 0x20
        assembler.feed(&[0x20], false);
        assert!(!assembler.is_frame_ready());
    }

    #[test]
    fn concurrent_feed_and_take() {
        let assembler = Arc::new(FrameAssembler::new());
        let producer = {
            let assembler = assembler.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    assembler.feed(&[1, 2, 3], true);
                }
                assembler.feed(&[0x24, 0x20], false);
            })
        };
        producer.join().unwrap();
        let frame = assembler.try_take_frame().unwrap();
        assert_eq!(frame.len(), 302);
    }
}
