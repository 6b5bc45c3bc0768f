//! The read-write pump between the frame source and the frame sink.

use super::cancel::CancelHandle;
use super::errors::StageResult;
use super::types::LoopEnd;
use crate::logging::RunLogger;
use crate::sink::FrameSink;
use crate::source::{FrameRead, FrameSource};

/// Move frames from `source` to `sink` until the stream ends.
///
/// Each frame is fully written before the next read, so output order is
/// input order. `frame_count` is updated as frames are written and stays
/// accurate when a write fails. A limit of 0 means unbounded.
///
/// Read errors end the loop; write errors are returned.
pub fn pump_frames(
    source: &mut dyn FrameSource,
    sink: &mut dyn FrameSink,
    frame_limit: u64,
    cancel: &CancelHandle,
    logger: &RunLogger,
    frame_count: &mut u64,
) -> StageResult<LoopEnd> {
    loop {
        if frame_limit > 0 && *frame_count >= frame_limit {
            logger.info(&format!("Frame limit of {} reached", frame_limit));
            return Ok(LoopEnd::FrameLimit);
        }
        if cancel.is_cancelled() {
            logger.warn(&format!("Interrupted after {} frames", frame_count));
            return Ok(LoopEnd::Cancelled);
        }

        let frame = match source.read() {
            Ok(FrameRead::Frame(frame)) => frame,
            Ok(FrameRead::End) => return Ok(LoopEnd::EndOfStream),
            Err(e) => {
                logger.warn(&format!("Read failed after {} frames: {}", frame_count, e));
                return Ok(LoopEnd::ReadError(e.to_string()));
            }
        };

        sink.write(&frame)?;
        *frame_count += 1;
        logger.frame_progress(*frame_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::StageError;
    use crate::test_support::{test_logger, Call, Journal, RecordingSink, ScriptedSource};

    fn pump(
        source: &mut ScriptedSource,
        sink: &mut RecordingSink,
        limit: u64,
        cancel: &CancelHandle,
    ) -> (StageResult<LoopEnd>, u64) {
        let (logger, _) = test_logger();
        let mut count = 0;
        let end = pump_frames(source, sink, limit, cancel, &logger, &mut count);
        (end, count)
    }

    #[test]
    fn processed_count_is_min_of_available_and_limit() {
        for available in [0u64, 1, 5, 12] {
            for limit in [0u64, 1, 5, 10] {
                let journal = Journal::default();
                let mut source = ScriptedSource::new(&journal, available);
                let mut sink = RecordingSink::new(&journal);

                let (end, count) = pump(&mut source, &mut sink, limit, &CancelHandle::new());

                let expected = if limit > 0 { available.min(limit) } else { available };
                assert_eq!(count, expected, "available={} limit={}", available, limit);
                assert_eq!(journal.count(|c| matches!(c, Call::Write(_))) as u64, expected);
                let expected_end = if limit > 0 && available >= limit {
                    LoopEnd::FrameLimit
                } else {
                    LoopEnd::EndOfStream
                };
                assert_eq!(end.unwrap(), expected_end);
            }
        }
    }

    #[test]
    fn stops_before_reading_past_the_limit() {
        let journal = Journal::default();
        let mut source = ScriptedSource::new(&journal, 50);
        let mut sink = RecordingSink::new(&journal);

        let (_, count) = pump(&mut source, &mut sink, 10, &CancelHandle::new());

        assert_eq!(count, 10);
        assert_eq!(journal.count(|c| matches!(c, Call::Read)), 10);
        assert_eq!(journal.count(|c| matches!(c, Call::Write(_))), 10);
    }

    #[test]
    fn writes_frames_in_read_order() {
        let journal = Journal::default();
        let mut source = ScriptedSource::new(&journal, 4);
        let mut sink = RecordingSink::new(&journal);

        pump(&mut source, &mut sink, 0, &CancelHandle::new());

        let written: Vec<u8> = journal
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Write(tag) => Some(tag),
                _ => None,
            })
            .collect();
        assert_eq!(written, vec![1, 2, 3, 4]);
    }

    #[test]
    fn cancel_stops_before_next_read() {
        let journal = Journal::default();
        let cancel = CancelHandle::new();
        let mut source = ScriptedSource::new(&journal, 100).cancel_after(3, &cancel);
        let mut sink = RecordingSink::new(&journal);

        let (end, count) = pump(&mut source, &mut sink, 0, &cancel);

        assert_eq!(end.unwrap(), LoopEnd::Cancelled);
        assert_eq!(count, 3);
        assert_eq!(journal.count(|c| matches!(c, Call::Read)), 3);
    }

    #[test]
    fn read_error_ends_the_loop() {
        let journal = Journal::default();
        let mut source = ScriptedSource::new(&journal, 10).failing_read_at(2);
        let mut sink = RecordingSink::new(&journal);

        let (end, count) = pump(&mut source, &mut sink, 0, &CancelHandle::new());

        assert!(matches!(end.unwrap(), LoopEnd::ReadError(_)));
        assert_eq!(count, 2);
    }

    #[test]
    fn write_error_is_returned() {
        let journal = Journal::default();
        let mut source = ScriptedSource::new(&journal, 10);
        let mut sink = RecordingSink::new(&journal).failing_write_at(3);

        let (end, count) = pump(&mut source, &mut sink, 0, &CancelHandle::new());

        assert!(matches!(end, Err(StageError::Encoding(_))));
        assert_eq!(count, 3);
    }
}
