//! The frame pipeline runner: source -> stages -> sinks, once per frame.
//!
//! Single-threaded and synchronous: each iteration fully completes
//! (read, stages in order, sinks in order) before the next begins.
//! Cancellation is cooperative and observed through a sink returning
//! [`FlowControl::Stop`]; sinks are closed on every exit path.

use crate::error::Result;
use crate::select::RegionSelector;
use crate::sinks::{FlowControl, FrameSink};
use crate::source::FrameSource;
use crate::stages::{Stage, TrackingStage};
use crate::tracker::TrackerSession;
use crate::types::{Frame, SourceGeometry};

/// Counters for one pipeline run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Frames read from the source (including the seed frame, if any).
    pub frames_read: u64,
    /// Frames delivered to every sink.
    pub frames_forwarded: u64,
    /// Whether the run ended through user cancellation rather than
    /// end-of-stream.
    pub cancelled: bool,
}

/// Drives frames from one source through an ordered stage list into an
/// ordered sink list.
pub struct PipelineRunner {
    source: Box<dyn FrameSource>,
    stages: Vec<Box<dyn Stage>>,
    sinks: Vec<Box<dyn FrameSink>>,
    /// Seed frame waiting to go through the loop as iteration one.
    pending: Option<Frame>,
    closed: bool,
}

impl PipelineRunner {
    pub fn new(source: Box<dyn FrameSource>) -> Self {
        Self {
            source,
            stages: Vec::new(),
            sinks: Vec::new(),
            pending: None,
            closed: false,
        }
    }

    /// Geometry the source reported at open time.
    pub fn geometry(&self) -> SourceGeometry {
        self.source.geometry()
    }

    pub fn add_stage(&mut self, stage: Box<dyn Stage>) -> &mut Self {
        self.stages.push(stage);
        self
    }

    pub fn add_sink(&mut self, sink: Box<dyn FrameSink>) -> &mut Self {
        self.sinks.push(sink);
        self
    }

    /// Read the first frame and seed tracking from the selector.
    ///
    /// An empty selection skips tracking for the whole run and the
    /// pipeline continues un-tracked; returns whether a tracking stage
    /// was installed. The seed frame is not dropped: it goes through
    /// stages and sinks as iteration one, so an N-frame source still
    /// yields N output frames.
    pub fn seed_tracking(&mut self, selector: &mut dyn RegionSelector) -> Result<bool> {
        let frame = match self.source.read_frame()? {
            Some(frame) => frame,
            // Nothing to seed on an exhausted source.
            None => return Ok(false),
        };

        let regions = selector.select(&frame)?;
        let seeded = if regions.is_empty() {
            log::info!("no regions selected, tracking disabled for this run");
            false
        } else {
            let session = TrackerSession::seed(&frame, &regions)?;
            log::info!("tracking {} object(s)", session.len());
            self.stages.push(Box::new(TrackingStage::new(session)));
            true
        };

        self.pending = Some(frame);
        Ok(seeded)
    }

    /// Run the loop to end-of-stream or cancellation, then close every
    /// sink. Sinks are closed even when a stage or sink fails mid-run;
    /// a close failure during an error unwind is logged, not escalated.
    pub fn run(&mut self) -> Result<RunStats> {
        match self.run_loop() {
            Ok(stats) => {
                self.close()?;
                log::info!(
                    "pipeline finished: {} read, {} forwarded, cancelled: {}",
                    stats.frames_read,
                    stats.frames_forwarded,
                    stats.cancelled
                );
                Ok(stats)
            }
            Err(e) => {
                if let Err(close_err) = self.close() {
                    log::warn!("cleanup after pipeline failure also failed: {}", close_err);
                }
                Err(e)
            }
        }
    }

    fn run_loop(&mut self) -> Result<RunStats> {
        let mut stats = RunStats::default();
        loop {
            let mut frame = match self.pending.take() {
                Some(frame) => frame,
                None => match self.source.read_frame()? {
                    Some(frame) => frame,
                    None => break,
                },
            };
            stats.frames_read += 1;

            for stage in &mut self.stages {
                stage.apply(&mut frame)?;
            }

            // Every sink sees the current frame before a Stop is
            // honored, so cancellation on frame i leaves exactly i
            // frames in each sink.
            let mut stop = false;
            for sink in &mut self.sinks {
                if sink.consume(&frame)? == FlowControl::Stop {
                    stop = true;
                }
            }
            stats.frames_forwarded += 1;

            if stop {
                stats.cancelled = true;
                break;
            }
        }
        Ok(stats)
    }

    /// Close every sink. Idempotent: only the first call does work,
    /// whichever path it comes from.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut first_err = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.close() {
                log::warn!("closing sink '{}' failed: {}", sink.name(), e);
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for PipelineRunner {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.close() {
                log::warn!("sink close on drop failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::select::FixedRegions;
    use crate::types::Region;
    use opencv::core::{Mat, Scalar, CV_8UC3};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn test_mat() -> Mat {
        Mat::new_rows_cols_with_default(8, 8, CV_8UC3, Scalar::all(0.0)).unwrap()
    }

    struct VecSource {
        remaining: u64,
        next_index: u64,
    }

    impl VecSource {
        fn new(frames: u64) -> Self {
            Self {
                remaining: frames,
                next_index: 0,
            }
        }
    }

    impl FrameSource for VecSource {
        fn geometry(&self) -> SourceGeometry {
            SourceGeometry {
                width: 8,
                height: 8,
                fps: 30.0,
            }
        }

        fn read_frame(&mut self) -> Result<Option<Frame>> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            let frame = Frame::new(test_mat(), self.next_index);
            self.next_index += 1;
            Ok(Some(frame))
        }
    }

    #[derive(Default)]
    struct SinkLog {
        consumed: u64,
        closes: u64,
    }

    struct RecordingSink {
        log: Rc<RefCell<SinkLog>>,
        stop_at: Option<u64>,
    }

    impl RecordingSink {
        fn new(log: Rc<RefCell<SinkLog>>) -> Self {
            Self { log, stop_at: None }
        }

        fn stopping_after(log: Rc<RefCell<SinkLog>>, frames: u64) -> Self {
            Self {
                log,
                stop_at: Some(frames),
            }
        }
    }

    impl FrameSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        fn consume(&mut self, _frame: &Frame) -> Result<FlowControl> {
            let mut log = self.log.borrow_mut();
            log.consumed += 1;
            if Some(log.consumed) == self.stop_at {
                Ok(FlowControl::Stop)
            } else {
                Ok(FlowControl::Continue)
            }
        }

        fn close(&mut self) -> Result<()> {
            self.log.borrow_mut().closes += 1;
            Ok(())
        }
    }

    struct FailingStage;

    impl Stage for FailingStage {
        fn name(&self) -> &str {
            "failing"
        }

        fn apply(&mut self, _frame: &mut Frame) -> Result<()> {
            Err(PipelineError::stage("failing", "boom"))
        }
    }

    struct CountingStage {
        applied: Rc<RefCell<u64>>,
    }

    impl Stage for CountingStage {
        fn name(&self) -> &str {
            "counting"
        }

        fn apply(&mut self, _frame: &mut Frame) -> Result<()> {
            *self.applied.borrow_mut() += 1;
            Ok(())
        }
    }

    #[test]
    fn exhausted_source_forwards_every_frame() {
        let log = Rc::new(RefCell::new(SinkLog::default()));
        let mut runner = PipelineRunner::new(Box::new(VecSource::new(5)));
        runner.add_sink(Box::new(RecordingSink::new(log.clone())));

        let stats = runner.run().unwrap();
        assert_eq!(stats.frames_read, 5);
        assert_eq!(stats.frames_forwarded, 5);
        assert!(!stats.cancelled);
        assert_eq!(log.borrow().consumed, 5);
    }

    #[test]
    fn zero_frames_still_closes_cleanly() {
        let log = Rc::new(RefCell::new(SinkLog::default()));
        let mut runner = PipelineRunner::new(Box::new(VecSource::new(0)));
        runner.add_sink(Box::new(RecordingSink::new(log.clone())));

        let stats = runner.run().unwrap();
        assert_eq!(stats.frames_forwarded, 0);
        assert_eq!(log.borrow().closes, 1);
    }

    #[test]
    fn cancellation_on_frame_i_forwards_exactly_i_frames() {
        for stop_at in 1..=4 {
            let stopper = Rc::new(RefCell::new(SinkLog::default()));
            let writer = Rc::new(RefCell::new(SinkLog::default()));
            let mut runner = PipelineRunner::new(Box::new(VecSource::new(10)));
            runner.add_sink(Box::new(RecordingSink::stopping_after(
                stopper.clone(),
                stop_at,
            )));
            runner.add_sink(Box::new(RecordingSink::new(writer.clone())));

            let stats = runner.run().unwrap();
            assert!(stats.cancelled);
            assert_eq!(stats.frames_forwarded, stop_at);
            // The later sink still received the frame the stop was
            // observed on.
            assert_eq!(writer.borrow().consumed, stop_at);
        }
    }

    #[test]
    fn stage_failure_still_closes_sinks_once() {
        let log = Rc::new(RefCell::new(SinkLog::default()));
        let mut runner = PipelineRunner::new(Box::new(VecSource::new(3)));
        runner.add_stage(Box::new(FailingStage));
        runner.add_sink(Box::new(RecordingSink::new(log.clone())));

        assert!(matches!(
            runner.run(),
            Err(PipelineError::Stage { stage: "failing", .. })
        ));
        assert_eq!(log.borrow().closes, 1);
        drop(runner);
        // Drop must not close a second time.
        assert_eq!(log.borrow().closes, 1);
    }

    #[test]
    fn drop_without_run_closes_sinks() {
        let log = Rc::new(RefCell::new(SinkLog::default()));
        {
            let mut runner = PipelineRunner::new(Box::new(VecSource::new(3)));
            runner.add_sink(Box::new(RecordingSink::new(log.clone())));
        }
        assert_eq!(log.borrow().closes, 1);
    }

    #[test]
    fn empty_selection_skips_tracking_but_keeps_frame_count() {
        let applied = Rc::new(RefCell::new(0_u64));
        let log = Rc::new(RefCell::new(SinkLog::default()));
        let mut runner = PipelineRunner::new(Box::new(VecSource::new(4)));
        runner.add_stage(Box::new(CountingStage {
            applied: applied.clone(),
        }));
        runner.add_sink(Box::new(RecordingSink::new(log.clone())));

        let mut selector = FixedRegions::new(Vec::new());
        assert!(!runner.seed_tracking(&mut selector).unwrap());

        let stats = runner.run().unwrap();
        // The seed frame re-enters the loop as iteration one.
        assert_eq!(stats.frames_read, 4);
        assert_eq!(stats.frames_forwarded, 4);
        assert_eq!(log.borrow().consumed, 4);
        assert_eq!(*applied.borrow(), 4);
    }

    #[test]
    fn seeding_an_exhausted_source_is_a_no_op() {
        let mut runner = PipelineRunner::new(Box::new(VecSource::new(0)));
        let mut selector = FixedRegions::new(vec![Region::new(1, 1, 4, 4)]);
        assert!(!runner.seed_tracking(&mut selector).unwrap());
        let stats = runner.run().unwrap();
        assert_eq!(stats.frames_read, 0);
    }

    #[test]
    fn selector_error_propagates() {
        struct FailingSelector;
        impl RegionSelector for FailingSelector {
            fn select(&mut self, _frame: &Frame) -> Result<Vec<Region>> {
                Err(PipelineError::selection("ui unavailable"))
            }
        }

        let mut runner = PipelineRunner::new(Box::new(VecSource::new(2)));
        assert!(matches!(
            runner.seed_tracking(&mut FailingSelector),
            Err(PipelineError::Selection(_))
        ));
    }

    #[test]
    fn geometry_is_the_open_time_value() {
        let runner = PipelineRunner::new(Box::new(VecSource::new(1)));
        let geometry = runner.geometry();
        assert_eq!(geometry.width, 8);
        assert_eq!(geometry.height, 8);
        assert_eq!(geometry.fps, 30.0);
    }
}
