use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Instant;

use gratex_core::{FEEDBACK_CHANNEL, GratexError, GratexResult, PerformanceRecord};
use gratex_timing::{FrameTimer, Timer, unix_time_secs};
use tracing::{debug, info, warn};

use crate::device::DisplayDevice;
use crate::screen::{LoadedSequence, Screen};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    WaitingForTrigger,
    Playing,
    Done,
    Aborted,
}

/// How a presentation begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Start {
    Immediate,
    /// Block until a rising edge arrives on this trigger channel.
    OnTrigger { channel: u8 },
}

/// Events crossing from the trigger watcher or operator input into the
/// scheduler. The channel carrying them is the only state the producer and
/// the scheduler share.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Rising edge observed on a trigger channel.
    Edge(u8),
    Abort,
}

pub fn signal_channel() -> (SignalSource, SignalPort) {
    let (tx, rx) = mpsc::channel();
    (SignalSource { tx }, SignalPort { rx })
}

/// Producer half, held by trigger watchers and the operator input thread.
#[derive(Debug, Clone)]
pub struct SignalSource {
    tx: Sender<Signal>,
}

impl SignalSource {
    pub fn edge(&self, channel: u8) {
        let _ = self.tx.send(Signal::Edge(channel));
    }

    pub fn abort(&self) {
        let _ = self.tx.send(Signal::Abort);
    }
}

/// Consumer half, owned by the scheduler for the duration of a session.
#[derive(Debug)]
pub struct SignalPort {
    rx: Receiver<Signal>,
}

/// Digital output raised and lowered around frame boundaries so external
/// recording equipment can align its clock with the presentation.
pub trait FeedbackLine {
    fn set(&mut self, high: bool) -> GratexResult<()>;
}

/// Feedback sink for rigs without a wired feedback line.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFeedback;

impl FeedbackLine for NullFeedback {
    fn set(&mut self, _high: bool) -> GratexResult<()> {
        Ok(())
    }
}

/// Frame-by-frame presentation driver.
#[derive(Debug)]
pub struct Scheduler {
    state: PlaybackState,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler {
            state: PlaybackState::Idle,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Presents `sequence` on `screen`, one frame per refresh.
    ///
    /// Returns `Ok(Some(record))` once every frame was shown, or `Ok(None)`
    /// when the operator aborted, which is an outcome rather than an error.
    /// An `OnTrigger` start blocks indefinitely until its edge or an abort
    /// arrives.
    pub fn play<D, F>(
        &mut self,
        screen: &mut Screen<D>,
        sequence: &LoadedSequence,
        start: Start,
        signals: &mut SignalPort,
        feedback: &mut F,
    ) -> GratexResult<Option<PerformanceRecord>>
    where
        D: DisplayDevice,
        F: FeedbackLine,
    {
        self.state = PlaybackState::Idle;
        let result = self.drive(screen, sequence, start, signals, feedback);
        if result.is_err() {
            self.state = PlaybackState::Idle;
        }
        result
    }

    fn drive<D, F>(
        &mut self,
        screen: &mut Screen<D>,
        sequence: &LoadedSequence,
        start: Start,
        signals: &mut SignalPort,
        feedback: &mut F,
    ) -> GratexResult<Option<PerformanceRecord>>
    where
        D: DisplayDevice,
        F: FeedbackLine,
    {
        screen.check_header(sequence.header())?;
        if let Start::OnTrigger { channel } = start {
            if channel == FEEDBACK_CHANNEL {
                return Err(GratexError::validation(format!(
                    "channel {FEEDBACK_CHANNEL} is reserved for the feedback line"
                )));
            }
            self.state = PlaybackState::WaitingForTrigger;
            if !wait_for_edge(channel, signals) {
                self.state = PlaybackState::Aborted;
                info!(channel, "aborted while waiting for trigger");
                return Ok(None);
            }
        }

        self.state = PlaybackState::Playing;
        let start_time = unix_time_secs();
        let frame_count = sequence.frame_count();
        if frame_count == 0 {
            self.state = PlaybackState::Done;
            return Ok(Some(PerformanceRecord::empty(start_time)));
        }

        let mut timer = FrameTimer::with_capacity(frame_count as usize);
        let mut last: Option<Instant> = None;
        for index in 0..frame_count {
            match signals.rx.try_recv() {
                Ok(Signal::Abort) => {
                    lower_feedback(feedback);
                    self.state = PlaybackState::Aborted;
                    info!(frame = index, "aborted mid-playback");
                    return Ok(None);
                }
                Ok(Signal::Edge(channel)) => {
                    debug!(channel, frame = index, "ignoring edge during playback");
                }
                Err(_) => {}
            }
            screen.write_frame(sequence.frame(index))?;
            let now = Instant::now();
            if let Some(previous) = last {
                timer.record_interval(now - previous);
            }
            last = Some(now);
            feedback.set(index % 2 == 0)?;
        }
        lower_feedback(feedback);
        self.state = PlaybackState::Done;

        let stats = timer.interval_stats();
        debug!(
            frames = frame_count,
            mean_us = stats.mean_us,
            stddev_us = stats.stddev_us,
            "playback complete"
        );
        Ok(Some(PerformanceRecord {
            mean_interframe_us: stats.mean_us,
            stddev_interframe_us: stats.stddev_us,
            start_time,
        }))
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Blocks until the armed channel fires. Returns `false` on abort. Edges
/// queued before arming are stale and must not release playback.
fn wait_for_edge(channel: u8, signals: &mut SignalPort) -> bool {
    loop {
        match signals.rx.try_recv() {
            Ok(Signal::Edge(stale)) => {
                debug!(channel = stale, "discarding stale edge");
            }
            Ok(Signal::Abort) => return false,
            Err(_) => break,
        }
    }
    loop {
        match signals.rx.recv() {
            Ok(Signal::Edge(seen)) if seen == channel => return true,
            Ok(Signal::Edge(seen)) => {
                debug!(armed = channel, seen, "ignoring edge on another channel");
            }
            Ok(Signal::Abort) => return false,
            Err(_) => {
                // Every producer is gone; nothing can ever release the wait.
                warn!("all signal sources dropped while waiting for trigger");
                return false;
            }
        }
    }
}

fn lower_feedback<F: FeedbackLine>(feedback: &mut F) {
    if let Err(err) = feedback.set(false) {
        warn!(error = %err, "could not lower feedback line");
    }
}
