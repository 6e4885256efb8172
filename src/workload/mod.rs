// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Reusable resource consumers. The placement layer typically brings its own
//! workload models; these cover the common cases and drive the crate's own
//! tests.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::{
    resource::{
        command::Command,
        consumer::ResourceConsumer,
        context::SharedResourceContext,
    },
    runtime::fail::Fail,
};
use ::std::{
    collections::VecDeque,
    time::{
        Duration,
        Instant,
    },
};

//======================================================================================================================
// Structures
//======================================================================================================================

/// Demands a constant rate for a bounded virtual duration, then exits.
pub struct FlatWorkload {
    rate: f64,
    duration: Duration,
    /// Virtual end of the workload, fixed at the first pull.
    end: Option<Instant>,
}

/// One frame of a [TraceWorkload]: a rate held for a duration.
#[derive(Clone, Copy, Debug)]
pub struct TraceFrame {
    pub rate: f64,
    pub duration: Duration,
}

/// Replays `(rate, duration)` frames in order, then exits.
pub struct TraceWorkload {
    frames: VecDeque<TraceFrame>,
    /// Virtual end of the current frame, if one is running.
    frame_end: Option<Instant>,
    rate: f64,
}

//======================================================================================================================
// Associate Functions
//======================================================================================================================

/// Associate Functions for Flat Workloads
impl FlatWorkload {
    pub fn new(rate: f64, duration: Duration) -> Result<Self, Fail> {
        // Validate eagerly, like command construction does.
        let _ = Command::consume(rate, Some(duration))?;
        Ok(Self {
            rate,
            duration,
            end: None,
        })
    }
}

/// Associate Functions for Trace Workloads
impl TraceWorkload {
    pub fn new(frames: Vec<TraceFrame>) -> Result<Self, Fail> {
        for frame in &frames {
            let _ = Command::consume(frame.rate, Some(frame.duration))?;
        }
        Ok(Self {
            frames: VecDeque::from(frames),
            frame_end: None,
            rate: 0.0,
        })
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl ResourceConsumer for FlatWorkload {
    fn on_next(
        &mut self,
        ctx: &mut SharedResourceContext,
        now: Instant,
        _delta: Duration,
    ) -> Result<Option<Duration>, Fail> {
        let end: Instant = *self.end.get_or_insert(now + self.duration);
        if now >= end {
            ctx.push(Command::exit())?;
            return Ok(None);
        }
        let remaining: Duration = end - now;
        ctx.push(Command::consume(self.rate, Some(remaining))?)?;
        Ok(Some(remaining))
    }
}

impl ResourceConsumer for TraceWorkload {
    fn on_next(
        &mut self,
        ctx: &mut SharedResourceContext,
        now: Instant,
        _delta: Duration,
    ) -> Result<Option<Duration>, Fail> {
        // Advance past every frame that has already elapsed.
        loop {
            match self.frame_end {
                Some(frame_end) if now >= frame_end => match self.frames.pop_front() {
                    Some(frame) => {
                        self.rate = frame.rate;
                        self.frame_end = Some(frame_end + frame.duration);
                    },
                    None => {
                        ctx.push(Command::exit())?;
                        return Ok(None);
                    },
                },
                Some(_) => break,
                None => match self.frames.pop_front() {
                    Some(frame) => {
                        self.rate = frame.rate;
                        self.frame_end = Some(now + frame.duration);
                    },
                    None => {
                        ctx.push(Command::exit())?;
                        return Ok(None);
                    },
                },
            }
        }
        let frame_end: Instant = self.frame_end.expect("a frame is running");
        let remaining: Duration = frame_end - now;
        ctx.push(Command::consume(self.rate, Some(remaining))?)?;
        Ok(Some(remaining))
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================

#[cfg(test)]
mod tests {
    use super::{
        TraceFrame,
        TraceWorkload,
    };
    use crate::{
        resource::provider::ResourceProvider,
        resource::source::SharedResourceSource,
        runtime::SharedInterpreter,
    };
    use ::anyhow::Result;
    use ::std::time::{
        Duration,
        Instant,
    };

    /// Tests that a trace workload switches rates at frame boundaries and
    /// exits after the last frame.
    #[test]
    fn trace_replays_frames_in_order() -> Result<()> {
        let now: Instant = Instant::now();
        let mut interpreter: SharedInterpreter = SharedInterpreter::new(now);
        let mut source: SharedResourceSource = SharedResourceSource::new(&interpreter, 2000.0)?;

        let frames: Vec<TraceFrame> = vec![
            TraceFrame {
                rate: 1000.0,
                duration: Duration::from_secs(10),
            },
            TraceFrame {
                rate: 500.0,
                duration: Duration::from_secs(10),
            },
        ];
        source.start_consumer(Box::new(TraceWorkload::new(frames)?))?;
        crate::ensure_eq!(source.speed(), 1000.0);

        interpreter.advance_clock(now + Duration::from_secs(10))?;
        crate::ensure_eq!(source.speed(), 500.0);

        interpreter.advance_clock(now + Duration::from_secs(20))?;
        crate::ensure_eq!(source.speed(), 0.0);
        crate::ensure_eq!(source.sample()?.actual(), 15000.0);

        Ok(())
    }
}
