use crate::error::DecodeError;

/// Slack for accumulated float error, so a frame shown for exactly its
/// duration in several small steps advances on the tick it should.
const TICK_EPSILON: f32 = 1e-6;

/// Per-overlay state machine that loops through timed frames.
///
/// The clock only tracks which frame is current and how long it has been
/// shown. Pushing the frame into a material is the caller's job, driven by the
/// return value of [`advance`](Self::advance).
///
/// # Example
///
/// ```
/// use overlayer::FrameAnimationClock;
///
/// let mut clock = FrameAnimationClock::new(vec!['A', 'B'], vec![0.1, 0.2], 0.01).unwrap();
/// assert_eq!(clock.advance(0.05), None);
/// assert_eq!(clock.advance(0.05), Some(&'B'));
/// ```
#[derive(Clone, Debug)]
pub struct FrameAnimationClock<F> {
    frames: Vec<F>,
    durations: Vec<f32>,
    index: usize,
    elapsed: f32,
}

impl<F> FrameAnimationClock<F> {
    /// Build a clock, flooring every duration to `min_duration`.
    ///
    /// Fails on an empty sequence or when frames and durations differ in
    /// length; nothing should be inserted into a scene for such input.
    pub fn new(frames: Vec<F>, durations: Vec<f32>, min_duration: f32) -> Result<Self, DecodeError> {
        if frames.is_empty() {
            return Err(DecodeError::Empty);
        }
        if frames.len() != durations.len() {
            return Err(DecodeError::LengthMismatch {
                frames: frames.len(),
                durations: durations.len(),
            });
        }

        let floor = min_duration.max(f32::MIN_POSITIVE);
        let durations = durations.into_iter().map(|d| d.max(floor)).collect();

        Ok(Self {
            frames,
            durations,
            index: 0,
            elapsed: 0.0,
        })
    }

    /// Accumulate `dt` seconds. Returns the newly displayed frame when the
    /// clock moved to a different frame on this tick.
    ///
    /// At most one frame is advanced per call, and a single-frame sequence
    /// never reports a change.
    pub fn advance(&mut self, dt: f32) -> Option<&F> {
        self.elapsed += dt.max(0.0);

        if self.elapsed + TICK_EPSILON < self.durations[self.index] {
            return None;
        }

        self.elapsed = 0.0;
        let next = (self.index + 1) % self.frames.len();
        let changed = next != self.index;
        self.index = next;

        changed.then(|| &self.frames[self.index])
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn current_frame(&self) -> &F {
        &self.frames[self.index]
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Time the current frame has been on screen.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Display duration of frame `index`, after flooring.
    pub fn duration(&self, index: usize) -> Option<f32> {
        self.durations.get(index).copied()
    }
}
