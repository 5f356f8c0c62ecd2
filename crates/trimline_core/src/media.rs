use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MediaError {
    #[error("playback not allowed (autoplay policy)")]
    NotAllowed,
}

/// The media element the gate drives. Mirrors the subset of
/// `HTMLMediaElement` the trimmer needs.
pub trait MediaElement {
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, time: f64);
    fn duration(&self) -> f64;
    fn is_paused(&self) -> bool;
    fn play(&mut self) -> Result<(), MediaError>;
    fn pause(&mut self);
}

// ---------------------------------------------------------------------------
// SimulatedMedia
// ---------------------------------------------------------------------------

/// Deterministic media element: time only moves when `advance` is called.
///
/// Can be told to ignore position writes (browsers silently drop some
/// `currentTime` assignments) and to reject the next `play()`.
#[derive(Debug, Clone)]
pub struct SimulatedMedia {
    current_time: f64,
    duration: f64,
    paused: bool,
    ignored_writes: u32,
    rejection: Option<MediaError>,
    writes: Vec<f64>,
}

impl SimulatedMedia {
    pub fn new(duration: f64) -> Self {
        Self {
            current_time: 0.0,
            duration,
            paused: true,
            ignored_writes: 0,
            rejection: None,
            writes: Vec::new(),
        }
    }

    /// Move the clock forward by `dt` seconds if playing. Playback stops at
    /// the end of the media like a real element. Returns the new position.
    pub fn advance(&mut self, dt: f64) -> f64 {
        if !self.paused {
            self.current_time = (self.current_time + dt).min(self.duration);
            if self.current_time >= self.duration {
                self.paused = true;
            }
        }
        self.current_time
    }

    /// Drop the next `count` position writes.
    pub fn ignore_next_writes(&mut self, count: u32) {
        self.ignored_writes = count;
    }

    pub fn reject_next_play(&mut self, error: MediaError) {
        self.rejection = Some(error);
    }

    /// Every position write attempted, including dropped ones.
    pub fn writes(&self) -> &[f64] {
        &self.writes
    }
}

impl MediaElement for SimulatedMedia {
    fn current_time(&self) -> f64 {
        self.current_time
    }

    fn set_current_time(&mut self, time: f64) {
        self.writes.push(time);
        if self.ignored_writes > 0 {
            self.ignored_writes -= 1;
            return;
        }
        self.current_time = time.clamp(0.0, self.duration.max(0.0));
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn play(&mut self) -> Result<(), MediaError> {
        if let Some(err) = self.rejection.take() {
            return Err(err);
        }
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.paused = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_only_while_playing() {
        let mut media = SimulatedMedia::new(10.0);
        assert_eq!(media.advance(1.0), 0.0);
        media.play().unwrap();
        assert_eq!(media.advance(1.5), 1.5);
        media.pause();
        assert_eq!(media.advance(1.0), 1.5);
    }

    #[test]
    fn stops_at_end_of_media() {
        let mut media = SimulatedMedia::new(2.0);
        media.play().unwrap();
        assert_eq!(media.advance(5.0), 2.0);
        assert!(media.is_paused());
    }

    #[test]
    fn ignored_writes_are_logged_but_dropped() {
        let mut media = SimulatedMedia::new(10.0);
        media.ignore_next_writes(1);
        media.set_current_time(4.0);
        assert_eq!(media.current_time(), 0.0);
        media.set_current_time(4.0);
        assert_eq!(media.current_time(), 4.0);
        assert_eq!(media.writes(), &[4.0, 4.0]);
    }

    #[test]
    fn rejected_play_stays_paused() {
        let mut media = SimulatedMedia::new(10.0);
        media.reject_next_play(MediaError::NotAllowed);
        assert_eq!(media.play(), Err(MediaError::NotAllowed));
        assert!(media.is_paused());
        assert!(media.play().is_ok());
    }
}
