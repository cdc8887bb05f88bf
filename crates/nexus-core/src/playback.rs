use log::warn;

/// Gapless playback cursor.
///
/// Tracks the audio-clock time at which the previously scheduled buffer
/// ends. Each new buffer starts at `max(next_start, now)`, so buffers play
/// back-to-back in arrival order and never overlap, however fast they
/// arrive. The audio clock itself acts as the queue.
#[derive(Clone, Debug, Default)]
pub struct PlaybackCursor {
    next_start: f64,
    max_backlog_sec: Option<f64>,
}

impl PlaybackCursor {
    pub fn new(max_backlog_sec: Option<f64>) -> Self {
        Self {
            next_start: 0.0,
            max_backlog_sec,
        }
    }

    /// Reserve `duration_sec` of output and return its start time.
    pub fn schedule(&mut self, now_sec: f64, duration_sec: f64) -> f64 {
        let start = self.next_start.max(now_sec);
        self.next_start = start + duration_sec.max(0.0);
        start
    }

    /// Like [`schedule`](Self::schedule) but refuses buffers that would start
    /// more than the backlog cap ahead of `now_sec`. Without a cap every
    /// buffer is accepted.
    pub fn try_schedule(&mut self, now_sec: f64, duration_sec: f64) -> Option<f64> {
        if let Some(cap) = self.max_backlog_sec {
            let backlog = self.backlog(now_sec);
            if backlog > cap {
                warn!(
                    "[voice] playback backlog {:.2}s over cap {:.2}s; dropping {:.3}s chunk",
                    backlog, cap, duration_sec
                );
                return None;
            }
        }
        Some(self.schedule(now_sec, duration_sec))
    }

    /// Audio still queued ahead of `now_sec`.
    pub fn backlog(&self, now_sec: f64) -> f64 {
        (self.next_start - now_sec).max(0.0)
    }

    pub fn next_start(&self) -> f64 {
        self.next_start
    }

    pub fn reset(&mut self) {
        self.next_start = 0.0;
    }
}
