use foundation::time::Time;

/// Per-tick frame metadata.
///
/// This is the primary timebase for the animation loop. It is intentionally
/// small and pure so a tick sequence can be recorded and replayed.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Elapsed time since the previous tick (milliseconds).
    pub dt_ms: f64,
    /// Timestamp at the start of the frame (milliseconds).
    pub time: Time,
}

impl Frame {
    pub fn new(index: u64, dt_ms: f64) -> Self {
        Self {
            index,
            dt_ms,
            time: Time(index as f64 * dt_ms),
        }
    }

    /// Frame at an explicit timestamp, for variable-rate tick loops.
    pub fn at(index: u64, time: Time, dt_ms: f64) -> Self {
        Self { index, dt_ms, time }
    }

    pub fn next(self) -> Self {
        Self::at(self.index + 1, Time(self.time.0 + self.dt_ms), self.dt_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::Frame;
    use foundation::time::Time;

    #[test]
    fn frame_time_is_deterministic() {
        let a = Frame::new(10, 1000.0 / 60.0);
        let b = Frame::new(10, 1000.0 / 60.0);
        assert_eq!(a, b);
        assert_eq!(a.time, Time(10.0 * 1000.0 / 60.0));
    }

    #[test]
    fn next_advances_index_and_time() {
        let f0 = Frame::at(3, Time(100.0), 16.0);
        let f1 = f0.next();
        assert_eq!(f1.index, 4);
        assert_eq!(f1.time, Time(116.0));
    }
}
