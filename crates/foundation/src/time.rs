/// Time primitives
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct Time(pub f64); // milliseconds

impl Time {
    pub const ZERO: Time = Time(0.0);

    pub fn ms(v: f64) -> Self {
        Time(v)
    }

    /// Elapsed milliseconds since `earlier` (negative if `earlier` is later).
    pub fn since(self, earlier: Time) -> f64 {
        self.0 - earlier.0
    }
}

#[cfg(test)]
mod tests {
    use super::Time;

    #[test]
    fn since_is_signed() {
        let a = Time::ms(100.0);
        let b = Time::ms(250.0);
        assert_eq!(b.since(a), 150.0);
        assert_eq!(a.since(b), -150.0);
    }
}
