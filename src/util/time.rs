use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch
///
/// Used for entity timestamps and snapshot server time. Saturates to 0 if the
/// system clock reads before the epoch.
pub fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_millis_monotonic_enough() {
        let a = unix_millis();
        let b = unix_millis();
        assert!(a > 0);
        assert!(b >= a);
    }
}
