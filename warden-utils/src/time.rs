use std::time::{SystemTime, UNIX_EPOCH};

/// Return the current unix timestamp in milliseconds.
pub fn now_unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| {
            i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
        })
}

pub fn millis_to_unix_secs(millis: i64) -> i64 {
    millis.div_euclid(1000)
}

#[cfg(test)]
mod tests {
    use super::millis_to_unix_secs;

    #[test]
    fn millis_round_down_to_seconds() {
        assert_eq!(millis_to_unix_secs(1_700_000_000_999), 1_700_000_000);
        assert_eq!(millis_to_unix_secs(0), 0);
    }
}
