use chrono::prelude::*;

/// The current wall clock time.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Whole seconds since the unix epoch, the resolution Open-Falcon stores.
pub fn unix_seconds(time: &DateTime<Utc>) -> i64 {
    time.timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_to_seconds() {
        let time = Utc.timestamp_opt(1_700_000_000, 999_999_999).unwrap();
        assert_eq!(unix_seconds(&time), 1_700_000_000);
    }
}
