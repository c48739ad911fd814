use chrono::{DateTime, TimeDelta, Utc};

use crate::error::{Error, Result};

/// Expiry instant for an `expires_in` value. Absent or zero means the token
/// does not expire. Negative or out-of-range values are rejected.
pub fn expiry_after_seconds(expires_in: Option<i64>) -> Result<Option<DateTime<Utc>>> {
    match expires_in {
        None | Some(0) => Ok(None),
        Some(seconds) if seconds < 0 => Err(Error::Decode(format!("negative expires_in {seconds}"))),
        Some(seconds) => TimeDelta::try_seconds(seconds)
            .and_then(|ttl| now().checked_add_signed(ttl))
            .map(Some)
            .ok_or_else(|| Error::Decode(format!("expires_in {seconds} out of range"))),
    }
}

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn zero_or_missing_expires_in_means_no_expiry() {
        assert_eq!(expiry_after_seconds(None).unwrap(), None);
        assert_eq!(expiry_after_seconds(Some(0)).unwrap(), None);
    }

    #[test]
    fn expiry_is_relative_to_now() {
        let before = now();
        let expiry = expiry_after_seconds(Some(7200)).unwrap().unwrap();
        assert!(expiry >= before + TimeDelta::seconds(7200));
        assert!(expiry <= now() + TimeDelta::seconds(7200));
    }

    #[test]
    fn negative_or_overflowing_expires_in_is_a_decode_error() {
        for seconds in [-1, i64::MIN, i64::MAX, i64::MAX / 1000] {
            let err = expiry_after_seconds(Some(seconds)).unwrap_err();
            assert!(matches!(err, Error::Decode(_)), "{seconds}: {err:?}");
        }
    }
}
