use std::cmp::Ordering;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

use crate::error::{invalid_argument, FirestoreError, FirestoreResult};

/// 0001-01-01T00:00:00Z, the earliest time Firestore accepts.
const MIN_SECONDS: i64 = -62_135_596_800;
/// 9999-12-31T23:59:59Z, the latest whole second Firestore accepts.
const MAX_SECONDS: i64 = 253_402_300_799;
const NANOS_PER_SECOND: i32 = 1_000_000_000;

/// Point in time with nanosecond precision, as used by update-time
/// preconditions. Always within 0001-01-01 and 9999-12-31 (UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Timestamp {
    seconds: i64,
    nanos: i32,
}

impl Timestamp {
    /// Builds a timestamp, carrying `nanos` outside `0..1e9` into `seconds`.
    pub fn new(seconds: i64, nanos: i32) -> FirestoreResult<Self> {
        let carried = seconds
            .checked_add(i64::from(nanos.div_euclid(NANOS_PER_SECOND)))
            .ok_or_else(|| out_of_range(seconds, nanos))?;
        if !(MIN_SECONDS..=MAX_SECONDS).contains(&carried) {
            return Err(out_of_range(seconds, nanos));
        }
        Ok(Self {
            seconds: carried,
            nanos: nanos.rem_euclid(NANOS_PER_SECOND),
        })
    }

    pub fn from_datetime(datetime: DateTime<Utc>) -> FirestoreResult<Self> {
        Self::new(datetime.timestamp(), datetime.timestamp_subsec_nanos() as i32)
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    pub fn nanos(&self) -> i32 {
        self.nanos
    }

    /// RFC 3339 rendering with nanosecond precision, e.g.
    /// `2017-01-02T03:04:05.000000006Z`.
    pub fn to_rfc3339(&self) -> String {
        Utc.timestamp_opt(self.seconds, self.nanos as u32)
            .single()
            .expect("Timestamp range lies inside chrono's range")
            .to_rfc3339_opts(SecondsFormat::Nanos, true)
    }
}

fn out_of_range(seconds: i64, nanos: i32) -> FirestoreError {
    invalid_argument(format!(
        "Timestamp ({seconds}s, {nanos}ns) is outside 0001-01-01T00:00:00Z..9999-12-31T23:59:59.999999999Z"
    ))
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.seconds.cmp(&other.seconds) {
            Ordering::Equal => self.nanos.cmp(&other.nanos),
            ordering => ordering,
        }
    }
}
