//! Session handle generation
//!
//! Handles look like `browser_{millis}_{suffix}`. The time component is
//! clamped to be monotonically non-decreasing so a clock step backwards
//! cannot reorder freshly issued handles, and the nine-character suffix is
//! drawn uniformly from `a-z0-9` (~46 bits per millisecond). Handles are
//! never handed out twice within a process; the registry still re-rolls on
//! the astronomically unlikely map collision.

use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

const SUFFIX_LEN: usize = 9;
const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

static LAST_MILLIS: AtomicU64 = AtomicU64::new(0);

/// Generate a fresh session handle.
pub fn generate() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    // fetch_max returns the previous value; the issued component is the max
    // of that and the current clock reading.
    let millis = LAST_MILLIS.fetch_max(now, Ordering::SeqCst).max(now);

    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
        .collect();

    format!("browser_{millis}_{suffix}")
}
