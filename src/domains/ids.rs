use std::time::{SystemTime, UNIX_EPOCH};

use rand::distributions::Alphanumeric;
use rand::Rng;

pub const ANON_USER_ID: &str = "anon";

const ID_LEN: usize = 10;

/// Random alphanumeric row id, generated client-side so optimistic writes
/// never wait on the server for identity.
pub fn rand_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
