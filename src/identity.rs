//! User and session identifiers.
//!
//! Identifiers start with a UTC timestamp at second precision so they sort by
//! creation time, followed by random hex drawn from the operating system's
//! CSPRNG.
//!
//! ```text
//! user:    20241019_142501_9f86d081884c7d659a2feaa0c55ad015
//! session: 20241019_142501_20241019_142501_9f86d081884c7d659a2feaa0c55ad015_a3c1f00e
//! ```

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;

/// `strftime` pattern of the timestamp prefix.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

const USER_TOKEN_BYTES: usize = 16;
const SESSION_TOKEN_BYTES: usize = 4;

/// Generate a user id from the current UTC time.
pub fn generate_user_id() -> String {
    user_id_at(Utc::now())
}

/// Generate a session id for `user_id` from the current UTC time.
pub fn generate_session_id(user_id: &str) -> String {
    session_id_at(Utc::now(), user_id)
}

/// `<timestamp>_<32 hex chars>`
pub fn user_id_at(now: DateTime<Utc>) -> String {
    format!("{}_{}", timestamp_prefix(now), random_hex(USER_TOKEN_BYTES))
}

/// `<timestamp>_<user tag>_<8 hex chars>`, where the user tag is everything
/// in `user_id` before its first `-`.
pub fn session_id_at(now: DateTime<Utc>, user_id: &str) -> String {
    let user_tag = user_id.split('-').next().unwrap_or(user_id);
    format!(
        "{}_{}_{}",
        timestamp_prefix(now),
        user_tag,
        random_hex(SESSION_TOKEN_BYTES)
    )
}

/// Timestamp prefix shared by both identifier kinds.
pub fn timestamp_prefix(now: DateTime<Utc>) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}

fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use regex::Regex;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 19, 14, 25, 1).unwrap()
    }

    #[test]
    fn test_user_id_format() {
        let user_id = user_id_at(fixed_time());
        let pattern = Regex::new(r"^20241019_142501_[0-9a-f]{32}$").unwrap();
        assert!(pattern.is_match(&user_id), "unexpected user id {}", user_id);
    }

    #[test]
    fn test_session_id_uses_tag_before_dash() {
        let session_id = session_id_at(fixed_time(), "alice-1234-xyz");
        let pattern = Regex::new(r"^20241019_142501_alice_[0-9a-f]{8}$").unwrap();
        assert!(pattern.is_match(&session_id), "unexpected session id {}", session_id);
    }

    #[test]
    fn test_session_id_without_dash_keeps_whole_user_id() {
        let user_id = user_id_at(fixed_time());
        let session_id = session_id_at(fixed_time(), &user_id);

        assert!(session_id.starts_with(&format!("20241019_142501_{}_", user_id)));
        assert_eq!(session_id.len(), "20241019_142501_".len() + user_id.len() + 1 + 8);
    }

    #[test]
    fn test_generated_session_id_carries_call_time_prefix() {
        let before = timestamp_prefix(Utc::now());
        let session_id = generate_session_id(&generate_user_id());
        let after = timestamp_prefix(Utc::now());

        assert!(
            session_id.starts_with(&before) || session_id.starts_with(&after),
            "{} does not start with {} or {}",
            session_id,
            before,
            after
        );
    }

    #[test]
    fn test_user_ids_do_not_collide() {
        let ids: std::collections::HashSet<String> = (0..1000).map(|_| generate_user_id()).collect();
        assert_eq!(ids.len(), 1000);
    }
}
