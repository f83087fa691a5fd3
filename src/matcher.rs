//! Reply classification.
//!
//! The modem frames nothing: a reply is free text that may be a status token,
//! a comma-separated record or an unsolicited notification. Classification is
//! a substring scan of the raw reply bytes against a small fixed token set;
//! the first occurrence wins and there is no partial-match handling.

/// Plain command acknowledgment.
pub const OK: &str = "OK";
/// An echoed probe - seen when the modem still has echo enabled at power-up.
pub const AT_ECHO: &str = "AT";
/// Registered in the home network.
pub const REGISTERED_HOME: &str = "+CREG: 0,1";
/// Registered in a roaming network.
pub const REGISTERED_ROAMING: &str = "+CREG: 0,5";
pub const PIN_READY: &str = "+CPIN: READY";
pub const PIN_REQUIRED: &str = "+CPIN: SIM PIN";
/// GNSS engine powered and holding a fix.
pub const GPS_FIXED: &str = "+CGNSINF: 1,1,";
/// Unsolicited announcement of a mobile-terminated SMS.
pub const SMS_URC: &str = "+CMT:";

/// Returns true iff `needle` occurs as a contiguous substring of `haystack`.
///
/// An empty needle trivially matches; a needle longer than the haystack never
/// does.
pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    if needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|window| window == needle)
}
