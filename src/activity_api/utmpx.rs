use std::ffi::c_char;

use anyhow::Result;
use chrono::DateTime;
use tracing::{instrument, trace};

use super::SessionEntry;

const SOURCE: &str = "utmpx";

/// Reads user sessions from the utmpx database.
///
/// The database cursor is process wide, callers must not iterate it from several threads at once.
#[instrument]
pub fn active_sessions() -> Result<Vec<SessionEntry>> {
    let mut sessions = Vec::new();
    unsafe {
        libc::setutxent();
        loop {
            let entry = libc::getutxent();
            if entry.is_null() {
                break;
            }
            // Entry memory is reused on the next call, everything is copied out right away.
            let entry = &*entry;
            if entry.ut_type != libc::USER_PROCESS {
                continue;
            }
            #[allow(clippy::useless_conversion)]
            let Some(started) = DateTime::from_timestamp(i64::from(entry.ut_tv.tv_sec), 0) else {
                continue;
            };
            let host = from_c_chars(&entry.ut_host);
            let session = SessionEntry {
                username: from_c_chars(&entry.ut_user),
                host: (!host.is_empty()).then_some(host),
                started,
                source: SOURCE,
            };
            trace!("Found session {session:?}");
            sessions.push(session);
        }
        libc::endutxent();
    }
    Ok(sessions)
}

/// utmpx strings are fixed size buffers, nul terminated only when shorter than the buffer.
fn from_c_chars(chars: &[c_char]) -> String {
    let bytes = chars
        .iter()
        .take_while(|c| **c != 0)
        .map(|c| *c as u8)
        .collect::<Vec<_>>();
    String::from_utf8_lossy(&bytes).into_owned()
}
