pub mod category;
pub mod job;
pub mod login_attempt;
pub mod photo;

pub use category::*;
pub use job::*;
pub use login_attempt::*;
pub use photo::*;

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
