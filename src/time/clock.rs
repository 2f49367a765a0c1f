use chrono::{DateTime, Utc};

/// A port that provides the **current instant** for the application.
///
/// # Purpose
/// Cache backends evaluate TTL expiry against "now". Abstracting it lets
/// tests move time forward without sleeping.
///
/// # Typical Implementations
/// - `SystemClock`: wall-clock UTC time
/// - `FixedClock`: a settable instant (for testing)
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
