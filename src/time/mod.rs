pub mod clock;
pub mod system_clock;

pub use clock::Clock;
pub use system_clock::SystemClock;
