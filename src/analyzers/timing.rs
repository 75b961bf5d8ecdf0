use std::time::Instant;

use serde::Serialize;

/// A computed value together with how long it took, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timed<T> {
    pub elapsed_secs: f64,
    pub value: T,
}

/// Runs `calculation` and measures it with a monotonic clock.
pub fn timed<T, F>(calculation: F) -> (T, f64)
where
    F: FnOnce() -> T,
{
    let start = Instant::now();
    let result = calculation();
    (result, start.elapsed().as_secs_f64())
}

/// Like [`timed`] for fallible calculations; the error passes through untimed.
pub fn timed_result<T, E, F>(calculation: F) -> Result<Timed<T>, E>
where
    F: FnOnce() -> Result<T, E>,
{
    let (result, elapsed_secs) = timed(calculation);
    result.map(|value| Timed {
        elapsed_secs,
        value,
    })
}
