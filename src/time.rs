//! Monotonic clock in milliseconds
//!
//! Everything timed in this crate is in milliseconds: `requestAnimationFrame`
//! timestamps, the frame-rate cap and the resize debounce window. Native
//! builds count from the first call so the harness sees the same scale.

#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
pub fn now_millis() -> f64 {
    match web_sys::window().and_then(|w| w.performance()) {
        Some(performance) => performance.now(),
        None => 0.0,
    }
}

#[cfg(not(all(target_arch = "wasm32", feature = "wasm")))]
pub fn now_millis() -> f64 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static ORIGIN: OnceLock<Instant> = OnceLock::new();
    let origin = *ORIGIN.get_or_init(Instant::now);
    origin.elapsed().as_secs_f64() * 1e3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_millis_is_monotonic() {
        let a = now_millis();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = now_millis();
        assert!(b >= a + 4.0, "{} -> {}", a, b);
    }
}
