//! Wall clock for generated file names.

/// Whole seconds since 1970-01-01 UTC, or 0 if the clock is unavailable
pub fn unix_secs() -> u64 {
    epoch_millis() as u64 / 1000
}

#[cfg(not(target_arch = "wasm32"))]
fn epoch_millis() -> f64 {
    match std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_millis() as f64,
        Err(_) => 0.0,
    }
}

// `performance.now()` counts from page load; `timeOrigin` anchors it to the epoch.
#[cfg(target_arch = "wasm32")]
fn epoch_millis() -> f64 {
    let Some(performance) = web_sys::window().and_then(|w| w.performance()) else {
        return 0.0;
    };
    performance.time_origin() + performance.now()
}
