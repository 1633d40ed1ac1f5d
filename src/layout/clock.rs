//! Monotonic time stamps usable both natively and in the browser.

use std::time::Duration;

#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone, Copy)]
pub(crate) struct Stamp(std::time::Instant);

#[cfg(not(target_arch = "wasm32"))]
impl Stamp {
    pub(crate) fn now() -> Self {
        Self(std::time::Instant::now())
    }

    pub(crate) fn elapsed(self) -> Duration {
        self.0.elapsed()
    }
}

// `Instant` panics on wasm32-unknown-unknown.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy)]
pub(crate) struct Stamp(f64);

#[cfg(target_arch = "wasm32")]
impl Stamp {
    pub(crate) fn now() -> Self {
        Self(js_sys::Date::now())
    }

    pub(crate) fn elapsed(self) -> Duration {
        let millis = (js_sys::Date::now() - self.0).max(0.0);
        Duration::from_secs_f64(millis / 1000.0)
    }
}
