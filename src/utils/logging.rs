//! Log facade setup.
//!
//! Native builds leave logger installation to the host binary (tests use
//! `env_logger`). Browser builds route `log` records to the devtools console
//! and print Rust panics there too.

/// Installs the console logger and panic hook. Safe to call more than once.
#[cfg(target_arch = "wasm32")]
pub fn init_web_logging(level: log::Level) {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(level).is_err() {
        log::debug!("Console logger already installed");
    }
}

/// No-op outside the browser.
#[cfg(not(target_arch = "wasm32"))]
pub fn init_web_logging(level: log::Level) {
    log::trace!("init_web_logging({level}) ignored on native targets");
}
