//! logger.rs — component-tagged log helpers
//!
//! Thin wrappers over the `log` facade. The component string becomes the
//! record target so a subscriber can filter per module (`block`, `verify`,
//! `forge`). With the `logging` feature disabled the helpers compile to nothing.

#[cfg(feature = "logging")]
pub fn log_info(component: &str, msg: &str) {
    log::info!(target: component, "{}", msg);
}

#[cfg(feature = "logging")]
pub fn log_warn(component: &str, msg: &str) {
    log::warn!(target: component, "{}", msg);
}

#[cfg(feature = "logging")]
pub fn log_debug(component: &str, msg: &str) {
    log::debug!(target: component, "{}", msg);
}

#[cfg(not(feature = "logging"))]
pub fn log_info(_component: &str, _msg: &str) {}

#[cfg(not(feature = "logging"))]
pub fn log_warn(_component: &str, _msg: &str) {}

#[cfg(not(feature = "logging"))]
pub fn log_debug(_component: &str, _msg: &str) {}
