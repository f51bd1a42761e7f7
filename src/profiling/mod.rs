//! Compile-time conditional profiling system.
//!
//! When the `profiling` feature is enabled, this module provides JSONL-based
//! event logging for performance analysis. When disabled, all functions are
//! no-ops with zero runtime cost.
//!
//! # Usage
//!
//! ```rust,ignore
//! use study_scheduler::profile_log;
//! use study_scheduler::profiling::EventType;
//!
//! profile_log!(EventType::SettingsResolved {
//!     deck_id: "anatomy".into(),
//!     source: "sciences".into()
//! });
//! ```
//!
//! Call `profiling::init()` once at startup and `profiling::shutdown()` before
//! exit; events logged outside that window are dropped.

#[cfg(feature = "profiling")]
mod event;
#[cfg(feature = "profiling")]
mod logger;

#[cfg(feature = "profiling")]
pub use event::*;
#[cfg(feature = "profiling")]
pub use logger::*;

#[cfg(not(feature = "profiling"))]
mod noop;
#[cfg(not(feature = "profiling"))]
pub use noop::*;

#[cfg(feature = "profiling")]
#[doc(hidden)]
pub use serde_json as __json;

// Macros are defined here to be available at crate root

/// Log a profiling event, optionally with `key = value` metadata.
///
/// Values only need to be `Serialize`. When the `profiling` feature is
/// disabled, this macro expands to nothing and its arguments are not evaluated.
///
/// # Examples
///
/// ```rust,ignore
/// profile_log!(EventType::LeechDetected {
///     item_id: item.id.clone(),
///     lapses,
///     action: "suspend".into()
/// });
///
/// profile_log!(event, prior = "review", next = "relearning");
/// ```
#[cfg(feature = "profiling")]
#[macro_export]
macro_rules! profile_log {
    ($event_type:expr) => {
        $crate::profiling::log_event($event_type)
    };
    ($event_type:expr, $($key:ident = $value:expr),+ $(,)?) => {{
        let mut meta = $crate::profiling::__json::Map::new();
        $(
            meta.insert(
                stringify!($key).to_string(),
                $crate::profiling::__json::json!($value),
            );
        )+
        $crate::profiling::log_event_with_meta(
            $event_type,
            $crate::profiling::__json::Value::Object(meta),
        )
    }};
}

#[cfg(not(feature = "profiling"))]
#[macro_export]
macro_rules! profile_log {
    ($($args:tt)*) => {};
}

/// Evaluate an expression and log how long it took under `name`.
///
/// With the `profiling` feature disabled this is just the expression.
///
/// # Examples
///
/// ```rust,ignore
/// let queue = profile_scope!("build_queue", builder.build_with_rng(items, buried, &mut rng));
/// ```
#[cfg(feature = "profiling")]
#[macro_export]
macro_rules! profile_scope {
    ($name:expr, $body:expr) => {{
        let started = std::time::Instant::now();
        let result = $body;
        $crate::profiling::log_timed($name, started.elapsed());
        result
    }};
}

#[cfg(not(feature = "profiling"))]
#[macro_export]
macro_rules! profile_scope {
    ($name:expr, $body:expr) => {
        $body
    };
}
