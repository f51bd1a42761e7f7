//! No-op implementations when profiling is disabled.
//!
//! All functions in this module are `#[inline(always)]` empty functions
//! that will be completely eliminated by the compiler.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

#[inline(always)]
pub fn init() {}

/// Always None: nothing is written without the `profiling` feature.
#[inline(always)]
pub fn init_in(_: &Path) -> Option<PathBuf> {
    None
}

#[inline(always)]
pub fn shutdown() {}

#[inline(always)]
pub fn log_event<T>(_: T) {}

#[inline(always)]
pub fn log_event_with_meta<T, M>(_: T, _: M) {}

#[inline(always)]
pub fn log_timed(_: &str, _: Duration) {}
