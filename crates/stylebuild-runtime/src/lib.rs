/*
 * stylebuild-runtime
 * Copyright (c) 2026 stylebuild contributors
 *
 * System abstraction layer for stylebuild.
 *
 * Everything that touches the host machine (existence probes, file reads and
 * writes, subprocesses, binary discovery) goes through the `SystemRuntime`
 * trait so that resolution and compilation can be exercised against any
 * implementation.
 */

mod native;
mod traits;

pub use traits::{CommandOutput, PathKind, RuntimeError, RuntimeResult, SystemRuntime};

pub use native::NativeRuntime;

/// Create the default runtime for the current platform.
pub fn default_runtime() -> NativeRuntime {
    NativeRuntime::new()
}
