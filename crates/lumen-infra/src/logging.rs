// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Logger initialization backed by `env_logger`.

use anyhow::Context;
use env_logger::{Builder, Env};

/// Installs the global logger.
///
/// `RUST_LOG` takes precedence over `default_level`.
pub fn init_logging(default_level: &str) -> anyhow::Result<()> {
    Builder::from_env(Env::default().default_filter_or(default_level))
        .try_init()
        .context("a global logger is already installed")
}

/// Installs a logger suitable for tests: output is captured by the test harness
/// and repeated calls are ignored.
pub fn init_test_logging() {
    let _ = Builder::from_env(Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_init_is_idempotent() {
        init_test_logging();
        init_test_logging();
        assert!(init_logging("info").is_err());
        log::debug!("logger installed");
    }
}
