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

//! Logger setup.
//!
//! Everything in ember logs through the `log` facade; this installs `env_logger`
//! behind it. `RUST_LOG` wins over the configured filter when set.

use ember_core::LogSettings;
use env_logger::{Builder, Env};

/// Installs the global logger with the filter described by `settings`.
///
/// ## Errors
/// Fails if a logger is already installed.
pub fn try_init(settings: &LogSettings) -> Result<(), log::SetLoggerError> {
    builder(settings).try_init()?;
    log::debug!("Logging initialized ({})", settings.filter_string());
    Ok(())
}

/// Like [`try_init`], but a second call is silently ignored.
pub fn init(settings: &LogSettings) {
    if try_init(settings).is_err() {
        log::debug!("Logger already installed, keeping it");
    }
}

fn builder(settings: &LogSettings) -> Builder {
    let mut builder = Builder::from_env(Env::default().default_filter_or(settings.filter_string()));
    builder.format_timestamp_millis();
    builder
}
