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

//! Global settings for the batch renderer.

use crate::renderer::api::VertexLayout;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The largest number of vertices a single batch can address with 16-bit indices.
pub const MAX_BATCH_VERTICES: usize = u16::MAX as usize + 1;

/// Operating mode of the texture garbage collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GcMode {
    /// Collection never runs, even when requested.
    Disabled,
    /// Collection runs only when explicitly requested.
    Manual,
    /// Collection runs automatically every `gc_check_interval_frames` frames.
    #[default]
    Auto,
}

/// A collection of settings that shape batching and GPU resource management.
///
/// Every field has a default, so a partial JSON document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Soft cap on the textures one draw call may sample; the effective value is
    /// further limited by the device's texture units and shader branch budget.
    pub max_textures_per_batch: u32,
    /// Number of vertices buffered before an implicit flush.
    pub batch_vertex_capacity: usize,
    /// The shape of the interleaved vertex records.
    pub vertex_layout: VertexLayout,
    /// Texture garbage collector mode.
    pub gc_mode: GcMode,
    /// Frames a texture may stay unbound before its GPU storage is evicted.
    pub gc_max_idle_frames: u64,
    /// Frames between automatic collections.
    pub gc_check_interval_frames: u32,
    /// Whether a GPU buffer may be re-uploaded more than once within a frame.
    /// Disable on drivers that stall or corrupt data when doing so.
    pub can_reuse_upload_buffer_within_frame: bool,
    /// Whether pooled render targets matching the screen size skip power-of-two rounding.
    pub enable_full_screen_render_target_fast_path: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_textures_per_batch: 16,
            batch_vertex_capacity: 8000,
            vertex_layout: VertexLayout::Tinted,
            gc_mode: GcMode::Auto,
            gc_max_idle_frames: 3600,
            gc_check_interval_frames: 600,
            can_reuse_upload_buffer_within_frame: true,
            enable_full_screen_render_target_fast_path: true,
        }
    }
}

impl RendererConfig {
    /// Parses a configuration from JSON and validates it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the configuration can drive a renderer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_textures_per_batch == 0 {
            return Err(ConfigError::Invalid {
                field: "max_textures_per_batch",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.batch_vertex_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "batch_vertex_capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.batch_vertex_capacity > MAX_BATCH_VERTICES {
            return Err(ConfigError::Invalid {
                field: "batch_vertex_capacity",
                reason: format!("must not exceed {MAX_BATCH_VERTICES} (16-bit indices)"),
            });
        }
        if self.gc_check_interval_frames == 0 {
            return Err(ConfigError::Invalid {
                field: "gc_check_interval_frames",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// An error produced while loading or validating a [`RendererConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// The document is not valid JSON for a configuration.
    Parse(serde_json::Error),
    /// A field holds a value the renderer cannot use.
    Invalid {
        /// The offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(err) => write!(f, "Failed to parse renderer config: {err}"),
            ConfigError::Invalid { field, reason } => {
                write!(f, "Invalid renderer config field '{field}': {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Parse(err) => Some(err),
            ConfigError::Invalid { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RendererConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gc_mode, GcMode::Auto);
        assert_eq!(config.batch_vertex_capacity, 8000);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = RendererConfig::from_json_str(
            r#"{ "max_textures_per_batch": 4, "gc_mode": "Manual" }"#,
        )
        .unwrap();

        assert_eq!(config.max_textures_per_batch, 4);
        assert_eq!(config.gc_mode, GcMode::Manual);
        assert_eq!(config.gc_max_idle_frames, 3600);
        assert!(config.can_reuse_upload_buffer_within_frame);
    }

    #[test]
    fn test_rejects_zero_texture_cap() {
        let err = RendererConfig::from_json_str(r#"{ "max_textures_per_batch": 0 }"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "max_textures_per_batch",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_oversized_batch() {
        let config = RendererConfig {
            batch_vertex_capacity: MAX_BATCH_VERTICES + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json_is_a_parse_error() {
        let err = RendererConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
