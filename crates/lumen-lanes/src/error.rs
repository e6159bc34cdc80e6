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

use lumen_core::renderer::{ConfigError, RenderError, ResourceError};

/// An error surfaced by the batch renderer.
///
/// Per-primitive problems never produce one; invalid input is dropped and
/// counted in the frame statistics instead.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// The renderer configuration was rejected.
    #[error("Invalid renderer configuration: {0}")]
    Config(#[from] ConfigError),

    /// The device cannot support the renderer.
    #[error("Renderer setup failed: {0}")]
    Render(#[from] RenderError),

    /// A GPU resource operation failed mid-frame.
    #[error("GPU resource operation failed: {0}")]
    Resource(#[from] ResourceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_error_converts() {
        let err: BatchError = ResourceError::AllocationFailed {
            requested_bytes: 64,
        }
        .into();
        assert!(matches!(
            err,
            BatchError::Resource(ResourceError::AllocationFailed { .. })
        ));
        assert_eq!(
            err.to_string(),
            "GPU resource operation failed: Failed to allocate 64 bytes."
        );
    }
}
