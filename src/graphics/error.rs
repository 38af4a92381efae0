// Copyright 2025 the bathys authors
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

//! Defines the error types reported by the graphics device surface.
//!
//! Nothing in this crate propagates these errors into the host rendering
//! loop: every failure is recovered locally and surfaces at most as a
//! missing depth buffer for the frame.

use crate::graphics::api::{ResourceId, ResourceViewId};
use std::fmt;

/// An error related to the creation or use of a GPU resource.
#[derive(Debug)]
pub enum ResourceError {
    /// The backend failed to allocate a resource (e.g. a backup texture).
    AllocationFailed {
        /// Detailed error messages from the backend, if any.
        details: String,
    },
    /// The backend failed to create a resource view.
    ViewCreationFailed {
        /// The resource the view was requested for.
        resource: ResourceId,
        /// Detailed error messages from the backend, if any.
        details: String,
    },
    /// The referenced resource does not (or no longer) exist.
    NotFound {
        /// The handle that failed to resolve.
        resource: ResourceId,
    },
    /// The referenced resource view does not (or no longer) exist.
    ViewNotFound {
        /// The view handle that failed to resolve.
        view: ResourceViewId,
    },
    /// An error originating from the specific graphics backend implementation.
    BackendError(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::AllocationFailed { details } => {
                write!(f, "Resource allocation failed: {details}")
            }
            ResourceError::ViewCreationFailed { resource, details } => {
                write!(f, "View creation failed for resource {resource:?}: {details}")
            }
            ResourceError::NotFound { resource } => {
                write!(f, "Resource not found: {resource:?}")
            }
            ResourceError::ViewNotFound { view } => {
                write!(f, "Resource view not found: {view:?}")
            }
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_error_display() {
        let err = ResourceError::AllocationFailed {
            details: "out of device memory".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "Resource allocation failed: out of device memory"
        );

        let err = ResourceError::NotFound {
            resource: ResourceId(42),
        };
        assert_eq!(format!("{err}"), "Resource not found: ResourceId(42)");
    }
}
