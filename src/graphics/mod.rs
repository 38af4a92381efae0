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

//! Provides the backend-agnostic graphics contracts of the tracker.
//!
//! This module defines the "common language" between the tracker and the
//! graphics interception layer hosting it: the resource data structures
//! ([`ResourceDesc`], [`ResourceViewDesc`]), the abstract device traits
//! ([`GraphicsDevice`], [`CommandList`]), the per-backend capability rules
//! ([`caps::BackendCaps`]), and the error types. The 'what' of tracking is
//! defined here; the 'how' of each graphics API is handled by whichever hook
//! layer implements these traits.

pub mod api;
pub mod caps;
pub mod device;
pub mod error;

// Re-export the most important traits and types for easier use.
pub use self::api::*;
pub use self::device::{CommandList, GraphicsDevice};
pub use self::error::ResourceError;
