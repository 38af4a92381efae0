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

//! # Bathys
//!
//! Automatic scene depth-buffer detection for graphics interception layers.
//!
//! Applications rarely expose which of their depth-stencil resources holds
//! the rendered scene. This crate watches the intercepted command stream of
//! a device, gathers per-resource draw statistics, ranks the candidates each
//! frame and keeps the winner's contents readable for post-processing
//! effects, copying them into cached backup textures before clears destroy
//! them when configured to.
//!
//! The entry point is [`context::DeviceContext`], one per intercepted
//! device. Recording threads own a [`tracking::StateTracking`] per command
//! list and feed events through the context.

#![warn(missing_docs)]

pub mod backup;
pub mod config;
pub mod context;
pub mod graphics;
pub mod heuristics;
pub mod math;
pub mod registry;
pub mod selection;
pub mod stats;
pub mod tracking;

pub use config::DepthConfig;
pub use context::DeviceContext;
pub use selection::SelectionState;
pub use tracking::StateTracking;
