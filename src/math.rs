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

//! Provides the small set of geometric primitives the tracker works with.
//!
//! Texture dimensions are pixel-based and therefore integer (`u32`), while
//! viewports follow the graphics APIs and use floating-point components.

use serde::{Deserialize, Serialize};

/// A two-dimensional extent, typically representing texture or frame dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Extent2D {
    /// The width component of the extent.
    pub width: u32,
    /// The height component of the extent.
    pub height: u32,
}

impl Extent2D {
    /// Creates a new extent from a width and height.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A rendering viewport as bound on a command list.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    /// The x-coordinate of the top-left corner.
    pub x: f32,
    /// The y-coordinate of the top-left corner.
    pub y: f32,
    /// The width of the viewport.
    pub width: f32,
    /// The height of the viewport.
    pub height: f32,
    /// The minimum depth range value.
    pub min_depth: f32,
    /// The maximum depth range value.
    pub max_depth: f32,
}

impl Viewport {
    /// Creates a viewport covering `width` by `height` pixels at the origin,
    /// with the full `[0, 1]` depth range.
    pub const fn with_size(width: f32, height: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }

    /// Returns `true` when no dimensions have been recorded yet.
    pub fn is_unset(&self) -> bool {
        self.width == 0.0 || self.height == 0.0
    }
}
