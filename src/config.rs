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

//! Defines the configuration options recognized by the depth tracker.
//!
//! The tracker persists nothing itself; hosts deserialize a [`DepthConfig`]
//! from their own configuration layer and may swap it at runtime through
//! [`crate::context::DeviceContext::update_config`].

use crate::graphics::api::TextureFormat;
use crate::math::Extent2D;
use serde::{Deserialize, Serialize};

/// Sentinel for [`DepthConfig::force_clear_index`] selecting the last clear
/// operation within a frame that carried a high workload.
pub const FORCE_CLEAR_LAST_HIGH_WORKLOAD: u32 = u32::MAX;

/// When and whether depth contents are preserved by backup copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PreserveMode {
    /// Depth is read once per frame, after the frame finished rendering.
    #[default]
    Off,
    /// Depth is snapshotted right before clear operations destroy it.
    CopyBeforeClear,
    /// Like `CopyBeforeClear`, but fullscreen draws and depth-stencil unbinds
    /// are treated as clears too (needed when engines clear by drawing, and
    /// on backends that alias resource memory mid-frame).
    CopyDuringFrame,
}

/// How candidate dimensions are matched against the presented frame size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AspectHeuristic {
    /// No dimension filtering.
    None,
    /// Accept dimensions with a similar aspect ratio.
    #[default]
    Similar,
    /// Like `Similar`, but also accept near-integer multiples of the frame
    /// size (render-resolution scaling, DLSS).
    Multiple,
    /// Require dimensions to match the frame size exactly.
    Exact,
    /// Require dimensions to match [`DepthConfig::custom_size`] exactly.
    Custom,
}

/// An optional allow-list over candidate depth-stencil formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatFilter {
    /// Accept every format.
    #[default]
    All,
    /// 16-bit depth.
    D16,
    /// 16-bit depth with stencil.
    D16S8,
    /// 24-bit depth, unused upper bits.
    D24X8,
    /// 24-bit depth with stencil.
    D24S8,
    /// 32-bit float depth.
    D32,
    /// 32-bit float depth with stencil.
    D32S8,
    /// The D3D9 INTZ format.
    Intz,
}

impl FormatFilter {
    /// Whether a candidate resource format passes this filter.
    ///
    /// Typeless aliases are accepted alongside their typed depth formats,
    /// since D3D10+ resources are created typeless.
    pub fn accepts(self, format: TextureFormat) -> bool {
        match self {
            Self::All => true,
            Self::D16 => matches!(
                format,
                TextureFormat::D16Unorm | TextureFormat::R16Typeless
            ),
            Self::D16S8 => format == TextureFormat::D16UnormS8Uint,
            Self::D24X8 => format == TextureFormat::D24UnormX8Uint,
            Self::D24S8 => matches!(
                format,
                TextureFormat::D24UnormS8Uint | TextureFormat::R24G8Typeless
            ),
            Self::D32 => matches!(
                format,
                TextureFormat::D32Float | TextureFormat::R32Float | TextureFormat::R32Typeless
            ),
            Self::D32S8 => matches!(
                format,
                TextureFormat::D32FloatS8Uint | TextureFormat::R32G8Typeless
            ),
            Self::Intz => format == TextureFormat::Intz,
        }
    }
}

/// The options recognized by the depth tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthConfig {
    /// Disables the INTZ format replacement on D3D9 devices.
    pub disable_intz: bool,
    /// When depth contents are preserved by backup copies.
    pub preserve: PreserveMode,
    /// How candidate dimensions are matched against the frame size.
    pub aspect_heuristic: AspectHeuristic,
    /// The dimensions required by [`AspectHeuristic::Custom`].
    pub custom_size: Extent2D,
    /// Restricts candidates to a single depth format family.
    pub format_filter: FormatFilter,
    /// Zero selects the copy-worthiest clear automatically, a positive value
    /// copies exactly at the N-th clear of the frame, and
    /// [`FORCE_CLEAR_LAST_HIGH_WORKLOAD`] copies at every high-workload clear
    /// so the last one wins.
    pub force_clear_index: u32,
}
