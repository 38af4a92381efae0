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

//! Provides common, backend-agnostic enums and data structures describing
//! GPU resources as seen through an interception layer.
//!
//! These types mirror what the hook layer reports about application resources.
//! They are deliberately minimal: only the portion of a graphics API that
//! depth-stencil tracking needs to observe is modeled here.

use crate::math::Extent2D;

/// An opaque handle to an application or internally created GPU resource.
///
/// The value is whatever the hook layer uses to identify the resource
/// (usually the native object pointer or handle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(pub u64);

/// An opaque handle to a GPU resource view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceViewId(pub u64);

/// An opaque handle identifying a command queue of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandQueueId(pub u64);

/// The graphics API a device was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceApi {
    /// Direct3D 9.
    D3d9,
    /// Direct3D 10.
    D3d10,
    /// Direct3D 11.
    D3d11,
    /// Direct3D 12.
    D3d12,
    /// OpenGL.
    OpenGl,
    /// Vulkan.
    Vulkan,
}

/// The subset of texture formats relevant to depth-stencil tracking.
///
/// Next to the depth formats themselves this includes the typeless and typed
/// aliases that D3D10+ requires when the same memory is used both as a
/// depth-stencil attachment and as a shader resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    /// An unknown or unspecified format.
    #[default]
    Unknown,
    /// 16-bit normalized depth.
    D16Unorm,
    /// 16-bit normalized depth with 8-bit stencil.
    D16UnormS8Uint,
    /// 24-bit normalized depth, 8 unused bits.
    D24UnormX8Uint,
    /// 24-bit normalized depth with 8-bit stencil.
    D24UnormS8Uint,
    /// 32-bit floating-point depth.
    D32Float,
    /// 32-bit floating-point depth with 8-bit stencil.
    D32FloatS8Uint,
    /// 8-bit stencil only.
    S8Uint,
    /// The D3D9 INTZ hack format, which allows sampling a depth surface.
    Intz,
    /// Typeless 16-bit, aliasing [`TextureFormat::D16Unorm`].
    R16Typeless,
    /// Typed 16-bit normalized, the shader-readable alias of D16.
    R16Unorm,
    /// Typeless 24+8-bit, aliasing the D24 formats.
    R24G8Typeless,
    /// Typed 24-bit normalized with masked stencil, shader-readable alias of D24.
    R24UnormX8Uint,
    /// Typeless 32-bit, aliasing [`TextureFormat::D32Float`].
    R32Typeless,
    /// Typed 32-bit float, shader-readable alias of D32 (also the D3D9 backup format).
    R32Float,
    /// Typeless 32+8-bit, aliasing [`TextureFormat::D32FloatS8Uint`].
    R32G8Typeless,
    /// Typed 32-bit float with masked stencil, shader-readable alias of D32S8.
    R32FloatX8Uint,
}

impl TextureFormat {
    /// Returns the typeless alias of a depth format, which is required to
    /// create both depth-stencil and shader-resource views of one texture on
    /// D3D10 and up.
    pub fn to_typeless(self) -> Self {
        match self {
            Self::D16Unorm | Self::R16Unorm => Self::R16Typeless,
            Self::D24UnormX8Uint | Self::D24UnormS8Uint | Self::R24UnormX8Uint => {
                Self::R24G8Typeless
            }
            Self::D32Float => Self::R32Typeless,
            Self::D32FloatS8Uint | Self::R32FloatX8Uint => Self::R32G8Typeless,
            other => other,
        }
    }

    /// Returns the shader-readable typed alias of a depth or typeless format.
    pub fn to_default_typed(self) -> Self {
        match self {
            Self::D16Unorm | Self::R16Typeless => Self::R16Unorm,
            Self::D24UnormX8Uint | Self::D24UnormS8Uint | Self::R24G8Typeless => {
                Self::R24UnormX8Uint
            }
            Self::D32Float | Self::R32Typeless => Self::R32Float,
            Self::D32FloatS8Uint | Self::R32G8Typeless => Self::R32FloatX8Uint,
            other => other,
        }
    }

    /// Whether this is one of the typeless aliases, which cannot back a view
    /// directly.
    pub fn is_typeless(self) -> bool {
        matches!(
            self,
            Self::R16Typeless | Self::R24G8Typeless | Self::R32Typeless | Self::R32G8Typeless
        )
    }

    /// Returns the depth-stencil typed alias of a typeless format.
    pub fn to_depth_stencil_typed(self) -> Self {
        match self {
            Self::R16Typeless | Self::R16Unorm => Self::D16Unorm,
            Self::R24G8Typeless | Self::R24UnormX8Uint => Self::D24UnormS8Uint,
            Self::R32Typeless | Self::R32Float => Self::D32Float,
            Self::R32G8Typeless | Self::R32FloatX8Uint => Self::D32FloatS8Uint,
            other => other,
        }
    }
}

bitflags::bitflags! {
    /// The usage states a resource may be created with or transitioned to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ResourceUsage: u32 {
        /// The resource can be read as a depth-stencil attachment.
        const DEPTH_STENCIL_READ = 1 << 0;
        /// The resource can be written as a depth-stencil attachment.
        const DEPTH_STENCIL_WRITE = 1 << 1;
        /// The resource can be bound as a depth-stencil attachment.
        const DEPTH_STENCIL = Self::DEPTH_STENCIL_READ.bits() | Self::DEPTH_STENCIL_WRITE.bits();
        /// The resource can be sampled from shaders.
        const SHADER_RESOURCE = 1 << 2;
        /// The resource can be the source of a copy operation.
        const COPY_SOURCE = 1 << 3;
        /// The resource can be the destination of a copy operation.
        const COPY_DEST = 1 << 4;
        /// The resource can be the source of a multisample resolve.
        const RESOLVE_SOURCE = 1 << 5;
        /// The resource can be the destination of a multisample resolve.
        const RESOLVE_DEST = 1 << 6;
    }
}

/// The kind of resource a descriptor refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceType {
    /// An untyped or unrecognized resource.
    #[default]
    Unknown,
    /// A buffer resource.
    Buffer,
    /// A non-texture render surface (D3D9).
    Surface,
    /// A two-dimensional texture.
    Texture2D,
    /// A three-dimensional texture.
    Texture3D,
}

/// The memory heap a resource is allocated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MemoryHeap {
    /// Placement is decided by the driver.
    #[default]
    Unknown,
    /// Device-local memory, not host-visible.
    GpuOnly,
    /// Host-visible upload memory.
    CpuToGpu,
    /// Host-visible readback memory.
    GpuToCpu,
}

/// A description of a GPU resource as reported by the hook layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResourceDesc {
    /// The kind of resource.
    pub ty: ResourceType,
    /// Width and height, for texture resources.
    pub size: Extent2D,
    /// Depth for 3D textures, or the number of array layers.
    pub depth_or_layers: u32,
    /// Samples per pixel; greater than one for MSAA resources.
    pub samples: u32,
    /// The texel format.
    pub format: TextureFormat,
    /// The allowed usage states.
    pub usage: ResourceUsage,
    /// The memory heap the resource lives in.
    pub heap: MemoryHeap,
}

impl ResourceDesc {
    /// Creates a single-sampled 2D texture descriptor.
    pub fn texture_2d(size: Extent2D, format: TextureFormat, usage: ResourceUsage) -> Self {
        Self {
            ty: ResourceType::Texture2D,
            size,
            depth_or_layers: 1,
            samples: 1,
            format,
            usage,
            heap: MemoryHeap::GpuOnly,
        }
    }
}

/// The dimensionality of a resource view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceViewType {
    /// Not specified by the application; defaults are derived from the resource.
    #[default]
    Unknown,
    /// A view of a 2D texture.
    Texture2D,
    /// A view of a 2D texture array.
    Texture2DArray,
}

/// A description of a view onto a (subset of a) resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceViewDesc {
    /// The dimensionality of the view.
    pub ty: ResourceViewType,
    /// The format the view reinterprets the resource as.
    pub format: TextureFormat,
    /// The first mipmap level accessible through the view.
    pub first_level: u32,
    /// The number of mipmap levels; `u32::MAX` selects all remaining levels.
    pub level_count: u32,
    /// The first array layer accessible through the view.
    pub first_layer: u32,
    /// The number of array layers; `u32::MAX` selects all remaining layers.
    pub layer_count: u32,
}

impl ResourceViewDesc {
    /// Creates a view description of the first level and layer of a 2D texture.
    pub fn texture_2d(format: TextureFormat) -> Self {
        Self {
            ty: ResourceViewType::Texture2D,
            format,
            first_level: 0,
            level_count: 1,
            first_layer: 0,
            layer_count: 1,
        }
    }
}

impl Default for ResourceViewDesc {
    fn default() -> Self {
        Self {
            ty: ResourceViewType::Unknown,
            format: TextureFormat::Unknown,
            first_level: 0,
            level_count: 1,
            first_layer: 0,
            layer_count: 1,
        }
    }
}
