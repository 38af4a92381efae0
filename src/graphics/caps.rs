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

//! Defines the per-backend capability rules for depth-stencil access.
//!
//! Each graphics API has its own constraints on how a depth-stencil resource
//! can be made readable by shaders: D3D9 needs the INTZ format hack and a
//! single-channel float copy target, D3D10/11 work through typeless aliases,
//! D3D12 and Vulkan alias resource memory freely and therefore always require
//! an explicit copy. These rules are decided once at device initialization by
//! selecting a [`BackendCaps`] implementation, instead of being re-derived
//! from the API enum at every call site.

use crate::graphics::api::{DeviceApi, ResourceDesc, ResourceType, ResourceUsage, TextureFormat};

/// Backend-specific rules for tracking and copying depth-stencil resources.
pub trait BackendCaps: Send + Sync {
    /// The graphics API these capabilities describe.
    fn api(&self) -> DeviceApi;

    /// The format a backup copy target should be created with for a source
    /// depth-stencil of the given format.
    fn format_for_depth_copy(&self, format: TextureFormat) -> TextureFormat;

    /// The format a shader resource view of a depth texture should use.
    fn shader_resource_format(&self, format: TextureFormat) -> TextureFormat;

    /// Whether effects must always sample depth through a backup copy, because
    /// the application may alias the underlying resource memory mid-frame.
    fn requires_explicit_copy(&self) -> bool {
        false
    }

    /// Whether draw statistics may legitimately reset mid-frame, e.g. because
    /// a translation driver flushes its immediate command buffer.
    fn stats_reset_mid_frame(&self) -> bool {
        false
    }

    /// Whether a backup copy may be recorded when a fullscreen draw is used in
    /// place of a clear. Invalid inside an active render pass on Vulkan.
    fn copy_at_fullscreen_draw(&self) -> bool {
        true
    }

    /// Rewrites an application depth-stencil descriptor at creation time so
    /// its contents can later be sampled or copied. Returns `true` when the
    /// descriptor was modified.
    fn promote_resource_desc(&self, desc: &mut ResourceDesc, disable_intz: bool) -> bool;
}

/// Returns the capability rules for the given graphics API.
pub fn for_api(api: DeviceApi) -> &'static dyn BackendCaps {
    match api {
        DeviceApi::D3d9 => &D3d9Caps,
        DeviceApi::D3d10 => &D3d10Caps,
        DeviceApi::D3d11 => &D3d11Caps,
        DeviceApi::D3d12 => &D3d12Caps,
        DeviceApi::OpenGl => &OpenGlCaps,
        DeviceApi::Vulkan => &VulkanCaps,
    }
}

/// Direct3D 9 rules: the INTZ format enables depth sampling, but does not
/// support render-target usage, so backup copies go through `R32Float`.
pub struct D3d9Caps;

impl BackendCaps for D3d9Caps {
    fn api(&self) -> DeviceApi {
        DeviceApi::D3d9
    }

    fn format_for_depth_copy(&self, _format: TextureFormat) -> TextureFormat {
        TextureFormat::R32Float
    }

    fn shader_resource_format(&self, format: TextureFormat) -> TextureFormat {
        format.to_default_typed()
    }

    fn promote_resource_desc(&self, desc: &mut ResourceDesc, disable_intz: bool) -> bool {
        if disable_intz || desc.samples > 1 {
            return false;
        }
        // Textures in these formats may be sampled as hardware PCF shadow
        // maps; replacing the format would break that.
        if desc.ty == ResourceType::Texture2D
            && matches!(
                desc.format,
                TextureFormat::D16Unorm
                    | TextureFormat::D24UnormX8Uint
                    | TextureFormat::D24UnormS8Uint
            )
        {
            return false;
        }
        // Small textures are almost certainly shadow maps too.
        if desc.size.width <= 512 {
            return false;
        }
        if matches!(
            desc.format,
            TextureFormat::D32Float | TextureFormat::D32FloatS8Uint
        ) {
            log::warn!("Replacing high bit depth depth-stencil format with a lower bit depth format");
        }

        desc.format = TextureFormat::Intz;
        desc.usage |= ResourceUsage::SHADER_RESOURCE;
        true
    }
}

/// Direct3D 10 rules: depth textures are created typeless so both
/// depth-stencil and shader-resource views can alias them.
pub struct D3d10Caps;

impl BackendCaps for D3d10Caps {
    fn api(&self) -> DeviceApi {
        DeviceApi::D3d10
    }

    fn format_for_depth_copy(&self, format: TextureFormat) -> TextureFormat {
        format.to_typeless()
    }

    fn shader_resource_format(&self, format: TextureFormat) -> TextureFormat {
        format.to_default_typed()
    }

    fn promote_resource_desc(&self, desc: &mut ResourceDesc, _disable_intz: bool) -> bool {
        desc.format = desc.format.to_typeless();
        desc.usage |= ResourceUsage::SHADER_RESOURCE;
        true
    }
}

/// Direct3D 11 rules, identical to D3D10.
pub struct D3d11Caps;

impl BackendCaps for D3d11Caps {
    fn api(&self) -> DeviceApi {
        DeviceApi::D3d11
    }

    fn format_for_depth_copy(&self, format: TextureFormat) -> TextureFormat {
        format.to_typeless()
    }

    fn shader_resource_format(&self, format: TextureFormat) -> TextureFormat {
        format.to_default_typed()
    }

    fn promote_resource_desc(&self, desc: &mut ResourceDesc, _disable_intz: bool) -> bool {
        desc.format = desc.format.to_typeless();
        desc.usage |= ResourceUsage::SHADER_RESOURCE;
        true
    }
}

/// Direct3D 12 rules: resource memory may be aliased, so depth is always read
/// through a backup copy; application resources only need copy-source usage.
pub struct D3d12Caps;

impl BackendCaps for D3d12Caps {
    fn api(&self) -> DeviceApi {
        DeviceApi::D3d12
    }

    fn format_for_depth_copy(&self, format: TextureFormat) -> TextureFormat {
        format.to_typeless()
    }

    fn shader_resource_format(&self, format: TextureFormat) -> TextureFormat {
        format.to_default_typed()
    }

    fn requires_explicit_copy(&self) -> bool {
        true
    }

    fn promote_resource_desc(&self, desc: &mut ResourceDesc, _disable_intz: bool) -> bool {
        if desc.samples > 1 {
            desc.usage |= ResourceUsage::RESOLVE_SOURCE;
        } else {
            desc.usage |= ResourceUsage::COPY_SOURCE;
        }
        true
    }
}

/// OpenGL rules: depth formats are directly shader-readable, nothing needs to
/// be rewritten at resource creation.
pub struct OpenGlCaps;

impl BackendCaps for OpenGlCaps {
    fn api(&self) -> DeviceApi {
        DeviceApi::OpenGl
    }

    fn format_for_depth_copy(&self, format: TextureFormat) -> TextureFormat {
        format
    }

    fn shader_resource_format(&self, format: TextureFormat) -> TextureFormat {
        format
    }

    fn promote_resource_desc(&self, _desc: &mut ResourceDesc, _disable_intz: bool) -> bool {
        false
    }
}

/// Vulkan rules: like D3D12 the memory may be aliased, so a backup copy is
/// always required, but depth formats are valid for shader resource views.
pub struct VulkanCaps;

impl BackendCaps for VulkanCaps {
    fn api(&self) -> DeviceApi {
        DeviceApi::Vulkan
    }

    fn format_for_depth_copy(&self, format: TextureFormat) -> TextureFormat {
        format
    }

    fn shader_resource_format(&self, format: TextureFormat) -> TextureFormat {
        format
    }

    fn requires_explicit_copy(&self) -> bool {
        true
    }

    fn stats_reset_mid_frame(&self) -> bool {
        true
    }

    fn copy_at_fullscreen_draw(&self) -> bool {
        false
    }

    fn promote_resource_desc(&self, desc: &mut ResourceDesc, _disable_intz: bool) -> bool {
        if desc.samples > 1 {
            desc.usage |= ResourceUsage::RESOLVE_SOURCE;
        } else {
            desc.usage |= ResourceUsage::COPY_SOURCE;
        }
        true
    }
}
