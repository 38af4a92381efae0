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

//! Defines the abstract graphics surface the tracker drives.
//!
//! The tracker never talks to a graphics API directly. The hook layer that
//! feeds it events also implements these two traits, backed by whatever
//! device it intercepted. Implementations must tolerate being called from
//! multiple threads, as the tracker forwards calls from whichever thread
//! recorded the triggering event.
//!
//! Every method here may re-enter the tracker (e.g. a `create_resource` call
//! can trigger driver-side deferred destruction, which surfaces as a
//! `destroy_resource` event). The tracker therefore never holds its internal
//! lock across these calls.

use crate::graphics::api::{
    DeviceApi, ResourceDesc, ResourceId, ResourceUsage, ResourceViewDesc, ResourceViewId,
    TextureFormat,
};
use crate::graphics::error::ResourceError;

/// The device-level operations the tracker needs from a graphics backend.
pub trait GraphicsDevice: Send + Sync {
    /// The graphics API this device was created with.
    fn api(&self) -> DeviceApi;

    /// Whether the device can resolve multisampled depth-stencil textures.
    fn supports_resolve_depth_stencil(&self) -> bool;

    /// Creates a GPU resource in the given initial usage state.
    fn create_resource(
        &self,
        desc: &ResourceDesc,
        initial_state: ResourceUsage,
    ) -> Result<ResourceId, ResourceError>;

    /// Destroys a GPU resource previously created through this trait.
    fn destroy_resource(&self, resource: ResourceId);

    /// Returns the descriptor of a live resource, or `None` when the handle
    /// no longer refers to one.
    fn get_resource_desc(&self, resource: ResourceId) -> Option<ResourceDesc>;

    /// Creates a view onto a resource for the given usage.
    fn create_resource_view(
        &self,
        resource: ResourceId,
        usage: ResourceUsage,
        desc: &ResourceViewDesc,
    ) -> Result<ResourceViewId, ResourceError>;

    /// Destroys a resource view previously created through this trait.
    fn destroy_resource_view(&self, view: ResourceViewId);

    /// Returns the resource a view was created from, or `None` when the view
    /// no longer exists.
    fn resource_from_view(&self, view: ResourceViewId) -> Option<ResourceId>;

    /// Blocks until all previously submitted GPU work has finished.
    fn wait_idle(&self);
}

/// The recording operations the tracker issues on an intercepted command list.
///
/// Commands are recorded, never awaited; all methods return immediately.
pub trait CommandList {
    /// Transitions a resource between usage states.
    fn barrier(&mut self, resource: ResourceId, from: ResourceUsage, to: ResourceUsage);

    /// Copies the full contents of one resource into another of matching
    /// dimensions.
    fn copy_resource(&mut self, source: ResourceId, dest: ResourceId);

    /// Resolves a multisampled texture into a single-sampled one, converting
    /// to the given format.
    fn resolve_texture_region(
        &mut self,
        source: ResourceId,
        dest: ResourceId,
        format: TextureFormat,
    );
}
