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

#![allow(dead_code)]

use bathys::context::DeviceContext;
use bathys::graphics::api::{
    CommandQueueId, DeviceApi, ResourceDesc, ResourceId, ResourceUsage, ResourceViewDesc,
    ResourceViewId, TextureFormat,
};
use bathys::graphics::device::{CommandList, GraphicsDevice};
use bathys::graphics::error::ResourceError;
use bathys::math::{Extent2D, Viewport};
use bathys::tracking::StateTracking;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;

/// A graphics device double that hands out handles and records every call
/// the tracker makes.
pub struct MockDevice {
    api: DeviceApi,
    resolve_support: bool,
    next_id: AtomicU64,
    resources: Mutex<HashMap<u64, ResourceDesc>>,
    views: Mutex<HashMap<u64, ResourceId>>,
    /// Every resource created through the trait, in creation order.
    pub created: Mutex<Vec<ResourceId>>,
    /// Every resource destroyed through the trait, in destruction order.
    pub destroyed: Mutex<Vec<ResourceId>>,
    /// How often the tracker waited for the GPU.
    pub wait_idle_calls: AtomicU32,
    /// When set, `create_resource_view` fails with `ViewCreationFailed`.
    pub fail_view_creation: AtomicBool,
}

impl MockDevice {
    pub fn new(api: DeviceApi) -> Self {
        Self {
            api,
            resolve_support: true,
            next_id: AtomicU64::new(1),
            resources: Mutex::new(HashMap::new()),
            views: Mutex::new(HashMap::new()),
            created: Mutex::new(Vec::new()),
            destroyed: Mutex::new(Vec::new()),
            wait_idle_calls: AtomicU32::new(0),
            fail_view_creation: AtomicBool::new(false),
        }
    }

    pub fn without_resolve_support(mut self) -> Self {
        self.resolve_support = false;
        self
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Registers a resource as if the application had created it.
    pub fn add_resource(&self, desc: ResourceDesc) -> ResourceId {
        let id = ResourceId(self.next_id());
        self.resources.lock().unwrap().insert(id.0, desc);
        id
    }

    /// Registers an application view of a resource.
    pub fn add_view(&self, resource: ResourceId) -> ResourceViewId {
        let id = ResourceViewId(self.next_id());
        self.views.lock().unwrap().insert(id.0, resource);
        id
    }

    /// Simulates the application destroying a resource.
    pub fn remove_resource(&self, resource: ResourceId) {
        self.resources.lock().unwrap().remove(&resource.0);
        self.views
            .lock()
            .unwrap()
            .retain(|_, target| *target != resource);
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn was_destroyed(&self, resource: ResourceId) -> bool {
        self.destroyed.lock().unwrap().contains(&resource)
    }
}

impl GraphicsDevice for MockDevice {
    fn api(&self) -> DeviceApi {
        self.api
    }

    fn supports_resolve_depth_stencil(&self) -> bool {
        self.resolve_support
    }

    fn create_resource(
        &self,
        desc: &ResourceDesc,
        _initial_state: ResourceUsage,
    ) -> Result<ResourceId, ResourceError> {
        let id = self.add_resource(*desc);
        self.created.lock().unwrap().push(id);
        Ok(id)
    }

    fn destroy_resource(&self, resource: ResourceId) {
        self.resources.lock().unwrap().remove(&resource.0);
        self.destroyed.lock().unwrap().push(resource);
    }

    fn get_resource_desc(&self, resource: ResourceId) -> Option<ResourceDesc> {
        self.resources.lock().unwrap().get(&resource.0).copied()
    }

    fn create_resource_view(
        &self,
        resource: ResourceId,
        _usage: ResourceUsage,
        _desc: &ResourceViewDesc,
    ) -> Result<ResourceViewId, ResourceError> {
        if self.fail_view_creation.load(Ordering::Relaxed) {
            return Err(ResourceError::ViewCreationFailed {
                resource,
                details: "view creation disabled".to_string(),
            });
        }
        if !self.resources.lock().unwrap().contains_key(&resource.0) {
            return Err(ResourceError::NotFound { resource });
        }
        Ok(self.add_view(resource))
    }

    fn destroy_resource_view(&self, view: ResourceViewId) {
        self.views.lock().unwrap().remove(&view.0);
    }

    fn resource_from_view(&self, view: ResourceViewId) -> Option<ResourceId> {
        self.views.lock().unwrap().get(&view.0).copied()
    }

    fn wait_idle(&self) {
        self.wait_idle_calls.fetch_add(1, Ordering::Relaxed);
    }
}

/// One recorded command list operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordedOp {
    Barrier(ResourceId, ResourceUsage, ResourceUsage),
    Copy {
        source: ResourceId,
        dest: ResourceId,
    },
    Resolve {
        source: ResourceId,
        dest: ResourceId,
        format: TextureFormat,
    },
}

/// A command list double that records the operations the tracker issues.
#[derive(Default)]
pub struct MockCommandList {
    pub ops: Vec<RecordedOp>,
}

impl MockCommandList {
    pub fn copy_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, RecordedOp::Copy { .. } | RecordedOp::Resolve { .. }))
            .count()
    }

    pub fn has_copy(&self, source: ResourceId, dest: ResourceId) -> bool {
        self.ops.contains(&RecordedOp::Copy { source, dest })
    }

    pub fn clear(&mut self) {
        self.ops.clear();
    }
}

impl CommandList for MockCommandList {
    fn barrier(&mut self, resource: ResourceId, from: ResourceUsage, to: ResourceUsage) {
        self.ops.push(RecordedOp::Barrier(resource, from, to));
    }

    fn copy_resource(&mut self, source: ResourceId, dest: ResourceId) {
        self.ops.push(RecordedOp::Copy { source, dest });
    }

    fn resolve_texture_region(
        &mut self,
        source: ResourceId,
        dest: ResourceId,
        format: TextureFormat,
    ) {
        self.ops.push(RecordedOp::Resolve {
            source,
            dest,
            format,
        });
    }
}

pub const FRAME_SIZE: Extent2D = Extent2D::new(1920, 1080);
pub const QUEUE: CommandQueueId = CommandQueueId(1);

/// A scene-sized depth-stencil descriptor, as a hook layer reports it. The
/// D3D runtimes allow copies from any resource, so copy-source usage is part
/// of the reported usage mask.
pub fn depth_stencil_desc() -> ResourceDesc {
    ResourceDesc::texture_2d(
        FRAME_SIZE,
        TextureFormat::D24UnormS8Uint,
        ResourceUsage::DEPTH_STENCIL | ResourceUsage::COPY_SOURCE,
    )
}

/// Runs one application frame: rebinds the depth-stencil, issues a batch of
/// draws, executes the command list and presents.
pub fn render_frame(
    ctx: &DeviceContext,
    state: &mut StateTracking,
    cmd: &mut MockCommandList,
    view: ResourceViewId,
    drawcalls: u32,
    vertices_per_draw: u32,
) {
    ctx.on_reset_command_list(state);
    ctx.on_bind_viewport(state, Viewport::with_size(1920.0, 1080.0));
    ctx.on_bind_depth_stencil(cmd, state, Some(view));
    for _ in 0..drawcalls {
        ctx.on_draw(cmd, state, vertices_per_draw, 1);
    }
    ctx.on_execute_command_list(QUEUE, state);
    ctx.on_present();
}
