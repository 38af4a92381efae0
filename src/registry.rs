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

//! Defines the registry of known depth-stencil resources.
//!
//! The registry holds every depth-stencil candidate ever drawn to, together
//! with the statistics published at the most recent present. Entries that go
//! unused for [`RESOURCE_RETIRE_FRAMES`] frames are retired so destroyed or
//! abandoned resources do not linger as selection candidates.

use crate::graphics::api::{ResourceDesc, ResourceId};
use crate::stats::DepthStencilFrameStats;
use std::collections::HashMap;

/// How many frames a resource may go unused before it is retired.
pub const RESOURCE_RETIRE_FRAMES: u64 = 30;

/// What the registry knows about one depth-stencil resource.
#[derive(Debug, Clone)]
pub struct DepthStencilInfo {
    /// The descriptor the resource was created with.
    pub desc: ResourceDesc,
    /// The statistics gathered during the most recent frame that used it.
    pub frame_stats: DepthStencilFrameStats,
    /// The frame the resource was first drawn to.
    pub first_used_in_frame: u64,
    /// The frame the resource was last drawn to.
    pub last_used_in_frame: u64,
}

/// All depth-stencil resources currently considered selection candidates.
#[derive(Debug, Default)]
pub struct DepthStencilRegistry {
    entries: HashMap<ResourceId, DepthStencilInfo>,
}

impl DepthStencilRegistry {
    /// Publishes the frame statistics of a resource at present time,
    /// registering it on first sight.
    pub fn publish(
        &mut self,
        resource: ResourceId,
        desc: ResourceDesc,
        frame_stats: DepthStencilFrameStats,
        frame_index: u64,
    ) {
        match self.entries.entry(resource) {
            std::collections::hash_map::Entry::Occupied(mut entry) => {
                let info = entry.get_mut();
                info.frame_stats = frame_stats;
                info.last_used_in_frame = frame_index;
            }
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(DepthStencilInfo {
                    desc,
                    frame_stats,
                    first_used_in_frame: frame_index,
                    last_used_in_frame: frame_index,
                });
            }
        }
    }

    /// Retires entries that were not published for a while, returning the
    /// retired resource handles.
    pub fn retire(&mut self, frame_index: u64) -> Vec<ResourceId> {
        let mut retired = Vec::new();
        self.entries.retain(|resource, info| {
            if frame_index > info.last_used_in_frame + RESOURCE_RETIRE_FRAMES {
                retired.push(*resource);
                return false;
            }
            true
        });
        retired
    }

    /// Removes a destroyed resource immediately.
    pub fn remove(&mut self, resource: ResourceId) -> bool {
        self.entries.remove(&resource).is_some()
    }

    /// Looks up a known resource.
    pub fn get(&self, resource: ResourceId) -> Option<&DepthStencilInfo> {
        self.entries.get(&resource)
    }

    /// Mutable variant of [`Self::get`].
    pub fn get_mut(&mut self, resource: ResourceId) -> Option<&mut DepthStencilInfo> {
        self.entries.get_mut(&resource)
    }

    /// Whether the registry knows the given resource.
    pub fn contains(&self, resource: ResourceId) -> bool {
        self.entries.contains_key(&resource)
    }

    /// Iterates over every known resource.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceId, &DepthStencilInfo)> {
        self.entries.iter().map(|(id, info)| (*id, info))
    }

    /// The number of known resources.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
