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

//! Defines the per-recording-context accumulator state.
//!
//! One [`StateTracking`] exists per command list and per command queue. List
//! states are exclusively owned by their recording thread and require no
//! locking; queue states live inside the device context behind its lock and
//! only receive merged list states at execution time.

use crate::graphics::api::ResourceId;
use crate::math::Viewport;
use crate::stats::{DepthStencilFrameStats, DrawStats};
use std::collections::HashMap;

/// Draw-statistics tracking for one recording context.
#[derive(Debug, Clone)]
pub struct StateTracking {
    pub(crate) is_queue: bool,
    /// The viewport currently bound on the context.
    pub current_viewport: Viewport,
    /// The depth-stencil resource currently bound, if any.
    pub current_depth_stencil: Option<ResourceId>,
    /// Per-resource statistics for every depth-stencil touched so far.
    pub counters: HashMap<ResourceId, DepthStencilFrameStats>,
    /// Whether no draw happened yet since the last depth-stencil bind.
    pub first_draw_since_bind: bool,
    /// The statistics of the best backup copy made so far this frame.
    pub best_copy_stats: DrawStats,
}

impl StateTracking {
    /// Creates the state for a command list.
    pub fn new_list() -> Self {
        Self::new(false)
    }

    /// Creates the state for a command queue.
    pub(crate) fn new_queue() -> Self {
        Self::new(true)
    }

    fn new(is_queue: bool) -> Self {
        Self {
            is_queue,
            current_viewport: Viewport::default(),
            current_depth_stencil: None,
            // Reserve some space upfront to avoid rehashing during command
            // recording.
            counters: HashMap::with_capacity(32),
            first_draw_since_bind: true,
            best_copy_stats: DrawStats::default(),
        }
    }

    /// Clears the state back to freshly-created, as on a command list reset.
    pub fn reset(&mut self) {
        self.best_copy_stats = DrawStats::default();
        self.counters.clear();
        self.current_depth_stencil = None;
    }

    /// Clears the per-frame counters of a queue state at present time; the
    /// current binding carries over into the next frame.
    pub(crate) fn reset_on_present(&mut self) {
        debug_assert!(self.is_queue);
        self.best_copy_stats = DrawStats::default();
        self.counters.clear();
    }

    /// Folds the state of an executed recording context into this one.
    ///
    /// Executing a command list in another context inherits its bindings.
    pub fn merge(&mut self, source: &StateTracking) {
        self.current_depth_stencil = source.current_depth_stencil;

        if source.best_copy_stats.vertices >= self.best_copy_stats.vertices {
            self.best_copy_stats = source.best_copy_stats;
        }

        if source.counters.is_empty() {
            return;
        }
        self.counters.reserve(source.counters.len());
        for (resource, source_counters) in &source.counters {
            self.counters
                .entry(*resource)
                .or_default()
                .merge(source_counters);
        }
    }

    /// Records a direct draw on the bound depth-stencil. No-op without one.
    pub(crate) fn record_draw(&mut self, vertices: u64, update_viewport: bool) {
        let Some(depth_stencil) = self.current_depth_stencil else {
            return;
        };
        self.first_draw_since_bind = false;
        let viewport = self.current_viewport;
        self.counters
            .entry(depth_stencil)
            .or_default()
            .record_draw(vertices, viewport, update_viewport);
    }

    /// Records indirect draws on the bound depth-stencil. No-op without one.
    pub(crate) fn record_indirect(&mut self, draw_count: u32) {
        let Some(depth_stencil) = self.current_depth_stencil else {
            return;
        };
        self.first_draw_since_bind = false;
        let viewport = self.current_viewport;
        self.counters
            .entry(depth_stencil)
            .or_default()
            .record_indirect(draw_count, viewport);
    }
}

impl Default for StateTracking {
    fn default() -> Self {
        Self::new_list()
    }
}
