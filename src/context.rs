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

//! Implements the per-device orchestration of depth-stencil tracking.
//!
//! A [`DeviceContext`] receives the intercepted events of one graphics
//! device: draws, binds and clears from recording threads, resource
//! lifetime events, command list executions and presents. It maintains the
//! registry of candidates, the backup texture cache and the current
//! selection, and records the copy commands that preserve depth contents
//! before they are destroyed.
//!
//! Locking discipline: all shared state sits behind one `RwLock`. Decisions
//! are computed under the lock, but every call into [`GraphicsDevice`] or
//! [`CommandList`] is made with the lock released, since those calls may
//! re-enter the tracker from the same thread.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::backup::{BackupCache, DepthStencilBackup};
use crate::config::{DepthConfig, PreserveMode, FORCE_CLEAR_LAST_HIGH_WORKLOAD};
use crate::graphics::api::{
    CommandQueueId, DeviceApi, ResourceDesc, ResourceId, ResourceType, ResourceUsage,
    ResourceViewDesc, ResourceViewId, ResourceViewType, TextureFormat,
};
use crate::graphics::caps::{self, BackendCaps};
use crate::graphics::device::{CommandList, GraphicsDevice};
use crate::graphics::error::ResourceError;
use crate::heuristics;
use crate::math::{Extent2D, Viewport};
use crate::registry::{DepthStencilInfo, DepthStencilRegistry};
use crate::selection::{self, SelectionState};
use crate::stats::{ClearKind, ClearStats, DrawStats};
use crate::tracking::StateTracking;

/// Clears whose last viewport is no wider than this are assumed to target an
/// atlas region (shadow map cascades) rather than the scene.
const SUBREGION_VIEWPORT_WIDTH: f32 = 1024.0;

/// At frame widths up to this the viewport filter is meaningless and disabled.
const SUBREGION_FRAME_WIDTH: u32 = 1024;

/// The vertex count above which a clear counts as ending a high-workload
/// window, for [`FORCE_CLEAR_LAST_HIGH_WORKLOAD`].
const HIGH_WORKLOAD_VERTICES: u64 = 5000;

/// Presents whose single depth-stencil saw at most this many draw calls are
/// treated as loading-screen or video frames and do not advance the frame.
const PRESENT_SPAM_DRAWCALLS: u32 = 8;

/// Everything guarded by the context lock.
struct SharedState {
    config: DepthConfig,
    frame_index: u64,
    queues: HashMap<CommandQueueId, StateTracking>,
    registry: DepthStencilRegistry,
    backups: BackupCache,
    selection: SelectionState,
}

/// The depth-stencil tracker of one graphics device.
pub struct DeviceContext {
    device: Arc<dyn GraphicsDevice>,
    caps: &'static dyn BackendCaps,
    shared: RwLock<SharedState>,
}

impl DeviceContext {
    /// Creates a tracker for the given device with the default configuration.
    pub fn new(device: Arc<dyn GraphicsDevice>) -> Self {
        Self::with_config(device, DepthConfig::default())
    }

    /// Creates a tracker for the given device with an explicit configuration.
    pub fn with_config(device: Arc<dyn GraphicsDevice>, config: DepthConfig) -> Self {
        let caps = caps::for_api(device.api());
        log::info!(
            "Initializing depth tracking for a {:?} device (preserve mode {:?})",
            caps.api(),
            config.preserve
        );
        Self {
            device,
            caps,
            shared: RwLock::new(SharedState {
                config,
                frame_index: 0,
                queues: HashMap::new(),
                registry: DepthStencilRegistry::default(),
                backups: BackupCache::default(),
                selection: SelectionState::default(),
            }),
        }
    }

    /// The device this context tracks.
    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }

    /// The graphics API of the tracked device.
    pub fn api(&self) -> DeviceApi {
        self.caps.api()
    }

    /// Returns a copy of the active configuration.
    pub fn config(&self) -> DepthConfig {
        self.shared.read().unwrap().config
    }

    /// Replaces the active configuration. Takes effect at the next event; the
    /// current frame's backup slots keep the clear index they were created
    /// with.
    pub fn update_config(&self, config: DepthConfig) {
        log::debug!("Updating depth tracking configuration");
        self.shared.write().unwrap().config = config;
    }

    /// The index of the current frame. Starts at zero and only advances on
    /// presents that rendered actual scene content.
    pub fn frame_index(&self) -> u64 {
        self.shared.read().unwrap().frame_index
    }

    /// Returns a copy of the current selection.
    pub fn selection(&self) -> SelectionState {
        self.shared.read().unwrap().selection
    }

    /// Returns a snapshot of every known depth-stencil candidate and its last
    /// published statistics, e.g. for listing in a host overlay.
    pub fn candidates(&self) -> Vec<(ResourceId, DepthStencilInfo)> {
        let shared = self.shared.read().unwrap();
        shared
            .registry
            .iter()
            .map(|(resource, info)| (resource, info.clone()))
            .collect()
    }

    /// Overrides the automatic candidate ranking with a fixed resource, or
    /// restores automatic selection with `None`.
    pub fn set_override(&self, depth_stencil: Option<ResourceId>) {
        log::info!("Depth-stencil override set to {depth_stencil:?}");
        self.shared.write().unwrap().selection.override_depth_stencil = depth_stencil;
    }

    fn preserve_mode(&self) -> PreserveMode {
        self.shared.read().unwrap().config.preserve
    }

    // ---------------------------------------------------------------------
    // Queue lifetime
    // ---------------------------------------------------------------------

    /// Registers a command queue of the device.
    pub fn register_queue(&self, queue: CommandQueueId) {
        self.shared
            .write()
            .unwrap()
            .queues
            .insert(queue, StateTracking::new_queue());
    }

    /// Forgets a destroyed command queue.
    pub fn unregister_queue(&self, queue: CommandQueueId) {
        self.shared.write().unwrap().queues.remove(&queue);
    }

    // ---------------------------------------------------------------------
    // Recording events
    // ---------------------------------------------------------------------

    /// Handles a direct draw on a command list.
    pub fn on_draw(
        &self,
        cmd: &mut dyn CommandList,
        state: &mut StateTracking,
        vertices: u32,
        instances: u32,
    ) {
        if state.current_depth_stencil.is_none() {
            return;
        }
        // Engines commonly clear depth by drawing a fullscreen quad instead
        // of issuing a clear command.
        let fullscreen = vertices == 6 && instances == 1;
        if fullscreen
            && state.first_draw_since_bind
            && self.caps.copy_at_fullscreen_draw()
            && self.preserve_mode() == PreserveMode::CopyDuringFrame
        {
            if let Some(depth_stencil) = state.current_depth_stencil {
                self.clear_copy(cmd, state, depth_stencil, ClearKind::FullscreenDraw);
            }
        }
        state.record_draw(u64::from(vertices) * u64::from(instances), !fullscreen);
    }

    /// Handles an indexed draw on a command list.
    pub fn on_draw_indexed(
        &self,
        cmd: &mut dyn CommandList,
        state: &mut StateTracking,
        indices: u32,
        instances: u32,
    ) {
        self.on_draw(cmd, state, indices, instances);
    }

    /// Handles indirect draws on a command list.
    pub fn on_draw_indirect(&self, state: &mut StateTracking, draw_count: u32) {
        state.record_indirect(draw_count);
    }

    /// Handles a viewport bind on a command list.
    pub fn on_bind_viewport(&self, state: &mut StateTracking, viewport: Viewport) {
        state.current_viewport = viewport;
    }

    /// Handles a depth-stencil view bind on a command list.
    ///
    /// Binding a different target arms the fullscreen-draw interception. On
    /// backends that alias resource memory, unbinding to null may be the last
    /// moment the contents are intact, so that case is treated like a clear
    /// when depth preservation is at its most aggressive.
    pub fn on_bind_depth_stencil(
        &self,
        cmd: &mut dyn CommandList,
        state: &mut StateTracking,
        view: Option<ResourceViewId>,
    ) {
        let depth_stencil = view.and_then(|view| self.device.resource_from_view(view));
        if depth_stencil == state.current_depth_stencil {
            return;
        }
        match depth_stencil {
            None => {
                if let Some(previous) = state.current_depth_stencil {
                    if self.caps.requires_explicit_copy()
                        && self.preserve_mode() == PreserveMode::CopyDuringFrame
                    {
                        self.clear_copy(cmd, state, previous, ClearKind::UnbindView);
                    }
                }
            }
            Some(_) => state.first_draw_since_bind = true,
        }
        state.current_depth_stencil = depth_stencil;
    }

    /// Handles the start of a render pass, which both binds the pass's
    /// depth-stencil attachment and, with a clear load operation, clears it.
    pub fn on_begin_render_pass(
        &self,
        cmd: &mut dyn CommandList,
        state: &mut StateTracking,
        depth_stencil_view: Option<ResourceViewId>,
        clears_depth: bool,
    ) {
        self.on_bind_depth_stencil(cmd, state, depth_stencil_view);
        if clears_depth && self.preserve_mode() != PreserveMode::Off {
            if let Some(depth_stencil) = state.current_depth_stencil {
                self.clear_copy(cmd, state, depth_stencil, ClearKind::ClearCall);
            }
        }
    }

    /// Handles an explicit clear of a depth-stencil view. Must be called
    /// before the clear itself is recorded.
    pub fn on_clear_depth_stencil(
        &self,
        cmd: &mut dyn CommandList,
        state: &mut StateTracking,
        view: ResourceViewId,
        clears_depth: bool,
    ) {
        if !clears_depth || self.preserve_mode() == PreserveMode::Off {
            return;
        }
        if let Some(depth_stencil) = self.device.resource_from_view(view) {
            self.clear_copy(cmd, state, depth_stencil, ClearKind::ClearCall);
        }
    }

    /// Handles a command list reset.
    pub fn on_reset_command_list(&self, state: &mut StateTracking) {
        state.reset();
    }

    /// Handles the execution of a command list on a queue.
    pub fn on_execute_command_list(&self, queue: CommandQueueId, list_state: &StateTracking) {
        let mut shared = self.shared.write().unwrap();
        shared
            .queues
            .entry(queue)
            .or_insert_with(StateTracking::new_queue)
            .merge(list_state);
    }

    /// Handles the execution of a secondary command list within a primary.
    pub fn on_execute_secondary(&self, primary: &mut StateTracking, secondary: &StateTracking) {
        if primary.current_depth_stencil.is_some()
            && secondary.current_depth_stencil.is_none()
            && secondary.counters.is_empty()
        {
            // The secondary list inherited the primary's depth-stencil state,
            // so its draws were invisible to the tracker. Record a single
            // indirect draw as a stand-in so the target is not dismissed as
            // unused.
            primary.current_viewport = secondary.current_viewport;
            primary.record_indirect(1);
        } else {
            primary.merge(secondary);
        }
    }

    // ---------------------------------------------------------------------
    // Resource lifetime events
    // ---------------------------------------------------------------------

    /// Rewrites the descriptor of a depth-stencil resource about to be
    /// created, so that its contents can later be sampled or copied. Returns
    /// `true` when the descriptor was modified.
    pub fn on_create_resource(&self, desc: &mut ResourceDesc) -> bool {
        if !matches!(desc.ty, ResourceType::Surface | ResourceType::Texture2D) {
            return false;
        }
        if !desc.usage.intersects(ResourceUsage::DEPTH_STENCIL) {
            return false;
        }
        // Stencil-only resources are never depth candidates.
        if desc.format == TextureFormat::S8Uint {
            return false;
        }
        if desc.samples > 1 && !self.device.supports_resolve_depth_stencil() {
            return false;
        }
        let disable_intz = self.shared.read().unwrap().config.disable_intz;
        self.caps.promote_resource_desc(desc, disable_intz)
    }

    /// Fills in the format of a depth-stencil view descriptor that relied on
    /// format inheritance or names a typeless format, neither of which
    /// resolves once the resource was promoted. Returns `true` when the
    /// descriptor was modified.
    pub fn on_create_resource_view(
        &self,
        resource_desc: &ResourceDesc,
        usage: ResourceUsage,
        view_desc: &mut ResourceViewDesc,
    ) -> bool {
        if !matches!(self.caps.api(), DeviceApi::D3d10 | DeviceApi::D3d11) {
            return false;
        }
        if resource_desc.ty != ResourceType::Texture2D
            || !resource_desc.usage.intersects(ResourceUsage::DEPTH_STENCIL)
        {
            return false;
        }
        // Views with an explicit typed format need no fixing up.
        if view_desc.format != TextureFormat::Unknown && !view_desc.format.is_typeless() {
            return false;
        }
        view_desc.format = if usage.intersects(ResourceUsage::DEPTH_STENCIL) {
            resource_desc.format.to_depth_stencil_typed()
        } else {
            resource_desc.format.to_default_typed()
        };
        if view_desc.ty == ResourceViewType::Unknown {
            view_desc.ty = if resource_desc.depth_or_layers > 1 {
                ResourceViewType::Texture2DArray
            } else {
                ResourceViewType::Texture2D
            };
            view_desc.first_level = 0;
            view_desc.level_count = u32::MAX;
            view_desc.first_layer = 0;
            view_desc.layer_count = u32::MAX;
        }
        true
    }

    /// Handles the destruction of an application resource.
    pub fn on_destroy_resource(&self, resource: ResourceId) {
        let (backup_hit, old_view) = {
            let mut shared = self.shared.write().unwrap();
            shared.registry.remove(resource);
            let backup_hit = shared.backups.find(resource).is_some();
            let old_view = if shared.selection.selected_depth_stencil == Some(resource) {
                shared.selection.selected_depth_stencil = None;
                shared.selection.using_backup = false;
                shared.selection.selected_view.take()
            } else {
                None
            };
            (backup_hit, old_view)
        };

        if backup_hit {
            // A frame in flight may still be copying from the resource. Wait
            // for the GPU before letting the destruction proceed, then park
            // the orphaned backup slot for reuse.
            log::warn!(
                "Depth-stencil resource {resource:?} was destroyed while still tracked for backup"
            );
            self.device.wait_idle();
            let mut shared = self.shared.write().unwrap();
            let frame_index = shared.frame_index;
            shared.backups.detach(resource, frame_index);
        }
        if let Some(view) = old_view {
            self.device.destroy_resource_view(view);
        }
    }

    // ---------------------------------------------------------------------
    // Frame boundary
    // ---------------------------------------------------------------------

    /// Handles a swap chain present: merges all queue states, publishes the
    /// frame's statistics into the registry, retires stale candidates and
    /// prunes expired backup textures.
    pub fn on_present(&self) {
        let counters = {
            let mut shared = self.shared.write().unwrap();
            let mut merged = StateTracking::new_queue();
            for queue_state in shared.queues.values_mut() {
                merged.merge(queue_state);
                queue_state.reset_on_present();
            }
            if merged.counters.is_empty() {
                return;
            }
            // Loading screens and video players present frames with a token
            // amount of geometry; those must not age the registry.
            if merged.counters.len() == 1
                && merged
                    .counters
                    .values()
                    .all(|counters| counters.total.drawcalls <= PRESENT_SPAM_DRAWCALLS)
            {
                return;
            }
            merged.counters
        };

        // Descriptor lookups happen with the lock released.
        let mut described = Vec::with_capacity(counters.len());
        for (resource, frame_stats) in counters {
            if let Some(desc) = self.device.get_resource_desc(resource) {
                described.push((resource, desc, frame_stats));
            }
        }

        let doomed = {
            let mut shared = self.shared.write().unwrap();
            shared.frame_index += 1;
            let frame_index = shared.frame_index;
            for (resource, desc, frame_stats) in described {
                shared.registry.publish(resource, desc, frame_stats, frame_index);
            }
            let retired = shared.registry.retire(frame_index);
            if !retired.is_empty() {
                log::debug!(
                    "Retired {} depth-stencil candidates unused for {} frames",
                    retired.len(),
                    crate::registry::RESOURCE_RETIRE_FRAMES
                );
            }
            shared.backups.advance_frame(frame_index)
        };
        for texture in doomed {
            log::debug!("Destroying expired backup texture {texture:?}");
            self.device.destroy_resource(texture);
        }
    }

    // ---------------------------------------------------------------------
    // Effect rendering
    // ---------------------------------------------------------------------

    /// Selects the scene depth-stencil for this frame and makes its contents
    /// available for sampling, recording a backup copy if needed. Returns the
    /// resulting selection; its view is `None` when no candidate qualified.
    pub fn begin_effects(
        &self,
        cmd: &mut dyn CommandList,
        frame_size: Extent2D,
    ) -> Result<SelectionState, ResourceError> {
        let (best, previous, preserve) = {
            let shared = self.shared.read().unwrap();
            let best = selection::pick_best_candidate(
                &shared.registry,
                &shared.config,
                shared.frame_index,
                frame_size,
                self.device.supports_resolve_depth_stencil(),
                shared.selection.override_depth_stencil,
            );
            (best, shared.selection, shared.config.preserve)
        };

        let Some(best) = best else {
            if previous.selected_depth_stencil.is_some() {
                log::info!("No depth-stencil candidate qualified, clearing selection");
                self.release_selection();
            }
            return Ok(self.selection());
        };

        let Some(desc) = self.device.get_resource_desc(best) else {
            // Destroyed between ranking and now; try again next frame.
            return Ok(self.selection());
        };

        let need_backup = preserve != PreserveMode::Off
            || !desc.usage.contains(ResourceUsage::SHADER_RESOURCE)
            || desc.samples > 1
            || self.caps.requires_explicit_copy();

        if previous.selected_depth_stencil != Some(best) {
            log::info!(
                "Selected depth-stencil {best:?} ({}x{}, {:?}{})",
                desc.size.width,
                desc.size.height,
                desc.format,
                if need_backup { ", via backup" } else { "" }
            );

            // Release the previous selection first, so a parked backup of
            // matching shape can be revived for the new one.
            self.release_selection();

            let (texture, view_format) = if need_backup {
                let texture = self.track_for_backup(best, &desc, frame_size)?;
                let format = self
                    .caps
                    .shader_resource_format(self.caps.format_for_depth_copy(desc.format));
                (texture, format)
            } else {
                (best, self.caps.shader_resource_format(desc.format))
            };
            let view = match self.device.create_resource_view(
                texture,
                ResourceUsage::SHADER_RESOURCE,
                &ResourceViewDesc::texture_2d(view_format),
            ) {
                Ok(view) => view,
                Err(err) => {
                    log::warn!("Failed to create depth shader resource view for {best:?}: {err}");
                    if need_backup {
                        self.untrack_depth_stencil(best);
                    }
                    return Err(err);
                }
            };

            let mut shared = self.shared.write().unwrap();
            shared.selection.selected_depth_stencil = Some(best);
            shared.selection.using_backup = need_backup;
            shared.selection.selected_view = Some(view);
        }

        if need_backup {
            let staged = {
                let mut shared = self.shared.write().unwrap();
                let state = &mut *shared;
                // The selection may have raced a resource destruction; only
                // proceed while the backup still shadows the resource.
                match state.backups.find(best) {
                    Some(slot) => {
                        let texture = slot.backup_texture;
                        let already_copied = state
                            .registry
                            .get(best)
                            .map_or(false, |info| info.frame_stats.copied_during_frame);
                        // In copy-during-frame mode on aliasing backends the
                        // contents may already belong to another resource by
                        // the end of the frame, so only the clear-time copies
                        // count there.
                        let can_copy = desc
                            .usage
                            .intersects(ResourceUsage::COPY_SOURCE | ResourceUsage::RESOLVE_SOURCE)
                            && !(preserve == PreserveMode::CopyDuringFrame
                                && self.caps.requires_explicit_copy());
                        let should_copy =
                            can_copy && (preserve == PreserveMode::Off || !already_copied);
                        if should_copy && preserve != PreserveMode::Off {
                            if let Some(info) = state.registry.get_mut(best) {
                                info.frame_stats.copied_during_frame = true;
                            }
                        }
                        Some((texture, should_copy))
                    }
                    None => None,
                }
            };
            if let Some((texture, should_copy)) = staged {
                if should_copy {
                    self.record_backup_copy(cmd, best, texture, &desc);
                }
                cmd.barrier(
                    texture,
                    ResourceUsage::COPY_DEST,
                    ResourceUsage::SHADER_RESOURCE,
                );
            }
        } else {
            cmd.barrier(
                best,
                ResourceUsage::DEPTH_STENCIL,
                ResourceUsage::SHADER_RESOURCE,
            );
        }

        Ok(self.selection())
    }

    /// Transitions the selected depth source back to its resting state after
    /// effects finished sampling it.
    pub fn finish_effects(&self, cmd: &mut dyn CommandList) {
        let (selection, backup_texture) = {
            let shared = self.shared.read().unwrap();
            let selection = shared.selection;
            let backup_texture = match (selection.selected_depth_stencil, selection.using_backup) {
                (Some(resource), true) => {
                    shared.backups.find(resource).map(|slot| slot.backup_texture)
                }
                _ => None,
            };
            (selection, backup_texture)
        };
        match (selection.selected_depth_stencil, selection.using_backup) {
            (Some(_), true) => {
                if let Some(texture) = backup_texture {
                    cmd.barrier(
                        texture,
                        ResourceUsage::SHADER_RESOURCE,
                        ResourceUsage::COPY_DEST,
                    );
                }
            }
            (Some(resource), false) => {
                cmd.barrier(
                    resource,
                    ResourceUsage::SHADER_RESOURCE,
                    ResourceUsage::DEPTH_STENCIL,
                );
            }
            _ => {}
        }
    }

    /// Drops the current selection, releasing its backup reference and
    /// destroying its view.
    pub fn release_selection(&self) {
        let old_view = {
            let mut shared = self.shared.write().unwrap();
            let state = &mut *shared;
            let frame_index = state.frame_index;
            if let Some(old) = state.selection.selected_depth_stencil.take() {
                if state.selection.using_backup {
                    state.backups.release(old, frame_index);
                }
            }
            state.selection.using_backup = false;
            state.selection.selected_view.take()
        };
        if let Some(view) = old_view {
            self.device.destroy_resource_view(view);
        }
    }

    // ---------------------------------------------------------------------
    // Backup management
    // ---------------------------------------------------------------------

    /// Starts shadowing a depth-stencil resource with a backup texture,
    /// returning the texture depth contents will be copied into. Each call
    /// adds one reference; pair with [`Self::untrack_depth_stencil`].
    pub fn track_depth_stencil(
        &self,
        depth_stencil: ResourceId,
        frame_size: Extent2D,
    ) -> Result<ResourceId, ResourceError> {
        let desc = self
            .device
            .get_resource_desc(depth_stencil)
            .ok_or(ResourceError::NotFound {
                resource: depth_stencil,
            })?;
        self.track_for_backup(depth_stencil, &desc, frame_size)
    }

    /// Drops one reference on the backup of a depth-stencil resource. The
    /// last reference parks the backup texture for later reuse.
    pub fn untrack_depth_stencil(&self, depth_stencil: ResourceId) {
        let mut shared = self.shared.write().unwrap();
        let frame_index = shared.frame_index;
        shared.backups.release(depth_stencil, frame_index);
    }

    fn track_for_backup(
        &self,
        depth_stencil: ResourceId,
        desc: &ResourceDesc,
        frame_size: Extent2D,
    ) -> Result<ResourceId, ResourceError> {
        let backup_format = self.caps.format_for_depth_copy(desc.format);
        let backup_size = desc.size;

        // Fast path: a live or parked slot can serve the request.
        {
            let mut shared = self.shared.write().unwrap();
            let state = &mut *shared;
            if let Some(texture) = state.backups.acquire_existing(depth_stencil) {
                // Re-tracking also refreshes the slot, so frame-size and
                // configuration changes reach long-lived backups.
                let force_clear_index = state.config.force_clear_index;
                if let Some(slot) = state.backups.find_mut(depth_stencil) {
                    slot.frame_width = frame_size.width;
                    slot.frame_height = frame_size.height;
                    slot.force_clear_index = force_clear_index;
                }
                return Ok(texture);
            }
            if let Some(texture) = state.backups.revive(depth_stencil, backup_size, backup_format) {
                log::debug!("Revived parked backup texture {texture:?} for {depth_stencil:?}");
                let force_clear_index = state.config.force_clear_index;
                if let Some(slot) = state.backups.find_mut(depth_stencil) {
                    slot.frame_width = frame_size.width;
                    slot.frame_height = frame_size.height;
                    slot.force_clear_index = force_clear_index;
                }
                return Ok(texture);
            }
        }

        // Slow path: allocate a fresh texture with the lock released.
        let mut usage = ResourceUsage::COPY_DEST | ResourceUsage::SHADER_RESOURCE;
        if desc.samples > 1 {
            usage |= ResourceUsage::RESOLVE_DEST;
        }
        let backup_desc = ResourceDesc::texture_2d(backup_size, backup_format, usage);
        let texture = self
            .device
            .create_resource(&backup_desc, ResourceUsage::COPY_DEST)
            .map_err(|err| {
                log::warn!("Failed to allocate backup texture for {depth_stencil:?}: {err}");
                err
            })?;

        let mut shared = self.shared.write().unwrap();
        let state = &mut *shared;
        if let Some(existing) = state.backups.acquire_existing(depth_stencil) {
            // Another thread won the allocation race; ours is surplus.
            drop(shared);
            self.device.destroy_resource(texture);
            return Ok(existing);
        }
        state.backups.insert(DepthStencilBackup {
            references: 1,
            destroy_after_frame: u64::MAX,
            backup_texture: texture,
            depth_stencil: Some(depth_stencil),
            texture_size: backup_size,
            texture_format: backup_format,
            frame_width: frame_size.width,
            frame_height: frame_size.height,
            force_clear_index: state.config.force_clear_index,
            current_clear_index: 0,
        });
        Ok(texture)
    }

    // ---------------------------------------------------------------------
    // Clear-time copies
    // ---------------------------------------------------------------------

    /// Decides whether the draw window ending at this clear event should be
    /// preserved, and if so records the backup copy. Always ends the window.
    fn clear_copy(
        &self,
        cmd: &mut dyn CommandList,
        state: &mut StateTracking,
        depth_stencil: ResourceId,
        kind: ClearKind,
    ) {
        let snapshot = state
            .counters
            .get(&depth_stencil)
            .map(|counters| counters.current)
            .unwrap_or_default();
        // An empty window carries nothing worth preserving, except on
        // backends where the statistics legitimately reset mid-frame.
        if snapshot.drawcalls == 0 && !self.caps.stats_reset_mid_frame() {
            return;
        }
        let Some(desc) = self.device.get_resource_desc(depth_stencil) else {
            return;
        };

        let best = state.best_copy_stats;
        let decision = {
            let mut shared = self.shared.write().unwrap();
            let inner = &mut *shared;
            let config = inner.config;
            let Some(slot) = inner.backups.find_mut(depth_stencil) else {
                // Not tracked for backup, so the clear is of no interest.
                return;
            };

            let mut do_copy = match kind {
                ClearKind::ClearCall => {
                    // Clears whose window only rendered into a small viewport
                    // are shadow map region updates, not scene resets.
                    snapshot.last_viewport.is_unset()
                        || snapshot.last_viewport.width > SUBREGION_VIEWPORT_WIDTH
                        || slot.frame_width <= SUBREGION_FRAME_WIDTH
                }
                // The window's last viewport, not the resource dimensions;
                // shadow passes may render into a sub-viewport of the same
                // buffer.
                ClearKind::FullscreenDraw => heuristics::check_aspect_ratio(
                    &config,
                    Extent2D::new(slot.frame_width, slot.frame_height),
                    Extent2D::new(
                        snapshot.last_viewport.width as u32,
                        snapshot.last_viewport.height as u32,
                    ),
                ),
                ClearKind::UnbindView => true,
            };
            if do_copy {
                do_copy = match slot.force_clear_index {
                    0 => {
                        // Greater-or-equal keeps the copy fresh when the same
                        // scene is rendered multiple times per frame.
                        if kind == ClearKind::FullscreenDraw {
                            snapshot.drawcalls >= best.drawcalls
                        } else {
                            snapshot.vertices >= best.vertices
                        }
                    }
                    FORCE_CLEAR_LAST_HIGH_WORKLOAD => snapshot.vertices >= HIGH_WORKLOAD_VERTICES,
                    index => {
                        let hit = slot.current_clear_index == index - 1;
                        slot.current_clear_index += 1;
                        hit
                    }
                };
            }
            (do_copy, slot.backup_texture)
        };
        let (do_copy, backup_texture) = decision;

        let counters = state.counters.entry(depth_stencil).or_default();
        if kind != ClearKind::UnbindView {
            counters.clears.push(ClearStats {
                stats: snapshot,
                kind,
                copied: do_copy,
            });
        }
        // The clear ends this window either way.
        counters.current = DrawStats::default();
        if do_copy {
            counters.copied_during_frame = true;
        }
        if !do_copy {
            return;
        }
        state.best_copy_stats = snapshot;

        self.record_backup_copy(cmd, depth_stencil, backup_texture, &desc);
    }

    /// Records the commands copying a depth-stencil's contents into its
    /// backup texture. Called with the context lock released.
    fn record_backup_copy(
        &self,
        cmd: &mut dyn CommandList,
        source: ResourceId,
        backup: ResourceId,
        desc: &ResourceDesc,
    ) {
        if desc.samples > 1 {
            cmd.barrier(
                source,
                ResourceUsage::DEPTH_STENCIL,
                ResourceUsage::RESOLVE_SOURCE,
            );
            cmd.barrier(
                backup,
                ResourceUsage::COPY_DEST,
                ResourceUsage::RESOLVE_DEST,
            );
            cmd.resolve_texture_region(source, backup, desc.format.to_default_typed());
            cmd.barrier(
                backup,
                ResourceUsage::RESOLVE_DEST,
                ResourceUsage::COPY_DEST,
            );
            cmd.barrier(
                source,
                ResourceUsage::RESOLVE_SOURCE,
                ResourceUsage::DEPTH_STENCIL,
            );
        } else {
            cmd.barrier(
                source,
                ResourceUsage::DEPTH_STENCIL,
                ResourceUsage::COPY_SOURCE,
            );
            cmd.copy_resource(source, backup);
            cmd.barrier(
                source,
                ResourceUsage::COPY_SOURCE,
                ResourceUsage::DEPTH_STENCIL,
            );
        }
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        let mut shared = match self.shared.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(view) = shared.selection.selected_view.take() {
            self.device.destroy_resource_view(view);
        }
        for texture in shared.backups.drain_all() {
            self.device.destroy_resource(texture);
        }
    }
}
