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

//! Defines the cache of backup textures depth contents are copied into.
//!
//! Backup textures are expensive to allocate, so the cache keeps them alive
//! across frames. A slot whose reference count drops to zero is parked, not
//! destroyed, and can be revived by a later request for a matching texture.
//! Parked slots that stay unclaimed for [`BACKUP_DESTROY_DELAY_FRAMES`]
//! frames are pruned at present time.
//!
//! The cache itself never calls into the graphics device: allocation and
//! destruction happen in the device context with its lock released, and the
//! cache only records the outcomes. To make revival matching possible without
//! device calls, every slot caches the size and format its texture was
//! created with.

use crate::graphics::api::{ResourceId, TextureFormat};
use crate::math::Extent2D;

/// How many frames a parked backup texture survives before it is destroyed.
pub const BACKUP_DESTROY_DELAY_FRAMES: u64 = 50;

/// One backup texture and the depth-stencil it shadows.
#[derive(Debug, Clone)]
pub struct DepthStencilBackup {
    /// How many depth-stencil resources are currently copied into this
    /// backup. Zero means the slot is parked.
    pub references: u32,
    /// The frame at which a parked slot's texture gets destroyed.
    /// `u64::MAX` while the slot is referenced.
    pub destroy_after_frame: u64,
    /// The texture receiving the depth copies.
    pub backup_texture: ResourceId,
    /// The depth-stencil resource being shadowed, if the slot is live.
    pub depth_stencil: Option<ResourceId>,
    /// The dimensions the backup texture was created with.
    pub texture_size: Extent2D,
    /// The format the backup texture was created with.
    pub texture_format: TextureFormat,
    /// The frame width the backup was requested for, used by the clear-copy
    /// viewport filter.
    pub frame_width: u32,
    /// The frame height the backup was requested for.
    pub frame_height: u32,
    /// The clear index copies are forced at, zero meaning automatic.
    pub force_clear_index: u32,
    /// The index of the next clear operation within the current frame.
    pub current_clear_index: u32,
}

/// The set of backup slots owned by one device.
#[derive(Debug, Default)]
pub struct BackupCache {
    slots: Vec<DepthStencilBackup>,
}

impl BackupCache {
    /// Looks up the backup slot shadowing the given depth-stencil.
    pub fn find(&self, depth_stencil: ResourceId) -> Option<&DepthStencilBackup> {
        self.slots
            .iter()
            .find(|slot| slot.depth_stencil == Some(depth_stencil))
    }

    /// Mutable variant of [`Self::find`].
    pub fn find_mut(&mut self, depth_stencil: ResourceId) -> Option<&mut DepthStencilBackup> {
        self.slots
            .iter_mut()
            .find(|slot| slot.depth_stencil == Some(depth_stencil))
    }

    /// Adds a reference to the existing backup of a depth-stencil and returns
    /// its texture, or `None` when no live slot shadows it.
    pub fn acquire_existing(&mut self, depth_stencil: ResourceId) -> Option<ResourceId> {
        let slot = self.find_mut(depth_stencil)?;
        slot.references += 1;
        Some(slot.backup_texture)
    }

    /// Revives a parked slot whose texture matches the requested size and
    /// format, attaching it to the given depth-stencil.
    pub fn revive(
        &mut self,
        depth_stencil: ResourceId,
        size: Extent2D,
        format: TextureFormat,
    ) -> Option<ResourceId> {
        let slot = self.slots.iter_mut().find(|slot| {
            slot.references == 0 && slot.texture_size == size && slot.texture_format == format
        })?;
        slot.references = 1;
        slot.destroy_after_frame = u64::MAX;
        slot.depth_stencil = Some(depth_stencil);
        Some(slot.backup_texture)
    }

    /// Inserts a freshly allocated backup slot with one reference.
    pub fn insert(&mut self, slot: DepthStencilBackup) {
        debug_assert!(slot.references > 0);
        self.slots.push(slot);
    }

    /// Drops a reference on the backup of a depth-stencil. The last reference
    /// parks the slot for later revival instead of destroying its texture.
    pub fn release(&mut self, depth_stencil: ResourceId, frame_index: u64) {
        let Some(slot) = self.find_mut(depth_stencil) else {
            return;
        };
        if slot.references == 0 {
            return;
        }
        slot.references -= 1;
        if slot.references == 0 {
            slot.depth_stencil = None;
            slot.destroy_after_frame = frame_index + BACKUP_DESTROY_DELAY_FRAMES;
        }
    }

    /// Detaches the slot shadowing a destroyed depth-stencil, parking it
    /// regardless of its reference count.
    pub fn detach(&mut self, depth_stencil: ResourceId, frame_index: u64) -> bool {
        let Some(slot) = self.find_mut(depth_stencil) else {
            return false;
        };
        slot.references = 0;
        slot.depth_stencil = None;
        slot.destroy_after_frame = frame_index + BACKUP_DESTROY_DELAY_FRAMES;
        true
    }

    /// Advances the cache to a new frame: expired parked slots are removed
    /// and their textures returned for destruction, live slots restart their
    /// per-frame clear counter.
    pub fn advance_frame(&mut self, frame_index: u64) -> Vec<ResourceId> {
        let mut doomed = Vec::new();
        self.slots.retain_mut(|slot| {
            if slot.references == 0 && frame_index >= slot.destroy_after_frame {
                doomed.push(slot.backup_texture);
                return false;
            }
            slot.current_clear_index = 0;
            true
        });
        doomed
    }

    /// Removes every slot and returns all textures for destruction, as on
    /// device teardown.
    pub fn drain_all(&mut self) -> Vec<ResourceId> {
        self.slots
            .drain(..)
            .map(|slot| slot.backup_texture)
            .collect()
    }

    /// The number of slots currently in the cache, parked slots included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the cache holds no slots at all.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
