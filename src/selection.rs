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

//! Implements the once-per-frame choice of the scene depth-stencil.
//!
//! The candidate ranking itself is a pure function over the registry, kept
//! free of device calls so it can run under the context lock and be tested
//! in isolation.

use crate::config::DepthConfig;
use crate::graphics::api::{ResourceId, ResourceViewId};
use crate::heuristics;
use crate::math::Extent2D;
use crate::registry::DepthStencilRegistry;

/// The current depth-stencil selection exposed to effect rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionState {
    /// The depth-stencil resource currently selected, if any.
    pub selected_depth_stencil: Option<ResourceId>,
    /// A user-chosen resource that overrides the automatic ranking.
    pub override_depth_stencil: Option<ResourceId>,
    /// The shader-resource view effects sample depth through. Points at the
    /// backup texture when one is in use, at the resource itself otherwise.
    pub selected_view: Option<ResourceViewId>,
    /// Whether `selected_view` reads from a backup texture.
    pub using_backup: bool,
}

/// Ranks the registry's candidates and returns the likeliest scene
/// depth-stencil for the frame that just completed.
///
/// A configured override wins whenever it is still a known candidate. The
/// automatic ranking skips resources that saw no real geometry this frame,
/// resources too recently created to have a full frame of statistics,
/// multisampled resources the device cannot resolve, and resources rejected
/// by the configured format and dimension filters.
pub fn pick_best_candidate(
    registry: &DepthStencilRegistry,
    config: &DepthConfig,
    frame_index: u64,
    frame_size: Extent2D,
    can_resolve_msaa: bool,
    override_depth_stencil: Option<ResourceId>,
) -> Option<ResourceId> {
    if let Some(chosen) = override_depth_stencil {
        if registry.contains(chosen) {
            return Some(chosen);
        }
    }

    let mut best: Option<(ResourceId, &crate::registry::DepthStencilInfo)> = None;
    for (resource, info) in registry.iter() {
        let stats = &info.frame_stats.total;
        if stats.drawcalls == 0 || stats.vertices <= 3 {
            continue;
        }
        if info.last_used_in_frame < frame_index {
            continue;
        }
        // Give new resources a frame to accumulate representative statistics.
        if frame_index <= info.first_used_in_frame + 1 {
            continue;
        }
        if info.desc.samples > 1 && !can_resolve_msaa {
            continue;
        }
        if !config.format_filter.accepts(info.desc.format) {
            continue;
        }
        if !heuristics::check_aspect_ratio(config, frame_size, info.desc.size) {
            continue;
        }

        match best {
            Some((_, best_info))
                if !heuristics::prefer_candidate(stats, &best_info.frame_stats.total) => {}
            _ => best = Some((resource, info)),
        }
    }
    best.map(|(resource, _)| resource)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::api::{ResourceDesc, ResourceUsage, TextureFormat};
    use crate::stats::DepthStencilFrameStats;
    use crate::math::Viewport;

    const FRAME: Extent2D = Extent2D::new(1920, 1080);

    fn publish(
        registry: &mut DepthStencilRegistry,
        resource: ResourceId,
        size: Extent2D,
        vertices: u64,
        drawcalls: u32,
        frame_index: u64,
    ) {
        let desc = ResourceDesc::texture_2d(
            size,
            TextureFormat::R24G8Typeless,
            ResourceUsage::DEPTH_STENCIL,
        );
        let mut stats = DepthStencilFrameStats::default();
        for _ in 0..drawcalls {
            stats.record_draw(vertices / u64::from(drawcalls), Viewport::default(), true);
        }
        registry.publish(resource, desc, stats, frame_index);
    }

    fn seasoned(registry: &mut DepthStencilRegistry, resource: ResourceId, vertices: u64) {
        // Publish across several frames so the candidate is not "too new".
        for frame in 1..=5 {
            publish(registry, resource, FRAME, vertices, 10, frame);
        }
    }

    #[test]
    fn the_heaviest_candidate_wins() {
        let mut registry = DepthStencilRegistry::default();
        seasoned(&mut registry, ResourceId(1), 10_000);
        seasoned(&mut registry, ResourceId(2), 500_000);
        seasoned(&mut registry, ResourceId(3), 40_000);

        let best = pick_best_candidate(
            &registry,
            &DepthConfig::default(),
            5,
            FRAME,
            true,
            None,
        );
        assert_eq!(best, Some(ResourceId(2)));
    }

    #[test]
    fn resources_unused_this_frame_are_skipped() {
        let mut registry = DepthStencilRegistry::default();
        seasoned(&mut registry, ResourceId(1), 500_000);

        let best = pick_best_candidate(&registry, &DepthConfig::default(), 6, FRAME, true, None);
        assert_eq!(best, None);
    }

    #[test]
    fn freshly_created_resources_are_skipped() {
        let mut registry = DepthStencilRegistry::default();
        publish(&mut registry, ResourceId(1), FRAME, 500_000, 10, 4);

        assert_eq!(
            pick_best_candidate(&registry, &DepthConfig::default(), 4, FRAME, true, None),
            None
        );
        publish(&mut registry, ResourceId(1), FRAME, 500_000, 10, 6);
        assert_eq!(
            pick_best_candidate(&registry, &DepthConfig::default(), 6, FRAME, true, None),
            Some(ResourceId(1))
        );
    }

    #[test]
    fn an_override_beats_the_ranking_while_it_exists() {
        let mut registry = DepthStencilRegistry::default();
        seasoned(&mut registry, ResourceId(1), 500_000);
        seasoned(&mut registry, ResourceId(2), 100);

        let best = pick_best_candidate(
            &registry,
            &DepthConfig::default(),
            5,
            FRAME,
            true,
            Some(ResourceId(2)),
        );
        assert_eq!(best, Some(ResourceId(2)));

        // A stale override falls back to the automatic ranking.
        let best = pick_best_candidate(
            &registry,
            &DepthConfig::default(),
            5,
            FRAME,
            true,
            Some(ResourceId(99)),
        );
        assert_eq!(best, Some(ResourceId(1)));
    }

    #[test]
    fn ranking_is_deterministic_for_a_fixed_registry() {
        let mut registry = DepthStencilRegistry::default();
        seasoned(&mut registry, ResourceId(1), 10_000);
        seasoned(&mut registry, ResourceId(2), 80_000);
        seasoned(&mut registry, ResourceId(3), 80_001);

        let config = DepthConfig::default();
        let first = pick_best_candidate(&registry, &config, 5, FRAME, true, None);
        let second = pick_best_candidate(&registry, &config, 5, FRAME, true, None);
        assert_eq!(first, second);
        assert_eq!(first, Some(ResourceId(3)));
    }

    #[test]
    fn aspect_mismatches_are_filtered_out() {
        let mut registry = DepthStencilRegistry::default();
        for frame in 1..=5 {
            publish(
                &mut registry,
                ResourceId(1),
                Extent2D::new(2048, 2048),
                900_000,
                10,
                frame,
            );
        }
        seasoned(&mut registry, ResourceId(2), 50_000);

        let best = pick_best_candidate(&registry, &DepthConfig::default(), 5, FRAME, true, None);
        assert_eq!(best, Some(ResourceId(2)));
    }
}
