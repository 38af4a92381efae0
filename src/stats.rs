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

//! Defines the draw-call statistics gathered per depth-stencil resource.
//!
//! Statistics accumulate monotonically within a window: `total` over the
//! whole frame, `current` since the last clear. Every clear snapshots
//! `current` into the frame's clear history and resets it, so the two are
//! mutually exclusive in time.

use crate::math::Viewport;

/// Counters accumulated over a window of draw calls.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DrawStats {
    /// The number of vertices drawn (vertex or index count times instances).
    pub vertices: u64,
    /// The number of draw calls issued.
    pub drawcalls: u32,
    /// How many of those draw calls were indirect, with unknowable vertex
    /// counts.
    pub drawcalls_indirect: u32,
    /// The viewport bound at the most recent draw.
    pub last_viewport: Viewport,
}

impl DrawStats {
    /// Adds another window's counters onto this one. The viewport is not
    /// merged; windows recorded on different lists have no meaningful order.
    fn accumulate(&mut self, other: &DrawStats) {
        self.vertices += other.vertices;
        self.drawcalls += other.drawcalls;
        self.drawcalls_indirect += other.drawcalls_indirect;
    }
}

/// The kind of event that ended a draw window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearKind {
    /// An explicit clear of the depth-stencil view.
    ClearCall,
    /// A fullscreen draw used by the engine in place of a clear.
    FullscreenDraw,
    /// The depth-stencil view was unbound; on aliasing backends its contents
    /// may be gone afterwards.
    UnbindView,
}

/// An immutable record of one clear event within a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearStats {
    /// The draw statistics of the window the clear ended.
    pub stats: DrawStats,
    /// What kind of event ended the window.
    pub kind: ClearKind,
    /// Whether the depth contents were copied to a backup before the clear.
    pub copied: bool,
}

/// Per-frame statistics for a single depth-stencil resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DepthStencilFrameStats {
    /// Counters over the lifetime of the frame.
    pub total: DrawStats,
    /// Counters since the last clear operation.
    pub current: DrawStats,
    /// The ordered clear history of the frame.
    pub clears: Vec<ClearStats>,
    /// Whether a backup copy was made at any point during the frame.
    pub copied_during_frame: bool,
}

impl DepthStencilFrameStats {
    /// Records a direct draw call.
    pub fn record_draw(&mut self, vertices: u64, viewport: Viewport, update_viewport: bool) {
        self.total.vertices += vertices;
        self.total.drawcalls += 1;
        self.current.vertices += vertices;
        self.current.drawcalls += 1;
        if update_viewport {
            self.current.last_viewport = viewport;
        }
    }

    /// Records indirect draw calls, whose vertex counts are unknown.
    pub fn record_indirect(&mut self, draw_count: u32, viewport: Viewport) {
        self.total.drawcalls += draw_count;
        self.total.drawcalls_indirect += draw_count;
        self.current.drawcalls += draw_count;
        self.current.drawcalls_indirect += draw_count;
        self.current.last_viewport = viewport;
    }

    /// Folds the counters of another recording context into this one.
    pub fn merge(&mut self, other: &DepthStencilFrameStats) {
        self.total.accumulate(&other.total);
        self.current.accumulate(&other.current);
        self.clears.extend_from_slice(&other.clears);
        self.copied_during_frame |= other.copied_during_frame;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_accumulate_into_total_and_current() {
        let mut stats = DepthStencilFrameStats::default();
        let viewport = Viewport::with_size(1920.0, 1080.0);

        stats.record_draw(300, viewport, true);
        stats.record_draw(600, viewport, true);

        assert_eq!(stats.total.vertices, 900);
        assert_eq!(stats.total.drawcalls, 2);
        assert_eq!(stats.current.vertices, 900);
        assert_eq!(stats.current.last_viewport, viewport);
    }

    #[test]
    fn fullscreen_draw_does_not_update_viewport() {
        let mut stats = DepthStencilFrameStats::default();
        stats.record_draw(30_000, Viewport::with_size(1920.0, 1080.0), true);
        stats.record_draw(6, Viewport::with_size(64.0, 64.0), false);

        assert_eq!(stats.current.last_viewport.width, 1920.0);
    }

    #[test]
    fn merge_sums_counters_and_appends_clears() {
        let mut a = DepthStencilFrameStats::default();
        a.record_draw(100, Viewport::default(), true);

        let mut b = DepthStencilFrameStats::default();
        b.record_indirect(4, Viewport::default());
        b.clears.push(ClearStats {
            stats: b.current,
            kind: ClearKind::ClearCall,
            copied: true,
        });
        b.copied_during_frame = true;

        a.merge(&b);

        assert_eq!(a.total.vertices, 100);
        assert_eq!(a.total.drawcalls, 5);
        assert_eq!(a.total.drawcalls_indirect, 4);
        assert_eq!(a.clears.len(), 1);
        assert!(a.copied_during_frame);
    }
}
