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

//! Implements the heuristics that rank depth-stencil candidates.
//!
//! Two questions are answered here: does a candidate's size plausibly belong
//! to the scene rendered into the presented frame, and which of two
//! candidates carried the larger rendering workload.

use crate::config::{AspectHeuristic, DepthConfig};
use crate::math::Extent2D;
use crate::stats::DrawStats;

/// The maximum allowed difference between the candidate's and the frame's
/// aspect ratio.
const ASPECT_RATIO_SLACK: f32 = 0.1;

/// The size ratio range accepted as "similar" to the frame size.
const SIZE_RATIO_RANGE: (f32, f32) = (0.5, 1.85);

/// The tolerance around integer size multiples accepted by
/// [`AspectHeuristic::Multiple`].
const MULTIPLE_FRACT_SLACK: f32 = 0.02;

/// Whether a candidate's dimensions are plausible for the presented frame,
/// according to the configured heuristic.
pub fn check_aspect_ratio(config: &DepthConfig, frame_size: Extent2D, size: Extent2D) -> bool {
    if size.width == 0 || size.height == 0 {
        // Dimensions are unknown until the first draw reports them.
        return true;
    }

    match config.aspect_heuristic {
        AspectHeuristic::None => true,
        AspectHeuristic::Exact => size == frame_size,
        AspectHeuristic::Custom => {
            if config.custom_size.width == 0 || config.custom_size.height == 0 {
                size == frame_size
            } else {
                size == config.custom_size
            }
        }
        mode @ (AspectHeuristic::Similar | AspectHeuristic::Multiple) => {
            let width_ratio = frame_size.width as f32 / size.width as f32;
            let height_ratio = frame_size.height as f32 / size.height as f32;
            let aspect_delta = frame_size.width as f32 / frame_size.height as f32
                - size.width as f32 / size.height as f32;
            if aspect_delta.abs() > ASPECT_RATIO_SLACK {
                return false;
            }

            let (low, high) = SIZE_RATIO_RANGE;
            let similar = (low..=high).contains(&width_ratio)
                && (low..=high).contains(&height_ratio);
            let multiple = mode == AspectHeuristic::Multiple
                && width_ratio.fract() <= MULTIPLE_FRACT_SLACK
                && height_ratio.fract() <= MULTIPLE_FRACT_SLACK;
            similar || multiple
        }
    }
}

/// Whether `candidate` represents a larger rendering workload than `best`.
///
/// Vertex counts are the primary signal. When a third or more of the
/// candidate's draw calls were indirect, its vertex counts are unreliable and
/// draw-call counts are compared instead.
pub fn prefer_candidate(candidate: &DrawStats, best: &DrawStats) -> bool {
    if candidate.drawcalls_indirect < candidate.drawcalls / 3 {
        candidate.vertices > best.vertices
    } else {
        candidate.drawcalls > best.drawcalls
    }
}
