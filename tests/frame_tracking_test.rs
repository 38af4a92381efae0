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

mod common;

use bathys::context::DeviceContext;
use bathys::graphics::api::{CommandQueueId, DeviceApi};
use bathys::math::Viewport;
use bathys::tracking::StateTracking;
use common::{depth_stencil_desc, render_frame, MockCommandList, MockDevice, QUEUE};
use std::sync::Arc;

#[test]
fn presents_without_real_geometry_do_not_advance_the_frame() {
    // --- 1. ARRANGE ---
    let device = Arc::new(MockDevice::new(DeviceApi::D3d11));
    let ctx = DeviceContext::new(device.clone());
    ctx.register_queue(QUEUE);

    let mut desc = depth_stencil_desc();
    ctx.on_create_resource(&mut desc);
    let resource = device.add_resource(desc);
    let view = device.add_view(resource);

    let mut state = StateTracking::new_list();
    let mut cmd = MockCommandList::default();

    render_frame(&ctx, &mut state, &mut cmd, view, 50, 1000);
    assert_eq!(ctx.frame_index(), 1);

    // --- 2. ACT ---
    // A loading screen: a handful of quads, presented over and over.
    for _ in 0..10 {
        render_frame(&ctx, &mut state, &mut cmd, view, 8, 100);
    }

    // --- 3. ASSERT ---
    assert_eq!(
        ctx.frame_index(),
        1,
        "presents with at most eight draw calls must not age the registry"
    );

    // Real rendering resumes and the frame counter moves again.
    render_frame(&ctx, &mut state, &mut cmd, view, 9, 1000);
    assert_eq!(ctx.frame_index(), 2);
}

#[test]
fn presents_with_no_draws_at_all_are_ignored() {
    // --- 1. ARRANGE ---
    let device = Arc::new(MockDevice::new(DeviceApi::D3d11));
    let ctx = DeviceContext::new(device.clone());
    ctx.register_queue(QUEUE);

    // --- 2. ACT ---
    for _ in 0..5 {
        ctx.on_present();
    }

    // --- 3. ASSERT ---
    assert_eq!(ctx.frame_index(), 0);
}

#[test]
fn draws_on_multiple_queues_are_merged_at_present() {
    // --- 1. ARRANGE ---
    let device = Arc::new(MockDevice::new(DeviceApi::D3d12));
    let ctx = DeviceContext::new(device.clone());
    let graphics_queue = CommandQueueId(1);
    let compute_queue = CommandQueueId(2);
    ctx.register_queue(graphics_queue);
    ctx.register_queue(compute_queue);

    let mut desc = depth_stencil_desc();
    ctx.on_create_resource(&mut desc);
    let resource = device.add_resource(desc);
    let view = device.add_view(resource);

    let mut cmd = MockCommandList::default();

    // --- 2. ACT ---
    // Two command lists drawing to the same target, executed on different
    // queues within one frame.
    for _ in 0..3 {
        for queue in [graphics_queue, compute_queue] {
            let mut state = StateTracking::new_list();
            ctx.on_bind_viewport(&mut state, Viewport::with_size(1920.0, 1080.0));
            ctx.on_bind_depth_stencil(&mut cmd, &mut state, Some(view));
            for _ in 0..30 {
                ctx.on_draw(&mut cmd, &mut state, 1000, 1);
            }
            ctx.on_execute_command_list(queue, &state);
        }
        ctx.on_present();
    }

    // --- 3. ASSERT ---
    let candidates = ctx.candidates();
    let (_, info) = candidates
        .iter()
        .find(|(candidate, _)| *candidate == resource)
        .expect("the target should be a known candidate");
    assert_eq!(info.frame_stats.total.drawcalls, 60);
    assert_eq!(info.frame_stats.total.vertices, 60_000);
}

#[test]
fn empty_secondary_lists_count_as_an_indirect_draw() {
    // --- 1. ARRANGE ---
    // A primary command list with a depth-stencil bound executes a secondary
    // list that recorded nothing the tracker could see.
    let device = Arc::new(MockDevice::new(DeviceApi::Vulkan));
    let ctx = DeviceContext::new(device.clone());

    let mut desc = depth_stencil_desc();
    ctx.on_create_resource(&mut desc);
    let resource = device.add_resource(desc);
    let view = device.add_view(resource);

    let mut cmd = MockCommandList::default();
    let mut primary = StateTracking::new_list();
    ctx.on_bind_depth_stencil(&mut cmd, &mut primary, Some(view));
    let secondary = StateTracking::new_list();

    // --- 2. ACT ---
    ctx.on_execute_secondary(&mut primary, &secondary);

    // --- 3. ASSERT ---
    let counters = primary
        .counters
        .get(&resource)
        .expect("the bound target should have picked up the secondary's work");
    assert_eq!(counters.total.drawcalls, 1);
    assert_eq!(counters.total.drawcalls_indirect, 1);
}

#[test]
fn secondaries_with_their_own_binding_are_merged_without_a_stand_in_draw() {
    // --- 1. ARRANGE ---
    // The primary has target A bound; the secondary bound target B itself but
    // recorded no draws. B's binding must carry over, and A must not be
    // credited with work that never happened.
    let device = Arc::new(MockDevice::new(DeviceApi::Vulkan));
    let ctx = DeviceContext::new(device.clone());

    let mut desc = depth_stencil_desc();
    ctx.on_create_resource(&mut desc);
    let first = device.add_resource(desc);
    let first_view = device.add_view(first);
    let second = device.add_resource(desc);
    let second_view = device.add_view(second);

    let mut cmd = MockCommandList::default();
    let mut primary = StateTracking::new_list();
    ctx.on_bind_depth_stencil(&mut cmd, &mut primary, Some(first_view));
    let mut secondary = StateTracking::new_list();
    ctx.on_bind_depth_stencil(&mut cmd, &mut secondary, Some(second_view));

    // --- 2. ACT ---
    ctx.on_execute_secondary(&mut primary, &secondary);

    // --- 3. ASSERT ---
    assert_eq!(
        primary.current_depth_stencil,
        Some(second),
        "the primary inherits the secondary's own binding"
    );
    assert!(
        primary.counters.is_empty(),
        "no phantom draw may be attributed to the previous binding"
    );
}

#[test]
fn secondary_lists_with_their_own_state_are_merged() {
    // --- 1. ARRANGE ---
    let device = Arc::new(MockDevice::new(DeviceApi::Vulkan));
    let ctx = DeviceContext::new(device.clone());

    let mut desc = depth_stencil_desc();
    ctx.on_create_resource(&mut desc);
    let resource = device.add_resource(desc);
    let view = device.add_view(resource);

    let mut cmd = MockCommandList::default();
    let mut primary = StateTracking::new_list();
    let mut secondary = StateTracking::new_list();
    ctx.on_bind_depth_stencil(&mut cmd, &mut secondary, Some(view));
    for _ in 0..5 {
        ctx.on_draw(&mut cmd, &mut secondary, 300, 1);
    }

    // --- 2. ACT ---
    ctx.on_execute_secondary(&mut primary, &secondary);

    // --- 3. ASSERT ---
    assert_eq!(
        primary.current_depth_stencil,
        Some(resource),
        "the primary inherits the secondary's binding"
    );
    let counters = primary.counters.get(&resource).unwrap();
    assert_eq!(counters.total.drawcalls, 5);
    assert_eq!(counters.total.vertices, 1500);
}

#[test]
fn a_destroyed_selection_clears_itself() {
    // --- 1. ARRANGE ---
    let device = Arc::new(MockDevice::new(DeviceApi::D3d11));
    let ctx = DeviceContext::new(device.clone());
    ctx.register_queue(QUEUE);

    let mut desc = depth_stencil_desc();
    ctx.on_create_resource(&mut desc);
    let resource = device.add_resource(desc);
    let view = device.add_view(resource);

    let mut state = StateTracking::new_list();
    let mut cmd = MockCommandList::default();
    for _ in 0..3 {
        render_frame(&ctx, &mut state, &mut cmd, view, 50, 1000);
    }
    let selection = ctx.begin_effects(&mut cmd, common::FRAME_SIZE).unwrap();
    assert_eq!(selection.selected_depth_stencil, Some(resource));
    ctx.finish_effects(&mut cmd);

    // --- 2. ACT ---
    device.remove_resource(resource);
    ctx.on_destroy_resource(resource);

    // --- 3. ASSERT ---
    let selection = ctx.selection();
    assert_eq!(selection.selected_depth_stencil, None);
    assert_eq!(selection.selected_view, None);
    assert!(!ctx
        .candidates()
        .iter()
        .any(|(candidate, _)| *candidate == resource));
}
