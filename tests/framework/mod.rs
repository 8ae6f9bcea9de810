#![allow(dead_code)]

use std::sync::Once;

use anyhow::Result;
use deimos::prelude::*;

static INIT_LOGGER: Once = Once::new();

/// Initialize logging once for the whole test binary. Set `RUST_LOG` to see output.
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        let _ = pretty_env_logger::try_init();
    });
}

pub const SURFACE_WIDTH: u32 = 800;
pub const SURFACE_HEIGHT: u32 = 600;

/// Creates an empty graph on a headless backend, ready for automated tests
pub fn make_graph(frames_in_flight: usize) -> RenderGraph<HeadlessBackend> {
    make_graph_with_settings(frames_in_flight, |settings| settings)
}

/// Create an empty graph on a headless backend and customize its settings
pub fn make_graph_with_settings<F: FnOnce(GraphSettingsBuilder) -> GraphSettingsBuilder>(
    frames_in_flight: usize,
    callback: F,
) -> RenderGraph<HeadlessBackend> {
    init_logger();
    let settings = callback(GraphSettingsBuilder::new().name("deimos test graph").debug_labels(false)).build();
    RenderGraph::new(HeadlessBackend::new(frames_in_flight, SURFACE_WIDTH, SURFACE_HEIGHT), settings)
}

pub fn color_texture() -> TextureDesc {
    TextureDesc::new(vk::Format::R8G8B8A8_UNORM, ImageExtent::surface())
}

pub fn fixed_buffer(size: u64) -> BufferDesc {
    BufferDesc::new(BufferSize::Absolute(size))
}

/// All image barriers recorded for a resource.
pub fn image_barriers_for(commands: &CommandList, resource: ResourceId) -> Vec<deimos::frame::command::ImageBarrier> {
    commands
        .image_barriers()
        .filter(|barrier| barrier.resource == Some(resource))
        .copied()
        .collect()
}

/// All buffer barriers recorded for a resource.
pub fn buffer_barriers_for(commands: &CommandList, resource: ResourceId) -> Vec<deimos::frame::command::BufferBarrier> {
    commands
        .buffer_barriers()
        .filter(|barrier| barrier.resource == resource)
        .copied()
        .collect()
}

/// Record a number of frames, cycling through the frame slots.
pub fn record_frames(graph: &mut RenderGraph<HeadlessBackend>, count: usize) -> Result<Vec<CommandList>> {
    let frames_in_flight = graph.frames_in_flight();
    (0..count)
        .map(|frame| graph.record_frame(frame % frames_in_flight, 0))
        .collect()
}
