//! Composite of the present resource into the output surface, recorded after the last pass of a frame.

use anyhow::Result;
use ash::vk;

use crate::backend::Backend;
use crate::frame::command::{Command, CommandList, ImageBarrier};
use crate::frame::driver::RenderGraph;
use crate::graph::access::{is_hazard, AccessState, PipelineStage, PRESENT_SOURCE};
use crate::graph::hazard::{resolve_first_touch, BarrierPlan};
use crate::graph::resource::{ResourceId, ResourceType};

const SURFACE_BLIT_TARGET: AccessState = AccessState::new(
    PipelineStage::ALL_TRANSFER,
    vk::AccessFlags2::TRANSFER_WRITE,
    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
);

const SURFACE_PRESENT: AccessState =
    AccessState::new(PipelineStage::NONE, vk::AccessFlags2::NONE, vk::ImageLayout::PRESENT_SRC_KHR);

fn surface_barrier(image: vk::Image, src: AccessState, dst: AccessState) -> ImageBarrier {
    ImageBarrier {
        resource: None,
        image,
        src,
        dst,
        aspect: vk::ImageAspectFlags::COLOR,
        mip_levels: 1,
        layers: 1,
    }
}

/// Blit `resource` into output surface image `output_image_index`, with the transitions needed to present it.
/// Returns the state the present resource is left in.
pub(crate) fn composite<B: Backend>(
    graph: &RenderGraph<B>,
    plan: &BarrierPlan,
    resource: ResourceId,
    frame_index: usize,
    output_image_index: u32,
    commands: &mut CommandList,
) -> Result<AccessState> {
    let physical = graph.physical.get(resource)?;
    let source = match plan.final_touch(resource) {
        Some(touch) => is_hazard(ResourceType::Image, &touch.state, &PRESENT_SOURCE).then_some(touch.state),
        None => resolve_first_touch(
            ResourceType::Image,
            physical.is_multiplied(),
            &physical.last_observed(frame_index),
            &PRESENT_SOURCE,
        ),
    };
    let surface = graph.backend.surface_image(output_image_index)?;

    let labels = cfg!(feature = "debug-markers") && graph.settings.debug_labels;
    if labels {
        commands.push(Command::BeginLabel {
            name: String::from("present"),
            color: [1.0, 1.0, 1.0, 1.0],
        });
    }

    let mut images = Vec::with_capacity(2);
    if let Some(src) = source {
        images.push(RenderGraph::<B>::image_barrier(physical, resource, frame_index, src, PRESENT_SOURCE)?);
    }
    images.push(surface_barrier(surface.image, AccessState::UNDEFINED, SURFACE_BLIT_TARGET));
    commands.push(Command::PipelineBarrier {
        images,
        buffers: vec![],
    });

    let extent = physical.extent();
    commands.push(Command::Blit {
        src: physical
            .image(frame_index)
            .ok_or_else(|| crate::Error::UnknownResource(physical.name().to_owned()))?,
        src_extent: vk::Extent2D {
            width: extent.width,
            height: extent.height,
        },
        dst: surface.image,
        dst_extent: surface.extent,
        filter: graph.settings.present_filter,
    });
    commands.push(Command::PipelineBarrier {
        images: vec![surface_barrier(surface.image, SURFACE_BLIT_TARGET, SURFACE_PRESENT)],
        buffers: vec![],
    });

    if labels {
        commands.push(Command::EndLabel);
    }
    Ok(PRESENT_SOURCE)
}
