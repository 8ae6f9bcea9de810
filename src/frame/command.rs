//! The recorded output of a frame.
//!
//! [`RenderGraph::record_frame()`](crate::RenderGraph::record_frame) does not write into a live command buffer.
//! It produces a [`CommandList`], plain data that a backend replays (see
//! [`VulkanBackend::replay()`](crate::VulkanBackend::replay)) and that tests can inspect.

use ash::vk;

use crate::graph::access::AccessState;
use crate::graph::pass::{ClearValue, PassId};
use crate::graph::resource::ResourceId;

/// Image memory barrier, including a layout transition.
#[derive(Debug, Copy, Clone)]
pub struct ImageBarrier {
    /// Graph resource, or `None` for the output surface image.
    pub resource: Option<ResourceId>,
    /// Physical image
    pub image: vk::Image,
    /// Source scope and old layout
    pub src: AccessState,
    /// Destination scope and new layout
    pub dst: AccessState,
    /// Aspect of the subresource range
    pub aspect: vk::ImageAspectFlags,
    /// Number of mip levels covered, starting at zero
    pub mip_levels: u32,
    /// Number of array layers covered, starting at zero
    pub layers: u32,
}

impl ImageBarrier {
    /// Whether this barrier carries an execution dependency, as opposed to only a layout transition.
    pub fn is_execution_barrier(&self) -> bool {
        !self.src.stage.is_empty()
    }

    /// Whether the barrier changes the image layout.
    pub fn is_layout_transition(&self) -> bool {
        self.src.layout != self.dst.layout
    }

    /// Full subresource range covered by this barrier.
    pub fn subresource_range(&self) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask: self.aspect,
            base_mip_level: 0,
            level_count: self.mip_levels,
            base_array_layer: 0,
            layer_count: self.layers,
        }
    }
}

/// Buffer memory barrier.
#[derive(Debug, Copy, Clone)]
pub struct BufferBarrier {
    /// Graph resource
    pub resource: ResourceId,
    /// Physical buffer
    pub buffer: vk::Buffer,
    /// Source scope
    pub src: AccessState,
    /// Destination scope
    pub dst: AccessState,
}

/// One render target bound in a render pass.
#[derive(Debug, Copy, Clone)]
pub struct RenderTargetInfo {
    /// Graph resource
    pub resource: ResourceId,
    /// View the pass renders into
    pub view: vk::ImageView,
    /// Layout during the render pass
    pub layout: vk::ImageLayout,
    /// Load operation
    pub load_op: vk::AttachmentLoadOp,
    /// Store operation
    pub store_op: vk::AttachmentStoreOp,
    /// Clear value, if the target is cleared
    pub clear: Option<ClearValue>,
}

/// A single recorded command.
#[derive(Debug, Clone)]
pub enum Command {
    /// All barriers of a pass, batched into one pipeline barrier.
    PipelineBarrier {
        /// Image barriers
        images: Vec<ImageBarrier>,
        /// Buffer barriers
        buffers: Vec<BufferBarrier>,
    },
    /// Start of a debug label region.
    BeginLabel {
        /// Label name
        name: String,
        /// Label color
        color: [f32; 4],
    },
    /// End of the innermost debug label region.
    EndLabel,
    /// Bind a binding set.
    BindBindingSet {
        /// Pipeline bind point
        bind_point: vk::PipelineBindPoint,
        /// Pipeline layout used for binding
        layout: vk::PipelineLayout,
        /// Set index
        index: u32,
        /// The set to bind
        set: vk::DescriptorSet,
    },
    /// Regenerate all mip levels of an image from level zero. The image is expected in
    /// [`vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL`] and is left in that layout.
    GenerateMipmaps {
        /// Graph resource
        resource: ResourceId,
        /// Physical image
        image: vk::Image,
        /// Size of level zero
        extent: vk::Extent3D,
        /// Number of mip levels
        mip_levels: u32,
        /// Number of array layers
        layers: u32,
        /// Image aspect
        aspect: vk::ImageAspectFlags,
    },
    /// Begin a render pass.
    BeginRenderPass {
        /// The pass being recorded
        pass: PassId,
        /// Framebuffer holding the render targets
        framebuffer: vk::Framebuffer,
        /// Render area
        extent: vk::Extent2D,
        /// The render targets, in attachment order
        targets: Vec<RenderTargetInfo>,
    },
    /// End the current render pass.
    EndRenderPass,
    /// Bind a pipeline.
    BindPipeline {
        /// Pipeline bind point
        bind_point: vk::PipelineBindPoint,
        /// The pipeline
        pipeline: vk::Pipeline,
    },
    /// Non-indexed draw.
    Draw {
        /// Number of vertices
        vertex_count: u32,
        /// Number of instances
        instance_count: u32,
        /// First vertex
        first_vertex: u32,
        /// First instance
        first_instance: u32,
    },
    /// Compute dispatch.
    Dispatch {
        /// Workgroups in x
        x: u32,
        /// Workgroups in y
        y: u32,
        /// Workgroups in z
        z: u32,
    },
    /// Blit one image into another, used for the present composite.
    Blit {
        /// Source image, in [`vk::ImageLayout::TRANSFER_SRC_OPTIMAL`]
        src: vk::Image,
        /// Size of the source image
        src_extent: vk::Extent2D,
        /// Destination image, in [`vk::ImageLayout::TRANSFER_DST_OPTIMAL`]
        dst: vk::Image,
        /// Size of the destination image
        dst_extent: vk::Extent2D,
        /// Filter to use for scaling
        filter: vk::Filter,
    },
}

/// Commands recorded for one frame, in execution order.
#[derive(Debug, Clone, Default)]
pub struct CommandList {
    frame_index: usize,
    commands: Vec<Command>,
}

impl CommandList {
    /// Create an empty command list for a frame slot.
    pub fn new(frame_index: usize) -> Self {
        Self {
            frame_index,
            commands: vec![],
        }
    }

    /// Frame slot this list was recorded for.
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Append a command.
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// All commands
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Iterate over the commands
    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }

    /// Number of commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// All image barriers in this list, in order.
    pub fn image_barriers(&self) -> impl Iterator<Item = &ImageBarrier> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                Command::PipelineBarrier {
                    images,
                    ..
                } => Some(images),
                _ => None,
            })
            .flatten()
    }

    /// All buffer barriers in this list, in order.
    pub fn buffer_barriers(&self) -> impl Iterator<Item = &BufferBarrier> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                Command::PipelineBarrier {
                    buffers,
                    ..
                } => Some(buffers),
                _ => None,
            })
            .flatten()
    }
}

impl<'a> IntoIterator for &'a CommandList {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}
