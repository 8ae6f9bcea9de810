//! The device abstraction the render graph runs on.
//!
//! The graph never talks to Vulkan directly. Everything that creates, destroys or writes a device object goes
//! through the [`Backend`] trait, so the whole compiler can be driven without a GPU using the
//! [`HeadlessBackend`](headless::HeadlessBackend). The [`VulkanBackend`](vulkan::VulkanBackend) implements it on top
//! of an [`ash::Device`] and [`gpu_allocator`].

use anyhow::Result;
use ash::vk;

pub use memory_type::MemoryType;

use crate::descriptor::descriptor_pool::BindingPoolSize;
use crate::descriptor::layout::BindingSetLayout;
use crate::descriptor::write::ResolvedWrite;

pub mod headless;
pub mod memory_type;
pub mod vulkan;

/// Parameters for creating an image.
#[derive(Debug, Clone)]
pub struct ImageCreateInfo {
    /// Debug name
    pub name: String,
    /// Pixel format
    pub format: vk::Format,
    /// Size of the image
    pub extent: vk::Extent3D,
    /// Number of mip levels
    pub mip_levels: u32,
    /// Number of array layers
    pub layers: u32,
    /// MSAA samples
    pub samples: vk::SampleCountFlags,
    /// Usage flags, inferred from the graph
    pub usage: vk::ImageUsageFlags,
}

/// Parameters for creating an image view.
#[derive(Debug, Clone)]
pub struct ImageViewCreateInfo {
    /// Debug name, `pass::resource`
    pub name: String,
    /// The viewed image
    pub image: vk::Image,
    /// View format
    pub format: vk::Format,
    /// Viewed aspect
    pub aspect: vk::ImageAspectFlags,
    /// First viewed mip level
    pub base_mip_level: u32,
    /// Number of viewed mip levels
    pub mip_levels: u32,
    /// Number of viewed array layers, starting at zero
    pub layers: u32,
}

/// Parameters for creating a buffer.
#[derive(Debug, Clone)]
pub struct BufferCreateInfo {
    /// Debug name
    pub name: String,
    /// Size in bytes
    pub size: vk::DeviceSize,
    /// Usage flags, inferred from the graph
    pub usage: vk::BufferUsageFlags,
    /// Where the memory lives
    pub memory: MemoryType,
}

/// Description of one framebuffer attachment.
#[derive(Debug, Copy, Clone)]
pub struct AttachmentInfo {
    /// View bound to the attachment
    pub view: vk::ImageView,
    /// Attachment format
    pub format: vk::Format,
    /// MSAA samples
    pub samples: vk::SampleCountFlags,
    /// Load operation
    pub load_op: vk::AttachmentLoadOp,
    /// Store operation
    pub store_op: vk::AttachmentStoreOp,
    /// Layout of the attachment during the render pass. The attachment is in this layout before and after the
    /// pass as well, the graph inserts all transitions itself.
    pub layout: vk::ImageLayout,
}

/// Parameters for creating a framebuffer.
#[derive(Debug, Clone)]
pub struct FramebufferCreateInfo {
    /// Debug name
    pub name: String,
    /// The attachments, in order
    pub attachments: Vec<AttachmentInfo>,
    /// Width of the framebuffer
    pub width: u32,
    /// Height of the framebuffer
    pub height: u32,
    /// Number of layers
    pub layers: u32,
}

/// An image of the output surface, as handed out by the backend.
#[derive(Debug, Copy, Clone)]
pub struct SurfaceImage {
    /// Image handle
    pub image: vk::Image,
    /// Size of the image
    pub extent: vk::Extent2D,
}

/// Device operations the render graph depends on.
///
/// All methods are synchronous. [`Backend::wait_for_frame()`] is the only method allowed to block.
pub trait Backend {
    /// Number of frames that may be in flight at once. Constant for the lifetime of the backend.
    fn frames_in_flight(&self) -> usize;

    /// Current size of the output surface.
    fn surface_extent(&self) -> vk::Extent2D;

    /// Get the output surface image with this index.
    /// # Errors
    /// * Fails if there is no such image.
    fn surface_image(&self, index: u32) -> Result<SurfaceImage>;

    /// Create an image and bind memory to it.
    fn create_image(&mut self, info: &ImageCreateInfo) -> Result<vk::Image>;

    /// Destroy an image and free its memory.
    fn destroy_image(&mut self, image: vk::Image);

    /// Create an image view.
    fn create_image_view(&mut self, info: &ImageViewCreateInfo) -> Result<vk::ImageView>;

    /// Destroy an image view.
    fn destroy_image_view(&mut self, view: vk::ImageView);

    /// Create a buffer and bind memory to it.
    fn create_buffer(&mut self, info: &BufferCreateInfo) -> Result<vk::Buffer>;

    /// Destroy a buffer and free its memory.
    fn destroy_buffer(&mut self, buffer: vk::Buffer);

    /// Create a framebuffer, together with a compatible render pass if needed.
    fn create_framebuffer(&mut self, info: &FramebufferCreateInfo) -> Result<vk::Framebuffer>;

    /// Destroy a framebuffer.
    fn destroy_framebuffer(&mut self, framebuffer: vk::Framebuffer);

    /// Create a binding set layout.
    fn create_binding_set_layout(&mut self, layout: &BindingSetLayout) -> Result<vk::DescriptorSetLayout>;

    /// Destroy a binding set layout.
    fn destroy_binding_set_layout(&mut self, layout: vk::DescriptorSetLayout);

    /// Create a pool to allocate binding sets from.
    fn create_binding_set_pool(&mut self, size: &BindingPoolSize) -> Result<vk::DescriptorPool>;

    /// Destroy a binding set pool, together with all sets allocated from it.
    fn destroy_binding_set_pool(&mut self, pool: vk::DescriptorPool);

    /// Allocate one binding set per entry in `layouts` from `pool`.
    fn allocate_binding_sets(
        &mut self,
        pool: vk::DescriptorPool,
        layouts: &[vk::DescriptorSetLayout],
    ) -> Result<Vec<vk::DescriptorSet>>;

    /// Apply writes to binding sets.
    fn write_binding_sets(&mut self, writes: &[ResolvedWrite]);

    /// Block until the GPU finished the previous use of this frame slot.
    fn wait_for_frame(&mut self, frame_index: usize) -> Result<()>;

    /// Block until no frame slot is in use by the GPU anymore. Unlike [`Backend::wait_for_frame()`], this does not
    /// claim any slot, every slot can still be waited on afterwards.
    fn wait_idle(&mut self) -> Result<()>;
}
