//! The [`Backend`] implementation on top of a Vulkan device.
//!
//! Images and buffers get their memory from [`gpu_allocator`]. Framebuffers need a render pass, which is derived
//! from the attachment descriptions and cached, so passes with compatible targets share one. Every frame in flight
//! has a fence, which the application signals when submitting the frame. [`Backend::wait_for_frame()`] waits on it.
//!
//! Recorded frames are turned into Vulkan commands by [`VulkanBackend::replay()`].

use std::collections::HashMap;
use std::ffi::CString;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use ash::vk;
use ash::vk::Handle;
use gpu_allocator::vulkan as vk_alloc;
use gpu_allocator::vulkan::AllocationScheme;

use crate::backend::{
    AttachmentInfo, Backend, BufferCreateInfo, FramebufferCreateInfo, ImageCreateInfo, ImageViewCreateInfo,
    SurfaceImage,
};
use crate::descriptor::descriptor_pool::BindingPoolSize;
use crate::descriptor::layout::BindingSetLayout;
use crate::descriptor::write::{Descriptor, ResolvedWrite};
use crate::frame::command::{Command, CommandList, ImageBarrier};
use crate::util::to_vk::IntoVulkanType;
use crate::Error;

/// Key of the render pass cache.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct AttachmentKey {
    format: vk::Format,
    samples: vk::SampleCountFlags,
    load_op: vk::AttachmentLoadOp,
    store_op: vk::AttachmentStoreOp,
    layout: vk::ImageLayout,
}

impl From<&AttachmentInfo> for AttachmentKey {
    fn from(info: &AttachmentInfo) -> Self {
        Self {
            format: info.format,
            samples: info.samples,
            load_op: info.load_op,
            store_op: info.store_op,
            layout: info.layout,
        }
    }
}

fn is_depth_layout(layout: vk::ImageLayout) -> bool {
    matches!(
        layout,
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
            | vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL
            | vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL
    )
}

/// A [`Backend`] that creates real Vulkan objects.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct VulkanBackend {
    #[derivative(Debug = "ignore")]
    device: ash::Device,
    #[derivative(Debug = "ignore")]
    allocator: Arc<Mutex<vk_alloc::Allocator>>,
    #[derivative(Debug = "ignore")]
    debug_utils: Option<ash::extensions::ext::DebugUtils>,
    frames_in_flight: usize,
    fences: Vec<vk::Fence>,
    surface_images: Vec<vk::Image>,
    surface_extent: vk::Extent2D,
    #[derivative(Debug = "ignore")]
    image_memory: HashMap<vk::Image, vk_alloc::Allocation>,
    #[derivative(Debug = "ignore")]
    buffer_memory: HashMap<vk::Buffer, vk_alloc::Allocation>,
    render_passes: HashMap<Vec<AttachmentKey>, vk::RenderPass>,
    framebuffer_passes: HashMap<vk::Framebuffer, vk::RenderPass>,
}

impl VulkanBackend {
    /// Create a backend on an existing device. The device must have `synchronization2` enabled.
    /// If `debug_utils` is given, objects get debug names and passes can be wrapped in debug labels.
    pub fn new(
        instance: &ash::Instance,
        device: ash::Device,
        physical_device: vk::PhysicalDevice,
        frames_in_flight: usize,
        debug_utils: Option<ash::extensions::ext::DebugUtils>,
    ) -> Result<Self> {
        let allocator = vk_alloc::Allocator::new(&vk_alloc::AllocatorCreateDesc {
            instance: instance.clone(),
            device: device.clone(),
            physical_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
        })?;

        let fences = (0..frames_in_flight.max(1))
            .map(|_| {
                let info = vk::FenceCreateInfo {
                    s_type: vk::StructureType::FENCE_CREATE_INFO,
                    p_next: std::ptr::null(),
                    flags: vk::FenceCreateFlags::SIGNALED,
                };
                unsafe { device.create_fence(&info, None) }
            })
            .collect::<Result<Vec<_>, vk::Result>>()?;

        Ok(Self {
            device,
            allocator: Arc::new(Mutex::new(allocator)),
            debug_utils,
            frames_in_flight: frames_in_flight.max(1),
            fences,
            surface_images: vec![],
            surface_extent: vk::Extent2D::default(),
            image_memory: HashMap::new(),
            buffer_memory: HashMap::new(),
            render_passes: HashMap::new(),
            framebuffer_passes: HashMap::new(),
        })
    }

    /// Set the images and size of the output surface. Call this after (re)creating the swapchain.
    pub fn set_surface(&mut self, images: Vec<vk::Image>, extent: vk::Extent2D) {
        self.surface_images = images;
        self.surface_extent = extent;
    }

    /// The fence that must be signaled by the submission of a frame slot. Every frame returned by
    /// [`RenderGraph::record_frame()`](crate::RenderGraph::record_frame) must be submitted with it, otherwise later
    /// waits on the slot never return.
    pub fn frame_fence(&self, frame_index: usize) -> Result<vk::Fence> {
        self.fences
            .get(frame_index)
            .copied()
            .ok_or_else(|| Error::FrameIndexOutOfRange(frame_index).into())
    }

    /// The allocator used for all graph resources. Can be shared with the rest of the application.
    pub fn allocator(&self) -> Arc<Mutex<vk_alloc::Allocator>> {
        self.allocator.clone()
    }

    /// The device this backend creates objects on.
    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    fn set_name<H: Handle>(&self, handle: H, name: &str) {
        let Some(debug_utils) = &self.debug_utils else {
            return;
        };
        let Ok(object_name) = CString::new(name) else {
            return;
        };
        let info = vk::DebugUtilsObjectNameInfoEXT {
            s_type: vk::StructureType::DEBUG_UTILS_OBJECT_NAME_INFO_EXT,
            p_next: std::ptr::null(),
            object_type: H::TYPE,
            object_handle: handle.as_raw(),
            p_object_name: object_name.as_ptr(),
        };
        if let Err(err) = unsafe { debug_utils.set_debug_utils_object_name(self.device.handle(), &info) } {
            warn!("Failed to set debug name `{name}`: {err}");
        }
    }

    fn allocate(&self, name: &str, requirements: vk::MemoryRequirements, location: gpu_allocator::MemoryLocation, linear: bool) -> Result<vk_alloc::Allocation> {
        let mut allocator = self.allocator.lock().map_err(|_| Error::PoisonError)?;
        let allocation = allocator.allocate(&vk_alloc::AllocationCreateDesc {
            name,
            requirements,
            location,
            linear,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        })?;
        Ok(allocation)
    }

    fn free(&self, allocation: vk_alloc::Allocation) {
        match self.allocator.lock() {
            Ok(mut allocator) => {
                if let Err(err) = allocator.free(allocation) {
                    error!("Failed to free allocation: {err}");
                }
            }
            Err(_) => error!("Allocator mutex poisoned, leaking allocation"),
        }
    }

    fn render_pass(&mut self, attachments: &[AttachmentInfo]) -> Result<vk::RenderPass> {
        let key = attachments.iter().map(AttachmentKey::from).collect::<Vec<_>>();
        if let Some(pass) = self.render_passes.get(&key) {
            return Ok(*pass);
        }

        let descriptions = attachments
            .iter()
            .map(|attachment| vk::AttachmentDescription {
                flags: vk::AttachmentDescriptionFlags::empty(),
                format: attachment.format,
                samples: attachment.samples,
                load_op: attachment.load_op,
                store_op: attachment.store_op,
                stencil_load_op: attachment.load_op,
                stencil_store_op: attachment.store_op,
                initial_layout: attachment.layout,
                final_layout: attachment.layout,
            })
            .collect::<Vec<_>>();
        let color_refs = attachments
            .iter()
            .enumerate()
            .filter(|(_, attachment)| !is_depth_layout(attachment.layout))
            .map(|(index, attachment)| vk::AttachmentReference {
                attachment: index as u32,
                layout: attachment.layout,
            })
            .collect::<Vec<_>>();
        let depth_ref = attachments
            .iter()
            .enumerate()
            .find(|(_, attachment)| is_depth_layout(attachment.layout))
            .map(|(index, attachment)| vk::AttachmentReference {
                attachment: index as u32,
                layout: attachment.layout,
            });

        let subpass = vk::SubpassDescription {
            flags: vk::SubpassDescriptionFlags::empty(),
            pipeline_bind_point: vk::PipelineBindPoint::GRAPHICS,
            input_attachment_count: 0,
            p_input_attachments: std::ptr::null(),
            color_attachment_count: color_refs.len() as u32,
            p_color_attachments: color_refs.as_ptr(),
            p_resolve_attachments: std::ptr::null(),
            p_depth_stencil_attachment: match &depth_ref {
                Some(reference) => reference,
                None => std::ptr::null(),
            },
            preserve_attachment_count: 0,
            p_preserve_attachments: std::ptr::null(),
        };
        let info = vk::RenderPassCreateInfo {
            s_type: vk::StructureType::RENDER_PASS_CREATE_INFO,
            p_next: std::ptr::null(),
            flags: vk::RenderPassCreateFlags::empty(),
            attachment_count: descriptions.len() as u32,
            p_attachments: descriptions.as_ptr(),
            subpass_count: 1,
            p_subpasses: &subpass,
            dependency_count: 0,
            p_dependencies: std::ptr::null(),
        };
        let pass = unsafe { self.device.create_render_pass(&info, None)? };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkRenderPass {pass:?}");
        self.render_passes.insert(key, pass);
        Ok(pass)
    }

    fn image_barrier(barrier: &ImageBarrier) -> vk::ImageMemoryBarrier2 {
        vk::ImageMemoryBarrier2 {
            s_type: vk::StructureType::IMAGE_MEMORY_BARRIER_2,
            p_next: std::ptr::null(),
            src_stage_mask: barrier.src.stage,
            src_access_mask: barrier.src.src_access(),
            dst_stage_mask: barrier.dst.stage,
            dst_access_mask: barrier.dst.access,
            old_layout: barrier.src.layout,
            new_layout: barrier.dst.layout,
            src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
            dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
            image: barrier.image,
            subresource_range: barrier.subresource_range(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    unsafe fn mip_barrier(
        &self,
        cmd: vk::CommandBuffer,
        image: vk::Image,
        aspect: vk::ImageAspectFlags,
        level: u32,
        layers: u32,
        src: (vk::PipelineStageFlags2, vk::AccessFlags2, vk::ImageLayout),
        dst: (vk::PipelineStageFlags2, vk::AccessFlags2, vk::ImageLayout),
    ) {
        let barrier = vk::ImageMemoryBarrier2 {
            s_type: vk::StructureType::IMAGE_MEMORY_BARRIER_2,
            p_next: std::ptr::null(),
            src_stage_mask: src.0,
            src_access_mask: src.1,
            dst_stage_mask: dst.0,
            dst_access_mask: dst.1,
            old_layout: src.2,
            new_layout: dst.2,
            src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
            dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
            image,
            subresource_range: vk::ImageSubresourceRange {
                aspect_mask: aspect,
                base_mip_level: level,
                level_count: 1,
                base_array_layer: 0,
                layer_count: layers,
            },
        };
        let dependency = vk::DependencyInfo {
            s_type: vk::StructureType::DEPENDENCY_INFO,
            p_next: std::ptr::null(),
            dependency_flags: vk::DependencyFlags::BY_REGION,
            memory_barrier_count: 0,
            p_memory_barriers: std::ptr::null(),
            buffer_memory_barrier_count: 0,
            p_buffer_memory_barriers: std::ptr::null(),
            image_memory_barrier_count: 1,
            p_image_memory_barriers: &barrier,
        };
        self.device.cmd_pipeline_barrier2(cmd, &dependency);
    }

    #[allow(clippy::too_many_arguments)]
    unsafe fn generate_mipmaps(
        &self,
        cmd: vk::CommandBuffer,
        image: vk::Image,
        extent: vk::Extent3D,
        mip_levels: u32,
        layers: u32,
        aspect: vk::ImageAspectFlags,
    ) {
        let read = (
            vk::PipelineStageFlags2::ALL_COMMANDS,
            vk::AccessFlags2::SHADER_READ,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        );
        let transfer_src = (
            vk::PipelineStageFlags2::ALL_TRANSFER,
            vk::AccessFlags2::TRANSFER_READ,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        );
        let transfer_dst = (
            vk::PipelineStageFlags2::ALL_TRANSFER,
            vk::AccessFlags2::TRANSFER_WRITE,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        );

        let mip_size = |level: u32| vk::Offset3D {
            x: (extent.width >> level).max(1) as i32,
            y: (extent.height >> level).max(1) as i32,
            z: (extent.depth >> level).max(1) as i32,
        };

        self.mip_barrier(cmd, image, aspect, 0, layers, read, transfer_src);
        for level in 1..mip_levels {
            self.mip_barrier(cmd, image, aspect, level, layers, read, transfer_dst);
            let blit = vk::ImageBlit {
                src_subresource: vk::ImageSubresourceLayers {
                    aspect_mask: aspect,
                    mip_level: level - 1,
                    base_array_layer: 0,
                    layer_count: layers,
                },
                src_offsets: [vk::Offset3D::default(), mip_size(level - 1)],
                dst_subresource: vk::ImageSubresourceLayers {
                    aspect_mask: aspect,
                    mip_level: level,
                    base_array_layer: 0,
                    layer_count: layers,
                },
                dst_offsets: [vk::Offset3D::default(), mip_size(level)],
            };
            self.device.cmd_blit_image(
                cmd,
                image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                std::slice::from_ref(&blit),
                vk::Filter::LINEAR,
            );
            self.mip_barrier(cmd, image, aspect, level, layers, transfer_dst, transfer_src);
        }
        for level in 0..mip_levels {
            self.mip_barrier(cmd, image, aspect, level, layers, transfer_src, read);
        }
    }

    /// Record a frame into a command buffer.
    /// # Safety
    /// * `cmd` must be a valid command buffer in the recording state, allocated from the device of this backend.
    /// * All handles in `commands` must have been created by this backend or belong to its device.
    pub unsafe fn replay(&self, cmd: vk::CommandBuffer, commands: &CommandList) -> Result<()> {
        for command in commands {
            match command {
                Command::PipelineBarrier {
                    images,
                    buffers,
                } => {
                    let image_barriers = images.iter().map(Self::image_barrier).collect::<Vec<_>>();
                    let buffer_barriers = buffers
                        .iter()
                        .map(|barrier| vk::BufferMemoryBarrier2 {
                            s_type: vk::StructureType::BUFFER_MEMORY_BARRIER_2,
                            p_next: std::ptr::null(),
                            src_stage_mask: barrier.src.stage,
                            src_access_mask: barrier.src.src_access(),
                            dst_stage_mask: barrier.dst.stage,
                            dst_access_mask: barrier.dst.access,
                            src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                            dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                            buffer: barrier.buffer,
                            offset: 0,
                            size: vk::WHOLE_SIZE,
                        })
                        .collect::<Vec<_>>();
                    let dependency = vk::DependencyInfo {
                        s_type: vk::StructureType::DEPENDENCY_INFO,
                        p_next: std::ptr::null(),
                        dependency_flags: vk::DependencyFlags::BY_REGION,
                        memory_barrier_count: 0,
                        p_memory_barriers: std::ptr::null(),
                        buffer_memory_barrier_count: buffer_barriers.len() as u32,
                        p_buffer_memory_barriers: buffer_barriers.as_ptr(),
                        image_memory_barrier_count: image_barriers.len() as u32,
                        p_image_memory_barriers: image_barriers.as_ptr(),
                    };
                    self.device.cmd_pipeline_barrier2(cmd, &dependency);
                }
                #[cfg(feature = "debug-markers")]
                Command::BeginLabel {
                    name,
                    color,
                } => {
                    if let Some(debug_utils) = &self.debug_utils {
                        let name = CString::new(name.as_str())?;
                        let label = vk::DebugUtilsLabelEXT {
                            s_type: vk::StructureType::DEBUG_UTILS_LABEL_EXT,
                            p_next: std::ptr::null(),
                            p_label_name: name.as_ptr(),
                            color: *color,
                        };
                        debug_utils.cmd_begin_debug_utils_label(cmd, &label);
                    }
                }
                #[cfg(feature = "debug-markers")]
                Command::EndLabel => {
                    if let Some(debug_utils) = &self.debug_utils {
                        debug_utils.cmd_end_debug_utils_label(cmd);
                    }
                }
                #[cfg(not(feature = "debug-markers"))]
                Command::BeginLabel {
                    ..
                }
                | Command::EndLabel => {}
                Command::BindBindingSet {
                    bind_point,
                    layout,
                    index,
                    set,
                } => {
                    self.device
                        .cmd_bind_descriptor_sets(cmd, *bind_point, *layout, *index, std::slice::from_ref(set), &[]);
                }
                Command::GenerateMipmaps {
                    image,
                    extent,
                    mip_levels,
                    layers,
                    aspect,
                    ..
                } => self.generate_mipmaps(cmd, *image, *extent, *mip_levels, *layers, *aspect),
                Command::BeginRenderPass {
                    framebuffer,
                    extent,
                    targets,
                    ..
                } => {
                    let render_pass = *self
                        .framebuffer_passes
                        .get(framebuffer)
                        .ok_or(Error::Uncategorized("framebuffer was not created by this backend"))?;
                    let clear_values = targets
                        .iter()
                        .map(|target| target.clear.map(IntoVulkanType::into_vulkan).unwrap_or_default())
                        .collect::<Vec<_>>();
                    let info = vk::RenderPassBeginInfo {
                        s_type: vk::StructureType::RENDER_PASS_BEGIN_INFO,
                        p_next: std::ptr::null(),
                        render_pass,
                        framebuffer: *framebuffer,
                        render_area: vk::Rect2D {
                            offset: vk::Offset2D::default(),
                            extent: *extent,
                        },
                        clear_value_count: clear_values.len() as u32,
                        p_clear_values: clear_values.as_ptr(),
                    };
                    self.device.cmd_begin_render_pass(cmd, &info, vk::SubpassContents::INLINE);
                }
                Command::EndRenderPass => self.device.cmd_end_render_pass(cmd),
                Command::BindPipeline {
                    bind_point,
                    pipeline,
                } => self.device.cmd_bind_pipeline(cmd, *bind_point, *pipeline),
                Command::Draw {
                    vertex_count,
                    instance_count,
                    first_vertex,
                    first_instance,
                } => self
                    .device
                    .cmd_draw(cmd, *vertex_count, *instance_count, *first_vertex, *first_instance),
                Command::Dispatch {
                    x,
                    y,
                    z,
                } => self.device.cmd_dispatch(cmd, *x, *y, *z),
                Command::Blit {
                    src,
                    src_extent,
                    dst,
                    dst_extent,
                    filter,
                } => {
                    let corner = |extent: &vk::Extent2D| vk::Offset3D {
                        x: extent.width as i32,
                        y: extent.height as i32,
                        z: 1,
                    };
                    let layers = vk::ImageSubresourceLayers {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        mip_level: 0,
                        base_array_layer: 0,
                        layer_count: 1,
                    };
                    let blit = vk::ImageBlit {
                        src_subresource: layers,
                        src_offsets: [vk::Offset3D::default(), corner(src_extent)],
                        dst_subresource: layers,
                        dst_offsets: [vk::Offset3D::default(), corner(dst_extent)],
                    };
                    self.device.cmd_blit_image(
                        cmd,
                        *src,
                        vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                        *dst,
                        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                        std::slice::from_ref(&blit),
                        *filter,
                    );
                }
            }
        }
        Ok(())
    }
}

impl Backend for VulkanBackend {
    fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    fn surface_extent(&self) -> vk::Extent2D {
        self.surface_extent
    }

    fn surface_image(&self, index: u32) -> Result<SurfaceImage> {
        let image = self
            .surface_images
            .get(index as usize)
            .copied()
            .ok_or(Error::Uncategorized("surface image index out of range"))?;
        Ok(SurfaceImage {
            image,
            extent: self.surface_extent,
        })
    }

    fn create_image(&mut self, info: &ImageCreateInfo) -> Result<vk::Image> {
        let image_type = if info.extent.depth > 1 {
            vk::ImageType::TYPE_3D
        } else {
            vk::ImageType::TYPE_2D
        };
        let handle = unsafe {
            self.device.create_image(
                &vk::ImageCreateInfo {
                    s_type: vk::StructureType::IMAGE_CREATE_INFO,
                    p_next: std::ptr::null(),
                    flags: Default::default(),
                    image_type,
                    format: info.format,
                    extent: info.extent,
                    mip_levels: info.mip_levels,
                    array_layers: info.layers,
                    samples: info.samples,
                    tiling: vk::ImageTiling::OPTIMAL,
                    usage: info.usage,
                    sharing_mode: vk::SharingMode::EXCLUSIVE,
                    queue_family_index_count: 0,
                    p_queue_family_indices: std::ptr::null(),
                    initial_layout: vk::ImageLayout::UNDEFINED,
                },
                None,
            )?
        };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkImage {handle:?} `{}`", info.name);

        let requirements = unsafe { self.device.get_image_memory_requirements(handle) };
        let memory = match self.allocate(&info.name, requirements, gpu_allocator::MemoryLocation::GpuOnly, false) {
            Ok(memory) => memory,
            Err(err) => {
                unsafe { self.device.destroy_image(handle, None) };
                return Err(err);
            }
        };
        unsafe {
            self.device.bind_image_memory(handle, memory.memory(), memory.offset())?;
        }
        self.image_memory.insert(handle, memory);
        self.set_name(handle, &info.name);
        Ok(handle)
    }

    fn destroy_image(&mut self, image: vk::Image) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkImage {image:?}");
        unsafe { self.device.destroy_image(image, None) };
        if let Some(memory) = self.image_memory.remove(&image) {
            self.free(memory);
        }
    }

    fn create_image_view(&mut self, info: &ImageViewCreateInfo) -> Result<vk::ImageView> {
        let view_type = if info.layers > 1 {
            vk::ImageViewType::TYPE_2D_ARRAY
        } else {
            vk::ImageViewType::TYPE_2D
        };
        let create_info = vk::ImageViewCreateInfo {
            s_type: vk::StructureType::IMAGE_VIEW_CREATE_INFO,
            p_next: std::ptr::null(),
            flags: Default::default(),
            image: info.image,
            view_type,
            format: info.format,
            components: vk::ComponentMapping::default(),
            subresource_range: vk::ImageSubresourceRange {
                aspect_mask: info.aspect,
                base_mip_level: info.base_mip_level,
                level_count: info.mip_levels,
                base_array_layer: 0,
                layer_count: info.layers,
            },
        };
        let view = unsafe { self.device.create_image_view(&create_info, None)? };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkImageView {view:?} `{}`", info.name);
        self.set_name(view, &info.name);
        Ok(view)
    }

    fn destroy_image_view(&mut self, view: vk::ImageView) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkImageView {view:?}");
        unsafe { self.device.destroy_image_view(view, None) };
    }

    fn create_buffer(&mut self, info: &BufferCreateInfo) -> Result<vk::Buffer> {
        let handle = unsafe {
            self.device.create_buffer(
                &vk::BufferCreateInfo {
                    s_type: vk::StructureType::BUFFER_CREATE_INFO,
                    p_next: std::ptr::null(),
                    flags: vk::BufferCreateFlags::empty(),
                    size: info.size,
                    usage: info.usage,
                    sharing_mode: vk::SharingMode::EXCLUSIVE,
                    queue_family_index_count: 0,
                    p_queue_family_indices: std::ptr::null(),
                },
                None,
            )?
        };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkBuffer {handle:?} `{}`", info.name);

        let requirements = unsafe { self.device.get_buffer_memory_requirements(handle) };
        let memory = match self.allocate(&info.name, requirements, info.memory.into(), true) {
            Ok(memory) => memory,
            Err(err) => {
                unsafe { self.device.destroy_buffer(handle, None) };
                return Err(err);
            }
        };
        unsafe {
            self.device.bind_buffer_memory(handle, memory.memory(), memory.offset())?;
        }
        self.buffer_memory.insert(handle, memory);
        self.set_name(handle, &info.name);
        Ok(handle)
    }

    fn destroy_buffer(&mut self, buffer: vk::Buffer) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkBuffer {buffer:?}");
        unsafe { self.device.destroy_buffer(buffer, None) };
        if let Some(memory) = self.buffer_memory.remove(&buffer) {
            self.free(memory);
        }
    }

    fn create_framebuffer(&mut self, info: &FramebufferCreateInfo) -> Result<vk::Framebuffer> {
        let render_pass = self.render_pass(&info.attachments)?;
        let views = info.attachments.iter().map(|attachment| attachment.view).collect::<Vec<_>>();
        let create_info = vk::FramebufferCreateInfo {
            s_type: vk::StructureType::FRAMEBUFFER_CREATE_INFO,
            p_next: std::ptr::null(),
            flags: vk::FramebufferCreateFlags::empty(),
            render_pass,
            attachment_count: views.len() as u32,
            p_attachments: views.as_ptr(),
            width: info.width,
            height: info.height,
            layers: info.layers,
        };
        let framebuffer = unsafe { self.device.create_framebuffer(&create_info, None)? };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkFramebuffer {framebuffer:?} `{}`", info.name);
        self.framebuffer_passes.insert(framebuffer, render_pass);
        self.set_name(framebuffer, &info.name);
        Ok(framebuffer)
    }

    fn destroy_framebuffer(&mut self, framebuffer: vk::Framebuffer) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkFramebuffer {framebuffer:?}");
        self.framebuffer_passes.remove(&framebuffer);
        unsafe { self.device.destroy_framebuffer(framebuffer, None) };
    }

    fn create_binding_set_layout(&mut self, layout: &BindingSetLayout) -> Result<vk::DescriptorSetLayout> {
        let bindings = layout
            .slots()
            .iter()
            .map(|slot| vk::DescriptorSetLayoutBinding {
                binding: slot.binding,
                descriptor_type: slot.ty,
                descriptor_count: slot.count,
                stage_flags: slot.stages,
                p_immutable_samplers: std::ptr::null(),
            })
            .collect::<Vec<_>>();
        let info = vk::DescriptorSetLayoutCreateInfo {
            s_type: vk::StructureType::DESCRIPTOR_SET_LAYOUT_CREATE_INFO,
            p_next: std::ptr::null(),
            flags: vk::DescriptorSetLayoutCreateFlags::empty(),
            binding_count: bindings.len() as u32,
            p_bindings: bindings.as_ptr(),
        };
        let handle = unsafe { self.device.create_descriptor_set_layout(&info, None)? };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkDescriptorSetLayout {handle:?}");
        Ok(handle)
    }

    fn destroy_binding_set_layout(&mut self, layout: vk::DescriptorSetLayout) {
        unsafe { self.device.destroy_descriptor_set_layout(layout, None) };
    }

    fn create_binding_set_pool(&mut self, size: &BindingPoolSize) -> Result<vk::DescriptorPool> {
        let sizes = size.to_vk();
        let info = vk::DescriptorPoolCreateInfo {
            s_type: vk::StructureType::DESCRIPTOR_POOL_CREATE_INFO,
            p_next: std::ptr::null(),
            flags: vk::DescriptorPoolCreateFlags::empty(),
            max_sets: size.max_sets,
            pool_size_count: sizes.len() as u32,
            p_pool_sizes: sizes.as_ptr(),
        };
        let pool = unsafe { self.device.create_descriptor_pool(&info, None)? };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkDescriptorPool {pool:?}");
        Ok(pool)
    }

    fn destroy_binding_set_pool(&mut self, pool: vk::DescriptorPool) {
        unsafe { self.device.destroy_descriptor_pool(pool, None) };
    }

    fn allocate_binding_sets(
        &mut self,
        pool: vk::DescriptorPool,
        layouts: &[vk::DescriptorSetLayout],
    ) -> Result<Vec<vk::DescriptorSet>> {
        let info = vk::DescriptorSetAllocateInfo {
            s_type: vk::StructureType::DESCRIPTOR_SET_ALLOCATE_INFO,
            p_next: std::ptr::null(),
            descriptor_pool: pool,
            descriptor_set_count: layouts.len() as u32,
            p_set_layouts: layouts.as_ptr(),
        };
        Ok(unsafe { self.device.allocate_descriptor_sets(&info)? })
    }

    fn write_binding_sets(&mut self, writes: &[ResolvedWrite]) {
        if writes.is_empty() {
            return;
        }
        // Infos are collected first so the pointers in the writes below stay valid.
        let image_infos = writes
            .iter()
            .map(|write| match write.descriptor {
                Descriptor::Image {
                    view,
                    sampler,
                    layout,
                } => vk::DescriptorImageInfo {
                    sampler,
                    image_view: view,
                    image_layout: layout,
                },
                Descriptor::Buffer {
                    ..
                } => vk::DescriptorImageInfo::default(),
            })
            .collect::<Vec<_>>();
        let buffer_infos = writes
            .iter()
            .map(|write| match write.descriptor {
                Descriptor::Buffer {
                    buffer,
                    offset,
                    range,
                } => vk::DescriptorBufferInfo {
                    buffer,
                    offset,
                    range,
                },
                Descriptor::Image {
                    ..
                } => vk::DescriptorBufferInfo::default(),
            })
            .collect::<Vec<_>>();
        let vk_writes = writes
            .iter()
            .enumerate()
            .map(|(index, write)| {
                let is_image = matches!(write.descriptor, Descriptor::Image { .. });
                vk::WriteDescriptorSet {
                    s_type: vk::StructureType::WRITE_DESCRIPTOR_SET,
                    p_next: std::ptr::null(),
                    dst_set: write.set,
                    dst_binding: write.binding,
                    dst_array_element: write.array_element,
                    descriptor_count: 1,
                    descriptor_type: write.ty,
                    p_image_info: if is_image {
                        &image_infos[index]
                    } else {
                        std::ptr::null()
                    },
                    p_buffer_info: if is_image {
                        std::ptr::null()
                    } else {
                        &buffer_infos[index]
                    },
                    p_texel_buffer_view: std::ptr::null(),
                }
            })
            .collect::<Vec<_>>();
        unsafe { self.device.update_descriptor_sets(&vk_writes, &[]) };
    }

    fn wait_for_frame(&mut self, frame_index: usize) -> Result<()> {
        let fence = self.frame_fence(frame_index)?;
        unsafe {
            self.device.wait_for_fences(std::slice::from_ref(&fence), true, u64::MAX)?;
            self.device.reset_fences(std::slice::from_ref(&fence))?;
        }
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<()> {
        unsafe { self.device.wait_for_fences(&self.fences, true, u64::MAX)? };
        Ok(())
    }
}

impl Drop for VulkanBackend {
    fn drop(&mut self) {
        unsafe {
            if let Err(err) = self.device.device_wait_idle() {
                error!("Failed to wait for device idle while dropping backend: {err}");
            }
            for (framebuffer, _) in self.framebuffer_passes.drain() {
                self.device.destroy_framebuffer(framebuffer, None);
            }
            for (_, pass) in self.render_passes.drain() {
                self.device.destroy_render_pass(pass, None);
            }
            for fence in self.fences.drain(..) {
                self.device.destroy_fence(fence, None);
            }
        }
        let images = self.image_memory.keys().copied().collect::<Vec<_>>();
        for image in images {
            self.destroy_image(image);
        }
        let buffers = self.buffer_memory.keys().copied().collect::<Vec<_>>();
        for buffer in buffers {
            self.destroy_buffer(buffer);
        }
    }
}
