//! Logical resources tracked by the graph, and the ways passes can touch them.

use ash::vk;

use crate::graph::pass::PassId;

/// Type of a resource in the render graph.
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq)]
pub enum ResourceType {
    /// Image resource
    #[default]
    Image,
    /// Buffer resource
    Buffer,
}

/// Stable handle to a logical resource. This is an index into the graph's resource arena, so it stays valid for
/// the lifetime of the graph that returned it.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResourceId(pub(crate) usize);

impl ResourceId {
    /// Index of this resource in the arena.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Size of an image. Either a fixed size, or a size relative to the output surface.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ImageExtent {
    /// Fixed size in pixels.
    Absolute {
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
        /// Depth in pixels, 1 for 2D images.
        depth: u32,
    },
    /// Size is the output surface size multiplied by a scale factor.
    SurfaceRelative {
        /// Horizontal scale factor
        scale_x: f32,
        /// Vertical scale factor
        scale_y: f32,
    },
}

impl ImageExtent {
    /// Image with the exact size of the output surface.
    pub fn surface() -> Self {
        ImageExtent::SurfaceRelative {
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    /// Image with a fixed 2D size.
    pub fn absolute_2d(width: u32, height: u32) -> Self {
        ImageExtent::Absolute {
            width,
            height,
            depth: 1,
        }
    }

    /// Whether this extent depends on the output surface size.
    pub fn is_surface_relative(&self) -> bool {
        matches!(self, ImageExtent::SurfaceRelative { .. })
    }

    /// Resolve this extent against a surface size. Relative sizes are rounded down, but never become zero.
    pub fn resolve(&self, surface: vk::Extent2D) -> (u32, u32, u32) {
        match *self {
            ImageExtent::Absolute {
                width,
                height,
                depth,
            } => (width, height, depth),
            ImageExtent::SurfaceRelative {
                scale_x,
                scale_y,
            } => (
                ((surface.width as f32 * scale_x) as u32).max(1),
                ((surface.height as f32 * scale_y) as u32).max(1),
                1,
            ),
        }
    }
}

/// Size of a buffer. Either a fixed byte size, or a number of bytes per output surface pixel.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum BufferSize {
    /// Fixed size in bytes.
    Absolute(vk::DeviceSize),
    /// `stride` bytes for every pixel of the (scaled) output surface.
    PerPixel {
        /// Bytes per pixel
        stride: vk::DeviceSize,
        /// Scale factor applied to both surface dimensions.
        scale: f32,
    },
}

impl BufferSize {
    /// Whether this size depends on the output surface size.
    pub fn is_surface_relative(&self) -> bool {
        matches!(self, BufferSize::PerPixel { .. })
    }

    /// Resolve this size against a surface size.
    pub fn resolve(&self, surface: vk::Extent2D) -> vk::DeviceSize {
        match *self {
            BufferSize::Absolute(size) => size,
            BufferSize::PerPixel {
                stride,
                scale,
            } => {
                let width = ((surface.width as f32 * scale) as u64).max(1);
                let height = ((surface.height as f32 * scale) as u64).max(1);
                width * height * stride
            }
        }
    }
}

/// Lifetime flags of a resource.
///
/// A resource is backed by one physical allocation per frame in flight only if it is not persistent and allows
/// overlap. Persistent resources are never multiplied, even if overlap is allowed, since their content must survive
/// into the next frame.
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq)]
pub struct ResourceFlags {
    /// Content must survive across frames.
    pub persistent: bool,
    /// Frames in flight may each get their own copy instead of being synchronized against each other.
    pub allow_in_flight_overlap: bool,
}

impl ResourceFlags {
    /// Transient resource, synchronized across frames.
    pub fn transient() -> Self {
        Self::default()
    }

    /// Resource whose content survives into the next frame.
    pub fn persistent() -> Self {
        Self {
            persistent: true,
            allow_in_flight_overlap: false,
        }
    }

    /// Transient resource with one copy per frame in flight.
    pub fn in_flight() -> Self {
        Self {
            persistent: false,
            allow_in_flight_overlap: true,
        }
    }

    /// Whether the resource gets one allocation per frame in flight.
    pub fn is_multiplied(&self) -> bool {
        !self.persistent && self.allow_in_flight_overlap
    }
}

/// Describes a texture resource.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TextureDesc {
    /// Pixel format
    pub format: vk::Format,
    /// Size of the texture
    pub extent: ImageExtent,
    /// Number of mip levels. Textures that are sampled with mipmaps need more than one.
    pub mip_levels: u32,
    /// Number of array layers.
    pub layers: u32,
    /// MSAA samples
    pub samples: vk::SampleCountFlags,
    /// Usage flags on top of the ones inferred from the way passes touch the texture.
    pub extra_usage: vk::ImageUsageFlags,
}

impl TextureDesc {
    /// Single-layer, single-mip 2D texture.
    pub fn new(format: vk::Format, extent: ImageExtent) -> Self {
        Self {
            format,
            extent,
            mip_levels: 1,
            layers: 1,
            samples: vk::SampleCountFlags::TYPE_1,
            extra_usage: vk::ImageUsageFlags::empty(),
        }
    }

    /// Set the number of mip levels.
    pub fn mip_levels(mut self, levels: u32) -> Self {
        self.mip_levels = levels.max(1);
        self
    }

    /// Set the number of array layers.
    pub fn layers(mut self, layers: u32) -> Self {
        self.layers = layers.max(1);
        self
    }

    /// Add usage flags that can not be inferred from the graph.
    pub fn usage(mut self, usage: vk::ImageUsageFlags) -> Self {
        self.extra_usage |= usage;
        self
    }
}

/// Describes a buffer resource.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BufferDesc {
    /// Size of the buffer
    pub size: BufferSize,
    /// Usage flags on top of the ones inferred from the way passes touch the buffer.
    pub extra_usage: vk::BufferUsageFlags,
    /// Where the buffer memory should live.
    pub memory: crate::MemoryType,
}

impl BufferDesc {
    /// GPU-only buffer of the given size.
    pub fn new(size: BufferSize) -> Self {
        Self {
            size,
            extra_usage: vk::BufferUsageFlags::empty(),
            memory: crate::MemoryType::GpuOnly,
        }
    }

    /// Add usage flags that can not be inferred from the graph.
    pub fn usage(mut self, usage: vk::BufferUsageFlags) -> Self {
        self.extra_usage |= usage;
        self
    }

    /// Set the memory type of the buffer.
    pub fn memory(mut self, memory: crate::MemoryType) -> Self {
        self.memory = memory;
        self
    }
}

/// Texture or buffer description.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ResourceDesc {
    /// Texture resource
    Texture(TextureDesc),
    /// Buffer resource
    Buffer(BufferDesc),
}

impl ResourceDesc {
    /// Get the resource type of this description
    pub fn resource_type(&self) -> ResourceType {
        match self {
            ResourceDesc::Texture(_) => ResourceType::Image,
            ResourceDesc::Buffer(_) => ResourceType::Buffer,
        }
    }

    /// Whether the physical size of this resource depends on the output surface.
    pub fn is_surface_relative(&self) -> bool {
        match self {
            ResourceDesc::Texture(texture) => texture.extent.is_surface_relative(),
            ResourceDesc::Buffer(buffer) => buffer.size.is_surface_relative(),
        }
    }

    /// Image format, `None` for buffers.
    pub fn format(&self) -> Option<vk::Format> {
        match self {
            ResourceDesc::Texture(texture) => Some(texture.format),
            ResourceDesc::Buffer(_) => None,
        }
    }
}

/// The way a pass touches a resource. This carries no resource identity, it is always paired with a pass in a
/// [`Touch`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AccessKind {
    /// The pass initializes the resource contents with transfer commands (clear, upload).
    Init,
    /// Read-only storage access.
    Read,
    /// Storage write. Read-write access is also declared as a write.
    Write,
    /// Sampled read. If `needs_mipmap` is set, the mip chain is regenerated from level 0 right before the pass.
    Sample {
        /// Whether mips need to be generated before sampling.
        needs_mipmap: bool,
    },
    /// Rendered into as a color or depth attachment.
    RenderTarget {
        /// What happens to the attachment contents when the pass starts.
        load_op: vk::AttachmentLoadOp,
        /// What happens to the attachment contents when the pass ends.
        store_op: vk::AttachmentStoreOp,
    },
}

impl AccessKind {
    /// Plain sample without mip generation.
    pub const SAMPLE: AccessKind = AccessKind::Sample {
        needs_mipmap: false,
    };

    /// Human-readable name, used in errors and debug output.
    pub fn name(&self) -> &'static str {
        match self {
            AccessKind::Init => "init",
            AccessKind::Read => "read",
            AccessKind::Write => "write",
            AccessKind::Sample {
                ..
            } => "sample",
            AccessKind::RenderTarget {
                ..
            } => "render target",
        }
    }

    /// Whether this access modifies the resource contents.
    pub fn is_write(&self) -> bool {
        match self {
            AccessKind::Init => true,
            AccessKind::Read => false,
            AccessKind::Write => true,
            AccessKind::Sample {
                needs_mipmap,
            } => *needs_mipmap,
            AccessKind::RenderTarget {
                ..
            } => true,
        }
    }

    /// Whether the pass needs an image view of the resource for this access.
    pub fn needs_view(&self) -> bool {
        !matches!(self, AccessKind::Init)
    }
}

/// A single `(pass, access)` event recorded against a resource at graph construction time.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Touch {
    /// The pass touching the resource
    pub pass: PassId,
    /// How the pass touches it
    pub access: AccessKind,
}

/// A logical resource: an image or buffer tracked over the graph's lifetime, independent of how many physical
/// allocations back it.
#[derive(Debug, Clone)]
pub struct LogicalResource {
    pub(crate) name: String,
    pub(crate) desc: ResourceDesc,
    pub(crate) flags: ResourceFlags,
    pub(crate) touches: Vec<Touch>,
}

impl LogicalResource {
    /// Get the resource name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the resource description
    pub fn desc(&self) -> &ResourceDesc {
        &self.desc
    }

    /// Get the lifetime flags
    pub fn flags(&self) -> ResourceFlags {
        self.flags
    }

    /// Get the resource type
    pub fn resource_type(&self) -> ResourceType {
        self.desc.resource_type()
    }

    /// All touches in declaration order, including those of disabled passes.
    pub fn touches(&self) -> &[Touch] {
        &self.touches
    }

    /// Whether this resource gets one allocation per frame in flight.
    pub fn is_multiplied(&self) -> bool {
        self.flags.is_multiplied()
    }
}

/// Infer the image aspect from a format.
pub fn image_aspect(format: vk::Format) -> vk::ImageAspectFlags {
    match format {
        vk::Format::D16_UNORM | vk::Format::D32_SFLOAT | vk::Format::X8_D24_UNORM_PACK32 => {
            vk::ImageAspectFlags::DEPTH
        }
        vk::Format::S8_UINT => vk::ImageAspectFlags::STENCIL,
        vk::Format::D16_UNORM_S8_UINT | vk::Format::D24_UNORM_S8_UINT | vk::Format::D32_SFLOAT_S8_UINT => {
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        }
        _ => vk::ImageAspectFlags::COLOR,
    }
}

/// Whether the format is a depth and/or stencil format.
pub fn is_depth_format(format: vk::Format) -> bool {
    !image_aspect(format).contains(vk::ImageAspectFlags::COLOR)
}
