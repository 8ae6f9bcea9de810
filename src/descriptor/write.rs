//! Binding set writes.
//!
//! A [`BindingWrite`] names what a slot should point at, but not the handle. Graph resources are referenced
//! symbolically, by pass and resource, since their physical views differ per frame in flight and change on resize.
//! Writes are resolved into [`ResolvedWrite`]s right before they are handed to the backend.

use anyhow::Result;
use ash::vk;

use crate::graph::pass::PassId;
use crate::graph::resource::ResourceId;

/// What a binding slot points at.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BindingResource {
    /// The view a pass uses for an image resource of the graph.
    PassImage {
        /// Pass owning the view
        pass: PassId,
        /// Image resource
        resource: ResourceId,
        /// Sampler, or null for storage images
        sampler: vk::Sampler,
        /// Layout the image is in when the set is used
        layout: vk::ImageLayout,
    },
    /// A buffer resource of the graph.
    Buffer {
        /// Buffer resource
        resource: ResourceId,
        /// Offset in bytes
        offset: vk::DeviceSize,
        /// Range in bytes
        range: vk::DeviceSize,
    },
    /// An image view owned by someone else.
    ExternalImage {
        /// Image view
        view: vk::ImageView,
        /// Sampler, or null
        sampler: vk::Sampler,
        /// Image layout
        layout: vk::ImageLayout,
    },
    /// A buffer owned by someone else.
    ExternalBuffer {
        /// Buffer handle
        buffer: vk::Buffer,
        /// Offset in bytes
        offset: vk::DeviceSize,
        /// Range in bytes
        range: vk::DeviceSize,
    },
}

/// A write into one slot of a managed binding set.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BindingWrite {
    /// Binding index
    pub binding: u32,
    /// Array element within the binding
    pub array_element: u32,
    /// Descriptor type
    pub ty: vk::DescriptorType,
    /// What the slot points at
    pub resource: BindingResource,
}

impl BindingWrite {
    /// Bind the view `pass` uses for `resource` as a combined image sampler.
    pub fn sampled_image(binding: u32, pass: PassId, resource: ResourceId, sampler: vk::Sampler) -> Self {
        Self {
            binding,
            array_element: 0,
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            resource: BindingResource::PassImage {
                pass,
                resource,
                sampler,
                layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            },
        }
    }

    /// Bind the view `pass` uses for `resource` as a storage image.
    pub fn storage_image(binding: u32, pass: PassId, resource: ResourceId) -> Self {
        Self {
            binding,
            array_element: 0,
            ty: vk::DescriptorType::STORAGE_IMAGE,
            resource: BindingResource::PassImage {
                pass,
                resource,
                sampler: vk::Sampler::null(),
                layout: vk::ImageLayout::GENERAL,
            },
        }
    }

    /// Bind a whole buffer resource as a storage buffer.
    pub fn storage_buffer(binding: u32, resource: ResourceId) -> Self {
        Self::buffer(binding, vk::DescriptorType::STORAGE_BUFFER, resource)
    }

    /// Bind a whole buffer resource as a uniform buffer.
    pub fn uniform_buffer(binding: u32, resource: ResourceId) -> Self {
        Self::buffer(binding, vk::DescriptorType::UNIFORM_BUFFER, resource)
    }

    fn buffer(binding: u32, ty: vk::DescriptorType, resource: ResourceId) -> Self {
        Self {
            binding,
            array_element: 0,
            ty,
            resource: BindingResource::Buffer {
                resource,
                offset: 0,
                range: vk::WHOLE_SIZE,
            },
        }
    }

    /// Bind an image view that is not part of the graph.
    pub fn external_image(
        binding: u32,
        ty: vk::DescriptorType,
        view: vk::ImageView,
        sampler: vk::Sampler,
        layout: vk::ImageLayout,
    ) -> Self {
        Self {
            binding,
            array_element: 0,
            ty,
            resource: BindingResource::ExternalImage {
                view,
                sampler,
                layout,
            },
        }
    }

    /// Bind a buffer that is not part of the graph.
    pub fn external_buffer(
        binding: u32,
        ty: vk::DescriptorType,
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        range: vk::DeviceSize,
    ) -> Self {
        Self {
            binding,
            array_element: 0,
            ty,
            resource: BindingResource::ExternalBuffer {
                buffer,
                offset,
                range,
            },
        }
    }

    /// Write into another array element of the binding.
    pub fn array_element(mut self, element: u32) -> Self {
        self.array_element = element;
        self
    }

    /// The graph resource this write points at, if any.
    pub fn graph_resource(&self) -> Option<ResourceId> {
        match self.resource {
            BindingResource::PassImage {
                resource,
                ..
            }
            | BindingResource::Buffer {
                resource,
                ..
            } => Some(resource),
            _ => None,
        }
    }

    /// Whether this write and `other` target the same slot element.
    pub fn same_slot(&self, other: &BindingWrite) -> bool {
        self.binding == other.binding && self.array_element == other.array_element
    }

    /// Resolve this write for one physical set.
    pub fn resolve(&self, set: vk::DescriptorSet, frame: usize, resolver: &dyn ResolveBinding) -> Result<ResolvedWrite> {
        let descriptor = match self.resource {
            BindingResource::PassImage {
                pass,
                resource,
                sampler,
                layout,
            } => Descriptor::Image {
                view: resolver.image_view(pass, resource, frame)?,
                sampler,
                layout,
            },
            BindingResource::Buffer {
                resource,
                offset,
                range,
            } => Descriptor::Buffer {
                buffer: resolver.buffer(resource, frame)?,
                offset,
                range,
            },
            BindingResource::ExternalImage {
                view,
                sampler,
                layout,
            } => Descriptor::Image {
                view,
                sampler,
                layout,
            },
            BindingResource::ExternalBuffer {
                buffer,
                offset,
                range,
            } => Descriptor::Buffer {
                buffer,
                offset,
                range,
            },
        };
        Ok(ResolvedWrite {
            set,
            binding: self.binding,
            array_element: self.array_element,
            ty: self.ty,
            descriptor,
        })
    }
}

/// Physical contents of a written descriptor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Descriptor {
    /// Image descriptor
    Image {
        /// Image view
        view: vk::ImageView,
        /// Sampler, or null
        sampler: vk::Sampler,
        /// Image layout
        layout: vk::ImageLayout,
    },
    /// Buffer descriptor
    Buffer {
        /// Buffer handle
        buffer: vk::Buffer,
        /// Offset in bytes
        offset: vk::DeviceSize,
        /// Range in bytes
        range: vk::DeviceSize,
    },
}

/// A write with all handles known, ready for the backend.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ResolvedWrite {
    /// Destination set
    pub set: vk::DescriptorSet,
    /// Binding index
    pub binding: u32,
    /// Array element
    pub array_element: u32,
    /// Descriptor type
    pub ty: vk::DescriptorType,
    /// Descriptor contents
    pub descriptor: Descriptor,
}

/// Looks up the physical handles of graph resources for one frame in flight.
pub trait ResolveBinding {
    /// The view `pass` uses for `resource` in frame slot `frame`.
    fn image_view(&self, pass: PassId, resource: ResourceId, frame: usize) -> Result<vk::ImageView>;

    /// The buffer backing `resource` in frame slot `frame`.
    fn buffer(&self, resource: ResourceId, frame: usize) -> Result<vk::Buffer>;

    /// Whether `resource` has one allocation per frame in flight.
    fn is_multiplied(&self, resource: ResourceId) -> Result<bool>;

    /// Name of `resource`, for error messages.
    fn resource_name(&self, resource: ResourceId) -> String;
}
