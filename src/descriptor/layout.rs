//! Binding set layouts, compared by structure.

use ash::vk;

/// One slot in a binding set layout.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub struct BindingSlot {
    /// Binding index
    pub binding: u32,
    /// Descriptor type
    pub ty: vk::DescriptorType,
    /// Number of descriptors in this slot
    pub count: u32,
    /// Shader stages that can see this slot
    pub stages: vk::ShaderStageFlags,
}

/// The structural key of a binding set layout: an ordered list of slots.
///
/// Two layouts with the same slots in the same order are equal, and share one physical layout and pool.
/// # Example
/// ```
/// use deimos::prelude::*;
///
/// let a = BindingSetLayout::new()
///     .slot(0, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 1, vk::ShaderStageFlags::FRAGMENT)
///     .slot(1, vk::DescriptorType::UNIFORM_BUFFER, 1, vk::ShaderStageFlags::FRAGMENT);
/// let b = BindingSetLayout::new()
///     .slot(0, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 1, vk::ShaderStageFlags::FRAGMENT)
///     .slot(1, vk::DescriptorType::UNIFORM_BUFFER, 1, vk::ShaderStageFlags::VERTEX);
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, Default, Hash, PartialEq, Eq)]
pub struct BindingSetLayout {
    slots: Vec<BindingSlot>,
}

impl BindingSetLayout {
    /// Create an empty layout
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a slot.
    pub fn slot(mut self, binding: u32, ty: vk::DescriptorType, count: u32, stages: vk::ShaderStageFlags) -> Self {
        self.slots.push(BindingSlot {
            binding,
            ty,
            count,
            stages,
        });
        self
    }

    /// All slots, in declaration order.
    pub fn slots(&self) -> &[BindingSlot] {
        &self.slots
    }

    /// Find the slot with this binding index.
    pub fn binding(&self, binding: u32) -> Option<&BindingSlot> {
        self.slots.iter().find(|slot| slot.binding == binding)
    }
}
