//! Sizing of binding set pools. Every layout gets pools sized exactly for the sets allocated from them, so they
//! never need to grow.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use ash::vk;

use crate::descriptor::layout::BindingSetLayout;

/// Defines how many descriptors and sets a binding set pool should be able to hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingPoolSize {
    /// Number of descriptors per descriptor type, sorted by type
    pub sizes: Vec<(vk::DescriptorType, u32)>,
    /// Maximum number of sets allocated from the pool
    pub max_sets: u32,
}

impl BindingPoolSize {
    /// Size of a pool holding `sets` sets of `layout`. Every slot contributes its descriptor count once per set.
    pub fn for_layout(layout: &BindingSetLayout, sets: u32) -> Self {
        let mut sizes = BTreeMap::new();
        for slot in layout.slots() {
            *sizes.entry(slot.ty.as_raw()).or_insert(0) += slot.count * sets;
        }
        Self {
            sizes: sizes
                .into_iter()
                .map(|(ty, count)| (vk::DescriptorType::from_raw(ty), count))
                .collect(),
            max_sets: sets,
        }
    }

    /// Descriptor count for one type, zero if the pool holds none of it.
    pub fn count(&self, ty: vk::DescriptorType) -> u32 {
        self.sizes
            .iter()
            .find(|(t, _)| *t == ty)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    /// The pool sizes as Vulkan structs.
    pub fn to_vk(&self) -> Vec<vk::DescriptorPoolSize> {
        self.sizes
            .iter()
            .map(|(ty, count)| vk::DescriptorPoolSize {
                ty: *ty,
                descriptor_count: *count,
            })
            .collect()
    }
}

impl Display for BindingPoolSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut result = writeln!(f, "BindingPoolSize ({} sets)", self.max_sets);
        for (ty, size) in &self.sizes {
            result = result.and_then(|_| writeln!(f, "{ty:?} => {size}"))
        }
        result
    }
}
