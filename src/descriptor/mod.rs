//! This module handles everything related to binding sets (descriptor sets).
//!
//! The [`BindingSetManager`](manager::BindingSetManager) owns every binding set used by a graph. Layouts are
//! described with [`BindingSetLayout`](layout::BindingSetLayout), and deduplicated by structure so that
//! identical layouts share one physical layout and pool.
//!
//! Slots are written with [`BindingWrite`](write::BindingWrite)s. These refer to graph resources by pass and
//! resource handle instead of physical handles, so writes can be declared before anything is allocated and are
//! re-issued automatically when the output surface is resized.
//!
//! # Example
//!
//! ```
//! use deimos::prelude::*;
//!
//! let mut graph = RenderGraph::new(HeadlessBackend::new(2, 800, 600), GraphSettings::default());
//! let lit = graph.declare_texture(
//!     "lit",
//!     TextureDesc::new(vk::Format::R16G16B16A16_SFLOAT, ImageExtent::surface()),
//!     ResourceFlags::in_flight(),
//! );
//! let tonemap = graph.add_pass(PassBuilder::graphics("tonemap").sample(lit).build())?;
//!
//! let layout = BindingSetLayout::new()
//!     .slot(0, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 1, vk::ShaderStageFlags::FRAGMENT);
//! graph.manage_binding_set("tonemap_input", &layout, SetMode::InFlight)?;
//! // Nothing is allocated yet. This write is resolved during compilation, once per frame in flight.
//! graph.update_binding_set("tonemap_input", BindingWrite::sampled_image(0, tonemap, lit, vk::Sampler::null()))?;
//! graph.compile_ahead_of_time()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod descriptor_pool;
pub mod layout;
pub mod manager;
pub mod write;
