//! Per-frame execution of a compiled graph.
//!
//! [`RenderGraph`](driver::RenderGraph) records every enabled pass into a [`CommandList`](command::CommandList),
//! with the synthesized barriers in front of each pass and the composite into the output surface at the end. A
//! backend replays the list into a real command buffer, see
//! [`VulkanBackend::replay()`](crate::backend::vulkan::VulkanBackend::replay).

pub mod command;
pub mod context;
pub mod driver;
pub mod lifecycle;
pub(crate) mod present;
pub mod resize;
