//! Re-exports of the most commonly used types.

pub use ash::vk;

pub use crate::backend::headless::HeadlessBackend;
pub use crate::backend::vulkan::VulkanBackend;
pub use crate::backend::{Backend, MemoryType, SurfaceImage};
pub use crate::core::error::Error;
pub use crate::core::settings::{GraphSettings, GraphSettingsBuilder};
pub use crate::descriptor::layout::{BindingSetLayout, BindingSlot};
pub use crate::descriptor::manager::{BindingSetManager, Phase, SetMode};
pub use crate::descriptor::write::{BindingResource, BindingWrite};
pub use crate::frame::command::{Command, CommandList};
pub use crate::frame::context::{CompileContext, PassContext};
pub use crate::frame::driver::RenderGraph;
pub use crate::frame::lifecycle::PassLifecycle;
pub use crate::graph::access::AccessState;
pub use crate::graph::hazard::{BarrierPlan, BarrierSource, PlannedBarrier};
pub use crate::graph::pass::{
    ClearColor, ClearDepthStencil, EmptyPassExecutor, Pass, PassBuilder, PassExecutor, PassId, PassKind,
};
pub use crate::graph::registry::ResourceRegistry;
pub use crate::graph::resource::{
    AccessKind, BufferDesc, BufferSize, ImageExtent, ResourceFlags, ResourceId, ResourceType, TextureDesc,
};
pub use crate::graph::state::{Condition, GraphState};
pub use crate::graph::viz::GraphViz;
