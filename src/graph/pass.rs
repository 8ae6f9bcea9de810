//! This module mainly exposes the [`PassBuilder`] struct, used for correctly defining passes in a
//! [`RenderGraph`](crate::RenderGraph).
//!
//! There are two kinds of passes. Graphics passes may render into color and depth targets, compute passes may not.
//! Each pass declares how it touches every resource it uses, and optionally gives an executor that records its
//! work when the frame is recorded. Additionally, a color can be given to each pass which will show up in debuggers
//! like [*RenderDoc*](https://renderdoc.org/) if the `debug-markers` feature is enabled.
//!
//! # Example
//!
//! A pass that renders into an offscreen texture, and one that samples from it.
//! ```
//! use deimos::prelude::*;
//!
//! let mut graph = RenderGraph::new(HeadlessBackend::new(2, 1280, 720), GraphSettings::default());
//! let offscreen = graph.declare_texture(
//!     "offscreen",
//!     TextureDesc::new(vk::Format::R8G8B8A8_UNORM, ImageExtent::surface()),
//!     ResourceFlags::transient(),
//! );
//! let output = graph.declare_texture(
//!     "output",
//!     TextureDesc::new(vk::Format::R8G8B8A8_UNORM, ImageExtent::surface()),
//!     ResourceFlags::transient(),
//! );
//!
//! let render = PassBuilder::graphics("offscreen")
//!     // Only shows up in graphics debuggers if the debug-markers feature is enabled.
//!     .color([1.0, 0.0, 0.0, 1.0])
//!     .clear_color_target(offscreen, ClearColor::Float([0.0, 0.0, 0.0, 1.0]))
//!     .execute_fn(|ctx| {
//!         ctx.draw(3, 1, 0, 0);
//!         Ok(())
//!     })
//!     .build();
//! let blur = PassBuilder::compute("blur")
//!     .sample(offscreen)
//!     .write(output)
//!     .build();
//! graph.add_pass(render)?;
//! graph.add_pass(blur)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::Result;
use ash::vk;

use crate::frame::context::{CompileContext, PassContext};
use crate::graph::access::PipelineStage;
use crate::graph::resource::{AccessKind, ResourceId};
use crate::graph::state::Condition;
use crate::util::to_vk::IntoVulkanType;

/// Stable handle to a pass. Passes are numbered in the order they were added to the graph, which is also their
/// execution order.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct PassId(pub(crate) usize);

impl PassId {
    /// Position of this pass in execution order.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// The kind of a pass. Determines which accesses are legal and how they translate to pipeline stages.
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq)]
pub enum PassKind {
    /// Runs on the graphics pipeline, may have render targets.
    #[default]
    Graphics,
    /// Runs on the compute pipeline.
    Compute,
}

impl PassKind {
    /// The pipeline bind point of this pass kind.
    pub fn bind_point(&self) -> vk::PipelineBindPoint {
        match self {
            PassKind::Graphics => vk::PipelineBindPoint::GRAPHICS,
            PassKind::Compute => vk::PipelineBindPoint::COMPUTE,
        }
    }
}

/// Clear value for a color target.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ClearColor {
    /// Clear value for float and normalized formats
    Float([f32; 4]),
    /// Clear value for signed integer formats
    Int([i32; 4]),
    /// Clear value for unsigned integer formats
    Uint([u32; 4]),
}

/// Clear value for a depth/stencil target.
#[derive(Copy, Clone, Default, Debug, PartialEq)]
pub struct ClearDepthStencil {
    /// Depth clear value
    pub depth: f32,
    /// Stencil clear value
    pub stencil: u32,
}

/// Clear value of one render target.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ClearValue {
    /// Color target clear value
    Color(ClearColor),
    /// Depth target clear value
    DepthStencil(ClearDepthStencil),
}

impl IntoVulkanType for ClearColor {
    type Output = vk::ClearColorValue;

    fn into_vulkan(self) -> Self::Output {
        match self {
            ClearColor::Float(values) => vk::ClearColorValue {
                float32: values,
            },
            ClearColor::Int(values) => vk::ClearColorValue {
                int32: values,
            },
            ClearColor::Uint(values) => vk::ClearColorValue {
                uint32: values,
            },
        }
    }
}

impl IntoVulkanType for ClearDepthStencil {
    type Output = vk::ClearDepthStencilValue;

    fn into_vulkan(self) -> Self::Output {
        vk::ClearDepthStencilValue {
            depth: self.depth,
            stencil: self.stencil,
        }
    }
}

impl IntoVulkanType for ClearValue {
    type Output = vk::ClearValue;

    fn into_vulkan(self) -> Self::Output {
        match self {
            ClearValue::Color(color) => vk::ClearValue {
                color: color.into_vulkan(),
            },
            ClearValue::DepthStencil(depth) => vk::ClearValue {
                depth_stencil: depth.into_vulkan(),
            },
        }
    }
}

/// One declared access of a pass.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PassAccess {
    /// The accessed resource
    pub resource: ResourceId,
    /// How it is accessed
    pub kind: AccessKind,
    /// Clear value, only for render targets with [`vk::AttachmentLoadOp::CLEAR`].
    pub clear: Option<ClearValue>,
}

/// Defines a pass executor that is called by the graph. Only [`PassExecutor::record()`] is required, the lifecycle
/// hooks default to doing nothing.
pub trait PassExecutor {
    /// Called once during [`RenderGraph::compile_ahead_of_time()`](crate::RenderGraph::compile_ahead_of_time), after
    /// all physical resources exist but before binding sets are allocated. This is where a pass manages its binding
    /// sets and declares their writes.
    fn prepare_ahead_of_time(&mut self, _ctx: &mut CompileContext) -> Result<()> {
        Ok(())
    }

    /// Called the first time the pass is enabled.
    fn on_first_enable(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called when the pass is enabled again after having been disabled.
    fn on_switch_to_enable(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called every frame the pass is enabled, after its barriers were inserted and before [`PassExecutor::record()`].
    fn prepare(&mut self, _ctx: &mut PassContext) -> Result<()> {
        Ok(())
    }

    /// Record the work of this pass.
    fn record(&mut self, ctx: &mut PassContext) -> Result<()>;
}

impl<F> PassExecutor for F
where
    F: FnMut(&mut PassContext) -> Result<()>,
{
    /// Record this pass by calling the given function.
    fn record(&mut self, ctx: &mut PassContext) -> Result<()> {
        self(ctx)
    }
}

pub(crate) type BoxedPassExecutor = Box<dyn PassExecutor>;

/// An empty pass executor that does nothing
#[derive(Debug, Default)]
pub struct EmptyPassExecutor;

impl EmptyPassExecutor {
    /// Creates an empty pass executor
    pub fn new() -> Self {
        Self {}
    }

    /// Create a new empty pass executor in a [`Box`]
    pub fn new_boxed() -> Box<Self> {
        Box::new(Self::new())
    }
}

impl PassExecutor for EmptyPassExecutor {
    fn record(&mut self, _ctx: &mut PassContext) -> Result<()> {
        Ok(())
    }
}

/// Represents one pass in a render graph. You can obtain one using a [`PassBuilder`].
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Pass {
    pub(crate) name: String,
    pub(crate) kind: PassKind,
    pub(crate) color: Option<[f32; 4]>,
    pub(crate) shader_stages: PipelineStage,
    pub(crate) condition: Condition,
    pub(crate) default_enabled: bool,
    pub(crate) accesses: Vec<PassAccess>,
    #[derivative(Debug = "ignore")]
    pub(crate) execute: BoxedPassExecutor,
}

impl Pass {
    /// Get the pass name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the pass kind
    pub fn kind(&self) -> PassKind {
        self.kind
    }

    /// Get the shader stages this pass accesses resources in
    pub fn shader_stages(&self) -> PipelineStage {
        self.shader_stages
    }

    /// Get the declared accesses, in declaration order
    pub fn accesses(&self) -> &[PassAccess] {
        &self.accesses
    }

    /// Get the enable condition
    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    /// Find the access of this pass to a resource.
    pub fn access(&self, resource: ResourceId) -> Option<&PassAccess> {
        self.accesses.iter().find(|access| access.resource == resource)
    }

    /// All render target accesses, in declaration order.
    pub fn render_targets(&self) -> impl Iterator<Item = &PassAccess> {
        self.accesses
            .iter()
            .filter(|access| matches!(access.kind, AccessKind::RenderTarget { .. }))
    }

    /// Whether the pass begins a render pass before recording.
    pub fn has_render_targets(&self) -> bool {
        self.kind == PassKind::Graphics && self.render_targets().next().is_some()
    }
}

/// Used to create [`Pass`] objects correctly.
/// # Example
/// See the [`pass`](crate::graph::pass) module level documentation.
pub struct PassBuilder {
    inner: Pass,
}

impl PassBuilder {
    fn new(name: impl Into<String>, kind: PassKind) -> Self {
        PassBuilder {
            inner: Pass {
                name: name.into(),
                kind,
                color: None,
                shader_stages: kind.default_shader_stages(),
                condition: Condition::Always,
                default_enabled: true,
                accesses: vec![],
                execute: EmptyPassExecutor::new_boxed(),
            },
        }
    }

    /// Create a new graphics pass. This constructor is required for passes that render to any targets.
    pub fn graphics(name: impl Into<String>) -> Self {
        Self::new(name, PassKind::Graphics)
    }

    /// Create a new compute pass.
    pub fn compute(name: impl Into<String>) -> Self {
        Self::new(name, PassKind::Compute)
    }

    /// Set the color of this pass. This can show up in graphics debuggers like RenderDoc.
    pub fn color(mut self, color: [f32; 4]) -> Self {
        self.inner.color = Some(color);
        self
    }

    /// Override the shader stages that read, write and sample resources. Defaults to the fragment shader for
    /// graphics passes and the compute shader for compute passes.
    pub fn shader_stages(mut self, stages: PipelineStage) -> Self {
        self.inner.shader_stages = stages;
        self
    }

    /// Only enable this pass while `condition` holds.
    pub fn condition(mut self, condition: Condition) -> Self {
        self.inner.condition = condition;
        self
    }

    /// Set the initial value of the enable switch of this pass. Passes are enabled by default.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.inner.default_enabled = enabled;
        self
    }

    fn access(mut self, resource: ResourceId, kind: AccessKind, clear: Option<ClearValue>) -> Self {
        self.inner.accesses.push(PassAccess {
            resource,
            kind,
            clear,
        });
        self
    }

    /// Initialize the contents of a resource with transfer commands.
    pub fn init(self, resource: ResourceId) -> Self {
        self.access(resource, AccessKind::Init, None)
    }

    /// Read a resource as a storage image or storage buffer.
    pub fn read(self, resource: ResourceId) -> Self {
        self.access(resource, AccessKind::Read, None)
    }

    /// Write to a resource as a storage image or storage buffer.
    pub fn write(self, resource: ResourceId) -> Self {
        self.access(resource, AccessKind::Write, None)
    }

    /// Sample an image.
    pub fn sample(self, resource: ResourceId) -> Self {
        self.access(resource, AccessKind::SAMPLE, None)
    }

    /// Sample an image after regenerating its mip chain from the first level.
    pub fn sample_mipmapped(self, resource: ResourceId) -> Self {
        self.access(
            resource,
            AccessKind::Sample {
                needs_mipmap: true,
            },
            None,
        )
    }

    /// Render into an image. The attachment kind (color or depth) is derived from the image format.
    /// Targets loaded with [`vk::AttachmentLoadOp::CLEAR`] are cleared to zero, use
    /// [`PassBuilder::clear_color_target()`] or [`PassBuilder::clear_depth_target()`] to pick the clear value.
    pub fn render_to(self, resource: ResourceId, load_op: vk::AttachmentLoadOp, store_op: vk::AttachmentStoreOp) -> Self {
        self.access(
            resource,
            AccessKind::RenderTarget {
                load_op,
                store_op,
            },
            None,
        )
    }

    /// Render into a color image after clearing it.
    pub fn clear_color_target(self, resource: ResourceId, color: ClearColor) -> Self {
        self.access(
            resource,
            AccessKind::RenderTarget {
                load_op: vk::AttachmentLoadOp::CLEAR,
                store_op: vk::AttachmentStoreOp::STORE,
            },
            Some(ClearValue::Color(color)),
        )
    }

    /// Render into a depth image after clearing it.
    pub fn clear_depth_target(self, resource: ResourceId, clear: ClearDepthStencil) -> Self {
        self.access(
            resource,
            AccessKind::RenderTarget {
                load_op: vk::AttachmentLoadOp::CLEAR,
                store_op: vk::AttachmentStoreOp::STORE,
            },
            Some(ClearValue::DepthStencil(clear)),
        )
    }

    /// Render into an image, keeping its previous contents.
    pub fn load_target(self, resource: ResourceId) -> Self {
        self.render_to(resource, vk::AttachmentLoadOp::LOAD, vk::AttachmentStoreOp::STORE)
    }

    /// Set the executor of this pass.
    pub fn executor(mut self, executor: impl PassExecutor + 'static) -> Self {
        self.inner.execute = Box::new(executor);
        self
    }

    /// Set a function to be called when the pass is recorded.
    pub fn execute_fn<F>(self, exec: F) -> Self
    where
        F: FnMut(&mut PassContext) -> Result<()> + 'static,
    {
        self.executor(exec)
    }

    /// Obtain a built [`Pass`] object.
    pub fn build(self) -> Pass {
        self.inner
    }
}
