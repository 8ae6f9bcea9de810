//! Contexts handed to pass executors.

use anyhow::Result;
use ash::vk;

use crate::backend::Backend;
use crate::descriptor::layout::BindingSetLayout;
use crate::descriptor::manager::{BindingSetManager, SetMode};
use crate::descriptor::write::BindingWrite;
use crate::frame::command::{Command, CommandList};
use crate::graph::pass::{PassId, PassKind};
use crate::graph::physical_resource::PhysicalResources;
use crate::graph::resource::ResourceId;
use crate::graph::state::GraphState;
use crate::Error;

fn buffer_of(physical: &PhysicalResources, resource: ResourceId, frame: usize) -> Result<vk::Buffer> {
    let physical = physical.get(resource)?;
    physical
        .buffer(frame)
        .ok_or_else(|| Error::UnknownResource(format!("`{}` is not a buffer", physical.name())).into())
}

/// Context available to a pass while it records its work for a frame.
pub struct PassContext<'a> {
    pub(crate) frame_index: usize,
    pub(crate) pass: PassId,
    pub(crate) pass_name: &'a str,
    pub(crate) kind: PassKind,
    pub(crate) surface_extent: vk::Extent2D,
    pub(crate) commands: &'a mut CommandList,
    pub(crate) physical: &'a PhysicalResources,
    pub(crate) bindings: &'a BindingSetManager,
    pub(crate) state: &'a GraphState,
}

impl<'a> PassContext<'a> {
    /// Index of the frame in flight being recorded.
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Handle of the pass being recorded.
    pub fn pass(&self) -> PassId {
        self.pass
    }

    /// Name of the pass being recorded.
    pub fn pass_name(&self) -> &str {
        self.pass_name
    }

    /// Current size of the output surface.
    pub fn surface_extent(&self) -> vk::Extent2D {
        self.surface_extent
    }

    /// Current values of the conditional variables.
    pub fn state(&self) -> &GraphState {
        self.state
    }

    /// The view this pass uses for an image resource in the current frame.
    pub fn image_view(&self, resource: ResourceId) -> Result<vk::ImageView> {
        self.physical.view(self.pass, resource, self.frame_index)
    }

    /// The image backing a resource in the current frame.
    pub fn image(&self, resource: ResourceId) -> Result<vk::Image> {
        let physical = self.physical.get(resource)?;
        physical
            .image(self.frame_index)
            .ok_or_else(|| Error::UnknownResource(format!("`{}` is not an image", physical.name())).into())
    }

    /// The buffer backing a resource in the current frame.
    pub fn buffer(&self, resource: ResourceId) -> Result<vk::Buffer> {
        buffer_of(self.physical, resource, self.frame_index)
    }

    /// The physical binding set of a managed name in the current frame.
    pub fn binding_set(&self, name: &str) -> Result<vk::DescriptorSet> {
        self.bindings.set(name, self.frame_index)
    }

    /// Record a raw command.
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Bind a pipeline at the bind point of this pass.
    pub fn bind_pipeline(&mut self, pipeline: vk::Pipeline) {
        self.commands.push(Command::BindPipeline {
            bind_point: self.kind.bind_point(),
            pipeline,
        });
    }

    /// Bind the current frame's physical set of a managed name at `index`.
    pub fn bind_binding_set(&mut self, layout: vk::PipelineLayout, index: u32, name: &str) -> Result<()> {
        let set = self.binding_set(name)?;
        self.commands.push(Command::BindBindingSet {
            bind_point: self.kind.bind_point(),
            layout,
            index,
            set,
        });
        Ok(())
    }

    /// Record a non-indexed draw.
    pub fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) {
        self.commands.push(Command::Draw {
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        });
    }

    /// Record a compute dispatch.
    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.commands.push(Command::Dispatch {
            x,
            y,
            z,
        });
    }
}

/// Context available to a pass during ahead-of-time compilation. Physical resources exist, binding sets are not
/// allocated yet, so this is where a pass manages its sets and declares their writes.
pub struct CompileContext<'a> {
    pub(crate) pass: PassId,
    pub(crate) pass_name: &'a str,
    pub(crate) surface_extent: vk::Extent2D,
    pub(crate) frames_in_flight: usize,
    pub(crate) physical: &'a PhysicalResources,
    pub(crate) bindings: &'a mut BindingSetManager,
    pub(crate) backend: &'a mut dyn Backend,
}

impl<'a> CompileContext<'a> {
    /// Handle of the pass being compiled.
    pub fn pass(&self) -> PassId {
        self.pass
    }

    /// Name of the pass being compiled.
    pub fn pass_name(&self) -> &str {
        self.pass_name
    }

    /// Size of the output surface at compile time.
    pub fn surface_extent(&self) -> vk::Extent2D {
        self.surface_extent
    }

    /// Number of frames in flight.
    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    /// Start managing a binding set, see [`BindingSetManager::manage()`].
    pub fn manage(&mut self, name: &str, layout: &BindingSetLayout, mode: SetMode) -> Result<vk::DescriptorSetLayout> {
        self.bindings.manage(&mut *self.backend, name, layout, mode)
    }

    /// Queue a write into a binding set, see [`BindingSetManager::update()`].
    pub fn update(&mut self, name: &str, write: BindingWrite) -> Result<()> {
        self.bindings.update(name, write)
    }

    /// The view this pass uses for an image resource in a frame slot.
    pub fn image_view(&self, resource: ResourceId, frame: usize) -> Result<vk::ImageView> {
        self.physical.view(self.pass, resource, frame)
    }

    /// The buffer backing a resource in a frame slot.
    pub fn buffer(&self, resource: ResourceId, frame: usize) -> Result<vk::Buffer> {
        buffer_of(self.physical, resource, frame)
    }
}
