//! The render graph itself: construction, ahead-of-time compilation and per-frame recording.
//!
//! A [`RenderGraph`] goes through three stages.
//!
//! 1. Construction. Resources are declared, passes are added in execution order, and conditional variables are
//!    defined. Binding sets may already be managed and written to.
//! 2. [`RenderGraph::compile_ahead_of_time()`]. Called exactly once. Creates every physical resource, view and
//!    framebuffer, lets each pass prepare its binding sets, and allocates all binding sets.
//! 3. [`RenderGraph::record_frame()`]. Called once per frame. Waits for the frame slot, re-synthesizes barriers if
//!    the set of enabled passes changed, and records every enabled pass with its barriers in front of it.
//!
//! # Example
//! ```
//! use deimos::prelude::*;
//!
//! let settings = GraphSettingsBuilder::new().present("color").build();
//! let mut graph = RenderGraph::new(HeadlessBackend::new(2, 640, 480), settings);
//! let color = graph.declare_texture(
//!     "color",
//!     TextureDesc::new(vk::Format::R8G8B8A8_UNORM, ImageExtent::surface()),
//!     ResourceFlags::in_flight(),
//! );
//! graph.add_pass(
//!     PassBuilder::graphics("triangle")
//!         .clear_color_target(color, ClearColor::Float([0.0, 0.0, 0.0, 1.0]))
//!         .execute_fn(|ctx| {
//!             ctx.draw(3, 1, 0, 0);
//!             Ok(())
//!         })
//!         .build(),
//! )?;
//! graph.compile_ahead_of_time()?;
//!
//! for frame in 0..4 {
//!     let commands = graph.record_frame(frame % 2, 0)?;
//!     assert!(!commands.is_empty());
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use ash::vk;

use crate::backend::Backend;
use crate::core::settings::GraphSettings;
use crate::descriptor::layout::BindingSetLayout;
use crate::descriptor::manager::{BindingSetManager, SetMode};
use crate::descriptor::write::BindingWrite;
use crate::frame::command::{BufferBarrier, Command, CommandList, ImageBarrier, RenderTargetInfo};
use crate::frame::context::{CompileContext, PassContext};
use crate::frame::lifecycle::{LifecycleHook, PassLifecycle};
use crate::frame::present;
use crate::graph::access::AccessState;
use crate::graph::hazard::{resolve_first_touch, synthesize, touch_state, BarrierPlan, BarrierSource, PlannedBarrier};
use crate::graph::pass::{Pass, PassId, PassKind};
use crate::graph::physical_resource::{PhysicalResource, PhysicalResources, RetiredObject};
use crate::graph::registry::ResourceRegistry;
use crate::graph::resource::{
    AccessKind, BufferDesc, LogicalResource, ResourceFlags, ResourceId, ResourceType, TextureDesc,
};
use crate::graph::state::GraphState;
use crate::graph::viz::DependencyGraph;
use crate::util::deferred_delete::DeletionQueue;
use crate::Error;

/// A render graph over a [`Backend`].
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct RenderGraph<B: Backend> {
    #[derivative(Debug = "ignore")]
    pub(crate) backend: B,
    pub(crate) settings: GraphSettings,
    pub(crate) registry: ResourceRegistry,
    pub(crate) passes: Vec<Pass>,
    pub(crate) pass_names: HashMap<String, PassId>,
    pub(crate) lifecycles: Vec<PassLifecycle>,
    pub(crate) state: GraphState,
    pub(crate) bindings: BindingSetManager,
    pub(crate) physical: PhysicalResources,
    pub(crate) plan: Option<BarrierPlan>,
    pub(crate) retired: DeletionQueue<RetiredObject>,
    pub(crate) surface_extent: vk::Extent2D,
    pub(crate) frames_in_flight: usize,
    pub(crate) present: Option<ResourceId>,
    pub(crate) compiled: bool,
}

impl<B: Backend> RenderGraph<B> {
    /// Create an empty graph. The number of frames in flight is queried from the backend once, here.
    pub fn new(backend: B, settings: GraphSettings) -> Self {
        let frames_in_flight = backend.frames_in_flight().max(1);
        let retire_delay = settings.retire_delay.unwrap_or(frames_in_flight as u32);
        let surface_extent = backend.surface_extent();
        Self {
            backend,
            settings,
            registry: ResourceRegistry::new(),
            passes: vec![],
            pass_names: HashMap::new(),
            lifecycles: vec![],
            state: GraphState::default(),
            bindings: BindingSetManager::new(frames_in_flight),
            physical: PhysicalResources::new(frames_in_flight),
            plan: None,
            retired: DeletionQueue::new(retire_delay),
            surface_extent,
            frames_in_flight,
            present: None,
            compiled: false,
        }
    }

    /// Declare a texture. Declaring a name twice creates a second resource, lookups by name return the newest.
    pub fn declare_texture(&mut self, name: impl Into<String>, desc: TextureDesc, flags: ResourceFlags) -> ResourceId {
        self.registry.declare_texture(name, desc, flags)
    }

    /// Declare a buffer. Declaring a name twice creates a second resource, lookups by name return the newest.
    pub fn declare_buffer(&mut self, name: impl Into<String>, desc: BufferDesc, flags: ResourceFlags) -> ResourceId {
        self.registry.declare_buffer(name, desc, flags)
    }

    fn validate_access(&self, pass: &Pass, access_resource: ResourceId, kind: &AccessKind) -> Result<()> {
        let resource = self.registry.get(access_resource)?;
        let illegal = |access: &'static str| -> anyhow::Error {
            Error::IllegalAccess {
                pass: pass.name().to_owned(),
                resource: resource.name().to_owned(),
                access,
            }
            .into()
        };
        match (kind, resource.resource_type()) {
            (
                AccessKind::RenderTarget {
                    ..
                },
                ResourceType::Buffer,
            ) => Err(illegal("render target (buffers cannot be rendered to)")),
            (
                AccessKind::RenderTarget {
                    ..
                },
                ResourceType::Image,
            ) if pass.kind() == PassKind::Compute => Err(illegal("render target (compute passes have no targets)")),
            (
                AccessKind::Sample {
                    ..
                },
                ResourceType::Buffer,
            ) => Err(illegal("sampled (buffers cannot be sampled)")),
            _ => Ok(()),
        }
    }

    /// Add a pass. Passes execute in the order they are added. All accesses of the pass are appended to the touch
    /// lists of their resources.
    /// # Errors
    /// * Fails if the graph was already compiled.
    /// * Fails if a pass with this name already exists.
    /// * Fails if the pass accesses an unknown resource, accesses one resource twice, or uses an access that is not
    ///   legal for the pass kind or resource type.
    pub fn add_pass(&mut self, pass: Pass) -> Result<PassId> {
        if self.compiled {
            return Err(Error::AlreadyCompiled.into());
        }
        if self.pass_names.contains_key(pass.name()) {
            return Err(Error::DuplicatePass(pass.name().to_owned()).into());
        }
        let mut seen = HashSet::new();
        for access in pass.accesses() {
            self.validate_access(&pass, access.resource, &access.kind)?;
            if !seen.insert(access.resource) {
                return Err(Error::DuplicateAccess {
                    pass: pass.name().to_owned(),
                    resource: self.registry.get(access.resource)?.name().to_owned(),
                }
                .into());
            }
        }

        let id = PassId(self.passes.len());
        for access in pass.accesses() {
            self.registry.record_access(access.resource, id, access.kind)?;
        }
        debug!("Added pass `{}` as #{}", pass.name(), id.index());
        self.pass_names.insert(pass.name().to_owned(), id);
        self.passes.push(pass);
        self.lifecycles.push(PassLifecycle::default());
        Ok(id)
    }

    /// Define a boolean conditional variable.
    pub fn define_bool_variable(&mut self, name: impl Into<String>, value: bool) {
        self.state.define_bool(name, value);
    }

    /// Define a switch conditional variable.
    pub fn define_switch_variable<S: Into<String>>(
        &mut self,
        name: impl Into<String>,
        cases: impl IntoIterator<Item = S>,
        initial: &str,
    ) -> Result<()> {
        self.state.define_switch(name, cases, initial)
    }

    /// Set a boolean conditional variable. Takes effect on the next recorded frame.
    pub fn set_bool_variable(&mut self, name: &str, value: bool) -> Result<()> {
        self.state.set_bool(name, value)
    }

    /// Set a switch conditional variable. Takes effect on the next recorded frame.
    pub fn set_switch_variable(&mut self, name: &str, case: &str) -> Result<()> {
        self.state.set_switch(name, case)
    }

    /// Turn on the enable switch of a pass. The pass still only runs if its condition holds.
    pub fn enable_pass(&mut self, name: &str) -> Result<()> {
        self.pass_id(name)?;
        self.state.set_pass_enabled(name, true);
        Ok(())
    }

    /// Turn off the enable switch of a pass.
    pub fn disable_pass(&mut self, name: &str) -> Result<()> {
        self.pass_id(name)?;
        self.state.set_pass_enabled(name, false);
        Ok(())
    }

    /// Start managing a binding set, see [`BindingSetManager::manage()`].
    pub fn manage_binding_set(
        &mut self,
        name: &str,
        layout: &BindingSetLayout,
        mode: SetMode,
    ) -> Result<vk::DescriptorSetLayout> {
        self.bindings.manage(&mut self.backend, name, layout, mode)
    }

    /// Queue a write into a binding set, see [`BindingSetManager::update()`]. After compilation, writes are applied
    /// at the start of the next recorded frame that uses the set. A write into a shared set makes that frame wait for
    /// every frame in flight first.
    /// # Errors
    /// * Fails with [`Error::SharedSetInFlightResource`] if `name` is a shared set and the write points at a
    ///   resource that has one allocation per frame in flight.
    pub fn update_binding_set(&mut self, name: &str, write: BindingWrite) -> Result<()> {
        if let (Some(SetMode::Shared), Some(resource)) = (self.bindings.mode(name), write.graph_resource()) {
            let resource = self.registry.get(resource)?;
            if resource.is_multiplied() {
                return Err(Error::SharedSetInFlightResource {
                    set: name.to_owned(),
                    resource: resource.name().to_owned(),
                }
                .into());
            }
        }
        self.bindings.update(name, write)
    }

    /// Allocate binding sets that were managed after compilation, and flush pending writes.
    /// # Errors
    /// * Fails with [`Error::NotCompiled`] before [`RenderGraph::compile_ahead_of_time()`].
    pub fn allocate_binding_sets(&mut self) -> Result<()> {
        if !self.compiled {
            return Err(Error::NotCompiled.into());
        }
        self.bindings.allocate_all(&mut self.backend, &self.physical)
    }

    fn validate(&mut self) -> Result<()> {
        for pass in &self.passes {
            for variable in pass.condition().variables() {
                if !self.state.is_defined(variable) {
                    return Err(Error::UnknownVariable(variable.to_owned()).into());
                }
            }
        }
        self.present = match &self.settings.present {
            None => None,
            Some(name) => {
                let id = self
                    .registry
                    .lookup(name)
                    .ok_or_else(|| Error::UnknownResource(name.clone()))?;
                if self.registry.get(id)?.resource_type() != ResourceType::Image {
                    return Err(Error::IllegalAccess {
                        pass: String::from("<present>"),
                        resource: name.clone(),
                        access: "present source (only images can be presented)",
                    }
                    .into());
                }
                Some(id)
            }
        };
        if let Some(name) = &self.settings.frame_binding_set {
            if !self.bindings.is_managed(name) {
                return Err(Error::SetNotManaged(name.clone()).into());
            }
        }
        Ok(())
    }

    /// Compile the graph ahead of time: create all physical resources, views and framebuffers, call
    /// [`PassExecutor::prepare_ahead_of_time()`](crate::PassExecutor::prepare_ahead_of_time) on every pass, then
    /// allocate all binding sets and flush their writes. Must be called exactly once, before the first frame.
    /// # Errors
    /// * Fails with [`Error::AlreadyCompiled`] if called twice.
    /// * Fails if a pass condition refers to an undefined variable, the present resource does not exist or is not
    ///   an image, or the frame binding set is not managed.
    /// * Fails if the backend cannot allocate a resource, view, framebuffer or binding set. Physical resources
    ///   created so far are destroyed again, so compiling can be retried.
    pub fn compile_ahead_of_time(&mut self) -> Result<()> {
        if self.compiled {
            return Err(Error::AlreadyCompiled.into());
        }
        self.compile().map_err(|err| {
            self.physical.release(&mut self.backend);
            err
        })
    }

    fn compile(&mut self) -> Result<()> {
        self.validate()?;
        self.surface_extent = self.backend.surface_extent();

        self.physical
            .allocate_all(&mut self.backend, &self.registry, &self.passes, self.surface_extent, self.present)?;

        for (index, pass) in self.passes.iter_mut().enumerate() {
            let mut ctx = CompileContext {
                pass: PassId(index),
                pass_name: &pass.name,
                surface_extent: self.surface_extent,
                frames_in_flight: self.frames_in_flight,
                physical: &self.physical,
                bindings: &mut self.bindings,
                backend: &mut self.backend,
            };
            pass.execute.prepare_ahead_of_time(&mut ctx)?;
        }

        self.bindings.allocate_all(&mut self.backend, &self.physical)?;
        let enabled = self.enabled_passes();
        self.current_plan(&enabled);
        self.compiled = true;
        info!(
            "Compiled render graph `{}`: {} passes, {} resources, {} frames in flight",
            self.settings.name,
            self.passes.len(),
            self.registry.len(),
            self.frames_in_flight
        );
        Ok(())
    }

    /// Whether each pass is enabled under the current state, indexed by pass.
    pub fn enabled_passes(&self) -> Vec<bool> {
        self.passes
            .iter()
            .map(|pass| {
                self.state.pass_switch(pass.name()).unwrap_or(pass.default_enabled) && pass.condition().evaluate(&self.state)
            })
            .collect()
    }

    /// Return the cached barrier plan, synthesizing a new one if the set of enabled passes changed.
    fn current_plan(&mut self, enabled: &[bool]) -> &BarrierPlan {
        let stale = self.plan.as_ref().map_or(true, |plan| plan.topology() != enabled);
        if stale {
            debug!("Enabled passes changed, synthesizing barriers for graph `{}`", self.settings.name);
            self.plan = Some(synthesize(&self.registry, &self.passes, enabled));
        }
        self.plan.get_or_insert_with(BarrierPlan::default)
    }

    fn resolve_barriers(
        physical: &PhysicalResources,
        planned: &[PlannedBarrier],
        frame_index: usize,
    ) -> Result<(Vec<ImageBarrier>, Vec<BufferBarrier>)> {
        let mut images = Vec::new();
        let mut buffers = Vec::new();
        for barrier in planned {
            let resource = physical.get(barrier.resource)?;
            let src = match barrier.src {
                BarrierSource::Touch {
                    state,
                    ..
                } => state,
                BarrierSource::LastObserved => {
                    let last = resource.last_observed(frame_index);
                    match resolve_first_touch(barrier.ty, resource.is_multiplied(), &last, &barrier.dst) {
                        Some(src) => src,
                        None => continue,
                    }
                }
            };
            match barrier.ty {
                ResourceType::Image => {
                    images.push(Self::image_barrier(resource, barrier.resource, frame_index, src, barrier.dst)?)
                }
                ResourceType::Buffer => buffers.push(BufferBarrier {
                    resource: barrier.resource,
                    buffer: resource
                        .buffer(frame_index)
                        .ok_or_else(|| Error::UnknownResource(resource.name().to_owned()))?,
                    src,
                    dst: barrier.dst,
                }),
            }
        }
        Ok((images, buffers))
    }

    pub(crate) fn image_barrier(
        resource: &PhysicalResource,
        id: ResourceId,
        frame_index: usize,
        src: AccessState,
        dst: AccessState,
    ) -> Result<ImageBarrier> {
        Ok(ImageBarrier {
            resource: Some(id),
            image: resource
                .image(frame_index)
                .ok_or_else(|| Error::UnknownResource(resource.name().to_owned()))?,
            src,
            dst,
            aspect: resource.aspect(),
            mip_levels: resource.mip_levels(),
            layers: resource.layers(),
        })
    }

    fn render_targets(&self, id: PassId, pass: &Pass, frame_index: usize) -> Result<Vec<RenderTargetInfo>> {
        pass.render_targets()
            .map(|target| {
                let AccessKind::RenderTarget {
                    load_op,
                    store_op,
                } = target.kind
                else {
                    return Err(Error::Uncategorized("render target access expected").into());
                };
                let format = self.registry.get(target.resource)?.desc().format();
                Ok(RenderTargetInfo {
                    resource: target.resource,
                    view: self.physical.view(id, target.resource, frame_index)?,
                    layout: touch_state(pass, &target.kind, format).layout,
                    load_op,
                    store_op,
                    clear: target.clear,
                })
            })
            .collect()
    }

    fn render_area(&self, pass: &Pass) -> vk::Extent2D {
        pass.render_targets()
            .filter_map(|target| self.physical.get(target.resource).ok())
            .fold(None, |area: Option<vk::Extent2D>, physical| {
                let extent = physical.extent();
                Some(match area {
                    None => vk::Extent2D {
                        width: extent.width,
                        height: extent.height,
                    },
                    Some(area) => vk::Extent2D {
                        width: area.width.min(extent.width),
                        height: area.height.min(extent.height),
                    },
                })
            })
            .unwrap_or(self.surface_extent)
    }

    /// Record one frame.
    ///
    /// Blocks until the backend reports that the previous use of `frame_index` completed, destroys objects whose
    /// retire delay expired, and applies the pending writes of the binding sets this slot uses. If a shared set has
    /// pending writes, every frame in flight is waited on first. Then every enabled pass is recorded in order:
    /// lifecycle hooks, debug label, frame binding set, barriers, [`PassExecutor::prepare()`](crate::PassExecutor::prepare),
    /// mip generation, render pass and [`PassExecutor::record()`](crate::PassExecutor::record). Finally the present
    /// resource is copied into output surface image `output_image_index`, and the last observed state of every
    /// touched allocation is updated.
    /// # Errors
    /// * Fails with [`Error::NotCompiled`] before [`RenderGraph::compile_ahead_of_time()`].
    /// * Fails with [`Error::FrameIndexOutOfRange`] if `frame_index` is not smaller than the number of frames in flight.
    /// * Fails if a pass executor fails. The access records and pass lifecycles are not updated in that case, so the
    ///   lifecycle hooks of this frame fire again on the next one.
    pub fn record_frame(&mut self, frame_index: usize, output_image_index: u32) -> Result<CommandList> {
        if !self.compiled {
            return Err(Error::NotCompiled.into());
        }
        if frame_index >= self.frames_in_flight {
            return Err(Error::FrameIndexOutOfRange(frame_index).into());
        }

        if self.bindings.has_queued_shared_writes() {
            debug!("Shared binding sets were written, waiting for all frames in flight");
            self.backend.wait_idle()?;
        }
        self.backend.wait_for_frame(frame_index)?;
        for object in self.retired.next_frame() {
            #[cfg(feature = "log-objects")]
            trace!("Destroying retired object {object:?}");
            object.destroy(&mut self.backend);
        }
        self.bindings.flush(&mut self.backend, &self.physical, frame_index)?;

        let enabled = self.enabled_passes();
        let plan = self.current_plan(&enabled).clone();
        let mut commands = CommandList::new(frame_index);
        let mut lifecycles = self.lifecycles.clone();

        for index in 0..self.passes.len() {
            let id = PassId(index);
            let hook = lifecycles[index].advance(enabled[index]);
            if !enabled[index] {
                continue;
            }

            match hook {
                Some(LifecycleHook::FirstEnable) => {
                    debug!("Pass `{}` enabled for the first time", self.passes[index].name());
                    self.passes[index].execute.on_first_enable()?;
                }
                Some(LifecycleHook::SwitchToEnable) => {
                    debug!("Pass `{}` enabled again", self.passes[index].name());
                    self.passes[index].execute.on_switch_to_enable()?;
                }
                None => {}
            }

            if cfg!(feature = "debug-markers") && self.settings.debug_labels {
                let pass = &self.passes[index];
                commands.push(Command::BeginLabel {
                    name: pass.name().to_owned(),
                    color: pass.color.unwrap_or([1.0, 1.0, 1.0, 1.0]),
                });
            }

            if let Some(name) = &self.settings.frame_binding_set {
                commands.push(Command::BindBindingSet {
                    bind_point: self.passes[index].kind().bind_point(),
                    layout: self.settings.frame_pipeline_layout,
                    index: 0,
                    set: self.bindings.set(name, frame_index)?,
                });
            }

            let (images, buffers) = Self::resolve_barriers(&self.physical, plan.barriers(id), frame_index)?;
            if !images.is_empty() || !buffers.is_empty() {
                trace!(
                    "Pass `{}`: {} image barriers, {} buffer barriers",
                    self.passes[index].name(),
                    images.len(),
                    buffers.len()
                );
                commands.push(Command::PipelineBarrier {
                    images,
                    buffers,
                });
            }

            let (targets, area) = if self.passes[index].has_render_targets() {
                let pass = &self.passes[index];
                (Some(self.render_targets(id, pass, frame_index)?), self.render_area(pass))
            } else {
                (None, self.surface_extent)
            };

            let mut mipmaps = Vec::new();
            for access in self.passes[index].accesses() {
                if let AccessKind::Sample {
                    needs_mipmap: true,
                } = access.kind
                {
                    let physical = self.physical.get(access.resource)?;
                    if physical.mip_levels() > 1 {
                        mipmaps.push(Command::GenerateMipmaps {
                            resource: access.resource,
                            image: physical
                                .image(frame_index)
                                .ok_or_else(|| Error::UnknownResource(physical.name().to_owned()))?,
                            extent: physical.extent(),
                            mip_levels: physical.mip_levels(),
                            layers: physical.layers(),
                            aspect: physical.aspect(),
                        });
                    }
                }
            }

            let pass = &mut self.passes[index];
            let mut ctx = PassContext {
                frame_index,
                pass: id,
                pass_name: &pass.name,
                kind: pass.kind,
                surface_extent: self.surface_extent,
                commands: &mut commands,
                physical: &self.physical,
                bindings: &self.bindings,
                state: &self.state,
            };
            pass.execute.prepare(&mut ctx)?;
            for command in mipmaps {
                ctx.push(command);
            }
            if let Some(targets) = targets {
                ctx.push(Command::BeginRenderPass {
                    pass: id,
                    framebuffer: self
                        .physical
                        .framebuffer(id, frame_index)
                        .ok_or(Error::Uncategorized("graphics pass has no framebuffer"))?,
                    extent: area,
                    targets,
                });
                pass.execute.record(&mut ctx)?;
                ctx.push(Command::EndRenderPass);
            } else {
                pass.execute.record(&mut ctx)?;
            }

            if cfg!(feature = "debug-markers") && self.settings.debug_labels {
                commands.push(Command::EndLabel);
            }
        }

        let present_state = match self.present {
            Some(resource) => Some(present::composite(self, &plan, resource, frame_index, output_image_index, &mut commands)?),
            None => None,
        };

        self.lifecycles = lifecycles;
        for (id, _) in self.registry.iter() {
            let state = match (self.present, present_state) {
                (Some(present), Some(state)) if present == id => Some(state),
                _ => plan.final_touch(id).map(|touch| touch.state),
            };
            if let (Some(state), Some(physical)) = (state, self.physical.get_mut(id)) {
                physical.set_last_observed(frame_index, state);
            }
        }

        Ok(commands)
    }

    /// Destroy every physical resource and binding set owned by the graph. The graph must not be used afterwards.
    pub fn destroy(&mut self) {
        self.physical.retire_all(&mut self.retired);
        for object in self.retired.drain_all() {
            object.destroy(&mut self.backend);
        }
        self.bindings.destroy(&mut self.backend);
        self.compiled = false;
    }

    fn pass_id(&self, name: &str) -> Result<PassId> {
        self.pass_names
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownPass(name.to_owned()).into())
    }

    /// Look up a resource by name.
    pub fn resource(&self, name: &str) -> Result<ResourceId> {
        self.registry
            .lookup(name)
            .ok_or_else(|| Error::UnknownResource(name.to_owned()).into())
    }

    /// Get the logical side of a resource.
    pub fn logical(&self, resource: ResourceId) -> Result<&LogicalResource> {
        self.registry.get(resource)
    }

    /// Look up a pass by name.
    pub fn pass(&self, name: &str) -> Result<PassId> {
        self.pass_id(name)
    }

    /// Get a pass by handle.
    pub fn pass_info(&self, pass: PassId) -> Result<&Pass> {
        self.passes
            .get(pass.index())
            .ok_or_else(|| Error::UnknownPass(format!("#{}", pass.index())).into())
    }

    /// Barriers planned before a pass by the most recent synthesis. Empty before compilation.
    pub fn barriers(&self, pass: PassId) -> &[PlannedBarrier] {
        self.plan.as_ref().map_or(&[], |plan| plan.barriers(pass))
    }

    /// The most recent barrier plan, if the graph was compiled.
    pub fn barrier_plan(&self) -> Option<&BarrierPlan> {
        self.plan.as_ref()
    }

    /// Dependency graph of the most recent barrier plan, for graphviz export.
    pub fn dependency_graph(&self) -> DependencyGraph {
        let plan = match &self.plan {
            Some(plan) => plan.clone(),
            None => synthesize(&self.registry, &self.passes, &self.enabled_passes()),
        };
        DependencyGraph::new(&self.registry, &self.passes, &plan)
    }

    /// Get the physical side of a resource.
    /// # Errors
    /// * Fails if the graph is not compiled or the resource was never allocated.
    pub fn physical(&self, resource: ResourceId) -> Result<&PhysicalResource> {
        self.physical.get(resource)
    }

    /// The view a pass uses for a resource in a frame slot.
    pub fn view(&self, pass: PassId, resource: ResourceId, frame: usize) -> Result<vk::ImageView> {
        self.physical.view(pass, resource, frame)
    }

    /// The framebuffer of a pass in a frame slot.
    pub fn framebuffer(&self, pass: PassId, frame: usize) -> Option<vk::Framebuffer> {
        self.physical.framebuffer(pass, frame)
    }

    /// The physical binding set of a managed name in a frame slot.
    pub fn binding_set(&self, name: &str, frame: usize) -> Result<vk::DescriptorSet> {
        self.bindings.set(name, frame)
    }

    /// The binding set manager.
    pub fn bindings(&self) -> &BindingSetManager {
        &self.bindings
    }

    /// Lifecycle state of a pass after the most recent frame.
    pub fn lifecycle(&self, pass: PassId) -> Option<PassLifecycle> {
        self.lifecycles.get(pass.index()).copied()
    }

    /// Current values of the conditional variables.
    pub fn state(&self) -> &GraphState {
        &self.state
    }

    /// The graph settings.
    pub fn settings(&self) -> &GraphSettings {
        &self.settings
    }

    /// Number of frames in flight.
    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    /// Output surface size the physical resources were created for.
    pub fn surface_extent(&self) -> vk::Extent2D {
        self.surface_extent
    }

    /// Whether [`RenderGraph::compile_ahead_of_time()`] was called.
    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    /// Number of retired objects waiting for destruction.
    pub fn retired_count(&self) -> usize {
        self.retired.len()
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The backend, mutably.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}
