//! The backing resource allocator maps logical resources to physical images and buffers.
//!
//! A resource that is neither persistent nor synchronized across frames is multiplied: it gets one allocation per
//! frame in flight, and each frame only ever touches its own. Every other resource gets exactly one allocation,
//! shared by all frames. Each allocation carries an access record, the last state it was observed in, which is the
//! only state carried over from one frame to the next.
//!
//! Passes never use images directly but through views, one per `(pass, resource)` pair and allocation. Graphics
//! passes with render targets additionally get framebuffers.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use ash::vk;

use crate::backend::{
    AttachmentInfo, Backend, BufferCreateInfo, FramebufferCreateInfo, ImageCreateInfo, ImageViewCreateInfo,
};
use crate::descriptor::write::ResolveBinding;
use crate::graph::access::AccessState;
use crate::graph::hazard::touch_state;
use crate::graph::pass::{Pass, PassId};
use crate::graph::registry::ResourceRegistry;
use crate::graph::resource::{image_aspect, is_depth_format, AccessKind, LogicalResource, ResourceDesc, ResourceId};
use crate::util::deferred_delete::DeletionQueue;
use crate::Error;

/// A device object that is no longer used by the graph, waiting for destruction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RetiredObject {
    /// Image and its memory
    Image(vk::Image),
    /// Image view
    ImageView(vk::ImageView),
    /// Buffer and its memory
    Buffer(vk::Buffer),
    /// Framebuffer
    Framebuffer(vk::Framebuffer),
}

impl RetiredObject {
    /// Destroy the object.
    pub fn destroy(self, backend: &mut dyn Backend) {
        match self {
            RetiredObject::Image(image) => backend.destroy_image(image),
            RetiredObject::ImageView(view) => backend.destroy_image_view(view),
            RetiredObject::Buffer(buffer) => backend.destroy_buffer(buffer),
            RetiredObject::Framebuffer(framebuffer) => backend.destroy_framebuffer(framebuffer),
        }
    }
}

impl From<PhysicalObject> for RetiredObject {
    fn from(object: PhysicalObject) -> Self {
        match object {
            PhysicalObject::Image(image) => RetiredObject::Image(image),
            PhysicalObject::Buffer(buffer) => RetiredObject::Buffer(buffer),
        }
    }
}

/// Handle of one physical allocation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PhysicalObject {
    /// An image
    Image(vk::Image),
    /// A buffer
    Buffer(vk::Buffer),
}

/// One physical allocation together with its access record.
#[derive(Debug, Copy, Clone)]
pub struct Allocation {
    object: PhysicalObject,
    last_observed: AccessState,
}

impl Allocation {
    /// The physical object
    pub fn object(&self) -> PhysicalObject {
        self.object
    }

    /// The last state this allocation was observed in, after the last frame that used it.
    pub fn last_observed(&self) -> AccessState {
        self.last_observed
    }
}

/// The physical side of a logical resource.
#[derive(Debug, Clone)]
pub struct PhysicalResource {
    name: String,
    desc: ResourceDesc,
    multiplied: bool,
    extent: vk::Extent3D,
    size: vk::DeviceSize,
    image_usage: vk::ImageUsageFlags,
    buffer_usage: vk::BufferUsageFlags,
    allocations: Vec<Allocation>,
}

impl PhysicalResource {
    /// Name of the logical resource
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether there is one allocation per frame in flight.
    pub fn is_multiplied(&self) -> bool {
        self.multiplied
    }

    /// Number of physical allocations.
    pub fn allocation_count(&self) -> usize {
        self.allocations.len()
    }

    fn slot(&self, frame: usize) -> usize {
        if self.multiplied {
            frame % self.allocations.len().max(1)
        } else {
            0
        }
    }

    /// The allocation backing a frame slot.
    pub fn allocation(&self, frame: usize) -> &Allocation {
        &self.allocations[self.slot(frame)]
    }

    /// The image backing a frame slot, `None` for buffers.
    pub fn image(&self, frame: usize) -> Option<vk::Image> {
        match self.allocation(frame).object {
            PhysicalObject::Image(image) => Some(image),
            PhysicalObject::Buffer(_) => None,
        }
    }

    /// The buffer backing a frame slot, `None` for images.
    pub fn buffer(&self, frame: usize) -> Option<vk::Buffer> {
        match self.allocation(frame).object {
            PhysicalObject::Buffer(buffer) => Some(buffer),
            PhysicalObject::Image(_) => None,
        }
    }

    /// Resolved image size. Zero for buffers.
    pub fn extent(&self) -> vk::Extent3D {
        self.extent
    }

    /// Resolved buffer size. Zero for images.
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    /// Inferred image usage, including the usage given in the description.
    pub fn image_usage(&self) -> vk::ImageUsageFlags {
        self.image_usage
    }

    /// Inferred buffer usage, including the usage given in the description.
    pub fn buffer_usage(&self) -> vk::BufferUsageFlags {
        self.buffer_usage
    }

    /// The image aspect, derived from the format.
    pub fn aspect(&self) -> vk::ImageAspectFlags {
        self.desc.format().map(image_aspect).unwrap_or(vk::ImageAspectFlags::empty())
    }

    /// Number of mip levels, 1 for buffers.
    pub fn mip_levels(&self) -> u32 {
        match &self.desc {
            ResourceDesc::Texture(texture) => texture.mip_levels,
            ResourceDesc::Buffer(_) => 1,
        }
    }

    /// Number of array layers, 1 for buffers.
    pub fn layers(&self) -> u32 {
        match &self.desc {
            ResourceDesc::Texture(texture) => texture.layers,
            ResourceDesc::Buffer(_) => 1,
        }
    }

    /// Last observed state of the allocation backing a frame slot.
    pub fn last_observed(&self, frame: usize) -> AccessState {
        self.allocation(frame).last_observed
    }

    pub(crate) fn set_last_observed(&mut self, frame: usize, state: AccessState) {
        let slot = self.slot(frame);
        self.allocations[slot].last_observed = state;
    }

    fn destroy(self, backend: &mut dyn Backend) {
        for allocation in self.allocations {
            RetiredObject::from(allocation.object).destroy(backend);
        }
    }
}

fn extent_3d((width, height, depth): (u32, u32, u32)) -> vk::Extent3D {
    vk::Extent3D {
        width,
        height,
        depth,
    }
}

fn same_extent(a: vk::Extent3D, b: vk::Extent3D) -> bool {
    a.width == b.width && a.height == b.height && a.depth == b.depth
}

/// Derive image usage flags from the way passes touch a resource.
pub fn infer_image_usage(resource: &LogicalResource, presented: bool) -> vk::ImageUsageFlags {
    let format = resource.desc().format().unwrap_or(vk::Format::UNDEFINED);
    let mut usage = match resource.desc() {
        ResourceDesc::Texture(texture) => texture.extra_usage,
        ResourceDesc::Buffer(_) => vk::ImageUsageFlags::empty(),
    };
    for touch in resource.touches() {
        usage |= match touch.access {
            AccessKind::Init => vk::ImageUsageFlags::TRANSFER_DST,
            AccessKind::Read | AccessKind::Write => vk::ImageUsageFlags::STORAGE,
            AccessKind::Sample {
                needs_mipmap: false,
            } => vk::ImageUsageFlags::SAMPLED,
            AccessKind::Sample {
                needs_mipmap: true,
            } => {
                vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::TRANSFER_DST
            }
            AccessKind::RenderTarget {
                ..
            } => {
                if is_depth_format(format) {
                    vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT
                } else {
                    vk::ImageUsageFlags::COLOR_ATTACHMENT
                }
            }
        };
    }
    if presented {
        usage |= vk::ImageUsageFlags::TRANSFER_SRC;
    }
    usage
}

/// Derive buffer usage flags from the way passes touch a resource.
pub fn infer_buffer_usage(resource: &LogicalResource) -> vk::BufferUsageFlags {
    let mut usage = match resource.desc() {
        ResourceDesc::Buffer(buffer) => buffer.extra_usage,
        ResourceDesc::Texture(_) => vk::BufferUsageFlags::empty(),
    };
    for touch in resource.touches() {
        usage |= match touch.access {
            AccessKind::Init => vk::BufferUsageFlags::TRANSFER_DST,
            AccessKind::Read | AccessKind::Write => vk::BufferUsageFlags::STORAGE_BUFFER,
            _ => vk::BufferUsageFlags::empty(),
        };
    }
    usage
}

/// Owns all physical resources, views and framebuffers of a graph.
#[derive(Debug, Default)]
pub struct PhysicalResources {
    frames_in_flight: usize,
    resources: Vec<Option<PhysicalResource>>,
    views: HashMap<(PassId, ResourceId), Vec<vk::ImageView>>,
    framebuffers: HashMap<PassId, Vec<vk::Framebuffer>>,
}

impl PhysicalResources {
    /// Create an empty allocator.
    pub fn new(frames_in_flight: usize) -> Self {
        Self {
            frames_in_flight: frames_in_flight.max(1),
            ..Default::default()
        }
    }

    /// Create every physical resource, view and framebuffer. Resources that no pass touches are not allocated.
    /// Objects from an earlier call are destroyed first. If any creation fails, everything created so far is
    /// destroyed again and the allocator is left empty.
    pub fn allocate_all(
        &mut self,
        backend: &mut dyn Backend,
        registry: &ResourceRegistry,
        passes: &[Pass],
        surface: vk::Extent2D,
        present: Option<ResourceId>,
    ) -> Result<()> {
        self.release(backend);
        self.resources = vec![None; registry.len()];
        if let Err(err) = self.create_all(backend, registry, passes, surface, present) {
            self.release(backend);
            return Err(err);
        }
        debug!(
            "Allocated {} physical resources, {} views and {} framebuffers",
            self.resources.iter().flatten().map(PhysicalResource::allocation_count).sum::<usize>(),
            self.views.values().map(Vec::len).sum::<usize>(),
            self.framebuffers.values().map(Vec::len).sum::<usize>(),
        );
        Ok(())
    }

    fn create_all(
        &mut self,
        backend: &mut dyn Backend,
        registry: &ResourceRegistry,
        passes: &[Pass],
        surface: vk::Extent2D,
        present: Option<ResourceId>,
    ) -> Result<()> {
        for (id, resource) in registry.iter() {
            if resource.touches().is_empty() && present != Some(id) {
                warn!("Resource `{}` is never touched by any pass and will not be allocated", resource.name());
                continue;
            }
            let physical = self.create_resource(backend, resource, surface, present == Some(id))?;
            let views = Self::create_views(backend, resource, id, &physical, passes);
            self.resources[id.index()] = Some(physical);
            self.views.extend(views?);
        }
        for (index, pass) in passes.iter().enumerate() {
            if let Some(framebuffers) = self.create_framebuffers(backend, registry, PassId(index), pass)? {
                self.framebuffers.insert(PassId(index), framebuffers);
            }
        }
        Ok(())
    }

    /// Create the allocations of one resource. On failure, the allocations created so far are destroyed.
    fn create_resource(
        &self,
        backend: &mut dyn Backend,
        resource: &LogicalResource,
        surface: vk::Extent2D,
        presented: bool,
    ) -> Result<PhysicalResource> {
        let multiplied = resource.is_multiplied();
        let count = if multiplied {
            self.frames_in_flight
        } else {
            1
        };
        let allocation_name = |index: usize| {
            if multiplied {
                format!("{}@{index}", resource.name())
            } else {
                resource.name().to_owned()
            }
        };

        let mut physical = PhysicalResource {
            name: resource.name().to_owned(),
            desc: *resource.desc(),
            multiplied,
            extent: extent_3d((0, 0, 0)),
            size: 0,
            image_usage: vk::ImageUsageFlags::empty(),
            buffer_usage: vk::BufferUsageFlags::empty(),
            allocations: Vec::with_capacity(count),
        };

        for index in 0..count {
            let object = match resource.desc() {
                ResourceDesc::Texture(texture) => {
                    physical.extent = extent_3d(texture.extent.resolve(surface));
                    physical.image_usage = infer_image_usage(resource, presented);
                    backend
                        .create_image(&ImageCreateInfo {
                            name: allocation_name(index),
                            format: texture.format,
                            extent: physical.extent,
                            mip_levels: texture.mip_levels,
                            layers: texture.layers,
                            samples: texture.samples,
                            usage: physical.image_usage,
                        })
                        .map(PhysicalObject::Image)
                }
                ResourceDesc::Buffer(buffer) => {
                    physical.size = buffer.size.resolve(surface);
                    physical.buffer_usage = infer_buffer_usage(resource);
                    backend
                        .create_buffer(&BufferCreateInfo {
                            name: allocation_name(index),
                            size: physical.size,
                            usage: physical.buffer_usage,
                            memory: buffer.memory,
                        })
                        .map(PhysicalObject::Buffer)
                }
            };
            match object {
                Ok(object) => {
                    #[cfg(feature = "log-objects")]
                    trace!("Created {object:?} for `{}`", allocation_name(index));
                    physical.allocations.push(Allocation {
                        object,
                        last_observed: AccessState::UNDEFINED,
                    });
                }
                Err(err) => {
                    physical.destroy(backend);
                    return Err(err);
                }
            }
        }
        Ok(physical)
    }

    /// Create the views of every pass touching an image resource, one per allocation. On failure, the views created
    /// so far are destroyed.
    fn create_views(
        backend: &mut dyn Backend,
        resource: &LogicalResource,
        id: ResourceId,
        physical: &PhysicalResource,
        passes: &[Pass],
    ) -> Result<Vec<((PassId, ResourceId), Vec<vk::ImageView>)>> {
        let ResourceDesc::Texture(texture) = resource.desc() else {
            return Ok(vec![]);
        };
        let aspect = image_aspect(texture.format);
        let mut created: Vec<((PassId, ResourceId), Vec<vk::ImageView>)> = Vec::new();
        for touch in resource.touches().iter().filter(|touch| touch.access.needs_view()) {
            let mip_levels = match touch.access {
                AccessKind::Sample {
                    ..
                } => texture.mip_levels,
                _ => 1,
            };
            let pass_name = passes.get(touch.pass.index()).map_or("<unknown>", Pass::name);
            let mut views = Vec::with_capacity(physical.allocation_count());
            for (index, allocation) in physical.allocations.iter().enumerate() {
                let PhysicalObject::Image(image) = allocation.object else {
                    continue;
                };
                let name = if physical.multiplied {
                    format!("{pass_name}::{}@{index}", resource.name())
                } else {
                    format!("{pass_name}::{}", resource.name())
                };
                let view = backend.create_image_view(&ImageViewCreateInfo {
                    name,
                    image,
                    format: texture.format,
                    aspect,
                    base_mip_level: 0,
                    mip_levels,
                    layers: texture.layers,
                });
                match view {
                    Ok(view) => views.push(view),
                    Err(err) => {
                        created
                            .into_iter()
                            .flat_map(|(_, views)| views)
                            .chain(views)
                            .for_each(|view| backend.destroy_image_view(view));
                        return Err(err);
                    }
                }
            }
            created.push(((touch.pass, id), views));
        }
        Ok(created)
    }

    /// Create the framebuffers of a pass, one per frame in flight if any render target is multiplied. Returns `None`
    /// for passes without render targets. On failure, the framebuffers created so far are destroyed.
    fn create_framebuffers(
        &self,
        backend: &mut dyn Backend,
        registry: &ResourceRegistry,
        id: PassId,
        pass: &Pass,
    ) -> Result<Option<Vec<vk::Framebuffer>>> {
        if !pass.has_render_targets() {
            return Ok(None);
        }
        let multiplied = pass.render_targets().any(|target| {
            self.resources
                .get(target.resource.index())
                .and_then(Option::as_ref)
                .map_or(false, PhysicalResource::is_multiplied)
        });
        let count = if multiplied {
            self.frames_in_flight
        } else {
            1
        };

        let mut framebuffers = Vec::with_capacity(count);
        for frame in 0..count {
            let name = if count > 1 {
                format!("{}@{frame}", pass.name())
            } else {
                pass.name().to_owned()
            };
            match self.create_framebuffer(backend, registry, id, pass, frame, name) {
                Ok(framebuffer) => framebuffers.push(framebuffer),
                Err(err) => {
                    framebuffers
                        .into_iter()
                        .for_each(|framebuffer| backend.destroy_framebuffer(framebuffer));
                    return Err(err);
                }
            }
        }
        Ok(Some(framebuffers))
    }

    fn create_framebuffer(
        &self,
        backend: &mut dyn Backend,
        registry: &ResourceRegistry,
        id: PassId,
        pass: &Pass,
        frame: usize,
        name: String,
    ) -> Result<vk::Framebuffer> {
        let mut attachments = Vec::new();
        let mut size = (u32::MAX, u32::MAX, u32::MAX);
        for target in pass.render_targets() {
            let resource = registry.get(target.resource)?;
            let physical = self.get(target.resource)?;
            let AccessKind::RenderTarget {
                load_op,
                store_op,
            } = target.kind
            else {
                continue;
            };
            let samples = match resource.desc() {
                ResourceDesc::Texture(texture) => texture.samples,
                ResourceDesc::Buffer(_) => vk::SampleCountFlags::TYPE_1,
            };
            size = (
                size.0.min(physical.extent.width),
                size.1.min(physical.extent.height),
                size.2.min(physical.layers()),
            );
            attachments.push(AttachmentInfo {
                view: self.view(id, target.resource, frame)?,
                format: resource.desc().format().unwrap_or(vk::Format::UNDEFINED),
                samples,
                load_op,
                store_op,
                layout: touch_state(pass, &target.kind, resource.desc().format()).layout,
            });
        }
        backend.create_framebuffer(&FramebufferCreateInfo {
            name,
            attachments,
            width: size.0,
            height: size.1,
            layers: size.2,
        })
    }

    /// Recreate every surface-relative resource whose resolved size differs under the new surface size, together with
    /// its views and the framebuffers of passes rendering into it. The old objects are pushed onto `retired`, and the
    /// recreated resources are added to `affected`.
    ///
    /// Each resource is swapped as a whole: if its new allocations or views cannot be created, the old ones stay in
    /// place and the remaining resources are skipped. Framebuffers that reference a recreated resource are always
    /// retired, and are missing until a later call manages to rebuild them. Calling this again with the same size
    /// finishes a resize that failed halfway.
    /// # Errors
    /// * Returns the first creation failure. `affected` is filled even in that case.
    #[allow(clippy::too_many_arguments)]
    pub fn resize(
        &mut self,
        backend: &mut dyn Backend,
        registry: &ResourceRegistry,
        passes: &[Pass],
        surface: vk::Extent2D,
        present: Option<ResourceId>,
        retired: &mut DeletionQueue<RetiredObject>,
        affected: &mut HashSet<ResourceId>,
    ) -> Result<()> {
        let recreated = self.recreate_resources(backend, registry, passes, surface, present, retired, affected);

        let mut rebuilt = Ok(());
        for (index, pass) in passes.iter().enumerate() {
            let id = PassId(index);
            let stale = pass.render_targets().any(|target| affected.contains(&target.resource));
            let missing = pass.has_render_targets() && !self.framebuffers.contains_key(&id);
            if !stale && !missing {
                continue;
            }
            for framebuffer in self.framebuffers.remove(&id).unwrap_or_default() {
                retired.push(RetiredObject::Framebuffer(framebuffer));
            }
            match self.create_framebuffers(backend, registry, id, pass) {
                Ok(Some(framebuffers)) => {
                    self.framebuffers.insert(id, framebuffers);
                }
                Ok(None) => {}
                Err(err) => {
                    warn!("Could not recreate the framebuffers of pass `{}`: {err}", pass.name());
                    rebuilt = rebuilt.and(Err(err));
                }
            }
        }

        if !affected.is_empty() {
            debug!(
                "Recreated {} surface-relative resources for surface size {}x{}",
                affected.len(),
                surface.width,
                surface.height
            );
        }
        recreated.and(rebuilt)
    }

    #[allow(clippy::too_many_arguments)]
    fn recreate_resources(
        &mut self,
        backend: &mut dyn Backend,
        registry: &ResourceRegistry,
        passes: &[Pass],
        surface: vk::Extent2D,
        present: Option<ResourceId>,
        retired: &mut DeletionQueue<RetiredObject>,
        affected: &mut HashSet<ResourceId>,
    ) -> Result<()> {
        for (id, resource) in registry.iter() {
            if !resource.desc().is_surface_relative() {
                continue;
            }
            let Some(old) = self.resources.get(id.index()).and_then(Option::as_ref) else {
                continue;
            };
            let changed = match resource.desc() {
                ResourceDesc::Texture(texture) => !same_extent(old.extent, extent_3d(texture.extent.resolve(surface))),
                ResourceDesc::Buffer(buffer) => old.size != buffer.size.resolve(surface),
            };
            if !changed {
                continue;
            }

            let new = self.create_resource(backend, resource, surface, present == Some(id))?;
            let views = match Self::create_views(backend, resource, id, &new, passes) {
                Ok(views) => views,
                Err(err) => {
                    new.destroy(backend);
                    return Err(err);
                }
            };

            let old = self.resources[id.index()].replace(new);
            for allocation in old.iter().flat_map(|old| old.allocations.iter()) {
                retired.push(allocation.object.into());
            }
            let stale_views = self
                .views
                .keys()
                .filter(|(_, resource)| *resource == id)
                .copied()
                .collect::<Vec<_>>();
            for key in stale_views {
                for view in self.views.remove(&key).unwrap_or_default() {
                    retired.push(RetiredObject::ImageView(view));
                }
            }
            self.views.extend(views);
            affected.insert(id);
        }
        Ok(())
    }

    /// Get the physical side of a resource.
    /// # Errors
    /// * Fails if the resource does not exist or was never allocated.
    pub fn get(&self, resource: ResourceId) -> Result<&PhysicalResource> {
        self.resources
            .get(resource.index())
            .and_then(Option::as_ref)
            .ok_or_else(|| Error::UnknownResource(format!("#{} (not allocated)", resource.index())).into())
    }

    pub(crate) fn get_mut(&mut self, resource: ResourceId) -> Option<&mut PhysicalResource> {
        self.resources.get_mut(resource.index()).and_then(Option::as_mut)
    }

    /// The view a pass uses for a resource, in a frame slot.
    pub fn view(&self, pass: PassId, resource: ResourceId, frame: usize) -> Result<vk::ImageView> {
        let views = self
            .views
            .get(&(pass, resource))
            .ok_or_else(|| Error::UnknownResource(format!("#{} has no view in pass #{}", resource.index(), pass.index())))?;
        let slot = if views.len() > 1 {
            frame % views.len()
        } else {
            0
        };
        views
            .get(slot)
            .copied()
            .ok_or_else(|| Error::UnknownResource(format!("#{}", resource.index())).into())
    }

    /// Number of views created for a `(pass, resource)` pair.
    pub fn view_count(&self, pass: PassId, resource: ResourceId) -> usize {
        self.views.get(&(pass, resource)).map_or(0, Vec::len)
    }

    /// The framebuffer of a pass in a frame slot, if the pass has render targets.
    pub fn framebuffer(&self, pass: PassId, frame: usize) -> Option<vk::Framebuffer> {
        let framebuffers = self.framebuffers.get(&pass)?;
        framebuffers.get(frame % framebuffers.len().max(1)).copied()
    }

    fn drain_objects(&mut self) -> Vec<RetiredObject> {
        let mut objects = Vec::new();
        for (_, framebuffers) in self.framebuffers.drain() {
            objects.extend(framebuffers.into_iter().map(RetiredObject::Framebuffer));
        }
        for (_, views) in self.views.drain() {
            objects.extend(views.into_iter().map(RetiredObject::ImageView));
        }
        for physical in self.resources.drain(..).flatten() {
            objects.extend(physical.allocations.iter().map(|allocation| RetiredObject::from(allocation.object)));
        }
        objects
    }

    /// Push every object onto `retired`, leaving the allocator empty.
    pub fn retire_all(&mut self, retired: &mut DeletionQueue<RetiredObject>) {
        for object in self.drain_objects() {
            retired.push(object);
        }
    }

    /// Destroy every object right away, leaving the allocator empty. No frame may use any of them anymore.
    pub fn release(&mut self, backend: &mut dyn Backend) {
        let objects = self.drain_objects();
        if !objects.is_empty() {
            debug!("Destroying {} physical objects", objects.len());
        }
        for object in objects {
            object.destroy(backend);
        }
    }
}

impl ResolveBinding for PhysicalResources {
    fn image_view(&self, pass: PassId, resource: ResourceId, frame: usize) -> Result<vk::ImageView> {
        self.view(pass, resource, frame)
    }

    fn buffer(&self, resource: ResourceId, frame: usize) -> Result<vk::Buffer> {
        let physical = self.get(resource)?;
        physical
            .buffer(frame)
            .ok_or_else(|| Error::UnknownResource(format!("`{}` is not a buffer", physical.name())).into())
    }

    fn is_multiplied(&self, resource: ResourceId) -> Result<bool> {
        Ok(self.get(resource)?.is_multiplied())
    }

    fn resource_name(&self, resource: ResourceId) -> String {
        self.get(resource)
            .map_or_else(|_| format!("#{}", resource.index()), |physical| physical.name().to_owned())
    }
}
