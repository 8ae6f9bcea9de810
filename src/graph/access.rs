//! Translation of an [`AccessKind`] into the pipeline stage, access mask and image layout a pass needs.
//!
//! The table is specific to the kind of pass: a graphics pass samples in its shader stages (fragment by default),
//! a compute pass in the compute stage. Render targets on depth formats map to the fragment test stages.

use ash::vk;

use crate::graph::pass::PassKind;
use crate::graph::resource::{is_depth_format, AccessKind, ResourceType};

/// Pipeline stage flags used throughout the graph.
pub type PipelineStage = vk::PipelineStageFlags2;

const WRITE_ACCESS: vk::AccessFlags2 = vk::AccessFlags2::from_raw(
    vk::AccessFlags2::SHADER_WRITE.as_raw()
        | vk::AccessFlags2::SHADER_STORAGE_WRITE.as_raw()
        | vk::AccessFlags2::COLOR_ATTACHMENT_WRITE.as_raw()
        | vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE.as_raw()
        | vk::AccessFlags2::TRANSFER_WRITE.as_raw()
        | vk::AccessFlags2::HOST_WRITE.as_raw()
        | vk::AccessFlags2::MEMORY_WRITE.as_raw(),
);

/// The `(stage, access, layout)` triple describing one access to a resource. For buffers the layout is always
/// [`vk::ImageLayout::UNDEFINED`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct AccessState {
    /// Pipeline stages the access happens in
    pub stage: PipelineStage,
    /// Memory access mask
    pub access: vk::AccessFlags2,
    /// Required image layout
    pub layout: vk::ImageLayout,
}

impl Default for AccessState {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

impl AccessState {
    /// State of a freshly created resource: nothing touched it yet, contents are undefined.
    pub const UNDEFINED: Self = Self::new(PipelineStage::NONE, vk::AccessFlags2::NONE, vk::ImageLayout::UNDEFINED);

    /// Create a new access state.
    pub const fn new(stage: PipelineStage, access: vk::AccessFlags2, layout: vk::ImageLayout) -> Self {
        Self {
            stage,
            access,
            layout,
        }
    }

    /// Whether this access writes memory.
    pub fn is_write(&self) -> bool {
        self.access.intersects(WRITE_ACCESS)
    }

    /// The writes of this access that must be made available. Reads never need to be made available, so they are
    /// dropped from the source scope of a barrier.
    pub fn src_access(&self) -> vk::AccessFlags2 {
        self.access & WRITE_ACCESS
    }

    /// Same stages and access, but no execution dependency: the source of a barrier that only transitions layout.
    pub fn without_dependency(&self) -> Self {
        Self::new(PipelineStage::NONE, vk::AccessFlags2::NONE, self.layout)
    }
}

/// Whether two consecutive accesses need a barrier between them.
///
/// A barrier is needed if either side writes, or if the two accesses need the resource in different layouts (such
/// as a storage read followed by a sampled read). Only reads in an identical layout can run unsynchronized.
/// Buffers have no layout, so only writes matter.
pub fn is_hazard(ty: ResourceType, prev: &AccessState, cur: &AccessState) -> bool {
    if prev.is_write() || cur.is_write() {
        return true;
    }
    match ty {
        ResourceType::Image => prev.layout != cur.layout,
        ResourceType::Buffer => false,
    }
}

fn render_target_state(format: vk::Format, load_op: vk::AttachmentLoadOp) -> AccessState {
    let load = load_op == vk::AttachmentLoadOp::LOAD;
    if is_depth_format(format) {
        let layout = if format == vk::Format::D16_UNORM
            || format == vk::Format::D32_SFLOAT
            || format == vk::Format::X8_D24_UNORM_PACK32
        {
            vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL
        } else {
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
        };
        let mut access = vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE;
        if load {
            access |= vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ;
        }
        // Load and clear happen in EARLY_FRAGMENT_TESTS, stores in LATE_FRAGMENT_TESTS.
        AccessState::new(
            PipelineStage::EARLY_FRAGMENT_TESTS | PipelineStage::LATE_FRAGMENT_TESTS,
            access,
            layout,
        )
    } else {
        let mut access = vk::AccessFlags2::COLOR_ATTACHMENT_WRITE;
        if load {
            access |= vk::AccessFlags2::COLOR_ATTACHMENT_READ;
        }
        AccessState::new(PipelineStage::COLOR_ATTACHMENT_OUTPUT, access, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
    }
}

impl PassKind {
    /// Translate an access of this pass into the state the resource must be in while the pass executes.
    ///
    /// `shader_stages` are the stages the pass reads and writes resources in. `format` is the image format, or
    /// `None` for buffers.
    ///
    /// Combinations that are rejected at pass construction (render targets on compute passes or buffers, sampled
    /// buffers) map to [`AccessState::UNDEFINED`].
    pub fn access_state(&self, shader_stages: PipelineStage, access: &AccessKind, format: Option<vk::Format>) -> AccessState {
        let image = format.is_some();
        match (access, image) {
            (AccessKind::Init, true) => AccessState::new(
                PipelineStage::ALL_TRANSFER,
                vk::AccessFlags2::TRANSFER_WRITE,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            ),
            (AccessKind::Init, false) => AccessState::new(
                PipelineStage::ALL_TRANSFER,
                vk::AccessFlags2::TRANSFER_WRITE,
                vk::ImageLayout::UNDEFINED,
            ),
            (AccessKind::Read, true) => {
                AccessState::new(shader_stages, vk::AccessFlags2::SHADER_STORAGE_READ, vk::ImageLayout::GENERAL)
            }
            (AccessKind::Read, false) => {
                AccessState::new(shader_stages, vk::AccessFlags2::SHADER_STORAGE_READ, vk::ImageLayout::UNDEFINED)
            }
            (AccessKind::Write, true) => AccessState::new(
                shader_stages,
                vk::AccessFlags2::SHADER_STORAGE_READ | vk::AccessFlags2::SHADER_STORAGE_WRITE,
                vk::ImageLayout::GENERAL,
            ),
            (AccessKind::Write, false) => AccessState::new(
                shader_stages,
                vk::AccessFlags2::SHADER_STORAGE_READ | vk::AccessFlags2::SHADER_STORAGE_WRITE,
                vk::ImageLayout::UNDEFINED,
            ),
            (
                AccessKind::Sample {
                    needs_mipmap,
                },
                true,
            ) => {
                if *needs_mipmap {
                    // The mip chain is blitted right before the pass, inside the same dependency scope.
                    AccessState::new(
                        shader_stages | PipelineStage::ALL_TRANSFER,
                        vk::AccessFlags2::SHADER_SAMPLED_READ
                            | vk::AccessFlags2::TRANSFER_READ
                            | vk::AccessFlags2::TRANSFER_WRITE,
                        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    )
                } else {
                    AccessState::new(
                        shader_stages,
                        vk::AccessFlags2::SHADER_SAMPLED_READ,
                        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    )
                }
            }
            (
                AccessKind::RenderTarget {
                    load_op,
                    ..
                },
                true,
            ) if *self == PassKind::Graphics => render_target_state(format.unwrap_or(vk::Format::UNDEFINED), *load_op),
            _ => AccessState::UNDEFINED,
        }
    }

    /// Default shader stages of this pass kind.
    pub fn default_shader_stages(&self) -> PipelineStage {
        match self {
            PassKind::Graphics => PipelineStage::FRAGMENT_SHADER,
            PassKind::Compute => PipelineStage::COMPUTE_SHADER,
        }
    }
}

/// State a resource is in while it is copied into the output surface.
pub const PRESENT_SOURCE: AccessState = AccessState::new(
    PipelineStage::ALL_TRANSFER,
    vk::AccessFlags2::TRANSFER_READ,
    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
);
