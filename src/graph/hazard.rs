//! Hazard detection and barrier synthesis.
//!
//! Synthesis walks the touch list of every resource, keeps only the touches of enabled passes, and plans a barrier
//! before every touch that conflicts with the one before it. The result is a [`BarrierPlan`], which only depends on
//! which passes are enabled. It is cached by the graph and rebuilt only when that set changes.
//!
//! The first active touch of a resource is special. Its source is whatever the previous frame (or resize) left
//! behind in the access record of the physical allocation, which is only known when a frame is recorded. The plan
//! therefore stores [`BarrierSource::LastObserved`] for it, and [`resolve_first_touch()`] decides at record time
//! whether a barrier is needed.

use ash::vk;

use crate::graph::access::{is_hazard, AccessState};
use crate::graph::pass::{Pass, PassId};
use crate::graph::registry::ResourceRegistry;
use crate::graph::resource::{AccessKind, ResourceId, ResourceType};

/// Where the source scope of a planned barrier comes from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BarrierSource {
    /// The state last observed on the allocation backing the current frame. Resolved when recording.
    LastObserved,
    /// A previous touch in the same frame.
    Touch {
        /// The pass that touched the resource before
        pass: PassId,
        /// The state that pass left the resource in
        state: AccessState,
    },
}

/// A barrier inserted before a pass, for one resource.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PlannedBarrier {
    /// The resource this barrier protects
    pub resource: ResourceId,
    /// Type of the resource
    pub ty: ResourceType,
    /// Source scope and layout
    pub src: BarrierSource,
    /// Destination scope and layout
    pub dst: AccessState,
}

impl PlannedBarrier {
    /// Whether this barrier is the first-touch barrier of its resource.
    pub fn is_first_touch(&self) -> bool {
        self.src == BarrierSource::LastObserved
    }
}

/// The final active touch of a resource in a frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FinalTouch {
    /// Last pass touching the resource
    pub pass: PassId,
    /// State the resource is left in
    pub state: AccessState,
}

/// Output of barrier synthesis for one set of enabled passes.
#[derive(Debug, Clone, Default)]
pub struct BarrierPlan {
    enabled: Vec<bool>,
    barriers: Vec<Vec<PlannedBarrier>>,
    final_touches: Vec<Option<FinalTouch>>,
}

impl BarrierPlan {
    /// The enabled-pass snapshot this plan was synthesized for.
    pub fn topology(&self) -> &[bool] {
        &self.enabled
    }

    /// Barriers to insert before a pass, in resource declaration order.
    pub fn barriers(&self, pass: PassId) -> &[PlannedBarrier] {
        self.barriers.get(pass.0).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Last active touch of a resource, or `None` if no enabled pass touches it.
    pub fn final_touch(&self, resource: ResourceId) -> Option<FinalTouch> {
        self.final_touches.get(resource.0).copied().flatten()
    }

    /// All planned barriers, paired with the pass they are attached to.
    pub fn iter(&self) -> impl Iterator<Item = (PassId, &PlannedBarrier)> {
        self.barriers
            .iter()
            .enumerate()
            .flat_map(|(pass, barriers)| barriers.iter().map(move |barrier| (PassId(pass), barrier)))
    }

    /// Total number of planned barriers.
    pub fn len(&self) -> usize {
        self.barriers.iter().map(Vec::len).sum()
    }

    /// Whether no barriers were planned.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// State a pass requires a resource to be in.
pub(crate) fn touch_state(pass: &Pass, access: &AccessKind, format: Option<vk::Format>) -> AccessState {
    pass.kind.access_state(pass.shader_stages, access, format)
}

/// Synthesize the barriers for all resources, given which passes are enabled. `enabled` is indexed by pass.
pub fn synthesize(registry: &ResourceRegistry, passes: &[Pass], enabled: &[bool]) -> BarrierPlan {
    let mut plan = BarrierPlan {
        enabled: enabled.to_vec(),
        barriers: vec![vec![]; passes.len()],
        final_touches: vec![None; registry.len()],
    };

    for (id, resource) in registry.iter() {
        let ty = resource.resource_type();
        let format = resource.desc().format();
        let mut previous: Option<(PassId, AccessState)> = None;

        let active = resource
            .touches()
            .iter()
            .filter(|touch| enabled.get(touch.pass.0).copied().unwrap_or(false));
        for touch in active {
            let Some(pass) = passes.get(touch.pass.0) else {
                debug_assert!(false, "touch refers to pass #{} which does not exist", touch.pass.0);
                continue;
            };
            let state = touch_state(pass, &touch.access, format);
            match previous {
                None => plan.barriers[touch.pass.0].push(PlannedBarrier {
                    resource: id,
                    ty,
                    src: BarrierSource::LastObserved,
                    dst: state,
                }),
                Some((prev_pass, prev_state)) => {
                    if is_hazard(ty, &prev_state, &state) {
                        plan.barriers[touch.pass.0].push(PlannedBarrier {
                            resource: id,
                            ty,
                            src: BarrierSource::Touch {
                                pass: prev_pass,
                                state: prev_state,
                            },
                            dst: state,
                        });
                    }
                }
            }
            previous = Some((touch.pass, state));
        }

        plan.final_touches[id.0] = previous.map(|(pass, state)| FinalTouch {
            pass,
            state,
        });
    }

    debug!(
        "Synthesized {} barriers for {} of {} passes",
        plan.len(),
        enabled.iter().filter(|e| **e).count(),
        passes.len()
    );
    plan
}

/// Resolve a first-touch barrier against the last observed state of the allocation backing this frame.
///
/// For resources that are multiplied over frames in flight the execution dependency on the previous use is dropped,
/// only the layout transition remains. Returns the source state of the barrier, or `None` if no barrier is needed.
pub fn resolve_first_touch(
    ty: ResourceType,
    multiplied: bool,
    last: &AccessState,
    dst: &AccessState,
) -> Option<AccessState> {
    let src = if multiplied {
        last.without_dependency()
    } else {
        *last
    };
    if src.stage.is_empty() && src.layout == dst.layout {
        return None;
    }
    if ty == ResourceType::Buffer && src.stage.is_empty() {
        return None;
    }
    is_hazard(ty, &src, dst).then_some(src)
}
