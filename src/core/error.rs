//! Exposes the deimos error type

use std::sync::PoisonError;

use ash;
use gpu_allocator::AllocationError;
use thiserror::Error;

/// Error type that deimos can return.
///
/// Errors fall in two groups. Construction errors signal a bug in the code building the graph (an unknown name, an
/// illegal access declaration, ...). Allocation errors are reported by the [`Backend`](crate::Backend) when it cannot
/// create a physical object. Neither is retried by the graph.
#[derive(Error, Debug)]
pub enum Error {
    /// Generic Vulkan error type.
    #[error("Vulkan error: `{0}`")]
    VkError(ash::vk::Result),
    /// Vulkan memory allocation error.
    #[error("Vulkan allocation error: `{0}`")]
    AllocationError(AllocationError),
    /// The backend refused to create a physical object.
    #[error("Backend failed to allocate `{0}`")]
    AllocationFailed(String),
    /// No resource with this name or handle exists in the graph.
    #[error("Resource `{0}` was never declared in this graph")]
    UnknownResource(String),
    /// No pass with this name or handle exists in the graph.
    #[error("Pass `{0}` does not exist in this graph")]
    UnknownPass(String),
    /// Two passes were added with the same name.
    #[error("A pass named `{0}` was already added to this graph")]
    DuplicatePass(String),
    /// A pass declared more than one access to the same resource.
    #[error("Pass `{pass}` declares more than one access to resource `{resource}`")]
    DuplicateAccess {
        /// Name of the offending pass
        pass: String,
        /// Name of the resource accessed twice
        resource: String,
    },
    /// The access kind is not valid for this pass kind or resource type.
    #[error("Pass `{pass}` cannot access resource `{resource}` as {access}")]
    IllegalAccess {
        /// Name of the offending pass
        pass: String,
        /// Name of the resource
        resource: String,
        /// Description of the rejected access
        access: &'static str,
    },
    /// Conditional variable was never defined.
    #[error("Conditional variable `{0}` does not exist")]
    UnknownVariable(String),
    /// Switch variable does not have a case with this name.
    #[error("Switch variable `{variable}` has no case named `{case}`")]
    UnknownSwitchCase {
        /// Name of the switch variable
        variable: String,
        /// Requested case
        case: String,
    },
    /// Tried to use a bool variable as a switch, or the other way around.
    #[error("Conditional variable `{0}` has a different type")]
    VariableTypeMismatch(String),
    /// A binding set was used without calling `manage()` for it first.
    #[error("Binding set `{0}` is not managed")]
    SetNotManaged(String),
    /// A binding set was managed, but its physical set was not allocated yet.
    #[error("Binding set `{0}` is managed but not allocated. Call `allocate_all()` first")]
    SetNotAllocated(String),
    /// A shared binding set was written with a resource that has one allocation per frame in flight.
    #[error("Shared binding set `{set}` cannot point at `{resource}`, which has one allocation per frame in flight")]
    SharedSetInFlightResource {
        /// Name of the shared set
        set: String,
        /// Name of the multiplied resource
        resource: String,
    },
    /// A binding set was managed twice with a different layout or mode.
    #[error("Binding set `{0}` is already managed with a different layout")]
    SetLayoutMismatch(String),
    /// The graph must be compiled ahead of time before this call.
    #[error("Render graph was not compiled. Call `compile_ahead_of_time()` first")]
    NotCompiled,
    /// The graph can only be compiled once.
    #[error("Render graph was already compiled")]
    AlreadyCompiled,
    /// Frame index is not smaller than the number of frames in flight.
    #[error("Frame index {0} is out of range")]
    FrameIndexOutOfRange(usize),
    /// Poisoned mutex
    #[error("Poisoned mutex")]
    PoisonError,
    /// Uncategorized error.
    #[error("Uncategorized error: `{0}`")]
    Uncategorized(&'static str),
}

impl From<ash::vk::Result> for Error {
    fn from(value: ash::vk::Result) -> Self {
        Error::VkError(value)
    }
}

impl From<AllocationError> for Error {
    fn from(value: AllocationError) -> Self {
        Error::AllocationError(value)
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(_: PoisonError<T>) -> Self {
        Error::PoisonError
    }
}
