//! Render graph compiler and per-frame synchronization engine for Vulkan renderers.
//!
//! Deimos takes a declarative description of a frame, an ordered list of graphics and compute passes and the
//! images and buffers they touch, and works out everything Vulkan needs to run it correctly:
//!
//! * the barriers and layout transitions in front of each pass, re-synthesized only when the set of enabled passes
//!   changes,
//! * how many physical allocations back each resource, one per frame in flight for resources that may overlap
//!   between frames,
//! * the views and framebuffers each pass needs, recreated when the output surface is resized,
//! * binding sets (descriptor sets) that point at those resources, deduplicated by layout and rewritten on resize.
//!
//! All device work goes through the [`Backend`] trait. The [`VulkanBackend`] runs on an [`ash`] device with
//! [`gpu_allocator`], the [`HeadlessBackend`] runs without a GPU and records what the graph asked for.
//!
//! To get started, import the prelude
//! ```
//! use deimos::prelude::*;
//! ```
//!
//! # Example
//!
//! A graph with a compute pass producing a buffer, and a graphics pass consuming it and rendering into the image
//! that is presented.
//! ```
//! use deimos::prelude::*;
//!
//! let settings = GraphSettingsBuilder::new()
//!     .name("demo")
//!     .present("color")
//!     .build();
//! let mut graph = RenderGraph::new(HeadlessBackend::new(2, 1280, 720), settings);
//!
//! let particles = graph.declare_buffer("particles", BufferDesc::new(BufferSize::Absolute(4096)), ResourceFlags::in_flight());
//! let color = graph.declare_texture(
//!     "color",
//!     TextureDesc::new(vk::Format::R8G8B8A8_UNORM, ImageExtent::surface()),
//!     ResourceFlags::in_flight(),
//! );
//!
//! graph.add_pass(PassBuilder::compute("simulate").write(particles).build())?;
//! graph.add_pass(
//!     PassBuilder::graphics("draw")
//!         .read(particles)
//!         .clear_color_target(color, ClearColor::Float([0.0, 0.0, 0.0, 1.0]))
//!         .build(),
//! )?;
//! graph.compile_ahead_of_time()?;
//!
//! // The read of `particles` in `draw` waits for the write in `simulate`.
//! let draw = graph.pass("draw")?;
//! assert_eq!(graph.barriers(draw).len(), 2);
//!
//! let commands = graph.record_frame(0, 0)?;
//! assert!(commands.buffer_barriers().count() > 0);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! For further documentation, check out the following modules
//! - [`graph`] for resources, passes, hazards and physical resources.
//! - [`frame`] for per-frame recording, the present composite and resize handling.
//! - [`descriptor`] for binding set management.
//! - [`backend`] for the device abstraction and its implementations.

#[macro_use]
extern crate derivative;
#[macro_use]
extern crate log;

use static_assertions::assert_impl_all;

pub mod prelude;
pub use crate::prelude::*;

pub mod backend;
pub mod core;
pub mod descriptor;
pub mod frame;
pub mod graph;
pub mod util;

assert_impl_all!(GraphState: Send, Sync);
assert_impl_all!(ResourceRegistry: Send, Sync);
assert_impl_all!(BarrierPlan: Send, Sync, Clone);
assert_impl_all!(CommandList: Send);
assert_impl_all!(Error: Send, Sync);
