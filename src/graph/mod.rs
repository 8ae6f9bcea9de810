//! The render graph describes a frame as an ordered list of passes and the resources they touch.
//!
//! Resources are declared once as [`LogicalResource`](resource::LogicalResource)s and referenced through stable
//! [`ResourceId`](resource::ResourceId) handles. Every pass declares how it touches each resource it uses: as a
//! render target, sampled, as storage, or initialized by transfer commands. From this, the graph derives everything
//! else:
//!
//! * Which usage flags each physical image or buffer needs, see [`physical_resource`].
//! * Which barriers go before each pass, including layout transitions, see [`hazard`].
//! * Which passes run in a frame, driven by named variables and per-pass switches, see [`state`].
//!
//! Passes execute in the order they were added. The graph never reorders work, it only decides where to wait.
//!
//! Through the [`GraphViz`](viz::GraphViz) trait, it's possible to export a graphviz-compatible dot file showing the
//! passes and the barriers between them.

pub mod access;
pub mod hazard;
pub mod pass;
pub mod physical_resource;
pub mod registry;
pub mod resource;
pub mod state;
pub mod viz;
