//! Various utilities

pub mod deferred_delete;
pub mod to_vk;
