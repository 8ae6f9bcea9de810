//! The resource registry owns every logical resource of a graph, together with its touch list.
//!
//! Resources live in an arena and are referenced by [`ResourceId`] everywhere else. Nothing is ever removed, so
//! handles stay valid for the lifetime of the registry. Touch lists only grow while passes are added; after that
//! they are read-only, and passes are filtered out at synthesis time instead of removed.

use std::collections::HashMap;

use anyhow::Result;

use crate::graph::pass::PassId;
use crate::graph::resource::{
    AccessKind, BufferDesc, LogicalResource, ResourceDesc, ResourceFlags, ResourceId, TextureDesc, Touch,
};
use crate::Error;

/// Arena of logical resources.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    resources: Vec<LogicalResource>,
    names: HashMap<String, ResourceId>,
}

impl ResourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn declare(&mut self, name: String, desc: ResourceDesc, flags: ResourceFlags) -> ResourceId {
        let id = ResourceId(self.resources.len());
        if self.names.insert(name.clone(), id).is_some() {
            warn!("Resource `{name}` was declared more than once. Lookups by name now return the newest declaration.");
        }
        self.resources.push(LogicalResource {
            name,
            desc,
            flags,
            touches: vec![],
        });
        id
    }

    /// Declare a new texture. Declaring a name twice creates two distinct resources.
    pub fn declare_texture(&mut self, name: impl Into<String>, desc: TextureDesc, flags: ResourceFlags) -> ResourceId {
        self.declare(name.into(), ResourceDesc::Texture(desc), flags)
    }

    /// Declare a new buffer. Declaring a name twice creates two distinct resources.
    pub fn declare_buffer(&mut self, name: impl Into<String>, desc: BufferDesc, flags: ResourceFlags) -> ResourceId {
        self.declare(name.into(), ResourceDesc::Buffer(desc), flags)
    }

    /// Append a touch to the touch list of a resource.
    /// # Errors
    /// * Fails if the resource does not exist.
    pub fn record_access(&mut self, resource: ResourceId, pass: PassId, access: AccessKind) -> Result<()> {
        let logical = self
            .resources
            .get_mut(resource.0)
            .ok_or_else(|| Error::UnknownResource(format!("#{}", resource.0)))?;
        logical.touches.push(Touch {
            pass,
            access,
        });
        Ok(())
    }

    /// Get a resource by handle.
    pub fn get(&self, resource: ResourceId) -> Result<&LogicalResource> {
        self.resources
            .get(resource.0)
            .ok_or_else(|| Error::UnknownResource(format!("#{}", resource.0)).into())
    }

    /// Look up the newest resource declared with this name.
    pub fn lookup(&self, name: &str) -> Option<ResourceId> {
        self.names.get(name).copied()
    }

    /// Iterate over all resources in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceId, &LogicalResource)> {
        self.resources
            .iter()
            .enumerate()
            .map(|(index, resource)| (ResourceId(index), resource))
    }

    /// Number of declared resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether no resources were declared.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
