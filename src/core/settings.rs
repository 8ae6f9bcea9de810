//! Exposes the settings used to create a [`RenderGraph`](crate::RenderGraph).

use ash::vk;

/// Settings for a render graph. Obtain one through [`GraphSettingsBuilder`].
///
/// Note that the number of frames in flight and the size of the output surface are not part of these settings,
/// they are always queried from the [`Backend`](crate::Backend).
#[derive(Debug, Clone)]
pub struct GraphSettings {
    /// Graph name, used in log output.
    pub name: String,
    /// Name of the resource that is composited into the output surface at the end of each frame.
    /// If this is `None`, nothing is presented and the output image index passed to
    /// [`RenderGraph::record_frame()`](crate::RenderGraph::record_frame) is ignored.
    pub present: Option<String>,
    /// Name of a managed binding set that is bound before every pass.
    pub frame_binding_set: Option<String>,
    /// Pipeline layout used to bind the frame binding set at index 0.
    pub frame_pipeline_layout: vk::PipelineLayout,
    /// Filter used when blitting the present resource to the output surface.
    pub present_filter: vk::Filter,
    /// Number of frames a retired physical object is kept alive before it is destroyed.
    /// If `None`, this is the number of frames in flight.
    pub retire_delay: Option<u32>,
    /// Whether to wrap each pass in debug labels. Only has an effect with the `debug-markers` feature.
    pub debug_labels: bool,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            name: String::from("render graph"),
            present: None,
            frame_binding_set: None,
            frame_pipeline_layout: vk::PipelineLayout::null(),
            present_filter: vk::Filter::LINEAR,
            retire_delay: None,
            debug_labels: true,
        }
    }
}

/// Used to create [`GraphSettings`] objects.
/// # Example
/// ```
/// use deimos::prelude::*;
/// let settings = GraphSettingsBuilder::new()
///     .name("main graph")
///     .present("final_color")
///     .frame_binding_set("frame_globals")
///     .present_filter(vk::Filter::NEAREST)
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct GraphSettingsBuilder {
    inner: GraphSettings,
}

impl GraphSettingsBuilder {
    /// Create a default settings builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the graph name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner.name = name.into();
        self
    }

    /// Set the resource to composite into the output surface.
    pub fn present(mut self, resource: impl Into<String>) -> Self {
        self.inner.present = Some(resource.into());
        self
    }

    /// Set the binding set that is bound before every pass.
    pub fn frame_binding_set(mut self, name: impl Into<String>) -> Self {
        self.inner.frame_binding_set = Some(name.into());
        self
    }

    /// Set the pipeline layout the frame binding set is bound with.
    pub fn frame_pipeline_layout(mut self, layout: vk::PipelineLayout) -> Self {
        self.inner.frame_pipeline_layout = layout;
        self
    }

    /// Set the filter used for the present blit.
    pub fn present_filter(mut self, filter: vk::Filter) -> Self {
        self.inner.present_filter = filter;
        self
    }

    /// Override the number of frames retired objects are kept alive.
    pub fn retire_delay(mut self, frames: u32) -> Self {
        self.inner.retire_delay = Some(frames);
        self
    }

    /// Enable or disable debug labels around passes.
    pub fn debug_labels(mut self, enabled: bool) -> Self {
        self.inner.debug_labels = enabled;
        self
    }

    /// Build the settings.
    pub fn build(self) -> GraphSettings {
        self.inner
    }
}
