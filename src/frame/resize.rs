//! Invalidation of surface-relative resources when the output surface changes size.

use std::collections::HashSet;

use anyhow::Result;
use ash::vk;

use crate::backend::Backend;
use crate::frame::driver::RenderGraph;

impl<B: Backend> RenderGraph<B> {
    /// Notify the graph that the output surface now has size `extent`.
    ///
    /// Waits until no frame in flight is in use anymore, since binding sets of every slot are written. Then every
    /// surface-relative resource whose resolved size changed is recreated, together with its views and the
    /// framebuffers of passes rendering into it. The old objects are retired and destroyed once the frames that may
    /// still use them completed. Binding set writes that referenced a recreated resource are issued again immediately.
    ///
    /// Resizing to the current size does nothing. Before [`RenderGraph::compile_ahead_of_time()`] only the stored
    /// size changes.
    /// # Errors
    /// * Fails if the backend cannot create a new resource, view or framebuffer. Resources that were recreated before
    ///   the failure stay recreated and their binding sets are rewritten, the others keep their old size. The stored
    ///   surface size is not updated, so calling this again with the same size retries the rest.
    pub fn on_output_resize(&mut self, extent: vk::Extent2D) -> Result<()> {
        if extent.width == self.surface_extent.width && extent.height == self.surface_extent.height {
            return Ok(());
        }
        if !self.compiled {
            self.surface_extent = extent;
            return Ok(());
        }

        debug!(
            "Output surface resized from {}x{} to {}x{}",
            self.surface_extent.width, self.surface_extent.height, extent.width, extent.height
        );
        self.backend.wait_idle()?;
        let mut affected = HashSet::new();
        let resized = self.physical.resize(
            &mut self.backend,
            &self.registry,
            &self.passes,
            extent,
            self.present,
            &mut self.retired,
            &mut affected,
        );
        let rewritten = self.bindings.rewrite(&mut self.backend, &self.physical, &affected);
        if resized.is_ok() {
            self.surface_extent = extent;
        }
        resized?;
        rewritten?;
        Ok(())
    }
}
