//! The binding set manager owns all binding sets of a graph.
//!
//! Sets are declared by name with [`BindingSetManager::manage()`]. Layouts are deduplicated by structure, so every
//! distinct [`BindingSetLayout`] exists once, together with the list of named records allocated from it. A shared set
//! has one record, an in-flight set has one record per frame in flight, named `name@frame`.
//!
//! The manager goes through two phases. While [`Phase::Declared`], writes can be queued for any name, including
//! names that are not managed yet. [`BindingSetManager::allocate_all()`] allocates every set that has no physical
//! handle yet, applies the queued writes of the sets it just allocated, and moves the manager to
//! [`Phase::Committed`]. From then on, writes to names that are not managed are rejected.
//!
//! Queued writes are kept per record. A set may only be written while no frame in flight uses it, so
//! [`BindingSetManager::flush()`] applies the writes of one frame slot at a time, after that slot was waited on.
//! Shared sets are used by every slot and are only flushed once the caller waited for all of them. Every record also
//! remembers its current contents, so that writes pointing at graph resources can be issued again when those
//! resources are recreated.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use ash::vk;
use multimap::MultiMap;

use crate::backend::Backend;
use crate::descriptor::descriptor_pool::BindingPoolSize;
use crate::descriptor::layout::BindingSetLayout;
use crate::descriptor::write::{BindingWrite, ResolveBinding, ResolvedWrite};
use crate::graph::resource::ResourceId;
use crate::Error;

/// How many physical sets back a managed name.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum SetMode {
    /// One set, shared by all frames.
    Shared,
    /// One set per frame in flight.
    InFlight,
}

/// Phase of the binding set manager.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum Phase {
    /// Writes are recorded against names, handles may not exist yet.
    Declared,
    /// Sets were allocated and all resolvable writes flushed.
    Committed,
}

/// A named physical binding set.
#[derive(Debug, Clone)]
pub struct BindingSetRecord {
    name: String,
    frame: Option<usize>,
    set: Option<vk::DescriptorSet>,
    contents: Vec<BindingWrite>,
    queued: Vec<BindingWrite>,
}

impl BindingSetRecord {
    /// Record name. In-flight records are qualified with their frame index.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Frame index of an in-flight record.
    pub fn frame(&self) -> Option<usize> {
        self.frame
    }

    /// Physical set, `None` until allocated.
    pub fn handle(&self) -> Option<vk::DescriptorSet> {
        self.set
    }

    /// Number of writes waiting to be applied to this set.
    pub fn queued_count(&self) -> usize {
        self.queued.len()
    }

    fn stage(&mut self, write: BindingWrite) {
        self.contents.retain(|old| !old.same_slot(&write));
        self.contents.push(write);
        self.queued.retain(|old| !old.same_slot(&write));
        self.queued.push(write);
    }

    fn resolve(&self, write: &BindingWrite, resolver: &dyn ResolveBinding) -> Result<ResolvedWrite> {
        let set = self.set.ok_or_else(|| Error::SetNotAllocated(self.name.clone()))?;
        match (self.frame, write.graph_resource()) {
            (None, Some(resource)) if resolver.is_multiplied(resource)? => Err(Error::SharedSetInFlightResource {
                set: self.name.clone(),
                resource: resolver.resource_name(resource),
            }
            .into()),
            (frame, _) => write.resolve(set, frame.unwrap_or(0), resolver),
        }
    }
}

#[derive(Debug)]
struct LayoutEntry {
    key: BindingSetLayout,
    handle: vk::DescriptorSetLayout,
    records: Vec<BindingSetRecord>,
    pools: Vec<vk::DescriptorPool>,
}

#[derive(Debug)]
struct ManagedSet {
    layout: usize,
    mode: SetMode,
    records: Vec<usize>,
}

/// Owns binding set layouts, pools and sets, and the writes into them.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct BindingSetManager {
    frames_in_flight: usize,
    layouts: Vec<LayoutEntry>,
    #[derivative(Debug = "ignore")]
    layout_index: HashMap<BindingSetLayout, usize>,
    sets: HashMap<String, ManagedSet>,
    unmanaged: MultiMap<String, BindingWrite>,
    phase: Phase,
}

impl BindingSetManager {
    /// Create an empty manager.
    pub fn new(frames_in_flight: usize) -> Self {
        Self {
            frames_in_flight: frames_in_flight.max(1),
            layouts: vec![],
            layout_index: HashMap::new(),
            sets: HashMap::new(),
            unmanaged: MultiMap::new(),
            phase: Phase::Declared,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Start managing a binding set. Returns the physical layout, which is shared with every other set that has
    /// a structurally identical layout. Managing a name twice with the same layout and mode does nothing.
    /// # Errors
    /// * Fails if the name is already managed with a different layout or mode.
    /// * Fails if the backend cannot create the layout.
    pub fn manage(
        &mut self,
        backend: &mut dyn Backend,
        name: impl Into<String>,
        layout: &BindingSetLayout,
        mode: SetMode,
    ) -> Result<vk::DescriptorSetLayout> {
        let name = name.into();
        if let Some(existing) = self.sets.get(&name) {
            let entry = &self.layouts[existing.layout];
            if entry.key != *layout || existing.mode != mode {
                return Err(Error::SetLayoutMismatch(name).into());
            }
            return Ok(entry.handle);
        }

        let layout_idx = match self.layout_index.get(layout) {
            Some(index) => *index,
            None => {
                let handle = backend.create_binding_set_layout(layout)?;
                #[cfg(feature = "log-objects")]
                trace!("Created new binding set layout {handle:?} for `{name}`");
                self.layouts.push(LayoutEntry {
                    key: layout.clone(),
                    handle,
                    records: vec![],
                    pools: vec![],
                });
                self.layout_index.insert(layout.clone(), self.layouts.len() - 1);
                self.layouts.len() - 1
            }
        };

        let entry = &mut self.layouts[layout_idx];
        let frames: Vec<Option<usize>> = match mode {
            SetMode::Shared => vec![None],
            SetMode::InFlight => (0..self.frames_in_flight).map(Some).collect(),
        };
        let records = frames
            .into_iter()
            .map(|frame| {
                entry.records.push(BindingSetRecord {
                    name: match frame {
                        None => name.clone(),
                        Some(index) => format!("{name}@{index}"),
                    },
                    frame,
                    set: None,
                    contents: vec![],
                    queued: vec![],
                });
                entry.records.len() - 1
            })
            .collect::<Vec<_>>();
        for write in self.unmanaged.remove(&name).unwrap_or_default() {
            for record in &records {
                entry.records[*record].stage(write);
            }
        }

        debug!("Managing binding set `{name}` ({mode:?}) with layout #{layout_idx}");
        self.sets.insert(
            name,
            ManagedSet {
                layout: layout_idx,
                mode,
                records,
            },
        );
        Ok(entry.handle)
    }

    /// Queue a write into a managed binding set. The write replaces earlier writes to the same slot element and is
    /// applied by the next flush that covers each of the set's records.
    /// # Errors
    /// * Fails with [`Error::SetNotManaged`] if the manager is committed and `name` is not managed. Before the
    ///   manager is committed, writes for unknown names are kept until the name is managed.
    pub fn update(&mut self, name: &str, write: BindingWrite) -> Result<()> {
        let Some(set) = self.sets.get(name) else {
            if self.phase == Phase::Committed {
                return Err(Error::SetNotManaged(name.to_owned()).into());
            }
            self.unmanaged.insert(name.to_owned(), write);
            return Ok(());
        };
        let entry = &mut self.layouts[set.layout];
        for record in &set.records {
            entry.records[*record].stage(write);
        }
        Ok(())
    }

    /// Allocate every managed set that has no physical handle yet and apply the queued writes of those new sets.
    /// Sets that are already allocated are left alone, including their queued writes, since a frame in flight may
    /// still use them. Calling this again without new [`BindingSetManager::manage()`] calls allocates nothing.
    /// # Errors
    /// * Fails if the backend cannot create a pool or allocate sets.
    /// * Fails if a queued write cannot be resolved, see [`BindingSetManager::flush()`].
    /// * Fails with [`Error::SetNotManaged`] if writes are still queued for a name that was never managed. These
    ///   writes are kept.
    pub fn allocate_all(&mut self, backend: &mut dyn Backend, resolver: &dyn ResolveBinding) -> Result<()> {
        let mut fresh = HashSet::new();
        for (index, entry) in self.layouts.iter_mut().enumerate() {
            let unallocated = entry
                .records
                .iter()
                .enumerate()
                .filter(|(_, record)| record.set.is_none())
                .map(|(i, _)| i)
                .collect::<Vec<_>>();
            if unallocated.is_empty() {
                continue;
            }
            let size = BindingPoolSize::for_layout(&entry.key, unallocated.len() as u32);
            let pool = backend.create_binding_set_pool(&size)?;
            #[cfg(feature = "log-objects")]
            trace!("Created new binding set pool {pool:?} for layout #{index}: {size}");
            entry.pools.push(pool);
            let layouts = vec![entry.handle; unallocated.len()];
            let sets = backend.allocate_binding_sets(pool, &layouts)?;
            if sets.len() != unallocated.len() {
                return Err(Error::AllocationFailed(format!("binding sets for layout #{index}")).into());
            }
            for (record, set) in unallocated.into_iter().zip(sets) {
                entry.records[record].set = Some(set);
                fresh.insert((index, record));
            }
            debug!("Allocated {} binding sets for layout #{index}", layouts.len());
        }

        self.phase = Phase::Committed;
        self.flush_records(backend, resolver, |layout, record, _| fresh.contains(&(layout, record)))?;

        let mut unmanaged = self.unmanaged.keys().cloned().collect::<Vec<_>>();
        unmanaged.sort();
        match unmanaged.into_iter().next() {
            Some(name) => Err(Error::SetNotManaged(name).into()),
            None => Ok(()),
        }
    }

    /// Whether a shared set has queued writes. Flushing those requires that no frame is in flight.
    pub fn has_queued_shared_writes(&self) -> bool {
        self.layouts
            .iter()
            .flat_map(|entry| entry.records.iter())
            .any(|record| record.frame.is_none() && record.set.is_some() && !record.queued.is_empty())
    }

    /// Apply the queued writes of every allocated record used by frame slot `frame_index`: its in-flight records and
    /// all shared records. The caller must have waited for the slot, and for every other slot as well if
    /// [`BindingSetManager::has_queued_shared_writes()`] holds. Returns the number of backend writes issued.
    /// # Errors
    /// * Fails with [`Error::SharedSetInFlightResource`] if a shared set was written with a resource that has one
    ///   allocation per frame in flight. The write stays queued.
    pub fn flush(&mut self, backend: &mut dyn Backend, resolver: &dyn ResolveBinding, frame_index: usize) -> Result<usize> {
        self.flush_records(backend, resolver, |_, _, record| {
            record.frame.map_or(true, |frame| frame == frame_index)
        })
    }

    fn flush_records(
        &mut self,
        backend: &mut dyn Backend,
        resolver: &dyn ResolveBinding,
        filter: impl Fn(usize, usize, &BindingSetRecord) -> bool,
    ) -> Result<usize> {
        let mut issued = 0;
        for (layout, entry) in self.layouts.iter_mut().enumerate() {
            for (index, record) in entry.records.iter_mut().enumerate() {
                if record.queued.is_empty() || record.set.is_none() || !filter(layout, index, record) {
                    continue;
                }
                let resolved = record
                    .queued
                    .iter()
                    .map(|write| record.resolve(write, resolver))
                    .collect::<Result<Vec<_>>>()?;
                backend.write_binding_sets(&resolved);
                issued += resolved.len();
                record.queued.clear();
            }
        }
        if issued > 0 {
            trace!("Flushed {issued} binding set writes");
        }
        Ok(issued)
    }

    /// Issue every write that points at one of `resources` again, for every allocated record, and apply it
    /// immediately. Used after resources were recreated, while no frame is in flight. Returns the number of backend
    /// writes issued.
    pub fn rewrite(
        &mut self,
        backend: &mut dyn Backend,
        resolver: &dyn ResolveBinding,
        resources: &HashSet<ResourceId>,
    ) -> Result<usize> {
        if resources.is_empty() {
            return Ok(0);
        }
        let affected = |write: &BindingWrite| {
            write
                .graph_resource()
                .map_or(false, |resource| resources.contains(&resource))
        };
        let mut resolved = Vec::new();
        for record in self.layouts.iter_mut().flat_map(|entry| entry.records.iter_mut()) {
            if record.set.is_none() {
                continue;
            }
            for write in record.contents.iter().filter(|write| affected(*write)) {
                resolved.push(record.resolve(write, resolver)?);
            }
            record.queued.retain(|write| !affected(write));
        }
        backend.write_binding_sets(&resolved);
        debug!("Re-issued {} binding set writes after resources were recreated", resolved.len());
        Ok(resolved.len())
    }

    /// Physical set of a managed name for a frame slot. Shared sets return the same set for every frame.
    /// # Errors
    /// * Fails if the name is not managed, or its sets were not allocated yet.
    pub fn set(&self, name: &str, frame: usize) -> Result<vk::DescriptorSet> {
        let set = self
            .sets
            .get(name)
            .ok_or_else(|| Error::SetNotManaged(name.to_owned()))?;
        let record = match set.mode {
            SetMode::Shared => set.records[0],
            SetMode::InFlight => *set
                .records
                .get(frame)
                .ok_or(Error::FrameIndexOutOfRange(frame))?,
        };
        self.layouts[set.layout].records[record]
            .set
            .ok_or_else(|| Error::SetNotAllocated(name.to_owned()).into())
    }

    /// Physical layout of a managed name.
    pub fn layout(&self, name: &str) -> Result<vk::DescriptorSetLayout> {
        self.sets
            .get(name)
            .map(|set| self.layouts[set.layout].handle)
            .ok_or_else(|| Error::SetNotManaged(name.to_owned()).into())
    }

    /// All records of a managed name.
    pub fn records(&self, name: &str) -> Result<Vec<&BindingSetRecord>> {
        let set = self
            .sets
            .get(name)
            .ok_or_else(|| Error::SetNotManaged(name.to_owned()))?;
        Ok(set
            .records
            .iter()
            .map(|index| &self.layouts[set.layout].records[*index])
            .collect())
    }

    /// Whether a name is managed.
    pub fn is_managed(&self, name: &str) -> bool {
        self.sets.contains_key(name)
    }

    /// Number of distinct physical layouts.
    pub fn layout_count(&self) -> usize {
        self.layouts.len()
    }

    /// Number of writes waiting to be applied for one name, summed over its records. Writes to a name that is not
    /// managed yet are counted once.
    pub fn pending_count(&self, name: &str) -> usize {
        match self.sets.get(name) {
            Some(set) => set
                .records
                .iter()
                .map(|record| self.layouts[set.layout].records[*record].queued.len())
                .sum(),
            None => self.unmanaged.get_vec(name).map_or(0, Vec::len),
        }
    }

    /// Mode of a managed name.
    pub fn mode(&self, name: &str) -> Option<SetMode> {
        self.sets.get(name).map(|set| set.mode)
    }

    /// Destroy all pools and layouts. All sets become invalid.
    pub fn destroy(&mut self, backend: &mut dyn Backend) {
        for entry in self.layouts.drain(..) {
            for pool in entry.pools {
                backend.destroy_binding_set_pool(pool);
            }
            backend.destroy_binding_set_layout(entry.handle);
        }
        self.layout_index.clear();
        self.sets.clear();
        self.unmanaged.clear();
    }
}
