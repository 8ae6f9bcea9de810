use anyhow::Result;

use deimos::descriptor::write::Descriptor;
use deimos::prelude::*;

mod framework;

fn sampled_layout(stages: vk::ShaderStageFlags) -> BindingSetLayout {
    BindingSetLayout::new()
        .slot(0, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 1, stages)
        .slot(1, vk::DescriptorType::UNIFORM_BUFFER, 1, stages)
}

#[test]
fn identical_layouts_are_deduplicated() -> Result<()> {
    let mut graph = framework::make_graph(2);
    let a = graph.manage_binding_set("a", &sampled_layout(vk::ShaderStageFlags::FRAGMENT), SetMode::Shared)?;
    let b = graph.manage_binding_set("b", &sampled_layout(vk::ShaderStageFlags::FRAGMENT), SetMode::InFlight)?;
    assert_eq!(a, b);
    assert_eq!(graph.bindings().layout_count(), 1);
    assert_eq!(graph.backend().layout_count(), 1);

    let c = graph.manage_binding_set(
        "c",
        &sampled_layout(vk::ShaderStageFlags::FRAGMENT | vk::ShaderStageFlags::VERTEX),
        SetMode::Shared,
    )?;
    assert_ne!(a, c);
    assert_eq!(graph.bindings().layout_count(), 2);
    assert_eq!(graph.backend().layout_count(), 2);
    Ok(())
}

#[test]
fn pools_are_sized_per_layout() -> Result<()> {
    let mut graph = framework::make_graph(3);
    graph.manage_binding_set("shared", &sampled_layout(vk::ShaderStageFlags::FRAGMENT), SetMode::Shared)?;
    graph.manage_binding_set("in_flight", &sampled_layout(vk::ShaderStageFlags::FRAGMENT), SetMode::InFlight)?;
    graph.compile_ahead_of_time()?;

    // One shared record and three in-flight records share one layout, so one pool holds all four sets.
    let pools = graph.backend().pools();
    assert_eq!(pools.len(), 1);
    let size = pools.values().next().expect("one pool");
    assert_eq!(size.max_sets, 4);
    assert_eq!(size.count(vk::DescriptorType::COMBINED_IMAGE_SAMPLER), 4);
    assert_eq!(size.count(vk::DescriptorType::UNIFORM_BUFFER), 4);
    assert_eq!(graph.backend().set_count(), 4);

    assert_eq!(graph.binding_set("shared", 0)?, graph.binding_set("shared", 2)?);
    assert_ne!(graph.binding_set("in_flight", 0)?, graph.binding_set("in_flight", 1)?);
    let records = graph.bindings().records("in_flight")?;
    assert_eq!(records.len(), 3);
    assert_eq!(records[1].name(), "in_flight@1");
    assert_eq!(records[1].frame(), Some(1));
    Ok(())
}

#[test]
fn writes_before_manage_are_applied_once() -> Result<()> {
    let mut graph = framework::make_graph(1);
    let lit = graph.declare_texture("lit", framework::color_texture(), ResourceFlags::transient());
    graph.add_pass(PassBuilder::compute("shade").write(lit).build())?;
    let tonemap = graph.add_pass(PassBuilder::graphics("tonemap").sample(lit).build())?;

    graph.update_binding_set("tonemap", BindingWrite::sampled_image(0, tonemap, lit, vk::Sampler::null()))?;
    assert_eq!(graph.bindings().pending_count("tonemap"), 1);
    graph.manage_binding_set("tonemap", &sampled_layout(vk::ShaderStageFlags::FRAGMENT), SetMode::Shared)?;
    graph.compile_ahead_of_time()?;

    let writes = graph.backend().writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].set, graph.binding_set("tonemap", 0)?);
    assert_eq!(writes[0].binding, 0);
    assert_eq!(
        writes[0].descriptor,
        Descriptor::Image {
            view: graph.view(tonemap, lit, 0)?,
            sampler: vk::Sampler::null(),
            layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        }
    );
    assert_eq!(graph.bindings().pending_count("tonemap"), 0);

    // Nothing is left to flush on later frames.
    framework::record_frames(&mut graph, 2)?;
    assert_eq!(graph.backend().writes().len(), 1);
    Ok(())
}

#[test]
fn in_flight_writes_resolve_per_frame() -> Result<()> {
    let mut graph = framework::make_graph(2);
    let lit = graph.declare_texture("lit", framework::color_texture(), ResourceFlags::in_flight());
    graph.add_pass(PassBuilder::compute("shade").write(lit).build())?;
    let tonemap = graph.add_pass(PassBuilder::graphics("tonemap").sample(lit).build())?;
    graph.manage_binding_set("tonemap", &sampled_layout(vk::ShaderStageFlags::FRAGMENT), SetMode::InFlight)?;
    graph.update_binding_set("tonemap", BindingWrite::sampled_image(0, tonemap, lit, vk::Sampler::null()))?;
    graph.compile_ahead_of_time()?;

    let writes = graph.backend().writes();
    assert_eq!(writes.len(), 2);
    for frame in 0..2 {
        let set = graph.binding_set("tonemap", frame)?;
        let write = writes.iter().find(|write| write.set == set).expect("every frame set is written");
        let Descriptor::Image { view, .. } = write.descriptor else {
            panic!("expected an image descriptor");
        };
        assert_eq!(view, graph.view(tonemap, lit, frame)?);
    }
    Ok(())
}

#[test]
fn unmanaged_sets_are_rejected() -> Result<()> {
    let mut graph = framework::make_graph(1);
    let data = graph.declare_buffer("data", framework::fixed_buffer(64), ResourceFlags::transient());
    graph.add_pass(PassBuilder::compute("fill").write(data).build())?;
    graph.update_binding_set("forgotten", BindingWrite::storage_buffer(0, data))?;

    let err = graph.compile_ahead_of_time().unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::SetNotManaged(name)) if name == "forgotten"));
    // The write is kept, not dropped.
    assert_eq!(graph.bindings().pending_count("forgotten"), 1);
    Ok(())
}

#[test]
fn updates_after_commit_require_a_managed_set() -> Result<()> {
    let mut graph = framework::make_graph(1);
    let data = graph.declare_buffer("data", framework::fixed_buffer(64), ResourceFlags::transient());
    graph.add_pass(PassBuilder::compute("fill").write(data).build())?;
    graph.compile_ahead_of_time()?;
    assert_eq!(graph.bindings().phase(), Phase::Committed);

    let err = graph
        .update_binding_set("late", BindingWrite::storage_buffer(0, data))
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::SetNotManaged(_))));
    Ok(())
}

#[test]
fn sets_managed_after_compile_are_allocated_on_demand() -> Result<()> {
    let mut graph = framework::make_graph(1);
    let data = graph.declare_buffer("data", framework::fixed_buffer(64), ResourceFlags::transient());
    graph.add_pass(PassBuilder::compute("fill").write(data).build())?;
    graph.manage_binding_set("early", &sampled_layout(vk::ShaderStageFlags::COMPUTE), SetMode::Shared)?;
    graph.compile_ahead_of_time()?;
    let early = graph.binding_set("early", 0)?;

    let layout = BindingSetLayout::new().slot(0, vk::DescriptorType::STORAGE_BUFFER, 1, vk::ShaderStageFlags::COMPUTE);
    graph.manage_binding_set("late", &layout, SetMode::Shared)?;
    assert!(matches!(
        graph.binding_set("late", 0).unwrap_err().downcast_ref::<Error>(),
        Some(Error::SetNotAllocated(_))
    ));
    graph.update_binding_set("late", BindingWrite::storage_buffer(0, data))?;
    graph.allocate_binding_sets()?;

    assert_eq!(graph.binding_set("early", 0)?, early);
    let late = graph.binding_set("late", 0)?;
    assert_eq!(graph.backend().writes().last().map(|write| write.set), Some(late));

    // Allocating again without new sets does nothing.
    let sets = graph.backend().set_count();
    graph.allocate_binding_sets()?;
    assert_eq!(graph.backend().set_count(), sets);
    Ok(())
}

#[test]
fn managing_twice_with_another_layout_fails() -> Result<()> {
    let mut graph = framework::make_graph(1);
    graph.manage_binding_set("set", &sampled_layout(vk::ShaderStageFlags::FRAGMENT), SetMode::Shared)?;
    graph.manage_binding_set("set", &sampled_layout(vk::ShaderStageFlags::FRAGMENT), SetMode::Shared)?;
    let err = graph
        .manage_binding_set("set", &sampled_layout(vk::ShaderStageFlags::VERTEX), SetMode::Shared)
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::SetLayoutMismatch(_))));
    Ok(())
}

#[test]
fn later_writes_replace_earlier_ones() -> Result<()> {
    let mut graph = framework::make_graph(1);
    let a = graph.declare_buffer("a", framework::fixed_buffer(64), ResourceFlags::transient());
    let b = graph.declare_buffer("b", framework::fixed_buffer(64), ResourceFlags::transient());
    graph.add_pass(PassBuilder::compute("fill").write(a).write(b).build())?;
    let layout = BindingSetLayout::new().slot(0, vk::DescriptorType::STORAGE_BUFFER, 1, vk::ShaderStageFlags::COMPUTE);
    graph.manage_binding_set("set", &layout, SetMode::Shared)?;
    graph.update_binding_set("set", BindingWrite::storage_buffer(0, a))?;
    graph.compile_ahead_of_time()?;

    graph.update_binding_set("set", BindingWrite::storage_buffer(0, b))?;
    graph.record_frame(0, 0)?;
    let buffer_b = graph.physical(b)?.buffer(0).expect("b is a buffer");
    let Some(Descriptor::Buffer { buffer, .. }) = graph.backend().writes().last().map(|write| write.descriptor) else {
        panic!("expected a buffer write");
    };
    assert_eq!(buffer, buffer_b);
    assert_eq!(graph.backend().writes().len(), 2);
    Ok(())
}

#[test]
fn shared_sets_reject_in_flight_resources() -> Result<()> {
    let mut graph = framework::make_graph(2);
    let lit = graph.declare_texture("lit", framework::color_texture(), ResourceFlags::in_flight());
    graph.add_pass(PassBuilder::compute("shade").write(lit).build())?;
    let tonemap = graph.add_pass(PassBuilder::graphics("tonemap").sample(lit).build())?;
    graph.manage_binding_set("tonemap", &sampled_layout(vk::ShaderStageFlags::FRAGMENT), SetMode::Shared)?;

    let err = graph
        .update_binding_set("tonemap", BindingWrite::sampled_image(0, tonemap, lit, vk::Sampler::null()))
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::SharedSetInFlightResource { set, resource }) if set == "tonemap" && resource == "lit"
    ));
    assert_eq!(graph.bindings().pending_count("tonemap"), 0);
    Ok(())
}

#[test]
fn shared_sets_written_before_manage_reject_in_flight_resources() -> Result<()> {
    let mut graph = framework::make_graph(2);
    let lit = graph.declare_texture("lit", framework::color_texture(), ResourceFlags::in_flight());
    graph.add_pass(PassBuilder::compute("shade").write(lit).build())?;
    let tonemap = graph.add_pass(PassBuilder::graphics("tonemap").sample(lit).build())?;
    graph.update_binding_set("tonemap", BindingWrite::sampled_image(0, tonemap, lit, vk::Sampler::null()))?;
    graph.manage_binding_set("tonemap", &sampled_layout(vk::ShaderStageFlags::FRAGMENT), SetMode::Shared)?;

    let err = graph.compile_ahead_of_time().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::SharedSetInFlightResource { set, .. }) if set == "tonemap"
    ));
    assert!(graph.backend().writes().is_empty());
    assert_eq!(graph.backend().live_object_count(), 0);
    Ok(())
}

#[test]
fn in_flight_updates_only_touch_the_recorded_slot() -> Result<()> {
    let mut graph = framework::make_graph(2);
    let lit = graph.declare_texture("lit", framework::color_texture(), ResourceFlags::in_flight());
    graph.add_pass(PassBuilder::compute("shade").write(lit).build())?;
    let tonemap = graph.add_pass(PassBuilder::graphics("tonemap").sample(lit).build())?;
    graph.manage_binding_set("tonemap", &sampled_layout(vk::ShaderStageFlags::FRAGMENT), SetMode::InFlight)?;
    graph.compile_ahead_of_time()?;
    framework::record_frames(&mut graph, 2)?;
    graph.backend_mut().clear_writes();

    graph.update_binding_set("tonemap", BindingWrite::sampled_image(0, tonemap, lit, vk::Sampler::null()))?;
    assert_eq!(graph.bindings().pending_count("tonemap"), 2);

    // Frame 1 may still be executing, so only the set of frame 0 is written.
    graph.record_frame(0, 0)?;
    let set_0 = graph.binding_set("tonemap", 0)?;
    let set_1 = graph.binding_set("tonemap", 1)?;
    let writes = graph.backend().writes().to_vec();
    assert_eq!(writes.len(), 1);
    assert!(writes.iter().all(|write| write.set == set_0));
    assert!(!writes.iter().any(|write| write.set == set_1));
    assert_eq!(graph.bindings().pending_count("tonemap"), 1);

    graph.record_frame(1, 0)?;
    let writes = graph.backend().writes().to_vec();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[1].set, set_1);
    let Descriptor::Image { view, .. } = writes[1].descriptor else {
        panic!("expected an image descriptor");
    };
    assert_eq!(view, graph.view(tonemap, lit, 1)?);
    assert_eq!(graph.bindings().pending_count("tonemap"), 0);
    assert_eq!(graph.backend().idle_waits(), 0);
    Ok(())
}

#[test]
fn shared_updates_wait_for_every_frame() -> Result<()> {
    let mut graph = framework::make_graph(2);
    let data = graph.declare_buffer("data", framework::fixed_buffer(64), ResourceFlags::transient());
    graph.add_pass(PassBuilder::compute("fill").write(data).build())?;
    let layout = BindingSetLayout::new().slot(0, vk::DescriptorType::STORAGE_BUFFER, 1, vk::ShaderStageFlags::COMPUTE);
    graph.manage_binding_set("set", &layout, SetMode::Shared)?;
    graph.compile_ahead_of_time()?;
    framework::record_frames(&mut graph, 2)?;
    assert_eq!(graph.backend().idle_waits(), 0);

    graph.update_binding_set("set", BindingWrite::storage_buffer(0, data))?;
    graph.record_frame(0, 0)?;
    assert_eq!(graph.backend().idle_waits(), 1);
    assert_eq!(graph.backend().writes().last().map(|write| write.set), Some(graph.binding_set("set", 0)?));

    // Nothing is pending anymore, so the next frame only waits for its own slot.
    graph.record_frame(1, 0)?;
    assert_eq!(graph.backend().idle_waits(), 1);
    assert_eq!(graph.backend().waits(), &[0, 1, 0, 1]);
    Ok(())
}
