use anyhow::Result;

use deimos::prelude::*;

mod framework;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Touch {
    Read,
    Write,
    Sample,
    RenderTarget,
}

const ALL_TOUCHES: [Touch; 4] = [Touch::Read, Touch::Write, Touch::Sample, Touch::RenderTarget];

fn touch(builder: PassBuilder, resource: ResourceId, touch: Touch) -> PassBuilder {
    match touch {
        Touch::Read => builder.read(resource),
        Touch::Write => builder.write(resource),
        Touch::Sample => builder.sample(resource),
        Touch::RenderTarget => builder.load_target(resource),
    }
}

fn expects_hazard(prev: Touch, cur: Touch) -> bool {
    !(prev == cur && matches!(prev, Touch::Read | Touch::Sample))
}

#[test]
fn hazard_table_is_complete() -> Result<()> {
    for prev in ALL_TOUCHES {
        for cur in ALL_TOUCHES {
            let mut graph = framework::make_graph(1);
            let image = graph.declare_texture("image", framework::color_texture(), ResourceFlags::transient());
            let first = graph.add_pass(touch(PassBuilder::graphics("first"), image, prev).build())?;
            let second = graph.add_pass(touch(PassBuilder::graphics("second"), image, cur).build())?;
            graph.compile_ahead_of_time()?;

            let planned = graph
                .barriers(second)
                .iter()
                .filter(|barrier| barrier.resource == image && !barrier.is_first_touch())
                .collect::<Vec<_>>();
            let expected = expects_hazard(prev, cur);
            assert_eq!(planned.len(), usize::from(expected), "{prev:?} -> {cur:?}");
            if let Some(barrier) = planned.first() {
                assert!(matches!(barrier.src, BarrierSource::Touch { pass, .. } if pass == first));
            }

            let commands = graph.record_frame(0, 0)?;
            let executed = framework::image_barriers_for(&commands, image)
                .into_iter()
                .filter(|barrier| barrier.is_execution_barrier())
                .count();
            assert_eq!(executed, usize::from(expected), "{prev:?} -> {cur:?}");
        }
    }
    Ok(())
}

#[test]
fn storage_read_then_sample_transitions_layout() -> Result<()> {
    let mut graph = framework::make_graph(1);
    let image = graph.declare_texture("image", framework::color_texture(), ResourceFlags::transient());
    graph.add_pass(PassBuilder::compute("read").read(image).build())?;
    let sample = graph.add_pass(PassBuilder::graphics("sample").sample(image).build())?;
    graph.compile_ahead_of_time()?;

    let barrier = graph
        .barriers(sample)
        .iter()
        .find(|barrier| !barrier.is_first_touch())
        .copied()
        .expect("read -> sample needs a barrier");
    let BarrierSource::Touch { state, .. } = barrier.src else {
        panic!("expected a barrier against the previous touch");
    };
    assert_eq!(state.layout, vk::ImageLayout::GENERAL);
    assert_eq!(barrier.dst.layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
    assert_eq!(barrier.dst.stage, vk::PipelineStageFlags2::FRAGMENT_SHADER);
    Ok(())
}

#[test]
fn buffers_only_synchronize_writes() -> Result<()> {
    let mut graph = framework::make_graph(1);
    let buffer = graph.declare_buffer("buffer", framework::fixed_buffer(256), ResourceFlags::transient());
    graph.add_pass(PassBuilder::compute("read_a").read(buffer).build())?;
    let read_b = graph.add_pass(PassBuilder::compute("read_b").read(buffer).build())?;
    let write = graph.add_pass(PassBuilder::compute("write").write(buffer).build())?;
    graph.compile_ahead_of_time()?;

    assert!(graph.barriers(read_b).is_empty());
    assert_eq!(graph.barriers(write).len(), 1);
    Ok(())
}

#[test]
fn depth_targets_use_fragment_test_stages() -> Result<()> {
    let mut graph = framework::make_graph(1);
    let depth = graph.declare_texture(
        "depth",
        TextureDesc::new(vk::Format::D32_SFLOAT, ImageExtent::surface()),
        ResourceFlags::transient(),
    );
    let prepass = graph.add_pass(
        PassBuilder::graphics("prepass")
            .clear_depth_target(depth, ClearDepthStencil { depth: 1.0, stencil: 0 })
            .build(),
    )?;
    graph.compile_ahead_of_time()?;

    let barrier = graph.barriers(prepass)[0];
    assert_eq!(barrier.dst.layout, vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL);
    assert!(barrier
        .dst
        .stage
        .contains(vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS));
    assert!(barrier.dst.access.contains(vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE));

    let commands = graph.record_frame(0, 0)?;
    let barriers = framework::image_barriers_for(&commands, depth);
    assert_eq!(barriers.len(), 1);
    assert_eq!(barriers[0].aspect, vk::ImageAspectFlags::DEPTH);
    Ok(())
}

#[test]
fn first_sample_only_transitions_layout() -> Result<()> {
    let mut graph = framework::make_graph(2);
    let image = graph.declare_texture("image", framework::color_texture(), ResourceFlags::transient());
    graph.add_pass(PassBuilder::graphics("sample").sample(image).build())?;
    graph.compile_ahead_of_time()?;

    let commands = graph.record_frame(0, 0)?;
    let barriers = framework::image_barriers_for(&commands, image);
    assert_eq!(barriers.len(), 1);
    assert!(barriers[0].is_layout_transition());
    assert!(!barriers[0].is_execution_barrier());
    assert_eq!(barriers[0].src.layout, vk::ImageLayout::UNDEFINED);
    assert_eq!(barriers[0].dst.layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);

    // The image stays in the same layout, and nothing writes it, so later frames need nothing.
    let commands = graph.record_frame(1, 0)?;
    assert!(framework::image_barriers_for(&commands, image).is_empty());
    Ok(())
}

#[test]
fn in_flight_resources_do_not_wait_on_previous_frames() -> Result<()> {
    let mut graph = framework::make_graph(2);
    let image = graph.declare_texture("image", framework::color_texture(), ResourceFlags::in_flight());
    graph.add_pass(PassBuilder::compute("write").write(image).build())?;
    graph.add_pass(PassBuilder::graphics("sample").sample(image).build())?;
    graph.compile_ahead_of_time()?;

    framework::record_frames(&mut graph, 2)?;
    // Slot 0 was last left in SHADER_READ_ONLY_OPTIMAL by the sampling pass.
    let commands = graph.record_frame(0, 0)?;
    let first = framework::image_barriers_for(&commands, image)[0];
    assert_eq!(first.src.stage, vk::PipelineStageFlags2::NONE);
    assert_eq!(first.src.access, vk::AccessFlags2::NONE);
    assert_eq!(first.src.layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
    assert_eq!(first.dst.layout, vk::ImageLayout::GENERAL);
    Ok(())
}

#[test]
fn shared_resources_wait_on_previous_frames() -> Result<()> {
    let mut graph = framework::make_graph(2);
    let image = graph.declare_texture("image", framework::color_texture(), ResourceFlags::transient());
    graph.add_pass(PassBuilder::compute("write").write(image).build())?;
    graph.add_pass(PassBuilder::graphics("sample").sample(image).build())?;
    graph.compile_ahead_of_time()?;

    graph.record_frame(0, 0)?;
    let commands = graph.record_frame(1, 0)?;
    let first = framework::image_barriers_for(&commands, image)[0];
    assert!(first.is_execution_barrier());
    assert_eq!(first.src.stage, vk::PipelineStageFlags2::FRAGMENT_SHADER);
    assert_eq!(first.src.layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
    Ok(())
}

#[test]
fn in_flight_buffers_skip_the_first_touch_barrier() -> Result<()> {
    let mut graph = framework::make_graph(2);
    let overlapping = graph.declare_buffer("overlapping", framework::fixed_buffer(64), ResourceFlags::in_flight());
    let shared = graph.declare_buffer("shared", framework::fixed_buffer(64), ResourceFlags::transient());
    graph.add_pass(PassBuilder::compute("write").write(overlapping).write(shared).build())?;
    graph.add_pass(PassBuilder::compute("read").read(overlapping).read(shared).build())?;
    graph.compile_ahead_of_time()?;

    let frames = framework::record_frames(&mut graph, 3)?;
    // Within a frame both need the write -> read barrier.
    for commands in &frames {
        assert!(!framework::buffer_barriers_for(commands, overlapping).is_empty());
    }
    // Across frames only the shared buffer waits for the reads of the previous frame.
    assert_eq!(framework::buffer_barriers_for(&frames[2], overlapping).len(), 1);
    assert_eq!(framework::buffer_barriers_for(&frames[1], shared).len(), 2);
    assert_eq!(framework::buffer_barriers_for(&frames[0], shared).len(), 1);
    Ok(())
}

#[test]
fn disabling_the_writer_resynthesizes_barriers() -> Result<()> {
    let mut graph = framework::make_graph(1);
    let buffer = graph.declare_buffer("buffer", framework::fixed_buffer(128), ResourceFlags::transient());
    let writer = graph.add_pass(PassBuilder::compute("writer").write(buffer).build())?;
    let reader = graph.add_pass(PassBuilder::compute("reader").read(buffer).build())?;
    graph.compile_ahead_of_time()?;
    let always_enabled = graph.barriers(reader).to_vec();

    let commands = graph.record_frame(0, 0)?;
    assert_eq!(framework::buffer_barriers_for(&commands, buffer).len(), 1);

    graph.disable_pass("writer")?;
    let commands = graph.record_frame(0, 0)?;
    assert!(framework::buffer_barriers_for(&commands, buffer).is_empty());
    assert!(graph.barriers(reader).iter().all(PlannedBarrier::is_first_touch));
    assert!(graph.barriers(writer).is_empty());

    graph.enable_pass("writer")?;
    let commands = graph.record_frame(0, 0)?;
    assert_eq!(graph.barriers(reader), always_enabled.as_slice());
    let before_reader = graph
        .barriers(reader)
        .iter()
        .filter(|barrier| !barrier.is_first_touch())
        .collect::<Vec<_>>();
    assert_eq!(before_reader.len(), 1);
    assert!(matches!(before_reader[0].src, BarrierSource::Touch { pass, .. } if pass == writer));
    // The writer also waits for the reads of the previous frame.
    assert_eq!(framework::buffer_barriers_for(&commands, buffer).len(), 2);
    Ok(())
}

#[test]
fn plan_is_cached_while_topology_is_unchanged() -> Result<()> {
    let mut graph = framework::make_graph(1);
    let image = graph.declare_texture("image", framework::color_texture(), ResourceFlags::transient());
    graph.add_pass(PassBuilder::compute("write").write(image).build())?;
    graph.add_pass(PassBuilder::graphics("sample").sample(image).build())?;
    graph.compile_ahead_of_time()?;

    let before = graph.barrier_plan().cloned().expect("plan is synthesized on compile");
    framework::record_frames(&mut graph, 3)?;
    let after = graph.barrier_plan().expect("plan is cached");
    assert_eq!(before.topology(), after.topology());
    assert_eq!(before.len(), after.len());
    Ok(())
}

#[test]
fn mipmapped_samples_regenerate_mips() -> Result<()> {
    let mut graph = framework::make_graph(1);
    let image = graph.declare_texture(
        "image",
        TextureDesc::new(vk::Format::R8G8B8A8_UNORM, ImageExtent::absolute_2d(256, 256)).mip_levels(9),
        ResourceFlags::transient(),
    );
    graph.add_pass(PassBuilder::compute("write").write(image).build())?;
    let sample = graph.add_pass(PassBuilder::graphics("sample").sample_mipmapped(image).build())?;
    graph.compile_ahead_of_time()?;

    let barrier = graph
        .barriers(sample)
        .iter()
        .find(|barrier| !barrier.is_first_touch())
        .copied()
        .expect("write -> sample needs a barrier");
    assert!(barrier.dst.stage.contains(vk::PipelineStageFlags2::ALL_TRANSFER));

    let commands = graph.record_frame(0, 0)?;
    let mips = commands
        .iter()
        .filter(|command| matches!(command, Command::GenerateMipmaps { mip_levels: 9, .. }))
        .count();
    assert_eq!(mips, 1);
    assert_eq!(framework::image_barriers_for(&commands, image)[0].mip_levels, 9);
    Ok(())
}
