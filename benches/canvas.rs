use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use workflow_canvas::geometry::{Point, Rect};
use workflow_canvas::model::{BlockGroup, Edge, Endpoint, GroupKind, Step, StepType};
use workflow_canvas::{Canvas, CanvasConfig, PortCatalog, Workflow, layout_with_groups};

/// A switch fanning out to `branches` groups, each holding a short chain,
/// all joining into one final step.
fn fan_out_workflow(branches: usize) -> Workflow {
    let cases: Vec<serde_json::Value> = (0..branches)
        .map(|idx| serde_json::json!({ "id": format!("case_{idx}") }))
        .collect();
    let mut workflow = Workflow::default();
    workflow.steps.push(Step::new("start", StepType::Start, 0.0, 0.0));
    workflow.steps.push(
        Step::new("fan", StepType::Switch, 0.0, 0.0).with_config(serde_json::json!({ "cases": cases })),
    );
    workflow.steps.push(Step::new("join", StepType::Join, 0.0, 0.0));
    workflow.edges.push(Edge::steps("e_start", "start", "fan"));

    for idx in 0..branches {
        let group_id = format!("g{idx}");
        workflow.groups.push(BlockGroup::new(
            group_id.clone(),
            GroupKind::Parallel,
            Rect::new(0.0, 0.0, 280.0, 200.0),
        ));
        let head = format!("b{idx}_head");
        let tail = format!("b{idx}_tail");
        workflow
            .steps
            .push(Step::new(head.clone(), StepType::Llm, 0.0, 0.0).in_group(group_id.clone()));
        workflow
            .steps
            .push(Step::new(tail.clone(), StepType::Tool, 0.0, 0.0).in_group(group_id.clone()));
        workflow.edges.push(Edge::steps(format!("e{idx}_in"), &head, &tail));
        workflow.edges.push(
            Edge::new(
                format!("e{idx}_case"),
                Endpoint::Step("fan".into()),
                Endpoint::Group(group_id.clone()),
            )
            .from_port(format!("case_{idx}")),
        );
        workflow.edges.push(Edge::new(
            format!("e{idx}_join"),
            Endpoint::Group(group_id),
            Endpoint::Step("join".into()),
        ));
    }
    workflow
}

/// Groups in one row, each touching the next, so a nudge to the first one
/// cascades through all of them.
fn group_row(count: usize) -> Workflow {
    let mut workflow = Workflow::default();
    for idx in 0..count {
        let x = idx as f32 * 320.0;
        let group_id = format!("g{idx}");
        workflow.groups.push(BlockGroup::new(
            group_id.clone(),
            GroupKind::Foreach,
            Rect::new(x, 0.0, 300.0, 200.0),
        ));
        workflow
            .steps
            .push(Step::new(format!("m{idx}"), StepType::Llm, x + 40.0, 80.0).in_group(group_id));
    }
    workflow
}

fn bench_layout(c: &mut Criterion) {
    let config = CanvasConfig::default();
    let mut group = c.benchmark_group("layout_with_groups");
    for branches in [4usize, 16, 64] {
        let workflow = fan_out_workflow(branches);
        group.bench_with_input(BenchmarkId::from_parameter(branches), &workflow, |b, workflow| {
            b.iter(|| layout_with_groups(black_box(workflow), PortCatalog::builtin(), &config))
        });
    }
    group.finish();
}

fn bench_cascade(c: &mut Criterion) {
    let config = CanvasConfig::default();
    let mut group = c.benchmark_group("group_drag_cascade");
    for count in [4usize, 10, 32] {
        let workflow = group_row(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &workflow, |b, workflow| {
            b.iter(|| {
                Canvas::new(black_box(workflow), &config).drag_group("g0", Point::new(20.0, 0.0))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_layout, bench_cascade);
criterion_main!(benches);
