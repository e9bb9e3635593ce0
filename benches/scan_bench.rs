/// Benchmarks for the tokenscope scanners.
///
/// Run with: `cargo bench`
///
/// - Usage scan: sequential walk vs roots spread over the rayon pool
/// - Binding scan with record collection
/// - Structural sort of a large token catalog

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokenscope::domain::document::{Binding, Node, Paint, VariableRef};
use tokenscope::domain::taxonomy::structural_sort;
use tokenscope::domain::walker::{collect_bindings, collect_used_ids, collect_used_ids_parallel};

// ═══════════════════════════════════════════════════════════════════════════
// Synthetic Data Generators
// ═══════════════════════════════════════════════════════════════════════════

/// A page of `roots` frames, each `depth` levels deep with `fanout` children
/// per level. Every node binds a fill, a stroke and a spacing variable.
fn create_synthetic_page(roots: usize, depth: usize, fanout: usize) -> Vec<Node> {
    fn build(prefix: &str, level: usize, depth: usize, fanout: usize, counter: &mut usize) -> Node {
        *counter += 1;
        let n = *counter;
        let mut node = Node::new(format!("{}:{}", prefix, n), format!("Layer {}", n))
            .with_fill(Paint::bound_to(format!("V{}", n % 400)))
            .with_stroke(Paint::bound_to(format!("V{}", (n + 7) % 400)))
            .with_binding("itemSpacing", Binding::Single(VariableRef::to(format!("S{}", n % 40))));

        if level < depth {
            for _ in 0..fanout {
                node = node.with_child(build(prefix, level + 1, depth, fanout, counter));
            }
        }
        node
    }

    (0..roots)
        .map(|r| {
            let mut counter = 0;
            build(&r.to_string(), 0, depth, fanout, &mut counter)
        })
        .collect()
}

fn create_token_names(count: usize) -> Vec<String> {
    let categories = ["color", "layout", "typography", "borders", "motion"];
    let subcategories = ["bg", "gap", "font-size", "border-radius", "text", "curve"];
    let sizes = ["small", "medium", "large", ""];
    let states = ["rest", "hovered", "active", "disabled", ""];

    (0..count)
        .map(|i| {
            let mut parts = vec![
                categories[i % categories.len()],
                subcategories[(i / 5) % subcategories.len()],
            ];
            for optional in [sizes[(i / 3) % sizes.len()], states[(i / 7) % states.len()]] {
                if !optional.is_empty() {
                    parts.push(optional);
                }
            }
            format!("{}/token-{}", parts.join("/"), i)
        })
        .collect()
}

fn count_nodes(nodes: &[Node]) -> usize {
    nodes.iter().map(|n| 1 + count_nodes(n.children())).sum()
}

// ═══════════════════════════════════════════════════════════════════════════
// Usage Scan Benchmarks
// ═══════════════════════════════════════════════════════════════════════════

fn bench_usage_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan/usage");
    group.sample_size(30);

    for roots in [4, 16, 64].iter() {
        let page = create_synthetic_page(*roots, 4, 4);
        let refs: Vec<&Node> = page.iter().collect();
        group.throughput(Throughput::Elements(count_nodes(&page) as u64));

        group.bench_with_input(BenchmarkId::new("sequential", roots), &refs, |b, refs| {
            b.iter(|| collect_used_ids(black_box(refs).iter().copied()))
        });

        group.bench_with_input(BenchmarkId::new("parallel", roots), &refs, |b, refs| {
            b.iter(|| collect_used_ids_parallel(black_box(refs)))
        });
    }

    group.finish();
}

fn bench_binding_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan/bindings");

    let page = create_synthetic_page(16, 4, 4);
    group.throughput(Throughput::Elements(count_nodes(&page) as u64));

    group.bench_function("collect_bindings", |b| b.iter(|| collect_bindings(black_box(&page).iter())));

    group.finish();
}

// ═══════════════════════════════════════════════════════════════════════════
// Structural Sort Benchmarks
// ═══════════════════════════════════════════════════════════════════════════

fn bench_structural_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("taxonomy/structural_sort");

    for count in [100, 1_000, 10_000].iter() {
        let names = create_token_names(*count);
        group.throughput(Throughput::Elements(*count as u64));

        group.bench_with_input(BenchmarkId::new("names", count), &names, |b, names| {
            b.iter(|| structural_sort(black_box(names)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_usage_scan, bench_binding_scan, bench_structural_sort);
criterion_main!(benches);
