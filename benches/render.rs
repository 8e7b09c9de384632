use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use bevy_code_analyzer::{IncrementalRenderer, MarkupFormat};

const SECTION: &str = "## Bugs and Inefficiencies\n\n- the loop re-allocates on every pass\n- `print` inside a hot loop is slow\n\n```python\nfor i in range(10):\n    print(i)\n```\n\n";

/// split a response into fixed-size fragments, like a model stream would.
fn fragments(sections: usize, chunk: usize) -> Vec<String> {
    let doc = SECTION.repeat(sections);
    doc.as_bytes()
        .chunks(chunk)
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .collect()
}

fn full_rerender(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_rerender");
    for sections in [4usize, 16, 64] {
        let frags = fragments(sections, 24);
        for format in [MarkupFormat::Html, MarkupFormat::Text] {
            group.bench_with_input(
                BenchmarkId::new(format!("{format:?}"), sections),
                &frags,
                |b, frags| {
                    b.iter(|| {
                        let mut r = IncrementalRenderer::new(format);
                        for f in frags {
                            black_box(r.push(f));
                        }
                        r.renders()
                    })
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, full_rerender);
criterion_main!(benches);
