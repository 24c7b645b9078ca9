use criterion::{Criterion, black_box, criterion_group, criterion_main};
use specmark::{
    Diagnostics, ParseConfig, SerializeOptions, nodes_from_html, parse_text, str_from_nodes,
};

const SMALL_BLOCKS: usize = 64;
const LARGE_BLOCKS: usize = 5_000;

fn make_blocks(blocks: usize) -> String {
    let block = "<div class=box><p>The <<length>> of ''auto'' &amp; `code`\n[TITLE] rocks—\nand <em>more</em></p></div>\n";
    block.repeat(blocks)
}

fn make_macro_heavy(blocks: usize) -> String {
    "[TITLE] [LEVEL] [NOPE?] \\[ESCAPED]\n".repeat(blocks)
}

fn config() -> ParseConfig {
    ParseConfig {
        css: true,
        markdown: true,
        ..ParseConfig::default()
    }
    .with_macro("title", "My <b>Spec</b>")
    .with_macro("level", "1")
}

fn bench_parse_small(c: &mut Criterion) {
    let input = make_blocks(SMALL_BLOCKS);
    let config = config();
    c.bench_function("bench_parse_small", |b| {
        b.iter(|| {
            let diags = Diagnostics::new();
            let nodes = nodes_from_html(black_box(&input), &config, &diags, 1, true);
            black_box(nodes.len());
        });
    });
}

fn bench_parse_large(c: &mut Criterion) {
    let input = make_blocks(LARGE_BLOCKS);
    let config = config();
    c.bench_function("bench_parse_large", |b| {
        b.iter(|| {
            let diags = Diagnostics::new();
            let nodes = nodes_from_html(black_box(&input), &config, &diags, 1, true);
            black_box(nodes.len());
        });
    });
}

fn bench_macros(c: &mut Criterion) {
    let input = make_macro_heavy(LARGE_BLOCKS);
    let config = config();
    c.bench_function("bench_macros", |b| {
        b.iter(|| {
            let diags = Diagnostics::new();
            black_box(parse_text(black_box(&input), &config, &diags, 1, false));
        });
    });
}

fn bench_serialize_with_markers(c: &mut Criterion) {
    let input = make_blocks(LARGE_BLOCKS);
    let config = config();
    let diags = Diagnostics::new();
    let nodes = nodes_from_html(&input, &config, &diags, 1, true);
    c.bench_function("bench_serialize_with_markers", |b| {
        b.iter(|| {
            black_box(str_from_nodes(
                black_box(&nodes),
                SerializeOptions::with_markers(),
            ));
        });
    });
}

criterion_group!(
    benches,
    bench_parse_small,
    bench_parse_large,
    bench_macros,
    bench_serialize_with_markers
);
criterion_main!(benches);
