//! Benchmarks for pairing, flattening and reply parsing.
//!
//! Run with: cargo bench
//!
//! All inputs are synthetic worksheet grids built in memory.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use sheetquiz::model::{IndexImage, IndexPage, IndexTextBlock};
use sheetquiz::{
    AnswerCandidate, BBox, ExtractionIndex, ImageFormat, PairingOptions, PairingStrategy,
};

/// A page laid out as a grid of pictures, each with a word label beneath it.
fn create_grid_page(page: u32, cells: usize) -> IndexPage {
    let mut images = Vec::with_capacity(cells);
    let mut text_blocks = Vec::with_capacity(cells);

    for i in 0..cells {
        let x = 40.0 + (i % 4) as f32 * 130.0;
        let y = 60.0 + (i / 4) as f32 * 140.0;

        let filename = format!("page_{}_img_{}.png", page, i + 1);
        images.push(IndexImage {
            path: format!("out/{}", filename),
            filename,
            format: ImageFormat::Png,
            size: 2048,
            coordinates: Some(BBox::new(x, y, x + 100.0, y + 100.0)),
        });
        text_blocks.push(IndexTextBlock {
            text: format!("word{}", i),
            coordinates: BBox::new(x + 20.0, y + 108.0, x + 80.0, y + 122.0),
            line_count: 1,
        });
    }

    IndexPage {
        page,
        total_images: images.len(),
        total_text_blocks: text_blocks.len(),
        images,
        text_blocks,
    }
}

fn candidates(cells: usize) -> Vec<AnswerCandidate> {
    (0..cells)
        .map(|i| AnswerCandidate {
            right_ans: format!("word{}", i),
            wrong_ans: vec![format!("ward{}", i), format!("wort{}", i)],
        })
        .collect()
}

/// Benchmark label-to-image pairing at various grid sizes.
fn bench_find_pairs(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_pairs");

    for cells in [4, 16, 64].iter() {
        let page = create_grid_page(1, *cells);
        let answers = candidates(*cells);

        for strategy in [PairingStrategy::All, PairingStrategy::Nearest] {
            let options = PairingOptions::new().with_strategy(strategy);
            group.bench_function(format!("{}_cells_{:?}", cells, strategy), |b| {
                b.iter(|| sheetquiz::find_pairs(black_box(&page), black_box(&answers), &options));
            });
        }
    }

    group.finish();
}

/// Benchmark flattening and prompt composition for a 20-page index.
fn bench_prompt_building(c: &mut Criterion) {
    let index = ExtractionIndex {
        pages: (1..=20).map(|p| create_grid_page(p, 16)).collect(),
    };

    c.bench_function("flatten_20_pages", |b| {
        b.iter(|| sheetquiz::flatten(black_box(&index)));
    });

    let pages = sheetquiz::flatten(&index);
    c.bench_function("build_prompt_20_pages", |b| {
        b.iter(|| sheetquiz::build_prompt("Classify each page.", "", black_box(&pages)).unwrap());
    });
}

/// Benchmark parsing a fenced classifier reply.
fn bench_parse_response(c: &mut Criterion) {
    let records: Vec<String> = (1..=20)
        .map(|p| {
            format!(
                r#"{{"page": {}, "question_type": "read images", "content": [{{"right_ans": "word1", "wrong_ans": ["ward1"]}}]}}"#,
                p
            )
        })
        .collect();
    let reply = format!("```json\n[{}]\n```", records.join(",\n"));

    c.bench_function("parse_fenced_reply", |b| {
        b.iter(|| sheetquiz::parse_response(black_box(&reply)).unwrap());
    });
}

criterion_group!(
    benches,
    bench_find_pairs,
    bench_prompt_building,
    bench_parse_response,
);
criterion_main!(benches);
