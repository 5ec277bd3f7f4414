// Transcript benchmark - measure recognition payload parsing and reassembly
//
// Run with: cargo bench --bench transcript_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lecture_notes_speech::{assemble_transcript, parse_recognition_lines, TranscriptFragment};

/// Build a synthetic recognition payload with one refinement line per utterance
fn recognition_payload(utterances: usize) -> String {
    let mut lines = Vec::with_capacity(utterances * 2);
    for index in 0..utterances {
        // Raw final line followed by its refinement, as the service emits them
        lines.push(format!(
            r#"{{"result":{{"channelTag":"0","final":{{"alternatives":[{{"text":"utterance {index} raw text for benchmarking"}}],"finalIndex":{index}}}}}}}"#
        ));
        lines.push(format!(
            r#"{{"result":{{"channelTag":"0","finalRefinement":{{"normalizedText":{{"alternatives":[{{"text":"Utterance {index} normalized text for benchmarking."}}]}},"finalIndex":{index}}}}}}}"#
        ));
    }
    lines.join("\n")
}

fn fragments(count: usize) -> Vec<TranscriptFragment> {
    (0..count)
        .map(|index| TranscriptFragment {
            final_index: index as u64,
            text: format!("Utterance {index} normalized text for benchmarking."),
        })
        .collect()
}

/// Benchmark payload parsing at typical lecture sizes
fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_recognition_lines");

    // 100 utterances is a short talk, 2000 a multi-hour lecture
    for utterances in [100usize, 500, 2000] {
        let payload = recognition_payload(utterances);

        group.bench_with_input(
            BenchmarkId::from_parameter(utterances),
            &payload,
            |b, payload| {
                b.iter(|| {
                    let parsed = parse_recognition_lines(black_box(payload));
                    black_box(parsed)
                });
            },
        );
    }

    group.finish();
}

/// Benchmark joining parsed fragments into the final transcript
fn bench_assemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("assemble_transcript");

    for count in [100usize, 500, 2000] {
        let input = fragments(count);

        group.bench_with_input(BenchmarkId::from_parameter(count), &input, |b, input| {
            b.iter(|| {
                let transcript = assemble_transcript(black_box(input));
                black_box(transcript)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_assemble);
criterion_main!(benches);
