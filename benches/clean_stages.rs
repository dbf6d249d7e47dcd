use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use transit_eda::{
    frame::Frame,
    pipeline::{aggregate_frame, clean_frame},
    profile::Profile,
};

const METROS: &[&str] = &[
    "Akron, OH",
    "Boise City, ID",
    "Canton-Massillon, OH",
    "Dayton-Kettering, OH",
    "Eugene-Springfield, OR",
];

fn synthetic_frame(rows: usize) -> Frame {
    let headers = [
        "CBSA_Name",
        "GEOID10",
        "STATEFP",
        "TrAccess_Index",
        "Pct_Jobs_byTr_av",
        "Pct_Pop_byTr_av",
        "pct_LoWgWrks_byTr",
        "pct_MeWgWrks_byTr",
        "Shape_Length",
        "Shape_Area",
    ]
    .iter()
    .map(|h| h.to_string())
    .collect::<Vec<_>>();
    let records = (0..rows)
        .map(|i| {
            let access = if i % 17 == 0 {
                "-99999".to_string()
            } else {
                format!("{:.3}", (i % 100) as f64 / 100.0)
            };
            vec![
                METROS[i % METROS.len()].to_string(),
                format!("39{i:010}"),
                if i % 7 == 0 { "18" } else { "39" }.to_string(),
                access,
                format!("{:.4}", (i % 37) as f64 / 37.0),
                if i % 11 == 0 {
                    "NA".to_string()
                } else {
                    format!("{:.4}", (i % 41) as f64 / 41.0)
                },
                format!("{:.4}", (i % 13) as f64 / 13.0),
                format!("{:.4}", (i % 19) as f64 / 19.0),
                format!("{}", 1000 + i % 500),
                format!("{}", 50_000 + i % 9_000),
            ]
        })
        .collect();
    Frame::from_rows(&headers, records).expect("synthetic frame")
}

fn bench_clean_stages(c: &mut Criterion) {
    let profile = Profile::transit();
    let raw = synthetic_frame(20_000);

    c.bench_function("clean_frame_20k", |b| {
        b.iter_batched(
            || raw.clone(),
            |mut frame| clean_frame(&mut frame, &profile).expect("clean"),
            BatchSize::LargeInput,
        )
    });

    let mut cleaned = raw.clone();
    clean_frame(&mut cleaned, &profile).expect("clean");
    c.bench_function("aggregate_frame_20k", |b| {
        b.iter(|| aggregate_frame(&cleaned, &profile).expect("aggregate"))
    });
}

criterion_group!(benches, bench_clean_stages);
criterion_main!(benches);
