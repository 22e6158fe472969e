use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use criterion::{Criterion, criterion_group, criterion_main};
use immich_tz_fixer::pipeline::sink::{AssetUpdate, UpdateSink, UpdateSinkError};
use immich_tz_fixer::{
    Asset, BoundaryIndex, BundledFinder, Coordinates, InterpolationMethod, Pipeline, ZoneLookup,
};
use std::hint::black_box;
use std::sync::Arc;
use tokio::runtime::Runtime;

struct NoopSink;

#[async_trait]
impl UpdateSink for NoopSink {
    async fn apply(&self, _update: &AssetUpdate) -> Result<(), UpdateSinkError> {
        Ok(())
    }
}

fn grid_index() -> BoundaryIndex {
    // 10 x 10 degree cells over Europe and Asia, all mapped to a handful of zones.
    let zones = ["Europe/Amsterdam", "Europe/Berlin", "Asia/Tokyo", "Asia/Kolkata"];
    let mut features = Vec::new();
    for (i, west) in (-10..150).step_by(10).enumerate() {
        for south in (0..70).step_by(10) {
            let (west, south) = (f64::from(west), f64::from(south));
            features.push(serde_json::json!({
                "type": "Feature",
                "properties": { "tzid": zones[i % zones.len()] },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[
                        [west, south], [west + 10.0, south], [west + 10.0, south + 10.0],
                        [west, south + 10.0], [west, south]
                    ]]
                }
            }));
        }
    }
    let raw = serde_json::json!({ "type": "FeatureCollection", "features": features }).to_string();
    BoundaryIndex::from_geojson_str(&raw).unwrap()
}

/// Every third asset has GPS, the rest must be interpolated.
fn library(size: usize) -> Vec<Asset> {
    let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    (0..size)
        .map(|i| {
            let coordinates = (i % 3 == 0).then(|| {
                Coordinates::new(5.0 + (i % 60) as f64, -5.0 + (i % 150) as f64)
            });
            Asset::new(
                format!("asset-{i}"),
                start + Duration::minutes(i as i64 * 7),
                coordinates,
            )
        })
        .collect()
}

fn bench(c: &mut Criterion) {
    let index = grid_index();
    c.bench_function("boundary_index.lookup", |b| {
        b.iter(|| index.lookup(black_box(52.2), black_box(5.5)));
    });

    let bundled = BundledFinder::new();
    c.bench_function("bundled_finder.lookup", |b| {
        b.iter(|| bundled.lookup(black_box(35.68), black_box(139.76)));
    });

    let assets = library(1_000);
    for method in [InterpolationMethod::NearestNeighbor, InterpolationMethod::ForwardFill] {
        let pipeline = Pipeline::builder()
            .lookup(Arc::new(grid_index()))
            .method(method)
            .build();
        c.bench_function(&format!("pipeline.resolve_batch ({method})"), |b| {
            b.iter(|| pipeline.resolve_batch(black_box(&assets)));
        });
    }

    let rt = Runtime::new().unwrap();
    let pipeline = Pipeline::builder().lookup(Arc::new(grid_index())).build();
    c.bench_function("pipeline.process_batch", |b| {
        b.iter(|| {
            rt.block_on(async {
                pipeline.process_batch(&assets, &NoopSink, false).await;
            });
        });
    });
}

criterion_group!(benches, bench);
criterion_main!(benches);
