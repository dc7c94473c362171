//! Matcher benchmarks using Criterion.rs.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ride_match_core::geo::{haversine_km, GeoPoint};
use ride_match_core::matching::{NearestInRangeMatcher, VolunteerMatcher};
use ride_match_core::model::{RideRequest, RideStatus, UrgencyLevel, Volunteer};

fn sample_ride() -> RideRequest {
    RideRequest {
        id: "bench-ride".to_string(),
        rider_id: None,
        rider_name: Some("Bench".to_string()),
        pickup: GeoPoint::new(52.52, 13.405),
        dropoff: GeoPoint::new(52.50, 13.45),
        urgency: UrgencyLevel::High,
        notes: String::new(),
        status: RideStatus::Pending,
        created_at_ms: None,
        assigned_volunteer_id: None,
        assigned_volunteer_name: None,
        accepted_at_ms: None,
    }
}

/// Volunteers spread on a grid around the pickup, every third one out of range.
fn sample_volunteers(count: usize) -> Vec<Volunteer> {
    (0..count)
        .map(|index| {
            let row = (index / 50) as f64;
            let col = (index % 50) as f64;
            Volunteer {
                id: format!("v-{index:05}"),
                name: None,
                vehicle: None,
                rating: None,
                is_available: true,
                is_online: true,
                location: GeoPoint::new(52.3 + row * 0.01, 13.2 + col * 0.01),
                max_distance_km: if index % 3 == 0 { 2.0 } else { 40.0 },
                push_token: None,
                active_ride_id: None,
            }
        })
        .collect()
}

fn bench_haversine(c: &mut Criterion) {
    let a = GeoPoint::new(52.52, 13.405);
    let b = GeoPoint::new(48.8566, 2.3522);
    c.bench_function("haversine_km", |bench| {
        bench.iter(|| black_box(haversine_km(black_box(a), black_box(b))));
    });
}

fn bench_nearest_in_range(c: &mut Criterion) {
    let ride = sample_ride();
    let mut group = c.benchmark_group("nearest_in_range");
    for count in [10usize, 100, 1_000, 10_000] {
        let volunteers = sample_volunteers(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &volunteers, |b, volunteers| {
            b.iter(|| black_box(NearestInRangeMatcher.find_match(&ride, volunteers)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_haversine, bench_nearest_in_range);
criterion_main!(benches);
