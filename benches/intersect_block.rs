use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::{Rng, SeedableRng, rngs::SmallRng};
use raypack::{
    BlockTriangle, GeomId, Intersector, NoFilters, RayPacket, TriangleBlock,
    geometry::{Ray, Triangle, WorldPoint, WorldVector},
};
use simba::simd::{SimdBool as _, WideF32x4, WideF32x8};

const BLOCK_COUNT: usize = 64;
const PACKET_COUNT: usize = 256;

fn random_point(rng: &mut SmallRng, scale: f32) -> WorldPoint {
    WorldPoint::new(
        rng.random_range(-scale..scale),
        rng.random_range(-scale..scale),
        rng.random_range(-scale..scale),
    )
}

/// Small triangles scattered around the origin.
fn random_blocks(rng: &mut SmallRng) -> Vec<TriangleBlock<WideF32x8>> {
    let triangles: Vec<_> = (0..BLOCK_COUNT * TriangleBlock::<WideF32x8>::CAPACITY)
        .map(|i| {
            let center = random_point(rng, 1.0);
            let vertices = Triangle::new(
                center + random_point(rng, 0.3).coords,
                center + random_point(rng, 0.3).coords,
                center + random_point(rng, 0.3).coords,
            );
            BlockTriangle::new(vertices, GeomId::from_raw(0), i as u32)
        })
        .collect();
    TriangleBlock::pack(&triangles)
}

/// Rays from a sphere around the scene, aimed at random points near its center.
fn random_packets(rng: &mut SmallRng) -> Vec<RayPacket<WideF32x4>> {
    (0..PACKET_COUNT)
        .map(|_| {
            let rays: Vec<_> = (0..RayPacket::<WideF32x4>::CAPACITY)
                .map(|_| {
                    let origin = WorldPoint::from(random_point(rng, 1.0).coords.normalize() * 5.0);
                    let target = random_point(rng, 0.5);
                    Ray::new(origin, target - origin)
                })
                .collect();
            RayPacket::new(&rays).unwrap()
        })
        .collect()
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(0x5eed);
    let blocks = random_blocks(&mut rng);
    let packets = random_packets(&mut rng);
    let intersector = Intersector::default();
    let all_lanes = RayPacket::<WideF32x4>::lanes(RayPacket::<WideF32x4>::CAPACITY);

    let mut group = c.benchmark_group("intersect_block");

    group.bench_function(BenchmarkId::new("closest_hit", "ray_vectorized"), |b| {
        b.iter(|| {
            let mut packets = packets.clone();
            for packet in &mut packets {
                for block in &blocks {
                    intersector.intersect_packet(all_lanes, packet, block, &NoFilters);
                }
            }
            packets
        })
    });

    group.bench_function(BenchmarkId::new("closest_hit", "triangle_vectorized"), |b| {
        b.iter(|| {
            let mut packets = packets.clone();
            for packet in &mut packets {
                for block in &blocks {
                    for lane in 0..RayPacket::<WideF32x4>::CAPACITY {
                        intersector.intersect_one(packet, lane, block, &NoFilters);
                    }
                }
            }
            packets
        })
    });

    group.bench_function(BenchmarkId::new("occlusion", "ray_vectorized"), |b| {
        b.iter(|| {
            packets
                .iter()
                .map(|packet| {
                    blocks.iter().fold(0u64, |occluded, block| {
                        occluded
                            | intersector
                                .occluded_packet(all_lanes, packet, block, &NoFilters)
                                .bitmask()
                    })
                })
                .sum::<u64>()
        })
    });

    group.bench_function(BenchmarkId::new("occlusion", "triangle_vectorized"), |b| {
        b.iter(|| {
            packets
                .iter()
                .map(|packet| {
                    (0..RayPacket::<WideF32x4>::CAPACITY)
                        .filter(|&lane| {
                            blocks.iter().any(|block| {
                                intersector.occluded_one(packet, lane, block, &NoFilters)
                            })
                        })
                        .count()
                })
                .sum::<usize>()
        })
    });

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
