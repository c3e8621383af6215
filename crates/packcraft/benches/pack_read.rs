use criterion::{Criterion, criterion_group, criterion_main};
use packcraft::{
    descriptor::{DescriptorRef, Kind},
    pack::Layout,
    reader::Reader,
    registry::Registry,
    value::Value,
};

fn gen_struct(registry: &Registry, field_count: usize) -> DescriptorRef {
    let mut members = Vec::with_capacity(field_count);

    for i in 0..field_count {
        let format = match i % 3 {
            0 => "<H",
            1 => "R4R4",
            _ => "b",
        };
        members.push((format!("f{}", i), Layout::from(format)));
    }

    registry.structure(members).unwrap()
}

/// Packet for `reader` with every leaf holding a value that fits it.
fn gen_packet(reader: &Reader) -> Vec<u8> {
    let mut packet = vec![0u8; reader.size()];
    fill(reader, &mut packet, &mut 0x9E37_79B9_7F4A_7C15);
    packet
}

fn fill(reader: &Reader, packet: &mut [u8], seed: &mut u64) {
    let descriptor = reader.descriptor();
    if !descriptor.is_atomic() {
        for (_, member) in reader.iter().unwrap() {
            fill(&member, packet, seed);
        }
        return;
    }

    *seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let bits = descriptor.bit_size().min(64);
    let value: Value = match descriptor.kind() {
        Kind::Int => ((*seed >> (65 - bits)) as i64).into(),
        Kind::Raw => vec![*seed as u8; descriptor.size()].into(),
        _ => (*seed >> (64 - bits)).into(),
    };
    reader.write(packet, value).unwrap();
}

fn bench_pack_read(c: &mut Criterion) {
    let registry = Registry::new();

    for &field_count in &[1usize, 10, 50, 100] {
        let descriptor = gen_struct(&registry, field_count);
        let reader = Reader::new(descriptor, 0);
        let packet = gen_packet(&reader);

        c.bench_function(&format!("read_{}_fields", field_count), |b| {
            b.iter(|| {
                let _ = reader.read(&packet).unwrap();
            })
        });
    }
}

fn bench_format_parse(c: &mut Criterion) {
    let registry = Registry::new();

    c.bench_function("parse_mixed_format", |b| {
        b.iter(|| {
            let _ = registry.format("<HHI4R3R5c8>i8").unwrap();
        })
    });
}

criterion_group!(benches, bench_pack_read, bench_format_parse);
criterion_main!(benches);
