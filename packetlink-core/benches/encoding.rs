use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use packetlink_core::{
    buffers::{BufferPair, ProcessBuffer},
    checksum::checksum16,
    constants::{frame_len, MAX_BLOCK_LEN},
    decoder::parse_frame,
    encoder::{construct_frame, PacketBuilder},
    registry::ModuleRegistry,
    types::Packet,
};

const SIZES: [usize; 4] = [0, 16, 128, 512];

fn bench_checksum(c: &mut Criterion) {
    let mut group = c.benchmark_group("checksum16");

    for size in [16usize, 256, 1020] {
        let data = vec![0x5Au8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| checksum16(black_box(data)));
        });
    }

    group.finish();
}

fn bench_construct(c: &mut Criterion) {
    let mut group = c.benchmark_group("construct_frame");
    let registry = ModuleRegistry::default();

    for size in SIZES {
        let payload = vec![0x42u8; size];
        let mut out = ProcessBuffer::new(frame_len(MAX_BLOCK_LEN));

        group.throughput(Throughput::Bytes(frame_len(size) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            b.iter(|| {
                let packet = Packet::new(5, 0xCC, payload);
                construct_frame(black_box(&packet), &mut out, &registry).unwrap()
            });
        });
    }

    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_frame");
    let registry = ModuleRegistry::default();

    for size in SIZES {
        let encoded = PacketBuilder::new(5)
            .cmd(0xCC)
            .payload(Bytes::from(vec![0x42u8; size]))
            .build(&registry)
            .unwrap();

        group.throughput(Throughput::Bytes(encoded.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &encoded, |b, data| {
            b.iter(|| parse_frame(black_box(data), &registry).unwrap().payload.len());
        });
    }

    group.finish();
}

fn bench_assemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("assemble_and_parse");
    let registry = ModuleRegistry::default();

    for size in SIZES {
        let encoded = PacketBuilder::new(5)
            .cmd(0xCC)
            .payload(Bytes::from(vec![0x42u8; size]))
            .build(&registry)
            .unwrap();
        let mut pair = BufferPair::new();
        pair.generate(MAX_BLOCK_LEN).unwrap();

        group.throughput(Throughput::Bytes(encoded.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &encoded, |b, data| {
            b.iter(|| {
                for &byte in data.iter() {
                    pair.process_rx_byte(byte).unwrap();
                }
                let len = pair.parse_packet(&registry).unwrap().payload.len();
                pair.flush().unwrap();
                black_box(len)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_checksum,
    bench_construct,
    bench_parse,
    bench_assemble
);
criterion_main!(benches);
