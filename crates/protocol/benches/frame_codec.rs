//! Benchmarks for the frame codec
//!
//! Measures packing and unpacking of the frames that cross the interrupt
//! pipe, plus the borrowed header parse used on the host's dispatch path.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use protocol::{
    CURRENT_LAYOUT, Command, FRAME_SIZE, Frame, FrameHeader, MAX_PAYLOAD, MotorDirection,
    RequestId, pack, unpack,
};

fn benchmark_commands(c: &mut Criterion) {
    let mut group = c.benchmark_group("commands");

    let adc = Frame::new(RequestId(1), Command::adc_read(3).encode());
    group.bench_function("pack_adc_read", |b| b.iter(|| pack(black_box(&adc))));

    let motor = Frame::new(
        RequestId(2),
        Command::motor(0, 175, MotorDirection::Forward).encode(),
    );
    group.bench_function("pack_motor", |b| b.iter(|| pack(black_box(&motor))));

    let adc_bytes = pack(&adc).unwrap();
    group.bench_function("unpack_adc_read", |b| {
        b.iter(|| unpack(black_box(&adc_bytes), RequestId(1)))
    });

    group.finish();
}

fn benchmark_payload_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("payload_sizes");
    group.throughput(Throughput::Bytes(FRAME_SIZE as u64));

    for size in [0usize, 2, 16, MAX_PAYLOAD] {
        let frame = Frame::new(RequestId(9), vec![0x5A; size]);
        let bytes = pack(&frame).unwrap();

        group.bench_with_input(BenchmarkId::new("pack", size), &frame, |b, frame| {
            b.iter(|| pack(black_box(frame)))
        });

        group.bench_with_input(BenchmarkId::new("header_parse", size), &bytes, |b, bytes| {
            b.iter(|| FrameHeader::parse(&CURRENT_LAYOUT, black_box(bytes)))
        });

        let mut buf = [0u8; FRAME_SIZE];
        group.bench_function(BenchmarkId::new("pack_into", size), |b| {
            b.iter(|| CURRENT_LAYOUT.pack_into(RequestId(9), black_box(&frame.payload), &mut buf))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_commands, benchmark_payload_sizes);
criterion_main!(benches);
