use criterion::{criterion_group, criterion_main};


criterion_group!(
    benches,
    node::bench_route,
    node::bench_decode,
    node::bench_encode_telemetry,
    mqtt::bench_publish,
    mqtt::bench_poll
);
criterion_main!(benches);
