use std::hint::black_box;

use bencher::RequestFixture;
use bytes::BytesMut;
use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rook_http::codec::{RequestDecoder, parse};
use tokio_util::codec::Decoder;

static SMALL_HEADER: RequestFixture = RequestFixture::new("get_small", include_str!("../resources/request/get_small.txt"));
static LARGE_HEADER: RequestFixture = RequestFixture::new("get_large", include_str!("../resources/request/get_large.txt"));
static JSON_BODY: RequestFixture = RequestFixture::new("post_json", include_str!("../resources/request/post_json.txt"));

fn fixtures() -> [RequestFixture; 3] {
    [SMALL_HEADER, LARGE_HEADER, JSON_BODY]
}

fn benchmark_parse(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("parse");

    for fixture in fixtures() {
        group.throughput(Throughput::Bytes(fixture.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(fixture.name()), &fixture, |b, fixture| {
            b.iter(|| black_box(parse(black_box(fixture.content().as_bytes())).expect("fixture should be a valid request")));
        });
    }

    group.finish();
}

fn benchmark_request_decoder(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("request_decoder");

    for fixture in fixtures() {
        group.throughput(Throughput::Bytes(fixture.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(fixture.name()), &fixture, |b, fixture| {
            let mut request_decoder = RequestDecoder::new();
            b.iter_batched_ref(
                || BytesMut::from(fixture.content()),
                |bytes_mut| {
                    let request = request_decoder.decode(bytes_mut).expect("fixture should be a valid request").unwrap();
                    black_box(request);
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(decoder, benchmark_parse, benchmark_request_decoder);
criterion_main!(decoder);
