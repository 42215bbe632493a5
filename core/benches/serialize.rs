//! Object-graph serialization throughput benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hessian_core::serializer::{ClassDescriptor, Serializable};
use hessian_core::value::Value;
use hessian_core::{from_bytes, from_deflated_bytes, to_bytes, to_deflated_bytes};

struct Order {
    id: i64,
    customer: String,
    total: f64,
    paid: bool,
    lines: Value,
}

impl Serializable for Order {
    fn describe() -> ClassDescriptor<Self> {
        ClassDescriptor::new("shop.Order")
            .long("id", |o: &Order| o.id)
            .string("customer", |o: &Order| Some(o.customer.as_str()))
            .double("total", |o: &Order| o.total)
            .boolean("paid", |o: &Order| o.paid)
            .object("lines", |o: &Order| o.lines.clone())
    }
}

fn orders(count: usize) -> Value {
    let shared_lines = Value::list(vec![Value::string("widget"), Value::Int(3)]);
    let items = (0..count)
        .map(|i| {
            Value::object(Order {
                id: i as i64,
                customer: format!("customer-{}", i % 17),
                total: i as f64 * 1.25,
                paid: i % 2 == 0,
                lines: shared_lines.clone(),
            })
        })
        .collect();
    Value::list(items)
}

fn bench_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_object");

    for count in [1usize, 100, 1000] {
        let graph = orders(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &graph, |b, graph| {
            b.iter(|| black_box(to_bytes(black_box(graph)).unwrap()))
        });
    }

    group.finish();
}

fn bench_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_object");

    for count in [1usize, 100, 1000] {
        let bytes = to_bytes(&orders(count)).unwrap();
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &bytes, |b, bytes| {
            b.iter(|| black_box(from_bytes(black_box(bytes)).unwrap()))
        });
    }

    group.finish();
}

fn bench_deflation(c: &mut Criterion) {
    let mut group = c.benchmark_group("deflation_envelope");
    let graph = orders(500);
    let sealed = to_deflated_bytes(&graph).unwrap();

    group.bench_function("seal", |b| b.iter(|| black_box(to_deflated_bytes(&graph).unwrap())));
    group.bench_function("open", |b| b.iter(|| black_box(from_deflated_bytes(&sealed).unwrap())));

    group.finish();
}

criterion_group!(benches, bench_write, bench_read, bench_deflation);
criterion_main!(benches);
