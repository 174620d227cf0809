//! IPC codec and dispatch throughput benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;

use sysupdate_mock::ipc::{decode_message, encode_message, IpcMessage, MethodCall};
use sysupdate_mock::sysupdate::{
    ObjectPath, Signal, MANAGER_INTERFACE, PEER_INTERFACE, PROPERTIES_INTERFACE, TARGET_INTERFACE,
};
use sysupdate_mock::{Service, ServiceConfig};

fn sample_messages() -> Vec<(&'static str, IpcMessage)> {
    vec![
        (
            "ping",
            IpcMessage::MethodCall(MethodCall::new(
                1,
                ObjectPath::manager(),
                PEER_INTERFACE,
                "Ping",
                vec![],
            )),
        ),
        (
            "describe",
            IpcMessage::MethodCall(MethodCall::new(
                2,
                ObjectPath::target("os"),
                TARGET_INTERFACE,
                "Describe",
                vec![json!("2.0.0"), json!(false)],
            )),
        ),
        (
            "progress_signal",
            IpcMessage::Signal((&Signal::progress_changed(ObjectPath::job(7), 45)).into()),
        ),
    ]
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_message");
    group.throughput(Throughput::Elements(1));

    for (name, message) in sample_messages() {
        group.bench_with_input(BenchmarkId::new("message", name), &message, |b, msg| {
            b.iter(|| encode_message(black_box(msg)))
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_message");
    group.throughput(Throughput::Elements(1));

    for (name, message) in sample_messages() {
        let encoded = encode_message(&message).expect("encode failed");
        group.bench_with_input(BenchmarkId::new("message", name), &encoded, |b, bytes| {
            b.iter(|| decode_message(black_box(bytes)))
        });
    }

    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let _enter = runtime.enter();
    let service = Service::new(ServiceConfig::default()).expect("service");
    let handler = service.ipc_handler;

    let calls = [
        ("list_targets", ObjectPath::manager(), MANAGER_INTERFACE, "ListTargets", vec![]),
        (
            "target_get_all",
            ObjectPath::target("os"),
            PROPERTIES_INTERFACE,
            "GetAll",
            vec![json!(TARGET_INTERFACE)],
        ),
        (
            "describe",
            ObjectPath::target("os"),
            TARGET_INTERFACE,
            "Describe",
            vec![json!("1.2.0"), json!(false)],
        ),
    ];

    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(1));

    for (name, path, interface, member, args) in calls {
        let message = IpcMessage::MethodCall(MethodCall::new(1, path, interface, member, args));
        let request = encode_message(&message).expect("encode failed");
        group.bench_with_input(BenchmarkId::new("call", name), &request, |b, bytes| {
            b.iter(|| handler.process(black_box(bytes)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_dispatch);
criterion_main!(benches);
