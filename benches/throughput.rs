//! Throughput Benchmark for hfp-phonebook
//!
//! This benchmark measures phonebook reads and the per-entry encoders
//! under realistic phonebook sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hfp_phonebook::access::{AccessGate, AccessPermission, ConsentRequest, PeerAddress, PermissionTable};
use hfp_phonebook::commands::AtPhonebook;
use hfp_phonebook::config::PhonebookConfig;
use hfp_phonebook::protocol::gsm::{encode_for_response, string_to_gsm8bit_packed};
use hfp_phonebook::protocol::number::{strip_separators, toa_from_string};
use hfp_phonebook::protocol::{AtCommand, AtCommandType};
use hfp_phonebook::storage::{CallType, MemoryStore, PhoneType, Presentation};
use std::sync::Arc;
use tokio::sync::mpsc;

const PEER: PeerAddress = PeerAddress([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);

fn phonebook(contacts: usize) -> AtPhonebook {
    let store = Arc::new(MemoryStore::new());
    for i in 0..contacts {
        let phone_type = match i % 3 {
            0 => PhoneType::Mobile,
            1 => PhoneType::Home,
            _ => PhoneType::Work,
        };
        store.add_contact(&format!("Contact {}", i), &format!("+1 (650) 555-{:04}", i), phone_type);
        store.add_call(&format!("650555{:04}", i), CallType::Missed, Presentation::Allowed, i as u64);
    }

    let (consent_tx, _consent_rx) = mpsc::unbounded_channel::<ConsentRequest>();
    let permissions = PermissionTable::with(PEER, AccessPermission::Allowed);
    let gate = AccessGate::new(Arc::new(permissions), Arc::new(consent_tx), "pairing");
    AtPhonebook::new(store, gate, PhonebookConfig::default())
}

/// Benchmark full AT+CPBR reads
fn bench_cpbr(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpbr");

    for size in [100usize, 1000] {
        let mut handler = phonebook(size);
        let read = AtCommand::new("CPBR", AtCommandType::Set, format!("AT+CPBR=1,{}", size));
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("contacts", size), &read, |b, read| {
            b.iter(|| black_box(handler.execute(&PEER, read)));
        });

        // missed calls go through a caller-ID lookup per row
        let select = AtCommand::new("CPBS", AtCommandType::Set, "AT+CPBS=\"MC\"");
        handler.execute(&PEER, &select);
        group.bench_with_input(BenchmarkId::new("missed_calls", size), &read, |b, read| {
            b.iter(|| black_box(handler.execute(&PEER, read)));
        });
    }

    group.finish();
}

/// Benchmark CPBS?, which requeries the selected phonebook for its size
fn bench_cpbs_read(c: &mut Criterion) {
    let mut handler = phonebook(1000);
    let query = AtCommand::new("CPBS", AtCommandType::Read, "AT+CPBS?");

    c.bench_function("cpbs_read_requery", |b| {
        b.iter(|| black_box(handler.execute(&PEER, &query)));
    });
}

/// Benchmark the per-entry encoders
fn bench_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("encoding");
    group.throughput(Throughput::Elements(1));

    group.bench_function("gsm_encode_ascii", |b| {
        b.iter(|| black_box(encode_for_response(black_box("Alice Martin/M"))));
    });

    group.bench_function("gsm_encode_extended", |b| {
        b.iter(|| black_box(encode_for_response(black_box("Renée {work} [desk]/W"))));
    });

    group.bench_function("gsm_pack", |b| {
        b.iter(|| black_box(string_to_gsm8bit_packed(black_box("Contact 1234/H"))));
    });

    group.bench_function("dial_string", |b| {
        b.iter(|| {
            let raw = black_box("+1 (650) 555-0100");
            black_box((toa_from_string(raw), strip_separators(raw)))
        });
    });

    group.finish();
}

criterion_group!(benches, bench_cpbr, bench_cpbs_read, bench_encoding);
criterion_main!(benches);
