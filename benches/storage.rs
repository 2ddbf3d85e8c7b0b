//! Secure storage benchmark: insert and list encrypted records.

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use cyberguard::classifier::Tier;
use cyberguard::normalize::extract;
use cyberguard::store::{LogFilter, NewRecord, SecureStore};
use tempfile::tempdir;

fn record(i: usize) -> NewRecord {
    let event = format!("admin export database requested by user{}", i);
    NewRecord {
        sequence: extract(&event),
        event,
        tier: Tier::Malicious,
        score: 0.95,
        user_email: Some(format!("user{}@example.com", i % 4)),
    }
}

fn bench_insert_record(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let store = SecureStore::open(&dir.path().join("logs.db"), b"bench-secret").unwrap();
    let rec = record(0);

    c.bench_function("storage_insert_record", |b| {
        b.iter(|| black_box(store.insert(black_box(&rec), Utc::now())).unwrap())
    });
}

fn bench_list_records(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let store = SecureStore::open(&dir.path().join("logs.db"), b"bench-secret").unwrap();
    for i in 0..500 {
        store.insert(&record(i), Utc::now()).unwrap();
    }

    c.bench_function("storage_list_100", |b| {
        b.iter(|| black_box(store.list(100, &LogFilter::default())).unwrap())
    });
    c.bench_function("storage_list_user_100", |b| {
        let filter = LogFilter::user("user1@example.com");
        b.iter(|| black_box(store.list(100, &filter)).unwrap())
    });
    c.bench_function("storage_statistics", |b| {
        b.iter(|| black_box(store.statistics(None)).unwrap())
    });
}

criterion_group!(benches, bench_insert_record, bench_list_records);
criterion_main!(benches);
