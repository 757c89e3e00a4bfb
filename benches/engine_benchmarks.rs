//! Benchmarks for the engine's hot paths: buffer-pool fetch/evict, WAL
//! append+flush, and clustered-index insert.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use oxidb::core::common::types::{PageId, SlotId, TransactionId};
use oxidb::core::indexing::btree::BPlusTreeIndex;
use oxidb::core::storage::engine::buffer_pool_manager::BufferPoolManager;
use oxidb::core::storage::engine::disk_manager::DiskManager;
use oxidb::core::wal::log_record::LogRecord;
use oxidb::core::wal::writer::{WalWriter, WalWriterConfig};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// Fetch/evict churn through a small pool: every `fetch_page` on a fresh
/// page id forces an eviction once the pool fills up.
fn bench_buffer_pool_fetch_evict(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_pool_fetch_evict");
    let page_count = 64u64;
    group.throughput(Throughput::Elements(page_count));

    group.bench_function("fetch_evict_cycle", |b| {
        b.iter_batched(
            || {
                let temp_file = NamedTempFile::new().unwrap();
                let disk_manager =
                    Arc::new(Mutex::new(DiskManager::open(temp_file.path().to_path_buf()).unwrap()));
                let mut bpm = BufferPoolManager::new(8, disk_manager);
                let page_ids: Vec<PageId> = (0..page_count)
                    .map(|_| {
                        let (page_id, _) = bpm.new_page().unwrap();
                        bpm.unpin_page(page_id, false).unwrap();
                        page_id
                    })
                    .collect();
                (bpm, page_ids, temp_file)
            },
            |(mut bpm, page_ids, _temp_file)| {
                for page_id in page_ids {
                    let data = black_box(bpm.fetch_page(page_id).unwrap());
                    bpm.unpin_page(page_id, false).unwrap();
                    black_box(data);
                }
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

/// Append-only WAL throughput: buffer a batch of insert records, then flush.
fn bench_wal_append_and_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("wal_append_and_flush");
    let batch_size = 200u64;
    group.throughput(Throughput::Elements(batch_size));

    group.bench_function("append_then_flush", |b| {
        b.iter_batched(
            || {
                let temp_file = NamedTempFile::new().unwrap();
                let writer =
                    WalWriter::new(temp_file.path().to_path_buf(), WalWriterConfig::default());
                (writer, temp_file)
            },
            |(mut writer, _temp_file)| {
                for i in 0..batch_size {
                    let record = LogRecord::InsertRecord {
                        lsn: i,
                        tx_id: TransactionId(1),
                        page_id: PageId(0),
                        slot_id: SlotId(i as u32),
                        record_data: vec![0u8; 64],
                        prev_lsn: i.saturating_sub(1),
                    };
                    black_box(writer.add_record(&record).unwrap());
                }
                writer.flush().unwrap();
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

/// Sequential insert into the clustered B+Tree index.
fn bench_clustered_index_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("clustered_index_insert");
    let rows = 200u64;
    group.throughput(Throughput::Elements(rows));

    group.bench_function("sequential_insert", |b| {
        b.iter_batched(
            || {
                let temp_file = NamedTempFile::new().unwrap();
                let tree =
                    BPlusTreeIndex::new("bench_clustered".to_string(), temp_file.path().to_path_buf(), 64)
                        .unwrap();
                (tree, temp_file)
            },
            |(mut tree, _temp_file)| {
                for i in 0..rows {
                    let key = i.to_be_bytes().to_vec();
                    let primary_key = i.to_be_bytes().to_vec();
                    black_box(tree.insert(key, primary_key).unwrap());
                }
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_buffer_pool_fetch_evict,
    bench_wal_append_and_flush,
    bench_clustered_index_insert
);
criterion_main!(benches);
