//! Shadow memory shared by several foreground threads at once

use std::sync::Arc;
use std::thread;

use stgen::domain::{AddrRange, Eid, Tid};
use stgen::shadow::{Owner, Producer, ShadowMemory};

const THREADS: u32 = 8;
const CHUNK: u64 = 8;
const CHUNKS_PER_THREAD: u64 = 128;
const REGION: u64 = CHUNK * CHUNKS_PER_THREAD;
const ROUNDS: u64 = 200;

fn region(tid: u32) -> AddrRange {
    let start = u64::from(tid) * REGION;
    AddrRange::new(start, start + REGION).unwrap()
}

fn chunk(tid: u32, index: u64) -> AddrRange {
    let start = region(tid).start + index * CHUNK;
    AddrRange::new(start, start + CHUNK).unwrap()
}

/// Event of the last write to `index`: rounds walk the chunks cyclically
fn last_writer_eid(index: u64) -> Eid {
    let last_round = (0..ROUNDS).filter(|round| round % CHUNKS_PER_THREAD == index).max().unwrap();
    Eid(last_round)
}

#[test]
fn test_concurrent_writers_and_readers() {
    let shadow = Arc::new(ShadowMemory::new());

    let handles: Vec<_> = (0..THREADS)
        .map(|tid| {
            let shadow = Arc::clone(&shadow);
            thread::spawn(move || {
                let neighbour = (tid + 1) % THREADS;
                for round in 0..ROUNDS {
                    let owner = Owner { tid: Tid(tid), eid: Eid(round) };
                    shadow.record_write(chunk(tid, round % CHUNKS_PER_THREAD), owner);

                    // Whatever the interleaving, a neighbour's region only
                    // ever holds whole chunks written by that neighbour.
                    for producer in shadow.record_read(region(neighbour), Tid(tid)) {
                        assert_eq!(producer.tid, Tid(neighbour));
                        assert!(producer.range.start >= region(neighbour).start);
                        assert!(producer.range.end <= region(neighbour).end);
                        assert_eq!(producer.range.start % CHUNK, 0);
                        assert_eq!(producer.range.end % CHUNK, 0);
                    }

                    // Own writes never show up as communication.
                    assert!(shadow.record_read(region(tid), Tid(tid)).is_empty());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker thread panicked");
    }

    for tid in 0..THREADS {
        for index in 0..CHUNKS_PER_THREAD {
            let expected = Owner { tid: Tid(tid), eid: last_writer_eid(index) };
            let range = chunk(tid, index);
            for addr in range.start..range.end {
                assert_eq!(shadow.owner_at(addr), Some(expected), "byte 0x{addr:x}");
            }
        }
    }

    // Every chunk carries a distinct event id, so nothing coalesces.
    let chunks = usize::try_from(u64::from(THREADS) * CHUNKS_PER_THREAD).unwrap();
    assert_eq!(shadow.segment_count(), chunks);

    let everything = AddrRange::new(0, u64::from(THREADS) * REGION).unwrap();
    let expected: Vec<Producer> = (0..THREADS)
        .flat_map(|tid| {
            (0..CHUNKS_PER_THREAD).map(move |index| Producer {
                tid: Tid(tid),
                eid: last_writer_eid(index),
                range: chunk(tid, index),
            })
        })
        .collect();
    assert_eq!(shadow.record_read(everything, Tid(THREADS)), expected);
}
