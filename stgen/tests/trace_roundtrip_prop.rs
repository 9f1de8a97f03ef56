//! Records written through the batching logger come back complete and in
//! order, whatever the batch size

use proptest::prelude::*;
use stgen::domain::{AddrRange, Eid, Tid};
use stgen::logging::{
    read_trace, BinaryLogger, CommEdge, CommRecord, ComputeRecord, EventLog, MarkerRecord,
    SyncRecord, TraceRecord,
};
use stgen_common::SyncType;

fn addr_range() -> impl Strategy<Value = AddrRange> {
    (0u64..1 << 40, 1u64..256).prop_map(|(start, len)| AddrRange::from_access(start, len).unwrap())
}

fn record() -> impl Strategy<Value = TraceRecord> {
    prop_oneof![
        (
            any::<u32>(),
            any::<u32>(),
            prop::collection::vec(addr_range(), 0..4),
            prop::collection::vec(addr_range(), 0..4),
        )
            .prop_map(|(iops, flops, write_ranges, read_ranges)| {
                TraceRecord::Compute(ComputeRecord {
                    iops: u64::from(iops),
                    flops: u64::from(flops),
                    reads: read_ranges.len() as u64,
                    writes: write_ranges.len() as u64,
                    write_ranges,
                    read_ranges,
                })
            }),
        prop::collection::vec((any::<u32>(), any::<u64>(), addr_range()), 1..4).prop_map(|edges| {
            TraceRecord::Communication(CommRecord {
                edges: edges
                    .into_iter()
                    .map(|(tid, eid, range)| CommEdge {
                        producer: Tid(tid),
                        producer_eid: Eid(eid),
                        range,
                    })
                    .collect(),
            })
        }),
        (prop::sample::select(SyncType::ALL.to_vec()), any::<u64>())
            .prop_map(|(sync_type, addr)| TraceRecord::Sync(SyncRecord { sync_type, addr })),
        any::<u64>().prop_map(|count| TraceRecord::Marker(MarkerRecord { instruction_count: count })),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn batching_preserves_every_record_in_order(
        records in prop::collection::vec(record(), 0..40),
        batch_size in 1usize..9,
    ) {
        let mut logger = BinaryLogger::new(Tid(1), Vec::new(), batch_size);
        for record in &records {
            logger.append(record.clone()).unwrap();
            prop_assert!(logger.pending() < batch_size);
        }
        let bytes = logger.finish().unwrap();

        prop_assert_eq!(read_trace(bytes.as_slice()).unwrap(), records);
    }
}
