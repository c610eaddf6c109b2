//! Property-based tests for allocator correctness
//!
//! Uses proptest to verify allocator invariants hold across many random
//! allocate / release / compact sequences

use heapsim::{Allocator, Block, Gap, Handle, HeapAllocator, PolicyKind};
use proptest::prelude::*;

const CAPACITY: usize = 512;

#[derive(Debug, Clone)]
enum Op {
    Allocate(usize),
    /// Release the n-th live handle (modulo live count)
    Release(usize),
    Compact,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        5 => (1usize..96).prop_map(Op::Allocate),
        3 => any::<usize>().prop_map(Op::Release),
        1 => Just(Op::Compact),
    ]
}

fn policy() -> impl Strategy<Value = PolicyKind> {
    prop_oneof![Just(PolicyKind::FirstFit), Just(PolicyKind::BestFit)]
}

/// Replay `ops`, returning the heap and its live handles
fn replay(policy: PolicyKind, compacting: bool, ops: &[Op]) -> (Allocator<PolicyKind>, Vec<Handle>) {
    let mut heap = Allocator::new(CAPACITY, policy).compacting(compacting);
    let mut live = Vec::new();

    for op in ops {
        match op {
            Op::Allocate(size) => {
                if let Ok(h) = heap.allocate(*size) {
                    live.push(h);
                }
            }
            Op::Release(n) => {
                if !live.is_empty() {
                    let h = live.remove(n % live.len());
                    heap.release(h).unwrap();
                }
            }
            Op::Compact => {
                heap.compact().unwrap();
            }
        }
    }

    (heap, live)
}

fn assert_sound(blocks: &[Block]) -> Result<(), TestCaseError> {
    for (i, a) in blocks.iter().enumerate() {
        prop_assert!(a.length > 0);
        prop_assert!(a.end() <= CAPACITY, "block {:?} out of bounds", a);
        for b in &blocks[i + 1..] {
            prop_assert!(!a.overlaps(b), "{:?} overlaps {:?}", a, b);
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn prop_blocks_never_overlap_or_leave_heap(
        policy in policy(),
        compacting in any::<bool>(),
        ops in prop::collection::vec(op(), 1..80)
    ) {
        let (heap, live) = replay(policy, compacting, &ops);

        heap.check_invariants().unwrap();
        assert_sound(&heap.blocks())?;
        prop_assert_eq!(heap.block_count(), live.len());

        // Layout covers the heap exactly once
        let layout = heap.describe_layout();
        let mut cursor = 0;
        for span in &layout {
            prop_assert_eq!(span.start, cursor);
            prop_assert!(span.length > 0);
            cursor = span.end();
        }
        prop_assert_eq!(cursor, CAPACITY);
    }

    #[test]
    fn prop_allocate_release_round_trip(
        policy in policy(),
        ops in prop::collection::vec(op(), 0..60),
        size in 1usize..128
    ) {
        let (mut heap, _) = replay(policy, false, &ops);
        let before: Vec<Gap> = heap.free_gaps();

        if let Ok(h) = heap.allocate(size) {
            heap.release(h).unwrap();
        }

        prop_assert_eq!(heap.free_gaps(), before);
    }

    #[test]
    fn prop_compaction_is_idempotent(
        policy in policy(),
        ops in prop::collection::vec(op(), 0..60)
    ) {
        let (mut heap, live) = replay(policy, false, &ops);
        heap.compact().unwrap();

        let packed: Vec<usize> = live.iter().map(|&h| heap.resolve(h).unwrap()).collect();
        prop_assert_eq!(heap.compact().unwrap(), 0);
        let again: Vec<usize> = live.iter().map(|&h| heap.resolve(h).unwrap()).collect();
        prop_assert_eq!(packed, again);

        // All free space is one trailing gap
        let gaps = heap.free_gaps();
        prop_assert!(gaps.len() <= 1);
        if let Some(gap) = gaps.first() {
            prop_assert_eq!(gap.end(), CAPACITY);
            prop_assert_eq!(gap.start, heap.used_cells());
        }
    }

    #[test]
    fn prop_compaction_keeps_lengths_and_order(
        policy in policy(),
        ops in prop::collection::vec(op(), 0..60)
    ) {
        let (mut heap, _) = replay(policy, false, &ops);
        let before: Vec<(Handle, usize)> =
            heap.blocks().iter().map(|b| (b.handle, b.length)).collect();

        heap.compact().unwrap();

        let after: Vec<(Handle, usize)> =
            heap.blocks().iter().map(|b| (b.handle, b.length)).collect();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn prop_best_fit_is_minimal(
        ops in prop::collection::vec(op(), 0..60),
        size in 1usize..128
    ) {
        let (mut heap, _) = replay(PolicyKind::BestFit, false, &ops);
        let candidates: Vec<Gap> =
            heap.free_gaps().into_iter().filter(|g| g.length >= size).collect();

        match heap.allocate(size) {
            Ok(h) => {
                let address = heap.resolve(h).unwrap();
                let chosen = candidates.iter().find(|g| g.start == address).copied();
                prop_assert!(chosen.is_some(), "placed outside a gap start");
                let chosen = chosen.unwrap();
                for gap in &candidates {
                    prop_assert!(chosen.length <= gap.length);
                    if gap.length == chosen.length {
                        prop_assert!(chosen.start <= gap.start);
                    }
                }
            }
            Err(e) => {
                prop_assert!(e.is_out_of_space());
                prop_assert!(candidates.is_empty());
            }
        }
    }

    #[test]
    fn prop_first_fit_takes_lowest_gap(
        ops in prop::collection::vec(op(), 0..60),
        size in 1usize..128
    ) {
        let (mut heap, _) = replay(PolicyKind::FirstFit, false, &ops);
        let first = heap.free_gaps().into_iter().find(|g| g.length >= size);

        match (heap.allocate(size), first) {
            (Ok(h), Some(gap)) => prop_assert_eq!(heap.resolve(h).unwrap(), gap.start),
            (Err(e), None) => prop_assert!(e.is_out_of_space()),
            (result, gap) => prop_assert!(false, "allocation {:?} vs first gap {:?}", result, gap),
        }
    }

    #[test]
    fn prop_failed_allocation_changes_nothing(
        policy in policy(),
        ops in prop::collection::vec(op(), 0..60)
    ) {
        let (mut heap, _) = replay(policy, false, &ops);
        let before = heap.describe_layout();

        prop_assert!(heap.allocate(CAPACITY + 1).is_err());
        prop_assert!(heap.allocate(0).is_err());
        prop_assert_eq!(heap.describe_layout(), before);
    }
}
