//! Properties that hold for any sequence of pushes and ownership operations.

use std::ptr::NonNull;

use quickcheck_macros::quickcheck;
use rcvec::{Boxed, Owner, Vector};
use rcvec_test_utils::TeardownLog;

fn push_u16(vector: &Vector, value: u16) -> NonNull<u8> {
    let slot = unsafe { vector.push() };
    unsafe { slot.cast::<u16>().as_ptr().write_unaligned(value) };
    slot
}

fn read_u16(slot: NonNull<u8>) -> u16 {
    unsafe { slot.cast::<u16>().as_ptr().read_unaligned() }
}

#[quickcheck]
fn growth_never_loses_contents(initial_capacity: u8, values: Vec<u16>) -> bool {
    let vector = Vector::owned(2, initial_capacity as usize, None);

    for &value in &values {
        push_u16(&vector, value);

        if vector.capacity() < vector.len() {
            return false;
        }
    }

    let contents: Vec<u16> = vector.slots().map(read_u16).collect();

    contents == values
}

#[quickcheck]
fn push_then_at_sees_the_pushed_slot(values: Vec<u16>) -> bool {
    let vector = Vector::owned(2, 0, None);

    values.iter().all(|&value| {
        let slot = push_u16(&vector, value);

        vector.at(vector.len() - 1) == Some(slot) && read_u16(slot) == value
    })
}

#[quickcheck]
fn for_each_visits_every_live_slot_in_order(values: Vec<u16>) -> bool {
    let vector = Vector::owned(2, 1, None);

    for &value in &values {
        push_u16(&vector, value);
    }

    let mut indices = Vec::new();
    let mut seen = Vec::new();
    vector.for_each(|slot, index| {
        indices.push(index);
        seen.push(read_u16(slot));
        false
    });

    indices == (0..values.len()).collect::<Vec<_>>() && seen == values
}

#[quickcheck]
fn at_is_none_from_len_upward(len: u8, past: u8) -> bool {
    let vector = Vector::owned(2, 0, None);

    for value in 0..len as u16 {
        push_u16(&vector, value);
    }

    vector.at(len as usize + past as usize).is_none()
        && vector.get(len as usize + past as usize).is_err()
}

#[quickcheck]
fn teardown_runs_exactly_once_after_the_last_release(extra_owners: u8) -> bool {
    let log = TeardownLog::new();
    let first = Boxed::owned(log.track(0));
    let mut owners: Vec<Owner<_>> = (0..extra_owners).map(|_| first.clone()).collect();
    owners.push(first);

    while owners.len() > 1 {
        owners.pop();

        if !log.is_empty() {
            return false;
        }
    }

    owners.clear();

    log.dropped() == vec![0]
}

#[quickcheck]
fn every_alias_costs_one_release(aliases: Vec<u8>) -> bool {
    let log = TeardownLog::new();
    let values: Vec<_> = (0..4).map(|id| Boxed::owned(log.track(id))).collect();
    let vector = unsafe { Owner::adopt(Vector::with_handles(2)) };

    for value in &values {
        vector.push_handle(value);
    }

    for &alias in &aliases {
        vector.push_handle(&values[alias as usize % values.len()]);
    }

    let expected_counts: Vec<usize> = (0..values.len())
        .map(|index| {
            2 + aliases
                .iter()
                .filter(|&&alias| alias as usize % values.len() == index)
                .count()
        })
        .collect();
    let counts: Vec<usize> = values.iter().map(|value| value.ref_count()).collect();

    drop(vector);

    let after: Vec<usize> = values.iter().map(|value| value.ref_count()).collect();

    counts == expected_counts && after == vec![1; 4] && log.is_empty()
}
