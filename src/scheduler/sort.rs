use std::cmp::Ordering;

use crate::scheduler::queue::QueueEntry;
use crate::scheduler::status::priority_rank;

// Deterministic total order for the dispatch queue, highest priority first:
// spendable droplets, then status rank, then current charge (entries with
// charge data ahead of those without), with the account id as final tiebreak.
pub fn sort_queue_entries(entries: &mut [QueueEntry]) {
    entries.sort_by(compare_entries);
}

pub(crate) fn compare_entries(a: &QueueEntry, b: &QueueEntry) -> Ordering {
    let droplet_cmp = b.droplets.available.cmp(&a.droplets.available);
    if droplet_cmp != Ordering::Equal {
        return droplet_cmp;
    }

    let rank_cmp = priority_rank(a.status).cmp(&priority_rank(b.status));
    if rank_cmp != Ordering::Equal {
        return rank_cmp;
    }

    match (&a.charges, &b.charges) {
        (Some(ca), Some(cb)) => {
            let charge_cmp = cb.current.cmp(&ca.current);
            if charge_cmp != Ordering::Equal {
                return charge_cmp;
            }
        }
        (Some(_), None) => return Ordering::Less,
        (None, Some(_)) => return Ordering::Greater,
        (None, None) => {}
    }

    a.id.cmp(&b.id)
}
