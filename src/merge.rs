//! Reconciliation of a fresh run against the previously persisted dataset.

use crate::models::{Offer, RegionSnapshot, SpotDataset, sort_snapshot};
use std::collections::HashMap;
use tracing::{debug, info};

/// Result of [`merge`]: the dataset to persist and whether it differs from
/// what was already stored.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub dataset: SpotDataset,
    pub changed: bool,
}

/// Folds `new` into `old`.
///
/// * Regions missing from `new` (failed fetch) keep their old snapshot.
/// * A region fetched with no qualifying offers becomes empty.
/// * Otherwise offers are reconciled by instance type: updated in place,
///   retained when only old has them, appended when only new has them,
///   then re-sorted by price-per-vCPU.
/// * The leaderboard is taken from `new` whenever it differs.
pub fn merge(old: Option<SpotDataset>, new: SpotDataset) -> MergeOutcome {
    let Some(old) = old else {
        info!("[MERGE] no prior dataset, taking fresh run as-is");
        return MergeOutcome {
            dataset: new,
            changed: true,
        };
    };

    let mut merged = old.clone();
    if merged.last_updated != new.last_updated {
        merged.last_updated = new.last_updated;
    }

    let carried: Vec<&String> = old
        .regions
        .keys()
        .filter(|r| !new.regions.contains_key(*r))
        .collect();
    if !carried.is_empty() {
        debug!(regions = ?carried, "[MERGE] keeping regions absent from this run");
    }

    for (region, incoming) in new.regions {
        let reconciled = match old.regions.get(&region) {
            Some(existing) if !incoming.is_empty() => reconcile_offers(existing, incoming),
            _ => incoming,
        };
        merged.regions.insert(region, reconciled);
    }

    if merged.global_top_5 != new.global_top_5 {
        merged.global_top_5 = new.global_top_5;
    }

    let changed = merged != old;
    MergeOutcome {
        dataset: merged,
        changed,
    }
}

/// Offer-level reconciliation keyed by instance type.
pub fn reconcile_offers(existing: &[Offer], incoming: RegionSnapshot) -> RegionSnapshot {
    let mut merged = existing.to_vec();
    let mut index: HashMap<String, usize> = existing
        .iter()
        .enumerate()
        .map(|(i, o)| (o.instance_type.clone(), i))
        .collect();

    for offer in incoming {
        match index.get(&offer.instance_type) {
            Some(&i) => merged[i] = offer,
            None => {
                index.insert(offer.instance_type.clone(), merged.len());
                merged.push(offer);
            }
        }
    }
    sort_snapshot(&mut merged);
    merged
}
