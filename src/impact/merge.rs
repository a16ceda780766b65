//! Merge impact items that share a test path

use std::collections::HashMap;

use super::ImpactItem;

/// Merge items by `test_path`.
///
/// The highest score wins (and brings its severity). Reasons are gathered
/// highest-score item first, exact duplicates dropped, then capped at
/// `reason_cap`; the overflow is counted in `suppressed_reasons`. Output is
/// sorted by score (descending), then path.
pub fn merge_items(items: Vec<ImpactItem>, reason_cap: usize) -> Vec<ImpactItem> {
    let mut groups: Vec<Vec<ImpactItem>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for item in items {
        match index.get(&item.test_path) {
            Some(&i) => groups[i].push(item),
            None => {
                index.insert(item.test_path.clone(), groups.len());
                groups.push(vec![item]);
            }
        }
    }

    let mut merged: Vec<ImpactItem> = groups
        .into_iter()
        .filter_map(|mut group| {
            // Stable: equal scores keep discovery order
            group.sort_by(|a, b| b.impact_score.total_cmp(&a.impact_score));
            let mut iter = group.into_iter();
            let mut winner = iter.next()?;
            for other in iter {
                winner.suppressed_reasons += other.suppressed_reasons;
                for reason in other.reasons {
                    if !winner.reasons.contains(&reason) {
                        winner.reasons.push(reason);
                    }
                }
            }
            winner.reasons.dedup();
            if winner.reasons.len() > reason_cap {
                winner.suppressed_reasons += winner.reasons.len() - reason_cap;
                winner.reasons.truncate(reason_cap);
            }
            Some(winner)
        })
        .collect();

    merged.sort_by(|a, b| {
        b.impact_score
            .total_cmp(&a.impact_score)
            .then_with(|| a.test_path.cmp(&b.test_path))
    });
    merged
}
