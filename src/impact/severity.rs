//! Overall severity and suggested action for a merged item list

use super::{ImpactItem, Severity, SuggestedAction};

/// Pure function over merged items.
///
/// | Items | Severity | Action |
/// |---|---|---|
/// | none | none | no-action |
/// | only informational | low | no-action |
/// | 3 or more high | high | run-all-tests |
/// | any high, or more than 3 medium | medium | run-affected-tests |
/// | otherwise | low | run-affected-tests |
pub fn resolve_severity(items: &[ImpactItem]) -> (Severity, SuggestedAction) {
    if items.is_empty() {
        return (Severity::None, SuggestedAction::NoAction);
    }
    // Cosmetic-only changes never trigger test execution
    if items.iter().all(|i| i.severity == Severity::Informational) {
        return (Severity::Low, SuggestedAction::NoAction);
    }

    let high = items.iter().filter(|i| i.severity == Severity::High).count();
    let medium = items.iter().filter(|i| i.severity == Severity::Medium).count();

    if high >= 3 {
        (Severity::High, SuggestedAction::RunAllTests)
    } else if high > 0 || medium > 3 {
        (Severity::Medium, SuggestedAction::RunAffectedTests)
    } else {
        (Severity::Low, SuggestedAction::RunAffectedTests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impact::ImpactTier;

    fn items(tiers: &[ImpactTier]) -> Vec<ImpactItem> {
        tiers
            .iter()
            .enumerate()
            .map(|(i, t)| ImpactItem::new(format!("t{i}.py"), *t, "r"))
            .collect()
    }

    #[test]
    fn test_empty() {
        assert_eq!(resolve_severity(&[]), (Severity::None, SuggestedAction::NoAction));
    }

    #[test]
    fn test_informational_only_is_no_action() {
        let list = items(&[ImpactTier::NonFunctional; 7]);
        assert_eq!(
            resolve_severity(&list),
            (Severity::Low, SuggestedAction::NoAction)
        );
    }

    #[test]
    fn test_three_high_runs_all() {
        let list = items(&[ImpactTier::DirectEdit, ImpactTier::DirectCaller, ImpactTier::DirectCaller]);
        assert_eq!(
            resolve_severity(&list),
            (Severity::High, SuggestedAction::RunAllTests)
        );
    }

    #[test]
    fn test_one_high_or_many_medium() {
        let list = items(&[ImpactTier::DirectCaller, ImpactTier::NonFunctional]);
        assert_eq!(
            resolve_severity(&list),
            (Severity::Medium, SuggestedAction::RunAffectedTests)
        );
        let list = items(&[ImpactTier::TransitiveCaller; 4]);
        assert_eq!(
            resolve_severity(&list),
            (Severity::Medium, SuggestedAction::RunAffectedTests)
        );
        let list = items(&[ImpactTier::TransitiveCaller; 3]);
        assert_eq!(
            resolve_severity(&list),
            (Severity::Low, SuggestedAction::RunAffectedTests)
        );
    }

    #[test]
    fn test_low_with_informational() {
        let list = items(&[ImpactTier::RelatedHint, ImpactTier::NonFunctional]);
        assert_eq!(
            resolve_severity(&list),
            (Severity::Low, SuggestedAction::RunAffectedTests)
        );
    }
}
