use super::selector::descending_d_spacing;
use crate::domain::{Peak, PeakCatalogue};
use std::cmp::Ordering;
use tracing::trace;

#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub linked: PeakCatalogue,
    /// Observed peaks for which more than one predicted peak passed the box
    /// test. The winner is still chosen by [`candidate_precedence`].
    pub ambiguous: usize,
}

/// Independent per-axis Q test plus the d-spacing window, all inclusive.
pub fn within_box(observed: &Peak, predicted: &Peak, qtol: f64, dtol: f64) -> bool {
    observed
        .q_lab
        .iter()
        .zip(predicted.q_lab.iter())
        .all(|(obs, pred)| (obs - pred).abs() <= qtol)
        && (observed.d_spacing - predicted.d_spacing).abs() <= dtol
}

/// Ranks acceptable candidates: larger d-spacing first, then earlier
/// position in the selection. The minimum wins.
pub fn candidate_precedence(lhs: (usize, &Peak), rhs: (usize, &Peak)) -> Ordering {
    descending_d_spacing(lhs.1, rhs.1).then(lhs.0.cmp(&rhs.0))
}

/// Pairs every observed peak with at most one selected predicted peak.
///
/// Linked peaks sit at the observed position with the index of the winning
/// candidate. Observed peaks without a candidate are skipped.
pub fn match_peaks(
    observed: &PeakCatalogue,
    selected: &PeakCatalogue,
    qtol: f64,
    dtol: f64,
) -> MatchOutcome {
    let mut linked = Vec::new();
    let mut ambiguous = 0;

    for (observed_index, observed_peak) in observed.iter().enumerate() {
        let mut acceptable = selected
            .iter()
            .enumerate()
            .filter(|(_, candidate)| candidate.hkl.is_some())
            .filter(|(_, candidate)| within_box(observed_peak, candidate, qtol, dtol));

        let Some(first) = acceptable.next() else {
            continue;
        };
        let mut winner = first;
        let mut candidate_count = 1;
        for candidate in acceptable {
            candidate_count += 1;
            if candidate_precedence(candidate, winner) == Ordering::Less {
                winner = candidate;
            }
        }

        if candidate_count > 1 {
            ambiguous += 1;
            trace!(
                observed_index,
                candidate_count,
                "observed peak has several predicted candidates; keeping the first in descending-d order"
            );
        }

        linked.push(observed_peak.with_index_from(winner.1));
    }

    MatchOutcome {
        linked: PeakCatalogue::new(linked),
        ambiguous,
    }
}
