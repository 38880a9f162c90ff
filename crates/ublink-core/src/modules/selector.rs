use crate::domain::{Peak, PeakCatalogue};
use std::cmp::Ordering;

/// Orders peaks by descending d-spacing. Low-order reflections come first
/// because they are the most reliably predicted and observed.
pub fn descending_d_spacing(lhs: &Peak, rhs: &Peak) -> Ordering {
    rhs.d_spacing.total_cmp(&lhs.d_spacing)
}

/// Stable sort by descending d-spacing, truncated to `window` entries.
/// Equal d-spacings keep their catalogue order. The orientation of the
/// source catalogue travels with the selection.
pub fn select_predicted(predicted: &PeakCatalogue, window: usize) -> PeakCatalogue {
    let mut peaks = predicted.peaks().to_vec();
    peaks.sort_by(descending_d_spacing);
    peaks.truncate(window);

    let selected = PeakCatalogue::new(peaks);
    match predicted.orientation() {
        Some(orientation) => selected.with_orientation(orientation.clone()),
        None => selected,
    }
}

#[cfg(test)]
mod tests {
    use super::select_predicted;
    use crate::domain::{MillerIndex, OrientationMatrix, Peak, PeakCatalogue};

    fn predicted(d_spacings: &[f64]) -> PeakCatalogue {
        d_spacings
            .iter()
            .enumerate()
            .map(|(index, &d)| {
                Peak::indexed(
                    [index as f64, 0.0, 0.0],
                    d,
                    MillerIndex::new(index as i32 + 1, 0, 0),
                )
            })
            .collect()
    }

    #[test]
    fn keeps_largest_d_spacings_in_descending_order() {
        let selected = select_predicted(&predicted(&[1.0, 3.0, 2.0, 5.0, 4.0]), 3);
        let d: Vec<f64> = selected.iter().map(|peak| peak.d_spacing).collect();
        assert_eq!(d, vec![5.0, 4.0, 3.0]);
    }

    #[test]
    fn ties_keep_original_order() {
        let selected = select_predicted(&predicted(&[2.0, 3.0, 2.0, 2.0]), 3);
        let hkls: Vec<i32> = selected.iter().filter_map(|peak| peak.hkl).map(|hkl| hkl.h).collect();
        assert_eq!(hkls, vec![2, 1, 3]);
    }

    #[test]
    fn short_catalogue_is_returned_whole() {
        let source = predicted(&[1.5, 2.5]);
        let selected = select_predicted(&source, 15);
        assert_eq!(selected.len(), 2);
        assert!(select_predicted(&source, 0).is_empty());
        assert!(select_predicted(&PeakCatalogue::default(), 10).is_empty());
    }

    #[test]
    fn orientation_travels_with_selection() {
        let ub = OrientationMatrix::from_rows([[0.2, 0.0, 0.0], [0.0, 0.2, 0.0], [0.0, 0.0, 0.2]]);
        let source = predicted(&[1.0, 2.0]).with_orientation(ub.clone());
        assert_eq!(select_predicted(&source, 1).orientation(), Some(&ub));
    }
}
