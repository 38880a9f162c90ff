use crate::domain::PeakCatalogue;

/// Drops peaks indexed as (0, 0, 0), and any peak left without an index.
pub fn drop_origin_indices(linked: &PeakCatalogue) -> PeakCatalogue {
    let kept: PeakCatalogue = linked
        .iter()
        .filter(|peak| peak.is_indexed())
        .cloned()
        .collect();
    match linked.orientation() {
        Some(orientation) => kept.with_orientation(orientation.clone()),
        None => kept,
    }
}
