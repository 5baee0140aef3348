use super::markers::{Marker, Period};

/// Last marker whose offset is strictly below `offset`.
///
/// `markers` must be in ascending offset order, which is how the scanner
/// yields them. When several markers share an offset the last one scanned
/// wins.
pub fn preceding(markers: &[Marker], offset: usize) -> Option<&Marker> {
    let idx = markers.partition_point(|m| m.offset < offset);
    idx.checked_sub(1).map(|i| &markers[i])
}

/// Period in effect at `offset`, or `default` when no marker precedes it.
pub fn period_at(markers: &[Marker], offset: usize, default: &Period) -> Period {
    preceding(markers, offset)
        .map(|m| m.period.clone())
        .unwrap_or_else(|| default.clone())
}
