//! Pattern detection over a user's recent emotion history.
//!
//! The detection rule is deliberately simple: take the most recent
//! [`RECENT_WINDOW`] records and pick the most frequent label. Ties go to the
//! label whose first occurrence comes earliest in most-recent-first order, so
//! the outcome never depends on hash iteration order.

/// How many of a user's most recent records are considered.
pub const RECENT_WINDOW: usize = 5;

/// Return the dominant label among `emotions`, which must be ordered
/// most-recent-first.
///
/// Returns `None` for an empty slice.
pub fn dominant_emotion<S: AsRef<str>>(emotions: &[S]) -> Option<&str> {
    // (label, count) in first-occurrence order.
    let mut tally: Vec<(&str, usize)> = Vec::new();
    for e in emotions {
        let label = e.as_ref();
        match tally.iter_mut().find(|(l, _)| *l == label) {
            Some((_, count)) => *count += 1,
            None => tally.push((label, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (label, count) in tally {
        // Strictly greater: an equal count later in the list never wins.
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((label, count));
        }
    }
    best.map(|(label, _)| label)
}

/// File name of the narration clip for a virtue, e.g.
/// `narration_patience.mp3`.
pub fn narration_file(virtue: &str) -> String {
    format!("narration_{}.mp3", virtue.to_lowercase())
}
