/// A pluggable per-fragment text transform, run at flatten time before the
/// markers are injected.
///
/// Transforms are pure text-to-text functions with no knowledge of the tree:
/// they receive a fragment's full code and return the replacement. They must
/// not alter fragment identity and should return text, not panic, on
/// ordinary input. Higher priority runs first.
pub trait Transform {
    fn priority(&self) -> i32 {
        0
    }

    fn apply(&self, code: String) -> String;
}

/// Order transforms by descending priority, stable for equal priorities.
pub fn in_priority_order(transforms: &[Box<dyn Transform>]) -> Vec<&dyn Transform> {
    let mut ordered: Vec<&dyn Transform> = transforms.iter().map(AsRef::as_ref).collect();
    ordered.sort_by(|l, r| r.priority().cmp(&l.priority()));
    ordered
}
