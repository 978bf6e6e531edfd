//! Related-branch heuristic.
//!
//! Two different branches are "related" when a teacher of one can
//! reasonably cover the other. Used for the half-weight branch score and
//! for alternate-teacher search during repair.

use crate::models::same_branch;

const RELATED_BRANCHES: &[(&str, &str)] = &[
    ("mathematics", "science"),
    ("mathematics", "technology"),
    ("science", "technology"),
    ("turkish", "literature"),
    ("language", "literature"),
    ("language", "english"),
    ("english", "foreign language"),
    ("social studies", "history"),
    ("social studies", "geography"),
    ("social studies", "religion"),
    ("history", "geography"),
    ("art", "music"),
    ("art", "visual arts"),
    ("physical education", "play and games"),
];

/// Whether two distinct branches are related. Symmetric; a branch is not
/// related to itself (use [`same_branch`] for equality).
pub fn are_related(a: &str, b: &str) -> bool {
    if same_branch(a, b) {
        return false;
    }
    let a = a.trim().to_ascii_lowercase();
    let b = b.trim().to_ascii_lowercase();
    RELATED_BRANCHES
        .iter()
        .any(|(x, y)| (*x == a && *y == b) || (*x == b && *y == a))
}

/// Equal or related.
pub fn is_compatible(a: &str, b: &str) -> bool {
    same_branch(a, b) || are_related(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_related_is_symmetric() {
        assert!(are_related("Mathematics", "Science"));
        assert!(are_related("science", "MATHEMATICS"));
        assert!(are_related("Music", "Art"));
    }

    #[test]
    fn test_same_branch_is_not_related() {
        assert!(!are_related("Science", "science"));
        assert!(is_compatible("Science", "science"));
    }

    #[test]
    fn test_unrelated() {
        assert!(!are_related("Mathematics", "Music"));
        assert!(!is_compatible("Mathematics", "Music"));
    }
}
