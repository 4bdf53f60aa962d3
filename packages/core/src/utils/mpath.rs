//! Materialized path helpers
//!
//! An mpath is the `.`-joined chain of ancestor ids ending in the node's own
//! id. Subtree and ancestor lookups become prefix / equality matches on this
//! string instead of recursive joins.

/// Path segment delimiter
pub const MPATH_DELIMITER: char = '.';

/// mpath of a child placed under `parent_mpath`
pub fn child_mpath(parent_mpath: &str, id: &str) -> String {
    format!("{}{}{}", parent_mpath, MPATH_DELIMITER, id)
}

/// mpath for a node given its (optional) parent mpath
pub fn mpath_for(parent_mpath: Option<&str>, id: &str) -> String {
    match parent_mpath {
        Some(parent) => child_mpath(parent, id),
        None => id.to_string(),
    }
}

/// Prefix that every strict descendant's mpath starts with
pub fn descendant_prefix(mpath: &str) -> String {
    format!("{}{}", mpath, MPATH_DELIMITER)
}

pub fn segment_count(mpath: &str) -> usize {
    if mpath.is_empty() {
        0
    } else {
        mpath.split(MPATH_DELIMITER).count()
    }
}

/// Every proper prefix of `mpath` on delimiter boundaries, root first
///
/// These are exactly the mpaths of the node's ancestors.
///
/// ```
/// # use stocktree_core::utils::mpath::ancestor_prefixes;
/// assert_eq!(ancestor_prefixes("a.b.c"), vec!["a".to_string(), "a.b".to_string()]);
/// assert!(ancestor_prefixes("a").is_empty());
/// ```
pub fn ancestor_prefixes(mpath: &str) -> Vec<String> {
    let segments: Vec<&str> = mpath.split(MPATH_DELIMITER).collect();
    let mut prefixes = Vec::with_capacity(segments.len().saturating_sub(1));
    let mut current = String::new();

    for segment in segments.iter().take(segments.len().saturating_sub(1)) {
        if !current.is_empty() {
            current.push(MPATH_DELIMITER);
        }
        current.push_str(segment);
        prefixes.push(current.clone());
    }

    prefixes
}

/// Whether `mpath` lies strictly below `ancestor_mpath`
pub fn is_strict_descendant(mpath: &str, ancestor_mpath: &str) -> bool {
    mpath.len() > ancestor_mpath.len()
        && mpath.starts_with(ancestor_mpath)
        && mpath[ancestor_mpath.len()..].starts_with(MPATH_DELIMITER)
}

/// Whether `mpath` is `ancestor_mpath` itself or lies below it
pub fn is_within(mpath: &str, ancestor_mpath: &str) -> bool {
    mpath == ancestor_mpath || is_strict_descendant(mpath, ancestor_mpath)
}

/// Move `mpath` from under `old_root` to under `new_root`
///
/// Keeps the suffix after `old_root` and prepends `new_root`. Returns `None`
/// if `mpath` is not within `old_root`.
///
/// ```
/// # use stocktree_core::utils::mpath::rebase;
/// assert_eq!(rebase("r.a.b", "r.a", "r2.a").as_deref(), Some("r2.a.b"));
/// assert_eq!(rebase("r.a", "r.a", "a").as_deref(), Some("a"));
/// assert_eq!(rebase("x.y", "r.a", "a"), None);
/// ```
pub fn rebase(mpath: &str, old_root: &str, new_root: &str) -> Option<String> {
    if !is_within(mpath, old_root) {
        return None;
    }
    Some(format!("{}{}", new_root, &mpath[old_root.len()..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mpath_for_root_and_child() {
        assert_eq!(mpath_for(None, "r"), "r");
        assert_eq!(mpath_for(Some("r.a"), "b"), "r.a.b");
    }

    #[test]
    fn test_segment_count() {
        assert_eq!(segment_count("r"), 1);
        assert_eq!(segment_count("r.a.b"), 3);
        assert_eq!(segment_count(""), 0);
    }

    #[test]
    fn test_ancestor_prefixes_deep() {
        assert_eq!(
            ancestor_prefixes("r.a.b.c"),
            vec!["r".to_string(), "r.a".to_string(), "r.a.b".to_string()]
        );
    }

    #[test]
    fn test_descendant_check_respects_segment_boundary() {
        assert!(is_strict_descendant("igrp_1.igrp_2", "igrp_1"));
        assert!(!is_strict_descendant("igrp_10", "igrp_1"));
        assert!(!is_strict_descendant("igrp_1", "igrp_1"));
        assert!(is_within("igrp_1", "igrp_1"));
    }

    #[test]
    fn test_rebase_detach_to_root() {
        assert_eq!(rebase("r.a.b.c", "r.a", "a").as_deref(), Some("a.b.c"));
    }
}
