//! In-memory dedup of a harvested batch.
//!
//! The scroll loop inevitably re-reads containers: items re-render, the
//! feed virtualizes, and reply expansion shifts indices. Identity is the
//! `(author, text)` pair; the first occurrence wins and order is preserved.

use std::collections::HashSet;

use tracing::debug;

use crate::core::types::Comment;

/// Drop repeat sightings, keeping first-seen order.
/// Returns the unique batch and the number of duplicates dropped.
pub fn dedup_comments(comments: Vec<Comment>) -> (Vec<Comment>, usize) {
    let total = comments.len();
    let mut seen: HashSet<(String, String)> = HashSet::with_capacity(total);
    let mut unique = Vec::with_capacity(total);

    for comment in comments {
        let key = (comment.author.clone(), comment.text.clone());
        if seen.insert(key) {
            unique.push(comment);
        }
    }

    let dropped = total - unique.len();
    if dropped > 0 {
        debug!(dropped, kept = unique.len(), "deduplicated batch");
    }
    (unique, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::core::types::AvatarRef;

    fn comment(author: &str, text: &str) -> Comment {
        Comment {
            author: author.to_string(),
            text: text.to_string(),
            like_count: 0,
            posted_at: "2d ago".to_string(),
            reply_count: 0,
            is_reply: false,
            parent_author: None,
            parent_preview: None,
            avatar: AvatarRef::default(),
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn drops_repeat_sightings_keeping_first_seen_order() {
        let batch = vec![
            comment("ana", "first!"),
            comment("ben", "nice"),
            comment("ana", "first!"),
            comment("ana", "different text"),
            comment("ben", "nice"),
        ];
        let (unique, dropped) = dedup_comments(batch);
        assert_eq!(dropped, 2);
        let keys: Vec<_> = unique.iter().map(|c| (c.author.as_str(), c.text.as_str())).collect();
        assert_eq!(
            keys,
            vec![("ana", "first!"), ("ben", "nice"), ("ana", "different text")]
        );
    }

    #[test]
    fn same_text_different_author_is_distinct() {
        let batch = vec![comment("ana", "nice"), comment("ben", "nice")];
        let (unique, dropped) = dedup_comments(batch);
        assert_eq!(unique.len(), 2);
        assert_eq!(dropped, 0);
    }

    #[test]
    fn is_idempotent() {
        let batch = vec![
            comment("ana", "x"),
            comment("ana", "x"),
            comment("ben", "y"),
        ];
        let (once, d1) = dedup_comments(batch);
        assert_eq!(d1, 1);
        let (twice, d2) = dedup_comments(once.clone());
        assert_eq!(d2, 0);
        assert_eq!(twice.len(), once.len());
    }

    #[test]
    fn empty_batch_is_fine() {
        let (unique, dropped) = dedup_comments(Vec::new());
        assert!(unique.is_empty());
        assert_eq!(dropped, 0);
    }
}
