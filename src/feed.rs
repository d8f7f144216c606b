use crate::post::Post;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    CreatedAt,
    Upvotes,
}

impl SortKey {
    pub fn as_key(self) -> &'static str {
        match self {
            SortKey::CreatedAt => "createdAt",
            SortKey::Upvotes => "upvotes",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortKey::CreatedAt => "Sort by Time",
            SortKey::Upvotes => "Sort by Upvotes",
        }
    }
}

pub fn sort_key_from_str(key: &str) -> SortKey {
    match key.trim() {
        "upvotes" => SortKey::Upvotes,
        _ => SortKey::CreatedAt,
    }
}

/// Filters posts by a case-insensitive title substring, then orders them
/// descending by `sort`. Ties keep the store order.
pub fn derive<'a>(posts: &'a [Post], search: &str, sort: SortKey) -> Vec<&'a Post> {
    let needle = search.to_lowercase();
    let mut matched: Vec<&Post> = posts
        .iter()
        .filter(|post| post.title.to_lowercase().contains(&needle))
        .collect();
    match sort {
        SortKey::CreatedAt => matched.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortKey::Upvotes => matched.sort_by(|a, b| b.upvotes.cmp(&a.upvotes)),
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: &str, title: &str, created_at: i64, upvotes: u64) -> Post {
        Post {
            id: id.into(),
            title: title.into(),
            content: String::new(),
            image_url: String::new(),
            created_at,
            upvotes,
            comments: Vec::new(),
        }
    }

    fn ids(posts: &[&Post]) -> Vec<String> {
        posts.iter().map(|p| p.id.clone()).collect()
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let posts = vec![post("k", "Knitting Basics", 1, 0)];
        for term in ["knit", "BASICS", ""] {
            assert_eq!(derive(&posts, term, SortKey::CreatedAt).len(), 1, "{term}");
        }
        assert!(derive(&posts, "purl", SortKey::CreatedAt).is_empty());
    }

    #[test]
    fn created_at_sorts_newest_first() {
        let posts = vec![post("1", "a", 1, 0), post("3", "c", 3, 0), post("2", "b", 2, 0)];
        assert_eq!(ids(&derive(&posts, "", SortKey::CreatedAt)), ["3", "2", "1"]);
    }

    #[test]
    fn upvote_ties_keep_store_order() {
        let posts = vec![
            post("new", "n", 3, 1),
            post("mid", "m", 2, 4),
            post("old", "o", 1, 1),
        ];
        assert_eq!(
            ids(&derive(&posts, "", SortKey::Upvotes)),
            ["mid", "new", "old"]
        );
    }

    #[test]
    fn derive_leaves_input_untouched() {
        let posts = vec![post("1", "a", 1, 5), post("2", "b", 2, 0)];
        let before = posts.clone();
        let _ = derive(&posts, "a", SortKey::Upvotes);
        assert_eq!(posts, before);
    }

    #[test]
    fn sort_keys_parse() {
        assert_eq!(sort_key_from_str("upvotes"), SortKey::Upvotes);
        assert_eq!(sort_key_from_str("createdAt"), SortKey::CreatedAt);
        assert_eq!(sort_key_from_str("bogus"), SortKey::CreatedAt);
        assert_eq!(SortKey::Upvotes.as_key(), "upvotes");
    }
}
