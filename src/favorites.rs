//! The favorites set as carried in the `favorites` cookie.
//!
//! The whole set lives in a single client-held cookie value. Handlers decode
//! it at entry, mutate the in-memory value and encode it back into the
//! response; the server keeps no copy between requests.

pub const COOKIE_NAME: &str = "favorites";

/// Ordered set of favorite show IDs, serialized as a JSON array of numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoriteSet {
    ids: Vec<i64>,
}

impl FavoriteSet {
    /// Decodes a raw cookie value. An absent cookie, or any value that is not
    /// a JSON array of numbers, decodes as the empty set, never an error.
    pub fn decode(raw: Option<&str>) -> Self {
        let ids = raw
            .and_then(|value| serde_json::from_str::<Vec<i64>>(value).ok())
            .unwrap_or_default();
        Self { ids }
    }

    /// Serializes back to the cookie value. The empty set encodes as `[]`.
    pub fn encode(&self) -> String {
        serde_json::to_string(&self.ids).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    /// Appends `id` unless it is already present. Returns whether the set
    /// changed, so adding twice is indistinguishable from adding once.
    pub fn add(&mut self, id: i64) -> bool {
        if self.ids.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    /// Filters `id` out. Removing an absent id is a no-op, not an error.
    pub fn remove(&mut self, id: i64) -> bool {
        let before = self.ids.len();
        self.ids.retain(|&fav| fav != id);
        self.ids.len() != before
    }

    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_cookie_decodes_as_empty() {
        assert_eq!(FavoriteSet::decode(None).ids(), &[] as &[i64]);
    }

    #[test]
    fn invalid_json_decodes_as_empty() {
        assert!(FavoriteSet::decode(Some("not-json")).is_empty());
        assert!(FavoriteSet::decode(Some("")).is_empty());
    }

    #[test]
    fn non_array_json_decodes_as_empty() {
        assert!(FavoriteSet::decode(Some("{\"id\":5}")).is_empty());
        assert!(FavoriteSet::decode(Some("42")).is_empty());
    }

    #[test]
    fn array_with_non_numeric_elements_decodes_as_empty() {
        assert!(FavoriteSet::decode(Some("[5,\"nine\"]")).is_empty());
    }

    #[test]
    fn decode_preserves_storage_order() {
        let set = FavoriteSet::decode(Some("[12,47,103]"));
        assert_eq!(set.ids(), &[12, 47, 103]);
    }

    #[test]
    fn add_appends_at_the_end() {
        let mut set = FavoriteSet::decode(Some("[5,9]"));
        assert!(set.add(12));
        assert_eq!(set.ids(), &[5, 9, 12]);
    }

    #[test]
    fn add_is_idempotent() {
        let mut set = FavoriteSet::decode(Some("[5,9]"));
        assert!(!set.add(9));
        assert!(!set.add(9));
        assert_eq!(set.ids(), &[5, 9]);
    }

    #[test]
    fn remove_filters_the_id_out() {
        let mut set = FavoriteSet::decode(Some("[5,9,12]"));
        assert!(set.remove(9));
        assert_eq!(set.ids(), &[5, 12]);
    }

    #[test]
    fn remove_is_idempotent_and_tolerates_absent_ids() {
        let mut set = FavoriteSet::decode(Some("[5]"));
        assert!(set.remove(5));
        assert!(!set.remove(5));
        assert!(!set.remove(99));
        assert_eq!(set.ids(), &[] as &[i64]);
    }

    #[test]
    fn empty_set_encodes_as_empty_array() {
        assert_eq!(FavoriteSet::default().encode(), "[]");
    }

    #[test]
    fn encode_round_trips() {
        let mut set = FavoriteSet::decode(None);
        set.add(5);
        set.add(9);
        let decoded = FavoriteSet::decode(Some(&set.encode()));
        assert_eq!(decoded, set);
    }

    #[test]
    fn corrupt_value_recovers_on_next_add() {
        let mut set = FavoriteSet::decode(Some("not-json"));
        assert!(set.add(3));
        assert_eq!(set.encode(), "[3]");
    }
}
