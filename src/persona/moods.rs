//! Mood categorization: each item lands in at most one [`MoodCategory`].
//!
//! Every category's keyword predicate is run against the item's moods,
//! genres and tags (case-insensitive substring). When several match, the
//! highest priority wins; equal priorities resolve to the category declared
//! first in the catalog.

use serde::Serialize;
use std::collections::BTreeMap;

use super::types::ContentItem;

/// Builds the human-readable reason for a match from the item title and the
/// keyword that triggered it.
pub type ReasonFn = fn(title: &str, keyword: &str) -> String;

/// One entry of the mood catalog.
#[derive(Clone)]
pub struct MoodCategory {
    pub id: &'static str,
    /// Higher wins when several categories match.
    pub priority: i32,
    pub keywords: &'static [&'static str],
    pub reason: ReasonFn,
}

impl std::fmt::Debug for MoodCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MoodCategory")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("keywords", &self.keywords)
            .finish_non_exhaustive()
    }
}

impl MoodCategory {
    /// First keyword (in catalog order) found in the item's moods, genres or tags.
    pub fn matched_keyword(&self, item: &ContentItem) -> Option<&'static str> {
        let haystack: Vec<String> = item
            .moods
            .iter()
            .chain(item.genres.iter())
            .chain(item.tags.iter())
            .map(|k| k.to_lowercase())
            .collect();

        self.keywords
            .iter()
            .copied()
            .find(|keyword| haystack.iter().any(|h| h.contains(keyword)))
    }

    pub fn matches(&self, item: &ContentItem) -> bool {
        self.matched_keyword(item).is_some()
    }
}

/// The category chosen for an item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Categorization {
    pub item_id: String,
    pub category: &'static str,
    pub priority: i32,
    pub reason: String,
}

/// Diagnostic overlap report for a whole library.
#[derive(Debug, Clone, Serialize)]
pub struct OverlapReport {
    pub total_items: usize,
    /// Category id → number of items whose predicate matched (before resolution).
    pub matches_by_category: BTreeMap<String, usize>,
    /// Category id → number of items finally assigned to it.
    pub assigned_by_category: BTreeMap<String, usize>,
    /// Items matching more than one category.
    pub overlap_count: usize,
    pub uncategorized_count: usize,
    pub overlap_ratio: f64,
    pub acceptable_overlap: f64,
    pub acceptable: bool,
}

/// Ordered, fixed set of mood categories.
#[derive(Debug, Clone)]
pub struct MoodCatalog {
    categories: Vec<MoodCategory>,
}

impl Default for MoodCatalog {
    fn default() -> Self {
        Self::new(default_categories())
    }
}

impl MoodCatalog {
    pub fn new(categories: Vec<MoodCategory>) -> Self {
        Self { categories }
    }

    pub fn categories(&self) -> &[MoodCategory] {
        &self.categories
    }

    pub fn get(&self, id: &str) -> Option<&MoodCategory> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Assign `item` to at most one category.
    pub fn categorize(&self, item: &ContentItem) -> Option<Categorization> {
        let mut best: Option<(&MoodCategory, &'static str)> = None;

        for category in &self.categories {
            let Some(keyword) = category.matched_keyword(item) else {
                continue;
            };
            // strict comparison keeps the earlier category on a priority tie
            let better = match best {
                Some((current, _)) => category.priority > current.priority,
                None => true,
            };
            if better {
                best = Some((category, keyword));
            }
        }

        best.map(|(category, keyword)| Categorization {
            item_id: item.id.clone(),
            category: category.id,
            priority: category.priority,
            reason: (category.reason)(&item.title, keyword),
        })
    }

    /// Categorize every item, keeping library order. Unmatched items are omitted.
    pub fn categorize_all(&self, items: &[ContentItem]) -> Vec<Categorization> {
        items.iter().filter_map(|item| self.categorize(item)).collect()
    }

    /// Group items by assigned category id.
    pub fn group<'a>(&self, items: &'a [ContentItem]) -> BTreeMap<&'static str, Vec<&'a ContentItem>> {
        let mut groups: BTreeMap<&'static str, Vec<&'a ContentItem>> = BTreeMap::new();
        for item in items {
            if let Some(c) = self.categorize(item) {
                groups.entry(c.category).or_default().push(item);
            }
        }
        groups
    }

    /// Measure how often category predicates overlap across a library.
    ///
    /// Diagnostic only: categorization itself is unaffected.
    pub fn validate(&self, items: &[ContentItem], acceptable_overlap: f64) -> OverlapReport {
        let mut matches_by_category: BTreeMap<String, usize> = self
            .categories
            .iter()
            .map(|c| (c.id.to_string(), 0))
            .collect();
        let mut assigned_by_category = matches_by_category.clone();
        let mut overlap_count = 0;
        let mut uncategorized_count = 0;

        for item in items {
            let matched: Vec<&MoodCategory> =
                self.categories.iter().filter(|c| c.matches(item)).collect();
            for category in &matched {
                *matches_by_category.entry(category.id.to_string()).or_insert(0) += 1;
            }
            if matched.len() > 1 {
                overlap_count += 1;
            }
            match self.categorize(item) {
                Some(c) => *assigned_by_category.entry(c.category.to_string()).or_insert(0) += 1,
                None => uncategorized_count += 1,
            }
        }

        let overlap_ratio = if items.is_empty() {
            0.0
        } else {
            overlap_count as f64 / items.len() as f64
        };

        if overlap_ratio > acceptable_overlap {
            tracing::warn!(
                overlap_ratio,
                acceptable_overlap,
                overlap_count,
                "mood category overlap above threshold"
            );
        }

        OverlapReport {
            total_items: items.len(),
            matches_by_category,
            assigned_by_category,
            overlap_count,
            uncategorized_count,
            overlap_ratio,
            acceptable_overlap,
            acceptable: overlap_ratio <= acceptable_overlap,
        }
    }
}

/// The built-in catalog, highest priority first.
pub fn default_categories() -> Vec<MoodCategory> {
    vec![
        MoodCategory {
            id: "social",
            priority: 10,
            keywords: &["social", "multiplayer", "co-op", "coop", "online", "party", "mmo"],
            reason: |title, kw| format!("{title} is better with friends ({kw})"),
        },
        MoodCategory {
            id: "competitive",
            priority: 9,
            keywords: &["competitive", "pvp", "esports", "ranked", "fighting", "battle royale", "versus"],
            reason: |title, kw| format!("{title} scratches the competitive itch ({kw})"),
        },
        MoodCategory {
            id: "story",
            priority: 7,
            keywords: &["story", "narrative", "rpg", "visual novel", "cinematic", "choices"],
            reason: |title, kw| format!("{title} has a story worth following ({kw})"),
        },
        MoodCategory {
            id: "adventure",
            priority: 6,
            keywords: &["adventure", "exploration", "open world", "platformer", "metroidvania", "action"],
            reason: |title, kw| format!("{title} is built for exploring ({kw})"),
        },
        MoodCategory {
            id: "creative",
            priority: 5,
            keywords: &["creative", "sandbox", "building", "crafting", "simulation"],
            reason: |title, kw| format!("{title} lets you make something ({kw})"),
        },
        MoodCategory {
            id: "chill",
            priority: 4,
            keywords: &["chill", "relaxing", "cozy", "casual", "puzzle", "farming", "peaceful"],
            reason: |title, kw| format!("{title} is an easy, low-stress pick ({kw})"),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(genres: &[&str], tags: &[&str], moods: &[&str]) -> ContentItem {
        let mut item = ContentItem::new("id", "Game");
        item.genres = genres.iter().map(|s| s.to_string()).collect();
        item.tags = tags.iter().map(|s| s.to_string()).collect();
        item.moods = moods.iter().map(|s| s.to_string()).collect();
        item
    }

    #[test]
    fn test_multiplayer_tag_is_social() {
        let catalog = MoodCatalog::default();
        let result = catalog.categorize(&item(&[], &["multiplayer"], &[])).unwrap();
        assert_eq!(result.category, "social");
        assert_eq!(result.priority, 10);
        assert!(result.reason.contains("multiplayer"));
    }

    #[test]
    fn test_higher_priority_beats_genre_match() {
        let catalog = MoodCatalog::default();
        let result = catalog
            .categorize(&item(&["Puzzle", "RPG"], &["Online Co-op"], &[]))
            .unwrap();
        assert_eq!(result.category, "social");
    }

    #[test]
    fn test_case_insensitive_substring_match() {
        let catalog = MoodCatalog::default();
        let result = catalog.categorize(&item(&["Action-Adventure"], &[], &[])).unwrap();
        assert_eq!(result.category, "adventure");
    }

    #[test]
    fn test_mood_label_alone_matches() {
        let catalog = MoodCatalog::default();
        let result = catalog.categorize(&item(&[], &[], &["chill"])).unwrap();
        assert_eq!(result.category, "chill");
    }

    #[test]
    fn test_no_match_is_none() {
        let catalog = MoodCatalog::default();
        assert!(catalog.categorize(&item(&["racing"], &["cars"], &[])).is_none());
    }

    #[test]
    fn test_equal_priority_resolves_to_catalog_order() {
        let catalog = MoodCatalog::new(vec![
            MoodCategory {
                id: "first",
                priority: 3,
                keywords: &["shared"],
                reason: |t, _| t.to_string(),
            },
            MoodCategory {
                id: "second",
                priority: 3,
                keywords: &["shared"],
                reason: |t, _| t.to_string(),
            },
        ]);
        let result = catalog.categorize(&item(&["shared"], &[], &[])).unwrap();
        assert_eq!(result.category, "first");
    }

    #[test]
    fn test_validator_counts_overlap_without_changing_assignment() {
        let catalog = MoodCatalog::default();
        let items = vec![
            item(&["puzzle"], &["multiplayer"], &[]), // social + chill
            item(&["rpg"], &[], &[]),                  // story
            item(&["racing"], &[], &[]),               // none
            item(&["farming"], &[], &[]),              // chill
        ];
        let report = catalog.validate(&items, 0.05);
        assert_eq!(report.total_items, 4);
        assert_eq!(report.overlap_count, 1);
        assert_eq!(report.uncategorized_count, 1);
        assert_eq!(report.matches_by_category["chill"], 2);
        assert_eq!(report.assigned_by_category["chill"], 1);
        assert_eq!(report.assigned_by_category["social"], 1);
        assert_eq!(report.overlap_ratio, 0.25);
        assert!(!report.acceptable);
        assert!(catalog.validate(&items, 0.3).acceptable);

        let assigned: Vec<_> = catalog.categorize_all(&items).into_iter().map(|c| c.category).collect();
        assert_eq!(assigned, vec!["social", "story", "chill"]);
    }

    #[test]
    fn test_group_by_category() {
        let catalog = MoodCatalog::default();
        let items = vec![item(&["rpg"], &[], &[]), item(&["jrpg"], &[], &[]), item(&["cozy"], &[], &[])];
        let groups = catalog.group(&items);
        assert_eq!(groups["story"].len(), 2);
        assert_eq!(groups["chill"].len(), 1);
    }
}
