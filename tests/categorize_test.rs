mod helpers;

use playsona::persona::moods::{default_categories, MoodCatalog};
use playsona::persona::types::ContentItem;

fn tagged(genres: &[&str], tags: &[&str]) -> ContentItem {
    let mut item = ContentItem::new("x", "Test Game");
    item.genres = genres.iter().map(|s| s.to_string()).collect();
    item.tags = tags.iter().map(|s| s.to_string()).collect();
    item
}

#[test]
fn multiplayer_tag_beats_genre_only_match() {
    let catalog = MoodCatalog::default();
    for genre in ["puzzle", "rpg", "adventure", "sandbox", "fighting"] {
        let result = catalog.categorize(&tagged(&[genre], &["multiplayer"])).unwrap();
        assert_eq!(result.category, "social", "genre {genre}");
        assert_eq!(result.priority, 10);
    }
}

#[test]
fn higher_priority_always_wins_when_both_match() {
    let catalog = MoodCatalog::default();
    let categories = default_categories();

    for a in &categories {
        for b in &categories {
            if a.priority == b.priority {
                continue;
            }
            let item = tagged(&[a.keywords[0]], &[b.keywords[0]]);
            let result = catalog.categorize(&item).unwrap();
            let expected = if a.priority > b.priority { a.id } else { b.id };
            assert_eq!(result.category, expected, "{} vs {}", a.id, b.id);
        }
    }
}

#[test]
fn fixture_library_assignments() {
    let catalog = MoodCatalog::default();
    let items = helpers::sample_library();
    let assigned: Vec<(String, &str)> = catalog
        .categorize_all(&items)
        .into_iter()
        .map(|c| (c.item_id, c.category))
        .collect();

    assert_eq!(
        assigned,
        vec![
            ("stardew".to_string(), "creative"),
            ("hades".to_string(), "adventure"),
            ("overcooked".to_string(), "social"),
            ("tetris".to_string(), "chill"),
        ]
    );
}

#[test]
fn validator_reports_overlap_without_changing_assignment() {
    let (engine, _) = helpers::test_engine();
    let items = helpers::sample_library();
    let before = engine.categorize(&items);
    let report = engine.validate_categories(&items);
    let after = engine.categorize(&items);

    assert_eq!(before, after);
    assert_eq!(report.total_items, 4);
    // only stardew matches two categories (creative + chill)
    assert_eq!(report.overlap_count, 1);
    assert_eq!(report.overlap_ratio, 0.25);
    assert_eq!(report.matches_by_category["chill"], 2);
    assert_eq!(report.uncategorized_count, 0);
    assert!(!report.acceptable);
}
