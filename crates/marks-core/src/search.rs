//! Search projection
//!
//! Read-only view over the store filtered by a free-text query.

use serde::Serialize;

use crate::models::{Favorite, Section};

/// A section with the favorites to show under it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionView {
    pub section: Section,
    pub favorites: Vec<Favorite>,
}

/// Case-insensitive substring match on title or URL
///
/// The query is used as typed, whitespace included. An empty query keeps
/// everything.
pub fn filter(favorites: &[Favorite], query: &str) -> Vec<Favorite> {
    let needle = query.to_lowercase();
    if needle.is_empty() {
        return favorites.to_vec();
    }
    favorites
        .iter()
        .filter(|f| matches(f, &needle))
        .cloned()
        .collect()
}

/// Sections in rank order, each with its matching favorites in rank order
///
/// With an active query, sections without a match are left out.
pub fn project(sections: &[Section], favorites: &[Favorite], query: &str) -> Vec<SectionView> {
    let active = !query.is_empty();
    let matching = filter(favorites, query);

    let mut ordered: Vec<&Section> = sections.iter().collect();
    ordered.sort_by_key(|s| s.rank);

    ordered
        .into_iter()
        .filter_map(|section| {
            let mut own: Vec<Favorite> = matching
                .iter()
                .filter(|f| f.section_id == section.id)
                .cloned()
                .collect();
            if active && own.is_empty() {
                return None;
            }
            own.sort_by_key(|f| f.rank);
            Some(SectionView {
                section: section.clone(),
                favorites: own,
            })
        })
        .collect()
}

fn matches(favorite: &Favorite, needle: &str) -> bool {
    favorite.title.to_lowercase().contains(needle) || favorite.url.to_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Vec<Section>, Vec<Favorite>) {
        let dev = Section::new("Dev", 0);
        let news = Section::new("News", 1);
        let empty = Section::new("Empty", 2);
        let favorites = vec![
            Favorite::new("Code hosting", "https://GitHub.com", dev.id, 1),
            Favorite::new("GitLab", "https://gitlab.com", dev.id, 0),
            Favorite::new("Crates", "https://crates.io", dev.id, 2),
            Favorite::new("Hacker News", "https://news.ycombinator.com", news.id, 0),
        ];
        (vec![dev, news, empty], favorites)
    }

    #[test]
    fn test_filter_matches_title_or_url_ignoring_case() {
        let (_, favorites) = sample();

        let found = filter(&favorites, "git");
        let titles: Vec<&str> = found.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["Code hosting", "GitLab"]);

        assert_eq!(filter(&favorites, "HACKER").len(), 1);
        assert!(filter(&favorites, "nothing here").is_empty());
    }

    #[test]
    fn test_empty_query_keeps_everything() {
        let (sections, favorites) = sample();
        assert_eq!(filter(&favorites, "").len(), favorites.len());

        let views = project(&sections, &favorites, "");
        assert_eq!(views.len(), 3);
        assert!(views[2].favorites.is_empty());
    }

    #[test]
    fn test_project_hides_sections_without_matches() {
        let (sections, favorites) = sample();

        let views = project(&sections, &favorites, "git");
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].section.title, "Dev");

        // Rank order inside the section
        let titles: Vec<&str> = views[0].favorites.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["GitLab", "Code hosting"]);
    }

    #[test]
    fn test_query_whitespace_is_part_of_the_match() {
        let section = Section::new("Read", 0);
        let favorites = vec![
            Favorite::new("Hacker News", "https://news.ycombinator.com", section.id, 0),
            Favorite::new("Reader", "https://newsblur.com", section.id, 1),
        ];

        let found = filter(&favorites, " news");
        let titles: Vec<&str> = found.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["Hacker News"]);

        assert!(filter(&favorites, "  ").is_empty());
        assert!(project(&[section], &favorites, "  ").is_empty());
    }
}
