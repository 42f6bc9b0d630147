//! Derived views over the raw photo/album collections.
//!
//! Everything here is a pure function of its inputs: no I/O, no engine
//! state. The presentation layer re-derives these on every state change.

use crate::gallery::model::{Album, Photo};
use chrono::{DateTime, Datelike, Utc};

/// Columns in the masonry grid; landscape photos span two of them.
pub const GRID_COLUMNS: usize = 6;

/// Photos per page in the searchable grid.
pub const PAGE_SIZE: usize = 20;

/// At most this many page buttons, centered on the current page.
pub const PAGE_WINDOW: usize = 5;

/// Bucket label for albums without a theme.
pub const UNCATEGORIZED_THEME: &str = "Uncategorized";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

/// An album enriched with everything derived from its member photos.
#[derive(Debug, Clone, PartialEq)]
pub struct AlbumWithStats {
    pub album: Album,
    pub photo_count: usize,
    pub year_range: Option<YearRange>,
    pub cover_photo_url: Option<String>,
    pub latest_photo_date: Option<DateTime<Utc>>,
}

/// One displayed section: a theme and its albums.
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeGroup {
    pub theme: String,
    pub albums: Vec<AlbumWithStats>,
}

// ── Album statistics ──────────────────────────────────────────────────────────

/// Enrich every album with member-photo statistics, globally ordered for
/// display: newest year range first (empty albums sort last, as year 0),
/// ties by name.
pub fn albums_with_stats(photos: &[Photo], albums: &[Album]) -> Vec<AlbumWithStats> {
    let mut stats: Vec<AlbumWithStats> = albums
        .iter()
        .map(|album| {
            let members: Vec<&Photo> =
                photos.iter().filter(|p| p.album_id == album.id).collect();
            AlbumWithStats {
                photo_count: members.len(),
                year_range: year_range_of(&members),
                cover_photo_url: resolve_cover(album, &members),
                latest_photo_date: members.iter().map(|p| p.best_date()).max(),
                album: album.clone(),
            }
        })
        .collect();

    stats.sort_by(|a, b| {
        let a_end = a.year_range.map(|r| r.end).unwrap_or(0);
        let b_end = b.year_range.map(|r| r.end).unwrap_or(0);
        b_end.cmp(&a_end).then_with(|| a.album.name.cmp(&b.album.name))
    });
    stats
}

fn year_range_of(members: &[&Photo]) -> Option<YearRange> {
    let years: Vec<i32> = members.iter().map(|p| p.best_date().year()).collect();
    match (years.iter().min(), years.iter().max()) {
        (Some(&start), Some(&end)) => Some(YearRange { start, end }),
        _ => None,
    }
}

/// Effective cover: the explicit `cover_photo_id` override, matched by id,
/// wins when it resolves to a member photo; the fallback is the album's
/// most recent photo by best-known date.
fn resolve_cover(album: &Album, members: &[&Photo]) -> Option<String> {
    if let Some(cover_id) = &album.cover_photo_id {
        if let Some(cover) = members.iter().find(|p| &p.id == cover_id) {
            return Some(cover.url.clone());
        }
        tracing::debug!(
            "album {}: cover override {} not among member photos; falling back",
            album.id,
            cover_id
        );
    }
    members
        .iter()
        .max_by_key(|p| p.best_date())
        .map(|p| p.url.clone())
}

/// Partition enriched albums into display sections by theme. Albums without
/// a theme fold into a single "Uncategorized" bucket. Sections are ordered
/// by the most recent photo date of their member albums, newest first;
/// sections with no dated photos come last.
pub fn theme_groups(stats: Vec<AlbumWithStats>) -> Vec<ThemeGroup> {
    let mut groups: Vec<ThemeGroup> = Vec::new();
    for entry in stats {
        let theme = if entry.album.theme.is_empty() {
            UNCATEGORIZED_THEME.to_string()
        } else {
            entry.album.theme.clone()
        };
        match groups.iter_mut().find(|g| g.theme == theme) {
            Some(group) => group.albums.push(entry),
            None => groups.push(ThemeGroup {
                theme,
                albums: vec![entry],
            }),
        }
    }

    groups.sort_by(|a, b| latest_of(b).cmp(&latest_of(a)));
    groups
}

fn latest_of(group: &ThemeGroup) -> Option<DateTime<Utc>> {
    group.albums.iter().filter_map(|a| a.latest_photo_date).max()
}

// ── Chronological orderings ───────────────────────────────────────────────────

/// Recency ordering: newest first. Used by the home carousel and the grid.
pub fn sort_newest_first(photos: &[Photo]) -> Vec<Photo> {
    let mut sorted = photos.to_vec();
    sorted.sort_by(|a, b| b.best_date().cmp(&a.best_date()));
    sorted
}

/// Album-detail ordering: oldest first, telling the story chronologically.
pub fn sort_oldest_first(photos: &[Photo]) -> Vec<Photo> {
    let mut sorted = photos.to_vec();
    sorted.sort_by(|a, b| a.best_date().cmp(&b.best_date()));
    sorted
}

// ── Grid layout balancing ─────────────────────────────────────────────────────

/// Greedy single-pass correction for the one gap pattern a fixed-column
/// masonry grid produces: a single-width item at column `GRID_COLUMNS - 2`
/// followed by a double-width item overflows the row and strands a slot.
/// Swapping the pair fills the row instead. Order-only: the multiset of
/// photos is never changed, and the pass is its own fixed point.
pub fn balance_grid(mut photos: Vec<Photo>) -> Vec<Photo> {
    let mut column = 0usize;
    let mut i = 0;
    while i < photos.len() {
        if column == GRID_COLUMNS - 2
            && photos[i].aspect_ratio_class.grid_span() == 1
            && i + 1 < photos.len()
            && photos[i + 1].aspect_ratio_class.grid_span() == 2
        {
            photos.swap(i, i + 1);
        }
        column = (column + photos[i].aspect_ratio_class.grid_span()) % GRID_COLUMNS;
        i += 1;
    }
    photos
}

// ── Search filter ─────────────────────────────────────────────────────────────

/// Case-insensitive substring match over title, location, best-known date,
/// owning album name, and owning album theme. An empty query matches
/// everything. Applied before sorting, balancing, and pagination.
pub fn filter_photos(photos: &[Photo], albums: &[Album], query: &str) -> Vec<Photo> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return photos.to_vec();
    }
    photos
        .iter()
        .filter(|photo| {
            let album = albums.iter().find(|a| a.id == photo.album_id);
            let mut haystacks = vec![
                photo.title.to_lowercase(),
                photo.best_date().format("%Y-%m-%d").to_string(),
            ];
            if let Some(location) = &photo.location_name {
                haystacks.push(location.to_lowercase());
            }
            if let Some(album) = album {
                haystacks.push(album.name.to_lowercase());
                haystacks.push(album.theme.to_lowercase());
            }
            haystacks.iter().any(|h| h.contains(&needle))
        })
        .cloned()
        .collect()
}

// ── Pagination ────────────────────────────────────────────────────────────────

/// Number of pages for `total_items`. Zero items still yield one (empty)
/// page so a pager always has a valid current page.
pub fn page_count(total_items: usize, page_size: usize) -> usize {
    if total_items == 0 {
        1
    } else {
        total_items.div_ceil(page_size)
    }
}

/// Slice out one 1-based page; out-of-range pages are empty.
pub fn page_slice<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    if page == 0 {
        return &[];
    }
    let start = (page - 1) * page_size;
    if start >= items.len() {
        return &[];
    }
    let end = (start + page_size).min(items.len());
    &items[start..end]
}

/// The page numbers to render as buttons: at most [`PAGE_WINDOW`] of them,
/// centered on the current page where possible, clamped to the valid range.
pub fn page_window(current: usize, total_pages: usize) -> Vec<usize> {
    let half = PAGE_WINDOW / 2;
    let mut start = current.saturating_sub(half).max(1);
    let mut end = start + PAGE_WINDOW - 1;
    if end > total_pages {
        end = total_pages;
        start = end.saturating_sub(PAGE_WINDOW - 1).max(1);
    }
    (start..=end).collect()
}

/// Grid browsing position: the current query, album scope, and page.
/// Changing either the query or the scope resets to page 1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pager {
    query: String,
    album_scope: Option<String>,
    page: usize,
}

impl Pager {
    pub fn new() -> Self {
        Pager {
            query: String::new(),
            album_scope: None,
            page: 1,
        }
    }

    pub fn page(&self) -> usize {
        self.page.max(1)
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn album_scope(&self) -> Option<&str> {
        self.album_scope.as_deref()
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn set_query(&mut self, query: &str) {
        if self.query != query {
            self.query = query.to_string();
            self.page = 1;
        }
    }

    pub fn set_album_scope(&mut self, scope: Option<&str>) {
        let scope = scope.map(|s| s.to_string());
        if self.album_scope != scope {
            self.album_scope = scope;
            self.page = 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::model::AspectClass;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn photo(id: &str, album_id: &str, captured: DateTime<Utc>) -> Photo {
        Photo {
            id: id.to_string(),
            url: format!("https://res.cloudinary.com/demo/image/upload/{}.jpg", id),
            upload_date: date(2024, 1, 1),
            title: id.to_string(),
            album_id: album_id.to_string(),
            captured_at: Some(captured),
            camera_make: None,
            camera_model: None,
            f_number: None,
            exposure_time_seconds: None,
            iso: None,
            gps_coordinate: None,
            location_name: None,
            width: None,
            height: None,
            aspect_ratio_class: AspectClass::Portrait,
        }
    }

    fn album(id: &str, name: &str, theme: &str) -> Album {
        Album {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            theme: theme.to_string(),
            created_at: date(2024, 1, 1),
            cover_photo_id: None,
        }
    }

    fn spanned(id: &str, class: AspectClass) -> Photo {
        let mut p = photo(id, "", date(2024, 1, 1));
        p.aspect_ratio_class = class;
        p
    }

    // ── albums_with_stats ────────────────────────────────────────────────────

    #[test]
    fn test_album_stats_year_range_and_count() {
        let albums = vec![album("a", "Alps", "")];
        let photos = vec![
            photo("p1", "a", date(2021, 3, 1)),
            photo("p2", "a", date(2023, 7, 10)),
        ];
        let stats = albums_with_stats(&photos, &albums);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].photo_count, 2);
        assert_eq!(
            stats[0].year_range,
            Some(YearRange { start: 2021, end: 2023 })
        );
        assert_eq!(stats[0].latest_photo_date, Some(date(2023, 7, 10)));
    }

    #[test]
    fn test_empty_album_has_no_range_and_sorts_last() {
        let albums = vec![album("empty", "Empty", ""), album("full", "Full", "")];
        let photos = vec![photo("p1", "full", date(2022, 5, 1))];
        let stats = albums_with_stats(&photos, &albums);
        assert_eq!(stats[0].album.id, "full");
        assert_eq!(stats[1].album.id, "empty");
        assert_eq!(stats[1].year_range, None);
        assert_eq!(stats[1].cover_photo_url, None);
    }

    #[test]
    fn test_albums_ordered_by_latest_year_then_name() {
        let albums = vec![
            album("b", "Borneo", ""),
            album("a", "Alps", ""),
            album("c", "Coast", ""),
        ];
        let photos = vec![
            photo("p1", "b", date(2022, 1, 1)),
            photo("p2", "a", date(2022, 6, 1)),
            photo("p3", "c", date(2023, 1, 1)),
        ];
        let stats = albums_with_stats(&photos, &albums);
        let order: Vec<&str> = stats.iter().map(|s| s.album.name.as_str()).collect();
        // Coast (2023) first; Alps/Borneo tie on 2022, name ascending
        assert_eq!(order, vec!["Coast", "Alps", "Borneo"]);
    }

    #[test]
    fn test_cover_override_by_id_wins() {
        let mut a = album("a", "Alps", "");
        a.cover_photo_id = Some("p1".to_string());
        let photos = vec![
            photo("p1", "a", date(2020, 1, 1)),
            photo("p2", "a", date(2024, 1, 1)),
        ];
        let stats = albums_with_stats(&photos, &[a]);
        assert!(stats[0].cover_photo_url.as_deref().unwrap().contains("p1"));
    }

    #[test]
    fn test_cover_falls_back_to_most_recent() {
        let mut a = album("a", "Alps", "");
        a.cover_photo_id = Some("gone".to_string());
        let photos = vec![
            photo("p1", "a", date(2020, 1, 1)),
            photo("p2", "a", date(2024, 1, 1)),
        ];
        let stats = albums_with_stats(&photos, &[a]);
        assert!(stats[0].cover_photo_url.as_deref().unwrap().contains("p2"));
    }

    // ── theme_groups ─────────────────────────────────────────────────────────

    #[test]
    fn test_theme_groups_partition_and_order() {
        let albums = vec![
            album("a", "Alps", "Travel"),
            album("b", "Backyard", ""),
            album("c", "Coast", "Travel"),
        ];
        let photos = vec![
            photo("p1", "a", date(2021, 1, 1)),
            photo("p2", "b", date(2024, 1, 1)),
            photo("p3", "c", date(2022, 1, 1)),
        ];
        let groups = theme_groups(albums_with_stats(&photos, &albums));
        assert_eq!(groups.len(), 2);
        // Uncategorized holds the 2024 photo → newest group first
        assert_eq!(groups[0].theme, UNCATEGORIZED_THEME);
        assert_eq!(groups[1].theme, "Travel");
        assert_eq!(groups[1].albums.len(), 2);
    }

    #[test]
    fn test_theme_group_without_dates_sorts_last() {
        let albums = vec![album("a", "Alps", "Travel"), album("b", "Blank", "Empty")];
        let photos = vec![photo("p1", "a", date(2021, 1, 1))];
        let groups = theme_groups(albums_with_stats(&photos, &albums));
        assert_eq!(groups[0].theme, "Travel");
        assert_eq!(groups[1].theme, "Empty");
    }

    // ── chronological orderings ──────────────────────────────────────────────

    #[test]
    fn test_both_orderings_supported() {
        let photos = vec![
            photo("mid", "", date(2022, 1, 1)),
            photo("new", "", date(2024, 1, 1)),
            photo("old", "", date(2020, 1, 1)),
        ];
        let newest = sort_newest_first(&photos);
        let ids: Vec<&str> = newest.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);

        let oldest = sort_oldest_first(&photos);
        let ids: Vec<&str> = oldest.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["old", "mid", "new"]);
    }

    #[test]
    fn test_capture_date_preferred_over_upload_date() {
        let mut uploaded_late = photo("late-upload", "", date(2020, 1, 1));
        uploaded_late.upload_date = date(2024, 6, 1);
        let recent = photo("recent", "", date(2023, 1, 1));
        let sorted = sort_newest_first(&[uploaded_late, recent]);
        assert_eq!(sorted[0].id, "recent", "capture date wins over upload date");
    }

    // ── balance_grid ─────────────────────────────────────────────────────────

    #[test]
    fn test_balancer_swaps_gap_pattern() {
        use AspectClass::{Landscape, Portrait};
        // Four singles fill columns 0-3; the single at column 4 followed by
        // a double is the gap pattern.
        let photos = vec![
            spanned("s1", Portrait),
            spanned("s2", Portrait),
            spanned("s3", Portrait),
            spanned("s4", Portrait),
            spanned("s5", Portrait),
            spanned("d1", Landscape),
        ];
        let balanced = balance_grid(photos);
        let ids: Vec<&str> = balanced.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2", "s3", "s4", "d1", "s5"]);
    }

    #[test]
    fn test_balancer_leaves_fitting_rows_alone() {
        use AspectClass::{Landscape, Portrait};
        let photos = vec![
            spanned("d1", Landscape),
            spanned("s1", Portrait),
            spanned("d2", Landscape),
            spanned("s2", Portrait),
        ];
        let balanced = balance_grid(photos.clone());
        assert_eq!(balanced, photos);
    }

    #[test]
    fn test_balancer_preserves_multiset_and_is_fixed_point() {
        use AspectClass::{Landscape, Portrait, Square};
        let photos: Vec<Photo> = (0..40)
            .map(|i| {
                let class = match i % 5 {
                    0 | 3 => Landscape,
                    1 => Square,
                    _ => Portrait,
                };
                spanned(&format!("p{}", i), class)
            })
            .collect();

        let once = balance_grid(photos.clone());

        let mut original_ids: Vec<&str> = photos.iter().map(|p| p.id.as_str()).collect();
        let mut balanced_ids: Vec<&str> = once.iter().map(|p| p.id.as_str()).collect();
        original_ids.sort_unstable();
        balanced_ids.sort_unstable();
        assert_eq!(original_ids, balanced_ids, "order-only: multiset unchanged");

        let twice = balance_grid(once.clone());
        assert_eq!(once, twice, "balancing its own output must be a no-op");
    }

    // ── filter_photos ────────────────────────────────────────────────────────

    #[test]
    fn test_search_matches_location_case_insensitive() {
        let mut beach = photo("p1", "", date(2023, 8, 1));
        beach.title = "Beach Day".to_string();
        beach.location_name = Some("Lisbon".to_string());
        let mut office = photo("p2", "", date(2023, 8, 2));
        office.title = "Office".to_string();
        office.location_name = Some("Remote".to_string());

        let hits = filter_photos(&[beach, office], &[], "lisbon");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Beach Day");
    }

    #[test]
    fn test_search_matches_album_name_and_theme() {
        let albums = vec![album("a", "Iceland", "Travel")];
        let photos = vec![photo("p1", "a", date(2023, 1, 1)), photo("p2", "", date(2023, 1, 1))];
        assert_eq!(filter_photos(&photos, &albums, "iceland").len(), 1);
        assert_eq!(filter_photos(&photos, &albums, "travel").len(), 1);
    }

    #[test]
    fn test_search_matches_date_string() {
        let photos = vec![
            photo("p1", "", date(2023, 8, 1)),
            photo("p2", "", date(2024, 2, 2)),
        ];
        let hits = filter_photos(&photos, &[], "2023-08");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "p1");
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let photos = vec![photo("p1", "", date(2023, 1, 1))];
        assert_eq!(filter_photos(&photos, &[], "").len(), 1);
        assert_eq!(filter_photos(&photos, &[], "   ").len(), 1);
    }

    // ── pagination ───────────────────────────────────────────────────────────

    #[test]
    fn test_45_items_make_3_pages_and_page_3_has_5() {
        let items: Vec<usize> = (0..45).collect();
        assert_eq!(page_count(items.len(), PAGE_SIZE), 3);
        assert_eq!(page_slice(&items, 1, PAGE_SIZE).len(), 20);
        assert_eq!(page_slice(&items, 2, PAGE_SIZE).len(), 20);
        assert_eq!(page_slice(&items, 3, PAGE_SIZE).len(), 5);
        assert_eq!(page_slice(&items, 4, PAGE_SIZE).len(), 0);
    }

    #[test]
    fn test_zero_items_is_one_empty_page() {
        let items: Vec<usize> = vec![];
        assert_eq!(page_count(0, PAGE_SIZE), 1);
        assert!(page_slice(&items, 1, PAGE_SIZE).is_empty());
    }

    #[test]
    fn test_page_window_centered_and_clamped() {
        assert_eq!(page_window(5, 9), vec![3, 4, 5, 6, 7]);
        assert_eq!(page_window(1, 9), vec![1, 2, 3, 4, 5]);
        assert_eq!(page_window(9, 9), vec![5, 6, 7, 8, 9]);
        assert_eq!(page_window(2, 3), vec![1, 2, 3]);
        assert_eq!(page_window(1, 1), vec![1]);
    }

    #[test]
    fn test_pager_resets_on_query_and_scope_change() {
        let mut pager = Pager::new();
        pager.set_page(3);
        assert_eq!(pager.page(), 3);

        pager.set_query("beach");
        assert_eq!(pager.page(), 1, "query change resets the page");

        pager.set_page(2);
        pager.set_query("beach");
        assert_eq!(pager.page(), 2, "unchanged query keeps the page");

        pager.set_album_scope(Some("a1"));
        assert_eq!(pager.page(), 1, "scope change resets the page");
    }
}
