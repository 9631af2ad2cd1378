use buddy_model::{MediaNode, RuleFilters, WatchRecord};

use crate::catalog::CatalogSnapshot;

/// Conjunction of every configured filter. Tag sets are gathered from the
/// episode and its ancestors, so a genre set on the show applies to each of
/// its episodes.
pub(crate) fn admits(
    snapshot: &CatalogSnapshot,
    filters: &RuleFilters,
    episode: &MediaNode,
    watch: &WatchRecord,
) -> bool {
    if let Some(wanted) = filters.watch_state
        && watch.state() != wanted
    {
        return false;
    }
    if !filters.play_count.admits(Some(&watch.play_count)) {
        return false;
    }
    if !filters.air_date.admits(episode.air_date.as_ref()) {
        return false;
    }
    if !filters.runtime_ms.admits(episode.runtime_ms.as_ref()) {
        return false;
    }
    if !filters.last_watched.admits(watch.last_watched_at.as_ref()) {
        return false;
    }
    if let Some(min) = filters.min_rating
        && let Some(rating) = episode.rating
        && rating < min
    {
        return false;
    }

    tags_intersect(snapshot, episode, &filters.genres, |n| &n.genres)
        && tags_intersect(snapshot, episode, &filters.networks, |n| {
            &n.networks
        })
        && tags_intersect(snapshot, episode, &filters.quality, |n| {
            &n.quality_flags
        })
        && tags_intersect(snapshot, episode, &filters.audio_langs, |n| {
            &n.audio_langs
        })
}

/// Case-insensitive intersection. An empty wanted set admits everything.
fn tags_intersect<F>(
    snapshot: &CatalogSnapshot,
    episode: &MediaNode,
    wanted: &[String],
    tags: F,
) -> bool
where
    F: Fn(&MediaNode) -> &Vec<String>,
{
    if wanted.is_empty() {
        return true;
    }
    snapshot
        .lineage(&episode.id)
        .flat_map(|node| tags(node).iter())
        .any(|tag| wanted.iter().any(|want| want.eq_ignore_ascii_case(tag)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use buddy_model::{Library, LibraryId, NodeId, RangeFilter, WatchState};
    use chrono::{TimeZone, Utc};

    fn snapshot() -> CatalogSnapshot {
        let lib = LibraryId::from("tv");
        let mut snapshot = CatalogSnapshot::new();
        snapshot.insert_library(Library {
            id: lib.clone(),
            title: "TV".into(),
        });
        snapshot
            .set_library_shows(
                &lib,
                vec![
                    MediaNode::show("show", lib.clone(), "Show")
                        .with_genres(["Drama"])
                        .with_networks(["HBO"]),
                ],
            )
            .unwrap();
        snapshot
            .attach_children(
                &NodeId::from("show"),
                vec![MediaNode::season("s1", NodeId::from("show"), 1)],
            )
            .unwrap();
        snapshot
            .attach_children(
                &NodeId::from("s1"),
                vec![
                    MediaNode::episode("e1", NodeId::from("s1"), 1, 1)
                        .with_runtime_ms(40 * 60_000)
                        .with_quality_flags(["1080p"])
                        .with_audio_langs(["en"]),
                    MediaNode::episode("e2", NodeId::from("s1"), 1, 2),
                ],
            )
            .unwrap();
        snapshot
    }

    fn episode<'a>(snapshot: &'a CatalogSnapshot, id: &str) -> &'a MediaNode {
        snapshot.get(&NodeId::from(id)).unwrap()
    }

    #[test]
    fn default_filters_admit_everything() {
        let snapshot = snapshot();
        let filters = RuleFilters::default();
        for id in ["e1", "e2"] {
            assert!(admits(
                &snapshot,
                &filters,
                episode(&snapshot, id),
                &WatchRecord::default()
            ));
        }
    }

    #[test]
    fn show_tags_apply_to_episodes_case_insensitively() {
        let snapshot = snapshot();
        let drama = RuleFilters {
            genres: vec!["drama".into(), "Comedy".into()],
            ..RuleFilters::default()
        };
        let cbs = RuleFilters {
            networks: vec!["CBS".into()],
            ..RuleFilters::default()
        };
        let e2 = episode(&snapshot, "e2");
        let unwatched = WatchRecord::default();

        assert!(admits(&snapshot, &drama, e2, &unwatched));
        assert!(!admits(&snapshot, &cbs, e2, &unwatched));
    }

    #[test]
    fn unknown_runtime_fails_a_runtime_range() {
        let snapshot = snapshot();
        let filters = RuleFilters {
            runtime_ms: RangeFilter::at_most(45 * 60_000),
            ..RuleFilters::default()
        };
        let unwatched = WatchRecord::default();
        let (e1, e2) = (episode(&snapshot, "e1"), episode(&snapshot, "e2"));

        assert!(admits(&snapshot, &filters, e1, &unwatched));
        assert!(!admits(&snapshot, &filters, e2, &unwatched));
    }

    #[test]
    fn missing_rating_skips_the_threshold() {
        let snapshot = snapshot();
        let filters = RuleFilters {
            min_rating: Some(8.0),
            ..RuleFilters::default()
        };
        assert!(admits(
            &snapshot,
            &filters,
            episode(&snapshot, "e2"),
            &WatchRecord::default()
        ));

        let low = episode(&snapshot, "e2").clone().with_rating(6.5);
        assert!(!admits(&snapshot, &filters, &low, &WatchRecord::default()));
    }

    #[test]
    fn watch_filters_use_the_record() {
        let snapshot = snapshot();
        let seen_at = Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap();
        let watched = WatchRecord::watched(3, seen_at);
        let e1 = episode(&snapshot, "e1");

        let unwatched_only = RuleFilters {
            watch_state: Some(WatchState::Unwatched),
            ..RuleFilters::default()
        };
        assert!(!admits(&snapshot, &unwatched_only, e1, &watched));
        assert!(admits(
            &snapshot,
            &unwatched_only,
            e1,
            &WatchRecord::default()
        ));

        let replayed = RuleFilters {
            play_count: RangeFilter::at_least(2),
            last_watched: RangeFilter::at_least(seen_at),
            ..RuleFilters::default()
        };
        assert!(admits(&snapshot, &replayed, e1, &watched));
        assert!(!admits(&snapshot, &replayed, e1, &WatchRecord::default()));
    }

    #[test]
    fn quality_and_audio_come_from_the_episode() {
        let snapshot = snapshot();
        let filters = RuleFilters {
            quality: vec!["1080P".into()],
            audio_langs: vec!["EN".into()],
            ..RuleFilters::default()
        };
        let unwatched = WatchRecord::default();
        let (e1, e2) = (episode(&snapshot, "e1"), episode(&snapshot, "e2"));

        assert!(admits(&snapshot, &filters, e1, &unwatched));
        assert!(!admits(&snapshot, &filters, e2, &unwatched));
    }
}
