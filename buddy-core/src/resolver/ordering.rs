use std::cmp::Ordering;

use buddy_model::{MediaNode, OrderingKey, RuleOrdering, SortDirection};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::watch::WatchSnapshot;

/// Sort `episodes` in place. Ties keep their incoming order.
///
/// For [`OrderingKey::Random`] the shuffle is driven by the rule's seed, or
/// by a freshly drawn one, and the seed actually used is returned.
pub(crate) fn apply(
    episodes: &mut [&MediaNode],
    ordering: &RuleOrdering,
    watch: &WatchSnapshot,
) -> Option<u64> {
    if ordering.key == OrderingKey::Random {
        let seed = ordering.shuffle_seed.unwrap_or_else(rand::random);
        episodes.shuffle(&mut StdRng::seed_from_u64(seed));
        return Some(seed);
    }

    episodes.sort_by(|a, b| {
        let ord = compare(a, b, ordering.key, watch);
        if ordering.direction == SortDirection::Descending {
            ord.reverse()
        } else {
            ord
        }
    });
    None
}

fn compare(
    a: &MediaNode,
    b: &MediaNode,
    key: OrderingKey,
    watch: &WatchSnapshot,
) -> Ordering {
    match key {
        // Missing dates sort first.
        OrderingKey::AirDate => a
            .air_date
            .cmp(&b.air_date)
            .then_with(|| a.season_episode().cmp(&b.season_episode())),
        OrderingKey::SeasonEpisode => {
            a.season_episode().cmp(&b.season_episode())
        }
        OrderingKey::RecentActivity => last_watched(watch, a)
            .cmp(&last_watched(watch, b)),
        OrderingKey::AddedDate => a.added_at.cmp(&b.added_at),
        OrderingKey::Random => Ordering::Equal,
    }
}

fn last_watched(
    watch: &WatchSnapshot,
    episode: &MediaNode,
) -> Option<chrono::DateTime<chrono::Utc>> {
    watch
        .get(&episode.id)
        .and_then(|record| record.last_watched_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use buddy_model::{NodeId, WatchRecord};
    use chrono::{TimeZone, Utc};

    fn ep(id: &str, season: u32, episode: u32) -> MediaNode {
        MediaNode::episode(id, NodeId::from("season"), season, episode)
    }

    fn ids(episodes: &[&MediaNode]) -> Vec<String> {
        episodes.iter().map(|e| e.id.to_string()).collect()
    }

    #[test]
    fn air_date_breaks_ties_by_season_episode_and_missing_sorts_first() {
        let day = |d| Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap();
        let late = ep("late", 1, 1).with_air_date(day(9));
        let tie_b = ep("tie_b", 1, 3).with_air_date(day(5));
        let tie_a = ep("tie_a", 1, 2).with_air_date(day(5));
        let unknown = ep("unknown", 1, 9);
        let mut episodes = vec![&late, &tie_b, &tie_a, &unknown];

        let seed = apply(
            &mut episodes,
            &RuleOrdering::new(OrderingKey::AirDate, SortDirection::Ascending),
            &WatchSnapshot::new(),
        );

        assert_eq!(seed, None);
        assert_eq!(ids(&episodes), ["unknown", "tie_a", "tie_b", "late"]);
    }

    #[test]
    fn descending_flips_the_whole_order() {
        let a = ep("a", 1, 1);
        let b = ep("b", 1, 2);
        let c = ep("c", 2, 1);
        let mut episodes = vec![&b, &c, &a];

        apply(
            &mut episodes,
            &RuleOrdering::new(
                OrderingKey::SeasonEpisode,
                SortDirection::Descending,
            ),
            &WatchSnapshot::new(),
        );
        assert_eq!(ids(&episodes), ["c", "b", "a"]);
    }

    #[test]
    fn recent_activity_treats_unwatched_as_oldest() {
        let a = ep("a", 1, 1);
        let b = ep("b", 1, 2);
        let c = ep("c", 1, 3);
        let watch: WatchSnapshot = [
            (
                NodeId::from("a"),
                WatchRecord::watched(1, Utc.timestamp_opt(200, 0).unwrap()),
            ),
            (
                NodeId::from("c"),
                WatchRecord::watched(1, Utc.timestamp_opt(100, 0).unwrap()),
            ),
        ]
        .into_iter()
        .collect();
        let mut episodes = vec![&a, &b, &c];

        apply(
            &mut episodes,
            &RuleOrdering::new(
                OrderingKey::RecentActivity,
                SortDirection::Ascending,
            ),
            &watch,
        );
        assert_eq!(ids(&episodes), ["b", "c", "a"]);
    }

    #[test]
    fn pinned_seed_reproduces_the_shuffle() {
        let nodes: Vec<MediaNode> =
            (1..=12).map(|n| ep(&format!("e{n}"), 1, n)).collect();
        let ordering = RuleOrdering::seeded_random(42);

        let mut first: Vec<&MediaNode> = nodes.iter().collect();
        let mut second: Vec<&MediaNode> = nodes.iter().collect();
        let seed = apply(&mut first, &ordering, &WatchSnapshot::new());
        apply(&mut second, &ordering, &WatchSnapshot::new());

        assert_eq!(seed, Some(42));
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn unpinned_shuffle_reports_its_seed() {
        let nodes: Vec<MediaNode> =
            (1..=8).map(|n| ep(&format!("e{n}"), 1, n)).collect();
        let mut shuffled: Vec<&MediaNode> = nodes.iter().collect();
        let ordering = RuleOrdering {
            shuffle_seed: None,
            ..RuleOrdering::seeded_random(0)
        };

        let seed = apply(&mut shuffled, &ordering, &WatchSnapshot::new())
            .expect("random ordering reports a seed");

        let mut replay: Vec<&MediaNode> = nodes.iter().collect();
        apply(
            &mut replay,
            &RuleOrdering::seeded_random(seed),
            &WatchSnapshot::new(),
        );
        assert_eq!(ids(&shuffled), ids(&replay));
    }
}
