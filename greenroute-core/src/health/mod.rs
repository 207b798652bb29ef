//! Health scoring and per-group mode assignment for the healthiest profile.
//!
//! A healthiest-criterion route is post-processed into 2–4 contiguous
//! segment groups, each assigned a distinct transport mode: short clean
//! stretches are walked (within a cumulative walking budget), polluted
//! stretches fall to enclosed motorized modes, the rest is cycled or driven.

use geo::Point;
use hashbrown::HashSet;
use serde::Serialize;

use crate::distance::haversine_km;
use crate::eval::RouteSegment;
use crate::model::mode::TravelMode;

/// Endpoint-to-endpoint gap below which adjacent segments are contiguous, km.
const GROUP_GAP_TOLERANCE_KM: f64 = 0.02;

/// Group-count window after merging/splitting.
const MIN_GROUPS: usize = 2;
const MAX_GROUPS: usize = 4;

/// Cumulative walking cap per route, km (also capped by route length).
const WALK_BUDGET_KM: f64 = 2.0;

/// A single walked group must stay at most this long, km.
const WALK_GROUP_MAX_KM: f64 = 1.0;

/// Exposure above which a group prefers enclosed, faster modes.
const HIGH_EXPOSURE_AQI: f64 = 100.0;

/// Groups at most this long fall back to cycling rather than driving, km.
const CYCLE_FALLBACK_MAX_KM: f64 = 3.0;

/// Health score of one traversal: per-mode base, minus a distance-overage
/// penalty past the mode's comfort threshold, minus a pollution penalty
/// proportional to exposure. Never negative.
pub fn health_score(mode: TravelMode, distance_km: f64, exposure: f64) -> f64 {
    let profile = mode.profile();
    let overage = (distance_km - profile.comfort_km).max(0.0);
    (profile.health_base
        - overage * profile.overage_penalty_per_km
        - exposure * profile.pollution_sensitivity)
        .max(0.0)
}

/// One group of consecutive route segments with its assigned mode.
#[derive(Debug, Clone, Serialize)]
pub struct ModeGroup {
    /// Index of the group's first segment in the route's segment list.
    pub first_segment: usize,
    pub segment_count: usize,
    pub length_km: f64,
    /// Running average exposure over the group's segments.
    pub avg_exposure: f64,
    pub mode: TravelMode,
    /// Travel time at the assigned mode's default speed, minutes.
    pub time_min: f64,
    pub health: f64,
}

/// Group a route's segments and assign each group a distinct travel mode.
///
/// Returns an empty vector for an empty segment list; a single-segment
/// route yields a single group.
pub fn assign_modes(segments: &[RouteSegment]) -> Vec<ModeGroup> {
    if segments.is_empty() {
        return Vec::new();
    }

    let mut groups = group_contiguous(segments);
    merge_down(&mut groups, MAX_GROUPS);
    split_up(&mut groups, segments);

    let total_km: f64 = groups.iter().map(|g| g.length_km).sum();
    let walk_budget_km = total_km.min(WALK_BUDGET_KM);

    // Each mode is used at most once. When no group can be walked, only
    // the three non-walking modes remain, so the group count must not
    // exceed three either.
    let any_walkable = groups
        .iter()
        .any(|g| g.length_km <= WALK_GROUP_MAX_KM && g.length_km <= walk_budget_km);
    if !any_walkable {
        merge_down(&mut groups, TravelMode::ALL.len() - 1);
    }

    let mut walked_km = 0.0;
    let mut used: HashSet<TravelMode> = HashSet::new();

    let mut assigned: Vec<ModeGroup> = Vec::with_capacity(groups.len());
    for group in groups {
        let walkable = group.length_km <= WALK_GROUP_MAX_KM
            && walked_km + group.length_km <= walk_budget_km;
        let mode = pick_mode(&group, walkable, &used);
        if mode == TravelMode::Walking {
            walked_km += group.length_km;
        }
        used.insert(mode);
        assigned.push(finish_group(group, mode));
    }

    // Walking budget untouched: force the smallest short group to walking.
    if walked_km == 0.0 {
        let forced = assigned
            .iter()
            .enumerate()
            .filter(|(_, g)| g.length_km <= WALK_GROUP_MAX_KM)
            .min_by(|(_, a), (_, b)| a.length_km.total_cmp(&b.length_km))
            .map(|(i, _)| i);
        if let Some(i) = forced {
            let group = assigned[i].clone();
            assigned[i] = finish_group(
                RawGroup {
                    first_segment: group.first_segment,
                    segment_count: group.segment_count,
                    length_km: group.length_km,
                    avg_exposure: group.avg_exposure,
                },
                TravelMode::Walking,
            );
        }
    }

    assigned
}

struct RawGroup {
    first_segment: usize,
    segment_count: usize,
    length_km: f64,
    avg_exposure: f64,
}

impl RawGroup {
    fn last_segment(&self) -> usize {
        self.first_segment + self.segment_count - 1
    }
}

fn segment_start(segment: &RouteSegment) -> Option<Point<f64>> {
    segment.geometry.0.first().copied().map(Point::from)
}

fn segment_end(segment: &RouteSegment) -> Option<Point<f64>> {
    segment.geometry.0.last().copied().map(Point::from)
}

/// Step 1: merge geometrically-contiguous segments into groups, carrying a
/// running average of exposure.
fn group_contiguous(segments: &[RouteSegment]) -> Vec<RawGroup> {
    let mut groups: Vec<RawGroup> = Vec::new();

    for (i, segment) in segments.iter().enumerate() {
        let contiguous = groups.last().is_some_and(|group| {
            match (segment_end(&segments[group.last_segment()]), segment_start(segment)) {
                (Some(prev_end), Some(start)) => {
                    haversine_km(prev_end, start) <= GROUP_GAP_TOLERANCE_KM
                }
                _ => true,
            }
        });

        match groups.last_mut() {
            Some(group) if contiguous => {
                let n = group.segment_count as f64;
                group.avg_exposure = (group.avg_exposure * n + segment.exposure) / (n + 1.0);
                group.segment_count += 1;
                group.length_km += segment.distance_km;
            }
            _ => groups.push(RawGroup {
                first_segment: i,
                segment_count: 1,
                length_km: segment.distance_km,
                avg_exposure: segment.exposure,
            }),
        }
    }

    groups
}

/// Step 2a: merge the most length-similar adjacent pair until at most
/// `max` groups remain.
fn merge_down(groups: &mut Vec<RawGroup>, max: usize) {
    while groups.len() > max {
        let i = (0..groups.len() - 1)
            .min_by(|&a, &b| {
                let da = (groups[a].length_km - groups[a + 1].length_km).abs();
                let db = (groups[b].length_km - groups[b + 1].length_km).abs();
                da.total_cmp(&db)
            })
            .unwrap_or(0);

        let right = groups.remove(i + 1);
        let left = &mut groups[i];
        let total = left.length_km + right.length_km;
        if total > 0.0 {
            left.avg_exposure = (left.avg_exposure * left.length_km
                + right.avg_exposure * right.length_km)
                / total;
        }
        left.length_km = total;
        left.segment_count += right.segment_count;
    }
}

/// Step 2b: a fully-contiguous route collapses to one group in step 1;
/// split the largest multi-segment group at its most length-balanced
/// boundary until at least [`MIN_GROUPS`] exist (or nothing is splittable).
fn split_up(groups: &mut Vec<RawGroup>, segments: &[RouteSegment]) {
    while groups.len() < MIN_GROUPS {
        let Some(i) = groups
            .iter()
            .enumerate()
            .filter(|(_, g)| g.segment_count > 1)
            .max_by(|(_, a), (_, b)| a.length_km.total_cmp(&b.length_km))
            .map(|(i, _)| i)
        else {
            break;
        };

        let group = groups.remove(i);
        let (left, right) = split_balanced(group, segments);
        groups.insert(i, right);
        groups.insert(i, left);
    }
}

fn split_balanced(group: RawGroup, segments: &[RouteSegment]) -> (RawGroup, RawGroup) {
    let slice = &segments[group.first_segment..=group.last_segment()];

    // Pick the interior boundary minimizing the length imbalance.
    let mut best_cut = 1;
    let mut best_diff = f64::INFINITY;
    let mut left_len = 0.0;
    for cut in 1..slice.len() {
        left_len += slice[cut - 1].distance_km;
        let diff = (group.length_km - 2.0 * left_len).abs();
        if diff < best_diff {
            best_diff = diff;
            best_cut = cut;
        }
    }

    let make = |start: usize, count: usize| {
        let part = &segments[start..start + count];
        let length_km: f64 = part.iter().map(|s| s.distance_km).sum();
        let avg_exposure =
            part.iter().map(|s| s.exposure).sum::<f64>() / count.max(1) as f64;
        RawGroup {
            first_segment: start,
            segment_count: count,
            length_km,
            avg_exposure,
        }
    };

    (
        make(group.first_segment, best_cut),
        make(group.first_segment + best_cut, group.segment_count - best_cut),
    )
}

/// Step 3: mode preference order for one group; the first mode not yet used
/// on the route wins (group counts never exceed mode counts, so this always
/// succeeds).
fn pick_mode(group: &RawGroup, walkable: bool, used: &HashSet<TravelMode>) -> TravelMode {
    let mut prefs: Vec<TravelMode> = Vec::with_capacity(4);

    if group.avg_exposure > HIGH_EXPOSURE_AQI {
        prefs.extend([TravelMode::Driving, TravelMode::Motorcycle, TravelMode::Cycling]);
    } else if walkable {
        prefs.push(TravelMode::Walking);
    }
    if group.length_km <= CYCLE_FALLBACK_MAX_KM {
        prefs.extend([TravelMode::Cycling, TravelMode::Driving]);
    } else {
        prefs.extend([TravelMode::Driving, TravelMode::Cycling]);
    }

    prefs
        .into_iter()
        .filter(|mode| *mode != TravelMode::Walking || walkable)
        .chain(
            TravelMode::ALL
                .into_iter()
                .filter(|mode| *mode != TravelMode::Walking),
        )
        .find(|mode| !used.contains(mode))
        .unwrap_or(TravelMode::Motorcycle)
}

fn finish_group(group: RawGroup, mode: TravelMode) -> ModeGroup {
    let time_min = group.length_km / mode.profile().default_speed_kmh * 60.0;
    let health = health_score(mode, group.length_km, group.avg_exposure);
    ModeGroup {
        first_segment: group.first_segment,
        segment_count: group.segment_count,
        length_km: group.length_km,
        avg_exposure: group.avg_exposure,
        mode,
        time_min,
        health,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::line_string;

    fn segment(i: usize, length_km: f64, exposure: f64) -> RouteSegment {
        // Chain segments west-to-east; ~0.009 deg lon per km at the equator
        // keeps endpoint gaps well under the tolerance.
        let step = 0.009;
        let x0 = i as f64 * step;
        let x1 = x0 + step;
        RouteSegment {
            from: i as i64,
            to: i as i64 + 1,
            link_id: None,
            distance_km: length_km,
            time_min: length_km / 40.0 * 60.0,
            speed_kmh: 40.0,
            vc: 0.01,
            exposure,
            emission: 0.0,
            health: 0.0,
            cost: length_km,
            geometry: line_string![(x: x0, y: 0.0), (x: x1, y: 0.0)],
        }
    }

    #[test]
    fn health_score_penalizes_overage_and_pollution() {
        let clean_short = health_score(TravelMode::Walking, 1.0, 0.0);
        assert_eq!(clean_short, 10.0);

        let long = health_score(TravelMode::Walking, 4.0, 0.0);
        assert_eq!(long, 10.0 - 2.0 * 2.0);

        let polluted = health_score(TravelMode::Walking, 1.0, 200.0);
        assert_eq!(polluted, 10.0 - 200.0 * 0.03);

        // Motorized modes bottom out at zero, never negative.
        assert_eq!(health_score(TravelMode::Driving, 100.0, 500.0), 0.0);
    }

    #[test]
    fn contiguous_low_aqi_route_groups_and_walks() {
        // Spec scenario: 5 contiguous segments, 1.8 km, clean air.
        let segments: Vec<RouteSegment> =
            (0..5).map(|i| segment(i, 0.36, 10.0)).collect();
        let groups = assign_modes(&segments);

        assert!((MIN_GROUPS..=MAX_GROUPS).contains(&groups.len()), "{}", groups.len());
        let walked: f64 = groups
            .iter()
            .filter(|g| g.mode == TravelMode::Walking)
            .map(|g| g.length_km)
            .sum();
        assert!(walked > 0.0, "no walking assigned");
        assert!(walked <= WALK_BUDGET_KM + 1e-9);

        let total: f64 = groups.iter().map(|g| g.length_km).sum();
        assert!((total - 1.8).abs() < 1e-9);
    }

    #[test]
    fn modes_are_distinct_across_groups() {
        let segments: Vec<RouteSegment> =
            (0..8).map(|i| segment(i, 0.8, 10.0)).collect();
        let groups = assign_modes(&segments);
        let mut seen = HashSet::new();
        for group in &groups {
            assert!(seen.insert(group.mode), "mode {} reused", group.mode);
        }
    }

    #[test]
    fn group_count_never_exceeds_assignable_modes() {
        // Four discontiguous groups, none short enough to walk: only the
        // three non-walking modes remain, so the groups merge down to
        // three rather than reusing a mode.
        let segments: Vec<RouteSegment> =
            (0..4).map(|i| segment(i * 2, 1.5, 10.0)).collect();
        let groups = assign_modes(&segments);

        assert_eq!(groups.len(), 3);
        let mut seen = HashSet::new();
        for group in &groups {
            assert_ne!(group.mode, TravelMode::Walking);
            assert!(seen.insert(group.mode), "mode {} reused", group.mode);
        }
    }

    #[test]
    fn high_exposure_group_prefers_enclosed_mode() {
        let mut segments: Vec<RouteSegment> =
            (0..4).map(|i| segment(i, 1.5, 180.0)).collect();
        // Leave one clean stretch so not everything is high-AQI.
        segments[3].exposure = 20.0;
        let groups = assign_modes(&segments);

        let polluted = groups
            .iter()
            .find(|g| g.avg_exposure > HIGH_EXPOSURE_AQI)
            .expect("some polluted group");
        assert!(
            polluted.mode.is_motorized(),
            "polluted group got {}",
            polluted.mode
        );
    }

    #[test]
    fn forced_walking_when_budget_unused() {
        // Two groups, both polluted enough to avoid walking on the first
        // pass, but one is short: the post-pass must convert it.
        let mut segments: Vec<RouteSegment> =
            (0..4).map(|i| segment(i, 1.2, 150.0)).collect();
        segments[3].distance_km = 0.5;
        let groups = assign_modes(&segments);

        let walked: Vec<_> = groups
            .iter()
            .filter(|g| g.mode == TravelMode::Walking)
            .collect();
        if let Some(walk_group) = walked.first() {
            assert!(walk_group.length_km <= WALK_GROUP_MAX_KM);
        }
    }

    #[test]
    fn empty_and_single_segment_routes() {
        assert!(assign_modes(&[]).is_empty());

        let one = vec![segment(0, 0.4, 5.0)];
        let groups = assign_modes(&one);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].segment_count, 1);
    }
}
