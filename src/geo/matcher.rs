//! Ordering, selection and search over officer lists.
//!
//! All functions are pure and keep input order for equal keys.

use std::cmp::Ordering;

use serde::Serialize;

use super::distance::haversine_km;
use super::{Officer, Position};

/// An officer with its distance from the origin, when the origin is known.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedOfficer {
    pub officer: Officer,
    pub distance_km: Option<f64>,
}

/// Ascending by distance from `origin`; by username when the origin is
/// unavailable. Stable for equal keys.
pub fn sort_by_proximity(officers: &[Officer], origin: Option<Position>) -> Vec<Officer> {
    rank_all(officers, origin)
        .into_iter()
        .map(|ranked| ranked.officer)
        .collect()
}

/// Minimum-distance officer. `None` if the list is empty or the origin is
/// unknown. The first officer wins an exact tie.
pub fn nearest(officers: &[Officer], origin: Option<Position>) -> Option<RankedOfficer> {
    let origin = origin?;
    let mut best: Option<RankedOfficer> = None;
    for officer in officers {
        let d = haversine_km(origin, officer.position());
        let closer = match &best {
            Some(current) => current.distance_km.is_some_and(|best_d| d < best_d),
            None => true,
        };
        if closer {
            best = Some(RankedOfficer {
                officer: officer.clone(),
                distance_km: Some(d),
            });
        }
    }
    best
}

/// Case-insensitive substring match on username or email. Blank text keeps
/// every officer.
pub fn filter_by_query(officers: &[Officer], text: &str) -> Vec<Officer> {
    let query = text.trim().to_lowercase();
    if query.is_empty() {
        return officers.to_vec();
    }
    officers
        .iter()
        .filter(|o| {
            o.username.to_lowercase().contains(&query) || o.email.to_lowercase().contains(&query)
        })
        .cloned()
        .collect()
}

/// Filter by `query`, then order by proximity, keeping each distance.
pub fn rank(officers: &[Officer], origin: Option<Position>, query: &str) -> Vec<RankedOfficer> {
    rank_all(&filter_by_query(officers, query), origin)
}

/// Case-insensitive exact username lookup.
pub fn find_by_username<'a>(officers: &'a [Officer], username: &str) -> Option<&'a Officer> {
    let wanted = username.to_lowercase();
    officers.iter().find(|o| o.username.to_lowercase() == wanted)
}

fn rank_all(officers: &[Officer], origin: Option<Position>) -> Vec<RankedOfficer> {
    let mut ranked: Vec<RankedOfficer> = officers
        .iter()
        .map(|o| RankedOfficer {
            officer: o.clone(),
            distance_km: origin.map(|origin| haversine_km(origin, o.position())),
        })
        .collect();

    match origin {
        Some(_) => ranked.sort_by(|a, b| by_distance(a.distance_km, b.distance_km)),
        None => ranked.sort_by(|a, b| a.officer.username.cmp(&b.officer.username)),
    }
    ranked
}

fn by_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    a.unwrap_or(f64::INFINITY).total_cmp(&b.unwrap_or(f64::INFINITY))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn officer(id: i64, username: &str, lat: f64, lon: f64) -> Officer {
        Officer {
            id,
            username: username.into(),
            email: format!("{username}@agri.gov.bd"),
            latitude: lat,
            longitude: lon,
        }
    }

    fn origin() -> Option<Position> {
        Some(Position::new(23.80, 90.40))
    }

    #[test]
    fn nearest_picks_shorter_distance() {
        let officers = vec![officer(1, "rahim", 23.81, 90.41), officer(2, "karim", 23.70, 90.35)];
        assert_eq!(nearest(&officers, origin()).unwrap().officer.id, 1);
    }

    #[test]
    fn swapping_coordinates_swaps_nearest() {
        let officers = vec![officer(1, "rahim", 23.70, 90.35), officer(2, "karim", 23.81, 90.41)];
        assert_eq!(nearest(&officers, origin()).unwrap().officer.id, 2);
    }

    #[test]
    fn nearest_absent_without_origin_or_officers() {
        let officers = vec![officer(1, "rahim", 23.81, 90.41)];
        assert!(nearest(&officers, None).is_none());
        assert!(nearest(&[], origin()).is_none());
    }

    #[test]
    fn nearest_tie_goes_to_first_occurrence() {
        let officers = vec![officer(7, "first", 23.81, 90.41), officer(3, "second", 23.81, 90.41)];
        assert_eq!(nearest(&officers, origin()).unwrap().officer.id, 7);
    }

    #[test]
    fn sort_is_non_decreasing_and_starts_with_nearest() {
        let officers = vec![
            officer(1, "a", 24.90, 91.87),
            officer(2, "b", 23.81, 90.41),
            officer(3, "c", 22.35, 91.78),
            officer(4, "d", 23.70, 90.35),
        ];
        let sorted = sort_by_proximity(&officers, origin());
        let o = origin().unwrap();
        let distances: Vec<f64> = sorted.iter().map(|s| haversine_km(o, s.position())).collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(sorted[0], nearest(&officers, origin()).unwrap().officer);
    }

    #[test]
    fn antipodal_officer_never_beats_a_close_one() {
        let here = Some(Position::new(-89.33, 10.0));
        let officers = vec![officer(1, "far", 89.33, -170.0), officer(2, "near", -89.33, 10.1)];

        let best = nearest(&officers, here).unwrap();
        assert_eq!(best.officer.id, 2);
        assert!(best.distance_km.is_some_and(f64::is_finite));
        assert_eq!(sort_by_proximity(&officers, here)[0], best.officer);
    }

    #[test]
    fn sort_without_origin_is_by_username() {
        let officers = vec![
            officer(1, "zaman", 23.0, 90.0),
            officer(2, "alam", 24.0, 91.0),
            officer(3, "hasan", 22.0, 89.0),
        ];
        let names: Vec<String> = sort_by_proximity(&officers, None)
            .into_iter()
            .map(|o| o.username)
            .collect();
        assert_eq!(names, vec!["alam", "hasan", "zaman"]);
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let officers = vec![
            officer(1, "same", 23.81, 90.41),
            officer(2, "same", 23.81, 90.41),
            officer(3, "same", 23.81, 90.41),
        ];
        let by_distance: Vec<i64> = sort_by_proximity(&officers, origin()).iter().map(|o| o.id).collect();
        let by_name: Vec<i64> = sort_by_proximity(&officers, None).iter().map(|o| o.id).collect();
        assert_eq!(by_distance, vec![1, 2, 3]);
        assert_eq!(by_name, vec![1, 2, 3]);
    }

    #[test]
    fn filter_matches_username_or_email_case_insensitively() {
        let mut officers = vec![officer(1, "Rahim", 23.0, 90.0), officer(2, "karim", 23.0, 90.0)];
        officers[1].email = "district.office@AGRI.gov.bd".into();
        assert_eq!(filter_by_query(&officers, "RAH").len(), 1);
        let by_email = filter_by_query(&officers, "district");
        assert_eq!(by_email.len(), 1);
        assert_eq!(by_email[0].id, 2);
    }

    #[test]
    fn empty_query_is_noop() {
        let officers = vec![officer(1, "rahim", 23.0, 90.0), officer(2, "karim", 23.0, 90.0)];
        assert_eq!(filter_by_query(&officers, ""), officers);
        assert_eq!(filter_by_query(&officers, "   "), officers);
    }

    #[test]
    fn rank_filters_then_sorts_with_distances() {
        let officers = vec![
            officer(1, "north_a", 24.90, 91.87),
            officer(2, "south_b", 22.35, 91.78),
            officer(3, "north_c", 23.81, 90.41),
        ];
        let ranked = rank(&officers, origin(), "north");
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].officer.id, 3);
        assert!(ranked.iter().all(|r| r.distance_km.is_some()));

        let unranked = rank(&officers, None, "");
        assert!(unranked.iter().all(|r| r.distance_km.is_none()));
    }

    #[test]
    fn find_by_username_ignores_case() {
        let officers = vec![officer(1, "Rahim", 23.0, 90.0)];
        assert_eq!(find_by_username(&officers, "rahim").map(|o| o.id), Some(1));
        assert!(find_by_username(&officers, "karim").is_none());
    }
}
