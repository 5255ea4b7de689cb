use std::collections::{BTreeMap, HashMap};

use geo::Centroid;
use log::debug;

use crate::{
    data::{CountryFeature, Row, VoteRecord, YearFilter},
    flow::FlowLink,
    projection::Projection,
};

/// Summed points per country for one year filter.
pub type AggregateByCountry = BTreeMap<String, f64>;

/// Groups the rows matching `year` by country and sums their points.
///
/// A country appears iff it has at least one matching row; points that are
/// missing or not finite add nothing.
pub fn summarize(rows: &[Row], year: YearFilter) -> AggregateByCountry {
    let mut sums = AggregateByCountry::new();
    for row in rows.iter().filter(|r| year.matches(r.year)) {
        *sums.entry(row.country.clone()).or_insert(0.0) += row.points().unwrap_or(0.0);
    }
    sums
}

/// Centroid of every curated country, already projected.
pub type CentroidIndex = HashMap<String, (f64, f64)>;

pub fn projected_centroids(features: &[CountryFeature], projection: &Projection) -> CentroidIndex {
    features
        .iter()
        .filter_map(|f| {
            let c = f.shape.centroid()?;
            Some((f.name.clone(), projection.project(c.x(), c.y())))
        })
        .collect()
}

/// Non-zero votes given by `giver` under `year`, in input order, as flows
/// between country centroids. Votes touching an unknown country are dropped.
pub fn flows_from(
    votes: &[VoteRecord],
    centroids: &CentroidIndex,
    giver: &str,
    year: YearFilter,
) -> Vec<FlowLink> {
    let Some(&origin) = centroids.get(giver) else {
        return Vec::new();
    };
    let mut unresolved = 0usize;
    let links: Vec<FlowLink> = votes
        .iter()
        .filter(|v| v.giver == giver && year.matches(v.year))
        .filter_map(|v| {
            let magnitude = v.awarded()?;
            let Some(&destination) = centroids.get(&v.country) else {
                unresolved += 1;
                return None;
            };
            Some(FlowLink {
                giver: v.giver.clone(),
                receiver: v.country.clone(),
                year: v.year,
                magnitude,
                origin,
                destination,
            })
        })
        .collect();
    if unresolved > 0 {
        debug!("{giver}: {unresolved} votes go to countries not on the map");
    }
    links
}

/// All-years record of a country.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CountryStats {
    pub wins: usize,
    pub top5: usize,
    pub avg_rank: Option<f64>,
    pub sum_points: f64,
    pub entries: usize,
}

pub fn country_stats(rows: &[Row]) -> HashMap<String, CountryStats> {
    let mut places: HashMap<&str, Vec<u32>> = HashMap::new();
    let mut stats: HashMap<String, CountryStats> = HashMap::new();
    for row in rows {
        let s = stats.entry(row.country.clone()).or_default();
        s.entries += 1;
        s.sum_points += row.points().unwrap_or(0.0);
        if let Some(place) = row.rank() {
            if place == 1 {
                s.wins += 1;
            }
            if place <= 5 {
                s.top5 += 1;
            }
            places.entry(&row.country).or_default().push(place);
        }
    }
    for (country, ranks) in places {
        if let Some(s) = stats.get_mut(country) {
            s.avg_rank = Some(ranks.iter().map(|&p| p as f64).sum::<f64>() / ranks.len() as f64);
        }
    }
    stats
}

/// The entry a country sent in one year.
pub fn entry_for<'a>(rows: &'a [Row], country: &str, year: i32) -> Option<&'a Row> {
    rows.iter().find(|r| r.country == country && r.year == year)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rows() -> Vec<Row> {
        vec![
            Row::new(1998, "Israel", 1.0).with_place(1),
            Row::new(1998, "Malta", 0.9).with_place(3),
            Row::new(1999, "Israel", 0.2).with_place(14),
            Row::new(1999, "Sweden", 1.0).with_place(1),
            Row { normalized_points: Some(f64::NAN), ..Row::new(1999, "Malta", 0.0) },
        ]
    }

    fn centroids() -> CentroidIndex {
        [("A", (0.0, 0.0)), ("B", (10.0, 0.0)), ("C", (0.0, 10.0))]
            .into_iter()
            .map(|(n, p)| (n.to_string(), p))
            .collect()
    }

    #[test]
    fn all_years_sums_every_row() {
        let sums = summarize(&rows(), YearFilter::All);
        assert_relative_eq!(sums["Israel"], 1.2);
        assert_relative_eq!(sums["Malta"], 0.9);
        assert_eq!(sums.len(), 3);
    }

    #[test]
    fn single_year_omits_absent_countries() {
        let sums = summarize(&rows(), YearFilter::Year(1998));
        assert!(!sums.contains_key("Sweden"));
        assert_eq!(sums.len(), 2);
    }

    #[test]
    fn malformed_points_count_as_nothing() {
        let sums = summarize(&rows(), YearFilter::Year(1999));
        assert_eq!(sums["Malta"], 0.0);
        assert!(sums.values().all(|v| v.is_finite() && *v >= 0.0));
    }

    #[test]
    fn year_sums_never_exceed_all_year_sums() {
        let data = rows();
        let all = summarize(&data, YearFilter::All);
        for year in [1998, 1999, 2000] {
            for (country, sum) in summarize(&data, YearFilter::Year(year)) {
                assert!(sum <= all[&country]);
            }
        }
    }

    #[test]
    fn empty_rows_give_empty_aggregate() {
        assert!(summarize(&[], YearFilter::All).is_empty());
    }

    #[test]
    fn flows_skip_zero_scores_and_other_givers() {
        let votes = vec![
            VoteRecord::new(2000, "A", "B", 12.0),
            VoteRecord::new(2000, "A", "C", 0.0),
            VoteRecord::new(2000, "B", "A", 8.0),
            VoteRecord::new(2001, "A", "C", 5.0),
        ];
        let flows = flows_from(&votes, &centroids(), "A", YearFilter::All);
        assert_eq!(flows.len(), 2);
        assert!(flows.iter().all(|f| f.giver == "A" && f.magnitude != 0.0));
        assert_eq!(flows[0].receiver, "B");
        assert_eq!(flows[0].destination, (10.0, 0.0));

        let flows = flows_from(&votes, &centroids(), "A", YearFilter::Year(2001));
        assert_eq!(flows.len(), 1);
        assert!(flows.iter().all(|f| f.year == 2001));
    }

    #[test]
    fn unresolvable_endpoints_are_dropped() {
        let votes = vec![
            VoteRecord::new(2000, "A", "Atlantis", 12.0),
            VoteRecord::new(2000, "A", "B", 1.0),
            VoteRecord::new(2000, "Nowhere", "B", 1.0),
        ];
        assert_eq!(flows_from(&votes, &centroids(), "A", YearFilter::All).len(), 1);
        assert!(flows_from(&votes, &centroids(), "Nowhere", YearFilter::All).is_empty());
    }

    #[test]
    fn stats_count_wins_and_top5() {
        let stats = country_stats(&rows());
        let israel = &stats["Israel"];
        assert_eq!(israel.wins, 1);
        assert_eq!(israel.top5, 1);
        assert_relative_eq!(israel.avg_rank.unwrap(), 7.5);
        assert_eq!(stats["Malta"].entries, 2);
        assert_eq!(stats["Malta"].avg_rank, Some(3.0));
    }

    #[test]
    fn place_zero_is_not_a_rank() {
        let stats = country_stats(&[
            Row::new(2000, "Latvia", 0.1).with_place(0),
            Row::new(2002, "Latvia", 1.0).with_place(1),
        ]);
        let latvia = &stats["Latvia"];
        assert_eq!(latvia.top5, 1);
        assert_eq!(latvia.wins, 1);
        assert_eq!(latvia.avg_rank, Some(1.0));
        assert_eq!(latvia.entries, 2);
    }

    #[test]
    fn entry_lookup_by_year() {
        let data = rows();
        assert_eq!(entry_for(&data, "Sweden", 1999).and_then(|r| r.place), Some(1));
        assert!(entry_for(&data, "Sweden", 1998).is_none());
    }
}
