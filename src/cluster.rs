use crate::logging::GROUP_REPETITION;
use crate::table::{Alignment, Attr, ComposTable, GroupId};
use ordered_float::OrderedFloat;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, warn};

// Features are embedded in 3-D; unused axes stay at zero.
const MAX_FEATURES: usize = 3;

type FeaturePoint = GeomWithData<[f64; MAX_FEATURES], usize>;

/// Density-based clustering. A point is a core point when at least
/// `min_samples` points (itself included) lie within `eps`; clusters grow
/// from core points in input order. Noise points get `None`.
pub fn dbscan(points: &[Vec<f64>], eps: f64, min_samples: usize) -> Vec<Option<usize>> {
    let embedded: Vec<[f64; MAX_FEATURES]> = points
        .iter()
        .map(|p| {
            let mut coords = [0.0; MAX_FEATURES];
            for (slot, value) in coords.iter_mut().zip(p.iter()) {
                *slot = *value;
            }
            coords
        })
        .collect();
    let tree = RTree::bulk_load(
        embedded
            .iter()
            .enumerate()
            .map(|(i, p)| FeaturePoint::new(*p, i))
            .collect(),
    );
    let eps_2 = eps * eps;
    let neighbours = |i: usize| -> Vec<usize> {
        tree.locate_within_distance(embedded[i], eps_2)
            .map(|p| p.data)
            .collect()
    };

    let mut labels: Vec<Option<usize>> = vec![None; points.len()];
    let mut visited = vec![false; points.len()];
    let mut cluster = 0;

    for start in 0..points.len() {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        let seeds = neighbours(start);
        if seeds.len() < min_samples {
            continue;
        }

        labels[start] = Some(cluster);
        let mut queue: VecDeque<usize> = seeds.into_iter().collect();
        while let Some(q) = queue.pop_front() {
            if labels[q].is_none() {
                labels[q] = Some(cluster);
            }
            if visited[q] {
                continue;
            }
            visited[q] = true;
            let reach = neighbours(q);
            if reach.len() >= min_samples {
                queue.extend(reach);
            }
        }
        cluster += 1;
    }
    labels
}

/// Which of two candidate groups a component sits closer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Closer {
    First,
    Second,
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

impl ComposTable {
    /// Clusters rows on one attribute into column `cluster_<attr>`.
    pub fn cluster_dbscan_by_attr(&mut self, attr: Attr, eps: f64, min_samples: usize) -> String {
        self.cluster_dbscan_by_attrs(&[attr], eps, min_samples)
    }

    /// Clusters rows on up to three attributes jointly into column
    /// `cluster_<a>_<b>...`. Attributes past the third are ignored.
    pub fn cluster_dbscan_by_attrs(&mut self, attrs: &[Attr], eps: f64, min_samples: usize) -> String {
        if attrs.len() > MAX_FEATURES {
            let ignored: Vec<&str> = attrs[MAX_FEATURES..].iter().map(Attr::name).collect();
            warn!(target: GROUP_REPETITION, ?ignored, "Clustering on the first three attributes only");
        }
        let attrs = &attrs[..attrs.len().min(MAX_FEATURES)];
        let points: Vec<Vec<f64>> = self
            .iter()
            .map(|c| attrs.iter().map(|a| c.attr(*a)).collect())
            .collect();
        let labels = dbscan(&points, eps, min_samples);
        let names: Vec<&str> = attrs.iter().map(Attr::name).collect();
        let tag = format!("cluster_{}", names.join("_"));
        debug!(
            target: GROUP_REPETITION,
            column = %tag,
            clusters = labels.iter().flatten().max().map_or(0, |m| m + 1),
            "Clustered components"
        );
        self.set_cluster_column(tag.clone(), labels);
        tag
    }

    fn max_cluster_group(&self) -> Option<usize> {
        self.iter()
            .filter_map(|c| match c.labels.group {
                Some(GroupId::Cluster(n)) => Some(n),
                _ => None,
            })
            .max()
    }

    fn cluster_groups(&self, cluster: &str) -> Vec<Vec<usize>> {
        let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        if let Some(labels) = self.cluster_column(cluster) {
            for (row, label) in labels.iter().enumerate() {
                if let Some(label) = label {
                    groups.entry(*label).or_default().push(row);
                }
            }
        }
        groups.into_values().collect()
    }

    /// Turns every cluster with more than one member into a group. With
    /// `new_groups` all previous groups are discarded first.
    pub fn group_by_clusters(&mut self, cluster: &str, alignment: Alignment, new_groups: bool) {
        let mut group_id = if new_groups {
            for row in 0..self.len() {
                self.row_mut(row).labels.group = None;
            }
            0
        } else {
            self.max_cluster_group().map_or(0, |m| m + 1)
        };

        for rows in self.cluster_groups(cluster) {
            if rows.len() > 1 {
                for row in rows {
                    let labels = &mut self.row_mut(row).labels;
                    labels.group = Some(GroupId::Cluster(group_id));
                    labels.alignment = Some(alignment);
                }
                group_id += 1;
            }
        }
    }

    /// Compares a row's area with the mean areas of two candidate groups,
    /// leaving the row itself out of both.
    pub fn closer_group_by_mean_area(&self, row: usize, group1: &[usize], group2: &[usize]) -> Closer {
        let compo = self.row(row);
        let mean_area = |group: &[usize]| {
            mean(
                group
                    .iter()
                    .map(|&r| self.row(r))
                    .filter(|c| c.id != compo.id)
                    .map(|c| c.area() as f64),
            )
        };
        let area = compo.area() as f64;
        if (area - mean_area(group1)).abs() < (area - mean_area(group2)).abs() {
            Closer::First
        } else {
            Closer::Second
        }
    }

    /// Compares a row's mean squared center distance to the other members of
    /// its clusters in two cluster columns. A cluster with only one other
    /// member loses outright.
    pub fn closer_cluster_by_mean_distance(&self, row: usize, cluster1: &str, cluster2: &str) -> Closer {
        let (Some(labels1), Some(labels2)) = (self.cluster_column(cluster1), self.cluster_column(cluster2))
        else {
            return Closer::First;
        };
        let compo = self.row(row);
        let members = |labels: &[Option<usize>]| -> Vec<usize> {
            (0..self.len())
                .filter(|&r| r != row && labels[r].is_some() && labels[r] == labels[row])
                .collect()
        };
        let cl1 = members(labels1);
        let cl2 = members(labels2);
        if cl2.len() == 1 {
            return Closer::First;
        } else if cl1.len() == 1 {
            return Closer::Second;
        }

        let mean_distance = |rows: &[usize]| {
            mean(rows.iter().map(|&r| {
                let other = self.row(r);
                (other.center_row() - compo.center_row()).powi(2)
                    + (other.center_column() - compo.center_column()).powi(2)
            }))
        };
        if mean_distance(&cl1) < mean_distance(&cl2) {
            Closer::First
        } else {
            Closer::Second
        }
    }

    /// Like [`group_by_clusters`](Self::group_by_clusters) but keeps existing
    /// groups. A row already grouped moves to the new cluster only when its
    /// area is closer to the new cluster's mean area.
    pub fn group_by_clusters_conflict(&mut self, cluster: &str, alignment: Alignment) {
        let mut group_id = self.max_cluster_group().map_or(0, |m| m + 1);

        for rows in self.cluster_groups(cluster) {
            if rows.len() <= 1 {
                continue;
            }
            let mut member_num = rows.len();
            for &row in &rows {
                let current = self.row(row).labels.group;
                match current {
                    None => {
                        let labels = &mut self.row_mut(row).labels;
                        labels.group = Some(GroupId::Cluster(group_id));
                        labels.alignment = Some(alignment);
                    }
                    Some(prev) => {
                        // a lone member stays where it was
                        if member_num <= 1 {
                            continue;
                        }
                        let prev_group: Vec<usize> = (0..self.len())
                            .filter(|&r| self.row(r).labels.group == Some(prev))
                            .collect();
                        if self.closer_group_by_mean_area(row, &rows, &prev_group) == Closer::First {
                            let labels = &mut self.row_mut(row).labels;
                            labels.group = Some(GroupId::Cluster(group_id));
                            labels.alignment = Some(alignment);
                        } else {
                            member_num -= 1;
                        }
                    }
                }
            }
            group_id += 1;
        }
    }

    /// Drops two-member groups whose larger area exceeds `max_ratio` times
    /// the smaller one.
    pub fn check_group_of_two_compos_validity_by_areas(&mut self, max_ratio: f64) {
        let groups = self.groups_by(|c| c.labels.group);
        for (group, rows) in groups {
            if rows.len() != 2 {
                continue;
            }
            let areas: Vec<i64> = rows.iter().map(|&r| self.row(r).area()).collect();
            let (min, max) = (areas[0].min(areas[1]), areas[0].max(areas[1]));
            if max as f64 > min as f64 * max_ratio {
                debug!(target: GROUP_REPETITION, group = %group, min, max, "Invalidating group of two");
                for row in rows {
                    self.row_mut(row).labels.group = None;
                }
            }
        }
    }

    /// Signed spacing from each group member to the next one along the
    /// group's alignment axis. The last member has no gap.
    pub fn calc_gap_in_group(&mut self) {
        for row in 0..self.len() {
            self.row_mut(row).labels.gap = None;
        }
        let groups = self.groups_by(|c| c.labels.group);
        for (_, mut rows) in groups {
            if rows.len() < 2 {
                continue;
            }
            let alignment = self.row(rows[0]).labels.alignment;
            let vertical = alignment == Some(Alignment::Vertical);
            rows.sort_by_key(|&r| {
                let c = self.row(r);
                if vertical {
                    (OrderedFloat(c.center_column()), OrderedFloat(c.center_row()))
                } else {
                    (OrderedFloat(c.center_row()), OrderedFloat(c.center_column()))
                }
            });
            for pair in rows.windows(2) {
                let (cur, next) = (self.row(pair[0]).bbox, self.row(pair[1]).bbox);
                let gap = if vertical {
                    next.row_min - cur.row_max
                } else {
                    next.column_min - cur.column_max
                };
                self.row_mut(pair[0]).labels.gap = Some(gap);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dbscan_splits_on_eps() {
        let points: Vec<Vec<f64>> = [0.0, 4.0, 8.0, 30.0, 33.0, 100.0]
            .iter()
            .map(|v| vec![*v])
            .collect();
        let labels = dbscan(&points, 5.0, 1);
        assert_eq!(
            labels,
            vec![Some(0), Some(0), Some(0), Some(1), Some(1), Some(2)]
        );
    }

    #[test]
    fn dbscan_marks_sparse_points_as_noise() {
        let points = vec![vec![0.0, 0.0], vec![1.0, 1.0], vec![2.0, 0.0], vec![50.0, 50.0]];
        let labels = dbscan(&points, 2.5, 2);
        assert_eq!(labels, vec![Some(0), Some(0), Some(0), None]);
    }

    #[test]
    fn dbscan_on_empty_input() {
        assert!(dbscan(&[], 1.0, 1).is_empty());
    }
}
