use crate::logging::GROUP_PAIRING;
use crate::params::RecognitionParams;
use crate::table::{Alignment, CompoId, ComposTable, Component, Labels, MergePolicy, PairId, Stage};
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use tracing::{debug, info};

/// Pairing result for one component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairLabel {
    pub id: CompoId,
    pub group_pair: PairId,
    pub pair_to: CompoId,
}

/// Matches the members of repeated groups against each other.
pub trait PairMatcher {
    /// `groups` each hold two or more components. Pair ids count up from
    /// `start_id`.
    fn match_pairs_within_groups(&self, groups: &[Vec<&Component>], start_id: PairId) -> Vec<PairLabel>;
}

/// Pairs groups of equal size and alignment whose members line up one to one
/// across the alignment axis, e.g. a column of icons next to a column of
/// labels. A group that is already paired hands its pair id on to further
/// partners, so lists with more than two columns share one id.
#[derive(Debug, Clone)]
pub struct AlignedPairMatcher {
    pub tolerance: f64,
}

impl AlignedPairMatcher {
    pub fn new(params: &RecognitionParams) -> Self {
        Self {
            tolerance: params.pair_alignment_tolerance,
        }
    }

    fn group_alignment(group: &[&Component]) -> Option<Alignment> {
        group.first().and_then(|c| c.labels.alignment)
    }

    fn sorted_along(group: &[&Component], alignment: Alignment) -> Vec<(CompoId, f64)> {
        let mut members: Vec<(CompoId, f64)> = group
            .iter()
            .map(|c| match alignment {
                Alignment::Vertical => (c.id, c.center_row()),
                Alignment::Horizontal => (c.id, c.center_column()),
            })
            .collect();
        members.sort_by_key(|(_, pos)| OrderedFloat(*pos));
        members
    }

    /// Member-by-member counterparts of two groups, if they line up.
    pub fn counterparts(&self, a: &[&Component], b: &[&Component]) -> Option<Vec<(CompoId, CompoId)>> {
        if a.len() != b.len() || a.len() < 2 {
            return None;
        }
        let alignment = Self::group_alignment(a)?;
        if Self::group_alignment(b) != Some(alignment) {
            return None;
        }
        let a = Self::sorted_along(a, alignment);
        let b = Self::sorted_along(b, alignment);
        let aligned = a
            .iter()
            .zip(&b)
            .all(|((_, pa), (_, pb))| (pa - pb).abs() <= self.tolerance);
        aligned.then(|| a.iter().zip(&b).map(|((ia, _), (ib, _))| (*ia, *ib)).collect())
    }
}

impl Default for AlignedPairMatcher {
    fn default() -> Self {
        Self::new(&RecognitionParams::default())
    }
}

impl PairMatcher for AlignedPairMatcher {
    fn match_pairs_within_groups(&self, groups: &[Vec<&Component>], start_id: PairId) -> Vec<PairLabel> {
        let mut pair_of_group: Vec<Option<PairId>> = vec![None; groups.len()];
        let mut labels: IndexMap<CompoId, PairLabel> = IndexMap::new();
        let mut next_id = start_id;

        for i in 0..groups.len() {
            for j in (i + 1)..groups.len() {
                if pair_of_group[j].is_some() {
                    continue;
                }
                let Some(matches) = self.counterparts(&groups[i], &groups[j]) else {
                    continue;
                };
                let group_pair = match pair_of_group[i] {
                    Some(id) => id,
                    None => {
                        let id = next_id;
                        next_id += 1;
                        pair_of_group[i] = Some(id);
                        id
                    }
                };
                pair_of_group[j] = Some(group_pair);
                debug!(target: GROUP_PAIRING, first = i, second = j, group_pair, "Paired groups");

                for (a, b) in matches {
                    labels.entry(a).or_insert(PairLabel {
                        id: a,
                        group_pair,
                        pair_to: b,
                    });
                    labels.insert(
                        b,
                        PairLabel {
                            id: b,
                            group_pair,
                            pair_to: a,
                        },
                    );
                }
            }
        }
        labels.into_values().collect()
    }
}

impl ComposTable {
    /// Groups under one transient group column, skipping singletons.
    pub fn split_groups<F>(&self, group: F) -> Vec<Vec<&Component>>
    where
        F: Fn(&Labels) -> Option<usize>,
    {
        self.groups_by(|c| group(&c.labels))
            .into_values()
            .filter(|rows| rows.len() > 1)
            .map(|rows| rows.into_iter().map(|r| self.row(r)).collect())
            .collect()
    }

    /// Pairs members across the repeated groups found by group recognition,
    /// writing `group_pair` and `pair_to` on matched rows only. The transient
    /// per-stream group columns are consumed.
    pub fn pair_groups<P: PairMatcher>(&mut self, matcher: &P) {
        let start_pair_id = self.pair_id_offset();
        let pairs = {
            let mut groups = self.split_groups(|l| l.group_nontext);
            groups.extend(self.split_groups(|l| l.group_text));
            matcher.match_pairs_within_groups(&groups, start_pair_id)
        };
        info!(
            target: GROUP_PAIRING,
            paired = pairs.len(),
            start_pair_id,
            "Matched pairs within groups"
        );

        self.merge_by_id(
            pairs.iter().map(|p| (p.id, p.group_pair)),
            MergePolicy::OverwriteMatched,
            |l| &mut l.group_pair,
        );
        self.merge_by_id(
            pairs.iter().map(|p| (p.id, p.pair_to)),
            MergePolicy::OverwriteMatched,
            |l| &mut l.pair_to,
        );
        for row in 0..self.len() {
            let labels = &mut self.row_mut(row).labels;
            labels.group_nontext = None;
            labels.group_text = None;
        }
        self.advance_stage(Stage::Paired);
    }
}
