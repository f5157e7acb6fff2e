use crate::error::Result;
use crate::logging::{BLOCK_REPETITION, GROUP_REPETITION};
use crate::params::RecognitionParams;
use crate::table::{
    Alignment, Attr, CompoId, ComposTable, Component, GroupId, MergePolicy, PairId, Stage,
};
use indexmap::IndexMap;
use tracing::{debug, info};

/// Computes a comparable signature for a block's children and matches
/// blocks whose signatures repeat.
pub trait ConnectionMatcher {
    type Signature;

    /// `children` are sorted by vertical center.
    fn compute_connections(&self, children: &[&Component]) -> Self::Signature;

    /// Assigns a shared pair id, counting up from `start_id`, to each set of
    /// repeated blocks. Unmatched blocks are left out.
    fn match_repeated_blocks(
        &self,
        blocks: &[(CompoId, Self::Signature)],
        start_id: PairId,
    ) -> IndexMap<CompoId, PairId>;
}

/// Cluster label produced for one component by a [`GroupClusterer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterLabel {
    pub id: CompoId,
    pub group: usize,
    pub alignment: Option<Alignment>,
}

/// Finds repeated rows and columns among free-standing components.
pub trait GroupClusterer {
    fn cluster_nontext(&self, table: &ComposTable, only_unparented: bool) -> Vec<ClusterLabel>;
    fn cluster_text(&self, table: &ComposTable, only_unparented: bool) -> Vec<ClusterLabel>;
}

/// Geometric relation between two consecutive children of a block.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub from_class: String,
    pub to_class: String,
    pub column_offset: f64,
    pub row_offset: f64,
    pub width_ratio: f64,
    pub height_ratio: f64,
}

impl Connection {
    fn between(from: &Component, to: &Component) -> Self {
        let ratio = |a: i32, b: i32| if a == 0 { 0.0 } else { f64::from(b) / f64::from(a) };
        Self {
            from_class: from.class.clone(),
            to_class: to.class.clone(),
            column_offset: to.center_column() - from.center_column(),
            row_offset: to.center_row() - from.center_row(),
            width_ratio: ratio(from.width, to.width),
            height_ratio: ratio(from.height, to.height),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConnectionSignature {
    pub classes: Vec<String>,
    pub connections: Vec<Connection>,
}

/// Matches blocks whose consecutive children sit at the same offsets with
/// the same classes and similar relative sizes.
#[derive(Debug, Clone)]
pub struct ChildConnectionMatcher {
    pub offset_tolerance: f64,
    pub ratio_tolerance: f64,
}

impl ChildConnectionMatcher {
    pub fn new(params: &RecognitionParams) -> Self {
        Self {
            offset_tolerance: params.connection_offset_tolerance,
            ratio_tolerance: params.connection_ratio_tolerance,
        }
    }

    fn ratios_close(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.ratio_tolerance * a.abs().max(b.abs()).max(f64::EPSILON)
    }

    pub fn equivalent(&self, a: &ConnectionSignature, b: &ConnectionSignature) -> bool {
        if a.classes.len() < 2 || a.classes != b.classes {
            return false;
        }
        a.connections.iter().zip(&b.connections).all(|(x, y)| {
            x.from_class == y.from_class
                && x.to_class == y.to_class
                && (x.column_offset - y.column_offset).abs() <= self.offset_tolerance
                && (x.row_offset - y.row_offset).abs() <= self.offset_tolerance
                && self.ratios_close(x.width_ratio, y.width_ratio)
                && self.ratios_close(x.height_ratio, y.height_ratio)
        })
    }
}

impl Default for ChildConnectionMatcher {
    fn default() -> Self {
        Self::new(&RecognitionParams::default())
    }
}

impl ConnectionMatcher for ChildConnectionMatcher {
    type Signature = ConnectionSignature;

    fn compute_connections(&self, children: &[&Component]) -> ConnectionSignature {
        ConnectionSignature {
            classes: children.iter().map(|c| c.class.clone()).collect(),
            connections: children
                .windows(2)
                .map(|pair| Connection::between(pair[0], pair[1]))
                .collect(),
        }
    }

    fn match_repeated_blocks(
        &self,
        blocks: &[(CompoId, ConnectionSignature)],
        start_id: PairId,
    ) -> IndexMap<CompoId, PairId> {
        // each pattern is represented by its first block
        let mut patterns: Vec<Vec<usize>> = Vec::new();
        for (i, (_, signature)) in blocks.iter().enumerate() {
            match patterns
                .iter_mut()
                .find(|members| self.equivalent(&blocks[members[0]].1, signature))
            {
                Some(members) => members.push(i),
                None => patterns.push(vec![i]),
            }
        }

        let mut paired = IndexMap::new();
        let mut pair_id = start_id;
        for members in patterns.iter().filter(|m| m.len() > 1) {
            for &i in members {
                paired.insert(blocks[i].0, pair_id);
            }
            pair_id += 1;
        }
        paired
    }
}

/// Default clusterer: DBSCAN on one coordinate per axis, column clusters
/// first, row clusters resolved against them by area.
#[derive(Debug, Clone)]
pub struct DbscanGroupClusterer {
    pub nontext_eps: f64,
    pub text_eps: f64,
    pub min_samples: usize,
    pub max_area_ratio: f64,
}

impl DbscanGroupClusterer {
    pub fn new(params: &RecognitionParams) -> Self {
        Self {
            nontext_eps: params.nontext_eps,
            text_eps: params.text_eps,
            min_samples: params.min_samples,
            max_area_ratio: params.max_area_ratio,
        }
    }

    fn cluster_stream(
        &self,
        mut compos: ComposTable,
        column_attr: Attr,
        row_attr: Attr,
        eps: f64,
    ) -> Vec<ClusterLabel> {
        if compos.len() < 2 {
            return Vec::new();
        }
        let by_column = compos.cluster_dbscan_by_attr(column_attr, eps, self.min_samples);
        let by_row = compos.cluster_dbscan_by_attr(row_attr, eps, self.min_samples);
        compos.group_by_clusters(&by_column, Alignment::Vertical, true);
        compos.group_by_clusters_conflict(&by_row, Alignment::Horizontal);
        compos.check_group_of_two_compos_validity_by_areas(self.max_area_ratio);

        compos
            .iter()
            .filter_map(|c| match c.labels.group {
                Some(GroupId::Cluster(group)) => Some(ClusterLabel {
                    id: c.id,
                    group,
                    alignment: c.labels.alignment,
                }),
                _ => None,
            })
            .collect()
    }
}

impl Default for DbscanGroupClusterer {
    fn default() -> Self {
        Self::new(&RecognitionParams::default())
    }
}

impl GroupClusterer for DbscanGroupClusterer {
    fn cluster_nontext(&self, table: &ComposTable, only_unparented: bool) -> Vec<ClusterLabel> {
        let compos = table.select_where(|c| !c.is_text() && (!only_unparented || c.parent.is_none()));
        self.cluster_stream(compos, Attr::CenterColumn, Attr::CenterRow, self.nontext_eps)
    }

    fn cluster_text(&self, table: &ComposTable, only_unparented: bool) -> Vec<ClusterLabel> {
        let compos = table.select_where(|c| c.is_text() && (!only_unparented || c.parent.is_none()));
        self.cluster_stream(compos, Attr::ColumnMin, Attr::RowMin, self.text_eps)
    }
}

impl ComposTable {
    /// Gives repeated blocks (blocks whose children are laid out alike) a
    /// shared `group_pair` id. Only the matched blocks are written.
    pub fn repetitive_block_recognition<M: ConnectionMatcher>(
        &mut self,
        matcher: &M,
        params: &RecognitionParams,
    ) -> Result<()> {
        let mut signatures = Vec::new();
        for block in self.iter().filter(|c| c.is_block_with_children()) {
            let children = self.resolve_children(block, params.lenient_children)?;
            signatures.push((block.id, matcher.compute_connections(&children)));
        }

        let start_pair_id = self.pair_id_offset();
        let paired = matcher.match_repeated_blocks(&signatures, start_pair_id);
        info!(
            target: BLOCK_REPETITION,
            blocks = signatures.len(),
            paired = paired.len(),
            start_pair_id,
            "Matched repeated blocks"
        );
        self.merge_by_id(paired, MergePolicy::OverwriteMatched, |l| &mut l.group_pair);
        self.advance_stage(Stage::BlockPaired);
        Ok(())
    }

    /// Clusters free-standing non-text and text components into repeated
    /// groups. With `clean_attrs`, leftover cluster columns are dropped and
    /// each row gets a stream-tagged `group`; singleton groups are cleared.
    pub fn repetitive_group_recognition<C: GroupClusterer>(
        &mut self,
        clusterer: &C,
        params: &RecognitionParams,
        clean_attrs: bool,
    ) {
        let nontext = clusterer.cluster_nontext(self, params.only_unparented);
        let text = clusterer.cluster_text(self, params.only_unparented);
        debug!(
            target: GROUP_REPETITION,
            nontext = nontext.len(),
            text = text.len(),
            "Clustered both streams"
        );

        // non-text alignment wins where both streams label a row
        let mut alignments: IndexMap<CompoId, Alignment> = IndexMap::new();
        for label in text.iter().chain(&nontext) {
            if let Some(alignment) = label.alignment {
                alignments.insert(label.id, alignment);
            }
        }
        self.merge_by_id(alignments, MergePolicy::ReplaceAll, |l| &mut l.alignment);
        self.merge_by_id(
            nontext.iter().map(|l| (l.id, l.group)),
            MergePolicy::ReplaceAll,
            |l| &mut l.group_nontext,
        );
        self.merge_by_id(
            text.iter().map(|l| (l.id, l.group)),
            MergePolicy::ReplaceAll,
            |l| &mut l.group_text,
        );

        if clean_attrs {
            self.drop_cluster_columns();
            for row in 0..self.len() {
                let labels = &mut self.row_mut(row).labels;
                labels.group = match (labels.group_nontext, labels.group_text) {
                    (Some(n), _) => Some(GroupId::NonText(n)),
                    (None, Some(n)) => Some(GroupId::Text(n)),
                    (None, None) => None,
                };
            }
            self.remove_singleton_groups();
        }

        info!(
            target: GROUP_REPETITION,
            groups = self.groups_by(|c| c.labels.group).len(),
            "Recognized repeated groups"
        );
        self.advance_stage(Stage::Grouped);
    }

    /// Clears `group` on every group that has a single member.
    pub fn remove_singleton_groups(&mut self) {
        for (_, rows) in self.groups_by(|c| c.labels.group) {
            if let [row] = rows[..] {
                self.row_mut(row).labels.group = None;
            }
        }
    }
}
