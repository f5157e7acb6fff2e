use crate::error::{LayoutError, Result};
use crate::geo::Rect;
use crate::logging::COMPO_TABLE;
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, warn};

pub type CompoId = u32;
pub type PairId = usize;
pub type ItemId = usize;

pub const BLOCK_CLASS: &str = "Block";
pub const TEXT_CLASS: &str = "Text";

/// Axis along which the members of a group are distributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Alignment {
    Horizontal,
    Vertical,
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alignment::Horizontal => f.write_str("h"),
            Alignment::Vertical => f.write_str("v"),
        }
    }
}

/// Label of a repeated group. Cluster ids come straight out of a clustering
/// pass; the tagged variants keep the non-text and text streams apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupId {
    Cluster(usize),
    NonText(usize),
    Text(usize),
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupId::Cluster(n) => write!(f, "{n}"),
            GroupId::NonText(n) => write!(f, "nt-{n}"),
            GroupId::Text(n) => write!(f, "t-{n}"),
        }
    }
}

/// How far analysis has progressed on a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Stage {
    #[default]
    Raw,
    BlockPaired,
    Grouped,
    Paired,
    Listed,
}

/// Numeric component attributes usable as clustering features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attr {
    CenterColumn,
    CenterRow,
    ColumnMin,
    ColumnMax,
    RowMin,
    RowMax,
    Height,
    Width,
    Area,
}

impl Attr {
    pub fn name(&self) -> &'static str {
        match self {
            Attr::CenterColumn => "center_column",
            Attr::CenterRow => "center_row",
            Attr::ColumnMin => "column_min",
            Attr::ColumnMax => "column_max",
            Attr::RowMin => "row_min",
            Attr::RowMax => "row_max",
            Attr::Height => "height",
            Attr::Width => "width",
            Attr::Area => "area",
        }
    }
}

/// Labels assigned by the analysis stages. `None` means unassigned and is
/// exported as `-1`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Labels {
    pub group_pair: Option<PairId>,
    pub group_nontext: Option<usize>,
    pub group_text: Option<usize>,
    pub group: Option<GroupId>,
    pub alignment: Option<Alignment>,
    pub gap: Option<i32>,
    pub pair_to: Option<CompoId>,
    pub list_item: Option<ItemId>,
}

/// One detected UI element.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub id: CompoId,
    pub class: String,
    pub bbox: Rect,
    pub height: i32,
    pub width: i32,
    pub text_content: Option<String>,
    pub children: Option<Vec<CompoId>>,
    pub parent: Option<CompoId>,
    pub labels: Labels,
}

impl Component {
    /// Builds a component whose height and width follow its box.
    pub fn new(id: CompoId, class: impl Into<String>, bbox: Rect) -> Self {
        Self {
            id,
            class: class.into(),
            bbox,
            height: bbox.height(),
            width: bbox.width(),
            text_content: None,
            children: None,
            parent: None,
            labels: Labels::default(),
        }
    }

    pub fn area(&self) -> i64 {
        i64::from(self.height) * i64::from(self.width)
    }

    pub fn center(&self) -> (f64, f64) {
        self.bbox.center()
    }

    pub fn center_column(&self) -> f64 {
        self.bbox.center_column()
    }

    pub fn center_row(&self) -> f64 {
        self.bbox.center_row()
    }

    pub fn is_text(&self) -> bool {
        self.class == TEXT_CLASS
    }

    pub fn is_block_with_children(&self) -> bool {
        self.class == BLOCK_CLASS && self.children.as_ref().is_some_and(|c| !c.is_empty())
    }

    pub fn attr(&self, attr: Attr) -> f64 {
        match attr {
            Attr::CenterColumn => self.center_column(),
            Attr::CenterRow => self.center_row(),
            Attr::ColumnMin => f64::from(self.bbox.column_min),
            Attr::ColumnMax => f64::from(self.bbox.column_max),
            Attr::RowMin => f64::from(self.bbox.row_min),
            Attr::RowMax => f64::from(self.bbox.row_max),
            Attr::Height => f64::from(self.height),
            Attr::Width => f64::from(self.width),
            Attr::Area => self.area() as f64,
        }
    }
}

/// Conflict policy for [`ComposTable::merge_by_id`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Rows named in the results are overwritten, all others keep their value.
    OverwriteMatched,
    /// Every row takes the result value, or `None` when it is not named.
    ReplaceAll,
}

const BASE_COLUMNS: &[&str] = &[
    "id",
    "class",
    "column_min",
    "column_max",
    "row_min",
    "row_max",
    "height",
    "width",
    "area",
    "center",
    "center_column",
    "center_row",
    "text_content",
    "children",
    "parent",
];

/// The component table shared by every stage. Rows keep input order and are
/// never removed; stages only write label columns.
#[derive(Debug, Clone, Default)]
pub struct ComposTable {
    compos: Vec<Component>,
    index: IndexMap<CompoId, usize>,
    clusters: IndexMap<String, Vec<Option<usize>>>,
    stage: Stage,
    item_id: ItemId,
    next_pair_id: PairId,
}

impl ComposTable {
    pub fn new(compos: Vec<Component>) -> Result<Self> {
        let mut index = IndexMap::with_capacity(compos.len());
        for (row, compo) in compos.iter().enumerate() {
            if index.insert(compo.id, row).is_some() {
                return Err(LayoutError::DuplicateComponentId(compo.id));
            }
        }
        let next_pair_id = compos
            .iter()
            .filter_map(|c| c.labels.group_pair)
            .max()
            .map_or(0, |max| max + 1);
        debug!(target: COMPO_TABLE, rows = compos.len(), "Built component table");
        Ok(Self {
            compos,
            index,
            clusters: IndexMap::new(),
            stage: Stage::Raw,
            item_id: 0,
            next_pair_id,
        })
    }

    pub fn len(&self) -> usize {
        self.compos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compos.is_empty()
    }

    pub fn compos(&self) -> &[Component] {
        &self.compos
    }

    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.compos.iter()
    }

    pub fn row(&self, row: usize) -> &Component {
        &self.compos[row]
    }

    pub(crate) fn row_mut(&mut self, row: usize) -> &mut Component {
        &mut self.compos[row]
    }

    pub fn position(&self, id: CompoId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn get(&self, id: CompoId) -> Option<&Component> {
        self.position(id).map(|row| &self.compos[row])
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Moves the stage tag forward; it never goes back.
    pub fn advance_stage(&mut self, stage: Stage) {
        self.stage = self.stage.max(stage);
    }

    /// The next list-item id that will be handed out.
    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    /// Reads and advances the list-item counter.
    pub fn next_item_id(&mut self) -> ItemId {
        let id = self.item_id;
        self.item_id += 1;
        id
    }

    /// First pair id not used by any row.
    pub fn pair_id_offset(&self) -> PairId {
        self.next_pair_id
    }

    fn reserve_pair_ids(&mut self) {
        if let Some(max) = self.compos.iter().filter_map(|c| c.labels.group_pair).max() {
            self.next_pair_id = self.next_pair_id.max(max + 1);
        }
    }

    /// Writes per-id results into one label column. Ids that are not in the
    /// table are skipped with a warning.
    pub fn merge_by_id<T, I, F>(&mut self, results: I, policy: MergePolicy, column: F)
    where
        I: IntoIterator<Item = (CompoId, T)>,
        F: Fn(&mut Labels) -> &mut Option<T>,
    {
        let mut results: IndexMap<CompoId, T> = results.into_iter().collect();
        if policy == MergePolicy::ReplaceAll {
            for compo in &mut self.compos {
                *column(&mut compo.labels) = results.shift_remove(&compo.id);
            }
        } else {
            for compo in &mut self.compos {
                if let Some(value) = results.shift_remove(&compo.id) {
                    *column(&mut compo.labels) = Some(value);
                }
            }
        }
        for id in results.keys() {
            warn!(target: COMPO_TABLE, id, "Merge result refers to an unknown component");
        }
        self.reserve_pair_ids();
    }

    /// Rows whose class is in `categories`, optionally only those without a
    /// parent, as a fresh table.
    pub fn select_by_class(&self, categories: &[&str], no_parent: bool) -> ComposTable {
        self.select_where(|c| {
            categories.contains(&c.class.as_str()) && (!no_parent || c.parent.is_none())
        })
    }

    pub fn select_where<P>(&self, predicate: P) -> ComposTable
    where
        P: Fn(&Component) -> bool,
    {
        let compos: Vec<Component> = self.compos.iter().filter(|c| predicate(c)).cloned().collect();
        let index = compos.iter().enumerate().map(|(row, c)| (c.id, row)).collect();
        ComposTable {
            compos,
            index,
            clusters: IndexMap::new(),
            stage: self.stage,
            item_id: 0,
            next_pair_id: self.next_pair_id,
        }
    }

    /// Row indices grouped by `key`, keys ascending, rows in table order.
    /// Rows whose key is `None` are left out.
    pub fn groups_by<K, F>(&self, key: F) -> BTreeMap<K, Vec<usize>>
    where
        K: Ord,
        F: Fn(&Component) -> Option<K>,
    {
        let mut groups: BTreeMap<K, Vec<usize>> = BTreeMap::new();
        for (row, compo) in self.compos.iter().enumerate() {
            if let Some(k) = key(compo) {
                groups.entry(k).or_default().push(row);
            }
        }
        groups
    }

    /// Resolves a block's children, ordered by vertical center and then by
    /// horizontal center within a row.
    pub fn resolve_children(&self, block: &Component, lenient: bool) -> Result<Vec<&Component>> {
        let ids = block.children.as_deref().unwrap_or_default();
        let mut children = Vec::with_capacity(ids.len());
        for &child in ids {
            match self.get(child) {
                Some(compo) => children.push(compo),
                None if lenient => {
                    warn!(target: COMPO_TABLE, block = block.id, child, "Dropping unresolved child reference");
                }
                None => {
                    return Err(LayoutError::UnresolvedChildReference {
                        block: block.id,
                        child,
                    })
                }
            }
        }
        children.sort_by_key(|c| {
            (
                ordered_float::OrderedFloat(c.center_row()),
                ordered_float::OrderedFloat(c.center_column()),
            )
        });
        Ok(children)
    }

    pub(crate) fn set_cluster_column(&mut self, name: String, labels: Vec<Option<usize>>) {
        self.clusters.insert(name, labels);
    }

    pub fn cluster_column(&self, name: &str) -> Option<&[Option<usize>]> {
        self.clusters.get(name).map(Vec::as_slice)
    }

    pub fn drop_cluster_columns(&mut self) {
        self.clusters.clear();
    }

    /// Column names exported for the current stage.
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();
        if self.stage >= Stage::BlockPaired {
            columns.push("group_pair".into());
        }
        if self.stage >= Stage::Grouped {
            columns.extend(["group", "alignment_in_group", "gap"].map(String::from));
        }
        if self.stage >= Stage::Paired {
            columns.push("pair_to".into());
        }
        if self.stage >= Stage::Listed {
            columns.push("list_item".into());
        }
        columns.extend(self.clusters.keys().cloned());
        columns
    }

    /// Text of one cell, `-1` for unassigned labels and missing ids.
    pub fn cell(&self, row: usize, column: &str) -> String {
        fn label<T: ToString>(value: Option<T>) -> String {
            value.map_or_else(|| "-1".to_string(), |v| v.to_string())
        }
        let c = &self.compos[row];
        match column {
            "id" => c.id.to_string(),
            "class" => c.class.clone(),
            "column_min" => c.bbox.column_min.to_string(),
            "column_max" => c.bbox.column_max.to_string(),
            "row_min" => c.bbox.row_min.to_string(),
            "row_max" => c.bbox.row_max.to_string(),
            "height" => c.height.to_string(),
            "width" => c.width.to_string(),
            "area" => c.area().to_string(),
            "center" => format!("({:.1}, {:.1})", c.center_column(), c.center_row()),
            "center_column" => format!("{:.1}", c.center_column()),
            "center_row" => format!("{:.1}", c.center_row()),
            "text_content" => c.text_content.clone().unwrap_or_default(),
            "children" => c.children.as_ref().map_or_else(
                || "-1".to_string(),
                |ids| {
                    let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
                    format!("({})", ids.join(", "))
                },
            ),
            "parent" => label(c.parent),
            "group_pair" => label(c.labels.group_pair),
            "group" => label(c.labels.group),
            "alignment_in_group" => label(c.labels.alignment),
            "gap" => label(c.labels.gap),
            "pair_to" => label(c.labels.pair_to),
            "list_item" => label(c.labels.list_item),
            other => self
                .clusters
                .get(other)
                .map_or_else(String::new, |labels| label(labels[row])),
        }
    }

    /// Writes the table as CSV, one row per component.
    pub fn to_csv<W: Write>(&self, writer: &mut W) -> Result<()> {
        let columns = self.columns();
        let header: Vec<String> = columns.iter().map(|c| csv_field(c)).collect();
        writeln!(writer, "{}", header.join(","))?;
        for row in 0..self.compos.len() {
            let fields: Vec<String> = columns
                .iter()
                .map(|column| csv_field(&self.cell(row, column)))
                .collect();
            writeln!(writer, "{}", fields.join(","))?;
        }
        Ok(())
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.to_csv(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
