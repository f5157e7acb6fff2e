use crate::error::{LayoutError, Result};
use crate::geo::Rect;
use crate::logging::COMPO_INGEST;
use crate::table::{CompoId, ComposTable, Component, Labels};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Detector output: a list of component records under `compos`.
/// Fields not modelled here (e.g. `clip_path`) are ignored.
#[derive(Debug, Deserialize)]
pub struct ComposDocument {
    pub compos: Vec<ComponentRecord>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PositionRecord {
    pub column_min: Option<f64>,
    pub column_max: Option<f64>,
    pub row_min: Option<f64>,
    pub row_max: Option<f64>,
}

/// `children` may be a list of ids, null, or a negative sentinel.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ChildrenField {
    Ids(Vec<i64>),
    Sentinel(i64),
}

#[derive(Debug, Deserialize)]
pub struct ComponentRecord {
    pub id: Option<i64>,
    pub class: Option<String>,
    pub position: Option<PositionRecord>,
    #[serde(flatten)]
    pub flat_position: PositionRecord,
    pub height: Option<f64>,
    pub width: Option<f64>,
    pub text_content: Option<String>,
    pub children: Option<ChildrenField>,
    pub parent: Option<i64>,
}

fn to_compo_id(index: usize, value: i64, field: &'static str) -> Result<CompoId> {
    CompoId::try_from(value).map_err(|_| LayoutError::MalformedComponentRecord { index, field })
}

fn required<T>(index: usize, value: Option<T>, field: &'static str) -> Result<T> {
    value.ok_or(LayoutError::MalformedComponentRecord { index, field })
}

impl ComponentRecord {
    /// Normalizes one record. Coordinates are truncated to whole pixels.
    pub fn into_component(self, index: usize) -> Result<Component> {
        let id = to_compo_id(index, required(index, self.id, "id")?, "id")?;
        let class = required(index, self.class, "class")?;

        let pos = self.position.unwrap_or(self.flat_position);
        let bbox = Rect {
            column_min: required(index, pos.column_min, "column_min")? as i32,
            column_max: required(index, pos.column_max, "column_max")? as i32,
            row_min: required(index, pos.row_min, "row_min")? as i32,
            row_max: required(index, pos.row_max, "row_max")? as i32,
        };
        let height = required(index, self.height, "height")? as i32;
        let width = required(index, self.width, "width")? as i32;

        let children = match self.children {
            Some(ChildrenField::Ids(ids)) => Some(
                ids.into_iter()
                    .map(|child| to_compo_id(index, child, "children"))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Some(ChildrenField::Sentinel(_)) | None => None,
        };
        let parent = match self.parent {
            Some(p) if p >= 0 => Some(to_compo_id(index, p, "parent")?),
            _ => None,
        };

        Ok(Component {
            id,
            class,
            bbox,
            height,
            width,
            text_content: self.text_content,
            children,
            parent,
            labels: Labels::default(),
        })
    }
}

impl ComposTable {
    pub fn from_document(doc: ComposDocument) -> Result<Self> {
        let compos = doc
            .compos
            .into_iter()
            .enumerate()
            .map(|(index, record)| record.into_component(index))
            .collect::<Result<Vec<_>>>()?;
        ComposTable::new(compos)
    }

    /// Replaces the table with freshly loaded components. Labels, cluster
    /// columns, the stage tag and the counters all start over.
    pub fn reload(&mut self, doc: ComposDocument) -> Result<()> {
        *self = ComposTable::from_document(doc)?;
        Ok(())
    }
}

pub fn parse_compos(json: &str) -> Result<ComposTable> {
    let doc: ComposDocument = serde_json::from_str(json)?;
    debug!(target: COMPO_INGEST, records = doc.compos.len(), "Parsed component records");
    ComposTable::from_document(doc)
}

pub fn load_compos(path: &Path) -> Result<ComposTable> {
    let json = fs::read_to_string(path)?;
    let table = parse_compos(&json)?;
    info!(target: COMPO_INGEST, path = %path.display(), compos = table.len(), "Loaded components");
    Ok(table)
}
