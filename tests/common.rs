#![allow(dead_code)]

use compos_layout::geo::Rect;
use compos_layout::table::{CompoId, ComposTable, Component};

pub fn compo(id: CompoId, class: &str, column_min: i32, row_min: i32, column_max: i32, row_max: i32) -> Component {
    Component::new(id, class, Rect::new(column_min, row_min, column_max, row_max))
}

pub fn child_of(mut compo: Component, parent: CompoId) -> Component {
    compo.parent = Some(parent);
    compo
}

pub fn block(id: CompoId, bbox: (i32, i32, i32, i32), children: &[CompoId]) -> Component {
    let mut block = compo(id, "Block", bbox.0, bbox.1, bbox.2, bbox.3);
    block.children = Some(children.to_vec());
    block
}

pub fn table(compos: Vec<Component>) -> ComposTable {
    ComposTable::new(compos).expect("ids are unique")
}

/// Column values by id, as exported.
pub fn column(table: &ComposTable, name: &str) -> Vec<(CompoId, String)> {
    (0..table.len())
        .map(|row| (table.row(row).id, table.cell(row, name)))
        .collect()
}

pub fn column_of(table: &ComposTable, name: &str, id: CompoId) -> String {
    let row = table.position(id).expect("id is in the table");
    table.cell(row, name)
}
