use compos_layout::table::{CompoId, Component, Stage};
use pretty_assertions::assert_eq;

mod common;
use common::{column_of, compo, table};

fn paired(id: CompoId, class: &str, group_pair: usize, pair_to: Option<CompoId>) -> Component {
    let offset = id as i32 * 20;
    let mut c = compo(id, class, offset, 0, offset + 10, 10);
    c.labels.group_pair = Some(group_pair);
    c.labels.pair_to = pair_to;
    c
}

fn list_items(table: &compos_layout::ComposTable, ids: &[CompoId]) -> Vec<String> {
    ids.iter().map(|&id| column_of(table, "list_item", id)).collect()
}

#[test]
fn test_two_independent_pairs() {
    let mut table = table(vec![
        paired(1, "Icon", 0, Some(2)),
        paired(2, "Label", 0, Some(1)),
        paired(3, "Icon", 0, Some(4)),
        paired(4, "Label", 0, Some(3)),
    ]);
    table.advance_stage(Stage::Paired);

    let items = table.list_item_partition();

    assert_eq!(list_items(&table, &[1, 2, 3, 4]), vec!["0", "0", "1", "1"]);
    assert_eq!(items.get(&0), Some(&vec![1, 2]));
    assert_eq!(items.get(&1), Some(&vec![3, 4]));
    assert_eq!(table.stage(), Stage::Listed);
}

#[test]
fn test_chained_pairs_form_one_item() {
    let mut table = table(vec![
        paired(1, "Icon", 3, Some(2)),
        paired(2, "Text", 3, Some(3)),
        paired(3, "Text", 3, Some(2)),
        compo(4, "Text", 500, 0, 510, 10),
    ]);
    table.advance_stage(Stage::Paired);

    table.list_item_partition();

    assert_eq!(list_items(&table, &[1, 2, 3, 4]), vec!["0", "0", "0", "-1"]);
}

#[test]
fn test_unpaired_member_gets_its_own_item() {
    let mut table = table(vec![
        paired(1, "Icon", 0, Some(2)),
        paired(2, "Text", 0, Some(1)),
        paired(3, "Icon", 0, None),
    ]);
    table.advance_stage(Stage::Paired);

    table.list_item_partition();

    assert_eq!(list_items(&table, &[1, 2, 3]), vec!["0", "0", "1"]);
}

#[test]
fn test_counter_is_shared_across_groups_and_calls() {
    let mut table = table(vec![
        paired(1, "Icon", 0, Some(2)),
        paired(2, "Text", 0, Some(1)),
        paired(3, "Icon", 1, Some(4)),
        paired(4, "Text", 1, Some(3)),
    ]);
    table.advance_stage(Stage::Paired);

    table.list_item_partition();
    assert_eq!(list_items(&table, &[1, 2, 3, 4]), vec!["0", "0", "1", "1"]);
    assert_eq!(table.item_id(), 2);

    table.list_item_partition();
    assert_eq!(list_items(&table, &[1, 2, 3, 4]), vec!["2", "2", "3", "3"]);
    assert_eq!(table.item_id(), 4);
}

#[test]
fn test_no_op_before_pairing() {
    let mut table = table(vec![paired(1, "Icon", 0, Some(2)), paired(2, "Text", 0, Some(1))]);
    table.advance_stage(Stage::Grouped);

    let items = table.list_item_partition();

    assert!(items.is_empty());
    assert_eq!(table.stage(), Stage::Grouped);
    assert!(table.iter().all(|c| c.labels.list_item.is_none()));
    assert!(!table.columns().contains(&"list_item".to_string()));
}

#[test]
fn test_partner_outside_the_pair_group() {
    let mut table = table(vec![
        paired(1, "Icon", 0, Some(2)),
        paired(2, "Text", 5, Some(1)),
        paired(3, "Icon", 5, Some(2)),
    ]);
    table.advance_stage(Stage::Paired);

    table.list_item_partition();

    // 1 and 2 point across groups and stand alone; 3 joins 2
    assert_eq!(list_items(&table, &[1, 2, 3]), vec!["0", "1", "1"]);
}

#[test]
fn test_three_column_pairs_chain_into_rows() {
    // icon column paired with two label columns, as pairing produces it
    let mut table = table(vec![
        paired(1, "Icon", 0, Some(3)),
        paired(2, "Icon", 0, Some(4)),
        paired(3, "Text", 0, Some(1)),
        paired(4, "Text", 0, Some(2)),
        paired(5, "Text", 0, Some(1)),
        paired(6, "Text", 0, Some(2)),
    ]);
    table.advance_stage(Stage::Paired);

    let items = table.list_item_partition();

    assert_eq!(list_items(&table, &[1, 2, 3, 4, 5, 6]), vec!["0", "1", "0", "1", "0", "1"]);
    assert_eq!(items.get(&0), Some(&vec![1, 3, 5]));
}
