use compos_layout::pairing::{AlignedPairMatcher, PairLabel, PairMatcher};
use compos_layout::table::{Alignment, Component, Stage};
use pretty_assertions::assert_eq;

mod common;
use common::{column_of, compo, table};

fn vertical(mut compo: Component) -> Component {
    compo.labels.alignment = Some(Alignment::Vertical);
    compo
}

fn nontext(mut compo: Component, group: usize) -> Component {
    compo.labels.group_nontext = Some(group);
    vertical(compo)
}

fn text(mut compo: Component, group: usize) -> Component {
    compo.labels.group_text = Some(group);
    vertical(compo)
}

/// An icon column followed by two label columns, all three rows aligned.
fn three_columns() -> Vec<Component> {
    vec![
        nontext(compo(1, "Icon", 0, 0, 10, 10), 0),
        nontext(compo(2, "Icon", 0, 50, 10, 60), 0),
        text(compo(3, "Text", 20, 0, 60, 10), 0),
        text(compo(4, "Text", 20, 50, 60, 60), 0),
        text(compo(5, "Text", 80, 0, 120, 10), 1),
        text(compo(6, "Text", 80, 50, 120, 60), 1),
    ]
}

#[test]
fn test_columns_share_one_group_pair() {
    let mut table = table(three_columns());

    table.pair_groups(&AlignedPairMatcher::default());

    assert_eq!(table.stage(), Stage::Paired);
    for id in 1..=6 {
        assert_eq!(column_of(&table, "group_pair", id), "0");
    }
    let pair_to: Vec<String> = (1..=6).map(|id| column_of(&table, "pair_to", id)).collect();
    assert_eq!(pair_to, vec!["3", "4", "1", "2", "1", "2"]);
    assert_eq!(table.pair_id_offset(), 1);
}

#[test]
fn test_stream_columns_are_consumed() {
    let mut table = table(three_columns());

    table.pair_groups(&AlignedPairMatcher::default());

    assert!(table
        .iter()
        .all(|c| c.labels.group_nontext.is_none() && c.labels.group_text.is_none()));
}

#[test]
fn test_pair_ids_start_after_block_pairs() {
    let mut compos = three_columns();
    let mut block = compo(9, "Block", 300, 0, 400, 100);
    block.labels.group_pair = Some(7);
    compos.push(block);
    let mut table = table(compos);

    table.pair_groups(&AlignedPairMatcher::default());

    assert_eq!(table.get(1).unwrap().labels.group_pair, Some(8));
    assert_eq!(table.get(9).unwrap().labels.group_pair, Some(7));
    assert_eq!(column_of(&table, "pair_to", 9), "-1");
}

#[test]
fn test_misaligned_groups_stay_unpaired() {
    let mut compos = three_columns();
    // drop the label columns out of line with the icons
    for c in compos.iter_mut().skip(2) {
        c.bbox.row_min += 25;
        c.bbox.row_max += 25;
    }
    let mut table = table(compos);

    table.pair_groups(&AlignedPairMatcher::default());

    // the two label columns still line up with each other
    assert_eq!(column_of(&table, "group_pair", 1), "-1");
    assert_eq!(column_of(&table, "pair_to", 2), "-1");
    assert_eq!(column_of(&table, "pair_to", 3), "5");
    assert_eq!(column_of(&table, "pair_to", 6), "4");
}

#[test]
fn test_no_groups_changes_nothing() {
    let mut table = table(vec![compo(1, "Icon", 0, 0, 10, 10), compo(2, "Text", 20, 0, 60, 10)]);

    table.pair_groups(&AlignedPairMatcher::default());

    assert_eq!(table.stage(), Stage::Paired);
    for id in [1, 2] {
        assert_eq!(column_of(&table, "group_pair", id), "-1");
        assert_eq!(column_of(&table, "pair_to", id), "-1");
    }
    assert_eq!(table.pair_id_offset(), 0);
}

#[test]
fn test_counterparts_need_matching_alignment() {
    let icons = [vertical(compo(1, "Icon", 0, 0, 10, 10)), vertical(compo(2, "Icon", 0, 50, 10, 60))];
    let mut labels = [compo(3, "Text", 20, 0, 60, 10), compo(4, "Text", 20, 50, 60, 60)];
    let matcher = AlignedPairMatcher::default();

    let icon_refs: Vec<&Component> = icons.iter().collect();
    assert_eq!(matcher.counterparts(&icon_refs, &labels.iter().collect::<Vec<_>>()), None);

    for label in &mut labels {
        label.labels.alignment = Some(Alignment::Vertical);
    }
    assert_eq!(
        matcher.counterparts(&icon_refs, &labels.iter().collect::<Vec<_>>()),
        Some(vec![(1, 3), (2, 4)])
    );
}

/// Pairs the first two groups it is given, whatever they look like.
struct FirstTwo;

impl PairMatcher for FirstTwo {
    fn match_pairs_within_groups(&self, groups: &[Vec<&Component>], start_id: usize) -> Vec<PairLabel> {
        match groups {
            [a, b, ..] => vec![
                PairLabel { id: a[0].id, group_pair: start_id, pair_to: b[0].id },
                PairLabel { id: b[0].id, group_pair: start_id, pair_to: a[0].id },
            ],
            _ => Vec::new(),
        }
    }
}

#[test]
fn test_custom_matcher_results_are_merged_by_id() {
    let mut table = table(three_columns());

    table.pair_groups(&FirstTwo);

    assert_eq!(column_of(&table, "pair_to", 1), "3");
    assert_eq!(column_of(&table, "pair_to", 3), "1");
    assert_eq!(column_of(&table, "group_pair", 2), "-1");
    assert_eq!(column_of(&table, "group_pair", 5), "-1");
}
