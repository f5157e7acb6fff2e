use crate::logging::LIST_ITEMS;
use crate::table::{CompoId, ComposTable, ItemId, MergePolicy, Stage};
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Assembled list items: item id -> member ids, in assignment order.
pub type ListItems = IndexMap<ItemId, Vec<CompoId>>;

impl ComposTable {
    /// Follows `pair_to` links inside every `group_pair` to give each row of
    /// a repeated list one `list_item` id. Does nothing before pairing.
    pub fn list_item_partition(&mut self) -> ListItems {
        if self.stage() < Stage::Paired {
            debug!(target: LIST_ITEMS, stage = ?self.stage(), "No pairs yet, skipping list items");
            return ListItems::new();
        }

        let mut assigned: IndexMap<CompoId, ItemId> = IndexMap::new();
        let mut items = ListItems::new();
        for (group_pair, rows) in self.groups_by(|c| c.labels.group_pair) {
            let group_items = self.gather_list_items(&rows, &mut assigned);
            debug!(target: LIST_ITEMS, group_pair, items = group_items.len(), "Gathered list items");
            items.extend(group_items);
        }

        info!(target: LIST_ITEMS, items = items.len(), next_item_id = self.item_id(), "Partitioned list items");
        self.merge_by_id(assigned, MergePolicy::ReplaceAll, |l| &mut l.list_item);
        self.advance_stage(Stage::Listed);
        items
    }

    /// Gathers the paired rows of one `group_pair` into list items. Pairs
    /// only relate two components, so chains (a-b, b-c) are merged into the
    /// item of whichever end was seen first. Rows are taken in table order.
    pub fn gather_list_items(
        &mut self,
        rows: &[usize],
        assigned: &mut IndexMap<CompoId, ItemId>,
    ) -> ListItems {
        let members: Vec<(CompoId, Option<CompoId>)> = rows
            .iter()
            .map(|&r| {
                let c = self.row(r);
                (c.id, c.labels.pair_to)
            })
            .collect();
        let in_group = |id: CompoId| members.iter().any(|(m, _)| *m == id);

        let mut seen: HashMap<CompoId, ItemId> = HashMap::new();
        let mut items = ListItems::new();
        for &(id, pair_to) in &members {
            let partner = match pair_to {
                Some(partner) if in_group(partner) => Some(partner),
                Some(partner) => {
                    warn!(target: LIST_ITEMS, id, partner, "Partner is outside the pair group, treating as unpaired");
                    None
                }
                None => None,
            };

            match partner {
                None => {
                    let item = self.next_item_id();
                    items.insert(item, vec![id]);
                    seen.insert(id, item);
                    assigned.insert(id, item);
                }
                Some(partner) => match (seen.get(&id).copied(), seen.get(&partner).copied()) {
                    (None, None) => {
                        let item = self.next_item_id();
                        items.insert(item, vec![id, partner]);
                        for member in [id, partner] {
                            seen.insert(member, item);
                            assigned.insert(member, item);
                        }
                    }
                    (Some(item), None) => {
                        items.entry(item).or_default().push(partner);
                        seen.insert(partner, item);
                        assigned.insert(partner, item);
                    }
                    (None, Some(item)) => {
                        items.entry(item).or_default().push(id);
                        seen.insert(id, item);
                        assigned.insert(id, item);
                    }
                    (Some(_), Some(_)) => {}
                },
            }
        }
        items
    }
}
