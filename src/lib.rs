pub mod cluster;
pub mod draw;
pub mod error;
pub mod geo;
pub mod list_item;
pub mod logging;
pub mod pairing;
pub mod params;
pub mod parse;
pub mod repetition;
pub mod table;

pub use crate::error::{LayoutError, Result};
pub use crate::pairing::{AlignedPairMatcher, PairMatcher};
pub use crate::params::RecognitionParams;
pub use crate::parse::{load_compos, parse_compos};
pub use crate::repetition::{ChildConnectionMatcher, ConnectionMatcher, DbscanGroupClusterer, GroupClusterer};
pub use crate::table::{ComposTable, Component, Stage};

use tracing::info;

/// Runs every recognition stage in order on `table` with the default
/// matchers and clusterer.
///
/// # Arguments
/// * `table` - Components straight from ingestion
/// * `params` - Thresholds for clustering and matching
///
/// # Returns
/// * `Result<ComposTable>` - The same table carrying every label column
pub fn analyze_layout(table: ComposTable, params: &RecognitionParams) -> Result<ComposTable> {
    analyze_layout_with(
        table,
        params,
        &ChildConnectionMatcher::new(params),
        &DbscanGroupClusterer::new(params),
        &AlignedPairMatcher::new(params),
    )
}

/// Like [`analyze_layout`] with caller-supplied matchers and clusterer.
pub fn analyze_layout_with<M, C, P>(
    mut table: ComposTable,
    params: &RecognitionParams,
    connections: &M,
    clusterer: &C,
    pairs: &P,
) -> Result<ComposTable>
where
    M: ConnectionMatcher,
    C: GroupClusterer,
    P: PairMatcher,
{
    // 1. Repeated blocks
    table.repetitive_block_recognition(connections, params)?;

    // 2. Repeated free-standing groups and their spacing
    table.repetitive_group_recognition(clusterer, params, true);
    table.calc_gap_in_group();

    // 3. Pairs across groups
    table.pair_groups(pairs);

    // 4. List items
    let items = table.list_item_partition();

    info!(
        compos = table.len(),
        list_items = items.len(),
        "Finished layout analysis"
    );
    Ok(table)
}

/// Parses detector JSON, analyses it and returns the table as CSV text.
pub fn process_compos_json(json: &str, params: &RecognitionParams) -> Result<(String, ComposTable)> {
    let table = analyze_layout(parse_compos(json)?, params)?;
    let mut csv = Vec::new();
    table.to_csv(&mut csv)?;
    Ok((String::from_utf8_lossy(&csv).into_owned(), table))
}
