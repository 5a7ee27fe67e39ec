use std::collections::{HashMap, HashSet};

use crate::callgraph::{FunctionKey, FunctionRecord, root_positions};

/// Case-insensitive substring match over a record's own name, its file path
/// and the names of its callees. `needle` must already be lowercase.
fn record_matches(record: &FunctionRecord, needle: &str) -> bool {
    record.name.to_lowercase().contains(needle)
        || record.file_path.to_lowercase().contains(needle)
        || record
            .calls
            .iter()
            .any(|call| call.name.to_lowercase().contains(needle))
}

/// Records matching `query`, in dataset order. A blank query matches every
/// record.
pub fn search_records<'a>(records: &'a [FunctionRecord], query: &str) -> Vec<&'a FunctionRecord> {
    let needle = query.trim().to_lowercase();
    records
        .iter()
        .filter(|record| record_matches(record, &needle))
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalPage {
    /// Page roots plus everything reachable from them, in dataset order.
    pub records: Vec<FunctionRecord>,
    pub roots: Vec<FunctionKey>,
    /// Roots across all pages.
    pub total_roots: usize,
    pub page: usize,
}

pub fn count_roots(records: &[FunctionRecord]) -> usize {
    root_positions(records).len()
}

/// Slices one page of roots out of `records` (optionally filtered by `query`)
/// and returns the closure of just those roots.
///
/// Roots are computed over the filtered set; the closure walk resolves calls
/// against the whole dataset so callees keep their own call lists.
pub fn local_page(
    records: &[FunctionRecord],
    query: Option<&str>,
    page: usize,
    page_size: usize,
) -> LocalPage {
    let filtered: Vec<FunctionRecord> = match query.map(str::trim) {
        Some(query) if !query.is_empty() => {
            search_records(records, query).into_iter().cloned().collect()
        }
        _ => records.to_vec(),
    };

    let all_roots = root_positions(&filtered);
    let total_roots = all_roots.len();
    let page = page.max(1);
    let page_size = page_size.max(1);
    let start = ((page - 1) * page_size).min(total_roots);
    let end = (start + page_size).min(total_roots);

    let roots = all_roots[start..end]
        .iter()
        .map(|&position| filtered[position].key())
        .collect::<Vec<_>>();

    let index_by_key = records
        .iter()
        .enumerate()
        .fold(HashMap::new(), |mut index, (position, record)| {
            index.entry(record.key()).or_insert(position);
            index
        });

    let mut reached: HashSet<usize> = HashSet::new();
    let mut stack = roots
        .iter()
        .filter_map(|key| index_by_key.get(key).copied())
        .collect::<Vec<_>>();
    while let Some(position) = stack.pop() {
        if !reached.insert(position) {
            continue;
        }
        for call in &records[position].calls {
            if let Some(&callee) = index_by_key.get(&call.key())
                && !reached.contains(&callee)
            {
                stack.push(callee);
            }
        }
    }

    let mut positions = reached.into_iter().collect::<Vec<_>>();
    positions.sort_unstable();

    LocalPage {
        records: positions
            .into_iter()
            .map(|position| records[position].clone())
            .collect(),
        roots,
        total_roots,
        page,
    }
}
