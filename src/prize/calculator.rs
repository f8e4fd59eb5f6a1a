use super::models::{PercentageTable, PrizeAward};

/// Computes the payout list from a frozen score snapshot.
///
/// Pure: sorts by score descending with ties broken by user_id ascending
/// (the same order the ranked store uses), assigns ranks 1..N and awards
/// `pool * share / 10_000` to every rank present in the table. Ranks beyond
/// the table or beyond N receive no entry.
pub fn calculate(
    snapshot: &[(String, u32)],
    total_pool_minor: u64,
    table: &PercentageTable,
) -> Vec<PrizeAward> {
    let mut entries: Vec<&(String, u32)> = snapshot.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    entries
        .iter()
        .enumerate()
        .filter_map(|(index, (user_id, _))| {
            let rank = index as u32 + 1;
            table.basis_points(rank).map(|bps| PrizeAward {
                rank,
                user_id: user_id.clone(),
                amount: total_pool_minor * u64::from(bps) / 10_000,
            })
        })
        .collect()
}
