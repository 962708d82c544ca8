// Copyright the QCN Core contributors.
// SPDX-License-Identifier: Apache-2.0

use super::INITIAL_SAMPLE_CREDIT;

/// The `qntz_Fb >> 3`-indexed sample-credit lookup: larger congestion
/// shortens inter-sample bytes, increasing feedback density superlinearly.
const MARK_TABLE: [i64; 8] = [153_600, 76_800, 51_200, 38_400, 30_720, 25_600, 22_016, 18_944];

/// Refreshes `sample_credit` given the three upper bits of `qntz_Fb`.
#[inline]
pub(super) fn mark_table_credit(qntz_fb: u32) -> i64 {
    MARK_TABLE
        .get((qntz_fb >> 3) as usize)
        .copied()
        .unwrap_or(INITIAL_SAMPLE_CREDIT)
}
