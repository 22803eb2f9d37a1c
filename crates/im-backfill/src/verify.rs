//! Post-backfill verification

use crate::error::JobResult;
use crate::job::BackfillJob;
use crate::schema;
use im_core::TargetTable;
use serde::Serialize;

/// State of a table's identifier column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub table: String,
    pub total: usize,
    /// Rows whose identifier is NULL
    pub nulls: usize,
    /// Identifier values shared by more than one row
    pub duplicates: usize,
    /// Rows whose identifier sorts before the previous row's in creation order
    pub out_of_order: usize,
}

impl VerifyReport {
    /// The column can be made NOT NULL and UNIQUE.
    pub fn ready_to_finalize(&self) -> bool {
        self.nulls == 0 && self.duplicates == 0
    }

    pub fn is_ordered(&self) -> bool {
        self.out_of_order == 0
    }
}

impl BackfillJob<'_> {
    /// Count NULL, duplicate and out-of-order identifiers of `target`.
    pub async fn verify(&self, target: &TargetTable) -> JobResult<VerifyReport> {
        schema::check_target(self.store, target).await?;
        let report = VerifyReport {
            table: target.name.to_string(),
            total: self.store.count_total(&target.name).await?,
            nulls: self.store.count_pending(target).await?,
            duplicates: self.store.count_duplicates(target).await?,
            out_of_order: self.store.count_out_of_order(target).await?,
        };

        if report.out_of_order > 0 {
            log::warn!(
                "{}: {} identifiers sort before their predecessor in creation order",
                target.name,
                report.out_of_order
            );
        }
        log::info!(
            "{}: {} rows, {} NULL, {} duplicate identifiers",
            target.name,
            report.total,
            report.nulls,
            report.duplicates
        );
        Ok(report)
    }
}
