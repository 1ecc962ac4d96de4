//! Attribute report verification.
//!
//! A test binary prints every attribute it reads as a fixed five-line block (see
//! [`ExpectedAttributeReport::block`]). Verification is plain substring matching of each
//! expected block against the captured output; order, duplicates and surrounding output
//! are irrelevant.

use mesh_types::{AttributeId, ClusterId, ExpectedAttributeReport};
use thiserror::Error;

/// An expected report that is not in the output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("attribute {attribute_id} of cluster {cluster_id} not reported; expected:\n{block}")]
pub struct VerificationFailure {
    /// Cluster of the missing report.
    pub cluster_id: ClusterId,
    /// Attribute of the missing report.
    pub attribute_id: AttributeId,
    /// Block that was searched for.
    pub block: String,
}

impl VerificationFailure {
    fn for_report(report: &ExpectedAttributeReport) -> Self {
        Self {
            cluster_id: report.cluster_id,
            attribute_id: report.attribute_id,
            block: report.block(),
        }
    }
}

/// Check every expected report is present in `output`.
///
/// Fails with the first missing report, in table order.
pub fn verify(output: &str, expected: &[ExpectedAttributeReport]) -> Result<(), VerificationFailure> {
    match expected.iter().find(|report| !output.contains(&report.block())) {
        Some(report) => Err(VerificationFailure::for_report(report)),
        None => Ok(()),
    }
}

/// Every expected report missing from `output`, in table order.
pub fn missing_reports<'a>(
    output: &str,
    expected: &'a [ExpectedAttributeReport],
) -> Vec<&'a ExpectedAttributeReport> {
    expected
        .iter()
        .filter(|report| !output.contains(&report.block()))
        .collect()
}
