//! Aggregate byte budget for a single evaluation.

use crate::InspectionLimits;
use crate::error::InspectionError;
use crate::error::QuotaResource;
use crate::error::Result;

/// Tracks bytes buffered across every nesting level of one evaluation.
///
/// All accounting is checked; an overflow is reported as a budget hit.
#[derive(Debug, Default)]
pub struct ByteBudget {
    bytes_buffered: u64,
    max_total_bytes: Option<u64>,
}

impl ByteBudget {
    /// Creates a budget from the evaluation limits.
    #[must_use]
    pub fn new(limits: &InspectionLimits) -> Self {
        Self {
            bytes_buffered: 0,
            max_total_bytes: limits.max_total_bytes,
        }
    }

    /// Charges `size` buffered bytes against the budget.
    ///
    /// # Errors
    ///
    /// Returns `QuotaExceeded` if the running total passes the cap or
    /// overflows.
    pub fn charge(&mut self, size: u64) -> Result<()> {
        let total =
            self.bytes_buffered
                .checked_add(size)
                .ok_or(InspectionError::QuotaExceeded {
                    resource: QuotaResource::IntegerOverflow,
                })?;
        self.bytes_buffered = total;

        if let Some(max) = self.max_total_bytes
            && total > max
        {
            return Err(InspectionError::QuotaExceeded {
                resource: QuotaResource::TotalBytes {
                    current: total,
                    max,
                },
            });
        }

        Ok(())
    }

    /// Returns the total bytes charged so far.
    #[must_use]
    pub fn bytes_buffered(&self) -> u64 {
        self.bytes_buffered
    }
}
