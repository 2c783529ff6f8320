//! Fixed-size partitioning used to respect provider batch limits and to
//! bound how much work is in flight at once.

use crate::error::{Error, Result};

/// Split `items` into consecutive chunks of at most `batch_size`, preserving order.
///
/// The last chunk may be shorter. A `batch_size` of zero is rejected.
pub fn partition<T>(items: Vec<T>, batch_size: usize) -> Result<Vec<Vec<T>>> {
    if batch_size == 0 {
        return Err(Error::Validation(
            "Batch size must be greater than zero".to_string(),
        ));
    }

    let mut batches = Vec::with_capacity(items.len().div_ceil(batch_size));
    let mut items = items.into_iter().peekable();

    while items.peek().is_some() {
        batches.push(items.by_ref().take(batch_size).collect());
    }

    Ok(batches)
}
