//! The paginated record listing consumed by the refresh engine.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{PageCursor, RecordPage};

/// A source of DNS record sets, listed one page at a time.
///
/// Passing `None` as the cursor requests the first page. Implementations
/// return the continuation for the next page in [`RecordPage::next`].
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// List one page of record sets for `zone_id`
    async fn list_page(&self, zone_id: &str, cursor: Option<&PageCursor>) -> Result<RecordPage>;
}
