//! The discovery source seam.

use crate::error::Result;
use async_trait::async_trait;
use healer_core::HealerCandidate;

/// Phrases that only appear on block, challenge or captcha pages.
const BLOCK_MARKERS: &[&str] = &[
    "captcha",
    "unusual traffic",
    "access denied",
    "/challenge/",
    "please wait a few minutes before you try again",
    "your ip has been blocked",
];

/// A place healers are discovered from.
///
/// Sources run one at a time. The caller always calls [`DiscoverySource::close`]
/// afterwards, whether `discover` succeeded or not.
#[async_trait]
pub trait DiscoverySource: Send {
    /// Short name for logs and reports
    fn name(&self) -> &str;

    /// Find candidates. Stops early, returning what it has, once the rate
    /// limiter denies.
    async fn discover(&mut self) -> Result<Vec<HealerCandidate>>;

    /// Release the source's resources. Idempotent.
    async fn close(&mut self) -> Result<()>;
}

/// The marker that identifies `html` as a block page, if any.
#[must_use]
pub fn block_marker(html: &str) -> Option<&'static str> {
    let lower = html.to_lowercase();
    BLOCK_MARKERS.iter().copied().find(|m| lower.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_marker() {
        assert_eq!(
            block_marker("<h1>Please complete the CAPTCHA</h1>"),
            Some("captcha")
        );
        assert_eq!(
            block_marker("<p>We detected Unusual Traffic from your network</p>"),
            Some("unusual traffic")
        );
        assert_eq!(block_marker("<p>Reiki in Sedona</p>"), None);
    }
}
