//! Extraction options.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use crate::security::UidRange;
use crate::types::PathWhitelist;

/// How hard links whose target is not on disk yet are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HardlinkPolicy {
    /// The target must precede the link in the archive; a missing target
    /// fails immediately.
    #[default]
    Strict,

    /// Links with a missing target are remembered (metadata only) and
    /// created after the last entry. Targets that still do not exist then
    /// fail the extraction.
    Deferred,
}

/// Cooperative cancellation flag, checked between entries.
///
/// # Examples
///
/// ```
/// use rootfs_core::config::CancelToken;
///
/// let token = CancelToken::new();
/// let handle = token.clone();
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. The running extraction stops before its next
    /// entry.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Options for [`extract_all`](crate::extract_all).
///
/// Defaults extract everything, keep image ids unchanged and require hard
/// link targets to come first.
///
/// # Examples
///
/// ```
/// use rootfs_core::ExtractOptions;
/// use rootfs_core::UidRange;
/// use rootfs_core::config::HardlinkPolicy;
///
/// let options = ExtractOptions::default()
///     .with_uid_range(UidRange::new(100_000, 65536))
///     .with_hardlink_policy(HardlinkPolicy::Deferred);
/// assert!(options.whitelist.is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Only entries whose cleaned path is listed are materialized.
    pub whitelist: Option<PathWhitelist>,

    /// Ownership shift applied to every entry.
    pub uid_range: UidRange,

    /// Handling of hard links that precede their target.
    pub hardlinks: HardlinkPolicy,

    /// Checked once per entry.
    pub cancel: Option<CancelToken>,
}

impl ExtractOptions {
    /// Restricts extraction to the given paths.
    #[must_use]
    pub fn with_whitelist(mut self, whitelist: PathWhitelist) -> Self {
        self.whitelist = Some(whitelist);
        self
    }

    /// Sets the ownership shift.
    #[must_use]
    pub fn with_uid_range(mut self, uid_range: UidRange) -> Self {
        self.uid_range = uid_range;
        self
    }

    /// Sets the hard link policy.
    #[must_use]
    pub fn with_hardlink_policy(mut self, policy: HardlinkPolicy) -> Self {
        self.hardlinks = policy;
        self
    }

    /// Attaches a cancellation token.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}
