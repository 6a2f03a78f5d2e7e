//! Per-evaluation walk context.
//!
//! An [`Inspection`] is created for every top-level evaluation and threaded
//! through the dispatcher and every walker it reaches. It implements the
//! per-entry steps shared by all formats:
//!
//! 1. [`Inspection::check_name`] applies the policy to the entry name.
//! 2. [`Inspection::descend`] buffers the body (bounded by
//!    `max_entry_bytes`) and evaluates it as a nested stream.
//! 3. [`Inspection::skip_entry`] records a body that could not be read, or
//!    ends the walk as malformed when the error is not confined to the entry.
//!
//! Walkers must call `check_name` before touching an entry's body.

use std::io::Cursor;
use std::io::Read;
use std::ops::ControlFlow;

use tracing::debug;
use tracing::warn;

use crate::InspectionLimits;
use crate::RejectReason;
use crate::Verdict;
use crate::dispatcher::Dispatcher;
use crate::error::InspectionError;
use crate::io::check_declared_size;
use crate::io::read_bounded;
use crate::policy::ExtensionPolicy;
use crate::policy::normalized_extension;
use crate::report::InspectionReport;
use crate::report::InspectionStats;
use crate::security::ByteBudget;

/// Mutable state of one evaluation.
pub struct Inspection<'a> {
    dispatcher: &'a Dispatcher,
    policy: &'a dyn ExtensionPolicy,
    limits: InspectionLimits,
    budget: ByteBudget,
    depth: usize,
    path: Vec<String>,
    format: Option<&'static str>,
    rejection: Option<(RejectReason, Vec<String>)>,
    stats: InspectionStats,
}

impl<'a> Inspection<'a> {
    pub(crate) fn new(
        dispatcher: &'a Dispatcher,
        policy: &'a dyn ExtensionPolicy,
        limits: &InspectionLimits,
    ) -> Self {
        Self {
            dispatcher,
            policy,
            limits: *limits,
            budget: ByteBudget::new(limits),
            depth: 0,
            path: Vec::new(),
            format: None,
            rejection: None,
            stats: InspectionStats::default(),
        }
    }

    /// Nesting depth of the stream currently being evaluated.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Limits of this evaluation.
    #[must_use]
    pub fn limits(&self) -> &InspectionLimits {
        &self.limits
    }

    /// Counters collected so far.
    #[must_use]
    pub fn stats(&self) -> &InspectionStats {
        &self.stats
    }

    /// Records that `format` recognised the current stream.
    ///
    /// Walkers call this once they are past the probing stage.
    pub fn note_archive(&mut self, format: &'static str) {
        self.stats.archives_walked += 1;
        if self.depth == 0 && self.format.is_none() {
            self.format = Some(format);
        }
        debug!(format, depth = self.depth, "archive recognised");
    }

    /// Applies the policy to an entry name.
    ///
    /// Breaks with [`Verdict::RejectBlacklisted`] if the name's extension is
    /// disallowed.
    pub fn check_name(&mut self, name: &str) -> ControlFlow<Verdict> {
        self.stats.entries_inspected += 1;
        let extension = normalized_extension(name);
        if self.policy.is_allowed(&extension) {
            return ControlFlow::Continue(());
        }

        self.path.push(name.to_owned());
        self.reject(RejectReason::BlacklistedExtension {
            entry: name.to_owned(),
            extension,
        });
        self.path.pop();
        ControlFlow::Break(Verdict::RejectBlacklisted)
    }

    /// Handles an error raised while reading an entry body.
    ///
    /// Entry-local errors (see [`InspectionError::is_entry_local`]) skip the
    /// entry and let the walk continue. Anything else breaks with
    /// [`Verdict::Malformed`].
    pub fn skip_entry(&mut self, name: &str, error: &InspectionError) -> ControlFlow<Verdict> {
        if !error.is_entry_local() {
            debug!(entry = name, depth = self.depth, error = %error, "container broken at entry");
            return ControlFlow::Break(Verdict::Malformed);
        }
        self.stats.entries_skipped += 1;
        debug!(entry = name, depth = self.depth, error = %error, "entry body skipped");
        ControlFlow::Continue(())
    }

    /// Buffers an entry body and evaluates it as a nested stream.
    ///
    /// `declared_size` is the size recorded in the entry header, if known.
    /// Bodies that are too large or fail to read are skipped; only a
    /// rejection of the nested stream breaks the walk.
    pub fn descend(
        &mut self,
        name: &str,
        body: &mut dyn Read,
        declared_size: Option<u64>,
    ) -> ControlFlow<Verdict> {
        let max = self.limits.max_entry_bytes;
        let buffered = declared_size
            .map_or(Ok(()), |size| check_declared_size(size, max))
            .and_then(|()| read_bounded(body, max, declared_size));

        match buffered {
            Ok(data) => self.descend_buffered(name, data),
            Err(e) => self.skip_entry(name, &e),
        }
    }

    /// Evaluates an already-buffered entry body as a nested stream.
    pub fn descend_buffered(&mut self, name: &str, data: Vec<u8>) -> ControlFlow<Verdict> {
        let len = data.len() as u64;
        if let Err(e) = self.budget.charge(len) {
            self.path.push(name.to_owned());
            if let Some(&resource) = e.quota_resource() {
                self.reject(RejectReason::BudgetExceeded { resource });
            }
            self.path.pop();
            return ControlFlow::Break(Verdict::RejectBlacklisted);
        }
        self.stats.bytes_buffered = self.budget.bytes_buffered();

        debug!(entry = name, depth = self.depth + 1, bytes = len, "descending into entry");
        let dispatcher = self.dispatcher;
        self.path.push(name.to_owned());
        self.depth += 1;
        let verdict = dispatcher.evaluate_nested(&mut Cursor::new(data), self);
        self.depth -= 1;
        self.path.pop();

        if verdict.is_reject() {
            ControlFlow::Break(Verdict::RejectBlacklisted)
        } else {
            ControlFlow::Continue(())
        }
    }

    /// Records the first rejection reason along with the current entry path.
    pub(crate) fn reject(&mut self, reason: RejectReason) {
        if self.rejection.is_some() {
            return;
        }
        warn!(
            location = %self.path.join(" > "),
            depth = self.depth,
            reason = %reason,
            "stream rejected"
        );
        self.rejection = Some((reason, self.path.clone()));
    }

    pub(crate) fn enter_stream(&mut self) {
        self.stats.max_depth_reached = self.stats.max_depth_reached.max(self.depth);
    }

    pub(crate) fn into_report(self, verdict: Verdict) -> InspectionReport {
        let (reason, entry_path) = match self.rejection {
            Some((reason, path)) if verdict.is_reject() => (Some(reason), path),
            _ => (None, Vec::new()),
        };
        InspectionReport {
            verdict,
            format: self.format,
            reason,
            entry_path,
            stats: self.stats,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::policy::AllowAll;
    use crate::policy::ExtensionBlacklist;

    #[test]
    fn test_check_name_allowed() {
        let dispatcher = Dispatcher::new();
        let policy = ExtensionBlacklist::new([".exe"]);
        let mut cx = Inspection::new(&dispatcher, &policy, &InspectionLimits::default());

        assert_eq!(cx.check_name("docs/readme.txt"), ControlFlow::Continue(()));
        assert_eq!(cx.stats().entries_inspected, 1);
    }

    #[test]
    fn test_check_name_rejected_records_reason() {
        let dispatcher = Dispatcher::new();
        let policy = ExtensionBlacklist::new([".exe"]);
        let mut cx = Inspection::new(&dispatcher, &policy, &InspectionLimits::default());

        assert_eq!(
            cx.check_name("bin/SETUP.EXE"),
            ControlFlow::Break(Verdict::RejectBlacklisted)
        );

        let report = cx.into_report(Verdict::RejectBlacklisted);
        assert_eq!(
            report.reason,
            Some(RejectReason::BlacklistedExtension {
                entry: "bin/SETUP.EXE".into(),
                extension: ".exe".into(),
            })
        );
        assert_eq!(report.entry_path, vec!["bin/SETUP.EXE".to_string()]);
    }

    #[test]
    fn test_descend_skips_oversized_declared_size() {
        let dispatcher = Dispatcher::new();
        let limits = InspectionLimits::default().with_max_entry_bytes(4);
        let mut cx = Inspection::new(&dispatcher, &AllowAll, &limits);

        let mut body: &[u8] = b"0123456789";
        let flow = cx.descend("big.bin", &mut body, Some(10));
        assert_eq!(flow, ControlFlow::Continue(()));
        assert_eq!(cx.stats().entries_skipped, 1);
        assert_eq!(cx.stats().bytes_buffered, 0);
    }

    #[test]
    fn test_descend_skips_oversized_undeclared_body() {
        let dispatcher = Dispatcher::new();
        let limits = InspectionLimits::default().with_max_entry_bytes(4);
        let mut cx = Inspection::new(&dispatcher, &AllowAll, &limits);

        let mut body: &[u8] = b"0123456789";
        assert_eq!(cx.descend("big.bin", &mut body, None), ControlFlow::Continue(()));
        assert_eq!(cx.stats().entries_skipped, 1);
    }

    #[test]
    fn test_descend_plain_body_continues() {
        let dispatcher = Dispatcher::new();
        let mut cx = Inspection::new(&dispatcher, &AllowAll, &InspectionLimits::default());

        let mut body: &[u8] = b"hello";
        assert_eq!(cx.descend("a.txt", &mut body, Some(5)), ControlFlow::Continue(()));
        assert_eq!(cx.stats().bytes_buffered, 5);
        assert_eq!(cx.stats().max_depth_reached, 1);
        assert_eq!(cx.depth(), 0);
    }

    #[test]
    fn test_descend_budget_exceeded_rejects() {
        let dispatcher = Dispatcher::new();
        let limits = InspectionLimits::default().with_max_total_bytes(Some(8));
        let mut cx = Inspection::new(&dispatcher, &AllowAll, &limits);

        assert_eq!(
            cx.descend_buffered("a.txt", b"12345".to_vec()),
            ControlFlow::Continue(())
        );
        assert_eq!(
            cx.descend_buffered("b.txt", b"12345".to_vec()),
            ControlFlow::Break(Verdict::RejectBlacklisted)
        );

        let report = cx.into_report(Verdict::RejectBlacklisted);
        assert!(matches!(
            report.reason,
            Some(RejectReason::BudgetExceeded { .. })
        ));
        assert_eq!(report.entry_path, vec!["b.txt".to_string()]);
    }

    #[test]
    fn test_skip_entry_absorbs_entry_local_errors() {
        let dispatcher = Dispatcher::new();
        let mut cx = Inspection::new(&dispatcher, &AllowAll, &InspectionLimits::default());

        let flow = cx.skip_entry("secret.doc", &InspectionError::Encrypted);
        assert_eq!(flow, ControlFlow::Continue(()));
        let flow = cx.skip_entry("a.bin", &InspectionError::UnreadableEntry("bad crc".into()));
        assert_eq!(flow, ControlFlow::Continue(()));
        assert_eq!(cx.stats().entries_skipped, 2);
    }

    #[test]
    fn test_skip_entry_structural_error_is_malformed() {
        let dispatcher = Dispatcher::new();
        let mut cx = Inspection::new(&dispatcher, &AllowAll, &InspectionLimits::default());

        let error = InspectionError::InvalidArchive("header chain broken".into());
        assert_eq!(
            cx.skip_entry("a.bin", &error),
            ControlFlow::Break(Verdict::Malformed)
        );
        assert_eq!(cx.stats().entries_skipped, 0);
    }

    #[test]
    fn test_report_drops_reason_when_not_rejected() {
        let dispatcher = Dispatcher::new();
        let policy = ExtensionBlacklist::new([".exe"]);
        let mut cx = Inspection::new(&dispatcher, &policy, &InspectionLimits::default());
        let _ = cx.check_name("a.exe");

        let report = cx.into_report(Verdict::Admit);
        assert_eq!(report.reason, None);
        assert!(report.entry_path.is_empty());
    }
}
