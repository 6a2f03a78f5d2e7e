//! Format dispatch and recursion.
//!
//! The [`Dispatcher`] holds an ordered registry of walkers. For every stream
//! it rewinds to offset 0 and offers the stream to each walker in turn until
//! one of them recognises it. The canonical order is TAR, ZIP, RAR; order
//! matters because loose parsers may accept byte sequences meant for another
//! format, and it decides which walker handles such ambiguous input.

use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;

use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::InspectionLimits;
use crate::RejectReason;
use crate::Verdict;
use crate::formats::ArchiveWalker;
use crate::formats::GzipWalker;
use crate::formats::RarWalker;
use crate::formats::TarWalker;
use crate::formats::ZipWalker;
use crate::inspection::Inspection;
use crate::io::ReadSeek;
use crate::policy::ExtensionPolicy;
use crate::report::InspectionReport;

/// Ordered registry of archive walkers.
///
/// The dispatcher holds no mutable state: one instance can evaluate
/// independent streams on several threads at once.
///
/// # Examples
///
/// ```
/// use payloadguard_core::Dispatcher;
/// use payloadguard_core::ExtensionBlacklist;
/// use payloadguard_core::InspectionLimits;
/// use payloadguard_core::Verdict;
/// use std::io::Cursor;
///
/// let dispatcher = Dispatcher::new();
/// let policy = ExtensionBlacklist::new([".exe"]);
/// let mut stream = Cursor::new(b"just some text".to_vec());
///
/// let verdict = dispatcher.evaluate(&mut stream, &policy, &InspectionLimits::default());
/// assert_eq!(verdict, Verdict::Admit);
/// ```
pub struct Dispatcher {
    walkers: Vec<Box<dyn ArchiveWalker>>,
}

impl Dispatcher {
    /// Creates a dispatcher with the canonical registry: TAR, ZIP, RAR.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts a dispatcher with the canonical registry that can be extended.
    #[must_use]
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Creates a dispatcher with an explicit walker order.
    #[must_use]
    pub fn with_walkers(walkers: Vec<Box<dyn ArchiveWalker>>) -> Self {
        Self { walkers }
    }

    /// Format names of the registered walkers, in probing order.
    #[must_use]
    pub fn formats(&self) -> Vec<&'static str> {
        self.walkers.iter().map(|w| w.format_name()).collect()
    }

    /// Evaluates a stream and returns its verdict.
    ///
    /// The stream is rewound to offset 0 before each probe and once more
    /// when the evaluation completes.
    pub fn evaluate<R: Read + Seek>(
        &self,
        stream: &mut R,
        policy: &dyn ExtensionPolicy,
        limits: &InspectionLimits,
    ) -> Verdict {
        self.inspect(stream, policy, limits).verdict
    }

    /// Evaluates a stream and reports the context behind the verdict.
    pub fn inspect<R: Read + Seek>(
        &self,
        stream: &mut R,
        policy: &dyn ExtensionPolicy,
        limits: &InspectionLimits,
    ) -> InspectionReport {
        let mut cx = Inspection::new(self, policy, limits);
        let verdict = self.evaluate_nested(stream, &mut cx);

        if let Err(e) = stream.seek(SeekFrom::Start(0)) {
            warn!(error = %e, "failed to rewind stream after inspection");
        }

        cx.into_report(verdict)
    }

    /// Evaluates the stream at the context's current depth.
    ///
    /// Walkers reach this through [`Inspection::descend`]; it is also the
    /// body of [`Dispatcher::inspect`] at depth 0.
    pub(crate) fn evaluate_nested(
        &self,
        stream: &mut dyn ReadSeek,
        cx: &mut Inspection<'_>,
    ) -> Verdict {
        let depth = cx.depth();
        let max = cx.limits().max_depth;
        if depth > max {
            cx.reject(RejectReason::DepthExceeded { depth, max });
            return Verdict::RejectBlacklisted;
        }
        cx.enter_stream();

        for walker in &self.walkers {
            let format = walker.format_name();
            if let Err(e) = stream.seek(SeekFrom::Start(0)) {
                warn!(format, depth, error = %e, "failed to rewind stream");
                return Verdict::Malformed;
            }

            trace!(format, depth, "probing stream");
            match walker.walk(stream, cx) {
                Verdict::Admit => return Verdict::Admit,
                Verdict::RejectBlacklisted => return Verdict::RejectBlacklisted,
                Verdict::Unrecognised => {}
                Verdict::Malformed => {
                    debug!(format, depth, "stream malformed, trying next format");
                }
            }
        }

        trace!(depth, "no walker recognised stream");
        Verdict::Admit
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("walkers", &self.formats())
            .finish()
    }
}

/// Builder for a [`Dispatcher`] registry.
///
/// Starts from the canonical TAR, ZIP, RAR order; additional walkers are
/// probed after those, in the order they are added.
///
/// # Examples
///
/// ```
/// use payloadguard_core::Dispatcher;
///
/// let dispatcher = Dispatcher::builder().with_gzip().build();
/// assert_eq!(dispatcher.formats(), vec!["tar", "zip", "rar", "gzip"]);
/// ```
pub struct DispatcherBuilder {
    walkers: Vec<Box<dyn ArchiveWalker>>,
}

impl DispatcherBuilder {
    /// Creates a builder seeded with the canonical registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            walkers: vec![
                Box::new(TarWalker::new()),
                Box::new(ZipWalker::new()),
                Box::new(RarWalker::new()),
            ],
        }
    }

    /// Creates a builder with no walkers registered.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            walkers: Vec::new(),
        }
    }

    /// Appends the single-member gzip walker.
    ///
    /// The member's `FNAME` header field is checked as the entry name. A
    /// member without one has no name to check and only its body is
    /// inspected.
    #[must_use]
    pub fn with_gzip(self) -> Self {
        self.with_walker(GzipWalker::new())
    }

    /// Appends a walker to the end of the probing order.
    #[must_use]
    pub fn with_walker<W: ArchiveWalker + 'static>(mut self, walker: W) -> Self {
        self.walkers.push(Box::new(walker));
        self
    }

    /// Builds the dispatcher.
    #[must_use]
    pub fn build(self) -> Dispatcher {
        Dispatcher::with_walkers(self.walkers)
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
