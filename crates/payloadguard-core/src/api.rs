//! High-level public API for stream admission.

use std::io::Read;
use std::io::Seek;

use crate::Dispatcher;
use crate::InspectionLimits;
use crate::InspectionReport;
use crate::Verdict;
use crate::policy::ExtensionPolicy;

/// Decides whether a stream may be admitted.
///
/// Probes the stream with the canonical TAR, ZIP, RAR walkers, checks
/// every entry name against `policy` and recurses into every entry body
/// that can be read. The stream is rewound to offset 0 when this returns.
///
/// Streams that no walker recognises are admitted. Use [`inspect`] to tell
/// an admitted archive from an admitted non-archive.
///
/// # Arguments
///
/// * `stream` - Seekable byte stream, typically a buffered attachment
/// * `policy` - Predicate over lowercased entry extensions
/// * `limits` - Depth and byte caps for this evaluation
///
/// # Examples
///
/// ```
/// use payloadguard_core::ExtensionBlacklist;
/// use payloadguard_core::InspectionLimits;
/// use payloadguard_core::Verdict;
/// use payloadguard_core::evaluate;
/// use payloadguard_core::test_utils::create_test_zip;
/// use std::io::Cursor;
///
/// let attachment = create_test_zip(vec![("invoice.pdf.exe", b"MZ")]);
/// let policy = ExtensionBlacklist::mail_default();
///
/// let verdict = evaluate(&mut Cursor::new(attachment), &policy, &InspectionLimits::default());
/// assert_eq!(verdict, Verdict::RejectBlacklisted);
/// ```
pub fn evaluate<R: Read + Seek>(
    stream: &mut R,
    policy: &dyn ExtensionPolicy,
    limits: &InspectionLimits,
) -> Verdict {
    Dispatcher::new().evaluate(stream, policy, limits)
}

/// Evaluates a stream and reports the context behind the verdict.
///
/// Runs the same algorithm as [`evaluate`].
///
/// # Examples
///
/// ```
/// use payloadguard_core::ExtensionBlacklist;
/// use payloadguard_core::InspectionLimits;
/// use payloadguard_core::inspect;
/// use payloadguard_core::test_utils::create_test_tar;
/// use payloadguard_core::test_utils::create_test_zip;
/// use std::io::Cursor;
///
/// let inner = create_test_tar(vec![("run.js", b"alert(1)")]);
/// let outer = create_test_zip(vec![("bundle.tar", &inner)]);
/// let policy = ExtensionBlacklist::new([".js"]);
///
/// let report = inspect(&mut Cursor::new(outer), &policy, &InspectionLimits::default());
/// assert!(!report.is_admitted());
/// assert_eq!(report.format, Some("zip"));
/// assert_eq!(report.location(), "bundle.tar > run.js");
/// ```
pub fn inspect<R: Read + Seek>(
    stream: &mut R,
    policy: &dyn ExtensionPolicy,
    limits: &InspectionLimits,
) -> InspectionReport {
    Dispatcher::new().inspect(stream, policy, limits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::AllowAll;
    use crate::policy::ExtensionBlacklist;
    use crate::test_utils::create_test_zip;
    use std::io::Cursor;

    #[test]
    fn test_evaluate_plain_text_admitted() {
        let mut stream = Cursor::new(b"Dear customer,".to_vec());
        let verdict = evaluate(
            &mut stream,
            &ExtensionBlacklist::mail_default(),
            &InspectionLimits::default(),
        );
        assert_eq!(verdict, Verdict::Admit);
    }

    #[test]
    fn test_evaluate_matches_inspect() {
        let data = create_test_zip(vec![("a.txt", b"a"), ("b.exe", b"b")]);
        let policy = ExtensionBlacklist::new([".exe"]);
        let limits = InspectionLimits::default();

        let verdict = evaluate(&mut Cursor::new(data.clone()), &policy, &limits);
        let report = inspect(&mut Cursor::new(data), &policy, &limits);
        assert_eq!(verdict, report.verdict);
        assert_eq!(report.entry_path, vec!["b.exe".to_string()]);
    }

    #[test]
    fn test_closure_policy() {
        let data = create_test_zip(vec![("notes.md", b"# hi")]);
        let only_txt = |ext: &str| ext == ".txt";
        let verdict = evaluate(&mut Cursor::new(data), &only_txt, &InspectionLimits::default());
        assert_eq!(verdict, Verdict::RejectBlacklisted);
    }

    #[test]
    fn test_inspect_non_archive_has_no_format() {
        let report = inspect(
            &mut Cursor::new(b"%PDF-1.7".to_vec()),
            &AllowAll,
            &InspectionLimits::default(),
        );
        assert!(report.is_admitted());
        assert!(!report.is_archive());
    }
}
