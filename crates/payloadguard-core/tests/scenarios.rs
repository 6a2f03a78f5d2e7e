//! End-to-end admission scenarios.
//!
//! Each test builds an attachment in memory and runs it through the public
//! API with the default limits unless stated otherwise.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use payloadguard_core::AllowAll;
use payloadguard_core::Dispatcher;
use payloadguard_core::ExtensionBlacklist;
use payloadguard_core::InspectionLimits;
use payloadguard_core::RejectReason;
use payloadguard_core::Verdict;
use payloadguard_core::evaluate;
use payloadguard_core::inspect;
use payloadguard_core::test_utils::RarTestBuilder;
use payloadguard_core::test_utils::TarTestBuilder;
use payloadguard_core::test_utils::create_nested_zip;
use payloadguard_core::test_utils::create_test_gzip;
use payloadguard_core::test_utils::create_test_tar;
use payloadguard_core::test_utils::create_test_zip;
use std::io::Cursor;

fn mail_policy() -> ExtensionBlacklist {
    ExtensionBlacklist::mail_default()
}

fn verdict_of(data: Vec<u8>, policy: &ExtensionBlacklist) -> Verdict {
    evaluate(&mut Cursor::new(data), policy, &InspectionLimits::default())
}

// ============================================================================
// Reference scenarios
// ============================================================================

#[test]
fn test_zip_with_document_and_image_admitted() {
    let data = create_test_zip(vec![("readme.txt", b"read me"), ("image.png", b"\x89PNG")]);
    assert_eq!(verdict_of(data, &mail_policy()), Verdict::Admit);
}

#[test]
fn test_zip_with_executable_rejected() {
    let data = create_test_zip(vec![("setup.exe", b"MZ")]);
    assert_eq!(verdict_of(data, &mail_policy()), Verdict::RejectBlacklisted);
}

#[test]
fn test_tar_with_nested_zip_mixed_case_payload_rejected() {
    let inner = create_test_zip(vec![("payload.JS", b"WScript.Echo(1)")]);
    let data = create_test_tar(vec![("inner.zip", &inner)]);

    let report = inspect(
        &mut Cursor::new(data),
        &mail_policy(),
        &InspectionLimits::default(),
    );
    assert_eq!(report.verdict, Verdict::RejectBlacklisted);
    assert_eq!(report.format, Some("tar"));
    assert_eq!(report.location(), "inner.zip > payload.JS");
    assert_eq!(
        report.reason,
        Some(RejectReason::BlacklistedExtension {
            entry: "payload.JS".into(),
            extension: ".js".into(),
        })
    );
}

#[test]
fn test_plain_text_admitted_unrecognised() {
    let report = inspect(
        &mut Cursor::new(b"hello".to_vec()),
        &mail_policy(),
        &InspectionLimits::default(),
    );
    assert_eq!(report.verdict, Verdict::Admit);
    assert_eq!(report.format, None);
    assert_eq!(report.stats.entries_inspected, 0);
}

#[test]
fn test_rar_with_pdf_inside_tar_admitted() {
    for rar in [
        RarTestBuilder::rar4().add_file("doc.pdf", b"%PDF-1.4").build(),
        RarTestBuilder::rar5().add_file("doc.pdf", b"%PDF-1.4").build(),
    ] {
        let data = create_test_tar(vec![("docs.rar", &rar)]);
        let report = inspect(
            &mut Cursor::new(data),
            &mail_policy(),
            &InspectionLimits::default(),
        );
        assert_eq!(report.verdict, Verdict::Admit);
        assert_eq!(report.stats.archives_walked, 2);
        assert_eq!(report.stats.entries_inspected, 2);
    }
}

#[test]
fn test_nested_zip_bomb_rejected_at_depth_cap() {
    let mut data = create_test_zip(vec![]);
    for level in 0..63 {
        let name = format!("layer{level}.zip");
        data = create_test_zip(vec![(name.as_str(), data.as_slice())]);
    }

    let report = inspect(
        &mut Cursor::new(data),
        &mail_policy(),
        &InspectionLimits::default(),
    );
    assert_eq!(report.verdict, Verdict::RejectBlacklisted);
    assert_eq!(
        report.reason,
        Some(RejectReason::DepthExceeded { depth: 9, max: 8 })
    );
    assert_eq!(report.entry_path.len(), 9);
}

// ============================================================================
// Boundaries
// ============================================================================

#[test]
fn test_empty_stream_admitted() {
    let report = inspect(
        &mut Cursor::new(Vec::new()),
        &mail_policy(),
        &InspectionLimits::default(),
    );
    assert_eq!(report.verdict, Verdict::Admit);
    assert_eq!(report.format, None);
}

#[test]
fn test_archives_with_zero_entries_admitted() {
    let policy = mail_policy();
    assert_eq!(verdict_of(create_test_tar(vec![]), &policy), Verdict::Admit);
    assert_eq!(verdict_of(create_test_zip(vec![]), &policy), Verdict::Admit);
    assert_eq!(verdict_of(RarTestBuilder::rar4().build(), &policy), Verdict::Admit);
    assert_eq!(verdict_of(RarTestBuilder::rar5().build(), &policy), Verdict::Admit);
}

#[test]
fn test_empty_name_has_empty_extension() {
    let data = TarTestBuilder::new().add_unnamed_file(b"nameless").build();
    assert_eq!(verdict_of(data.clone(), &mail_policy()), Verdict::Admit);

    let strict = ExtensionBlacklist::new([""]);
    assert_eq!(verdict_of(data, &strict), Verdict::RejectBlacklisted);
}

#[test]
fn test_trailing_dot_extension_is_dot() {
    let data = create_test_tar(vec![("notes.", b"text")]);
    let dot = ExtensionBlacklist::new(["."]);
    assert_eq!(verdict_of(data.clone(), &dot), Verdict::RejectBlacklisted);
    assert_eq!(verdict_of(data, &mail_policy()), Verdict::Admit);
}

#[test]
fn test_recursion_exactly_at_depth_cap_admitted() {
    // Three zip levels put the leaf body at depth 3.
    let data = create_nested_zip(3, ("payload.txt", b"hi"));
    let policy = mail_policy();

    let at_cap = InspectionLimits::default().with_max_depth(3);
    let verdict = evaluate(&mut Cursor::new(data.clone()), &policy, &at_cap);
    assert_eq!(verdict, Verdict::Admit);

    let below = InspectionLimits::default().with_max_depth(2);
    let verdict = evaluate(&mut Cursor::new(data), &policy, &below);
    assert_eq!(verdict, Verdict::RejectBlacklisted);
}

#[test]
fn test_blacklisted_name_found_at_depth() {
    let data = create_nested_zip(5, ("deep.scr", b"x"));
    let report = inspect(
        &mut Cursor::new(data),
        &mail_policy(),
        &InspectionLimits::default(),
    );
    assert_eq!(report.verdict, Verdict::RejectBlacklisted);
    assert_eq!(
        report.location(),
        "level4.zip > level3.zip > level2.zip > level1.zip > deep.scr"
    );
}

// ============================================================================
// Resource caps
// ============================================================================

#[test]
fn test_oversized_entry_skipped_not_rejected() {
    let inner = create_test_zip(vec![("tool.exe", b"MZ")]);
    let data = create_test_tar(vec![("inner.zip", &inner)]);
    let limits = InspectionLimits::default().with_max_entry_bytes(16);

    let report = inspect(&mut Cursor::new(data), &mail_policy(), &limits);
    assert_eq!(report.verdict, Verdict::Admit);
    assert_eq!(report.stats.entries_skipped, 1);
}

#[test]
fn test_total_byte_budget_rejects() {
    let data = create_test_tar(vec![
        ("a.txt", &[b'a'; 600]),
        ("b.txt", &[b'b'; 600]),
    ]);
    let limits = InspectionLimits::default().with_max_total_bytes(Some(1000));

    let report = inspect(&mut Cursor::new(data), &mail_policy(), &limits);
    assert_eq!(report.verdict, Verdict::RejectBlacklisted);
    assert!(matches!(
        report.reason,
        Some(RejectReason::BudgetExceeded { .. })
    ));
    assert_eq!(report.location(), "b.txt");
}

// ============================================================================
// Format handling
// ============================================================================

#[test]
fn test_name_checked_before_unreadable_body_skipped() {
    let data = RarTestBuilder::rar5()
        .add_encrypted("notes.txt", b"ciphertext")
        .add_encrypted("run.bat", b"ciphertext")
        .build();
    let report = inspect(
        &mut Cursor::new(data),
        &mail_policy(),
        &InspectionLimits::default(),
    );
    assert_eq!(report.verdict, Verdict::RejectBlacklisted);
    assert_eq!(report.location(), "run.bat");
    assert_eq!(report.stats.entries_skipped, 1);
}

#[test]
fn test_compressed_rar_entry_recursed_into() {
    let inner = create_test_tar(vec![("setup.exe", b"MZ")]);
    for builder in [RarTestBuilder::rar4(), RarTestBuilder::rar5()] {
        let data = builder
            .add_compressed("readme.txt", b"hello")
            .add_compressed("inner.tar", &inner)
            .build();
        let report = inspect(
            &mut Cursor::new(data),
            &mail_policy(),
            &InspectionLimits::default(),
        );
        assert_eq!(report.verdict, Verdict::RejectBlacklisted);
        assert_eq!(report.location(), "inner.tar > setup.exe");
    }
}

#[test]
fn test_archive_behind_executable_stub_rejected() {
    let mut stub = b"MZ".to_vec();
    stub.resize(64, 0);

    for archive in [
        create_test_zip(vec![("setup.exe", b"MZ")]),
        RarTestBuilder::rar4().add_file("setup.exe", b"MZ").build(),
        RarTestBuilder::rar5().add_file("setup.exe", b"MZ").build(),
    ] {
        let mut data = stub.clone();
        data.extend(archive);
        assert_eq!(verdict_of(data, &mail_policy()), Verdict::RejectBlacklisted);
    }
}

#[test]
fn test_corrupt_tar_tail_does_not_hide_earlier_hit() {
    let mut data = TarTestBuilder::new()
        .add_file("a.txt", b"fine")
        .add_file("b.cmd", b"@echo off")
        .build_unterminated();
    data.extend_from_slice(&[0x55; 512]);
    assert_eq!(verdict_of(data, &mail_policy()), Verdict::RejectBlacklisted);
}

#[test]
fn test_truncated_zip_admitted() {
    let mut data = create_test_zip(vec![("a.exe", b"MZ")]);
    // Without the end-of-central-directory record no walker recognises it.
    data.truncate(data.len() - 22);
    let report = inspect(
        &mut Cursor::new(data),
        &mail_policy(),
        &InspectionLimits::default(),
    );
    assert_eq!(report.verdict, Verdict::Admit);
}

#[test]
fn test_gzip_only_walked_when_registered() {
    let tar = create_test_tar(vec![("install.msi", b"MSI")]);
    let data = create_test_gzip(Some("bundle.tar"), &tar);
    let policy = mail_policy();
    let limits = InspectionLimits::default();

    let canonical = Dispatcher::new().evaluate(&mut Cursor::new(data.clone()), &policy, &limits);
    assert_eq!(canonical, Verdict::Admit);

    let with_gzip = Dispatcher::builder().with_gzip().build();
    let report = with_gzip.inspect(&mut Cursor::new(data), &policy, &limits);
    assert_eq!(report.verdict, Verdict::RejectBlacklisted);
    assert_eq!(report.format, Some("gzip"));
    assert_eq!(report.location(), "bundle.tar > install.msi");
}

#[test]
fn test_permissive_policy_admits_everything() {
    let inner = create_test_zip(vec![("x.exe", b"MZ")]);
    let data = create_test_tar(vec![("inner.zip", &inner), ("run.js", b"1")]);
    let verdict = evaluate(
        &mut Cursor::new(data),
        &AllowAll,
        &InspectionLimits::default(),
    );
    assert_eq!(verdict, Verdict::Admit);
}
