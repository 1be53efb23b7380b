// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Audit services against a mocked portal.

use serde_json::json;
use std::sync::Arc;

use checkfiles_core::application::experiment_audit::{
    ExperimentAuditService, ExperimentIntake,
};
use checkfiles_core::application::md5_audit::Md5AuditService;
use checkfiles_core::infrastructure::report_file::{ReportSink, RunReports};
use checkfiles_core::infrastructure::slack::NoopNotifier;
use checkfiles_portal::PortalClient;

fn portal(server: &mockito::ServerGuard) -> Arc<PortalClient> {
    Arc::new(PortalClient::new(server.url(), "key", "secret").unwrap())
}

async fn mock_experiment(server: &mut mockito::ServerGuard, read_count: u64) {
    server
        .mock(
            "GET",
            "/search/?type=Experiment&format=json&frame=object&limit=all&status=proposed&status=started",
        )
        .with_body(
            json!({"@graph": [{
                "@id": "/experiments/TSTSR0001/",
                "accession": "TSTSR0001",
                "status": "started",
                "assay_term_name": "ChIP-seq",
                "award": "/awards/A1/",
                "replicates": ["/replicates/R1/"],
                "files": ["/files/F1/"],
            }]})
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("GET", "/awards/A1/?datastore=database&frame=object&format=json")
        .with_body(json!({"rfa": "ENCODE4"}).to_string())
        .create_async()
        .await;
    server
        .mock(
            "GET",
            "/replicates/R1/?datastore=database&frame=object&format=json",
        )
        .with_body(json!({"@id": "/replicates/R1/", "status": "released"}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/files/F1/?datastore=database&frame=object&format=json")
        .with_body(
            json!({
                "@id": "/files/F1/",
                "file_format": "fastq",
                "status": "released",
                "date_created": "2024-05-01T12:00:00.000000+00:00",
                "replicate": "/replicates/R1/",
                "read_count": read_count,
            })
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("GET", "/TSTSR0001?frame=page&format=json")
        .with_body(json!({"audit": {}}).to_string())
        .create_async()
        .await;
}

#[tokio::test]
async fn deep_experiment_is_ready_for_submission() {
    let mut server = mockito::Server::new_async().await;
    mock_experiment(&mut server, 25_000_000).await;

    let service = ExperimentAuditService::new(portal(&server), Arc::new(NoopNotifier));
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("out.log");
    let err_path = dir.path().join("err.log");
    let mut reports = RunReports::from_paths(Some(&out_path), Some(&err_path)).unwrap();

    let intake = ExperimentIntake::Query("status=proposed&status=started".to_owned());
    let summary = service.run(&mut reports, &intake, false).await.unwrap();
    assert_eq!(summary.experiments, 1);
    assert_eq!(summary.submitted, 1);
    assert_eq!(summary.depth_failures, 0);

    let out = std::fs::read_to_string(&out_path).unwrap();
    assert!(out.contains("ENCODE4\tTSTSR0001\tstarted\t-> submitted\t2024-05-01"));
}

#[tokio::test]
async fn shallow_replicate_fails_the_depth_floor() {
    let mut server = mockito::Server::new_async().await;
    mock_experiment(&mut server, 1_000).await;

    let service = ExperimentAuditService::new(portal(&server), Arc::new(NoopNotifier));
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("out.log");
    let err_path = dir.path().join("err.log");
    let mut reports = RunReports::from_paths(Some(&out_path), Some(&err_path)).unwrap();

    let intake = ExperimentIntake::Query("status=proposed&status=started".to_owned());
    let summary = service.run(&mut reports, &intake, false).await.unwrap();
    assert_eq!(summary.submitted, 0);
    assert_eq!(summary.depth_failures, 1);

    let err = std::fs::read_to_string(&err_path).unwrap();
    assert!(err.contains("reads_count=1000"));
    assert!(err.contains("expected count=20000000"));
}

#[tokio::test]
async fn md5_audit_patches_both_members_of_a_group() {
    let mut server = mockito::Server::new_async().await;
    let uuid_a = "11111111-1111-1111-1111-111111111111";
    let uuid_b = "22222222-2222-2222-2222-222222222222";
    server
        .mock(
            "GET",
            "/search/?type=File&field=external_accession&field=accession&field=uuid&field=status&field=md5sum&field=matching_md5sum&limit=all&format=json",
        )
        .with_body(
            json!({"@graph": [
                {"accession": "AAA111", "uuid": uuid_a, "status": "released", "md5sum": "feedface"},
                {"accession": "BBB222", "uuid": uuid_b, "status": "released", "md5sum": "feedface"},
                {"accession": "CCC333", "uuid": "33333333-3333-3333-3333-333333333333",
                 "status": "released", "md5sum": "0ddba11"},
                {"accession": "DDD444", "uuid": "44444444-4444-4444-4444-444444444444",
                 "status": "uploading", "md5sum": "feedface"},
            ]})
            .to_string(),
        )
        .create_async()
        .await;
    let patch_a = server
        .mock("PATCH", format!("/{uuid_a}").as_str())
        .match_body(mockito::Matcher::Json(json!({"matching_md5sum": [uuid_b]})))
        .with_body("{}")
        .create_async()
        .await;
    let patch_b = server
        .mock("PATCH", format!("/{uuid_b}").as_str())
        .match_body(mockito::Matcher::Json(json!({"matching_md5sum": [uuid_a]})))
        .with_body("{}")
        .create_async()
        .await;

    let service = Md5AuditService::new(portal(&server), Arc::new(NoopNotifier));
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("md5.log");
    let mut out = ReportSink::file(&out_path).unwrap();

    let summary = service.run(&mut out, false).await.unwrap();
    assert_eq!(summary.files_seen, 4);
    assert_eq!(summary.groups, 1);
    assert_eq!(summary.patched, 2);
    patch_a.assert_async().await;
    patch_b.assert_async().await;

    let log = std::fs::read_to_string(&out_path).unwrap();
    assert!(log.contains("md5:feedface"));
}

#[tokio::test]
async fn md5_audit_skips_groups_already_recorded() {
    let mut server = mockito::Server::new_async().await;
    let uuid_a = "11111111-1111-1111-1111-111111111111";
    let uuid_b = "22222222-2222-2222-2222-222222222222";
    server
        .mock("GET", mockito::Matcher::Regex("^/search/".to_owned()))
        .with_body(
            json!({"@graph": [
                {"accession": "AAA111", "uuid": uuid_a, "status": "released",
                 "md5sum": "feedface", "matching_md5sum": [format!("/files/{uuid_b}/")]},
                {"accession": "BBB222", "uuid": uuid_b, "status": "released",
                 "md5sum": "feedface", "matching_md5sum": ["/files/AAA111/"]},
            ]})
            .to_string(),
        )
        .create_async()
        .await;
    let patch = server
        .mock("PATCH", mockito::Matcher::Regex("^/".to_owned()))
        .expect(0)
        .create_async()
        .await;

    let service = Md5AuditService::new(portal(&server), Arc::new(NoopNotifier));
    let mut out = ReportSink::stdout();
    let summary = service.run(&mut out, false).await.unwrap();
    assert_eq!(summary.groups, 1);
    assert_eq!(summary.patched, 0);
    patch.assert_async().await;
}
