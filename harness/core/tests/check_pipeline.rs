// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! End-to-end pipeline runs against a mocked portal and a tempdir mirror.
//!
//! The fixture format is `txt`: gzip is expected and there is no
//! format-level validator, so the whole pipeline exercises without the
//! external tools installed.

use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::json;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use checkfiles_core::application::check_service::{CheckService, JobIntake};
use checkfiles_core::application::poller::{Poller, RunOptions};
use checkfiles_core::domain::config::ConfigManifest;
use checkfiles_core::infrastructure::report_file::RunReports;
use checkfiles_core::infrastructure::slack::NoopNotifier;
use checkfiles_portal::PortalClient;

const ACCESSION: &str = "TSTFF00001";
const FILE_ID: &str = "/files/TSTFF00001/";
const PAYLOAD: &[u8] = b"some tab separated payload\n";
// md5 of PAYLOAD
const CONTENT_MD5: &str = "a3ec84b10a7879e9d76b6b8e7c904ae0";

fn write_fixture(mirror: &Path) -> (std::path::PathBuf, String) {
    let dir = mirror.join("bucket");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(format!("{ACCESSION}.txt.gz"));
    let file = std::fs::File::create(&path).unwrap();
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(PAYLOAD).unwrap();
    encoder.finish().unwrap();
    let bytes = std::fs::read(&path).unwrap();
    let digest = {
        use md5::{Digest, Md5};
        let mut hasher = Md5::new();
        hasher.update(&bytes);
        hex::encode(hasher.finalize())
    };
    (path, digest)
}

struct Fixture {
    server: mockito::ServerGuard,
    manifest: ConfigManifest,
    _mirror: tempfile::TempDir,
}

async fn fixture(item_md5: Option<&str>, upload_file: bool) -> Fixture {
    let mut server = mockito::Server::new_async().await;
    let mirror = tempfile::tempdir().unwrap();
    let gz_md5 = if upload_file {
        let (_path, digest) = write_fixture(mirror.path());
        digest
    } else {
        String::new()
    };
    let item_md5 = item_md5.map(str::to_owned).unwrap_or(gz_md5);

    server
        .mock(
            "GET",
            "/search/?field=@id&limit=all&type=File&status=uploading",
        )
        .with_body(json!({"@graph": [{"@id": FILE_ID}]}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/files/TSTFF00001/@@upload?datastore=database")
        .with_body(
            json!({"@graph": [{"upload_credentials": {
                "upload_url": format!("s3://bucket/{ACCESSION}.txt.gz"),
                "expiration": "2000-01-01T00:00:00.000000Z",
            }}]})
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("GET", "/files/TSTFF00001/?frame=edit&datastore=database")
        .with_header("etag", "\"etag-1\"")
        .with_body(
            json!({
                "@id": FILE_ID,
                "accession": ACCESSION,
                "file_format": "txt",
                "md5sum": item_md5,
                "status": "uploading",
                "s3_uri": format!("s3://bucket/{ACCESSION}.txt.gz"),
                "lab": "/labs/some-lab/",
            })
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock(
            "GET",
            format!(
                "/search/?type=File&status!=replaced&datastore=database&content_md5sum={CONTENT_MD5}"
            )
            .as_str(),
        )
        .with_body(json!({"@graph": []}).to_string())
        .create_async()
        .await;

    let mut manifest = ConfigManifest::default();
    manifest.spec.portal.url = server.url();
    manifest.spec.checks.mirror = mirror.path().to_owned();
    manifest.spec.checks.workers = Some(1);

    Fixture {
        server,
        manifest,
        _mirror: mirror,
    }
}

fn poller(fixture: &Fixture) -> Poller {
    let portal = Arc::new(
        PortalClient::new(fixture.manifest.spec.portal.url.clone(), "key", "secret").unwrap(),
    );
    let service = Arc::new(CheckService::new(
        portal,
        fixture.manifest.spec.checks.clone(),
    ));
    Poller::new(service, Arc::new(NoopNotifier), fixture.manifest.clone())
}

fn options(dry_run: bool) -> RunOptions {
    RunOptions {
        intake: JobIntake::Query("status=uploading".to_owned()),
        include_unexpired_upload: false,
        dry_run,
        json_out: false,
    }
}

#[tokio::test]
async fn clean_file_is_patched_to_in_progress() {
    let mut fixture = fixture(None, true).await;
    let patch = fixture
        .server
        .mock("PATCH", "/files/TSTFF00001/")
        .match_header("if-match", "\"etag-1\"")
        .match_body(mockito::Matcher::PartialJson(json!({
            "status": "in progress",
            "content_md5sum": CONTENT_MD5,
        })))
        .with_body("{}")
        .create_async()
        .await;

    let poller = poller(&fixture);
    let out_dir = tempfile::tempdir().unwrap();
    let out_path = out_dir.path().join("out.log");
    let err_path = out_dir.path().join("err.log");
    let mut reports = RunReports::from_paths(Some(&out_path), Some(&err_path)).unwrap();

    let summary = poller.run_batch(&mut reports, &options(false)).await.unwrap();
    assert_eq!(summary.checked, 1);
    assert_eq!(summary.errored, 0);
    assert_eq!(summary.patched, 1);
    patch.assert_async().await;

    let out = std::fs::read_to_string(&out_path).unwrap();
    assert!(out.contains("STARTING Checkfiles"));
    assert!(out.contains(ACCESSION));
    assert!(out.contains("FINISHED Checkfiles"));
    let err = std::fs::read_to_string(&err_path).unwrap();
    assert!(err.is_empty());
}

#[tokio::test]
async fn md5_mismatch_is_a_content_error() {
    let mut fixture = fixture(Some("00000000000000000000000000000000"), true).await;
    let patch = fixture
        .server
        .mock("PATCH", "/files/TSTFF00001/")
        .match_body(mockito::Matcher::PartialJson(json!({
            "status": "content error",
        })))
        .with_body("{}")
        .create_async()
        .await;

    let poller = poller(&fixture);
    let out_dir = tempfile::tempdir().unwrap();
    let out_path = out_dir.path().join("out.log");
    let err_path = out_dir.path().join("err.log");
    let mut reports = RunReports::from_paths(Some(&out_path), Some(&err_path)).unwrap();

    let summary = poller.run_batch(&mut reports, &options(false)).await.unwrap();
    assert_eq!(summary.errored, 1);
    patch.assert_async().await;

    let err = std::fs::read_to_string(&err_path).unwrap();
    assert!(err.contains("md5sum"));
    assert!(err.contains("does not match"));
}

#[tokio::test]
async fn missing_upload_is_marked_upload_failed() {
    let mut fixture = fixture(Some("00000000000000000000000000000000"), false).await;
    let patch = fixture
        .server
        .mock("PATCH", "/files/TSTFF00001/")
        .match_body(mockito::Matcher::PartialJson(json!({
            "status": "upload failed",
        })))
        .with_body("{}")
        .create_async()
        .await;

    let poller = poller(&fixture);
    let out_dir = tempfile::tempdir().unwrap();
    let out_path = out_dir.path().join("out.log");
    let mut reports = RunReports::from_paths(Some(&out_path), None).unwrap();

    let summary = poller.run_batch(&mut reports, &options(false)).await.unwrap();
    assert_eq!(summary.errored, 1);
    patch.assert_async().await;
}

#[tokio::test]
async fn dry_run_never_patches() {
    let mut fixture = fixture(None, true).await;
    let patch = fixture
        .server
        .mock("PATCH", "/files/TSTFF00001/")
        .expect(0)
        .create_async()
        .await;

    let poller = poller(&fixture);
    let out_dir = tempfile::tempdir().unwrap();
    let out_path = out_dir.path().join("out.log");
    let mut reports = RunReports::from_paths(Some(&out_path), None).unwrap();

    let summary = poller.run_batch(&mut reports, &options(true)).await.unwrap();
    assert_eq!(summary.checked, 1);
    assert_eq!(summary.patched, 0);
    patch.assert_async().await;
}
