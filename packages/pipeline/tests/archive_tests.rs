mod common;

use std::fs::File;

use pretty_assertions::assert_eq;

use ftclaw_harvester::LawRecord;
use ftclaw_pipeline::archive::Archiver;
use ftclaw_pipeline::services::JobServices;

use common::{collect, linked, start, unlinked, wait_idle, FakeServices};

const DETAIL_URL: &str = "https://www.law.go.kr/법령/하도급법";
const FRAME_URL: &str = "https://www.law.go.kr/LSW/lsInfoP.do?lsiSeq=1";

fn detail_page() -> String {
    r#"<html><body><iframe id="lawService" src="/LSW/lsInfoP.do?lsiSeq=1"></iframe></body></html>"#
        .to_string()
}

fn frame_page() -> String {
    let article = "제1조(목적) 이 법은 공정한 하도급거래질서를 확립하여 원사업자와 수급사업자가 대등한 지위에서 상호보완하며 균형 있게 발전할 수 있도록 한다. ";
    format!(
        r#"<html><body><div id="conScroll"><a href="javascript:lsHstryInfoP()">연혁</a><p>{}</p></div></body></html>"#,
        article.repeat(8)
    )
}

fn dated_record() -> LawRecord {
    let mut dated = linked("하도급법", "하도급거래 공정화에 관한 법률", DETAIL_URL);
    dated.effective_date = "2025. 1. 1.".to_string();
    dated
}

fn services() -> FakeServices {
    let dated = dated_record();
    FakeServices::default()
        .with_listing(
            1,
            vec![
                dated,
                unlinked("하도급법", "하도급 고시"),
                linked("하도급법", "시행령", "https://www.law.go.kr/법령/없음"),
            ],
        )
        .with_page(DETAIL_URL, &detail_page())
        .with_page(FRAME_URL, &frame_page())
}

#[tokio::test]
async fn test_archive_bundles_default_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let handle = start(tmp.path(), services());
    collect(&handle, "1").await;

    handle.start_archive(None).await.unwrap();
    let status = wait_idle(&handle).await;
    assert_eq!(status.progress, 3);
    assert_eq!(status.total, 3);
    assert_eq!(status.current_label, "PDF 저장 완료! 다운로드 버튼을 클릭하세요.");

    let archive = handle.archive_status().await.unwrap();
    assert!(archive.has_bundle);
    let bundle_name = archive.bundle_filename.unwrap();
    assert!(bundle_name.starts_with("FTC_Laws_PDF_"));
    assert!(bundle_name.ends_with(".zip"));

    let bundle = handle.archive_path().await.unwrap().unwrap();
    let mut zip = zip::ZipArchive::new(File::open(bundle).unwrap()).unwrap();
    let files: Vec<String> = zip
        .file_names()
        .filter(|name| !name.ends_with('/'))
        .map(String::from)
        .collect();
    assert_eq!(
        files,
        vec!["하도급법/하도급거래 공정화에 관한 법률_2025. 1. 1..pdf".to_string()]
    );

    let mut pdf = zip
        .by_name("하도급법/하도급거래 공정화에 관한 법률_2025. 1. 1..pdf")
        .unwrap();
    let mut content = String::new();
    std::io::Read::read_to_string(&mut pdf, &mut content).unwrap();
    assert_eq!(content, "%PDF-1.4 html");
}

#[tokio::test]
async fn test_archive_into_directory_under_output_skips_bundle() {
    let tmp = tempfile::tempdir().unwrap();
    let target = tmp.path().join("chosen");
    let handle = start(tmp.path(), services());
    collect(&handle, "1").await;

    handle.start_archive(Some(target.clone())).await.unwrap();
    let status = wait_idle(&handle).await;
    assert_eq!(
        status.current_label,
        format!("PDF 저장 완료! (위치: {})", target.display())
    );

    assert!(target
        .join("하도급법")
        .join("하도급거래 공정화에 관한 법률_2025. 1. 1..pdf")
        .is_file());
    assert!(!handle.archive_status().await.unwrap().has_bundle);

    let zips = std::fs::read_dir(tmp.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "zip"))
        .count();
    assert_eq!(zips, 0);
}

#[tokio::test]
async fn test_unusable_target_falls_back_to_default() {
    let tmp = tempfile::tempdir().unwrap();
    let blocker = tmp.path().join("not-a-dir");
    std::fs::write(&blocker, "x").unwrap();

    let handle = start(tmp.path(), services());
    collect(&handle, "1").await;

    handle.start_archive(Some(blocker.join("pdf"))).await.unwrap();
    let status = wait_idle(&handle).await;
    assert_eq!(status.current_label, "PDF 저장 완료! 다운로드 버튼을 클릭하세요.");
    assert!(handle.archive_status().await.unwrap().has_bundle);
}

#[tokio::test]
async fn test_new_archive_clears_previous_bundle() {
    let tmp = tempfile::tempdir().unwrap();
    let handle = start(tmp.path(), services());
    collect(&handle, "1").await;

    handle.start_archive(None).await.unwrap();
    wait_idle(&handle).await;
    assert!(handle.archive_status().await.unwrap().has_bundle);

    handle
        .start_archive(Some(tmp.path().join("elsewhere")))
        .await
        .unwrap();
    wait_idle(&handle).await;
    assert!(!handle.archive_status().await.unwrap().has_bundle);
}

#[tokio::test]
async fn test_archive_ignores_directory_outside_output() {
    let tmp = tempfile::tempdir().unwrap();
    let elsewhere = tempfile::tempdir().unwrap();
    let outside = elsewhere.path().join("outside").join("deep");
    let handle = start(tmp.path(), services());
    collect(&handle, "1").await;

    handle.start_archive(Some(outside)).await.unwrap();
    let status = wait_idle(&handle).await;
    assert_eq!(status.current_label, "PDF 저장 완료! 다운로드 버튼을 클릭하세요.");
    assert!(handle.archive_status().await.unwrap().has_bundle);
    assert!(!elsewhere.path().join("outside").exists());
}

#[test]
fn test_unlinked_records_are_skipped_not_failed() {
    let tmp = tempfile::tempdir().unwrap();
    let session = services().browser().unwrap();
    let archiver = Archiver::new(session, tmp.path()).with_pause(std::time::Duration::ZERO);

    let records = vec![
        dated_record(),
        unlinked("하도급법", "하도급 고시"),
        linked("하도급법", "시행령", "https://www.law.go.kr/법령/없음"),
    ];
    let mut calls = Vec::new();
    let report = archiver
        .run(&records, None, |done, _| calls.push(done))
        .unwrap();

    assert_eq!(report.saved, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 1);
    assert!(!report.requested_destination);
    assert!(report.bundle.unwrap().is_file());
    assert_eq!(calls, vec![0, 1, 1, 2, 2, 3]);
}
