use crate::caller::USER_HEADER;
use crate::job_controller::job::test_job;
use crate::services::testing::TestContext;
use actix_web::http::{header, StatusCode};
use actix_web::{test, App};
use common::jobs::JobStatus;
use common::model::analysis::AnalysisSnapshot;
use common::model::history::HistoryPage;
use common::requests::{AnalyzeDocumentRequest, AnalyzeDocumentResponse, UpdateTitleRequest};
use std::collections::HashSet;
use std::time::Duration;

const PARAGRAPHS: [&str; 5] = [
    "The adviser will disclose every advisory fee to the client before the new advisory account is opened.",
    "Trades are executed only after the client confirms the order and all of its term0 conditions in writing.",
    "The firm shall disclose term1 conflicts of interest, including revenue sharing with affiliated brokers.",
    "Client assets are held by a qualified custodian and statements are sent to the client every quarter.",
    "Either party may end this agreement with thirty days prior written notice to the other party.",
];

fn document() -> String {
    PARAGRAPHS.join("\n\n")
}

fn analyze(text: &str, rule_set_id: i64, force_new: bool) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/compliance/analyze")
        .insert_header((USER_HEADER, "alice"))
        .set_json(AnalyzeDocumentRequest {
            document_text: text.to_string(),
            rule_set_id,
            effective_date: None,
            force_new,
        })
}

async fn wait_until_terminal(ctx: &TestContext, id: &str) -> AnalysisSnapshot {
    for _ in 0..500 {
        if let Some(snapshot) = ctx.jobs.snapshot(id).await {
            if snapshot.status.is_terminal() {
                return snapshot;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {id} did not finish");
}

#[actix_web::test]
async fn document_length_boundary_is_100_characters() {
    let ctx = TestContext::new();
    let rule_set = ctx.seed_rule_set("FINRA", 3);
    let app = test::init_service(App::new().configure(|cfg| ctx.configure(cfg))).await;

    let resp = test::call_service(&app, analyze(&"a".repeat(99), rule_set, false).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(&app, analyze(&"a".repeat(100), rule_set, false).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn unknown_or_inactive_rule_set_is_rejected() {
    let ctx = TestContext::new();
    let retired = ctx.seed_rule_set("Retired", 1);
    ctx.db.deactivate_rule_set(retired).unwrap();
    let app = test::init_service(App::new().configure(|cfg| ctx.configure(cfg))).await;

    for id in [retired, 999] {
        let resp = test::call_service(&app, analyze(&document(), id, false).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}

#[actix_web::test]
async fn submitted_job_runs_to_completion() {
    let ctx = TestContext::new();
    let rule_set = ctx.seed_rule_set("FINRA", 10);
    let app = test::init_service(App::new().configure(|cfg| ctx.configure(cfg))).await;

    let text = document();
    assert!(text.chars().count() >= 500);
    let submitted: AnalyzeDocumentResponse =
        test::call_and_read_body_json(&app, analyze(&text, rule_set, false).to_request()).await;
    assert_eq!(submitted.status, JobStatus::Queued);

    let mut processed = Vec::new();
    let snapshot = loop {
        let req = test::TestRequest::get()
            .uri(&format!("/api/compliance/results/{}", submitted.session_id))
            .to_request();
        let snapshot: AnalysisSnapshot = test::call_and_read_body_json(&app, req).await;
        processed.push(snapshot.paragraphs_processed);
        if snapshot.status.is_terminal() {
            break snapshot;
        }
        assert!(processed.len() < 500, "job never finished");
        tokio::time::sleep(Duration::from_millis(5)).await;
    };

    assert!(processed.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.total_paragraphs, PARAGRAPHS.len());
    assert_eq!(snapshot.paragraphs_processed, snapshot.total_paragraphs);
    assert_eq!(snapshot.progress_percentage, 100.0);
    let indices: HashSet<usize> = snapshot.paragraphs.iter().map(|p| p.index).collect();
    assert_eq!(indices.len(), snapshot.paragraphs.len());
    assert!(indices.iter().all(|i| *i < snapshot.total_paragraphs));
    assert!(snapshot.completed_at.is_some());
    assert!(snapshot.issues_count() > 0);
}

#[actix_web::test]
async fn unknown_session_is_not_found() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().configure(|cfg| ctx.configure(cfg))).await;

    for req in [
        test::TestRequest::get().uri("/api/compliance/results/nope"),
        test::TestRequest::post().uri("/api/compliance/analysis/nope/stop"),
        test::TestRequest::get().uri("/api/compliance/results/nope/export/json"),
        test::TestRequest::delete().uri("/api/compliance/history/nope"),
    ] {
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}

#[actix_web::test]
async fn stop_is_idempotent() {
    let ctx = TestContext::new();
    ctx.jobs.insert(test_job("queued", "alice", "doc")).await;
    let app = test::init_service(App::new().configure(|cfg| ctx.configure(cfg))).await;

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/api/compliance/analysis/queued/stop")
            .insert_header((USER_HEADER, "alice"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
    let snapshot = ctx.jobs.snapshot("queued").await.unwrap();
    assert_eq!(snapshot.status, JobStatus::Stopped);
    assert!(snapshot.completed_at.is_some());
}

#[actix_web::test]
async fn only_the_submitter_can_stop_a_job() {
    let ctx = TestContext::new();
    ctx.jobs.insert(test_job("alices", "alice", "doc")).await;
    let app = test::init_service(App::new().configure(|cfg| ctx.configure(cfg))).await;

    for user in [Some("bob"), None] {
        let mut req = test::TestRequest::post().uri("/api/compliance/analysis/alices/stop");
        if let Some(user) = user {
            req = req.insert_header((USER_HEADER, user));
        }
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
    let snapshot = ctx.jobs.snapshot("alices").await.unwrap();
    assert_eq!(snapshot.status, JobStatus::Queued);
    assert!(!ctx.jobs.jobs.read().await["alices"].cancel.is_cancelled());

    let req = test::TestRequest::post()
        .uri("/api/compliance/analysis/alices/stop")
        .insert_header((USER_HEADER, "alice"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    assert_eq!(
        ctx.jobs.snapshot("alices").await.unwrap().status,
        JobStatus::Stopped
    );
}

#[actix_web::test]
async fn export_requires_a_completed_analysis() {
    let ctx = TestContext::new();
    let rule_set = ctx.seed_rule_set("FINRA", 4);
    ctx.jobs.insert(test_job("pending", "alice", "doc")).await;
    let app = test::init_service(App::new().configure(|cfg| ctx.configure(cfg))).await;

    let req = test::TestRequest::get()
        .uri("/api/compliance/results/pending/export/json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let submitted: AnalyzeDocumentResponse =
        test::call_and_read_body_json(&app, analyze(&document(), rule_set, false).to_request())
            .await;
    wait_until_terminal(&ctx, &submitted.session_id).await;

    for format in ["json", "csv"] {
        let req = test::TestRequest::get()
            .uri(&format!(
                "/api/compliance/results/{}/export/{}",
                submitted.session_id, format
            ))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let disposition = resp
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=compliance_analysis_"));
        assert!(disposition.ends_with(&format!(".{format}")));
        let body = test::read_body(resp).await;
        assert!(!body.is_empty());
    }

    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/compliance/results/{}/export/docx",
            submitted.session_id
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn pdf_export_without_fonts_hides_the_cause() {
    let fonts = tempfile::tempdir().unwrap();
    let mut ctx = TestContext::new();
    ctx.config.fonts_dir = fonts.path().to_path_buf();
    let rule_set = ctx.seed_rule_set("FINRA", 2);
    let app = test::init_service(App::new().configure(|cfg| ctx.configure(cfg))).await;

    let submitted: AnalyzeDocumentResponse =
        test::call_and_read_body_json(&app, analyze(&document(), rule_set, false).to_request())
            .await;
    wait_until_terminal(&ctx, &submitted.session_id).await;

    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/compliance/results/{}/export/pdf",
            submitted.session_id
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Internal server error");
}

#[actix_web::test]
async fn unknown_session_wins_over_bad_format() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().configure(|cfg| ctx.configure(cfg))).await;

    let req = test::TestRequest::get()
        .uri("/api/compliance/results/nope/export/docx")
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_web::test]
async fn identical_submission_reuses_completed_job() {
    let ctx = TestContext::new();
    let rule_set = ctx.seed_rule_set("FINRA", 2);
    let app = test::init_service(App::new().configure(|cfg| ctx.configure(cfg))).await;

    let first: AnalyzeDocumentResponse =
        test::call_and_read_body_json(&app, analyze(&document(), rule_set, false).to_request())
            .await;
    wait_until_terminal(&ctx, &first.session_id).await;

    let again: AnalyzeDocumentResponse =
        test::call_and_read_body_json(&app, analyze(&document(), rule_set, false).to_request())
            .await;
    assert_eq!(again.session_id, first.session_id);
    assert_eq!(again.status, JobStatus::Completed);

    let forced: AnalyzeDocumentResponse =
        test::call_and_read_body_json(&app, analyze(&document(), rule_set, true).to_request())
            .await;
    assert_ne!(forced.session_id, first.session_id);
    assert_eq!(forced.status, JobStatus::Queued);
}

#[actix_web::test]
async fn history_is_scoped_to_the_caller() {
    let ctx = TestContext::new();
    ctx.jobs.insert(test_job("a1", "alice", "Alice's first memo")).await;
    ctx.jobs.insert(test_job("b1", "bob", "Bob's memo")).await;
    let app = test::init_service(App::new().configure(|cfg| ctx.configure(cfg))).await;

    let req = test::TestRequest::get()
        .uri("/api/compliance/history?limit=10")
        .insert_header((USER_HEADER, "alice"))
        .to_request();
    let page: HistoryPage = test::call_and_read_body_json(&app, req).await;
    assert_eq!(page.total, 1);
    assert_eq!(page.analyses[0].session_id, "a1");

    let req = test::TestRequest::patch()
        .uri("/api/compliance/history/a1")
        .insert_header((USER_HEADER, "alice"))
        .set_json(UpdateTitleRequest {
            title: "   ".to_string(),
        })
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::BAD_REQUEST
    );

    let req = test::TestRequest::patch()
        .uri("/api/compliance/history/b1")
        .insert_header((USER_HEADER, "alice"))
        .set_json(UpdateTitleRequest {
            title: "Not mine".to_string(),
        })
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );

    let req = test::TestRequest::delete()
        .uri("/api/compliance/history/a1")
        .insert_header((USER_HEADER, "alice"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    assert!(!ctx.jobs.contains("a1").await);
    assert!(ctx.jobs.contains("b1").await);
}
