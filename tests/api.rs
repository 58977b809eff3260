//! End-to-end tests through the full router.

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::TempDir;

use hifz_exam::{build_router, db, state::AppState};

struct TestApp {
  server: TestServer,
  _temp: TempDir,
}

fn app() -> TestApp {
  let temp = TempDir::new().unwrap();
  let pool = db::init_db(&temp.path().join("exams.db")).unwrap();
  let mut server = TestServer::new(build_router(AppState::new(pool))).unwrap();
  server.save_cookies();
  TestApp { server, _temp: temp }
}

async fn register(server: &TestServer, username: &str) -> Value {
  let response = server
    .post("/api/auth/register")
    .json(&json!({ "username": username, "password": "correct horse" }))
    .await;
  response.assert_status(StatusCode::CREATED);
  response.json()
}

async fn login(server: &TestServer, username: &str) {
  server
    .post("/api/auth/login")
    .json(&json!({ "username": username, "password": "correct horse" }))
    .await
    .assert_status_ok();
}

fn question(text: &str, juz: i64, kind: &str) -> Value {
  json!({
    "text": text,
    "options": [format!("{} a", text), format!("{} b", text), format!("{} c", text), format!("{} d", text)],
    "correctOption": 2,
    "juz": juz,
    "year": 1402,
    "kind": kind,
  })
}

/// Enough questions in juz 1 for one official unit (2 memorization, 3 concepts)
fn unit_batch(juz: i64) -> Vec<Value> {
  let mut batch = Vec::new();
  for i in 0..2 {
    batch.push(question(&format!("juz {} memorization {}", juz, i), juz, "memorization"));
  }
  for i in 0..3 {
    batch.push(question(&format!("juz {} concepts {}", juz, i), juz, "concepts"));
  }
  batch
}

#[tokio::test]
async fn test_first_user_is_admin_and_later_users_are_students() {
  let TestApp { server, _temp } = app();

  let admin = register(&server, "admin").await;
  assert_eq!(admin["role"], "admin");

  let student = register(&server, "student").await;
  assert_eq!(student["role"], "student");

  let me: Value = server.get("/api/auth/me").await.json();
  assert_eq!(me["username"], "student");
}

#[tokio::test]
async fn test_requests_without_session_are_unauthorized() {
  let TestApp { server, _temp } = app();
  let response = server.get("/api/dashboard").await;
  response.assert_status(StatusCode::UNAUTHORIZED);
  let body: Value = response.json();
  assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_student_cannot_manage_question_bank() {
  let TestApp { server, _temp } = app();
  register(&server, "admin").await;
  register(&server, "student").await;

  server
    .post("/api/questions")
    .json(&question("q", 1, "memorization"))
    .await
    .assert_status(StatusCode::FORBIDDEN);
  server.get("/api/admin/users").await.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_creates_question_and_duplicate_conflicts() {
  let TestApp { server, _temp } = app();
  register(&server, "admin").await;

  let response = server.post("/api/questions").json(&question("first", 1, "memorization")).await;
  response.assert_status(StatusCode::CREATED);
  let created: Value = response.json();
  assert_eq!(created["juz"], 1);

  server
    .post("/api/questions")
    .json(&question("first", 1, "memorization"))
    .await
    .assert_status(StatusCode::CONFLICT);

  let mut same_text = question("first", 2, "concepts");
  same_text["options"][0] = json!("another option");
  server
    .post("/api/questions")
    .json(&same_text)
    .await
    .assert_status(StatusCode::CONFLICT);

  let id = created["id"].as_i64().unwrap();
  server
    .delete(&format!("/api/questions/{}", id))
    .await
    .assert_status(StatusCode::NO_CONTENT);
  let listed: Value = server.get("/api/questions").await.json();
  assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn test_import_reports_duplicates() {
  let TestApp { server, _temp } = app();
  register(&server, "admin").await;

  let batch = unit_batch(1);
  let summary: Value = server
    .post("/api/questions/import")
    .json(&json!({ "questions": batch }))
    .await
    .json();
  assert_eq!(summary["inserted"], 5);

  let summary: Value = server
    .post("/api/questions/import")
    .json(&json!({ "questions": unit_batch(1) }))
    .await
    .json();
  assert_eq!(summary["inserted"], 0);
  assert_eq!(summary["duplicates"], 5);
}

#[tokio::test]
async fn test_parse_uploaded_text_document() {
  let TestApp { server, _temp } = app();
  register(&server, "admin").await;

  let document = "1. first question\nالف) one\nب) two\nج) three\nد) four\nپاسخ: ب\n";
  let form = MultipartForm::new().add_part(
    "file",
    Part::bytes(document.as_bytes().to_vec()).file_name("questions.txt"),
  );
  let response = server.post("/api/questions/parse").multipart(form).await;
  response.assert_status_ok();
  let preview: Value = response.json();
  assert_eq!(preview["count"], 1);
  assert_eq!(preview["questions"][0]["correctOption"], 2);
}

#[tokio::test]
async fn test_custom_exam_attempt_flow() {
  let TestApp { server, _temp } = app();
  register(&server, "admin").await;
  server
    .post("/api/questions/import")
    .json(&json!({ "questions": unit_batch(1) }))
    .await
    .assert_status_ok();

  let response = server
    .post("/api/exams")
    .json(&json!({ "juzStart": 1, "juzEnd": 1, "questionCount": 3, "random": false }))
    .await;
  response.assert_status(StatusCode::CREATED);
  let composed: Value = response.json();
  assert_eq!(composed["questionCount"], 3);
  let exam_id = composed["exam"]["id"].as_i64().unwrap();

  let response = server.post(&format!("/api/exams/{}/attempts", exam_id)).await;
  response.assert_status(StatusCode::CREATED);
  let started: Value = response.json();
  let questions = started["questions"].as_array().unwrap();
  assert_eq!(questions.len(), 3);
  assert!(questions[0].get("correctOption").is_none());

  let answers: Vec<Value> = questions
    .iter()
    .map(|q| json!({ "questionId": q["id"], "selectedOption": 2 }))
    .collect();
  let attempt_id = started["attemptId"].as_i64().unwrap();
  let response = server
    .post(&format!("/api/attempts/{}/submit", attempt_id))
    .json(&json!({ "answers": answers }))
    .await;
  response.assert_status_ok();
  let result: Value = response.json();
  assert_eq!(result["attempt"]["correct"], 3);
  assert_eq!(result["attempt"]["score"], 100.0);

  server
    .post(&format!("/api/attempts/{}/submit", attempt_id))
    .json(&json!({ "answers": [] }))
    .await
    .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_custom_exam_validation_details() {
  let TestApp { server, _temp } = app();
  register(&server, "admin").await;

  let response = server
    .post("/api/exams")
    .json(&json!({ "juzStart": 1, "questionCount": 500 }))
    .await;
  response.assert_status(StatusCode::BAD_REQUEST);
  let body: Value = response.json();
  let fields: Vec<&str> = body["details"]
    .as_array()
    .unwrap()
    .iter()
    .filter_map(|d| d["field"].as_str())
    .collect();
  assert!(fields.contains(&"questionCount"));
}

#[tokio::test]
async fn test_official_exam_requires_full_unit_quota() {
  let TestApp { server, _temp } = app();
  register(&server, "admin").await;

  let body = json!({ "title": "آزمون جزء یک", "juzStart": 1, "juzEnd": 1 });
  server
    .post("/api/exams/official")
    .json(&body)
    .await
    .assert_status(StatusCode::BAD_REQUEST);
  let exams: Value = server.get("/api/exams").await.json();
  assert_eq!(exams, json!([]));

  server
    .post("/api/questions/import")
    .json(&json!({ "questions": unit_batch(1) }))
    .await
    .assert_status_ok();
  let response = server.post("/api/exams/official").json(&body).await;
  response.assert_status(StatusCode::CREATED);
  let composed: Value = response.json();
  assert_eq!(composed["questionCount"], 5);

  let exam_id = composed["exam"]["id"].as_i64().unwrap();
  let structure: Value = server.get(&format!("/api/exams/{}/structure", exam_id)).await.json();
  assert_eq!(structure.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_free_student_cannot_take_unpublished_exam() {
  let TestApp { server, _temp } = app();
  register(&server, "admin").await;
  server
    .post("/api/questions/import")
    .json(&json!({ "questions": unit_batch(1) }))
    .await
    .assert_status_ok();
  let composed: Value = server
    .post("/api/exams/official")
    .json(&json!({ "title": "official", "juzStart": 1, "juzEnd": 1 }))
    .await
    .json();
  let exam_id = composed["exam"]["id"].as_i64().unwrap();

  register(&server, "student").await;
  server
    .post(&format!("/api/exams/{}/attempts", exam_id))
    .await
    .assert_status(StatusCode::NOT_FOUND);

  let dashboard: Value = server.get("/api/dashboard").await.json();
  assert_eq!(dashboard["role"], "student");

  login(&server, "admin").await;
  let dashboard: Value = server.get("/api/dashboard").await.json();
  assert_eq!(dashboard["role"], "admin");
  assert_eq!(dashboard["users"], 2);
}

#[tokio::test]
async fn test_pages_render() {
  let TestApp { server, _temp } = app();

  let index = server.get("/").await;
  index.assert_status_ok();
  assert!(index.text().contains("dir=\"rtl\""));

  server.get("/juz/30").await.assert_status_ok();
  server.get("/juz/31").await.assert_status(StatusCode::NOT_FOUND);
  server.get("/login").await.assert_status_ok();
}
