//! Timed exam attempts: start, submit and review.

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::SUBMIT_GRACE_SECONDS;
use crate::db::{self, AnswerRecord};
use crate::domain::{
  score_percent, Attempt, AttemptStatus, Exam, ExamKind, Feature, PublicQuestion, Question, Role,
  OPTION_COUNT,
};
use crate::error::{AppError, AppResult};
use crate::validation::ValidationErrors;

use super::access;

const MSG_TIME_UP: &str = "زمان آزمون به پایان رسیده است و پاسخ‌ها پذیرفته نشد";
const MSG_ALREADY_CLOSED: &str = "این آزمون قبلاً ثبت شده است";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedAttempt {
  pub attempt_id: i64,
  pub exam_id: i64,
  pub title: String,
  pub started_at: DateTime<Utc>,
  pub deadline_at: DateTime<Utc>,
  pub questions: Vec<PublicQuestion>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
  pub question_id: i64,
  pub selected_option: Option<u8>,
}

/// One question of a finished attempt, with the answer key
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerReview {
  pub question_id: i64,
  pub position: u32,
  pub text: String,
  pub options: [String; OPTION_COUNT],
  pub selected_option: Option<u8>,
  pub correct_option: u8,
  pub is_correct: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResult {
  pub attempt: Attempt,
  pub answers: Vec<AnswerReview>,
}

/// An exam's questions in position order
pub fn exam_questions(conn: &Connection, exam_id: i64) -> rusqlite::Result<Vec<Question>> {
  let ids: Vec<i64> = db::get_exam_structure(conn, exam_id)?
    .into_iter()
    .map(|row| row.question_id)
    .collect();
  db::get_questions_by_ids(conn, &ids)
}

/// Open a new attempt; the returned questions carry no answer key
pub fn start_attempt(
  conn: &Connection,
  exam: &Exam,
  user_id: i64,
  role: Role,
  now: DateTime<Utc>,
) -> AppResult<StartedAttempt> {
  if !access::can_view_exam(exam, user_id, role) {
    return Err(AppError::NotFound("Exam"));
  }
  if exam.kind == ExamKind::Official && exam.created_by != user_id {
    access::check_feature(conn, user_id, role, Feature::OfficialExams, now)?;
  }

  let questions = exam_questions(conn, exam.id)?;
  if questions.is_empty() {
    return Err(AppError::BadRequest("این آزمون هنوز سوالی ندارد".to_string()));
  }

  let deadline_at = now + Duration::minutes(exam.duration_minutes as i64);
  let attempt_id = db::create_attempt(conn, exam.id, user_id, now, deadline_at, questions.len() as u32)?;
  tracing::debug!("User {} started attempt {} on exam {}", user_id, attempt_id, exam.id);

  Ok(StartedAttempt {
    attempt_id,
    exam_id: exam.id,
    title: exam.title.clone(),
    started_at: now,
    deadline_at,
    questions: questions
      .iter()
      .enumerate()
      .map(|(i, q)| q.to_public(i as u32 + 1))
      .collect(),
  })
}

/// Grade answers against the exam's questions; unanswered questions are wrong
pub fn grade(questions: &[Question], answers: &[SubmittedAnswer]) -> (Vec<AnswerRecord>, u32) {
  let selected: HashMap<i64, Option<u8>> =
    answers.iter().map(|a| (a.question_id, a.selected_option)).collect();

  let records: Vec<AnswerRecord> = questions
    .iter()
    .map(|q| {
      let choice = selected.get(&q.id).copied().flatten();
      AnswerRecord {
        question_id: q.id,
        selected_option: choice,
        is_correct: choice.is_some_and(|c| q.is_correct(c)),
      }
    })
    .collect();
  let correct = records.iter().filter(|r| r.is_correct).count() as u32;
  (records, correct)
}

fn check_answers(answers: &[SubmittedAnswer]) -> Result<(), ValidationErrors> {
  let mut errors = ValidationErrors::default();
  for (i, answer) in answers.iter().enumerate() {
    if let Some(option) = answer.selected_option {
      if !(1..=OPTION_COUNT as u8).contains(&option) {
        errors.push(
          format!("answers[{}].selectedOption", i),
          format!("must be between 1 and {}", OPTION_COUNT),
        );
      }
    }
  }
  if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Score and close an attempt.
///
/// Submissions later than the deadline plus `SUBMIT_GRACE_SECONDS` close the
/// attempt as expired with a zero score and are rejected.
pub fn submit_attempt(
  conn: &Connection,
  attempt_id: i64,
  user_id: i64,
  answers: &[SubmittedAnswer],
  now: DateTime<Utc>,
) -> AppResult<AttemptResult> {
  let attempt = db::get_attempt(conn, attempt_id)?
    .filter(|a| a.user_id == user_id)
    .ok_or(AppError::NotFound("Attempt"))?;
  if attempt.status != AttemptStatus::InProgress {
    return Err(AppError::Conflict(MSG_ALREADY_CLOSED.to_string()));
  }
  check_answers(answers)?;

  let questions = exam_questions(conn, attempt.exam_id)?;
  let total = questions.len() as u32;

  if attempt.is_past_deadline(now, SUBMIT_GRACE_SECONDS) {
    db::finalize_attempt(conn, attempt_id, AttemptStatus::Expired, 0, total, 0.0, &[])?;
    tracing::info!("Attempt {} submitted after its deadline; marked expired", attempt_id);
    return Err(AppError::BadRequest(MSG_TIME_UP.to_string()));
  }

  let (records, correct) = grade(&questions, answers);
  let score = score_percent(correct, total);
  db::finalize_attempt(conn, attempt_id, AttemptStatus::Submitted, correct, total, score, &records)?;
  tracing::debug!("Attempt {} scored {}/{} ({}%)", attempt_id, correct, total, score);

  attempt_result(conn, attempt_id, user_id, Role::Student)
}

/// Finished attempt with the answer key; visible to its owner, the exam creator and admins
pub fn attempt_result(
  conn: &Connection,
  attempt_id: i64,
  viewer_id: i64,
  viewer_role: Role,
) -> AppResult<AttemptResult> {
  let attempt = db::get_attempt(conn, attempt_id)?.ok_or(AppError::NotFound("Attempt"))?;
  let exam = db::get_exam(conn, attempt.exam_id)?.ok_or(AppError::NotFound("Exam"))?;
  let allowed = attempt.user_id == viewer_id || access::can_manage_exam(&exam, viewer_id, viewer_role);
  if !allowed {
    return Err(AppError::NotFound("Attempt"));
  }
  if attempt.status == AttemptStatus::InProgress {
    return Err(AppError::Conflict("این آزمون هنوز در حال برگزاری است".to_string()));
  }

  let stored: HashMap<i64, AnswerRecord> = db::get_attempt_answers(conn, attempt_id)?
    .into_iter()
    .map(|a| (a.question_id, a))
    .collect();
  let answers = exam_questions(conn, attempt.exam_id)?
    .into_iter()
    .enumerate()
    .map(|(i, q)| {
      let record = stored.get(&q.id);
      AnswerReview {
        question_id: q.id,
        position: i as u32 + 1,
        selected_option: record.and_then(|r| r.selected_option),
        is_correct: record.is_some_and(|r| r.is_correct),
        correct_option: q.correct_option,
        text: q.text,
        options: q.options,
      }
    })
    .collect();

  Ok(AttemptResult { attempt, answers })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::{create_exam, insert_exam_questions, insert_question, NewExam};
  use crate::domain::{OfficialExamQuestion, QuestionKind};
  use crate::testing::{sample_question, TestEnv};

  /// Custom exam over three fresh questions (correct option is 2 for each)
  fn exam_with_questions(env: &TestEnv, creator: i64, duration_minutes: u32) -> Exam {
    let exam_id = create_exam(
      &env.conn,
      &NewExam {
        title: "Juz 30 review".into(),
        kind: ExamKind::Custom,
        created_by: creator,
        spec: None,
        juz_start: None,
        juz_end: None,
        year: None,
        duration_minutes,
      },
    )
    .unwrap();
    let rows: Vec<OfficialExamQuestion> = (0..3)
      .map(|i| {
        let id = insert_question(&env.conn, &sample_question(&format!("q{i}"), 30, QuestionKind::Memorization))
          .unwrap()
          .unwrap();
        OfficialExamQuestion { exam_id, question_id: id, position: i + 1, juz: None, kind: None }
      })
      .collect();
    insert_exam_questions(&env.conn, &rows).unwrap();
    db::get_exam(&env.conn, exam_id).unwrap().unwrap()
  }

  fn answer(question_id: i64, selected: Option<u8>) -> SubmittedAnswer {
    SubmittedAnswer { question_id, selected_option: selected }
  }

  #[test]
  fn test_start_hides_answers_and_sets_deadline() {
    let env = TestEnv::new().unwrap();
    let user = env.user("student", Role::Student);
    let exam = exam_with_questions(&env, user, 20);
    let now = Utc::now();

    let started = start_attempt(&env.conn, &exam, user, Role::Student, now).unwrap();
    assert_eq!(started.questions.len(), 3);
    assert_eq!(started.questions[2].position, 3);
    assert_eq!(started.deadline_at, now + Duration::minutes(20));
    let json = serde_json::to_string(&started).unwrap();
    assert!(!json.contains("correctOption"));
  }

  #[test]
  fn test_unpublished_exam_hidden_from_others() {
    let env = TestEnv::new().unwrap();
    let owner = env.user("teacher", Role::Teacher);
    let other = env.user("student", Role::Student);
    let exam = exam_with_questions(&env, owner, 20);
    let err = start_attempt(&env.conn, &exam, other, Role::Student, Utc::now()).unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
  }

  #[test]
  fn test_submit_scores_unanswered_as_wrong() {
    let env = TestEnv::new().unwrap();
    let user = env.user("student", Role::Student);
    let exam = exam_with_questions(&env, user, 20);
    let now = Utc::now();
    let started = start_attempt(&env.conn, &exam, user, Role::Student, now).unwrap();
    let ids: Vec<i64> = started.questions.iter().map(|q| q.id).collect();

    let answers = vec![answer(ids[0], Some(2)), answer(ids[1], Some(3))];
    let result = submit_attempt(&env.conn, started.attempt_id, user, &answers, now).unwrap();

    assert_eq!(result.attempt.status, AttemptStatus::Submitted);
    assert_eq!((result.attempt.correct, result.attempt.total), (1, 3));
    assert_eq!(result.attempt.score, 33.33);
    assert!(result.answers[0].is_correct);
    assert_eq!(result.answers[1].selected_option, Some(3));
    assert_eq!(result.answers[2].selected_option, None);
    assert_eq!(result.answers[2].correct_option, 2);

    // A second submission is refused
    let again = submit_attempt(&env.conn, started.attempt_id, user, &answers, now).unwrap_err();
    assert!(matches!(again, AppError::Conflict(_)));
  }

  #[test]
  fn test_late_submission_expires_attempt() {
    let env = TestEnv::new().unwrap();
    let user = env.user("student", Role::Student);
    let exam = exam_with_questions(&env, user, 1);
    let started_at = Utc::now() - Duration::minutes(5);
    let started = start_attempt(&env.conn, &exam, user, Role::Student, started_at).unwrap();
    let id = started.questions[0].id;

    let err = submit_attempt(&env.conn, started.attempt_id, user, &[answer(id, Some(2))], Utc::now())
      .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let attempt = db::get_attempt(&env.conn, started.attempt_id).unwrap().unwrap();
    assert_eq!(attempt.status, AttemptStatus::Expired);
    assert_eq!(attempt.score, 0.0);
  }

  #[test]
  fn test_submission_within_grace_accepted() {
    let env = TestEnv::new().unwrap();
    let user = env.user("student", Role::Student);
    let exam = exam_with_questions(&env, user, 1);
    let started_at = Utc::now();
    let started = start_attempt(&env.conn, &exam, user, Role::Student, started_at).unwrap();
    let submitted_at = started.deadline_at + Duration::seconds(SUBMIT_GRACE_SECONDS - 1);
    let result = submit_attempt(&env.conn, started.attempt_id, user, &[], submitted_at).unwrap();
    assert_eq!(result.attempt.status, AttemptStatus::Submitted);
    assert_eq!(result.attempt.score, 0.0);
  }

  #[test]
  fn test_only_owner_submits_and_options_checked() {
    let env = TestEnv::new().unwrap();
    let user = env.user("student", Role::Student);
    let intruder = env.user("intruder", Role::Student);
    let exam = exam_with_questions(&env, user, 20);
    let now = Utc::now();
    let started = start_attempt(&env.conn, &exam, user, Role::Student, now).unwrap();

    let err = submit_attempt(&env.conn, started.attempt_id, intruder, &[], now).unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let bad = vec![answer(started.questions[0].id, Some(5))];
    let err = submit_attempt(&env.conn, started.attempt_id, user, &bad, now).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
  }

  #[test]
  fn test_result_visibility() {
    let env = TestEnv::new().unwrap();
    let teacher = env.user("teacher", Role::Teacher);
    let student = env.user("student", Role::Student);
    let stranger = env.user("stranger", Role::Student);
    let exam = exam_with_questions(&env, teacher, 20);
    db::set_exam_published(&env.conn, exam.id, true).unwrap();
    let exam = db::get_exam(&env.conn, exam.id).unwrap().unwrap();

    let now = Utc::now();
    let started = start_attempt(&env.conn, &exam, student, Role::Student, now).unwrap();
    assert!(matches!(
      attempt_result(&env.conn, started.attempt_id, student, Role::Student),
      Err(AppError::Conflict(_))
    ));
    submit_attempt(&env.conn, started.attempt_id, student, &[], now).unwrap();

    assert!(attempt_result(&env.conn, started.attempt_id, teacher, Role::Teacher).is_ok());
    assert!(attempt_result(&env.conn, started.attempt_id, stranger, Role::Student).is_err());
  }

  #[test]
  fn test_grade_ignores_unknown_questions() {
    let env = TestEnv::new().unwrap();
    let user = env.user("u", Role::Student);
    let exam = exam_with_questions(&env, user, 5);
    let questions = exam_questions(&env.conn, exam.id).unwrap();
    let (records, correct) = grade(&questions, &[answer(9999, Some(2)), answer(questions[1].id, Some(2))]);
    assert_eq!(records.len(), 3);
    assert_eq!(correct, 1);
  }
}
