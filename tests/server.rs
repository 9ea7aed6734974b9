use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use master_schedule::HighsEngine;
use master_schedule::server::router;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

async fn post(uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router(Arc::new(HighsEngine)).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn school(teacher_unavailable: &[&str]) -> Value {
    json!({
        "sections": [{"id": "BI1", "courseId": "Biology", "teacherId": "T1", "capacity": 10}],
        "teachers": [{"id": "T1", "unavailablePeriods": teacher_unavailable}],
        "students": [{"id": "A", "requestedCourses": ["Biology"]}],
        "config": {"timeLimitSecs": 10.0}
    })
}

#[tokio::test]
async fn solve_returns_schedule_and_empty_report() {
    let (status, body) = post("/v1/schedule/solve", school(&[])).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Optimal");
    assert_eq!(body["tables"]["masterSchedule"][0]["sectionId"], "BI1");
    assert_eq!(body["conflicts"]["conflicts"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn dangling_reference_is_a_bad_request() {
    let mut body = school(&[]);
    body["sections"][0]["teacherId"] = json!("T404");
    let (status, body) = post("/v1/schedule/solve", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("T404"));
}

#[tokio::test]
async fn structural_infeasibility_is_unprocessable() {
    let all = ["R1", "R2", "R3", "R4", "G1", "G2", "G3", "G4"];
    let (status, body) = post("/v1/schedule/solve", school(&all)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("BI1"));
}

#[tokio::test]
async fn tune_reports_the_best_candidate() {
    let mut body = school(&[]);
    body["tuner"] = json!({
        "grid": {"section_overload": [50.0, 100.0]},
        "parallelism": 2,
        "solve": {"timeLimitSecs": 10.0}
    });
    let (status, body) = post("/v1/schedule/tune", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["candidates"].as_array().unwrap().len(), 2);
    assert_eq!(body["summary"]["bestCandidate"], 0);
    assert_eq!(body["bestTables"]["studentAssignments"][0]["studentId"], "A");
}
