// tests/api_tests.rs

use std::sync::Arc;

use quiz_engine::{
    config::Config,
    models::quiz::{Quiz, QuizOption, QuizQuestion},
    routes,
    state::AppState,
    store::MemoryStore,
    utils::jwt::sign_jwt,
};
use serde_json::{Value, json};
use sqlx::types::Json;

const SECRET: &str = "test_secret_for_integration_tests";

/// Seeds quiz 1: two questions worth 5 marks each, option `<q>1` is correct.
fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    let questions = (1..=2)
        .map(|id| QuizQuestion {
            id,
            quiz_id: 1,
            content: format!("Question {id}"),
            options: Json(vec![
                QuizOption {
                    id: id * 10 + 1,
                    text: "Correct".to_string(),
                    is_correct: true,
                },
                QuizOption {
                    id: id * 10 + 2,
                    text: "Incorrect".to_string(),
                    is_correct: false,
                },
            ]),
            marks: Some(5),
            position: id as i32,
        })
        .collect();
    store.insert_quiz(
        Quiz {
            id: 1,
            title: "General Studies Mock".to_string(),
            total_marks: Some(10),
            duration_minutes: 15,
            created_at: None,
        },
        questions,
    );
    store
}

/// Spawns the app on a random port and returns its base URL.
async fn spawn_app() -> String {
    let config = Config {
        database_url: String::new(),
        jwt_secret: SECRET.to_string(),
        rust_log: "error".to_string(),
        server_port: 0,
        log_dir: "logs".to_string(),
    };

    let state = AppState {
        store: Arc::new(seeded_store()),
        config,
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

fn token_for(user: &str) -> String {
    sign_jwt(user, SECRET, 600).unwrap()
}

fn unique_user() -> String {
    format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8])
}

async fn start(client: &reqwest::Client, address: &str, token: &str) -> Value {
    let response = client
        .post(format!("{}/api/quiz/1/start", address))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);
    response.json().await.unwrap()
}

#[tokio::test]
async fn unknown_path_is_404() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn routes_require_a_token() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/quiz/1/start", address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = client
        .get(format!("{}/api/quiz/1", address))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn paper_does_not_leak_answers() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let paper: Value = client
        .get(format!("{}/api/quiz/1", address))
        .bearer_auth(token_for(&unique_user()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(paper["totalMarks"], 10);
    assert_eq!(paper["questions"].as_array().unwrap().len(), 2);
    assert!(paper["questions"][0]["options"][0].get("isCorrect").is_none());
}

#[tokio::test]
async fn start_unknown_quiz_is_404() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/quiz/99/start", address))
        .bearer_auth(token_for(&unique_user()))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn attempts_are_numbered_per_user() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let alice = token_for(&unique_user());
    let bob = token_for(&unique_user());

    for expected in 1..=3 {
        let body = start(&client, &address, &alice).await;
        assert_eq!(body["submission"]["attemptNumber"], expected);
        assert_eq!(body["submission"]["status"], "in_progress");
        assert_eq!(body["submission"]["totalMarksMaximum"], 10);
    }
    let body = start(&client, &address, &bob).await;
    assert_eq!(body["submission"]["attemptNumber"], 1);

    let attempts: Vec<Value> = client
        .get(format!("{}/api/quiz/1/attempts", address))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(attempts.len(), 3);
}

#[tokio::test]
async fn submit_scores_the_attempt() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = token_for(&unique_user());

    let started = start(&client, &address, &token).await;
    let submission_id = started["submission"]["id"].as_i64().unwrap();

    let response = client
        .post(format!("{}/api/submission/{}/submit", address, submission_id))
        .bearer_auth(&token)
        .json(&json!({
            "answers": [
                {"questionId": "1", "selectedOptionId": 11},
                {"questionId": 2},
                {"questionId": "garbage", "selectedOptionId": 21}
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let evaluated: Value = response.json().await.unwrap();
    assert_eq!(evaluated["status"], "evaluated");
    assert_eq!(evaluated["totalMarksObtained"], 5);
    assert_eq!(evaluated["correctAnswersCount"], 1);
    assert_eq!(evaluated["unattemptedCount"], 1);
    // The malformed entry is kept with its id unset and never credited.
    assert_eq!(evaluated["wrongAnswersCount"], 1);
    assert_eq!(evaluated["answers"][2]["questionId"], Value::Null);
    assert_eq!(evaluated["percentageScore"], 50.0);

    // Re-evaluation is stable.
    let again: Value = client
        .post(format!("{}/api/submission/{}/evaluate", address, submission_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(again["totalMarksObtained"], evaluated["totalMarksObtained"]);
    assert_eq!(again["percentageScore"], evaluated["percentageScore"]);
    assert_eq!(again["answers"], evaluated["answers"]);

    // Evaluated submissions do not accept new answers.
    let response = client
        .post(format!("{}/api/submission/{}/submit", address, submission_id))
        .bearer_auth(&token)
        .json(&json!({"answers": [{"questionId": 2, "selectedOptionId": 21}]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn submissions_are_private() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let owner = token_for(&unique_user());
    let intruder = token_for(&unique_user());

    let started = start(&client, &address, &owner).await;
    let submission_id = started["submission"]["id"].as_i64().unwrap();

    let response = client
        .get(format!("{}/api/submission/{}", address, submission_id))
        .bearer_auth(&intruder)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let response = client
        .post(format!("{}/api/submission/{}/submit", address, submission_id))
        .bearer_auth(&intruder)
        .json(&json!({"answers": []}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let response = client
        .get(format!("{}/api/submission/{}", address, submission_id))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn oversized_answer_text_is_rejected() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = token_for(&unique_user());

    let started = start(&client, &address, &token).await;
    let submission_id = started["submission"]["id"].as_i64().unwrap();

    let response = client
        .post(format!("{}/api/submission/{}/submit", address, submission_id))
        .bearer_auth(&token)
        .json(&json!({"answers": [{"questionId": 1, "answerText": "x".repeat(5001)}]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn evaluating_an_open_attempt_is_rejected() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = token_for(&unique_user());

    let started = start(&client, &address, &token).await;
    let submission_id = started["submission"]["id"].as_i64().unwrap();

    let response = client
        .post(format!("{}/api/submission/{}/evaluate", address, submission_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);

    // The attempt can still be submitted afterwards.
    let response = client
        .post(format!("{}/api/submission/{}/submit", address, submission_id))
        .bearer_auth(&token)
        .json(&json!({"answers": [{"questionId": 1, "selectedOptionId": 11}]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let evaluated: Value = response.json().await.unwrap();
    assert_eq!(evaluated["status"], "evaluated");
    assert_eq!(evaluated["totalMarksObtained"], 5);
}
