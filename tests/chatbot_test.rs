mod common;

use serde_json::{json, Value};
use uuid::Uuid;

async fn ask(app: &common::TestApp, payload: Value, token: Option<&str>) -> reqwest::Response {
    let mut req = app.client.post(app.url("/chatbot/ask")).json(&payload);
    if let Some(token) = token {
        req = req.bearer_auth(token);
    }
    req.send().await.unwrap()
}

async fn admin(app: &common::TestApp) -> (Uuid, String) {
    let (id, token) = common::create_test_user(app, "botadmin", "buyer").await;
    common::make_admin(&app.db, id).await;
    (id, token)
}

/// Alphanumeric marker that tokenizes as a single word.
fn marker() -> String {
    format!("kata{}", &Uuid::new_v4().simple().to_string()[..8])
}

#[tokio::test]
async fn test_keyword_reply_without_login() {
    let app = common::spawn_app().await;

    let resp = ask(&app, json!({ "message": "Bisa KREDIT tidak?" }), None).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["matchSource"], "keyword");
    assert!(body["data"]["sessionId"].as_str().is_some());
    assert!(body["data"]["knowledgeId"].is_null());
}

#[tokio::test]
async fn test_unmatched_message_gets_fallback() {
    let app = common::spawn_app().await;

    let body: Value = ask(&app, json!({ "message": marker() }), None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["matchSource"], "fallback");
}

#[tokio::test]
async fn test_empty_message_is_rejected() {
    let app = common::spawn_app().await;

    let resp = ask(&app, json!({ "message": "   " }), None).await;
    assert_eq!(resp.status(), 400);

    let resp = ask(&app, json!({ "message": "a".repeat(1001) }), None).await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_knowledge_answer_wins_and_transcript_is_logged() {
    let app = common::spawn_app().await;
    let (_, admin_token) = admin(&app).await;
    let (user_id, user_token) = common::create_test_user(&app, "visitor", "buyer").await;
    let word = marker();
    let question = format!("Berapa lama garansi {}", word);

    let resp = app
        .client
        .post(app.url("/chatbot/knowledge"))
        .bearer_auth(&admin_token)
        .json(&json!({
            "category": "garansi",
            "question": question,
            "answer": "Garansi mesin 3 tahun.",
            "keywords": ["garansi", "mesin"],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    let knowledge_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["validationStatus"], "pending");

    let body: Value = ask(&app, json!({ "message": question }), Some(&user_token))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["matchSource"], "knowledge");
    assert_eq!(body["data"]["reply"], "Garansi mesin 3 tahun.");
    assert_eq!(body["data"]["knowledgeId"], knowledge_id);
    let session_id = body["data"]["sessionId"].as_str().unwrap().to_string();

    let body: Value = app
        .client
        .get(app.url(&format!("/chatbot/conversations/{}", session_id)))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let turns = body["data"].as_array().unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0]["sender"], "user");
    assert_eq!(turns[0]["userId"], user_id.to_string());
    assert_eq!(turns[1]["sender"], "bot");
    assert_eq!(turns[1]["matchSource"], "knowledge");

    // Deactivated entries no longer answer
    let resp = app
        .client
        .put(app.url(&format!("/chatbot/knowledge/{}", knowledge_id)))
        .bearer_auth(&admin_token)
        .json(&json!({ "isActive": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = ask(&app, json!({ "message": question }), None)
        .await
        .json()
        .await
        .unwrap();
    assert_ne!(body["data"]["matchSource"], "knowledge");
}

#[tokio::test]
async fn test_escalate_marks_room() {
    let app = common::spawn_app().await;

    let body: Value = ask(&app, json!({ "message": "halo" }), None)
        .await
        .json()
        .await
        .unwrap();
    let session_id = body["data"]["sessionId"].as_str().unwrap().to_string();

    let resp = app
        .client
        .post(app.url("/chatbot/escalate"))
        .json(&json!({ "sessionId": session_id, "reason": "Ingin bicara dengan sales" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["isEscalated"], true);
    assert_eq!(body["data"]["sessionId"], session_id);

    // Escalating again updates the same room
    let again: Value = app
        .client
        .post(app.url("/chatbot/escalate"))
        .json(&json!({ "sessionId": session_id }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(again["data"]["id"], body["data"]["id"]);
}

#[tokio::test]
async fn test_knowledge_admin_endpoints_reject_buyers() {
    let app = common::spawn_app().await;
    let (_, buyer) = common::create_test_user(&app, "curious", "buyer").await;

    let resp = app
        .client
        .get(app.url("/chatbot/knowledge"))
        .bearer_auth(&buyer)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn test_tags_are_unique_and_attach_is_idempotent() {
    let app = common::spawn_app().await;
    let (_, token) = admin(&app).await;
    let name = marker();

    let resp = app
        .client
        .post(app.url("/chatbot/tags"))
        .bearer_auth(&token)
        .json(&json!({ "name": name.to_uppercase() }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["name"], name);
    let tag_id = body["data"]["id"].as_str().unwrap().to_string();

    let resp = app
        .client
        .post(app.url("/chatbot/tags"))
        .bearer_auth(&token)
        .json(&json!({ "name": name }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    let body: Value = app
        .client
        .post(app.url("/chatbot/knowledge"))
        .bearer_auth(&token)
        .json(&json!({
            "category": "umum",
            "question": format!("Jam buka showroom {}", marker()),
            "answer": "Setiap hari 08.00 sampai 17.00.",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let knowledge_id = body["data"]["id"].as_str().unwrap().to_string();

    for _ in 0..2 {
        let resp = app
            .client
            .put(app.url(&format!(
                "/chatbot/knowledge/{}/tags/{}",
                knowledge_id, tag_id
            )))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    let body: Value = app
        .client
        .get(app.url(&format!("/chatbot/knowledge/{}/tags", knowledge_id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}
