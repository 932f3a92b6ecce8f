// ABOUTME: End-to-end tests for the prompt version endpoints used by the editor
// ABOUTME: Covers save/activate round trips and the swap into the live chat path
//
// SPDX-License-Identifier: MIT OR Apache-2.0

mod helpers;

use helpers::axum_test::AxumTestRequest;
use helpers::{build_app, ScriptedProvider};
use serde_json::{json, Value};

#[tokio::test]
async fn test_save_version_round_trips_through_get_active() {
    let provider = ScriptedProvider::new();
    let (app, _resources) = build_app(provider, 500, false).await;

    let saved = AxumTestRequest::post("/api/save_prompt_version")
        .json(&json!({
            "promptData": {
                "bot_personality": {"roleDescription": "案内係", "communicationPrinciples": "丁寧に"},
                "company_info": {"companyName": "キャンパーレンタル"},
                "links": {"link_booking": "https://example.com/booking"}
            },
            "editor": "alice@example.com",
            "comment": "initial"
        }))
        .send(app.clone())
        .await;

    assert_eq!(saved.status(), 200);
    let saved_body: Value = saved.json();
    assert_eq!(saved_body["version"], 1);
    let version_id = saved_body["versionId"].as_str().unwrap().to_owned();

    let active = AxumTestRequest::get("/api/get_active_prompt_version")
        .send(app)
        .await;
    assert_eq!(active.status(), 200);
    let active_body: Value = active.json();
    assert_eq!(active_body["activeVersionId"], version_id.as_str());
    assert_eq!(active_body["version"], 1);
    assert_eq!(active_body["editor"], "alice@example.com");
    assert_eq!(active_body["comment"], "initial");
    assert_eq!(
        active_body["promptData"]["bot_personality"]["roleDescription"],
        "案内係"
    );
    assert_eq!(
        active_body["promptData"]["links"]["link_booking"],
        "https://example.com/booking"
    );
}

#[tokio::test]
async fn test_get_active_before_any_save_is_not_found() {
    let provider = ScriptedProvider::new();
    let (app, _resources) = build_app(provider, 500, false).await;

    let response = AxumTestRequest::get("/api/get_active_prompt_version")
        .send(app)
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_versions_list_newest_first() {
    let provider = ScriptedProvider::new();
    let (app, _resources) = build_app(provider, 500, false).await;

    for (editor, comment) in [("alice", "first"), ("bob", "second")] {
        let response = AxumTestRequest::post("/api/save_prompt_version")
            .json(&json!({
                "promptData": {"qna": {"qnaContent": comment}},
                "editor": editor,
                "comment": comment
            }))
            .send(app.clone())
            .await;
        assert_eq!(response.status(), 200);
    }

    let listing = AxumTestRequest::get("/api/prompt_versions").send(app).await;
    assert_eq!(listing.status(), 200);
    let body: Value = listing.json();
    let versions = body["versions"].as_array().unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0]["version"], 2);
    assert_eq!(versions[0]["editor"], "bob");
    assert_eq!(versions[1]["version"], 1);
}

#[tokio::test]
async fn test_activate_rolls_back_to_older_version() {
    let provider = ScriptedProvider::new();
    let (app, _resources) = build_app(provider, 500, false).await;

    let first = AxumTestRequest::post("/api/save_prompt_version")
        .json(&json!({
            "promptData": {"qna": {"qnaContent": "v1"}},
            "editor": "alice"
        }))
        .send(app.clone())
        .await;
    let first_id = first.json::<Value>()["versionId"]
        .as_str()
        .unwrap()
        .to_owned();

    AxumTestRequest::post("/api/save_prompt_version")
        .json(&json!({
            "promptData": {"qna": {"qnaContent": "v2"}},
            "editor": "bob"
        }))
        .send(app.clone())
        .await;

    let activated = AxumTestRequest::post("/api/activate_prompt_version")
        .json(&json!({"versionId": first_id}))
        .send(app.clone())
        .await;
    assert_eq!(activated.status(), 200);
    let activated_body: Value = activated.json();
    assert_eq!(activated_body["version"], 1);

    let active = AxumTestRequest::get("/api/get_active_prompt_version")
        .send(app)
        .await;
    let active_body: Value = active.json();
    assert_eq!(active_body["version"], 1);
    assert_eq!(active_body["promptData"]["qna"]["qnaContent"], "v1");
}

#[tokio::test]
async fn test_activate_unknown_version_is_not_found() {
    let provider = ScriptedProvider::new();
    let (app, _resources) = build_app(provider, 500, false).await;

    let response = AxumTestRequest::post("/api/activate_prompt_version")
        .json(&json!({"versionId": "does-not-exist"}))
        .send(app)
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_saving_a_version_unblocks_the_chat_llm_path() {
    let provider = ScriptedProvider::new();
    let (app, _resources) = build_app(provider, 500, false).await;

    let refused = AxumTestRequest::post("/api/chat")
        .json(&json!({"message": "冬に自転車は積めますか", "userId": "user-1"}))
        .send(app.clone())
        .await;
    assert_eq!(refused.status(), 500);

    AxumTestRequest::post("/api/save_prompt_version")
        .json(&json!({
            "promptData": {"bot_personality": {"roleDescription": "案内係"}},
            "editor": "alice"
        }))
        .send(app.clone())
        .await;

    let answered = AxumTestRequest::post("/api/chat")
        .json(&json!({"message": "冬に自転車は積めますか", "userId": "user-1"}))
        .send(app)
        .await;
    assert_eq!(answered.status(), 200);
    let body: Value = answered.json();
    assert_eq!(body["source"], "ai");
}
