use serde_json::json;
use toolbridge::api::response::extract_content;
use toolbridge::api::ChatRequest;
use toolbridge::models::ConversationTurn;
use toolbridge::BridgeError;

#[test]
fn test_extract_content_with_content() {
    let response = json!({
        "model": "qwen2.5:7b",
        "message": {
            "role": "assistant",
            "content": "Hello, world!"
        },
        "done": true
    });

    let content = extract_content(&response).unwrap();
    assert_eq!(content, "Hello, world!");
}

#[test]
fn test_extract_content_without_message() {
    let response = json!({"model": "qwen2.5:7b", "done": true});

    let result = extract_content(&response);
    assert!(result.is_err());
}

#[test]
fn test_extract_content_reports_model_error() {
    let response = json!({"error": "model 'missing' not found, try pulling it first"});

    let err = extract_content(&response).unwrap_err();
    assert!(matches!(err, BridgeError::Model { ref message, .. } if message.contains("try pulling")));
}

#[test]
fn test_chat_request_shape() {
    let messages = vec![
        ConversationTurn::system("You are helpful."),
        ConversationTurn::user("hi"),
    ];
    let request = ChatRequest {
        model: "qwen2.5:7b",
        messages: &messages,
        stream: false,
    };

    let value = serde_json::to_value(&request).unwrap();
    assert_eq!(
        value,
        json!({
            "model": "qwen2.5:7b",
            "messages": [
                {"role": "system", "content": "You are helpful."},
                {"role": "user", "content": "hi"}
            ],
            "stream": false
        })
    );
}
