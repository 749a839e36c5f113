//! Integration tests for the form builder backend.

use std::sync::Arc;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::client::{ApiClient, FieldValue, FormStore};
use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::models::{CreateFormRequest, FieldType, FormField, UpdateFieldRequest};
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        // Create config
        let config = Config {
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            request_timeout_secs: 8,
        };

        let state = AppState {
            repo,
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, query: &str) -> String {
        format!("{}/api/forms{}", self.base_url, query)
    }

    async fn create_form(&self, name: &str) -> Value {
        let resp = self
            .client
            .post(self.url(""))
            .json(&json!({
                "name": name,
                "description": format!("{} description", name),
                "pdfUrl": "https://example.com/doc.pdf",
                "fields": [
                    { "name": "email", "label": "Email", "type": "email", "required": true }
                ]
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        resp.json().await.unwrap()
    }
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(format!("{}/health", fixture.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_create_form_assigns_ids() {
    let fixture = TestFixture::new().await;

    let body = fixture.create_form("Intake").await;
    assert_eq!(body["success"], true);

    let form = &body["data"];
    assert!(!form["id"].as_str().unwrap().is_empty());
    assert_eq!(form["name"], "Intake");
    assert_eq!(form["createdAt"], form["updatedAt"]);

    for field in form["fields"].as_array().unwrap() {
        assert!(!field["id"].as_str().unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_create_form_validation_failure_persists_nothing() {
    let fixture = TestFixture::new().await;

    // One request violating several rules at once
    let resp = fixture
        .client
        .post(fixture.url(""))
        .json(&json!({
            "name": "   ",
            "pdfUrl": "not a url",
            "fields": []
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let violations = body["error"]["details"].as_array().unwrap();
    let paths: Vec<&str> = violations
        .iter()
        .map(|v| v["path"].as_str().unwrap())
        .collect();
    assert!(paths.contains(&"name"));
    assert!(paths.contains(&"pdfUrl"));
    assert!(paths.contains(&"fields"));

    // Nothing reached storage
    let list_resp = fixture.client.get(fixture.url("")).send().await.unwrap();
    let list_body: Value = list_resp.json().await.unwrap();
    assert_eq!(list_body["data"]["total"], 0);
}

#[tokio::test]
async fn test_create_rejects_unknown_field_type() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url(""))
        .json(&json!({
            "name": "Intake",
            "pdfUrl": "https://example.com/doc.pdf",
            "fields": [
                { "name": "x", "label": "X", "type": "carousel" }
            ]
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_get_form_roundtrip() {
    let fixture = TestFixture::new().await;

    let created = fixture.create_form("Intake").await;
    let id = created["data"]["id"].as_str().unwrap();

    let resp = fixture
        .client
        .get(fixture.url(&format!("?id={}", id)))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], created["data"]);
}

#[tokio::test]
async fn test_get_missing_form_is_404() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("?id=no-such-form"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_update_form_changes_only_named_attrs() {
    let fixture = TestFixture::new().await;

    let created = fixture.create_form("Intake").await;
    let id = created["data"]["id"].as_str().unwrap();

    // Client-supplied id and createdAt must be ignored
    let resp = fixture
        .client
        .put(fixture.url(&format!("?id={}", id)))
        .json(&json!({
            "name": "Renamed",
            "id": "attacker-chosen",
            "createdAt": "1999-01-01T00:00:00+00:00"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let form = &body["data"];
    assert_eq!(form["id"], created["data"]["id"]);
    assert_eq!(form["name"], "Renamed");
    assert_eq!(form["description"], created["data"]["description"]);
    assert_eq!(form["pdfUrl"], created["data"]["pdfUrl"]);
    assert_eq!(form["fields"], created["data"]["fields"]);
    assert_eq!(form["createdAt"], created["data"]["createdAt"]);
    assert_ne!(form["updatedAt"], created["data"]["updatedAt"]);
}

#[tokio::test]
async fn test_update_missing_form_is_404() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .put(fixture.url("?id=no-such-form"))
        .json(&json!({ "name": "X" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_list_pagination_and_total() {
    let fixture = TestFixture::new().await;

    for i in 0..15 {
        fixture.create_form(&format!("Form {:02}", i)).await;
        tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
    }

    // Default window
    let resp = fixture.client.get(fixture.url("")).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    let forms = body["data"]["forms"].as_array().unwrap();
    assert_eq!(forms.len(), 10);
    assert_eq!(body["data"]["total"], 15);
    assert_eq!(forms[0]["name"], "Form 14");

    // Second page
    let resp = fixture
        .client
        .get(fixture.url("?limit=10&offset=10"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let forms = body["data"]["forms"].as_array().unwrap();
    assert_eq!(forms.len(), 5);
    assert_eq!(body["data"]["total"], 15);
    assert_eq!(forms[0]["name"], "Form 04");
    assert_eq!(forms[4]["name"], "Form 00");
}

#[tokio::test]
async fn test_add_field_preserves_order() {
    let fixture = TestFixture::new().await;

    let created = fixture.create_form("Intake").await;
    let id = created["data"]["id"].as_str().unwrap();

    let resp = fixture
        .client
        .put(fixture.url(&format!("?id={}&action=addField", id)))
        .json(&json!({ "name": "phone", "label": "Phone", "type": "input" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let fields = body["data"]["fields"].as_array().unwrap();
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0]["name"], "email");
    assert_eq!(fields[1]["name"], "phone");
    assert!(!fields[1]["id"].as_str().unwrap().is_empty());

    // Reloading shows the same order
    let get_resp = fixture
        .client
        .get(fixture.url(&format!("?id={}", id)))
        .send()
        .await
        .unwrap();
    let get_body: Value = get_resp.json().await.unwrap();
    assert_eq!(get_body["data"]["fields"], body["data"]["fields"]);
}

#[tokio::test]
async fn test_update_field_end_to_end() {
    let fixture = TestFixture::new().await;

    let created = fixture.create_form("Intake").await;
    let id = created["data"]["id"].as_str().unwrap();
    let field_id = created["data"]["fields"][0]["id"].as_str().unwrap();

    let resp = fixture
        .client
        .put(fixture.url(&format!(
            "?id={}&action=updateField&fieldId={}",
            id, field_id
        )))
        .json(&json!({ "required": false }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let field = &body["data"]["fields"][0];
    assert_eq!(field["id"], field_id);
    assert_eq!(field["required"], false);
    assert_eq!(field["name"], "email");
    assert_eq!(field["label"], "Email");
    assert_eq!(field["type"], "email");
}

#[tokio::test]
async fn test_update_missing_field_leaves_document_unchanged() {
    let fixture = TestFixture::new().await;

    let created = fixture.create_form("Intake").await;
    let id = created["data"]["id"].as_str().unwrap();

    let resp = fixture
        .client
        .put(fixture.url(&format!(
            "?id={}&action=updateField&fieldId=no-such-field",
            id
        )))
        .json(&json!({ "label": "Y" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "FIELD_NOT_FOUND");

    let get_resp = fixture
        .client
        .get(fixture.url(&format!("?id={}", id)))
        .send()
        .await
        .unwrap();
    let get_body: Value = get_resp.json().await.unwrap();
    assert_eq!(get_body["data"]["fields"], created["data"]["fields"]);
    assert_eq!(get_body["data"]["updatedAt"], created["data"]["updatedAt"]);
}

#[tokio::test]
async fn test_remove_field_then_again_fails() {
    let fixture = TestFixture::new().await;

    let created = fixture.create_form("Intake").await;
    let id = created["data"]["id"].as_str().unwrap();
    let field_id = created["data"]["fields"][0]["id"].as_str().unwrap();

    let resp = fixture
        .client
        .delete(fixture.url(&format!(
            "?id={}&action=removeField&fieldId={}",
            id, field_id
        )))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"]["fields"].as_array().unwrap().is_empty());

    // Removing the already-absent field reports FieldNotFound
    let resp2 = fixture
        .client
        .delete(fixture.url(&format!(
            "?id={}&action=removeField&fieldId={}",
            id, field_id
        )))
        .send()
        .await
        .unwrap();

    assert_eq!(resp2.status(), 404);
    let body2: Value = resp2.json().await.unwrap();
    assert_eq!(body2["error"]["code"], "FIELD_NOT_FOUND");
}

#[tokio::test]
async fn test_delete_form() {
    let fixture = TestFixture::new().await;

    let created = fixture.create_form("Intake").await;
    let id = created["data"]["id"].as_str().unwrap();

    let resp = fixture
        .client
        .delete(fixture.url(&format!("?id={}", id)))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert!(body["message"].as_str().unwrap().contains(id));

    let get_resp = fixture
        .client
        .get(fixture.url(&format!("?id={}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(get_resp.status(), 404);

    let del_again = fixture
        .client
        .delete(fixture.url(&format!("?id={}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(del_again.status(), 404);
}

#[tokio::test]
async fn test_unknown_action_is_rejected() {
    let fixture = TestFixture::new().await;

    let created = fixture.create_form("Intake").await;
    let id = created["data"]["id"].as_str().unwrap();

    let resp = fixture
        .client
        .put(fixture.url(&format!("?id={}&action=replaceEverything", id)))
        .json(&json!({}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_put_without_id_is_rejected() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .put(fixture.url(""))
        .json(&json!({ "name": "X" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_unsupported_verb_gets_allow_header() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .patch(fixture.url(""))
        .json(&json!({}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 405);
    let allow = resp.headers().get("allow").unwrap().to_str().unwrap();
    for verb in ["GET", "POST", "PUT", "DELETE"] {
        assert!(allow.contains(verb), "Allow header misses {}", verb);
    }
}

#[tokio::test]
async fn test_search_endpoint() {
    let fixture = TestFixture::new().await;

    fixture.create_form("Customer Intake").await;
    fixture.create_form("Exit Survey").await;

    let resp = fixture
        .client
        .get(fixture.url("?q=INTAKE"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let hits = body["data"].as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["name"], "Customer Intake");
}

// ==================== CLIENT DATA STORE ====================

fn store_field(name: &str, field_type: FieldType) -> FormField {
    FormField {
        id: String::new(),
        name: name.to_string(),
        label: name.to_string(),
        field_type,
        required: false,
        placeholder: None,
        options: None,
        position: None,
        validation: None,
    }
}

fn store_request(name: &str) -> CreateFormRequest {
    CreateFormRequest {
        name: name.to_string(),
        description: None,
        pdf_url: "https://example.com/doc.pdf".to_string(),
        owner_id: None,
        fields: vec![store_field("email", FieldType::Email)],
    }
}

#[tokio::test]
async fn test_store_create_and_load_sync_cache() {
    let fixture = TestFixture::new().await;
    let mut store = FormStore::new(ApiClient::new(&fixture.base_url).unwrap());

    let created = store.create_form(&store_request("Intake")).await.unwrap();
    assert_eq!(store.forms().len(), 1);
    assert_eq!(store.total_forms(), 1);
    assert_eq!(store.forms()[0].id, created.id);
    assert!(!store.is_loading());
    assert!(store.error().is_none());

    // The typed transport sees the same document
    let fetched = ApiClient::new(&fixture.base_url)
        .unwrap()
        .get_form(&created.id)
        .await
        .unwrap();
    assert_eq!(fetched, created);

    store.create_form(&store_request("Second")).await.unwrap();
    store.load_forms(10, 0).await.unwrap();
    assert_eq!(store.forms().len(), 2);
    assert_eq!(store.total_forms(), 2);
    // Newest-first mirror of the server ordering
    assert_eq!(store.forms()[0].name, "Second");

    // Search goes to the caller without clobbering the paged cache
    let hits = store.search("second", None).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(store.forms().len(), 2);
}

#[tokio::test]
async fn test_store_field_mutations_keep_slices_in_sync() {
    let fixture = TestFixture::new().await;
    let mut store = FormStore::new(ApiClient::new(&fixture.base_url).unwrap());

    let created = store.create_form(&store_request("Intake")).await.unwrap();
    store.select_form(created.clone());

    let updated = store
        .add_field(&created.id, &store_field("phone", FieldType::Input))
        .await
        .unwrap();
    assert_eq!(updated.fields.len(), 2);

    // List entry and selection point at the same revision
    assert_eq!(store.forms()[0].fields.len(), 2);
    assert_eq!(store.selected_form().unwrap().fields.len(), 2);
    assert_eq!(store.forms()[0].version, store.selected_form().unwrap().version);

    let field_id = updated.fields[1].id.clone();
    let request = UpdateFieldRequest {
        label: Some("Phone number".to_string()),
        ..Default::default()
    };
    store
        .update_field(&created.id, &field_id, &request)
        .await
        .unwrap();
    assert_eq!(store.selected_form().unwrap().fields[1].label, "Phone number");

    store.remove_field(&created.id, &field_id).await.unwrap();
    assert_eq!(store.selected_form().unwrap().fields.len(), 1);
    assert_eq!(store.forms()[0].fields.len(), 1);

    // Whole-form updates reconcile the same way
    let rename = crate::models::UpdateFormRequest {
        name: Some("Intake v2".to_string()),
        ..Default::default()
    };
    store.update_form(&created.id, &rename).await.unwrap();
    assert_eq!(store.forms()[0].name, "Intake v2");
    assert_eq!(store.selected_form().unwrap().name, "Intake v2");
}

#[tokio::test]
async fn test_store_records_error_and_returns_it() {
    let fixture = TestFixture::new().await;
    let mut store = FormStore::new(ApiClient::new(&fixture.base_url).unwrap());

    let mut bad = store_request("Broken");
    bad.pdf_url = "nonsense".to_string();

    let err = store.create_form(&bad).await.unwrap_err();
    assert!(matches!(err, crate::errors::AppError::Validation { .. }));
    assert!(store.error().is_some());
    assert!(!store.is_loading());
    assert!(store.forms().is_empty());

    // The next successful action clears the stored message
    store.create_form(&store_request("Fine")).await.unwrap();
    assert!(store.error().is_none());
}

#[tokio::test]
async fn test_store_delete_clears_matching_selection() {
    let fixture = TestFixture::new().await;
    let mut store = FormStore::new(ApiClient::new(&fixture.base_url).unwrap());

    let created = store.create_form(&store_request("Intake")).await.unwrap();
    store.select_form(created.clone());
    store.set_field_value("email", FieldValue::Text("a@b.c".to_string()));

    store.delete_form(&created.id).await.unwrap();
    assert!(store.selected_form().is_none());
    assert!(store.form_data().is_empty());
    assert!(store.forms().is_empty());
    assert_eq!(store.total_forms(), 0);
}
