//! SeaORM storage tests against in-memory SQLite

use form_designer::contract::*;
use form_designer::domain::{FormData, ProcessOptions, SubmissionRequest};
use form_designer::FormDesignerModule;
use serde_json::json;
use std::sync::Arc;

mod common;
use common::*;

async fn init_module(dir: &tempfile::TempDir) -> (FormDesignerModule, RecordingMailer) {
    init_tracing();
    let mailer = RecordingMailer::new();
    let module = FormDesignerModule::default();
    module.set_mail_transport(Arc::new(mailer.clone()));
    module
        .init(test_config(dir))
        .await
        .expect("Failed to initialize module");
    (module, mailer)
}

fn submission(data: &[(&str, &str)]) -> SubmissionRequest {
    let mut form: FormData = data.iter().copied().collect();
    form.push("submit__contact", "True");
    SubmissionRequest {
        method: FormMethod::Post,
        data: form,
        user: Some("admin".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_definition_round_trip_through_database() {
    let dir = tempfile::tempdir().unwrap();
    let (module, _) = init_module(&dir).await;
    let service = module.service().unwrap();
    print_test_header(
        "test_definition_round_trip_through_database",
        &["Definitions and their fields survive storage; updates replace the field set."],
    );

    let mut definition = contact_definition();
    definition.method = FormMethod::Get;
    definition.fields[0].widget = Some(WidgetKind::Textarea);
    definition.fields[2].min_value = Some(1.5);
    let created = service.create_definition(definition).await.unwrap();

    let loaded = service.get_definition(created.id).await.unwrap();
    assert_eq!(loaded, created);
    assert_eq!(loaded.method, FormMethod::Get);
    assert_eq!(loaded.fields[0].widget, Some(WidgetKind::Textarea));
    assert_eq!(loaded.fields[2].min_value, Some(1.5));

    let mut changed = loaded.clone();
    changed.fields.remove(2);
    changed.fields[0].position = 10;
    let updated = service.update_definition(changed).await.unwrap();
    let names: Vec<&str> = updated.ordered_fields().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["email", "name"]);
    assert_eq!(updated.public_hash, created.public_hash);

    let by_hash = service.get_definition_by_hash(&created.public_hash).await.unwrap();
    assert_eq!(by_hash.id, created.id);
}

#[tokio::test]
async fn test_submission_log_persists_values() {
    let dir = tempfile::tempdir().unwrap();
    let (module, mailer) = init_module(&dir).await;
    let service = module.service().unwrap();

    let definition = service.create_definition(contact_definition()).await.unwrap();
    let outcome = service
        .process_submission(
            &definition,
            submission(&[("name", "Ada"), ("email", "ada@example.com")]),
            ProcessOptions::default(),
        )
        .await
        .unwrap();
    let log = outcome.log.expect("log");
    assert_eq!(mailer.sent().len(), 1);

    let logged = service.read_log(log.id).await.unwrap();
    assert_eq!(logged.log.created_by.as_deref(), Some("admin"));
    assert_eq!(logged.data[0].value, json!("Ada"));
    assert_eq!(logged.data[1].value, json!("ada@example.com"));
    assert_eq!(logged.data[2].value, json!(""));

    let replacement = vec![
        FormValueEntry::new("name", json!("Grace"), None),
        FormValueEntry::new("email", serde_json::Value::Null, None),
    ];
    service.record_values(log.id, &replacement).await.unwrap();
    service.record_values(log.id, &replacement).await.unwrap();

    let logged = service.read_log(log.id).await.unwrap();
    assert_eq!(logged.log.values.len(), 2);
    assert_eq!(logged.data[0].value, json!("Grace"));
    assert_eq!(logged.data[1].value, serde_json::Value::Null);
}

#[tokio::test]
async fn test_export_and_delete_cascade() {
    let dir = tempfile::tempdir().unwrap();
    let (module, _) = init_module(&dir).await;
    let service = module.service().unwrap();

    let definition = service.create_definition(contact_definition()).await.unwrap();
    for name in ["Ada", "Grace"] {
        service
            .process_submission(
                &definition,
                submission(&[("name", name), ("email", "x@example.com")]),
                ProcessOptions::default(),
            )
            .await
            .unwrap();
    }

    let file = service
        .export("csv", ExportSelection::Definition("contact".to_string()))
        .await
        .unwrap();
    let text = String::from_utf8(file.body).unwrap();
    assert_eq!(text.lines().count(), 3);
    assert!(text.lines().next().unwrap().starts_with("Created,ID,Your name"));

    service.delete_definition(definition.id).await.unwrap();
    assert!(matches!(
        service.list_logs("contact").await,
        Err(FormsError::NotFound { .. })
    ));
    let file = service.export("csv", ExportSelection::All).await.unwrap();
    assert!(file.body.is_empty(), "logs are deleted with their definition");
}

#[tokio::test]
async fn test_native_client_lists_exporters() {
    let dir = tempfile::tempdir().unwrap();
    let (module, _) = init_module(&dir).await;
    let client = module.client().unwrap();

    assert!(client.available_exporters().contains(&"CSV".to_string()));
    client.create_definition(contact_definition()).await.unwrap();
    let found = client.find_definition_by_name("contact").await.unwrap();
    assert_eq!(client.list_definitions().await.unwrap(), vec![found]);
}

#[tokio::test]
async fn test_uninitialized_module_has_no_service() {
    let module = FormDesignerModule::default();
    assert!(module.service().is_err());
    assert!(module.register_rest(axum::Router::new()).is_err());
}
