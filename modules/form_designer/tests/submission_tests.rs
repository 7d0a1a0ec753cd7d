//! Integration tests for the submission pipeline

use form_designer::contract::*;
use form_designer::domain::fields::{InitialValue, REQUIRED_MESSAGE};
use form_designer::domain::form::FormData;
use form_designer::domain::submission::{MessageLevel, DEFAULT_ERROR_MESSAGE, DEFAULT_SUCCESS_MESSAGE};
use form_designer::domain::{ProcessOptions, SubmissionRequest, SubmissionState};
use serde_json::json;

mod common;
use common::*;

fn post(data: &[(&str, &str)]) -> SubmissionRequest {
    SubmissionRequest {
        method: FormMethod::Post,
        data: data.iter().copied().collect(),
        ..Default::default()
    }
}

const MARKER: (&str, &str) = ("submit__contact", "True");

#[tokio::test]
async fn test_valid_submission_is_logged_and_mailed() {
    let ctx = create_test_context();
    print_test_header(
        "test_valid_submission_is_logged_and_mailed",
        &["A valid POST creates one log, sends one mail and signals a redirect."],
    );

    let definition = ctx
        .service
        .create_definition(contact_definition())
        .await
        .expect("Failed to create definition");

    let mut request = post(&[
        ("name", "Ada"),
        ("email", "ada@example.com"),
        ("message", "Hello"),
        MARKER,
    ]);
    request.user = Some("ada".to_string());

    let outcome = ctx
        .service
        .process_submission(&definition, request, ProcessOptions::default())
        .await
        .expect("Submission failed");

    assert!(outcome.form_success);
    assert!(!outcome.form_error);
    assert_eq!(outcome.message, DEFAULT_SUCCESS_MESSAGE);
    assert_eq!(outcome.messages.len(), 1);
    assert_eq!(outcome.messages[0].level, MessageLevel::Success);
    assert_eq!(outcome.redirect.as_deref(), Some("?"));
    assert_eq!(
        outcome.trail,
        vec![
            SubmissionState::Bound,
            SubmissionState::Valid,
            SubmissionState::Logged,
            SubmissionState::Notified,
            SubmissionState::Rendered,
        ]
    );
    assert!(!outcome.form.is_bound(), "success_clear hands back a fresh form");

    println!("\n📝 Inspect persisted log");
    let logs = ctx.logs.all();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].created_by.as_deref(), Some("ada"));
    let names: Vec<&str> = logs[0].values.iter().map(|v| v.field_name.as_str()).collect();
    assert_eq!(names, vec!["name", "email", "message"]);
    assert_eq!(logs[0].values[0].value, json!("Ada"));

    println!("\n📝 Inspect sent mail");
    let sent = ctx.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "New message from Ada");
    assert_eq!(sent[0].to, vec!["office@example.com", "ada@example.com"]);
    assert!(sent[0].body.contains("Your name: Ada"));
}

#[tokio::test]
async fn test_missing_required_field_rejects_submission() {
    let ctx = create_test_context();
    print_test_header(
        "test_missing_required_field_rejects_submission",
        &["An invalid POST is neither logged nor mailed and carries field errors."],
    );

    let definition = ctx.service.create_definition(contact_definition()).await.unwrap();
    let outcome = ctx
        .service
        .process_submission(&definition, post(&[("name", "Ada"), MARKER]), ProcessOptions::default())
        .await
        .unwrap();

    assert!(outcome.form_error);
    assert!(!outcome.form_success);
    assert_eq!(outcome.message, DEFAULT_ERROR_MESSAGE);
    assert_eq!(outcome.messages[0].level, MessageLevel::Error);
    assert_eq!(outcome.state(), SubmissionState::Rendered);
    assert!(outcome.reached(SubmissionState::Invalid));
    assert_eq!(outcome.form.errors.get("email"), Some(&vec![REQUIRED_MESSAGE.to_string()]));
    assert!(!outcome.form.errors.contains_key("message"));
    assert!(outcome.redirect.is_none());
    assert_eq!(ctx.logs.count(), 0);
    assert!(ctx.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_custom_messages_and_no_flash() {
    let ctx = create_test_context();
    let mut definition = contact_definition();
    definition.success_message = Some("Got it!".to_string());
    let definition = ctx.service.create_definition(definition).await.unwrap();

    let options = ProcessOptions {
        push_messages: false,
        disable_redirection: true,
        ..Default::default()
    };
    let outcome = ctx
        .service
        .process_submission(
            &definition,
            post(&[("name", "Ada"), ("email", "ada@example.com"), MARKER]),
            options,
        )
        .await
        .unwrap();

    assert_eq!(outcome.message, "Got it!");
    assert!(outcome.messages.is_empty());
    assert!(outcome.redirect.is_none());
}

#[tokio::test]
async fn test_without_marker_form_is_unsubmitted_and_prefilled() {
    let ctx = create_test_context();
    print_test_header(
        "test_without_marker_form_is_unsubmitted_and_prefilled",
        &["Without the hidden marker nothing is processed; query values seed the form."],
    );

    let definition = ctx.service.create_definition(contact_definition()).await.unwrap();
    let request = SubmissionRequest {
        method: FormMethod::Get,
        data: FormData::new(),
        query: [("name", "Ada")].into_iter().collect(),
        ..Default::default()
    };
    let outcome = ctx
        .service
        .process_submission(&definition, request, ProcessOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.trail, vec![SubmissionState::Unsubmitted, SubmissionState::Rendered]);
    assert!(outcome.message.is_empty());
    assert_eq!(
        outcome.form.field("name").and_then(|f| f.initial.clone()),
        Some(InitialValue::Single("Ada".to_string()))
    );
    assert_eq!(ctx.logs.count(), 0);
}

#[tokio::test]
async fn test_prefill_disabled_ignores_query() {
    let ctx = create_test_context();
    let mut definition = contact_definition();
    definition.allow_get_initial = false;
    let definition = ctx.service.create_definition(definition).await.unwrap();

    let request = SubmissionRequest {
        method: FormMethod::Get,
        query: [("name", "Ada")].into_iter().collect(),
        ..Default::default()
    };
    let outcome = ctx
        .service
        .process_submission(&definition, request, ProcessOptions::default())
        .await
        .unwrap();

    assert!(outcome.form.field("name").and_then(|f| f.initial.clone()).is_none());
}

#[tokio::test]
async fn test_method_mismatch_is_not_a_submission() {
    let ctx = create_test_context();
    let definition = ctx.service.create_definition(contact_definition()).await.unwrap();

    let request = SubmissionRequest {
        method: FormMethod::Get,
        data: [("name", "Ada"), ("email", "ada@example.com"), MARKER].into_iter().collect(),
        ..Default::default()
    };
    let outcome = ctx
        .service
        .process_submission(&definition, request, ProcessOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.state(), SubmissionState::Rendered);
    assert!(outcome.reached(SubmissionState::Unsubmitted));
    assert_eq!(ctx.logs.count(), 0);
}

#[tokio::test]
async fn test_get_method_definition_submits_through_query() {
    let ctx = create_test_context();
    let mut definition = contact_definition();
    definition.method = FormMethod::Get;
    definition.mail_to = None;
    let definition = ctx.service.create_definition(definition).await.unwrap();

    let data: FormData = [("name", "Ada"), ("email", "ada@example.com"), MARKER].into_iter().collect();
    let request = SubmissionRequest {
        method: FormMethod::Get,
        data: data.clone(),
        query: data,
        ..Default::default()
    };
    let outcome = ctx
        .service
        .process_submission(&definition, request, ProcessOptions::default())
        .await
        .unwrap();

    assert!(outcome.form_success);
    assert!(outcome.reached(SubmissionState::Logged));
    assert!(!outcome.reached(SubmissionState::Notified), "no recipients, no mail");
    assert!(ctx.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_logging_disabled_still_mails() {
    let ctx = create_test_context();
    let mut definition = contact_definition();
    definition.log_data = false;
    let definition = ctx.service.create_definition(definition).await.unwrap();

    let outcome = ctx
        .service
        .process_submission(
            &definition,
            post(&[("name", "Ada"), ("email", "ada@example.com"), MARKER]),
            ProcessOptions::default(),
        )
        .await
        .unwrap();

    assert!(outcome.log.is_none());
    assert!(outcome.reached(SubmissionState::Notified));
    assert_eq!(ctx.logs.count(), 0);
    assert_eq!(ctx.mailer.sent().len(), 1);
}

#[tokio::test]
async fn test_delivery_failure_keeps_log_and_reports_error() {
    let ctx = create_test_context_with(RecordingMailer::failing(), |_| {});
    print_test_header(
        "test_delivery_failure_keeps_log_and_reports_error",
        &["A failing transport surfaces Delivery; the already persisted log stays."],
    );

    let definition = ctx.service.create_definition(contact_definition()).await.unwrap();
    let result = ctx
        .service
        .process_submission(
            &definition,
            post(&[("name", "Ada"), ("email", "ada@example.com"), MARKER]),
            ProcessOptions::default(),
        )
        .await;

    assert!(matches!(result, Err(FormsError::Delivery { .. })));
    assert_eq!(ctx.logs.count(), 1);
}

#[tokio::test]
async fn test_display_logged_lists_previous_submissions() {
    let ctx = create_test_context();
    let mut definition = contact_definition();
    definition.display_logged = true;
    definition.success_redirect = false;
    definition.mail_to = None;
    let definition = ctx.service.create_definition(definition).await.unwrap();

    for name in ["Ada", "Grace"] {
        ctx.service
            .process_submission(
                &definition,
                post(&[("name", name), ("email", "x@example.com"), MARKER]),
                ProcessOptions::default(),
            )
            .await
            .unwrap();
    }
    let outcome = ctx
        .service
        .process_submission(&definition, SubmissionRequest::default(), ProcessOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.logs.len(), 2);
    assert_eq!(outcome.logs[1].data[0].value, json!("Grace"));
    assert_eq!(outcome.logs[1].data[0].label.as_deref(), Some("Your name"));
}

#[tokio::test]
async fn test_uploaded_file_is_stored_and_attached() {
    let ctx = create_test_context();
    print_test_header(
        "test_uploaded_file_is_stored_and_attached",
        &["Accepted uploads move to storage; the log records their location."],
    );

    let mut definition = contact_definition();
    definition.fields.push(field("cv", FieldKind::File, 4));
    let definition = ctx.service.create_definition(definition).await.unwrap();

    let upload = ctx
        .service
        .spool_upload("cv", "my cv.pdf", Some("application/pdf".to_string()), b"%PDF-1.4")
        .await
        .unwrap();
    let temp_path = upload.path.clone();
    assert!(temp_path.exists());

    let mut request = post(&[("name", "Ada"), ("email", "ada@example.com"), MARKER]);
    request.files = vec![upload];
    let outcome = ctx
        .service
        .process_submission(&definition, request, ProcessOptions::default())
        .await
        .unwrap();

    assert!(outcome.form_success);
    assert!(!temp_path.exists(), "temporary upload is moved away");

    let log = outcome.log.expect("log");
    let cv = log.values.iter().find(|v| v.field_name == "cv").expect("cv value");
    assert_eq!(cv.value["name"], json!("my_cv.pdf"));
    let location = cv.value["url"].as_str().expect("stored location");
    assert!(location.ends_with("/my_cv.pdf"));
    assert!(ctx.dir.path().join("storage").join(location).exists());

    let mail = &ctx.mailer.sent()[0];
    assert_eq!(mail.attachments.len(), 1);
    assert_eq!(mail.attachments[0].file_name, "my_cv.pdf");
}

#[tokio::test]
async fn test_rejected_upload_is_discarded() {
    let ctx = create_test_context_with(RecordingMailer::new(), |config| {
        config.uploads.allowed_file_types = vec!["pdf".to_string()];
    });

    let mut definition = contact_definition();
    definition.fields.push(field("cv", FieldKind::File, 4));
    let definition = ctx.service.create_definition(definition).await.unwrap();

    let upload = ctx
        .service
        .spool_upload("cv", "run.exe", None, b"MZ")
        .await
        .unwrap();
    let temp_path = upload.path.clone();

    let mut request = post(&[("name", "Ada"), ("email", "ada@example.com"), MARKER]);
    request.files = vec![upload];
    let outcome = ctx
        .service
        .process_submission(&definition, request, ProcessOptions::default())
        .await
        .unwrap();

    assert!(outcome.form_error);
    assert_eq!(
        outcome.form.errors.get("cv"),
        Some(&vec!["This file type is not allowed.".to_string()])
    );
    assert!(!temp_path.exists(), "rejected upload is deleted before rendering");
    assert_eq!(ctx.logs.count(), 0);
}

fn stored_files(ctx: &TestContext) -> Vec<std::path::PathBuf> {
    let storage = ctx.dir.path().join("storage");
    let Ok(dirs) = std::fs::read_dir(&storage) else {
        return Vec::new();
    };
    dirs.flatten()
        .flat_map(|dir| std::fs::read_dir(dir.path()).into_iter().flatten().flatten())
        .map(|entry| entry.path())
        .collect()
}

#[tokio::test]
async fn test_upload_without_file_field_is_discarded() {
    let ctx = create_test_context();
    print_test_header(
        "test_upload_without_file_field_is_discarded",
        &["An upload named after no file field is neither stored, mailed nor logged."],
    );

    let definition = ctx.service.create_definition(contact_definition()).await.unwrap();
    let upload = ctx
        .service
        .spool_upload("bogus", "payload.bin", None, b"\x00\x01")
        .await
        .unwrap();
    let temp_path = upload.path.clone();

    let mut request = post(&[("name", "Ada"), ("email", "ada@example.com"), MARKER]);
    request.files = vec![upload];
    let outcome = ctx
        .service
        .process_submission(&definition, request, ProcessOptions::default())
        .await
        .unwrap();

    assert!(outcome.form_success);
    assert!(!temp_path.exists(), "stray upload is deleted");
    assert!(stored_files(&ctx).is_empty());
    assert!(ctx.mailer.sent()[0].attachments.is_empty());
    let log = outcome.log.expect("log");
    assert!(log.values.iter().all(|v| v.field_name != "bogus"));
}

#[tokio::test]
async fn test_stored_uploads_removed_when_logging_fails() {
    let ctx = create_test_context();
    print_test_header(
        "test_stored_uploads_removed_when_logging_fails",
        &["A failed log save leaves no stored upload behind and sends no mail."],
    );

    let mut definition = contact_definition();
    definition.fields.push(field("cv", FieldKind::File, 4));
    let definition = ctx.service.create_definition(definition).await.unwrap();
    let upload = ctx
        .service
        .spool_upload("cv", "cv.pdf", None, b"%PDF-1.4")
        .await
        .unwrap();
    let temp_path = upload.path.clone();
    ctx.logs.fail_saves();

    let mut request = post(&[("name", "Ada"), ("email", "ada@example.com"), MARKER]);
    request.files = vec![upload];
    let result = ctx
        .service
        .process_submission(&definition, request, ProcessOptions::default())
        .await;

    assert!(matches!(result, Err(FormsError::Storage { .. })));
    assert!(!temp_path.exists());
    assert!(stored_files(&ctx).is_empty(), "stored upload is removed");
    assert!(ctx.mailer.sent().is_empty());
}
