//! Common test utilities: in-memory repositories, a recording mailer and
//! service construction helpers

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use form_designer::config::Config;
use form_designer::contract::*;
use form_designer::domain::mail::{BuiltinTemplates, MailMessage, MailTransport};
use form_designer::domain::repository::{DefinitionRepository, LogRepository};
use form_designer::domain::{FieldCompiler, Service};
use parking_lot::RwLock;
use std::sync::Arc;
use tempfile::TempDir;

/// Route domain logs to the test output; RUST_LOG selects the level
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn print_test_header(test_name: &str, purpose: &[&str]) {
    println!("\n🧪 TEST: {}", test_name);
    if let Some(first) = purpose.first() {
        println!("📋 PURPOSE: {}", first);
    }
    for line in purpose.iter().skip(1) {
        println!("   {}", line);
    }
}

// ===== Definition repository =====

#[derive(Clone, Default)]
pub struct MockDefinitionRepo {
    data: Arc<RwLock<Vec<FormDefinition>>>,
    next_id: Arc<RwLock<i32>>,
}

impl MockDefinitionRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.data.read().len()
    }

    /// Print verbose information about repository state
    pub fn print_state(&self, context: &str) {
        let data = self.data.read();
        println!("\n========== DefinitionRepository State: {} ==========", context);
        for definition in data.iter() {
            println!(
                "  - #{} {} ({} fields, public hash {})",
                definition.id,
                definition.name,
                definition.fields.len(),
                definition.public_hash
            );
        }
    }

    fn assign_ids(&self, definition: &mut FormDefinition) {
        let mut next = self.next_id.write();
        if definition.id == 0 {
            *next += 1;
            definition.id = *next;
        }
        for field in &mut definition.fields {
            if field.id == 0 {
                *next += 1;
                field.id = *next;
            }
        }
    }
}

#[async_trait]
impl DefinitionRepository for MockDefinitionRepo {
    async fn create(&self, definition: &FormDefinition) -> anyhow::Result<FormDefinition> {
        let mut stored = definition.clone();
        self.assign_ids(&mut stored);
        self.data.write().push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, definition: &FormDefinition) -> anyhow::Result<FormDefinition> {
        let mut stored = definition.clone();
        self.assign_ids(&mut stored);
        let mut data = self.data.write();
        let slot = data
            .iter_mut()
            .find(|d| d.id == stored.id)
            .ok_or_else(|| anyhow::anyhow!("definition {} missing", stored.id))?;
        *slot = stored.clone();
        Ok(stored)
    }

    async fn find_by_id(&self, id: i32) -> anyhow::Result<Option<FormDefinition>> {
        Ok(self.data.read().iter().find(|d| d.id == id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> anyhow::Result<Option<FormDefinition>> {
        Ok(self.data.read().iter().find(|d| d.name == name).cloned())
    }

    async fn find_by_public_hash(&self, hash: &str) -> anyhow::Result<Option<FormDefinition>> {
        Ok(self.data.read().iter().find(|d| d.public_hash == hash).cloned())
    }

    async fn list_all(&self) -> anyhow::Result<Vec<FormDefinition>> {
        let mut all = self.data.read().clone();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn delete(&self, id: i32) -> anyhow::Result<()> {
        self.data.write().retain(|d| d.id != id);
        Ok(())
    }
}

// ===== Log repository =====

#[derive(Clone, Default)]
pub struct MockLogRepo {
    data: Arc<RwLock<Vec<FormLog>>>,
    failing_saves: Arc<RwLock<bool>>,
}

impl MockLogRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `save` fail
    pub fn fail_saves(&self) {
        *self.failing_saves.write() = true;
    }

    pub fn count(&self) -> usize {
        self.data.read().len()
    }

    pub fn all(&self) -> Vec<FormLog> {
        self.data.read().clone()
    }
}

fn to_values(entries: &[FormValueEntry]) -> Vec<FormValue> {
    entries
        .iter()
        .map(|entry| FormValue {
            field_name: entry.name.clone(),
            value: entry.value.clone(),
        })
        .collect()
}

#[async_trait]
impl LogRepository for MockLogRepo {
    async fn save(&self, pending: &PendingLog) -> anyhow::Result<FormLog> {
        if *self.failing_saves.read() {
            anyhow::bail!("log storage unavailable");
        }
        let mut data = self.data.write();
        let log = FormLog {
            id: data.iter().map(|l| l.id).max().unwrap_or(0) + 1,
            form_definition_id: pending.form_definition_id,
            created_at: Utc::now(),
            created_by: pending.created_by.clone(),
            values: to_values(&pending.values),
        };
        data.push(log.clone());
        Ok(log)
    }

    async fn replace_values(&self, log_id: i32, values: &[FormValueEntry]) -> anyhow::Result<()> {
        let mut data = self.data.write();
        let log = data
            .iter_mut()
            .find(|l| l.id == log_id)
            .ok_or_else(|| anyhow::anyhow!("log {} missing", log_id))?;
        log.values = to_values(values);
        Ok(())
    }

    async fn find_by_id(&self, id: i32) -> anyhow::Result<Option<FormLog>> {
        Ok(self.data.read().iter().find(|l| l.id == id).cloned())
    }

    async fn find_by_definition(&self, definition_id: i32) -> anyhow::Result<Vec<FormLog>> {
        Ok(self
            .data
            .read()
            .iter()
            .filter(|l| l.form_definition_id == definition_id)
            .cloned()
            .collect())
    }

    async fn find_by_ids(&self, ids: &[i32]) -> anyhow::Result<Vec<FormLog>> {
        let mut logs: Vec<FormLog> = self
            .data
            .read()
            .iter()
            .filter(|l| ids.contains(&l.id))
            .cloned()
            .collect();
        logs.sort_by_key(|l| l.id);
        Ok(logs)
    }

    async fn list_all(&self) -> anyhow::Result<Vec<FormLog>> {
        Ok(self.data.read().clone())
    }
}

// ===== Mail transport =====

/// Keeps every sent message; fails every send when `failing` is set
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<RwLock<Vec<MailMessage>>>,
    failing: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Arc::default(),
            failing: true,
        }
    }

    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.read().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn send(&self, message: &MailMessage) -> anyhow::Result<()> {
        if self.failing {
            anyhow::bail!("SMTP connection refused");
        }
        self.sent.write().push(message.clone());
        Ok(())
    }
}

// ===== Service construction =====

pub struct TestContext {
    pub service: Arc<Service>,
    pub definitions: MockDefinitionRepo,
    pub logs: MockLogRepo,
    pub mailer: RecordingMailer,
    /// Keeps upload directories alive for the test
    pub dir: TempDir,
}

pub fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.uploads.storage_dir = dir.path().join("storage");
    config.uploads.temp_dir = dir.path().join("tmp");
    config
}

pub fn create_test_context() -> TestContext {
    create_test_context_with(RecordingMailer::new(), |_| {})
}

pub fn create_test_context_with(mailer: RecordingMailer, configure: impl FnOnce(&mut Config)) -> TestContext {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&dir);
    configure(&mut config);

    let definitions = MockDefinitionRepo::new();
    let logs = MockLogRepo::new();
    let fields = FieldCompiler::new(
        &config.enabled_field_kinds().unwrap(),
        &config.enabled_widgets().unwrap(),
    );
    let service = Service::new(
        &config,
        Arc::new(definitions.clone()),
        Arc::new(logs.clone()),
        fields,
        Arc::new(BuiltinTemplates::default()),
        Arc::new(mailer.clone()),
    )
    .unwrap();

    TestContext {
        service: Arc::new(service),
        definitions,
        logs,
        mailer,
        dir,
    }
}

// ===== Fixtures =====

pub fn field(name: &str, kind: FieldKind, position: i32) -> FormDefinitionField {
    let mut field = FormDefinitionField::new(name, kind);
    field.position = position;
    field
}

/// Contact form: name, email and an optional message, mailed to the sender
pub fn contact_definition() -> FormDefinition {
    let mut definition = FormDefinition::new("contact");
    definition.title = Some("Contact us".to_string());
    definition.mail_to = Some("office@example.com, {{ email }}".to_string());
    definition.mail_subject = Some("New message from {{ name }}".to_string());

    let mut name = field("name", FieldKind::Char, 1);
    name.label = Some("Your name".to_string());
    name.max_length = Some(50);
    let mut email = field("email", FieldKind::Email, 2);
    email.label = Some("Email".to_string());
    let mut message = field("message", FieldKind::Char, 3);
    message.required = false;

    definition.fields = vec![name, email, message];
    definition
}
