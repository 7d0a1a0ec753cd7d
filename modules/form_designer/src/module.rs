//! Module declaration and lifecycle: config, database, service, routes

use crate::config::Config;
use crate::domain::mail::{BuiltinTemplates, LogMailTransport, MailTransport, TemplateResolver};
use crate::domain::{ChoiceSource, FieldCompiler, Service};
use anyhow::{anyhow, Result};
use parking_lot::RwLock;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::path::Path;
use std::sync::Arc;

/// Form designer module
///
/// Collaborators (mail transport, template resolver, choice models) are
/// registered before [`FormDesignerModule::init`]; the service is built once.
pub struct FormDesignerModule {
    config: RwLock<Config>,
    service: RwLock<Option<Arc<Service>>>,
    mailer: RwLock<Arc<dyn MailTransport>>,
    templates: RwLock<Option<Arc<dyn TemplateResolver>>>,
    choice_models: RwLock<Vec<(String, Arc<dyn ChoiceSource>)>>,
}

impl Default for FormDesignerModule {
    fn default() -> Self {
        Self {
            config: RwLock::new(Config::default()),
            service: RwLock::new(None),
            mailer: RwLock::new(Arc::new(LogMailTransport)),
            templates: RwLock::new(None),
            choice_models: RwLock::new(Vec::new()),
        }
    }
}

impl FormDesignerModule {
    pub fn set_mail_transport(&self, mailer: Arc<dyn MailTransport>) {
        *self.mailer.write() = mailer;
    }

    pub fn set_template_resolver(&self, templates: Arc<dyn TemplateResolver>) {
        *self.templates.write() = Some(templates);
    }

    /// Make a choice model available to model choice fields
    ///
    /// The model must also be listed in `choice_models` of the configuration.
    pub fn register_choice_model(&self, name: impl Into<String>, source: Arc<dyn ChoiceSource>) {
        self.choice_models.write().push((name.into(), source));
    }

    /// Load configuration from an optional YAML file plus environment overrides
    pub async fn init_from_file(&self, path: Option<&Path>) -> Result<()> {
        let cfg = Config::load(path)?;
        self.init(cfg).await
    }

    /// Connect to the configured database, migrate it and build the service
    pub async fn init(&self, cfg: Config) -> Result<()> {
        let mut options = ConnectOptions::new(cfg.database_url.clone());
        if cfg.database_url.starts_with("sqlite::memory:") {
            // Every pooled connection would otherwise see its own empty database
            options.max_connections(1);
        }
        options.sqlx_logging(false);
        let db = Database::connect(options).await?;
        self.init_with_connection(cfg, Arc::new(db)).await
    }

    /// Build the service on an existing connection
    pub async fn init_with_connection(&self, cfg: Config, db: Arc<DatabaseConnection>) -> Result<()> {
        cfg.validate()?;
        Self::migrate(&db).await?;

        let definitions = Arc::new(crate::infra::storage::SeaOrmDefinitionRepository::new(db.clone()));
        let logs = Arc::new(crate::infra::storage::SeaOrmLogRepository::new(db));

        let mut fields = FieldCompiler::new(&cfg.enabled_field_kinds()?, &cfg.enabled_widgets()?);
        for (name, source) in self.choice_models.read().iter() {
            fields.register_choice_model(name.clone(), source.clone());
        }

        let templates = self.templates.read().clone().unwrap_or_else(|| {
            Arc::new(BuiltinTemplates::new(
                cfg.message_templates.text.clone(),
                cfg.message_templates.html.clone(),
            ))
        });
        let mailer = self.mailer.read().clone();

        let service = Service::new(&cfg, definitions, logs, fields, templates, mailer)?;
        *self.service.write() = Some(Arc::new(service));
        *self.config.write() = cfg;

        tracing::info!("Form designer initialized");
        Ok(())
    }

    /// Apply pending schema migrations
    pub async fn migrate(db: &DatabaseConnection) -> Result<()> {
        use crate::infra::storage::migrations::Migrator;
        use sea_orm_migration::MigratorTrait;

        Migrator::up(db, None).await?;
        tracing::info!("Form designer migrations completed");
        Ok(())
    }

    pub fn config(&self) -> Config {
        self.config.read().clone()
    }

    pub fn service(&self) -> Result<Arc<Service>> {
        self.service
            .read()
            .as_ref()
            .cloned()
            .ok_or_else(|| anyhow!("Service not initialized"))
    }

    /// In-process client for other modules
    pub fn client(&self) -> Result<Arc<dyn crate::contract::FormsApi>> {
        Ok(Arc::new(crate::api::native::NativeClient::new(self.service()?)))
    }

    /// Mount the REST API on `router`
    pub fn register_rest(&self, router: axum::Router) -> Result<axum::Router> {
        let service = self.service()?;
        tracing::info!("Registering form designer REST routes");
        Ok(crate::api::rest::routes::register_routes(router, service))
    }
}
