//! Submission processor
//!
//! One request runs through Unsubmitted or Bound, then Valid or Invalid. A
//! valid submission is optionally Logged and Notified; every path ends in
//! Rendered with an outcome for the presentation layer. Logging and
//! notification are gated by independent definition flags.

use super::fields::FieldCompiler;
use super::form::{self, CompileContext, FormCompiler, FormData, RuntimeForm};
use super::log_store::{extract_form_data, reconcile};
use super::mail::{build_form_mail, MailMessage, MailTransport, TemplateResolver};
use super::repository::LogRepository;
use super::uploads::{self, UploadPolicy, UploadedFile};
use crate::contract::{FormDefinition, FormLog, FormMethod, FormsError, LoggedSubmission, PendingLog};
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_SUCCESS_MESSAGE: &str = "Thank you, the data was submitted successfully.";
pub const DEFAULT_ERROR_MESSAGE: &str = "The data could not be submitted, please try again.";

/// Pipeline stage reached by a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Unsubmitted,
    Bound,
    Valid,
    Invalid,
    Logged,
    Notified,
    Rendered,
}

/// Request-like input of one submission
#[derive(Debug, Clone, Default)]
pub struct SubmissionRequest {
    pub method: FormMethod,
    /// Posted fields for POST, query parameters for GET
    pub data: FormData,
    /// Query string, used for prefilling unsubmitted forms
    pub query: FormData,
    /// Uploads already spooled to temporary storage
    pub files: Vec<UploadedFile>,
    /// Authenticated principal; None for anonymous requests
    pub user: Option<String>,
}

#[derive(Clone)]
pub struct ProcessOptions {
    /// Add a flash message for success or failure
    pub push_messages: bool,
    /// Never signal a redirect, even when the definition asks for one
    pub disable_redirection: bool,
    /// Compiler for this call; the process-wide one otherwise
    pub form_compiler: Option<Arc<dyn FormCompiler>>,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            push_messages: true,
            disable_redirection: false,
            form_compiler: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashMessage {
    pub level: MessageLevel,
    pub text: String,
}

/// Render context produced by the pipeline
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub form_success: bool,
    pub form_error: bool,
    /// Bound form with errors, or a fresh form after a clearing success
    pub form: RuntimeForm,
    pub log: Option<FormLog>,
    pub mail: Option<MailMessage>,
    /// Success or error text; empty when nothing was submitted
    pub message: String,
    pub messages: Vec<FlashMessage>,
    /// Redirect target signalled to the presentation layer
    pub redirect: Option<String>,
    /// Logged submissions shown inline, oldest first
    pub logs: Vec<LoggedSubmission>,
    /// Stages passed, in order
    pub trail: Vec<SubmissionState>,
}

impl SubmissionOutcome {
    pub fn state(&self) -> SubmissionState {
        self.trail.last().copied().unwrap_or(SubmissionState::Unsubmitted)
    }

    pub fn reached(&self, state: SubmissionState) -> bool {
        self.trail.contains(&state)
    }
}

/// Collaborators and settings the pipeline needs
pub struct SubmissionProcessor {
    pub(crate) fields: Arc<FieldCompiler>,
    pub(crate) submit_flag_template: String,
    pub(crate) upload_policy: UploadPolicy,
    pub(crate) storage_dir: PathBuf,
    pub(crate) templates: Arc<dyn TemplateResolver>,
    pub(crate) default_templates: (String, String),
    pub(crate) mailer: Arc<dyn MailTransport>,
    pub(crate) logs: Arc<dyn LogRepository>,
    pub(crate) default_success_message: String,
    pub(crate) default_error_message: String,
}

impl SubmissionProcessor {
    fn compile_context(&self) -> CompileContext<'_> {
        CompileContext {
            fields: &self.fields,
            submit_flag_template: &self.submit_flag_template,
        }
    }

    /// Compile a fresh runtime form for a definition
    pub fn compile(
        &self,
        compiler: &dyn FormCompiler,
        definition: &FormDefinition,
        initial: Option<&FormData>,
    ) -> Result<RuntimeForm, FormsError> {
        compiler.compile(&self.compile_context(), definition, initial)
    }

    /// Run one submission through the pipeline
    pub async fn process(
        &self,
        definition: &FormDefinition,
        request: SubmissionRequest,
        options: ProcessOptions,
    ) -> Result<SubmissionOutcome, FormsError> {
        let compiler = options.form_compiler.clone().unwrap_or_else(form::form_compiler);
        let success_message = non_empty(definition.success_message.as_deref())
            .unwrap_or(self.default_success_message.as_str())
            .to_string();
        let error_message = non_empty(definition.error_message.as_deref())
            .unwrap_or(self.default_error_message.as_str())
            .to_string();

        let SubmissionRequest {
            method,
            data,
            query,
            files,
            user,
        } = request;

        let mut form = self.compile(compiler.as_ref(), definition, None)?;
        let submitted = method == definition.method
            && data.get(&form.submit_flag).is_some_and(|flag| !flag.is_empty());

        let mut outcome = SubmissionOutcome {
            form_success: false,
            form_error: false,
            form: form.cleared(),
            log: None,
            mail: None,
            message: String::new(),
            messages: Vec::new(),
            redirect: None,
            logs: Vec::new(),
            trail: Vec::new(),
        };

        if !submitted {
            uploads::discard(files).await;
            outcome.trail.push(SubmissionState::Unsubmitted);
            if definition.allow_get_initial && !query.is_empty() {
                outcome.form = self.compile(compiler.as_ref(), definition, Some(&query))?;
            }
            return self.render(definition, outcome).await;
        }

        let files = match method {
            FormMethod::Post => files,
            FormMethod::Get => {
                uploads::discard(files).await;
                Vec::new()
            }
        };
        form.bind(data, files);
        outcome.trail.push(SubmissionState::Bound);

        form::full_clean(&mut form, compiler.as_ref(), &self.upload_policy).await;

        if !form.is_valid() {
            tracing::info!(
                form = %definition.name,
                errors = form.errors.len() + form.non_field_errors.len(),
                "Submission rejected"
            );
            uploads::discard(form.files.drain().map(|(_, file)| file)).await;
            outcome.trail.push(SubmissionState::Invalid);
            outcome.form_error = true;
            outcome.message = error_message.clone();
            if options.push_messages {
                outcome.messages.push(FlashMessage {
                    level: MessageLevel::Error,
                    text: error_message,
                });
            }
            outcome.form = form;
            return self.render(definition, outcome).await;
        }

        outcome.trail.push(SubmissionState::Valid);
        tracing::info!(form = %definition.name, "Submission accepted");

        let files = self
            .handle_uploaded_files(definition, &mut form)
            .await
            .map_err(FormsError::storage)?;

        outcome.form_success = true;
        outcome.message = success_message.clone();
        if options.push_messages {
            outcome.messages.push(FlashMessage {
                level: MessageLevel::Success,
                text: success_message,
            });
        }

        let entries = extract_form_data(definition, &form);

        if definition.log_data {
            let pending = PendingLog {
                form_definition_id: definition.id,
                created_by: user,
                values: entries.clone(),
            };
            match self.logs.save(&pending).await {
                Ok(log) => {
                    tracing::info!(form = %definition.name, log_id = log.id, "Submission logged");
                    outcome.log = Some(log);
                    outcome.trail.push(SubmissionState::Logged);
                }
                Err(e) => {
                    uploads::purge(files).await;
                    return Err(FormsError::storage(e));
                }
            }
        }

        let mail = build_form_mail(
            definition,
            &entries,
            &files,
            self.templates.as_ref(),
            (self.default_templates.0.as_str(), self.default_templates.1.as_str()),
        );
        let mail = match mail {
            Ok(mail) => mail,
            Err(e) => {
                uploads::discard(files).await;
                return Err(e);
            }
        };
        if let Some(message) = mail {
            if let Err(e) = self.mailer.send(&message).await {
                tracing::error!(form = %definition.name, "Mail delivery failed: {:?}", e);
                uploads::discard(files).await;
                return Err(FormsError::Delivery {
                    message: e.to_string(),
                });
            }
            tracing::info!(form = %definition.name, recipients = message.to.len(), "Submission mail sent");
            outcome.mail = Some(message);
            outcome.trail.push(SubmissionState::Notified);
        }
        uploads::discard(files).await;

        if definition.success_redirect && !options.disable_redirection {
            outcome.redirect = Some(
                non_empty(definition.action.as_deref())
                    .unwrap_or("?")
                    .to_string(),
            );
        }

        outcome.form = if definition.success_clear {
            form.cleared()
        } else {
            form
        };
        self.render(definition, outcome).await
    }

    /// Move accepted uploads to permanent storage when the definition asks for it
    ///
    /// Returns every upload for attachment; unsaved ones are still temporary.
    /// When storing fails, every upload of the submission is removed.
    async fn handle_uploaded_files(
        &self,
        definition: &FormDefinition,
        form: &mut RuntimeForm,
    ) -> anyhow::Result<Vec<UploadedFile>> {
        let mut files: Vec<UploadedFile> = form.files.drain().map(|(_, file)| file).collect();
        files.sort_by(|a, b| a.field_name.cmp(&b.field_name));
        if definition.save_uploaded_files {
            let mut failure = None;
            for file in &mut files {
                if let Err(e) = uploads::store(&self.storage_dir, file).await {
                    failure = Some(e);
                    break;
                }
                form.cleaned_data
                    .insert(file.field_name.clone(), file.cleaned_value());
            }
            if let Some(e) = failure {
                uploads::purge(files).await;
                return Err(e);
            }
        }
        Ok(files)
    }

    async fn render(
        &self,
        definition: &FormDefinition,
        mut outcome: SubmissionOutcome,
    ) -> Result<SubmissionOutcome, FormsError> {
        if definition.display_logged && outcome.redirect.is_none() {
            let logs = self
                .logs
                .find_by_definition(definition.id)
                .await
                .map_err(FormsError::storage)?;
            let fields = definition.ordered_fields();
            outcome.logs = logs
                .into_iter()
                .map(|log| {
                    let data = reconcile(&fields, &log.values);
                    LoggedSubmission { log, data }
                })
                .collect();
        }
        outcome.trail.push(SubmissionState::Rendered);
        Ok(outcome)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}
