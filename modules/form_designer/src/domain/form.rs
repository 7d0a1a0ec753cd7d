//! Form compiler: assembles a bindable runtime form from a definition
//!
//! The compiled form carries the definition's fields in position order plus a
//! hidden boolean submission marker. Deployments can replace the compiler
//! process-wide with [`install_form_compiler`] or per call through the
//! submission options.

use super::fields::{FieldCompiler, FieldParams, FieldSpec, InitialValue, RawInput};
use super::uploads::{self, UploadPolicy, UploadedFile};
use crate::contract::{FieldKind, FormDefinition, FormsError, WidgetKind};
use once_cell::sync::OnceCell;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Ordered, multi-valued mapping of submitted or query parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    entries: Vec<(String, String)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Last value submitted under `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn get_all(&self, name: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Compiled form for one request; bound, validated and then discarded
#[derive(Debug, Clone)]
pub struct RuntimeForm {
    pub definition_name: String,
    /// Name of the hidden submission marker field
    pub submit_flag: String,
    /// Definition fields in position order followed by the marker
    pub fields: Vec<FieldSpec>,
    pub data: Option<FormData>,
    pub files: HashMap<String, UploadedFile>,
    pub cleaned_data: Map<String, Value>,
    pub errors: BTreeMap<String, Vec<String>>,
    pub non_field_errors: Vec<String>,
}

impl RuntimeForm {
    pub fn new(definition_name: impl Into<String>, submit_flag: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        let submit_flag = submit_flag.into();
        let mut form = Self {
            definition_name: definition_name.into(),
            submit_flag: submit_flag.clone(),
            fields,
            data: None,
            files: HashMap::new(),
            cleaned_data: Map::new(),
            errors: BTreeMap::new(),
            non_field_errors: Vec::new(),
        };
        form.fields.push(marker_field(submit_flag));
        form
    }

    pub fn is_bound(&self) -> bool {
        self.data.is_some()
    }

    pub fn bind(&mut self, data: FormData, files: Vec<UploadedFile>) {
        self.data = Some(data);
        self.files = files
            .into_iter()
            .map(|file| (file.field_name.clone(), file))
            .collect();
    }

    /// Bound with no field or form errors
    pub fn is_valid(&self) -> bool {
        self.is_bound() && self.errors.is_empty() && self.non_field_errors.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Record an error on a field, or on the whole form when `field` is None
    pub fn add_error(&mut self, field: Option<&str>, message: impl Into<String>) {
        let message = message.into();
        match field {
            Some(name) => {
                self.cleaned_data.remove(name);
                self.errors.entry(name.to_string()).or_default().push(message);
            }
            None => self.non_field_errors.push(message),
        }
    }

    /// Fresh unbound copy with the same fields, used after a clearing success
    pub fn cleared(&self) -> Self {
        Self {
            definition_name: self.definition_name.clone(),
            submit_flag: self.submit_flag.clone(),
            fields: self.fields.clone(),
            data: None,
            files: HashMap::new(),
            cleaned_data: Map::new(),
            errors: BTreeMap::new(),
            non_field_errors: Vec::new(),
        }
    }

    fn clean_fields(&mut self) {
        let Some(data) = self.data.clone() else {
            return;
        };
        for field in &self.fields {
            let values = data.get_all(&field.name);
            let file = self
                .files
                .get(&field.name)
                .map(|f| (f.file_name.as_str(), f.size));
            match field.clean(RawInput { values: &values, file }) {
                Ok(value) => {
                    let value = match self.files.get(&field.name) {
                        Some(upload) if field.kind.is_file() => upload.cleaned_value(),
                        _ => value,
                    };
                    self.cleaned_data.insert(field.name.clone(), value);
                }
                Err(message) => {
                    self.errors.entry(field.name.clone()).or_default().push(message);
                }
            }
        }
    }
}

fn marker_field(name: String) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Boolean,
        required: false,
        label: String::new(),
        initial: Some(InitialValue::Single("True".to_string())),
        help_text: None,
        widget: WidgetKind::HiddenInput,
        params: FieldParams::Basic,
    }
}

/// Marker name for a definition
///
/// `%s` in the template is replaced by the definition name; underscores are
/// appended until the name collides with no real field.
pub fn submit_flag_name(definition: &FormDefinition, template: &str) -> String {
    let mut name = template.replace("%s", &definition.name);
    while definition.fields.iter().any(|field| field.name == name) {
        name.push('_');
    }
    name
}

/// Registries a compiler needs from the host
pub struct CompileContext<'a> {
    pub fields: &'a FieldCompiler,
    pub submit_flag_template: &'a str,
}

/// Builds runtime forms from definitions
pub trait FormCompiler: Send + Sync {
    fn compile(
        &self,
        ctx: &CompileContext<'_>,
        definition: &FormDefinition,
        initial: Option<&FormData>,
    ) -> Result<RuntimeForm, FormsError>;

    /// Cross-field validation run after field cleaning and upload checks
    fn clean(&self, _form: &mut RuntimeForm) {}
}

/// Default compiler: every definition field in position order plus the marker
#[derive(Debug, Default, Clone, Copy)]
pub struct DesignedFormCompiler;

impl FormCompiler for DesignedFormCompiler {
    fn compile(
        &self,
        ctx: &CompileContext<'_>,
        definition: &FormDefinition,
        initial: Option<&FormData>,
    ) -> Result<RuntimeForm, FormsError> {
        compile_designed_form(ctx, definition, initial)
    }
}

/// Shared construction used by the default compiler and custom compilers
pub fn compile_designed_form(
    ctx: &CompileContext<'_>,
    definition: &FormDefinition,
    initial: Option<&FormData>,
) -> Result<RuntimeForm, FormsError> {
    let fields = definition
        .ordered_fields()
        .into_iter()
        .map(|field| {
            let seeded = initial
                .filter(|data| data.contains(&field.name))
                .map(|data| {
                    if field.field_class.is_multi_valued() {
                        InitialValue::Multi(data.get_all(&field.name))
                    } else {
                        InitialValue::Single(data.get(&field.name).unwrap_or_default().to_string())
                    }
                });
            ctx.fields.compile(field, seeded)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RuntimeForm::new(
        definition.name.clone(),
        submit_flag_name(definition, ctx.submit_flag_template),
        fields,
    ))
}

static FORM_COMPILER: OnceCell<Arc<dyn FormCompiler>> = OnceCell::new();

/// Install the process-wide compiler; allowed once, before first use
pub fn install_form_compiler(compiler: Arc<dyn FormCompiler>) -> Result<(), FormsError> {
    FORM_COMPILER
        .set(compiler)
        .map_err(|_| FormsError::configuration("form compiler is already installed"))
}

/// Process-wide compiler, falling back to [`DesignedFormCompiler`]
pub fn form_compiler() -> Arc<dyn FormCompiler> {
    FORM_COMPILER
        .get()
        .cloned()
        .unwrap_or_else(|| Arc::new(DesignedFormCompiler))
}

/// Validate a bound form
///
/// Uploads not sent for a file field of the form are deleted first. Then the
/// field validators, the upload policy and the compiler's cross-field hook
/// run, and temporary uploads of fields that failed are deleted.
pub async fn full_clean(form: &mut RuntimeForm, compiler: &dyn FormCompiler, policy: &UploadPolicy) {
    form.cleaned_data.clear();
    form.errors.clear();
    form.non_field_errors.clear();
    if !form.is_bound() {
        return;
    }

    let unexpected: Vec<String> = form
        .files
        .keys()
        .filter(|name| {
            !form
                .fields
                .iter()
                .any(|field| field.kind.is_file() && field.name == **name)
        })
        .cloned()
        .collect();
    let stray: Vec<UploadedFile> = unexpected
        .iter()
        .filter_map(|name| form.files.remove(name))
        .collect();
    if !stray.is_empty() {
        tracing::warn!(
            form = %form.definition_name,
            count = stray.len(),
            "Discarding uploads that match no file field"
        );
        uploads::discard(stray).await;
    }

    form.clean_fields();

    let violations = policy.check(form.files.values());
    for (field, message) in violations.field_errors {
        form.add_error(Some(&field), message);
    }
    for message in violations.form_errors {
        form.add_error(None, message);
    }

    compiler.clean(form);

    let failed: Vec<String> = form
        .files
        .keys()
        .filter(|name| form.errors.contains_key(*name) || !form.non_field_errors.is_empty())
        .cloned()
        .collect();
    let removed: Vec<UploadedFile> = failed
        .iter()
        .filter_map(|name| form.files.remove(name))
        .collect();
    if !removed.is_empty() {
        tracing::info!(
            form = %form.definition_name,
            count = removed.len(),
            "Discarding uploads of invalid fields"
        );
        uploads::discard(removed).await;
    }
}
