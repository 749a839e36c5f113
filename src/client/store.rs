//! Client-side data store for the form builder UI.
//!
//! A `FormStore` instance holds the cached form list, the current selection
//! and the in-progress draft values of a preview fill-out. Every async
//! action follows the same discipline: raise the loading flag, clear the
//! previous error, call the transport, and only after the server confirmed
//! the mutation rewrite the affected cache slice. On failure the store
//! records a user-facing message and hands the error back to the caller.

use std::collections::{HashMap, HashSet};

use crate::client::ApiClient;
use crate::errors::AppError;
use crate::models::{
    CreateFormRequest, FieldType, Form, FormField, UpdateFieldRequest, UpdateFormRequest,
};

/// A draft value typed by what the UI captured, not by what some runtime
/// probe guessed. `Empty` is an explicitly cleared input.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    MultiSelect(Vec<String>),
    FileRef(Option<String>),
    Empty,
}

/// Outcome of draft validation: overall pass/fail plus one message per
/// offending field name.
#[derive(Debug, Clone, PartialEq)]
pub struct FormDataReport {
    pub valid: bool,
    pub errors: HashMap<String, String>,
}

/// In-memory cache of forms and draft state, synchronized with the server.
///
/// Constructed explicitly and handed to its consumer (one per client
/// session); actions take `&mut self`, so a store is driven by a single
/// logical thread of control and needs no interior locking.
pub struct FormStore {
    client: ApiClient,
    forms: Vec<Form>,
    total_forms: i64,
    selected_form: Option<Form>,
    selected_fields: HashSet<String>,
    form_data: HashMap<String, FieldValue>,
    loading: bool,
    error: Option<String>,
}

impl FormStore {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            forms: Vec::new(),
            total_forms: 0,
            selected_form: None,
            selected_fields: HashSet::new(),
            form_data: HashMap::new(),
            loading: false,
            error: None,
        }
    }

    // ==================== READ-ONLY ACCESSORS ====================

    pub fn forms(&self) -> &[Form] {
        &self.forms
    }

    pub fn total_forms(&self) -> i64 {
        self.total_forms
    }

    pub fn selected_form(&self) -> Option<&Form> {
        self.selected_form.as_ref()
    }

    pub fn selected_fields(&self) -> &HashSet<String> {
        &self.selected_fields
    }

    pub fn form_data(&self) -> &HashMap<String, FieldValue> {
        &self.form_data
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    // ==================== ASYNC ACTIONS ====================

    /// Fetch a page of forms and mirror it into the cache.
    pub async fn load_forms(&mut self, limit: i64, offset: i64) -> Result<(), AppError> {
        self.begin();
        match self.client.list_forms(limit, offset).await {
            Ok(page) => {
                self.forms = page.forms;
                self.total_forms = page.total;
                self.loading = false;
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Create a form; on success it becomes the newest cache entry.
    pub async fn create_form(&mut self, request: &CreateFormRequest) -> Result<Form, AppError> {
        self.begin();
        match self.client.create_form(request).await {
            Ok(form) => {
                self.forms.insert(0, form.clone());
                self.total_forms += 1;
                self.loading = false;
                Ok(form)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Update a form and reconcile both the list entry and the selection.
    pub async fn update_form(
        &mut self,
        id: &str,
        request: &UpdateFormRequest,
    ) -> Result<Form, AppError> {
        self.begin();
        match self.client.update_form(id, request).await {
            Ok(form) => {
                self.reconcile(form.clone());
                self.loading = false;
                Ok(form)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Delete a form; a deleted selection is cleared along with its drafts.
    pub async fn delete_form(&mut self, id: &str) -> Result<(), AppError> {
        self.begin();
        match self.client.delete_form(id).await {
            Ok(()) => {
                let before = self.forms.len();
                self.forms.retain(|f| f.id != id);
                if self.forms.len() < before {
                    self.total_forms -= 1;
                }
                if self.selected_form.as_ref().is_some_and(|f| f.id == id) {
                    self.clear_selection();
                }
                self.loading = false;
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Append a field to a form.
    pub async fn add_field(&mut self, form_id: &str, field: &FormField) -> Result<Form, AppError> {
        self.begin();
        match self.client.add_field(form_id, field).await {
            Ok(form) => {
                self.reconcile(form.clone());
                self.loading = false;
                Ok(form)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Update one field of a form.
    pub async fn update_field(
        &mut self,
        form_id: &str,
        field_id: &str,
        request: &UpdateFieldRequest,
    ) -> Result<Form, AppError> {
        self.begin();
        match self.client.update_field(form_id, field_id, request).await {
            Ok(form) => {
                self.reconcile(form.clone());
                self.loading = false;
                Ok(form)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Remove one field from a form.
    pub async fn remove_field(&mut self, form_id: &str, field_id: &str) -> Result<Form, AppError> {
        self.begin();
        match self.client.remove_field(form_id, field_id).await {
            Ok(form) => {
                self.selected_fields.remove(field_id);
                self.reconcile(form.clone());
                self.loading = false;
                Ok(form)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Search forms by term. Results go to the caller; the paged cache keeps
    /// mirroring the last list fetch.
    pub async fn search(
        &mut self,
        term: &str,
        owner_id: Option<&str>,
    ) -> Result<Vec<Form>, AppError> {
        self.begin();
        match self.client.search_forms(term, owner_id).await {
            Ok(forms) => {
                self.loading = false;
                Ok(forms)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    // ==================== SELECTION & DRAFT STATE ====================

    /// Select a form for preview/editing. Always resets the field selection
    /// and draft values, including when re-selecting the same form.
    pub fn select_form(&mut self, form: Form) {
        self.selected_fields.clear();
        self.form_data.clear();
        self.selected_form = Some(form);
    }

    /// Drop the selection and its dependent draft state.
    pub fn clear_selection(&mut self) {
        self.selected_fields.clear();
        self.form_data.clear();
        self.selected_form = None;
    }

    /// Toggle a field id in the bulk-operation selection set.
    pub fn toggle_field_selection(&mut self, field_id: &str) {
        if !self.selected_fields.remove(field_id) {
            self.selected_fields.insert(field_id.to_string());
        }
    }

    /// Record a draft value under a field name.
    pub fn set_field_value(&mut self, field_name: &str, value: FieldValue) {
        self.form_data.insert(field_name.to_string(), value);
    }

    /// Discard all draft values.
    pub fn clear_form_data(&mut self) {
        self.form_data.clear();
    }

    /// Check the draft values against the selected form's field definitions.
    /// Pure inspection: the store is not mutated.
    pub fn validate_form_data(&self) -> FormDataReport {
        let mut errors = HashMap::new();

        if let Some(form) = &self.selected_form {
            for field in &form.fields {
                let value = self.form_data.get(&field.name);

                if field.required && !has_value(field.field_type, value) {
                    errors.insert(field.name.clone(), format!("{} is required", field.label));
                    continue;
                }

                let (Some(rules), Some(value)) = (&field.validation, value) else {
                    continue;
                };

                match value {
                    FieldValue::Text(text) => {
                        let length = text.trim().chars().count();
                        if let Some(min_length) = rules.min_length {
                            if length > 0 && length < min_length as usize {
                                errors.insert(
                                    field.name.clone(),
                                    format!(
                                        "{} must be at least {} characters",
                                        field.label, min_length
                                    ),
                                );
                                continue;
                            }
                        }
                        if let Some(max_length) = rules.max_length {
                            if length > max_length as usize {
                                errors.insert(
                                    field.name.clone(),
                                    format!(
                                        "{} must be at most {} characters",
                                        field.label, max_length
                                    ),
                                );
                            }
                        }
                    }
                    FieldValue::Number(number) => {
                        if let Some(min) = rules.min {
                            if *number < min {
                                errors.insert(
                                    field.name.clone(),
                                    format!("{} must be at least {}", field.label, min),
                                );
                                continue;
                            }
                        }
                        if let Some(max) = rules.max {
                            if *number > max {
                                errors.insert(
                                    field.name.clone(),
                                    format!("{} must not exceed {}", field.label, max),
                                );
                            }
                        }
                    }
                    FieldValue::MultiSelect(_) | FieldValue::FileRef(_) | FieldValue::Empty => {}
                }
            }
        }

        FormDataReport {
            valid: errors.is_empty(),
            errors,
        }
    }

    // ==================== INTERNALS ====================

    fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    fn fail(&mut self, err: AppError) -> AppError {
        self.loading = false;
        self.error = Some(err.message());
        err
    }

    /// Rewrite the cached copies of a form after a confirmed mutation, so
    /// the list entry and the selection never diverge.
    fn reconcile(&mut self, form: Form) {
        if let Some(slot) = self.forms.iter_mut().find(|f| f.id == form.id) {
            *slot = form.clone();
        }
        if self
            .selected_form
            .as_ref()
            .is_some_and(|f| f.id == form.id)
        {
            self.selected_form = Some(form);
        }
    }
}

/// Type-aware presence check for required fields: checkboxes need at least
/// one selection, file fields an actual reference, everything else
/// non-blank text (or any number).
fn has_value(field_type: FieldType, value: Option<&FieldValue>) -> bool {
    match (field_type, value) {
        (FieldType::Checkbox, Some(FieldValue::MultiSelect(items))) => !items.is_empty(),
        (FieldType::Checkbox, _) => false,
        (FieldType::File, Some(FieldValue::FileRef(handle))) => handle.is_some(),
        (FieldType::File, _) => false,
        (_, Some(FieldValue::Text(text))) => !text.trim().is_empty(),
        (_, Some(FieldValue::Number(_))) => true,
        (_, Some(FieldValue::MultiSelect(items))) => !items.is_empty(),
        (_, Some(FieldValue::FileRef(handle))) => handle.is_some(),
        (_, Some(FieldValue::Empty)) | (_, None) => false,
    }
}
