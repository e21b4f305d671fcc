// ── Form state ──
//
// Named field values plus per-field error messages for one form. There
// are no declarative rules: callers inspect values, call
// `set_field_error`, and only then submit.

use std::future::Future;

use indexmap::IndexMap;
use tokio::sync::watch;

/// Error key for failures that belong to no single field.
pub const FORM_ERROR_KEY: &str = "form";

#[derive(Debug)]
pub struct FormState {
    values: IndexMap<String, String>,
    errors: IndexMap<String, String>,
    initial: IndexMap<String, String>,
    submitting: watch::Sender<bool>,
}

/// Resets the submitting flag however the submission ends, including
/// when its future is dropped half-way.
struct SubmitGuard<'a>(&'a watch::Sender<bool>);

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.0.send_replace(false);
    }
}

impl FormState {
    pub fn new<K, V>(initial: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let initial: IndexMap<String, String> = initial
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let (submitting, _) = watch::channel(false);
        Self {
            values: initial.clone(),
            errors: IndexMap::new(),
            initial,
            submitting,
        }
    }

    // ── Values ───────────────────────────────────────────────────────

    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn values(&self) -> &IndexMap<String, String> {
        &self.values
    }

    /// Set a value. Any error recorded for the field is cleared.
    pub fn set_field_value(&mut self, name: &str, value: impl Into<String>) {
        self.values.insert(name.to_owned(), value.into());
        self.errors.shift_remove(name);
    }

    // ── Errors ───────────────────────────────────────────────────────

    pub fn error(&self, name: &str) -> Option<&str> {
        self.errors.get(name).map(String::as_str)
    }

    pub fn errors(&self) -> &IndexMap<String, String> {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Set or overwrite a field's error; its value is untouched.
    pub fn set_field_error(&mut self, name: &str, message: impl Into<String>) {
        self.errors.insert(name.to_owned(), message.into());
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    // ── Submission ───────────────────────────────────────────────────

    pub fn is_submitting(&self) -> bool {
        *self.submitting.borrow()
    }

    pub fn subscribe_submitting(&self) -> watch::Receiver<bool> {
        self.submitting.subscribe()
    }

    /// Run `action` with the submitting flag raised.
    ///
    /// Taking `&mut self` keeps submissions of one form strictly
    /// sequential. Errors and values are left alone; the caller decides
    /// what to record.
    pub async fn submit<F: Future>(&mut self, action: F) -> F::Output {
        self.submitting.send_replace(true);
        let _guard = SubmitGuard(&self.submitting);
        action.await
    }

    /// Back to the initial values with no errors.
    pub fn reset(&mut self) {
        self.values = self.initial.clone();
        self.errors.clear();
        self.submitting.send_replace(false);
    }
}
