//! Form state tracking: per-field value and validity plus an aggregate
//! validity flag.
//!
//! All mutations go through [`form_reducer`], so the aggregate flag is only
//! ever derived in the per-field path and asserted in the bulk path.

use std::{collections::BTreeMap, fmt, sync::Arc};

use tokio::sync::watch;

pub type FieldId = String;

#[derive(Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldValue {
    #[default]
    Empty,
    Text(String),
    File(FileUpload),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileUpload> {
        match self {
            Self::File(file) => Some(file),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<FileUpload> for FieldValue {
    fn from(value: FileUpload) -> Self {
        Self::File(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldState {
    pub value: FieldValue,
    pub is_valid: bool,
}

impl FieldState {
    pub fn new(value: impl Into<FieldValue>, is_valid: bool) -> Self {
        Self {
            value: value.into(),
            is_valid,
        }
    }

    /// Blank, not-yet-valid field as a fresh form starts out.
    pub fn blank() -> Self {
        Self::new("", false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub inputs: BTreeMap<FieldId, FieldState>,
    pub is_valid: bool,
}

impl FormState {
    pub fn new(inputs: BTreeMap<FieldId, FieldState>, is_valid: bool) -> Self {
        Self { inputs, is_valid }
    }

    pub fn field(&self, id: &str) -> Option<&FieldState> {
        self.inputs.get(id)
    }

    pub fn text(&self, id: &str) -> Option<&str> {
        self.field(id).and_then(|field| field.value.as_text())
    }

    pub fn file(&self, id: &str) -> Option<&FileUpload> {
        self.field(id).and_then(|field| field.value.as_file())
    }

    pub fn field_is_valid(&self, id: &str) -> bool {
        self.field(id).is_some_and(|field| field.is_valid)
    }

    fn all_fields_valid(&self) -> bool {
        self.inputs.values().all(|field| field.is_valid)
    }
}

/// Builds an input map from `(id, field)` pairs.
pub fn inputs<I, K>(fields: I) -> BTreeMap<FieldId, FieldState>
where
    I: IntoIterator<Item = (K, FieldState)>,
    K: Into<FieldId>,
{
    fields
        .into_iter()
        .map(|(id, field)| (id.into(), field))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormAction {
    InputChange {
        id: FieldId,
        value: FieldValue,
        is_valid: bool,
    },
    SetData {
        inputs: BTreeMap<FieldId, FieldState>,
        is_valid: bool,
    },
}

pub fn form_reducer(state: &mut FormState, action: FormAction) {
    match action {
        FormAction::InputChange {
            id,
            value,
            is_valid,
        } => {
            state.inputs.insert(id, FieldState { value, is_valid });
            state.is_valid = state.all_fields_valid();
        }
        FormAction::SetData { inputs, is_valid } => {
            state.inputs = inputs;
            state.is_valid = is_valid;
        }
    }
}

/// Owns a [`FormState`] and notifies subscribers on every change.
#[derive(Debug)]
pub struct FormStateManager {
    state: Arc<watch::Sender<FormState>>,
}

impl FormStateManager {
    /// `initial_form_valid` is taken as given; it is not checked against the
    /// individual field flags.
    pub fn new(initial_inputs: BTreeMap<FieldId, FieldState>, initial_form_valid: bool) -> Self {
        let (state, _) = watch::channel(FormState::new(initial_inputs, initial_form_valid));
        Self {
            state: Arc::new(state),
        }
    }

    /// Returns the per-field update handler. Every handler from the same
    /// manager compares equal, so it can sit in change-detection lists.
    pub fn input_handler(&self) -> InputHandler {
        InputHandler {
            state: Arc::clone(&self.state),
        }
    }

    pub fn set_form_data(&self, new_inputs: BTreeMap<FieldId, FieldState>, form_is_valid: bool) {
        dispatch(
            &self.state,
            FormAction::SetData {
                inputs: new_inputs,
                is_valid: form_is_valid,
            },
        );
    }

    pub fn snapshot(&self) -> FormState {
        self.state.borrow().clone()
    }

    pub fn is_valid(&self) -> bool {
        self.state.borrow().is_valid
    }

    pub fn text(&self, id: &str) -> Option<String> {
        self.state.borrow().text(id).map(str::to_string)
    }

    pub fn subscribe(&self) -> watch::Receiver<FormState> {
        self.state.subscribe()
    }
}

#[derive(Debug, Clone)]
pub struct InputHandler {
    state: Arc<watch::Sender<FormState>>,
}

impl InputHandler {
    pub fn call(&self, id: impl Into<FieldId>, value: impl Into<FieldValue>, is_valid: bool) {
        dispatch(
            &self.state,
            FormAction::InputChange {
                id: id.into(),
                value: value.into(),
                is_valid,
            },
        );
    }
}

impl PartialEq for InputHandler {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl Eq for InputHandler {}

fn dispatch(state: &watch::Sender<FormState>, action: FormAction) {
    state.send_modify(|form| form_reducer(form, action));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place_form() -> FormStateManager {
        FormStateManager::new(
            inputs([
                ("title", FieldState::blank()),
                ("description", FieldState::blank()),
            ]),
            false,
        )
    }

    #[test]
    fn single_field_becomes_valid() {
        let form = FormStateManager::new(inputs([("title", FieldState::blank())]), false);
        form.input_handler().call("title", "Empire State", true);

        assert!(form.is_valid());
        assert_eq!(form.text("title").as_deref(), Some("Empire State"));
    }

    #[test]
    fn validity_tracks_every_field_after_each_update() {
        let form = place_form();
        let on_input = form.input_handler();

        let steps = [
            ("title", "Empire", true),
            ("description", "Tall", false),
            ("description", "Tall building", true),
            ("title", "", false),
            ("title", "Empire State", true),
        ];
        for (id, value, valid) in steps {
            on_input.call(id, value, valid);
            let snapshot = form.snapshot();
            let expected = snapshot.inputs.values().all(|field| field.is_valid);
            assert_eq!(snapshot.is_valid, expected, "after updating {id}");
        }
        assert!(form.is_valid());
    }

    #[test]
    fn unknown_field_is_inserted_and_counted() {
        let form = FormStateManager::new(inputs([("title", FieldState::new("x", true))]), true);
        form.input_handler().call("address", "", false);

        let snapshot = form.snapshot();
        assert_eq!(snapshot.inputs.len(), 2);
        assert!(!snapshot.is_valid);
    }

    #[test]
    fn update_leaves_other_fields_untouched() {
        let form = place_form();
        form.input_handler().call("title", "Louvre", true);

        let snapshot = form.snapshot();
        assert_eq!(snapshot.field("description"), Some(&FieldState::blank()));
    }

    #[test]
    fn set_form_data_trusts_caller_validity() {
        let form = place_form();
        form.set_form_data(
            inputs([
                ("title", FieldState::new("Louvre", false)),
                ("description", FieldState::new("", false)),
            ]),
            true,
        );
        assert!(form.is_valid());

        form.set_form_data(inputs([("title", FieldState::new("Louvre", true))]), false);
        assert!(!form.is_valid());
        assert_eq!(form.snapshot().inputs.len(), 1);
    }

    #[test]
    fn next_input_after_set_form_data_rederives_validity() {
        let form = place_form();
        form.set_form_data(
            inputs([
                ("title", FieldState::new("Louvre", true)),
                ("description", FieldState::new("", false)),
            ]),
            true,
        );
        form.input_handler().call("title", "Louvre Museum", true);
        assert!(!form.is_valid());
    }

    #[test]
    fn initial_validity_is_not_checked() {
        let form = FormStateManager::new(inputs([("title", FieldState::blank())]), true);
        assert!(form.is_valid());
    }

    #[test]
    fn input_handler_is_stable_per_manager() {
        let form = place_form();
        let first = form.input_handler();
        form.input_handler().call("title", "Louvre", true);
        assert_eq!(first, form.input_handler());
        assert_ne!(first, place_form().input_handler());
    }

    #[tokio::test]
    async fn subscribers_see_updates() {
        let form = place_form();
        let mut rx = form.subscribe();
        form.input_handler().call("title", "Louvre", true);

        rx.changed().await.expect("form update");
        assert_eq!(rx.borrow().text("title"), Some("Louvre"));
    }

    #[test]
    fn file_values_round_through_state() {
        let form = FormStateManager::new(
            inputs([("image", FieldState::new(FieldValue::Empty, false))]),
            false,
        );
        let upload = FileUpload {
            filename: "louvre.jpg".into(),
            mime_type: Some("image/jpeg".into()),
            bytes: vec![0xff, 0xd8],
        };
        form.input_handler().call("image", upload.clone(), true);

        assert_eq!(form.snapshot().file("image"), Some(&upload));
        assert!(form.is_valid());
    }
}
