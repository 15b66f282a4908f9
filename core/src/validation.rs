//! Declarative request validation.
//!
//! # Design
//! A `Schema` is an ordered list of `FieldRules`. Each field's rules run in
//! order and stop at the first failure, so a missing title reports
//! "required" and nothing else. Every field is evaluated, and the failures
//! are collected into one `ValidationErrors` value keyed by field name.
//!
//! Rules work on raw JSON values. Type checks are therefore reported as field
//! errors instead of being lost in a deserialization failure.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::error::TodoError;
use crate::store::TodoStore;

pub const TITLE_MAX_CHARS: usize = 255;

/// A single check applied to one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Present, not null, not blank.
    Required,
    String,
    /// `true`, `false`, `0`, `1`, `"0"` or `"1"`.
    Boolean,
    /// Maximum length in characters.
    Max(usize),
    /// Id of a group known to the store.
    ExistsGroup,
}

/// The rules for one field of a payload.
#[derive(Debug, Clone)]
pub struct FieldRules {
    field: &'static str,
    rules: Vec<Rule>,
    /// Only validate the field when the payload contains it.
    sometimes: bool,
}

impl FieldRules {
    pub fn new(field: &'static str, rules: Vec<Rule>) -> Self {
        Self {
            field,
            rules,
            sometimes: false,
        }
    }

    pub fn sometimes(mut self) -> Self {
        self.sometimes = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<FieldRules>,
}

impl Schema {
    pub fn new(fields: Vec<FieldRules>) -> Self {
        Self { fields }
    }

    /// Rules for `POST /todos`.
    pub fn create_todo() -> Self {
        Self::new(vec![
            FieldRules::new(
                "title",
                vec![Rule::Required, Rule::String, Rule::Max(TITLE_MAX_CHARS)],
            ),
            FieldRules::new("group_id", vec![Rule::Required, Rule::ExistsGroup]),
        ])
    }

    /// Rules for `PATCH /todos/{id}`: same constraints, each only when present.
    pub fn update_todo() -> Self {
        Self::new(vec![
            FieldRules::new(
                "title",
                vec![Rule::Required, Rule::String, Rule::Max(TITLE_MAX_CHARS)],
            )
            .sometimes(),
            FieldRules::new("completed", vec![Rule::Required, Rule::Boolean]).sometimes(),
            FieldRules::new("group_id", vec![Rule::Required, Rule::ExistsGroup]).sometimes(),
        ])
    }

    /// Evaluate every field. Store lookups for `ExistsGroup` go through
    /// `store`; a store failure aborts validation with `TodoError::Store`.
    pub async fn validate(
        &self,
        payload: &Map<String, Value>,
        store: &dyn TodoStore,
    ) -> Result<(), TodoError> {
        let mut errors = ValidationErrors::new();

        for field in &self.fields {
            let value = payload.get(field.field);
            if field.sometimes && value.is_none() {
                continue;
            }
            for rule in &field.rules {
                if let Some(message) = check(*rule, field.field, value, store).await? {
                    errors.add(field.field, message);
                    break;
                }
            }
        }

        errors.into_result().map_err(TodoError::Validation)
    }
}

/// Returns the failure message, or `None` when the rule passes.
async fn check(
    rule: Rule,
    field: &str,
    value: Option<&Value>,
    store: &dyn TodoStore,
) -> Result<Option<String>, TodoError> {
    let label = field.replace('_', " ");
    let Some(value) = value else {
        return Ok(match rule {
            Rule::Required => Some(format!("The {label} field is required.")),
            _ => None,
        });
    };

    let failed = match rule {
        Rule::Required => is_blank(value).then(|| format!("The {label} field is required.")),
        Rule::String => {
            (!value.is_string()).then(|| format!("The {label} field must be a string."))
        }
        Rule::Boolean => as_bool(value)
            .is_none()
            .then(|| format!("The {label} field must be true or false.")),
        Rule::Max(max) => value
            .as_str()
            .is_some_and(|text| text.trim().chars().count() > max)
            .then(|| format!("The {label} field must not be greater than {max} characters.")),
        Rule::ExistsGroup => {
            let exists = match as_id(value) {
                Some(id) => store.group_exists(id).await?,
                None => false,
            };
            (!exists).then(|| format!("The selected {label} is invalid."))
        }
    };
    Ok(failed)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Interpret a JSON value as a boolean flag.
pub fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => match number.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(text) => match text.as_str() {
            "0" => Some(false),
            "1" => Some(true),
            _ => None,
        },
        _ => None,
    }
}

/// Interpret a JSON value as a record id. Integer strings are accepted.
pub fn as_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Field-level validation failures, in the order they were found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: Vec<(String, Vec<String>)>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let field = field.into();
        let message = message.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some((_, messages)) => messages.push(message),
            None => self.fields.push((field, vec![message])),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Total number of messages across all fields.
    pub fn len(&self) -> usize {
        self.fields.iter().map(|(_, messages)| messages.len()).sum()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, messages)| messages.as_slice())
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Summary line: the first message, plus a count of the rest.
    pub fn message(&self) -> String {
        let Some(first) = self
            .fields
            .first()
            .and_then(|(_, messages)| messages.first())
        else {
            return "The given data was invalid.".to_string();
        };
        match self.len() - 1 {
            0 => first.clone(),
            1 => format!("{first} (and 1 more error)"),
            more => format!("{first} (and {more} more errors)"),
        }
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Serialize for ValidationErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, messages) in &self.fields {
            map.serialize_entry(field, messages)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTodoStore;
    use rstest::rstest;
    use serde_json::json;

    async fn store_with_group() -> MemoryTodoStore {
        let store = MemoryTodoStore::new();
        store.ensure_group("Groceries").await;
        store
    }

    async fn validate(schema: Schema, payload: Value) -> Result<(), ValidationErrors> {
        let store = store_with_group().await;
        match schema.validate(payload.as_object().unwrap(), &store).await {
            Ok(()) => Ok(()),
            Err(TodoError::Validation(errors)) => Err(errors),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn valid_create_payload_passes() {
        let result = validate(
            Schema::create_todo(),
            json!({"title": "Buy milk", "group_id": 1}),
        )
        .await;
        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn empty_create_payload_reports_every_required_field() {
        let errors = validate(Schema::create_todo(), json!({})).await.unwrap_err();
        assert_eq!(
            errors.get("title"),
            Some(&["The title field is required.".to_string()][..])
        );
        assert_eq!(
            errors.get("group_id"),
            Some(&["The group id field is required.".to_string()][..])
        );
        assert_eq!(
            errors.message(),
            "The title field is required. (and 1 more error)"
        );
    }

    #[rstest]
    #[case(json!(null), "The title field is required.")]
    #[case(json!("   "), "The title field is required.")]
    #[case(json!(42), "The title field must be a string.")]
    #[case(json!(["a"]), "The title field must be a string.")]
    #[case(json!("x".repeat(256)), "The title field must not be greater than 255 characters.")]
    #[tokio::test]
    async fn bad_titles_are_rejected(#[case] title: Value, #[case] expected: &str) {
        let errors = validate(
            Schema::create_todo(),
            json!({"title": title, "group_id": 1}),
        )
        .await
        .unwrap_err();
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["title"]);
        assert_eq!(errors.get("title").unwrap(), [expected.to_string()]);
    }

    #[tokio::test]
    async fn title_length_ignores_surrounding_whitespace() {
        let title = format!("  {}  ", "x".repeat(TITLE_MAX_CHARS));
        let result = validate(
            Schema::create_todo(),
            json!({"title": title, "group_id": 1}),
        )
        .await;
        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn title_length_counts_characters_not_bytes() {
        let title = "é".repeat(TITLE_MAX_CHARS);
        let result = validate(
            Schema::create_todo(),
            json!({"title": title, "group_id": 1}),
        )
        .await;
        assert_eq!(result, Ok(()));
    }

    #[rstest]
    #[case(json!(2))]
    #[case(json!("abc"))]
    #[case(json!(true))]
    #[case(json!(1.5))]
    #[tokio::test]
    async fn unknown_or_malformed_group_is_invalid(#[case] group_id: Value) {
        let errors = validate(
            Schema::create_todo(),
            json!({"title": "Buy milk", "group_id": group_id}),
        )
        .await
        .unwrap_err();
        assert_eq!(
            errors.get("group_id").unwrap(),
            ["The selected group id is invalid.".to_string()]
        );
    }

    #[tokio::test]
    async fn group_id_as_integer_string_is_accepted() {
        let result = validate(
            Schema::create_todo(),
            json!({"title": "Buy milk", "group_id": "1"}),
        )
        .await;
        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn update_schema_skips_absent_fields() {
        let result = validate(Schema::update_todo(), json!({})).await;
        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn update_schema_rejects_present_null_fields() {
        let errors = validate(
            Schema::update_todo(),
            json!({"title": null, "completed": null, "group_id": null}),
        )
        .await
        .unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(
            errors.get("completed").unwrap(),
            ["The completed field is required.".to_string()]
        );
        assert_eq!(
            errors.message(),
            "The title field is required. (and 2 more errors)"
        );
    }

    #[rstest]
    #[case(json!(true), Some(true))]
    #[case(json!(false), Some(false))]
    #[case(json!(1), Some(true))]
    #[case(json!(0), Some(false))]
    #[case(json!("1"), Some(true))]
    #[case(json!("0"), Some(false))]
    #[case(json!("true"), None)]
    #[case(json!(2), None)]
    #[case(json!(null), None)]
    fn boolean_forms(#[case] value: Value, #[case] expected: Option<bool>) {
        assert_eq!(as_bool(&value), expected);
    }

    #[tokio::test]
    async fn update_rejects_non_boolean_completed() {
        let errors = validate(Schema::update_todo(), json!({"completed": "yes"}))
            .await
            .unwrap_err();
        assert_eq!(
            errors.get("completed").unwrap(),
            ["The completed field must be true or false.".to_string()]
        );
    }

    #[test]
    fn errors_serialize_as_field_map() {
        let mut errors = ValidationErrors::single("title", "first");
        errors.add("title", "second");
        errors.add("group_id", "third");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(
            json,
            json!({"title": ["first", "second"], "group_id": ["third"]})
        );
        assert_eq!(errors.message(), "first (and 2 more errors)");
    }

    #[test]
    fn empty_errors_convert_to_ok() {
        assert_eq!(ValidationErrors::new().into_result(), Ok(()));
    }
}
