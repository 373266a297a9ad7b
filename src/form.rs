/// Field errors collected while cleaning a submitted form.
///
/// Templates ask `has(field)` / `message(field)`; the empty field name is used for
/// errors that are not tied to one input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormErrors(Vec<(&'static str, String)>);

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push((field, message.into()));
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|(f, _)| *f == field)
    }

    /// First message for `field`, or an empty string.
    pub fn message(&self, field: &str) -> &str {
        self.0
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, m)| m.as_str())
            .unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `Ok(value)` when nothing was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";

/// An `<option>` for a foreign key select box.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectOption {
    pub value: i32,
    pub label: String,
    pub selected: bool,
}

/// Builds options, marking the one whose id matches the raw submitted value.
pub fn select_options<T>(
    items: &[T],
    selected: &str,
    key: impl Fn(&T) -> (i32, String),
) -> Vec<SelectOption> {
    let selected = selected.trim().parse::<i32>().ok();
    items
        .iter()
        .map(|item| {
            let (value, label) = key(item);
            SelectOption {
                value,
                label,
                selected: Some(value) == selected,
            }
        })
        .collect()
}

/// Parses an optional foreign key. Blank is `Ok(None)`; garbage or an unknown id is `Err`.
pub fn clean_choice(raw: &str, known: impl Fn(i32) -> bool) -> Result<Option<i32>, &'static str> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    match raw.parse::<i32>() {
        Ok(id) if known(id) => Ok(Some(id)),
        _ => Err(INVALID_CHOICE),
    }
}

/// Trims and enforces a maximum character count. `required` rejects blank input.
pub fn clean_text(
    errors: &mut FormErrors,
    field: &'static str,
    raw: &str,
    required: bool,
    max_chars: Option<usize>,
) -> String {
    let value = raw.trim();
    if required && value.is_empty() {
        errors.add(field, REQUIRED);
    } else if let Some(max) = max_chars {
        let count = value.chars().count();
        if count > max {
            errors.add(
                field,
                format!(
                    "Ensure this value has at most {} characters (it has {}).",
                    max, count
                ),
            );
        }
    }
    value.to_owned()
}
