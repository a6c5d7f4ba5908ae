//! Transport-neutral outgoing messages
//!
//! Handlers answer with [`Reply`] values; the Discord layer renders them as
//! message content plus action rows of buttons.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonKind {
    Primary,
    Secondary,
    Success,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub custom_id: String,
    pub label: String,
    pub kind: ButtonKind,
    pub disabled: bool,
}

impl Button {
    pub fn new(custom_id: impl Into<String>, label: impl Into<String>, kind: ButtonKind) -> Self {
        Self {
            custom_id: custom_id.into(),
            label: label.into(),
            kind,
            disabled: false,
        }
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reply {
    pub text: String,
    /// Action rows, each holding at most five buttons
    pub rows: Vec<Vec<Button>>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            rows: Vec::new(),
        }
    }

    pub fn with_row(mut self, row: Vec<Button>) -> Self {
        if !row.is_empty() {
            self.rows.push(row);
        }
        self
    }

    pub fn button_ids(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().map(|b| b.custom_id.as_str())
    }
}
