//! Text-versus-committed numeric field editing.
//!
//! Every parameter input tracks two values: the raw text the user
//! typed, which is always echoed back, and the last committed number,
//! which is the only value that reaches a step. Text that is still a
//! prefix of a valid number (`""`, `"-"`, `"1."`) is accepted without
//! committing; text that can never become a number is flagged.

use crate::step::{StepField, ValidationError};

/// Accepted character grammar for a numeric field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldGrammar {
    /// Digits with at most one decimal point.
    UnsignedDecimal,
    /// As [`Self::UnsignedDecimal`] with an optional leading minus.
    SignedDecimal,
    /// Digits only.
    UnsignedInteger,
}

impl FieldGrammar {
    /// Grammar for a step parameter.
    #[must_use]
    pub const fn for_field(field: StepField) -> Self {
        if field.is_signed() {
            Self::SignedDecimal
        } else if field.is_integer() {
            Self::UnsignedInteger
        } else {
            Self::UnsignedDecimal
        }
    }

    /// Whether `text` could still be completed into a valid number.
    ///
    /// The empty string and a lone sign or decimal point are prefixes.
    #[must_use]
    pub fn is_prefix(self, text: &str) -> bool {
        let digits = match self {
            Self::SignedDecimal => text.strip_prefix('-').unwrap_or(text),
            Self::UnsignedDecimal | Self::UnsignedInteger => text,
        };
        let allow_point = !matches!(self, Self::UnsignedInteger);
        let mut seen_point = false;
        digits.chars().all(|c| match c {
            '0'..='9' => true,
            '.' if allow_point && !seen_point => {
                seen_point = true;
                true
            }
            _ => false,
        })
    }
}

/// Result of feeding raw text into a [`NumericField`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldInput {
    /// The text parsed and was accepted; the committed value changed.
    Committed(f64),
    /// The text is a valid prefix but not yet a committable number.
    Pending,
    /// The text cannot be a number or its value was rejected.
    Invalid,
}

/// Editing state for one numeric input.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericField {
    text: String,
    committed: f64,
    grammar: FieldGrammar,
    error: Option<String>,
}

impl NumericField {
    /// A field showing `value` with no error.
    #[must_use]
    pub fn new(value: f64, grammar: FieldGrammar) -> Self {
        Self {
            text: format_value(value),
            committed: value,
            grammar,
            error: None,
        }
    }

    /// A field for one step parameter.
    #[must_use]
    pub fn for_step_field(field: StepField, value: f64) -> Self {
        Self::new(value, FieldGrammar::for_field(field))
    }

    /// The text to display, exactly as typed.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The last value that passed validation.
    #[must_use]
    pub const fn committed(&self) -> f64 {
        self.committed
    }

    /// The current validation message, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Feed raw text from the widget.
    ///
    /// The text is always stored for display. The committed value only
    /// changes when the text parses to a finite number and `accept`
    /// approves it. `accept` sees the candidate value and returns the
    /// value as the model stores it, which may be narrower than the
    /// parsed `f64`; that stored value becomes the committed one so a
    /// later [`Self::sync`] from the model leaves the text alone.
    pub fn input(
        &mut self,
        raw: &str,
        accept: impl FnOnce(f64) -> Result<f64, ValidationError>,
    ) -> FieldInput {
        raw.clone_into(&mut self.text);

        if !self.grammar.is_prefix(raw) {
            self.error = Some(format!("{raw:?} is not a number"));
            return FieldInput::Invalid;
        }

        let Some(value) = raw.parse::<f64>().ok().filter(|v| v.is_finite()) else {
            self.error = None;
            return FieldInput::Pending;
        };

        match accept(value) {
            Ok(stored) => {
                self.committed = stored;
                self.error = None;
                FieldInput::Committed(stored)
            }
            Err(err) => {
                self.error = Some(err.reason);
                FieldInput::Invalid
            }
        }
    }

    /// Replace text and committed value when the model changed
    /// elsewhere. Leaves an in-progress edit alone if it already
    /// denotes `value`.
    pub fn sync(&mut self, value: f64) {
        #[allow(clippy::float_cmp)]
        let unchanged = self.committed == value;
        if unchanged && self.error.is_none() {
            return;
        }
        self.committed = value;
        self.text = format_value(value);
        self.error = None;
    }
}

fn format_value(value: f64) -> String {
    format!("{value}")
}
