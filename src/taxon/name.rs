use crate::taxon::surrogate::is_surrogate_or_hybrid;
use std::fmt;

pub type NameId = u64;
pub type CanonicalFormId = u64;

const NOT_ASSIGNED: &str = "not assigned";

/// The accepted scientific name shared by every spelling of the same taxon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalForm {
    pub id: CanonicalFormId,
    pub string: String,
}

/// One spelling of a species name (scientific or vernacular).
///
/// `clean_name`, the canonical form and the italicized markup are derived
/// once when the name is created. Changing `string` afterwards leaves them
/// as they were.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    pub id: NameId,
    pub string: String,
    pub clean_name: String,
    pub canonical_form: CanonicalForm,
    pub canonical_verified: bool,
    pub italicized: String,
    pub italicized_verified: bool,
}

impl Name {
    pub fn canonical_form_id(&self) -> CanonicalFormId {
        self.canonical_form.id
    }

    pub fn canonical(&self) -> &str {
        if self.canonical_form.string.is_empty() {
            NOT_ASSIGNED
        } else {
            &self.canonical_form.string
        }
    }

    pub fn italicized_canonical(&self) -> String {
        if self.canonical_form.string.is_empty() {
            NOT_ASSIGNED.to_string()
        } else {
            format!("<i>{}</i>", self.canonical_form.string)
        }
    }

    pub fn is_surrogate_or_hybrid(&self) -> bool {
        is_surrogate_or_hybrid(&self.string)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string)
    }
}

/// Input for [`NameRegistry::create_name`](crate::taxon::registry::NameRegistry::create_name).
///
/// Any optional field left empty (or blank) is derived from `string`.
/// Supplied canonical forms and italicized markup are recorded as verified.
#[derive(Debug, Clone, Default)]
pub struct NewName {
    pub string: String,
    pub clean_name: Option<String>,
    pub canonical_form: Option<String>,
    pub italicized: Option<String>,
}

impl NewName {
    pub fn new(string: impl Into<String>) -> Self {
        Self {
            string: string.into(),
            ..Default::default()
        }
    }

    pub fn with_canonical_form(mut self, canonical_form: impl Into<String>) -> Self {
        self.canonical_form = Some(canonical_form.into());
        self
    }

    pub fn with_italicized(mut self, italicized: impl Into<String>) -> Self {
        self.italicized = Some(italicized.into());
        self
    }

    pub fn with_clean_name(mut self, clean_name: impl Into<String>) -> Self {
        self.clean_name = Some(clean_name.into());
        self
    }
}

/// Returns the value when it has any non-whitespace content.
pub(crate) fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
