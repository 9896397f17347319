//! In-memory store for names and their canonical forms.
//!
//! Both tables are keyed on the clean name. Every check-and-insert runs under
//! one write lock, so two callers racing on equivalent strings converge on
//! the same canonical form and at most one of them creates the name.
use crate::error::{CrateError, Result, ValidationError};
use crate::taxon::name::{CanonicalForm, CanonicalFormId, Name, NameId, NewName, present};
use crate::taxon::normalizer::{prepare_clean_name, squish};
use log::{debug, info};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct RegistryState {
    names: HashMap<NameId, Name>,
    name_ids_by_clean_name: HashMap<String, NameId>,
    canonical_forms: HashMap<CanonicalFormId, CanonicalForm>,
    canonical_ids_by_clean_name: HashMap<String, CanonicalFormId>,
    next_name_id: NameId,
    next_canonical_form_id: CanonicalFormId,
}

impl RegistryState {
    fn find_or_create_canonical_form(&mut self, string: &str) -> CanonicalForm {
        let key = prepare_clean_name(string);
        if let Some(form) = self
            .canonical_ids_by_clean_name
            .get(&key)
            .and_then(|id| self.canonical_forms.get(id))
        {
            return form.clone();
        }

        self.next_canonical_form_id += 1;
        let form = CanonicalForm {
            id: self.next_canonical_form_id,
            string: squish(string),
        };
        debug!("Created canonical form {} '{}'", form.id, form.string);
        self.canonical_ids_by_clean_name.insert(key, form.id);
        self.canonical_forms.insert(form.id, form.clone());
        form
    }
}

#[derive(Default)]
pub struct NameRegistry {
    state: RwLock<RegistryState>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_state(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.read_state().names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn canonical_form_count(&self) -> usize {
        self.read_state().canonical_forms.len()
    }

    pub fn get(&self, id: NameId) -> Option<Name> {
        self.read_state().names.get(&id).cloned()
    }

    pub fn canonical_form(&self, id: CanonicalFormId) -> Option<CanonicalForm> {
        self.read_state().canonical_forms.get(&id).cloned()
    }

    /// Returns the canonical form whose clean name matches `string`, creating it if needed.
    pub fn find_or_create_canonical_form(&self, string: &str) -> CanonicalForm {
        self.write_state().find_or_create_canonical_form(string)
    }

    pub fn find_by_string(&self, string: &str) -> Option<Name> {
        let clean_name = prepare_clean_name(string);
        let state = self.read_state();
        state
            .name_ids_by_clean_name
            .get(&clean_name)
            .and_then(|id| state.names.get(id))
            .cloned()
    }

    /// Validates and stores a new name.
    ///
    /// Fails with [`ValidationError::DuplicateCleanName`] when another name
    /// already owns the clean name; nothing is written in that case.
    pub fn create_name(&self, new_name: NewName) -> Result<Name> {
        let NewName {
            string,
            clean_name,
            canonical_form,
            italicized,
        } = new_name;

        if string.trim().is_empty() {
            return Err(ValidationError::BlankName.into());
        }

        let clean_name = present(clean_name).unwrap_or_else(|| prepare_clean_name(&string));
        let (italicized, italicized_verified) = match present(italicized) {
            Some(markup) => (markup, true),
            None => (format!("<i>{}</i>", string), false),
        };
        if italicized.trim().is_empty() {
            return Err(ValidationError::BlankItalicized(string).into());
        }

        let mut state = self.write_state();
        // Checked against the key that gets stored, supplied or derived.
        if let Some(&existing_id) = state.name_ids_by_clean_name.get(&clean_name) {
            return Err(ValidationError::DuplicateCleanName {
                clean_name,
                existing_id,
            }
            .into());
        }

        let (canonical_form, canonical_verified) = match present(canonical_form) {
            Some(explicit) => (state.find_or_create_canonical_form(&explicit), true),
            None => (state.find_or_create_canonical_form(&string), false),
        };

        state.next_name_id += 1;
        let name = Name {
            id: state.next_name_id,
            string,
            clean_name,
            canonical_form,
            canonical_verified,
            italicized,
            italicized_verified,
        };
        state
            .name_ids_by_clean_name
            .insert(name.clean_name.clone(), name.id);
        state.names.insert(name.id, name.clone());
        debug!("Created name {} '{}' ({})", name.id, name.string, name.clean_name);
        Ok(name)
    }

    pub fn find_or_create_by_string(&self, string: &str) -> Result<Name> {
        if let Some(name) = self.find_by_string(string) {
            return Ok(name);
        }
        match self.create_name(NewName::new(string)) {
            Err(CrateError::Validation(ValidationError::DuplicateCleanName {
                existing_id, ..
            })) => self.get(existing_id).ok_or(CrateError::UnknownName(existing_id)),
            other => other,
        }
    }

    /// Finds or creates a vernacular name.
    ///
    /// Whitespace is squished first and a blank string yields `Ok(None)`.
    /// When a name with the same clean name exists under a different
    /// spelling, its string is updated to the new spelling and returned.
    pub fn create_common_name(
        &self,
        name_string: &str,
        given_canonical_form: Option<&str>,
    ) -> Result<Option<Name>> {
        let name_string = squish(name_string);
        if name_string.is_empty() {
            return Ok(None);
        }

        if let Some(existing) = self.find_by_string(&name_string) {
            if existing.string != name_string {
                info!(
                    "Updating spelling of name {} from '{}' to '{}'",
                    existing.id, existing.string, name_string
                );
                return self.update_string(existing.id, &name_string).map(Some);
            }
            return Ok(Some(existing));
        }

        let mut new_name = NewName::new(name_string);
        if let Some(canonical) = given_canonical_form.filter(|c| !c.trim().is_empty()) {
            new_name = new_name.with_canonical_form(canonical);
        }
        self.create_name(new_name).map(Some)
    }

    /// Replaces the raw string of a name without re-deriving anything else.
    pub fn update_string(&self, id: NameId, string: &str) -> Result<Name> {
        if string.trim().is_empty() {
            return Err(ValidationError::BlankName.into());
        }
        let mut state = self.write_state();
        let name = state.names.get_mut(&id).ok_or(CrateError::UnknownName(id))?;
        name.string = string.to_string();
        Ok(name.clone())
    }
}
