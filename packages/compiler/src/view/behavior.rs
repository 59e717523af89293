//! Behavior registry.
//!
//! A behavior is a registered bindable tag name with declared property and
//! emitter metadata. Declared entries route to the behavior's own state;
//! undeclared entries remain plain DOM attributes even when the tag matches.
//! A behavior with a template replaces the tag's rendering entirely;
//! without one it decorates the plain tag.

use indexmap::IndexSet;

/// Declared metadata for one bindable tag name.
#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorSpec {
    pub name: String,
    pub properties: IndexSet<String>,
    pub emitters: IndexSet<String>,
    pub template: Option<String>,
}

impl BehaviorSpec {
    pub fn new(name: impl Into<String>) -> Self {
        BehaviorSpec {
            name: name.into(),
            properties: IndexSet::new(),
            emitters: IndexSet::new(),
            template: None,
        }
    }

    pub fn with_property(mut self, name: impl Into<String>) -> Self {
        self.properties.insert(name.into());
        self
    }

    pub fn with_emitter(mut self, name: impl Into<String>) -> Self {
        self.emitters.insert(name.into());
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn declares_property(&self, name: &str) -> bool {
        self.properties.contains(name)
    }

    pub fn declares_emitter(&self, name: &str) -> bool {
        self.emitters.contains(name)
    }

    /// Full component replacement vs attribute-style decoration.
    pub fn is_replacement(&self) -> bool {
        self.template.is_some()
    }
}
