//! Per-node collections of state attributes

use std::collections::BTreeMap;

use super::{AttributeFlags, AttributeType, StateAttribute};

/// Attribute carried by a state set, with its inheritance flags
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeEntry {
    /// The attribute
    pub attribute: StateAttribute,
    /// OVERRIDE / PROTECTED
    pub flags: AttributeFlags,
}

/// At most one attribute per type, plus an optional shader generator name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateSet {
    attributes: BTreeMap<AttributeType, AttributeEntry>,
    shader_generator_name: Option<String>,
}

impl StateSet {
    /// Create an empty state set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute, replacing any of the same type
    pub fn set_attribute(&mut self, attribute: StateAttribute) {
        self.set_attribute_with_flags(attribute, AttributeFlags::empty());
    }

    /// Set an attribute with inheritance flags
    pub fn set_attribute_with_flags(&mut self, attribute: StateAttribute, flags: AttributeFlags) {
        self.attributes
            .insert(attribute.attribute_type(), AttributeEntry { attribute, flags });
    }

    /// Builder form of [`StateSet::set_attribute`]
    pub fn with_attribute(mut self, attribute: StateAttribute) -> Self {
        self.set_attribute(attribute);
        self
    }

    /// Remove the attribute of `ty`
    pub fn remove_attribute(&mut self, ty: AttributeType) -> Option<StateAttribute> {
        self.attributes.remove(&ty).map(|entry| entry.attribute)
    }

    /// Attribute of `ty`, if set
    pub fn attribute(&self, ty: AttributeType) -> Option<&StateAttribute> {
        self.attributes.get(&ty).map(|entry| &entry.attribute)
    }

    /// All entries in type order
    pub fn entries(&self) -> impl Iterator<Item = &AttributeEntry> {
        self.attributes.values()
    }

    /// Select the shader generator used below this node
    pub fn set_shader_generator_name(&mut self, name: impl Into<String>) {
        self.shader_generator_name = Some(name.into());
    }

    /// Shader generator selected by this set
    pub fn shader_generator_name(&self) -> Option<&str> {
        self.shader_generator_name.as_deref()
    }

    /// True if the set carries nothing
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.shader_generator_name.is_none()
    }
}
