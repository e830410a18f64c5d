//! Shader node types

use std::collections::BTreeMap;
use std::sync::Arc;

use super::ShaderError;

/// A shader node type: its slots, an optional shared function and the
/// statement it emits
///
/// The template refers to slots as `{slot}`; each placeholder is replaced by
/// the name of the variable bound to that slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDefinition {
    /// Unique type name
    pub type_name: String,
    /// Input slots; all must be bound
    pub valid_inputs: Vec<String>,
    /// Output slots; all must be bound
    pub valid_outputs: Vec<String>,
    /// Include file declaring the function the template calls
    pub include: Option<String>,
    /// Statement emitted inside `main`
    pub template: String,
}

impl NodeDefinition {
    /// Definition with the given slots and template
    pub fn new(type_name: &str, inputs: &[&str], outputs: &[&str], template: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            valid_inputs: inputs.iter().map(|s| s.to_string()).collect(),
            valid_outputs: outputs.iter().map(|s| s.to_string()).collect(),
            include: None,
            template: template.to_string(),
        }
    }

    /// Builder: declare the include holding the called function
    pub fn with_include(mut self, file: &str) -> Self {
        self.include = Some(file.to_string());
        self
    }
}

/// Registered shader node types
#[derive(Debug, Clone, Default)]
pub struct NodeLibrary {
    definitions: BTreeMap<String, Arc<NodeDefinition>>,
}

impl NodeLibrary {
    /// Library without any type
    pub fn empty() -> Self {
        Self::default()
    }

    /// Library holding the built-in node types
    pub fn with_builtins() -> Self {
        let mut library = Self::empty();
        for definition in builtin_definitions() {
            // Built-in names are distinct
            let _ = library.register(definition);
        }
        library
    }

    /// Register a node type; a name can only be registered once
    pub fn register(&mut self, definition: NodeDefinition) -> Result<(), ShaderError> {
        if self.definitions.contains_key(&definition.type_name) {
            return Err(ShaderError::DuplicateNodeType(definition.type_name));
        }
        log::debug!("Registered shader node type {}", definition.type_name);
        self.definitions
            .insert(definition.type_name.clone(), Arc::new(definition));
        Ok(())
    }

    /// Definition by type name
    pub fn get(&self, type_name: &str) -> Option<&Arc<NodeDefinition>> {
        self.definitions.get(type_name)
    }

    /// True if `type_name` is registered
    pub fn contains(&self, type_name: &str) -> bool {
        self.definitions.contains_key(type_name)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// True when no type is registered
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

fn builtin_definitions() -> Vec<NodeDefinition> {
    vec![
        NodeDefinition::new("Assign", &["value"], &["result"], "{result} = {value};"),
        NodeDefinition::new("Add", &["a", "b"], &["result"], "{result} = {a} + {b};"),
        NodeDefinition::new(
            "VertexTransform",
            &["modelView", "projection", "vertex"],
            &["viewPosition", "position"],
            "{viewPosition} = {modelView} * vec4({vertex}, 1.0);\n  {position} = {projection} * {viewPosition};",
        ),
        NodeDefinition::new(
            "Billboard",
            &["modelView", "projection", "vertex"],
            &["viewPosition", "position"],
            "{viewPosition} = billboard({vertex}, {modelView});\n  {position} = {projection} * {viewPosition};",
        )
        .with_include("billboard.glsl"),
        NodeDefinition::new(
            "Skinning",
            &["vertex", "weights", "bones", "matrices"],
            &["result"],
            "{result} = skinning({vertex}, {weights}, {bones}, {matrices});",
        )
        .with_include("skinning.glsl"),
        NodeDefinition::new(
            "Morphing",
            &["vertex", "target", "weight"],
            &["result"],
            "{result} = morphing({vertex}, {target}, {weight});",
        )
        .with_include("morphing.glsl"),
        NodeDefinition::new("PointSize", &["size"], &["result"], "{result} = {size};"),
        NodeDefinition::new("ViewDepth", &["viewPosition"], &["result"], "{result} = -{viewPosition}.z;"),
        NodeDefinition::new(
            "MaterialColor",
            &["diffuse", "ambient"],
            &["result"],
            "{result} = vec4({ambient}.rgb + {diffuse}.rgb, {diffuse}.a);",
        ),
        NodeDefinition::new(
            "Lambert",
            &["normal", "lightDirection", "lightColor", "materialDiffuse"],
            &["result"],
            "{result} = lambert({normal}, {lightDirection}, {lightColor}, {materialDiffuse});",
        )
        .with_include("lambert.glsl"),
        NodeDefinition::new(
            "ShadowCast",
            &["depth", "depthRange"],
            &["result"],
            "{result} = encodeDepth({depth}, {depthRange});",
        )
        .with_include("shadowCast.glsl"),
        NodeDefinition::new("FragColor", &["color"], &["result"], "{result} = clamp({color}, 0.0, 1.0);"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_type_is_an_error() {
        let mut library = NodeLibrary::with_builtins();
        let count = library.len();
        let result = library.register(NodeDefinition::new("Lambert", &[], &["result"], "{result} = 1.0;"));
        assert_eq!(result, Err(ShaderError::DuplicateNodeType("Lambert".to_string())));
        assert_eq!(library.len(), count);
        // The original definition survives
        assert!(library.get("Lambert").unwrap().include.is_some());
    }

    #[test]
    fn test_register_custom_type() {
        let mut library = NodeLibrary::empty();
        library
            .register(NodeDefinition::new("Fog", &["color", "depth"], &["result"], "{result} = fog({color}, {depth});"))
            .unwrap();
        assert!(library.contains("Fog"));
        assert!(!library.contains("Lambert"));
    }
}
