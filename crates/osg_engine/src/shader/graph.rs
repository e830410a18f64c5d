//! Shader node graph and its GLSL emission

use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;
use std::sync::Arc;

use super::{NodeDefinition, NodeLibrary, ShaderError};

/// Storage class of a shader variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableKind {
    /// `uniform`
    Uniform,
    /// Per-vertex `attribute`
    Attribute,
    /// Interpolated `varying`
    Varying,
    /// Declared inside `main`
    Local,
    /// `const` with the given initializer
    Constant(String),
    /// Predefined by GLSL (`gl_Position`, ...); never declared
    Builtin,
}

/// A named, typed value wired between nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    /// GLSL identifier
    pub name: String,
    /// GLSL type
    pub glsl_type: String,
    /// Storage class
    pub kind: VariableKind,
    /// Element count of array uniforms
    pub array_size: Option<usize>,
}

/// Handle to a variable of a [`ShaderGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(usize);

/// Handle to a node of a [`ShaderGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderNodeId(usize);

/// Node instance with every slot bound
#[derive(Debug, Clone)]
pub struct ShaderNode {
    definition: Arc<NodeDefinition>,
    inputs: Vec<(String, VariableId)>,
    outputs: Vec<(String, VariableId)>,
}

impl ShaderNode {
    /// Node type name
    pub fn type_name(&self) -> &str {
        &self.definition.type_name
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Done,
}

/// Variables plus the nodes computing them, compiled to one shader stage
#[derive(Debug, Clone, Default)]
pub struct ShaderGraph {
    variables: Vec<Variable>,
    nodes: Vec<ShaderNode>,
    producers: HashMap<VariableId, Vec<ShaderNodeId>>,
    header: Vec<String>,
    emit_comments: bool,
}

impl ShaderGraph {
    /// Empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Annotate emitted statements with their node type
    pub fn set_emit_comments(&mut self, emit: bool) {
        self.emit_comments = emit;
    }

    /// Add a line emitted before the declarations (precision, extensions)
    pub fn add_header_line(&mut self, line: impl Into<String>) {
        self.header.push(line.into());
    }

    fn variable(&mut self, name: &str, glsl_type: &str, kind: VariableKind, array_size: Option<usize>) -> VariableId {
        if let Some(index) = self.variables.iter().position(|v| v.name == name) {
            return VariableId(index);
        }
        self.variables.push(Variable {
            name: name.to_string(),
            glsl_type: glsl_type.to_string(),
            kind,
            array_size,
        });
        VariableId(self.variables.len() - 1)
    }

    /// Uniform variable; reuses an existing variable with the same name
    pub fn uniform(&mut self, name: &str, glsl_type: &str) -> VariableId {
        self.variable(name, glsl_type, VariableKind::Uniform, None)
    }

    /// Uniform array
    pub fn uniform_array(&mut self, name: &str, glsl_type: &str, size: usize) -> VariableId {
        self.variable(name, glsl_type, VariableKind::Uniform, Some(size))
    }

    /// Vertex attribute
    pub fn attribute(&mut self, name: &str, glsl_type: &str) -> VariableId {
        self.variable(name, glsl_type, VariableKind::Attribute, None)
    }

    /// Varying shared between stages
    pub fn varying(&mut self, name: &str, glsl_type: &str) -> VariableId {
        self.variable(name, glsl_type, VariableKind::Varying, None)
    }

    /// Local of `main`
    pub fn local(&mut self, name: &str, glsl_type: &str) -> VariableId {
        self.variable(name, glsl_type, VariableKind::Local, None)
    }

    /// Constant with an initializer expression
    pub fn constant(&mut self, name: &str, glsl_type: &str, value: &str) -> VariableId {
        self.variable(name, glsl_type, VariableKind::Constant(value.to_string()), None)
    }

    /// GLSL builtin output such as `gl_Position`
    pub fn builtin(&mut self, name: &str, glsl_type: &str) -> VariableId {
        self.variable(name, glsl_type, VariableKind::Builtin, None)
    }

    /// Variable by handle
    pub fn get_variable(&self, id: VariableId) -> Option<&Variable> {
        self.variables.get(id.0)
    }

    /// Node by handle
    pub fn node(&self, id: ShaderNodeId) -> Option<&ShaderNode> {
        self.nodes.get(id.0)
    }

    /// Number of node instances
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Instantiate `type_name` with its slots bound
    ///
    /// Fails when the type is unknown, a slot name is not valid for the type,
    /// a valid slot is left unbound or a variable handle is foreign.
    pub fn add_node(
        &mut self,
        library: &NodeLibrary,
        type_name: &str,
        inputs: &[(&str, VariableId)],
        outputs: &[(&str, VariableId)],
    ) -> Result<ShaderNodeId, ShaderError> {
        let definition = library
            .get(type_name)
            .ok_or_else(|| ShaderError::UnknownNodeType(type_name.to_string()))?
            .clone();

        let node_error = |slot: &str| (type_name.to_string(), slot.to_string());
        if let Some((_, var)) = inputs.iter().chain(outputs).find(|(_, v)| v.0 >= self.variables.len()) {
            return Err(ShaderError::UnknownVariable(var.0));
        }
        for &(slot, _) in inputs {
            if !definition.valid_inputs.iter().any(|s| s == slot) {
                let (node, slot) = node_error(slot);
                return Err(ShaderError::InvalidSlot { node, slot });
            }
        }
        for &(slot, _) in outputs {
            if !definition.valid_outputs.iter().any(|s| s == slot) {
                let (node, slot) = node_error(slot);
                return Err(ShaderError::InvalidSlot { node, slot });
            }
        }
        let bound = |slots: &[(&str, VariableId)], name: &str| slots.iter().any(|(s, _)| *s == name);
        if let Some(slot) = definition.valid_inputs.iter().find(|s| !bound(inputs, s.as_str())) {
            let (node, slot) = node_error(slot.as_str());
            return Err(ShaderError::UnboundInput { node, slot });
        }
        if let Some(slot) = definition.valid_outputs.iter().find(|s| !bound(outputs, s.as_str())) {
            let (node, slot) = node_error(slot.as_str());
            return Err(ShaderError::UnboundOutput { node, slot });
        }

        let id = ShaderNodeId(self.nodes.len());
        for (_, var) in outputs {
            self.producers.entry(*var).or_default().push(id);
        }
        self.nodes.push(ShaderNode {
            definition,
            inputs: inputs.iter().map(|(s, v)| (s.to_string(), *v)).collect(),
            outputs: outputs.iter().map(|(s, v)| (s.to_string(), *v)).collect(),
        });
        Ok(id)
    }

    /// Order the nodes `roots` depend on so producers come before consumers
    pub fn sorted_nodes(&self, roots: &[ShaderNodeId]) -> Result<Vec<ShaderNodeId>, ShaderError> {
        let mut marks: HashMap<ShaderNodeId, Mark> = HashMap::new();
        let mut order = Vec::new();
        for &root in roots {
            self.visit(root, &mut marks, &mut order)?;
        }
        Ok(order)
    }

    fn visit(
        &self,
        id: ShaderNodeId,
        marks: &mut HashMap<ShaderNodeId, Mark>,
        order: &mut Vec<ShaderNodeId>,
    ) -> Result<(), ShaderError> {
        match marks.get(&id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let name = self.nodes.get(id.0).map_or("?", |n| n.type_name());
                return Err(ShaderError::Cycle(name.to_string()));
            }
            None => {}
        }
        let node = self.nodes.get(id.0).ok_or(ShaderError::UnknownNode(id.0))?;
        marks.insert(id, Mark::Visiting);
        for (_, var) in &node.inputs {
            for &producer in self.producers.get(var).into_iter().flatten() {
                self.visit(producer, marks, order)?;
            }
        }
        marks.insert(id, Mark::Done);
        order.push(id);
        Ok(())
    }

    /// Emit the stage source for everything `roots` depend on
    pub fn compile(&self, roots: &[ShaderNodeId]) -> Result<String, ShaderError> {
        let order = self.sorted_nodes(roots)?;
        let mut out = String::new();

        for line in &self.header {
            let _ = writeln!(out, "{line}");
        }

        for var in &self.variables {
            let array = var.array_size.map(|n| format!("[{n}]")).unwrap_or_default();
            match &var.kind {
                VariableKind::Uniform => {
                    let _ = writeln!(out, "uniform {} {}{};", var.glsl_type, var.name, array);
                }
                VariableKind::Attribute => {
                    let _ = writeln!(out, "attribute {} {};", var.glsl_type, var.name);
                }
                VariableKind::Varying => {
                    let _ = writeln!(out, "varying {} {};", var.glsl_type, var.name);
                }
                VariableKind::Constant(value) => {
                    let _ = writeln!(out, "const {} {} = {};", var.glsl_type, var.name, value);
                }
                VariableKind::Local | VariableKind::Builtin => {}
            }
        }

        let mut includes = BTreeSet::new();
        for id in &order {
            if let Some(include) = &self.nodes[id.0].definition.include {
                if includes.insert(include.as_str()) {
                    let _ = writeln!(out, "#pragma include \"{include}\"");
                }
            }
        }

        out.push_str("void main() {\n");
        for var in self.variables.iter().filter(|v| v.kind == VariableKind::Local) {
            let _ = writeln!(out, "  {} {};", var.glsl_type, var.name);
        }
        for id in &order {
            let node = &self.nodes[id.0];
            if self.emit_comments {
                let _ = writeln!(out, "  // {}", node.type_name());
            }
            let _ = writeln!(out, "  {}", self.expand(node));
        }
        out.push_str("}\n");
        Ok(out)
    }

    fn expand(&self, node: &ShaderNode) -> String {
        let mut statement = node.definition.template.clone();
        for (slot, var) in node.inputs.iter().chain(&node.outputs) {
            let name = &self.variables[var.0].name;
            statement = statement.replace(&format!("{{{slot}}}"), name);
        }
        statement
    }
}
