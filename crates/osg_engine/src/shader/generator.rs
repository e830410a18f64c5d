//! Program cache keyed by the active attribute state

use std::collections::HashMap;
use std::sync::Arc;

use super::{NodeLibrary, ShaderCompiler, ShaderError, ShaderProcessor};
use crate::config::ShaderSettings;
use crate::gl::{GlObjectManager, GraphicContext, Program};
use crate::state::{AttributeTypeSet, State, StateAttribute};

/// Name of the generator used when a state set names none
pub const DEFAULT_GENERATOR: &str = "default";

/// Name of the shadow map depth pass generator
pub const SHADOW_CAST_GENERATOR: &str = "ShadowCast";

/// Index of a program inside its generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(usize);

/// Builds and caches one program per distinct accepted attribute state
///
/// Attributes outside the accepted set neither reach the compiler nor the
/// fingerprint, so a pass that ignores materials shares one program across
/// every material.
#[derive(Debug)]
pub struct ShaderGenerator {
    name: String,
    accepted: AttributeTypeSet,
    library: Arc<NodeLibrary>,
    processor: Arc<ShaderProcessor>,
    settings: ShaderSettings,
    cache: HashMap<String, ProgramId>,
    programs: Vec<Program>,
    compile_count: usize,
}

impl ShaderGenerator {
    /// Generator accepting `accepted`
    pub fn new(
        name: impl Into<String>,
        accepted: AttributeTypeSet,
        library: Arc<NodeLibrary>,
        processor: Arc<ShaderProcessor>,
        settings: ShaderSettings,
    ) -> Self {
        Self {
            name: name.into(),
            accepted,
            library,
            processor,
            settings,
            cache: HashMap::new(),
            programs: Vec::new(),
            compile_count: 0,
        }
    }

    /// The main pass generator: every attribute that changes shader code
    pub fn default_generator(library: Arc<NodeLibrary>, processor: Arc<ShaderProcessor>, settings: ShaderSettings) -> Self {
        Self::new(DEFAULT_GENERATOR, AttributeTypeSet::SHADER_AFFECTING, library, processor, settings)
    }

    /// The shadow map pass generator: only what moves vertices or encodes depth
    pub fn shadow_cast(library: Arc<NodeLibrary>, processor: Arc<ShaderProcessor>, settings: ShaderSettings) -> Self {
        Self::new(
            SHADOW_CAST_GENERATOR,
            AttributeTypeSet::SHADOW_CAST | AttributeTypeSet::SKINNING | AttributeTypeSet::MORPH,
            library,
            processor,
            settings,
        )
    }

    /// Generator name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribute types this generator reacts to
    pub fn accepted(&self) -> AttributeTypeSet {
        self.accepted
    }

    fn attributes<'s>(&self, state: &'s State) -> impl Iterator<Item = &'s StateAttribute> {
        (self.accepted & state.active_types())
            .types()
            .filter_map(move |ty| state.top(ty))
    }

    /// Cache key for `state`: accepted active types and their shader keys
    pub fn fingerprint(&self, state: &State) -> String {
        self.attributes(state)
            .map(StateAttribute::shader_key)
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Program for `state`, compiled on first request
    ///
    /// A failed compile caches nothing; the next request tries again.
    pub fn get_or_create_program(&mut self, state: &State) -> Result<ProgramId, ShaderError> {
        let fingerprint = self.fingerprint(state);
        if let Some(&id) = self.cache.get(&fingerprint) {
            return Ok(id);
        }

        let compiled = ShaderCompiler::new(&self.library, &self.settings, self.attributes(state)).compile()?;
        let mut vertex = self.processor.process(&compiled.vertex, &compiled.defines)?;
        let mut fragment = self.processor.process(&compiled.fragment, &compiled.defines)?;
        if self.settings.emit_comments {
            let banner = format!("// {} [{}]\n", self.name, fingerprint);
            vertex.insert_str(0, &banner);
            fragment.insert_str(0, &banner);
        }

        let id = ProgramId(self.programs.len());
        self.programs.push(Program::new(vertex, fragment));
        self.compile_count += 1;
        log::debug!("{}: compiled program {} for [{}]", self.name, id.0, fingerprint);
        self.cache.insert(fingerprint, id);
        Ok(id)
    }

    /// Program by id
    pub fn program(&self, id: ProgramId) -> Option<&Program> {
        self.programs.get(id.0)
    }

    /// Mutable program by id
    pub fn program_mut(&mut self, id: ProgramId) -> Option<&mut Program> {
        self.programs.get_mut(id.0)
    }

    /// Programs compiled so far
    pub fn compile_count(&self) -> usize {
        self.compile_count
    }

    /// Distinct cached programs
    pub fn cached_programs(&self) -> usize {
        self.cache.len()
    }

    /// Bind every program to `ctx`; each relinks on next use
    pub fn rebind(&mut self, ctx: &dyn GraphicContext) {
        for program in &mut self.programs {
            program.set_graphic_context(ctx);
        }
    }

    /// Queue every program's GL object for deletion, keeping the cache
    pub fn release_handles(&mut self, manager: &mut GlObjectManager) {
        for program in &mut self.programs {
            program.release(manager);
        }
    }

    /// Drop every program, queueing GPU deletions
    pub fn release(&mut self, manager: &mut GlObjectManager) {
        self.release_handles(manager);
        self.programs.clear();
        self.cache.clear();
    }
}

/// Generators by name, selected per render leaf
#[derive(Debug)]
pub struct ShaderGeneratorProxy {
    generators: HashMap<String, ShaderGenerator>,
}

impl ShaderGeneratorProxy {
    /// Proxy holding the default and shadow-cast generators
    pub fn new(settings: &ShaderSettings) -> Self {
        Self::with_library(NodeLibrary::with_builtins(), ShaderProcessor::with_builtins(), settings)
    }

    /// Proxy over a custom node library and include set
    pub fn with_library(library: NodeLibrary, processor: ShaderProcessor, settings: &ShaderSettings) -> Self {
        let library = Arc::new(library);
        let processor = Arc::new(processor);
        let mut proxy = Self {
            generators: HashMap::new(),
        };
        proxy.add_generator(ShaderGenerator::default_generator(
            library.clone(),
            processor.clone(),
            settings.clone(),
        ));
        proxy.add_generator(ShaderGenerator::shadow_cast(library, processor, settings.clone()));
        proxy
    }

    /// Register a generator under its name, replacing any previous one
    pub fn add_generator(&mut self, generator: ShaderGenerator) -> Option<ShaderGenerator> {
        let previous = self.generators.insert(generator.name().to_string(), generator);
        if let Some(previous) = &previous {
            log::warn!("Replacing shader generator '{}'", previous.name());
        }
        previous
    }

    /// Generator by name; `None` selects the default generator
    pub fn generator(&self, name: Option<&str>) -> Option<&ShaderGenerator> {
        self.generators.get(name.unwrap_or(DEFAULT_GENERATOR))
    }

    /// Mutable generator by name; `None` selects the default generator
    pub fn generator_mut(&mut self, name: Option<&str>) -> Option<&mut ShaderGenerator> {
        self.generators.get_mut(name.unwrap_or(DEFAULT_GENERATOR))
    }

    /// Rebind every program of every generator
    pub fn rebind(&mut self, ctx: &dyn GraphicContext) {
        for generator in self.generators.values_mut() {
            generator.rebind(ctx);
        }
    }

    /// Queue every program's GL object for deletion on the context that
    /// owns it; cached sources are kept
    pub fn release_handles(&mut self, manager: &mut GlObjectManager) {
        for generator in self.generators.values_mut() {
            generator.release_handles(manager);
        }
    }

    /// Programs compiled across all generators
    pub fn compile_count(&self) -> usize {
        self.generators.values().map(ShaderGenerator::compile_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec4;
    use crate::state::{AttributeFlags, Material, ShadowCast, StateSet};

    fn material(r: f32) -> StateAttribute {
        StateAttribute::Material(Material { diffuse: Vec4::new(r, 0.0, 0.0, 1.0), ..Material::default() })
    }

    fn settings() -> ShaderSettings {
        ShaderSettings { precision: "highp".to_string(), emit_comments: false }
    }

    #[test]
    fn test_identical_fingerprints_reuse_program() {
        let mut proxy = ShaderGeneratorProxy::new(&settings());
        let mut state = State::new();

        state.push_attribute(material(1.0), AttributeFlags::empty());
        let generator = proxy.generator_mut(None).unwrap();
        let first = generator.get_or_create_program(&state).unwrap();
        state.pop_attribute(crate::state::AttributeType::Material);

        // Different material values, same permutation
        state.push_attribute(material(0.5), AttributeFlags::empty());
        let second = generator.get_or_create_program(&state).unwrap();
        assert_eq!(first, second);
        assert_eq!(generator.compile_count(), 1);

        state.push_attribute(StateAttribute::PointSize(4.0), AttributeFlags::empty());
        let third = generator.get_or_create_program(&state).unwrap();
        assert_ne!(first, third);
        assert_eq!(generator.compile_count(), 2);
    }

    #[test]
    fn test_shadow_generator_ignores_material() {
        let mut proxy = ShaderGeneratorProxy::new(&settings());
        let shadow = StateSet::new()
            .with_attribute(StateAttribute::ShadowCast(ShadowCast { depth_range: (0.5, 100.0) }));

        let mut lit = State::new();
        lit.push_state_set(&shadow);
        lit.push_attribute(material(1.0), AttributeFlags::empty());
        let mut plain = State::new();
        plain.push_state_set(&shadow);

        let generator = proxy.generator_mut(Some(SHADOW_CAST_GENERATOR)).unwrap();
        assert_eq!(generator.fingerprint(&lit), generator.fingerprint(&plain));
        let a = generator.get_or_create_program(&lit).unwrap();
        let b = generator.get_or_create_program(&plain).unwrap();
        assert_eq!(a, b);
        assert_eq!(generator.compile_count(), 1);
        assert!(!generator.program(a).unwrap().fragment_source().contains("uMaterialDiffuse"));

        // The main pass does distinguish them
        let main = proxy.generator(None).unwrap();
        assert_ne!(main.fingerprint(&lit), main.fingerprint(&plain));
    }

    #[test]
    fn test_failed_compile_is_not_cached() {
        let library = NodeLibrary::with_builtins();
        // Lambert's function file is missing from this include set
        let mut processor = ShaderProcessor::empty();
        for file in ["billboard.glsl", "skinning.glsl", "morphing.glsl", "shadowCast.glsl"] {
            processor.add_shader(file, "");
        }
        let mut proxy = ShaderGeneratorProxy::with_library(library, processor, &settings());
        let mut state = State::new();
        state.push_attribute(material(1.0), AttributeFlags::empty());
        state.push_attribute(StateAttribute::Light(crate::state::Light::default()), AttributeFlags::empty());

        let generator = proxy.generator_mut(None).unwrap();
        let err = generator.get_or_create_program(&state).unwrap_err();
        assert_eq!(err, ShaderError::MissingInclude("lambert.glsl".to_string()));
        assert_eq!(generator.cached_programs(), 0);
        assert_eq!(generator.compile_count(), 0);
    }

    #[test]
    fn test_sources_are_processed() {
        let mut proxy = ShaderGeneratorProxy::new(&settings());
        let mut state = State::new();
        state.push_attribute(StateAttribute::Skinning { bone_count: 2 }, AttributeFlags::empty());
        let generator = proxy.generator_mut(None).unwrap();
        let id = generator.get_or_create_program(&state).unwrap();
        let program = generator.program(id).unwrap();
        assert!(program.vertex_source().starts_with("#define BONE_VECTORS 6\n"));
        assert!(program.vertex_source().contains("vec3 skinning("));
        assert!(!program.vertex_source().contains("#pragma include"));
    }
}
