//! Builds vertex and fragment graphs for a set of attributes

use super::{NodeLibrary, ShaderError, ShaderGraph};
use crate::config::ShaderSettings;
use crate::state::StateAttribute;

/// Vertex and fragment sources before include processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledShader {
    /// Vertex stage
    pub vertex: String,
    /// Fragment stage
    pub fragment: String,
    /// `NAME value` pairs to define in both stages
    pub defines: Vec<String>,
}

/// Shader permutation builder
///
/// Only the attributes handed in are considered; a generator filters them by
/// its accepted types first.
#[derive(Debug)]
pub struct ShaderCompiler<'a> {
    library: &'a NodeLibrary,
    settings: &'a ShaderSettings,
    point_size: bool,
    billboard: bool,
    material: bool,
    light: bool,
    shadow_cast: bool,
    bone_count: Option<u32>,
    morph_targets: Option<u32>,
}

impl<'a> ShaderCompiler<'a> {
    /// Compiler for `attributes`
    pub fn new<'s>(
        library: &'a NodeLibrary,
        settings: &'a ShaderSettings,
        attributes: impl IntoIterator<Item = &'s StateAttribute>,
    ) -> Self {
        let mut compiler = Self {
            library,
            settings,
            point_size: false,
            billboard: false,
            material: false,
            light: false,
            shadow_cast: false,
            bone_count: None,
            morph_targets: None,
        };
        for attribute in attributes {
            match attribute {
                StateAttribute::PointSize(_) => compiler.point_size = true,
                StateAttribute::Billboard => compiler.billboard = true,
                StateAttribute::Material(_) => compiler.material = true,
                StateAttribute::Light(_) => compiler.light = true,
                StateAttribute::ShadowCast(_) => compiler.shadow_cast = true,
                StateAttribute::Skinning { bone_count } => compiler.bone_count = Some(*bone_count),
                StateAttribute::Morph { target_count, .. } => compiler.morph_targets = Some(*target_count),
                _ => {}
            }
        }
        compiler
    }

    /// Build both stages
    pub fn compile(&self) -> Result<CompiledShader, ShaderError> {
        Ok(CompiledShader {
            vertex: self.compile_vertex()?,
            fragment: self.compile_fragment()?,
            defines: self.defines(),
        })
    }

    fn lit(&self) -> bool {
        self.light && !self.shadow_cast
    }

    fn defines(&self) -> Vec<String> {
        let mut defines = Vec::new();
        if let Some(bones) = self.bone_count {
            defines.push(format!("BONE_VECTORS {}", bones.max(1) * 3));
        }
        if let Some(targets) = self.morph_targets {
            defines.push(format!("MORPH_TARGETS {targets}"));
        }
        defines
    }

    fn new_graph(&self) -> ShaderGraph {
        let mut graph = ShaderGraph::new();
        graph.set_emit_comments(self.settings.emit_comments);
        graph
    }

    /// Vertex stage source
    pub fn compile_vertex(&self) -> Result<String, ShaderError> {
        let lib = self.library;
        let mut g = self.new_graph();
        let model_view = g.uniform("uModelViewMatrix", "mat4");
        let projection = g.uniform("uProjectionMatrix", "mat4");
        let mut vertex = g.attribute("Vertex", "vec3");
        let mut roots = Vec::new();

        if let Some(count) = self.morph_targets {
            for i in 0..count {
                let target = g.attribute(&format!("MorphTarget{i}"), "vec3");
                let weight = g.uniform(&format!("uMorphWeight{i}"), "float");
                let morphed = g.local(&format!("morphed{i}"), "vec3");
                g.add_node(
                    lib,
                    "Morphing",
                    &[("vertex", vertex), ("target", target), ("weight", weight)],
                    &[("result", morphed)],
                )?;
                vertex = morphed;
            }
        }

        if let Some(bones) = self.bone_count {
            let weights = g.attribute("Weights", "vec4");
            let indices = g.attribute("Bones", "vec4");
            let matrices = g.uniform_array("uBones", "vec4", bones.max(1) as usize * 3);
            let skinned = g.local("skinnedVertex", "vec3");
            g.add_node(
                lib,
                "Skinning",
                &[("vertex", vertex), ("weights", weights), ("bones", indices), ("matrices", matrices)],
                &[("result", skinned)],
            )?;
            vertex = skinned;
        }

        let view_position = g.local("viewPosition", "vec4");
        let position = g.builtin("gl_Position", "vec4");
        let transform = if self.billboard { "Billboard" } else { "VertexTransform" };
        roots.push(g.add_node(
            lib,
            transform,
            &[("modelView", model_view), ("projection", projection), ("vertex", vertex)],
            &[("viewPosition", view_position), ("position", position)],
        )?);

        if self.point_size {
            let size = g.uniform("uPointSize", "float");
            let out = g.builtin("gl_PointSize", "float");
            roots.push(g.add_node(lib, "PointSize", &[("size", size)], &[("result", out)])?);
        }

        if self.shadow_cast {
            let depth = g.varying("vViewDepth", "float");
            roots.push(g.add_node(lib, "ViewDepth", &[("viewPosition", view_position)], &[("result", depth)])?);
        } else if self.lit() {
            let normal = g.attribute("Normal", "vec3");
            let varying = g.varying("vNormal", "vec3");
            roots.push(g.add_node(lib, "Assign", &[("value", normal)], &[("result", varying)])?);
        }

        g.compile(&roots)
    }

    /// Fragment stage source
    pub fn compile_fragment(&self) -> Result<String, ShaderError> {
        let lib = self.library;
        let mut g = self.new_graph();
        g.add_header_line(format!("precision {} float;", self.settings.precision));
        let frag_color = g.builtin("gl_FragColor", "vec4");

        if self.shadow_cast {
            let depth = g.varying("vViewDepth", "float");
            let range = g.uniform("uShadowDepthRange", "vec4");
            let encoded = g.local("encodedDepth", "vec4");
            g.add_node(lib, "ShadowCast", &[("depth", depth), ("depthRange", range)], &[("result", encoded)])?;
            let root = g.add_node(lib, "FragColor", &[("color", encoded)], &[("result", frag_color)])?;
            return g.compile(&[root]);
        }

        let (diffuse, ambient) = if self.material {
            (g.uniform("uMaterialDiffuse", "vec4"), g.uniform("uMaterialAmbient", "vec4"))
        } else {
            (
                g.constant("defaultDiffuse", "vec4", "vec4(1.0)"),
                g.constant("defaultAmbient", "vec4", "vec4(0.0, 0.0, 0.0, 1.0)"),
            )
        };

        let color = g.local("color", "vec4");
        if self.lit() {
            let normal = g.varying("vNormal", "vec3");
            let direction = g.uniform("uLightDirection", "vec4");
            let light_color = g.uniform("uLightColor", "vec4");
            let diffuse_light = g.local("diffuseLight", "vec4");
            g.add_node(
                lib,
                "Lambert",
                &[
                    ("normal", normal),
                    ("lightDirection", direction),
                    ("lightColor", light_color),
                    ("materialDiffuse", diffuse),
                ],
                &[("result", diffuse_light)],
            )?;
            g.add_node(lib, "Add", &[("a", ambient), ("b", diffuse_light)], &[("result", color)])?;
        } else {
            g.add_node(lib, "MaterialColor", &[("diffuse", diffuse), ("ambient", ambient)], &[("result", color)])?;
        }

        let root = g.add_node(lib, "FragColor", &[("color", color)], &[("result", frag_color)])?;
        g.compile(&[root])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Vec3, Vec4};
    use crate::state::{Light, Material, ShadowCast};

    fn settings() -> ShaderSettings {
        ShaderSettings { precision: "mediump".to_string(), emit_comments: false }
    }

    #[test]
    fn test_base_program() {
        let library = NodeLibrary::with_builtins();
        let settings = settings();
        let shader = ShaderCompiler::new(&library, &settings, []).compile().unwrap();
        assert!(shader.vertex.contains("gl_Position = uProjectionMatrix * viewPosition;"));
        assert!(shader.fragment.starts_with("precision mediump float;"));
        assert!(shader.fragment.contains("const vec4 defaultDiffuse = vec4(1.0);"));
        assert!(shader.defines.is_empty());
    }

    #[test]
    fn test_lighting_wires_both_stages() {
        let library = NodeLibrary::with_builtins();
        let settings = settings();
        let attributes = [
            StateAttribute::Material(Material::default()),
            StateAttribute::Light(Light { direction: Vec3::new(0.0, 0.0, -1.0), color: Vec4::repeat(1.0) }),
        ];
        let shader = ShaderCompiler::new(&library, &settings, &attributes).compile().unwrap();
        assert!(shader.vertex.contains("vNormal = Normal;"));
        assert!(shader.fragment.contains("#pragma include \"lambert.glsl\""));
        assert!(shader.fragment.contains("color = uMaterialAmbient + diffuseLight;"));
    }

    #[test]
    fn test_shadow_cast_replaces_lighting() {
        let library = NodeLibrary::with_builtins();
        let settings = settings();
        let attributes = [
            StateAttribute::ShadowCast(ShadowCast { depth_range: (1.0, 50.0) }),
            StateAttribute::Skinning { bone_count: 4 },
            StateAttribute::Morph { target_count: 2, weights: vec![0.5, 0.5] },
            StateAttribute::Light(Light { direction: Vec3::z(), color: Vec4::repeat(1.0) }),
        ];
        let shader = ShaderCompiler::new(&library, &settings, &attributes).compile().unwrap();
        assert!(shader.fragment.contains("encodedDepth = encodeDepth(vViewDepth, uShadowDepthRange);"));
        assert!(!shader.fragment.contains("lambert"));
        assert!(shader.vertex.contains("uniform vec4 uBones[12];"));
        assert!(shader.vertex.contains("skinnedVertex = skinning(morphed1"));
        assert_eq!(shader.defines, vec!["BONE_VECTORS 12".to_string(), "MORPH_TARGETS 2".to_string()]);
    }
}
