//! Include inlining and defines

use std::collections::{HashMap, HashSet};

use super::ShaderError;

const BILLBOARD_GLSL: &str = "\
vec4 billboard(const in vec3 vertex, const in mat4 modelView) {
  vec3 center = vec3(modelView[3]);
  float scale = length(vec3(modelView[0]));
  return vec4(center + vertex * scale, 1.0);
}
";

const SKINNING_GLSL: &str = "\
mat4 boneMatrix(const in vec4 matrices[BONE_VECTORS], const in int index) {
  int base = index * 3;
  vec4 r0 = matrices[base];
  vec4 r1 = matrices[base + 1];
  vec4 r2 = matrices[base + 2];
  return mat4(r0.x, r1.x, r2.x, 0.0, r0.y, r1.y, r2.y, 0.0, r0.z, r1.z, r2.z, 0.0, r0.w, r1.w, r2.w, 1.0);
}
vec3 skinning(const in vec3 vertex, const in vec4 weights, const in vec4 bones, const in vec4 matrices[BONE_VECTORS]) {
  mat4 skin = weights.x * boneMatrix(matrices, int(bones.x))
    + weights.y * boneMatrix(matrices, int(bones.y))
    + weights.z * boneMatrix(matrices, int(bones.z))
    + weights.w * boneMatrix(matrices, int(bones.w));
  return vec3(skin * vec4(vertex, 1.0));
}
";

const MORPHING_GLSL: &str = "\
vec3 morphing(const in vec3 vertex, const in vec3 target, const in float weight) {
  return vertex + (target - vertex) * weight;
}
";

const LAMBERT_GLSL: &str = "\
vec4 lambert(const in vec3 normal, const in vec4 lightDirection, const in vec4 lightColor, const in vec4 diffuse) {
  float ndl = max(dot(normalize(normal), -normalize(lightDirection.xyz)), 0.0);
  return vec4(diffuse.rgb * lightColor.rgb * ndl, diffuse.a);
}
";

const SHADOW_CAST_GLSL: &str = "\
vec4 encodeDepth(const in float depth, const in vec4 depthRange) {
  float d = clamp((depth - depthRange.x) * depthRange.w, 0.0, 1.0);
  vec4 enc = fract(vec4(1.0, 255.0, 65025.0, 16581375.0) * d);
  return enc - enc.yzww * vec4(1.0 / 255.0, 1.0 / 255.0, 1.0 / 255.0, 0.0);
}
";

/// Resolves `#pragma include "file"` against an in-memory file set
#[derive(Debug, Clone)]
pub struct ShaderProcessor {
    files: HashMap<String, String>,
}

impl ShaderProcessor {
    /// Processor without any file
    pub fn empty() -> Self {
        Self { files: HashMap::new() }
    }

    /// Processor holding the function files of the built-in nodes
    pub fn with_builtins() -> Self {
        let mut processor = Self::empty();
        processor.add_shader("billboard.glsl", BILLBOARD_GLSL);
        processor.add_shader("skinning.glsl", SKINNING_GLSL);
        processor.add_shader("morphing.glsl", MORPHING_GLSL);
        processor.add_shader("lambert.glsl", LAMBERT_GLSL);
        processor.add_shader("shadowCast.glsl", SHADOW_CAST_GLSL);
        processor
    }

    /// Add or replace an include file
    pub fn add_shader(&mut self, name: &str, source: &str) {
        self.files.insert(name.to_string(), source.to_string());
    }

    /// True if `name` can be included
    pub fn has_shader(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    /// Prepend `#define`s and inline every include, each file at most once
    pub fn process(&self, source: &str, defines: &[String]) -> Result<String, ShaderError> {
        let mut out = String::new();
        for define in defines {
            out.push_str("#define ");
            out.push_str(define);
            out.push('\n');
        }
        let mut included = HashSet::new();
        self.inline(source, &mut included, &mut out)?;
        Ok(out)
    }

    fn inline<'a>(&'a self, source: &'a str, included: &mut HashSet<&'a str>, out: &mut String) -> Result<(), ShaderError> {
        for line in source.lines() {
            let Some(name) = parse_include(line) else {
                out.push_str(line);
                out.push('\n');
                continue;
            };
            let (key, body) = self
                .files
                .get_key_value(name)
                .ok_or_else(|| ShaderError::MissingInclude(name.to_string()))?;
            if included.insert(key.as_str()) {
                self.inline(body, included, out)?;
            }
        }
        Ok(())
    }
}

impl Default for ShaderProcessor {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn parse_include(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix("#pragma")?.trim_start().strip_prefix("include")?;
    let rest = rest.trim();
    rest.strip_prefix('"')?.strip_suffix('"')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_includes_inlined_once() {
        let mut processor = ShaderProcessor::empty();
        processor.add_shader("common.glsl", "float half(float x) { return x * 0.5; }");
        processor.add_shader("a.glsl", "#pragma include \"common.glsl\"\nfloat a() { return half(1.0); }");

        let source = "#pragma include \"a.glsl\"\n#pragma include \"common.glsl\"\nvoid main() {}";
        let out = processor.process(source, &["FOO 1".to_string()]).unwrap();
        assert!(out.starts_with("#define FOO 1\n"));
        assert_eq!(out.matches("float half").count(), 1);
        assert!(out.find("float half").unwrap() < out.find("float a()").unwrap());
        assert!(!out.contains("#pragma include"));
    }

    #[test]
    fn test_missing_include_fails() {
        let processor = ShaderProcessor::with_builtins();
        let err = processor.process("#pragma include \"fog.glsl\"\nvoid main() {}", &[]).unwrap_err();
        assert_eq!(err, ShaderError::MissingInclude("fog.glsl".to_string()));
    }

    #[test]
    fn test_builtin_nodes_have_their_files() {
        let processor = ShaderProcessor::with_builtins();
        let library = crate::shader::NodeLibrary::with_builtins();
        for name in ["Billboard", "Skinning", "Morphing", "Lambert", "ShadowCast"] {
            let include = library.get(name).unwrap().include.clone().unwrap();
            assert!(processor.has_shader(&include), "{include}");
        }
    }
}
