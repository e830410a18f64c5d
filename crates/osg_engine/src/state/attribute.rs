//! State attributes
//!
//! Every GPU-state or shader-affecting override a node can carry. Attributes
//! are plain values: the [`State`](super::State) compares them against what
//! was last applied to skip redundant context calls.

use bitflags::bitflags;

use crate::foundation::math::{Vec3, Vec4};
use crate::gl::{BlendFactor, Capability, CullFaceMode, DepthFunc, GraphicContext};

/// Discriminant of a [`StateAttribute`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttributeType {
    /// Rasterized line width
    LineWidth,
    /// Point sprite size
    PointSize,
    /// Camera-facing geometry
    Billboard,
    /// Surface material
    Material,
    /// Directional light
    Light,
    /// Blending
    BlendFunc,
    /// Depth test and writes
    Depth,
    /// Face culling
    CullFace,
    /// Depth-only pass writing shadow map depth
    ShadowCast,
    /// Vertex skinning
    Skinning,
    /// Morph targets
    Morph,
}

impl AttributeType {
    /// Number of attribute types
    pub const COUNT: usize = 11;

    /// Every attribute type, in index order
    pub const ALL: [AttributeType; Self::COUNT] = [
        AttributeType::LineWidth,
        AttributeType::PointSize,
        AttributeType::Billboard,
        AttributeType::Material,
        AttributeType::Light,
        AttributeType::BlendFunc,
        AttributeType::Depth,
        AttributeType::CullFace,
        AttributeType::ShadowCast,
        AttributeType::Skinning,
        AttributeType::Morph,
    ];

    /// Dense index, stable for the lifetime of the process
    pub fn index(self) -> usize {
        self as usize
    }

    /// Name used in shader fingerprints and logs
    pub fn name(self) -> &'static str {
        match self {
            AttributeType::LineWidth => "LineWidth",
            AttributeType::PointSize => "PointSize",
            AttributeType::Billboard => "Billboard",
            AttributeType::Material => "Material",
            AttributeType::Light => "Light",
            AttributeType::BlendFunc => "BlendFunc",
            AttributeType::Depth => "Depth",
            AttributeType::CullFace => "CullFace",
            AttributeType::ShadowCast => "ShadowCast",
            AttributeType::Skinning => "Skinning",
            AttributeType::Morph => "Morph",
        }
    }

    /// Single-bit set for this type
    pub fn bit(self) -> AttributeTypeSet {
        AttributeTypeSet::from_bits_truncate(1 << self.index())
    }

    /// Value applied when no node pushes this type. Shader-only attributes
    /// have none: their absence is what selects the shader permutation.
    pub fn default_attribute(self) -> Option<StateAttribute> {
        match self {
            AttributeType::LineWidth => Some(StateAttribute::LineWidth(1.0)),
            AttributeType::BlendFunc => Some(StateAttribute::BlendFunc(None)),
            AttributeType::Depth => Some(StateAttribute::Depth(Depth::default())),
            AttributeType::CullFace => Some(StateAttribute::CullFace(Some(CullFaceMode::Back))),
            _ => None,
        }
    }
}

bitflags! {
    /// Set of attribute types, used as the shader fingerprint domain
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AttributeTypeSet: u32 {
        /// [`AttributeType::LineWidth`]
        const LINE_WIDTH = 1 << 0;
        /// [`AttributeType::PointSize`]
        const POINT_SIZE = 1 << 1;
        /// [`AttributeType::Billboard`]
        const BILLBOARD = 1 << 2;
        /// [`AttributeType::Material`]
        const MATERIAL = 1 << 3;
        /// [`AttributeType::Light`]
        const LIGHT = 1 << 4;
        /// [`AttributeType::BlendFunc`]
        const BLEND_FUNC = 1 << 5;
        /// [`AttributeType::Depth`]
        const DEPTH = 1 << 6;
        /// [`AttributeType::CullFace`]
        const CULL_FACE = 1 << 7;
        /// [`AttributeType::ShadowCast`]
        const SHADOW_CAST = 1 << 8;
        /// [`AttributeType::Skinning`]
        const SKINNING = 1 << 9;
        /// [`AttributeType::Morph`]
        const MORPH = 1 << 10;

        /// Types that change generated shader code
        const SHADER_AFFECTING = Self::POINT_SIZE.bits()
            | Self::BILLBOARD.bits()
            | Self::MATERIAL.bits()
            | Self::LIGHT.bits()
            | Self::SHADOW_CAST.bits()
            | Self::SKINNING.bits()
            | Self::MORPH.bits();
    }
}

impl AttributeTypeSet {
    /// True if `ty` is in the set
    pub fn has(self, ty: AttributeType) -> bool {
        self.contains(ty.bit())
    }

    /// Iterate the types in index order
    pub fn types(self) -> impl Iterator<Item = AttributeType> {
        AttributeType::ALL.into_iter().filter(move |ty| self.has(*ty))
    }
}

bitflags! {
    /// Inheritance flags of an attribute inside a state set
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AttributeFlags: u8 {
        /// Shadows the same type pushed by descendants
        const OVERRIDE = 1 << 0;
        /// Not shadowed by an ancestor's OVERRIDE
        const PROTECTED = 1 << 1;
    }
}

/// Surface material
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Diffuse color
    pub diffuse: Vec4,
    /// Ambient color
    pub ambient: Vec4,
    /// Specular color
    pub specular: Vec4,
    /// Emission color
    pub emission: Vec4,
    /// Specular exponent
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            diffuse: Vec4::new(0.8, 0.8, 0.8, 1.0),
            ambient: Vec4::new(0.2, 0.2, 0.2, 1.0),
            specular: Vec4::new(0.0, 0.0, 0.0, 1.0),
            emission: Vec4::new(0.0, 0.0, 0.0, 1.0),
            shininess: 12.5,
        }
    }
}

/// Directional light in view space
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    /// Direction the light travels
    pub direction: Vec3,
    /// Light color
    pub color: Vec4,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            direction: Vec3::new(0.0, 0.0, -1.0),
            color: Vec4::new(1.0, 1.0, 1.0, 1.0),
        }
    }
}

/// Depth test configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Depth {
    /// Test enabled
    pub enabled: bool,
    /// Comparison
    pub func: DepthFunc,
    /// Depth writes
    pub write: bool,
}

impl Default for Depth {
    fn default() -> Self {
        Self {
            enabled: true,
            func: DepthFunc::Less,
            write: true,
        }
    }
}

/// Shadow map depth pass parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowCast {
    /// Near and far planes of the light frustum
    pub depth_range: (f32, f32),
}

/// A typed state override
#[derive(Debug, Clone, PartialEq)]
pub enum StateAttribute {
    /// Line width in pixels
    LineWidth(f32),
    /// Point size in pixels
    PointSize(f32),
    /// Geometry always faces the camera
    Billboard,
    /// Surface material
    Material(Material),
    /// Directional light
    Light(Light),
    /// Blend factors, `None` disables blending
    BlendFunc(Option<(BlendFactor, BlendFactor)>),
    /// Depth configuration
    Depth(Depth),
    /// Culled faces, `None` disables culling
    CullFace(Option<CullFaceMode>),
    /// Depth-only shadow pass
    ShadowCast(ShadowCast),
    /// Skinning with the given number of bones
    Skinning {
        /// Bones in the matrix palette
        bone_count: u32,
    },
    /// Morphing with the given number of targets
    Morph {
        /// Morph targets blended per vertex
        target_count: u32,
        /// Current weight of each target
        weights: Vec<f32>,
    },
}

impl StateAttribute {
    /// Type tag of this attribute
    pub fn attribute_type(&self) -> AttributeType {
        match self {
            StateAttribute::LineWidth(_) => AttributeType::LineWidth,
            StateAttribute::PointSize(_) => AttributeType::PointSize,
            StateAttribute::Billboard => AttributeType::Billboard,
            StateAttribute::Material(_) => AttributeType::Material,
            StateAttribute::Light(_) => AttributeType::Light,
            StateAttribute::BlendFunc(_) => AttributeType::BlendFunc,
            StateAttribute::Depth(_) => AttributeType::Depth,
            StateAttribute::CullFace(_) => AttributeType::CullFace,
            StateAttribute::ShadowCast(_) => AttributeType::ShadowCast,
            StateAttribute::Skinning { .. } => AttributeType::Skinning,
            StateAttribute::Morph { .. } => AttributeType::Morph,
        }
    }

    /// Send fixed-function state to the context. Shader-only attributes do
    /// nothing here.
    pub fn apply(&self, ctx: &mut dyn GraphicContext) {
        match self {
            StateAttribute::LineWidth(width) => ctx.line_width(*width),
            StateAttribute::BlendFunc(Some((src, dst))) => {
                ctx.enable(Capability::Blend);
                ctx.blend_func(*src, *dst);
            }
            StateAttribute::BlendFunc(None) => ctx.disable(Capability::Blend),
            StateAttribute::Depth(depth) => {
                if depth.enabled {
                    ctx.enable(Capability::DepthTest);
                    ctx.depth_func(depth.func);
                } else {
                    ctx.disable(Capability::DepthTest);
                }
                ctx.depth_mask(depth.write);
            }
            StateAttribute::CullFace(Some(mode)) => {
                ctx.enable(Capability::CullFace);
                ctx.cull_face(*mode);
            }
            StateAttribute::CullFace(None) => ctx.disable(Capability::CullFace),
            _ => {}
        }
    }

    /// Upload the uniforms this attribute feeds to the current program
    pub fn apply_uniforms(&self, ctx: &mut dyn GraphicContext) {
        match self {
            StateAttribute::PointSize(size) => ctx.uniform_float("uPointSize", *size),
            StateAttribute::Material(material) => {
                ctx.uniform_vec4("uMaterialDiffuse", &material.diffuse);
                ctx.uniform_vec4("uMaterialAmbient", &material.ambient);
            }
            StateAttribute::Light(light) => {
                let dir = light.direction;
                ctx.uniform_vec4("uLightDirection", &Vec4::new(dir.x, dir.y, dir.z, 0.0));
                ctx.uniform_vec4("uLightColor", &light.color);
            }
            StateAttribute::ShadowCast(shadow) => {
                let (near, far) = shadow.depth_range;
                ctx.uniform_vec4("uShadowDepthRange", &Vec4::new(near, far, far - near, 1.0 / (far - near)));
            }
            StateAttribute::Morph { weights, .. } => {
                for (i, weight) in weights.iter().enumerate() {
                    ctx.uniform_float(&format!("uMorphWeight{i}"), *weight);
                }
            }
            _ => {}
        }
    }

    /// Part of the shader fingerprint contributed by this attribute. Two
    /// attributes of the same type with equal keys share a program.
    pub fn shader_key(&self) -> String {
        match self {
            StateAttribute::Skinning { bone_count } => format!("Skinning{bone_count}"),
            StateAttribute::Morph { target_count, .. } => format!("Morph{target_count}"),
            other => other.attribute_type().name().to_string(),
        }
    }
}
