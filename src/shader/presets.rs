//! Built-in WGSL shader presets.
//!
//! Every preset reads its matrices from the scene uniform block at
//! `@group(0) @binding(0)`; the fragment stages differ in which other scene
//! inputs they pull in.

use super::ShaderSources;

macro_rules! scene_uniforms {
    () => {
        r#"
struct SceneUniforms {
    projection: mat4x4<f32>,
    view: mat4x4<f32>,
    light_position: vec4<f32>,
    bouncing_number: f32,
    sensitivity: f32,
    bars: array<vec4<f32>, 4>,
};

@group(0) @binding(0) var<uniform> scene: SceneUniforms;
"#
    };
}

macro_rules! scene_texture {
    () => {
        r#"
@group(0) @binding(1) var scene_texture: texture_2d<f32>;
@group(0) @binding(2) var scene_sampler: sampler;
"#
    };
}

const LIT_TEXTURED_VS: &str = concat!(
    scene_uniforms!(),
    r#"
struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) colour: vec4<f32>,
    @location(3) tex_coord: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) colour: vec4<f32>,
    @location(1) tex_coord: vec2<f32>,
    @location(2) light_intensity: f32,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.colour = in.colour;
    out.tex_coord = in.tex_coord;
    let light = scene.view * scene.light_position;
    out.light_intensity = dot(light, vec4<f32>(in.normal, 1.0));
    out.clip_position = scene.projection * scene.view * vec4<f32>(in.position, 1.0);
    return out;
}
"#
);

const LIT_TEXTURED_FS: &str = concat!(
    scene_texture!(),
    r#"
@fragment
fn fs_main(
    @location(1) tex_coord: vec2<f32>,
    @location(2) light_intensity: f32,
) -> @location(0) vec4<f32> {
    let l = max(0.3, light_intensity * 0.3);
    return vec4<f32>(l, l, l, 1.0) * textureSample(scene_texture, scene_sampler, tex_coord);
}
"#
);

const TEXTURED_VS: &str = concat!(
    scene_uniforms!(),
    r#"
struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(2) colour: vec4<f32>,
    @location(3) tex_coord: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) colour: vec4<f32>,
    @location(1) tex_coord: vec2<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.colour = in.colour;
    out.tex_coord = in.tex_coord;
    out.clip_position = scene.projection * scene.view * vec4<f32>(in.position, 1.0);
    return out;
}
"#
);

const TEXTURED_FS: &str = concat!(
    scene_texture!(),
    r#"
@fragment
fn fs_main(@location(1) tex_coord: vec2<f32>) -> @location(0) vec4<f32> {
    return textureSample(scene_texture, scene_sampler, tex_coord);
}
"#
);

const FLAT_COLOUR_FS: &str = r#"
@fragment
fn fs_main(@location(0) colour: vec4<f32>) -> @location(0) vec4<f32> {
    return colour;
}
"#;

const RAINBOW_VS: &str = concat!(
    scene_uniforms!(),
    r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) ramp: vec3<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.ramp = clamp(position, vec3<f32>(0.0), vec3<f32>(1.0));
    out.clip_position = scene.projection * scene.view * vec4<f32>(position, 1.0);
    return out;
}
"#
);

const RAINBOW_FS: &str = r#"
@fragment
fn fs_main(@location(0) ramp: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(ramp, 1.0);
}
"#;

const CHANGING_COLOUR_FS: &str = concat!(
    scene_uniforms!(),
    r#"
const PI: f32 = 3.1415926535897932;

@fragment
fn fs_main(@location(1) tex_coord: vec2<f32>) -> @location(0) vec4<f32> {
    let b = scene.bouncing_number;
    let n = b * PI * 2.0;
    let sn = sin(n * tex_coord.x) * 0.5 + 0.5;
    let cn = sin(n * tex_coord.y) * 0.5 + 0.5;
    return vec4<f32>(b, sn, cn, 1.0);
}
"#
);

macro_rules! light_vs {
    ($depth_scale:literal) => {
        concat!(
            scene_uniforms!(),
            r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) light_intensity: f32,
};

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
) -> VertexOutput {
    var out: VertexOutput;
    let light = scene.view * scene.light_position;
    out.light_intensity = dot(light, vec4<f32>(normal, 1.0));
    let v = vec3<f32>(position.xy, position.z * "#,
            $depth_scale,
            r#");
    out.clip_position = scene.projection * scene.view * vec4<f32>(v, 1.0);
    return out;
}
"#
        )
    };
}

const SIMPLE_LIGHT_VS: &str = light_vs!("1.0");
const FLATTENED_VS: &str = light_vs!("0.1");

const SIMPLE_LIGHT_FS: &str = r#"
@fragment
fn fs_main(@location(0) light_intensity: f32) -> @location(0) vec4<f32> {
    let l = light_intensity * 0.25;
    return vec4<f32>(l, l, l, 1.0);
}
"#;

const TOON_FS: &str = r#"
@fragment
fn fs_main(@location(0) light_intensity: f32) -> @location(0) vec4<f32> {
    let intensity = light_intensity * 0.5;
    if intensity > 0.95 {
        return vec4<f32>(1.0, 0.5, 0.5, 1.0);
    } else if intensity > 0.5 {
        return vec4<f32>(0.6, 0.3, 0.3, 1.0);
    } else if intensity > 0.25 {
        return vec4<f32>(0.4, 0.2, 0.2, 1.0);
    }
    return vec4<f32>(0.2, 0.1, 0.1, 1.0);
}
"#;

const SPECTRUM_BANDS_FS: &str = concat!(
    scene_uniforms!(),
    r#"
@fragment
fn fs_main(
    @location(0) colour: vec4<f32>,
    @location(1) tex_coord: vec2<f32>,
) -> @location(0) vec4<f32> {
    let column = u32(clamp(tex_coord.x, 0.0, 0.999) * 16.0);
    let level = scene.bars[column / 4u][column % 4u];
    let height = 1.0 - tex_coord.y;
    if height > level {
        return vec4<f32>(colour.rgb * 0.25, 1.0);
    }
    let hue = f32(column) / 15.0;
    let glow = 0.5 + 0.5 * scene.sensitivity;
    return vec4<f32>(hue * glow, (1.0 - hue) * glow, glow, 1.0);
}
"#
);

/// A named vertex/fragment pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderPreset {
    pub name: &'static str,
    pub vertex: &'static str,
    pub fragment: &'static str,
}

impl ShaderPreset {
    pub fn sources(&self) -> ShaderSources {
        ShaderSources::new(self.vertex, self.fragment)
    }
}

/// All built-in presets; the first is used at startup
pub fn presets() -> &'static [ShaderPreset] {
    const PRESETS: &[ShaderPreset] = &[
        ShaderPreset {
            name: "Texture + Lighting",
            vertex: LIT_TEXTURED_VS,
            fragment: LIT_TEXTURED_FS,
        },
        ShaderPreset {
            name: "Textured",
            vertex: TEXTURED_VS,
            fragment: TEXTURED_FS,
        },
        ShaderPreset {
            name: "Flat Colour",
            vertex: TEXTURED_VS,
            fragment: FLAT_COLOUR_FS,
        },
        ShaderPreset {
            name: "Rainbow",
            vertex: RAINBOW_VS,
            fragment: RAINBOW_FS,
        },
        ShaderPreset {
            name: "Changing Colour",
            vertex: TEXTURED_VS,
            fragment: CHANGING_COLOUR_FS,
        },
        ShaderPreset {
            name: "Simple Light",
            vertex: SIMPLE_LIGHT_VS,
            fragment: SIMPLE_LIGHT_FS,
        },
        ShaderPreset {
            name: "Flattened",
            vertex: FLATTENED_VS,
            fragment: SIMPLE_LIGHT_FS,
        },
        ShaderPreset {
            name: "Toon Shader",
            vertex: SIMPLE_LIGHT_VS,
            fragment: TOON_FS,
        },
        ShaderPreset {
            name: "Spectrum Bands",
            vertex: TEXTURED_VS,
            fragment: SPECTRUM_BANDS_FS,
        },
    ];
    PRESETS
}

/// Look a preset up by case-insensitive name or by 1-based position
pub fn find_preset(key: &str) -> Option<(usize, &'static ShaderPreset)> {
    let key = key.trim();
    if let Ok(number) = key.parse::<usize>() {
        return number
            .checked_sub(1)
            .and_then(|i| presets().get(i).map(|p| (i, p)));
    }
    presets()
        .iter()
        .enumerate()
        .find(|(_, p)| p.name.eq_ignore_ascii_case(key))
}
