//! WGSL front end: parse, validate and reflect which scene inputs a shader uses.

use naga::valid::{Capabilities, ValidationFlags, Validator};

use super::{ShaderError, ShaderSources, Stage};

/// Bind group holding every scene resource
pub const SCENE_GROUP: u32 = 0;
/// `SceneUniforms` uniform block
pub const UNIFORMS_BINDING: u32 = 0;
/// `texture_2d<f32>` bound to the scene texture
pub const TEXTURE_BINDING: u32 = 1;
/// Filtering sampler for the scene texture
pub const SAMPLER_BINDING: u32 = 2;

/// Per-vertex attributes the mesh provides, by shader location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    Position,
    Normal,
    Colour,
    TexCoord,
}

impl VertexAttribute {
    pub const ALL: [VertexAttribute; 4] = [
        VertexAttribute::Position,
        VertexAttribute::Normal,
        VertexAttribute::Colour,
        VertexAttribute::TexCoord,
    ];

    pub fn from_location(location: u32) -> Option<Self> {
        Self::ALL.get(location as usize).copied()
    }

    pub fn location(self) -> u32 {
        match self {
            VertexAttribute::Position => 0,
            VertexAttribute::Normal => 1,
            VertexAttribute::Colour => 2,
            VertexAttribute::TexCoord => 3,
        }
    }

    /// Byte offset inside [`crate::mesh::Vertex`]
    pub fn offset(self) -> u64 {
        let float = std::mem::size_of::<f32>() as u64;
        match self {
            VertexAttribute::Position => 0,
            VertexAttribute::Normal => 3 * float,
            VertexAttribute::Colour => 6 * float,
            VertexAttribute::TexCoord => 10 * float,
        }
    }

    /// Number of f32 components
    pub fn components(self) -> u32 {
        match self {
            VertexAttribute::Position | VertexAttribute::Normal => 3,
            VertexAttribute::Colour => 4,
            VertexAttribute::TexCoord => 2,
        }
    }
}

/// Which scene resources a stage (or program) reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneBindings {
    pub uniforms: bool,
    pub texture: bool,
    pub sampler: bool,
}

impl SceneBindings {
    pub fn union(self, other: Self) -> Self {
        Self {
            uniforms: self.uniforms || other.uniforms,
            texture: self.texture || other.texture,
            sampler: self.sampler || other.sampler,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.uniforms || self.texture || self.sampler)
    }
}

/// Reflection of one validated stage
#[derive(Debug, Clone, PartialEq)]
pub struct StageInterface {
    pub entry_point: String,
    pub bindings: SceneBindings,
    pub vertex_inputs: Vec<VertexAttribute>,
}

/// Reflection of a vertex/fragment pair
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramInterface {
    pub vertex: StageInterface,
    pub fragment: StageInterface,
}

impl ProgramInterface {
    /// Scene resources read by either stage
    pub fn bindings(&self) -> SceneBindings {
        self.vertex.bindings.union(self.fragment.bindings)
    }

    /// Mesh attributes the vertex stage reads, in location order
    pub fn vertex_inputs(&self) -> &[VertexAttribute] {
        &self.vertex.vertex_inputs
    }
}

/// Parse, validate and reflect both stages
pub fn reflect_program(sources: &ShaderSources) -> Result<ProgramInterface, ShaderError> {
    Ok(ProgramInterface {
        vertex: reflect_stage(&sources.vertex, Stage::Vertex)?,
        fragment: reflect_stage(&sources.fragment, Stage::Fragment)?,
    })
}

/// Parse and validate `source`, then find the entry point for `stage` and
/// the scene bindings and vertex inputs it actually uses.
pub fn reflect_stage(source: &str, stage: Stage) -> Result<StageInterface, ShaderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::Parse {
        stage,
        message: e.emit_to_string(source),
    })?;

    let info = Validator::new(ValidationFlags::all(), Capabilities::empty())
        .validate(&module)
        .map_err(|e| ShaderError::Validation {
            stage,
            message: e.as_inner().to_string(),
        })?;

    let wanted = match stage {
        Stage::Vertex => naga::ShaderStage::Vertex,
        Stage::Fragment => naga::ShaderStage::Fragment,
    };
    let (index, entry) = module
        .entry_points
        .iter()
        .enumerate()
        .find(|(_, ep)| ep.stage == wanted)
        .ok_or(ShaderError::MissingEntryPoint { stage })?;

    // Only globals the entry point reaches count; declared-but-unused ones are ignored
    let function_info = info.get_entry_point(index);
    let mut bindings = SceneBindings::default();
    for (handle, var) in module.global_variables.iter() {
        if function_info[handle].is_empty() {
            continue;
        }
        let Some(binding) = &var.binding else {
            continue;
        };
        match (binding.group, binding.binding) {
            (SCENE_GROUP, UNIFORMS_BINDING) => bindings.uniforms = true,
            (SCENE_GROUP, TEXTURE_BINDING) => bindings.texture = true,
            (SCENE_GROUP, SAMPLER_BINDING) => bindings.sampler = true,
            (group, binding) => {
                return Err(ShaderError::UnsupportedBinding {
                    stage,
                    group,
                    binding,
                })
            }
        }
    }

    let mut vertex_inputs = Vec::new();
    if stage == Stage::Vertex {
        for location in input_locations(&module, &entry.function) {
            let attribute = VertexAttribute::from_location(location)
                .ok_or(ShaderError::UnsupportedVertexInput(location))?;
            if !vertex_inputs.contains(&attribute) {
                vertex_inputs.push(attribute);
            }
        }
        vertex_inputs.sort_by_key(|a| a.location());
    }

    Ok(StageInterface {
        entry_point: entry.name.clone(),
        bindings,
        vertex_inputs,
    })
}

/// `@location` indices of an entry point's inputs, including struct members
fn input_locations(module: &naga::Module, function: &naga::Function) -> Vec<u32> {
    let mut locations = Vec::new();
    for argument in &function.arguments {
        match &argument.binding {
            Some(naga::Binding::Location { location, .. }) => locations.push(*location),
            Some(naga::Binding::BuiltIn(_)) => {}
            None => {
                if let naga::TypeInner::Struct { members, .. } = &module.types[argument.ty].inner {
                    locations.extend(members.iter().filter_map(|m| match &m.binding {
                        Some(naga::Binding::Location { location, .. }) => Some(*location),
                        _ => None,
                    }));
                }
            }
        }
    }
    locations
}
