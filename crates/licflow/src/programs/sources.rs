//! GLSL generation for the pass programs.
//!
//! Every fragment shader shares one prelude: the `FlowParams` uniform block,
//! split texture/sampler bindings aliased to `u_<name>` macros, the
//! compile-time constants of its pass and the field-decoding helpers.

use std::fmt::Write as _;

use crate::passes::{PassContract, VertexKind};
use crate::programs::{AttributeDecl, GlslType, ProgramSource};
use crate::types::PipelineSettings;

pub(crate) fn build(contract: &PassContract, settings: &PipelineSettings) -> ProgramSource {
    let (attributes, vertex) = match contract.vertex {
        VertexKind::Quad => (quad_attributes(), QUAD_VERTEX.to_string()),
        VertexKind::Globe => (
            globe_attributes(),
            format!("{GLOBE_VERTEX_HEAD}{PARAMS_BLOCK}{GLOBE_VERTEX_MAIN}"),
        ),
    };
    ProgramSource {
        name: contract.program,
        attributes,
        uniforms: contract.uniforms.clone(),
        vertex,
        fragment: fragment_source(contract, settings),
    }
}

fn quad_attributes() -> Vec<AttributeDecl> {
    vec![
        AttributeDecl {
            name: "vertexCoord",
            ty: GlslType::Vec2,
            location: 0,
        },
        AttributeDecl {
            name: "texCoord",
            ty: GlslType::Vec2,
            location: 1,
        },
    ]
}

fn globe_attributes() -> Vec<AttributeDecl> {
    vec![
        AttributeDecl {
            name: "modelCoord",
            ty: GlslType::Vec3,
            location: 0,
        },
        AttributeDecl {
            name: "texCoord",
            ty: GlslType::Vec2,
            location: 1,
        },
    ]
}

fn fragment_source(contract: &PassContract, settings: &PipelineSettings) -> String {
    let varying = match contract.vertex {
        VertexKind::Quad => "vTexCoord",
        VertexKind::Globe => "tex",
    };

    let mut out = String::new();
    out.push_str("#version 450\n");
    let _ = writeln!(out, "layout(location = 0) in vec2 {varying};");
    out.push_str("layout(location = 0) out vec4 fragColor;\n\n");
    out.push_str(PARAMS_BLOCK);
    out.push('\n');

    for (slot, decl) in contract.uniforms.iter().filter(|d| d.is_sampler()).enumerate() {
        let name = decl.name;
        let _ = writeln!(
            out,
            "layout(set = 1, binding = {}) uniform texture2D tex_{name};",
            slot * 2
        );
        let _ = writeln!(
            out,
            "layout(set = 1, binding = {}) uniform sampler samp_{name};",
            slot * 2 + 1
        );
        let _ = writeln!(out, "#define u_{name} sampler2D(tex_{name}, samp_{name})");
    }
    out.push('\n');

    let resolution = settings.resolution;
    let _ = writeln!(
        out,
        "#define FIELD_SIZE vec2({:?}, {:?})",
        resolution.width as f32, resolution.height as f32
    );
    for (name, value) in &contract.defines {
        let _ = writeln!(out, "#define {name} {value}");
    }
    let _ = writeln!(out, "#define u_field_source u_{}", contract.field_sampler);
    out.push('\n');
    out.push_str(FIELD_HELPERS);
    out.push('\n');
    out.push_str(fragment_main(contract.program));
    out
}

fn fragment_main(program: crate::programs::ProgramName) -> &'static str {
    use crate::programs::ProgramName;
    match program {
        ProgramName::NoiseTransport => NOISE_TRANSPORT_MAIN,
        ProgramName::OrthogonalLic => ORTHOGONAL_LIC_MAIN,
        ProgramName::Advection => ADVECTION_MAIN,
        ProgramName::Blend => BLEND_MAIN,
        ProgramName::Globe => GLOBE_MAIN,
    }
}

/// Uniform block shared by both stages. Layout must match `FlowUniforms`.
const PARAMS_BLOCK: &str = r"layout(std140, set = 0, binding = 0) uniform FlowParams {
    mat4 ModelViewMatrix;
    mat4 ProjectionMatrix;
    vec2 randomOffset;
    int mask;
    float m;
    float n;
} params;
";

const QUAD_VERTEX: &str = r"#version 450
layout(location = 0) in vec2 vertexCoord;
layout(location = 1) in vec2 texCoord;
layout(location = 0) out vec2 vTexCoord;

void main() {
    vTexCoord = texCoord;
    gl_Position = vec4(vertexCoord, 0.0, 1.0);
}
";

const GLOBE_VERTEX_HEAD: &str = r"#version 450
layout(location = 0) in vec3 modelCoord;
layout(location = 1) in vec2 texCoord;
layout(location = 0) out vec2 tex;

";

const GLOBE_VERTEX_MAIN: &str = r"
void main() {
    tex = texCoord;
    gl_Position = params.ProjectionMatrix * params.ModelViewMatrix * vec4(modelCoord, 1.0);
}
";

// Blue is exactly zero over land; red/green carry the vector biased by 0.5.
const FIELD_HELPERS: &str = r"bool isWater(vec2 coord) {
    return textureLod(u_field_source, coord, 0.0).b != 0.0;
}

vec2 fieldAt(vec2 coord) {
    vec4 s = textureLod(u_field_source, coord, 0.0);
    return vec2(s.r - 0.5, s.g - 0.5);
}

vec2 orthogonalFieldAt(vec2 coord) {
    vec4 s = textureLod(u_field_source, coord, 0.0);
    return vec2(-(s.g - 0.5), s.r - 0.5);
}
";

const NOISE_TRANSPORT_MAIN: &str = r"void main() {
    if (!isWater(vTexCoord)) {
        fragColor = textureLod(u_noise, vTexCoord, 0.0);
        return;
    }
    vec2 advected = vTexCoord + params.randomOffset
        + fieldAt(vTexCoord) * TRANSPORT_STEP / FIELD_SIZE;
    fragColor = textureLod(u_noise, advected, 0.0);
}
";

const ORTHOGONAL_LIC_MAIN: &str = r"void main() {
    if (!isWater(vTexCoord)) {
        fragColor = textureLod(u_transportedNoise, vTexCoord, 0.0);
        return;
    }
    vec3 sum = vec3(0.0);
    for (int direction = -1; direction <= 1; direction += 2) {
        vec2 pos = vTexCoord;
        vec2 v = orthogonalFieldAt(pos);
        for (int i = 0; i < LIC_STEPS; i++) {
            sum += textureLod(u_transportedNoise, pos, 0.0).rgb;
            pos += float(direction) * v * LIC_STEP / FIELD_SIZE;
            v = orthogonalFieldAt(pos);
        }
    }
    fragColor = vec4(sum / float(2 * LIC_STEPS), 1.0);
}
";

const ADVECTION_MAIN: &str = r"void main() {
    if (!isWater(vTexCoord)) {
        fragColor = textureLod(u_previousTexture, vTexCoord, 0.0);
        return;
    }
    vec2 pos = vTexCoord;
    vec2 v = fieldAt(pos);
    for (int i = 0; i < ADVECTION_STEPS; i++) {
        pos -= v * ADVECTION_STEP / FIELD_SIZE;
        v = fieldAt(pos);
    }
    fragColor = textureLod(u_previousTexture, pos, 0.0);
}
";

const BLEND_MAIN: &str = r"void main() {
    vec4 lic = textureLod(u_orthogonalLIC, vTexCoord, 0.0);
    vec4 advected = textureLod(u_advected, vTexCoord, 0.0);
    fragColor = lic * BLEND_LIC + advected * BLEND_ADVECTED;
}
";

const GLOBE_MAIN: &str = r"void main() {
    if (!isWater(tex)) {
        fragColor = textureLod(u_earthTexture, tex, 0.0);
        return;
    }
    vec4 pixel = textureLod(u_texture, tex, 0.0);
    vec4 alpha = vec4(1.0);
    if (params.mask != 0) {
        float ratio = min(length(fieldAt(tex)) / MAGNITUDE_CEILING, 1.0);
        float slow = 1.0 - pow(1.0 - ratio, params.m);
        vec4 faint = vec4(1.0) - pow(vec4(1.0) - pixel, vec4(params.n));
        alpha = faint * slow;
    }
    fragColor = pixel * alpha;
}
";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::PipelinePasses;
    use crate::programs::ProgramName;
    use crate::types::Resolution;

    fn source(name: ProgramName, settings: &PipelineSettings) -> ProgramSource {
        build(&PipelinePasses::new(settings).contract(name), settings)
    }

    #[test]
    fn samplers_bind_in_declared_order() {
        let globe = source(ProgramName::Globe, &PipelineSettings::default());
        let fragment = &globe.fragment;
        assert!(fragment.contains("binding = 0) uniform texture2D tex_texture;"));
        assert!(fragment.contains("binding = 3) uniform sampler samp_oceanCurrent;"));
        assert!(fragment.contains("binding = 4) uniform texture2D tex_earthTexture;"));
        assert!(fragment.contains("#define u_field_source u_oceanCurrent"));
    }

    #[test]
    fn noise_transport_reads_the_field_sampler() {
        let transport = source(ProgramName::NoiseTransport, &PipelineSettings::default());
        assert!(transport.fragment.contains("#define u_field_source u_field"));
        assert!(transport.fragment.contains("#define TRANSPORT_STEP 10.0"));
        assert!(transport.vertex.contains("vTexCoord = texCoord;"));
    }

    #[test]
    fn field_size_follows_resolution() {
        let settings = PipelineSettings::with_resolution(64, 32);
        let lic = source(ProgramName::OrthogonalLic, &settings);
        assert_eq!(settings.resolution, Resolution::new(64, 32));
        assert!(lic.fragment.contains("#define FIELD_SIZE vec2(64.0, 32.0)"));
        assert!(lic.fragment.contains("#define LIC_STEPS 25"));
    }

    #[test]
    fn globe_vertex_projects_model_coordinates() {
        let globe = source(ProgramName::Globe, &PipelineSettings::default());
        assert!(globe.vertex.contains("uniform FlowParams"));
        assert!(globe.vertex.contains("layout(location = 0) out vec2 tex;"));
        assert!(globe.fragment.contains("layout(location = 0) in vec2 tex;"));
        assert_eq!(globe.attributes[0].name, "modelCoord");
    }
}
