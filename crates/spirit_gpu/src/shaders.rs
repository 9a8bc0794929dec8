//! WGSL shader sources
//!
//! Full-screen programs are assembled from [`FULLSCREEN_VERTEX_SHADER`] plus
//! a fragment body; see [`crate::fbo::ShaderProgram`].

/// Full-screen pass vertex stage
///
/// Emits one clipped triangle covering the whole viewport. Clip space is
/// used as-is, which is the same as an orthographic camera whose frustum
/// exactly covers a unit quad.
pub const FULLSCREEN_VERTEX_SHADER: &str = r#"
// ============================================================================
// Spirit Full-Screen Vertex Shader
// ============================================================================

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> @builtin(position) vec4<f32> {
    // (-1,-1), (3,-1), (-1,3)
    let x = f32((vertex_index << 1u) & 2u) * 2.0 - 1.0;
    let y = f32(vertex_index & 2u) * 2.0 - 1.0;
    return vec4<f32>(x, y, 0.0, 1.0);
}
"#;

/// Copies a source texture into the destination texel by texel
pub const COPY_SHADER: &str = r#"
// ============================================================================
// Spirit Copy Shader
// ============================================================================

struct CopyUniforms {
    resolution: vec4<f32>,  // xy = destination size
}

@group(0) @binding(0) var<uniform> uniforms: CopyUniforms;
@group(0) @binding(1) var source: texture_2d<f32>;

@fragment
fn fs_main(@builtin(position) frag_coord: vec4<f32>) -> @location(0) vec4<f32> {
    let uv = frag_coord.xy / uniforms.resolution.xy;
    let size = vec2<f32>(textureDimensions(source));
    let texel = min(vec2<i32>(uv * size), vec2<i32>(size) - vec2<i32>(1));
    return textureLoad(source, texel, 0);
}
"#;

/// Position simulation step
///
/// Reads the previous positions and the attraction targets and writes the
/// next `(position, life)` per particle.
pub const POSITION_SHADER: &str = r#"
// ============================================================================
// Spirit Position Simulation Shader
// ============================================================================

struct PositionUniforms {
    resolution_time: vec4<f32>,    // xy = resolution, z = time, w = init animation
    motion: vec4<f32>,             // speed, die speed, radius, curl size
    follow_attraction: vec4<f32>,  // xyz = follow point, w = attraction
    mouse: vec4<f32>,              // xyz = pointer position, w = pointer strength
}

@group(0) @binding(0) var<uniform> uniforms: PositionUniforms;
@group(0) @binding(1) var texture_position: texture_2d<f32>;
@group(0) @binding(2) var texture_default_position: texture_2d<f32>;

// ============================================================================
// Hashing and noise
// ============================================================================

fn hash13(p: vec3<f32>) -> f32 {
    var q = fract(p * 0.1031);
    q += dot(q, q.zyx + 31.32);
    return fract((q.x + q.y) * q.z);
}

fn hash33(p: vec3<f32>) -> vec3<f32> {
    var q = fract(p * vec3<f32>(0.1031, 0.1030, 0.0973));
    q += dot(q, q.yxz + 33.33);
    return fract((q.xxy + q.yxx) * q.zyx);
}

// Value noise in [-1, 1]
fn noise3(p: vec3<f32>) -> f32 {
    let i = floor(p);
    let f = fract(p);
    let u = f * f * (3.0 - 2.0 * f);

    let n000 = hash13(i);
    let n100 = hash13(i + vec3<f32>(1.0, 0.0, 0.0));
    let n010 = hash13(i + vec3<f32>(0.0, 1.0, 0.0));
    let n110 = hash13(i + vec3<f32>(1.0, 1.0, 0.0));
    let n001 = hash13(i + vec3<f32>(0.0, 0.0, 1.0));
    let n101 = hash13(i + vec3<f32>(1.0, 0.0, 1.0));
    let n011 = hash13(i + vec3<f32>(0.0, 1.0, 1.0));
    let n111 = hash13(i + vec3<f32>(1.0, 1.0, 1.0));

    let x00 = mix(n000, n100, u.x);
    let x10 = mix(n010, n110, u.x);
    let x01 = mix(n001, n101, u.x);
    let x11 = mix(n011, n111, u.x);
    return mix(mix(x00, x10, u.y), mix(x01, x11, u.y), u.z) * 2.0 - 1.0;
}

fn potential(p: vec3<f32>) -> vec3<f32> {
    return vec3<f32>(
        noise3(p),
        noise3(p + vec3<f32>(31.416, -47.853, 12.793)),
        noise3(p + vec3<f32>(-233.145, -113.408, -185.31)),
    );
}

// Divergence-free direction field, unit length where defined
fn curl(p: vec3<f32>, time: f32) -> vec3<f32> {
    let e = 0.1;
    let q = p + vec3<f32>(0.0, 0.0, time * 0.1);
    let dx = vec3<f32>(e, 0.0, 0.0);
    let dy = vec3<f32>(0.0, e, 0.0);
    let dz = vec3<f32>(0.0, 0.0, e);

    let px0 = potential(q - dx);
    let px1 = potential(q + dx);
    let py0 = potential(q - dy);
    let py1 = potential(q + dy);
    let pz0 = potential(q - dz);
    let pz1 = potential(q + dz);

    let c = vec3<f32>(
        (py1.z - py0.z) - (pz1.y - pz0.y),
        (pz1.x - pz0.x) - (px1.z - px0.z),
        (px1.y - px0.y) - (py1.x - py0.x),
    ) / (2.0 * e);

    let len = length(c);
    if (len < 1e-6) {
        return vec3<f32>(0.0);
    }
    return c / len;
}

// ============================================================================
// Simulation
// ============================================================================

@fragment
fn fs_main(@builtin(position) frag_coord: vec4<f32>) -> @location(0) vec4<f32> {
    let texel = vec2<i32>(frag_coord.xy);
    let previous = textureLoad(texture_position, texel, 0);
    let target_position = textureLoad(texture_default_position, texel, 0);

    let time = uniforms.resolution_time.z;
    let init_animation = uniforms.resolution_time.w;
    let speed = uniforms.motion.x;
    let die_speed = uniforms.motion.y;
    let radius = uniforms.motion.z;
    let curl_size = uniforms.motion.w;
    let follow_point = uniforms.follow_attraction.xyz;
    let attraction = uniforms.follow_attraction.w;

    let anchor = target_position.xyz + follow_point;
    var position = previous.xyz;
    var life = previous.w - die_speed;

    if (life < 0.0) {
        // Respawn near the target, jitter bounded by the radius
        let offset = hash33(vec3<f32>(target_position.w * 97.13, time, frag_coord.x + frag_coord.y * 0.37)) * 2.0 - 1.0;
        let jitter = offset / max(length(offset), 1.0) * radius;
        position = anchor + jitter;
        life = 0.5 + fract(target_position.w * 21.4131 + time);
    } else {
        let delta = anchor - position;
        let fade = smoothstep(0.0, 1.0, init_animation);
        position += delta * (0.005 + life * 0.01) * attraction * speed * fade;
        position += curl(position * curl_size, time) * speed;

        let away = position - uniforms.mouse.xyz;
        let dist = length(away);
        if (uniforms.mouse.w > 0.0 && dist > 1e-4) {
            position += away / dist * uniforms.mouse.w * (1.0 - smoothstep(0.0, 20.0, dist)) * 2.0;
        }
    }

    return vec4<f32>(position, life);
}
"#;

/// Particle draw: one screen-aligned quad per particle
pub const PARTICLE_SHADER: &str = r#"
// ============================================================================
// Spirit Particle Render Shader
// ============================================================================

struct ParticleUniforms {
    view_proj: mat4x4<f32>,
    color1: vec4<f32>,
    color2: vec4<f32>,
    color3: vec4<f32>,
    hover_color: vec4<f32>,
    mouse: vec4<f32>,   // xyz = pointer position, w = pointer strength
    params: vec4<f32>,  // point size (px), hover radius, viewport width, viewport height
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) color: vec4<f32>,
}

@group(0) @binding(0) var<uniform> uniforms: ParticleUniforms;
@group(0) @binding(1) var texture_position: texture_2d<f32>;
@group(0) @binding(2) var position_sampler: sampler;

fn gradient(life: f32) -> vec3<f32> {
    let t = clamp(life, 0.0, 1.0);
    if (t < 0.5) {
        return mix(uniforms.color1.rgb, uniforms.color2.rgb, t * 2.0);
    }
    return mix(uniforms.color2.rgb, uniforms.color3.rgb, (t - 0.5) * 2.0);
}

@vertex
fn vs_main(
    @builtin(vertex_index) vertex_index: u32,
    @location(0) lookup: vec2<f32>,
) -> VertexOutput {
    var out: VertexOutput;

    // Position comes from the simulation texture, not a vertex attribute
    let state = textureSampleLevel(texture_position, position_sampler, lookup, 0.0);

    let quad_verts = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>( 1.0, -1.0),
        vec2<f32>(-1.0,  1.0),
        vec2<f32>( 1.0, -1.0),
        vec2<f32>( 1.0,  1.0),
        vec2<f32>(-1.0,  1.0),
    );
    let corner = quad_verts[vertex_index];

    let clip = uniforms.view_proj * vec4<f32>(state.xyz, 1.0);
    let point_size = uniforms.params.x;
    let viewport = max(uniforms.params.zw, vec2<f32>(1.0));
    // Quad point_size pixels across, in clip units before the divide
    let offset = corner * point_size / viewport * clip.w;
    out.position = clip + vec4<f32>(offset, 0.0, 0.0);
    out.uv = corner * 0.5 + 0.5;

    var color = gradient(state.w);
    let strength = uniforms.mouse.w;
    if (strength > 0.0) {
        let dist = distance(state.xyz, uniforms.mouse.xyz);
        let highlight = strength * (1.0 - smoothstep(0.0, uniforms.params.y, dist));
        color = mix(color, uniforms.hover_color.rgb, highlight);
    }
    out.color = vec4<f32>(color, 1.0);

    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    // Round point with a soft rim
    let dist = length(in.uv - vec2<f32>(0.5)) * 2.0;
    let alpha = 1.0 - smoothstep(0.8, 1.0, dist);
    if (alpha < 0.01) {
        discard;
    }
    return vec4<f32>(in.color.rgb, in.color.a * alpha);
}
"#;
