//! WGSL sources for the wgpu backend.

/// Bilateral filter over planar RGB.
///
/// `src`/`dst` hold the R, G and B planes back to back (`3 * w * h`
/// floats). Weights match the CPU reference: Gaussian spatial term times a
/// Gaussian on the Rec.709 luminance difference; `range_sigma <= 0` keeps
/// only exact luminance matches.
pub const BILATERAL: &str = r#"
struct Params {
    width: u32,
    height: u32,
    radius: u32,
    _pad0: u32,
    spatial_sigma: f32,
    range_sigma: f32,
    _pad1: f32,
    _pad2: f32,
}

@group(0) @binding(0) var<storage, read> src: array<f32>;
@group(0) @binding(1) var<storage, read_write> dst: array<f32>;
@group(0) @binding(2) var<uniform> params: Params;

fn luma(i: u32, n: u32) -> f32 {
    return 0.2126 * src[i] + 0.7152 * src[n + i] + 0.0722 * src[2u * n + i];
}

@compute @workgroup_size(16, 16)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let w = params.width;
    let h = params.height;
    if id.x >= w || id.y >= h { return; }

    let n = w * h;
    let c = id.y * w + id.x;
    let lc = luma(c, n);
    let r = i32(params.radius);
    let inv_s = 1.0 / (2.0 * params.spatial_sigma * params.spatial_sigma);
    let use_range = params.range_sigma > 0.0;
    let inv_r = select(0.0, 1.0 / (2.0 * params.range_sigma * params.range_sigma), use_range);

    var acc = vec3<f32>(0.0, 0.0, 0.0);
    var wsum = 0.0;
    for (var dy = -r; dy <= r; dy = dy + 1) {
        let ny = i32(id.y) + dy;
        if ny < 0 || ny >= i32(h) { continue; }
        for (var dx = -r; dx <= r; dx = dx + 1) {
            let nx = i32(id.x) + dx;
            if nx < 0 || nx >= i32(w) { continue; }
            let j = u32(ny) * w + u32(nx);
            let d = luma(j, n) - lc;
            var wr = 0.0;
            if use_range {
                wr = exp(-d * d * inv_r);
            } else if d == 0.0 {
                wr = 1.0;
            }
            let wgt = exp(-f32(dx * dx + dy * dy) * inv_s) * wr;
            acc = acc + wgt * vec3<f32>(src[j], src[n + j], src[2u * n + j]);
            wsum = wsum + wgt;
        }
    }

    var out = vec3<f32>(src[c], src[n + c], src[2u * n + c]);
    if wsum > 0.0 {
        out = acc / wsum;
    }
    dst[c] = out.x;
    dst[n + c] = out.y;
    dst[2u * n + c] = out.z;
}
"#;
