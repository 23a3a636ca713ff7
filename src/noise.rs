//! Seeded 3D Perlin noise for roughening cut surfaces
//!
//! Gradient noise over the classic permutation table, layered into fractal
//! Brownian motion. Cut caps are displaced along their plane normal by
//! [`surface_offset`], so both halves of a cut see the same surface.

use glam::{IVec3, Vec3};

use crate::config::NoiseConfig;

/// Amplitude decay per octave
pub const PERSISTENCE: f32 = 0.5;
/// Frequency multiplier per octave
pub const LACUNARITY: f32 = 2.0;

// Ken Perlin's reference permutation. Changing it changes every fractured surface.
const PERM: [u32; 256] = [
    151, 160, 137, 91, 90, 15, 131, 13, 201, 95, 96, 53, 194, 233, 7, 225, 140, 36, 103, 30, 69,
    142, 8, 99, 37, 240, 21, 10, 23, 190, 6, 148, 247, 120, 234, 75, 0, 26, 197, 62, 94, 252, 219,
    203, 117, 35, 11, 32, 57, 177, 33, 88, 237, 149, 56, 87, 174, 20, 125, 136, 171, 168, 68, 175,
    74, 165, 71, 134, 139, 48, 27, 166, 77, 146, 158, 231, 83, 111, 229, 122, 60, 211, 133, 230,
    220, 105, 92, 41, 55, 46, 245, 40, 244, 102, 143, 54, 65, 25, 63, 161, 1, 216, 80, 73, 209, 76,
    132, 187, 208, 89, 18, 169, 200, 196, 135, 130, 116, 188, 159, 86, 164, 100, 109, 198, 173,
    186, 3, 64, 52, 217, 226, 250, 124, 123, 5, 202, 38, 147, 118, 126, 255, 82, 85, 212, 207, 206,
    59, 227, 47, 16, 58, 17, 182, 189, 28, 42, 223, 183, 170, 213, 119, 248, 152, 2, 44, 154, 163,
    70, 221, 153, 101, 155, 167, 43, 172, 9, 129, 22, 39, 253, 19, 98, 108, 110, 79, 113, 224, 232,
    178, 185, 112, 104, 218, 246, 97, 228, 251, 34, 242, 193, 238, 210, 144, 12, 191, 179, 162,
    241, 81, 51, 145, 235, 249, 14, 239, 107, 49, 192, 214, 31, 181, 199, 106, 157, 184, 84, 204,
    176, 115, 121, 50, 45, 127, 4, 150, 254, 138, 236, 205, 93, 222, 114, 67, 29, 24, 72, 243, 141,
    128, 195, 78, 66, 215, 61, 156, 180,
];

/// Hash a lattice corner together with the seed
#[inline]
fn lattice_hash(corner: IVec3, seed: u32) -> u32 {
    let mixed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345) >> 16;
    let ix = (corner.x as u32 ^ mixed) & 255;
    let iy = (corner.y as u32 ^ (mixed >> 8)) & 255;
    let iz = (corner.z as u32 ^ (mixed >> 16)) & 255;
    let a = PERM[ix as usize];
    let b = PERM[((a + iy) & 255) as usize];
    PERM[((b + iz) & 255) as usize]
}

/// Dot product with one of the 12 cube edge gradients
#[inline]
fn gradient_dot(hash: u32, d: Vec3) -> f32 {
    let h = hash & 15;
    let u = if h < 8 { d.x } else { d.y };
    let v = match h {
        0..=3 => d.y,
        12 | 14 => d.z,
        _ => d.x,
    };
    let u = if h & 1 == 0 { -u } else { u };
    let v = if h & 2 == 0 { -v } else { v };
    u + v
}

/// Quintic fade, 6t⁵ - 15t⁴ + 10t³
#[inline]
fn fade(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + t * (b - a)
}

/// Single octave of gradient noise, roughly in `[-1, 1]`
pub fn perlin(position: Vec3, seed: u32) -> f32 {
    let floor = position.floor();
    let cell = floor.as_ivec3();
    let local = position - floor;
    let w = Vec3::new(fade(local.x), fade(local.y), fade(local.z));

    // Corner i sits at offset (i & 1, i >> 1 & 1, i >> 2 & 1)
    let mut corners = [0.0f32; 8];
    for (i, value) in corners.iter_mut().enumerate() {
        let offset = IVec3::new((i & 1) as i32, (i >> 1 & 1) as i32, (i >> 2 & 1) as i32);
        *value = gradient_dot(lattice_hash(cell + offset, seed), local - offset.as_vec3());
    }

    let y0 = lerp(lerp(corners[0], corners[1], w.x), lerp(corners[2], corners[3], w.x), w.y);
    let y1 = lerp(lerp(corners[4], corners[5], w.x), lerp(corners[6], corners[7], w.x), w.y);
    lerp(y0, y1, w.z)
}

/// Fractal Brownian motion normalized to roughly `[-1, 1]`
///
/// Returns 0 when `octaves` is 0.
pub fn fbm(position: Vec3, seed: u32, octaves: u32, persistence: f32, lacunarity: f32) -> f32 {
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    let mut norm = 0.0;

    for _ in 0..octaves {
        total += perlin(position * frequency, seed) * amplitude;
        norm += amplitude;
        amplitude *= persistence;
        frequency *= lacunarity;
    }

    if norm > 0.0 {
        total / norm
    } else {
        0.0
    }
}

/// Displacement of a cut surface point along the plane normal
pub fn surface_offset(config: &NoiseConfig, seed: u32, position: Vec3) -> f32 {
    if !config.is_enabled() {
        return 0.0;
    }
    config.amplitude
        * fbm(
            position * config.frequency,
            seed,
            config.octave_number,
            PERSISTENCE,
            LACUNARITY,
        )
}
