//! Procedural terrain: fractal gradient noise and the cached elevation field.

use forage_core::{Position, TerrainConfig};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Ken Perlin's reference permutation.
const REFERENCE_PERMUTATION: [u8; 256] = [
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

/// 2D gradient noise over a doubled 256-entry permutation table
#[derive(Debug, Clone)]
pub struct GradientNoise {
    perm: [usize; 512],
}

impl Default for GradientNoise {
    fn default() -> Self {
        Self::fixed()
    }
}

impl GradientNoise {
    /// Noise over the reference table; identical for every instance
    pub fn fixed() -> Self {
        Self::from_table(&REFERENCE_PERMUTATION)
    }

    /// Noise over a permutation shuffled deterministically from `seed`
    pub fn seeded(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut table: Vec<u8> = (0..=255u8).collect();
        table.shuffle(&mut rng);

        let mut fixed = [0u8; 256];
        fixed.copy_from_slice(&table);
        Self::from_table(&fixed)
    }

    pub fn from_config(config: &TerrainConfig) -> Self {
        match config.seed {
            Some(seed) => Self::seeded(seed),
            None => Self::fixed(),
        }
    }

    fn from_table(table: &[u8; 256]) -> Self {
        let mut perm = [0usize; 512];
        for i in 0..256 {
            perm[i] = table[i] as usize;
            perm[i + 256] = table[i] as usize;
        }
        Self { perm }
    }

    /// Single-octave noise at `(x, y)`, in [-1, 1]
    pub fn noise(&self, x: f64, y: f64) -> f64 {
        let xi = (x.floor() as i64 & 255) as usize;
        let yi = (y.floor() as i64 & 255) as usize;
        let xf = x - x.floor();
        let yf = y - y.floor();
        let u = fade(xf);
        let v = fade(yf);

        let p = &self.perm;
        let aa = p[p[xi] + yi];
        let ab = p[p[xi] + yi + 1];
        let ba = p[p[xi + 1] + yi];
        let bb = p[p[xi + 1] + yi + 1];

        let x1 = lerp(u, grad(aa, xf, yf), grad(ba, xf - 1.0, yf));
        let x2 = lerp(u, grad(ab, xf, yf - 1.0), grad(bb, xf - 1.0, yf - 1.0));
        lerp(v, x1, x2)
    }

    /// Octave sum with doubling frequency and `persistence` amplitude falloff,
    /// normalized by the total amplitude.
    pub fn fractal(&self, x: f64, y: f64, octaves: u32, persistence: f64) -> f64 {
        let mut total = 0.0;
        let mut frequency = 1.0;
        let mut amplitude = 1.0;
        let mut max = 0.0;

        for _ in 0..octaves {
            total += self.noise(x * frequency, y * frequency) * amplitude;
            max += amplitude;
            amplitude *= persistence;
            frequency *= 2.0;
        }

        if max == 0.0 {
            return 0.0;
        }
        (total / max).clamp(-1.0, 1.0)
    }
}

/// Quintic fade curve 6t^5 - 15t^4 + 10t^3
fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn lerp(t: f64, a: f64, b: f64) -> f64 {
    a + t * (b - a)
}

/// Dot product with one of the `(±1, ±1)` gradients picked by the hash bits
fn grad(hash: usize, x: f64, y: f64) -> f64 {
    let h = hash & 0x3F;
    let (u, v) = if h < 4 { (x, y) } else { (y, x) };
    let u = if h & 1 == 0 { u } else { -u };
    let v = if h & 2 == 0 { v } else { -v };
    u + v
}

/// Immutable elevation grid with values in [0, 1]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElevationField {
    pub width: i32,
    pub height: i32,
    cells: Vec<f64>,
}

impl ElevationField {
    /// Sample fractal noise once per cell and map it from [-1, 1] to [0, 1]
    pub fn generate(width: i32, height: i32, config: &TerrainConfig) -> Self {
        let noise = GradientNoise::from_config(config);
        let field = Self::from_fn(width, height, |pos| {
            let value = noise.fractal(
                pos.x as f64 * config.scale,
                pos.y as f64 * config.scale,
                config.octaves,
                config.persistence,
            );
            (value + 1.0) * 0.5
        });
        debug!(
            width,
            height,
            seeded = config.seed.is_some(),
            min = field.min(),
            max = field.max(),
            "Generated elevation field"
        );
        field
    }

    /// Field whose cells are `elevation(pos)` clamped to [0, 1], row-major
    pub fn from_fn(width: i32, height: i32, mut elevation: impl FnMut(Position) -> f64) -> Self {
        let size = (width.max(0) * height.max(0)) as usize;
        let mut cells = Vec::with_capacity(size);
        for y in 0..height {
            for x in 0..width {
                cells.push(elevation(Position::new(x, y)).clamp(0.0, 1.0));
            }
        }
        Self {
            width,
            height,
            cells,
        }
    }

    /// Uniform terrain, mainly for controlled scenarios
    pub fn flat(width: i32, height: i32, elevation: f64) -> Self {
        Self::from_fn(width, height, |_| elevation)
    }

    /// Elevation at `pos`, clamping out-of-range coordinates to the border
    pub fn get(&self, pos: Position) -> f64 {
        if self.cells.is_empty() {
            return 0.0;
        }
        let clamped = pos.clamp(self.width, self.height);
        self.cells[self.pos_to_index(clamped)]
    }

    fn pos_to_index(&self, pos: Position) -> usize {
        (pos.y * self.width + pos.x) as usize
    }

    pub fn min(&self) -> f64 {
        self.cells.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.cells.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Iterator over all cells with positions
    pub fn iter(&self) -> impl Iterator<Item = (Position, f64)> + '_ {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, value)| (Position::new(i as i32 % width, i as i32 / width), *value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_noise_is_zero_on_lattice_points() {
        let noise = GradientNoise::fixed();
        assert_eq!(noise.noise(0.0, 0.0), 0.0);
        assert_eq!(noise.noise(3.0, 7.0), 0.0);
    }

    #[test]
    fn test_fixed_table_is_reproducible() {
        let a = GradientNoise::fixed();
        let b = GradientNoise::default();
        for i in 0..50 {
            let x = i as f64 * 0.37;
            let y = i as f64 * 0.11;
            assert_eq!(a.fractal(x, y, 5, 0.5), b.fractal(x, y, 5, 0.5));
        }
    }

    #[test]
    fn test_seeded_tables_differ_from_fixed() {
        let fixed = GradientNoise::fixed();
        let seeded = GradientNoise::seeded(7);
        let again = GradientNoise::seeded(7);

        let differs = (0..100).any(|i| {
            let x = i as f64 * 0.53 + 0.25;
            let y = i as f64 * 0.29 + 0.75;
            fixed.noise(x, y) != seeded.noise(x, y)
        });
        assert!(differs);
        assert_eq!(seeded.noise(1.3, 2.7), again.noise(1.3, 2.7));
    }

    #[test]
    fn test_elevation_field_in_unit_range() {
        let field = ElevationField::generate(64, 48, &TerrainConfig::default());
        assert!(field.min() >= 0.0);
        assert!(field.max() <= 1.0);
        assert_eq!(field.iter().count(), 64 * 48);
    }

    #[test]
    fn test_elevation_lookup_clamps() {
        let field = ElevationField::generate(20, 10, &TerrainConfig {
            scale: 0.1,
            ..Default::default()
        });
        assert_eq!(field.get(Position::new(-4, -4)), field.get(Position::new(0, 0)));
        assert_eq!(field.get(Position::new(100, 100)), field.get(Position::new(19, 9)));
    }

    #[test]
    fn test_from_fn_is_row_major_and_clamped() {
        let field = ElevationField::from_fn(4, 3, |pos| pos.x as f64 - 1.0);
        assert_eq!(field.get(Position::new(0, 2)), 0.0);
        assert_eq!(field.get(Position::new(1, 1)), 0.0);
        assert_eq!(field.get(Position::new(2, 0)), 1.0);
        assert_eq!(field.get(Position::new(3, 2)), 1.0);
    }

    #[test]
    fn test_identical_terrain_without_seed() {
        let config = TerrainConfig::default();
        let a = ElevationField::generate(30, 30, &config);
        let b = ElevationField::generate(30, 30, &config);
        assert!(a.iter().zip(b.iter()).all(|(x, y)| x == y));
    }

    proptest! {
        #[test]
        fn prop_fractal_in_range(
            x in -500.0f64..500.0,
            y in -500.0f64..500.0,
            octaves in 1u32..8,
            persistence in 0.01f64..0.99,
        ) {
            let value = GradientNoise::fixed().fractal(x, y, octaves, persistence);
            prop_assert!((-1.0..=1.0).contains(&value));
        }
    }
}
