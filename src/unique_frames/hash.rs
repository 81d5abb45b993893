use std::fmt;

use image::RgbImage;
use img_hash::{HashAlg, Hasher, HasherConfig, image as img_hash_image};

/// 64-bit perceptual fingerprint compared by Hamming distance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    pub const BITS: u32 = u64::BITS;

    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_be_bytes(bytes))
    }

    /// Number of differing bits
    pub fn distance(&self, other: &Fingerprint) -> u32 {
        (self.0 ^ other.0).count_ones()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Maps a frame to a fingerprint. Must be deterministic.
pub trait Fingerprinter {
    fn fingerprint(&self, image: &RgbImage) -> Fingerprint;
}

/// Classic pHash: mean of an 8x8 DCT block
pub struct PerceptualHasher {
    hasher: Hasher<[u8; 8]>,
}

impl PerceptualHasher {
    pub fn new() -> Self {
        Self {
            hasher: HasherConfig::with_bytes_type::<[u8; 8]>()
                .hash_alg(HashAlg::Mean)
                .hash_size(8, 8)
                .preproc_dct()
                .to_hasher(),
        }
    }
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fingerprinter for PerceptualHasher {
    fn fingerprint(&self, image: &RgbImage) -> Fingerprint {
        let hash = self.hasher.hash_image(&to_hasher_image(image));
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(hash.as_bytes());
        Fingerprint::from_bytes(bytes)
    }
}

/// img_hash is built against an older `image`, so pixels are copied across.
fn to_hasher_image(image: &RgbImage) -> img_hash_image::DynamicImage {
    let converted = img_hash_image::RgbImage::from_fn(image.width(), image.height(), |x, y| {
        img_hash_image::Rgb(image.get_pixel(x, y).0)
    });
    img_hash_image::DynamicImage::ImageRgb8(converted)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 16x16 grid of pseudo-random grey cells, scaled up to `size`
    fn blocky_noise(size: u32, seed: u32) -> RgbImage {
        let cell = size / 16;
        let mut state = seed;
        let mut cells = [0u8; 256];
        for c in cells.iter_mut() {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            *c = (state >> 16) as u8;
        }
        RgbImage::from_fn(size, size, |x, y| {
            let v = cells[((y / cell) * 16 + x / cell) as usize];
            image::Rgb([v, v, v])
        })
    }

    fn inverted(img: &RgbImage) -> RgbImage {
        let mut out = img.clone();
        for p in out.pixels_mut() {
            p.0 = [255 - p.0[0], 255 - p.0[1], 255 - p.0[2]];
        }
        out
    }

    #[test]
    fn test_hamming_distance() {
        let a = Fingerprint(0b1111_0000_1010_1010);
        assert_eq!(a.distance(&a), 0);

        let b = Fingerprint(0b0000_1111_1010_1010);
        assert_eq!(a.distance(&b), 8);
        assert_eq!(b.distance(&a), 8);

        assert_eq!(Fingerprint(0).distance(&Fingerprint(u64::MAX)), Fingerprint::BITS);
    }

    #[test]
    fn test_display_is_fixed_width_hex() {
        assert_eq!(Fingerprint(0xab).to_string(), "00000000000000ab");
        assert_eq!(
            Fingerprint::from_bytes([0x12, 0x34, 0, 0, 0, 0, 0, 0x01]).to_string(),
            "1234000000000001"
        );
    }

    #[test]
    fn test_conversion_keeps_every_pixel() {
        let img = blocky_noise(32, 3);
        let converted = to_hasher_image(&img);
        let converted = converted.as_rgb8().unwrap();

        assert_eq!(converted.dimensions(), img.dimensions());
        for (x, y, pixel) in img.enumerate_pixels() {
            assert_eq!(converted.get_pixel(x, y).0, pixel.0);
        }
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let hasher = PerceptualHasher::new();
        let img = blocky_noise(256, 7);
        assert_eq!(hasher.fingerprint(&img), hasher.fingerprint(&img));
        assert_eq!(
            PerceptualHasher::new().fingerprint(&img),
            hasher.fingerprint(&img)
        );
    }

    #[test]
    fn test_near_identical_images_are_close() {
        let hasher = PerceptualHasher::new();
        let img = blocky_noise(256, 7);
        let mut touched = img.clone();
        touched.put_pixel(100, 100, image::Rgb([0, 255, 0]));

        let d = hasher.fingerprint(&img).distance(&hasher.fingerprint(&touched));
        assert!(d <= 5, "distance was {d}");
    }

    #[test]
    fn test_distinct_images_are_far() {
        let hasher = PerceptualHasher::new();
        let img = blocky_noise(256, 7);

        let d = hasher.fingerprint(&img).distance(&hasher.fingerprint(&inverted(&img)));
        assert!(d > 5, "distance was {d}");
    }
}
