use log::debug;

use super::hash::{Fingerprint, Fingerprinter};
use super::{AdmittedFrame, RawFrame};

/// Outcome of [`UniquenessFilter::consider`]
#[derive(Debug)]
pub enum Decision {
    Admitted(AdmittedFrame),
    Rejected {
        timestamp_seconds: f64,
        /// Sequence index of the first admitted frame within the threshold
        matched: usize,
        distance: u32,
    },
}

/// Admits a frame only if it is further than `threshold` bits from every
/// frame admitted so far in this run.
///
/// The comparison is against all earlier admissions, not just the last
/// one, so content that flips back and forth between a few shots is kept
/// once per shot. That makes each call linear in the number of admitted
/// frames. A prefix-bucketed index would cut that down if runs ever admit
/// thousands of frames; the admission rule would stay the same.
pub struct UniquenessFilter<F> {
    fingerprinter: F,
    threshold: u32,
    admitted: Vec<Fingerprint>,
}

impl<F: Fingerprinter> UniquenessFilter<F> {
    pub fn new(fingerprinter: F, threshold: u32) -> Self {
        Self {
            fingerprinter,
            threshold,
            admitted: Vec::new(),
        }
    }

    pub fn consider(&mut self, frame: RawFrame) -> Decision {
        let fingerprint = self.fingerprinter.fingerprint(&frame.image);

        for (matched, earlier) in self.admitted.iter().enumerate() {
            let distance = fingerprint.distance(earlier);
            if distance <= self.threshold {
                debug!(
                    "Rejected frame {} at {:.3}s: {} is {} bits from admitted #{}",
                    frame.frame_index, frame.timestamp_seconds, fingerprint, distance, matched
                );
                return Decision::Rejected {
                    timestamp_seconds: frame.timestamp_seconds,
                    matched,
                    distance,
                };
            }
        }

        let sequence_index = self.admitted.len();
        self.admitted.push(fingerprint);
        debug!(
            "Admitted frame {} at {:.3}s as #{} ({})",
            frame.frame_index, frame.timestamp_seconds, sequence_index, fingerprint
        );

        Decision::Admitted(AdmittedFrame {
            sequence_index,
            fingerprint,
            timestamp_seconds: frame.timestamp_seconds,
            image: frame.image,
        })
    }

    pub fn admitted(&self) -> &[Fingerprint] {
        &self.admitted
    }

    pub fn len(&self) -> usize {
        self.admitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.admitted.is_empty()
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    /// Uses the first pixel's red channel as the fingerprint
    struct RedChannel;

    impl Fingerprinter for RedChannel {
        fn fingerprint(&self, image: &RgbImage) -> Fingerprint {
            Fingerprint(image.get_pixel(0, 0).0[0] as u64)
        }
    }

    fn frame(index: u64, red: u8) -> RawFrame {
        RawFrame {
            image: RgbImage::from_pixel(2, 2, image::Rgb([red, 0, 0])),
            frame_index: index,
            timestamp_seconds: index as f64 * 0.5,
        }
    }

    fn admit_all(filter: &mut UniquenessFilter<RedChannel>, reds: &[u8]) -> Vec<AdmittedFrame> {
        reds.iter()
            .enumerate()
            .filter_map(|(i, &red)| match filter.consider(frame(i as u64, red)) {
                Decision::Admitted(admitted) => Some(admitted),
                Decision::Rejected { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_first_frame_always_admitted() {
        let mut filter = UniquenessFilter::new(RedChannel, Fingerprint::BITS);
        assert!(filter.is_empty());
        assert!(matches!(filter.consider(frame(0, 7)), Decision::Admitted(_)));
        assert_eq!(filter.len(), 1);
    }

    #[test]
    fn test_threshold_at_bit_width_admits_only_first() {
        let mut filter = UniquenessFilter::new(RedChannel, Fingerprint::BITS);
        let admitted = admit_all(&mut filter, &[0, 255, 0b1010_1010, 1]);
        assert_eq!(admitted.len(), 1);
    }

    #[test]
    fn test_distance_equal_to_threshold_is_duplicate() {
        // 0b11 vs 0 is exactly 2 bits.
        let mut filter = UniquenessFilter::new(RedChannel, 2);
        filter.consider(frame(0, 0));
        match filter.consider(frame(1, 0b11)) {
            Decision::Rejected { matched, distance, .. } => {
                assert_eq!(matched, 0);
                assert_eq!(distance, 2);
            }
            Decision::Admitted(_) => panic!("expected rejection"),
        }
        assert!(matches!(filter.consider(frame(2, 0b111)), Decision::Admitted(_)));
    }

    #[test]
    fn test_compares_against_all_admitted_not_just_last() {
        let mut filter = UniquenessFilter::new(RedChannel, 0);
        let admitted = admit_all(&mut filter, &[1, 2, 1, 2, 1, 3]);

        let reds: Vec<u64> = admitted.iter().map(|a| a.fingerprint.0).collect();
        assert_eq!(reds, vec![1, 2, 3]);
    }

    #[test]
    fn test_sequence_indices_gapless_and_pairwise_distinct() {
        let threshold = 1;
        let mut filter = UniquenessFilter::new(RedChannel, threshold);
        let admitted = admit_all(&mut filter, &[0, 1, 3, 7, 15, 14, 12, 0xf0, 0xff, 0x0f]);

        for (i, a) in admitted.iter().enumerate() {
            assert_eq!(a.sequence_index, i);
        }
        for w in admitted.windows(2) {
            assert!(w[0].timestamp_seconds <= w[1].timestamp_seconds);
        }
        let fps = filter.admitted();
        for i in 0..fps.len() {
            for j in (i + 1)..fps.len() {
                assert!(fps[i].distance(&fps[j]) > threshold);
            }
        }
    }
}
