use super::RawFrame;

/// Keeps every Nth decoded frame, N derived from frame rate and interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sampler {
    stride: u64,
}

impl Sampler {
    /// Unknown, zero or non-finite frame rates sample every frame.
    pub fn new(frame_rate: Option<f64>, interval_sec: f64) -> Self {
        let stride = match frame_rate {
            Some(fps) if fps.is_finite() && fps > 0.0 && interval_sec.is_finite() => {
                (fps * interval_sec).round().max(1.0) as u64
            }
            _ => 1,
        };
        Self { stride }
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    pub fn keeps(&self, frame_index: u64) -> bool {
        frame_index % self.stride == 0
    }

    /// Filters by position only, errors pass through so the caller sees them
    pub fn sample<I, E>(self, frames: I) -> impl Iterator<Item = Result<RawFrame, E>>
    where
        I: IntoIterator<Item = Result<RawFrame, E>>,
    {
        frames.into_iter().filter(move |frame| match frame {
            Ok(frame) => self.keeps(frame.frame_index),
            Err(_) => true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn frames(count: u64, fps: f64) -> Vec<Result<RawFrame, ()>> {
        (0..count)
            .map(|i| {
                Ok(RawFrame {
                    image: RgbImage::new(1, 1),
                    frame_index: i,
                    timestamp_seconds: i as f64 / fps,
                })
            })
            .collect()
    }

    #[test]
    fn test_stride() {
        assert_eq!(Sampler::new(Some(20.0), 0.15).stride(), 3);
        assert_eq!(Sampler::new(Some(10.0), 0.5).stride(), 5);
        assert_eq!(Sampler::new(Some(29.97), 1.0).stride(), 30);
        assert_eq!(Sampler::new(Some(24.0), 0.01).stride(), 1);
    }

    #[test]
    fn test_degenerate_inputs_fall_back_to_every_frame() {
        assert_eq!(Sampler::new(None, 0.5).stride(), 1);
        assert_eq!(Sampler::new(Some(0.0), 0.5).stride(), 1);
        assert_eq!(Sampler::new(Some(-25.0), 0.5).stride(), 1);
        assert_eq!(Sampler::new(Some(f64::NAN), 0.5).stride(), 1);
        assert_eq!(Sampler::new(Some(25.0), 0.0).stride(), 1);
    }

    #[test]
    fn test_sample_keeps_positions_and_timestamps() {
        let kept: Vec<_> = Sampler::new(Some(10.0), 0.5)
            .sample(frames(12, 10.0))
            .map(Result::unwrap)
            .collect();

        let indices: Vec<u64> = kept.iter().map(|f| f.frame_index).collect();
        assert_eq!(indices, vec![0, 5, 10]);
        assert_eq!(kept[1].timestamp_seconds, 0.5);
    }

    #[test]
    fn test_sample_empty() {
        let kept = Sampler::new(Some(10.0), 0.5).sample(frames(0, 10.0)).count();
        assert_eq!(kept, 0);
    }

    #[test]
    fn test_errors_pass_through() {
        let mut input = frames(3, 10.0);
        input.insert(1, Err(()));
        let out: Vec<_> = Sampler::new(Some(10.0), 1.0).sample(input).collect();
        assert_eq!(out.len(), 2);
        assert!(out[1].is_err());
    }
}
