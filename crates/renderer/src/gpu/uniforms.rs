use bytemuck::{Pod, Zeroable};

use crate::sampling::BatchPlan;
use crate::types::FRAME_BATCH;

/// Per-pass weight table for the accumulate shader.
///
/// Uniform array elements stride 16 bytes, so each weight occupies the x
/// lane of one vec4; the remaining lanes stay zero.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug)]
pub(crate) struct AccumulateParams {
    weights: [[f32; 4]; FRAME_BATCH],
}

unsafe impl Zeroable for AccumulateParams {}
unsafe impl Pod for AccumulateParams {}

impl AccumulateParams {
    /// Packs a planned batch; slots beyond the plan keep weight 0 and bind
    /// the placeholder texture.
    pub(crate) fn from_plan(plan: &BatchPlan) -> Self {
        debug_assert!(plan.samples.len() <= FRAME_BATCH);
        let mut weights = [[0.0f32; 4]; FRAME_BATCH];
        for (slot, sample) in plan.samples.iter().enumerate() {
            weights[slot][0] = sample.weight;
        }
        Self { weights }
    }
}

/// Present-pass options: the vertical flip flag padded out to one vec4.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug)]
pub(crate) struct PresentParams {
    flip: u32,
    _pad: [u32; 3],
}

unsafe impl Zeroable for PresentParams {}
unsafe impl Pod for PresentParams {}

impl PresentParams {
    pub(crate) fn new(flip: bool) -> Self {
        Self {
            flip: u32::from(flip),
            _pad: [0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::WeightedSample;

    #[test]
    fn accumulate_params_match_uniform_array_stride() {
        assert_eq!(std::mem::size_of::<AccumulateParams>(), 16 * FRAME_BATCH);
        assert_eq!(std::mem::align_of::<AccumulateParams>(), 16);
    }

    #[test]
    fn weights_land_in_x_lanes_and_pad_with_zero() {
        let plan = BatchPlan {
            samples: vec![
                WeightedSample {
                    frame: Some(0),
                    weight: 0.25,
                },
                WeightedSample {
                    frame: None,
                    weight: 0.0,
                },
                WeightedSample {
                    frame: Some(4),
                    weight: 0.5,
                },
            ],
        };
        let params = AccumulateParams::from_plan(&plan);
        assert_eq!(params.weights[0], [0.25, 0.0, 0.0, 0.0]);
        assert_eq!(params.weights[1], [0.0; 4]);
        assert_eq!(params.weights[2], [0.5, 0.0, 0.0, 0.0]);
        for slot in 3..FRAME_BATCH {
            assert_eq!(params.weights[slot], [0.0; 4]);
        }
    }

    #[test]
    fn present_params_pack_the_flag_first() {
        assert_eq!(std::mem::size_of::<PresentParams>(), 16);
        let flipped = PresentParams::new(true);
        let bytes = bytemuck::bytes_of(&flipped);
        assert_eq!(&bytes[..4], &1u32.to_ne_bytes());
        assert!(bytes[4..].iter().all(|byte| *byte == 0));
    }
}
