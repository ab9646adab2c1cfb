//! Pure sampling arithmetic for the accumulation pipeline.
//!
//! Everything here is CPU-side planning: resolving logical sample indices to
//! frames and weights under a wrap mode, partitioning a sample walk into
//! fixed-capacity batches, and expanding a blend request into the ordered
//! legs the GPU executor folds together. No GPU types appear, so the whole
//! layer is unit-testable without an adapter.

use anyhow::{bail, Result};

use crate::types::{BlendOptions, SampleMode, WrapMode, FRAME_BATCH};

/// One resolved sample: the frame to bind (`None` means the empty
/// placeholder) and the weight it contributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedSample {
    pub frame: Option<usize>,
    pub weight: f32,
}

/// Index and weight resolution for one loaded animation.
///
/// The policy is pure and stateless apart from the frame count; every
/// included sample weighs `1 / sample_count` regardless of wrap mode.
#[derive(Debug, Clone, Copy)]
pub struct SamplingPolicy {
    frame_count: usize,
    sample_count: u32,
}

impl SamplingPolicy {
    pub fn new(frame_count: usize, sample_count: u32) -> Result<Self> {
        if frame_count == 0 {
            bail!("cannot sample an empty frame sequence");
        }
        if sample_count == 0 {
            bail!("sample count must be positive");
        }
        Ok(Self {
            frame_count,
            sample_count,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Weight contributed by every included sample.
    pub fn base_weight(&self) -> f32 {
        1.0 / self.sample_count as f32
    }

    /// Resolves a logical index under the given wrap mode.
    ///
    /// The wrap mode only chooses the frame or drops the sample; it never
    /// alters the weight of an included sample. `stop` treats everything
    /// outside `[0, frame_count)` as a zero-weight placeholder, and the
    /// composite is left un-renormalised when that happens.
    pub fn resolve(&self, logical: i64, wrap: WrapMode) -> WeightedSample {
        let count = self.frame_count as i64;
        let frame = match wrap {
            WrapMode::Clamp => Some(logical.clamp(0, count - 1) as usize),
            WrapMode::Stop => (0..count).contains(&logical).then_some(logical as usize),
            WrapMode::Overflow => Some(logical.rem_euclid(count) as usize),
        };
        match frame {
            Some(index) => WeightedSample {
                frame: Some(index),
                weight: self.base_weight(),
            },
            None => WeightedSample {
                frame: None,
                weight: 0.0,
            },
        }
    }
}

/// One shader pass worth of resolved samples, at most `FRAME_BATCH` of them.
///
/// Slots beyond `samples.len()` bind the placeholder texture at weight 0
/// when the batch is uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPlan {
    pub samples: Vec<WeightedSample>,
}

/// One `accumulate` invocation: a directed walk over `sample_count` logical
/// samples folded onto the running result at the given weight multiplier.
/// The first leg of a blend starts from the empty placeholder; every later
/// leg starts from the previous leg's output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendLeg {
    pub initial_index: i64,
    pub increment: i64,
    pub weight_multiplier: f32,
}

/// Expands a blend request into its ordered accumulate legs.
///
/// Bidirectional blends run a half-weight backward walk starting one step
/// behind the current frame, then fold the forward walk on top at half
/// weight, so the result matches the average of the two one-directional
/// blends whenever no samples are dropped.
pub fn blend_legs(options: &BlendOptions) -> Vec<BlendLeg> {
    match options.sample_mode {
        SampleMode::Forward => vec![BlendLeg {
            initial_index: options.current_frame,
            increment: options.frame_increment,
            weight_multiplier: 1.0,
        }],
        SampleMode::Reverse => vec![BlendLeg {
            initial_index: options.current_frame,
            increment: -options.frame_increment,
            weight_multiplier: 1.0,
        }],
        SampleMode::Bidirectional => vec![
            BlendLeg {
                initial_index: options.current_frame - options.frame_increment,
                increment: -options.frame_increment,
                weight_multiplier: 0.5,
            },
            BlendLeg {
                initial_index: options.current_frame,
                increment: options.frame_increment,
                weight_multiplier: 0.5,
            },
        ],
    }
}

/// Partitions one leg's sample walk into consecutive shader batches.
///
/// Sample ordinal `o` resolves the logical index
/// `initial_index + o * increment`; ordinals fill batches of `FRAME_BATCH`
/// slots in walk order, so a count that is not a multiple of the capacity
/// leaves the final batch short.
pub fn plan_batches(
    policy: &SamplingPolicy,
    initial_index: i64,
    increment: i64,
    wrap: WrapMode,
    weight_multiplier: f32,
) -> Vec<BatchPlan> {
    plan_with_capacity(policy, initial_index, increment, wrap, weight_multiplier, FRAME_BATCH)
}

fn plan_with_capacity(
    policy: &SamplingPolicy,
    initial_index: i64,
    increment: i64,
    wrap: WrapMode,
    weight_multiplier: f32,
    capacity: usize,
) -> Vec<BatchPlan> {
    debug_assert!(capacity > 0);
    let mut plans = Vec::new();
    let mut ordinal: u32 = 0;
    while ordinal < policy.sample_count {
        let take = (policy.sample_count - ordinal).min(capacity as u32);
        let mut samples = Vec::with_capacity(take as usize);
        for slot in 0..take {
            let logical = initial_index + i64::from(ordinal + slot) * increment;
            let resolved = policy.resolve(logical, wrap);
            samples.push(WeightedSample {
                frame: resolved.frame,
                weight: resolved.weight * weight_multiplier,
            });
        }
        plans.push(BatchPlan { samples });
        ordinal += take;
    }
    plans
}

/// Plans the scanline window: `min(FRAME_BATCH, frame_count)` consecutive
/// frames starting at `start`, wrapped circularly, each weighing
/// `1 / frame_count`. Window and weight denominator deliberately differ, so
/// long animations accumulate a dimmer partial average.
pub fn plan_scanline_window(frame_count: usize, start: usize) -> Result<BatchPlan> {
    let policy = SamplingPolicy::new(frame_count, frame_count as u32)?;
    let window = FRAME_BATCH.min(frame_count);
    let mut samples = Vec::with_capacity(window);
    for slot in 0..window {
        samples.push(policy.resolve((start + slot) as i64, WrapMode::Overflow));
    }
    Ok(BatchPlan { samples })
}
