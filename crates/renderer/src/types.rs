/// Number of frame texture slots in one accumulation batch.
///
/// The batching loop, the bind-group layout, and the generated shader all
/// derive their frame-slot count from this constant; `GpuState` asserts at
/// start-up that the assembled shader agrees with it.
pub const FRAME_BATCH: usize = 8;

/// How sample indices outside `[0, frame_count)` are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    /// Saturate to the first or last frame.
    Clamp,
    /// Drop the sample entirely; the composite keeps the lost weight.
    Stop,
    /// Wrap around with Euclidean modulo, so index `-1` lands on the last frame.
    #[default]
    Overflow,
}

impl std::fmt::Display for WrapMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WrapMode::Clamp => f.write_str("clamp"),
            WrapMode::Stop => f.write_str("stop"),
            WrapMode::Overflow => f.write_str("overflow"),
        }
    }
}

/// Direction in which samples are taken from the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleMode {
    /// Walk forward along the frame increment.
    #[default]
    Forward,
    /// Walk backward along the negated increment.
    Reverse,
    /// Combine two half-weight walks, one backward and one forward.
    Bidirectional,
}

impl std::fmt::Display for SampleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleMode::Forward => f.write_str("forward"),
            SampleMode::Reverse => f.write_str("reverse"),
            SampleMode::Bidirectional => f.write_str("bi"),
        }
    }
}

/// Sampling parameters for one median blend.
///
/// `sample_count` is the number of logical samples folded into the composite
/// and must be positive; every included sample contributes
/// `1 / sample_count` of the final weight before `stop` drops any.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendOptions {
    /// Frame index the sample walk starts from.
    pub current_frame: i64,
    /// Signed step between consecutive samples.
    pub frame_increment: i64,
    /// Direction policy for the walk.
    pub sample_mode: SampleMode,
    /// Number of logical samples blended together.
    pub sample_count: u32,
    /// Policy for indices that fall outside the frame sequence.
    pub wrap_mode: WrapMode,
}

impl Default for BlendOptions {
    /// A single forward sample of frame 0 with wrap-around indexing.
    fn default() -> Self {
        Self {
            current_frame: 0,
            frame_increment: 1,
            sample_mode: SampleMode::default(),
            sample_count: 1,
            wrap_mode: WrapMode::default(),
        }
    }
}

/// Which widget the preview window drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewerMode {
    /// Time-blended still of the whole animation.
    #[default]
    Median,
    /// Animating scanline-style loop.
    Scanline,
}

impl std::fmt::Display for ViewerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewerMode::Median => f.write_str("median"),
            ViewerMode::Scanline => f.write_str("scanline"),
        }
    }
}

/// Immutable configuration handed to the preview window runtime.
///
/// `ViewerConfig` mirrors CLI flags and tells the runtime which widget to
/// drive, how to sample the animation, and how fast scanline playback runs.
#[derive(Clone, Debug)]
pub struct ViewerConfig {
    /// Window title.
    pub title: String,
    /// Widget selection (median still vs scanline loop).
    pub mode: ViewerMode,
    /// Sampling parameters for the median widget and frame stepping.
    pub options: BlendOptions,
    /// Scanline playback rate in frames per second.
    pub frame_rate: f32,
    /// Window size in physical pixels; None sizes the window to the frames.
    pub window_size: Option<(u32, u32)>,
    /// Flip the presented image vertically.
    pub flip: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "gifmelt".to_string(),
            mode: ViewerMode::default(),
            options: BlendOptions::default(),
            frame_rate: 10.0,
            window_size: None,
            flip: false,
        }
    }
}
