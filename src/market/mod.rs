// Bar aggregation from minute data
pub mod resampler;

pub use resampler::BarResampler;
