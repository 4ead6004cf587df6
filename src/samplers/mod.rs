//! Conditional samplers.
//!
//! One type per posterior conditional. The non-conjugate conditionals bind
//! their conditioning data into a closure over the log-pdf primitives and
//! delegate the draw to [`crate::shredder::Shredder`]; the two conjugate
//! normal conditionals are direct draws. Slice-sampled values are clamped to
//! the sampler's interval on return.

mod beta;
mod conjugate;
mod gamma;
mod sigma;
mod splice;

pub use beta::BetaDistributionSampler;
pub use conjugate::{NormalMuSampler, NormalSigmaSampler};
pub use gamma::{GammaBetaSampler, GammaMeanSampler, GammaShapeSampler};
pub use sigma::{BetaSampler, GammaLogNormalSigmaSampler, GammaNormalSigmaSampler};
pub use splice::{ConditionSpliceEtaSampler, NormalTMuSampler, StudentTMuSampler};
