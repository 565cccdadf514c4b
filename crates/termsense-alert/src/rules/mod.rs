pub mod error_rate;
pub mod low_volume;
pub mod outage;

use crate::AnomalyRule;

pub use error_rate::HighErrorRateRule;
pub use low_volume::LowVolumeRule;
pub use outage::OutageRule;

/// The built-in rule set in precedence order: outage beats high error rate
/// beats low volume. The ordering is a contract, not an optimization.
pub fn default_rules() -> Vec<Box<dyn AnomalyRule>> {
    vec![
        Box::new(OutageRule),
        Box::new(HighErrorRateRule),
        Box::new(LowVolumeRule),
    ]
}
