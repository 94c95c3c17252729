//! Price adjustments applied to batches before optimization.
//!
//! Four channels are applied in a fixed order: transport fee, exchange rate,
//! tax rate, customs duty. Each channel multiplies every batch price by a
//! factor derived from its rate according to its [`RateMode`].

use std::fmt;

use crate::error::OptimizeError;
use crate::model::BatchCollection;

/// How a rate turns into a price multiplier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateMode {
    /// The price is multiplied by the rate itself (currency conversion)
    Direct,
    /// The price is multiplied by `1 + rate`
    Surcharge,
}

impl RateMode {
    pub fn factor(self, rate: f64) -> f64 {
        match self {
            RateMode::Direct => rate,
            RateMode::Surcharge => 1.0 + rate,
        }
    }

    /// The rate leaving prices unchanged
    pub fn neutral(self) -> f64 {
        match self {
            RateMode::Direct => 1.0,
            RateMode::Surcharge => 0.0,
        }
    }
}

/// A rate shared by all batches, or one value per batch
#[derive(Debug, Clone, PartialEq)]
pub enum Rate {
    Scalar(f64),
    PerBatch(Vec<f64>),
}

impl Rate {
    /// Rate for the batch at `index`. A one-element array applies to every batch.
    fn value_for(&self, index: usize) -> f64 {
        match self {
            Rate::Scalar(rate) => *rate,
            Rate::PerBatch(rates) if rates.len() == 1 => rates[0],
            Rate::PerBatch(rates) => rates[index],
        }
    }

    fn check_len(&self, channel: RateKind, batch_count: usize) -> Result<(), OptimizeError> {
        match self {
            Rate::PerBatch(rates) if rates.len() != 1 && rates.len() != batch_count => Err(OptimizeError::RateLength {
                channel,
                expected: batch_count,
                actual: rates.len(),
            }),
            _ => Ok(()),
        }
    }
}

impl From<f64> for Rate {
    fn from(rate: f64) -> Self {
        Rate::Scalar(rate)
    }
}

impl From<Vec<f64>> for Rate {
    fn from(rates: Vec<f64>) -> Self {
        Rate::PerBatch(rates)
    }
}

impl From<&[f64]> for Rate {
    fn from(rates: &[f64]) -> Self {
        Rate::PerBatch(rates.to_vec())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateKind {
    TransportFee,
    ExchangeRate,
    TaxRate,
    CustomsDuty,
}

impl RateKind {
    /// The order in which channels are applied
    pub const APPLICATION_ORDER: [RateKind; 4] = [
        RateKind::TransportFee,
        RateKind::ExchangeRate,
        RateKind::TaxRate,
        RateKind::CustomsDuty,
    ];

    pub fn default_mode(self) -> RateMode {
        match self {
            RateKind::ExchangeRate => RateMode::Direct,
            RateKind::TransportFee | RateKind::TaxRate | RateKind::CustomsDuty => RateMode::Surcharge,
        }
    }
}

impl fmt::Display for RateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RateKind::TransportFee => "transport fee",
            RateKind::ExchangeRate => "exchange rate",
            RateKind::TaxRate => "tax rate",
            RateKind::CustomsDuty => "customs duty",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateChannel {
    pub rate: Rate,
    pub mode: RateMode,
}

impl RateChannel {
    pub fn new(rate: impl Into<Rate>, mode: RateMode) -> Self {
        Self {
            rate: rate.into(),
            mode,
        }
    }

    pub fn direct(rate: impl Into<Rate>) -> Self {
        Self::new(rate, RateMode::Direct)
    }

    pub fn surcharge(rate: impl Into<Rate>) -> Self {
        Self::new(rate, RateMode::Surcharge)
    }

    fn neutral(mode: RateMode) -> Self {
        Self::new(mode.neutral(), mode)
    }
}

/// The four rate channels. The default leaves prices unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Rates {
    pub transport_fee: RateChannel,
    pub exchange_rate: RateChannel,
    pub tax_rate: RateChannel,
    pub customs_duty: RateChannel,
}

impl Default for Rates {
    fn default() -> Self {
        Self {
            transport_fee: RateChannel::neutral(RateKind::TransportFee.default_mode()),
            exchange_rate: RateChannel::neutral(RateKind::ExchangeRate.default_mode()),
            tax_rate: RateChannel::neutral(RateKind::TaxRate.default_mode()),
            customs_duty: RateChannel::neutral(RateKind::CustomsDuty.default_mode()),
        }
    }
}

impl Rates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transport_fee(mut self, rate: impl Into<Rate>) -> Self {
        self.transport_fee.rate = rate.into();
        self
    }

    pub fn with_exchange_rate(mut self, rate: impl Into<Rate>) -> Self {
        self.exchange_rate.rate = rate.into();
        self
    }

    pub fn with_tax_rate(mut self, rate: impl Into<Rate>) -> Self {
        self.tax_rate.rate = rate.into();
        self
    }

    pub fn with_customs_duty(mut self, rate: impl Into<Rate>) -> Self {
        self.customs_duty.rate = rate.into();
        self
    }

    /// Replace a whole channel, including its mode
    pub fn with_channel(mut self, kind: RateKind, channel: RateChannel) -> Self {
        *self.channel_mut(kind) = channel;
        self
    }

    pub fn channel(&self, kind: RateKind) -> &RateChannel {
        match kind {
            RateKind::TransportFee => &self.transport_fee,
            RateKind::ExchangeRate => &self.exchange_rate,
            RateKind::TaxRate => &self.tax_rate,
            RateKind::CustomsDuty => &self.customs_duty,
        }
    }

    fn channel_mut(&mut self, kind: RateKind) -> &mut RateChannel {
        match kind {
            RateKind::TransportFee => &mut self.transport_fee,
            RateKind::ExchangeRate => &mut self.exchange_rate,
            RateKind::TaxRate => &mut self.tax_rate,
            RateKind::CustomsDuty => &mut self.customs_duty,
        }
    }

    /// Check that every per-batch rate matches `batch_count`
    pub fn validate(&self, batch_count: usize) -> Result<(), OptimizeError> {
        for kind in RateKind::APPLICATION_ORDER {
            self.channel(kind).rate.check_len(kind, batch_count)?;
        }
        Ok(())
    }
}

/// Multiply batch prices by every channel, in [`RateKind::APPLICATION_ORDER`].
///
/// Prices are updated in place; nothing is changed if a rate array has the
/// wrong length.
pub fn apply_rates(batches: &mut BatchCollection, rates: &Rates) -> Result<(), OptimizeError> {
    rates.validate(batches.len())?;

    for kind in RateKind::APPLICATION_ORDER {
        let channel = rates.channel(kind);
        for (i, price) in batches.prices_mut().enumerate() {
            *price *= channel.mode.factor(channel.rate.value_for(i));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Batch;
    use approx::assert_abs_diff_eq;
    use rstest::rstest;

    fn fixture() -> BatchCollection {
        BatchCollection::parse(
            "seller1",
            &[
                "batch 1: 10; 3xapple, 2xbanana, 4xorange",
                "batch 2: 15; 5xapple, 5xbanana, 5xorange",
                "batch 3: 20; 6xapple, 7xbanana, 7xorange",
            ],
        )
        .unwrap()
    }

    fn prices(batches: &BatchCollection) -> Vec<f64> {
        batches.iter().map(|b| b.price).collect()
    }

    #[rstest]
    #[case::exchange(Rates::new().with_exchange_rate(2.0), [20.0, 30.0, 40.0])]
    #[case::tax(Rates::new().with_tax_rate(1.0), [20.0, 30.0, 40.0])]
    #[case::customs(Rates::new().with_customs_duty(0.5), [15.0, 22.5, 30.0])]
    #[case::transport(Rates::new().with_transport_fee(vec![0.1, 0.2, 0.3]), [11.0, 18.0, 26.0])]
    #[case::identity(Rates::default(), [10.0, 15.0, 20.0])]
    fn test_single_channel(#[case] rates: Rates, #[case] expected: [f64; 3]) {
        let mut batches = fixture();
        apply_rates(&mut batches, &rates).unwrap();
        for (price, expected) in prices(&batches).into_iter().zip(expected) {
            assert_abs_diff_eq!(price, expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_rate_composition() {
        let mut batches = BatchCollection::from_batches(vec![Batch::new("b", 10.0, vec![]).unwrap()]).unwrap();
        let rates = Rates::new()
            .with_transport_fee(0.3)
            .with_exchange_rate(0.9)
            .with_tax_rate(0.2)
            .with_customs_duty(0.2);

        apply_rates(&mut batches, &rates).unwrap();

        assert_abs_diff_eq!(batches.batches()[0].price, 16.848, epsilon = 1e-9);
    }

    #[test]
    fn test_single_element_array_broadcasts() {
        let mut batches = fixture();
        apply_rates(&mut batches, &Rates::new().with_tax_rate(vec![0.5])).unwrap();
        assert_eq!(prices(&batches), vec![15.0, 22.5, 30.0]);
    }

    #[test]
    fn test_rate_length_mismatch() {
        let mut batches = fixture();
        let rates = Rates::new().with_exchange_rate(0.5).with_customs_duty(vec![0.1, 0.2]);

        let err = apply_rates(&mut batches, &rates).unwrap_err();

        assert_eq!(
            err,
            OptimizeError::RateLength {
                channel: RateKind::CustomsDuty,
                expected: 3,
                actual: 2
            }
        );
        // nothing was applied
        assert_eq!(prices(&batches), vec![10.0, 15.0, 20.0]);
    }

    #[test]
    fn test_mode_can_be_overridden() {
        let mut batches = fixture();
        let rates = Rates::new().with_channel(RateKind::TaxRate, RateChannel::direct(3.0));
        apply_rates(&mut batches, &rates).unwrap();
        assert_eq!(prices(&batches), vec![30.0, 45.0, 60.0]);
    }
}
