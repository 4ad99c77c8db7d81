//! Log-uniform pressure layers.

use crate::error::RtmError;

/// Which end of the atmosphere is layer index 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayerOrder {
    /// Index 0 is the atmospheric top (ascending pressure)
    #[default]
    TopFirst,
    /// Index 0 is the atmospheric bottom (descending pressure)
    BottomFirst,
}

impl LayerOrder {
    /// Layer indices from the atmospheric top downward, for `n` layers.
    pub fn top_down(self, n: usize) -> impl DoubleEndedIterator<Item = usize> + ExactSizeIterator {
        let order = self;
        (0..n).map(move |i| match order {
            LayerOrder::TopFirst => i,
            LayerOrder::BottomFirst => n - 1 - i,
        })
    }
}

/// Immutable layer grid between a top and a bottom pressure.
///
/// Layer boundaries are spaced uniformly in log pressure, and each layer is
/// represented by the pressure at the log-midpoint of its boundaries. All
/// pressures are in bar.
#[derive(Debug, Clone, PartialEq)]
pub struct PressureLayers {
    log_pressure_top: f64,
    log_pressure_btm: f64,
    order: LayerOrder,
    /// Representative pressure of each layer
    pressure: Vec<f64>,
    /// Pressure thickness `P_lower - P_upper` of each layer
    dpressure: Vec<f64>,
    /// log10 thickness of each layer
    log_thickness: Vec<f64>,
    /// Ratio of the upper to the lower boundary pressure of any layer
    pressure_decrease_rate: f64,
}

impl PressureLayers {
    /// Build `nlayer` layers between `10^log_pressure_top` and
    /// `10^log_pressure_btm` bar.
    pub fn new(
        log_pressure_top: f64,
        log_pressure_btm: f64,
        nlayer: usize,
        order: LayerOrder,
    ) -> Result<Self, RtmError> {
        if !(log_pressure_top.is_finite() && log_pressure_btm.is_finite())
            || log_pressure_btm <= log_pressure_top
        {
            return Err(RtmError::InvalidPressureRange {
                log_pressure_top,
                log_pressure_btm,
            });
        }
        if nlayer == 0 {
            return Err(RtmError::InvalidLayerCount);
        }

        let dlog = (log_pressure_btm - log_pressure_top) / nlayer as f64;
        let pressure_decrease_rate = 10f64.powf(-dlog);

        // Built top-down, then flipped if needed
        let mut pressure: Vec<f64> = (0..nlayer)
            .map(|i| 10f64.powf(log_pressure_top + (i as f64 + 0.5) * dlog))
            .collect();
        let mut dpressure: Vec<f64> = (0..nlayer)
            .map(|i| {
                let upper = 10f64.powf(log_pressure_top + i as f64 * dlog);
                let lower = 10f64.powf(log_pressure_top + (i + 1) as f64 * dlog);
                lower - upper
            })
            .collect();
        if order == LayerOrder::BottomFirst {
            pressure.reverse();
            dpressure.reverse();
        }

        Ok(Self {
            log_pressure_top,
            log_pressure_btm,
            order,
            pressure,
            dpressure,
            log_thickness: vec![dlog; nlayer],
            pressure_decrease_rate,
        })
    }

    /// Same as [`PressureLayers::new`], with linear pressures in bar.
    pub fn from_pressures(
        pressure_top: f64,
        pressure_btm: f64,
        nlayer: usize,
        order: LayerOrder,
    ) -> Result<Self, RtmError> {
        if !(pressure_top > 0. && pressure_btm > 0.) {
            return Err(RtmError::InvalidPressureRange {
                log_pressure_top: pressure_top.log10(),
                log_pressure_btm: pressure_btm.log10(),
            });
        }
        Self::new(pressure_top.log10(), pressure_btm.log10(), nlayer, order)
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.pressure.len()
    }

    /// Always false: there is at least one layer.
    pub fn is_empty(&self) -> bool {
        self.pressure.is_empty()
    }

    /// Layer ordering convention.
    pub fn order(&self) -> LayerOrder {
        self.order
    }

    /// Representative pressure of each layer in bar.
    pub fn pressure(&self) -> &[f64] {
        &self.pressure
    }

    /// Pressure thickness of each layer in bar.
    pub fn dpressure(&self) -> &[f64] {
        &self.dpressure
    }

    /// log10 pressure thickness of each layer.
    pub fn log_thickness(&self) -> &[f64] {
        &self.log_thickness
    }

    /// `P_upper / P_lower` for any layer.
    pub fn pressure_decrease_rate(&self) -> f64 {
        self.pressure_decrease_rate
    }

    /// log10 of the pressure at the top boundary in bar.
    pub fn log_pressure_top(&self) -> f64 {
        self.log_pressure_top
    }

    /// log10 of the pressure at the bottom boundary in bar.
    pub fn log_pressure_btm(&self) -> f64 {
        self.log_pressure_btm
    }

    /// Layer indices from the top downward.
    pub fn top_down(&self) -> impl DoubleEndedIterator<Item = usize> + ExactSizeIterator {
        self.order.top_down(self.len())
    }
}
