/// Possible RTM errors.
#[derive(Debug, Clone, PartialEq)]
pub enum RtmError {
    /// The inputs don't have the expected shape(s)
    InconsistentInputs,
    /// The bottom pressure is not larger than the top pressure
    InvalidPressureRange {
        /// log10 of the top pressure in bar
        log_pressure_top: f64,
        /// log10 of the bottom pressure in bar
        log_pressure_btm: f64,
    },
    /// The number of layers must be positive
    InvalidLayerCount,
    /// The wavenumber grid can't be used for the requested operation
    InvalidGrid(&'static str),
    /// A grid resolution, tolerance, or cutoff is out of range
    InvalidResolution(&'static str),
    /// A physical input is out of its allowed domain
    InvalidInput(&'static str),
    /// A temperature fell outside the valid range under the strict policy
    TemperatureOutOfRange {
        /// The offending temperature in K
        temperature: f64,
        /// Lower end of the valid range in K
        low: f64,
        /// Upper end of the valid range in K
        high: f64,
    },
    /// The optical depth matrix has a NaN or infinite element
    NonFiniteOpticalDepth {
        /// Layer index of the first bad element
        layer: usize,
        /// Wavenumber index of the first bad element
        index: usize,
    },
    /// The opacity source exists only as a placeholder
    NotImplemented(&'static str),
    /// The opacity variant doesn't provide the requested operation
    UnsupportedOperation {
        /// Name of the opacity method
        method: &'static str,
        /// Name of the requested operation
        operation: &'static str,
    },
    /// An input required by this computation was not given
    MissingInput(&'static str),
    /// An array is not contiguous when it was assumed to be
    NotContiguous,
    /// The computation was interrupted before it finished
    Cancelled,
}

impl std::fmt::Display for RtmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RtmError::InconsistentInputs => {
                write!(f, "inputs to RTM have the wrong shape")
            }
            RtmError::InvalidPressureRange {
                log_pressure_top,
                log_pressure_btm,
            } => write!(
                f,
                "pressure at the bottom (10^{log_pressure_btm} bar) must be higher than at the top (10^{log_pressure_top} bar)"
            ),
            RtmError::InvalidLayerCount => {
                write!(f, "number of layers must be a positive integer")
            }
            RtmError::InvalidGrid(reason) => write!(f, "invalid wavenumber grid: {reason}"),
            RtmError::InvalidResolution(reason) => write!(f, "invalid resolution: {reason}"),
            RtmError::InvalidInput(reason) => write!(f, "invalid input: {reason}"),
            RtmError::TemperatureOutOfRange {
                temperature,
                low,
                high,
            } => write!(
                f,
                "temperature {temperature} K is outside the valid range [{low}, {high}] K"
            ),
            RtmError::NonFiniteOpticalDepth { layer, index } => write!(
                f,
                "optical depth is not finite at layer {layer}, wavenumber index {index}"
            ),
            RtmError::NotImplemented(what) => write!(f, "{what} is not implemented yet"),
            RtmError::UnsupportedOperation { method, operation } => {
                write!(f, "opacity method '{method}' does not provide {operation}")
            }
            RtmError::MissingInput(what) => write!(f, "missing input: {what}"),
            RtmError::NotContiguous => write!(f, "array slice not contiguous in memory"),
            RtmError::Cancelled => write!(f, "computation cancelled"),
        }
    }
}

impl std::error::Error for RtmError {}
