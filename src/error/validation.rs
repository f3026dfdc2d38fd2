use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("QoS should be any of [0, 1, 2], got {value}.")]
    InvalidQos { value: i64 },
    #[error("Mutation rate must be a probability in [0, 1], got {value}.")]
    InvalidMutationRate { value: f64 },
    #[error("Number of clients must be >= 1.")]
    NoClients,
    #[error("Host must not be empty.")]
    EmptyHost,
    #[error("Port must be in 1..=65535, got {value}.")]
    InvalidPort { value: i64 },
    #[error("Message count must be >= 0, got {value}.")]
    NegativeMessageCount { value: i64 },
    #[error("Message size must be >= 0, got {value}.")]
    NegativeMessageSize { value: i64 },
    #[error("Duration must not be empty.")]
    DurationEmpty,
    #[error("Invalid duration '{value}'.")]
    InvalidDurationFormat { value: String },
    #[error("Invalid duration '{value}': {source}")]
    InvalidDurationNumber {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Duration overflow.")]
    DurationOverflow,
    #[error("Invalid duration unit '{unit}'.")]
    InvalidDurationUnit { unit: String },
    #[error("Duration must be > 0.")]
    DurationZero,
    #[error("Invalid boolean '{value}'. Expected true/false, yes/no, on/off, or 1/0.")]
    InvalidBoolean { value: String },
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
