use thiserror::Error;

use crate::currency::ConversionError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("malformed input: {0}")]
    MalformedInput(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error("llm collaborator failure: {0}")]
    Advisor(String),
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("upstream failure: {message}")]
    Upstream { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Upstream { .. } => {
                "A pricing collaborator failed to respond correctly. No totals were produced."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::Upstream { message, .. }
            | Self::ServiceUnavailable { message, .. } => message,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Upstream { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Upstream { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(DomainError::MalformedInput(message)) => {
                Self::BadRequest { message, correlation_id }
            }
            ApplicationError::Conversion(error) => {
                Self::Upstream { message: error.to_string(), correlation_id }
            }
            ApplicationError::Advisor(message) => Self::Upstream { message, correlation_id },
            ApplicationError::Unavailable(message) => {
                Self::ServiceUnavailable { message, correlation_id }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::currency::ConversionError;
    use crate::errors::{ApplicationError, DomainError, InterfaceError};

    #[test]
    fn malformed_input_maps_to_bad_request_with_its_message() {
        let interface = ApplicationError::from(DomainError::MalformedInput(
            "targetCurrency is required".to_owned(),
        ))
        .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ref message,
            } if correlation_id == "req-1" && message == "targetCurrency is required"
        ));
        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn conversion_failure_maps_to_upstream() {
        let interface = ApplicationError::from(ConversionError::failed("EUR", "USD", "timeout"))
            .into_interface("req-2");

        assert!(matches!(interface, InterfaceError::Upstream { .. }));
        assert!(interface.message().contains("EUR->USD"));
        assert_eq!(interface.correlation_id(), "req-2");
    }

    #[test]
    fn missing_collaborator_maps_to_service_unavailable() {
        let interface = ApplicationError::Unavailable("llm is not configured".to_owned())
            .into_interface("req-3");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(
            interface.user_message(),
            "The service is temporarily unavailable. Please retry shortly."
        );
    }
}
