//! Error types for the contact plan

use thiserror::Error;

use crate::contact::ContactId;
use crate::types::{DtnTime, NodeNbr};

/// Errors raised when editing a contact plan
#[derive(Debug, Error, PartialEq)]
pub enum ContactPlanError {
    #[error("Invalid node number: {0}")]
    InvalidNode(NodeNbr),

    #[error("Invalid window: from {from_time} is not before to {to_time}")]
    InvalidWindow { from_time: DtnTime, to_time: DtnTime },

    #[error("Invalid confidence {0}, expected (0, 1]")]
    InvalidConfidence(f32),

    #[error("Unknown or removed contact: {0}")]
    UnknownContact(ContactId),

    #[error("Contact plan is full")]
    CapacityExceeded,
}

/// Result type for contact plan operations
pub type ContactPlanResult<T> = Result<T, ContactPlanError>;
