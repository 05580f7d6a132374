use domain::DomainError;
use thiserror::Error;

use crate::broadcaster::BroadcastError;
use crate::mailbox::MailboxClosed;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("broadcast error: {0}")]
    Broadcast(#[from] BroadcastError),
    #[error("mailbox error: {0}")]
    Mailbox(#[from] MailboxClosed),
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}
