pub mod base;
pub mod outbox;
pub mod whatsapp;

pub use base::{ChatTransport, split_message};
pub use outbox::Outbox;
pub use whatsapp::WhatsAppTransport;

#[cfg(test)]
pub(crate) mod testing;
