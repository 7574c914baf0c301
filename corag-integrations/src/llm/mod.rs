//! Chat model adapters.

mod siumai_chat;

pub use siumai_chat::SiumaiChatModel;
