pub mod events;

pub use events::{
    AgentReply, AgentRequest, InboundMessage, MediaOptions, OutboundPushRequest, OutboundSend,
    SendContent,
};
