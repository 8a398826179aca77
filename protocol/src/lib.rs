pub mod codec;
pub mod delta;
pub mod hash;
pub mod message;

pub use codec::MessageError;
pub use delta::DeltaError;
pub use delta::FeedDelta;
pub use message::FEEDME_VERSION;
pub use message::FeedArgs;
pub use message::JsonObject;
pub use message::ServerMessage;
