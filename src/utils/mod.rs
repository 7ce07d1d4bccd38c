pub mod chats;
pub mod friends;
pub mod messages;
pub mod session;
pub mod users;
