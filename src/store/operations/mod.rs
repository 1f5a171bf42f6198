pub mod identities;
pub mod players;
