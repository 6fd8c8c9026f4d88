pub mod applications;
pub mod cases;
pub mod messages;
pub mod reaction_roles;
pub mod sanctions;
pub mod tickets;
pub mod warns;
