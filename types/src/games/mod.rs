mod constants;
mod kind;
mod participant;
mod roles;
mod session;

pub use constants::*;
pub use kind::*;
pub use participant::*;
pub use roles::*;
pub use session::*;

#[cfg(test)]
mod tests;
