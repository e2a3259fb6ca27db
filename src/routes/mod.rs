mod healthcheck;
mod helpers;
mod home;
mod subscribers;

pub use healthcheck::*;
pub use home::*;
pub use subscribers::*;
