//! Concrete [`crate::pin::PinIO`] backends. The core never names either of
//! these; they exist only so the CLI has something concrete to hand to
//! [`crate::session::Session::new`].

#[cfg(feature = "backend-cdev")]
pub mod cdev;

#[cfg(feature = "backend-rppal")]
pub mod rppal_backend;
