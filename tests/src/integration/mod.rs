//! End-to-end flows over real HTTP against [`stub_server::StubServer`].

pub mod fixtures;
pub mod stub_server;

mod flows;
