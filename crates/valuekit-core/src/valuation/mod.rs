pub mod capm;
pub mod dcf;
pub mod market;
pub mod peer_comparison;
pub mod projection;
pub mod terminal;
