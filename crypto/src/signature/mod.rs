// pub(crate) for inner modules is not redundant, the backends get
// dispatched from the crate root
#![allow(clippy::redundant_pub_crate)]

pub(crate) mod ed25519;
pub(crate) mod secp256k1;
