// Each test binary uses a different subset of the helpers.
#![allow(dead_code)]

pub mod scripted;
pub mod socket_guard;
