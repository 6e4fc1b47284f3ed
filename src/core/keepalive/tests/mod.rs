pub(crate) mod support;

mod scheduled;
mod stats;
