mod common;
mod penalties;
