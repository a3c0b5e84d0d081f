//! Integration tests driving the relman binary against local git repositories

mod helpers;
mod test_cli;
mod test_deps;
