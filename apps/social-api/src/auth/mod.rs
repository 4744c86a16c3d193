pub mod identity;
pub mod middleware;
pub mod tokens;
