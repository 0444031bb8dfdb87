mod chat;
mod metric;
mod session;
#[cfg(test)]
mod tests;

pub use chat::*;
pub use metric::*;
pub use session::*;
