pub mod builders;
pub mod mock_ledger;
pub mod scripted_console;
pub mod strategies;

pub use builders::*;
pub use mock_ledger::*;
pub use scripted_console::*;
pub use strategies::*;
