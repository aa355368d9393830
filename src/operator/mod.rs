//! # Operator Interface
//!
//! Everything that talks to the human operator: the console contract, the
//! interactive menus run while automation is paused, and commission-rate
//! input parsing.

pub mod commission;
pub mod console;
pub mod session;

pub use commission::{parse_percentage, CommissionRates};
pub use console::{OperatorConsole, SecretInput, StdioConsole};
pub use session::InteractiveSession;
