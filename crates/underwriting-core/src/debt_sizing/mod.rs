pub mod sizer;

pub use sizer::{max_loan_for_debt_service, size_debt, DebtSizingInput, DebtSizingOutput};
