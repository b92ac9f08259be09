//! Debts domain module.
//!
//! A debt owed to a lender and the payments made against it. Pure domain logic;
//! persistence lives in `fintrack-infra`.

pub mod debt;

pub use debt::{
    ALREADY_PAID_PAYMENT_NAME, Debt, DebtAggregate, DebtId, DebtPayment, DebtPaymentId,
    DebtPaymentProps, DebtProps, DebtUpdate,
};
