//! Business services: the checkout workflow, the review gate, and the
//! payment gateway helper.

pub mod checkout;
pub mod payment;
pub mod review;
