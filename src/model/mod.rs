pub mod employee;
pub mod hike_letter;
pub mod offer_letter;
pub mod payslip;
pub mod relieving_letter;
pub mod role;
pub mod user;
