pub mod employee;
pub mod paystub;
