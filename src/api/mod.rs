pub mod paystub;
pub mod user;
